//! Browser-side collection: login, live search and list members.

pub mod credentials;
pub mod list;
pub mod login;
pub mod pacing;
pub mod page_state;
pub mod scripts;
pub mod scroll;
pub mod search;

use crate::config::EvcalConfig;
use crate::config::schema::{ScrapingConfig, SiteConfig, Target};
use crate::resolution::ResolverConfig;
use crate::session::{PageSession, SessionError, SessionLauncher};
use credentials::{ChallengeResponder, Credentials};
use evcal_common::record::RawRecord;
use list::ListCollector;
use login::{LoginError, LoginFlow};
use pacing::Pacer;
use page_state::PageStateRecorder;
use search::SearchScraper;
use thiserror::Error;
use tracing::{info, warn};

pub use credentials::{Challenge, StaticResponder};
pub use page_state::PageAnalysis;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Failed to open a browser session: {0}")]
    Launch(SessionError),

    #[error("No credentials available for login")]
    MissingCredentials,

    #[error(transparent)]
    Login(#[from] LoginError),

    #[error("Scraping failed: {0}")]
    Scrape(SessionError),
}

/// Everything a collection flow needs besides the session itself.
#[derive(Debug, Clone)]
pub struct CollectSettings {
    pub site: SiteConfig,
    pub scraping: ScrapingConfig,
    pub resolver: ResolverConfig,
    pub pacer: Pacer,
    pub recorder: PageStateRecorder,
}

impl CollectSettings {
    pub fn from_config(config: &EvcalConfig) -> Self {
        Self {
            site: config.site.clone(),
            scraping: config.scraping.clone(),
            resolver: config.resolver.clone(),
            pacer: Pacer::new(config.pacing.clone()),
            recorder: PageStateRecorder::new(config.paths.debug_dir.clone()),
        }
    }
}

/// Runs one target on its own freshly launched session.
pub struct TargetCollector<'a> {
    settings: &'a CollectSettings,
    responder: &'a dyn ChallengeResponder,
}

impl<'a> TargetCollector<'a> {
    pub fn new(settings: &'a CollectSettings, responder: &'a dyn ChallengeResponder) -> Self {
        Self { settings, responder }
    }

    pub async fn collect(
        &self,
        launcher: &dyn SessionLauncher,
        target: &Target,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<RawRecord>, CollectError> {
        let mut session = launcher.launch().await.map_err(CollectError::Launch)?;
        let result = self.run(session.as_mut(), target, credentials).await;
        if let Err(e) = session.close().await {
            warn!("Failed to close session for '{}': {}", target.label(), e);
        }
        result
    }

    async fn run(
        &self,
        session: &mut dyn PageSession,
        target: &Target,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<RawRecord>, CollectError> {
        if !self.settings.scraping.skip_login {
            let credentials = credentials.ok_or(CollectError::MissingCredentials)?;
            LoginFlow::new(self.settings, self.responder)
                .login(session, credentials)
                .await?;
        }

        let records: Vec<RawRecord> = match target {
            Target::Search { query, max_posts } => {
                let cap = max_posts.unwrap_or(self.settings.scraping.default_max_posts);
                SearchScraper::new(self.settings)
                    .scrape(session, query, cap)
                    .await
                    .map_err(CollectError::Scrape)?
                    .into_iter()
                    .map(RawRecord::Post)
                    .collect()
            }
            Target::List {
                list_url,
                max_members,
            } => {
                let cap = max_members.unwrap_or(usize::MAX);
                ListCollector::new(self.settings)
                    .collect(session, list_url, cap)
                    .await
                    .map_err(CollectError::Scrape)?
                    .into_iter()
                    .map(RawRecord::ListMember)
                    .collect()
            }
        };
        info!("Target '{}' yielded {} records", target.label(), records.len());
        Ok(records)
    }
}
