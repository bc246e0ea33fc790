use super::CollectSettings;
use super::scripts;
use super::scroll::{Keyed, ScrollCollector};
use crate::resolution::{AdaptiveResolver, TextRoleQuery};
use crate::session::{PageSession, SessionError};
use chrono::{DateTime, Utc};
use evcal_common::record::ListMember;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapedMember {
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
}

impl Keyed for ScrapedMember {
    fn key(&self) -> &str {
        &self.user_id
    }
}

impl ScrapedMember {
    pub fn into_member(self, scraped_at: DateTime<Utc>) -> ListMember {
        ListMember {
            user_id: self.user_id,
            user_name: self.user_name,
            display_name: self.display_name,
            bio: self.bio.filter(|b| !b.trim().is_empty()),
            is_verified: self.is_verified,
            scraped_at,
        }
    }
}

/// Absolute members URL; relative list paths are resolved against the site.
pub fn members_url(base_url: &str, list_url: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(base_url)?.join(list_url)?;
    if !url.path().trim_end_matches('/').ends_with("/members") {
        let path = format!("{}/members", url.path().trim_end_matches('/'));
        url.set_path(&path);
    }
    Ok(url.into())
}

/// Collects the accounts in a list's member view.
pub struct ListCollector<'a> {
    settings: &'a CollectSettings,
}

impl<'a> ListCollector<'a> {
    pub fn new(settings: &'a CollectSettings) -> Self {
        Self { settings }
    }

    pub async fn collect(
        &self,
        session: &mut dyn PageSession,
        list_url: &str,
        max_members: usize,
    ) -> Result<Vec<ListMember>, SessionError> {
        let url = members_url(&self.settings.site.base_url, list_url)
            .map_err(|e| SessionError::Navigation(format!("{}: {}", list_url, e)))?;
        info!("Collecting list members from {}", url);
        session.navigate(&url).await?;
        self.settings.pacer.pause().await;

        let wait = Duration::from_millis(self.settings.scraping.first_item_timeout_ms);
        let first = TextRoleQuery::new().test_ids(["UserCell"]);
        let found = AdaptiveResolver::with_config(&mut *session, self.settings.resolver.clone())
            .resolve_by_text_or_role(&first, wait)
            .await;
        if found.is_none() {
            warn!("No member cells on {}", url);
            self.settings.recorder.capture(session, "list_members_empty").await;
            return Ok(Vec::new());
        }

        let collector = ScrollCollector {
            max_items: max_members,
            max_scrolls: self.settings.scraping.max_scrolls,
            settle: Duration::from_millis(self.settings.scraping.scroll_settle_ms),
        };
        let outcome = collector
            .collect::<ScrapedMember>(session, scripts::EXTRACT_MEMBERS, &self.settings.pacer)
            .await;

        let scraped_at = Utc::now();
        Ok(outcome
            .items
            .into_iter()
            .map(|m| m.into_member(scraped_at))
            .collect())
    }
}
