use super::CollectSettings;
use super::scripts;
use super::scroll::{Keyed, ScrollCollector, ScrollOutcome};
use crate::resolution::{AdaptiveResolver, TextRoleQuery};
use crate::session::{PageSession, SessionError};
use chrono::{DateTime, Utc};
use evcal_common::record::Post;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Post as returned by the in-page extraction script.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapedPost {
    pub id: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub posted_at: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Keyed for ScrapedPost {
    fn key(&self) -> &str {
        &self.id
    }
}

impl ScrapedPost {
    pub fn into_post(self, scraped_at: DateTime<Utc>) -> Post {
        let posted_at = self
            .posted_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        Post {
            id: self.id,
            author: self.author,
            text: self.text,
            posted_at,
            url: self.url,
            scraped_at,
        }
    }
}

/// Live-search URL for a query.
pub fn search_url(base_url: &str, search_path: &str, query: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(base_url)?.join(search_path)?;
    url.query_pairs_mut()
        .append_pair("q", query)
        .append_pair("src", "typed_query")
        .append_pair("f", "live");
    Ok(url.into())
}

fn first_post() -> TextRoleQuery {
    TextRoleQuery::new().test_ids(["tweet", "cellInnerDiv"])
}

pub struct SearchScraper<'a> {
    settings: &'a CollectSettings,
}

impl<'a> SearchScraper<'a> {
    pub fn new(settings: &'a CollectSettings) -> Self {
        Self { settings }
    }

    /// Collect up to `max_posts` posts for a query. Navigation failure is an
    /// error; anything after that returns what was gathered so far.
    pub async fn scrape(
        &self,
        session: &mut dyn PageSession,
        query: &str,
        max_posts: usize,
    ) -> Result<Vec<Post>, SessionError> {
        let site = &self.settings.site;
        let url = search_url(&site.base_url, &site.search_path, query)
            .map_err(|e| SessionError::Navigation(format!("{}: {}", site.base_url, e)))?;
        info!("Searching '{}' ({})", query, url);
        session.navigate(&url).await?;
        self.settings.pacer.pause().await;

        let wait = Duration::from_millis(self.settings.scraping.first_item_timeout_ms);
        let found = AdaptiveResolver::with_config(&mut *session, self.settings.resolver.clone())
            .resolve_by_text_or_role(&first_post(), wait)
            .await;
        if found.is_none() {
            warn!("No posts appeared for '{}'", query);
            self.settings
                .recorder
                .capture(session, &format!("search_empty_{query}"))
                .await;
            return Ok(Vec::new());
        }

        let collector = ScrollCollector {
            max_items: max_posts,
            max_scrolls: self.settings.scraping.max_scrolls,
            settle: Duration::from_millis(self.settings.scraping.scroll_settle_ms),
        };
        let ScrollOutcome { items, .. } = collector
            .collect::<ScrapedPost>(session, scripts::EXTRACT_POSTS, &self.settings.pacer)
            .await;

        let scraped_at = Utc::now();
        let posts: Vec<Post> = items
            .into_iter()
            .map(|p| p.into_post(scraped_at))
            .collect();
        info!("'{}': {} posts", query, posts.len());
        Ok(posts)
    }
}
