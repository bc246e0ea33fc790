use super::pacing::Pacer;
use super::scripts;
use crate::session::{PageSession, SessionError};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Items scraped off an infinitely scrolling page, identified by a stable key.
pub trait Keyed {
    fn key(&self) -> &str;
}

/// Why a scroll collection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Reached the requested number of items.
    Cap,
    /// Ran out of scroll rounds.
    ScrollLimit,
    /// A scroll produced nothing new.
    Stalled,
    /// The page went away.
    SessionLost,
    /// The extraction script failed.
    ScriptFailed,
}

#[derive(Debug, Clone)]
pub struct ScrollOutcome<T> {
    pub items: Vec<T>,
    pub scrolls: usize,
    pub stop: StopReason,
}

/// Repeatedly extract, then scroll, until a stop condition is met.
#[derive(Debug, Clone)]
pub struct ScrollCollector {
    pub max_items: usize,
    pub max_scrolls: usize,
    pub settle: Duration,
}

impl ScrollCollector {
    pub async fn collect<T>(
        &self,
        session: &mut dyn PageSession,
        extract_script: &str,
        pacer: &Pacer,
    ) -> ScrollOutcome<T>
    where
        T: DeserializeOwned + Keyed,
    {
        let mut items: Vec<T> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut scrolls = 0;

        let stop = loop {
            let batch: Vec<T> = match extract(session, extract_script).await {
                Ok(batch) => batch,
                Err(e) if e.is_session_closed() => {
                    error!("Session lost while collecting: {}", e);
                    break StopReason::SessionLost;
                }
                Err(e) => {
                    warn!("Extraction failed after {} scrolls: {}", scrolls, e);
                    break StopReason::ScriptFailed;
                }
            };

            let before = items.len();
            for item in batch {
                if items.len() >= self.max_items {
                    break;
                }
                if seen.insert(item.key().to_string()) {
                    items.push(item);
                }
            }
            let added = items.len() - before;
            debug!("Round {}: {} new, {} total", scrolls, added, items.len());

            if items.len() >= self.max_items {
                break StopReason::Cap;
            }
            if added == 0 && scrolls > 0 {
                break StopReason::Stalled;
            }
            if scrolls >= self.max_scrolls {
                break StopReason::ScrollLimit;
            }

            if let Err(e) = session.evaluate(scripts::SCROLL_PAGE).await {
                if e.is_session_closed() {
                    error!("Session lost while scrolling: {}", e);
                    break StopReason::SessionLost;
                }
                warn!("Scroll failed: {}", e);
                break StopReason::ScriptFailed;
            }
            scrolls += 1;
            tokio::time::sleep(self.settle).await;
            pacer.pause().await;
        };

        info!(
            "Collected {} items in {} scrolls (stopped: {:?})",
            items.len(),
            scrolls,
            stop
        );
        ScrollOutcome {
            items,
            scrolls,
            stop,
        }
    }
}

async fn extract<T: DeserializeOwned>(
    session: &mut dyn PageSession,
    script: &str,
) -> Result<Vec<T>, SessionError> {
    let value = session.evaluate(script).await?;
    if value.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(value)?)
}
