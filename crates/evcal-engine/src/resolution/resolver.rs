//! Adaptive element lookup over a page session.
//!
//! Front ends rename attributes and reshuffle markup often, so callers hand
//! the resolver several independent ways to identify the same element. The
//! resolver tries them in priority order against one shared time budget and
//! returns the first visible match.

use super::budget::SearchBudget;
use crate::session::{ErrorKind, PageSession, SessionError};
use evcal_common::descriptor::{AttributeCandidates, Descriptor, ElementHandle, TextMatch};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Floor for a single attribute attempt.
    #[serde(default = "default_attribute_min_attempt_ms")]
    pub attribute_min_attempt_ms: u64,
    /// Floor for a single text/role/test-id attempt.
    #[serde(default = "default_text_min_attempt_ms")]
    pub text_min_attempt_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            attribute_min_attempt_ms: default_attribute_min_attempt_ms(),
            text_min_attempt_ms: default_text_min_attempt_ms(),
        }
    }
}

fn default_attribute_min_attempt_ms() -> u64 {
    500
}

fn default_text_min_attempt_ms() -> u64 {
    1000
}

/// Text/role/test-id lookup request.
#[derive(Debug, Clone, Default)]
pub struct TextRoleQuery {
    pub texts: Vec<String>,
    pub role: Option<String>,
    pub test_ids: Vec<String>,
    pub exact_match: bool,
}

impl TextRoleQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts<I, S>(mut self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.texts = texts.into_iter().map(Into::into).collect();
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn test_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.test_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn exact(mut self, exact_match: bool) -> Self {
        self.exact_match = exact_match;
        self
    }
}

/// Fallback descriptors for a text/role query, in the order they are tried.
///
/// 1. role + each text (exact, then case-insensitive partial unless exact-only)
/// 2. role alone, when no texts were given
/// 3. each text alone (exact, then case-insensitive partial unless exact-only)
/// 4. each test id
pub fn text_or_role_descriptors(query: &TextRoleQuery) -> Vec<Descriptor> {
    let mut descriptors = Vec::new();

    if let Some(role) = &query.role {
        if query.texts.is_empty() {
            descriptors.push(Descriptor::role(role.clone()));
        } else {
            for text in &query.texts {
                descriptors.push(Descriptor::role_named(role.clone(), TextMatch::exact(text.clone())));
                if !query.exact_match {
                    descriptors.push(Descriptor::role_named(
                        role.clone(),
                        TextMatch::partial(text.clone()),
                    ));
                }
            }
        }
    }

    for text in &query.texts {
        descriptors.push(Descriptor::Text(TextMatch::exact(text.clone())));
        if !query.exact_match {
            descriptors.push(Descriptor::Text(TextMatch::partial(text.clone())));
        }
    }

    for id in &query.test_ids {
        descriptors.push(Descriptor::test_id(id.clone()));
    }

    descriptors
}

/// Outcome of a single candidate attempt.
enum Attempt {
    Found(ElementHandle),
    Miss,
    Abort,
}

/// Resolver scoped to one page session.
///
/// Holds no state between calls besides its configuration.
pub struct AdaptiveResolver<'a, S: PageSession + ?Sized> {
    session: &'a mut S,
    config: ResolverConfig,
}

impl<'a, S: PageSession + ?Sized> AdaptiveResolver<'a, S> {
    pub fn new(session: &'a mut S) -> Self {
        Self::with_config(session, ResolverConfig::default())
    }

    pub fn with_config(session: &'a mut S, config: ResolverConfig) -> Self {
        Self { session, config }
    }

    /// Find a visible `input` whose attribute equals one of the given values.
    pub async fn resolve_by_attributes(
        &mut self,
        candidates: &AttributeCandidates,
        total_timeout: Duration,
    ) -> Option<ElementHandle> {
        info!("Attribute search started: {:?}", candidates);
        let descriptors: Vec<Descriptor> = candidates
            .pairs()
            .map(|(name, value)| Descriptor::input_attribute(name, value))
            .collect();

        if descriptors.is_empty() {
            warn!("Attribute search called without candidates");
            return None;
        }

        let min_attempt = Duration::from_millis(self.config.attribute_min_attempt_ms);
        let found = self
            .search(&descriptors, total_timeout, min_attempt, false)
            .await;
        if found.is_none() {
            error!("No input matched any attribute candidate: {:?}", candidates);
        }
        found
    }

    /// Find a visible element by role, text or test id.
    pub async fn resolve_by_text_or_role(
        &mut self,
        query: &TextRoleQuery,
        total_timeout: Duration,
    ) -> Option<ElementHandle> {
        info!(
            "Text/role search started: texts={:?}, role={:?}, test_ids={:?}, exact={} (timeout {}ms)",
            query.texts,
            query.role,
            query.test_ids,
            query.exact_match,
            total_timeout.as_millis()
        );
        let descriptors = text_or_role_descriptors(query);
        if descriptors.is_empty() {
            warn!("Text/role search called without texts, role or test ids");
            return None;
        }

        let min_attempt = Duration::from_millis(self.config.text_min_attempt_ms);
        let found = self
            .search(&descriptors, total_timeout, min_attempt, true)
            .await;
        if found.is_none() {
            error!("No element matched any text/role/test-id candidate");
        }
        found
    }

    async fn search(
        &mut self,
        descriptors: &[Descriptor],
        total_timeout: Duration,
        min_attempt: Duration,
        confirm_count: bool,
    ) -> Option<ElementHandle> {
        let budget = SearchBudget::start(total_timeout, descriptors.len(), min_attempt);
        debug!(
            "{} attempts, up to {}ms each",
            descriptors.len(),
            budget.per_attempt().as_millis()
        );

        for (index, descriptor) in descriptors.iter().enumerate() {
            let Some(timeout) = budget.next_attempt() else {
                warn!(
                    "Search budget of {}ms exhausted after {} of {} candidates",
                    budget.total().as_millis(),
                    index,
                    descriptors.len()
                );
                return None;
            };

            if !self.session.is_open().await {
                error!("Page closed during element search");
                return None;
            }

            debug!(
                "Attempt {}/{}: {} (timeout {}ms)",
                index + 1,
                descriptors.len(),
                descriptor,
                timeout.as_millis()
            );

            match self.attempt(descriptor, timeout, confirm_count).await {
                Attempt::Found(handle) => {
                    info!("Element found: {}", descriptor);
                    return Some(handle);
                }
                Attempt::Miss => continue,
                Attempt::Abort => return None,
            }
        }

        None
    }

    async fn attempt(
        &mut self,
        descriptor: &Descriptor,
        timeout: Duration,
        confirm_count: bool,
    ) -> Attempt {
        let handle = match self.session.wait_for_visible(descriptor, timeout).await {
            Ok(handle) => handle,
            Err(e) => return self.classify(descriptor, e),
        };

        if !confirm_count {
            return Attempt::Found(handle);
        }

        // The element can vanish between the visibility wait and now.
        match self.session.count(descriptor).await {
            Ok(0) => {
                warn!("{} was visible but is gone now (0 matches)", descriptor);
                Attempt::Miss
            }
            Ok(count) => {
                debug!("{} matched {} elements, using the first", descriptor, count);
                Attempt::Found(handle)
            }
            Err(e) => self.classify(descriptor, e),
        }
    }

    fn classify(&self, descriptor: &Descriptor, err: SessionError) -> Attempt {
        match err.kind() {
            ErrorKind::NotFound => {
                debug!("{} timed out", descriptor);
                Attempt::Miss
            }
            ErrorKind::SessionClosed => {
                error!("Session closed while searching for {}: {}", descriptor, err);
                Attempt::Abort
            }
            ErrorKind::Unexpected => {
                error!(
                    "Unexpected error while searching for {} [{}]: {:?}",
                    descriptor,
                    err.code(),
                    err
                );
                Attempt::Miss
            }
        }
    }
}
