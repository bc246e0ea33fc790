use async_trait::async_trait;
use evcal_common::descriptor::{Descriptor, ElementHandle};
pub use evcal_common::error::{ErrorKind, SessionError};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub url: String,
    pub title: String,
}

/// The capability interface every browser page implementation provides.
///
/// One value represents one page. It is owned by a single flow of control;
/// nothing here is shared between scraping targets.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Whether the page can still accept commands.
    async fn is_open(&self) -> bool;

    /// Wait up to `timeout` for an element matching `descriptor` to become visible.
    ///
    /// Returns [`SessionError::Timeout`] when nothing visible shows up in time.
    async fn wait_for_visible(
        &mut self,
        descriptor: &Descriptor,
        timeout: Duration,
    ) -> Result<ElementHandle, SessionError>;

    /// Number of elements currently matching `descriptor`.
    async fn count(&mut self, descriptor: &Descriptor) -> Result<usize, SessionError>;

    /// Navigate to a URL and wait for the DOM to load.
    async fn navigate(&mut self, _url: &str) -> Result<NavigationResult, SessionError> {
        Err(SessionError::NotSupported("navigate".into()))
    }

    /// Replace the value of an input element.
    async fn fill(&mut self, _element: &ElementHandle, _text: &str) -> Result<(), SessionError> {
        Err(SessionError::NotSupported("fill".into()))
    }

    async fn click(&mut self, _element: &ElementHandle) -> Result<(), SessionError> {
        Err(SessionError::NotSupported("click".into()))
    }

    /// Press a key while the element has focus.
    async fn press(&mut self, _element: &ElementHandle, _key: &str) -> Result<(), SessionError> {
        Err(SessionError::NotSupported("press".into()))
    }

    async fn text_content(&mut self, _element: &ElementHandle) -> Result<String, SessionError> {
        Err(SessionError::NotSupported("text_content".into()))
    }

    /// Evaluate a script in the page and return its JSON result.
    async fn evaluate(&mut self, _script: &str) -> Result<serde_json::Value, SessionError> {
        Err(SessionError::NotSupported("evaluate".into()))
    }

    /// Serialized HTML of the current document.
    async fn content(&mut self) -> Result<String, SessionError> {
        Err(SessionError::NotSupported("content".into()))
    }

    /// Full-page PNG screenshot.
    async fn screenshot(&mut self) -> Result<Vec<u8>, SessionError> {
        Err(SessionError::NotSupported("screenshot".into()))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Opens independent page sessions, one per scraping target.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn PageSession>, SessionError>;
}
