use crate::cdp::CdpClient;
use crate::inject::{call_locator, evaluate};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, InsertTextParams,
};
use chromiumoxide::layout::Point;
use chromiumoxide::page::ScreenshotParams;
use evcal_common::descriptor::{Descriptor, ElementHandle};
use evcal_engine::config::schema::BrowserConfig;
use evcal_engine::session::{NavigationResult, PageSession, SessionError};
use serde_json::{Value, json};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Interval between visibility checks while waiting for an element.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run `check` until it yields a value, sleeping between tries.
///
/// A check still running at `deadline` is dropped along with any retries it
/// was making.
async fn poll_until<T, F, Fut>(deadline: Instant, mut check: F) -> Result<T, SessionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, SessionError>>,
{
    loop {
        match tokio::time::timeout_at(deadline, check()).await {
            Err(_) => return Err(SessionError::Timeout),
            Ok(Err(e)) => return Err(e),
            Ok(Ok(Some(found))) => return Ok(found),
            Ok(Ok(None)) => {}
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(SessionError::Timeout);
        }
        tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
    }
}

/// One Chromium page driven over CDP.
pub struct ChromiumSession {
    client: Option<CdpClient>,
}

impl ChromiumSession {
    pub async fn launch(config: &BrowserConfig) -> Result<Self, SessionError> {
        info!("Launching Chromium session...");
        let client = CdpClient::launch(config).await?;
        Ok(Self {
            client: Some(client),
        })
    }

    pub fn client(&self) -> Option<&CdpClient> {
        self.client.as_ref()
    }

    fn page(&self) -> Result<&chromiumoxide::Page, SessionError> {
        self.client
            .as_ref()
            .map(|c| &c.page)
            .ok_or(SessionError::SessionClosed)
    }

    async fn navigation_result(&self) -> Result<NavigationResult, SessionError> {
        let page = self.page()?;
        let title = page.get_title().await.unwrap_or_default().unwrap_or_default();
        let url = page
            .url()
            .await
            .map_err(|e| SessionError::Navigation(e.to_string()))?
            .unwrap_or_default();
        Ok(NavigationResult { url, title })
    }

    async fn find_visible(&self, descriptor: &Value) -> Result<Option<u32>, SessionError> {
        let found = call_locator(self.page()?, "find", std::slice::from_ref(descriptor)).await?;
        Ok(found.as_u64().and_then(|id| u32::try_from(id).ok()))
    }

    async fn key_event(&self, kind: DispatchKeyEventType, key: &str) -> Result<(), SessionError> {
        let event = DispatchKeyEventParams::builder()
            .r#type(kind)
            .key(key)
            .build()
            .map_err(|e| SessionError::Other(format!("Failed to build key event: {:?}", e)))?;
        self.page()?
            .execute(event)
            .await
            .map_err(|e| SessionError::from_driver_message(format!("Key event failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn is_open(&self) -> bool {
        match self.page() {
            Ok(page) => page.url().await.is_ok(),
            Err(_) => false,
        }
    }

    async fn wait_for_visible(
        &mut self,
        descriptor: &Descriptor,
        timeout: Duration,
    ) -> Result<ElementHandle, SessionError> {
        let wire = serde_json::to_value(descriptor)?;
        let deadline = Instant::now() + timeout;
        let this: &Self = self;
        let wire = &wire;
        let id = poll_until(deadline, move || this.find_visible(wire)).await?;
        debug!("{} is visible as element {}", descriptor, id);
        Ok(ElementHandle {
            id,
            descriptor: descriptor.clone(),
        })
    }

    async fn count(&mut self, descriptor: &Descriptor) -> Result<usize, SessionError> {
        let wire = serde_json::to_value(descriptor)?;
        let count = call_locator(self.page()?, "count", &[wire]).await?;
        Ok(count.as_u64().unwrap_or_default() as usize)
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, SessionError> {
        info!("Navigating to: {}", url);
        let page = self.page()?;
        page.goto(url)
            .await
            .map_err(|e| SessionError::Navigation(e.to_string()))?;
        self.navigation_result().await
    }

    async fn fill(&mut self, element: &ElementHandle, text: &str) -> Result<(), SessionError> {
        let page = self.page()?;
        let focused = call_locator(page, "focus", &[json!(element.id)]).await?;
        if focused != Value::Bool(true) {
            return Err(SessionError::ElementStale { id: element.id });
        }
        // Typed input reaches framework event handlers; setting `value` does not.
        page.execute(InsertTextParams::new(text))
            .await
            .map_err(|e| SessionError::from_driver_message(format!("Text input failed: {}", e)))?;
        Ok(())
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), SessionError> {
        let page = self.page()?;
        let center = call_locator(page, "center", &[json!(element.id)]).await?;
        let (Some(x), Some(y)) = (
            center.get("x").and_then(Value::as_f64),
            center.get("y").and_then(Value::as_f64),
        ) else {
            return Err(SessionError::ElementStale { id: element.id });
        };
        page.click(Point { x, y })
            .await
            .map_err(|e| SessionError::from_driver_message(format!("Click failed: {}", e)))?;
        Ok(())
    }

    async fn press(&mut self, element: &ElementHandle, key: &str) -> Result<(), SessionError> {
        let focused = call_locator(self.page()?, "focus", &[json!(element.id)]).await?;
        if focused != Value::Bool(true) {
            return Err(SessionError::ElementStale { id: element.id });
        }
        self.key_event(DispatchKeyEventType::KeyDown, key).await?;
        self.key_event(DispatchKeyEventType::KeyUp, key).await
    }

    async fn text_content(&mut self, element: &ElementHandle) -> Result<String, SessionError> {
        match call_locator(self.page()?, "text", &[json!(element.id)]).await? {
            Value::String(text) => Ok(text),
            _ => Err(SessionError::ElementStale { id: element.id }),
        }
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value, SessionError> {
        evaluate(self.page()?, script).await
    }

    async fn content(&mut self) -> Result<String, SessionError> {
        self.page()?
            .content()
            .await
            .map_err(|e| SessionError::from_driver_message(format!("Reading HTML failed: {}", e)))
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, SessionError> {
        self.page()?
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|e| SessionError::from_driver_message(format!("Screenshot failed: {}", e)))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if let Some(client) = self.client.take() {
            client.close().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn stalled_check_is_cut_off_at_deadline() {
        let started = Instant::now();
        let deadline = started + Duration::from_millis(500);
        let result: Result<u32, _> = poll_until(deadline, || async {
            // Slower than any evaluation timeout a slice could afford.
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(Some(1))
        })
        .await;
        assert!(result.unwrap_err().is_timeout());
        assert_eq!(started.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_found() {
        let started = Instant::now();
        let counter = AtomicU32::new(0);
        let tries = &counter;
        let found = poll_until(started + Duration::from_secs(1), move || async move {
            let n = tries.fetch_add(1, Ordering::SeqCst);
            Ok((n == 2).then_some(7u32))
        })
        .await
        .unwrap();
        assert_eq!(found, 7);
        assert_eq!(started.elapsed(), POLL_INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn misses_time_out_at_deadline() {
        let started = Instant::now();
        let result: Result<u32, _> =
            poll_until(started + Duration::from_millis(250), || async { Ok(None) }).await;
        assert!(result.unwrap_err().is_timeout());
        assert_eq!(started.elapsed(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn check_errors_pass_through() {
        let result: Result<u32, _> = poll_until(Instant::now() + Duration::from_secs(1), || async {
            Err(SessionError::SessionClosed)
        })
        .await;
        assert!(matches!(result, Err(SessionError::SessionClosed)));
    }
}
