use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, EventJavascriptDialogOpening,
    HandleJavaScriptDialogParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled;
use chromiumoxide::{Browser, BrowserConfig as CdpConfig, Page};
use evcal_common::error::SessionError;
use evcal_engine::config::schema::BrowserConfig;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

/// Hides the most common automation tells before any page script runs.
const STEALTH_JS: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'languages', { get: () => ['ja-JP', 'ja', 'en-US', 'en'] });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
window.chrome = window.chrome || { runtime: {} };
"#;

pub struct CdpClient {
    pub browser: Browser,
    pub handler_task: JoinHandle<()>,
    pub page: Page,
    user_data_dir: PathBuf,
}

impl CdpClient {
    pub async fn launch(config: &BrowserConfig) -> Result<Self, SessionError> {
        let user_data_dir = fresh_user_data_dir()?;
        let mut builder = CdpConfig::builder()
            .no_sandbox()
            .user_data_dir(&user_data_dir)
            .window_size(config.viewport_width, config.viewport_height)
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--lang={}", config.locale))
            .arg(format!("--user-agent={}", config.user_agent));

        if config.headless {
            tracing::info!("Launching browser in headless mode");
        } else {
            tracing::info!("Launching browser in visible mode");
            builder = builder.with_head();
        }

        if let Some(executable) = &config.executable {
            tracing::info!("Using configured browser binary: {}", executable.display());
            builder = builder.chrome_executable(executable);
        } else if let Ok(chrome_bin) = std::env::var("CHROME_BIN") {
            tracing::info!("Using custom Chrome binary: {}", chrome_bin);
            builder = builder.chrome_executable(chrome_bin);
        }

        let cdp_config = builder
            .build()
            .map_err(|e| SessionError::Other(format!("Failed to build browser config: {}", e)))?;
        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| SessionError::Other(format!("Failed to launch browser: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(e) = h {
                    tracing::error!("Browser handler error (ignoring): {}", e);
                }
            }
            tracing::info!("Browser handler task ended");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SessionError::Other(format!("Failed to create page: {}", e)))?;

        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_JS))
            .await
            .map_err(|e| SessionError::Other(format!("Failed to install init script: {}", e)))?;

        let mut console_events = page
            .event_listener::<EventConsoleApiCalled>()
            .await
            .map_err(|e| SessionError::Other(format!("Failed to subscribe to console events: {}", e)))?;
        tokio::spawn(async move {
            while let Some(event) = console_events.next().await {
                let args: Vec<String> = event
                    .args
                    .iter()
                    .map(|arg| arg.description.clone().unwrap_or_else(|| "unknown".to_string()))
                    .collect();
                tracing::debug!("Browser console [{:?}]: {}", event.r#type, args.join(" "));
            }
        });

        // Alerts and confirms block the JS thread; accept them right away.
        let mut dialog_events = page
            .event_listener::<EventJavascriptDialogOpening>()
            .await
            .map_err(|e| SessionError::Other(format!("Failed to subscribe to dialog events: {}", e)))?;
        let dialog_page = page.clone();
        tokio::spawn(async move {
            while let Some(event) = dialog_events.next().await {
                tracing::info!("Accepting JavaScript dialog: {} ({:?})", event.message, event.r#type);
                if let Err(e) = dialog_page.execute(HandleJavaScriptDialogParams::new(true)).await {
                    tracing::error!("Failed to accept dialog: {}", e);
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
            page,
            user_data_dir,
        })
    }

    pub async fn close(mut self) -> Result<(), SessionError> {
        let closed = self
            .browser
            .close()
            .await
            .map_err(|e| SessionError::from_driver_message(format!("Error closing browser: {}", e)));
        if let Err(e) = self.handler_task.await {
            tracing::debug!("Browser handler task did not finish cleanly: {}", e);
        }
        if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
            tracing::debug!(
                "Failed to clean up user-data-dir {}: {}",
                self.user_data_dir.display(),
                e
            );
        }
        closed.map(|_| ())
    }
}

/// One throwaway profile per session.
fn fresh_user_data_dir() -> Result<PathBuf, SessionError> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| SessionError::Other(format!("System clock error: {}", e)))?
        .as_nanos();
    let unique = format!("evcal-chromium-profile-{}-{}", std::process::id(), nanos);
    let path = std::env::temp_dir().join(unique);
    std::fs::create_dir_all(&path)?;
    tracing::debug!("Using isolated user data dir: {}", path.display());
    Ok(path)
}
