use crate::session::ChromiumSession;
use async_trait::async_trait;
use evcal_engine::config::schema::BrowserConfig;
use evcal_engine::session::{PageSession, SessionError, SessionLauncher};

/// Starts a separate browser process per session.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    config: BrowserConfig,
}

impl ChromiumLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    /// Same configuration with the window shown.
    pub fn visible(mut self) -> Self {
        self.config.headless = false;
        self
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn PageSession>, SessionError> {
        let session = ChromiumSession::launch(&self.config).await?;
        Ok(Box::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_overrides_headless() {
        let launcher = ChromiumLauncher::new(BrowserConfig::default());
        assert!(launcher.config().headless);
        assert!(!launcher.visible().config().headless);
    }
}
