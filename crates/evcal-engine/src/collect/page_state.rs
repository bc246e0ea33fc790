use super::scripts;
use crate::session::{PageSession, SessionError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const MAX_STATE_NAME: usize = 100;

/// Files written for one captured page state.
#[derive(Debug, Clone, PartialEq)]
pub struct PageCapture {
    pub html: Option<PathBuf>,
    pub screenshot: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageAnalysis {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub inputs: usize,
    #[serde(default)]
    pub buttons: usize,
    #[serde(default)]
    pub test_ids: Vec<String>,
}

/// Saves HTML and screenshots of the page when a step goes wrong.
#[derive(Debug, Clone)]
pub struct PageStateRecorder {
    dir: PathBuf,
    enabled: bool,
}

impl PageStateRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `<state>_<timestamp>.html` and `.png`. Never fails the caller.
    pub async fn capture(&self, session: &mut dyn PageSession, state: &str) -> Option<PageCapture> {
        if !self.enabled {
            return None;
        }
        if !session.is_open().await {
            warn!("Skipping page capture '{}': session is closed", state);
            return None;
        }
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!("Cannot create debug directory {:?}: {}", self.dir, e);
            return None;
        }

        let stem = format!(
            "{}_{}",
            sanitize_state_name(state),
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );

        let html = match session.content().await {
            Ok(html) => write_file(self.dir.join(format!("{stem}.html")), html.as_bytes()).await,
            Err(e) => {
                warn!("Could not read page HTML for '{}': {}", state, e);
                None
            }
        };
        let screenshot = match session.screenshot().await {
            Ok(png) => write_file(self.dir.join(format!("{stem}.png")), &png).await,
            Err(e) => {
                warn!("Could not take screenshot for '{}': {}", state, e);
                None
            }
        };

        info!("Captured page state '{}' ({:?}, {:?})", state, html, screenshot);
        Some(PageCapture { html, screenshot })
    }

    /// Summarize the page structure (inputs, buttons, test ids).
    pub async fn analyze(session: &mut dyn PageSession) -> Result<PageAnalysis, SessionError> {
        let value = session.evaluate(scripts::ANALYZE_PAGE).await?;
        Ok(serde_json::from_value(value)?)
    }
}

async fn write_file(path: PathBuf, bytes: &[u8]) -> Option<PathBuf> {
    match tokio::fs::write(&path, bytes).await {
        Ok(()) => Some(path),
        Err(e) => {
            warn!("Failed to write {:?}: {}", path, e);
            None
        }
    }
}

/// Keep `[A-Za-z0-9_-]`, replace everything else with `_`, cap the length.
pub fn sanitize_state_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STATE_NAME)
        .collect();
    if cleaned.is_empty() {
        "page_state".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_and_truncates() {
        assert_eq!(sanitize_state_name("login failed: step/2"), "login_failed__step_2");
        assert_eq!(sanitize_state_name(&"x".repeat(150)).len(), 100);
        assert_eq!(sanitize_state_name(""), "page_state");
    }
}
