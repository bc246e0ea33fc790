pub mod calendar;
pub mod json_api;
pub mod web;

use chrono::{Duration as ChronoDuration, Utc};
use evcal_common::event::EventRecord;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const CSV_FILE: &str = "google_calendar_export.csv";
pub const ICS_FILE: &str = "events.ics";
pub const COMPACT_JSON_FILE: &str = "events_compact.json";
pub const DETAIL_JSON_FILE: &str = "events_detail.json";
pub const WEEKLY_HTML_FILE: &str = "weekly.html";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Encoding error: {0}")]
    Encoding(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default = "default_calendar_name")]
    pub calendar_name: String,
    /// Assumed length of events; posts rarely state an end time.
    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: i64,
    #[serde(default = "default_timezone")]
    pub timezone: Option<String>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            calendar_name: default_calendar_name(),
            default_duration_minutes: default_duration_minutes(),
            timezone: default_timezone(),
        }
    }
}

fn default_calendar_name() -> String {
    "VRChat Events".to_string()
}

fn default_duration_minutes() -> i64 {
    60
}

fn default_timezone() -> Option<String> {
    Some("Asia/Tokyo".to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedFiles {
    pub csv: PathBuf,
    pub ics: PathBuf,
    pub compact_json: PathBuf,
    pub detail_json: PathBuf,
    pub weekly_html: PathBuf,
}

/// Writes every output format into one directory under fixed names.
pub struct Publisher {
    dir: PathBuf,
    config: PublishConfig,
}

impl Publisher {
    pub fn new(dir: impl Into<PathBuf>, config: PublishConfig) -> Self {
        Self {
            dir: dir.into(),
            config,
        }
    }

    pub async fn publish(&self, events: &[EventRecord]) -> Result<PublishedFiles, PublishError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| PublishError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let now = Utc::now();
        let duration = ChronoDuration::minutes(self.config.default_duration_minutes);

        let csv = self
            .write(CSV_FILE, calendar::render_csv(events, duration)?)
            .await?;
        let ics_options = calendar::IcsOptions {
            calendar_name: self.config.calendar_name.clone(),
            duration,
            timezone: self.config.timezone.clone(),
            generated_at: now,
        };
        let ics = self
            .write(ICS_FILE, calendar::render_ics(events, &ics_options))
            .await?;
        let compact_json = self
            .write(COMPACT_JSON_FILE, json_api::render_compact(events)?)
            .await?;
        let detail_json = self
            .write(DETAIL_JSON_FILE, json_api::render_detail(events, now)?)
            .await?;
        let weekly_html = self
            .write(
                WEEKLY_HTML_FILE,
                web::render_weekly(events, &self.config.calendar_name),
            )
            .await?;

        info!("Published {} events to {:?}", events.len(), self.dir);
        Ok(PublishedFiles {
            csv,
            ics,
            compact_json,
            detail_json,
            weekly_html,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write(&self, name: &str, contents: String) -> Result<PathBuf, PublishError> {
        let path = self.dir.join(name);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|source| PublishError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}
