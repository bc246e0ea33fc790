use crate::collect::pacing::PacingConfig;
use crate::integrate::dedup::DedupRules;
use crate::integrate::recurrence::RecurrenceRules;
use crate::process::extractor::ExtractionRules;
use crate::process::url_expander::UrlExpansionConfig;
use crate::process::validator::EventSchema;
use crate::publish::PublishConfig;
use crate::resolution::ResolverConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvcalConfig {
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub scraping: ScrapingConfig,
    #[serde(default)]
    pub url_expansion: UrlExpansionConfig,
    #[serde(default)]
    pub extraction: ExtractionRules,
    #[serde(default)]
    pub schema: EventSchema,
    #[serde(default)]
    pub dedup: DedupRules,
    #[serde(default)]
    pub recurrence: RecurrenceRules,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// A scraping target: a live search query or a list of accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    Search {
        query: String,
        #[serde(default)]
        max_posts: Option<usize>,
    },
    List {
        list_url: String,
        #[serde(default)]
        max_members: Option<usize>,
    },
}

impl Target {
    pub fn label(&self) -> &str {
        match self {
            Target::Search { query, .. } => query,
            Target::List { list_url, .. } => list_url,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_search_path")]
    pub search_path: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            login_path: default_login_path(),
            search_path: default_search_path(),
        }
    }
}

fn default_base_url() -> String {
    "https://x.com".to_string()
}

fn default_login_path() -> String {
    "/i/flow/login".to_string()
}

fn default_search_path() -> String {
    "/search".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    /// Overrides the browser binary; `CHROME_BIN` is consulted when unset.
    #[serde(default)]
    pub executable: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            user_agent: default_user_agent(),
            locale: default_locale(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            executable: None,
        }
    }
}

fn default_headless() -> bool {
    true
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36".to_string()
}

fn default_locale() -> String {
    "ja-JP".to_string()
}

fn default_viewport_width() -> u32 {
    1920
}

fn default_viewport_height() -> u32 {
    1080
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_raw_dir")]
    pub raw_dir: PathBuf,
    #[serde(default = "default_validated_dir")]
    pub validated_dir: PathBuf,
    #[serde(default = "default_integrated_dir")]
    pub integrated_dir: PathBuf,
    #[serde(default = "default_publish_dir")]
    pub publish_dir: PathBuf,
    #[serde(default = "default_debug_dir")]
    pub debug_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: default_raw_dir(),
            validated_dir: default_validated_dir(),
            integrated_dir: default_integrated_dir(),
            publish_dir: default_publish_dir(),
            debug_dir: default_debug_dir(),
        }
    }
}

fn default_raw_dir() -> PathBuf {
    PathBuf::from("data/raw_scraped_data")
}

fn default_validated_dir() -> PathBuf {
    PathBuf::from("data/validated_events")
}

fn default_integrated_dir() -> PathBuf {
    PathBuf::from("data/integrated_events")
}

fn default_publish_dir() -> PathBuf {
    PathBuf::from("data/published_outputs")
}

fn default_debug_dir() -> PathBuf {
    PathBuf::from("data/debug_data")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingConfig {
    /// Upper bound on scroll rounds per target.
    #[serde(default = "default_max_scrolls")]
    pub max_scrolls: usize,
    /// Used when a search target sets no `max_posts`.
    #[serde(default = "default_max_posts")]
    pub default_max_posts: usize,
    #[serde(default = "default_scroll_settle_ms")]
    pub scroll_settle_ms: u64,
    #[serde(default = "default_first_item_timeout_ms")]
    pub first_item_timeout_ms: u64,
    #[serde(default = "default_login_step_timeout_ms")]
    pub login_step_timeout_ms: u64,
    #[serde(default = "default_login_confirm_timeout_ms")]
    pub login_confirm_timeout_ms: u64,
    /// How long to look for an optional login step before moving on.
    #[serde(default = "default_challenge_probe_ms")]
    pub challenge_probe_ms: u64,
    /// Skip the login flow entirely (public pages only).
    #[serde(default)]
    pub skip_login: bool,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            max_scrolls: default_max_scrolls(),
            default_max_posts: default_max_posts(),
            scroll_settle_ms: default_scroll_settle_ms(),
            first_item_timeout_ms: default_first_item_timeout_ms(),
            login_step_timeout_ms: default_login_step_timeout_ms(),
            login_confirm_timeout_ms: default_login_confirm_timeout_ms(),
            challenge_probe_ms: default_challenge_probe_ms(),
            skip_login: false,
        }
    }
}

fn default_max_scrolls() -> usize {
    200
}

fn default_max_posts() -> usize {
    100
}

fn default_scroll_settle_ms() -> u64 {
    1500
}

fn default_first_item_timeout_ms() -> u64 {
    30000
}

fn default_login_step_timeout_ms() -> u64 {
    15000
}

fn default_login_confirm_timeout_ms() -> u64 {
    25000
}

fn default_challenge_probe_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
