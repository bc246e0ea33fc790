use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s<>()]+").expect("valid regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlExpansionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for UrlExpansionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            hosts: default_hosts(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_hosts() -> Vec<String> {
    ["t.co", "bit.ly", "tinyurl.com", "goo.gl", "ow.ly", "buff.ly"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_timeout_ms() -> u64 {
    5000
}

/// Follows redirects of known link shorteners.
pub struct UrlExpander {
    client: reqwest::Client,
    hosts: Vec<String>,
    cache: HashMap<String, String>,
}

impl UrlExpander {
    pub fn new(config: &UrlExpansionConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            client,
            hosts: config.hosts.clone(),
            cache: HashMap::new(),
        })
    }

    pub fn is_shortened(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
            .is_some_and(|host| self.hosts.iter().any(|h| h.eq_ignore_ascii_case(&host)))
    }

    /// Final URL after redirects; the input on any failure.
    pub async fn expand(&mut self, url: &str) -> String {
        if !self.is_shortened(url) {
            return url.to_string();
        }
        if let Some(hit) = self.cache.get(url) {
            return hit.clone();
        }
        let expanded = match self.client.head(url).send().await {
            Ok(response) => response.url().to_string(),
            Err(e) => {
                warn!("Could not expand {}: {}", url, e);
                url.to_string()
            }
        };
        debug!("Expanded {} -> {}", url, expanded);
        self.cache.insert(url.to_string(), expanded.clone());
        expanded
    }

    /// Replace every shortened URL in `text` with its expansion.
    pub async fn expand_text(&mut self, text: &str) -> String {
        let urls: Vec<String> = find_urls(text)
            .into_iter()
            .filter(|u| self.is_shortened(u))
            .collect();
        let mut out = text.to_string();
        for url in urls {
            let expanded = self.expand(&url).await;
            if expanded != url {
                out = out.replace(&url, &expanded);
            }
        }
        out
    }
}

pub fn find_urls(text: &str) -> Vec<String> {
    URL_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}
