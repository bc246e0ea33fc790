use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_base_ms")]
    pub base_ms: u64,
    /// Upper bound of the uniform jitter added to `base_ms`.
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_ms: default_base_ms(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_base_ms() -> u64 {
    600
}

fn default_jitter_ms() -> u64 {
    300
}

/// Human-like pauses between page interactions.
#[derive(Debug, Clone, Default)]
pub struct Pacer {
    config: PacingConfig,
}

impl Pacer {
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    /// A pacer that never sleeps.
    pub fn disabled() -> Self {
        Self {
            config: PacingConfig {
                enabled: false,
                ..PacingConfig::default()
            },
        }
    }

    /// Next pause length: `base + uniform(0, jitter)`.
    pub fn delay(&self) -> Duration {
        if !self.config.enabled {
            return Duration::ZERO;
        }
        let jitter = if self.config.jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.config.jitter_ms)
        };
        Duration::from_millis(self.config.base_ms + jitter)
    }

    pub async fn pause(&self) {
        let delay = self.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_stays_within_jitter_window() {
        let pacer = Pacer::new(PacingConfig {
            enabled: true,
            base_ms: 100,
            jitter_ms: 50,
        });
        for _ in 0..200 {
            let ms = pacer.delay().as_millis();
            assert!((100..=150).contains(&ms), "delay {ms}ms out of range");
        }
    }

    #[test]
    fn disabled_pacer_never_waits() {
        assert_eq!(Pacer::disabled().delay(), Duration::ZERO);
    }
}
