use super::schema::EvcalConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load an explicit path when given, otherwise fall back to the default locations.
    pub async fn load(path: Option<&Path>) -> Result<EvcalConfig, ConfigError> {
        match path {
            Some(path) => Self::load_from(path).await,
            None => Self::load_default().await,
        }
    }

    /// Load from default locations:
    /// 1. ./evcal.yaml
    /// 2. ~/.evcal/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<EvcalConfig, ConfigError> {
        let local_config = PathBuf::from("./evcal.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".evcal").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(EvcalConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<EvcalConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        // An empty file is a valid "all defaults" config.
        if content.trim().is_empty() {
            return Ok(EvcalConfig::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
