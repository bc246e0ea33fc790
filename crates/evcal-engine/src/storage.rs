//! Timestamped JSON snapshots between pipeline stages.

use chrono::Local;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const RAW_PREFIX: &str = "all_raw_data";
pub const VALIDATED_PREFIX: &str = "validated_events";
pub const INTEGRATED_PREFIX: &str = "integrated_events";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed snapshot {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid snapshot pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// `<prefix>_<YYYYmmdd_HHMMSS>.json`
pub fn snapshot_name(prefix: &str) -> String {
    format!("{}_{}.json", prefix, Local::now().format("%Y%m%d_%H%M%S"))
}

/// One directory of snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn save<T: Serialize>(&self, prefix: &str, items: &[T]) -> Result<PathBuf, StorageError> {
        let path = self.dir.join(snapshot_name(prefix));
        self.save_to(&path, items).await?;
        Ok(path)
    }

    pub async fn save_to<T: Serialize>(&self, path: &Path, items: &[T]) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let json = serde_json::to_string_pretty(items).map_err(|source| StorageError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        tokio::fs::write(path, json)
            .await
            .map_err(|source| StorageError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        info!("Saved {} items to {:?}", items.len(), path);
        Ok(())
    }

    /// A missing file loads as an empty snapshot.
    pub async fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>, StorageError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Snapshot {:?} not found, treating as empty", path);
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|source| StorageError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Snapshot files for `prefix`, oldest first.
    pub fn list(&self, prefix: &str) -> Result<Vec<PathBuf>, StorageError> {
        let pattern = self.dir.join(format!("{}_*.json", glob::Pattern::escape(prefix)));
        let mut paths: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())?
            .filter_map(Result::ok)
            .collect();
        // The timestamp format sorts lexically.
        paths.sort();
        Ok(paths)
    }

    pub fn latest(&self, prefix: &str) -> Result<Option<PathBuf>, StorageError> {
        Ok(self.list(prefix)?.pop())
    }

    /// Every snapshot for `prefix`, concatenated in file order.
    pub async fn load_all<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>, StorageError> {
        let mut items = Vec::new();
        for path in self.list(prefix)? {
            items.extend(self.load::<T>(&path).await?);
        }
        Ok(items)
    }

    /// Contents of the newest snapshot, or empty when there is none.
    pub async fn load_latest<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>, StorageError> {
        match self.latest(prefix)? {
            Some(path) => self.load(&path).await,
            None => Ok(Vec::new()),
        }
    }
}
