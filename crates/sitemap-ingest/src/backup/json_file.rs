//! Ephemeral tier persisted as a single JSON document

use async_trait::async_trait;
use sitemap_common::BackupRecord;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::{FastStore, StoreError};

/// Ephemeral tier kept in one JSON file.
///
/// Writes go to a sibling temp file that is renamed over the existing file, so a
/// crash mid-write leaves the previous list intact.
#[derive(Debug, Clone)]
pub struct JsonFileFastStore {
    path: PathBuf,
}

impl JsonFileFastStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FastStore for JsonFileFastStore {
    async fn load(&self) -> Result<Vec<BackupRecord>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Vec::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| {
                warn!(path = %self.path.display(), error = %source, "Ephemeral backup file is unreadable");
                StoreError::Corrupt {
                    path: self.path.clone(),
                    source,
                }
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, entries: &[BackupRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
