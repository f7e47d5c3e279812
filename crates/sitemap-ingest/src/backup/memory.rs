//! In-process ephemeral tier

use async_trait::async_trait;
use sitemap_common::BackupRecord;
use std::sync::Mutex;

use super::{FastStore, StoreError};

/// Ephemeral tier held in process memory
#[derive(Debug, Default)]
pub struct MemoryFastStore {
    entries: Mutex<Vec<BackupRecord>>,
}

impl MemoryFastStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FastStore for MemoryFastStore {
    async fn load(&self) -> Result<Vec<BackupRecord>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        Ok(entries.clone())
    }

    async fn save(&self, entries: &[BackupRecord]) -> Result<(), StoreError> {
        let mut stored = self
            .entries
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        *stored = entries.to_vec();
        Ok(())
    }
}
