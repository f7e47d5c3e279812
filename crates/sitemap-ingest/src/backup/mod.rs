//! Two-tier backup store for submitted batches
//!
//! Every batch is snapshotted before any network call. Snapshots land in a
//! capped, always-available ephemeral tier and, best-effort, in an uncapped
//! durable tier. [`BackupRepository`] is the only type callers talk to; it
//! owns the capping and the "durable failures are warnings" rule.

use async_trait::async_trait;
use sitemap_common::BackupRecord;
use std::path::PathBuf;
use thiserror::Error;

pub mod json_file;
pub mod memory;
pub mod repository;
pub mod sqlite;

pub use json_file::JsonFileFastStore;
pub use memory::MemoryFastStore;
pub use repository::{BackupRepository, DEFAULT_EPHEMERAL_CAPACITY};
pub use sqlite::SqliteDurableStore;

/// Failure inside a single backup tier
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(
        "Backup file {} is corrupt ({source}); move it aside to start a fresh backup log",
        .path.display()
    )]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to acquire store lock: {0}")]
    Lock(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Ephemeral tier: the whole log is read and written as one list.
#[async_trait]
pub trait FastStore: Send + Sync {
    /// Entries in append order, oldest first.
    async fn load(&self) -> Result<Vec<BackupRecord>, StoreError>;

    /// Replace the stored list.
    async fn save(&self, entries: &[BackupRecord]) -> Result<(), StoreError>;
}

/// Durable tier: an uncapped keyed log.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn put(&self, record: &BackupRecord) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<BackupRecord>, StoreError>;

    /// Every stored entry, newest first.
    async fn all(&self) -> Result<Vec<BackupRecord>, StoreError>;
}
