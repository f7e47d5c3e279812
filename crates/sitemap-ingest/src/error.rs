//! Error types for the ingestion pipeline

use sitemap_common::CommonError;
use thiserror::Error;

use crate::backup::StoreError;
use crate::remote::RemoteError;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors surfaced to callers of the pipeline
#[derive(Error, Debug)]
pub enum IngestError {
    /// A record failed validation after canonicalization
    #[error("Invalid record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    /// A chunk exhausted its retries; fatal to the ingestion call
    #[error("Chunk {chunk_index} failed after {attempts} attempts: {source}")]
    ChunkSubmission {
        chunk_index: usize,
        attempts: u32,
        #[source]
        source: RemoteError,
    },

    /// A single-shot batch submission exhausted its retries
    #[error("Batch submission failed after {attempts} attempts: {source}")]
    BatchSubmission {
        attempts: u32,
        #[source]
        source: RemoteError,
    },

    /// The ephemeral backup tier rejected a write
    #[error("Backup write failed: {0}")]
    BackupWrite(#[source] StoreError),

    /// The ephemeral backup tier could not be read
    #[error("Backup read failed: {0}")]
    BackupRead(#[source] StoreError),

    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl IngestError {
    pub fn config(msg: impl Into<String>) -> Self {
        IngestError::Config(msg.into())
    }

    /// Index of the failing chunk, for chunk submission failures.
    pub fn chunk_index(&self) -> Option<usize> {
        match self {
            IngestError::ChunkSubmission { chunk_index, .. } => Some(*chunk_index),
            _ => None,
        }
    }
}
