//! Remote store seam
//!
//! The pipeline only needs two operations from the service that ultimately
//! holds the records: a single-shot batch submission and a per-chunk
//! submission flagged final or not.

use async_trait::async_trait;
use sitemap_common::Record;
use thiserror::Error;

pub mod endpoints;
pub mod http;

pub use http::HttpRemoteStore;

/// Failure reported by a remote store call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The request never produced a response
    #[error("transport error: {0}")]
    Transport(String),

    /// The store answered with a non-success status
    #[error("remote store returned {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => RemoteError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            },
            None => RemoteError::Transport(err.to_string()),
        }
    }
}

/// Operations the pipeline requires from the remote store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Submit a whole batch for `group` in one call.
    async fn submit_batch(&self, group: &str, records: &[Record]) -> Result<(), RemoteError>;

    /// Submit one chunk of a batch for `group`.
    ///
    /// `is_final` marks the highest-index chunk of the call.
    async fn submit_chunk(
        &self,
        group: &str,
        records: &[Record],
        is_final: bool,
    ) -> Result<(), RemoteError>;
}
