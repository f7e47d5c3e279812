//! Upload worker: one submission with bounded retry and linear backoff

use async_trait::async_trait;
use sitemap_common::Record;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::scheduler::Chunk;
use crate::error::{IngestError, Result};
use crate::remote::{RemoteError, RemoteStore};

/// Suspends between retry attempts.
///
/// Injected so tests can observe backoff without waiting on the clock.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Real wall-clock delay on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Retry budget for a submission.
///
/// A submission gets one initial attempt plus `max_retries` more; before
/// attempt `n + 1` the worker waits `n * base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Per-chunk policy: 3 retries, 500ms steps
    pub const fn chunked() -> Self {
        Self::new(3, Duration::from_millis(500))
    }

    /// Single-shot batch policy: 2 retries, 1s steps
    pub const fn direct() -> Self {
        Self::new(2, Duration::from_millis(1000))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::chunked()
    }
}

/// Performs submissions against the remote store
pub struct UploadWorker {
    remote: Arc<dyn RemoteStore>,
    policy: RetryPolicy,
    delay: Arc<dyn Delay>,
}

impl UploadWorker {
    pub fn new(remote: Arc<dyn RemoteStore>, policy: RetryPolicy, delay: Arc<dyn Delay>) -> Self {
        Self {
            remote,
            policy,
            delay,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Submit one chunk; returns its record count on success.
    pub async fn submit_chunk(&self, group: &str, chunk: &Chunk<'_>) -> Result<usize> {
        let remote = self.remote.as_ref();
        let (records, is_final) = (chunk.records, chunk.is_final);
        let outcome = self
            .retry(Some(chunk.index), move || {
                remote.submit_chunk(group, records, is_final)
            })
            .await;

        match outcome {
            Ok(attempts) => {
                debug!(
                    group = %group,
                    chunk_index = chunk.index,
                    attempts,
                    is_final = chunk.is_final,
                    "Chunk committed"
                );
                Ok(chunk.records.len())
            },
            Err((source, attempts)) => Err(IngestError::ChunkSubmission {
                chunk_index: chunk.index,
                attempts,
                source,
            }),
        }
    }

    /// Submit a whole batch through the single-shot path.
    pub async fn submit_batch(&self, group: &str, records: &[Record]) -> Result<usize> {
        let remote = self.remote.as_ref();
        match self.retry(None, move || remote.submit_batch(group, records)).await {
            Ok(_) => Ok(records.len()),
            Err((source, attempts)) => Err(IngestError::BatchSubmission { attempts, source }),
        }
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    ///
    /// Returns the number of attempts made, alongside the last error on
    /// failure.
    async fn retry<F, Fut>(
        &self,
        chunk_index: Option<usize>,
        mut op: F,
    ) -> std::result::Result<u32, (RemoteError, u32)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<(), RemoteError>>,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(()) => return Ok(attempt),
                Err(err) if attempt >= max_attempts => return Err((err, attempt)),
                Err(err) => {
                    let wait = self.policy.delay_after(attempt);
                    warn!(
                        chunk_index = ?chunk_index,
                        attempt,
                        max_attempts,
                        retry_in_ms = wait.as_millis() as u64,
                        error = %err,
                        "Submission attempt failed, retrying"
                    );
                    self.delay.wait(wait).await;
                    attempt += 1;
                },
            }
        }
    }
}
