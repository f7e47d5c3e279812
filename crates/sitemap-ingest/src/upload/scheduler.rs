//! Chunk partitioning and windowed dispatch
//!
//! A batch is cut into fixed-size chunks in index order. Chunks are sent in
//! windows of at most `concurrency_limit` concurrent submissions; a window
//! must fully drain before the next one opens.

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use sitemap_common::Record;
use tracing::{error, info, instrument};

use super::progress::ProgressReporter;
use super::worker::UploadWorker;
use crate::error::{IngestError, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 5;

/// Contiguous slice of a batch submitted as one unit
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub index: usize,
    pub records: &'a [Record],
    /// Set on the highest-index chunk only
    pub is_final: bool,
}

/// When the final-flagged chunk is dispatched relative to its window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalChunkPolicy {
    /// Hold the final chunk until every other chunk of its window has
    /// committed, so the final signal always arrives last.
    #[default]
    AfterWindowDrains,
    /// Dispatch the final chunk together with its window. The store may see
    /// the final signal before lower-index chunks of the same window commit.
    Concurrent,
}

impl std::str::FromStr for FinalChunkPolicy {
    type Err = IngestError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "after_window_drains" | "serialized" => Ok(FinalChunkPolicy::AfterWindowDrains),
            "concurrent" => Ok(FinalChunkPolicy::Concurrent),
            _ => Err(IngestError::config(format!("Invalid final chunk policy: {}", s))),
        }
    }
}

/// Split `records` into `ceil(len / chunk_size)` chunks; the last is final.
pub fn partition(records: &[Record], chunk_size: usize) -> Vec<Chunk<'_>> {
    let chunk_size = chunk_size.max(1);
    let total_chunks = records.len().div_ceil(chunk_size);

    records
        .chunks(chunk_size)
        .enumerate()
        .map(|(index, slice)| Chunk {
            index,
            records: slice,
            is_final: index + 1 == total_chunks,
        })
        .collect()
}

/// Dispatches a batch's chunks through an [`UploadWorker`]
pub struct ChunkScheduler {
    worker: UploadWorker,
    chunk_size: usize,
    concurrency_limit: usize,
    final_policy: FinalChunkPolicy,
}

impl ChunkScheduler {
    pub fn new(
        worker: UploadWorker,
        chunk_size: usize,
        concurrency_limit: usize,
        final_policy: FinalChunkPolicy,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(IngestError::config("chunk size must be greater than 0"));
        }
        if concurrency_limit == 0 {
            return Err(IngestError::config("concurrency limit must be greater than 0"));
        }

        Ok(Self {
            worker,
            chunk_size,
            concurrency_limit,
            final_policy,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub fn worker(&self) -> &UploadWorker {
        &self.worker
    }

    /// Deliver every record of the batch for `group`.
    ///
    /// Returns the number of records committed. On the first irrecoverable
    /// chunk failure no further window is opened and the error names the
    /// failing chunk. Chunks already committed stay committed.
    #[instrument(skip(self, records, progress), fields(total = records.len()))]
    pub async fn run(
        &self,
        group: &str,
        records: &[Record],
        progress: &mut ProgressReporter<'_>,
    ) -> Result<usize> {
        let chunks = partition(records, self.chunk_size);
        info!(
            chunks = chunks.len(),
            chunk_size = self.chunk_size,
            concurrency_limit = self.concurrency_limit,
            "Dispatching chunks"
        );

        for window in chunks.chunks(self.concurrency_limit) {
            if let Err(err) = self.run_window(group, window, progress).await {
                error!(
                    chunk_index = ?err.chunk_index(),
                    processed = progress.processed(),
                    error = %err,
                    "Chunked upload aborted"
                );
                return Err(err);
            }
        }

        Ok(progress.processed())
    }

    async fn run_window(
        &self,
        group: &str,
        window: &[Chunk<'_>],
        progress: &mut ProgressReporter<'_>,
    ) -> Result<()> {
        let hold_final = self.final_policy == FinalChunkPolicy::AfterWindowDrains && window.len() > 1;
        let (held, dispatched) = match window.split_last() {
            Some((last, rest)) if hold_final && last.is_final => (Some(last), rest),
            _ => (None, window),
        };

        let mut in_flight: FuturesUnordered<_> = dispatched
            .iter()
            .map(|chunk| self.worker.submit_chunk(group, chunk))
            .collect();

        // Drain the whole window even after a failure; the submissions are
        // already on the wire and their successes still count.
        let mut failure: Option<IngestError> = None;
        while let Some(result) = in_flight.next().await {
            match result {
                Ok(count) => {
                    progress.record_completed(count);
                },
                Err(err) => {
                    let lower = match &failure {
                        Some(current) => err.chunk_index() < current.chunk_index(),
                        None => true,
                    };
                    if lower {
                        failure = Some(err);
                    }
                },
            }
        }

        if let Some(err) = failure {
            return Err(err);
        }

        if let Some(final_chunk) = held {
            let count = self.worker.submit_chunk(group, final_chunk).await?;
            progress.record_completed(count);
        }

        Ok(())
    }
}
