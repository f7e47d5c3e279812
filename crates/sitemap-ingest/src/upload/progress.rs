//! Per-call progress accounting

use sitemap_common::ProgressSnapshot;
use tracing::trace;

/// Callback invoked with a fresh snapshot after each completed chunk
pub type ProgressCallback<'a> = Box<dyn FnMut(ProgressSnapshot) + Send + 'a>;

/// Accumulates completed-record counts for one ingestion call.
///
/// Counts advance on chunk completion, never on dispatch, and never on
/// failure.
pub struct ProgressReporter<'a> {
    processed: usize,
    total: usize,
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(total: usize) -> Self {
        Self {
            processed: 0,
            total,
            callback: None,
        }
    }

    pub fn with_callback(total: usize, callback: impl FnMut(ProgressSnapshot) + Send + 'a) -> Self {
        Self {
            processed: 0,
            total,
            callback: Some(Box::new(callback)),
        }
    }

    /// Advance by one completed chunk of `count` records and notify.
    pub fn record_completed(&mut self, count: usize) -> ProgressSnapshot {
        self.processed += count;
        let snapshot = self.snapshot();
        trace!(processed = snapshot.processed, total = snapshot.total, "Progress");

        if let Some(callback) = self.callback.as_mut() {
            callback(snapshot);
        }
        snapshot
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::new(self.processed, self.total)
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn total(&self) -> usize {
        self.total
    }
}
