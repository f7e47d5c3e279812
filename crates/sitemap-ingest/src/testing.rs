//! Test doubles for the remote store, retry delay and backup tiers
#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use sitemap_common::{BackupRecord, Record};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::backup::{DurableStore, FastStore, StoreError};
use crate::remote::{RemoteError, RemoteStore};
use crate::upload::Delay;

/// `n` distinct canonical records
pub fn records(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            Record::new(
                format!("https://example.com/page-{i}"),
                format!("Page {i}"),
                format!("Description of page {i}"),
            )
        })
        .collect()
}

/// A chunk submission that the mock accepted
#[derive(Debug, Clone)]
pub struct ChunkCall {
    pub group: String,
    pub first_address: String,
    pub len: usize,
    pub is_final: bool,
}

#[derive(Default)]
struct MockState {
    chunk_failures: HashMap<String, u32>,
    chunk_attempts: HashMap<String, u32>,
    chunk_calls: Vec<ChunkCall>,
    batch_failures: u32,
    batch_calls: Vec<(String, Vec<Record>)>,
    in_flight: usize,
    max_in_flight: usize,
}

/// Scriptable in-process remote store.
///
/// Chunks are identified by the address of their first record. Each
/// submission yields to the executor once per ten records so that a window
/// of submissions genuinely overlaps.
#[derive(Default)]
pub struct MockRemoteStore {
    state: Mutex<MockState>,
}

impl MockRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` submissions of the chunk starting at `first_address`.
    pub fn fail_chunk(&self, first_address: &str, times: u32) {
        self.state
            .lock()
            .unwrap()
            .chunk_failures
            .insert(first_address.to_string(), times);
    }

    /// Fail the next `times` single-shot batch submissions.
    pub fn fail_batches(&self, times: u32) {
        self.state.lock().unwrap().batch_failures = times;
    }

    pub fn chunk_attempts(&self, first_address: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .chunk_attempts
            .get(first_address)
            .copied()
            .unwrap_or(0)
    }

    /// Accepted chunk submissions in completion order
    pub fn chunk_calls(&self) -> Vec<ChunkCall> {
        self.state.lock().unwrap().chunk_calls.clone()
    }

    pub fn batch_calls(&self) -> Vec<(String, Vec<Record>)> {
        self.state.lock().unwrap().batch_calls.clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    async fn submit_batch(&self, group: &str, records: &[Record]) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        if state.batch_failures > 0 {
            state.batch_failures -= 1;
            return Err(RemoteError::Transport("connection reset".to_string()));
        }
        state.batch_calls.push((group.to_string(), records.to_vec()));
        Ok(())
    }

    async fn submit_chunk(
        &self,
        group: &str,
        records: &[Record],
        is_final: bool,
    ) -> Result<(), RemoteError> {
        let first_address = records.first().map(|r| r.address.clone()).unwrap_or_default();
        {
            let mut state = self.state.lock().unwrap();
            *state.chunk_attempts.entry(first_address.clone()).or_default() += 1;
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
        }

        for _ in 0..records.len() / 10 {
            tokio::task::yield_now().await;
        }

        let mut state = self.state.lock().unwrap();
        state.in_flight -= 1;

        if let Some(remaining) = state.chunk_failures.get_mut(&first_address) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(RemoteError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
        }

        state.chunk_calls.push(ChunkCall {
            group: group.to_string(),
            first_address,
            len: records.len(),
            is_final,
        });
        Ok(())
    }
}

/// Records requested waits and returns immediately
#[derive(Default)]
pub struct RecordingDelay {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingDelay {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn wait(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

/// Ephemeral tier that can be switched off
#[derive(Default)]
pub struct FlakyFastStore {
    entries: Mutex<Vec<BackupRecord>>,
    down: AtomicBool,
}

impl FlakyFastStore {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("ephemeral tier offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FastStore for FlakyFastStore {
    async fn load(&self) -> Result<Vec<BackupRecord>, StoreError> {
        self.check()?;
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn save(&self, entries: &[BackupRecord]) -> Result<(), StoreError> {
        self.check()?;
        *self.entries.lock().unwrap() = entries.to_vec();
        Ok(())
    }
}

/// Durable tier that always fails
#[derive(Default)]
pub struct BrokenDurableStore;

#[async_trait]
impl DurableStore for BrokenDurableStore {
    async fn put(&self, _record: &BackupRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("durable tier offline".to_string()))
    }

    async fn get(&self, _id: &str) -> Result<Option<BackupRecord>, StoreError> {
        Err(StoreError::Unavailable("durable tier offline".to_string()))
    }

    async fn all(&self) -> Result<Vec<BackupRecord>, StoreError> {
        Err(StoreError::Unavailable("durable tier offline".to_string()))
    }
}
