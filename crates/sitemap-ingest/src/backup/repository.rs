//! Facade over the ephemeral and durable backup tiers

use sitemap_common::BackupRecord;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{DurableStore, FastStore};
use crate::error::{IngestError, Result};

/// Number of snapshots the ephemeral tier retains.
pub const DEFAULT_EPHEMERAL_CAPACITY: usize = 100;

/// Single entry point for backup reads and writes.
///
/// Ephemeral-tier failures on write are errors. Durable-tier failures are
/// logged and swallowed everywhere.
pub struct BackupRepository {
    fast: Arc<dyn FastStore>,
    durable: Option<Arc<dyn DurableStore>>,
    capacity: usize,
    // Serialises the ephemeral load/append/truncate/save cycle.
    write_lock: Mutex<()>,
}

impl BackupRepository {
    pub fn new(
        fast: Arc<dyn FastStore>,
        durable: Option<Arc<dyn DurableStore>>,
        capacity: usize,
    ) -> Self {
        Self {
            fast,
            durable,
            capacity: capacity.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a snapshot to both tiers.
    pub async fn write(&self, record: &BackupRecord) -> Result<()> {
        {
            let _guard = self.write_lock.lock().await;

            let mut entries = self.fast.load().await.map_err(IngestError::BackupWrite)?;
            entries.push(record.clone());
            if entries.len() > self.capacity {
                let evicted = entries.len() - self.capacity;
                entries.drain(..evicted);
                debug!(evicted, capacity = self.capacity, "Evicted oldest ephemeral backups");
            }
            self.fast.save(&entries).await.map_err(IngestError::BackupWrite)?;
        }

        if let Some(durable) = &self.durable {
            if let Err(err) = durable.put(record).await {
                warn!(
                    backup_id = %record.id,
                    error = %err,
                    "Durable backup write failed; ephemeral copy kept"
                );
            }
        }

        info!(
            backup_id = %record.id,
            group = %record.group,
            entries = record.entry_count,
            "Backup created"
        );
        Ok(())
    }

    /// Every known snapshot, merged by id and sorted newest first.
    ///
    /// The ephemeral copy wins when both tiers hold the same id.
    pub async fn read_all(&self) -> Result<Vec<BackupRecord>> {
        let ephemeral = self.fast.load().await;
        let durable = self.read_durable().await;

        let mut merged = match (ephemeral, durable) {
            (Ok(mut ephemeral), durable) => {
                // Newest appends first, so equal timestamps stay newest-first
                // through the stable sort below.
                ephemeral.reverse();
                let seen: HashSet<String> = ephemeral.iter().map(|b| b.id.clone()).collect();
                ephemeral.extend(
                    durable
                        .unwrap_or_default()
                        .into_iter()
                        .filter(|b| !seen.contains(&b.id)),
                );
                ephemeral
            },
            (Err(err), Some(durable)) => {
                warn!(error = %err, "Ephemeral backup read failed; using durable tier only");
                durable
            },
            (Err(err), None) => return Err(IngestError::BackupRead(err)),
        };

        merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(merged)
    }

    /// Look a snapshot up by id, ephemeral tier first.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<BackupRecord>> {
        match self.fast.load().await {
            Ok(entries) => {
                if let Some(found) = entries.into_iter().find(|b| b.id == id) {
                    return Ok(Some(found));
                }
            },
            Err(err) => {
                warn!(backup_id = %id, error = %err, "Ephemeral backup lookup failed");
            },
        }

        let Some(durable) = &self.durable else {
            return Ok(None);
        };

        match durable.get(id).await {
            Ok(found) => Ok(found),
            Err(err) => {
                warn!(backup_id = %id, error = %err, "Durable backup lookup failed");
                Ok(None)
            },
        }
    }

    /// `None` when the durable tier is absent or unreadable.
    async fn read_durable(&self) -> Option<Vec<BackupRecord>> {
        let durable = self.durable.as_ref()?;
        match durable.all().await {
            Ok(entries) => Some(entries),
            Err(err) => {
                warn!(error = %err, "Durable backup read failed");
                None
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::backup::{MemoryFastStore, SqliteDurableStore, StoreError};
    use crate::testing::{records, BrokenDurableStore, FlakyFastStore};

    fn snapshot(group: &str, timestamp: i64) -> BackupRecord {
        let mut backup = BackupRecord::snapshot(group, records(2));
        backup.timestamp = timestamp;
        backup
    }

    #[tokio::test]
    async fn test_ephemeral_tier_is_capped() {
        let fast = Arc::new(MemoryFastStore::new());
        let repo = BackupRepository::new(fast.clone(), None, DEFAULT_EPHEMERAL_CAPACITY);

        let written: Vec<BackupRecord> = (0..101).map(|i| snapshot("example.com", i)).collect();
        for backup in &written {
            repo.write(backup).await.unwrap();
        }

        let stored = fast.load().await.unwrap();
        assert_eq!(stored.len(), 100);
        assert_eq!(stored, written[1..].to_vec());
    }

    #[tokio::test]
    async fn test_105_writes_keep_all_in_durable_tier() {
        let fast = Arc::new(MemoryFastStore::new());
        let durable = Arc::new(SqliteDurableStore::open_in_memory().unwrap());
        let repo = BackupRepository::new(fast.clone(), Some(durable.clone()), 100);

        let written: Vec<BackupRecord> =
            (0..105).map(|i| snapshot("example.com", 1_000 + i)).collect();
        for backup in &written {
            repo.write(backup).await.unwrap();
        }

        let ephemeral = fast.load().await.unwrap();
        assert_eq!(ephemeral.len(), 100);
        for oldest in &written[..5] {
            assert!(ephemeral.iter().all(|b| b.id != oldest.id));
        }
        assert_eq!(durable.all().await.unwrap().len(), 105);

        // Merged view still sees every snapshot, newest first.
        let all = repo.read_all().await.unwrap();
        assert_eq!(all.len(), 105);
        assert_eq!(all[0].id, written[104].id);
        assert_eq!(all[104].id, written[0].id);
    }

    #[tokio::test]
    async fn test_read_all_without_durable_tier_returns_capped_set() {
        let repo = BackupRepository::new(
            Arc::new(MemoryFastStore::new()),
            Some(Arc::new(BrokenDurableStore)),
            100,
        );

        for i in 0..105 {
            repo.write(&snapshot("example.com", i)).await.unwrap();
        }

        let all = repo.read_all().await.unwrap();
        assert_eq!(all.len(), 100);
        assert_eq!(all[0].timestamp, 104);
        assert_eq!(all[99].timestamp, 5);
    }

    #[tokio::test]
    async fn test_durable_failure_does_not_fail_write() {
        let fast = Arc::new(MemoryFastStore::new());
        let repo = BackupRepository::new(fast.clone(), Some(Arc::new(BrokenDurableStore)), 100);
        let backup = snapshot("example.com", 1);

        repo.write(&backup).await.unwrap();

        assert_eq!(fast.load().await.unwrap(), vec![backup.clone()]);
        assert_eq!(repo.find_by_id(&backup.id).await.unwrap(), Some(backup));
    }

    #[tokio::test]
    async fn test_ephemeral_failure_fails_write() {
        let fast = Arc::new(FlakyFastStore::default());
        fast.set_down(true);
        let durable = Arc::new(SqliteDurableStore::open_in_memory().unwrap());
        let repo = BackupRepository::new(fast, Some(durable.clone()), 100);

        let err = repo.write(&snapshot("example.com", 1)).await.unwrap_err();

        assert!(matches!(err, IngestError::BackupWrite(StoreError::Unavailable(_))));
        assert!(durable.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_merge_prefers_ephemeral_copy() {
        let fast = Arc::new(MemoryFastStore::new());
        let durable = Arc::new(SqliteDurableStore::open_in_memory().unwrap());
        let repo = BackupRepository::new(fast.clone(), Some(durable.clone()), 100);

        let backup = snapshot("example.com", 10);
        repo.write(&backup).await.unwrap();
        let durable_only = snapshot("other.example", 20);
        durable.put(&durable_only).await.unwrap();

        let mut edited = backup.clone();
        edited.description = "edited in the ephemeral tier".to_string();
        fast.save(&[edited.clone()]).await.unwrap();

        let all = repo.read_all().await.unwrap();
        assert_eq!(all, vec![durable_only, edited]);
    }

    #[tokio::test]
    async fn test_find_falls_back_to_durable_tier() {
        let fast = Arc::new(MemoryFastStore::new());
        let durable = Arc::new(SqliteDurableStore::open_in_memory().unwrap());
        let repo = BackupRepository::new(fast.clone(), Some(durable), 1);

        let first = snapshot("example.com", 1);
        let second = snapshot("example.com", 2);
        repo.write(&first).await.unwrap();
        repo.write(&second).await.unwrap();

        assert_eq!(fast.load().await.unwrap(), vec![second]);
        assert_eq!(repo.find_by_id(&first.id).await.unwrap(), Some(first));
        assert_eq!(repo.find_by_id("backup_0_missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_all_survives_ephemeral_outage() {
        let fast = Arc::new(FlakyFastStore::default());
        let durable = Arc::new(SqliteDurableStore::open_in_memory().unwrap());
        let repo = BackupRepository::new(fast.clone(), Some(durable), 100);
        let backup = snapshot("example.com", 1);
        repo.write(&backup).await.unwrap();

        fast.set_down(true);

        assert_eq!(repo.read_all().await.unwrap(), vec![backup.clone()]);
        assert_eq!(repo.find_by_id(&backup.id).await.unwrap(), Some(backup));
    }

    #[tokio::test]
    async fn test_read_all_fails_when_both_tiers_are_down() {
        let fast = Arc::new(FlakyFastStore::default());
        fast.set_down(true);
        let repo = BackupRepository::new(fast, Some(Arc::new(BrokenDurableStore)), 100);

        assert!(matches!(repo.read_all().await, Err(IngestError::BackupRead(_))));
    }

    #[tokio::test]
    async fn test_concurrent_writes_lose_nothing() {
        let fast = Arc::new(MemoryFastStore::new());
        let repo = Arc::new(BackupRepository::new(fast.clone(), None, 100));

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.write(&snapshot("example.com", i)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(fast.load().await.unwrap().len(), 20);
    }
}
