//! Ingestion pipeline entry point
//!
//! Wires the canonicalizer, backup repository, chunk scheduler and restore
//! coordinator together behind one type. Each ingestion call runs
//! canonicalize, validate, back up, then submit.

use sitemap_common::canonical::{canonicalize_all, parse_address};
use sitemap_common::{BackupRecord, ProgressSnapshot, Record};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::backup::{BackupRepository, DurableStore, JsonFileFastStore, SqliteDurableStore};
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::remote::{HttpRemoteStore, RemoteStore};
use crate::restore::{RestoreCoordinator, RestoreOutcome};
use crate::upload::{ChunkScheduler, Delay, ProgressReporter, TokioDelay, UploadWorker};

/// Result of a successful ingestion call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub group: String,
    /// Records delivered to the remote store
    pub count: usize,
    /// Snapshot taken before submission, absent if the backup failed and was
    /// tolerated
    pub backup_id: Option<String>,
}

/// Drives ingestion and restore against one remote store
pub struct IngestionPipeline {
    scheduler: ChunkScheduler,
    direct: UploadWorker,
    repository: Arc<BackupRepository>,
    restorer: RestoreCoordinator,
    require_backup: bool,
}

impl IngestionPipeline {
    pub fn new(
        scheduler: ChunkScheduler,
        direct: UploadWorker,
        repository: Arc<BackupRepository>,
        remote: Arc<dyn RemoteStore>,
    ) -> Self {
        let restorer = RestoreCoordinator::new(repository.clone(), remote);
        Self {
            scheduler,
            direct,
            repository,
            restorer,
            require_backup: true,
        }
    }

    /// Whether an ephemeral backup failure aborts the call before any
    /// network activity. When off, the failure is logged and the upload
    /// proceeds without a snapshot.
    pub fn require_backup(mut self, require: bool) -> Self {
        self.require_backup = require;
        self
    }

    /// Build the production pipeline: HTTP remote store, JSON-file ephemeral
    /// tier and SQLite durable tier under `config.backup_dir`.
    ///
    /// An unopenable durable tier is logged and left out.
    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        config.validate()?;

        let remote: Arc<dyn RemoteStore> =
            Arc::new(HttpRemoteStore::new(&config.remote_url, config.request_timeout())?);

        let (ephemeral_path, durable_path) = config.backup_paths();
        let durable: Option<Arc<dyn DurableStore>> = match SqliteDurableStore::open(&durable_path) {
            Ok(store) => Some(Arc::new(store)),
            Err(err) => {
                warn!(
                    path = %durable_path.display(),
                    error = %err,
                    "Durable backup tier unavailable; continuing with ephemeral tier only"
                );
                None
            },
        };
        let repository = Arc::new(BackupRepository::new(
            Arc::new(JsonFileFastStore::new(ephemeral_path)),
            durable,
            config.backup_capacity,
        ));

        Self::with_components(config, remote, repository, Arc::new(TokioDelay))
    }

    /// Build a pipeline over caller-supplied collaborators, sized by `config`.
    pub fn with_components(
        config: &IngestConfig,
        remote: Arc<dyn RemoteStore>,
        repository: Arc<BackupRepository>,
        delay: Arc<dyn Delay>,
    ) -> Result<Self> {
        let chunk_worker =
            UploadWorker::new(remote.clone(), config.chunk_retry_policy(), delay.clone());
        let scheduler = ChunkScheduler::new(
            chunk_worker,
            config.chunk_size,
            config.concurrency_limit,
            config.final_chunk_policy,
        )?;
        let direct = UploadWorker::new(remote.clone(), config.direct_retry_policy(), delay);

        Ok(Self::new(scheduler, direct, repository, remote)
            .require_backup(config.require_backup))
    }

    pub fn repository(&self) -> &BackupRepository {
        &self.repository
    }

    /// Deliver `records` for `group` in bounded, retried chunks.
    ///
    /// `on_progress` fires after every committed chunk. On an irrecoverable
    /// chunk failure the error names the chunk; chunks already committed
    /// stay committed.
    #[instrument(skip(self, records, on_progress), fields(records = records.len()))]
    pub async fn ingest_chunked<F>(
        &self,
        group: &str,
        records: Vec<Record>,
        on_progress: F,
    ) -> Result<IngestOutcome>
    where
        F: FnMut(ProgressSnapshot) + Send,
    {
        let records = prepare(records)?;
        let backup_id = self.backup(group, &records).await?;

        let mut progress = ProgressReporter::with_callback(records.len(), on_progress);
        let count = self.scheduler.run(group, &records, &mut progress).await?;

        info!(group = %group, count, backup_id = ?backup_id, "Chunked ingestion complete");
        Ok(IngestOutcome {
            group: group.to_string(),
            count,
            backup_id,
        })
    }

    /// Deliver `records` for `group` in one retried submission.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn ingest_direct(&self, group: &str, records: Vec<Record>) -> Result<IngestOutcome> {
        let records = prepare(records)?;
        let backup_id = self.backup(group, &records).await?;

        let count = self.direct.submit_batch(group, &records).await.map_err(|err| {
            error!(group = %group, error = %err, "Direct ingestion failed");
            err
        })?;

        info!(group = %group, count, backup_id = ?backup_id, "Direct ingestion complete");
        Ok(IngestOutcome {
            group: group.to_string(),
            count,
            backup_id,
        })
    }

    pub async fn restore(&self, backup_id: &str) -> Result<RestoreOutcome> {
        self.restorer.restore(backup_id).await
    }

    /// Every known backup, newest first.
    pub async fn backups(&self) -> Result<Vec<BackupRecord>> {
        self.repository.read_all().await
    }

    async fn backup(&self, group: &str, records: &[Record]) -> Result<Option<String>> {
        let snapshot = BackupRecord::snapshot(group, records.to_vec());
        match self.repository.write(&snapshot).await {
            Ok(()) => Ok(Some(snapshot.id)),
            Err(err) if !self.require_backup => {
                warn!(group = %group, error = %err, "Backup failed; continuing without snapshot");
                Ok(None)
            },
            Err(err) => Err(err),
        }
    }
}

/// Canonicalize every address, then reject any that does not parse as a URL
/// with a host.
fn prepare(records: Vec<Record>) -> Result<Vec<Record>> {
    let records = canonicalize_all(records);

    for (index, record) in records.iter().enumerate() {
        parse_address(&record.address).map_err(|err| IngestError::InvalidRecord {
            index,
            reason: err.to_string(),
        })?;
    }

    Ok(records)
}
