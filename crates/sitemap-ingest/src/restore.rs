//! Restore Coordinator
//!
//! Looks a backup up, checks its integrity and resubmits its records to the
//! remote store through the single-shot path.

use sitemap_common::checksum::verify_checksum;
use sitemap_common::BackupRecord;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::backup::BackupRepository;
use crate::error::{IngestError, Result};
use crate::remote::RemoteStore;

/// Result of a successful restore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOutcome {
    pub record: BackupRecord,
    /// False when the stored records no longer match the stored checksum.
    pub checksum_verified: bool,
}

pub struct RestoreCoordinator {
    repository: Arc<BackupRepository>,
    remote: Arc<dyn RemoteStore>,
}

impl RestoreCoordinator {
    pub fn new(repository: Arc<BackupRepository>, remote: Arc<dyn RemoteStore>) -> Self {
        Self { repository, remote }
    }

    /// Resubmit every record of backup `id` to its group.
    ///
    /// A checksum mismatch is reported but does not stop the restore. The
    /// submission is attempted exactly once.
    #[instrument(skip(self))]
    pub async fn restore(&self, id: &str) -> Result<RestoreOutcome> {
        let record = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| IngestError::BackupNotFound(id.to_string()))?;

        let checksum_verified = match verify_checksum(&record.records, &record.checksum) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    backup_id = %record.id,
                    group = %record.group,
                    error = %err,
                    "Backup checksum mismatch; data may be corrupted, restoring anyway"
                );
                false
            },
        };

        self.remote.submit_batch(&record.group, &record.records).await?;

        info!(
            backup_id = %record.id,
            group = %record.group,
            entries = record.records.len(),
            checksum_verified,
            "Backup restored"
        );

        Ok(RestoreOutcome {
            record,
            checksum_verified,
        })
    }
}
