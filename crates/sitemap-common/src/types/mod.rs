//! Common types used across the ingestion workspace

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canonical::canonicalize_address;
use crate::checksum::{compute_checksum, encode_base36};

/// Backup format version written into every snapshot.
pub const BACKUP_FORMAT_VERSION: &str = "1.0";

/// A single URL index entry.
///
/// Input files produced by the surrounding application name the address
/// field `url`; both spellings are accepted on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    #[serde(alias = "url")]
    pub address: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl Record {
    pub fn new(
        address: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            title: title.into(),
            description: description.into(),
        }
    }

    /// Rewrite the address in place so it always carries a transport scheme.
    pub fn canonicalize(&mut self) {
        self.address = canonicalize_address(&self.address);
    }
}

/// A recoverable snapshot of one submitted batch.
///
/// `checksum` is computed once over `records` when the snapshot is created
/// and is never recomputed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Opaque identifier, unique per submission attempt
    pub id: String,

    /// Creation instant in milliseconds since the Unix epoch
    pub timestamp: i64,

    /// Group (domain) the records were submitted for
    pub group: String,

    pub entry_count: usize,

    pub records: Vec<Record>,

    pub description: String,

    /// Snapshot format version
    pub version: String,

    pub checksum: String,
}

impl BackupRecord {
    /// Capture a snapshot of `records` destined for `group`.
    pub fn snapshot(group: impl Into<String>, records: Vec<Record>) -> Self {
        let group = group.into();
        let timestamp = Utc::now().timestamp_millis();
        let checksum = compute_checksum(&records);
        let description = format!(
            "Auto-backup before adding {} entries to {}",
            records.len(),
            group
        );

        Self {
            id: generate_backup_id(timestamp),
            timestamp,
            entry_count: records.len(),
            group,
            records,
            description,
            version: BACKUP_FORMAT_VERSION.to_string(),
            checksum,
        }
    }

    /// Whether the stored checksum still matches the stored records.
    pub fn checksum_matches(&self) -> bool {
        compute_checksum(&self.records) == self.checksum
    }
}

/// `backup_<millis>_<9 random base-36 characters>`
fn generate_backup_id(timestamp: i64) -> String {
    let mut suffix = encode_base36(Uuid::new_v4().as_u128());
    suffix.truncate(9);
    format!("backup_{}_{}", timestamp, suffix)
}

/// Progress of one ingestion call, emitted after every completed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
    pub percentage: f64,
}

impl ProgressSnapshot {
    pub fn new(processed: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            100.0
        } else {
            processed as f64 / total as f64 * 100.0
        };

        Self {
            processed,
            total,
            percentage,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}
