//! Ingestion configuration
//!
//! Loaded from `SITEMAP_*` environment variables; `main` reads a `.env` file
//! first when one is present.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::backup::DEFAULT_EPHEMERAL_CAPACITY;
use crate::error::{IngestError, Result};
use crate::remote::http::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::upload::{FinalChunkPolicy, RetryPolicy, DEFAULT_CHUNK_SIZE, DEFAULT_CONCURRENCY_LIMIT};

pub const DEFAULT_REMOTE_URL: &str = "http://localhost:8000";
pub const DEFAULT_BACKUP_DIR: &str = "./data/backups";

const EPHEMERAL_FILE_NAME: &str = "backups.json";
const DURABLE_FILE_NAME: &str = "backups.db";

/// Main ingestion configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Base URL of the remote record store
    pub remote_url: String,
    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,
    /// Records per chunk on the chunked path
    pub chunk_size: usize,
    /// Chunks in flight per window
    pub concurrency_limit: usize,
    /// Extra attempts per chunk after the first
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Extra attempts for a single-shot batch after the first
    pub direct_max_retries: u32,
    pub direct_retry_base_delay_ms: u64,
    /// Directory holding both backup tiers
    pub backup_dir: PathBuf,
    /// Snapshots retained by the ephemeral tier
    pub backup_capacity: usize,
    pub final_chunk_policy: FinalChunkPolicy,
    /// Abort an ingestion call when its snapshot cannot be written
    pub require_backup: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        let chunked = RetryPolicy::chunked();
        let direct = RetryPolicy::direct();

        Self {
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            max_retries: chunked.max_retries,
            retry_base_delay_ms: chunked.base_delay.as_millis() as u64,
            direct_max_retries: direct.max_retries,
            direct_retry_base_delay_ms: direct.base_delay.as_millis() as u64,
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            backup_capacity: DEFAULT_EPHEMERAL_CAPACITY,
            final_chunk_policy: FinalChunkPolicy::default(),
            require_backup: true,
        }
    }
}

impl IngestConfig {
    /// Load ingestion configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            remote_url: std::env::var("SITEMAP_REMOTE_URL").unwrap_or(defaults.remote_url),
            request_timeout_secs: env_or(
                "SITEMAP_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
            chunk_size: env_or("SITEMAP_CHUNK_SIZE", defaults.chunk_size)?,
            concurrency_limit: env_or("SITEMAP_CONCURRENCY_LIMIT", defaults.concurrency_limit)?,
            max_retries: env_or("SITEMAP_MAX_RETRIES", defaults.max_retries)?,
            retry_base_delay_ms: env_or(
                "SITEMAP_RETRY_BASE_DELAY_MS",
                defaults.retry_base_delay_ms,
            )?,
            direct_max_retries: env_or("SITEMAP_DIRECT_MAX_RETRIES", defaults.direct_max_retries)?,
            direct_retry_base_delay_ms: env_or(
                "SITEMAP_DIRECT_RETRY_BASE_DELAY_MS",
                defaults.direct_retry_base_delay_ms,
            )?,
            backup_dir: std::env::var("SITEMAP_BACKUP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.backup_dir),
            backup_capacity: env_or("SITEMAP_BACKUP_CAPACITY", defaults.backup_capacity)?,
            final_chunk_policy: env_or(
                "SITEMAP_FINAL_CHUNK_POLICY",
                defaults.final_chunk_policy,
            )?,
            require_backup: env_or("SITEMAP_REQUIRE_BACKUP", defaults.require_backup)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.remote_url.trim().is_empty() {
            return Err(IngestError::config("SITEMAP_REMOTE_URL must not be empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(IngestError::config("SITEMAP_REQUEST_TIMEOUT_SECS must be greater than 0"));
        }
        if self.chunk_size == 0 {
            return Err(IngestError::config("SITEMAP_CHUNK_SIZE must be greater than 0"));
        }
        if self.concurrency_limit == 0 {
            return Err(IngestError::config("SITEMAP_CONCURRENCY_LIMIT must be greater than 0"));
        }
        if self.backup_capacity == 0 {
            return Err(IngestError::config("SITEMAP_BACKUP_CAPACITY must be greater than 0"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Retry policy for chunk submissions
    pub fn chunk_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_base_delay_ms))
    }

    /// Retry policy for single-shot batch submissions
    pub fn direct_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.direct_max_retries,
            Duration::from_millis(self.direct_retry_base_delay_ms),
        )
    }

    /// `(ephemeral JSON file, durable SQLite database)`
    pub fn backup_paths(&self) -> (PathBuf, PathBuf) {
        (
            self.backup_dir.join(EPHEMERAL_FILE_NAME),
            self.backup_dir.join(DURABLE_FILE_NAME),
        )
    }
}

/// Parse `name` if set, otherwise fall back to `default`.
fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| IngestError::config(format!("Invalid {}={:?}: {}", name, raw, e))),
        Err(_) => Ok(default),
    }
}
