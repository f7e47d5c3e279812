//! Sitemap Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Bulk ingestion of URL index records into a remote store.
//!
//! # Pipeline
//!
//! - **Canonicalize**: every address gets an explicit transport scheme
//! - **Back up**: a checksummed snapshot lands in the two-tier backup store
//! - **Submit**: records go out in bounded chunks, a window at a time, each
//!   chunk retried with linear backoff
//! - **Restore**: any snapshot can be resubmitted later, integrity-checked
//!
//! # Example
//!
//! ```no_run
//! use sitemap_common::Record;
//! use sitemap_ingest::{IngestConfig, IngestionPipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::from_env()?;
//!     let pipeline = IngestionPipeline::from_config(&config)?;
//!
//!     let records = vec![Record::new("example.com/about", "About", "About us")];
//!     let outcome = pipeline
//!         .ingest_chunked("example.com", records, |p| println!("{:.0}%", p.percentage))
//!         .await?;
//!     println!("{} records delivered", outcome.count);
//!     Ok(())
//! }
//! ```

pub mod backup;
pub mod config;
pub mod error;
pub mod input;
pub mod pipeline;
pub mod remote;
pub mod restore;
pub mod upload;

#[cfg(test)]
mod testing;

pub use backup::BackupRepository;
pub use config::IngestConfig;
pub use error::{IngestError, Result};
pub use pipeline::{IngestOutcome, IngestionPipeline};
pub use remote::{HttpRemoteStore, RemoteError, RemoteStore};
pub use restore::{RestoreCoordinator, RestoreOutcome};
