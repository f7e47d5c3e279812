//! Sitemap Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the sitemap ingestion workspace.
//!
//! # Overview
//!
//! - **Types**: URL index records, backup snapshots and progress snapshots
//! - **Canonicalization**: address normalization applied before anything else
//! - **Checksums**: integrity digests over ordered record batches
//! - **Logging**: tracing subscriber setup shared by every binary
//!
//! # Example
//!
//! ```
//! use sitemap_common::checksum::compute_checksum;
//! use sitemap_common::types::Record;
//!
//! let mut record = Record::new("example.com/about", "About", "About page");
//! record.canonicalize();
//! assert_eq!(record.address, "https://example.com/about");
//!
//! let digest = compute_checksum(&[record]);
//! assert!(!digest.is_empty());
//! ```

pub mod canonical;
pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{CommonError, Result};
pub use types::{BackupRecord, ProgressSnapshot, Record};
