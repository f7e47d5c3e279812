//! Input file loading for the CLI
//!
//! Accepts either a JSON array of records or a CSV file with a header row
//! (`url,title,description`; `address` is accepted for the first column).

use sitemap_common::Record;
use std::path::Path;
use tracing::debug;

use crate::error::{IngestError, Result};

/// Supported input encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Csv,
}

impl InputFormat {
    /// Pick a format from the file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => InputFormat::Csv,
            _ => InputFormat::Json,
        }
    }
}

/// Read and parse a record file.
///
/// Empty files and files whose every address is blank are rejected.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| IngestError::config(format!("Failed to read {}: {}", path.display(), e)))?;
    let format = InputFormat::from_path(path);
    let records = parse_records(&content, format)?;
    debug!(path = %path.display(), ?format, records = records.len(), "Loaded input file");
    Ok(records)
}

pub fn parse_records(content: &str, format: InputFormat) -> Result<Vec<Record>> {
    if content.trim().is_empty() {
        return Err(IngestError::config("Input is empty"));
    }

    let records = match format {
        InputFormat::Json => serde_json::from_str::<Vec<Record>>(content)
            .map_err(|e| IngestError::config(format!("Invalid JSON input: {}", e)))?,
        InputFormat::Csv => parse_csv(content)?,
    };

    if records.iter().all(|r| r.address.trim().is_empty()) {
        return Err(IngestError::config("Input contains no addresses"));
    }

    Ok(records)
}

fn parse_csv(content: &str) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    reader
        .deserialize::<Record>()
        .enumerate()
        .map(|(row, result)| {
            result.map_err(|e| {
                IngestError::config(format!("Invalid CSV row {}: {}", row + 1, e))
            })
        })
        .collect()
}
