//! Sitemap Ingest - bulk URL index ingestion tool

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use sitemap_common::logging::{init_logging, LogConfig, LogLevel};
use sitemap_ingest::input::load_records;
use sitemap_ingest::{IngestConfig, IngestionPipeline};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sitemap-ingest")]
#[command(author, version, about = "Bulk URL index ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Back up and submit a file of records for a group
    Ingest {
        /// Group (domain) the records belong to
        #[arg(short, long)]
        group: String,

        /// JSON array or CSV file of records
        #[arg(short, long)]
        input: PathBuf,

        /// Records per chunk
        #[arg(long, env = "SITEMAP_CHUNK_SIZE")]
        chunk_size: Option<usize>,

        /// Chunks in flight per window
        #[arg(long, env = "SITEMAP_CONCURRENCY_LIMIT")]
        concurrency: Option<usize>,

        /// Submit in a single request instead of chunks
        #[arg(long)]
        direct: bool,
    },

    /// List backups, newest first
    Backups {
        /// Show at most this many
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Resubmit a backup to its group
    Restore {
        /// Backup identifier
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("sitemap-ingest")
        .build();

    // Environment variables take precedence
    let log_config = LogConfig::from_env_with(log_config)?;
    init_logging(&log_config)?;

    let mut config = IngestConfig::from_env()?;

    match cli.command {
        Command::Ingest {
            group,
            input,
            chunk_size,
            concurrency,
            direct,
        } => {
            if let Some(size) = chunk_size {
                config.chunk_size = size;
            }
            if let Some(limit) = concurrency {
                config.concurrency_limit = limit;
            }
            let pipeline = IngestionPipeline::from_config(&config)?;

            let records = load_records(&input)
                .with_context(|| format!("Failed to load {}", input.display()))?;
            info!(group = %group, records = records.len(), direct, "Starting ingestion");

            let outcome = if direct {
                pipeline.ingest_direct(&group, records).await?
            } else {
                let bar = progress_bar(records.len() as u64, &group)?;
                let ticker = bar.clone();
                let result = pipeline
                    .ingest_chunked(&group, records, move |snapshot| {
                        ticker.set_position(snapshot.processed as u64);
                    })
                    .await;
                match &result {
                    Ok(_) => bar.finish_with_message(format!("{} delivered", group)),
                    Err(_) => bar.abandon_with_message(format!("{} failed", group)),
                }
                result?
            };

            let backup = outcome.backup_id.as_deref().unwrap_or("none");
            println!(
                "Delivered {} records to {} (backup: {})",
                outcome.count, outcome.group, backup
            );
        },
        Command::Backups { limit } => {
            let pipeline = IngestionPipeline::from_config(&config)?;
            let backups = pipeline.backups().await?;
            let shown = limit.unwrap_or(backups.len());

            for backup in backups.iter().take(shown) {
                let created = Utc
                    .timestamp_millis_opt(backup.timestamp)
                    .single()
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| backup.timestamp.to_string());
                println!(
                    "{}  {}  {:>6} entries  {}",
                    backup.id, created, backup.entry_count, backup.group
                );
            }
            info!(total = backups.len(), shown = shown.min(backups.len()), "Listed backups");
        },
        Command::Restore { id } => {
            let pipeline = IngestionPipeline::from_config(&config)?;
            let outcome = pipeline.restore(&id).await?;

            if !outcome.checksum_verified {
                eprintln!("warning: backup {} failed its checksum; data restored as-is", id);
            }
            println!(
                "Restored {} records to {}",
                outcome.record.records.len(),
                outcome.record.group
            );
        },
    }

    Ok(())
}

fn progress_bar(total: u64, group: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Uploading to {}", group));
    Ok(pb)
}
