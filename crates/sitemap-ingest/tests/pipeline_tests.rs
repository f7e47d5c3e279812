//! End-to-end tests for the ingestion pipeline
//!
//! Drives the real HTTP client against a mock remote store, with both backup
//! tiers on disk in a temp directory.

use sitemap_common::Record;
use sitemap_ingest::upload::FinalChunkPolicy;
use sitemap_ingest::{IngestConfig, IngestError, IngestionPipeline};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

const CHUNKS_PATH: &str = "/api/v1/groups/example.com/chunks";
const RECORDS_PATH: &str = "/api/v1/groups/example.com/records";

fn records(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| Record::new(format!("example.com/page-{i}"), format!("Page {i}"), ""))
        .collect()
}

fn test_config(server: &MockServer, dir: &TempDir) -> IngestConfig {
    IngestConfig {
        remote_url: server.uri(),
        request_timeout_secs: 5,
        retry_base_delay_ms: 1,
        direct_retry_base_delay_ms: 1,
        backup_dir: dir.path().join("backups"),
        ..IngestConfig::default()
    }
}

#[tokio::test]
async fn test_chunked_ingestion_end_to_end() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("POST"))
        .and(path(CHUNKS_PATH))
        .and(body_partial_json(serde_json::json!({ "is_final": false })))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path(CHUNKS_PATH))
        .and(body_partial_json(serde_json::json!({ "is_final": true })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let pipeline = IngestionPipeline::from_config(&test_config(&mock_server, &dir))
        .expect("Failed to build pipeline");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let outcome = pipeline
        .ingest_chunked("example.com", records(1200), move |s| {
            sink.lock().expect("poisoned").push(s.processed)
        })
        .await
        .expect("Ingestion failed");

    assert_eq!(outcome.count, 1200);
    assert!(outcome.backup_id.is_some());

    let mut seen = seen.lock().expect("poisoned").clone();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen.pop(), Some(1200));

    // Every submitted address was canonicalized.
    for request in mock_server.received_requests().await.unwrap_or_default() {
        let body: serde_json::Value = request.body_json().expect("Invalid request body");
        let chunk = body["records"].as_array().expect("records array");
        assert!(chunk
            .iter()
            .all(|r| r["address"].as_str().unwrap_or_default().starts_with("https://")));
    }
}

#[tokio::test]
async fn test_final_chunk_arrives_last_by_default() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("POST"))
        .and(path(CHUNKS_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let config = IngestConfig {
        final_chunk_policy: FinalChunkPolicy::AfterWindowDrains,
        ..test_config(&mock_server, &dir)
    };
    let pipeline = IngestionPipeline::from_config(&config).expect("Failed to build pipeline");

    pipeline
        .ingest_chunked("example.com", records(1200), |_| {})
        .await
        .expect("Ingestion failed");

    let requests = mock_server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 3);
    let finals: Vec<bool> = requests
        .iter()
        .map(|r| {
            let body: serde_json::Value = r.body_json().expect("Invalid request body");
            body["is_final"].as_bool().unwrap_or_default()
        })
        .collect();
    assert_eq!(finals, vec![false, false, true]);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("POST"))
        .and(path(CHUNKS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path(CHUNKS_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let config = IngestConfig {
        concurrency_limit: 1,
        ..test_config(&mock_server, &dir)
    };
    let pipeline = IngestionPipeline::from_config(&config).expect("Failed to build pipeline");

    let outcome = pipeline
        .ingest_chunked("example.com", records(600), |_| {})
        .await
        .expect("Ingestion failed");

    assert_eq!(outcome.count, 600);
    // Chunk 0 took three attempts, chunk 1 one.
    assert_eq!(mock_server.received_requests().await.unwrap_or_default().len(), 4);
}

#[tokio::test]
async fn test_persistent_failure_names_chunk() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("POST"))
        .and(path(CHUNKS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let config = IngestConfig {
        max_retries: 1,
        ..test_config(&mock_server, &dir)
    };
    let pipeline = IngestionPipeline::from_config(&config).expect("Failed to build pipeline");

    let err = pipeline
        .ingest_chunked("example.com", records(100), |_| {})
        .await
        .expect_err("Expected ingestion to fail");

    assert!(matches!(
        err,
        IngestError::ChunkSubmission {
            chunk_index: 0,
            attempts: 2,
            ..
        }
    ));

    // The snapshot was taken before the failed upload.
    let backups = pipeline.backups().await.expect("Failed to list backups");
    assert_eq!(backups.len(), 1);
    assert_eq!(backups[0].entry_count, 100);
}

#[tokio::test]
async fn test_backups_survive_restart_and_restore() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("POST"))
        .and(path(RECORDS_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server, &dir);
    let backup_id = {
        let pipeline = IngestionPipeline::from_config(&config).expect("Failed to build pipeline");
        pipeline
            .ingest_direct("example.com", records(3))
            .await
            .expect("Ingestion failed")
            .backup_id
            .expect("Expected a backup")
    };

    // Lose the ephemeral tier entirely; the durable tier still has the backup.
    let (ephemeral_path, _) = config.backup_paths();
    std::fs::remove_file(&ephemeral_path).expect("Failed to remove ephemeral file");

    let pipeline = IngestionPipeline::from_config(&config).expect("Failed to build pipeline");
    let backups = pipeline.backups().await.expect("Failed to list backups");
    assert_eq!(backups.len(), 1);
    assert_eq!(backups[0].id, backup_id);

    let outcome = pipeline.restore(&backup_id).await.expect("Restore failed");
    assert!(outcome.checksum_verified);
    assert_eq!(outcome.record.records.len(), 3);
}

#[tokio::test]
async fn test_corrupted_backup_restores_with_warning() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    Mock::given(method("POST"))
        .and(path(RECORDS_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server, &dir);
    let pipeline = IngestionPipeline::from_config(&config).expect("Failed to build pipeline");
    let backup_id = pipeline
        .ingest_direct("example.com", records(2))
        .await
        .expect("Ingestion failed")
        .backup_id
        .expect("Expected a backup");

    // Edit the stored records on disk behind the pipeline's back.
    let (ephemeral_path, _) = config.backup_paths();
    let raw = std::fs::read_to_string(&ephemeral_path).expect("Failed to read backups");
    let tampered = raw.replace("page-1", "page-999");
    assert_ne!(raw, tampered);
    std::fs::write(&ephemeral_path, tampered).expect("Failed to write backups");

    let outcome = pipeline.restore(&backup_id).await.expect("Restore failed");
    assert!(!outcome.checksum_verified);
    assert_eq!(outcome.record.records[1].address, "https://example.com/page-999");

    let requests = mock_server.received_requests().await.unwrap_or_default();
    let restored: serde_json::Value =
        requests.last().expect("No restore request").body_json().expect("Invalid body");
    assert_eq!(restored["records"][1]["address"], "https://example.com/page-999");
}

#[tokio::test]
async fn test_restore_unknown_backup() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    let pipeline = IngestionPipeline::from_config(&test_config(&mock_server, &dir))
        .expect("Failed to build pipeline");

    let err = pipeline
        .restore("backup_0_doesnotexist")
        .await
        .expect_err("Expected not found");
    assert!(matches!(err, IngestError::BackupNotFound(_)));
}

#[tokio::test]
async fn test_corrupt_backup_file_is_named_in_error() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");

    let config = test_config(&mock_server, &dir);
    let (ephemeral_path, _) = config.backup_paths();
    std::fs::create_dir_all(ephemeral_path.parent().expect("No parent dir"))
        .expect("Failed to create backup dir");
    std::fs::write(&ephemeral_path, b"[{\"id\": ").expect("Failed to write backups");

    let pipeline = IngestionPipeline::from_config(&config).expect("Failed to build pipeline");
    let err = pipeline
        .ingest_chunked("example.com", records(5), |_| {})
        .await
        .expect_err("Expected backup failure");

    assert!(matches!(err, IngestError::BackupWrite(_)));
    assert!(err.to_string().contains(&ephemeral_path.display().to_string()));
    assert!(mock_server.received_requests().await.unwrap_or_default().is_empty());
}
