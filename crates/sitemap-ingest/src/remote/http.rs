//! HTTP client for the remote record store

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use sitemap_common::Record;
use std::time::Duration;
use tracing::debug;

use super::endpoints;
use super::{RemoteError, RemoteStore};

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Serialize)]
struct BatchBody<'a> {
    records: &'a [Record],
}

#[derive(Serialize)]
struct ChunkBody<'a> {
    records: &'a [Record],
    is_final: bool,
}

/// Remote store reached over JSON/HTTP
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<(), RemoteError> {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn submit_batch(&self, group: &str, records: &[Record]) -> Result<(), RemoteError> {
        let url = endpoints::batch_url(&self.base_url, group);
        debug!(group = %group, records = records.len(), "Submitting batch");
        self.post(&url, &BatchBody { records }).await
    }

    async fn submit_chunk(
        &self,
        group: &str,
        records: &[Record],
        is_final: bool,
    ) -> Result<(), RemoteError> {
        let url = endpoints::chunk_url(&self.base_url, group);
        debug!(group = %group, records = records.len(), is_final, "Submitting chunk");
        self.post(&url, &ChunkBody { records, is_final }).await
    }
}
