use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use grimoire_common::RetryPolicy;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::traits::Downloader;

const USER_AGENT: &str = concat!("grimoire-ingest/", env!("CARGO_PKG_VERSION"));

/// Plain HTTP GET for image and icon bytes, with bounded retry on network
/// errors and server-side statuses.
pub struct HttpDownloader {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpDownloader {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
            retry,
        }
    }

    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let resp = self.client.get(url).send().await.map_err(|e| IngestError::Download {
            url: url.to_string(),
            status: None,
            message: e.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(IngestError::Download {
                url: url.to_string(),
                status: Some(status.as_u16()),
                message: status.canonical_reason().unwrap_or("HTTP error").to_string(),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| IngestError::Download {
            url: url.to_string(),
            status: None,
            message: e.to_string(),
        })?;
        debug!(url, bytes = bytes.len(), "Downloaded");
        Ok(bytes)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str) -> Result<Bytes> {
        self.retry
            .run(
                "download",
                || self.fetch(url),
                |outcome| matches!(outcome, Err(e) if e.is_retryable_download()),
            )
            .await
    }
}
