use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::core::error::{LoaderError, LoaderResult};
use crate::core::http::build_http_client;

/// Read-only access to remote documents.
///
/// Implemented over HTTP by [`Downloader`]; tests swap in an in-memory source.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// GET `url` and return the raw body.
    async fn fetch_bytes(&self, url: &str) -> LoaderResult<Vec<u8>>;

    /// GET `url` and decode the body as UTF-8 text.
    async fn fetch_text(&self, url: &str) -> LoaderResult<String> {
        let bytes = self.fetch_bytes(url).await?;
        String::from_utf8(bytes)
            .map_err(|e| LoaderError::Other(format!("Non UTF-8 response from {}: {}", url, e)))
    }
}

/// HTTP fetcher backed by a shared `reqwest` client.
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(timeout: Duration) -> LoaderResult<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
        })
    }
}

#[async_trait]
impl Fetch for Downloader {
    async fn fetch_bytes(&self, url: &str) -> LoaderResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoaderError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        debug!("Fetched {} ({} bytes)", url, bytes.len());
        Ok(bytes.to_vec())
    }
}
