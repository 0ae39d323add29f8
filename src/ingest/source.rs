// src/ingest/source.rs
use async_trait::async_trait;

use crate::error::FetchError;

/// Retrieves a raw feed document.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Plain HTTP GET. Non-success statuses count as transport failures.
#[derive(Clone)]
pub struct HttpFeedSource {
    client: reqwest::Client,
}

impl HttpFeedSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::transport(url, e))?;
        tracing::debug!(url, status = %resp.status(), "feed response");
        let resp = resp
            .error_for_status()
            .map_err(|e| FetchError::transport(url, e))?;
        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::transport(url, e))?;
        Ok(body.to_vec())
    }
}
