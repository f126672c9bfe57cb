use crate::data_sync::config::FeedConfig;
use crate::data_sync::transport::SnapshotSource;
use crate::error::FeedError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// HTTP GET snapshot source for the polling policy
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    http_client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpSnapshotSource {
    pub fn new(url: String, timeout: Duration) -> Result<Self, FeedError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            url,
            timeout,
        })
    }

    pub fn from_config(config: &FeedConfig) -> Result<Self, FeedError> {
        Self::new(config.feed_url.clone(), config.http_timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self) -> Result<Value, FeedError> {
        let response = self.http_client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                FeedError::Timeout(self.timeout)
            } else {
                FeedError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await?;
        debug!("Fetched {} bytes from {}", body.len(), self.url);

        Ok(serde_json::from_str(&body)?)
    }
}
