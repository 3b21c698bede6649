use crate::retry::{RetryConfig, RetryExecutor};
use crate::{unwrap_batch, PostSource};
use curator_core::{CoreError, SourceError};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Fetches the batch from an HTTP endpoint, retrying transient failures.
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
    retry: RetryExecutor,
}

impl HttpSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.to_string(),
            client,
            retry: RetryExecutor::default(),
        })
    }

    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = RetryExecutor::new(config);
        self
    }

    async fn fetch_once(&self) -> Result<Value, CoreError> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                CoreError::Source(SourceError::RequestTimeout)
            } else {
                CoreError::Network(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.status_error(status, &response));
        }

        let body = response.text().await?;
        let document: Value = serde_json::from_str(&body).map_err(|e| {
            CoreError::Source(SourceError::InvalidDocument {
                details: format!("{}: {}", self.url, e),
            })
        })?;

        debug!("Fetched {} bytes of posts from {}", body.len(), self.url);
        Ok(unwrap_batch(document))
    }

    fn status_error(&self, status: StatusCode, response: &reqwest::Response) -> CoreError {
        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.trim().parse::<u64>().ok())
                    .unwrap_or(2);
                CoreError::Source(SourceError::RateLimitExceeded { retry_after })
            }
            StatusCode::NOT_FOUND => CoreError::Source(SourceError::Unavailable {
                location: self.url.clone(),
            }),
            status if status.is_server_error() => CoreError::Source(SourceError::ServerError {
                status_code: status.as_u16(),
            }),
            status => CoreError::RequestFailed {
                message: format!("GET {} returned {}", self.url, status),
                status_code: Some(status.as_u16()),
            },
        }
    }
}

impl PostSource for HttpSource {
    async fn fetch(&self) -> Result<Value, CoreError> {
        self.retry
            .execute("fetch posts", || self.fetch_once())
            .await
    }

    fn location(&self) -> &str {
        &self.url
    }
}
