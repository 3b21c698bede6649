//! Post sources. Each returns the raw, untrusted JSON batch; validation
//! happens when the batch is loaded into the feed.

mod file;
mod http;

pub mod retry;

pub use file::JsonFileSource;
pub use http::HttpSource;
pub use retry::{RetryConfig, RetryExecutor};

use curator_core::{CoreError, PostsConfig};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

pub trait PostSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<Value, CoreError>> + Send;

    /// Human-readable location, for logs.
    fn location(&self) -> &str;
}

/// A document is either the bare array of records or an object carrying
/// them under `posts`. Anything else is passed through unchanged and
/// rejected at load time.
pub fn unwrap_batch(document: Value) -> Value {
    match document {
        Value::Object(mut map) if map.get("posts").is_some_and(Value::is_array) => {
            map.remove("posts").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[derive(Debug)]
pub enum SourceBackend {
    File(JsonFileSource),
    Http(HttpSource),
}

impl SourceBackend {
    pub fn from_config(config: &PostsConfig) -> Result<Self, CoreError> {
        let source = config.source.trim();
        if source.starts_with("http://") || source.starts_with("https://") {
            let http = HttpSource::new(source, Duration::from_secs(config.request_timeout_secs))?;
            Ok(Self::Http(http))
        } else {
            Ok(Self::File(JsonFileSource::new(source)))
        }
    }
}

impl PostSource for SourceBackend {
    async fn fetch(&self) -> Result<Value, CoreError> {
        match self {
            Self::File(source) => source.fetch().await,
            Self::Http(source) => source.fetch().await,
        }
    }

    fn location(&self) -> &str {
        match self {
            Self::File(source) => source.location(),
            Self::Http(source) => source.location(),
        }
    }
}
