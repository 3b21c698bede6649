use crate::{unwrap_batch, PostSource};
use curator_core::{CoreError, SourceError};
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

/// Reads a JSON export from disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    display: String,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display = path.display().to_string();
        Self { path, display }
    }
}

impl PostSource for JsonFileSource {
    async fn fetch(&self) -> Result<Value, CoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CoreError::NotFound {
                    resource: self.display.clone(),
                });
            }
            Err(e) => return Err(CoreError::Io(e)),
        };

        let document: Value = serde_json::from_str(&raw).map_err(|e| {
            CoreError::Source(SourceError::InvalidDocument {
                details: format!("{}: {}", self.display, e),
            })
        })?;

        debug!("Read {} bytes of posts from {}", raw.len(), self.display);
        Ok(unwrap_batch(document))
    }

    fn location(&self) -> &str {
        &self.display
    }
}
