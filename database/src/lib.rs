//! Durable key-value storage for per-user feed state.
//!
//! Every persisted unit (one interaction record, one feedback note, the
//! suggestion list) lives under its own key, so a write for one post never
//! rewrites another post's record.

mod file_store;
mod memory;
mod sqlite;

pub mod keys;

pub use file_store::FileStore;
pub use memory::MemoryStore;
pub use sqlite::Database;

use curator_core::{CoreError, StorageBackendKind, StorageConfig};
use std::future::Future;
use std::sync::Arc;
use tracing::info;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, CoreError>> + Send;

    /// Insert or overwrite `key`.
    fn put(&self, key: &str, value: &str) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Returns true if the key existed.
    fn delete(&self, key: &str) -> impl Future<Output = Result<bool, CoreError>> + Send;

    /// All entries whose key starts with `prefix`, ordered by key.
    fn scan_prefix(
        &self,
        prefix: &str,
    ) -> impl Future<Output = Result<Vec<(String, String)>, CoreError>> + Send;
}

impl<T: KeyValueStore> KeyValueStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        self.as_ref().get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.as_ref().put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<bool, CoreError> {
        self.as_ref().delete(key).await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, CoreError> {
        self.as_ref().scan_prefix(prefix).await
    }
}

/// Storage backend chosen by configuration.
#[derive(Debug)]
pub enum StoreBackend {
    File(FileStore),
    Sqlite(Database),
    Memory(MemoryStore),
}

impl StoreBackend {
    pub async fn from_config(config: &StorageConfig) -> Result<Self, CoreError> {
        match config.backend {
            StorageBackendKind::File => {
                info!("Using file storage at {}", config.path.display());
                Ok(Self::File(FileStore::open(&config.path).await?))
            }
            StorageBackendKind::Sqlite => {
                info!("Using SQLite storage at {}", config.database_url);
                let mut db = Database::new(config.database_url.clone());
                db.connect().await?;
                db.run_migrations().await?;
                Ok(Self::Sqlite(db))
            }
            StorageBackendKind::Memory => {
                info!("Using in-memory storage; state is discarded on exit");
                Ok(Self::Memory(MemoryStore::new()))
            }
        }
    }
}

impl KeyValueStore for StoreBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        match self {
            Self::File(store) => store.get(key).await,
            Self::Sqlite(store) => store.get(key).await,
            Self::Memory(store) => store.get(key).await,
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), CoreError> {
        match self {
            Self::File(store) => store.put(key, value).await,
            Self::Sqlite(store) => store.put(key, value).await,
            Self::Memory(store) => store.put(key, value).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, CoreError> {
        match self {
            Self::File(store) => store.delete(key).await,
            Self::Sqlite(store) => store.delete(key).await,
            Self::Memory(store) => store.delete(key).await,
        }
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, CoreError> {
        match self {
            Self::File(store) => store.scan_prefix(prefix).await,
            Self::Sqlite(store) => store.scan_prefix(prefix).await,
            Self::Memory(store) => store.scan_prefix(prefix).await,
        }
    }
}
