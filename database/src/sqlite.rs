use crate::KeyValueStore;
use chrono::Utc;
use curator_core::{CoreError, StoreError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

fn sql_error(error: sqlx::Error) -> CoreError {
    match &error {
        sqlx::Error::Database(db) if db.message().contains("database is locked") => {
            CoreError::Store(StoreError::DatabaseLocked)
        }
        _ => CoreError::Store(StoreError::Sql(error)),
    }
}

/// SQLite-backed key-value table.
#[derive(Debug)]
pub struct Database {
    connection_string: String,
    pool: Option<SqlitePool>,
}

impl Database {
    pub fn new(connection_string: String) -> Self {
        Self {
            connection_string,
            pool: None,
        }
    }

    pub async fn connect(&mut self) -> Result<(), CoreError> {
        let options = SqliteConnectOptions::from_str(&self.connection_string)
            .map_err(|e| {
                CoreError::Store(StoreError::ConnectionFailed {
                    reason: e.to_string(),
                })
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| {
                CoreError::Store(StoreError::ConnectionFailed {
                    reason: e.to_string(),
                })
            })?;

        info!("Connected to {}", self.connection_string);
        self.pool = Some(pool);
        Ok(())
    }

    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        sqlx::migrate!("./migrations")
            .run(self.pool()?)
            .await
            .map_err(|e| {
                CoreError::Store(StoreError::MigrationFailed {
                    migration: e.to_string(),
                })
            })?;
        debug!("Migrations applied");
        Ok(())
    }

    fn pool(&self) -> Result<&SqlitePool, CoreError> {
        self.pool
            .as_ref()
            .ok_or(CoreError::Store(StoreError::NotConnected))
    }

    pub async fn save_setting(&self, key: &str, value: &str) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(self.pool()?)
        .await
        .map_err(sql_error)?;
        Ok(())
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, CoreError> {
        sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool()?)
            .await
            .map_err(sql_error)
    }

    pub async fn delete_setting(&self, key: &str) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(self.pool()?)
            .await
            .map_err(sql_error)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn settings_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<Vec<(String, String)>, CoreError> {
        sqlx::query_as::<_, (String, String)>(
            "SELECT key, value FROM settings WHERE substr(key, 1, ?) = ? ORDER BY key",
        )
        .bind(prefix.chars().count() as i64)
        .bind(prefix)
        .fetch_all(self.pool()?)
        .await
        .map_err(sql_error)
    }
}

impl KeyValueStore for Database {
    async fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        self.get_setting(key).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.save_setting(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<bool, CoreError> {
        self.delete_setting(key).await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, CoreError> {
        self.settings_with_prefix(prefix).await
    }
}
