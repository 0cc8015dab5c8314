//! Settings Storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    settings::SettingsStore,
};
use sqlx::{sqlite::SqlitePool, Row};
use std::path::PathBuf;
use tracing::debug;

/// SQLite-backed settings store implementation
///
/// Provides persistent key-value storage using SQLite. Values are stored as
/// JSON so booleans and strings round-trip without a separate type column.
pub struct SqliteSettingsStore {
    pool: SqlitePool,
}

impl SqliteSettingsStore {
    /// Create a new settings store with the given database path
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let path_str = db_path.to_string_lossy().replace('\\', "/");
        let db_url = format!("sqlite://{}?mode=rwc", path_str);

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to connect: {}", e)))?;

        Self::init_schema(&pool).await?;

        debug!(path = ?db_path, "Initialized settings store");

        Ok(Self { pool })
    }

    /// Create an in-memory settings store (for testing)
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to connect: {}", e)))?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| BridgeError::DatabaseError(format!("Failed to create table: {}", e)))?;

        Ok(())
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(e.to_string()))?;

        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    async fn set_raw(&self, key: &str, value: String) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, strftime('%s', 'now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get_raw(key).await? {
            Some(raw) => serde_json::from_str::<bool>(&raw)
                .map(Some)
                .map_err(|e| BridgeError::OperationFailed(format!("Invalid bool value: {}", e))),
            None => Ok(None),
        }
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_raw(key, value.to_string()).await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.get_raw(key).await? {
            Some(raw) => serde_json::from_str::<String>(&raw)
                .map(Some)
                .map_err(|e| BridgeError::OperationFailed(format!("Invalid string value: {}", e))),
            None => Ok(None),
        }
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        let encoded = serde_json::to_string(value)
            .map_err(|e| BridgeError::OperationFailed(format!("Encoding failed: {}", e)))?;
        self.set_raw(key, encoded).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::settings::AUTOPLAY_KEY;

    #[tokio::test]
    async fn test_bool_round_trip() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        assert_eq!(store.get_bool(AUTOPLAY_KEY).await.unwrap(), None);

        store.set_bool(AUTOPLAY_KEY, true).await.unwrap();
        assert_eq!(store.get_bool(AUTOPLAY_KEY).await.unwrap(), Some(true));

        store.set_bool(AUTOPLAY_KEY, false).await.unwrap();
        assert_eq!(store.get_bool(AUTOPLAY_KEY).await.unwrap(), Some(false));
    }

    #[tokio::test]
    async fn test_string_round_trip() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        store.set_string("theme", "dark").await.unwrap();
        assert_eq!(
            store.get_string("theme").await.unwrap(),
            Some("dark".to_string())
        );
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        store.set_bool("flag", true).await.unwrap();
        store.remove("flag").await.unwrap();
        store.remove("flag").await.unwrap();
        assert_eq!(store.get_bool("flag").await.unwrap(), None);
    }
}
