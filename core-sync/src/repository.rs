//! # Sync Timestamp Repository
//!
//! Database persistence for per-folder last-sync bookkeeping.
//!
//! ## Overview
//!
//! One row per folder path records when that folder was last successfully
//! refreshed. The table is deliberately independent of the tree mirror: a
//! folder's entries survive even when its timestamp is evicted, the folder
//! simply becomes eligible for re-sync again. A small housekeeping table
//! carries the cleanup pass's own last-run marker.

use crate::{Result, SyncError};
use async_trait::async_trait;
use sqlx::SqlitePool;

/// Housekeeping key for the retention cleanup's last run.
const LAST_CLEANUP_KEY: &str = "last_cleanup";

/// Repository trait for sync timestamp persistence
#[async_trait]
pub trait SyncTimestampRepository: Send + Sync {
    /// When the folder was last successfully synced, if ever.
    async fn last_synced(&self, folder_path: &str) -> Result<Option<i64>>;

    /// Record a successful sync of the folder.
    async fn mark_synced(&self, folder_path: &str, synced_at: i64) -> Result<()>;

    /// Number of tracked folder timestamps.
    async fn count(&self) -> Result<i64>;

    /// Remove the `count` oldest timestamps. Returns how many were removed.
    async fn evict_oldest(&self, count: i64) -> Result<u64>;

    /// When the retention cleanup last ran, if ever.
    async fn last_cleanup(&self) -> Result<Option<i64>>;

    /// Record a run of the retention cleanup.
    async fn set_last_cleanup(&self, ts: i64) -> Result<()>;
}

/// SQLite implementation of SyncTimestampRepository
pub struct SqliteSyncTimestampRepository {
    pool: SqlitePool,
}

impl SqliteSyncTimestampRepository {
    /// Create a new SQLite sync timestamp repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn db_err(e: sqlx::Error) -> SyncError {
    SyncError::Database(e.to_string())
}

#[async_trait]
impl SyncTimestampRepository for SqliteSyncTimestampRepository {
    async fn last_synced(&self, folder_path: &str) -> Result<Option<i64>> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT synced_at FROM sync_timestamps WHERE folder_path = ?")
                .bind(folder_path)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(row.map(|r| r.0))
    }

    async fn mark_synced(&self, folder_path: &str, synced_at: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_timestamps (folder_path, synced_at)
            VALUES (?, ?)
            ON CONFLICT(folder_path) DO UPDATE SET synced_at = excluded.synced_at
            "#,
        )
        .bind(folder_path)
        .bind(synced_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sync_timestamps")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(count.0)
    }

    async fn evict_oldest(&self, count: i64) -> Result<u64> {
        if count <= 0 {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            DELETE FROM sync_timestamps WHERE folder_path IN (
                SELECT folder_path FROM sync_timestamps
                ORDER BY synced_at ASC, folder_path ASC
                LIMIT ?
            )
            "#,
        )
        .bind(count)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected())
    }

    async fn last_cleanup(&self) -> Result<Option<i64>> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT value FROM sync_housekeeping WHERE key = ?")
                .bind(LAST_CLEANUP_KEY)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(row.map(|r| r.0))
    }

    async fn set_last_cleanup(&self, ts: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_housekeeping (key, value)
            VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(LAST_CLEANUP_KEY)
        .bind(ts)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
