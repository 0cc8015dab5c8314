//! Favorite folder repository trait and implementation

use crate::error::Result;
use crate::models::Favorite;
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};

/// Favorite folder repository interface
#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    /// All favorites, most recently added first.
    async fn list(&self) -> Result<Vec<Favorite>>;

    /// Add a favorite. Adding an already-favorited path is a no-op.
    async fn add(&self, folder_path: &str, folder_name: &str) -> Result<()>;

    /// Remove a favorite. Returns whether a row was removed.
    async fn remove(&self, folder_path: &str) -> Result<bool>;

    /// Whether the given folder is favorited.
    async fn exists(&self, folder_path: &str) -> Result<bool>;

    /// Flip the favorite state of a folder. Returns the new state.
    async fn toggle(&self, folder_path: &str, folder_name: &str) -> Result<bool> {
        if self.exists(folder_path).await? {
            self.remove(folder_path).await?;
            Ok(false)
        } else {
            self.add(folder_path, folder_name).await?;
            Ok(true)
        }
    }
}

/// SQLite implementation of FavoriteRepository
pub struct SqliteFavoriteRepository {
    pool: SqlitePool,
}

impl SqliteFavoriteRepository {
    /// Create a new SQLite favorite repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FavoriteRepository for SqliteFavoriteRepository {
    async fn list(&self) -> Result<Vec<Favorite>> {
        let favorites = query_as::<_, Favorite>(
            "SELECT * FROM favorites ORDER BY added_at DESC, folder_name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(favorites)
    }

    async fn add(&self, folder_path: &str, folder_name: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO favorites (folder_path, folder_name, added_at) VALUES (?, ?, ?)",
        )
        .bind(folder_path)
        .bind(folder_name)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, folder_path: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE folder_path = ?")
            .bind(folder_path)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, folder_path: &str) -> Result<bool> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM favorites WHERE folder_path = ?")
            .bind(folder_path)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0 > 0)
    }
}
