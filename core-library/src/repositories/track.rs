//! Track record repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{TrackPatch, TrackRecord};
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};
use tracing::debug;

/// Track record repository interface
///
/// Multiple independent flows write here concurrently: the position saver,
/// completion detection, the download manager and explicit user actions.
/// Every write is therefore either keyed-and-narrow (`update_position`,
/// `set_completed`) or a field-level merge (`upsert`), so a writer can never
/// discard fields it did not set.
#[async_trait]
pub trait TrackRepository: Send + Sync {
    /// Find a track record by its URL.
    async fn find_by_url(&self, track_url: &str) -> Result<Option<TrackRecord>>;

    /// Insert-or-merge a partial record.
    ///
    /// Unset patch fields keep their stored values; on first insert they
    /// take the column defaults.
    async fn upsert(&self, patch: TrackPatch) -> Result<()>;

    /// Write the resume position and completion flag for a track,
    /// creating the record first if absent.
    async fn update_position(&self, track_url: &str, position_secs: f64, completed: bool)
        -> Result<()>;

    /// Set or clear the completed flag, creating the record first if absent.
    ///
    /// Marking complete also resets the resume position to 0; un-marking
    /// leaves the position untouched.
    async fn set_completed(&self, track_url: &str, completed: bool) -> Result<()>;

    /// Downloaded tracks, most recently downloaded first.
    async fn list_downloaded(&self, limit: u32, offset: u32) -> Result<Vec<TrackRecord>>;

    /// Tracks with a recorded playback start, most recent first.
    async fn list_recently_played(&self, limit: u32) -> Result<Vec<TrackRecord>>;

    /// Clear the download-related fields of a record, keeping playback state.
    async fn clear_download(&self, track_url: &str) -> Result<()>;
}

/// SQLite implementation of TrackRepository
pub struct SqliteTrackRepository {
    pool: SqlitePool,
}

impl SqliteTrackRepository {
    /// Create a new SQLite track repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn ensure_exists(&self, track_url: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO track_records (track_url) VALUES (?)")
            .bind(track_url)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl TrackRepository for SqliteTrackRepository {
    async fn find_by_url(&self, track_url: &str) -> Result<Option<TrackRecord>> {
        let record = query_as::<_, TrackRecord>("SELECT * FROM track_records WHERE track_url = ?")
            .bind(track_url)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    async fn upsert(&self, patch: TrackPatch) -> Result<()> {
        if patch.track_url.trim().is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "track_url".to_string(),
                message: "Track URL cannot be empty".to_string(),
            });
        }

        // Each optional field is bound twice: once for the insert values
        // (coalesced to the column default) and once for the merge, where a
        // NULL bind keeps the stored value.
        sqlx::query(
            r#"
            INSERT INTO track_records (
                track_url, track_name, duration_secs, size_bytes,
                playback_position, is_downloaded, local_file_path,
                last_played_at, downloaded_at, is_completed
            ) VALUES (
                ?, COALESCE(?, ''), COALESCE(?, 0), COALESCE(?, 0),
                COALESCE(?, 0), COALESCE(?, 0), ?,
                ?, ?, COALESCE(?, 0)
            )
            ON CONFLICT(track_url) DO UPDATE SET
                track_name = COALESCE(?, track_name),
                duration_secs = COALESCE(?, duration_secs),
                size_bytes = COALESCE(?, size_bytes),
                playback_position = COALESCE(?, playback_position),
                is_downloaded = COALESCE(?, is_downloaded),
                local_file_path = COALESCE(?, local_file_path),
                last_played_at = COALESCE(?, last_played_at),
                downloaded_at = COALESCE(?, downloaded_at),
                is_completed = COALESCE(?, is_completed)
            "#,
        )
        .bind(&patch.track_url)
        .bind(&patch.track_name)
        .bind(patch.duration_secs)
        .bind(patch.size_bytes)
        .bind(patch.playback_position)
        .bind(patch.is_downloaded)
        .bind(&patch.local_file_path)
        .bind(patch.last_played_at)
        .bind(patch.downloaded_at)
        .bind(patch.is_completed)
        .bind(&patch.track_name)
        .bind(patch.duration_secs)
        .bind(patch.size_bytes)
        .bind(patch.playback_position)
        .bind(patch.is_downloaded)
        .bind(&patch.local_file_path)
        .bind(patch.last_played_at)
        .bind(patch.downloaded_at)
        .bind(patch.is_completed)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_position(
        &self,
        track_url: &str,
        position_secs: f64,
        completed: bool,
    ) -> Result<()> {
        self.ensure_exists(track_url).await?;

        sqlx::query(
            "UPDATE track_records SET playback_position = ?, is_completed = ? WHERE track_url = ?",
        )
        .bind(position_secs)
        .bind(completed)
        .bind(track_url)
        .execute(&self.pool)
        .await?;

        debug!(track_url, position_secs, completed, "Saved playback position");
        Ok(())
    }

    async fn set_completed(&self, track_url: &str, completed: bool) -> Result<()> {
        self.ensure_exists(track_url).await?;

        if completed {
            // Completing a track also discards its resume point.
            sqlx::query(
                "UPDATE track_records SET is_completed = 1, playback_position = 0 \
                 WHERE track_url = ?",
            )
            .bind(track_url)
            .execute(&self.pool)
            .await?;
        } else {
            sqlx::query("UPDATE track_records SET is_completed = 0 WHERE track_url = ?")
                .bind(track_url)
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }

    async fn list_downloaded(&self, limit: u32, offset: u32) -> Result<Vec<TrackRecord>> {
        let records = query_as::<_, TrackRecord>(
            "SELECT * FROM track_records WHERE is_downloaded = 1 \
             ORDER BY downloaded_at DESC, track_name ASC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn list_recently_played(&self, limit: u32) -> Result<Vec<TrackRecord>> {
        let records = query_as::<_, TrackRecord>(
            "SELECT * FROM track_records WHERE last_played_at IS NOT NULL \
             ORDER BY last_played_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn clear_download(&self, track_url: &str) -> Result<()> {
        sqlx::query(
            "UPDATE track_records SET is_downloaded = 0, local_file_path = NULL, \
             downloaded_at = NULL WHERE track_url = ?",
        )
        .bind(track_url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    const URL: &str = "https://audio.example.org/files/Katha/05--Giani_Ji.ICHRAN.mp3";

    #[tokio::test]
    async fn test_upsert_creates_then_merges() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTrackRepository::new(pool);

        repo.upsert(TrackPatch::new(URL).track_name("Giani Ji ICHRAN"))
            .await
            .unwrap();

        let record = repo.find_by_url(URL).await.unwrap().unwrap();
        assert_eq!(record.track_name, "Giani Ji ICHRAN");
        assert_eq!(record.duration_secs, 0.0);
        assert!(!record.is_downloaded);

        // A later patch touching other fields keeps the name
        repo.upsert(TrackPatch::new(URL).duration_secs(1800.0).size_bytes(42))
            .await
            .unwrap();

        let record = repo.find_by_url(URL).await.unwrap().unwrap();
        assert_eq!(record.track_name, "Giani Ji ICHRAN");
        assert_eq!(record.duration_secs, 1800.0);
        assert_eq!(record.size_bytes, 42);
    }

    #[tokio::test]
    async fn test_independent_writers_do_not_clobber() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTrackRepository::new(pool);

        // Download manager marks the file downloaded...
        repo.upsert(
            TrackPatch::new(URL)
                .is_downloaded(true)
                .local_file_path("/data/downloads/ichran.mp3")
                .downloaded_at(1_700_000_000),
        )
        .await
        .unwrap();

        // ...while the position saver writes playback state
        repo.update_position(URL, 37.5, false).await.unwrap();

        let record = repo.find_by_url(URL).await.unwrap().unwrap();
        assert!(record.is_downloaded);
        assert_eq!(
            record.local_file_path.as_deref(),
            Some("/data/downloads/ichran.mp3")
        );
        assert_eq!(record.playback_position, 37.5);
    }

    #[tokio::test]
    async fn test_update_position_creates_record() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTrackRepository::new(pool);

        repo.update_position(URL, 12.0, false).await.unwrap();

        let record = repo.find_by_url(URL).await.unwrap().unwrap();
        assert_eq!(record.playback_position, 12.0);
        assert!(!record.is_completed);
    }

    #[tokio::test]
    async fn test_set_completed_resets_position() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTrackRepository::new(pool);

        repo.update_position(URL, 1234.5, false).await.unwrap();
        repo.set_completed(URL, true).await.unwrap();

        let record = repo.find_by_url(URL).await.unwrap().unwrap();
        assert!(record.is_completed);
        assert_eq!(record.playback_position, 0.0);
    }

    #[tokio::test]
    async fn test_unset_completed_preserves_position() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTrackRepository::new(pool);

        repo.update_position(URL, 55.0, false).await.unwrap();
        repo.set_completed(URL, false).await.unwrap();

        let record = repo.find_by_url(URL).await.unwrap().unwrap();
        assert!(!record.is_completed);
        assert_eq!(record.playback_position, 55.0);
    }

    #[tokio::test]
    async fn test_natural_completion_reads_zero_position() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTrackRepository::new(pool);

        repo.update_position(URL, 1790.0, false).await.unwrap();
        // Natural completion persists position 0 with the flag
        repo.update_position(URL, 0.0, true).await.unwrap();

        let record = repo.find_by_url(URL).await.unwrap().unwrap();
        assert!(record.is_completed);
        assert_eq!(record.playback_position, 0.0);
    }

    #[tokio::test]
    async fn test_list_downloaded_pagination() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTrackRepository::new(pool);

        for i in 0..5 {
            let url = format!("https://audio.example.org/files/a/{}.mp3", i);
            repo.upsert(
                TrackPatch::new(&url)
                    .track_name(format!("Track {}", i))
                    .is_downloaded(true)
                    .downloaded_at(1_700_000_000 + i),
            )
            .await
            .unwrap();
        }
        // One record that is not downloaded
        repo.upsert(TrackPatch::new("https://audio.example.org/files/x.mp3"))
            .await
            .unwrap();

        let page = repo.list_downloaded(3, 0).await.unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].track_name, "Track 4");

        let rest = repo.list_downloaded(3, 3).await.unwrap();
        assert_eq!(rest.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_download_keeps_playback_state() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTrackRepository::new(pool);

        repo.upsert(
            TrackPatch::new(URL)
                .is_downloaded(true)
                .local_file_path("/data/downloads/a.mp3")
                .downloaded_at(1_700_000_000)
                .playback_position(99.0),
        )
        .await
        .unwrap();

        repo.clear_download(URL).await.unwrap();

        let record = repo.find_by_url(URL).await.unwrap().unwrap();
        assert!(!record.is_downloaded);
        assert!(record.local_file_path.is_none());
        assert!(record.downloaded_at.is_none());
        assert_eq!(record.playback_position, 99.0);
    }

    #[tokio::test]
    async fn test_list_recently_played() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTrackRepository::new(pool);

        for i in 0..3 {
            let url = format!("https://audio.example.org/files/r/{}.mp3", i);
            repo.upsert(TrackPatch::new(&url).last_played_at(1_700_000_000 + i))
                .await
                .unwrap();
        }

        let recent = repo.list_recently_played(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].last_played_at, Some(1_700_000_002));
    }
}
