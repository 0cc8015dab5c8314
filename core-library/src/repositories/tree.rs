//! Tree entry repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{EntryKind, TreeEntry};
use async_trait::async_trait;
use sqlx::{query_as, FromRow, SqlitePool};
use tracing::debug;

/// Maximum number of rows a substring search returns.
pub const SEARCH_RESULT_CAP: u32 = 100;

/// Tree entry repository interface for mirror access operations
#[async_trait]
pub trait TreeRepository: Send + Sync {
    /// Immediate children of a folder, ordered by `sort_order` then name.
    async fn children(&self, parent_path: &str) -> Result<Vec<TreeEntry>>;

    /// Point lookup by the globally unique entry path.
    async fn find_by_path(&self, path: &str) -> Result<Option<TreeEntry>>;

    /// Case-insensitive substring search over entry names.
    ///
    /// Results are capped at [`SEARCH_RESULT_CAP`] and ordered by name.
    /// An empty needle matches nothing.
    async fn search(&self, needle: &str) -> Result<Vec<TreeEntry>>;

    /// Insert each entry unless a row with the same path already exists.
    ///
    /// This is the merge primitive every sync path uses: re-fetching a folder
    /// and inserting its listing twice never duplicates rows. Returns the
    /// number of rows actually inserted.
    async fn bulk_insert_if_absent(&self, entries: &[TreeEntry]) -> Result<u64>;

    /// Total number of mirrored entries.
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of TreeRepository
pub struct SqliteTreeRepository {
    pool: SqlitePool,
}

impl SqliteTreeRepository {
    /// Create a new SQLite tree repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a tree entry
#[derive(Debug, FromRow)]
struct TreeEntryRow {
    id: i64,
    parent_path: String,
    name: String,
    path: String,
    kind: String,
    sort_order: i64,
    last_updated: i64,
}

impl TryFrom<TreeEntryRow> for TreeEntry {
    type Error = LibraryError;

    fn try_from(row: TreeEntryRow) -> Result<Self> {
        let kind = EntryKind::parse(&row.kind).ok_or_else(|| LibraryError::InvalidInput {
            field: "kind".to_string(),
            message: format!("Unknown entry kind: {}", row.kind),
        })?;

        Ok(TreeEntry {
            id: row.id,
            parent_path: row.parent_path,
            name: row.name,
            path: row.path,
            kind,
            sort_order: row.sort_order,
            last_updated: row.last_updated,
        })
    }
}

#[async_trait]
impl TreeRepository for SqliteTreeRepository {
    async fn children(&self, parent_path: &str) -> Result<Vec<TreeEntry>> {
        let rows = query_as::<_, TreeEntryRow>(
            "SELECT * FROM tree_entries WHERE parent_path = ? ORDER BY sort_order ASC, name ASC",
        )
        .bind(parent_path)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TreeEntry::try_from).collect()
    }

    async fn find_by_path(&self, path: &str) -> Result<Option<TreeEntry>> {
        let row = query_as::<_, TreeEntryRow>("SELECT * FROM tree_entries WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TreeEntry::try_from).transpose()
    }

    async fn search(&self, needle: &str) -> Result<Vec<TreeEntry>> {
        if needle.trim().is_empty() {
            return Ok(Vec::new());
        }

        let pattern = format!("%{}%", needle.to_lowercase());

        let rows = query_as::<_, TreeEntryRow>(
            "SELECT * FROM tree_entries WHERE LOWER(name) LIKE ? ORDER BY name ASC LIMIT ?",
        )
        .bind(&pattern)
        .bind(SEARCH_RESULT_CAP)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TreeEntry::try_from).collect()
    }

    async fn bulk_insert_if_absent(&self, entries: &[TreeEntry]) -> Result<u64> {
        if entries.is_empty() {
            return Ok(0);
        }

        for entry in entries {
            entry.validate().map_err(|msg| LibraryError::InvalidInput {
                field: "entry".to_string(),
                message: msg,
            })?;
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for entry in entries {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO tree_entries
                    (parent_path, name, path, kind, sort_order, last_updated)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&entry.parent_path)
            .bind(&entry.name)
            .bind(&entry.path)
            .bind(entry.kind.as_str())
            .bind(entry.sort_order)
            .bind(entry.last_updated)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;

        debug!(
            offered = entries.len(),
            inserted, "Merged entries into mirror"
        );

        Ok(inserted)
    }

    async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tree_entries")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    fn folder(parent: &str, name: &str, path: &str, order: i64) -> TreeEntry {
        TreeEntry::new(parent, name, path, EntryKind::Folder, order, 1_700_000_000)
    }

    fn audio(parent: &str, name: &str, path: &str, order: i64) -> TreeEntry {
        TreeEntry::new(parent, name, path, EntryKind::Audio, order, 1_700_000_000)
    }

    #[tokio::test]
    async fn test_bulk_insert_and_children_ordering() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTreeRepository::new(pool);

        let entries = vec![
            folder("/Katha", "B Speaker", "/Katha/B_Speaker", 1),
            folder("/Katha", "A Speaker", "/Katha/A_Speaker", 0),
            audio(
                "/Katha",
                "01 Track",
                "https://audio.example.org/files/Katha/01.mp3",
                2,
            ),
        ];
        let inserted = repo.bulk_insert_if_absent(&entries).await.unwrap();
        assert_eq!(inserted, 3);

        let children = repo.children("/Katha").await.unwrap();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].name, "A Speaker");
        assert_eq!(children[1].name, "B Speaker");
        assert_eq!(children[2].name, "01 Track");
        assert!(children.iter().all(|c| c.id > 0));
    }

    #[tokio::test]
    async fn test_bulk_insert_is_idempotent() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTreeRepository::new(pool);

        let entries = vec![
            folder("/Katha", "A Speaker", "/Katha/A_Speaker", 0),
            folder("/Katha", "B Speaker", "/Katha/B_Speaker", 1),
        ];

        assert_eq!(repo.bulk_insert_if_absent(&entries).await.unwrap(), 2);
        // Second merge with the same set changes nothing
        assert_eq!(repo.bulk_insert_if_absent(&entries).await.unwrap(), 0);

        let children = repo.children("/Katha").await.unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_path_across_parents_is_ignored() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTreeRepository::new(pool);

        let first = vec![folder("/Katha", "A", "/Katha/A", 0)];
        let second = vec![folder("/Other", "A again", "/Katha/A", 0)];

        repo.bulk_insert_if_absent(&first).await.unwrap();
        assert_eq!(repo.bulk_insert_if_absent(&second).await.unwrap(), 0);

        let found = repo.find_by_path("/Katha/A").await.unwrap().unwrap();
        assert_eq!(found.parent_path, "/Katha");
        assert_eq!(found.name, "A");
    }

    #[tokio::test]
    async fn test_find_by_path() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTreeRepository::new(pool);

        repo.bulk_insert_if_absent(&[folder("/", "Katha", "/Katha", 0)])
            .await
            .unwrap();

        assert!(repo.find_by_path("/Katha").await.unwrap().is_some());
        assert!(repo.find_by_path("/Kirtan").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_case_insensitive_and_capped() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteTreeRepository::new(pool);

        let mut entries = vec![folder("/", "Asa Di Var", "/Asa_Di_Var", 0)];
        for i in 0..120 {
            entries.push(audio(
                "/Nitnem",
                &format!("Nitnem Track {:03}", i),
                &format!("https://audio.example.org/files/Nitnem/{:03}.mp3", i),
                i,
            ));
        }
        repo.bulk_insert_if_absent(&entries).await.unwrap();

        let hits = repo.search("asa di").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Asa Di Var");

        let capped = repo.search("NITNEM").await.unwrap();
        assert_eq!(capped.len(), SEARCH_RESULT_CAP as usize);

        assert!(repo.search("   ").await.unwrap().is_empty());
    }
}
