//! # Database Connection Pool Module
//!
//! Provides SQLite connection pooling with the configuration the mirror
//! store needs.
//!
//! ## Features
//!
//! - **WAL Mode**: multiple readers, one serialized writer. This is what
//!   makes concurrent position saves, background sync merges and UI reads
//!   safe without external locking
//! - **Connection Pooling**: configurable min/max connections with timeouts
//! - **Automatic Migrations**: embedded, run on initialization
//! - **Legacy Seed Normalization**: a bundled pre-seeded snapshot in the old
//!   `archive_index` shape is folded into the canonical schema exactly once
//! - **Health Checks**: connection validation
//!
//! ## Testing
//!
//! For tests, use in-memory databases:
//!
//! ```rust,ignore
//! let pool = create_test_pool().await?;
//! ```

use crate::{LibraryError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Database configuration for the SQLite connection pool
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file path or `:memory:` for an in-memory database
    pub database_url: String,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Maximum time to wait for a connection from the pool
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    /// Create a new database configuration with the given file path
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();
        let database_url = format!("sqlite:{}", path.display());

        Self {
            database_url,
            min_connections: 1,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// Create a configuration for an in-memory database (useful for testing)
    ///
    /// Capped at a single connection: SQLite gives every `:memory:`
    /// connection its own private database, so a larger pool would hand out
    /// handles that cannot see each other's tables.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            min_connections: 1,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// Set the maximum number of connections
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the connection acquire timeout
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Create a configured SQLite connection pool
///
/// This function:
/// 1. Configures SQLite connection options (WAL mode, foreign keys)
/// 2. Creates a connection pool with the specified configuration
/// 3. Runs database migrations
/// 4. Normalizes a bundled legacy seed, when present
/// 5. Performs a health check
///
/// # Errors
///
/// Returns an error if the database file cannot be accessed, pool creation
/// fails, migrations fail or the health check fails.
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    info!(
        database_url = %config.database_url,
        max_connections = config.max_connections,
        "Creating database connection pool"
    );

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(LibraryError::Database)?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .create_if_missing(true)
        .pragma("cache_size", "-64000");

    debug!("SQLite connection options configured");

    let pool = SqlitePoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create connection pool");
            LibraryError::Database(e)
        })?;

    run_migrations(&pool).await?;
    normalize_legacy_seed(&pool).await?;
    health_check(&pool).await?;

    Ok(pool)
}

/// Create a connection pool for testing with an in-memory database
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    let config = DatabaseConfig::in_memory();
    create_pool(config).await
}

/// Run database migrations
///
/// Migrations are embedded in the binary at compile time using
/// `sqlx::migrate!()`.
async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Migration failed");
            LibraryError::Migration(e.to_string())
        })?;

    info!("Database migrations completed");
    Ok(())
}

/// Fold a bundled legacy seed table into the canonical schema.
///
/// First-run installs ship with a pre-seeded snapshot of the remote tree in
/// the old `archive_index(parent, title, link, entry_type, position)` shape.
/// Rows are copied into `tree_entries` and the legacy table is dropped, so no
/// runtime query ever has to branch on where a row came from. Running against
/// a database without the legacy table is a no-op.
pub async fn normalize_legacy_seed(pool: &Pool<Sqlite>) -> Result<()> {
    let legacy: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'archive_index'",
    )
    .fetch_one(pool)
    .await?;

    if legacy.0 == 0 {
        return Ok(());
    }

    info!("Normalizing legacy seed data into canonical schema");

    let now = chrono::Utc::now().timestamp();

    let inserted = sqlx::query(
        r#"
        INSERT OR IGNORE INTO tree_entries
            (parent_path, name, path, kind, sort_order, last_updated)
        SELECT
            parent,
            title,
            link,
            CASE WHEN entry_type = 'dir' THEN 'folder' ELSE 'audio' END,
            COALESCE(position, 0),
            ?
        FROM archive_index
        WHERE parent IS NOT NULL AND title IS NOT NULL AND link IS NOT NULL
        "#,
    )
    .bind(now)
    .execute(pool)
    .await?
    .rows_affected();

    sqlx::query("DROP TABLE archive_index").execute(pool).await?;

    info!(rows = inserted, "Legacy seed normalized and dropped");
    Ok(())
}

/// Perform a health check on the connection pool
async fn health_check(pool: &Pool<Sqlite>) -> Result<()> {
    debug!("Performing database health check");

    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| {
        warn!(error = %e, "Database health check failed");
        LibraryError::Database(e)
    })?;

    debug!("Database health check passed");
    Ok(())
}
