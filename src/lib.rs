//! # Archive Player Core
//!
//! Host-facing facade for the archive player: a local-first browser and
//! player for a large, slowly-changing remote audio hierarchy that is only
//! reachable through directory-listing pages.
//!
//! This crate wires the workspace members together (the SQLite mirror
//! store, the listing provider, the sync scheduler and the playback session)
//! and exposes them behind one [`ArchiveCore`] handle. The UI layer talks to
//! this seam only; it never touches the network or the storage directly.
//!
//! ## Usage
//!
//! ```ignore
//! use apc_core::{ArchiveCore, CoreConfig};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/data/archive.db")
//!     .settings_store(settings)
//!     .build()?;
//!
//! let core = ArchiveCore::init(config, engine).await?;
//! let roots = core.folder_contents("/").await?;
//! core.session.play_queue(items, 0).await?;
//! ```

use std::sync::Arc;

use bridge_desktop::ReqwestHttpClient;
use bridge_traits::engine::AudioEngine;
use bridge_traits::http::HttpClient;
use bridge_traits::time::{Clock, SystemClock};
use core_library::db::{create_pool, DatabaseConfig};
use core_library::repositories::{
    SqliteFavoriteRepository, SqliteTrackRepository, SqliteTreeRepository,
};
use core_library::{FavoriteRepository, TrackRepository, TreeRepository};
use core_playback::{PlaybackConfig, PlaybackSession};
use core_runtime::events::EventBus;
use core_sync::{SqliteSyncTimestampRepository, SyncConfig, SyncScheduler};
use provider_listing::ListingConnector;
use sqlx::SqlitePool;
use tracing::{debug, info};

// Re-export the member surface hosts are expected to use.
pub use bridge_traits::engine::{AudioSource, EngineHandle, EngineStatus};
pub use bridge_traits::settings::SettingsStore;
pub use core_library::models::{EntryKind, Favorite, TrackPatch, TrackRecord, TreeEntry};
pub use core_library::LibraryError;
pub use core_playback::{PlayQueue, PlaybackError, PlayerState, QueueItem};
pub use core_runtime::config::CoreConfig;
pub use core_runtime::events::{CoreEvent, LibraryEvent, PlaybackEvent, SyncEvent};
pub use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};

/// Errors surfaced while assembling the core.
#[derive(thiserror::Error, Debug)]
pub enum CoreInitError {
    #[error("Store initialization failed: {0}")]
    Store(#[from] core_library::LibraryError),
}

/// Aggregated handle to the assembled core.
///
/// Constructed once per app lifetime; cheap to share via the contained
/// `Arc`s. Fields are public so hosts can reach each subsystem directly.
pub struct ArchiveCore {
    pool: SqlitePool,

    /// Event bus all subsystems publish to.
    pub events: Arc<EventBus>,

    /// Tree mirror queries.
    pub tree: Arc<dyn TreeRepository>,

    /// Track playback/download metadata.
    pub tracks: Arc<dyn TrackRepository>,

    /// Favorited folders.
    pub favorites: Arc<dyn FavoriteRepository>,

    /// Staleness-driven mirror refresh.
    pub scheduler: Arc<SyncScheduler>,

    /// The playback state machine.
    pub session: Arc<PlaybackSession>,
}

impl ArchiveCore {
    /// Assemble the core from a validated configuration and the host's
    /// audio engine.
    pub async fn init(
        config: CoreConfig,
        engine: Arc<dyn AudioEngine>,
    ) -> Result<Self, CoreInitError> {
        info!(database = ?config.database_path, "Initializing archive player core");

        let db_config = if config.database_path.as_os_str() == ":memory:" {
            DatabaseConfig::in_memory()
        } else {
            DatabaseConfig::new(&config.database_path)
        };
        let pool = create_pool(db_config).await?;
        let events = Arc::new(EventBus::default());

        let tree: Arc<dyn TreeRepository> = Arc::new(SqliteTreeRepository::new(pool.clone()));
        let tracks: Arc<dyn TrackRepository> = Arc::new(SqliteTrackRepository::new(pool.clone()));
        let favorites: Arc<dyn FavoriteRepository> =
            Arc::new(SqliteFavoriteRepository::new(pool.clone()));
        let sync_meta = Arc::new(SqliteSyncTimestampRepository::new(pool.clone()));

        let http_client: Arc<dyn HttpClient> = match &config.http_client {
            Some(client) => Arc::clone(client),
            None => Arc::new(ReqwestHttpClient::with_timeout(config.fetch_timeout)),
        };

        let connector = Arc::new(
            ListingConnector::new(
                http_client,
                config.listing_url.clone(),
                config.audio_base_url.clone(),
            )
            .with_timeout(config.fetch_timeout),
        );

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let scheduler = Arc::new(SyncScheduler::new(
            connector,
            Arc::clone(&tree),
            sync_meta,
            Arc::clone(&events),
            clock,
            SyncConfig::default(),
        ));

        let session = PlaybackSession::new(
            engine,
            Arc::clone(&tracks),
            Arc::clone(&config.settings_store),
            Arc::clone(&events),
            PlaybackConfig::default(),
        );

        Ok(Self {
            pool,
            events,
            tree,
            tracks,
            favorites,
            scheduler,
            session,
        })
    }

    /// Contents of a folder, cache-first.
    ///
    /// Cached children are returned immediately and a passive background
    /// refresh is kicked off for stale folders (new entries arrive as
    /// `Library` events). An empty cache forces a blocking refresh that
    /// degrades to the (empty) cache when the remote is unreachable; an
    /// unreachable host with nothing cached reads as an empty folder, not
    /// an error.
    pub async fn folder_contents(&self, path: &str) -> Result<Vec<TreeEntry>, LibraryError> {
        let cached = self.tree.children(path).await?;

        if cached.is_empty() {
            debug!(path, "Mirror empty, forcing sync");
            return Ok(self.scheduler.force_sync(path).await);
        }

        self.scheduler.sync_if_needed(path, None);
        Ok(cached)
    }

    /// Case-insensitive substring search over mirrored entry names.
    pub async fn search(&self, needle: &str) -> Result<Vec<TreeEntry>, LibraryError> {
        self.tree.search(needle).await
    }

    /// Build queue items for a folder's audio children, in mirror order.
    pub async fn queue_for_folder(
        &self,
        folder_path: &str,
        folder_name: &str,
    ) -> Result<Vec<QueueItem>, LibraryError> {
        let children = self.tree.children(folder_path).await?;
        Ok(PlayQueue::items_from_children(
            &children,
            folder_path,
            folder_name,
        ))
    }

    /// The underlying connection pool, for host-driven maintenance.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
