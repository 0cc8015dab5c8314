//! # Sync Scheduler
//!
//! Staleness-driven refresh of the local tree mirror.
//!
//! ## Workflow
//!
//! ### Passive refresh
//! 1. Caller reads a folder and fires [`SyncScheduler::sync_if_needed`]
//! 2. The call returns immediately; a task checks the staleness policy
//! 3. If stale: fetch the remote listing, diff against local children by
//!    path, merge only the new entries, record the sync timestamp
//! 4. When new entries exist AND this is still the most recent request for
//!    the path, the caller's callback receives the full fresh listing
//! 5. Any failure is logged and swallowed; passive work never surfaces
//!    errors to a caller that did not ask for them
//!
//! ### Forced refresh
//! Same fetch→diff→merge pipeline, but awaited by the caller and degrading
//! to whatever is cached when the remote fails or returns nothing. A forced
//! sync with any cached data never comes back empty, and never throws.

use crate::{Result, SyncTimestampRepository};
use bridge_traits::listing::{ListingSource, RemoteEntry, RemoteEntryKind};
use bridge_traits::time::Clock;
use core_library::models::{EntryKind, TreeEntry};
use core_library::TreeRepository;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, SyncEvent};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Callback invoked with the full fresh listing after a passive refresh
/// that learned new entries.
pub type OnNewItems = Box<dyn FnOnce(Vec<TreeEntry>) + Send + 'static>;

/// Sync scheduler configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How long a folder's mirror stays fresh after a sync
    pub retention_window: Duration,

    /// Minimum interval between retention cleanup passes
    pub cleanup_interval: Duration,

    /// Maximum number of folder timestamps kept before eviction
    pub max_tracked_paths: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retention_window: Duration::from_secs(30 * 24 * 60 * 60), // 30 days
            cleanup_interval: Duration::from_secs(7 * 24 * 60 * 60),  // 7 days
            max_tracked_paths: 1000,
        }
    }
}

struct RefreshOutcome {
    /// Full fresh listing, in remote order, with store-assigned ids.
    fresh: Vec<TreeEntry>,
    /// Number of entries not previously known locally.
    new_items: usize,
}

/// Scheduler driving passive and forced refreshes of the tree mirror
pub struct SyncScheduler {
    /// Remote listing source
    source: Arc<dyn ListingSource>,

    /// Tree mirror repository
    tree: Arc<dyn TreeRepository>,

    /// Sync timestamp repository
    meta: Arc<dyn SyncTimestampRepository>,

    /// Event bus for sync lifecycle events
    events: Arc<EventBus>,

    /// Time source
    clock: Arc<dyn Clock>,

    /// Configuration
    config: SyncConfig,

    /// Most recent passive request generation per folder path
    requests: Mutex<HashMap<String, u64>>,

    /// Generation counter for passive requests
    next_request: AtomicU64,
}

impl SyncScheduler {
    /// Create a new sync scheduler
    pub fn new(
        source: Arc<dyn ListingSource>,
        tree: Arc<dyn TreeRepository>,
        meta: Arc<dyn SyncTimestampRepository>,
        events: Arc<EventBus>,
        clock: Arc<dyn Clock>,
        config: SyncConfig,
    ) -> Self {
        Self {
            source,
            tree,
            meta,
            events,
            clock,
            config,
            requests: Mutex::new(HashMap::new()),
            next_request: AtomicU64::new(1),
        }
    }

    /// Whether the folder's mirror is stale and eligible for refresh.
    ///
    /// A folder needs sync when it was never synced, or when its last sync
    /// is older than the retention window. Bookkeeping failures degrade to
    /// "needs sync"; refreshing too eagerly is the safe direction.
    pub async fn needs_sync(&self, path: &str) -> bool {
        match self.meta.last_synced(path).await {
            Ok(Some(ts)) => {
                let age = self.clock.unix_timestamp().saturating_sub(ts);
                age > self.config.retention_window.as_secs() as i64
            }
            Ok(None) => true,
            Err(e) => {
                warn!(path, error = %e, "Failed to read sync timestamp");
                true
            }
        }
    }

    /// Passive refresh: returns immediately, work happens in the background.
    ///
    /// When the refresh learns new entries and this call is still the most
    /// recent passive request for `path`, `on_new_items` receives the full
    /// fresh listing. Stale responses are discarded: last request wins.
    pub fn sync_if_needed(self: &Arc<Self>, path: &str, on_new_items: Option<OnNewItems>) {
        let generation = self.begin_request(path);
        let scheduler = Arc::clone(self);
        let path = path.to_string();

        tokio::spawn(async move {
            if !scheduler.needs_sync(&path).await {
                debug!(path, "Folder is fresh, passive sync skipped");
                return;
            }

            scheduler.emit(CoreEvent::Sync(SyncEvent::Started {
                folder_path: path.clone(),
            }));

            match scheduler.refresh(&path).await {
                Ok(outcome) => {
                    scheduler.emit(CoreEvent::Sync(SyncEvent::Completed {
                        folder_path: path.clone(),
                        new_items: outcome.new_items,
                    }));

                    if outcome.new_items > 0 {
                        if scheduler.is_current_request(&path, generation) {
                            if let Some(callback) = on_new_items {
                                callback(outcome.fresh);
                            }
                        } else {
                            debug!(path, "Discarding stale passive sync result");
                        }
                    }
                }
                Err(e) => {
                    // Passive work was never requested by the user; log and move on.
                    warn!(path, error = %e, "Passive sync failed");
                    scheduler.emit(CoreEvent::Sync(SyncEvent::Failed {
                        folder_path: path.clone(),
                        message: e.to_string(),
                    }));
                }
            }
        });
    }

    /// Forced refresh: blocking, never errors outward.
    ///
    /// Returns the fresh remote listing when it is non-empty, otherwise
    /// whatever the mirror already holds for the folder.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn force_sync(&self, path: &str) -> Vec<TreeEntry> {
        self.emit(CoreEvent::Sync(SyncEvent::Started {
            folder_path: path.to_string(),
        }));

        match self.refresh(path).await {
            Ok(outcome) => {
                self.emit(CoreEvent::Sync(SyncEvent::Completed {
                    folder_path: path.to_string(),
                    new_items: outcome.new_items,
                }));

                if outcome.fresh.is_empty() {
                    debug!(path, "Remote listing empty, serving cached children");
                    self.cached_children(path).await
                } else {
                    outcome.fresh
                }
            }
            Err(e) => {
                warn!(path, error = %e, "Forced sync failed, serving cached children");
                self.emit(CoreEvent::Sync(SyncEvent::Failed {
                    folder_path: path.to_string(),
                    message: e.to_string(),
                }));
                self.cached_children(path).await
            }
        }
    }

    /// Shared fetch → diff → merge pipeline.
    async fn refresh(&self, path: &str) -> Result<RefreshOutcome> {
        let remote = self.source.fetch_listing(path).await?;
        let local = self.tree.children(path).await?;

        let known: HashSet<&str> = local.iter().map(|e| e.path.as_str()).collect();
        let now = self.clock.unix_timestamp();

        let mapped: Vec<TreeEntry> = remote
            .iter()
            .enumerate()
            .map(|(index, entry)| map_remote_entry(entry, index as i64, now))
            .collect();

        let new_entries: Vec<TreeEntry> = mapped
            .iter()
            .filter(|e| !known.contains(e.path.as_str()))
            .cloned()
            .collect();
        let new_items = new_entries.len();

        if !new_entries.is_empty() {
            self.tree.bulk_insert_if_absent(&new_entries).await?;
            info!(path, new_items, "Merged new entries into mirror");
            self.emit(CoreEvent::Library(LibraryEvent::EntriesMerged {
                folder_path: path.to_string(),
                count: new_items,
            }));
        }

        // A folder confirmed unchanged still counts as freshly synced.
        self.record_synced(path).await;

        // Re-read so the fresh listing carries store-assigned ids, but keep
        // the remote ordering.
        let stored = self.tree.children(path).await?;
        let by_path: HashMap<&str, &TreeEntry> =
            stored.iter().map(|e| (e.path.as_str(), e)).collect();
        let fresh = mapped
            .into_iter()
            .map(|m| by_path.get(m.path.as_str()).map(|e| (*e).clone()).unwrap_or(m))
            .collect();

        Ok(RefreshOutcome { fresh, new_items })
    }

    async fn cached_children(&self, path: &str) -> Vec<TreeEntry> {
        match self.tree.children(path).await {
            Ok(children) => children,
            Err(e) => {
                warn!(path, error = %e, "Failed to read cached children");
                Vec::new()
            }
        }
    }

    /// Record a successful sync and opportunistically run the retention
    /// cleanup. Bookkeeping failures are logged and swallowed; they only
    /// cost an extra refresh later.
    async fn record_synced(&self, path: &str) {
        let now = self.clock.unix_timestamp();
        if let Err(e) = self.meta.mark_synced(path, now).await {
            warn!(path, error = %e, "Failed to record sync timestamp");
            return;
        }
        self.run_cleanup_if_due(now).await;
    }

    /// Retention cleanup, gated by its own last-run marker.
    async fn run_cleanup_if_due(&self, now: i64) {
        let due = match self.meta.last_cleanup().await {
            Ok(Some(ts)) => now.saturating_sub(ts) > self.config.cleanup_interval.as_secs() as i64,
            Ok(None) => true,
            Err(e) => {
                warn!(error = %e, "Failed to read cleanup marker");
                false
            }
        };
        if !due {
            return;
        }

        if let Err(e) = self.meta.set_last_cleanup(now).await {
            warn!(error = %e, "Failed to record cleanup run");
            return;
        }

        match self.meta.count().await {
            Ok(count) if count > self.config.max_tracked_paths => {
                let excess = count - self.config.max_tracked_paths;
                match self.meta.evict_oldest(excess).await {
                    Ok(evicted) => {
                        info!(evicted, remaining = count - evicted as i64, "Evicted old sync timestamps")
                    }
                    Err(e) => warn!(error = %e, "Timestamp eviction failed"),
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to count sync timestamps"),
        }
    }

    fn begin_request(&self, path: &str) -> u64 {
        let generation = self.next_request.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut requests) = self.requests.lock() {
            requests.insert(path.to_string(), generation);
        }
        generation
    }

    fn is_current_request(&self, path: &str, generation: u64) -> bool {
        self.requests
            .lock()
            .map(|requests| requests.get(path) == Some(&generation))
            .unwrap_or(false)
    }

    fn emit(&self, event: CoreEvent) {
        // Emitting into the void is fine; nobody may be listening yet.
        let _ = self.events.emit(event);
    }
}

fn map_remote_entry(entry: &RemoteEntry, sort_order: i64, now: i64) -> TreeEntry {
    let kind = match entry.kind {
        RemoteEntryKind::Folder => EntryKind::Folder,
        RemoteEntryKind::Audio => EntryKind::Audio,
    };
    TreeEntry::new(
        entry.parent_path.clone(),
        entry.name.clone(),
        entry.path.clone(),
        kind,
        sort_order,
        now,
    )
}
