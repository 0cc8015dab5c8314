//! # Event Bus System
//!
//! Event-driven communication between core modules using
//! `tokio::sync::broadcast`. Publishers emit typed [`CoreEvent`]s; any number
//! of subscribers consume them independently. A UI host subscribes here to
//! refresh views without polling the stores.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! let bus = EventBus::new(100);
//! let mut stream = bus.subscribe();
//!
//! bus.emit(CoreEvent::Sync(SyncEvent::Started {
//!     folder_path: "/Katha".to_string(),
//! }))
//! .ok();
//! ```
//!
//! ## Error Handling
//!
//! Subscribers can observe `RecvError::Lagged(n)` when they fall behind;
//! this is non-fatal and they keep receiving newer events. `RecvError::Closed`
//! signals shutdown.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Folder sync lifecycle events
    Sync(SyncEvent),
    /// Playback session events
    Playback(PlaybackEvent),
    /// Local mirror store events
    Library(LibraryEvent),
}

/// Folder sync lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SyncEvent {
    /// A refresh of `folder_path` has started.
    Started { folder_path: String },
    /// A refresh finished; `new_items` is the number of newly learned entries.
    Completed { folder_path: String, new_items: usize },
    /// A refresh failed. Passive sync swallows the failure after emitting this.
    Failed { folder_path: String, message: String },
}

/// Playback session events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum PlaybackEvent {
    /// A track started loading.
    Loading { track_url: String },
    /// A track is playing.
    Started { track_url: String },
    /// Playback was paused.
    Paused { track_url: String },
    /// Playback resumed after a pause.
    Resumed { track_url: String },
    /// Playback stopped and the queue was cleared.
    Stopped,
    /// A track played to completion.
    Completed { track_url: String },
    /// The session entered the error state.
    Error { message: String },
}

/// Local mirror store events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LibraryEvent {
    /// New entries were merged into a folder's mirror.
    EntriesMerged { folder_path: String, count: usize },
    /// A folder was added to favorites.
    FavoriteAdded { folder_path: String },
    /// A folder was removed from favorites.
    FavoriteRemoved { folder_path: String },
}

/// Central broadcast channel for core events.
///
/// Cheap to clone via `Arc`; fully `Send + Sync`.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns `Err` only when there are no subscribers, which callers are
    /// free to ignore; emitting into the void is not a failure.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Subscribe to all events from this point on.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Number of currently active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}
