//! # Playback Session Module
//!
//! Owns the single active audio engine handle, the ordered play queue, and
//! the playback state machine.
//!
//! ## Overview
//!
//! - [`session::PlaybackSession`] - the state machine driving the engine:
//!   `Idle → Loading → Playing/Paused → (completed) → next/stop`, with a
//!   strict unload-before-load protocol so at most one engine handle exists
//!   and no transition ever loses the outgoing track's position
//! - [`queue::PlayQueue`] - ordered, bounded queue with windowing for very
//!   large folders
//! - [`position`] - the periodic best-effort position writer and the
//!   completion threshold math
//!
//! The session is constructed once per app lifetime and passed by reference
//! to consumers; it is the exclusive owner of the engine handle and its
//! status subscription.

pub mod config;
pub mod error;
pub mod position;
pub mod queue;
pub mod session;

pub use config::PlaybackConfig;
pub use error::{PlaybackError, Result};
pub use queue::{PlayQueue, QueueItem, DEFAULT_QUEUE_CAPACITY};
pub use session::{PlaybackSession, PlayerState};
