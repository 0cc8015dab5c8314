//! # Playback Error Types

use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The engine could not load or start the requested source.
    #[error("Failed to load track: {0}")]
    LoadFailed(String),

    /// The engine did not report ready within the bounded wait.
    #[error("Engine not ready within {0} seconds")]
    ReadyTimeout(u64),

    /// An operation required an active track but none is loaded.
    #[error("No track loaded")]
    NoTrackLoaded,

    /// The requested queue index does not exist.
    #[error("Queue index {0} out of bounds")]
    QueueIndexOutOfBounds(usize),

    /// Invalid volume value (must be in range [0.0, 1.0]).
    #[error("Invalid volume: {0} (must be between 0.0 and 1.0)")]
    InvalidVolume(f32),

    /// Engine bridge failure.
    #[error("Engine error: {0}")]
    Engine(#[from] BridgeError),

    /// Mirror store failure.
    #[error("Library error: {0}")]
    Library(#[from] LibraryError),
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
