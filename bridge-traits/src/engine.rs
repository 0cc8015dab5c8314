//! Audio engine bridge traits.
//!
//! These abstractions let the playback session drive a platform-native audio
//! engine without owning its implementation. The session constructs at most
//! one [`EngineHandle`] at a time and is the exclusive owner of that handle
//! and of its status subscription; no other component may hold a reference
//! to either.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::watch;

use crate::error::Result;

/// High-level audio source descriptor handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Local file accessible to the host runtime (a completed download).
    LocalFile { path: PathBuf },
    /// Remote HTTP(S) stream to be fetched by the engine.
    RemoteStream { url: String },
}

impl AudioSource {
    /// Determine whether the source represents remote content.
    pub fn is_remote(&self) -> bool {
        matches!(self, AudioSource::RemoteStream { .. })
    }
}

/// Snapshot of the engine's playback status.
///
/// The engine reports its play/pause/buffering flags independently; they are
/// not guaranteed to be mutually exclusive at every tick. Consumers derive a
/// single status deterministically (playing takes priority, then buffering,
/// then paused).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineStatus {
    /// The engine has loaded the source and can accept playback commands.
    pub ready: bool,
    /// The engine is actively producing audio.
    pub playing: bool,
    /// The engine is stalled waiting for data.
    pub buffering: bool,
    /// Current playback position in seconds.
    pub position_secs: f64,
    /// Total duration in seconds, 0.0 until known.
    pub duration_secs: f64,
}

impl EngineStatus {
    /// Initial status before the engine has reported anything.
    pub fn initial() -> Self {
        Self {
            ready: false,
            playing: false,
            buffering: false,
            position_secs: 0.0,
            duration_secs: 0.0,
        }
    }
}

impl Default for EngineStatus {
    fn default() -> Self {
        Self::initial()
    }
}

/// Factory for engine handles.
///
/// One `load` call provisions native resources for one source and returns the
/// handle controlling them. Loading does not imply the engine is ready;
/// readiness is reported through the handle's status channel.
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Create a new engine handle for the given source.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot allocate resources or the
    /// source is immediately known to be unplayable.
    async fn load(&self, source: AudioSource) -> Result<std::sync::Arc<dyn EngineHandle>>;
}

/// Control surface for one loaded audio source.
#[async_trait]
pub trait EngineHandle: Send + Sync {
    /// Subscribe to continuous status updates.
    ///
    /// The returned receiver always holds the most recent status; the engine
    /// pushes a new value whenever any field changes.
    fn status(&self) -> watch::Receiver<EngineStatus>;

    /// Begin or resume playback.
    async fn play(&self) -> Result<()>;

    /// Pause playback without releasing resources.
    async fn pause(&self) -> Result<()>;

    /// Seek to an absolute position in seconds.
    async fn seek(&self, position_secs: f64) -> Result<()>;

    /// Adjust playback volume, normalized to `0.0..=1.0`.
    async fn set_volume(&self, volume: f32) -> Result<()>;

    /// Release all native resources. The handle must not be used afterwards.
    async fn unload(&self) -> Result<()>;
}
