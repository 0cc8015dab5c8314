//! User Preferences Abstraction
//!
//! Key-value preferences storage provided by the host. The core reads a small
//! set of well-known keys (e.g. the autoplay flag consulted on track
//! completion); the host owns everything else stored here.

use async_trait::async_trait;

use crate::error::Result;

/// Well-known key for the autoplay-on-completion setting.
pub const AUTOPLAY_KEY: &str = "playback.autoplay";

/// Async key-value preferences store.
///
/// Absent keys read as `None`; callers apply their own defaults.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read a boolean setting.
    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Write a boolean setting.
    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    /// Read a string setting.
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Write a string setting.
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a setting. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
