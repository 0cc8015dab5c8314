//! # Core Configuration Module
//!
//! Configuration for the archive player core, built with a builder that
//! enforces fail-fast validation: required host bridges must be provided
//! before initialization, and missing capabilities produce actionable errors.
//!
//! ## Required Dependencies
//!
//! - `SettingsStore` - user preferences (autoplay flag)
//!
//! ## Optional Dependencies (with desktop defaults)
//!
//! - `HttpClient` - injected by hosts with custom transport needs; the
//!   facade falls back to the desktop reqwest client when absent
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/archive.db")
//!     .settings_store(settings)
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{http::HttpClient, settings::SettingsStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default listing endpoint of the content host.
pub const DEFAULT_LISTING_URL: &str = "https://archive.gurbanimedia.org/listing";

/// Default base URL under which audio files are served.
pub const DEFAULT_AUDIO_BASE_URL: &str = "https://audio.gurbanimedia.org/files";

/// Default remote fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Core configuration for the archive player.
///
/// Use [`CoreConfig::builder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file holding the tree mirror
    pub database_path: PathBuf,

    /// Listing endpoint of the content host
    pub listing_url: String,

    /// Base URL under which audio files are served
    pub audio_base_url: String,

    /// Timeout applied to every remote listing fetch
    pub fetch_timeout: Duration,

    /// User preferences storage (required)
    pub settings_store: Arc<dyn SettingsStore>,

    /// HTTP client (optional, desktop default injected by the facade)
    pub http_client: Option<Arc<dyn HttpClient>>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("listing_url", &self.listing_url)
            .field("audio_base_url", &self.audio_base_url)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("settings_store", &"SettingsStore { ... }")
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .finish()
    }
}

impl CoreConfig {
    /// Start building a configuration.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    listing_url: Option<String>,
    audio_base_url: Option<String>,
    fetch_timeout: Option<Duration>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    http_client: Option<Arc<dyn HttpClient>>,
}

impl CoreConfigBuilder {
    /// Set the SQLite database path (required).
    pub fn database_path(mut self, path: impl AsRef<Path>) -> Self {
        self.database_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Override the listing endpoint URL.
    pub fn listing_url(mut self, url: impl Into<String>) -> Self {
        self.listing_url = Some(url.into());
        self
    }

    /// Override the audio content base URL.
    pub fn audio_base_url(mut self, url: impl Into<String>) -> Self {
        self.audio_base_url = Some(url.into());
        self
    }

    /// Override the remote fetch timeout.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Provide the user preferences store (required).
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Provide a custom HTTP client.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the database path is missing and
    /// [`Error::CapabilityMissing`] when a required bridge was not provided.
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self
            .database_path
            .ok_or_else(|| Error::Config("database_path is required".to_string()))?;

        let settings_store = self.settings_store.ok_or_else(|| Error::CapabilityMissing {
            capability: "SettingsStore".to_string(),
            message: "No settings store provided. Desktop hosts: pass \
                      bridge_desktop::SqliteSettingsStore."
                .to_string(),
        })?;

        let listing_url = self
            .listing_url
            .unwrap_or_else(|| DEFAULT_LISTING_URL.to_string());
        let audio_base_url = self
            .audio_base_url
            .unwrap_or_else(|| DEFAULT_AUDIO_BASE_URL.to_string());

        if listing_url.is_empty() || audio_base_url.is_empty() {
            return Err(Error::Config("endpoint URLs must not be empty".to_string()));
        }

        Ok(CoreConfig {
            database_path,
            listing_url,
            audio_base_url,
            fetch_timeout: self.fetch_timeout.unwrap_or(DEFAULT_FETCH_TIMEOUT),
            settings_store,
            http_client: self.http_client,
        })
    }
}
