//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host
//! application embedding the archive player core.
//!
//! ## Overview
//!
//! This crate defines the contract between the core library and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that the host provides: HTTP transport, the native audio
//! engine, persistent user preferences, and the remote listing source.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with bounded timeouts
//! - [`ListingSource`](listing::ListingSource) - Remote folder listing retrieval
//! - [`AudioEngine`](engine::AudioEngine) / [`EngineHandle`](engine::EngineHandle) -
//!   Native audio engine ownership and status reporting
//! - [`SettingsStore`](settings::SettingsStore) - Key-value preferences storage
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type for
//! consistent error handling. Platform implementations should convert their
//! native errors to `BridgeError` and provide actionable messages.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent
//! usage across async tasks.

pub mod engine;
pub mod error;
pub mod http;
pub mod listing;
pub mod settings;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use engine::{AudioEngine, AudioSource, EngineHandle, EngineStatus};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use listing::{ListingSource, RemoteEntry, RemoteEntryKind};
pub use settings::SettingsStore;
pub use time::{Clock, SystemClock};
