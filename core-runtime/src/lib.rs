//! # Core Runtime Module
//!
//! Shared runtime infrastructure for the archive player core:
//!
//! - [`logging`] - structured logging via `tracing` / `tracing-subscriber`
//! - [`events`] - typed event bus for decoupled module communication
//! - [`config`] - core configuration with builder and fail-fast validation
//! - [`error`] - runtime error types

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, LibraryEvent, PlaybackEvent, SyncEvent};
pub use logging::{init_logging, LogFormat, LoggingConfig};
