//! # Desktop Bridge Implementations
//!
//! Desktop-ready implementations of the [`bridge_traits`] capabilities:
//!
//! - [`ReqwestHttpClient`] - HTTP transport built on reqwest with rustls,
//!   bounded timeouts and single-redirect following
//! - [`SqliteSettingsStore`] - persistent key-value preferences in SQLite
//!
//! The audio engine itself is host-provided and has no desktop default here;
//! see [`bridge_traits::engine`] for the contract the host must satisfy.

pub mod http;
pub mod settings;

pub use http::ReqwestHttpClient;
pub use settings::SqliteSettingsStore;
