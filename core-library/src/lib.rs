//! # Local Mirror Store
//!
//! Owns the durable local copy of the remote folder/audio hierarchy and
//! provides repository patterns for data access.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite database schema and migrations (including one-time normalization
//!   of a bundled legacy seed)
//! - Repository patterns for tree entries, track records and favorites
//! - The idempotent merge primitives every sync path relies on

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use models::{EntryKind, Favorite, TrackPatch, TrackRecord, TreeEntry, ROOT_PARENT};
pub use repositories::{
    FavoriteRepository, SqliteFavoriteRepository, SqliteTrackRepository, SqliteTreeRepository,
    TrackRepository, TreeRepository,
};
