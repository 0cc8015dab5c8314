//! # Repository Pattern Implementation
//!
//! Repository traits and SQLite implementations for the mirror store.
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - All operations return `Result<T>` for error handling
//! - Writers never overwrite fields they were not asked to touch: the merge
//!   primitives (`bulk_insert_if_absent`, `upsert`) exist so concurrent
//!   flows cannot clobber each other
//!
//! ## Available Repositories
//!
//! - `TreeRepository` - mirrored folder/audio hierarchy
//! - `TrackRepository` - playback/download metadata per track
//! - `FavoriteRepository` - user-pinned folders

pub mod favorite;
pub mod track;
pub mod tree;

pub use favorite::{FavoriteRepository, SqliteFavoriteRepository};
pub use track::{SqliteTrackRepository, TrackRepository};
pub use tree::{SqliteTreeRepository, TreeRepository, SEARCH_RESULT_CAP};
