//! # Sync Scheduler
//!
//! Keeps the local tree mirror fresh against the remote listing host.
//!
//! ## Overview
//!
//! Folders go stale after a retention window (30 days). Two refresh modes
//! drive the mirror:
//!
//! - **Passive** ([`SyncScheduler::sync_if_needed`]) - non-blocking, fired by
//!   reads. Fetches in the background, merges only new entries, notifies the
//!   caller with the full fresh listing, and swallows every failure.
//! - **Forced** ([`SyncScheduler::force_sync`]) - blocking, fired explicitly
//!   (pull-to-refresh). Returns the fresh listing when the remote yields one
//!   and degrades to cached children otherwise; it never errors outward.
//!
//! Sync timestamps live in their own table, decoupled from tree data, with a
//! capped retention policy so a long-lived install visiting many folders
//! does not grow the metadata store without bound.

pub mod error;
pub mod repository;
pub mod scheduler;

pub use error::{Result, SyncError};
pub use repository::{SqliteSyncTimestampRepository, SyncTimestampRepository};
pub use scheduler::{OnNewItems, SyncConfig, SyncScheduler};
