//! Domain models for the local mirror store
//!
//! This module contains the entry, track and favorite models with validation
//! and database mapping helpers.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Sentinel parent path for entries at the top of the hierarchy.
pub const ROOT_PARENT: &str = "/";

// =============================================================================
// Entry Kind
// =============================================================================

/// Kind of a mirrored tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// A folder that can contain further entries.
    Folder,
    /// An audio file leaf.
    Audio,
}

impl EntryKind {
    /// Database representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Folder => "folder",
            EntryKind::Audio => "audio",
        }
    }

    /// Parse the database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "folder" => Some(EntryKind::Folder),
            "audio" => Some(EntryKind::Audio),
            _ => None,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Tree Entry
// =============================================================================

/// One node of the remote hierarchy as mirrored locally.
///
/// `path` is the natural key and unique across the whole mirror: folders use
/// a site-relative path, audio entries the absolute URL of the file. The
/// surrogate `id` is assigned by the store on insert (0 = not yet persisted)
/// and is stable only within one store instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Store-assigned surrogate key, 0 until persisted
    pub id: i64,
    /// Full path of the containing folder ([`ROOT_PARENT`] for top-level entries)
    pub parent_path: String,
    /// Human-displayable name, cleaned for the entry kind
    pub name: String,
    /// Globally unique full path or absolute URL
    pub path: String,
    /// Folder or audio leaf
    pub kind: EntryKind,
    /// Display order within the parent; ties broken by name
    pub sort_order: i64,
    /// Unix timestamp this entry was last observed remotely
    pub last_updated: i64,
}

impl TreeEntry {
    /// Create a not-yet-persisted entry.
    pub fn new(
        parent_path: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<String>,
        kind: EntryKind,
        sort_order: i64,
        last_updated: i64,
    ) -> Self {
        Self {
            id: 0,
            parent_path: parent_path.into(),
            name: name.into(),
            path: path.into(),
            kind,
            sort_order,
            last_updated,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }

    pub fn is_audio(&self) -> bool {
        self.kind == EntryKind::Audio
    }

    /// Name as shown to the user.
    ///
    /// Audio names drop their ordering-prefix digits here; folder names keep
    /// them (the prefix carries meaning in folder listings).
    pub fn display_name(&self) -> &str {
        match self.kind {
            EntryKind::Folder => &self.name,
            EntryKind::Audio => strip_ordinal_prefix(&self.name),
        }
    }

    /// Validate entry data
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Entry name cannot be empty".to_string());
        }

        if self.path.trim().is_empty() {
            return Err("Entry path cannot be empty".to_string());
        }

        if self.parent_path.trim().is_empty() {
            return Err("Entry parent path cannot be empty".to_string());
        }

        Ok(())
    }
}

/// Strip a leading ordering prefix (`"05 - Name"`, `"12. Name"`) from a
/// display name. Returns the input unchanged when stripping would leave
/// nothing displayable.
pub fn strip_ordinal_prefix(name: &str) -> &str {
    let rest = name.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() == name.len() {
        return name;
    }
    let rest = rest.trim_start_matches([' ', '-', '.', '_']);
    if rest.is_empty() {
        name
    } else {
        rest
    }
}

// =============================================================================
// Track Record
// =============================================================================

/// Playback/download metadata for one audio entry, keyed by its URL.
///
/// A record may exist before or after the corresponding [`TreeEntry`] is
/// known: first playback, a download, or a position save each create it.
/// The download manager is the sole writer of `is_downloaded`,
/// `local_file_path`, `size_bytes` and `downloaded_at`; the playback side
/// only reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TrackRecord {
    /// Remote URL of the track; natural key
    pub track_url: String,
    /// Display name
    pub track_name: String,
    /// Duration in seconds, 0 until known
    pub duration_secs: f64,
    /// File size in bytes, 0 until known
    pub size_bytes: i64,
    /// Resume point in seconds
    pub playback_position: f64,
    /// Whether a completed download exists locally
    pub is_downloaded: bool,
    /// Path of the downloaded file, when downloaded
    pub local_file_path: Option<String>,
    /// Unix timestamp of the last playback start
    pub last_played_at: Option<i64>,
    /// Unix timestamp the download finished
    pub downloaded_at: Option<i64>,
    /// Whether playback crossed the completion threshold
    pub is_completed: bool,
}

impl TrackRecord {
    /// Fraction of the track played, 0.0 when the duration is unknown.
    pub fn progress(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.playback_position / self.duration_secs
        } else {
            0.0
        }
    }
}

/// Partial update for a track record.
///
/// `upsert` merges a patch field-by-field: unset fields keep their stored
/// value, so independent writers (position saver, download manager) cannot
/// clobber each other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackPatch {
    pub track_url: String,
    pub track_name: Option<String>,
    pub duration_secs: Option<f64>,
    pub size_bytes: Option<i64>,
    pub playback_position: Option<f64>,
    pub is_downloaded: Option<bool>,
    pub local_file_path: Option<String>,
    pub last_played_at: Option<i64>,
    pub downloaded_at: Option<i64>,
    pub is_completed: Option<bool>,
}

impl TrackPatch {
    /// Start an empty patch for the given track.
    pub fn new(track_url: impl Into<String>) -> Self {
        Self {
            track_url: track_url.into(),
            ..Default::default()
        }
    }

    pub fn track_name(mut self, name: impl Into<String>) -> Self {
        self.track_name = Some(name.into());
        self
    }

    pub fn duration_secs(mut self, duration: f64) -> Self {
        self.duration_secs = Some(duration);
        self
    }

    pub fn size_bytes(mut self, size: i64) -> Self {
        self.size_bytes = Some(size);
        self
    }

    pub fn playback_position(mut self, position: f64) -> Self {
        self.playback_position = Some(position);
        self
    }

    pub fn is_downloaded(mut self, downloaded: bool) -> Self {
        self.is_downloaded = Some(downloaded);
        self
    }

    pub fn local_file_path(mut self, path: impl Into<String>) -> Self {
        self.local_file_path = Some(path.into());
        self
    }

    pub fn last_played_at(mut self, ts: i64) -> Self {
        self.last_played_at = Some(ts);
        self
    }

    pub fn downloaded_at(mut self, ts: i64) -> Self {
        self.downloaded_at = Some(ts);
        self
    }

    pub fn is_completed(mut self, completed: bool) -> Self {
        self.is_completed = Some(completed);
        self
    }
}

// =============================================================================
// Favorite
// =============================================================================

/// A folder the user pinned for quick access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Favorite {
    /// Folder path; natural key
    pub folder_path: String,
    /// Display name captured at pin time
    pub folder_name: String,
    /// Unix timestamp the favorite was added
    pub added_at: i64,
}

// =============================================================================
// Tests
// =============================================================================
