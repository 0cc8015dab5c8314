//! Remote Listing Source Abstraction
//!
//! The remote content host exposes its folder tree only through
//! directory-listing pages. This module defines the entry shape those pages
//! yield and the trait the sync layer consumes to retrieve them, so the
//! scraping provider can be swapped for a fake in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Kind of entry discovered in a remote listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteEntryKind {
    /// A sub-folder that can itself be listed.
    Folder,
    /// An audio file leaf.
    Audio,
}

/// One immediate child discovered in a remote folder listing.
///
/// `path` is the entry's natural key: folders carry a site-relative path
/// (e.g. `/Katha/Some_Speaker`), audio entries carry the absolute URL of the
/// file under the audio content base. The ordering of entries as returned by
/// a [`ListingSource`] defines their display order within the parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Site-relative path of the containing folder.
    pub parent_path: String,
    /// Human-displayable name, already cleaned for the entry kind.
    pub name: String,
    /// Globally unique path or absolute URL.
    pub path: String,
    /// Whether this entry is a folder or an audio leaf.
    pub kind: RemoteEntryKind,
}

impl RemoteEntry {
    pub fn is_folder(&self) -> bool {
        self.kind == RemoteEntryKind::Folder
    }

    pub fn is_audio(&self) -> bool {
        self.kind == RemoteEntryKind::Audio
    }
}

/// Source of remote folder listings.
///
/// One call maps to one remote listing page. Implementations must reject
/// within a bounded timeout rather than hang, and must not retry internally:
/// staleness policy and fallbacks live with the sync layer.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch the immediate children of the folder at `path`.
    ///
    /// Entries are returned in display order: sub-folders first in discovery
    /// order, then audio files in discovery order.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, timeout, or a non-200 response.
    /// An empty listing is NOT an error.
    async fn fetch_listing(&self, path: &str) -> Result<Vec<RemoteEntry>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_entry_kind_helpers() {
        let folder = RemoteEntry {
            parent_path: "/".to_string(),
            name: "Katha".to_string(),
            path: "/Katha".to_string(),
            kind: RemoteEntryKind::Folder,
        };
        assert!(folder.is_folder());
        assert!(!folder.is_audio());
    }
}
