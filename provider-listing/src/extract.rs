//! Structural extraction of directory-listing pages
//!
//! The content host renders one HTML page per folder. Sub-folders appear as
//! links whose query string carries the target path, URL-escaped, in a
//! `path=` parameter; audio files appear as absolute links into the audio
//! content base. This module turns one such page into the folder's immediate
//! children and nothing else: breadcrumb self-links, ancestor links and
//! grandchild links are all filtered out.
//!
//! Extraction is pure and total: no I/O, deterministic for a given page,
//! and malformed or partial HTML simply produces fewer (or zero) entries.

use bridge_traits::listing::{RemoteEntry, RemoteEntryKind};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// File extension audio leaves are recognized by.
pub const AUDIO_EXTENSION: &str = ".mp3";

/// Immediate children extracted from one listing page.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// Sub-folders in discovery order.
    pub folders: Vec<RemoteEntry>,
    /// Audio files in discovery order.
    pub tracks: Vec<RemoteEntry>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.tracks.is_empty()
    }

    /// Flatten into display order: folders first, then tracks.
    pub fn into_entries(self) -> Vec<RemoteEntry> {
        let mut entries = self.folders;
        entries.extend(self.tracks);
        entries
    }
}

fn href_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"href\s*=\s*"([^"]+)""#).expect("href pattern is valid"))
}

/// Extract the immediate children of `parent_path` from a listing page.
///
/// `audio_base_url` is the fixed base under which audio files are served;
/// only links below it are considered audio candidates.
pub fn extract_listing(html: &str, parent_path: &str, audio_base_url: &str) -> Listing {
    let parent = normalize_folder_path(parent_path);
    let audio_base = audio_base_url.trim_end_matches('/');

    // One path-keyed set across both kinds: first occurrence wins regardless
    // of which pattern matched it.
    let mut seen: HashSet<String> = HashSet::new();
    let mut listing = Listing::default();

    for cap in href_regex().captures_iter(html) {
        let href = &cap[1];

        if let Some(folder_path) = folder_candidate(href) {
            if seen.contains(&folder_path) {
                continue;
            }
            if is_self_or_ancestor(&folder_path, &parent) {
                continue;
            }
            let Some(suffix) = direct_child_suffix(&parent, &folder_path) else {
                continue;
            };
            let name = clean_folder_name(&suffix);
            seen.insert(folder_path.clone());
            listing.folders.push(RemoteEntry {
                parent_path: parent.clone(),
                name,
                path: folder_path,
                kind: RemoteEntryKind::Folder,
            });
        } else if let Some(candidate) = audio_candidate(href, audio_base) {
            if candidate.implied_parent != parent {
                continue;
            }
            if seen.contains(&candidate.url) {
                continue;
            }
            let name = clean_track_name(&candidate.file_name);
            seen.insert(candidate.url.clone());
            listing.tracks.push(RemoteEntry {
                parent_path: parent.clone(),
                name,
                path: candidate.url,
                kind: RemoteEntryKind::Audio,
            });
        }
    }

    listing
}

/// Decode the `path=` parameter of a listing link, if present.
fn folder_candidate(href: &str) -> Option<String> {
    let (_, query) = href.split_once('?')?;
    let raw = query.split('&').find_map(|kv| kv.strip_prefix("path="))?;
    let decoded = urlencoding::decode(raw).ok()?;

    if !decoded.starts_with('/') {
        return None;
    }

    Some(normalize_folder_path(&decoded))
}

struct AudioCandidate {
    url: String,
    implied_parent: String,
    file_name: String,
}

/// Classify an absolute audio link under the content base.
fn audio_candidate(href: &str, audio_base: &str) -> Option<AudioCandidate> {
    if !href.to_ascii_lowercase().ends_with(AUDIO_EXTENSION) {
        return None;
    }
    let rel = href.strip_prefix(audio_base)?;
    if !rel.starts_with('/') {
        return None;
    }

    let decoded = urlencoding::decode(rel).ok()?;
    let split_at = decoded.rfind('/')?;
    let file_name = &decoded[split_at + 1..];
    if file_name.is_empty() {
        return None;
    }

    let implied_parent = if split_at == 0 {
        "/".to_string()
    } else {
        decoded[..split_at].to_string()
    };

    Some(AudioCandidate {
        url: href.to_string(),
        implied_parent,
        file_name: file_name.to_string(),
    })
}

/// Normalize a folder path: leading slash guaranteed, no trailing slash
/// except for the root itself.
fn normalize_folder_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() || trimmed == "/" {
        return "/".to_string();
    }
    let mut normalized = String::new();
    if !trimmed.starts_with('/') {
        normalized.push('/');
    }
    normalized.push_str(trimmed.trim_end_matches('/'));
    normalized
}

fn child_prefix(path: &str) -> String {
    if path == "/" {
        "/".to_string()
    } else {
        format!("{}/", path)
    }
}

/// Breadcrumb filter: the page links back to itself and to every ancestor.
fn is_self_or_ancestor(candidate: &str, parent: &str) -> bool {
    candidate == parent || parent.starts_with(&child_prefix(candidate))
}

/// Strict direct-child filter: the candidate must extend the parent by
/// exactly one path segment.
fn direct_child_suffix(parent: &str, candidate: &str) -> Option<String> {
    let rest = candidate.strip_prefix(&child_prefix(parent))?;
    if rest.is_empty() || rest.contains('/') {
        return None;
    }
    Some(rest.to_string())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Display name for a folder segment.
///
/// Underscores become spaces; ordering-prefix digits are deliberately kept,
/// they carry meaning in folder listings.
pub fn clean_folder_name(segment: &str) -> String {
    let cleaned = collapse_whitespace(&segment.replace('_', " "));
    if cleaned.is_empty() {
        segment.to_string()
    } else {
        cleaned
    }
}

/// Display name for an audio file.
///
/// Strips the extension, turns `--` into `" - "`, dots and underscores into
/// spaces, and collapses runs of whitespace. Falls back to the raw filename
/// when cleanup leaves nothing.
pub fn clean_track_name(file_name: &str) -> String {
    let stem = if file_name.to_ascii_lowercase().ends_with(AUDIO_EXTENSION) {
        &file_name[..file_name.len() - AUDIO_EXTENSION.len()]
    } else {
        file_name
    };

    let cleaned = collapse_whitespace(
        &stem
            .replace("--", " - ")
            .replace('.', " ")
            .replace('_', " "),
    );

    if cleaned.is_empty() {
        file_name.to_string()
    } else {
        cleaned
    }
}
