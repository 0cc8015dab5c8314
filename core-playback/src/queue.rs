//! Play queue
//!
//! The ordered, bounded sequence of tracks the session traverses via
//! next/previous. Queues are built from a folder's mirrored children,
//! filtered to audio entries in mirror order, and every item is tagged with
//! its folder for display and relative navigation.

use core_library::models::TreeEntry;

/// Default capacity cap for a queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 500;

/// One queued track. Transient and in-memory only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    /// Remote URL of the track (the track record key)
    pub track_url: String,
    /// Display name
    pub track_name: String,
    /// Path of the folder the queue was built from
    pub folder_path: String,
    /// Display name of that folder
    pub folder_name: String,
}

/// Ordered, bounded play queue with a current-position pointer.
#[derive(Debug, Clone, Default)]
pub struct PlayQueue {
    items: Vec<QueueItem>,
    current_index: Option<usize>,
}

impl PlayQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build queue items from a folder's mirrored children.
    ///
    /// Only audio entries are queued; their mirror-store order is preserved.
    pub fn items_from_children(
        entries: &[TreeEntry],
        folder_path: &str,
        folder_name: &str,
    ) -> Vec<QueueItem> {
        entries
            .iter()
            .filter(|e| e.is_audio())
            .map(|e| QueueItem {
                track_url: e.path.clone(),
                track_name: e.name.clone(),
                folder_path: folder_path.to_string(),
                folder_name: folder_name.to_string(),
            })
            .collect()
    }

    /// Replace the queue contents, windowing when the item count exceeds
    /// `capacity`.
    ///
    /// The window is centered on `start_index` (half the capacity before it,
    /// half after, clamped to the available bounds) rather than truncated
    /// from one end, so skip operations near the start index keep their
    /// neighbors even in very large folders.
    pub fn set(&mut self, items: Vec<QueueItem>, start_index: usize, capacity: usize) {
        if items.is_empty() || capacity == 0 {
            self.items = Vec::new();
            self.current_index = None;
            return;
        }

        let start_index = start_index.min(items.len() - 1);

        if items.len() <= capacity {
            self.items = items;
            self.current_index = Some(start_index);
            return;
        }

        let half = capacity / 2;
        let mut window_start = start_index.saturating_sub(half);
        if window_start + capacity > items.len() {
            window_start = items.len() - capacity;
        }

        self.current_index = Some(start_index - window_start);
        self.items = items
            .into_iter()
            .skip(window_start)
            .take(capacity)
            .collect();
    }

    /// Remove all items and reset the pointer.
    pub fn clear(&mut self) {
        self.items.clear();
        self.current_index = None;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index of the current item, if any.
    pub fn position(&self) -> Option<usize> {
        self.current_index
    }

    /// All queued items in order.
    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn item_at(&self, index: usize) -> Option<&QueueItem> {
        self.items.get(index)
    }

    /// Current item, if any.
    pub fn current(&self) -> Option<&QueueItem> {
        self.current_index.and_then(|i| self.items.get(i))
    }

    /// Item after the current one, without moving the pointer.
    pub fn peek_next(&self) -> Option<&QueueItem> {
        self.current_index.and_then(|i| self.items.get(i + 1))
    }

    /// Move the pointer to `index` when it is in bounds.
    pub fn set_current(&mut self, index: usize) -> bool {
        if index < self.items.len() {
            self.current_index = Some(index);
            true
        } else {
            false
        }
    }

    /// Advance the pointer and return the new current item, or `None` at the
    /// end of the queue (the pointer then stays put).
    pub fn advance(&mut self) -> Option<QueueItem> {
        let next = self.current_index.map(|i| i + 1)?;
        if next < self.items.len() {
            self.current_index = Some(next);
            self.items.get(next).cloned()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_library::models::EntryKind;

    fn item(n: usize) -> QueueItem {
        QueueItem {
            track_url: format!("https://audio.example.org/files/k/{:04}.mp3", n),
            track_name: format!("Track {:04}", n),
            folder_path: "/k".to_string(),
            folder_name: "k".to_string(),
        }
    }

    fn items(count: usize) -> Vec<QueueItem> {
        (0..count).map(item).collect()
    }

    #[test]
    fn test_items_from_children_filters_audio_in_order() {
        let entries = vec![
            TreeEntry::new("/k", "Sub", "/k/Sub", EntryKind::Folder, 0, 0),
            TreeEntry::new(
                "/k",
                "01 - A",
                "https://audio.example.org/files/k/01.mp3",
                EntryKind::Audio,
                1,
                0,
            ),
            TreeEntry::new(
                "/k",
                "02 - B",
                "https://audio.example.org/files/k/02.mp3",
                EntryKind::Audio,
                2,
                0,
            ),
        ];

        let queue_items = PlayQueue::items_from_children(&entries, "/k", "K Folder");
        assert_eq!(queue_items.len(), 2);
        assert_eq!(queue_items[0].track_name, "01 - A");
        assert_eq!(queue_items[1].track_name, "02 - B");
        assert!(queue_items.iter().all(|i| i.folder_name == "K Folder"));
    }

    #[test]
    fn test_small_queue_is_not_windowed() {
        let mut queue = PlayQueue::new();
        queue.set(items(10), 7, DEFAULT_QUEUE_CAPACITY);

        assert_eq!(queue.len(), 10);
        assert_eq!(queue.position(), Some(7));
        assert_eq!(queue.current().unwrap().track_name, "Track 0007");
    }

    #[test]
    fn test_windowing_keeps_start_item_and_followers() {
        let mut queue = PlayQueue::new();
        queue.set(items(600), 550, 500);

        assert_eq!(queue.len(), 500);

        // The original item 550 is present at a valid position
        let position = queue.position().unwrap();
        assert_eq!(queue.current().unwrap().track_name, "Track 0550");

        // Everything that follows it in the original list is still here
        let following = queue.len() - position - 1;
        assert_eq!(following, 49);
        assert_eq!(queue.items().last().unwrap().track_name, "Track 0599");
    }

    #[test]
    fn test_windowing_centers_on_mid_list_start() {
        let mut queue = PlayQueue::new();
        queue.set(items(600), 300, 500);

        assert_eq!(queue.len(), 500);
        assert_eq!(queue.current().unwrap().track_name, "Track 0300");

        // At least half the capacity follows the start item
        let position = queue.position().unwrap();
        assert!(queue.len() - position - 1 >= 250);
    }

    #[test]
    fn test_windowing_near_list_start() {
        let mut queue = PlayQueue::new();
        queue.set(items(600), 3, 500);

        assert_eq!(queue.len(), 500);
        assert_eq!(queue.position(), Some(3));
        assert_eq!(queue.items()[0].track_name, "Track 0000");
    }

    #[test]
    fn test_out_of_range_start_clamps() {
        let mut queue = PlayQueue::new();
        queue.set(items(10), 99, 500);
        assert_eq!(queue.position(), Some(9));
    }

    #[test]
    fn test_advance_stops_at_end() {
        let mut queue = PlayQueue::new();
        queue.set(items(2), 0, 500);

        let next = queue.advance().unwrap();
        assert_eq!(next.track_name, "Track 0001");
        assert_eq!(queue.position(), Some(1));

        // Past the end: pointer stays on the last item
        assert!(queue.advance().is_none());
        assert_eq!(queue.position(), Some(1));
    }

    #[test]
    fn test_clear() {
        let mut queue = PlayQueue::new();
        queue.set(items(5), 2, 500);
        queue.clear();

        assert!(queue.is_empty());
        assert_eq!(queue.position(), None);
        assert!(queue.current().is_none());
    }
}
