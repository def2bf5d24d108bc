use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

use lru::LruCache;

/// Default capacity of the scraper's dedupe window.
pub const DEFAULT_DEDUPE_CAPACITY: usize = 20;

/// LRU set of already-fetched items, keyed on the hash of `(url, title)`.
///
/// Both `seen` and `insert` refresh recency, so an article that keeps
/// reappearing on the front page stays in the window while one-off items
/// age out after `capacity` newer entries.
pub struct UrlDedupe {
    cache: LruCache<u64, ()>,
}

impl UrlDedupe {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap()),
            ),
        }
    }

    fn key(url: &str, title: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        url.hash(&mut hasher);
        title.hash(&mut hasher);
        hasher.finish()
    }

    /// Check whether an item was already fetched, refreshing its recency.
    pub fn seen(&mut self, url: &str, title: &str) -> bool {
        self.cache.get(&Self::key(url, title)).is_some()
    }

    /// Record an item as fetched, evicting the least-recently-used entry
    /// when the window is full.
    pub fn insert(&mut self, url: &str, title: &str) {
        self.cache.put(Self::key(url, title), ());
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for UrlDedupe {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUPE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit() {
        let mut dedupe = UrlDedupe::default();
        assert!(!dedupe.seen("https://example.com/a", "A"));
        dedupe.insert("https://example.com/a", "A");
        assert!(dedupe.seen("https://example.com/a", "A"));
    }

    #[test]
    fn same_url_different_title_is_distinct() {
        let mut dedupe = UrlDedupe::default();
        dedupe.insert("https://example.com/a", "A");
        assert!(!dedupe.seen("https://example.com/a", "B"));
    }

    #[test]
    fn capacity_20_evicts_oldest_on_21st() {
        let mut dedupe = UrlDedupe::new(20);
        for i in 0..21 {
            dedupe.insert(&format!("https://example.com/{i}"), "t");
        }
        // First entry evicted, the latest 20 all hit.
        assert!(!dedupe.seen("https://example.com/0", "t"));
        for i in 1..21 {
            assert!(dedupe.seen(&format!("https://example.com/{i}"), "t"), "lost entry {i}");
        }
        assert_eq!(dedupe.len(), 20);
    }

    #[test]
    fn seen_refreshes_recency() {
        let mut dedupe = UrlDedupe::new(2);
        dedupe.insert("u1", "t");
        dedupe.insert("u2", "t");
        // Touch u1 so u2 becomes the eviction candidate.
        assert!(dedupe.seen("u1", "t"));
        dedupe.insert("u3", "t");
        assert!(dedupe.seen("u1", "t"));
        assert!(!dedupe.seen("u2", "t"));
    }
}
