//! LRU cache for extracted page text
//!
//! Text items are reported in page space, so one extraction serves every
//! zoom level of that page.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::overlay::engine::TextItem;

/// LRU cache of text items keyed by 1-based page number
pub struct TextCache {
    cache: LruCache<usize, Arc<Vec<TextItem>>>,
}

impl TextCache {
    /// Create a new cache with the given capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Get a page's items, promoting it in the LRU order
    #[must_use]
    pub fn get(&mut self, page: usize) -> Option<Arc<Vec<TextItem>>> {
        self.cache.get(&page).cloned()
    }

    #[must_use]
    pub fn contains(&self, page: usize) -> bool {
        self.cache.contains(&page)
    }

    pub fn insert(&mut self, page: usize, items: Vec<TextItem>) -> Arc<Vec<TextItem>> {
        let arc = Arc::new(items);
        self.cache.put(page, Arc::clone(&arc));
        arc
    }

    /// Clear all cached pages; called when a new document is opened
    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}
