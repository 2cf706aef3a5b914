//! In-memory cache of rendered pages for the open document

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::PageImage;

/// Cache of rendered pages, keyed by 0-based page index.
///
/// Holds at most one entry per index for the lifetime of a document
/// session. Writes are idempotent: once a page is published it is never
/// replaced by a later render of the same page. Shared between the render
/// worker (writer), the view adapter and the export pipeline (readers)
/// behind a single `Arc<Mutex<..>>`.
pub struct PageCache {
    pages: HashMap<usize, Arc<PageImage>>,
}

impl PageCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
        }
    }

    /// Get a cached page image
    #[must_use]
    pub fn get(&self, page: usize) -> Option<Arc<PageImage>> {
        self.pages.get(&page).cloned()
    }

    /// Check whether a page is cached
    #[must_use]
    pub fn contains(&self, page: usize) -> bool {
        self.pages.contains_key(&page)
    }

    /// Insert a rendered page. No-op if the page is already present;
    /// returns true when the image was actually inserted.
    pub fn put(&mut self, page: usize, image: PageImage) -> bool {
        if self.pages.contains_key(&page) {
            return false;
        }
        self.pages.insert(page, Arc::new(image));
        true
    }

    /// Number of cached pages
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Check if cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Drop all cached pages. Reserved for the lifecycle controller
    /// while closing a session.
    pub fn clear(&mut self) {
        self.pages.clear();
    }
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new()
    }
}
