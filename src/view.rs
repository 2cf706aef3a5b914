//! Pagination view adapter.
//!
//! Binds page indices to cache contents for display. The adapter is a
//! pure read-through view: a cache miss yields a placeholder and no
//! render is triggered from the bind path; materialization is entirely
//! the render worker's job.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::cache::PageCache;
use crate::events::ViewerEvent;
use crate::types::PageImage;

/// Scroll direction of the page view
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
}

/// Zoom state for the currently displayed page
#[derive(Debug)]
pub struct Zoom {
    factor: f32,
}

impl Default for Zoom {
    fn default() -> Self {
        Self { factor: 1.0 }
    }
}

impl Zoom {
    /// Zoom in rate multiplier per step - 10%
    pub const ZOOM_IN_RATE: f32 = 1.1;
    /// Zoom out rate divisor per step - 5%
    pub const ZOOM_OUT_RATE: f32 = 1.05;
    /// Minimum allowed zoom factor
    pub const MIN_SCALE: f32 = 0.1;
    /// Maximum allowed zoom factor
    pub const MAX_SCALE: f32 = 8.0;

    /// Returns the current zoom factor (1.0 = natural scale)
    #[must_use]
    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Zoom in by one step
    pub fn step_in(&mut self) {
        self.factor = Self::clamp_factor(self.factor * Self::ZOOM_IN_RATE);
    }

    /// Zoom out by one step
    pub fn step_out(&mut self) {
        self.factor = Self::clamp_factor(self.factor / Self::ZOOM_OUT_RATE);
    }

    /// Back to natural scale
    pub fn reset(&mut self) {
        self.factor = 1.0;
    }

    /// Clamp factor to valid range, handling NaN/Inf
    #[must_use]
    pub fn clamp_factor(factor: f32) -> f32 {
        if !factor.is_finite() {
            1.0
        } else {
            factor.clamp(Self::MIN_SCALE, Self::MAX_SCALE)
        }
    }
}

/// Displayable content for one page slot
#[derive(Clone, Debug)]
pub enum PageContent {
    /// The rendered page image
    Image(Arc<PageImage>),
    /// Page not rendered yet (or render failed); show an empty surface
    Placeholder,
}

impl PageContent {
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }
}

/// Read-through binding between page indices and the page cache
pub struct PageViewAdapter {
    cache: Arc<Mutex<PageCache>>,
    total_pages: usize,
    orientation: Orientation,
    snap_enabled: bool,
    zoom: Zoom,
    pending_refresh: BTreeSet<usize>,
}

impl PageViewAdapter {
    #[must_use]
    pub fn new(
        cache: Arc<Mutex<PageCache>>,
        total_pages: usize,
        orientation: Orientation,
        snap_enabled: bool,
    ) -> Self {
        Self {
            cache,
            total_pages,
            orientation,
            snap_enabled,
            zoom: Zoom::default(),
            pending_refresh: BTreeSet::new(),
        }
    }

    /// Number of page slots the view presents
    #[must_use]
    pub fn count(&self) -> usize {
        self.total_pages
    }

    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[must_use]
    pub fn snap_enabled(&self) -> bool {
        self.snap_enabled
    }

    /// Content for a page slot. Never renders; a miss is a placeholder
    /// until the worker's `PageReady` for that index arrives.
    #[must_use]
    pub fn bind(&self, page: usize) -> PageContent {
        if page >= self.total_pages {
            return PageContent::Placeholder;
        }

        let cached = self
            .cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(page);

        match cached {
            Some(image) => PageContent::Image(image),
            None => PageContent::Placeholder,
        }
    }

    /// Feed an event from the viewer's event stream. Only `PageReady`
    /// affects the adapter; it marks exactly that index for refresh.
    pub fn on_event(&mut self, event: &ViewerEvent) {
        if let ViewerEvent::PageReady(page) = event {
            if *page < self.total_pages {
                self.pending_refresh.insert(*page);
            }
        }
    }

    /// Drain the indices whose visuals need re-binding, in index order
    pub fn take_refresh(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.pending_refresh).into_iter().collect()
    }

    #[must_use]
    pub fn zoom(&self) -> &Zoom {
        &self.zoom
    }

    pub fn zoom_mut(&mut self) -> &mut Zoom {
        &mut self.zoom
    }

    /// Page navigation gestures are suppressed while the current page is
    /// magnified past its natural scale, so panning a zoomed page is not
    /// mistaken for a swipe to the next page.
    #[must_use]
    pub fn paging_enabled(&self) -> bool {
        self.zoom.factor() <= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rgb;

    fn adapter_with_cache(total_pages: usize) -> (PageViewAdapter, Arc<Mutex<PageCache>>) {
        let cache = Arc::new(Mutex::new(PageCache::new()));
        let adapter = PageViewAdapter::new(cache.clone(), total_pages, Orientation::Vertical, false);
        (adapter, cache)
    }

    #[test]
    fn bind_returns_placeholder_on_miss() {
        let (adapter, _cache) = adapter_with_cache(3);
        assert!(adapter.bind(0).is_placeholder());
        assert!(adapter.bind(99).is_placeholder());
    }

    #[test]
    fn bind_returns_image_once_cached() {
        let (adapter, cache) = adapter_with_cache(3);

        cache
            .lock()
            .unwrap()
            .put(1, PageImage::solid(4, 4, Rgb::WHITE));

        assert!(adapter.bind(0).is_placeholder());
        assert!(matches!(adapter.bind(1), PageContent::Image(_)));
    }

    #[test]
    fn page_ready_refreshes_exactly_that_index() {
        let (mut adapter, _cache) = adapter_with_cache(5);

        adapter.on_event(&ViewerEvent::PageReady(2));
        adapter.on_event(&ViewerEvent::RenderProgress(40));
        adapter.on_event(&ViewerEvent::PageReady(2));

        assert_eq!(adapter.take_refresh(), vec![2]);
        assert!(adapter.take_refresh().is_empty());
    }

    #[test]
    fn out_of_range_page_ready_is_ignored() {
        let (mut adapter, _cache) = adapter_with_cache(2);
        adapter.on_event(&ViewerEvent::PageReady(9));
        assert!(adapter.take_refresh().is_empty());
    }

    #[test]
    fn paging_suppressed_while_zoomed_in() {
        let (mut adapter, _cache) = adapter_with_cache(3);
        assert!(adapter.paging_enabled());

        adapter.zoom_mut().step_in();
        assert!(!adapter.paging_enabled());

        adapter.zoom_mut().reset();
        assert!(adapter.paging_enabled());
    }

    #[test]
    fn zoom_clamps_to_range() {
        assert_eq!(Zoom::clamp_factor(f32::NAN), 1.0);
        assert_eq!(Zoom::clamp_factor(0.0), Zoom::MIN_SCALE);
        assert_eq!(Zoom::clamp_factor(100.0), Zoom::MAX_SCALE);
    }
}
