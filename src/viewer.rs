//! Lifecycle controller: coordinates document open, rendering and close

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use flume::{Receiver, Sender};
use log::{error, info, warn};

use crate::cache::PageCache;
use crate::document::{DocumentHandle, MupdfRenderer, PageRenderer};
use crate::events::ViewerEvent;
use crate::export;
use crate::request::RenderRequest;
use crate::session::Session;
use crate::source::{self, DocumentSource};
use crate::types::Rgb;
use crate::view::{Orientation, PageViewAdapter};
use crate::worker::render_worker;

pub const MIN_RENDER_QUALITY: u16 = 30;
pub const MAX_RENDER_QUALITY: u16 = 500;
pub const DEFAULT_RENDER_QUALITY: u16 = 100;

/// Lifecycle phase of the controller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Opening,
    Active,
    Closing,
}

/// Owns the document session and supervises every other component.
///
/// Sessions never overlap: loading a document while one is active closes
/// the current session synchronously first. All recoverable failures are
/// reported on the event stream rather than returned, so a UI binding
/// only has to subscribe to [`ViewerEvent`]s.
pub struct PdfViewer {
    phase: Phase,
    render_quality: u16,
    background: Rgb,
    cache: Arc<Mutex<PageCache>>,
    session: Option<Arc<Session>>,
    request_tx: Option<Sender<RenderRequest>>,
    worker: Option<JoinHandle<()>>,
    adapter: Option<PageViewAdapter>,
    current_page: usize,
    events_tx: Sender<ViewerEvent>,
    events_rx: Receiver<ViewerEvent>,
}

impl PdfViewer {
    #[must_use]
    pub fn new() -> Self {
        let (events_tx, events_rx) = flume::unbounded();
        Self {
            phase: Phase::Idle,
            render_quality: DEFAULT_RENDER_QUALITY,
            background: Rgb::WHITE,
            cache: Arc::new(Mutex::new(PageCache::new())),
            session: None,
            request_tx: None,
            worker: None,
            adapter: None,
            current_page: 0,
            events_tx,
            events_rx,
        }
    }

    /// Receiver for the outbound event stream. Clonable; events are
    /// consumed by whichever clone reads them first.
    #[must_use]
    pub fn events(&self) -> &Receiver<ViewerEvent> {
        &self.events_rx
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Render quality in percent, clamped to `[30, 500]`.
    ///
    /// Applies to the next loaded document; already-cached pages are not
    /// re-rendered at the new quality.
    pub fn set_render_quality(&mut self, quality: u16) {
        self.render_quality = quality.clamp(MIN_RENDER_QUALITY, MAX_RENDER_QUALITY);
    }

    #[must_use]
    pub fn render_quality(&self) -> u16 {
        self.render_quality
    }

    /// Background fill painted behind page content. Applies to the next
    /// loaded document.
    pub fn set_background_color(&mut self, color: Rgb) {
        self.background = color;
    }

    /// Load a document, closing any active session first.
    ///
    /// On success emits `PdfLoaded` and starts filling the cache in the
    /// background; on failure emits `Error` and returns to `Idle`.
    pub fn load_document(
        &mut self,
        source: DocumentSource,
        orientation: Orientation,
        snap_enabled: bool,
    ) {
        self.close();
        self.phase = Phase::Opening;
        info!("Loading document from {source:?}");

        let acquired = match source::acquire(&source, &self.events_tx) {
            Ok(acquired) => acquired,
            Err(e) => return self.abort_open(e.to_string()),
        };

        let renderer = match MupdfRenderer::open(&acquired.path) {
            Ok(renderer) => renderer,
            Err(e) => return self.abort_open(format!("Error loading PDF: {e}")),
        };

        self.start_session(
            Box::new(renderer),
            acquired.file_name,
            acquired.temp,
            orientation,
            snap_enabled,
        );
    }

    /// Open a session over an already-constructed renderer.
    ///
    /// This is the seam tests use to drive the full lifecycle without a
    /// real document on disk.
    pub fn load_with_renderer(
        &mut self,
        renderer: Box<dyn PageRenderer>,
        file_name: impl Into<String>,
        orientation: Orientation,
        snap_enabled: bool,
    ) {
        self.close();
        self.phase = Phase::Opening;
        self.start_session(renderer, file_name.into(), None, orientation, snap_enabled);
    }

    fn start_session(
        &mut self,
        renderer: Box<dyn PageRenderer>,
        file_name: String,
        temp: Option<tempfile::TempPath>,
        orientation: Orientation,
        snap_enabled: bool,
    ) {
        let handle = DocumentHandle::new(renderer);
        let total_pages = handle.page_count();
        let scale = self.render_quality;
        let session = Arc::new(Session::new(
            handle,
            scale,
            self.background,
            file_name.clone(),
            temp,
        ));

        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();

        // Announce the load before the worker can complete a render, so
        // subscribers always see PdfLoaded ahead of any render progress.
        let _ = self.events_tx.send(ViewerEvent::PdfLoaded {
            total_pages,
            file_name: file_name.clone(),
        });

        let (request_tx, request_rx) = flume::unbounded();
        let worker_session = session.clone();
        let worker_events = self.events_tx.clone();
        let worker_cache = self.cache.clone();
        let worker = std::thread::spawn(move || {
            render_worker(worker_session, request_rx, worker_events, worker_cache);
        });

        // One task per page, ascending; FIFO delivery keeps completion
        // order non-decreasing under the single worker.
        for page in 0..total_pages {
            let _ = request_tx.send(RenderRequest::Page { page, scale });
        }

        self.adapter = Some(PageViewAdapter::new(
            self.cache.clone(),
            total_pages,
            orientation,
            snap_enabled,
        ));
        self.session = Some(session);
        self.request_tx = Some(request_tx);
        self.worker = Some(worker);
        self.current_page = 0;
        self.phase = Phase::Active;

        info!("Loaded '{file_name}' with {total_pages} pages");
    }

    fn abort_open(&mut self, message: String) {
        error!("{message}");
        let _ = self.events_tx.send(ViewerEvent::Error(message));
        self.phase = Phase::Idle;
    }

    /// Close the current session. Safe to call when nothing is open.
    ///
    /// Ordering matters: the closing flag is raised first so in-flight
    /// tasks start aborting, then the queue is shut down, the cache
    /// cleared, the worker joined, and finally the document handle and
    /// any downloaded temp artifact are released.
    pub fn close(&mut self) {
        if self.session.is_none() {
            self.phase = Phase::Idle;
            return;
        }
        self.phase = Phase::Closing;

        if let Some(session) = &self.session {
            session.begin_close();
        }
        if let Some(request_tx) = self.request_tx.take() {
            let _ = request_tx.send(RenderRequest::Shutdown);
        }

        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Render worker panicked during shutdown");
            }
        }

        if let Some(session) = self.session.take() {
            session.close_document();
            session.discard_artifact();
            info!("Closed '{}'", session.file_name());
        }

        self.adapter = None;
        self.current_page = 0;
        self.phase = Phase::Idle;
    }

    /// Jump to a page (1-based). Out-of-range indices and calls with no
    /// open document are reported as errors and leave the position
    /// unchanged.
    pub fn go_to_page(&mut self, page: usize) {
        let Some(session) = &self.session else {
            let _ = self
                .events_tx
                .send(ViewerEvent::Error("PDF not loaded.".to_string()));
            return;
        };

        if page < 1 || page > session.total_pages() {
            let _ = self
                .events_tx
                .send(ViewerEvent::Error(format!("Invalid page index: {page}")));
            return;
        }

        self.current_page = page - 1;
        let _ = self.events_tx.send(ViewerEvent::PageChanged(page));
    }

    /// Save one rendered page (1-based) as PNG to `path`.
    ///
    /// Never renders on demand: an uncached or out-of-range page is an
    /// error and no file is created.
    pub fn save_page(&self, page: usize, path: impl Into<PathBuf>) {
        let cached = page >= 1
            && self
                .cache
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .contains(page - 1);

        if !cached {
            let _ = self.events_tx.send(ViewerEvent::Error(format!(
                "Page not rendered yet or invalid page index: {page}"
            )));
            return;
        }

        let _ = export::save_page(
            self.cache.clone(),
            page - 1,
            path.into(),
            self.events_tx.clone(),
        );
    }

    /// Save every rendered page into `dir` as `page_<n>.png`
    pub fn save_all_pages(&self, dir: impl Into<PathBuf>) {
        let _ = export::save_all_pages(self.cache.clone(), dir.into(), self.events_tx.clone());
    }

    /// Re-enqueue a render task for a 0-based page index. The worker's
    /// cache guard makes duplicate submissions harmless.
    pub fn request_render(&self, page: usize) {
        if let (Some(request_tx), Some(session)) = (&self.request_tx, &self.session) {
            if page < session.total_pages() {
                let _ = request_tx.send(RenderRequest::Page {
                    page,
                    scale: session.render_scale(),
                });
            }
        }
    }

    /// Total pages of the open document, 0 when idle
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.session
            .as_ref()
            .map_or(0, |session| session.total_pages())
    }

    /// Currently visible page, 1-based; 1 when no document is open
    #[must_use]
    pub fn current_page(&self) -> usize {
        if self.session.is_some() {
            self.current_page + 1
        } else {
            1
        }
    }

    /// Number of pages rendered so far for the open document
    #[must_use]
    pub fn rendered_page_count(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Display name of the open document, `Unknown` when idle
    #[must_use]
    pub fn file_name(&self) -> String {
        self.session
            .as_ref()
            .map_or_else(|| "Unknown".to_string(), |s| s.file_name().to_string())
    }

    #[must_use]
    pub fn adapter(&self) -> Option<&PageViewAdapter> {
        self.adapter.as_ref()
    }

    pub fn adapter_mut(&mut self) -> Option<&mut PageViewAdapter> {
        self.adapter.as_mut()
    }
}

impl Default for PdfViewer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PdfViewer {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_quality_is_clamped() {
        let mut viewer = PdfViewer::new();
        assert_eq!(viewer.render_quality(), 100);

        viewer.set_render_quality(10);
        assert_eq!(viewer.render_quality(), MIN_RENDER_QUALITY);

        viewer.set_render_quality(9000);
        assert_eq!(viewer.render_quality(), MAX_RENDER_QUALITY);

        viewer.set_render_quality(250);
        assert_eq!(viewer.render_quality(), 250);
    }

    #[test]
    fn close_when_idle_is_a_noop() {
        let mut viewer = PdfViewer::new();
        viewer.close();
        viewer.close();
        assert_eq!(viewer.phase(), Phase::Idle);
        assert_eq!(viewer.total_pages(), 0);
    }

    #[test]
    fn go_to_page_without_document_reports_error() {
        let mut viewer = PdfViewer::new();
        viewer.go_to_page(1);

        assert_eq!(
            viewer.events().recv().unwrap(),
            ViewerEvent::Error("PDF not loaded.".to_string())
        );
    }

    #[test]
    fn queries_have_idle_defaults() {
        let viewer = PdfViewer::new();
        assert_eq!(viewer.total_pages(), 0);
        assert_eq!(viewer.current_page(), 1);
        assert_eq!(viewer.rendered_page_count(), 0);
        assert_eq!(viewer.file_name(), "Unknown");
    }
}
