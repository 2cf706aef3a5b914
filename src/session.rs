//! Per-document session state

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use tempfile::TempPath;

use crate::document::DocumentHandle;
use crate::request::ViewerError;
use crate::types::{PageImage, Rgb};

/// State shared between the lifecycle controller and the render worker
/// for one opened document.
///
/// The `closing` flag is the session's only cancellation primitive: set
/// once by the controller, observed by every in-flight task before it is
/// allowed to mutate the cache, and never reset. It is an atomic read, so
/// workers can check it without holding the cache lock.
pub struct Session {
    total_pages: usize,
    render_scale: u16,
    background: Rgb,
    file_name: String,
    closing: AtomicBool,
    doc: Mutex<DocumentHandle>,
    temp_artifact: Mutex<Option<TempPath>>,
}

impl Session {
    #[must_use]
    pub fn new(
        doc: DocumentHandle,
        render_scale: u16,
        background: Rgb,
        file_name: String,
        temp_artifact: Option<TempPath>,
    ) -> Self {
        let total_pages = doc.page_count();
        Self {
            total_pages,
            render_scale,
            background,
            file_name,
            closing: AtomicBool::new(false),
            doc: Mutex::new(doc),
            temp_artifact: Mutex::new(temp_artifact),
        }
    }

    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    #[must_use]
    pub fn render_scale(&self) -> u16 {
        self.render_scale
    }

    #[must_use]
    pub fn background(&self) -> Rgb {
        self.background
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// True once the controller has started tearing this session down
    #[must_use]
    pub fn closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Mark the session as closing. Transitions one way only.
    pub fn begin_close(&self) {
        self.closing.store(true, Ordering::Release);
        debug!("Session '{}' marked as closing", self.file_name);
    }

    /// Rasterize a page through the session's document handle.
    ///
    /// Serialized on the handle's own mutex, so a concurrent close waits
    /// for an in-flight rasterize rather than interrupting it.
    pub fn rasterize(&self, page: usize, scale: u16) -> Result<PageImage, ViewerError> {
        self.doc
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .rasterize(page, scale, self.background)
    }

    /// Close the document handle. Idempotent.
    pub fn close_document(&self) {
        self.doc
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .close();
    }

    /// Delete the downloaded temp file, if this session had one
    pub fn discard_artifact(&self) {
        let artifact = self
            .temp_artifact
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();

        if let Some(path) = artifact {
            debug!("Removing temporary document {path:?}");
            if let Err(e) = path.close() {
                log::warn!("Failed to remove temporary document: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeRenderer;

    fn test_session(pages: usize) -> Session {
        Session::new(
            DocumentHandle::new(Box::new(FakeRenderer::new(pages))),
            100,
            Rgb::WHITE,
            "test".to_string(),
            None,
        )
    }

    #[test]
    fn closing_flag_transitions_once() {
        let session = test_session(3);
        assert!(!session.closing());

        session.begin_close();
        assert!(session.closing());

        // A second begin_close is harmless and the flag never reverses.
        session.begin_close();
        assert!(session.closing());
    }

    #[test]
    fn rasterize_after_close_document_fails() {
        let session = test_session(3);
        assert!(session.rasterize(0, 100).is_ok());

        session.close_document();
        assert!(matches!(
            session.rasterize(0, 100),
            Err(ViewerError::HandleClosed)
        ));
    }
}
