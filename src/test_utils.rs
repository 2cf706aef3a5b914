//! Test fakes for driving the viewer core without a real PDF

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use flume::{Receiver, Sender};

use crate::document::PageRenderer;
use crate::request::ViewerError;
use crate::types::{PageImage, Rgb};

/// Native page size the fake pretends every page has, before scaling
const NATIVE_WIDTH: u32 = 100;
const NATIVE_HEIGHT: u32 = 140;

/// A scriptable in-memory renderer.
///
/// Produces solid background-colored images sized like a real rasterize
/// call (`native * scale / 100`). Individual pages can be made to fail,
/// and a gate can be attached to hold a rasterize mid-flight while a
/// test closes the session around it.
pub struct FakeRenderer {
    pages: usize,
    fail_pages: HashSet<usize>,
    started_tx: Option<Sender<usize>>,
    gate_rx: Option<Receiver<()>>,
    calls: Arc<Mutex<Vec<(usize, u16)>>>,
}

impl FakeRenderer {
    #[must_use]
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            fail_pages: HashSet::new(),
            started_tx: None,
            gate_rx: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make rasterize fail for one page index
    #[must_use]
    pub fn failing_on(mut self, page: usize) -> Self {
        self.fail_pages.insert(page);
        self
    }

    /// Gate every rasterize call.
    ///
    /// Each call first announces its page index on the returned receiver,
    /// then blocks until the test sends a token on the returned sender.
    /// Dropping the sender releases all subsequent calls.
    #[must_use]
    pub fn gated(mut self) -> (Self, Sender<()>, Receiver<usize>) {
        let (gate_tx, gate_rx) = flume::unbounded();
        let (started_tx, started_rx) = flume::unbounded();
        self.gate_rx = Some(gate_rx);
        self.started_tx = Some(started_tx);
        (self, gate_tx, started_rx)
    }

    /// Shared log of `(page, scale)` rasterize calls, clonable before the
    /// renderer moves into the worker thread
    #[must_use]
    pub fn call_log(&self) -> Arc<Mutex<Vec<(usize, u16)>>> {
        self.calls.clone()
    }
}

impl PageRenderer for FakeRenderer {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn rasterize(
        &self,
        page: usize,
        scale: u16,
        background: Rgb,
    ) -> Result<PageImage, ViewerError> {
        self.calls.lock().unwrap().push((page, scale));

        if let Some(tx) = &self.started_tx {
            let _ = tx.send(page);
        }
        if let Some(rx) = &self.gate_rx {
            let _ = rx.recv();
        }

        if page >= self.pages {
            return Err(ViewerError::InvalidIndex(page));
        }
        if self.fail_pages.contains(&page) {
            return Err(ViewerError::render(format!(
                "simulated failure on page {page}"
            )));
        }

        let scale = u32::from(scale);
        Ok(PageImage::solid(
            NATIVE_WIDTH * scale / 100,
            NATIVE_HEIGHT * scale / 100,
            background,
        ))
    }
}
