//! Background render worker - one sequential thread per session

use std::sync::{Arc, Mutex};

use flume::{Receiver, Sender};
use log::{debug, warn};

use crate::cache::PageCache;
use crate::events::ViewerEvent;
use crate::request::RenderRequest;
use crate::session::Session;

/// Main worker function - runs in a dedicated thread.
///
/// Consumes render requests in FIFO order until a `Shutdown` request
/// arrives or the queue disconnects. With the controller enqueuing one
/// task per page in ascending order, pages complete in non-decreasing
/// index order and progress grows monotonically.
pub fn render_worker(
    session: Arc<Session>,
    requests: Receiver<RenderRequest>,
    events: Sender<ViewerEvent>,
    cache: Arc<Mutex<PageCache>>,
) {
    for request in requests {
        match request {
            RenderRequest::Page { page, scale } => {
                handle_page_request(&session, page, scale, &cache, &events);
            }

            RenderRequest::Shutdown => break,
        }
    }

    debug!("Render worker for '{}' stopped", session.file_name());
}

fn handle_page_request(
    session: &Session,
    page: usize,
    scale: u16,
    cache: &Arc<Mutex<PageCache>>,
    events: &Sender<ViewerEvent>,
) {
    if session.closing() {
        return;
    }

    // Idempotent re-submission guard: a page already published is never
    // rendered twice within a session.
    let cached = cache
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .contains(page);
    if cached {
        return;
    }

    match session.rasterize(page, scale) {
        Ok(image) => {
            // Re-check before publishing: a render that completed while
            // the session was closing must not resurrect a cleared entry.
            if session.closing() {
                debug!("Discarding render of page {page} for closing session");
                return;
            }

            let mut guard = cache
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let inserted = guard.put(page, image);
            let rendered = guard.len();
            drop(guard);

            if inserted {
                let progress = render_progress(rendered, session.total_pages());
                let _ = events.send(ViewerEvent::RenderProgress(progress));
                let _ = events.send(ViewerEvent::PageReady(page));
            }
        }

        Err(e) => {
            warn!("Failed to render page {page}: {e}");
            let _ = events.send(ViewerEvent::Error(format!(
                "Failed to render page {}: {e}",
                page + 1
            )));
        }
    }
}

/// Render progress in percent for `rendered` out of `total` pages.
/// Rounds up so every completed page moves the number, and a finished
/// document always reports exactly 100.
#[must_use]
pub fn render_progress(rendered: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (rendered * 100).div_ceil(total).min(100) as u8
}
