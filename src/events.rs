//! Outbound event surface.
//!
//! The core emits typed events over a flume channel; the binding layer
//! (UI, CLI) subscribes and decides how to present them. Nothing in the
//! core ever blocks on a consumer.

use std::path::PathBuf;

/// Events emitted by the viewer core.
///
/// Page indices in `PageChanged`, `PageSaved` and the error messages are
/// 1-based, matching the user-facing page numbering. `PageReady` carries
/// the 0-based cache index the display adapter binds against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewerEvent {
    /// Download progress for URL-sourced documents, in percent
    DownloadProgress(u8),

    /// Overall render progress for the open document, in percent
    RenderProgress(u8),

    /// A document was opened and its render queue populated
    PdfLoaded {
        total_pages: usize,
        file_name: String,
    },

    /// The visible page changed (1-based)
    PageChanged(usize),

    /// A page finished rendering and is now in the cache (0-based)
    PageReady(usize),

    /// A page was exported to disk (1-based)
    PageSaved { page: usize, path: PathBuf },

    /// A bulk export finished
    AllPagesSaved(PathBuf),

    /// A recoverable error, reported without stopping the session
    Error(String),
}
