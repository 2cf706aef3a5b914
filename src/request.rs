//! Render task queue messages and error types

/// Request sent to the render worker
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderRequest {
    /// Render a page at the given percentage scale
    Page { page: usize, scale: u16 },

    /// Stop the worker
    Shutdown,
}

/// Errors surfaced by the viewer core
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    /// The document source could not be read or downloaded
    #[error("{detail}")]
    Acquisition { detail: String },

    /// The PDF engine failed to open the document or render a page
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    /// A single page could not be rasterized into a usable image
    #[error("{detail}")]
    Render { detail: String },

    /// Rasterize was called after the document handle was closed
    #[error("document handle is closed")]
    HandleClosed,

    /// Navigation or save requested for an out-of-range page
    #[error("Invalid page index: {0}")]
    InvalidIndex(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ViewerError {
    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::Acquisition { detail: msg.into() }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render { detail: msg.into() }
    }
}
