//! Paginated PDF viewer core.
//!
//! Renders pages of a PDF into raster images on a background worker,
//! caches them in memory for a scrolling page view, reports progress as
//! typed events and exports rendered pages as PNG. The cache is scoped
//! to one open document; closing the document tears everything down and
//! guarantees no stale render survives past the close.

pub mod cache;
pub mod document;
pub mod events;
pub mod export;
pub mod request;
pub mod session;
pub mod settings;
pub mod source;
pub mod test_utils;
pub mod types;
pub mod view;
pub mod viewer;
pub mod worker;

pub use cache::PageCache;
pub use document::{DocumentHandle, MupdfRenderer, PageRenderer};
pub use events::ViewerEvent;
pub use request::{RenderRequest, ViewerError};
pub use session::Session;
pub use source::{AcquiredDocument, DocumentSource};
pub use types::{PageImage, Rgb};
pub use view::{Orientation, PageContent, PageViewAdapter, Zoom};
pub use viewer::{PdfViewer, Phase};
