//! Document handle: the open-document resource that rasterizes pages

use std::path::Path;

use log::debug;
use mupdf::{Colorspace, Document, Matrix};

use crate::request::ViewerError;
use crate::types::{PageImage, Rgb};

/// Rasterization backend for one open document.
///
/// The production implementation wraps a MuPDF document; tests plug in a
/// fake. Implementations must be callable from the render worker thread.
pub trait PageRenderer: Send {
    /// Number of pages in the document
    fn page_count(&self) -> usize;

    /// Rasterize a page at a percentage scale over a background fill.
    ///
    /// Output dimensions are `native * scale / 100`; the caller is
    /// responsible for clamping `scale` to the supported range. A failure
    /// never yields a partial image.
    fn rasterize(&self, page: usize, scale: u16, background: Rgb)
    -> Result<PageImage, ViewerError>;
}

/// MuPDF-backed renderer
pub struct MupdfRenderer {
    doc: Document,
    page_count: usize,
}

impl MupdfRenderer {
    pub fn open(path: &Path) -> Result<Self, ViewerError> {
        let doc = Document::open(path.to_string_lossy().as_ref())?;
        let page_count = doc.page_count()? as usize;
        debug!("Opened document {path:?} with {page_count} pages");

        Ok(Self { doc, page_count })
    }
}

impl PageRenderer for MupdfRenderer {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn rasterize(
        &self,
        page: usize,
        scale: u16,
        background: Rgb,
    ) -> Result<PageImage, ViewerError> {
        if page >= self.page_count {
            return Err(ViewerError::InvalidIndex(page));
        }

        let page = self.doc.load_page(page as i32)?;
        let mag = f32::from(scale) / 100.0;
        let transform = Matrix::new_scale(mag, mag);

        let rgb = Colorspace::device_rgb();
        let pixmap = page.to_pixmap(&transform, &rgb, true, false)?;

        composite_over_background(&pixmap, background)
    }
}

/// Flatten an alpha pixmap onto the background color, producing tightly
/// packed RGB. MuPDF samples are premultiplied, so the blend is
/// `src + bg * (255 - a) / 255` per channel.
fn composite_over_background(
    pixmap: &mupdf::Pixmap,
    background: Rgb,
) -> Result<PageImage, ViewerError> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(ViewerError::render(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    if samples.len() < stride.saturating_mul(height) || row_bytes > stride {
        return Err(ViewerError::render("Pixmap buffer size mismatch"));
    }

    let bg = [background.r, background.g, background.b];
    let mut out = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row_start = y * stride;
        let row = &samples[row_start..row_start + row_bytes];
        if n == 3 {
            out.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                let inv_a = u16::from(255 - px[3]);
                for c in 0..3 {
                    let blended = u16::from(px[c]) + (u16::from(bg[c]) * inv_a) / 255;
                    out.push(blended.min(255) as u8);
                }
            }
        }
    }

    Ok(PageImage::new(out, pixmap.width(), pixmap.height()))
}

/// Owns the renderer for the lifetime of one session.
///
/// `close` is idempotent; any rasterize call after close fails with
/// [`ViewerError::HandleClosed`] instead of touching freed state.
pub struct DocumentHandle {
    renderer: Option<Box<dyn PageRenderer>>,
    page_count: usize,
}

impl DocumentHandle {
    #[must_use]
    pub fn new(renderer: Box<dyn PageRenderer>) -> Self {
        let page_count = renderer.page_count();
        Self {
            renderer: Some(renderer),
            page_count,
        }
    }

    /// Page count recorded at open time; remains valid after close
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.renderer.is_none()
    }

    pub fn rasterize(
        &self,
        page: usize,
        scale: u16,
        background: Rgb,
    ) -> Result<PageImage, ViewerError> {
        match &self.renderer {
            Some(renderer) => renderer.rasterize(page, scale, background),
            None => Err(ViewerError::HandleClosed),
        }
    }

    /// Release the underlying document. Safe to call more than once.
    pub fn close(&mut self) {
        if self.renderer.take().is_some() {
            debug!("Document handle closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeRenderer;

    #[test]
    fn rasterize_after_close_fails_cleanly() {
        let mut handle = DocumentHandle::new(Box::new(FakeRenderer::new(2)));
        assert!(handle.rasterize(0, 100, Rgb::WHITE).is_ok());

        handle.close();
        assert!(handle.is_closed());
        assert!(matches!(
            handle.rasterize(0, 100, Rgb::WHITE),
            Err(ViewerError::HandleClosed)
        ));
    }

    #[test]
    fn close_is_idempotent() {
        let mut handle = DocumentHandle::new(Box::new(FakeRenderer::new(1)));
        handle.close();
        handle.close();
        assert!(handle.is_closed());
        // Page count stays queryable after close.
        assert_eq!(handle.page_count(), 1);
    }
}
