//! Export pipeline: drain cached pages to PNG files on disk

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use flume::Sender;
use image::{ImageFormat, RgbImage};
use log::{debug, info};

use crate::cache::PageCache;
use crate::events::ViewerEvent;
use crate::types::PageImage;

/// File name for an exported page, using 1-based numbering
#[must_use]
pub fn page_file_name(page: usize) -> String {
    format!("page_{}.png", page + 1)
}

fn write_png(image: &PageImage, path: &Path) -> Result<()> {
    let buffer = RgbImage::from_raw(image.width, image.height, image.pixels.clone())
        .context("Rendered page buffer has inconsistent dimensions")?;
    buffer
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Failed to write {path:?}"))?;
    Ok(())
}

/// Save one cached page to `path` as PNG on a dedicated one-shot thread.
///
/// `page` is the 0-based cache index; the caller has already verified the
/// page is cached and reported the error otherwise. Completion is
/// reported as `PageSaved` (1-based) or `Error` on the event stream.
pub fn save_page(
    cache: Arc<Mutex<PageCache>>,
    page: usize,
    path: PathBuf,
    events: Sender<ViewerEvent>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let image = cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(page);

        let Some(image) = image else {
            let _ = events.send(ViewerEvent::Error(format!(
                "Page not rendered yet or invalid page index: {}",
                page + 1
            )));
            return;
        };

        match write_png(&image, &path) {
            Ok(()) => {
                debug!("Saved page {} to {path:?}", page + 1);
                let _ = events.send(ViewerEvent::PageSaved {
                    page: page + 1,
                    path,
                });
            }
            Err(e) => {
                let _ = events.send(ViewerEvent::Error(format!("Error saving page: {e:#}")));
            }
        }
    })
}

/// Save every cached page into `dir` as `page_<n>.png`, strictly one page
/// at a time, on its own worker thread.
///
/// Indices `0 .. cache.len()` at call time are visited in order; a
/// missing entry is reported as a per-page failure and the sequence
/// continues. One `AllPagesSaved` follows the final index.
pub fn save_all_pages(
    cache: Arc<Mutex<PageCache>>,
    dir: PathBuf,
    events: Sender<ViewerEvent>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let count = cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len();
        info!("Exporting {count} rendered pages to {dir:?}");

        for page in 0..count {
            let image = cache
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .get(page);

            let Some(image) = image else {
                let _ = events.send(ViewerEvent::Error(format!(
                    "Page {} not available.",
                    page + 1
                )));
                continue;
            };

            let path = dir.join(page_file_name(page));
            match write_png(&image, &path) {
                Ok(()) => {
                    let _ = events.send(ViewerEvent::PageSaved {
                        page: page + 1,
                        path,
                    });
                }
                Err(e) => {
                    let _ = events.send(ViewerEvent::Error(format!(
                        "Error saving page {}: {e:#}",
                        page + 1
                    )));
                }
            }
        }

        let _ = events.send(ViewerEvent::AllPagesSaved(dir));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rgb;

    fn cache_with_pages(pages: &[usize]) -> Arc<Mutex<PageCache>> {
        let cache = Arc::new(Mutex::new(PageCache::new()));
        for &page in pages {
            cache
                .lock()
                .unwrap()
                .put(page, PageImage::solid(6, 4, Rgb::WHITE));
        }
        cache
    }

    #[test]
    fn save_all_emits_ordered_events_then_completion() {
        let cache = cache_with_pages(&[0, 1, 2]);
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = flume::unbounded();

        save_all_pages(cache, dir.path().to_path_buf(), tx)
            .join()
            .unwrap();

        let events: Vec<ViewerEvent> = rx.drain().collect();
        assert_eq!(events.len(), 4);
        for (i, event) in events.iter().take(3).enumerate() {
            match event {
                ViewerEvent::PageSaved { page, path } => {
                    assert_eq!(*page, i + 1);
                    assert_eq!(path, &dir.path().join(format!("page_{}.png", i + 1)));
                    assert!(path.exists());
                }
                other => panic!("Expected PageSaved, got {other:?}"),
            }
        }
        assert_eq!(
            events[3],
            ViewerEvent::AllPagesSaved(dir.path().to_path_buf())
        );
    }

    #[test]
    fn save_all_reports_gap_and_continues() {
        // Pages 0 and 2 cached, page 1 missing: len() is 2, so indices
        // 0 and 1 are visited; the gap becomes a per-page failure.
        let cache = cache_with_pages(&[0, 2]);
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = flume::unbounded();

        save_all_pages(cache, dir.path().to_path_buf(), tx)
            .join()
            .unwrap();

        let events: Vec<ViewerEvent> = rx.drain().collect();
        assert!(matches!(events[0], ViewerEvent::PageSaved { page: 1, .. }));
        assert_eq!(
            events[1],
            ViewerEvent::Error("Page 2 not available.".to_string())
        );
        assert!(matches!(events.last(), Some(ViewerEvent::AllPagesSaved(_))));
    }

    #[test]
    fn save_all_on_empty_cache_completes_immediately() {
        let cache = cache_with_pages(&[]);
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = flume::unbounded();

        save_all_pages(cache, dir.path().to_path_buf(), tx)
            .join()
            .unwrap();

        let events: Vec<ViewerEvent> = rx.drain().collect();
        assert_eq!(
            events,
            vec![ViewerEvent::AllPagesSaved(dir.path().to_path_buf())]
        );
    }

    #[test]
    fn save_page_writes_png_and_reports() {
        let cache = cache_with_pages(&[0]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let (tx, rx) = flume::unbounded();

        save_page(cache, 0, path.clone(), tx).join().unwrap();

        assert!(path.exists());
        assert_eq!(
            rx.recv().unwrap(),
            ViewerEvent::PageSaved { page: 1, path }
        );
    }

    #[test]
    fn save_page_write_failure_is_reported_not_fatal() {
        let cache = cache_with_pages(&[0]);
        let path = PathBuf::from("/nonexistent-dir/out.png");
        let (tx, rx) = flume::unbounded();

        save_page(cache, 0, path.clone(), tx).join().unwrap();

        assert!(!path.exists());
        match rx.recv().unwrap() {
            ViewerEvent::Error(msg) => assert!(msg.starts_with("Error saving page:")),
            other => panic!("Expected Error, got {other:?}"),
        }
    }
}
