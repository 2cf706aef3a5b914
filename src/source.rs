//! Document acquisition: resolve a source descriptor to a local PDF file

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flume::Sender;
use log::{debug, info};
use tempfile::TempPath;

use crate::events::ViewerEvent;
use crate::request::ViewerError;

const DOWNLOAD_CHUNK: usize = 8192;

/// Where a document comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentSource {
    /// A file already on local storage
    File(PathBuf),
    /// An HTTP(S) URL, downloaded to a temp file before opening
    Url(String),
}

impl DocumentSource {
    /// Classify a raw source string the way users write them
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Url(raw.to_string())
        } else {
            Self::File(PathBuf::from(raw))
        }
    }
}

/// A source resolved to an openable local file.
///
/// `temp` owns the downloaded artifact for URL sources; dropping it
/// removes the file, and the session discards it explicitly on close.
#[derive(Debug)]
pub struct AcquiredDocument {
    pub path: PathBuf,
    pub file_name: String,
    pub temp: Option<TempPath>,
}

/// Resolve a source to a local file, downloading if necessary.
///
/// Download progress for URL sources is reported on the event stream as
/// `DownloadProgress` percentages.
pub fn acquire(
    source: &DocumentSource,
    events: &Sender<ViewerEvent>,
) -> Result<AcquiredDocument, ViewerError> {
    match source {
        DocumentSource::File(path) => acquire_file(path),
        DocumentSource::Url(url) => download(url, events),
    }
}

fn acquire_file(path: &Path) -> Result<AcquiredDocument, ViewerError> {
    std::fs::File::open(path).map_err(|e| {
        ViewerError::acquisition(format!("Failed to load PDF from storage: {e}"))
    })?;

    let file_name = path
        .file_name()
        .map(|name| display_name(&name.to_string_lossy()))
        .unwrap_or_else(|| "Unknown".to_string());

    Ok(AcquiredDocument {
        path: path.to_path_buf(),
        file_name,
        temp: None,
    })
}

fn download(url: &str, events: &Sender<ViewerEvent>) -> Result<AcquiredDocument, ViewerError> {
    info!("Downloading document from {url}");

    let mut response = reqwest::blocking::get(url)
        .map_err(|e| ViewerError::acquisition(format!("Failed to download PDF: {e}")))?;
    if !response.status().is_success() {
        return Err(ViewerError::acquisition(format!(
            "Failed to download PDF: HTTP {}",
            response.status()
        )));
    }

    let total_len = response.content_length();
    let mut temp = tempfile::Builder::new()
        .prefix("downloaded_pdf")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| ViewerError::acquisition(format!("Failed to download PDF: {e}")))?;

    let mut buffer = [0u8; DOWNLOAD_CHUNK];
    let mut received: u64 = 0;
    let mut last_progress: u8 = 0;

    loop {
        let read = response
            .read(&mut buffer)
            .map_err(|e| ViewerError::acquisition(format!("Failed to download PDF: {e}")))?;
        if read == 0 {
            break;
        }

        temp.write_all(&buffer[..read])
            .map_err(|e| ViewerError::acquisition(format!("Failed to download PDF: {e}")))?;
        received += read as u64;

        if let Some(total) = total_len.filter(|&total| total > 0) {
            let progress = ((received * 100) / total).min(100) as u8;
            if progress != last_progress {
                last_progress = progress;
                let _ = events.send(ViewerEvent::DownloadProgress(progress));
            }
        }
    }

    let temp_path = temp.into_temp_path();
    debug!("Downloaded {received} bytes to {temp_path:?}");

    Ok(AcquiredDocument {
        path: temp_path.to_path_buf(),
        file_name: url_display_name(url),
        temp: Some(temp_path),
    })
}

/// Display name for a document: the file name with any `.pdf` extension
/// stripped, `Unknown` when nothing usable remains.
fn display_name(file_name: &str) -> String {
    let trimmed = file_name
        .strip_suffix(".pdf")
        .or_else(|| file_name.strip_suffix(".PDF"))
        .unwrap_or(file_name);

    if trimmed.is_empty() {
        "Unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

fn url_display_name(url: &str) -> String {
    let last_segment = url
        .rsplit('/')
        .next()
        .and_then(|segment| segment.split(['?', '#']).next())
        .unwrap_or("");

    display_name(last_segment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn parse_classifies_sources() {
        assert_eq!(
            DocumentSource::parse("https://example.com/a.pdf"),
            DocumentSource::Url("https://example.com/a.pdf".to_string())
        );
        assert_eq!(
            DocumentSource::parse("/tmp/a.pdf"),
            DocumentSource::File(PathBuf::from("/tmp/a.pdf"))
        );
        assert_eq!(
            DocumentSource::parse("relative/a.pdf"),
            DocumentSource::File(PathBuf::from("relative/a.pdf"))
        );
    }

    #[test]
    fn display_name_strips_pdf_extension() {
        assert_eq!(display_name("report.pdf"), "report");
        assert_eq!(display_name("report.PDF"), "report");
        assert_eq!(display_name("notes.txt"), "notes.txt");
        assert_eq!(display_name(""), "Unknown");
        assert_eq!(display_name(".pdf"), "Unknown");
    }

    #[test]
    fn url_display_name_ignores_query() {
        assert_eq!(
            url_display_name("https://example.com/docs/manual.pdf?dl=1"),
            "manual"
        );
        assert_eq!(url_display_name("https://example.com/"), "Unknown");
    }

    #[test]
    fn acquire_local_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".pdf")
            .tempfile()
            .unwrap();
        file.write_all(b"%PDF-").unwrap();

        let (tx, _rx) = flume::unbounded();
        let source = DocumentSource::File(file.path().to_path_buf());
        let acquired = acquire(&source, &tx).unwrap();

        assert_eq!(acquired.path, file.path());
        assert!(acquired.temp.is_none());
        assert!(!acquired.file_name.ends_with(".pdf"));
    }

    #[test]
    fn acquire_missing_file_is_an_acquisition_error() {
        let (tx, _rx) = flume::unbounded();
        let source = DocumentSource::File(PathBuf::from("/no/such/file.pdf"));

        match acquire(&source, &tx) {
            Err(ViewerError::Acquisition { detail }) => {
                assert!(detail.starts_with("Failed to load PDF from storage:"));
            }
            other => panic!("Expected acquisition error, got {other:?}"),
        }
    }
}
