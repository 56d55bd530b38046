//! Input resolution: normalise a path, URL, or byte buffer to a local file.
//!
//! ## Why always a file?
//!
//! pdfium renders from a file-system path, and a session re-renders the
//! same document many times (every navigation and zoom), so whatever the
//! caller hands us is pinned down to one local file for the session's
//! lifetime. URL inputs download into a `TempDir`; byte buffers (the "file
//! picker handed us memory" case) spill into a `NamedTempFile`. Both clean
//! up automatically when the [`ResolvedInput`] drops, even on panic. We
//! validate the PDF magic bytes (`%PDF`) before returning so callers get a
//! meaningful error rather than a pdfium crash.

use crate::error::PdfInkError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};

/// The resolved input — a local path, or a temp file we own.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; PDF downloaded to a temp directory.
    /// The `TempDir` is kept alive to prevent cleanup while the session
    /// still renders from it.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
    /// Input was an in-memory byte buffer, spilled to a named temp file.
    Buffered { file: NamedTempFile },
}

impl ResolvedInput {
    /// Get the path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
            ResolvedInput::Buffered { file } => file.path(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local PDF file path.
///
/// If the input is a URL, download it to a temporary directory.
/// If the input is a local file, validate it exists and is readable.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, PdfInkError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Pin an in-memory PDF down to a temp file pdfium can open.
///
/// This is the path a file-selection dialog takes: the caller has a raw
/// byte buffer, not a filename.
pub fn resolve_bytes(bytes: &[u8]) -> Result<ResolvedInput, PdfInkError> {
    check_magic_bytes(bytes, Path::new("<memory>"))?;

    let mut file =
        NamedTempFile::new().map_err(|e| PdfInkError::Internal(format!("tempfile: {e}")))?;
    file.write_all(bytes)
        .map_err(|e| PdfInkError::Internal(format!("tempfile write: {e}")))?;
    file.flush()
        .map_err(|e| PdfInkError::Internal(format!("tempfile flush: {e}")))?;

    debug!("Buffered {} PDF bytes to {}", bytes.len(), file.path().display());
    Ok(ResolvedInput::Buffered { file })
}

/// Resolve a local file path, validating existence and PDF magic bytes.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, PdfInkError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(PdfInkError::FileNotFound { path });
    }

    // Check read permission by attempting to open
    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(PdfInkError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PdfInkError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(PdfInkError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

fn check_magic_bytes(bytes: &[u8], context: &Path) -> Result<(), PdfInkError> {
    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(PdfInkError::NotAPdf {
            path: context.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, PdfInkError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PdfInkError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            PdfInkError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            PdfInkError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(PdfInkError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = extract_filename(url);

    let temp_dir = TempDir::new().map_err(|e| PdfInkError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PdfInkError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    check_magic_bytes(&bytes, &file_path)?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| PdfInkError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded to: {}", file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}
