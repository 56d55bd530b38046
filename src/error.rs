//! Error types for the pdfink library.
//!
//! A single fatal error enum covers the whole pipeline. The original tool
//! this crate replaces swallowed load failures silently; here every failure
//! path is explicit and carries an actionable message.
//!
//! Two things are deliberately NOT errors:
//!
//! * Navigating out of bounds — a boundary no-op, reported as `false` by the
//!   session's navigation methods.
//! * A stale render completion — prevented structurally by the session's
//!   render generation counter and discarded silently (`Ok(None)`).
//!
//! Export is fail-fast: one bad page aborts the whole export with
//! [`PdfInkError::ExportPageFailed`] rather than emitting a truncated PDF.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdfink library.
#[derive(Debug, Error)]
pub enum PdfInkError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Document errors ───────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// A page number outside `[1, total]` reached an operation that cannot
    /// treat it as a no-op (rendering, export).
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Export errors ─────────────────────────────────────────────────────
    /// A page failed during export. The export is aborted — no partial
    /// output document is written.
    #[error("Export aborted: page {page} failed: {detail}\nNo output file was written.")]
    ExportPageFailed { page: usize, detail: String },

    /// Building the output PDF structure failed.
    #[error("Failed to assemble output PDF: {0}")]
    AssemblyFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install pdfium (e.g. from bblanchon/pdfium-binaries) and either place\n\
libpdfium next to the executable or set PDFIUM_DYNAMIC_LIB_PATH.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
