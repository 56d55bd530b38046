//! Progress-callback trait for per-page export events.
//!
//! Inject an [`Arc<dyn ExportProgressCallback>`] via
//! [`crate::config::SessionConfigBuilder::progress_callback`] to receive
//! real-time events as the exporter processes each page.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a channel, a UI thread, or a terminal progress bar
//! — without the library knowing anything about how the host application
//! communicates. The trait is `Send + Sync` so it works correctly when
//! pages are rasterised concurrently.

use std::sync::Arc;

/// Called by the exporter as it processes each page.
///
/// Implementations must be `Send + Sync` (export rasterises pages
/// concurrently). All methods have default no-op implementations so callers
/// only override what they care about.
///
/// # Thread safety
///
/// `on_page_start`, `on_page_complete`, and `on_page_error` may be called
/// concurrently from different threads. Implementations must protect shared
/// mutable state with appropriate synchronisation primitives.
pub trait ExportProgressCallback: Send + Sync {
    /// Called once before any page is rasterised.
    fn on_export_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is rasterised.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page has been rasterised, composited, and encoded.
    ///
    /// `jpeg_len` is the encoded size in bytes — useful for progress bars
    /// that track output size.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, jpeg_len: usize) {
        let _ = (page_num, total_pages, jpeg_len);
    }

    /// Called when a page fails. Export is fail-fast, so at most one error
    /// event fires per export, and `on_export_complete` will not follow.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after the output file has been written.
    fn on_export_complete(&self, total_pages: usize, bytes_written: usize) {
        let _ = (total_pages, bytes_written);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ExportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SessionConfig`].
pub type ProgressCallback = Arc<dyn ExportProgressCallback>;
