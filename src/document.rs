//! Document handle and metadata.
//!
//! A [`LoadedDocument`] pairs the resolved input (which may own a temp file
//! keeping a downloaded or in-memory PDF alive) with the metadata pdfium
//! reported when the document was opened. The session replaces its handle
//! wholesale on every load; per-page histories go with it.

use crate::pipeline::input::ResolvedInput;
use crate::pipeline::render::PageSizePt;
use serde::Serialize;
use std::path::Path;

/// Metadata extracted when a document is opened.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    /// Total number of pages.
    pub page_count: usize,
    /// Per-page media-box sizes in points, index 0 = page 1.
    pub page_sizes: Vec<PageSizePt>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub pdf_version: String,
}

/// An opened document: resolved input plus its metadata.
#[derive(Debug)]
pub struct LoadedDocument {
    source: ResolvedInput,
    info: DocumentInfo,
}

impl LoadedDocument {
    pub fn new(source: ResolvedInput, info: DocumentInfo) -> Self {
        Self { source, info }
    }

    /// Filesystem path pdfium renders from.
    pub fn path(&self) -> &Path {
        self.source.path()
    }

    pub fn info(&self) -> &DocumentInfo {
        &self.info
    }

    pub fn page_count(&self) -> usize {
        self.info.page_count
    }

    /// Size of a 1-based page in points. Falls back to US Letter when the
    /// index is out of range so viewport math never divides by zero.
    pub fn page_size(&self, page: usize) -> PageSizePt {
        self.info
            .page_sizes
            .get(page.saturating_sub(1))
            .copied()
            .unwrap_or(PageSizePt {
                width_pt: 612.0,
                height_pt: 792.0,
            })
    }
}
