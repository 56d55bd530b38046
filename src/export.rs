//! Export: rasterise every page, composite its ink, assemble a new PDF.
//!
//! ## Ordering and failure semantics
//!
//! Page rasterisations run concurrently (each page targets its own
//! offscreen raster, so there is nothing to serialise), but assembly always
//! follows input order: results are collected and sorted by page number
//! before the output document is built, so completion order never leaks
//! into the file.
//!
//! Export is fail-fast: if any page fails to rasterise or encode, the whole
//! export aborts with [`PdfInkError::ExportPageFailed`] and no output file
//! is written. A silently truncated "annotated" document is worse than an
//! error.
//!
//! The export scale is fixed in [`SessionConfig`] and independent of the
//! live zoom — output resolution should not depend on where the user last
//! left the zoom slider.

use crate::config::SessionConfig;
use crate::document::LoadedDocument;
use crate::error::PdfInkError;
use crate::ink::{rasterize_snapshot, SceneSnapshot};
use crate::pipeline::{assemble, compose, encode, render};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Summary of a completed export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportStats {
    /// Pages in the output document.
    pub pages: usize,
    /// Size of the written PDF in bytes.
    pub bytes_written: usize,
    /// Wall-clock time spent rasterising, compositing, and encoding.
    pub render_duration_ms: u64,
    /// Total wall-clock time including assembly and the file write.
    pub total_duration_ms: u64,
}

/// Export every page of `document`, compositing `overlays[page-1]` onto
/// page `page`, and write the assembled PDF to `output_path`.
pub async fn export_document(
    document: &LoadedDocument,
    overlays: &[Option<SceneSnapshot>],
    config: &SessionConfig,
    output_path: &Path,
) -> Result<ExportStats, PdfInkError> {
    let total_start = Instant::now();
    let total_pages = document.page_count();
    if total_pages == 0 {
        return Err(PdfInkError::AssemblyFailed("document has no pages".into()));
    }
    info!(
        "Exporting {} pages at scale {:.2} → {}",
        total_pages,
        config.export_scale,
        output_path.display()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_export_start(total_pages);
    }

    // ── Rasterise + composite + encode, concurrently ─────────────────────
    let render_start = Instant::now();
    let results: Vec<Result<(usize, assemble::PageImage), PdfInkError>> =
        stream::iter((1..=total_pages).map(|page_num| {
            let overlay = overlays.get(page_num - 1).and_then(|o| o.as_ref());
            async move {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_start(page_num, total_pages);
                }
                let result = export_page(document, overlay, page_num, config).await;
                if let Some(ref cb) = config.progress_callback {
                    match &result {
                        Ok(image) => cb.on_page_complete(page_num, total_pages, image.jpeg.len()),
                        Err(e) => cb.on_page_error(page_num, total_pages, &e.to_string()),
                    }
                }
                result.map(|image| (page_num, image))
            }
        }))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    // Fail-fast: the first bad page aborts the export before anything is
    // written.
    let mut pages: Vec<(usize, assemble::PageImage)> = Vec::with_capacity(total_pages);
    for result in results {
        pages.push(result?);
    }

    // Completion order is arbitrary; output order is not.
    pages.sort_by_key(|(page_num, _)| *page_num);
    let images: Vec<assemble::PageImage> = pages.into_iter().map(|(_, image)| image).collect();

    // ── Assemble and write atomically ────────────────────────────────────
    let bytes = assemble::assemble_pdf(&images, config.page_size.size_pt())?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PdfInkError::OutputWriteFailed {
                    path: output_path.to_path_buf(),
                    source: e,
                })?;
        }
    }

    // Atomic write: write to temp, then rename, so a crash mid-write never
    // leaves a half PDF at the destination.
    let tmp_path = output_path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, &bytes)
        .await
        .map_err(|e| PdfInkError::OutputWriteFailed {
            path: output_path.to_path_buf(),
            source: e,
        })?;
    tokio::fs::rename(&tmp_path, output_path)
        .await
        .map_err(|e| PdfInkError::OutputWriteFailed {
            path: output_path.to_path_buf(),
            source: e,
        })?;

    let stats = ExportStats {
        pages: total_pages,
        bytes_written: bytes.len(),
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Export complete: {} pages, {} bytes, {}ms",
        stats.pages, stats.bytes_written, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_export_complete(total_pages, stats.bytes_written);
    }

    Ok(stats)
}

/// Rasterise, composite, and encode a single page.
async fn export_page(
    document: &LoadedDocument,
    overlay: Option<&SceneSnapshot>,
    page_num: usize,
    config: &SessionConfig,
) -> Result<assemble::PageImage, PdfInkError> {
    let mut raster = render::render_page(
        document.path(),
        config.password.as_deref(),
        page_num - 1,
        config.export_scale,
        config.max_rendered_pixels,
    )
    .await
    .map_err(|e| PdfInkError::ExportPageFailed {
        page: page_num,
        detail: e.to_string(),
    })?;

    if let Some(snapshot) = overlay.filter(|s| !s.is_empty()) {
        // The raster may have been capped below the requested scale; derive
        // the scale the overlay must use from what actually came back.
        let page_size = document.page_size(page_num);
        let actual_scale = raster.width() as f32 / page_size.width_pt.max(1.0);
        let ink = rasterize_snapshot(snapshot, actual_scale, render::Viewport::of_image(&raster));
        compose::overlay_onto(&mut raster, &ink);
        debug!(
            "Page {}: composited {} strokes at scale {:.2}",
            page_num,
            snapshot.stroke_count(),
            actual_scale
        );
    }

    let jpeg = encode::encode_jpeg(&raster, config.jpeg_quality).map_err(|e| {
        PdfInkError::ExportPageFailed {
            page: page_num,
            detail: format!("JPEG encoding failed: {}", e),
        }
    })?;

    Ok(assemble::PageImage {
        width_px: raster.width(),
        height_px: raster.height(),
        jpeg,
    })
}
