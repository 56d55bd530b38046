//! PDF rasterisation: render one page to an `RgbaImage` via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves the work onto a dedicated
//! thread pool thread designed for blocking operations, preventing the
//! Tokio worker threads from stalling during CPU-heavy rendering.
//!
//! ## Why cap pixels, not scale?
//!
//! Page sizes vary wildly: an A0 poster at 10× zoom would produce a raster
//! in the hundreds of megapixels. `max_pixels` caps the longest edge
//! regardless of the requested scale, keeping memory bounded; callers that
//! need the exact on-disk scale recover it from the returned raster's
//! dimensions.

use crate::document::DocumentInfo;
use crate::error::PdfInkError;
use image::RgbaImage;
use pdfium_render::prelude::*;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// A page's media-box size in points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageSizePt {
    pub width_pt: f32,
    pub height_pt: f32,
}

/// Pixel dimensions a page occupies at a given scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Viewport for a page at `scale`, capped so neither edge exceeds
    /// `max_pixels` (the other edge shrinks proportionally).
    pub fn of_page(size: PageSizePt, scale: f32, max_pixels: u32) -> Viewport {
        let scale = if scale > 0.0 { scale } else { 1.0 };
        let mut w = (size.width_pt * scale).round().max(1.0);
        let mut h = (size.height_pt * scale).round().max(1.0);

        let longest = w.max(h);
        if longest > max_pixels as f32 {
            let shrink = max_pixels as f32 / longest;
            w = (w * shrink).round().max(1.0);
            h = (h * shrink).round().max(1.0);
        }

        Viewport {
            width: w as u32,
            height: h as u32,
        }
    }

    /// Dimensions of an existing raster.
    pub fn of_image(img: &RgbaImage) -> Viewport {
        Viewport {
            width: img.width(),
            height: img.height(),
        }
    }
}

/// Rasterise one page (0-based index) at `scale`.
///
/// This runs inside `spawn_blocking` since pdfium operations are CPU-bound.
pub async fn render_page(
    pdf_path: &Path,
    password: Option<&str>,
    page_index: usize,
    scale: f32,
    max_pixels: u32,
) -> Result<RgbaImage, PdfInkError> {
    let path = pdf_path.to_path_buf();
    let password = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || {
        render_page_blocking(&path, password.as_deref(), page_index, scale, max_pixels)
    })
    .await
    .map_err(|e| PdfInkError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of page rendering.
fn render_page_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    page_index: usize,
    scale: f32,
    max_pixels: u32,
) -> Result<RgbaImage, PdfInkError> {
    let pdfium = Pdfium::default();
    let document = open_document(&pdfium, pdf_path, password)?;
    let pages = document.pages();
    let total_pages = pages.len() as usize;

    if page_index >= total_pages {
        return Err(PdfInkError::PageOutOfRange {
            page: page_index + 1,
            total: total_pages,
        });
    }

    let page = pages
        .get(page_index as u16)
        .map_err(|e| PdfInkError::RasterisationFailed {
            page: page_index + 1,
            detail: format!("{:?}", e),
        })?;

    let size = PageSizePt {
        width_pt: page.width().value,
        height_pt: page.height().value,
    };
    let viewport = Viewport::of_page(size, scale, max_pixels);

    let render_config = PdfRenderConfig::new()
        .set_target_width(viewport.width as i32)
        .set_maximum_height(viewport.height as i32);

    let bitmap =
        page.render_with_config(&render_config)
            .map_err(|e| PdfInkError::RasterisationFailed {
                page: page_index + 1,
                detail: format!("{:?}", e),
            })?;

    let image = bitmap.as_image().to_rgba8();
    debug!(
        "Rendered page {} → {}x{} px (scale {:.2})",
        page_index + 1,
        image.width(),
        image.height(),
        scale
    );

    Ok(image)
}

/// Extract document metadata and per-page sizes without rendering.
pub async fn document_info(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentInfo, PdfInkError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || document_info_blocking(&path, pwd.as_deref()))
        .await
        .map_err(|e| PdfInkError::Internal(format!("Inspect task panicked: {}", e)))?
}

/// Blocking implementation of document inspection.
fn document_info_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentInfo, PdfInkError> {
    let pdfium = Pdfium::default();
    let document = open_document(&pdfium, pdf_path, password)?;

    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    let mut page_sizes = Vec::new();
    for page in document.pages().iter() {
        page_sizes.push(PageSizePt {
            width_pt: page.width().value,
            height_pt: page.height().value,
        });
    }

    debug!("PDF opened: {} pages", page_sizes.len());

    Ok(DocumentInfo {
        page_count: page_sizes.len(),
        page_sizes,
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        pdf_version: format!("{:?}", document.version()),
    })
}

/// Open a document, classifying pdfium's opaque load errors into the
/// password/corruption taxonomy callers can act on.
fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, PdfInkError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                PdfInkError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                PdfInkError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            PdfInkError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LETTER: PageSizePt = PageSizePt {
        width_pt: 612.0,
        height_pt: 792.0,
    };

    #[test]
    fn viewport_scales_page_points() {
        let vp = Viewport::of_page(LETTER, 1.5, 4096);
        assert_eq!(vp.width, 918);
        assert_eq!(vp.height, 1188);
    }

    #[test]
    fn viewport_caps_longest_edge() {
        let vp = Viewport::of_page(LETTER, 10.0, 2000);
        assert_eq!(vp.height, 2000);
        assert!(vp.width < 2000);
        // Aspect ratio survives the cap.
        let ratio = vp.width as f32 / vp.height as f32;
        assert!((ratio - 612.0 / 792.0).abs() < 0.01, "ratio {ratio}");
    }

    #[test]
    fn viewport_never_degenerates_to_zero() {
        let vp = Viewport::of_page(LETTER, 0.0001, 4096);
        assert!(vp.width >= 1);
        assert!(vp.height >= 1);

        let vp = Viewport::of_page(LETTER, -1.0, 4096);
        assert_eq!(vp.width, 612);
    }
}
