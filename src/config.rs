//! Configuration types for an annotation session.
//!
//! All session behaviour is controlled through [`SessionConfig`], built via
//! its [`SessionConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs, serialise them for logging, and diff two runs
//! to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely
//! on well-documented defaults for the rest.

use crate::error::PdfInkError;
use crate::ink::Color;
use crate::pipeline::render::PageSizePt;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

const MM_TO_PT: f32 = 72.0 / 25.4;

/// Configuration for an annotation session.
///
/// Built via [`SessionConfig::builder()`] or using
/// [`SessionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdfink::SessionConfig;
///
/// let config = SessionConfig::builder()
///     .base_scale(1.5)
///     .jpeg_quality(90)
///     .concurrency(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SessionConfig {
    /// Base render scale applied to every page, before zoom. Default: 1.5.
    ///
    /// 1.5 renders a US-Letter page at roughly 918 × 1188 px — sharp enough
    /// to draw on comfortably without ballooning memory. The effective
    /// on-screen scale is `base_scale × zoom`.
    pub base_scale: f32,

    /// Multiplicative zoom step applied per zoom-in/zoom-out call. Default: 1.1.
    ///
    /// A multiplicative step keeps zooming symmetric: n steps in followed by
    /// n steps out lands back on the original scale (within floating-point
    /// tolerance), which an additive step does not.
    pub zoom_step: f32,

    /// Lower bound for the zoom factor. Default: 0.1.
    ///
    /// Without a bound, repeated zoom-out drives the viewport towards a
    /// zero-pixel raster and pdfium bitmap allocation fails in confusing
    /// ways. Steps past the bound are absorbed, not errors.
    pub min_zoom: f32,

    /// Upper bound for the zoom factor. Default: 10.0.
    pub max_zoom: f32,

    /// Render scale used for export, independent of the live zoom. Default: 1.5.
    ///
    /// Exporting at whatever zoom the user happened to be inspecting the
    /// document at would make output resolution accidental. Export always
    /// uses this fixed scale.
    pub export_scale: f32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 4096.
    ///
    /// A safety cap independent of scale. A zoomed-in A0 poster could
    /// produce a raster large enough to exhaust memory; this caps either
    /// dimension, scaling the other proportionally.
    pub max_rendered_pixels: u32,

    /// JPEG quality for exported page images, 1–100. Default: 85.
    ///
    /// Export pages are photographs of rasterised pages, so JPEG's lossy
    /// compression is the right trade: 85 is visually transparent for text
    /// at export scale while keeping a 50-page export in the single-digit
    /// megabytes.
    pub jpeg_quality: u8,

    /// Physical page size of the exported document. Default: A4.
    ///
    /// Every input page is emitted as one full-bleed image on a page of
    /// this size, regardless of the source page's aspect ratio.
    pub page_size: ExportPageSize,

    /// Number of concurrent page rasterisations during export. Default: 4.
    ///
    /// Rasterisation is CPU-bound; going much beyond the physical core
    /// count only adds memory pressure from in-flight bitmaps.
    pub concurrency: usize,

    /// Initial pen color. Default: black. Propagated to the ink surface
    /// brush on session creation; changeable at any time via the session.
    pub pen_color: Color,

    /// Initial pen width in page points (1/72 inch). Default: 3.0.
    pub pen_width: f32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Progress callback fired per exported page. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_scale: 1.5,
            zoom_step: 1.1,
            min_zoom: 0.1,
            max_zoom: 10.0,
            export_scale: 1.5,
            max_rendered_pixels: 4096,
            jpeg_quality: 85,
            page_size: ExportPageSize::default(),
            concurrency: 4,
            pen_color: Color::BLACK,
            pen_width: 3.0,
            password: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("base_scale", &self.base_scale)
            .field("zoom_step", &self.zoom_step)
            .field("min_zoom", &self.min_zoom)
            .field("max_zoom", &self.max_zoom)
            .field("export_scale", &self.export_scale)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("page_size", &self.page_size)
            .field("concurrency", &self.concurrency)
            .field("pen_color", &self.pen_color)
            .field("pen_width", &self.pen_width)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExportProgressCallback>"),
            )
            .finish()
    }
}

impl SessionConfig {
    /// Create a new builder for `SessionConfig`.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn base_scale(mut self, scale: f32) -> Self {
        self.config.base_scale = scale.clamp(0.1, 10.0);
        self
    }

    pub fn zoom_step(mut self, step: f32) -> Self {
        self.config.zoom_step = step.max(1.01);
        self
    }

    pub fn zoom_bounds(mut self, min: f32, max: f32) -> Self {
        self.config.min_zoom = min.max(0.01);
        self.config.max_zoom = max;
        self
    }

    pub fn export_scale(mut self, scale: f32) -> Self {
        self.config.export_scale = scale.clamp(0.1, 10.0);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn page_size(mut self, size: ExportPageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn pen_color(mut self, color: Color) -> Self {
        self.config.pen_color = color;
        self
    }

    pub fn pen_width(mut self, width: f32) -> Self {
        self.config.pen_width = width.max(0.1);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SessionConfig, PdfInkError> {
        let c = &self.config;
        if c.min_zoom >= c.max_zoom {
            return Err(PdfInkError::InvalidConfig(format!(
                "Zoom bounds must satisfy min < max, got [{}, {}]",
                c.min_zoom, c.max_zoom
            )));
        }
        if c.zoom_step <= 1.0 {
            return Err(PdfInkError::InvalidConfig(format!(
                "Zoom step must be > 1.0, got {}",
                c.zoom_step
            )));
        }
        if c.concurrency == 0 {
            return Err(PdfInkError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        let size = c.page_size.size_pt();
        if size.width_pt <= 0.0 || size.height_pt <= 0.0 {
            return Err(PdfInkError::InvalidConfig(format!(
                "Export page size must be positive, got {} × {} pt",
                size.width_pt, size.height_pt
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Physical page size of the exported document.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ExportPageSize {
    /// ISO A4, 210 × 297 mm. (default)
    #[default]
    A4,
    /// US Letter, 8.5 × 11 in.
    Letter,
    /// Custom size in millimetres.
    Custom { width_mm: f32, height_mm: f32 },
}

impl ExportPageSize {
    /// The page size in PDF points (1/72 inch).
    pub fn size_pt(&self) -> PageSizePt {
        match self {
            ExportPageSize::A4 => PageSizePt {
                width_pt: 210.0 * MM_TO_PT,
                height_pt: 297.0 * MM_TO_PT,
            },
            ExportPageSize::Letter => PageSizePt {
                width_pt: 612.0,
                height_pt: 792.0,
            },
            ExportPageSize::Custom {
                width_mm,
                height_mm,
            } => PageSizePt {
                width_pt: width_mm * MM_TO_PT,
                height_pt: height_mm * MM_TO_PT,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SessionConfig::builder().build().expect("default config");
        assert_eq!(config.jpeg_quality, 85);
        assert_eq!(config.page_size, ExportPageSize::A4);
    }

    #[test]
    fn a4_size_in_points() {
        let size = ExportPageSize::A4.size_pt();
        assert!((size.width_pt - 595.28).abs() < 0.1, "got {}", size.width_pt);
        assert!((size.height_pt - 841.89).abs() < 0.1, "got {}", size.height_pt);
    }

    #[test]
    fn builder_clamps_quality() {
        let config = SessionConfig::builder().jpeg_quality(255).build().unwrap();
        assert_eq!(config.jpeg_quality, 100);
    }

    #[test]
    fn inverted_zoom_bounds_rejected() {
        let err = SessionConfig::builder()
            .zoom_bounds(5.0, 2.0)
            .build()
            .expect_err("min >= max must fail");
        assert!(matches!(err, PdfInkError::InvalidConfig(_)));
    }

    #[test]
    fn degenerate_custom_page_size_rejected() {
        let err = SessionConfig::builder()
            .page_size(ExportPageSize::Custom {
                width_mm: 0.0,
                height_mm: 297.0,
            })
            .build()
            .expect_err("zero width must fail");
        assert!(matches!(err, PdfInkError::InvalidConfig(_)));
    }

    #[test]
    fn zoom_step_guard() {
        // The setter clamps to > 1.0, so build succeeds even for a bad input.
        let config = SessionConfig::builder().zoom_step(0.5).build().unwrap();
        assert!(config.zoom_step > 1.0);
    }
}
