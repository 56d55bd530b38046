//! # pdfink
//!
//! Freehand ink annotation for PDF documents: open a PDF, render pages,
//! draw strokes over them, undo and redo, pan and zoom — then export the
//! annotated pages as a new PDF.
//!
//! ## Why this crate?
//!
//! Signing or marking up a PDF rarely needs a full editor. This crate keeps
//! the original document untouched and works on a raster + overlay model:
//! each page is rasterised via pdfium, ink strokes live on a separate
//! scene-graph surface in page-local coordinates, and export composites the
//! two into a fresh image-per-page PDF. No content streams are rewritten,
//! so even malformed-but-renderable documents export cleanly.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    resolve local file, raw bytes, or download from URL
//!  ├─ 2. Render   rasterise the current page via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Annotate strokes, undo/redo history, pan/zoom — all on the session
//!  ├─ 4. Export   rasterise every page at export scale, composite ink (concurrent)
//!  ├─ 5. Encode   JPEG per page
//!  └─ 6. Assemble one full-bleed A4 image page per input page, via lopdf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfink::{Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::default();
//!     let mut session = Session::open("document.pdf", config).await?;
//!     session.render_current().await?;
//!
//!     // Draw a short diagonal stroke on page 1 (device pixels).
//!     session.pointer_down(40.0, 40.0);
//!     session.pointer_move(120.0, 140.0);
//!     session.pointer_up();
//!
//!     let stats = session.export("annotated.pdf").await?;
//!     eprintln!("exported {} pages, {} bytes", stats.pages, stats.bytes_written);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfink` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdfink = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod history;
pub mod ink;
pub mod pipeline;
pub mod progress;
pub mod script;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExportPageSize, SessionConfig, SessionConfigBuilder};
pub use document::{DocumentInfo, LoadedDocument};
pub use error::PdfInkError;
pub use export::ExportStats;
pub use history::{HistoryLog, PageHistories};
pub use ink::{Brush, Color, InkSurface, PagePoint, SceneSnapshot, Stroke};
pub use pipeline::render::{PageSizePt, Viewport};
pub use progress::{ExportProgressCallback, NoopProgressCallback, ProgressCallback};
pub use script::{replay, ScriptCommand};
pub use session::{inspect, PageView, PointerMode, Session};
