//! The annotation session: one open document and everything the user does
//! to it.
//!
//! All mutable state lives here — current page, zoom, pointer mode, the
//! ink surface, per-page undo histories, pan offsets — owned by one
//! [`Session`] value rather than scattered module globals. Methods take
//! `&mut self`, so operations cannot interleave mid-flight.
//!
//! ## Render staleness
//!
//! Rendering is asynchronous; navigation and zoom are not. A completion
//! that arrives after the user has already moved on must not restore the
//! old page's ink onto the new page's raster. Every state change that
//! invalidates the view bumps a generation counter, and a finished render
//! is applied only if its ticket still matches — otherwise it is discarded
//! and [`Session::render_current`] returns `Ok(None)`.

use crate::config::SessionConfig;
use crate::document::{DocumentInfo, LoadedDocument};
use crate::error::PdfInkError;
use crate::export::{self, ExportStats};
use crate::history::PageHistories;
use crate::ink::{Brush, Color, InkSurface, SceneSnapshot};
use crate::pipeline::render::Viewport;
use crate::pipeline::{compose, input, render};
use image::RgbaImage;
use std::path::Path;
use tracing::{debug, info};

/// Pointer gesture routing: drag to move the viewport, or drag to draw.
///
/// The two are mutually exclusive by construction — a single mode field
/// routes every pointer event to exactly one consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerMode {
    /// Drags scroll the viewport.
    Pan,
    /// Drags leave ink on the surface.
    Draw,
}

/// A successfully applied render: the page raster plus what it describes.
#[derive(Debug, Clone)]
pub struct PageView {
    /// 1-based page number this raster shows.
    pub page: usize,
    pub viewport: Viewport,
    pub raster: RgbaImage,
}

/// One open document plus all annotation state.
#[derive(Debug)]
pub struct Session {
    document: LoadedDocument,
    config: SessionConfig,
    current_page: usize,
    zoom: f32,
    mode: PointerMode,
    surface: InkSurface,
    histories: PageHistories,
    scroll: (f32, f32),
    drag: Option<(f32, f32)>,
    generation: u64,
}

impl Session {
    /// Open a document from a local path or HTTP(S) URL.
    pub async fn open(input_str: &str, config: SessionConfig) -> Result<Self, PdfInkError> {
        let source = input::resolve_input(input_str, config.download_timeout_secs).await?;
        let info = render::document_info(source.path(), config.password.as_deref()).await?;
        info!("Opened '{}': {} pages", input_str, info.page_count);
        Ok(Self::new(LoadedDocument::new(source, info), config))
    }

    /// Open a document from an in-memory byte buffer (e.g. a file-picker
    /// result).
    pub async fn open_bytes(bytes: &[u8], config: SessionConfig) -> Result<Self, PdfInkError> {
        let source = input::resolve_bytes(bytes)?;
        let info = render::document_info(source.path(), config.password.as_deref()).await?;
        info!("Opened {}-byte buffer: {} pages", bytes.len(), info.page_count);
        Ok(Self::new(LoadedDocument::new(source, info), config))
    }

    /// Build a session around an already-loaded document.
    ///
    /// Starts on page 1, zoom 1.0, draw mode. The surface is pre-sized to
    /// page 1's viewport at the base scale so strokes drawn before the
    /// first render still land in the right page coordinates.
    pub fn new(document: LoadedDocument, config: SessionConfig) -> Self {
        let mut surface = InkSurface::new(Brush {
            color: config.pen_color,
            width: config.pen_width,
        });
        let viewport = Viewport::of_page(
            document.page_size(1),
            config.base_scale,
            config.max_rendered_pixels,
        );
        surface.resize(viewport, config.base_scale);

        Self {
            document,
            config,
            current_page: 1,
            zoom: 1.0,
            mode: PointerMode::Draw,
            surface,
            histories: PageHistories::new(),
            scroll: (0.0, 0.0),
            drag: None,
            generation: 0,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn document(&self) -> &LoadedDocument {
        &self.document
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current 1-based page number. Always within `[1, page_count]`.
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// The scale the current page renders at: `base_scale × zoom`.
    pub fn effective_scale(&self) -> f32 {
        self.config.base_scale * self.zoom
    }

    pub fn mode(&self) -> PointerMode {
        self.mode
    }

    pub fn surface(&self) -> &InkSurface {
        &self.surface
    }

    /// Cumulative pan offset in device pixels.
    pub fn scroll_offset(&self) -> (f32, f32) {
        self.scroll
    }

    // ── Rendering ────────────────────────────────────────────────────────

    /// Render the current page at the effective scale and restore its
    /// saved ink.
    ///
    /// Returns `Ok(None)` when the completed render turned out stale —
    /// navigation or zoom changed the target while the rasterisation was
    /// in flight. Callers simply issue a new render for the new state.
    pub async fn render_current(&mut self) -> Result<Option<PageView>, PdfInkError> {
        let ticket = self.generation;
        let page = self.current_page;
        let raster = render::render_page(
            self.document.path(),
            self.config.password.as_deref(),
            page - 1,
            self.effective_scale(),
            self.config.max_rendered_pixels,
        )
        .await?;
        Ok(self.apply_render(ticket, page, raster))
    }

    /// Apply a finished render if it still matches the session state.
    ///
    /// This is the staleness gate: a raster tagged with an outdated ticket
    /// (or page) is dropped without touching the surface.
    fn apply_render(&mut self, ticket: u64, page: usize, raster: RgbaImage) -> Option<PageView> {
        if ticket != self.generation || page != self.current_page {
            debug!(
                "Discarding stale render of page {} (ticket {}, session at {})",
                page, ticket, self.generation
            );
            return None;
        }

        let viewport = Viewport::of_image(&raster);
        // The raster may have been capped below the requested scale; the
        // surface must use the scale that actually materialised.
        let page_size = self.document.page_size(page);
        let actual_scale = viewport.width as f32 / page_size.width_pt.max(1.0);
        self.surface.resize(viewport, actual_scale);

        let log = self.histories.log_mut(page);
        if log.is_empty() {
            // Seed a blank baseline so the page's first stroke is undoable.
            log.save(SceneSnapshot::empty());
        }
        if let Some(snapshot) = log.current().cloned() {
            self.surface.restore(&snapshot);
        }

        Some(PageView {
            page,
            viewport,
            raster,
        })
    }

    /// Composite the live ink (including any in-progress stroke) over a
    /// rendered view — what a screen would show right now.
    pub fn compose_view(&self, view: &PageView) -> RgbaImage {
        let mut composited = view.raster.clone();
        compose::overlay_onto(&mut composited, &self.surface.rasterize());
        composited
    }

    // ── Navigation ───────────────────────────────────────────────────────

    /// Switch to `page`. Out-of-bounds targets (and the current page) are
    /// a no-op returning `false`.
    ///
    /// The outgoing page's ink is saved into its history *before* the
    /// surface is cleared — in the other order the strokes drawn since the
    /// last save would be gone.
    pub fn go_to(&mut self, page: usize) -> bool {
        if page < 1 || page > self.page_count() || page == self.current_page {
            return false;
        }

        let snapshot = self.surface.snapshot();
        self.histories.log_mut(self.current_page).save(snapshot);
        self.surface.clear();
        self.current_page = page;
        self.generation = self.generation.wrapping_add(1);
        debug!("Navigated to page {}/{}", page, self.page_count());
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to(self.current_page + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        if self.current_page <= 1 {
            return false;
        }
        self.go_to(self.current_page - 1)
    }

    // ── Undo / redo ──────────────────────────────────────────────────────

    /// Step the current page's history back. Returns `false` at the first
    /// state (or with no history).
    pub fn undo(&mut self) -> bool {
        let log = self.histories.log_mut(self.current_page);
        let Some(snapshot) = log.undo().cloned() else {
            return false;
        };
        self.surface.restore(&snapshot);
        true
    }

    /// Step the current page's history forward. Returns `false` at the
    /// last state.
    pub fn redo(&mut self) -> bool {
        let log = self.histories.log_mut(self.current_page);
        let Some(snapshot) = log.redo().cloned() else {
            return false;
        };
        self.surface.restore(&snapshot);
        true
    }

    // ── Mode & pen ───────────────────────────────────────────────────────

    /// Flip between pan and draw mode, mirroring the flag onto the
    /// surface's input capture.
    pub fn toggle_mode(&mut self) -> PointerMode {
        self.mode = match self.mode {
            PointerMode::Draw => PointerMode::Pan,
            PointerMode::Pan => PointerMode::Draw,
        };
        self.surface
            .set_input_capture(self.mode == PointerMode::Draw);
        self.drag = None;
        debug!("Pointer mode: {:?}", self.mode);
        self.mode
    }

    /// Propagates immediately to the brush; the next stroke uses it.
    pub fn set_pen_color(&mut self, color: Color) {
        self.surface.set_brush_color(color);
    }

    /// Pen width in page points; propagates immediately to the brush.
    pub fn set_pen_width(&mut self, width: f32) {
        self.surface.set_brush_width(width);
    }

    // ── Pointer input (device pixels) ────────────────────────────────────

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        match self.mode {
            PointerMode::Draw => {
                self.surface.begin_stroke(x, y);
            }
            PointerMode::Pan => {
                self.drag = Some((x, y));
            }
        }
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        match self.mode {
            PointerMode::Draw => {
                self.surface.extend_stroke(x, y);
            }
            PointerMode::Pan => {
                if let Some((last_x, last_y)) = self.drag {
                    // Dragging right moves the content right, i.e. the
                    // scroll position left — hence the inversion.
                    self.scroll.0 -= x - last_x;
                    self.scroll.1 -= y - last_y;
                    self.drag = Some((x, y));
                }
            }
        }
    }

    pub fn pointer_up(&mut self) {
        match self.mode {
            PointerMode::Draw => {
                if self.surface.finish_stroke() {
                    let snapshot = self.surface.snapshot();
                    self.histories.log_mut(self.current_page).save(snapshot);
                }
            }
            PointerMode::Pan => {
                self.drag = None;
            }
        }
    }

    // ── Zoom ─────────────────────────────────────────────────────────────

    /// Zoom in by one multiplicative step. Returns the new zoom factor.
    pub fn zoom_in(&mut self) -> f32 {
        self.apply_zoom(self.zoom * self.config.zoom_step)
    }

    /// Zoom out by one multiplicative step. Returns the new zoom factor.
    pub fn zoom_out(&mut self) -> f32 {
        self.apply_zoom(self.zoom / self.config.zoom_step)
    }

    fn apply_zoom(&mut self, target: f32) -> f32 {
        let clamped = target.clamp(self.config.min_zoom, self.config.max_zoom);
        if clamped != target {
            debug!("Zoom clamped to {}", clamped);
        }
        self.zoom = clamped;
        self.generation = self.generation.wrapping_add(1);
        self.zoom
    }

    // ── Export ───────────────────────────────────────────────────────────

    /// Export every page with its ink composited, at the configured export
    /// scale, to `output_path`.
    pub async fn export(&self, output_path: impl AsRef<Path>) -> Result<ExportStats, PdfInkError> {
        let overlays = self.page_overlays();
        export::export_document(&self.document, &overlays, &self.config, output_path.as_ref())
            .await
    }

    /// The snapshot in effect for each page. The current page uses the
    /// live surface, so strokes drawn since the last save still export.
    fn page_overlays(&self) -> Vec<Option<SceneSnapshot>> {
        (1..=self.page_count())
            .map(|page| {
                if page == self.current_page {
                    let snapshot = self.surface.snapshot();
                    (!snapshot.is_empty()).then_some(snapshot)
                } else {
                    self.histories
                        .current(page)
                        .filter(|s| !s.is_empty())
                        .cloned()
                }
            })
            .collect()
    }
}

/// Inspect a document's metadata without creating a session.
pub async fn inspect(input_str: &str) -> Result<DocumentInfo, PdfInkError> {
    let source = input::resolve_input(input_str, 120).await?;
    render::document_info(source.path(), None).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::ResolvedInput;
    use crate::pipeline::render::PageSizePt;
    use image::Rgba;
    use std::path::PathBuf;

    const LETTER: PageSizePt = PageSizePt {
        width_pt: 612.0,
        height_pt: 792.0,
    };

    fn test_document(pages: usize) -> LoadedDocument {
        LoadedDocument::new(
            ResolvedInput::Local(PathBuf::from("fixture.pdf")),
            DocumentInfo {
                page_count: pages,
                page_sizes: vec![LETTER; pages],
                title: None,
                author: None,
                pdf_version: "Pdf1_7".into(),
            },
        )
    }

    fn test_session(pages: usize) -> Session {
        Session::new(test_document(pages), SessionConfig::default())
    }

    /// Stand-in for a completed pdfium render of the current page.
    fn fake_raster(session: &Session) -> RgbaImage {
        let viewport = Viewport::of_page(
            session.document.page_size(session.current_page()),
            session.effective_scale(),
            session.config.max_rendered_pixels,
        );
        RgbaImage::from_pixel(viewport.width, viewport.height, Rgba([255, 255, 255, 255]))
    }

    /// Run the apply half of a render synchronously, as the completion of
    /// an up-to-date rasterisation would.
    fn render_now(session: &mut Session) -> Option<PageView> {
        let ticket = session.generation;
        let page = session.current_page();
        let raster = fake_raster(session);
        session.apply_render(ticket, page, raster)
    }

    fn draw_stroke(session: &mut Session, x: f32, y: f32) {
        session.pointer_down(x, y);
        session.pointer_move(x + 30.0, y + 10.0);
        session.pointer_up();
    }

    // ── Navigation ───────────────────────────────────────────────────────

    #[test]
    fn navigation_clamps_at_bounds() {
        let mut session = test_session(3);
        assert!(!session.go_to(0));
        assert!(!session.go_to(4));
        assert!(!session.prev_page());
        assert_eq!(session.current_page(), 1);

        assert!(session.next_page());
        assert!(session.next_page());
        assert!(!session.next_page());
        assert_eq!(session.current_page(), 3);
    }

    #[test]
    fn go_to_current_page_is_noop() {
        let mut session = test_session(3);
        assert!(!session.go_to(1));
    }

    #[test]
    fn navigation_saves_before_clearing() {
        let mut session = test_session(3);
        render_now(&mut session);
        draw_stroke(&mut session, 50.0, 50.0);
        assert_eq!(session.surface().stroke_count(), 1);

        assert!(session.go_to(2));
        // Arriving surface is blank until the new page's render lands.
        assert_eq!(session.surface().stroke_count(), 0);
        render_now(&mut session);
        assert_eq!(session.surface().stroke_count(), 0);

        // Page 1's ink was captured before the clear and comes back intact.
        assert!(session.go_to(1));
        render_now(&mut session);
        assert_eq!(session.surface().stroke_count(), 1);
    }

    // ── Render staleness ─────────────────────────────────────────────────

    #[test]
    fn stale_render_is_discarded() {
        let mut session = test_session(3);
        let ticket = session.generation;
        let page = session.current_page();
        let raster = fake_raster(&session);

        // The user navigates while the rasterisation is in flight.
        session.go_to(2);
        assert!(session.apply_render(ticket, page, raster).is_none());
        assert_eq!(session.current_page(), 2);
    }

    #[test]
    fn zoom_invalidates_inflight_render() {
        let mut session = test_session(1);
        let ticket = session.generation;
        let raster = fake_raster(&session);

        session.zoom_in();
        assert!(session.apply_render(ticket, 1, raster).is_none());
    }

    #[test]
    fn fresh_render_applies_and_restores() {
        let mut session = test_session(2);
        let view = render_now(&mut session).expect("current render applies");
        assert_eq!(view.page, 1);
        assert_eq!(view.viewport.width, 918);
        assert_eq!(view.viewport.height, 1188);
    }

    // ── Undo / redo ──────────────────────────────────────────────────────

    #[test]
    fn stroke_undo_redo_round_trip() {
        let mut session = test_session(1);
        render_now(&mut session);
        draw_stroke(&mut session, 10.0, 10.0);
        draw_stroke(&mut session, 60.0, 60.0);
        assert_eq!(session.surface().stroke_count(), 2);

        assert!(session.undo());
        assert_eq!(session.surface().stroke_count(), 1);
        assert!(session.undo());
        assert_eq!(session.surface().stroke_count(), 0);
        // Back at the blank baseline: no further undo.
        assert!(!session.undo());

        assert!(session.redo());
        assert_eq!(session.surface().stroke_count(), 1);
        assert!(session.redo());
        assert_eq!(session.surface().stroke_count(), 2);
        assert!(!session.redo());
    }

    #[test]
    fn undo_redo_on_fresh_page_are_noops() {
        let mut session = test_session(1);
        assert!(!session.undo());
        assert!(!session.redo());
        assert_eq!(session.surface().stroke_count(), 0);
    }

    #[test]
    fn draw_after_undo_prunes_redo() {
        let mut session = test_session(1);
        render_now(&mut session);
        draw_stroke(&mut session, 10.0, 10.0);
        draw_stroke(&mut session, 60.0, 60.0);
        session.undo();
        draw_stroke(&mut session, 110.0, 110.0);

        assert!(!session.redo());
        assert_eq!(session.surface().stroke_count(), 2);
    }

    #[test]
    fn undo_is_per_page() {
        let mut session = test_session(2);
        render_now(&mut session);
        draw_stroke(&mut session, 10.0, 10.0);

        session.go_to(2);
        render_now(&mut session);
        // Page 2 has no strokes to undo; page 1's history is not reachable
        // from here.
        assert!(!session.undo());
    }

    // ── Mode, pan, pen ───────────────────────────────────────────────────

    #[test]
    fn toggle_mode_mirrors_input_capture() {
        let mut session = test_session(1);
        assert_eq!(session.mode(), PointerMode::Draw);
        assert!(session.surface().input_capture());

        assert_eq!(session.toggle_mode(), PointerMode::Pan);
        assert!(!session.surface().input_capture());
        assert_eq!(session.toggle_mode(), PointerMode::Draw);
        assert!(session.surface().input_capture());
    }

    #[test]
    fn pan_drag_moves_scroll_inversely() {
        let mut session = test_session(1);
        session.toggle_mode();

        session.pointer_down(100.0, 100.0);
        session.pointer_move(130.0, 80.0);
        session.pointer_up();

        assert_eq!(session.scroll_offset(), (-30.0, 20.0));
        // No ink was left behind.
        assert_eq!(session.surface().stroke_count(), 0);
    }

    #[test]
    fn pan_deltas_accumulate_across_moves() {
        let mut session = test_session(1);
        session.toggle_mode();
        session.pointer_down(0.0, 0.0);
        session.pointer_move(10.0, 0.0);
        session.pointer_move(25.0, 5.0);
        session.pointer_up();
        assert_eq!(session.scroll_offset(), (-25.0, -5.0));
    }

    #[test]
    fn drag_in_draw_mode_leaves_scroll_untouched() {
        let mut session = test_session(1);
        render_now(&mut session);
        draw_stroke(&mut session, 10.0, 10.0);
        assert_eq!(session.scroll_offset(), (0.0, 0.0));
        assert_eq!(session.surface().stroke_count(), 1);
    }

    #[test]
    fn pen_settings_propagate_to_brush() {
        let mut session = test_session(1);
        session.set_pen_color(Color::RED);
        session.set_pen_width(7.0);
        assert_eq!(session.surface().brush().color, Color::RED);
        assert_eq!(session.surface().brush().width, 7.0);
    }

    // ── Zoom ─────────────────────────────────────────────────────────────

    #[test]
    fn zoom_round_trip_is_symmetric() {
        let mut session = test_session(1);
        for _ in 0..5 {
            session.zoom_in();
        }
        for _ in 0..5 {
            session.zoom_out();
        }
        assert!((session.zoom() - 1.0).abs() < 1e-4, "zoom {}", session.zoom());
    }

    #[test]
    fn zoom_clamps_at_bounds() {
        let mut session = test_session(1);
        for _ in 0..100 {
            session.zoom_in();
        }
        assert_eq!(session.zoom(), 10.0);

        for _ in 0..200 {
            session.zoom_out();
        }
        assert_eq!(session.zoom(), 0.1);
    }

    #[test]
    fn effective_scale_combines_base_and_zoom() {
        let mut session = test_session(1);
        assert!((session.effective_scale() - 1.5).abs() < 1e-6);
        session.zoom_in();
        assert!((session.effective_scale() - 1.65).abs() < 1e-3);
    }

    // ── Export overlays ──────────────────────────────────────────────────

    #[test]
    fn overlays_include_unsaved_current_page_ink() {
        let mut session = test_session(2);
        render_now(&mut session);
        draw_stroke(&mut session, 10.0, 10.0);

        let overlays = session.page_overlays();
        assert_eq!(overlays.len(), 2);
        assert!(overlays[0].is_some());
        assert!(overlays[1].is_none());
    }

    #[test]
    fn overlays_use_saved_history_for_other_pages() {
        let mut session = test_session(2);
        render_now(&mut session);
        draw_stroke(&mut session, 10.0, 10.0);
        session.go_to(2);
        render_now(&mut session);

        let overlays = session.page_overlays();
        assert_eq!(overlays[0].as_ref().map(|s| s.stroke_count()), Some(1));
        assert!(overlays[1].is_none());
    }
}
