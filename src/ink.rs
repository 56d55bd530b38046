//! The ink surface: a scene graph of freehand strokes drawn over a page.
//!
//! ## Why page-local coordinates?
//!
//! Strokes are stored in page points (1/72 inch), not device pixels. A
//! snapshot taken at 150% zoom therefore restores pixel-perfectly at 80%
//! zoom, and export can rasterise the same strokes at a completely
//! different scale without any coordinate fixup. Pointer input arrives in
//! device pixels and is divided by the current scale at capture time.
//!
//! ## Snapshots
//!
//! [`SceneSnapshot`] is an immutable, serde-serialisable capture of every
//! finished stroke on the surface — the unit the undo/redo history stores.
//! An in-progress stroke is never part of a snapshot; it joins the scene
//! only when the pointer lifts.

use crate::pipeline::render::Viewport;
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

// ── Color ────────────────────────────────────────────────────────────────

/// RGBA pen color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };

    /// Create an opaque color.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
    ///
    /// This is the format color-picker inputs produce, so it is also the
    /// format the CLI and annotation scripts accept.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: 255,
            }),
            8 => Some(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            _ => None,
        }
    }

    fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }
}

// ── Scene graph ──────────────────────────────────────────────────────────

/// A point in page-local coordinates (points, 1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PagePoint {
    pub x: f32,
    pub y: f32,
}

impl PagePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One freehand stroke: a polyline with a color and width.
///
/// Width is in page points, like the geometry, so a stroke keeps its
/// apparent thickness relative to the page at every zoom level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Color,
    pub width: f32,
    pub points: Vec<PagePoint>,
}

/// Pen settings applied to the next stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    pub color: Color,
    pub width: f32,
}

/// Immutable capture of the surface's finished strokes.
///
/// Round-trips through JSON; equality is structural, which is what the
/// history's duplicate-save suppression relies on.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneSnapshot {
    strokes: Vec<Stroke>,
}

impl SceneSnapshot {
    /// A snapshot of a blank surface.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }
}

// ── Surface ──────────────────────────────────────────────────────────────

/// The drawing surface overlaid on the rendered page.
///
/// Holds finished strokes plus at most one in-progress stroke. Input
/// capture can be switched off (pan mode); while off, pointer calls are
/// ignored so a pan drag can never leave ink behind.
#[derive(Debug, Clone)]
pub struct InkSurface {
    viewport: Viewport,
    /// Device pixels per page point for the current view.
    scale: f32,
    brush: Brush,
    capture: bool,
    strokes: Vec<Stroke>,
    active: Option<Stroke>,
}

impl InkSurface {
    pub fn new(brush: Brush) -> Self {
        Self {
            viewport: Viewport {
                width: 1,
                height: 1,
            },
            scale: 1.0,
            brush,
            capture: true,
            strokes: Vec::new(),
            active: None,
        }
    }

    // ── Geometry ─────────────────────────────────────────────────────────

    /// Size the surface to a page viewport rendered at `scale`.
    ///
    /// Strokes are untouched: they live in page space and simply rasterise
    /// differently at the new scale.
    pub fn resize(&mut self, viewport: Viewport, scale: f32) {
        self.viewport = viewport;
        self.scale = if scale > 0.0 { scale } else { 1.0 };
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    // ── Brush & capture ──────────────────────────────────────────────────

    pub fn brush(&self) -> Brush {
        self.brush
    }

    pub fn set_brush_color(&mut self, color: Color) {
        self.brush.color = color;
    }

    pub fn set_brush_width(&mut self, width: f32) {
        self.brush.width = width.max(0.1);
    }

    pub fn set_input_capture(&mut self, capture: bool) {
        self.capture = capture;
        if !capture {
            // A mode switch mid-stroke abandons the stroke rather than
            // committing half a gesture.
            self.active = None;
        }
    }

    pub fn input_capture(&self) -> bool {
        self.capture
    }

    // ── Pointer input (device pixels) ────────────────────────────────────

    /// Start a stroke at a device-pixel position. Returns whether the
    /// event was consumed (false while input capture is off).
    pub fn begin_stroke(&mut self, x_px: f32, y_px: f32) -> bool {
        if !self.capture {
            return false;
        }
        self.active = Some(Stroke {
            color: self.brush.color,
            width: self.brush.width,
            points: vec![self.to_page(x_px, y_px)],
        });
        true
    }

    pub fn extend_stroke(&mut self, x_px: f32, y_px: f32) -> bool {
        let point = self.to_page(x_px, y_px);
        match self.active.as_mut() {
            Some(stroke) => {
                stroke.points.push(point);
                true
            }
            None => false,
        }
    }

    /// Commit the in-progress stroke to the scene. Returns whether a
    /// stroke was actually committed.
    pub fn finish_stroke(&mut self) -> bool {
        match self.active.take() {
            Some(stroke) => {
                self.strokes.push(stroke);
                true
            }
            None => false,
        }
    }

    fn to_page(&self, x_px: f32, y_px: f32) -> PagePoint {
        PagePoint::new(x_px / self.scale, y_px / self.scale)
    }

    // ── Scene operations ─────────────────────────────────────────────────

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    /// Remove every stroke, including any in-progress one.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.active = None;
    }

    /// Capture the finished strokes as an immutable snapshot.
    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            strokes: self.strokes.clone(),
        }
    }

    /// Replace the scene with a previously captured snapshot.
    pub fn restore(&mut self, snapshot: &SceneSnapshot) {
        self.strokes = snapshot.strokes.clone();
        self.active = None;
    }

    /// Rasterise the scene (finished + in-progress strokes) onto a
    /// transparent RGBA overlay matching the current viewport.
    pub fn rasterize(&self) -> RgbaImage {
        let mut overlay = blank_overlay(self.viewport);
        for stroke in self.strokes.iter().chain(self.active.iter()) {
            draw_stroke(&mut overlay, stroke, self.scale);
        }
        overlay
    }
}

// ── Rasterisation ────────────────────────────────────────────────────────

/// Rasterise a snapshot at an arbitrary scale — used by the exporter, which
/// renders at the export scale rather than whatever the live view uses.
pub fn rasterize_snapshot(snapshot: &SceneSnapshot, scale: f32, viewport: Viewport) -> RgbaImage {
    let mut overlay = blank_overlay(viewport);
    for stroke in &snapshot.strokes {
        draw_stroke(&mut overlay, stroke, scale);
    }
    overlay
}

fn blank_overlay(viewport: Viewport) -> RgbaImage {
    RgbaImage::from_pixel(
        viewport.width.max(1),
        viewport.height.max(1),
        Rgba([0, 0, 0, 0]),
    )
}

/// Stamp a stroke as overlapping round dabs along each segment.
///
/// Dab spacing is a quarter of the radius, close enough that the envelope
/// reads as one continuous line at every width this tool produces.
fn draw_stroke(img: &mut RgbaImage, stroke: &Stroke, scale: f32) {
    let radius = (stroke.width * scale / 2.0).max(0.5);
    let color = stroke.color.to_rgba();

    let points = &stroke.points;
    if points.is_empty() {
        return;
    }
    if points.len() == 1 {
        stamp_dab(img, points[0].x * scale, points[0].y * scale, radius, color);
        return;
    }

    for pair in points.windows(2) {
        let (ax, ay) = (pair[0].x * scale, pair[0].y * scale);
        let (bx, by) = (pair[1].x * scale, pair[1].y * scale);
        let dist = ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt();
        let steps = (dist / (radius * 0.25)).ceil().max(1.0) as u32;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            stamp_dab(img, ax + (bx - ax) * t, ay + (by - ay) * t, radius, color);
        }
    }
}

fn stamp_dab(img: &mut RgbaImage, cx: f32, cy: f32, radius: f32, color: Rgba<u8>) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let x0 = (cx - radius).floor() as i64;
    let x1 = (cx + radius).ceil() as i64;
    let y0 = (cy - radius).floor() as i64;
    let y1 = (cy + radius).ceil() as i64;

    for y in y0.max(0)..=y1.min(h - 1) {
        for x in x0.max(0)..=x1.min(w - 1) {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if dx * dx + dy * dy <= radius * radius {
                blend_over(img.get_pixel_mut(x as u32, y as u32), color);
            }
        }
    }
}

/// Source-over alpha blend of `src` onto `dst`.
fn blend_over(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let sa = src[3] as u32;
    if sa == 255 {
        *dst = src;
        return;
    }
    let da = dst[3] as u32;
    let out_a = sa + da * (255 - sa) / 255;
    if out_a == 0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    for c in 0..3 {
        let sc = src[c] as u32;
        let dc = dst[c] as u32;
        dst[c] = ((sc * sa + dc * da * (255 - sa) / 255) / out_a) as u8;
    }
    dst[3] = out_a as u8;
}
