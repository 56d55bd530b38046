//! Annotation scripts: a replayable command list standing in for UI events.
//!
//! The session API is pointer- and button-shaped; a headless run needs a
//! way to express "go to page 2, draw this squiggle, undo once" without a
//! screen. A script is a JSON array of tagged commands that [`replay`]
//! feeds through the session exactly as interactive input would — strokes
//! go through the pointer path, so mode, brush, and history behave
//! identically to a live drag.
//!
//! ```json
//! [
//!   { "op": "pen_color", "color": "#d32f2f" },
//!   { "op": "stroke", "points": [[120, 640], [180, 660], [240, 640]] },
//!   { "op": "go_to", "page": 2 },
//!   { "op": "stroke", "width": 6.0, "points": [[100, 100], [300, 300]] },
//!   { "op": "undo" }
//! ]
//! ```
//!
//! Stroke points are in page points (1/72 inch), not device pixels, so a
//! script means the same thing at every zoom level.

use crate::error::PdfInkError;
use crate::ink::Color;
use crate::session::{PointerMode, Session};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// One scripted user action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptCommand {
    /// Navigate to a 1-based page. Out-of-bounds is a warning, not an error.
    GoTo { page: usize },
    NextPage,
    PrevPage,
    /// Draw a freehand stroke through the given page-point positions.
    /// Color/width override the current pen for this stroke only.
    Stroke {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<f32>,
        points: Vec<[f32; 2]>,
    },
    Undo,
    Redo,
    ZoomIn,
    ZoomOut,
    ToggleMode,
    /// Set the pen color (`#RRGGBB` or `#RRGGBBAA`) for subsequent strokes.
    PenColor { color: String },
    /// Set the pen width in page points for subsequent strokes.
    PenWidth { width: f32 },
    /// A pan drag by the given device-pixel delta.
    Pan { dx: f32, dy: f32 },
}

/// What a replay did, for the CLI summary line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplaySummary {
    pub commands: usize,
    pub strokes: usize,
}

/// Load a script from a JSON file.
pub fn load_script(path: &Path) -> Result<Vec<ScriptCommand>, PdfInkError> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PdfInkError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => PdfInkError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => PdfInkError::Internal(format!("Failed to read script: {e}")),
    })?;
    parse_script(&text)
}

/// Parse a script from JSON text.
pub fn parse_script(text: &str) -> Result<Vec<ScriptCommand>, PdfInkError> {
    serde_json::from_str(text).map_err(|e| PdfInkError::InvalidInput {
        input: format!("annotation script: {e}"),
    })
}

/// Replay commands against a session, re-rendering after every command
/// that invalidates the view.
pub async fn replay(
    session: &mut Session,
    commands: &[ScriptCommand],
) -> Result<ReplaySummary, PdfInkError> {
    let mut summary = ReplaySummary::default();
    // Strokes need a sized surface; make sure page 1 is in.
    session.render_current().await?;

    for command in commands {
        summary.commands += 1;
        debug!("Script: {:?}", command);
        match command {
            ScriptCommand::GoTo { page } => {
                if session.go_to(*page) {
                    session.render_current().await?;
                } else {
                    warn!("Script go_to {} out of bounds, skipping", page);
                }
            }
            ScriptCommand::NextPage => {
                if session.next_page() {
                    session.render_current().await?;
                }
            }
            ScriptCommand::PrevPage => {
                if session.prev_page() {
                    session.render_current().await?;
                }
            }
            ScriptCommand::Stroke {
                color,
                width,
                points,
            } => {
                apply_stroke(session, color.as_deref(), *width, points)?;
                summary.strokes += 1;
            }
            ScriptCommand::Undo => {
                session.undo();
            }
            ScriptCommand::Redo => {
                session.redo();
            }
            ScriptCommand::ZoomIn => {
                session.zoom_in();
                session.render_current().await?;
            }
            ScriptCommand::ZoomOut => {
                session.zoom_out();
                session.render_current().await?;
            }
            ScriptCommand::ToggleMode => {
                session.toggle_mode();
            }
            ScriptCommand::PenColor { color } => {
                session.set_pen_color(parse_color(color)?);
            }
            ScriptCommand::PenWidth { width } => {
                session.set_pen_width(*width);
            }
            ScriptCommand::Pan { dx, dy } => {
                // A drag from the origin by the requested delta; only pans
                // while the session is in pan mode, like a real drag.
                session.pointer_down(0.0, 0.0);
                session.pointer_move(*dx, *dy);
                session.pointer_up();
            }
        }
    }

    Ok(summary)
}

/// Feed one stroke through the pointer path in draw mode.
fn apply_stroke(
    session: &mut Session,
    color: Option<&str>,
    width: Option<f32>,
    points: &[[f32; 2]],
) -> Result<(), PdfInkError> {
    if points.is_empty() {
        return Ok(());
    }

    let saved_brush = session.surface().brush();
    if let Some(hex) = color {
        session.set_pen_color(parse_color(hex)?);
    }
    if let Some(w) = width {
        session.set_pen_width(w);
    }
    // Strokes only land in draw mode; switch over for the stroke if needed.
    let was_pan = session.mode() == PointerMode::Pan;
    if was_pan {
        session.toggle_mode();
    }

    let scale = session.surface().scale();
    session.pointer_down(points[0][0] * scale, points[0][1] * scale);
    for point in &points[1..] {
        session.pointer_move(point[0] * scale, point[1] * scale);
    }
    session.pointer_up();

    if was_pan {
        session.toggle_mode();
    }
    session.set_pen_color(saved_brush.color);
    session.set_pen_width(saved_brush.width);
    Ok(())
}

fn parse_color(hex: &str) -> Result<Color, PdfInkError> {
    Color::from_hex(hex).ok_or_else(|| PdfInkError::InvalidInput {
        input: format!("pen color '{hex}' (expected #RRGGBB or #RRGGBBAA)"),
    })
}
