//! Rendering: draws the full canvas scene through a [`Painter`].
//!
//! [`Painter`] is the narrow slice of the Canvas 2D API the engine needs. The
//! browser implementation ([`CanvasPainter`]) wraps a
//! [`web_sys::CanvasRenderingContext2d`]; tests use a recording painter. This
//! module receives read-only views of camera and registry state and produces
//! pixels; it never mutates engine state.
//!
//! Fallible Canvas 2D calls propagate as [`CanvasError`]. The frame loop
//! logs a failed frame and keeps going.

#[cfg(test)]
#[path = "render_test.rs"]
pub(crate) mod render_test;

use web_sys::CanvasRenderingContext2d;

use crate::camera::{Bounds, Camera, Size};
use crate::config::EngineConfig;
use crate::consts::{
    DEBUG_OVERLAY_FONT, DEBUG_OVERLAY_HEIGHT, DEBUG_OVERLAY_WIDTH, DEBUG_OVERLAY_X, DEBUG_OVERLAY_Y, MAX_GRID_LINES,
    SELECTION_DASH_PX, SELECTION_MARGIN,
};
use crate::error::CanvasError;
use crate::registry::ElementRegistry;

/// Drawing operations used by the scene renderer and element painters.
pub trait Painter {
    fn save(&mut self);
    fn restore(&mut self);
    /// Replace the current transform with the matrix `[a c e; b d f]`.
    fn set_transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Result<(), CanvasError>;
    fn translate(&mut self, x: f64, y: f64) -> Result<(), CanvasError>;
    fn scale(&mut self, x: f64, y: f64) -> Result<(), CanvasError>;
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn set_fill_style(&mut self, color: &str);
    fn set_stroke_style(&mut self, color: &str);
    fn set_line_width(&mut self, width: f64);
    /// Dash pattern for subsequent strokes; an empty slice draws solid lines.
    fn set_line_dash(&mut self, segments: &[f64]) -> Result<(), CanvasError>;
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn begin_path(&mut self);
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn stroke(&mut self);
    fn set_font(&mut self, font: &str);
    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<(), CanvasError>;
}

/// [`Painter`] backed by a browser 2D context.
pub struct CanvasPainter {
    ctx: CanvasRenderingContext2d,
}

impl CanvasPainter {
    #[must_use]
    pub fn new(ctx: CanvasRenderingContext2d) -> Self {
        Self { ctx }
    }
}

impl Painter for CanvasPainter {
    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn set_transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Result<(), CanvasError> {
        self.ctx.set_transform(a, b, c, d, e, f).map_err(CanvasError::from)
    }

    fn translate(&mut self, x: f64, y: f64) -> Result<(), CanvasError> {
        self.ctx.translate(x, y).map_err(CanvasError::from)
    }

    fn scale(&mut self, x: f64, y: f64) -> Result<(), CanvasError> {
        self.ctx.scale(x, y).map_err(CanvasError::from)
    }

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ctx.clear_rect(x, y, width, height);
    }

    fn set_fill_style(&mut self, color: &str) {
        self.ctx.set_fill_style_str(color);
    }

    fn set_stroke_style(&mut self, color: &str) {
        self.ctx.set_stroke_style_str(color);
    }

    fn set_line_width(&mut self, width: f64) {
        self.ctx.set_line_width(width);
    }

    fn set_line_dash(&mut self, segments: &[f64]) -> Result<(), CanvasError> {
        let dash_array = js_sys::Array::new();
        for segment in segments {
            dash_array.push(&(*segment).into());
        }
        self.ctx.set_line_dash(&dash_array).map_err(CanvasError::from)
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ctx.fill_rect(x, y, width, height);
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ctx.stroke_rect(x, y, width, height);
    }

    fn begin_path(&mut self) {
        self.ctx.begin_path();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.ctx.move_to(x, y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.ctx.line_to(x, y);
    }

    fn stroke(&mut self) {
        self.ctx.stroke();
    }

    fn set_font(&mut self, font: &str) {
        self.ctx.set_font(font);
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<(), CanvasError> {
        self.ctx.fill_text(text, x, y).map_err(CanvasError::from)
    }
}

/// Read-only view of everything one frame needs.
pub struct Scene<'a> {
    pub camera: &'a Camera,
    pub registry: &'a ElementRegistry,
    /// Active selection box in world space, if box-selecting.
    pub selection_box: Option<Bounds>,
    pub viewport: Size,
    /// Device pixel ratio of the backing store.
    pub dpr: f64,
    pub config: &'a EngineConfig,
}

/// Counts gathered while drawing a frame, shown in the debug overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub elements: usize,
    pub selected: usize,
    pub visible: usize,
}

/// Draw the full scene: background, grid, elements, selection box, debug overlay.
///
/// # Errors
///
/// Returns `Err` if any drawing call fails. The context's save/restore stack
/// is balanced even on failure.
pub fn draw(painter: &mut dyn Painter, scene: &Scene<'_>) -> Result<FrameStats, CanvasError> {
    let viewport = scene.viewport;

    // Layer 1: clear in CSS pixel space.
    painter.set_transform(scene.dpr, 0.0, 0.0, scene.dpr, 0.0, 0.0)?;
    painter.clear_rect(0.0, 0.0, viewport.width, viewport.height);
    painter.set_fill_style(&scene.config.background_color);
    painter.fill_rect(0.0, 0.0, viewport.width, viewport.height);

    // Layer 2: world space.
    painter.save();
    let result = draw_world(painter, scene);
    painter.restore();
    let stats = result?;

    // Layer 3: screen-space overlay.
    if scene.config.show_debug_overlay {
        draw_debug_overlay(painter, &stats, scene.camera.zoom())?;
    }
    Ok(stats)
}

fn draw_world(painter: &mut dyn Painter, scene: &Scene<'_>) -> Result<FrameStats, CanvasError> {
    let camera = scene.camera;
    let zoom = camera.zoom();
    let center = scene.viewport.center();
    painter.translate(center.x, center.y)?;
    painter.scale(zoom, zoom)?;
    painter.translate(-camera.x, -camera.y)?;

    let visible = camera.visible_bounds(scene.viewport);
    if scene.config.grid_enabled {
        draw_grid(painter, visible, scene.config.grid_size, zoom, &scene.config.grid_color);
    }

    let registry = scene.registry;
    let cull = visible.inflate(SELECTION_MARGIN * 2.0);
    let mut stats = FrameStats { elements: registry.len(), selected: registry.selection_len(), visible: 0 };
    for element in registry.iter() {
        if !element.bounds().intersects(&cull) {
            continue;
        }
        let selected = registry.is_selected(&element.id);
        painter.save();
        if selected {
            painter.set_stroke_style(&scene.config.selection_stroke);
        }
        let result = element.paint(painter, selected);
        painter.restore();
        result?;
        stats.visible += 1;
    }

    if let Some(selection_box) = scene.selection_box {
        draw_selection_box(painter, selection_box, zoom, scene.config)?;
    }
    Ok(stats)
}

/// Grid lines aligned to multiples of `size`, one device pixel wide at any zoom.
fn draw_grid(painter: &mut dyn Painter, visible: Bounds, size: f64, zoom: f64, color: &str) {
    let Some(size) = grid_spacing(visible, size) else {
        return;
    };
    painter.set_stroke_style(color);
    painter.set_line_width(1.0 / zoom);
    painter.begin_path();

    let mut x = (visible.min_x / size).floor() * size;
    while x <= visible.max_x {
        painter.move_to(x, visible.min_y);
        painter.line_to(x, visible.max_y);
        x += size;
    }
    let mut y = (visible.min_y / size).floor() * size;
    while y <= visible.max_y {
        painter.move_to(visible.min_x, y);
        painter.line_to(visible.max_x, y);
        y += size;
    }
    painter.stroke();
}

/// Drawn grid spacing: `size`, doubled until neither axis needs more than
/// [`MAX_GRID_LINES`] lines. Doubling keeps every coarse line on the base grid.
pub(crate) fn grid_spacing(visible: Bounds, size: f64) -> Option<f64> {
    let span = visible.width().max(visible.height());
    if !size.is_finite() || size <= 0.0 || !span.is_finite() {
        return None;
    }
    let mut spacing = size;
    while span / spacing > MAX_GRID_LINES {
        spacing *= 2.0;
    }
    Some(spacing)
}

fn draw_selection_box(
    painter: &mut dyn Painter,
    selection_box: Bounds,
    zoom: f64,
    config: &EngineConfig,
) -> Result<(), CanvasError> {
    painter.save();
    let dash_world = SELECTION_DASH_PX / zoom;
    painter.set_line_dash(&[dash_world, dash_world])?;
    painter.set_stroke_style(&config.selection_stroke);
    painter.set_fill_style(&config.selection_fill);
    painter.set_line_width(1.0 / zoom);
    painter.fill_rect(selection_box.min_x, selection_box.min_y, selection_box.width(), selection_box.height());
    painter.stroke_rect(selection_box.min_x, selection_box.min_y, selection_box.width(), selection_box.height());
    painter.set_line_dash(&[])?;
    painter.restore();
    Ok(())
}

fn draw_debug_overlay(painter: &mut dyn Painter, stats: &FrameStats, zoom: f64) -> Result<(), CanvasError> {
    painter.save();
    painter.set_fill_style("rgba(31, 26, 23, 0.72)");
    painter.fill_rect(DEBUG_OVERLAY_X, DEBUG_OVERLAY_Y, DEBUG_OVERLAY_WIDTH, DEBUG_OVERLAY_HEIGHT);
    painter.set_fill_style("#FFFFFF");
    painter.set_font(DEBUG_OVERLAY_FONT);
    let result = painter.fill_text(&debug_overlay_text(stats, zoom), DEBUG_OVERLAY_X + 8.0, DEBUG_OVERLAY_Y + 16.0);
    painter.restore();
    result
}

/// Text shown in the debug overlay.
#[must_use]
pub fn debug_overlay_text(stats: &FrameStats, zoom: f64) -> String {
    format!(
        "Elements: {} | Selected: {} | Visible: {} | Zoom: {:.0}%",
        stats.elements,
        stats.selected,
        stats.visible,
        zoom * 100.0
    )
}
