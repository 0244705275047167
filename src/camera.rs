#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, MIN_FIT_EXTENT};

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Viewport dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Screen-space center of the viewport.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.width * 0.5, self.height * 0.5)
    }
}

/// Axis-aligned box in world space. Edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Box spanning two arbitrary corners, normalized so `min <= max` on both axes.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    /// Box with a top-left corner and a size.
    #[must_use]
    pub fn from_rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_corners(Point::new(x, y), Point::new(x + width, y + height))
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new((self.min_x + self.max_x) * 0.5, (self.min_y + self.max_y) * 0.5)
    }

    /// Whether `p` lies inside the box or on any of its edges.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// Overlap test; boxes sharing only an edge count as intersecting.
    #[must_use]
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.max_x >= other.min_x && self.min_x <= other.max_x && self.max_y >= other.min_y && self.min_y <= other.max_y
    }

    /// Smallest box enclosing both.
    #[must_use]
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Grow the box by `margin` on every side.
    #[must_use]
    pub fn inflate(&self, margin: f64) -> Bounds {
        Bounds {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }
}

/// Camera state for pan/zoom on the infinite canvas.
///
/// `(x, y)` is the world point shown at the center of the viewport. `zoom` is
/// a scale factor (1.0 = one world unit per CSS pixel) and always stays within
/// `[min_zoom, max_zoom]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    pub x: f64,
    pub y: f64,
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM)
    }
}

impl Camera {
    /// Camera at the origin with zoom 1 (clamped into the given limits).
    ///
    /// Non-positive or inverted limits fall back to the defaults.
    #[must_use]
    pub fn new(min_zoom: f64, max_zoom: f64) -> Self {
        let (min_zoom, max_zoom) = normalize_zoom_limits(min_zoom, max_zoom);
        Self { x: 0.0, y: 0.0, zoom: 1.0_f64.clamp(min_zoom, max_zoom), min_zoom, max_zoom }
    }

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    #[must_use]
    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    #[must_use]
    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    /// Set the zoom factor, clamped into the camera's limits.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        }
    }

    /// Convert a screen-space point (CSS pixels) to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point, viewport: Size) -> Point {
        let center = viewport.center();
        Point {
            x: (screen.x - center.x) / self.zoom + self.x,
            y: (screen.y - center.y) / self.zoom + self.y,
        }
    }

    /// Convert a world-space point to screen coordinates (CSS pixels).
    #[must_use]
    pub fn world_to_screen(&self, world: Point, viewport: Size) -> Point {
        let center = viewport.center();
        Point {
            x: (world.x - self.x) * self.zoom + center.x,
            y: (world.y - self.y) * self.zoom + center.y,
        }
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }

    /// Move the camera by a screen-space delta, so pan speed feels the same at every zoom.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.x += self.screen_dist_to_world(dx);
        self.y += self.screen_dist_to_world(dy);
    }

    /// Move the camera position by `(dx, dy)` without zoom scaling.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    /// Multiply zoom by `factor`, keeping the world point under `anchor` fixed on screen.
    ///
    /// Returns `false` when clamping leaves the zoom unchanged.
    pub fn zoom_by(&mut self, factor: f64, anchor: Point, viewport: Size) -> bool {
        let next = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if !next.is_finite() || (next - self.zoom).abs() <= f64::EPSILON * self.zoom {
            return false;
        }
        let before = self.screen_to_world(anchor, viewport);
        self.zoom = next;
        let after = self.screen_to_world(anchor, viewport);
        self.x += before.x - after.x;
        self.y += before.y - after.y;
        true
    }

    /// Back to the origin at zoom 1.
    pub fn reset(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
        self.zoom = 1.0_f64.clamp(self.min_zoom, self.max_zoom);
    }

    /// Center on `bounds` and zoom so it fills the viewport minus `padding` on each side.
    pub fn fit_bounds(&mut self, bounds: Bounds, viewport: Size, padding: f64) {
        let center = bounds.center();
        let width = bounds.width().max(MIN_FIT_EXTENT);
        let height = bounds.height().max(MIN_FIT_EXTENT);
        let zoom_x = (viewport.width - 2.0 * padding) / width;
        let zoom_y = (viewport.height - 2.0 * padding) / height;
        self.x = center.x;
        self.y = center.y;
        self.zoom = zoom_x.min(zoom_y).min(self.max_zoom).max(self.min_zoom);
    }

    /// World-space rectangle currently visible in the viewport.
    #[must_use]
    pub fn visible_bounds(&self, viewport: Size) -> Bounds {
        Bounds::from_corners(
            self.screen_to_world(Point::new(0.0, 0.0), viewport),
            self.screen_to_world(Point::new(viewport.width, viewport.height), viewport),
        )
    }

    /// Overwrite only the fields present in `partial`, then re-clamp the zoom.
    pub fn apply_partial(&mut self, partial: &PartialCamera) {
        if let Some(x) = partial.x.filter(|v| v.is_finite()) {
            self.x = x;
        }
        if let Some(y) = partial.y.filter(|v| v.is_finite()) {
            self.y = y;
        }
        if partial.min_zoom.is_some() || partial.max_zoom.is_some() {
            let (min_zoom, max_zoom) = normalize_zoom_limits(
                partial.min_zoom.unwrap_or(self.min_zoom),
                partial.max_zoom.unwrap_or(self.max_zoom),
            );
            self.min_zoom = min_zoom;
            self.max_zoom = max_zoom;
        }
        match partial.zoom {
            Some(zoom) => self.set_zoom(zoom),
            None => self.set_zoom(self.zoom),
        }
    }
}

/// Sparse camera update. Only present fields are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialCamera {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_zoom: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<f64>,
}

pub(crate) fn normalize_zoom_limits(min_zoom: f64, max_zoom: f64) -> (f64, f64) {
    let min_ok = min_zoom.is_finite() && min_zoom > 0.0;
    let max_ok = max_zoom.is_finite() && max_zoom > 0.0;
    match (min_ok, max_ok) {
        (true, true) if min_zoom <= max_zoom => (min_zoom, max_zoom),
        (true, true) => (max_zoom, min_zoom),
        (true, false) => (min_zoom, DEFAULT_MAX_ZOOM.max(min_zoom)),
        (false, true) => (DEFAULT_MIN_ZOOM.min(max_zoom), max_zoom),
        (false, false) => (DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM),
    }
}
