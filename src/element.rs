//! Canvas elements: positioned boxes with a host-supplied draw delegate.
//!
//! The engine knows nothing about what an element *is* (a note, a timer, a
//! file card). It sees an id, an axis-aligned box in world space, and an
//! [`ElementPainter`] it calls once per frame. The host owns the element's
//! lifecycle and persists any position changes the engine reports.

#[cfg(test)]
#[path = "element_test.rs"]
mod element_test;

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::camera::{Bounds, Point};
use crate::consts::{DEFAULT_ELEMENT_FILL, DEFAULT_ELEMENT_STROKE, SELECTION_MARGIN};
use crate::error::CanvasError;
use crate::render::Painter;

/// Unique identifier for a canvas element.
pub type ElementId = String;

/// Draw delegate for one element.
///
/// Called with the world-space transform already applied. Implementations
/// should paint only within the element's box plus a small highlight margin.
/// For a selected element the stroke style is preset to the configured
/// selection color, so a highlight drawn before changing it matches the
/// selection box.
pub trait ElementPainter {
    /// Paint `element`; `selected` is true while the element is in the selection set.
    ///
    /// # Errors
    ///
    /// Propagates any failing drawing call.
    fn paint(&self, painter: &mut dyn Painter, element: &Element, selected: bool) -> Result<(), CanvasError>;
}

/// Plain filled box with an outline, used when the host supplies no painter.
#[derive(Debug, Clone)]
pub struct BoxPainter {
    pub fill: String,
    pub stroke: String,
}

impl Default for BoxPainter {
    fn default() -> Self {
        Self { fill: DEFAULT_ELEMENT_FILL.to_owned(), stroke: DEFAULT_ELEMENT_STROKE.to_owned() }
    }
}

impl ElementPainter for BoxPainter {
    fn paint(&self, painter: &mut dyn Painter, element: &Element, selected: bool) -> Result<(), CanvasError> {
        if selected {
            painter.set_line_width(2.0);
            painter.stroke_rect(
                element.x - SELECTION_MARGIN,
                element.y - SELECTION_MARGIN,
                element.width + SELECTION_MARGIN * 2.0,
                element.height + SELECTION_MARGIN * 2.0,
            );
        }

        painter.set_fill_style(&self.fill);
        painter.fill_rect(element.x, element.y, element.width, element.height);
        painter.set_stroke_style(&self.stroke);
        painter.set_line_width(1.0);
        painter.stroke_rect(element.x, element.y, element.width, element.height);
        Ok(())
    }
}

/// A positioned, sized entity on the canvas.
#[derive(Clone)]
pub struct Element {
    pub id: ElementId,
    /// Left edge in world coordinates.
    pub x: f64,
    /// Top edge in world coordinates.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    painter: Rc<dyn ElementPainter>,
}

impl Element {
    /// Element drawn with the default [`BoxPainter`].
    ///
    /// Non-positive or non-finite sizes are replaced with 1 so the box is never empty.
    #[must_use]
    pub fn new(id: impl Into<ElementId>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            width: positive_extent(width),
            height: positive_extent(height),
            painter: Rc::new(BoxPainter::default()),
        }
    }

    /// Replace the draw delegate.
    #[must_use]
    pub fn with_painter(mut self, painter: Rc<dyn ElementPainter>) -> Self {
        self.painter = painter;
        self
    }

    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds::from_rect(self.x, self.y, self.width, self.height)
    }

    /// Inclusive point-in-box test.
    #[must_use]
    pub fn contains(&self, world: Point) -> bool {
        self.bounds().contains(world)
    }

    /// Position/size snapshot for export and host persistence.
    #[must_use]
    pub fn record(&self) -> ElementRecord {
        ElementRecord { id: self.id.clone(), x: self.x, y: self.y, width: self.width, height: self.height }
    }

    pub(crate) fn paint(&self, painter: &mut dyn Painter, selected: bool) -> Result<(), CanvasError> {
        self.painter.paint(painter, self, selected)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.id)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Serialized form of an element: identity and geometry only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub id: ElementId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl From<ElementRecord> for Element {
    fn from(record: ElementRecord) -> Self {
        Element::new(record.id, record.x, record.y, record.width, record.height)
    }
}

fn positive_extent(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 { value } else { 1.0 }
}
