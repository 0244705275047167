#![allow(clippy::float_cmp)]

use super::*;
use crate::render::render_test::{Call, RecordingPainter};

#[test]
fn new_keeps_geometry() {
    let element = Element::new("note-1", 10.0, -5.0, 120.0, 80.0);
    assert_eq!(element.id, "note-1");
    assert_eq!((element.x, element.y, element.width, element.height), (10.0, -5.0, 120.0, 80.0));
}

#[test]
fn degenerate_sizes_become_one() {
    let element = Element::new("a", 0.0, 0.0, 0.0, -20.0);
    assert_eq!(element.width, 1.0);
    assert_eq!(element.height, 1.0);

    let element = Element::new("b", 0.0, 0.0, f64::NAN, f64::INFINITY);
    assert_eq!(element.width, 1.0);
    assert_eq!(element.height, 1.0);
}

#[test]
fn contains_is_edge_inclusive() {
    let element = Element::new("a", 0.0, 0.0, 100.0, 50.0);
    assert!(element.contains(Point::new(0.0, 0.0)));
    assert!(element.contains(Point::new(100.0, 50.0)));
    assert!(element.contains(Point::new(50.0, 25.0)));
    assert!(!element.contains(Point::new(100.1, 25.0)));
    assert!(!element.contains(Point::new(50.0, -0.1)));
}

#[test]
fn bounds_span_the_box() {
    let bounds = Element::new("a", -10.0, 20.0, 30.0, 40.0).bounds();
    assert_eq!(bounds, Bounds { min_x: -10.0, min_y: 20.0, max_x: 20.0, max_y: 60.0 });
}

#[test]
fn record_round_trips_through_json() {
    let element = Element::new("a", 1.5, 2.5, 3.0, 4.0);
    let json = serde_json::to_value(element.record()).unwrap();
    assert_eq!(json, serde_json::json!({ "id": "a", "x": 1.5, "y": 2.5, "width": 3.0, "height": 4.0 }));

    let restored = Element::from(serde_json::from_value::<ElementRecord>(json).unwrap());
    assert_eq!(restored.record(), element.record());
}

#[test]
fn debug_omits_painter() {
    let text = format!("{:?}", Element::new("a", 0.0, 0.0, 1.0, 1.0));
    assert!(text.starts_with("Element { id: \"a\""));
    assert!(text.ends_with(".. }"));
}

#[test]
fn box_painter_outlines_selection() {
    let element = Element::new("a", 0.0, 0.0, 10.0, 10.0);
    let highlight = Call::StrokeRect(-4.0, -4.0, 18.0, 18.0);

    let mut plain = RecordingPainter::new();
    element.paint(&mut plain, false).unwrap();
    assert!(plain.calls.contains(&Call::FillRect(0.0, 0.0, 10.0, 10.0)));
    assert!(!plain.calls.contains(&highlight));

    let mut selected = RecordingPainter::new();
    element.paint(&mut selected, true).unwrap();
    // Highlight comes first, in whatever stroke style the renderer preset.
    assert_eq!(selected.calls[..2], [Call::LineWidth(2.0), highlight]);
    assert!(selected.calls.contains(&Call::StrokeStyle(DEFAULT_ELEMENT_STROKE.to_owned())));
}

struct Tinted(&'static str);

impl ElementPainter for Tinted {
    fn paint(&self, painter: &mut dyn Painter, element: &Element, _selected: bool) -> Result<(), CanvasError> {
        painter.set_fill_style(self.0);
        painter.fill_rect(element.x, element.y, element.width, element.height);
        Ok(())
    }
}

#[test]
fn custom_painter_is_used() {
    let element = Element::new("a", 0.0, 0.0, 5.0, 5.0).with_painter(Rc::new(Tinted("#FF0000")));
    let mut painter = RecordingPainter::new();
    element.paint(&mut painter, false).unwrap();
    assert_eq!(painter.calls, vec![Call::FillStyle("#FF0000".into()), Call::FillRect(0.0, 0.0, 5.0, 5.0)]);
}
