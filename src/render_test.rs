#![allow(clippy::float_cmp)]

use std::rc::Rc;

use super::*;
use crate::camera::Point;
use crate::element::{Element, ElementPainter};

// =============================================================
// Recording painter
// =============================================================

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Save,
    Restore,
    SetTransform([f64; 6]),
    Translate(f64, f64),
    Scale(f64, f64),
    ClearRect(f64, f64, f64, f64),
    FillStyle(String),
    StrokeStyle(String),
    LineWidth(f64),
    LineDash(Vec<f64>),
    FillRect(f64, f64, f64, f64),
    StrokeRect(f64, f64, f64, f64),
    BeginPath,
    MoveTo(f64, f64),
    LineTo(f64, f64),
    Stroke,
    Font(String),
    FillText(String, f64, f64),
}

/// [`Painter`] that records every call; optionally fails `fill_text`.
#[derive(Debug, Default)]
pub(crate) struct RecordingPainter {
    pub calls: Vec<Call>,
    pub fail_text: bool,
}

impl RecordingPainter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth_is_balanced(&self) -> bool {
        let saves = self.calls.iter().filter(|c| **c == Call::Save).count();
        let restores = self.calls.iter().filter(|c| **c == Call::Restore).count();
        saves == restores
    }

    pub fn fill_rects(&self) -> Vec<(f64, f64, f64, f64)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::FillRect(x, y, w, h) => Some((*x, *y, *w, *h)),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::FillText(text, _, _) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Painter for RecordingPainter {
    fn save(&mut self) {
        self.calls.push(Call::Save);
    }
    fn restore(&mut self) {
        self.calls.push(Call::Restore);
    }
    fn set_transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Result<(), CanvasError> {
        self.calls.push(Call::SetTransform([a, b, c, d, e, f]));
        Ok(())
    }
    fn translate(&mut self, x: f64, y: f64) -> Result<(), CanvasError> {
        self.calls.push(Call::Translate(x, y));
        Ok(())
    }
    fn scale(&mut self, x: f64, y: f64) -> Result<(), CanvasError> {
        self.calls.push(Call::Scale(x, y));
        Ok(())
    }
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.calls.push(Call::ClearRect(x, y, width, height));
    }
    fn set_fill_style(&mut self, color: &str) {
        self.calls.push(Call::FillStyle(color.to_owned()));
    }
    fn set_stroke_style(&mut self, color: &str) {
        self.calls.push(Call::StrokeStyle(color.to_owned()));
    }
    fn set_line_width(&mut self, width: f64) {
        self.calls.push(Call::LineWidth(width));
    }
    fn set_line_dash(&mut self, segments: &[f64]) -> Result<(), CanvasError> {
        self.calls.push(Call::LineDash(segments.to_vec()));
        Ok(())
    }
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.calls.push(Call::FillRect(x, y, width, height));
    }
    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.calls.push(Call::StrokeRect(x, y, width, height));
    }
    fn begin_path(&mut self) {
        self.calls.push(Call::BeginPath);
    }
    fn move_to(&mut self, x: f64, y: f64) {
        self.calls.push(Call::MoveTo(x, y));
    }
    fn line_to(&mut self, x: f64, y: f64) {
        self.calls.push(Call::LineTo(x, y));
    }
    fn stroke(&mut self) {
        self.calls.push(Call::Stroke);
    }
    fn set_font(&mut self, font: &str) {
        self.calls.push(Call::Font(font.to_owned()));
    }
    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<(), CanvasError> {
        if self.fail_text {
            return Err(CanvasError::Js("fillText rejected".into()));
        }
        self.calls.push(Call::FillText(text.to_owned(), x, y));
        Ok(())
    }
}

// =============================================================
// Helpers
// =============================================================

struct FailingPainter;

impl ElementPainter for FailingPainter {
    fn paint(&self, painter: &mut dyn Painter, _element: &Element, _selected: bool) -> Result<(), CanvasError> {
        painter.save();
        Err(CanvasError::Js("element draw failed".into()))
    }
}

fn viewport() -> Size {
    Size::new(800.0, 600.0)
}

fn quiet_config() -> EngineConfig {
    EngineConfig { grid_enabled: false, show_debug_overlay: false, ..Default::default() }
}

fn draw_with(
    registry: &ElementRegistry,
    camera: &Camera,
    selection_box: Option<Bounds>,
    config: &EngineConfig,
) -> (RecordingPainter, Result<FrameStats, CanvasError>) {
    let mut painter = RecordingPainter::new();
    let scene = Scene { camera, registry, selection_box, viewport: viewport(), dpr: 1.0, config };
    let result = draw(&mut painter, &scene);
    (painter, result)
}

// =============================================================
// Frame structure
// =============================================================

#[test]
fn frame_starts_with_dpr_transform_and_clear() {
    let registry = ElementRegistry::new();
    let camera = Camera::default();
    let config = quiet_config();
    let mut painter = RecordingPainter::new();
    let scene = Scene { camera: &camera, registry: &registry, selection_box: None, viewport: viewport(), dpr: 2.0, config: &config };
    draw(&mut painter, &scene).unwrap();

    assert_eq!(painter.calls[0], Call::SetTransform([2.0, 0.0, 0.0, 2.0, 0.0, 0.0]));
    assert_eq!(painter.calls[1], Call::ClearRect(0.0, 0.0, 800.0, 600.0));
    assert_eq!(painter.calls[2], Call::FillStyle(config.background_color.clone()));
    assert_eq!(painter.calls[3], Call::FillRect(0.0, 0.0, 800.0, 600.0));
}

#[test]
fn world_transform_centers_camera() {
    let registry = ElementRegistry::new();
    let mut camera = Camera::default();
    camera.x = 100.0;
    camera.y = 50.0;
    camera.set_zoom(2.0);
    let (painter, result) = draw_with(&registry, &camera, None, &quiet_config());
    result.unwrap();

    let translate_at = painter
        .calls
        .iter()
        .position(|c| *c == Call::Translate(400.0, 300.0))
        .unwrap();
    assert_eq!(painter.calls[translate_at + 1], Call::Scale(2.0, 2.0));
    assert_eq!(painter.calls[translate_at + 2], Call::Translate(-100.0, -50.0));
}

#[test]
fn save_restore_is_balanced() {
    let mut registry = ElementRegistry::new();
    registry.add(Element::new("a", 0.0, 0.0, 10.0, 10.0));
    let config = EngineConfig { show_debug_overlay: true, ..Default::default() };
    let selection = Some(Bounds::from_corners(Point::new(0.0, 0.0), Point::new(5.0, 5.0)));
    let (painter, result) = draw_with(&registry, &Camera::default(), selection, &config);
    result.unwrap();
    assert!(painter.depth_is_balanced());
}

// =============================================================
// Elements
// =============================================================

#[test]
fn elements_draw_in_registration_order() {
    let mut registry = ElementRegistry::new();
    registry.add(Element::new("first", 0.0, 0.0, 10.0, 10.0));
    registry.add(Element::new("second", 20.0, 0.0, 30.0, 10.0));
    let (painter, result) = draw_with(&registry, &Camera::default(), None, &quiet_config());
    result.unwrap();

    let rects = painter.fill_rects();
    let first = rects.iter().position(|r| *r == (0.0, 0.0, 10.0, 10.0)).unwrap();
    let second = rects.iter().position(|r| *r == (20.0, 0.0, 30.0, 10.0)).unwrap();
    assert!(first < second);
}

#[test]
fn offscreen_elements_are_culled() {
    let mut registry = ElementRegistry::new();
    registry.add(Element::new("near", 0.0, 0.0, 10.0, 10.0));
    registry.add(Element::new("far", 10_000.0, 10_000.0, 10.0, 10.0));
    let (painter, result) = draw_with(&registry, &Camera::default(), None, &quiet_config());
    let stats = result.unwrap();

    assert_eq!(stats, FrameStats { elements: 2, selected: 0, visible: 1 });
    assert!(!painter.fill_rects().contains(&(10_000.0, 10_000.0, 10.0, 10.0)));
}

#[test]
fn selected_elements_get_highlight() {
    let mut registry = ElementRegistry::new();
    registry.add(Element::new("a", 0.0, 0.0, 10.0, 10.0));
    registry.select("a");
    let (painter, result) = draw_with(&registry, &Camera::default(), None, &quiet_config());
    assert_eq!(result.unwrap().selected, 1);

    let margin = SELECTION_MARGIN;
    assert!(painter.calls.contains(&Call::StrokeRect(-margin, -margin, 10.0 + margin * 2.0, 10.0 + margin * 2.0)));
}

#[test]
fn highlight_uses_configured_selection_color() {
    let mut registry = ElementRegistry::new();
    registry.add(Element::new("a", 0.0, 0.0, 10.0, 10.0));
    registry.add(Element::new("b", 20.0, 0.0, 10.0, 10.0));
    registry.select("a");
    let config = EngineConfig { selection_stroke: "#00AA55".into(), ..quiet_config() };
    let (painter, result) = draw_with(&registry, &Camera::default(), None, &config);
    result.unwrap();

    let margin = SELECTION_MARGIN;
    let highlight = Call::StrokeRect(-margin, -margin, 10.0 + margin * 2.0, 10.0 + margin * 2.0);
    let at = painter.calls.iter().position(|c| *c == highlight).unwrap();
    let style = painter.calls[..at].iter().rev().find_map(|c| match c {
        Call::StrokeStyle(style) => Some(style.as_str()),
        _ => None,
    });
    assert_eq!(style, Some("#00AA55"));
    let styled = painter.calls.iter().filter(|c| **c == Call::StrokeStyle("#00AA55".into())).count();
    assert_eq!(styled, 1);
}

#[test]
fn failing_element_painter_keeps_stack_balanced() {
    let mut registry = ElementRegistry::new();
    registry.add(Element::new("bad", 0.0, 0.0, 10.0, 10.0).with_painter(Rc::new(FailingPainter)));
    let (painter, result) = draw_with(&registry, &Camera::default(), None, &quiet_config());
    assert!(result.is_err());
    // The element's own save is left open, but the renderer's outer frames still close.
    let saves = painter.calls.iter().filter(|c| **c == Call::Save).count();
    let restores = painter.calls.iter().filter(|c| **c == Call::Restore).count();
    assert_eq!(saves, restores + 1);
}

// =============================================================
// Grid
// =============================================================

#[test]
fn grid_lines_align_to_grid_size() {
    let registry = ElementRegistry::new();
    let config = EngineConfig { show_debug_overlay: false, ..Default::default() };
    let (painter, result) = draw_with(&registry, &Camera::default(), None, &config);
    result.unwrap();

    let moves: Vec<(f64, f64)> = painter
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::MoveTo(x, y) => Some((*x, *y)),
            _ => None,
        })
        .collect();
    assert!(!moves.is_empty());
    // Visible world is x in [-400, 400]: vertical lines at every multiple of 50.
    assert!(moves.contains(&(-400.0, -300.0)));
    assert!(moves.contains(&(0.0, -300.0)));
    assert!(moves.contains(&(400.0, -300.0)));
    assert!(moves.iter().all(|(x, y)| (x % 50.0 == 0.0) || (y % 50.0 == 0.0)));
}

#[test]
fn grid_line_width_is_one_screen_pixel() {
    let registry = ElementRegistry::new();
    let mut camera = Camera::default();
    camera.set_zoom(2.0);
    let config = EngineConfig { show_debug_overlay: false, ..Default::default() };
    let (painter, result) = draw_with(&registry, &camera, None, &config);
    result.unwrap();
    assert!(painter.calls.contains(&Call::LineWidth(0.5)));
}

#[test]
fn grid_skipped_when_disabled() {
    let registry = ElementRegistry::new();
    let (painter, result) = draw_with(&registry, &Camera::default(), None, &quiet_config());
    result.unwrap();
    assert!(!painter.calls.contains(&Call::BeginPath));
}

#[test]
fn dense_grid_is_coarsened_not_dropped() {
    let registry = ElementRegistry::new();
    let dense = EngineConfig { grid_size: 0.5, show_debug_overlay: false, ..Default::default() };
    let (painter, result) = draw_with(&registry, &Camera::default(), None, &dense);
    result.unwrap();

    assert!(painter.calls.contains(&Call::BeginPath));
    // 800 world units wide: 0.5 doubles to 2.0 for at most 400 lines per axis.
    let verticals: Vec<f64> = painter
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::MoveTo(x, y) if *y == -300.0 => Some(*x),
            _ => None,
        })
        .collect();
    assert!(verticals.len() <= 401);
    assert!(verticals.iter().all(|x| x % 2.0 == 0.0));
}

#[test]
fn grid_still_drawn_at_min_zoom_on_wide_viewport() {
    let registry = ElementRegistry::new();
    let mut camera = Camera::default();
    camera.set_zoom(0.0001);
    assert_eq!(camera.zoom(), camera.min_zoom());
    let config = EngineConfig { show_debug_overlay: false, ..Default::default() };
    let mut painter = RecordingPainter::new();
    let scene = Scene {
        camera: &camera,
        registry: &registry,
        selection_box: None,
        viewport: Size::new(2560.0, 1440.0),
        dpr: 1.0,
        config: &config,
    };
    draw(&mut painter, &scene).unwrap();

    assert!(painter.calls.contains(&Call::BeginPath));
    assert!(painter.calls.contains(&Call::Stroke));
}

#[test]
fn grid_spacing_doubles_from_base_size() {
    let narrow = Bounds::from_rect(0.0, 0.0, 800.0, 600.0);
    assert_eq!(grid_spacing(narrow, 50.0), Some(50.0));

    let wide = Bounds::from_rect(0.0, 0.0, 25_600.0, 14_400.0);
    assert_eq!(grid_spacing(wide, 50.0), Some(100.0));

    assert_eq!(grid_spacing(narrow, 0.0), None);
    assert_eq!(grid_spacing(narrow, f64::NAN), None);
}

// =============================================================
// Selection box and overlay
// =============================================================

#[test]
fn selection_box_is_dashed_and_reset() {
    let registry = ElementRegistry::new();
    let mut camera = Camera::default();
    camera.set_zoom(2.0);
    let selection = Bounds::from_corners(Point::new(10.0, 10.0), Point::new(-10.0, 30.0));
    let (painter, result) = draw_with(&registry, &camera, Some(selection), &quiet_config());
    result.unwrap();

    let dash = SELECTION_DASH_PX / 2.0;
    assert!(painter.calls.contains(&Call::LineDash(vec![dash, dash])));
    assert!(painter.calls.contains(&Call::LineDash(Vec::new())));
    assert!(painter.calls.contains(&Call::FillRect(-10.0, 10.0, 20.0, 20.0)));
    assert!(painter.calls.contains(&Call::StrokeRect(-10.0, 10.0, 20.0, 20.0)));
}

#[test]
fn debug_overlay_shows_counts_and_zoom() {
    let mut registry = ElementRegistry::new();
    registry.add(Element::new("a", 0.0, 0.0, 10.0, 10.0));
    registry.add(Element::new("b", 5_000.0, 0.0, 10.0, 10.0));
    registry.select("b");
    let config = EngineConfig { grid_enabled: false, show_debug_overlay: true, ..Default::default() };
    let (painter, result) = draw_with(&registry, &Camera::default(), None, &config);
    result.unwrap();

    assert_eq!(painter.texts(), vec!["Elements: 2 | Selected: 1 | Visible: 1 | Zoom: 100%".to_owned()]);
}

#[test]
fn overlay_failure_propagates() {
    let registry = ElementRegistry::new();
    let config = EngineConfig { show_debug_overlay: true, ..Default::default() };
    let mut painter = RecordingPainter { fail_text: true, ..Default::default() };
    let camera = Camera::default();
    let scene = Scene { camera: &camera, registry: &registry, selection_box: None, viewport: viewport(), dpr: 1.0, config: &config };
    assert!(draw(&mut painter, &scene).is_err());
    assert!(painter.depth_is_balanced());
}

#[test]
fn overlay_text_rounds_zoom() {
    let stats = FrameStats { elements: 3, selected: 0, visible: 2 };
    assert_eq!(debug_overlay_text(&stats, 1.234), "Elements: 3 | Selected: 0 | Visible: 2 | Zoom: 123%");
}
