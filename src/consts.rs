//! Shared numeric constants for the canvas crate.

// ── Camera ──────────────────────────────────────────────────────

/// Smallest zoom factor the camera accepts by default.
pub const DEFAULT_MIN_ZOOM: f64 = 0.1;

/// Largest zoom factor the camera accepts by default.
pub const DEFAULT_MAX_ZOOM: f64 = 5.0;

/// Zoom multiplier applied for one wheel step towards the user.
pub const ZOOM_IN_FACTOR: f64 = 1.1;

/// Zoom multiplier applied for one wheel step away from the user.
pub const ZOOM_OUT_FACTOR: f64 = 0.9;

/// Screen-space margin kept around content by fit-to-view.
pub const FIT_PADDING_PX: f64 = 100.0;

/// Lower bound on a fitted bounding-box extent, so a degenerate box never divides by zero.
pub const MIN_FIT_EXTENT: f64 = 1.0;

// ── Inertia ─────────────────────────────────────────────────────

/// Velocity multiplier applied after every inertia step.
pub const INERTIA_FRICTION: f64 = 0.95;

/// Velocity (screen px per ms) below which inertia stops.
pub const INERTIA_EPSILON: f64 = 0.01;

/// Milliseconds of travel applied per inertia step (one rendered frame).
pub const INERTIA_STEP_SCALE: f64 = 10.0;

/// Smallest time delta used when measuring pan velocity.
pub const MIN_VELOCITY_DT_MS: f64 = 1.0;

// ── Rendering ───────────────────────────────────────────────────

/// World-space spacing between background grid lines.
pub const GRID_SIZE: f64 = 50.0;

/// Canvas clear color.
pub const BACKGROUND_COLOR: &str = "#F7F5F0";

/// Background grid line color.
pub const GRID_COLOR: &str = "rgba(31, 26, 23, 0.08)";

/// Selection box fill.
pub const SELECTION_FILL: &str = "rgba(30, 144, 255, 0.12)";

/// Selection box and selection highlight stroke.
pub const SELECTION_STROKE: &str = "#1E90FF";

/// Selection box dash segment length in screen pixels.
pub const SELECTION_DASH_PX: f64 = 4.0;

/// Gap between an element's box and its selection highlight, in world units.
pub const SELECTION_MARGIN: f64 = 4.0;

/// Fill for elements drawn by the default box painter.
pub const DEFAULT_ELEMENT_FILL: &str = "#FFFFFF";

/// Stroke for elements drawn by the default box painter.
pub const DEFAULT_ELEMENT_STROKE: &str = "#1F1A17";

/// Debug overlay anchor, in screen pixels from the top-left corner.
pub const DEBUG_OVERLAY_X: f64 = 10.0;
pub const DEBUG_OVERLAY_Y: f64 = 10.0;

/// Debug overlay panel size in screen pixels.
pub const DEBUG_OVERLAY_WIDTH: f64 = 330.0;
pub const DEBUG_OVERLAY_HEIGHT: f64 = 24.0;

/// Debug overlay font.
pub const DEBUG_OVERLAY_FONT: &str = "12px monospace";

/// Grid spacing is coarsened until at most this many lines span the viewport on one axis.
pub const MAX_GRID_LINES: f64 = 400.0;
