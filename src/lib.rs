//! Interaction engine for an infinite 2D canvas.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It owns the
//! interaction side of an infinite canvas: a pan/zoom camera with screen/world
//! conversions, a registry of host-supplied elements with a selection set,
//! a pointer/keyboard state machine (pan, drag, box-select) with post-pan
//! inertia, and a dirty-flag render loop that draws a grid, the elements, the
//! selection box and a debug overlay. The host decides what elements look
//! like and persists the [`engine::Action`]s the engine reports.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Browser [`engine::Engine`] and testable [`engine::EngineCore`] |
//! | [`camera`] | Pan/zoom camera, points, bounds and coordinate conversions |
//! | [`element`] | Elements and their draw delegates |
//! | [`registry`] | Draw-ordered element map and the selection set |
//! | [`hit`] | Point hit-testing and box queries |
//! | [`input`] | Input event types and the gesture state machine |
//! | [`inertia`] | Pan velocity tracking and decay |
//! | [`render`] | Scene rendering through the [`render::Painter`] trait |
//! | [`scheduler`] | Cancellable animation-frame loops |
//! | [`dom`] | DOM listener ownership and teardown |
//! | [`config`] | Engine tuning with JSON overrides |
//! | [`consts`] | Shared numeric and color constants |
//! | [`error`] | The crate error type |

pub mod camera;
pub mod config;
pub mod consts;
pub mod dom;
pub mod element;
pub mod engine;
pub mod error;
pub mod hit;
pub mod inertia;
pub mod input;
pub mod registry;
pub mod render;
pub mod scheduler;

pub use error::CanvasError;

/// Route `log` records at or above `level` to the browser console.
///
/// # Errors
///
/// Returns [`CanvasError::Logger`] if a logger is already installed.
#[cfg(feature = "console")]
pub fn init_console_logging(level: log::Level) -> Result<(), CanvasError> {
    console_log::init_with_level(level).map_err(|err| CanvasError::Logger(err.to_string()))
}
