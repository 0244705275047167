//! Input model: normalized pointer events, modifier keys, and the gesture state machine.
//!
//! Mouse and touch sources are reduced to one [`PointerInput`] type before
//! they reach the engine, so the engine has a single code path per gesture
//! phase. [`TouchTracker`] performs the touch half of that reduction: it
//! follows one finger and turns its lifecycle into Down/Move/Up.
//! [`InputState`] is the active gesture being tracked between pointer-down
//! and pointer-up.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::camera::Point;
use crate::element::ElementId;

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger touch).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button.
    Secondary,
}

impl Button {
    /// Map a DOM `MouseEvent.button` value.
    #[must_use]
    pub fn from_dom(button: i16) -> Self {
        match button {
            1 => Self::Middle,
            2 => Self::Secondary,
            _ => Self::Primary,
        }
    }

    /// Whether pressing this button starts a camera pan.
    #[must_use]
    pub fn pans(self) -> bool {
        matches!(self, Self::Middle | Self::Secondary)
    }
}

/// A keyboard key as reported by the browser (e.g. `"Delete"`, `"Escape"`, `"a"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn is_delete(&self) -> bool {
        matches!(self.0.as_str(), "Delete" | "Backspace")
    }

    #[must_use]
    pub fn is_escape(&self) -> bool {
        self.0 == "Escape"
    }

    /// The letter `a` in either case.
    #[must_use]
    pub fn is_select_all_letter(&self) -> bool {
        self.0.eq_ignore_ascii_case("a")
    }

    /// Whether the engine acts on this key; the host should suppress the browser default.
    #[must_use]
    pub fn is_binding(&self, modifiers: Modifiers) -> bool {
        self.is_delete() || self.is_escape() || (modifiers.command() && self.is_select_all_letter())
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy, Default)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

/// Where a pointer event sits in its gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

/// A pointer event after mouse/touch normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub phase: PointerPhase,
    /// Screen-space position in CSS pixels relative to the canvas.
    pub position: Point,
    pub button: Button,
    pub modifiers: Modifiers,
    /// Event timestamp in milliseconds, used for pan velocity.
    pub time_ms: f64,
}

impl PointerInput {
    /// Normalize a mouse event.
    #[must_use]
    pub fn from_mouse(phase: PointerPhase, position: Point, button: i16, modifiers: Modifiers, time_ms: f64) -> Self {
        Self { phase, position, button: Button::from_dom(button), modifiers, time_ms }
    }
}

/// One active touch contact, in canvas-relative CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub id: i32,
    pub position: Point,
}

/// Phase of a DOM touch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Start,
    Move,
    End,
    Cancel,
}

/// Follows a single finger and converts its lifecycle into pointer events.
///
/// Only single-touch gestures are mapped. A touch that starts while another
/// finger is already down is ignored, and if a second finger lands during a
/// tracked gesture that gesture ends as if the first finger had lifted.
#[derive(Debug, Clone, Default)]
pub struct TouchTracker {
    tracked: Option<TouchPoint>,
}

impl TouchTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a finger is currently being followed.
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.tracked.is_some()
    }

    /// Feed one touch event.
    ///
    /// `changed` are the contacts this event is about; `active` is the number
    /// of contacts still on the surface after the event.
    pub fn handle(
        &mut self,
        phase: TouchPhase,
        changed: &[TouchPoint],
        active: usize,
        time_ms: f64,
    ) -> Option<PointerInput> {
        match phase {
            TouchPhase::Start => match self.tracked {
                Some(tracked) => {
                    self.tracked = None;
                    Some(touch_pointer(PointerPhase::Up, tracked.position, time_ms))
                }
                None if active == 1 => {
                    let first = *changed.first()?;
                    self.tracked = Some(first);
                    Some(touch_pointer(PointerPhase::Down, first.position, time_ms))
                }
                None => None,
            },
            TouchPhase::Move => {
                let tracked = self.tracked?;
                let moved = changed.iter().find(|t| t.id == tracked.id)?;
                self.tracked = Some(*moved);
                Some(touch_pointer(PointerPhase::Move, moved.position, time_ms))
            }
            TouchPhase::End | TouchPhase::Cancel => {
                let tracked = self.tracked?;
                let lifted = changed.iter().find(|t| t.id == tracked.id)?;
                self.tracked = None;
                Some(touch_pointer(PointerPhase::Up, lifted.position, time_ms))
            }
        }
    }
}

fn touch_pointer(phase: PointerPhase, position: Point, time_ms: f64) -> PointerInput {
    PointerInput { phase, position, button: Button::Primary, modifiers: Modifiers::default(), time_ms }
}

/// Internal state for the input state machine.
///
/// Each active variant carries the gesture context needed to apply moves and
/// emit final actions on pointer-up.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// The camera follows the pointer (middle or right button).
    Panning {
        /// Button holding the pan; only its release ends the gesture.
        button: Button,
        /// Screen-space position of the previous pointer event.
        last_screen: Point,
        /// Timestamp of the previous pointer event, for velocity.
        last_time_ms: f64,
    },
    /// Selected elements follow the pointer.
    Dragging {
        button: Button,
        /// Offset from the pointer to each selected element's origin, captured at pointer-down.
        offsets: Vec<(ElementId, Point)>,
    },
    /// A selection rectangle is being drawn.
    BoxSelecting {
        button: Button,
        /// World-space corner where the drag started.
        start: Point,
        /// World-space corner under the pointer.
        end: Point,
    },
}

impl InputState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Button that started the active gesture.
    #[must_use]
    pub fn button(&self) -> Option<Button> {
        match self {
            Self::Idle => None,
            Self::Panning { button, .. } | Self::Dragging { button, .. } | Self::BoxSelecting { button, .. } => {
                Some(*button)
            }
        }
    }

    #[must_use]
    pub fn is_panning(&self) -> bool {
        matches!(self, Self::Panning { .. })
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self, Self::Dragging { .. })
    }

    #[must_use]
    pub fn is_selecting(&self) -> bool {
        matches!(self, Self::BoxSelecting { .. })
    }
}
