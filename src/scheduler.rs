//! Repeating animation-frame tasks with explicit cancellation.
//!
//! A [`FrameLoop`] calls its tick closure once per `requestAnimationFrame`
//! until the closure returns [`LoopControl::Stop`] or the loop is cancelled.
//! The loop's handle is the cancellation token: [`FrameLoop::cancel`] (or
//! dropping the loop) cancels the pending frame request and releases the
//! closure, so no tick can run afterwards.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::Window;

use crate::error::CanvasError;

/// What a tick wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

type TickClosure = Closure<dyn FnMut(f64)>;

struct LoopState {
    window: Window,
    cancelled: Cell<bool>,
    pending_frame: Cell<Option<i32>>,
    callback: RefCell<Option<TickClosure>>,
}

impl LoopState {
    fn request_frame(&self) -> Result<(), CanvasError> {
        let callback = self.callback.borrow();
        let Some(callback) = callback.as_ref() else {
            return Ok(());
        };
        let id = self
            .window
            .request_animation_frame(callback.as_ref().unchecked_ref())?;
        self.pending_frame.set(Some(id));
        Ok(())
    }

    fn cancel_pending_frame(&self) {
        if let Some(id) = self.pending_frame.take() {
            if let Err(err) = self.window.cancel_animation_frame(id) {
                log::warn!("cancel_animation_frame failed: {err:?}");
            }
        }
    }
}

/// A running animation-frame loop. Dropping it cancels the loop.
pub struct FrameLoop {
    state: Rc<LoopState>,
}

impl FrameLoop {
    /// Start calling `tick` with the frame timestamp on every animation frame.
    ///
    /// # Errors
    ///
    /// Returns `Err` if there is no window or the first frame cannot be requested.
    pub fn start<F>(mut tick: F) -> Result<Self, CanvasError>
    where
        F: FnMut(f64) -> LoopControl + 'static,
    {
        let window = web_sys::window().ok_or(CanvasError::NoWindow)?;
        let state = Rc::new(LoopState {
            window,
            cancelled: Cell::new(false),
            pending_frame: Cell::new(None),
            callback: RefCell::new(None),
        });

        let weak: Weak<LoopState> = Rc::downgrade(&state);
        let callback = Closure::wrap(Box::new(move |timestamp: f64| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            state.pending_frame.set(None);
            if state.cancelled.get() {
                return;
            }
            if tick(timestamp) == LoopControl::Stop {
                state.cancelled.set(true);
                return;
            }
            if let Err(err) = state.request_frame() {
                log::warn!("frame loop stopped: {err}");
                state.cancelled.set(true);
            }
        }) as Box<dyn FnMut(f64)>);

        *state.callback.borrow_mut() = Some(callback);
        state.request_frame()?;
        Ok(Self { state })
    }

    /// Whether the loop will tick again.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.state.cancelled.get()
    }

    /// Cancel the pending frame and release the tick closure. Safe to call repeatedly.
    ///
    /// Must not be called from inside this loop's own tick.
    pub fn cancel(&self) {
        self.state.cancelled.set(true);
        self.state.cancel_pending_frame();
        self.state.callback.borrow_mut().take();
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}
