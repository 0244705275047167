//! DOM listener registration owned by an engine instance.
//!
//! Every listener the engine installs, on the canvas or on the window, is
//! recorded here together with its closure. [`DomInputSource::detach`] removes
//! exactly those listeners, so creating and destroying many engines leaves
//! nothing behind on shared targets like `window`.

use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{Event, EventTarget};

use crate::error::CanvasError;

struct Listener {
    target: EventTarget,
    event: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

/// Listeners installed for one engine.
#[derive(Default)]
pub struct DomInputSource {
    listeners: Vec<Listener>,
}

impl DomInputSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler` for `event` on `target`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the browser rejects the listener.
    pub fn listen<F>(&mut self, target: &EventTarget, event: &'static str, handler: F) -> Result<(), CanvasError>
    where
        F: FnMut(Event) + 'static,
    {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
        self.listeners.push(Listener { target: target.clone(), event, closure });
        Ok(())
    }

    /// Number of installed listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Remove every installed listener and release its closure.
    pub fn detach(&mut self) {
        for listener in self.listeners.drain(..) {
            if let Err(err) = listener
                .target
                .remove_event_listener_with_callback(listener.event, listener.closure.as_ref().unchecked_ref())
            {
                log::warn!("failed to remove {} listener: {err:?}", listener.event);
            }
        }
    }
}

impl Drop for DomInputSource {
    fn drop(&mut self) {
        self.detach();
    }
}
