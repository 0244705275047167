use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use wasm_bindgen::JsCast;
use web_sys::{
    CanvasRenderingContext2d, Event, EventTarget, HtmlCanvasElement, HtmlElement, KeyboardEvent, MouseEvent,
    TouchEvent, TouchList, WheelEvent,
};

use crate::camera::{Bounds, Camera, PartialCamera, Point, Size};
use crate::config::EngineConfig;
use crate::dom::DomInputSource;
use crate::element::{Element, ElementId, ElementRecord};
use crate::error::CanvasError;
use crate::hit;
use crate::inertia::Inertia;
use crate::input::{
    InputState, Key, Modifiers, PointerInput, PointerPhase, TouchPhase, TouchPoint, TouchTracker, WheelDelta,
};
use crate::registry::ElementRegistry;
use crate::render::{self, CanvasPainter, FrameStats, Painter, Scene};
use crate::scheduler::{FrameLoop, LoopControl};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A drag finished; the listed (selected) elements have new positions to persist.
    ElementsMoved(Vec<ElementId>),
    /// The listed elements were deleted from the canvas.
    ElementsDeleted(Vec<ElementId>),
    /// The canvas cursor should change.
    SetCursor(Cursor),
}

/// Pointer cursor shown over the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    /// Hovering an element.
    Pointer,
    /// Panning the camera.
    Grabbing,
    /// Dragging elements.
    Move,
}

impl Cursor {
    /// CSS `cursor` value.
    #[must_use]
    pub fn css(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Pointer => "pointer",
            Self::Grabbing => "grabbing",
            Self::Move => "move",
        }
    }
}

/// Exported engine state: camera framing plus element geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanvasSnapshot {
    pub camera: Camera,
    pub elements: Vec<ElementRecord>,
}

/// Data accepted by [`EngineCore::import`].
///
/// Only the camera is restored; elements are registered by the host through
/// `add_element`, so any `elements` array in the input is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotImport {
    #[serde(default)]
    pub camera: Option<PartialCamera>,
}

/// Core engine state: all logic that does not depend on the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
pub struct EngineCore {
    config: EngineConfig,
    camera: Camera,
    registry: ElementRegistry,
    input: InputState,
    inertia: Inertia,
    hovered: Option<ElementId>,
    cursor: Cursor,
    pointer_screen: Point,
    pointer_world: Point,
    viewport: Size,
    dpr: f64,
    focused: bool,
    dirty: bool,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Core with custom tuning. The config is normalized first.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let config = config.normalized();
        Self {
            camera: Camera::new(config.min_zoom, config.max_zoom),
            inertia: Inertia::from_config(&config),
            config,
            registry: ElementRegistry::new(),
            input: InputState::Idle,
            hovered: None,
            cursor: Cursor::Default,
            pointer_screen: Point::default(),
            pointer_world: Point::default(),
            viewport: Size::default(),
            dpr: 1.0,
            focused: false,
            dirty: true,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Viewport ---

    /// Update viewport dimensions (CSS pixels) and device pixel ratio.
    pub fn set_viewport(&mut self, width: f64, height: f64, dpr: f64) {
        self.viewport = Size::new(finite_or_zero(width).max(0.0), finite_or_zero(height).max(0.0));
        self.dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
        self.dirty = true;
    }

    #[must_use]
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    #[must_use]
    pub fn dpr(&self) -> f64 {
        self.dpr
    }

    // --- Camera ---

    /// The current camera state.
    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        self.camera.screen_to_world(screen, self.viewport)
    }

    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        self.camera.world_to_screen(world, self.viewport)
    }

    /// Pan by a screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.camera.pan(dx, dy);
        self.dirty = true;
    }

    /// Zoom one step around a screen point: in for negative `delta`, out for
    /// positive. Returns whether the zoom changed.
    pub fn zoom_at(&mut self, delta: f64, center: Point) -> bool {
        let factor = if delta > 0.0 {
            self.config.zoom_out_factor
        } else if delta < 0.0 {
            self.config.zoom_in_factor
        } else {
            return false;
        };
        let changed = self.camera.zoom_by(factor, center, self.viewport);
        if changed {
            self.dirty = true;
        }
        changed
    }

    pub fn reset_camera(&mut self) {
        self.camera.reset();
        self.dirty = true;
    }

    /// Frame every element in the viewport, or reset the camera when there are none.
    pub fn fit_to_view(&mut self) {
        match hit::content_bounds(&self.registry) {
            Some(bounds) => self.camera.fit_bounds(bounds, self.viewport, self.config.fit_padding),
            None => self.camera.reset(),
        }
        self.dirty = true;
    }

    // --- Elements ---

    /// Register an element, replacing any element with the same id.
    pub fn add_element(&mut self, element: Element) -> &Element {
        self.dirty = true;
        self.registry.add(element)
    }

    /// Remove an element and drop it from the selection. Unknown ids are ignored.
    pub fn remove_element(&mut self, id: &str) -> Option<Element> {
        let removed = self.registry.remove(id)?;
        if self.hovered.as_deref() == Some(id) {
            self.hovered = None;
        }
        self.dirty = true;
        Some(removed)
    }

    /// Look up an element by id.
    #[must_use]
    pub fn element(&self, id: &str) -> Option<&Element> {
        self.registry.get(id)
    }

    /// Remove every element and clear the selection.
    pub fn clear_elements(&mut self) {
        self.registry.clear();
        self.hovered = None;
        self.dirty = true;
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.registry.len()
    }

    /// Elements in draw order.
    pub fn elements(&self) -> impl DoubleEndedIterator<Item = &Element> {
        self.registry.iter()
    }

    #[must_use]
    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    /// Topmost element under a world point.
    #[must_use]
    pub fn hit_test(&self, world: Point) -> Option<&Element> {
        hit::hit_test(&self.registry, world)
    }

    /// Elements overlapping the box spanned by two world-space corners.
    #[must_use]
    pub fn query_box(&self, corner_a: Point, corner_b: Point) -> Vec<&Element> {
        hit::query_box(&self.registry, corner_a, corner_b)
    }

    // --- Selection ---

    /// Selected ids in draw order.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<ElementId> {
        self.registry.selected_ids()
    }

    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        self.registry.is_selected(id)
    }

    pub fn select_all(&mut self) {
        self.registry.select_all();
        self.dirty = true;
    }

    pub fn clear_selection(&mut self) {
        if self.registry.clear_selection() {
            self.dirty = true;
        }
    }

    // --- Interaction queries ---

    /// Element under the pointer while no gesture is active.
    #[must_use]
    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    #[must_use]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    #[must_use]
    pub fn input_state(&self) -> &InputState {
        &self.input
    }

    /// Last pointer position in screen and world space.
    #[must_use]
    pub fn pointer(&self) -> (Point, Point) {
        (self.pointer_screen, self.pointer_world)
    }

    /// Normalized selection rectangle while box-selecting.
    #[must_use]
    pub fn selection_box(&self) -> Option<Bounds> {
        match self.input {
            InputState::BoxSelecting { start, end, .. } => Some(Bounds::from_corners(start, end)),
            _ => None,
        }
    }

    // --- Focus ---

    /// Whether keyboard shortcuts reach this engine. Gained on pointer-down.
    #[must_use]
    pub fn has_focus(&self) -> bool {
        self.focused
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    // --- Input events ---

    /// Route a normalized pointer event to the handler for its phase.
    pub fn handle_pointer(&mut self, input: &PointerInput) -> Vec<Action> {
        match input.phase {
            PointerPhase::Down => self.on_pointer_down(input),
            PointerPhase::Move => self.on_pointer_move(input),
            PointerPhase::Up => self.on_pointer_up(input),
        }
    }

    pub fn on_pointer_down(&mut self, input: &PointerInput) -> Vec<Action> {
        let mut actions = Vec::new();
        // A new gesture always wins over leftover pan momentum.
        self.inertia.cancel();
        self.focused = true;
        if !self.input.is_idle() {
            return actions;
        }
        let world = self.track_pointer(input.position);

        if input.button.pans() {
            self.input = InputState::Panning {
                button: input.button,
                last_screen: input.position,
                last_time_ms: input.time_ms,
            };
            self.set_cursor(Cursor::Grabbing, &mut actions);
            return actions;
        }

        let hit_id = hit::hit_test(&self.registry, world).map(|element| element.id.clone());
        match hit_id {
            Some(id) => {
                if !self.registry.is_selected(&id) && !input.modifiers.command() {
                    self.registry.clear_selection();
                }
                self.registry.select(&id);
                let offsets = self
                    .registry
                    .selected()
                    .map(|element| (element.id.clone(), Point::new(element.x - world.x, element.y - world.y)))
                    .collect();
                self.input = InputState::Dragging { button: input.button, offsets };
                self.set_cursor(Cursor::Move, &mut actions);
            }
            None => {
                if !input.modifiers.command() {
                    self.registry.clear_selection();
                }
                self.input = InputState::BoxSelecting { button: input.button, start: world, end: world };
            }
        }
        self.dirty = true;
        actions
    }

    pub fn on_pointer_move(&mut self, input: &PointerInput) -> Vec<Action> {
        let mut actions = Vec::new();
        let world = self.track_pointer(input.position);

        match &mut self.input {
            InputState::Idle => {}
            InputState::Panning { last_screen, last_time_ms, .. } => {
                let dx = input.position.x - last_screen.x;
                let dy = input.position.y - last_screen.y;
                self.camera.pan(-dx, -dy);
                self.inertia.record(dx, dy, input.time_ms - *last_time_ms);
                *last_screen = input.position;
                *last_time_ms = input.time_ms;
                self.dirty = true;
            }
            InputState::Dragging { offsets, .. } => {
                // Absolute placement from the captured offsets; no accumulated drift.
                for (id, offset) in offsets.iter() {
                    if let Some(element) = self.registry.get_mut(id) {
                        element.x = world.x + offset.x;
                        element.y = world.y + offset.y;
                    }
                }
                self.dirty = true;
            }
            InputState::BoxSelecting { end, .. } => {
                *end = world;
                self.dirty = true;
            }
        }

        if self.input.is_idle() {
            self.update_hover(world, &mut actions);
        }
        actions
    }

    /// End the active gesture. Releasing a button other than the one that
    /// started it is ignored.
    pub fn on_pointer_up(&mut self, input: &PointerInput) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.input.button().is_some_and(|button| button != input.button) {
            return actions;
        }
        let world = self.track_pointer(input.position);

        match std::mem::take(&mut self.input) {
            InputState::Idle => {}
            InputState::Panning { .. } => {
                self.inertia.release();
            }
            InputState::Dragging { .. } => {
                actions.push(Action::ElementsMoved(self.registry.selected_ids()));
                self.dirty = true;
            }
            InputState::BoxSelecting { start, .. } => {
                let ids: Vec<ElementId> = hit::query_box(&self.registry, start, world)
                    .into_iter()
                    .map(|element| element.id.clone())
                    .collect();
                for id in &ids {
                    self.registry.select(id);
                }
                self.dirty = true;
            }
        }

        self.update_hover(world, &mut actions);
        let cursor = self.resting_cursor();
        self.set_cursor(cursor, &mut actions);
        actions
    }

    /// Zoom around the pointer. Returns whether the zoom changed.
    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta) -> bool {
        self.zoom_at(delta.dy, screen_pt)
    }

    /// Apply a keyboard shortcut. Keys are ignored while the engine is unfocused.
    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        let mut actions = Vec::new();
        if !self.focused {
            return actions;
        }
        if key.is_delete() {
            if self.registry.selection_len() > 0 {
                let ids = self.registry.selected_ids();
                for id in &ids {
                    self.registry.remove(id);
                }
                self.registry.clear_selection();
                if self.hovered.as_ref().is_some_and(|hovered| ids.contains(hovered)) {
                    self.hovered = None;
                }
                log::debug!("deleted {} selected elements", ids.len());
                actions.push(Action::ElementsDeleted(ids));
                let cursor = self.resting_cursor();
                self.set_cursor(cursor, &mut actions);
                self.dirty = true;
            }
        } else if modifiers.command() && key.is_select_all_letter() {
            self.select_all();
        } else if key.is_escape() {
            self.clear_selection();
        }
        actions
    }

    // --- Inertia ---

    #[must_use]
    pub fn is_inertia_active(&self) -> bool {
        self.inertia.is_active()
    }

    /// Advance post-pan momentum by one frame. Returns whether it is still running.
    ///
    /// The step delta moves the camera position directly, so the coast length
    /// does not depend on zoom.
    pub fn step_inertia(&mut self) -> bool {
        match self.inertia.step() {
            Some(delta) => {
                self.camera.translate(delta.x, delta.y);
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn cancel_inertia(&mut self) {
        self.inertia.cancel();
    }

    // --- Frame ---

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Read and clear the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Read-only view of the current frame.
    #[must_use]
    pub fn scene(&self) -> Scene<'_> {
        Scene {
            camera: &self.camera,
            registry: &self.registry,
            selection_box: self.selection_box(),
            viewport: self.viewport,
            dpr: self.dpr,
            config: &self.config,
        }
    }

    /// Redraw if anything changed since the last frame.
    ///
    /// Returns `Ok(None)` when the frame was skipped. The dirty flag is cleared
    /// before drawing, so a failing frame is not retried every tick.
    ///
    /// # Errors
    ///
    /// Propagates the first failing drawing call.
    pub fn render_frame(&mut self, painter: &mut dyn Painter) -> Result<Option<FrameStats>, CanvasError> {
        if !self.take_dirty() {
            return Ok(None);
        }
        render::draw(painter, &self.scene()).map(Some)
    }

    // --- Export / import ---

    #[must_use]
    pub fn export(&self) -> CanvasSnapshot {
        CanvasSnapshot { camera: self.camera, elements: self.registry.iter().map(Element::record).collect() }
    }

    /// Merge the imported camera fields into the current camera.
    pub fn import(&mut self, data: &SnapshotImport) {
        if let Some(camera) = &data.camera {
            self.camera.apply_partial(camera);
            self.dirty = true;
            log::debug!("imported camera at ({}, {}) zoom {}", self.camera.x, self.camera.y, self.camera.zoom());
        }
    }

    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidSnapshot`] if serialization fails.
    pub fn export_json(&self) -> Result<String, CanvasError> {
        serde_json::to_string(&self.export()).map_err(CanvasError::InvalidSnapshot)
    }

    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidSnapshot`] if `json` is malformed; the camera is left untouched.
    pub fn import_json(&mut self, json: &str) -> Result<(), CanvasError> {
        let data: SnapshotImport = serde_json::from_str(json).map_err(CanvasError::InvalidSnapshot)?;
        self.import(&data);
        Ok(())
    }

    /// Drop all elements, selection and gesture state.
    pub fn teardown(&mut self) {
        self.registry.clear();
        self.input = InputState::Idle;
        self.inertia.cancel();
        self.hovered = None;
        self.cursor = Cursor::Default;
        self.focused = false;
        self.dirty = false;
    }

    // --- Internals ---

    fn track_pointer(&mut self, screen: Point) -> Point {
        let world = self.screen_to_world(screen);
        self.pointer_screen = screen;
        self.pointer_world = world;
        world
    }

    fn update_hover(&mut self, world: Point, actions: &mut Vec<Action>) {
        let hit_id = hit::hit_test(&self.registry, world).map(|element| element.id.as_str());
        if hit_id == self.hovered.as_deref() {
            return;
        }
        self.hovered = hit_id.map(str::to_owned);
        self.dirty = true;
        let cursor = self.resting_cursor();
        self.set_cursor(cursor, actions);
    }

    fn resting_cursor(&self) -> Cursor {
        if self.hovered.is_some() { Cursor::Pointer } else { Cursor::Default }
    }

    fn set_cursor(&mut self, cursor: Cursor, actions: &mut Vec<Action>) {
        if self.cursor != cursor {
            self.cursor = cursor;
            actions.push(Action::SetCursor(cursor));
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

// =============================================================
// Browser engine
// =============================================================

type HostHook = Rc<dyn Fn(&[ElementId])>;

/// Host callbacks fired after completed gestures.
#[derive(Default, Clone)]
struct HostHooks {
    on_elements_moved: Option<HostHook>,
    on_elements_deleted: Option<HostHook>,
}

/// State reachable from DOM listeners and frame loops.
struct Shared {
    canvas: HtmlCanvasElement,
    core: RefCell<EngineCore>,
    hooks: RefCell<HostHooks>,
    touch: RefCell<TouchTracker>,
    inertia_loop: RefCell<Option<FrameLoop>>,
}

impl Shared {
    fn cancel_inertia_loop(&self) {
        if let Some(inertia_loop) = self.inertia_loop.borrow_mut().take() {
            inertia_loop.cancel();
        }
    }
}

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas element,
/// its listeners, and its frame loops.
///
/// Construction sizes the canvas, installs input listeners and starts the
/// render loop. [`Engine::destroy`] (or dropping the engine) undoes all three.
pub struct Engine {
    shared: Rc<Shared>,
    input: DomInputSource,
    render_loop: Option<FrameLoop>,
    destroyed: bool,
}

impl Engine {
    /// Create a new engine bound to the given canvas element.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the canvas has no 2D context or the browser rejects a
    /// listener or frame request.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, CanvasError> {
        Self::with_config(canvas, EngineConfig::default())
    }

    /// Like [`Engine::new`], with custom tuning.
    ///
    /// # Errors
    ///
    /// See [`Engine::new`].
    pub fn with_config(canvas: HtmlCanvasElement, config: EngineConfig) -> Result<Self, CanvasError> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or(CanvasError::ContextUnavailable)?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| CanvasError::ContextUnavailable)?;

        let shared = Rc::new(Shared {
            canvas,
            core: RefCell::new(EngineCore::with_config(config)),
            hooks: RefCell::new(HostHooks::default()),
            touch: RefCell::new(TouchTracker::new()),
            inertia_loop: RefCell::new(None),
        });
        let mut engine = Self { shared, input: DomInputSource::new(), render_loop: None, destroyed: false };
        engine.resize()?;
        engine.attach_listeners()?;
        engine.start_render_loop(ctx)?;
        log::debug!("canvas engine attached with {} listeners", engine.input.len());
        Ok(engine)
    }

    // --- Elements ---

    pub fn add_element(&mut self, element: Element) -> Element {
        self.shared.core.borrow_mut().add_element(element).clone()
    }

    pub fn remove_element(&mut self, id: &str) -> Option<Element> {
        self.shared.core.borrow_mut().remove_element(id)
    }

    #[must_use]
    pub fn element(&self, id: &str) -> Option<Element> {
        self.shared.core.borrow().element(id).cloned()
    }

    pub fn clear_elements(&mut self) {
        self.shared.core.borrow_mut().clear_elements();
    }

    // --- Camera ---

    pub fn reset_camera(&mut self) {
        self.shared.core.borrow_mut().reset_camera();
    }

    pub fn fit_to_view(&mut self) {
        self.shared.core.borrow_mut().fit_to_view();
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.shared.core.borrow().camera()
    }

    // --- Export / import ---

    #[must_use]
    pub fn export(&self) -> CanvasSnapshot {
        self.shared.core.borrow().export()
    }

    pub fn import(&mut self, data: &SnapshotImport) {
        self.shared.core.borrow_mut().import(data);
    }

    /// # Errors
    ///
    /// See [`EngineCore::export_json`].
    pub fn export_json(&self) -> Result<String, CanvasError> {
        self.shared.core.borrow().export_json()
    }

    /// # Errors
    ///
    /// See [`EngineCore::import_json`].
    pub fn import_json(&mut self, json: &str) -> Result<(), CanvasError> {
        self.shared.core.borrow_mut().import_json(json)
    }

    // --- Host hooks ---

    /// Called once per completed drag with the ids of the moved elements.
    pub fn on_elements_moved<F>(&mut self, hook: F)
    where
        F: Fn(&[ElementId]) + 'static,
    {
        self.shared.hooks.borrow_mut().on_elements_moved = Some(Rc::new(hook));
    }

    /// Called once per keyboard deletion with the ids of the removed elements.
    pub fn on_elements_deleted<F>(&mut self, hook: F)
    where
        F: Fn(&[ElementId]) + 'static,
    {
        self.shared.hooks.borrow_mut().on_elements_deleted = Some(Rc::new(hook));
    }

    /// Run `f` against the core, for queries and operations without a wrapper here.
    pub fn with_core<R>(&self, f: impl FnOnce(&mut EngineCore) -> R) -> R {
        f(&mut *self.shared.core.borrow_mut())
    }

    // --- Lifecycle ---

    /// Match the canvas backing store to its container's current size.
    ///
    /// Called automatically on window resize; call it after any other layout change.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the canvas style cannot be updated.
    pub fn resize(&mut self) -> Result<(), CanvasError> {
        resize_surface(&self.shared)
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Stop both frame loops, remove every listener and clear all state.
    ///
    /// Safe to call more than once. Must not be called from inside a host hook.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some(render_loop) = self.render_loop.take() {
            render_loop.cancel();
        }
        self.shared.cancel_inertia_loop();
        self.input.detach();
        *self.shared.hooks.borrow_mut() = HostHooks::default();
        self.shared.core.borrow_mut().teardown();
        log::debug!("canvas engine destroyed");
    }

    fn start_render_loop(&mut self, ctx: CanvasRenderingContext2d) -> Result<(), CanvasError> {
        let shared = Rc::clone(&self.shared);
        let mut painter = CanvasPainter::new(ctx);
        let render_loop = FrameLoop::start(move |_timestamp| {
            let Ok(mut core) = shared.core.try_borrow_mut() else {
                return LoopControl::Continue;
            };
            if let Err(err) = core.render_frame(&mut painter) {
                log::warn!("frame render failed: {err}");
            }
            LoopControl::Continue
        })?;
        self.render_loop = Some(render_loop);
        Ok(())
    }

    fn attach_listeners(&mut self) -> Result<(), CanvasError> {
        let window = web_sys::window().ok_or(CanvasError::NoWindow)?;
        let window_target: &EventTarget = window.as_ref();
        let canvas_target: EventTarget = self.shared.canvas.clone().into();

        for (event, phase) in [("mousedown", PointerPhase::Down), ("mousemove", PointerPhase::Move)] {
            let shared = Rc::clone(&self.shared);
            self.input.listen(&canvas_target, event, move |event| {
                if let Some(ev) = event.dyn_ref::<MouseEvent>() {
                    handle_mouse(&shared, ev, phase);
                }
            })?;
        }

        // Released outside the canvas still ends the gesture.
        let shared = Rc::clone(&self.shared);
        self.input.listen(window_target, "mouseup", move |event| {
            if let Some(ev) = event.dyn_ref::<MouseEvent>() {
                handle_mouse(&shared, ev, PointerPhase::Up);
            }
        })?;

        let shared = Rc::clone(&self.shared);
        self.input.listen(&canvas_target, "wheel", move |event| {
            if let Some(ev) = event.dyn_ref::<WheelEvent>() {
                ev.prevent_default();
                let position = local_point(&shared.canvas, f64::from(ev.client_x()), f64::from(ev.client_y()));
                shared
                    .core
                    .borrow_mut()
                    .on_wheel(position, WheelDelta { dx: ev.delta_x(), dy: ev.delta_y() });
            }
        })?;

        // Right-drag pans; keep the browser menu out of the way.
        self.input
            .listen(&canvas_target, "contextmenu", |event: Event| event.prevent_default())?;

        for (event, phase) in [
            ("touchstart", TouchPhase::Start),
            ("touchmove", TouchPhase::Move),
            ("touchend", TouchPhase::End),
            ("touchcancel", TouchPhase::Cancel),
        ] {
            let shared = Rc::clone(&self.shared);
            self.input.listen(&canvas_target, event, move |event| {
                if let Some(ev) = event.dyn_ref::<TouchEvent>() {
                    handle_touch(&shared, ev, phase);
                }
            })?;
        }

        // Keys reach only the focused canvas.
        self.shared.canvas.set_tab_index(0);
        let shared = Rc::clone(&self.shared);
        self.input.listen(&canvas_target, "keydown", move |event| {
            if let Some(ev) = event.dyn_ref::<KeyboardEvent>() {
                handle_key(&shared, ev);
            }
        })?;
        for (event, focused) in [("focus", true), ("blur", false)] {
            let shared = Rc::clone(&self.shared);
            self.input.listen(&canvas_target, event, move |_event| {
                shared.core.borrow_mut().set_focused(focused);
            })?;
        }

        let shared = Rc::clone(&self.shared);
        self.input.listen(window_target, "resize", move |_event| {
            if let Err(err) = resize_surface(&shared) {
                log::warn!("canvas resize failed: {err}");
            }
        })?;

        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.destroy();
    }
}

// =============================================================
// DOM event glue
// =============================================================

fn handle_mouse(shared: &Rc<Shared>, ev: &MouseEvent, phase: PointerPhase) {
    let position = local_point(&shared.canvas, f64::from(ev.client_x()), f64::from(ev.client_y()));
    let modifiers = Modifiers { shift: ev.shift_key(), ctrl: ev.ctrl_key(), alt: ev.alt_key(), meta: ev.meta_key() };
    let input = PointerInput::from_mouse(phase, position, ev.button(), modifiers, ev.time_stamp());
    if phase == PointerPhase::Down {
        if input.button.pans() {
            ev.prevent_default();
        }
        focus_canvas(&shared.canvas);
    }
    dispatch_pointer(shared, &input);
}

fn handle_touch(shared: &Rc<Shared>, ev: &TouchEvent, phase: TouchPhase) {
    ev.prevent_default();
    let changed = touch_points(&shared.canvas, &ev.changed_touches());
    let active = ev.touches().length() as usize;
    let input = shared
        .touch
        .borrow_mut()
        .handle(phase, &changed, active, ev.time_stamp());
    if let Some(input) = input {
        if input.phase == PointerPhase::Down {
            focus_canvas(&shared.canvas);
        }
        dispatch_pointer(shared, &input);
    }
}

fn focus_canvas(canvas: &HtmlCanvasElement) {
    if let Err(err) = canvas.focus() {
        log::debug!("canvas focus failed: {err:?}");
    }
}

fn handle_key(shared: &Rc<Shared>, ev: &KeyboardEvent) {
    if is_editable_target(ev) {
        return;
    }
    let key = Key::new(ev.key());
    let modifiers = Modifiers { shift: ev.shift_key(), ctrl: ev.ctrl_key(), alt: ev.alt_key(), meta: ev.meta_key() };
    if !key.is_binding(modifiers) {
        return;
    }
    ev.prevent_default();
    let actions = shared.core.borrow_mut().on_key_down(&key, modifiers);
    dispatch_actions(shared, actions);
}

fn dispatch_pointer(shared: &Rc<Shared>, input: &PointerInput) {
    if input.phase == PointerPhase::Down {
        shared.cancel_inertia_loop();
    }
    let (actions, inertia_started) = {
        let mut core = shared.core.borrow_mut();
        let actions = core.handle_pointer(input);
        (actions, input.phase == PointerPhase::Up && core.is_inertia_active())
    };
    if inertia_started {
        start_inertia_loop(shared);
    }
    dispatch_actions(shared, actions);
}

fn start_inertia_loop(shared: &Rc<Shared>) {
    shared.cancel_inertia_loop();
    let weak = Rc::downgrade(shared);
    let started = FrameLoop::start(move |_timestamp| {
        let Some(shared) = weak.upgrade() else {
            return LoopControl::Stop;
        };
        let Ok(mut core) = shared.core.try_borrow_mut() else {
            return LoopControl::Continue;
        };
        if core.step_inertia() { LoopControl::Continue } else { LoopControl::Stop }
    });
    match started {
        Ok(inertia_loop) => *shared.inertia_loop.borrow_mut() = Some(inertia_loop),
        Err(err) => {
            log::warn!("inertia unavailable: {err}");
            shared.core.borrow_mut().cancel_inertia();
        }
    }
}

/// Hooks run with no engine borrow held, so they may call back into the engine.
fn dispatch_actions(shared: &Rc<Shared>, actions: Vec<Action>) {
    for action in actions {
        match action {
            Action::ElementsMoved(ids) => {
                let hook = shared.hooks.borrow().on_elements_moved.clone();
                if let Some(hook) = hook {
                    hook(&ids);
                }
            }
            Action::ElementsDeleted(ids) => {
                let hook = shared.hooks.borrow().on_elements_deleted.clone();
                if let Some(hook) = hook {
                    hook(&ids);
                }
            }
            Action::SetCursor(cursor) => {
                if let Err(err) = shared.canvas.style().set_property("cursor", cursor.css()) {
                    log::debug!("cursor update failed: {err:?}");
                }
            }
        }
    }
}

fn resize_surface(shared: &Shared) -> Result<(), CanvasError> {
    let window = web_sys::window().ok_or(CanvasError::NoWindow)?;
    let (width, height) = match shared.canvas.parent_element() {
        Some(parent) => (f64::from(parent.client_width()), f64::from(parent.client_height())),
        None => (f64::from(shared.canvas.client_width()), f64::from(shared.canvas.client_height())),
    };
    let width = width.max(1.0);
    let height = height.max(1.0);
    let dpr = window.device_pixel_ratio().max(1.0);

    shared.canvas.set_width(backing_pixels(width, dpr));
    shared.canvas.set_height(backing_pixels(height, dpr));
    let style = shared.canvas.style();
    style.set_property("width", &format!("{width}px"))?;
    style.set_property("height", &format!("{height}px"))?;

    shared.core.borrow_mut().set_viewport(width, height, dpr);
    log::debug!("canvas resized to {width}x{height} at {dpr}x");
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn backing_pixels(css_px: f64, dpr: f64) -> u32 {
    (css_px * dpr).round().max(1.0) as u32
}

/// Client coordinates to canvas-relative CSS pixels.
fn local_point(canvas: &HtmlCanvasElement, client_x: f64, client_y: f64) -> Point {
    let rect = canvas.get_bounding_client_rect();
    Point::new(client_x - rect.left(), client_y - rect.top())
}

fn touch_points(canvas: &HtmlCanvasElement, list: &TouchList) -> Vec<TouchPoint> {
    (0..list.length())
        .filter_map(|i| list.get(i))
        .map(|touch| TouchPoint {
            id: touch.identifier(),
            position: local_point(canvas, f64::from(touch.client_x()), f64::from(touch.client_y())),
        })
        .collect()
}

/// Keys typed into host form fields are not canvas shortcuts.
fn is_editable_target(ev: &KeyboardEvent) -> bool {
    let Some(target) = ev.target() else {
        return false;
    };
    let Some(element) = target.dyn_ref::<HtmlElement>() else {
        return false;
    };
    element.is_content_editable() || matches!(element.tag_name().as_str(), "INPUT" | "TEXTAREA" | "SELECT")
}
