//! Engine tuning: zoom limits, fit padding, inertia, and visual defaults.
//!
//! Hosts may pass a JSON object with any subset of fields; missing fields take
//! the defaults from [`crate::consts`]. Out-of-range values are normalized
//! rather than rejected so a bad config never prevents the canvas from mounting.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};

use crate::camera::normalize_zoom_limits;
use crate::consts::*;
use crate::error::CanvasError;

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Multiplier for a zoom-in wheel step (> 1).
    pub zoom_in_factor: f64,
    /// Multiplier for a zoom-out wheel step (< 1).
    pub zoom_out_factor: f64,
    /// Screen-space margin kept around content by fit-to-view.
    pub fit_padding: f64,
    pub inertia_friction: f64,
    pub inertia_epsilon: f64,
    pub inertia_step_scale: f64,
    pub grid_enabled: bool,
    pub grid_size: f64,
    pub background_color: String,
    pub grid_color: String,
    pub selection_fill: String,
    pub selection_stroke: String,
    pub show_debug_overlay: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            zoom_in_factor: ZOOM_IN_FACTOR,
            zoom_out_factor: ZOOM_OUT_FACTOR,
            fit_padding: FIT_PADDING_PX,
            inertia_friction: INERTIA_FRICTION,
            inertia_epsilon: INERTIA_EPSILON,
            inertia_step_scale: INERTIA_STEP_SCALE,
            grid_enabled: true,
            grid_size: GRID_SIZE,
            background_color: BACKGROUND_COLOR.to_owned(),
            grid_color: GRID_COLOR.to_owned(),
            selection_fill: SELECTION_FILL.to_owned(),
            selection_stroke: SELECTION_STROKE.to_owned(),
            show_debug_overlay: true,
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON config and normalize it.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidConfig`] if `json` is not a valid config object.
    pub fn from_json(json: &str) -> Result<Self, CanvasError> {
        let config: Self = serde_json::from_str(json).map_err(CanvasError::InvalidConfig)?;
        Ok(config.normalized())
    }

    /// Replace values that would break the engine's invariants with safe ones.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let (min_zoom, max_zoom) = normalize_zoom_limits(self.min_zoom, self.max_zoom);
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;

        if !(self.zoom_in_factor.is_finite() && self.zoom_in_factor > 1.0) {
            self.zoom_in_factor = ZOOM_IN_FACTOR;
        }
        if !(self.zoom_out_factor.is_finite() && self.zoom_out_factor > 0.0 && self.zoom_out_factor < 1.0) {
            self.zoom_out_factor = ZOOM_OUT_FACTOR;
        }
        if !(self.fit_padding.is_finite() && self.fit_padding >= 0.0) {
            self.fit_padding = FIT_PADDING_PX;
        }
        // Friction must decay, or inertia would never terminate.
        if !(self.inertia_friction.is_finite() && self.inertia_friction >= 0.0 && self.inertia_friction < 1.0) {
            self.inertia_friction = INERTIA_FRICTION;
        }
        if !(self.inertia_epsilon.is_finite() && self.inertia_epsilon > 0.0) {
            self.inertia_epsilon = INERTIA_EPSILON;
        }
        if !(self.inertia_step_scale.is_finite() && self.inertia_step_scale >= 0.0) {
            self.inertia_step_scale = INERTIA_STEP_SCALE;
        }
        if !(self.grid_size.is_finite() && self.grid_size > 0.0) {
            self.grid_size = GRID_SIZE;
        }
        self
    }
}
