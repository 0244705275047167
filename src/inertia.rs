//! Pan inertia: velocity measured during a pan, decayed after release.
//!
//! Velocity is measured in screen pixels per millisecond. Each step yields
//! `velocity * step_scale` as the camera position delta for one frame and
//! multiplies velocity by the friction factor; the motion ends once both
//! components drop below epsilon.

#[cfg(test)]
#[path = "inertia_test.rs"]
mod inertia_test;

use crate::camera::Point;
use crate::config::EngineConfig;
use crate::consts::MIN_VELOCITY_DT_MS;

#[derive(Debug, Clone)]
pub struct Inertia {
    velocity: Point,
    active: bool,
    friction: f64,
    epsilon: f64,
    step_scale: f64,
}

impl Default for Inertia {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl Inertia {
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            velocity: Point::default(),
            active: false,
            friction: config.inertia_friction,
            epsilon: config.inertia_epsilon,
            step_scale: config.inertia_step_scale,
        }
    }

    #[must_use]
    pub fn velocity(&self) -> Point {
        self.velocity
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Record the pan velocity for a pointer that moved `(dx, dy)` screen pixels in `dt_ms`.
    ///
    /// The camera moves opposite to the pointer, so the stored velocity is negated.
    pub fn record(&mut self, dx: f64, dy: f64, dt_ms: f64) {
        let dt = if dt_ms.is_finite() { dt_ms.max(MIN_VELOCITY_DT_MS) } else { MIN_VELOCITY_DT_MS };
        self.velocity = Point::new(-dx / dt, -dy / dt);
    }

    /// Begin decaying the recorded velocity. Returns whether there is any motion to run.
    pub fn release(&mut self) -> bool {
        self.active = self.above_epsilon();
        if !self.active {
            self.velocity = Point::default();
        }
        self.active
    }

    /// Stop immediately and forget the velocity.
    pub fn cancel(&mut self) {
        self.active = false;
        self.velocity = Point::default();
    }

    /// Advance one frame. Returns the camera position delta to apply, or
    /// `None` once the motion has died out.
    pub fn step(&mut self) -> Option<Point> {
        if !self.active {
            return None;
        }
        if !self.above_epsilon() {
            self.cancel();
            return None;
        }
        let delta = Point::new(self.velocity.x * self.step_scale, self.velocity.y * self.step_scale);
        self.velocity.x *= self.friction;
        self.velocity.y *= self.friction;
        Some(delta)
    }

    fn above_epsilon(&self) -> bool {
        self.velocity.x.abs() >= self.epsilon || self.velocity.y.abs() >= self.epsilon
    }
}
