#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

#[test]
fn new_inertia_is_idle() {
    let mut inertia = Inertia::default();
    assert!(!inertia.is_active());
    assert_eq!(inertia.step(), None);
}

#[test]
fn record_negates_pointer_motion() {
    let mut inertia = Inertia::default();
    inertia.record(20.0, -10.0, 10.0);
    assert!(approx_eq(inertia.velocity().x, -2.0));
    assert!(approx_eq(inertia.velocity().y, 1.0));
}

#[test]
fn record_guards_zero_and_negative_dt() {
    let mut inertia = Inertia::default();
    inertia.record(5.0, 5.0, 0.0);
    assert!(inertia.velocity().x.is_finite());
    assert!(approx_eq(inertia.velocity().x, -5.0));

    inertia.record(5.0, 5.0, -16.0);
    assert!(approx_eq(inertia.velocity().y, -5.0));

    inertia.record(5.0, 5.0, f64::NAN);
    assert!(inertia.velocity().x.is_finite());
}

#[test]
fn release_below_epsilon_does_not_start() {
    let mut inertia = Inertia::default();
    inertia.record(0.001, 0.0, 1.0);
    assert!(!inertia.release());
    assert_eq!(inertia.velocity(), Point::default());
}

#[test]
fn step_applies_scale_then_friction() {
    let mut inertia = Inertia::default();
    inertia.record(-1.0, 0.0, 1.0);
    assert!(inertia.release());

    let first = inertia.step().unwrap();
    assert!(approx_eq(first.x, 10.0));
    assert!(approx_eq(first.y, 0.0));
    assert!(approx_eq(inertia.velocity().x, 0.95));

    let second = inertia.step().unwrap();
    assert!(approx_eq(second.x, 9.5));
}

#[test]
fn steps_terminate() {
    let mut inertia = Inertia::default();
    inertia.record(-50.0, 30.0, 1.0);
    assert!(inertia.release());
    let mut steps = 0;
    while inertia.step().is_some() {
        steps += 1;
        assert!(steps < 1000, "inertia never decayed");
    }
    assert!(!inertia.is_active());
    assert_eq!(inertia.velocity(), Point::default());
    // 50 * 0.95^n < 0.01  =>  n = 167
    assert_eq!(steps, 167);
}

#[test]
fn cancel_stops_active_motion() {
    let mut inertia = Inertia::default();
    inertia.record(-5.0, 0.0, 1.0);
    inertia.release();
    inertia.cancel();
    assert!(!inertia.is_active());
    assert_eq!(inertia.step(), None);
}

#[test]
fn config_values_are_used() {
    let config = EngineConfig { inertia_friction: 0.5, inertia_step_scale: 1.0, ..Default::default() };
    let mut inertia = Inertia::from_config(&config);
    inertia.record(-1.0, 0.0, 1.0);
    inertia.release();
    assert!(approx_eq(inertia.step().unwrap().x, 1.0));
    assert!(approx_eq(inertia.step().unwrap().x, 0.5));
}
