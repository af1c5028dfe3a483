use bevy_math::{Quat, Vec3};
use reckon_core::prelude::KinematicState;

/// Hard ceiling on how far ahead extrapolation is trusted, seconds.
/// Beyond this (or for negative elapsed) callers fall back to the last
/// known pose instead of trusting the predictor.
pub const PREDICTION_LIMIT: f64 = 10.0;

/// Angular speeds below this are treated as no rotation at all, to keep the
/// arc integral away from division by zero.
const MIN_ANGULAR_SPEED: f32 = 1e-6;

/// Result of extrapolating a [`KinematicState`] forward in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictedMotion {
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Quat,
}

/// True iff `elapsed` lies inside the trusted prediction range.
pub fn trusted_elapsed(elapsed: f64) -> bool {
    (0.0..=PREDICTION_LIMIT).contains(&elapsed)
}

/// Extrapolate `origin` forward by `elapsed` seconds. Pure, deterministic,
/// no side effects.
///
/// Samples whose circular angular speed magnitude reaches `circle_threshold`
/// (degrees/second) are extrapolated along a circular arc: a vehicle turning
/// at constant rate should predict a curved path rather than the straight
/// tangent, or lateral error grows rapidly with delay. Everything else gets
/// quadratic dead reckoning.
pub fn predict_state(
    origin: &KinematicState,
    circle_threshold: f32,
    elapsed: f64,
) -> PredictedMotion {
    let t = elapsed as f32;
    let omega = origin.angular_velocity;
    let angular_speed = omega.length();

    if origin.circular_speed.abs() >= circle_threshold && angular_speed > MIN_ANGULAR_SPEED {
        let axis = omega / angular_speed;
        let angle = angular_speed * t;
        let delta = Quat::from_axis_angle(axis, angle);

        // Closed-form integral of the rotating velocity vector: the
        // axis-parallel part integrates linearly, the perpendicular part
        // traces a circular arc.
        let v_par = axis * origin.velocity.dot(axis);
        let v_perp = origin.velocity - v_par;
        let displacement = v_par * t
            + v_perp * (angle.sin() / angular_speed)
            + axis.cross(v_perp) * ((1.0 - angle.cos()) / angular_speed);

        PredictedMotion {
            position: origin.position + displacement,
            velocity: delta * origin.velocity,
            rotation: (delta * origin.rotation).normalize(),
        }
    } else {
        PredictedMotion {
            position: origin.position + origin.velocity * t + 0.5 * origin.acceleration * t * t,
            velocity: origin.velocity + origin.acceleration * t,
            rotation: (Quat::from_scaled_axis(omega * t) * origin.rotation).normalize(),
        }
    }
}
