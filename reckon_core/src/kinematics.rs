use bevy_math::{Quat, Vec3};
use bevy_reflect::Reflect;

/// One complete kinematic sample of a rigid body at a point in time.
///
/// This is the unit of synchronization: the owner captures one per send, the
/// receivers keep three of them (synced/working/previous-working) as anchors
/// for dead reckoning.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct KinematicState {
    pub position: Vec3,
    /// Unit quaternion. Always finite and normalized; corrupt inbound
    /// samples are rejected at decode, before they reach this type.
    pub rotation: Quat,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    /// World-space angular velocity, radians per second.
    pub angular_velocity: Vec3,
    /// Signed turn rate of the velocity direction, degrees per second.
    /// Selects the circular motion model once its magnitude reaches the
    /// circle threshold.
    pub circular_speed: f32,
    /// Network-clock time at which this sample was captured, in seconds.
    pub send_time: f64,
}

impl Default for KinematicState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            circular_speed: 0.0,
            send_time: 0.0,
        }
    }
}

impl KinematicState {
    /// A resting sample at the given pose.
    pub fn at_pose(position: Vec3, rotation: Quat, send_time: f64) -> Self {
        Self {
            position,
            rotation,
            send_time,
            ..Default::default()
        }
    }

    /// True iff every field is finite (no NaN/Inf anywhere).
    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.rotation.is_finite()
            && self.velocity.is_finite()
            && self.acceleration.is_finite()
            && self.angular_velocity.is_finite()
            && self.circular_speed.is_finite()
            && self.send_time.is_finite()
    }
}
