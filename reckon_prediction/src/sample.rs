/*! Owner-side kinematic sampling.

Every frame the owner condenses its live body into a [`KinematicState`]: raw
pose and velocity, a short-window averaged acceleration, and the signed rate
at which the horizontal velocity direction is turning. The send controller
decides whether that sample is worth putting on the wire.
*/
use bevy_ecs::prelude::*;
use bevy_math::Vec3;
use bevy_reflect::Reflect;
use bevy_time::Time;
use bevy_transform::components::Transform;

use reckon_core::prelude::{KinematicState, LocalPeer, Owner, SyncClock, SyncDisabled};

use crate::body::{AngularVelocity, LinearVelocity};

/// Acceleration is averaged over this many frames to keep single-frame
/// physics spikes out of the quadratic prediction term.
const ACCELERATION_WINDOW: usize = 3;

/// Per-entity sampling state for the owning peer.
///
/// Untouched on non-owners; kept in sync with the live body by
/// [`sample_kinematics`].
#[derive(Component, Debug, Default, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub struct KinematicSampler {
    latest: KinematicState,
    last_velocity: Vec3,
    accelerations: [Vec3; ACCELERATION_WINDOW],
    cursor: usize,
    initialized: bool,
}

impl KinematicSampler {
    /// The most recent condensed sample, or `None` until two frames of
    /// velocity history exist.
    pub fn latest(&self) -> Option<&KinematicState> {
        self.initialized.then_some(&self.latest)
    }

    fn averaged_acceleration(&mut self, acceleration: Vec3) -> Vec3 {
        self.accelerations[self.cursor] = acceleration;
        self.cursor = (self.cursor + 1) % ACCELERATION_WINDOW;
        self.accelerations.iter().sum::<Vec3>() / ACCELERATION_WINDOW as f32
    }
}

/// Signed turn rate of the horizontal velocity direction, degrees per
/// second. Positive is counter-clockwise seen from above. Zero when either
/// velocity is too slow to have a meaningful direction.
fn circular_speed(previous: Vec3, current: Vec3, dt: f32) -> f32 {
    let previous = Vec3::new(previous.x, 0.0, previous.z);
    let current = Vec3::new(current.x, 0.0, current.z);
    const MIN_SPEED_SQ: f32 = 1e-6;
    if previous.length_squared() < MIN_SPEED_SQ || current.length_squared() < MIN_SPEED_SQ {
        return 0.0;
    }
    let angle = previous.angle_between(current).to_degrees();
    let sign = if previous.cross(current).y >= 0.0 { 1.0 } else { -1.0 };
    sign * angle / dt
}

/// Condense the live body of every locally-owned entity into a fresh
/// [`KinematicState`] stamped with the current network time.
pub fn sample_kinematics(
    time: Res<Time>,
    clock: Res<SyncClock>,
    local: Res<LocalPeer>,
    mut query: Query<
        (
            &Owner,
            &Transform,
            &LinearVelocity,
            &AngularVelocity,
            &mut KinematicSampler,
        ),
        Without<SyncDisabled>,
    >,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }
    let now = clock.now_network();
    for (owner, transform, linear, angular, mut sampler) in query.iter_mut() {
        if !owner.is_local(&local) {
            continue;
        }
        let acceleration = if sampler.initialized {
            let raw = (linear.0 - sampler.last_velocity) / dt;
            sampler.averaged_acceleration(raw)
        } else {
            Vec3::ZERO
        };
        let turn = circular_speed(sampler.last_velocity, linear.0, dt);
        sampler.latest = KinematicState {
            position: transform.translation,
            rotation: transform.rotation,
            velocity: linear.0,
            acceleration,
            angular_velocity: angular.0,
            circular_speed: turn,
            send_time: now,
        };
        sampler.last_velocity = linear.0;
        sampler.initialized = true;
    }
}
