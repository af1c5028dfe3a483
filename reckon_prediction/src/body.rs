/*! Physical-body interface components.

The sync engine never talks to a physics engine directly: the body is a
[`bevy_transform::components::Transform`] plus these velocity components,
written by whatever integrates the simulation. When the engine moves a body
to an externally decided pose (backlog interpolation), it zeroes these first
so the integrator does not fight the new pose.
*/
use bevy_ecs::prelude::*;
use bevy_math::Vec3;
use bevy_reflect::Reflect;

/// Linear velocity of the physical body, m/s, world space.
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct LinearVelocity(pub Vec3);

/// Angular velocity of the physical body, rad/s, world space.
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct AngularVelocity(pub Vec3);
