/*! The per-frame reconciliation tick for non-owned bodies. */
use bevy_ecs::prelude::*;
use bevy_math::Vec3;
use bevy_transform::components::Transform;
use tracing::trace;

use reckon_core::prelude::{LocalPeer, Owner, SyncClock, SyncDisabled, SyncSettings};

use crate::backlog::PoseBacklog;
use crate::blend::{blend_factor, blend_progress};
use crate::body::{AngularVelocity, LinearVelocity};
use crate::predict::{predict_state, trusted_elapsed};
use crate::state::SyncState;

/// Reconstruct a plausible pose for every body the local peer does not own.
///
/// Priority order per frame: teleport snap, backlog interpolation, stale
/// fallback, dual-anchor blended prediction (with a desync snap when the two
/// predictions disagree by more than the teleport distance).
pub fn predict_tick(
    clock: Res<SyncClock>,
    local: Res<LocalPeer>,
    mut query: Query<
        (
            Entity,
            &Owner,
            &SyncSettings,
            &mut SyncState,
            &PoseBacklog,
            &mut Transform,
            &mut LinearVelocity,
            &mut AngularVelocity,
        ),
        Without<SyncDisabled>,
    >,
) {
    let now = clock.now_network();
    for (entity, owner, settings, mut state, backlog, mut transform, mut linear, mut angular) in
        query.iter_mut()
    {
        if owner.is_local(&local) {
            continue;
        }

        // 1. Explicit teleports are never blended: interpolating would drag
        //    the body along the straight line between old and new positions.
        if state.teleport_triggered() {
            trace!(?entity, "teleport triggered, snapping");
            state.acknowledge_teleport();
            state.snap_previous_to_working();
            transform.translation = state.working().position;
            transform.rotation = state.working().rotation;
            continue;
        }

        // 2. Real received samples beat any extrapolation.
        let interpolation_time = now - settings.prediction_reduction as f64;
        if let Some((position, rotation)) = backlog.interpolate(interpolation_time) {
            // the integrator must not fight an externally-set pose
            linear.0 = Vec3::ZERO;
            angular.0 = Vec3::ZERO;
            transform.translation = position;
            transform.rotation = rotation;
            continue;
        }

        // 3. Stale or clock-inconsistent data is not worth extrapolating.
        let elapsed = now - state.working().send_time;
        if !trusted_elapsed(elapsed) {
            trace!(?entity, elapsed, "elapsed outside trusted range, holding last pose");
            state.snap_previous_to_working();
            transform.translation = state.working().position;
            transform.rotation = state.working().rotation;
            continue;
        }

        // 4. Two parallel predictions, blended to bleed out stale error.
        let new = predict_state(state.working(), settings.circle_threshold, elapsed);
        let previous_elapsed =
            now - state.previous_working().send_time - settings.prediction_reduction as f64;
        let old = predict_state(
            state.previous_working(),
            settings.circle_threshold,
            previous_elapsed,
        );

        if old.position.distance(new.position) > settings.teleport_distance {
            // desync between the two roots: snap, don't blend
            trace!(?entity, "prediction divergence beyond teleport distance, snapping");
            state.snap_previous_to_working();
            transform.translation = new.position;
            transform.rotation = new.rotation;
            continue;
        }

        let factor = blend_factor(
            blend_progress(now, state.receive_time(), settings.error_correction_duration),
            settings.error_correction_softness,
        );
        transform.translation = old.position.lerp(new.position, factor);
        transform.rotation = old.rotation.slerp(new.rotation, factor);

        if settings.debug_trails {
            trace!(
                ?entity,
                received = ?state.working().position,
                raw = ?new.position,
                smoothed = ?transform.translation,
                "prediction trail"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_math::Quat;
    use reckon_core::prelude::{KinematicState, PeerId};
    use test_log::test;

    const LOCAL: PeerId = PeerId(1);
    const REMOTE: PeerId = PeerId(2);

    fn world_with(clock_now: f64, settings: SyncSettings) -> (World, Entity) {
        let mut world = World::new();
        let mut clock = SyncClock::default();
        clock.advance(clock_now);
        world.insert_resource(clock);
        world.insert_resource(LocalPeer(LOCAL));
        let entity = world
            .spawn((Owner(REMOTE), settings, SyncState::default()))
            .id();
        (world, entity)
    }

    fn run_tick(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(predict_tick);
        schedule.run(world);
    }

    #[test]
    fn owned_bodies_are_left_alone() {
        let (mut world, entity) = world_with(1.0, SyncSettings::default());
        world.entity_mut(entity).insert(Owner(LOCAL));
        world.entity_mut(entity).get_mut::<SyncState>().unwrap().capture(
            KinematicState {
                position: Vec3::splat(9.0),
                send_time: 0.0,
                ..Default::default()
            },
        );
        run_tick(&mut world);
        assert_eq!(
            world.entity(entity).get::<Transform>().unwrap().translation,
            Vec3::ZERO
        );
    }

    #[test]
    fn predicts_constant_velocity_forward() {
        let settings = SyncSettings {
            error_correction_duration: 0.0,
            ..Default::default()
        };
        let (mut world, entity) = world_with(0.0625, settings.clone());
        let snapshot = KinematicState {
            velocity: Vec3::new(4.0, 0.0, 0.0),
            send_time: 0.0,
            ..Default::default()
        };
        world
            .entity_mut(entity)
            .get_mut::<SyncState>()
            .unwrap()
            .adopt_snapshot(snapshot, false, 0.0, 0.0, &settings);

        run_tick(&mut world);

        let transform = world.entity(entity).get::<Transform>().unwrap();
        assert!(
            transform
                .translation
                .distance(Vec3::new(4.0 * 0.0625, 0.0, 0.0))
                < 1e-5
        );
    }

    #[test]
    fn teleport_snaps_without_blending() {
        let settings = SyncSettings::default();
        let (mut world, entity) = world_with(1.0, settings.clone());
        let snapshot = KinematicState {
            position: Vec3::new(50.0, 0.0, 0.0),
            velocity: Vec3::new(4.0, 0.0, 0.0),
            send_time: 1.0,
            ..Default::default()
        };
        world
            .entity_mut(entity)
            .get_mut::<SyncState>()
            .unwrap()
            .adopt_snapshot(snapshot, true, 1.0, 1.0, &settings);

        run_tick(&mut world);

        let transform = world.entity(entity).get::<Transform>().unwrap();
        // exact snap to the working pose, no extrapolation this frame
        assert_eq!(transform.translation, Vec3::new(50.0, 0.0, 0.0));
        // edge-triggered: the next tick predicts normally again
        assert!(
            !world
                .entity(entity)
                .get::<SyncState>()
                .unwrap()
                .teleport_triggered()
        );
    }

    #[test]
    fn stale_anchor_holds_last_known_pose() {
        let settings = SyncSettings {
            error_correction_duration: 0.0,
            ..Default::default()
        };
        let (mut world, entity) = world_with(20.0, settings.clone());
        let snapshot = KinematicState {
            position: Vec3::new(3.0, 0.0, 0.0),
            velocity: Vec3::new(4.0, 0.0, 0.0),
            send_time: 1.0,
            ..Default::default()
        };
        world
            .entity_mut(entity)
            .get_mut::<SyncState>()
            .unwrap()
            .adopt_snapshot(snapshot, false, 1.1, 1.1, &settings);

        run_tick(&mut world);

        // 19 s since send: beyond the prediction limit, hold position
        let transform = world.entity(entity).get::<Transform>().unwrap();
        assert_eq!(transform.translation, Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn backlog_interpolation_wins_over_extrapolation() {
        let settings = SyncSettings {
            error_correction_duration: 0.0,
            ..Default::default()
        };
        let (mut world, entity) = world_with(1.5, settings.clone());
        {
            let mut entity_mut = world.entity_mut(entity);
            let mut state = entity_mut.get_mut::<SyncState>().unwrap();
            state.adopt_snapshot(
                KinematicState {
                    position: Vec3::new(8.0, 0.0, 0.0),
                    velocity: Vec3::new(100.0, 0.0, 0.0),
                    send_time: 1.4,
                    ..Default::default()
                },
                false,
                1.4,
                1.4,
                &settings,
            );
            let mut backlog = entity_mut.get_mut::<PoseBacklog>().unwrap();
            backlog.push(1.0, Vec3::ZERO, Quat::IDENTITY);
            backlog.push(2.0, Vec3::new(4.0, 0.0, 0.0), Quat::IDENTITY);
            let mut linear = entity_mut.get_mut::<LinearVelocity>().unwrap();
            linear.0 = Vec3::new(100.0, 0.0, 0.0);
        }

        run_tick(&mut world);

        let transform = world.entity(entity).get::<Transform>().unwrap();
        // halfway between the two backlog samples, not the wild extrapolation
        assert!(transform.translation.distance(Vec3::new(2.0, 0.0, 0.0)) < 1e-5);
        // the body's own velocity was zeroed before moving it
        assert_eq!(
            world.entity(entity).get::<LinearVelocity>().unwrap().0,
            Vec3::ZERO
        );
    }

    /// Two snapshots 100 m apart within 0.05 s: the receiver must snap to
    /// the new prediction, not blend through the gap.
    #[test]
    fn divergence_beyond_teleport_distance_snaps() {
        let settings = SyncSettings {
            teleport_distance: 50.0,
            ..Default::default()
        };
        let (mut world, entity) = world_with(1.06, settings.clone());
        {
            let mut entity_mut = world.entity_mut(entity);
            let mut state = entity_mut.get_mut::<SyncState>().unwrap();
            state.adopt_snapshot(
                KinematicState::at_pose(Vec3::ZERO, Quat::IDENTITY, 1.0),
                false,
                1.0,
                1.0,
                &settings,
            );
            state.adopt_snapshot(
                KinematicState::at_pose(Vec3::new(100.0, 0.0, 0.0), Quat::IDENTITY, 1.05),
                false,
                1.05,
                1.05,
                &settings,
            );
        }

        run_tick(&mut world);

        let transform = world.entity(entity).get::<Transform>().unwrap();
        assert!(transform.translation.distance(Vec3::new(100.0, 0.0, 0.0)) < 1e-4);
        // previous anchor collapsed onto working: next frame blends cleanly
        let state = world.entity(entity).get::<SyncState>().unwrap();
        assert_eq!(
            state.previous_working().position,
            state.working().position
        );
    }
}
