//! Teleports and respawns across the link.
use std::time::Duration;

use bevy_math::{Quat, Vec3};
use bevy_transform::components::Transform;
use reckon_tests::prelude::*;
use test_log::test;

const FRAME: Duration = Duration::from_micros(15_625);

#[test]
fn owner_teleport_snaps_the_remote() {
    let settings = SyncSettings {
        send_rate_hz: 8.0,
        ..Default::default()
    };
    let mut stepper = SyncStepper::with_frame(settings, FRAME);
    for _ in 0..16 {
        stepper.drive_owner(Vec3::new(4.0, 0.0, 0.0));
    }
    // come to rest so the teleported snapshot carries no residual motion
    for _ in 0..16 {
        stepper.drive_owner(Vec3::ZERO);
    }

    let target = Vec3::new(500.0, 2.0, -40.0);
    stepper.owner_app.world_mut().send_event(TeleportRequest {
        entity: stepper.owner_entity,
        position: target,
        rotation: Quat::IDENTITY,
    });
    // one frame applies the teleport, the next sends the flagged snapshot
    for _ in 0..12 {
        stepper.frame_step();
    }

    assert_eq!(stepper.owner_position(), target);
    let error = stepper.remote_position().distance(target);
    assert!(error < 1e-3, "remote is {error} m from the teleport target");
}

#[test]
fn remote_never_renders_the_midpoint_of_a_teleport() {
    let settings = SyncSettings {
        send_rate_hz: 8.0,
        ..Default::default()
    };
    let mut stepper = SyncStepper::with_frame(settings, FRAME);
    stepper.frame_steps(8);

    let target = Vec3::new(500.0, 0.0, 0.0);
    stepper.owner_app.world_mut().send_event(TeleportRequest {
        entity: stepper.owner_entity,
        position: target,
        rotation: Quat::IDENTITY,
    });
    for _ in 0..12 {
        stepper.frame_step();
        let x = stepper.remote_position().x;
        // either still at the origin or fully at the target, never between
        assert!(
            x < 1.0 || (x - 500.0).abs() < 1.0,
            "remote rendered a blended teleport at x={x}"
        );
    }
    assert_eq!(stepper.remote_position(), target);
}

#[test]
fn non_owner_teleport_request_is_rejected() {
    let settings = SyncSettings::default();
    let mut stepper = SyncStepper::with_frame(settings, FRAME);
    stepper.frame_steps(4);

    stepper.remote_app.world_mut().send_event(TeleportRequest {
        entity: stepper.remote_entity,
        position: Vec3::new(123.0, 0.0, 0.0),
        rotation: Quat::IDENTITY,
    });
    stepper.frame_steps(4);

    assert!(
        stepper.remote_position().distance(Vec3::new(123.0, 0.0, 0.0)) > 100.0,
        "non-owner teleport must not move the body"
    );
    let state = stepper
        .remote_app
        .world()
        .entity(stepper.remote_entity)
        .get::<SyncState>()
        .unwrap();
    assert!(!state.teleport_toggle());
}

#[test]
fn falling_owner_respawns_at_its_spawn_pose() {
    let settings = SyncSettings {
        respawn_height: -100.0,
        ..Default::default()
    };
    let mut stepper = SyncStepper::with_frame(settings, FRAME);
    stepper.frame_steps(2);

    stepper
        .owner_app
        .world_mut()
        .entity_mut(stepper.owner_entity)
        .get_mut::<Transform>()
        .unwrap()
        .translation = Vec3::new(30.0, -150.0, 0.0);
    stepper.frame_steps(2);

    // spawn pose was the origin, brought back slightly raised
    assert!(stepper.owner_position().distance(Vec3::new(0.0, 0.05, 0.0)) < 1e-4);
}
