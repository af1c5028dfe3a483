use bevy_app::{App, Plugin, Update};
use bevy_ecs::prelude::*;
use reckon_core::prelude::SyncSettings;

use crate::backlog::PoseBacklog;
use crate::body::{AngularVelocity, LinearVelocity};
use crate::sample::{sample_kinematics, KinematicSampler};
use crate::state::SyncState;
use crate::teleport::{
    auto_respawn, capture_spawn_pose, handle_teleport_requests, Respawned, SpawnPose,
    TeleportRequest,
};
use crate::tick::predict_tick;

/// Ordered phases of a synchronization frame.
///
/// Owner work (sampling, send decision) runs before receiver work
/// (prediction) so that a peer that just gained ownership acts on the same
/// frame's pose.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncSet {
    /// Owners condense the live body into a kinematic sample.
    VelocitySample,
    /// Owners decide whether the sample goes on the wire, and serialize it.
    SendDecision,
    /// Non-owners reconstruct a pose from the anchors.
    PredictionTick,
    /// Teleports and respawns, applied after the regular reconstruction.
    LateCorrection,
}

/// Size the snapshot history to whatever the entity's settings ask for.
fn apply_backlog_capacity(
    trigger: Trigger<OnAdd, SyncSettings>,
    mut query: Query<(&SyncSettings, &mut PoseBacklog)>,
) {
    if let Ok((settings, mut backlog)) = query.get_mut(trigger.target()) {
        backlog.set_capacity(settings.backlog_capacity);
    }
}

pub struct PredictionPlugin;

impl Plugin for PredictionPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<SyncState>()
            .register_type::<PoseBacklog>()
            .register_type::<KinematicSampler>()
            .register_type::<SpawnPose>()
            .register_type::<LinearVelocity>()
            .register_type::<AngularVelocity>();

        app.add_event::<TeleportRequest>();
        app.add_event::<Respawned>();

        app.configure_sets(
            Update,
            (
                SyncSet::VelocitySample,
                SyncSet::SendDecision,
                SyncSet::PredictionTick,
                SyncSet::LateCorrection,
            )
                .chain(),
        );

        app.add_observer(capture_spawn_pose);
        app.add_observer(apply_backlog_capacity);
        app.add_systems(Update, sample_kinematics.in_set(SyncSet::VelocitySample));
        app.add_systems(Update, predict_tick.in_set(SyncSet::PredictionTick));
        app.add_systems(
            Update,
            (handle_teleport_requests, auto_respawn)
                .chain()
                .in_set(SyncSet::LateCorrection),
        );
    }
}
