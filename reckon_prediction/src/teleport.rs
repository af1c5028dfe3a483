/*! Owner-initiated teleports and the out-of-bounds respawn rule. */
use bevy_ecs::prelude::*;
use bevy_math::{Quat, Vec3};
use bevy_reflect::Reflect;
use bevy_transform::components::Transform;
use tracing::{debug, warn};

use reckon_core::prelude::{LocalPeer, Owner, SyncDisabled, SyncError, SyncSettings};

use crate::body::{AngularVelocity, LinearVelocity};
use crate::state::SyncState;

/// Pose the entity had when synchronization was attached; the respawn target.
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct SpawnPose {
    pub position: Vec3,
    pub rotation: Quat,
}

/// Ask for an instant relocation of a locally-owned body.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct TeleportRequest {
    pub entity: Entity,
    pub position: Vec3,
    pub rotation: Quat,
}

/// Raised after a body fell below the respawn height and was put back at its
/// spawn pose.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Respawned {
    pub entity: Entity,
}

/// Record the spawn pose when a body first becomes synchronized.
pub(crate) fn capture_spawn_pose(
    trigger: Trigger<OnAdd, SyncState>,
    query: Query<&Transform>,
    mut commands: Commands,
) {
    let entity = trigger.target();
    let Ok(transform) = query.get(entity) else {
        return;
    };
    commands.entity(entity).insert(SpawnPose {
        position: transform.translation,
        rotation: transform.rotation,
    });
}

/// Instantly relocate a body, flagging the move so receivers snap instead of
/// blending through the gap.
///
/// Only the owner may teleport; a non-owner call fails without touching the
/// state.
pub fn teleport_to(
    state: &mut SyncState,
    transform: &mut Transform,
    is_owner: bool,
    position: Vec3,
    rotation: Quat,
) -> Result<(), SyncError> {
    if !is_owner {
        return Err(SyncError::NotOwner);
    }
    if !(position.is_finite() && rotation.is_finite()) {
        return Err(SyncError::InvalidSample);
    }
    state.teleport(position, rotation);
    transform.translation = position;
    transform.rotation = rotation;
    Ok(())
}

pub(crate) fn handle_teleport_requests(
    local: Res<LocalPeer>,
    mut requests: EventReader<TeleportRequest>,
    mut query: Query<(&Owner, &mut SyncState, &mut Transform, Has<SyncDisabled>)>,
) {
    for request in requests.read() {
        let Ok((owner, mut state, mut transform, disabled)) = query.get_mut(request.entity)
        else {
            continue;
        };
        if disabled {
            let error = SyncError::Disabled;
            warn!(entity = ?request.entity, %error, "teleport request dropped");
            continue;
        }
        match teleport_to(
            &mut state,
            &mut transform,
            owner.is_local(&local),
            request.position,
            request.rotation,
        ) {
            Ok(()) => debug!(entity = ?request.entity, to = ?request.position, "teleported"),
            Err(error) => {
                warn!(entity = ?request.entity, %error, "teleport request dropped");
            }
        }
    }
}

/// Put locally-owned bodies that fell out of the world back at their spawn
/// pose, slightly raised so they settle onto the ground instead of clipping
/// into it.
pub(crate) fn auto_respawn(
    local: Res<LocalPeer>,
    mut respawns: EventWriter<Respawned>,
    mut query: Query<
        (
            Entity,
            &Owner,
            &SyncSettings,
            &SpawnPose,
            &mut SyncState,
            &mut Transform,
            &mut LinearVelocity,
            &mut AngularVelocity,
        ),
        Without<SyncDisabled>,
    >,
) {
    for (entity, owner, settings, spawn, mut state, mut transform, mut linear, mut angular) in
        query.iter_mut()
    {
        if !owner.is_local(&local) || transform.translation.y >= settings.respawn_height {
            continue;
        }
        debug!(?entity, y = transform.translation.y, "below respawn height");
        let target = spawn.position + Vec3::Y * 0.05;
        match teleport_to(&mut state, &mut transform, true, target, spawn.rotation) {
            Ok(()) => {
                linear.0 = Vec3::ZERO;
                angular.0 = Vec3::ZERO;
                respawns.write(Respawned { entity });
            }
            Err(error) => warn!(?entity, %error, "respawn failed"),
        }
    }
}
