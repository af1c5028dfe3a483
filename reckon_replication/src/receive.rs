/*! Applying inbound snapshots to the prediction state machine. */
use bevy_ecs::prelude::*;
use tracing::{trace, warn};

use reckon_core::prelude::{LocalPeer, Owner, SyncClock, SyncDisabled, SyncSettings};
use reckon_prediction::prelude::{PoseBacklog, SyncState};

use crate::link::InboundSnapshot;
use crate::wire::SnapshotPayload;

/// Decode inbound snapshots and rotate them into the anchor triple.
///
/// Snapshots for entities the local peer owns are dropped: during an
/// ownership handover the old owner's last packet may still be in flight.
pub(crate) fn apply_inbound(
    clock: Res<SyncClock>,
    local: Res<LocalPeer>,
    mut inbound: EventReader<InboundSnapshot>,
    mut query: Query<
        (&Owner, &SyncSettings, &mut SyncState, &mut PoseBacklog),
        Without<SyncDisabled>,
    >,
) {
    let now = clock.now_network();
    for snapshot in inbound.read() {
        let Ok((owner, settings, mut state, mut backlog)) = query.get_mut(snapshot.entity) else {
            continue;
        };
        if owner.is_local(&local) {
            trace!(entity = ?snapshot.entity, "dropping snapshot for owned entity");
            continue;
        }
        let mut payload = snapshot.payload.clone();
        let payload = match SnapshotPayload::from_bytes(&mut payload) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(entity = ?snapshot.entity, %error, "discarding corrupt snapshot");
                continue;
            }
        };
        let send_time = snapshot.receive_time - snapshot.latency;
        let teleport = payload.teleport_toggle;
        let fresh = payload.into_kinematic(send_time);
        if teleport != state.teleport_toggle() {
            // never interpolate across a teleport
            backlog.clear();
        }
        backlog.push(send_time, fresh.position, fresh.rotation);
        state.adopt_snapshot(fresh, teleport, now, snapshot.receive_time, settings);
    }
}
