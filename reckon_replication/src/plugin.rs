use bevy_app::{App, Plugin, PreUpdate, Update};
use bevy_ecs::prelude::*;

use reckon_prediction::prelude::{SyncSet, SyncState};

use crate::link::{InboundSnapshot, OutboundSnapshot, SendCompleted, SendRequest};
use crate::receive::apply_inbound;
use crate::send::{retry_failed_sends, send_decision, serialize_requested, SendController};

/// Every synchronized body can become locally owned, so each carries pacing
/// state from the start.
fn attach_send_controller(trigger: Trigger<OnAdd, SyncState>, mut commands: Commands) {
    commands
        .entity(trigger.target())
        .insert_if_new(SendController::default());
}

pub struct ReplicationPlugin;

impl Plugin for ReplicationPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<SendController>();

        app.add_event::<SendRequest>();
        app.add_event::<OutboundSnapshot>();
        app.add_event::<SendCompleted>();
        app.add_event::<InboundSnapshot>();

        app.add_observer(attach_send_controller);

        // inbound first: a snapshot delivered this frame anchors this
        // frame's prediction
        app.add_systems(PreUpdate, apply_inbound);
        app.add_systems(
            Update,
            (retry_failed_sends, send_decision, serialize_requested)
                .chain()
                .in_set(SyncSet::SendDecision),
        );
    }
}
