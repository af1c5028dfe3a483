use bevy_app::prelude::*;
use bevy_ecs::prelude::IntoScheduleConfigs;
use bevy_time::TimeSystem;

use crate::id::{LocalPeer, Owner, OwnershipChanged, PeerId};
use crate::kinematics::KinematicState;
use crate::settings::{validate_settings, SyncDisabled, SyncSettings};
use crate::time::{advance_clock, SyncClock};

/// Registers the shared clock, peer identity and settings validation.
pub struct SyncCorePlugin {
    /// Identity of the local participant.
    pub local_peer: PeerId,
}

impl Default for SyncCorePlugin {
    fn default() -> Self {
        Self {
            local_peer: PeerId(0),
        }
    }
}

impl Plugin for SyncCorePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SyncClock>();
        app.insert_resource(LocalPeer(self.local_peer));
        app.add_event::<OwnershipChanged>();

        app.register_type::<KinematicState>();
        app.register_type::<SyncClock>();
        app.register_type::<Owner>();
        app.register_type::<SyncSettings>();
        app.register_type::<SyncDisabled>();

        app.add_observer(validate_settings);

        // advance once per frame, before anything reads `now`
        app.add_systems(First, advance_clock.after(TimeSystem));
    }
}
