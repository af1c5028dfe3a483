/*! Predictive state synchronization for networked rigid bodies.

One peer owns each synchronized object and broadcasts kinematic snapshots at
an adaptive rate; every other peer reconstructs a plausible pose between
snapshots by dead reckoning, snapshot interpolation and smooth error
correction.

Attach [`prelude::SyncPlugins`], then spawn bodies with
[`prelude::SyncState`], an [`prelude::Owner`] and [`prelude::SyncSettings`].
Bytes move through the [`reckon_replication::link`] events; plugging an
actual transport into those is the caller's side of the contract.
*/

pub use reckon_core;
pub use reckon_prediction;
pub use reckon_replication;

pub mod prelude {
    pub use bevy_app::PluginGroup;
    pub use reckon_core::prelude::*;
    pub use reckon_prediction::prelude::*;
    pub use reckon_replication::prelude::*;

    pub use crate::SyncPlugins;
}

use bevy_app::{PluginGroup, PluginGroupBuilder};
use reckon_core::prelude::{PeerId, SyncCorePlugin};
use reckon_prediction::prelude::PredictionPlugin;
use reckon_replication::prelude::ReplicationPlugin;

/// Everything needed to synchronize rigid bodies, in one group.
pub struct SyncPlugins {
    /// The identity this app runs as.
    pub local_peer: PeerId,
}

impl PluginGroup for SyncPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::start::<Self>()
            .add(SyncCorePlugin {
                local_peer: self.local_peer,
            })
            .add(PredictionPlugin)
            .add(ReplicationPlugin)
    }
}
