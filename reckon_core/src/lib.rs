/*! Core types shared by the reckon state-synchronization crates.

A synchronized object has exactly one authoritative [`Owner`] at any instant;
every other peer reconstructs its pose from [`KinematicState`] snapshots.
This crate holds the leaf types consumed by the prediction and replication
crates: the kinematic sample itself, the shared clocks, peer identity and
the runtime-tunable [`SyncSettings`].
*/

pub mod error;
pub mod id;
pub mod kinematics;
pub mod plugin;
pub mod settings;
pub mod time;

pub mod prelude {
    pub use crate::error::SyncError;
    pub use crate::id::{transfer_ownership, LocalPeer, Owner, OwnershipChanged, PeerId};
    pub use crate::kinematics::KinematicState;
    pub use crate::plugin::SyncCorePlugin;
    pub use crate::settings::{SyncDisabled, SyncSettings};
    pub use crate::time::SyncClock;
}
