/*! Client-side prediction for synchronized rigid bodies.

Between snapshots a remote body's pose is reconstructed every frame:

1. an explicit teleport (edge-triggered flip-flop) snaps, never blends;
2. if enough snapshot history exists, the backlog interpolates between real
   received samples instead of extrapolating;
3. stale or clock-skewed anchors fall back to the last known pose;
4. otherwise two dead-reckoned predictions, rooted at the newest and the
   previous anchor, are blended with a smoothstep curve, so fresh error is
   bled out over the correction window instead of popping.

The predictor itself ([`predict::predict_state`]) is a pure function that
picks a circular-arc or linear/quadratic motion model per sample.
*/

pub mod backlog;
pub mod blend;
pub mod body;
pub mod plugin;
pub mod predict;
pub mod sample;
pub mod state;
pub mod teleport;
pub mod tick;

pub mod prelude {
    pub use crate::backlog::PoseBacklog;
    pub use crate::blend::{blend_factor, blend_progress};
    pub use crate::body::{AngularVelocity, LinearVelocity};
    pub use crate::plugin::{PredictionPlugin, SyncSet};
    pub use crate::predict::{predict_state, trusted_elapsed, PredictedMotion, PREDICTION_LIMIT};
    pub use crate::sample::KinematicSampler;
    pub use crate::state::SyncState;
    pub use crate::teleport::{teleport_to, Respawned, SpawnPose, TeleportRequest};
}
