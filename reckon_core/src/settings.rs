use bevy_ecs::prelude::*;
use bevy_reflect::Reflect;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Runtime-tunable synchronization parameters for one synchronized object.
///
/// Every field is replicated (serde) so that all participants agree on the
/// same values. Out-of-range values are clamped when the component is added;
/// non-finite garbage disables synchronization for the entity instead of
/// propagating through the prediction math.
#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub struct SyncSettings {
    /// Snapshot sends per second, 1-20. With dynamic rate this is the upper
    /// bound on the rate (lower bound on the interval).
    pub send_rate_hz: f32,
    /// When enabled, sends are skipped while the previous snapshot still
    /// predicts the live sample within the divergence thresholds.
    pub dynamic_rate: bool,
    /// Longest time between sends when dynamic rate is enabled, seconds.
    pub max_send_interval: f32,
    /// Turn rate in degrees/second considered circular movement. Lower
    /// values increase the chance for motion to be treated as circular. 5-90.
    pub circle_threshold: f32,
    /// Blend window for reconciling prediction error, seconds. Zero means
    /// snap immediately.
    pub error_correction_duration: f32,
    /// Exponent shaping the blend curve, 0-1.
    pub error_correction_softness: f32,
    /// Client-side lag compensation subtracted from the extrapolation lead,
    /// seconds.
    pub prediction_reduction: f32,
    /// Distance between two independently rooted predictions above which the
    /// receiver snaps instead of blending, meters.
    pub teleport_distance: f32,
    /// Owners falling below this height respawn automatically.
    pub respawn_height: f32,
    /// Send threshold: predicted-vs-live position distance, meters.
    pub position_threshold: f32,
    /// Send threshold: predicted-vs-live rotation delta, degrees.
    pub rotation_threshold: f32,
    /// Send threshold: angle between predicted and live velocity, degrees.
    pub velocity_direction_threshold: f32,
    /// Send threshold: predicted-vs-live velocity delta, m/s.
    pub velocity_magnitude_threshold: f32,
    /// Bounded snapshot history length used for interpolation.
    pub backlog_capacity: usize,
    /// Emit per-tick pose traces (received / raw prediction / smoothed).
    pub debug_trails: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            send_rate_hz: 8.0,
            dynamic_rate: false,
            max_send_interval: 4.0,
            circle_threshold: 15.0,
            error_correction_duration: 0.375,
            error_correction_softness: 0.5,
            prediction_reduction: 0.0,
            teleport_distance: 100.0,
            respawn_height: -100.0,
            position_threshold: 1.0,
            rotation_threshold: 5.0,
            velocity_direction_threshold: 3.0,
            velocity_magnitude_threshold: 1.0,
            backlog_capacity: 20,
            debug_trails: false,
        }
    }
}

impl SyncSettings {
    /// Shortest time between two sends, seconds.
    pub fn send_interval(&self) -> f32 {
        1.0 / self.send_rate_hz.clamp(1.0, 20.0)
    }

    pub fn is_finite(&self) -> bool {
        self.send_rate_hz.is_finite()
            && self.max_send_interval.is_finite()
            && self.circle_threshold.is_finite()
            && self.error_correction_duration.is_finite()
            && self.error_correction_softness.is_finite()
            && self.prediction_reduction.is_finite()
            && self.teleport_distance.is_finite()
            && self.respawn_height.is_finite()
            && self.position_threshold.is_finite()
            && self.rotation_threshold.is_finite()
            && self.velocity_direction_threshold.is_finite()
            && self.velocity_magnitude_threshold.is_finite()
    }

    /// All values forced into their valid ranges.
    pub fn clamped(mut self) -> Self {
        self.send_rate_hz = self.send_rate_hz.clamp(1.0, 20.0);
        self.max_send_interval = self.max_send_interval.max(self.send_interval());
        self.circle_threshold = self.circle_threshold.clamp(5.0, 90.0);
        self.error_correction_duration = self.error_correction_duration.max(0.0);
        self.error_correction_softness = self.error_correction_softness.clamp(0.0, 1.0);
        self.prediction_reduction = self.prediction_reduction.max(0.0);
        self.teleport_distance = self.teleport_distance.max(0.0);
        self.position_threshold = self.position_threshold.max(0.0);
        self.rotation_threshold = self.rotation_threshold.max(0.0);
        self.velocity_direction_threshold = self.velocity_direction_threshold.max(0.0);
        self.velocity_magnitude_threshold = self.velocity_magnitude_threshold.max(0.0);
        self.backlog_capacity = self.backlog_capacity.max(2);
        self
    }
}

/// Marker inserted when an entity's sync configuration is unusable.
/// Every sync system filters these entities out (fail closed).
#[derive(Component, Debug, Default, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct SyncDisabled;

pub(crate) fn validate_settings(
    trigger: Trigger<OnAdd, SyncSettings>,
    mut commands: Commands,
    mut query: Query<&mut SyncSettings>,
) {
    let entity = trigger.target();
    let Ok(mut settings) = query.get_mut(entity) else {
        return;
    };
    if !settings.is_finite() {
        error!(?entity, "non-finite sync settings, disabling synchronization");
        commands.entity(entity).insert(SyncDisabled);
        return;
    }
    let clamped = settings.clone().clamped();
    if clamped != *settings {
        warn!(?entity, "sync settings out of range, clamped");
        *settings = clamped;
    }
}
