use bevy_ecs::prelude::*;
use bevy_math::{Quat, Vec3};
use bevy_reflect::Reflect;
use bevy_transform::components::Transform;
use tracing::trace;

use reckon_core::prelude::{KinematicState, SyncSettings};

use crate::backlog::PoseBacklog;
use crate::blend::{blend_factor, blend_progress};
use crate::body::{AngularVelocity, LinearVelocity};
use crate::predict::{predict_state, trusted_elapsed};
use crate::sample::KinematicSampler;

/// Synchronization state of one replicated body.
///
/// Holds the three kinematic anchors: `synced` (exactly what the transport
/// last delivered, overwritten only on deserialization), `working` (the most
/// recent prediction anchor) and `previous_working` (one step older, blended
/// against `working` to bleed out stale error), plus the teleport flip-flop.
///
/// All mutation goes through the named transition operations below so the
/// anchor invariants are enforced here, not by caller discipline.
#[derive(Component, Debug, Default, Clone, PartialEq, Reflect)]
#[reflect(Component)]
#[require(Transform, LinearVelocity, AngularVelocity, PoseBacklog, KinematicSampler)]
pub struct SyncState {
    synced: KinematicState,
    working: KinematicState,
    previous_working: KinematicState,
    /// Flips on every explicit teleport. Replicated.
    teleport_toggle: bool,
    /// Shadow copy of the toggle; a teleport is triggered exactly when the
    /// two differ (edge-triggered, not level-triggered).
    teleport_acked: bool,
    /// Network time at which the latest snapshot arrived; anchors the blend
    /// progress.
    receive_time: f64,
}

impl SyncState {
    /// All three anchors resting at `initial`.
    pub fn new(initial: KinematicState) -> Self {
        Self {
            synced: initial,
            working: initial,
            previous_working: initial,
            ..Default::default()
        }
    }

    pub fn synced(&self) -> &KinematicState {
        &self.synced
    }

    pub fn working(&self) -> &KinematicState {
        &self.working
    }

    pub fn previous_working(&self) -> &KinematicState {
        &self.previous_working
    }

    pub fn teleport_toggle(&self) -> bool {
        self.teleport_toggle
    }

    pub fn receive_time(&self) -> f64 {
        self.receive_time
    }

    /// True iff the toggle flipped since the last acknowledgement.
    pub fn teleport_triggered(&self) -> bool {
        self.teleport_toggle != self.teleport_acked
    }

    /// Arm the flags so the next flip is detected again.
    pub fn acknowledge_teleport(&mut self) {
        self.teleport_acked = self.teleport_toggle;
    }

    /// Collapse the blend: the previous anchor becomes the working anchor.
    /// Used by every snap path (teleport, stale data, desync).
    pub fn snap_previous_to_working(&mut self) {
        self.previous_working = self.working;
    }

    /// Owner-side capture: adopt the live sample as the working anchor and
    /// mirror it into the outbound `synced` slot. Must run before the
    /// transport copies the payload.
    pub fn capture(&mut self, sample: KinematicState) {
        self.working = sample;
        self.synced = self.working;
    }

    /// Owner-side teleport: zero all motion, park the working anchor at the
    /// target pose and flip the replicated toggle exactly once. The local
    /// shadow is flipped along with it so the owner itself does not
    /// re-trigger on its own flip.
    pub fn teleport(&mut self, position: Vec3, rotation: Quat) {
        self.working.velocity = Vec3::ZERO;
        self.working.acceleration = Vec3::ZERO;
        self.working.angular_velocity = Vec3::ZERO;
        self.working.circular_speed = 0.0;
        self.working.position = position;
        self.working.rotation = rotation;
        self.teleport_toggle = !self.teleport_toggle;
        self.teleport_acked = self.teleport_toggle;
        self.snap_previous_to_working();
    }

    /// Receiver-side transition for a freshly deserialized snapshot: the
    /// current working anchor (re-predicted to `now` and blended against the
    /// previous one, so the pair stays time-aligned) becomes the previous
    /// anchor, then `fresh` becomes both `synced` and `working`.
    pub fn adopt_snapshot(
        &mut self,
        fresh: KinematicState,
        teleport_toggle: bool,
        now: f64,
        receive_time: f64,
        settings: &SyncSettings,
    ) {
        self.rotate_working_to_previous(now, &fresh, settings);
        self.synced = fresh;
        self.working = fresh;
        self.teleport_toggle = teleport_toggle;
        self.receive_time = receive_time;
    }

    /// Re-root the previous anchor at `now`.
    ///
    /// Normal case: both anchors are predicted forward to `now` and blended
    /// with the current correction factor, so the new previous anchor is
    /// exactly the pose the receiver was showing. If the working anchor is
    /// too stale to predict from, the fresh snapshot itself (predicted to
    /// `now` when trustworthy) seeds the previous anchor instead.
    fn rotate_working_to_previous(
        &mut self,
        now: f64,
        fresh: &KinematicState,
        settings: &SyncSettings,
    ) {
        let elapsed = now - self.working.send_time;
        if !trusted_elapsed(elapsed) {
            let mut previous = *fresh;
            let fresh_elapsed = now - fresh.send_time;
            if trusted_elapsed(fresh_elapsed) {
                let predicted = predict_state(&previous, settings.circle_threshold, fresh_elapsed);
                previous.position = predicted.position;
                previous.velocity = predicted.velocity;
                previous.rotation = predicted.rotation;
            }
            previous.send_time = now;
            self.previous_working = previous;
            return;
        }

        let new = predict_state(&self.working, settings.circle_threshold, elapsed);
        let old = predict_state(
            &self.previous_working,
            settings.circle_threshold,
            now - self.previous_working.send_time,
        );
        let factor = blend_factor(
            blend_progress(now, self.receive_time, settings.error_correction_duration),
            settings.error_correction_softness,
        );
        trace!(factor, "rotating working anchor to previous");

        self.previous_working = KinematicState {
            position: old.position.lerp(new.position, factor),
            velocity: old.velocity.lerp(new.velocity, factor),
            rotation: old.rotation.slerp(new.rotation, factor),
            acceleration: self
                .previous_working
                .acceleration
                .lerp(self.working.acceleration, factor),
            angular_velocity: self
                .previous_working
                .angular_velocity
                .lerp(self.working.angular_velocity, factor),
            circular_speed: self.previous_working.circular_speed
                + factor * (self.working.circular_speed - self.previous_working.circular_speed),
            send_time: now,
        };
    }
}
