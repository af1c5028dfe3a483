/*! The owner-side send controller.

At the fixed rate every due sample is sent. With the dynamic rate enabled
the controller instead re-runs the receivers' predictor from the last sent
anchor and only sends when the live sample has diverged past one of four
thresholds (position, facing, velocity direction, velocity magnitude), with
`max_send_interval` as a keepalive bound.
*/
use bevy_ecs::prelude::*;
use bevy_reflect::Reflect;
use bytes::BytesMut;
use tracing::{debug, trace, warn};

use reckon_core::prelude::{
    KinematicState, LocalPeer, Owner, SyncClock, SyncDisabled, SyncSettings,
};
use reckon_prediction::prelude::{predict_state, KinematicSampler, SyncState};

use crate::link::{OutboundSnapshot, SendCompleted, SendRequest};
use crate::wire::SnapshotPayload;

/// Owner-side pacing state.
#[derive(Component, Debug, Default, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub struct SendController {
    next_send_time: f64,
    #[reflect(ignore)]
    last_sent: Option<KinematicState>,
}

impl SendController {
    pub fn next_send_time(&self) -> f64 {
        self.next_send_time
    }

    pub fn last_sent(&self) -> Option<&KinematicState> {
        self.last_sent.as_ref()
    }

    /// Anchor the next deadline one interval past the later of the old
    /// deadline and now, so a hitch doesn't cause a burst of catch-up sends.
    pub fn schedule_next_send(&mut self, now: f64, interval: f64) {
        self.next_send_time = self.next_send_time.max(now) + interval;
    }

    /// Force the next sample out regardless of thresholds (ownership grab,
    /// teleport, failed send).
    pub fn mark_dirty(&mut self) {
        self.next_send_time = 0.0;
        self.last_sent = None;
    }
}

/// Would receivers, predicting from `last_sent`, have diverged from the live
/// `sample` past any threshold by the time the sample was taken?
pub fn update_required(
    last_sent: Option<&KinematicState>,
    sample: &KinematicState,
    settings: &SyncSettings,
) -> bool {
    let Some(last) = last_sent else {
        return true;
    };
    let elapsed = sample.send_time - last.send_time;
    if elapsed < 0.0 {
        return true;
    }
    let predicted = predict_state(last, settings.circle_threshold, elapsed);

    if predicted.position.distance(sample.position) > settings.position_threshold {
        return true;
    }
    if predicted.rotation.angle_between(sample.rotation).to_degrees()
        > settings.rotation_threshold
    {
        return true;
    }
    if predicted.velocity.length() > f32::EPSILON && sample.velocity.length() > f32::EPSILON {
        let direction_error = predicted
            .velocity
            .angle_between(sample.velocity)
            .to_degrees();
        if direction_error > settings.velocity_direction_threshold {
            return true;
        }
    }
    (predicted.velocity.length() - sample.velocity.length()).abs()
        > settings.velocity_magnitude_threshold
}

/// Re-arm the controller for entities whose transport send failed.
pub(crate) fn retry_failed_sends(
    mut completions: EventReader<SendCompleted>,
    mut query: Query<&mut SendController>,
) {
    for completion in completions.read() {
        if completion.success {
            continue;
        }
        if let Ok(mut controller) = query.get_mut(completion.entity) {
            warn!(entity = ?completion.entity, "send failed, re-arming");
            controller.mark_dirty();
        }
    }
}

/// Decide, per locally-owned entity, whether the current sample goes out.
pub(crate) fn send_decision(
    clock: Res<SyncClock>,
    local: Res<LocalPeer>,
    mut requests: EventWriter<SendRequest>,
    mut query: Query<
        (
            Entity,
            &Owner,
            &SyncSettings,
            &KinematicSampler,
            &mut SendController,
        ),
        Without<SyncDisabled>,
    >,
) {
    let now = clock.now_network();
    for (entity, owner, settings, sampler, mut controller) in query.iter_mut() {
        if !owner.is_local(&local) {
            continue;
        }
        if now < controller.next_send_time {
            continue;
        }
        let Some(sample) = sampler.latest() else {
            continue;
        };
        let interval = settings.send_interval() as f64;
        // keepalive: never go silent longer than max_send_interval
        let overdue = controller
            .last_sent
            .as_ref()
            .is_none_or(|last| now - last.send_time >= settings.max_send_interval as f64);
        let must_send = !settings.dynamic_rate
            || overdue
            || update_required(controller.last_sent.as_ref(), sample, settings);
        if must_send {
            requests.write(SendRequest { entity });
            controller.schedule_next_send(now, interval);
        } else {
            // deadline stays in the past: the divergence check re-runs
            // every frame until something is worth sending
            trace!(?entity, "sample within thresholds, skipping send");
        }
    }
}

/// Capture and encode the samples the decision pass flagged.
///
/// Re-checks ownership at fire time: a transfer between decision and
/// serialization silently drops the request.
pub(crate) fn serialize_requested(
    local: Res<LocalPeer>,
    mut requests: EventReader<SendRequest>,
    mut outbound: EventWriter<OutboundSnapshot>,
    mut query: Query<
        (
            &Owner,
            &KinematicSampler,
            &mut SendController,
            &mut SyncState,
        ),
        Without<SyncDisabled>,
    >,
) {
    for request in requests.read() {
        let Ok((owner, sampler, mut controller, mut state)) = query.get_mut(request.entity) else {
            continue;
        };
        if !owner.is_local(&local) {
            continue;
        }
        let Some(sample) = sampler.latest() else {
            continue;
        };
        if !sample.is_finite() {
            warn!(entity = ?request.entity, "non-finite sample, not sending");
            continue;
        }
        state.capture(sample.clone());
        controller.last_sent = Some(sample.clone());

        let payload = SnapshotPayload::from_state(state.synced(), state.teleport_toggle());
        let mut buf = BytesMut::with_capacity(crate::wire::ENCODED_LEN);
        payload.to_bytes(&mut buf);
        debug!(entity = ?request.entity, bytes = buf.len(), "snapshot out");
        outbound.write(OutboundSnapshot {
            entity: request.entity,
            payload: buf.freeze(),
        });
    }
}
