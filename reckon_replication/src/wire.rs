/*! Fixed-size snapshot wire format.

17 little-endian f32 fields plus one flags byte, 69 bytes per snapshot. The
send timestamp is deliberately not transmitted: clocks differ between peers,
so the receiver reconstructs it from its own receive time minus the
transport's latency estimate.
*/
use bevy_math::{Quat, Vec3};
use bytes::{Buf, BufMut};
use reckon_core::prelude::KinematicState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Serialized size of one snapshot in bytes: position 3, rotation 4,
/// velocity 3, acceleration 3, angular velocity 3, circular speed 1, plus
/// the flags byte.
pub const ENCODED_LEN: usize = 17 * 4 + 1;

const FLAG_TELEPORT: u8 = 0b0000_0001;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("snapshot buffer ended after {0} bytes, expected {ENCODED_LEN}")]
    UnexpectedEnd(usize),
    #[error("snapshot contains non-finite values")]
    NonFinite,
}

/// One snapshot as it travels the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPayload {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub angular_velocity: Vec3,
    pub circular_speed: f32,
    pub teleport_toggle: bool,
}

impl SnapshotPayload {
    pub fn from_state(state: &KinematicState, teleport_toggle: bool) -> Self {
        Self {
            position: state.position,
            rotation: state.rotation,
            velocity: state.velocity,
            acceleration: state.acceleration,
            angular_velocity: state.angular_velocity,
            circular_speed: state.circular_speed,
            teleport_toggle,
        }
    }

    /// Rebuild a kinematic anchor, stamping it with the receiver-derived
    /// send time.
    pub fn into_kinematic(self, send_time: f64) -> KinematicState {
        KinematicState {
            position: self.position,
            rotation: self.rotation,
            velocity: self.velocity,
            acceleration: self.acceleration,
            angular_velocity: self.angular_velocity,
            circular_speed: self.circular_speed,
            send_time,
        }
    }

    pub fn to_bytes(&self, buf: &mut impl BufMut) {
        put_vec3(buf, self.position);
        buf.put_f32_le(self.rotation.x);
        buf.put_f32_le(self.rotation.y);
        buf.put_f32_le(self.rotation.z);
        buf.put_f32_le(self.rotation.w);
        put_vec3(buf, self.velocity);
        put_vec3(buf, self.acceleration);
        put_vec3(buf, self.angular_velocity);
        buf.put_f32_le(self.circular_speed);
        let mut flags = 0u8;
        if self.teleport_toggle {
            flags |= FLAG_TELEPORT;
        }
        buf.put_u8(flags);
    }

    /// Decode and validate. Corrupt payloads (truncated, non-finite values)
    /// are rejected here so the prediction state machine never sees them.
    pub fn from_bytes(buf: &mut impl Buf) -> Result<Self, WireError> {
        if buf.remaining() < ENCODED_LEN {
            return Err(WireError::UnexpectedEnd(buf.remaining()));
        }
        let position = get_vec3(buf);
        let rotation = Quat::from_xyzw(
            buf.get_f32_le(),
            buf.get_f32_le(),
            buf.get_f32_le(),
            buf.get_f32_le(),
        );
        let velocity = get_vec3(buf);
        let acceleration = get_vec3(buf);
        let angular_velocity = get_vec3(buf);
        let circular_speed = buf.get_f32_le();
        let flags = buf.get_u8();

        if !(position.is_finite()
            && rotation.is_finite()
            && velocity.is_finite()
            && acceleration.is_finite()
            && angular_velocity.is_finite()
            && circular_speed.is_finite())
            || rotation.length_squared() < f32::EPSILON
        {
            return Err(WireError::NonFinite);
        }

        Ok(Self {
            position,
            // quantization drift accumulates, renormalize on the way in
            rotation: rotation.normalize(),
            velocity,
            acceleration,
            angular_velocity,
            circular_speed,
            teleport_toggle: flags & FLAG_TELEPORT != 0,
        })
    }
}

fn put_vec3(buf: &mut impl BufMut, v: Vec3) {
    buf.put_f32_le(v.x);
    buf.put_f32_le(v.y);
    buf.put_f32_le(v.z);
}

fn get_vec3(buf: &mut impl Buf) -> Vec3 {
    Vec3::new(buf.get_f32_le(), buf.get_f32_le(), buf.get_f32_le())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use test_log::test;

    fn sample_payload() -> SnapshotPayload {
        SnapshotPayload {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(0.5),
            velocity: Vec3::new(4.0, 0.0, -1.0),
            acceleration: Vec3::new(0.0, -9.81, 0.0),
            angular_velocity: Vec3::new(0.0, 0.3, 0.0),
            circular_speed: 22.5,
            teleport_toggle: true,
        }
    }

    #[test]
    fn encoded_size_is_fixed() {
        let mut buf = BytesMut::new();
        sample_payload().to_bytes(&mut buf);
        assert_eq!(buf.len(), ENCODED_LEN);
    }

    #[test]
    fn decode_recovers_the_payload() {
        let payload = sample_payload();
        let mut buf = BytesMut::new();
        payload.to_bytes(&mut buf);
        let decoded = SnapshotPayload::from_bytes(&mut buf.freeze()).unwrap();
        assert_eq!(decoded.position, payload.position);
        assert_eq!(decoded.velocity, payload.velocity);
        assert_eq!(decoded.acceleration, payload.acceleration);
        assert_eq!(decoded.angular_velocity, payload.angular_velocity);
        assert_eq!(decoded.circular_speed, payload.circular_speed);
        assert_eq!(decoded.teleport_toggle, payload.teleport_toggle);
        // renormalization may perturb the least significant bits
        assert!(decoded.rotation.angle_between(payload.rotation) < 1e-5);
    }

    #[test]
    fn truncated_buffer_is_rejected_at_any_length() {
        let mut buf = BytesMut::new();
        sample_payload().to_bytes(&mut buf);
        let full = buf.freeze();
        // every partial length must be refused up front, never panic
        // part-way through the field reads
        for len in [0, 1, 16, 64, 65, 66, ENCODED_LEN - 1] {
            let mut short = full.slice(..len);
            assert_eq!(
                SnapshotPayload::from_bytes(&mut short),
                Err(WireError::UnexpectedEnd(len))
            );
        }
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut payload = sample_payload();
        payload.velocity.x = f32::NAN;
        let mut buf = BytesMut::new();
        payload.to_bytes(&mut buf);
        assert_eq!(
            SnapshotPayload::from_bytes(&mut buf.freeze()),
            Err(WireError::NonFinite)
        );
    }

    #[test]
    fn zero_rotation_is_rejected() {
        let mut payload = sample_payload();
        payload.rotation = Quat::from_xyzw(0.0, 0.0, 0.0, 0.0);
        let mut buf = BytesMut::new();
        payload.to_bytes(&mut buf);
        assert_eq!(
            SnapshotPayload::from_bytes(&mut buf.freeze()),
            Err(WireError::NonFinite)
        );
    }
}
