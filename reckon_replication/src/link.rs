/*! Events bridging the sync engine and whatever transport carries the bytes. */
use bevy_ecs::prelude::*;
use bytes::Bytes;

/// Internal: the send controller decided this entity's current sample must
/// go out this frame. Consumed by the serializer in the same phase.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendRequest {
    pub entity: Entity,
}

/// An encoded snapshot ready for the transport to deliver to all peers.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct OutboundSnapshot {
    pub entity: Entity,
    pub payload: Bytes,
}

/// Transport feedback for an attempted send. A failed send re-arms the
/// controller so the snapshot goes out again next frame.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendCompleted {
    pub entity: Entity,
    pub success: bool,
    pub bytes: usize,
}

/// An encoded snapshot arriving from the owning peer.
///
/// `receive_time` is the local network-clock time the transport took
/// delivery; `latency` its current one-way latency estimate in seconds. The
/// snapshot's send time is reconstructed as `receive_time - latency`.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct InboundSnapshot {
    pub entity: Entity,
    pub payload: Bytes,
    pub receive_time: f64,
    pub latency: f64,
}
