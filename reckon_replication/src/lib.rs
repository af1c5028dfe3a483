/*! Snapshot replication: wire format, link events and the send controller.

The owner side samples its body every frame but only serializes when the
send controller decides the wire needs it: on a fixed cadence, or (with the
dynamic rate enabled) when re-running the receivers' own predictor against
the live sample shows a divergence worth correcting.

Transport is out of scope. The crate talks to it through four events on the
[`link`] module: `SendRequest` / `OutboundSnapshot` leaving, `SendCompleted`
acknowledging, `InboundSnapshot` arriving with the transport's receive time
and latency estimate.
*/

pub mod link;
pub mod plugin;
pub mod receive;
pub mod send;
pub mod wire;

pub mod prelude {
    pub use crate::link::{InboundSnapshot, OutboundSnapshot, SendCompleted, SendRequest};
    pub use crate::plugin::ReplicationPlugin;
    pub use crate::send::SendController;
    pub use crate::wire::{SnapshotPayload, WireError, ENCODED_LEN};
}
