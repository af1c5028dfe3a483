/*! Peer identity and ownership.

Ownership bookkeeping proper lives outside this workspace; the sync engine
only consumes "is the local peer the owner of this entity" and a transfer
command. Single-writer: exactly one peer owns an object at any instant, a
transfer racing an in-flight send resolves itself within one round trip
(the new owner simply starts capturing on its next tick).
*/
use bevy_ecs::prelude::*;
use bevy_reflect::Reflect;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Uniquely identifies a participant in the shared simulation.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize,
)]
pub struct PeerId(pub u64);

/// The identity of the peer this app is running as.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq, Reflect)]
pub struct LocalPeer(pub PeerId);

/// The peer with write authority over this entity's live state.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct Owner(pub PeerId);

impl Owner {
    pub fn is_local(&self, local: &LocalPeer) -> bool {
        self.0 == local.0
    }
}

/// Raised whenever write authority over an entity moves to another peer.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipChanged {
    pub entity: Entity,
    pub owner: PeerId,
}

/// Hand write authority over `entity` to `peer`.
///
/// No handshake: the new owner begins capturing from its own physics sample
/// on its next scheduled tick. A momentary duplicate or missed send is
/// acceptable and self-correcting.
pub fn transfer_ownership(
    entity: Entity,
    peer: PeerId,
    owner: &mut Owner,
    events: &mut EventWriter<OwnershipChanged>,
) {
    if owner.0 == peer {
        return;
    }
    debug!(?entity, from = ?owner.0, to = ?peer, "ownership transfer");
    owner.0 = peer;
    events.write(OwnershipChanged { entity, owner: peer });
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn transfer(world: &mut World, entity: Entity, peer: PeerId) {
        let mut system_state: bevy_ecs::system::SystemState<(
            Query<&mut Owner>,
            EventWriter<OwnershipChanged>,
        )> = bevy_ecs::system::SystemState::new(world);
        let (mut owners, mut events) = system_state.get_mut(world);
        let mut owner = owners.get_mut(entity).unwrap();
        transfer_ownership(entity, peer, &mut owner, &mut events);
    }

    #[test]
    fn transfer_updates_owner_and_raises_event() {
        let mut world = World::new();
        world.init_resource::<Events<OwnershipChanged>>();
        let entity = world.spawn(Owner(PeerId(1))).id();

        transfer(&mut world, entity, PeerId(2));
        assert_eq!(world.entity(entity).get::<Owner>().unwrap().0, PeerId(2));
        assert_eq!(
            world
                .resource::<Events<OwnershipChanged>>()
                .iter_current_update_events()
                .count(),
            1
        );

        // transferring to the current owner is a no-op
        transfer(&mut world, entity, PeerId(2));
        assert_eq!(
            world
                .resource::<Events<OwnershipChanged>>()
                .iter_current_update_events()
                .count(),
            1
        );
    }
}

