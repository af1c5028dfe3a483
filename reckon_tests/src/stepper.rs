/*! A deterministic two-peer harness.

Two headless apps share a manually-stepped clock: the owner app simulates
the authoritative body, the remote app only receives. `frame_step` runs one
fixed-duration frame on both and carries every outbound snapshot across as
an inbound one, so a test controls time and delivery exactly.
*/
use std::time::Duration;

use bevy_app::App;
use bevy_ecs::entity::Entity;
use bevy_ecs::event::Events;
use bevy_math::Vec3;
use bevy_time::{TimePlugin, TimeUpdateStrategy};
use bevy_transform::components::Transform;

use reckon::prelude::*;

pub const OWNER_PEER: PeerId = PeerId(1);
pub const REMOTE_PEER: PeerId = PeerId(2);

/// 64 Hz frames unless a test asks otherwise.
pub const FRAME: Duration = Duration::from_micros(15_625);

pub struct SyncStepper {
    pub owner_app: App,
    pub remote_app: App,
    pub owner_entity: Entity,
    pub remote_entity: Entity,
    pub frame: Duration,
    /// One-way latency estimate handed to the receiver with each snapshot.
    pub latency: f64,
    /// Snapshots carried across so far.
    pub delivered: usize,
}

impl SyncStepper {
    pub fn new(settings: SyncSettings) -> Self {
        Self::with_frame(settings, FRAME)
    }

    pub fn with_frame(settings: SyncSettings, frame: Duration) -> Self {
        let mut owner_app = build_app(OWNER_PEER, frame);
        let mut remote_app = build_app(REMOTE_PEER, frame);

        let owner_entity = owner_app
            .world_mut()
            .spawn((Owner(OWNER_PEER), settings.clone(), SyncState::default()))
            .id();
        let remote_entity = remote_app
            .world_mut()
            .spawn((Owner(OWNER_PEER), settings, SyncState::default()))
            .id();

        // first update has a zero delta, both clocks stay at zero
        owner_app.update();
        remote_app.update();

        Self {
            owner_app,
            remote_app,
            owner_entity,
            remote_entity,
            frame,
            latency: 0.0,
            delivered: 0,
        }
    }

    /// Run one frame on both peers, delivering the owner's snapshots in
    /// between so the remote applies them at the matching frame time.
    pub fn frame_step(&mut self) {
        self.owner_app.update();
        self.deliver();
        self.remote_app.update();
    }

    pub fn frame_steps(&mut self, count: usize) {
        for _ in 0..count {
            self.frame_step();
        }
    }

    /// Run one frame with the link down: outbound snapshots are dropped.
    pub fn frame_step_link_down(&mut self) {
        self.owner_app.update();
        self.owner_app
            .world_mut()
            .resource_mut::<Events<OutboundSnapshot>>()
            .drain()
            .for_each(drop);
        self.remote_app.update();
    }

    /// Advance the owner body one frame of perfectly integrated constant
    /// velocity, then run the frame.
    pub fn drive_owner(&mut self, velocity: Vec3) {
        let dt = self.frame.as_secs_f32();
        let mut entity = self.owner_app.world_mut().entity_mut(self.owner_entity);
        {
            let mut transform = entity.get_mut::<Transform>().unwrap();
            transform.translation += velocity * dt;
        }
        {
            let mut linear = entity.get_mut::<LinearVelocity>().unwrap();
            linear.0 = velocity;
        }
        self.frame_step();
    }

    fn deliver(&mut self) {
        let snapshots: Vec<OutboundSnapshot> = self
            .owner_app
            .world_mut()
            .resource_mut::<Events<OutboundSnapshot>>()
            .drain()
            .collect();
        // the remote applies these after its clock advances one more frame
        let receive_time = self
            .remote_app
            .world()
            .resource::<SyncClock>()
            .now_network()
            + self.frame.as_secs_f64();
        for snapshot in snapshots {
            self.delivered += 1;
            self.remote_app.world_mut().send_event(InboundSnapshot {
                entity: self.remote_entity,
                payload: snapshot.payload,
                receive_time,
                latency: self.latency,
            });
        }
    }

    pub fn owner_now(&self) -> f64 {
        self.owner_app
            .world()
            .resource::<SyncClock>()
            .now_network()
    }

    pub fn owner_position(&self) -> Vec3 {
        self.owner_app
            .world()
            .entity(self.owner_entity)
            .get::<Transform>()
            .unwrap()
            .translation
    }

    pub fn remote_position(&self) -> Vec3 {
        self.remote_app
            .world()
            .entity(self.remote_entity)
            .get::<Transform>()
            .unwrap()
            .translation
    }
}

fn build_app(peer: PeerId, frame: Duration) -> App {
    let mut app = App::new();
    app.add_plugins(TimePlugin);
    app.insert_resource(TimeUpdateStrategy::ManualDuration(frame));
    app.add_plugins(SyncPlugins { local_peer: peer });
    app
}
