use std::collections::VecDeque;

use bevy_ecs::prelude::*;
use bevy_math::{Quat, Vec3};
use bevy_reflect::Reflect;

/// One received pose, timestamped on the network clock.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct PoseSample {
    pub time: f64,
    pub position: Vec3,
    pub rotation: Quat,
}

/// Bounded history of recently received poses, oldest at the front.
///
/// Non-owners prefer interpolating between two real samples over
/// extrapolating a single one whenever the requested time is covered by the
/// stored window. Appended to only on deserialization, oldest entries are
/// evicted once the capacity is reached.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct PoseBacklog {
    buffer: VecDeque<PoseSample>,
    capacity: usize,
}

impl Default for PoseBacklog {
    fn default() -> Self {
        Self::with_capacity(20)
    }
}

impl PoseBacklog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity: capacity.max(2),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Resize the history window, evicting the oldest entries if it shrank.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(2);
        while self.buffer.len() > self.capacity {
            self.buffer.pop_front();
        }
    }

    /// Append a received pose. Out-of-order samples (older than the newest
    /// stored one) are dropped rather than corrupting the ordering.
    pub fn push(&mut self, time: f64, position: Vec3, rotation: Quat) {
        if let Some(newest) = self.buffer.back() {
            if time < newest.time {
                return;
            }
        }
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(PoseSample {
            time,
            position,
            rotation,
        });
    }

    /// True iff `time` lies between the oldest and newest stored timestamps,
    /// i.e. a pose for it can be interpolated from real samples.
    pub fn interpolatable(&self, time: f64) -> bool {
        match (self.buffer.front(), self.buffer.back()) {
            (Some(oldest), Some(newest)) => oldest.time <= time && time <= newest.time,
            _ => false,
        }
    }

    /// Interpolated pose at `time`, if the backlog covers it.
    pub fn interpolate(&self, time: f64) -> Option<(Vec3, Quat)> {
        if !self.interpolatable(time) {
            return None;
        }
        // first index with sample.time > time
        let partition = self.buffer.partition_point(|sample| sample.time <= time);
        let before = self.buffer.get(partition.saturating_sub(1))?;
        let Some(after) = self.buffer.get(partition) else {
            // time == newest.time
            return Some((before.position, before.rotation));
        };
        let span = after.time - before.time;
        let t = if span > f64::EPSILON {
            ((time - before.time) / span) as f32
        } else {
            0.0
        };
        Some((
            before.position.lerp(after.position, t),
            before.rotation.slerp(after.rotation, t),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn interpolatable_only_inside_the_stored_window() {
        let mut backlog = PoseBacklog::default();
        assert!(!backlog.interpolatable(0.0));

        backlog.push(1.0, Vec3::ZERO, Quat::IDENTITY);
        // a single sample covers only its exact instant
        assert!(backlog.interpolatable(1.0));
        assert!(!backlog.interpolatable(1.5));

        backlog.push(2.0, Vec3::X, Quat::IDENTITY);
        assert!(backlog.interpolatable(1.5));
        assert!(!backlog.interpolatable(0.5));
        assert!(!backlog.interpolatable(2.5));
    }

    #[test]
    fn interpolates_between_bracketing_samples() {
        let mut backlog = PoseBacklog::default();
        backlog.push(1.0, Vec3::ZERO, Quat::IDENTITY);
        backlog.push(3.0, Vec3::new(4.0, 0.0, 0.0), Quat::IDENTITY);

        let (position, _) = backlog.interpolate(2.0).unwrap();
        assert!(position.distance(Vec3::new(2.0, 0.0, 0.0)) < 1e-6);

        // exact endpoints
        let (position, _) = backlog.interpolate(1.0).unwrap();
        assert!(position.distance(Vec3::ZERO) < 1e-6);
        let (position, _) = backlog.interpolate(3.0).unwrap();
        assert!(position.distance(Vec3::new(4.0, 0.0, 0.0)) < 1e-6);
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut backlog = PoseBacklog::with_capacity(3);
        for i in 0..5 {
            backlog.push(i as f64, Vec3::splat(i as f32), Quat::IDENTITY);
        }
        assert_eq!(backlog.len(), 3);
        assert!(!backlog.interpolatable(1.0));
        assert!(backlog.interpolatable(3.0));
    }

    #[test]
    fn out_of_order_samples_are_dropped() {
        let mut backlog = PoseBacklog::default();
        backlog.push(2.0, Vec3::X, Quat::IDENTITY);
        backlog.push(1.0, Vec3::ZERO, Quat::IDENTITY);
        assert_eq!(backlog.len(), 1);
    }
}
