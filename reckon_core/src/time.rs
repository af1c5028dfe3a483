/*! Game and network clocks.

All prediction math runs on a single monotonic network-synchronized clock
(f64 seconds). Locally the clock is game time plus a replicated offset; how
the offset is agreed on is the transport's business, we only consume it.
*/
use bevy_ecs::prelude::*;
use bevy_reflect::Reflect;
use bevy_time::Time;

/// Frame-advanced clock pair: local game time and shared network time.
///
/// Advanced exactly once per frame (in `First`) so that every system in the
/// frame observes the same `now`.
#[derive(Resource, Debug, Clone, PartialEq, Reflect)]
pub struct SyncClock {
    elapsed: f64,
    /// Offset from local game time to the shared network clock.
    offset: f64,
}

impl Default for SyncClock {
    fn default() -> Self {
        Self {
            elapsed: 0.0,
            offset: 0.0,
        }
    }
}

impl SyncClock {
    /// Local game time, seconds since startup.
    pub fn now_game(&self) -> f32 {
        self.elapsed as f32
    }

    /// Shared network time, seconds, double precision.
    pub fn now_network(&self) -> f64 {
        self.elapsed + self.offset
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Adopt a new game-to-network offset (reported by the transport's time
    /// synchronization).
    pub fn set_offset(&mut self, offset: f64) {
        self.offset = offset;
    }

    pub fn advance(&mut self, delta: f64) {
        self.elapsed += delta;
    }
}

pub(crate) fn advance_clock(time: Res<Time>, mut clock: ResMut<SyncClock>) {
    clock.advance(time.delta_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_log::test;

    #[test]
    fn network_time_is_game_time_plus_offset() {
        let mut clock = SyncClock::default();
        clock.advance(1.5);
        clock.set_offset(100.0);
        assert_relative_eq!(clock.now_game(), 1.5);
        assert_relative_eq!(clock.now_network(), 101.5);
        clock.advance(0.25);
        assert_relative_eq!(clock.now_network(), 101.75);
    }
}
