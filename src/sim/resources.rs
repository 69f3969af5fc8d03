//! Energy, score and difficulty bookkeeping

use serde::{Deserialize, Serialize};

use crate::Millis;
use crate::tuning::Tuning;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    /// Tap-driven, drains while idle
    pub energy: u32,
    /// Obstacles cleared this run
    pub score: u32,
    /// Fall speed given to newly spawned obstacles
    pub obstacle_speed: f32,
    /// Last tap or decay, whichever is later
    pub last_tap_time: Millis,
}

impl Resources {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            energy: 0,
            score: 0,
            obstacle_speed: tuning.base_obstacle_speed,
            last_tap_time: 0,
        }
    }

    pub fn on_tap(&mut self, now: Millis) {
        self.energy = self.energy.saturating_add(1);
        self.last_tap_time = now;
    }

    /// Drain one energy if a full interval passed since the last tap/decay
    ///
    /// Returns true when the reference time moved.
    pub fn on_decay_tick(&mut self, now: Millis, tuning: &Tuning) -> bool {
        if now.saturating_sub(self.last_tap_time) > tuning.decay_interval_ms {
            self.energy = self.energy.saturating_sub(1);
            self.last_tap_time = now;
            true
        } else {
            false
        }
    }

    /// Count a cleared obstacle; returns true when it triggered a difficulty step
    pub fn on_obstacle_cleared(&mut self, tuning: &Tuning) -> bool {
        self.score = self.score.saturating_add(1);
        if self.score.is_multiple_of(tuning.score_per_step.max(1)) {
            self.obstacle_speed += tuning.speed_step;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self, tuning: &Tuning) {
        *self = Self::new(tuning);
    }
}
