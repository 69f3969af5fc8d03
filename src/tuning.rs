//! Data-driven game balance
//!
//! Every gameplay constant lives here so a host can override them from JSON.
//! Missing fields fall back to defaults; nonsensical values are clamped.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::Millis;
use crate::consts::*;

/// Inclusive `[min, max]` range for random rolls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f32,
    pub max: f32,
}

impl Span {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Swap inverted bounds
    fn ordered(self) -> Self {
        if self.min <= self.max {
            self
        } else {
            Self::new(self.max, self.min)
        }
    }

    /// Ordered, with negative bounds raised to zero
    fn non_negative(self) -> Self {
        let span = self.ordered();
        Self::new(span.min.max(0.0), span.max.max(0.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Difficulty ===
    /// Obstacle fall speed at the start of every run (px/s)
    pub base_obstacle_speed: f32,
    /// Speed added per difficulty step (px/s)
    pub speed_step: f32,
    /// A difficulty step happens every time score hits a multiple of this
    pub score_per_step: u32,

    // === Timing ===
    /// Energy drains by one after this long without a tap or decay
    pub decay_interval_ms: Millis,
    pub spawn_interval_ms: Millis,
    /// Delay between death and the automatic restart
    pub respawn_delay_ms: Millis,

    // === Obstacles ===
    /// Horizontal spawn positions stay this far from either edge
    pub spawn_margin: f32,
    pub stone_radius: Span,
    pub skateboard_width: Span,
    pub skateboard_height: f32,
    /// Decorative only, never collides
    pub wheel_radius: f32,
    /// Obstacles below this y are reaped
    pub bottom_boundary: f32,

    // === Player ===
    pub player_spawn: Vec2,
    pub player_size: Vec2,
    /// Keyboard movement speed (px/s)
    pub player_speed: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            base_obstacle_speed: 150.0,
            speed_step: 20.0,
            score_per_step: 5,

            decay_interval_ms: 1000,
            spawn_interval_ms: 1500,
            respawn_delay_ms: 1000,

            spawn_margin: 50.0,
            stone_radius: Span::new(12.0, 24.0),
            skateboard_width: Span::new(40.0, 72.0),
            skateboard_height: 10.0,
            wheel_radius: 5.0,
            bottom_boundary: ARENA_HEIGHT,

            player_spawn: Vec2::new(ARENA_WIDTH / 2.0, 500.0),
            player_size: Vec2::new(32.0, 32.0),
            player_speed: 200.0,
        }
    }
}

impl Tuning {
    /// Parse (possibly partial) JSON over the defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let tuning: Tuning = serde_json::from_str(json)?;
        let sanitized = tuning.clone().sanitized();
        if sanitized != tuning {
            log::warn!("Tuning contained out-of-range values, clamped");
        }
        Ok(sanitized)
    }

    /// Clamp values the simulation cannot work with
    pub fn sanitized(mut self) -> Self {
        self.score_per_step = self.score_per_step.max(1);
        self.decay_interval_ms = self.decay_interval_ms.max(1);
        self.spawn_interval_ms = self.spawn_interval_ms.max(1);
        self.base_obstacle_speed = self.base_obstacle_speed.max(0.0);
        self.speed_step = self.speed_step.max(0.0);
        self.spawn_margin = self.spawn_margin.clamp(0.0, ARENA_WIDTH / 2.0);
        self.stone_radius = self.stone_radius.non_negative();
        self.skateboard_width = self.skateboard_width.non_negative();
        self.skateboard_height = self.skateboard_height.max(0.0);
        self.wheel_radius = self.wheel_radius.max(0.0);
        // Wider than the arena would leave no valid x for the player
        self.player_size = self
            .player_size
            .clamp(Vec2::ZERO, Vec2::new(ARENA_WIDTH, ARENA_HEIGHT));
        self.player_speed = self.player_speed.abs();
        self
    }

    /// Leftmost x the player's center may occupy
    pub fn player_min_x(&self) -> f32 {
        self.player_size.x / 2.0
    }

    /// Rightmost x the player's center may occupy
    pub fn player_max_x(&self) -> f32 {
        ARENA_WIDTH - self.player_size.x / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "base_obstacle_speed": 90.0 }"#).unwrap();
        assert_eq!(tuning.base_obstacle_speed, 90.0);
        assert_eq!(tuning.spawn_interval_ms, 1500);
        assert_eq!(tuning.speed_step, 20.0);
    }

    #[test]
    fn test_bad_values_are_clamped() {
        let tuning = Tuning::from_json(
            r#"{ "score_per_step": 0, "stone_radius": { "min": 30.0, "max": 10.0 } }"#,
        )
        .unwrap();
        assert_eq!(tuning.score_per_step, 1);
        assert_eq!(tuning.stone_radius, Span::new(10.0, 30.0));
    }

    #[test]
    fn test_sizes_clamped_into_arena() {
        let tuning = Tuning::from_json(
            r#"{
                "player_size": [500.0, -8.0],
                "stone_radius": { "min": -4.0, "max": 6.0 },
                "skateboard_width": { "min": -10.0, "max": -2.0 },
                "skateboard_height": -1.0,
                "wheel_radius": -3.0
            }"#,
        )
        .unwrap();
        assert_eq!(tuning.player_size, Vec2::new(ARENA_WIDTH, 0.0));
        assert!(tuning.player_min_x() <= tuning.player_max_x());
        assert_eq!(tuning.stone_radius, Span::new(0.0, 6.0));
        assert_eq!(tuning.skateboard_width, Span::new(0.0, 0.0));
        assert_eq!(tuning.skateboard_height, 0.0);
        assert_eq!(tuning.wheel_radius, 0.0);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(Tuning::from_json("{ not json").is_err());
    }

    #[test]
    fn test_player_bounds() {
        let tuning = Tuning::default();
        assert_eq!(tuning.player_min_x(), 16.0);
        assert_eq!(tuning.player_max_x(), 384.0);
    }
}
