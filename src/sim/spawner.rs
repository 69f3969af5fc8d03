//! Obstacle spawning
//!
//! All randomness comes from a seeded PCG stream so a run is reproducible
//! from its seed and input sequence.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::registry::EntityRegistry;
use super::state::{Obstacle, ObstacleKind};
use crate::consts::ARENA_WIDTH;
use crate::platform::{Backend, BodyTag};
use crate::tuning::{Span, Tuning};

/// A rolled obstacle before it has a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPlan {
    pub x: f32,
    pub kind: ObstacleKind,
}

#[derive(Debug, Clone)]
pub struct Spawner {
    rng: Pcg32,
    next_id: u32,
}

impl Spawner {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
        }
    }

    fn roll_span(&mut self, span: Span) -> f32 {
        if span.max > span.min {
            self.rng.random_range(span.min..=span.max)
        } else {
            span.min
        }
    }

    /// Pick position, class and dimensions
    pub fn roll(&mut self, tuning: &Tuning) -> SpawnPlan {
        let x = self.roll_span(Span::new(
            tuning.spawn_margin,
            ARENA_WIDTH - tuning.spawn_margin,
        ));
        let kind = if self.rng.random_bool(0.5) {
            ObstacleKind::Stone {
                radius: self.roll_span(tuning.stone_radius),
            }
        } else {
            ObstacleKind::Skateboard {
                width: self.roll_span(tuning.skateboard_width),
            }
        };
        SpawnPlan { x, kind }
    }

    /// Roll an obstacle, give it a body falling at `speed` and register it
    pub fn spawn_one<B: Backend>(
        &mut self,
        backend: &mut B,
        registry: &mut EntityRegistry,
        tuning: &Tuning,
        speed: f32,
    ) -> Obstacle {
        let plan = self.roll(tuning);
        let pos = Vec2::new(plan.x, 0.0);
        let body = backend.create_body(BodyTag::Obstacle, plan.kind.shape(tuning), pos);
        backend.set_velocity(body, Vec2::new(0.0, speed));

        let obstacle = Obstacle {
            id: self.next_id,
            body,
            kind: plan.kind,
            pos,
            speed,
        };
        self.next_id += 1;

        log::debug!(
            "Spawned obstacle {} {:?} at x={:.0} speed={}",
            obstacle.id,
            obstacle.kind,
            plan.x,
            speed
        );
        registry.add_obstacle(obstacle.clone());
        obstacle
    }
}
