//! Entity and run-state types
//!
//! Handles point into the backend; positions here are the last values the
//! simulation observed, used when the backend can no longer answer.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::Millis;
use crate::platform::{BodyHandle, Shape, TimerHandle};
use crate::tuning::Tuning;

/// Current phase of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    /// Player alive, obstacles falling
    Running,
    /// Gravestone shown, waiting for the respawn timer
    Dead,
}

/// Obstacle variants, each with its rolled dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ObstacleKind {
    Stone { radius: f32 },
    Skateboard { width: f32 },
}

impl ObstacleKind {
    pub fn shape(&self, tuning: &Tuning) -> Shape {
        match *self {
            ObstacleKind::Stone { radius } => Shape::Circle { radius },
            ObstacleKind::Skateboard { width } => Shape::Skateboard {
                width,
                height: tuning.skateboard_height,
                wheel_radius: tuning.wheel_radius,
            },
        }
    }
}

/// A falling obstacle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    pub body: BodyHandle,
    pub kind: ObstacleKind,
    pub pos: Vec2,
    /// Fall speed fixed at spawn time
    pub speed: f32,
}

/// The player's avatar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub body: BodyHandle,
    pub pos: Vec2,
    pub visible: bool,
}

/// Marker left where the player died
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gravestone {
    pub body: BodyHandle,
    pub pos: Vec2,
    pub visible: bool,
}

/// Messages delivered into [`super::Game::handle`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameInput {
    /// One host frame after physics has moved the bodies
    Frame,
    PointerDown { pos: Vec2, now: Millis },
    PointerMove { pos: Vec2, down: bool },
    /// Held direction keys
    Keys { left: bool, right: bool },
    TimerFired(TimerHandle),
    Overlap {
        player: BodyHandle,
        obstacle: BodyHandle,
    },
}

/// Notable things that happened, drained by the host for audio/fx
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    ObstacleSpawned { id: u32, kind: ObstacleKind },
    ObstacleCleared { id: u32, score: u32 },
    DifficultyUp { speed: f32 },
    Died { energy: u32, score: u32, pos: Vec2 },
    RunStarted { run: u32 },
}
