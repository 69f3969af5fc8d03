//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must stay pure:
//! - Time only from the backend clock or input timestamps
//! - Seeded RNG only
//! - Stable iteration order (spawn order)
//! - No rendering or platform dependencies beyond the `Backend` trait

pub mod game;
pub mod registry;
pub mod resources;
pub mod spawner;
pub mod state;

pub use game::Game;
pub use registry::EntityRegistry;
pub use resources::Resources;
pub use spawner::{SpawnPlan, Spawner};
pub use state::{GameInput, Gravestone, Obstacle, ObstacleKind, Player, RunPhase, SimEvent};
