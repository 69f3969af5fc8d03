//! Tap Dodge - a single-screen reflex game
//!
//! Core modules:
//! - `sim`: Deterministic gameplay state machine (entities, energy/score, spawning)
//! - `platform`: Rendering/physics/timer collaborator seam and a headless backend
//! - `tuning`: Data-driven game balance

pub mod platform;
pub mod sim;
pub mod tuning;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Arena dimensions (pixels)
    pub const ARENA_WIDTH: f32 = 400.0;
    pub const ARENA_HEIGHT: f32 = 600.0;

    /// Host frame rate assumed by the native demo
    pub const FRAME_MS: u64 = 16;
}

/// Milliseconds on the collaborator's clock
pub type Millis = u64;
