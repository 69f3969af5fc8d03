//! Platform abstraction layer
//!
//! The simulation never draws, integrates physics or owns timers itself. It
//! consumes those capabilities through [`Backend`]:
//! - Bodies (create/destroy/move/show)
//! - Overlap watches between a body and every body carrying a tag
//! - Clock and one-shot/repeating timers
//! - HUD text
//!
//! Pointer, key, timer and overlap callbacks flow the other way as
//! [`crate::sim::GameInput`] messages.

pub mod headless;

pub use headless::HeadlessBackend;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::Millis;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

handle!(
    /// A body owned by the backend
    BodyHandle
);
handle!(
    /// A registered overlap watch
    ColliderHandle
);
handle!(
    /// A scheduled one-shot or repeating timer
    TimerHandle
);

/// Body groups used for overlap watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyTag {
    Player,
    Obstacle,
    Gravestone,
}

impl BodyTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyTag::Player => "player",
            BodyTag::Obstacle => "obstacle",
            BodyTag::Gravestone => "gravestone",
        }
    }
}

/// HUD labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSlot {
    Energy,
    Score,
}

impl TextSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextSlot::Energy => "energy",
            TextSlot::Score => "score",
        }
    }
}

/// Visual + collision description of a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Rect { width: f32, height: f32 },
    Circle { radius: f32 },
    /// Deck plus two wheels hanging under its ends
    Skateboard {
        width: f32,
        height: f32,
        wheel_radius: f32,
    },
}

/// Collision volume, centered on the body position
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collider {
    Circle { radius: f32 },
    Rect { half: Vec2 },
}

impl Shape {
    pub fn collider(&self) -> Collider {
        match *self {
            Shape::Rect { width, height } => Collider::Rect {
                half: Vec2::new(width, height) / 2.0,
            },
            Shape::Circle { radius } => Collider::Circle { radius },
            // Wheels are ornaments
            Shape::Skateboard { width, height, .. } => Collider::Rect {
                half: Vec2::new(width, height) / 2.0,
            },
        }
    }

    /// Wheel centers relative to the body, empty for plain shapes
    #[cfg(test)]
    pub(crate) fn ornaments(&self) -> Vec<(Vec2, f32)> {
        match *self {
            Shape::Skateboard {
                width,
                height,
                wheel_radius,
            } => {
                let dx = width / 3.0;
                let dy = height / 2.0 + wheel_radius;
                vec![
                    (Vec2::new(-dx, dy), wheel_radius),
                    (Vec2::new(dx, dy), wheel_radius),
                ]
            }
            _ => Vec::new(),
        }
    }
}

impl Collider {
    /// Overlap test between two colliders placed at `a` and `b`
    pub fn overlaps(&self, a: Vec2, other: &Collider, b: Vec2) -> bool {
        match (*self, *other) {
            (Collider::Circle { radius: ra }, Collider::Circle { radius: rb }) => {
                a.distance_squared(b) < (ra + rb) * (ra + rb)
            }
            (Collider::Rect { half: ha }, Collider::Rect { half: hb }) => {
                let d = (a - b).abs();
                d.x < ha.x + hb.x && d.y < ha.y + hb.y
            }
            (Collider::Circle { radius }, Collider::Rect { half }) => {
                circle_rect(a, radius, b, half)
            }
            (Collider::Rect { half }, Collider::Circle { radius }) => {
                circle_rect(b, radius, a, half)
            }
        }
    }
}

#[inline]
fn circle_rect(center: Vec2, radius: f32, rect_center: Vec2, half: Vec2) -> bool {
    let closest = center.clamp(rect_center - half, rect_center + half);
    closest.distance_squared(center) < radius * radius
}

/// Rendering/physics/timer collaborator consumed by the simulation
pub trait Backend {
    /// Current time on the collaborator's clock
    fn now(&self) -> Millis;

    fn create_body(&mut self, tag: BodyTag, shape: Shape, pos: Vec2) -> BodyHandle;
    fn destroy_body(&mut self, body: BodyHandle);
    fn set_velocity(&mut self, body: BodyHandle, vel: Vec2);
    fn set_position(&mut self, body: BodyHandle, pos: Vec2);
    /// Position after the collaborator's latest physics step
    fn position(&self, body: BodyHandle) -> Option<Vec2>;
    fn set_visible(&mut self, body: BodyHandle, visible: bool);

    /// Report overlaps between `body` and every body tagged `tag`
    fn watch_overlap(&mut self, body: BodyHandle, tag: BodyTag) -> ColliderHandle;
    fn unwatch_overlap(&mut self, collider: ColliderHandle);

    fn every(&mut self, interval: Millis) -> TimerHandle;
    fn after(&mut self, delay: Millis) -> TimerHandle;
    fn cancel(&mut self, timer: TimerHandle);

    fn set_text(&mut self, slot: TextSlot, text: &str);
}
