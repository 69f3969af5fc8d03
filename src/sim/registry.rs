//! Entity registry
//!
//! Owns the live obstacle set and the player/gravestone handles. Every body
//! it creates is destroyed through it, so handle lifetimes stay balanced.

use glam::Vec2;

use super::state::{Gravestone, Obstacle, Player};
use crate::platform::{Backend, BodyHandle, BodyTag, Shape};
use crate::tuning::Tuning;

const GRAVESTONE_SHAPE: Shape = Shape::Rect {
    width: 24.0,
    height: 32.0,
};

#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    obstacles: Vec<Obstacle>,
    player: Option<Player>,
    gravestone: Option<Gravestone>,
}

impl EntityRegistry {
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn player(&self) -> Option<&Player> {
        self.player.as_ref()
    }

    pub fn gravestone(&self) -> Option<&Gravestone> {
        self.gravestone.as_ref()
    }

    pub fn is_obstacle(&self, body: BodyHandle) -> bool {
        self.obstacles.iter().any(|o| o.body == body)
    }

    pub fn add_obstacle(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    /// Remove every obstacle below `bottom`, calling `on_cleared` once per removal
    pub fn reap_offscreen<B: Backend>(
        &mut self,
        backend: &mut B,
        bottom: f32,
        mut on_cleared: impl FnMut(&Obstacle),
    ) -> usize {
        let before = self.obstacles.len();
        self.obstacles.retain_mut(|obstacle| {
            if let Some(pos) = backend.position(obstacle.body) {
                obstacle.pos = pos;
            }
            if obstacle.pos.y > bottom {
                backend.destroy_body(obstacle.body);
                on_cleared(obstacle);
                false
            } else {
                true
            }
        });
        before - self.obstacles.len()
    }

    pub fn clear_all<B: Backend>(&mut self, backend: &mut B) {
        for obstacle in self.obstacles.drain(..) {
            backend.destroy_body(obstacle.body);
        }
    }

    /// Stop every obstacle where it is
    pub fn freeze_all<B: Backend>(&mut self, backend: &mut B) {
        for obstacle in &mut self.obstacles {
            if let Some(pos) = backend.position(obstacle.body) {
                obstacle.pos = pos;
            }
            backend.set_velocity(obstacle.body, Vec2::ZERO);
        }
    }

    // === Player ===

    pub fn spawn_player<B: Backend>(&mut self, backend: &mut B, tuning: &Tuning) -> BodyHandle {
        self.destroy_player(backend);
        let shape = Shape::Rect {
            width: tuning.player_size.x,
            height: tuning.player_size.y,
        };
        let body = backend.create_body(BodyTag::Player, shape, tuning.player_spawn);
        self.player = Some(Player {
            body,
            pos: tuning.player_spawn,
            visible: true,
        });
        body
    }

    pub fn destroy_player<B: Backend>(&mut self, backend: &mut B) {
        if let Some(player) = self.player.take() {
            backend.destroy_body(player.body);
        }
    }

    /// Refresh and return the player's position
    pub fn sync_player<B: Backend>(&mut self, backend: &B) -> Option<Vec2> {
        let player = self.player.as_mut()?;
        match backend.position(player.body) {
            Some(pos) => player.pos = pos,
            None => log::warn!("Player body {:?} missing, using last position", player.body),
        }
        Some(player.pos)
    }

    pub fn hide_player<B: Backend>(&mut self, backend: &mut B) {
        if let Some(player) = self.player.as_mut() {
            backend.set_velocity(player.body, Vec2::ZERO);
            backend.set_visible(player.body, false);
            player.visible = false;
        }
    }

    /// Teleport the player to `target_x`, clamped into the arena
    pub fn move_player<B: Backend>(&mut self, backend: &mut B, target_x: f32, tuning: &Tuning) {
        let Some(player) = self.player.as_mut() else {
            return;
        };
        player.pos.x = target_x.clamp(tuning.player_min_x(), tuning.player_max_x());
        backend.set_position(player.body, player.pos);
    }

    /// Keyboard steering: fixed speed toward the held direction
    pub fn steer_player<B: Backend>(
        &mut self,
        backend: &mut B,
        left: bool,
        right: bool,
        tuning: &Tuning,
    ) {
        let Some(player) = self.player.as_ref() else {
            return;
        };
        let vx = if left {
            -tuning.player_speed
        } else if right {
            tuning.player_speed
        } else {
            0.0
        };
        backend.set_velocity(player.body, Vec2::new(vx, 0.0));
    }

    /// Pull the player back inside the arena after a physics step
    pub fn bound_player<B: Backend>(&mut self, backend: &mut B, tuning: &Tuning) {
        let Some(pos) = self.sync_player(backend) else {
            return;
        };
        let x = pos.x.clamp(tuning.player_min_x(), tuning.player_max_x());
        if x != pos.x {
            self.move_player(backend, x, tuning);
        }
    }

    // === Gravestone ===

    /// Create the hidden gravestone on first use
    pub fn ensure_gravestone<B: Backend>(&mut self, backend: &mut B, tuning: &Tuning) {
        if self.gravestone.is_some() {
            return;
        }
        let body = backend.create_body(BodyTag::Gravestone, GRAVESTONE_SHAPE, tuning.player_spawn);
        backend.set_visible(body, false);
        self.gravestone = Some(Gravestone {
            body,
            pos: tuning.player_spawn,
            visible: false,
        });
    }

    pub fn show_gravestone<B: Backend>(&mut self, backend: &mut B, pos: Vec2) {
        if let Some(stone) = self.gravestone.as_mut() {
            stone.pos = pos;
            stone.visible = true;
            backend.set_position(stone.body, pos);
            backend.set_visible(stone.body, true);
        }
    }

    pub fn hide_gravestone<B: Backend>(&mut self, backend: &mut B) {
        if let Some(stone) = self.gravestone.as_mut() {
            stone.visible = false;
            backend.set_visible(stone.body, false);
        }
    }

    pub fn destroy_gravestone<B: Backend>(&mut self, backend: &mut B) {
        if let Some(stone) = self.gravestone.take() {
            backend.destroy_body(stone.body);
        }
    }
}
