//! Run state machine
//!
//! `Running -> Dead -> (respawn delay) -> Running`. Every collaborator
//! callback arrives as a [`GameInput`] through [`Game::handle`], so all
//! mutation happens from one call site.
//!
//! Timer and collider handles are owned here. The spawn timer lives exactly
//! as long as a run and is cancelled on death. The player collider is
//! replaced, never duplicated, when a new run creates a new player.

use glam::Vec2;

use super::registry::EntityRegistry;
use super::resources::Resources;
use super::spawner::Spawner;
use super::state::{GameInput, RunPhase, SimEvent};
use crate::Millis;
use crate::platform::{Backend, BodyHandle, BodyTag, ColliderHandle, TextSlot, TimerHandle};
use crate::tuning::Tuning;

#[derive(Debug)]
pub struct Game {
    pub tuning: Tuning,
    pub resources: Resources,
    phase: RunPhase,
    registry: EntityRegistry,
    spawner: Spawner,
    spawn_timer: Option<TimerHandle>,
    respawn_timer: Option<TimerHandle>,
    collider: Option<ColliderHandle>,
    /// Runs started, including the first
    run: u32,
    /// Values currently on the HUD, `None` forces a redraw
    shown_energy: Option<u32>,
    shown_score: Option<u32>,
    events: Vec<SimEvent>,
}

impl Game {
    /// Build the level and start the first run
    pub fn new<B: Backend>(backend: &mut B, tuning: Tuning, seed: u64) -> Self {
        let tuning = tuning.sanitized();
        let mut game = Self {
            resources: Resources::new(&tuning),
            tuning,
            phase: RunPhase::Running,
            registry: EntityRegistry::default(),
            spawner: Spawner::new(seed),
            spawn_timer: None,
            respawn_timer: None,
            collider: None,
            run: 0,
            shown_energy: None,
            shown_score: None,
            events: Vec::new(),
        };
        log::info!("Game created with seed {}", seed);
        game.registry.ensure_gravestone(backend, &game.tuning);
        game.start_run(backend);
        game
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_dead(&self) -> bool {
        self.phase == RunPhase::Dead
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn run(&self) -> u32 {
        self.run
    }

    pub fn player_body(&self) -> Option<BodyHandle> {
        self.registry.player().map(|p| p.body)
    }

    /// Take the events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Single entry point for every collaborator callback
    pub fn handle<B: Backend>(&mut self, backend: &mut B, input: GameInput) {
        match input {
            GameInput::Frame => self.frame(backend),
            GameInput::PointerDown { now, .. } => self.tap(backend, now),
            GameInput::PointerMove { pos, down } => {
                if down && !self.is_dead() {
                    self.registry.move_player(backend, pos.x, &self.tuning);
                }
            }
            GameInput::Keys { left, right } => {
                if !self.is_dead() {
                    self.registry.steer_player(backend, left, right, &self.tuning);
                }
            }
            GameInput::TimerFired(timer) => self.timer_fired(backend, timer),
            GameInput::Overlap { player, obstacle } => self.overlap(backend, player, obstacle),
        }
    }

    fn tap<B: Backend>(&mut self, backend: &mut B, now: Millis) {
        if self.is_dead() {
            return;
        }
        self.resources.on_tap(now);
        self.refresh_hud(backend);
    }

    fn frame<B: Backend>(&mut self, backend: &mut B) {
        if self.is_dead() {
            return;
        }

        self.resources.on_decay_tick(backend.now(), &self.tuning);
        self.registry.bound_player(backend, &self.tuning);

        let bottom = self.tuning.bottom_boundary;
        self.registry.reap_offscreen(backend, bottom, |obstacle| {
            let stepped = self.resources.on_obstacle_cleared(&self.tuning);
            log::debug!(
                "Obstacle {} cleared, score {}",
                obstacle.id,
                self.resources.score
            );
            self.events.push(SimEvent::ObstacleCleared {
                id: obstacle.id,
                score: self.resources.score,
            });
            if stepped {
                log::info!(
                    "Difficulty up: obstacle speed {}",
                    self.resources.obstacle_speed
                );
                self.events.push(SimEvent::DifficultyUp {
                    speed: self.resources.obstacle_speed,
                });
            }
        });

        self.refresh_hud(backend);
    }

    fn timer_fired<B: Backend>(&mut self, backend: &mut B, timer: TimerHandle) {
        if self.spawn_timer == Some(timer) {
            if self.is_dead() {
                return;
            }
            let speed = self.resources.obstacle_speed;
            let obstacle = self
                .spawner
                .spawn_one(backend, &mut self.registry, &self.tuning, speed);
            self.events.push(SimEvent::ObstacleSpawned {
                id: obstacle.id,
                kind: obstacle.kind,
            });
        } else if self.respawn_timer == Some(timer) {
            self.respawn_timer = None;
            self.start_run(backend);
        } else {
            log::debug!("Ignoring stale timer {:?}", timer);
        }
    }

    fn overlap<B: Backend>(&mut self, backend: &mut B, player: BodyHandle, obstacle: BodyHandle) {
        if self.is_dead() {
            return;
        }
        if self.player_body() != Some(player) {
            log::warn!("Overlap for unknown player body {:?}", player);
            return;
        }
        if !self.registry.is_obstacle(obstacle) {
            log::debug!("Overlap with non-live obstacle {:?}", obstacle);
            return;
        }
        self.die(backend);
    }

    /// Running -> Dead
    fn die<B: Backend>(&mut self, backend: &mut B) {
        self.phase = RunPhase::Dead;

        let pos = self
            .registry
            .sync_player(backend)
            .unwrap_or(self.tuning.player_spawn);
        self.registry.hide_player(backend);
        self.registry.show_gravestone(backend, pos);

        // The collider stays registered; overlaps are ignored while dead
        self.stop_spawning(backend);
        // The colliding obstacle stays, frozen with the rest, until the restart clears it
        self.registry.freeze_all(backend);

        if let Some(stale) = self.respawn_timer.take() {
            backend.cancel(stale);
        }
        self.respawn_timer = Some(backend.after(self.tuning.respawn_delay_ms));

        let energy = self.resources.energy;
        let score = self.resources.score;
        backend.set_text(
            TextSlot::Energy,
            &format!("Game Over! Final Energy: {}", energy),
        );
        self.shown_energy = None;

        log::info!(
            "Run {} ended at ({:.0}, {:.0}): energy {}, score {}",
            self.run,
            pos.x,
            pos.y,
            energy,
            score
        );
        self.events.push(SimEvent::Died { energy, score, pos });
    }

    /// (Re)initialize the level and enter Running
    fn start_run<B: Backend>(&mut self, backend: &mut B) {
        self.registry.hide_gravestone(backend);
        self.registry.clear_all(backend);
        if let Some(stale) = self.collider.take() {
            backend.unwatch_overlap(stale);
        }
        let player = self.registry.spawn_player(backend, &self.tuning);
        self.resources.reset(&self.tuning);

        self.collider = Some(backend.watch_overlap(player, BodyTag::Obstacle));

        self.stop_spawning(backend);
        self.spawn_timer = Some(backend.every(self.tuning.spawn_interval_ms));

        self.phase = RunPhase::Running;
        self.run += 1;
        self.shown_energy = None;
        self.shown_score = None;
        self.refresh_hud(backend);

        log::info!("Run {} started", self.run);
        self.events.push(SimEvent::RunStarted { run: self.run });
    }

    fn stop_spawning<B: Backend>(&mut self, backend: &mut B) {
        if let Some(timer) = self.spawn_timer.take() {
            backend.cancel(timer);
        }
    }

    fn refresh_hud<B: Backend>(&mut self, backend: &mut B) {
        let Resources { energy, score, .. } = self.resources;
        if self.shown_energy != Some(energy) {
            backend.set_text(TextSlot::Energy, &format!("Energy: {}", energy));
            self.shown_energy = Some(energy);
        }
        if self.shown_score != Some(score) {
            backend.set_text(TextSlot::Score, &format!("Score: {}", score));
            self.shown_score = Some(score);
        }
    }

    /// Release every body, timer and watch this game created
    ///
    /// Leaves the game in `Dead` with no respawn pending, so later inputs are no-ops.
    pub fn shutdown<B: Backend>(&mut self, backend: &mut B) {
        self.phase = RunPhase::Dead;
        self.stop_spawning(backend);
        if let Some(timer) = self.respawn_timer.take() {
            backend.cancel(timer);
        }
        if let Some(collider) = self.collider.take() {
            backend.unwatch_overlap(collider);
        }
        self.registry.clear_all(backend);
        self.registry.destroy_player(backend);
        self.registry.destroy_gravestone(backend);
        log::info!("Game shut down after {} runs", self.run);
    }

    /// Player position as last observed
    pub fn player_pos(&self) -> Option<Vec2> {
        self.registry.player().map(|p| p.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::ARENA_WIDTH;
    use crate::platform::HeadlessBackend;

    /// Player parked in the left corner, obstacles kept well right of it
    fn safe_tuning() -> Tuning {
        Tuning {
            spawn_margin: 100.0,
            player_spawn: Vec2::new(16.0, 500.0),
            ..Tuning::default()
        }
    }

    fn step(game: &mut Game, backend: &mut HeadlessBackend, ms: Millis) {
        let mut left = ms;
        while left > 0 {
            let dt = left.min(100);
            for input in backend.advance(dt) {
                game.handle(backend, input);
            }
            left -= dt;
        }
    }

    fn tap(game: &mut Game, backend: &mut HeadlessBackend) {
        let now = backend.now();
        game.handle(
            backend,
            GameInput::PointerDown {
                pos: Vec2::new(200.0, 300.0),
                now,
            },
        );
    }

    /// Report an overlap between the player and the oldest live obstacle
    fn collide(game: &mut Game, backend: &mut HeadlessBackend) {
        let player = game.player_body().unwrap();
        let obstacle = game.registry().obstacles()[0].body;
        game.handle(backend, GameInput::Overlap { player, obstacle });
    }

    fn assert_fresh_run(game: &Game, backend: &HeadlessBackend) {
        assert_eq!(game.phase(), RunPhase::Running);
        assert_eq!(game.resources.energy, 0);
        assert_eq!(game.resources.score, 0);
        assert_eq!(game.resources.obstacle_speed, game.tuning.base_obstacle_speed);
        assert!(game.registry().obstacles().is_empty());
        assert_eq!(backend.count_tagged(BodyTag::Obstacle), 0);
        assert_eq!(backend.count_tagged(BodyTag::Player), 1);
        assert_eq!(backend.count_tagged(BodyTag::Gravestone), 1);

        let player = backend.body(game.player_body().unwrap()).unwrap();
        assert!(player.visible);
        assert_eq!(player.pos, game.tuning.player_spawn);
        let stone = game.registry().gravestone().unwrap();
        assert!(!backend.body(stone.body).unwrap().visible);

        assert_eq!(backend.repeating_timers(), 1);
        assert_eq!(backend.active_watches(), 1);
    }

    #[test]
    fn test_new_game_starts_running() {
        let mut backend = HeadlessBackend::new();
        let mut game = Game::new(&mut backend, Tuning::default(), 12345);
        assert_fresh_run(&game, &backend);
        assert_eq!(game.run(), 1);
        assert_eq!(backend.active_timers(), 1);
        assert_eq!(backend.text(TextSlot::Energy), Some("Energy: 0"));
        assert_eq!(backend.text(TextSlot::Score), Some("Score: 0"));
        assert_eq!(game.drain_events(), vec![SimEvent::RunStarted { run: 1 }]);
    }

    #[test]
    fn test_spawn_cadence() {
        let mut backend = HeadlessBackend::new();
        let mut game = Game::new(&mut backend, Tuning::default(), 1);

        step(&mut game, &mut backend, 1400);
        assert!(game.registry().obstacles().is_empty());
        step(&mut game, &mut backend, 100);
        assert_eq!(game.registry().obstacles().len(), 1);
        step(&mut game, &mut backend, 1500);
        assert_eq!(game.registry().obstacles().len(), 2);

        let speeds: Vec<f32> = game.registry().obstacles().iter().map(|o| o.speed).collect();
        assert_eq!(speeds, vec![150.0, 150.0]);
    }

    #[test]
    fn test_tap_and_decay() {
        let mut backend = HeadlessBackend::new();
        let mut game = Game::new(&mut backend, safe_tuning(), 5);

        for _ in 0..3 {
            tap(&mut game, &mut backend);
        }
        assert_eq!(game.resources.energy, 3);
        assert_eq!(backend.text(TextSlot::Energy), Some("Energy: 3"));

        // Drains one per elapsed interval: at 1.1s, 2.2s, 3.3s
        step(&mut game, &mut backend, 1000);
        assert_eq!(game.resources.energy, 3);
        step(&mut game, &mut backend, 200);
        assert_eq!(game.resources.energy, 2);
        step(&mut game, &mut backend, 2300);
        assert_eq!(game.resources.energy, 0);
        step(&mut game, &mut backend, 3000);
        assert_eq!(game.resources.energy, 0);
        assert_eq!(backend.text(TextSlot::Energy), Some("Energy: 0"));

        // A tap restarts the decay reference
        tap(&mut game, &mut backend);
        assert_eq!(game.resources.last_tap_time, backend.now());
        step(&mut game, &mut backend, 1000);
        assert_eq!(game.resources.energy, 1);
    }

    #[test]
    fn test_clears_drive_score_and_difficulty() {
        let mut backend = HeadlessBackend::new();
        let mut game = Game::new(&mut backend, safe_tuning(), 42);

        // First obstacle spawns at 1.5s and passes y=600 at 5.5s
        step(&mut game, &mut backend, 5700);
        assert_eq!(game.resources.score, 1);
        assert_eq!(game.resources.obstacle_speed, 150.0);
        assert_eq!(backend.text(TextSlot::Score), Some("Score: 1"));

        // Fifth obstacle spawns at 7.5s and clears at 11.5s
        step(&mut game, &mut backend, 6300);
        assert_eq!(game.phase(), RunPhase::Running);
        assert_eq!(game.resources.score, 5);
        assert_eq!(game.resources.obstacle_speed, 170.0);

        // Spawned before the step keep their speed, the 12s spawn falls faster
        let speeds: Vec<f32> = game.registry().obstacles().iter().map(|o| o.speed).collect();
        assert_eq!(speeds, vec![150.0, 150.0, 170.0]);

        let events = game.drain_events();
        let cleared = events
            .iter()
            .filter(|e| matches!(e, SimEvent::ObstacleCleared { .. }))
            .count();
        assert_eq!(cleared, 5);
        assert!(events.contains(&SimEvent::DifficultyUp { speed: 170.0 }));
    }

    #[test]
    fn test_collision_death_and_restart() {
        let mut backend = HeadlessBackend::new();
        let mut game = Game::new(&mut backend, Tuning::default(), 9);
        step(&mut game, &mut backend, 1500);

        game.handle(
            &mut backend,
            GameInput::PointerMove {
                pos: Vec2::new(120.0, 0.0),
                down: true,
            },
        );
        for _ in 0..7 {
            tap(&mut game, &mut backend);
        }
        game.resources.score = 3;
        game.drain_events();

        collide(&mut game, &mut backend);
        assert!(game.is_dead());
        let player = backend.body(game.player_body().unwrap()).unwrap();
        assert!(!player.visible);
        let stone = backend.body(game.registry().gravestone().unwrap().body).unwrap();
        assert!(stone.visible);
        assert_eq!(stone.pos, Vec2::new(120.0, 500.0));
        assert_eq!(
            backend.text(TextSlot::Energy),
            Some("Game Over! Final Energy: 7")
        );
        assert_eq!(
            game.drain_events(),
            vec![SimEvent::Died {
                energy: 7,
                score: 3,
                pos: Vec2::new(120.0, 500.0)
            }]
        );

        // No spawn timer while dead, only the respawn delay
        assert_eq!(backend.repeating_timers(), 0);
        assert_eq!(backend.active_watches(), 1);
        assert_eq!(backend.active_timers(), 1);

        step(&mut game, &mut backend, 900);
        assert!(game.is_dead());
        step(&mut game, &mut backend, 100);
        assert_fresh_run(&game, &backend);
        assert_eq!(game.run(), 2);
        assert_eq!(backend.text(TextSlot::Energy), Some("Energy: 0"));
        assert_eq!(backend.text(TextSlot::Score), Some("Score: 0"));
    }

    #[test]
    fn test_dead_state_is_inert() {
        let mut backend = HeadlessBackend::new();
        let mut game = Game::new(&mut backend, Tuning::default(), 11);
        step(&mut game, &mut backend, 3000);
        let old_spawn_timer = game.spawn_timer.unwrap();
        tap(&mut game, &mut backend);
        collide(&mut game, &mut backend);

        let energy = game.resources.energy;
        let obstacles: Vec<BodyHandle> = game.registry().obstacles().iter().map(|o| o.body).collect();
        assert_eq!(obstacles.len(), 2);
        for body in &obstacles {
            assert_eq!(backend.body(*body).unwrap().vel, Vec2::ZERO);
            // Even pushed past the boundary nothing gets reaped
            backend.set_position(*body, Vec2::new(200.0, 900.0));
        }

        tap(&mut game, &mut backend);
        game.handle(&mut backend, GameInput::Keys { left: true, right: false });
        game.handle(&mut backend, GameInput::TimerFired(old_spawn_timer));
        game.handle(&mut backend, GameInput::Frame);
        collide(&mut game, &mut backend);
        step(&mut game, &mut backend, 500);

        assert!(game.is_dead());
        assert_eq!(game.resources.energy, energy);
        assert_eq!(game.resources.score, 0);
        let after: Vec<BodyHandle> = game.registry().obstacles().iter().map(|o| o.body).collect();
        assert_eq!(after, obstacles);
        assert_eq!(backend.body(game.player_body().unwrap()).unwrap().vel, Vec2::ZERO);
    }

    #[test]
    fn test_single_spawn_timer_across_restarts() {
        let mut backend = HeadlessBackend::new();
        let mut game = Game::new(&mut backend, Tuning::default(), 77);

        for run in 1..=5 {
            assert_eq!(game.run(), run);
            step(&mut game, &mut backend, 1500);
            assert_eq!(game.registry().obstacles().len(), 1);
            collide(&mut game, &mut backend);
            step(&mut game, &mut backend, 1000);
            assert_fresh_run(&game, &backend);
            assert_eq!(backend.active_timers(), 1);
        }

        // Still one spawn per interval after many restarts
        step(&mut game, &mut backend, 3000);
        assert_eq!(game.registry().obstacles().len(), 2);
    }

    #[test]
    fn test_stale_overlaps_ignored() {
        let mut backend = HeadlessBackend::new();
        let mut game = Game::new(&mut backend, Tuning::default(), 3);
        step(&mut game, &mut backend, 1500);
        let player = game.player_body().unwrap();
        let obstacle = game.registry().obstacles()[0].body;

        game.handle(
            &mut backend,
            GameInput::Overlap {
                player,
                obstacle: BodyHandle::from_raw(9999),
            },
        );
        game.handle(
            &mut backend,
            GameInput::Overlap {
                player: BodyHandle::from_raw(9999),
                obstacle,
            },
        );
        assert!(!game.is_dead());
    }

    #[test]
    fn test_real_collision_through_backend() {
        let tuning = Tuning {
            spawn_margin: 200.0,
            stone_radius: crate::tuning::Span::new(20.0, 20.0),
            skateboard_width: crate::tuning::Span::new(60.0, 60.0),
            ..Tuning::default()
        };
        let mut backend = HeadlessBackend::new();
        let mut game = Game::new(&mut backend, tuning, 8);

        // Obstacle drops straight onto the player at x=200
        step(&mut game, &mut backend, 5000);
        assert!(game.is_dead());
        assert_eq!(game.resources.score, 0);
        step(&mut game, &mut backend, 1000);
        assert_eq!(game.phase(), RunPhase::Running);
    }

    #[test]
    fn test_keyboard_and_drag_move_player() {
        let mut backend = HeadlessBackend::new();
        let mut game = Game::new(&mut backend, safe_tuning(), 2);
        let body = game.player_body().unwrap();

        game.handle(&mut backend, GameInput::Keys { left: false, right: true });
        step(&mut game, &mut backend, 500);
        assert_eq!(backend.position(body).unwrap().x, 116.0);

        game.handle(&mut backend, GameInput::Keys { left: false, right: false });
        // Moving without the pointer held does nothing
        game.handle(
            &mut backend,
            GameInput::PointerMove {
                pos: Vec2::new(300.0, 10.0),
                down: false,
            },
        );
        assert_eq!(backend.position(body).unwrap().x, 116.0);

        game.handle(
            &mut backend,
            GameInput::PointerMove {
                pos: Vec2::new(-40.0, 10.0),
                down: true,
            },
        );
        assert_eq!(backend.position(body).unwrap(), Vec2::new(16.0, 500.0));
    }

    #[test]
    fn test_hud_rewritten_only_on_change() {
        let mut backend = HeadlessBackend::new();
        let mut game = Game::new(&mut backend, safe_tuning(), 6);
        assert_eq!(backend.text_writes(TextSlot::Energy), 1);
        assert_eq!(backend.text_writes(TextSlot::Score), 1);

        // Idle frames before the first spawn change nothing
        step(&mut game, &mut backend, 500);
        assert_eq!(backend.text_writes(TextSlot::Energy), 1);
        assert_eq!(backend.text_writes(TextSlot::Score), 1);

        tap(&mut game, &mut backend);
        assert_eq!(backend.text(TextSlot::Energy), Some("Energy: 1"));
        assert_eq!(backend.text_writes(TextSlot::Energy), 2);
        assert_eq!(backend.text_writes(TextSlot::Score), 1);

        step(&mut game, &mut backend, 500);
        assert_eq!(backend.text_writes(TextSlot::Energy), 2);
        assert_eq!(backend.text_writes(TextSlot::Score), 1);
    }

    #[test]
    fn test_oversized_player_survives_frames() {
        let tuning = Tuning::from_json(r#"{ "player_size": [500.0, 32.0] }"#).unwrap();
        let mut backend = HeadlessBackend::new();
        let mut game = Game::new(&mut backend, tuning, 10);

        game.handle(&mut backend, GameInput::Frame);
        game.handle(
            &mut backend,
            GameInput::PointerMove {
                pos: Vec2::new(30.0, 0.0),
                down: true,
            },
        );
        game.handle(&mut backend, GameInput::Frame);
        assert_eq!(game.player_pos().unwrap().x, ARENA_WIDTH / 2.0);
    }

    #[test]
    fn test_missing_player_body_uses_last_position() {
        let mut backend = HeadlessBackend::new();
        let mut game = Game::new(&mut backend, Tuning::default(), 9);
        step(&mut game, &mut backend, 1500);
        game.handle(
            &mut backend,
            GameInput::PointerMove {
                pos: Vec2::new(120.0, 0.0),
                down: true,
            },
        );
        game.drain_events();

        // The collaborator lost the body behind the game's back
        let player = game.player_body().unwrap();
        backend.destroy_body(player);
        collide(&mut game, &mut backend);

        assert!(game.is_dead());
        let stone = backend.body(game.registry().gravestone().unwrap().body).unwrap();
        assert!(stone.visible);
        assert_eq!(stone.pos, Vec2::new(120.0, 500.0));
        assert!(matches!(
            game.drain_events().as_slice(),
            [SimEvent::Died { pos, .. }] if *pos == Vec2::new(120.0, 500.0)
        ));

        step(&mut game, &mut backend, 1000);
        assert_fresh_run(&game, &backend);
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let mut backend = HeadlessBackend::new();
        let mut game = Game::new(&mut backend, Tuning::default(), 4);
        step(&mut game, &mut backend, 3000);
        collide(&mut game, &mut backend);

        game.shutdown(&mut backend);
        assert_eq!(backend.active_timers(), 0);
        assert_eq!(backend.active_watches(), 0);
        assert_eq!(backend.count_tagged(BodyTag::Obstacle), 0);
        assert_eq!(backend.count_tagged(BodyTag::Player), 0);
        assert_eq!(backend.count_tagged(BodyTag::Gravestone), 0);

        step(&mut game, &mut backend, 3000);
        assert!(game.is_dead());
        assert_eq!(backend.active_timers(), 0);
    }
}
