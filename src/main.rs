//! Tap Dodge entry point
//!
//! Native builds play a headless session with a simple autopilot and print a
//! JSON summary. The browser build is driven from JavaScript through
//! `tap_dodge::web::WebGame`.

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use glam::Vec2;
    use tap_dodge::consts::*;
    use tap_dodge::platform::{Backend, HeadlessBackend};
    use tap_dodge::sim::{Game, GameInput, SimEvent};
    use tap_dodge::{Millis, Tuning};

    /// Autopilot tap cadence
    const TAP_EVERY_MS: Millis = 400;
    /// Obstacles closer than this (horizontally) are dodged
    const DANGER_X: f32 = 60.0;

    /// Steer away from the lowest obstacle still above the player
    fn autopilot(game: &Game) -> GameInput {
        let Some(player) = game.player_pos() else {
            return GameInput::Keys {
                left: false,
                right: false,
            };
        };

        let threat = game
            .registry()
            .obstacles()
            .iter()
            .filter(|o| o.pos.y < player.y && (o.pos.x - player.x).abs() < DANGER_X)
            .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y));

        let (left, right) = match threat {
            Some(o) if o.pos.x >= player.x => {
                let room = player.x > DANGER_X;
                (room, !room)
            }
            Some(_) => {
                let room = player.x < ARENA_WIDTH - DANGER_X;
                (!room, room)
            }
            None => (false, false),
        };
        GameInput::Keys { left, right }
    }

    pub fn run(seed: u64, seconds: u64) {
        let mut backend = HeadlessBackend::new();
        let mut game = Game::new(&mut backend, Tuning::default(), seed);

        let end = seconds * 1000;
        let mut next_tap: Millis = 0;
        let mut deaths = 0u32;
        let mut best_score = 0u32;
        let mut spawned = 0u32;

        while backend.now() < end {
            let keys = autopilot(&game);
            game.handle(&mut backend, keys);

            let now = backend.now();
            if now >= next_tap {
                let pos = Vec2::new(ARENA_WIDTH / 2.0, ARENA_HEIGHT / 2.0);
                game.handle(&mut backend, GameInput::PointerDown { pos, now });
                next_tap = now + TAP_EVERY_MS;
            }

            for input in backend.advance(FRAME_MS) {
                game.handle(&mut backend, input);
            }

            for event in game.drain_events() {
                match event {
                    SimEvent::ObstacleSpawned { .. } => spawned += 1,
                    SimEvent::Died { score, .. } => {
                        deaths += 1;
                        best_score = best_score.max(score);
                    }
                    _ => {}
                }
            }
        }
        best_score = best_score.max(game.resources.score);

        let summary = serde_json::json!({
            "seed": seed,
            "seconds": seconds,
            "runs": game.run(),
            "deaths": deaths,
            "spawned": spawned,
            "best_score": best_score,
            "final": game.resources,
        });
        println!("{:#}", summary);

        game.shutdown(&mut backend);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(12345);
    let seconds = args.next().and_then(|s| s.parse().ok()).unwrap_or(60);

    log::info!("Tap Dodge (native, headless) seed={} for {}s", seed, seconds);
    native::run(seed, seconds);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Browser entry point is tap_dodge::web
}
