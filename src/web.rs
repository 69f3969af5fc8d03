//! Browser bridge
//!
//! The page owns the canvas, the physics engine and the timers. It hands a
//! host object to [`WebGame`] and forwards every callback back in; the game
//! answers by calling the host's methods.

use glam::Vec2;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::Millis;
use crate::platform::{Backend, BodyHandle, BodyTag, ColliderHandle, Shape, TextSlot, TimerHandle};
use crate::sim::{Game, GameInput, Resources, RunPhase};
use crate::tuning::Tuning;

#[wasm_bindgen]
extern "C" {
    /// JavaScript object implementing the rendering/physics capabilities
    pub type JsHost;

    #[wasm_bindgen(method)]
    fn now(this: &JsHost) -> f64;

    #[wasm_bindgen(method, js_name = createBody)]
    fn create_body(this: &JsHost, tag: &str, shape_json: &str, x: f32, y: f32) -> u32;
    #[wasm_bindgen(method, js_name = destroyBody)]
    fn destroy_body(this: &JsHost, body: u32);
    #[wasm_bindgen(method, js_name = setVelocity)]
    fn set_velocity(this: &JsHost, body: u32, vx: f32, vy: f32);
    #[wasm_bindgen(method, js_name = setPosition)]
    fn set_position(this: &JsHost, body: u32, x: f32, y: f32);
    /// NaN when the body is gone
    #[wasm_bindgen(method, js_name = getX)]
    fn get_x(this: &JsHost, body: u32) -> f64;
    #[wasm_bindgen(method, js_name = getY)]
    fn get_y(this: &JsHost, body: u32) -> f64;
    #[wasm_bindgen(method, js_name = setVisible)]
    fn set_visible(this: &JsHost, body: u32, visible: bool);

    #[wasm_bindgen(method, js_name = watchOverlap)]
    fn watch_overlap(this: &JsHost, body: u32, tag: &str) -> u32;
    #[wasm_bindgen(method, js_name = unwatchOverlap)]
    fn unwatch_overlap(this: &JsHost, collider: u32);

    #[wasm_bindgen(method)]
    fn every(this: &JsHost, interval_ms: f64) -> u32;
    #[wasm_bindgen(method)]
    fn after(this: &JsHost, delay_ms: f64) -> u32;
    #[wasm_bindgen(method)]
    fn cancel(this: &JsHost, timer: u32);

    #[wasm_bindgen(method, js_name = setText)]
    fn set_text(this: &JsHost, slot: &str, text: &str);
}

/// [`Backend`] over a [`JsHost`]
struct JsBackend {
    host: JsHost,
}

impl Backend for JsBackend {
    fn now(&self) -> Millis {
        self.host.now() as Millis
    }

    fn create_body(&mut self, tag: BodyTag, shape: Shape, pos: Vec2) -> BodyHandle {
        let shape_json = match serde_json::to_string(&shape) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Failed to encode shape {:?}: {}", shape, e);
                String::from("{}")
            }
        };
        let raw = self.host.create_body(tag.as_str(), &shape_json, pos.x, pos.y);
        BodyHandle::from_raw(raw)
    }

    fn destroy_body(&mut self, body: BodyHandle) {
        self.host.destroy_body(body.raw());
    }

    fn set_velocity(&mut self, body: BodyHandle, vel: Vec2) {
        self.host.set_velocity(body.raw(), vel.x, vel.y);
    }

    fn set_position(&mut self, body: BodyHandle, pos: Vec2) {
        self.host.set_position(body.raw(), pos.x, pos.y);
    }

    fn position(&self, body: BodyHandle) -> Option<Vec2> {
        let x = self.host.get_x(body.raw());
        let y = self.host.get_y(body.raw());
        if x.is_nan() || y.is_nan() {
            None
        } else {
            Some(Vec2::new(x as f32, y as f32))
        }
    }

    fn set_visible(&mut self, body: BodyHandle, visible: bool) {
        self.host.set_visible(body.raw(), visible);
    }

    fn watch_overlap(&mut self, body: BodyHandle, tag: BodyTag) -> ColliderHandle {
        ColliderHandle::from_raw(self.host.watch_overlap(body.raw(), tag.as_str()))
    }

    fn unwatch_overlap(&mut self, collider: ColliderHandle) {
        self.host.unwatch_overlap(collider.raw());
    }

    fn every(&mut self, interval: Millis) -> TimerHandle {
        TimerHandle::from_raw(self.host.every(interval as f64))
    }

    fn after(&mut self, delay: Millis) -> TimerHandle {
        TimerHandle::from_raw(self.host.after(delay as f64))
    }

    fn cancel(&mut self, timer: TimerHandle) {
        self.host.cancel(timer.raw());
    }

    fn set_text(&mut self, slot: TextSlot, text: &str) {
        self.host.set_text(slot.as_str(), text);
    }
}

#[derive(Serialize)]
struct Snapshot<'a> {
    phase: RunPhase,
    run: u32,
    resources: &'a Resources,
    obstacles: usize,
}

#[wasm_bindgen(start)]
pub fn wasm_start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        // Logger already installed by an earlier module instance
        return;
    }
    log::info!("Tap Dodge module loaded");
}

/// Game instance owned by the page
#[wasm_bindgen]
pub struct WebGame {
    game: Game,
    backend: JsBackend,
}

impl WebGame {
    fn send(&mut self, input: GameInput) {
        self.game.handle(&mut self.backend, input);
    }
}

#[wasm_bindgen]
impl WebGame {
    /// `tuning_json` may be partial; invalid JSON falls back to defaults
    #[wasm_bindgen(constructor)]
    pub fn new(host: JsHost, seed: f64, tuning_json: Option<String>) -> WebGame {
        let tuning = match tuning_json.as_deref().map(Tuning::from_json) {
            Some(Ok(tuning)) => tuning,
            Some(Err(e)) => {
                log::warn!("Invalid tuning JSON, using defaults: {}", e);
                Tuning::default()
            }
            None => Tuning::default(),
        };
        let mut backend = JsBackend { host };
        let game = Game::new(&mut backend, tuning, seed as u64);
        WebGame { game, backend }
    }

    /// Call once per rendered frame, after the physics step
    pub fn frame(&mut self) {
        self.send(GameInput::Frame);
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, x: f32, y: f32, now: f64) {
        self.send(GameInput::PointerDown {
            pos: Vec2::new(x, y),
            now: now as Millis,
        });
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f32, y: f32, down: bool) {
        self.send(GameInput::PointerMove {
            pos: Vec2::new(x, y),
            down,
        });
    }

    pub fn keys(&mut self, left: bool, right: bool) {
        self.send(GameInput::Keys { left, right });
    }

    #[wasm_bindgen(js_name = timerFired)]
    pub fn timer_fired(&mut self, timer: u32) {
        self.send(GameInput::TimerFired(TimerHandle::from_raw(timer)));
    }

    pub fn overlap(&mut self, player: u32, obstacle: u32) {
        self.send(GameInput::Overlap {
            player: BodyHandle::from_raw(player),
            obstacle: BodyHandle::from_raw(obstacle),
        });
    }

    /// Current phase and resources as JSON
    pub fn snapshot(&self) -> String {
        let snapshot = Snapshot {
            phase: self.game.phase(),
            run: self.game.run(),
            resources: &self.game.resources,
            obstacles: self.game.registry().obstacles().len(),
        };
        serde_json::to_string(&snapshot).unwrap_or_default()
    }

    /// Events since the last call, as a JSON array
    #[wasm_bindgen(js_name = drainEvents)]
    pub fn drain_events(&mut self) -> String {
        serde_json::to_string(&self.game.drain_events()).unwrap_or_default()
    }

    /// Release every host resource; later calls are no-ops
    pub fn shutdown(&mut self) {
        self.game.shutdown(&mut self.backend);
    }
}
