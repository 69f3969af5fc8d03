//! Deterministic in-memory backend
//!
//! Integrates body velocities, tests overlaps and runs timers on a virtual
//! clock. Drives the native demo and every simulation test.
//!
//! Iteration is ordered by handle so identical call sequences produce
//! identical input streams.

use std::collections::BTreeMap;

use glam::Vec2;

use super::{Backend, BodyHandle, BodyTag, ColliderHandle, Shape, TextSlot, TimerHandle};
use crate::Millis;
use crate::sim::GameInput;

#[derive(Debug, Clone)]
pub struct Body {
    pub tag: BodyTag,
    pub shape: Shape,
    pub pos: Vec2,
    pub vel: Vec2,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    due: Millis,
    repeat: Option<Millis>,
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    now: Millis,
    next_id: u32,
    bodies: BTreeMap<BodyHandle, Body>,
    watches: BTreeMap<ColliderHandle, (BodyHandle, BodyTag)>,
    timers: BTreeMap<TimerHandle, Timer>,
    texts: BTreeMap<TextSlot, String>,
    text_writes: BTreeMap<TextSlot, usize>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn body(&self, body: BodyHandle) -> Option<&Body> {
        self.bodies.get(&body)
    }

    /// Live bodies carrying `tag`
    pub fn bodies_tagged(&self, tag: BodyTag) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.bodies
            .iter()
            .filter(move |(_, b)| b.tag == tag)
            .map(|(h, b)| (*h, b))
    }

    pub fn count_tagged(&self, tag: BodyTag) -> usize {
        self.bodies_tagged(tag).count()
    }

    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn repeating_timers(&self) -> usize {
        self.timers.values().filter(|t| t.repeat.is_some()).count()
    }

    pub fn active_watches(&self) -> usize {
        self.watches.len()
    }

    pub fn text(&self, slot: TextSlot) -> Option<&str> {
        self.texts.get(&slot).map(String::as_str)
    }

    /// How many times `slot` has been written
    pub fn text_writes(&self, slot: TextSlot) -> usize {
        self.text_writes.get(&slot).copied().unwrap_or(0)
    }

    /// Advance the clock by `dt` and collect the callbacks that step produced
    ///
    /// Order: physics integration, overlaps, timers, then one `Frame`.
    pub fn advance(&mut self, dt: Millis) -> Vec<GameInput> {
        let secs = dt as f32 / 1000.0;
        for body in self.bodies.values_mut() {
            body.pos += body.vel * secs;
        }
        self.now += dt;

        let mut inputs = self.overlaps();
        inputs.extend(self.fire_timers());
        inputs.push(GameInput::Frame);
        inputs
    }

    fn overlaps(&self) -> Vec<GameInput> {
        let mut hits = Vec::new();
        for (subject, tag) in self.watches.values() {
            let Some(body) = self.bodies.get(subject) else {
                continue;
            };
            let collider = body.shape.collider();
            for (other, candidate) in self.bodies_tagged(*tag) {
                if other == *subject {
                    continue;
                }
                if collider.overlaps(body.pos, &candidate.shape.collider(), candidate.pos) {
                    hits.push(GameInput::Overlap {
                        player: *subject,
                        obstacle: other,
                    });
                }
            }
        }
        hits
    }

    fn fire_timers(&mut self) -> Vec<GameInput> {
        let mut fired: Vec<(Millis, TimerHandle)> = Vec::new();
        let mut expired = Vec::new();
        for (handle, timer) in self.timers.iter_mut() {
            while timer.due <= self.now {
                fired.push((timer.due, *handle));
                match timer.repeat {
                    Some(interval) => timer.due += interval,
                    None => {
                        expired.push(*handle);
                        break;
                    }
                }
            }
        }
        for handle in expired {
            self.timers.remove(&handle);
        }
        fired.sort();
        fired
            .into_iter()
            .map(|(_, handle)| GameInput::TimerFired(handle))
            .collect()
    }
}

impl Backend for HeadlessBackend {
    fn now(&self) -> Millis {
        self.now
    }

    fn create_body(&mut self, tag: BodyTag, shape: Shape, pos: Vec2) -> BodyHandle {
        let handle = BodyHandle::from_raw(self.next_id());
        self.bodies.insert(
            handle,
            Body {
                tag,
                shape,
                pos,
                vel: Vec2::ZERO,
                visible: true,
            },
        );
        handle
    }

    fn destroy_body(&mut self, body: BodyHandle) {
        if self.bodies.remove(&body).is_none() {
            log::warn!("destroy_body: unknown body {:?}", body);
        }
        self.watches.retain(|_, (subject, _)| *subject != body);
    }

    fn set_velocity(&mut self, body: BodyHandle, vel: Vec2) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.vel = vel;
        }
    }

    fn set_position(&mut self, body: BodyHandle, pos: Vec2) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.pos = pos;
        }
    }

    fn position(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&body).map(|b| b.pos)
    }

    fn set_visible(&mut self, body: BodyHandle, visible: bool) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.visible = visible;
        }
    }

    fn watch_overlap(&mut self, body: BodyHandle, tag: BodyTag) -> ColliderHandle {
        let handle = ColliderHandle::from_raw(self.next_id());
        self.watches.insert(handle, (body, tag));
        handle
    }

    fn unwatch_overlap(&mut self, collider: ColliderHandle) {
        self.watches.remove(&collider);
    }

    fn every(&mut self, interval: Millis) -> TimerHandle {
        let handle = TimerHandle::from_raw(self.next_id());
        let interval = interval.max(1);
        self.timers.insert(
            handle,
            Timer {
                due: self.now + interval,
                repeat: Some(interval),
            },
        );
        handle
    }

    fn after(&mut self, delay: Millis) -> TimerHandle {
        let handle = TimerHandle::from_raw(self.next_id());
        self.timers.insert(
            handle,
            Timer {
                due: self.now + delay,
                repeat: None,
            },
        );
        handle
    }

    fn cancel(&mut self, timer: TimerHandle) {
        self.timers.remove(&timer);
    }

    fn set_text(&mut self, slot: TextSlot, text: &str) {
        self.texts.insert(slot, text.to_string());
        *self.text_writes.entry(slot).or_default() += 1;
    }
}
