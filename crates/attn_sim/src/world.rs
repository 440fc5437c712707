//! Scroll reconciliation between the camera and whatever presents it.
//!
//! The scroll offset is derived from the camera, never stored independently,
//! with one exception: a timed pause freezes the *output* while the camera
//! keeps descending underneath. When the pause ends the offset snaps to the
//! live value in a single step.

use attn_core::EffectTimer;
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::config::WorldConfig;
use crate::events::{EventBus, GameEvent};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub scroll_offset: f32,
    pub current_layer: u32,
    pub paused: bool,
}

/// What changed during one `World::update`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldUpdate {
    /// Layers entered this tick, in order. Usually zero or one.
    pub layers_crossed: Vec<u32>,
    pub resumed: bool,
}

#[derive(Debug, Clone)]
pub struct World {
    layer_height: f32,
    current_layer: u32,
    scroll_offset: f32,
    pause: EffectTimer,
}

impl World {
    pub fn new(config: &WorldConfig, camera: &Camera) -> Self {
        assert!(config.layer_height > 0.0, "layer height must be positive");
        Self {
            layer_height: config.layer_height,
            current_layer: 1,
            scroll_offset: live_offset(camera),
            pause: EffectTimer::new(),
        }
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    pub fn current_layer(&self) -> u32 {
        self.current_layer
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_armed()
    }

    /// Freeze the scroll output for `duration_ms`. A second pause replaces the
    /// first; the frozen value stays where the first pause left it.
    pub fn pause_for(&mut self, duration_ms: f32, now: f64, events: &mut EventBus) {
        let seconds = f64::from(duration_ms.max(0.0)) / 1000.0;
        self.pause.arm(now, seconds);
        events.emit(GameEvent::ScrollPaused { duration_ms });
    }

    pub fn update(&mut self, now: f64, camera: &Camera, events: &mut EventBus) -> WorldUpdate {
        let mut report = WorldUpdate::default();

        if self.pause.poll_expired(now) {
            report.resumed = true;
            events.emit(GameEvent::ScrollResumed);
        }
        if !self.pause.is_armed() {
            self.scroll_offset = live_offset(camera);
        }

        while camera.position.y > self.current_layer as f32 * self.layer_height {
            self.current_layer += 1;
            log::debug!(
                "entered layer {} at camera y {:.1}",
                self.current_layer,
                camera.position.y
            );
            report.layers_crossed.push(self.current_layer);
            events.emit(GameEvent::LevelUp {
                level: self.current_layer,
            });
        }
        report
    }

    pub fn cancel_timers(&mut self) {
        self.pause.cancel();
    }

    pub fn state(&self) -> WorldState {
        WorldState {
            scroll_offset: self.scroll_offset,
            current_layer: self.current_layer,
            paused: self.is_paused(),
        }
    }
}

fn live_offset(camera: &Camera) -> f32 {
    camera.position.y - camera.view_height * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;

    fn setup(speed: f32) -> (Camera, World, EventBus) {
        let camera = Camera::new(&CameraConfig {
            start_y: 300.0,
            descent_speed: speed,
            ..CameraConfig::default()
        });
        let world = World::new(&WorldConfig::default(), &camera);
        (camera, world, EventBus::new())
    }

    #[test]
    fn offset_tracks_camera_when_live() {
        let (mut camera, mut world, mut bus) = setup(40.0);
        assert_eq!(world.scroll_offset(), -20.0);
        camera.advance(1.0);
        world.update(1.0, &camera, &mut bus);
        assert_eq!(world.scroll_offset(), 20.0);
    }

    #[test]
    fn pause_freezes_then_snaps() {
        let (mut camera, mut world, mut bus) = setup(100.0);
        world.pause_for(2000.0, 0.0, &mut bus);
        for step in 1..=3 {
            camera.advance(0.5);
            let update = world.update(step as f64 * 0.5, &camera, &mut bus);
            assert!(!update.resumed);
            assert_eq!(world.scroll_offset(), -20.0);
        }
        camera.advance(0.5);
        let update = world.update(2.0, &camera, &mut bus);
        assert!(update.resumed);
        assert!(!world.is_paused());
        assert_eq!(world.scroll_offset(), 300.0 + 200.0 - 320.0);

        let events = bus.dispatch();
        assert_eq!(events.first(), Some(&GameEvent::ScrollPaused { duration_ms: 2000.0 }));
        assert_eq!(events.last(), Some(&GameEvent::ScrollResumed));
    }

    #[test]
    fn repeated_pause_replaces_timer() {
        let (camera, mut world, mut bus) = setup(0.0);
        world.pause_for(2000.0, 0.0, &mut bus);
        world.pause_for(2000.0, 1.5, &mut bus);
        assert!(!world.update(2.0, &camera, &mut bus).resumed);
        assert!(world.update(3.5, &camera, &mut bus).resumed);
    }

    #[test]
    fn layer_crossings_are_reported_once_each() {
        let (mut camera, mut world, mut bus) = setup(0.0);
        camera.position.y = 1_600.0;
        let update = world.update(0.0, &camera, &mut bus);
        assert_eq!(update.layers_crossed, vec![2, 3, 4]);
        assert_eq!(world.current_layer(), 4);
        assert!(world.update(0.1, &camera, &mut bus).layers_crossed.is_empty());
    }
}
