//! Input state tracking and the per-tick intent snapshot.
//!
//! The simulation only ever sees an [`InputIntent`]: five booleans polled once
//! per tick. Where they come from (keyboard, touch buttons, a replay file, an
//! autopilot) is the host's business. [`InputState`] is the keyboard-style
//! source: it tracks which keys are held and folds them into an intent.
//!
//! - **Level-triggered (held):** `is_held(key)` is true every frame the key is
//!   down. Intents are built from held keys only.
//! - **Edge-triggered (just_pressed):** true only during the frame the press
//!   happened, cleared by `end_frame()`. Kept for hosts that want menu-style
//!   single presses.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputIntent {
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub action: bool,
}

impl InputIntent {
    pub const IDLE: InputIntent = InputIntent {
        left: false,
        right: false,
        up: false,
        down: false,
        action: false,
    };

    /// -1.0 for left, 1.0 for right, 0.0 when neither or both are held.
    pub fn horizontal_axis(&self) -> f32 {
        match (self.left, self.right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }

    /// -1.0 for up, 1.0 for down (world y grows downward).
    pub fn vertical_axis(&self) -> f32 {
        match (self.up, self.down) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }

    pub fn wants_jump(&self) -> bool {
        self.up || self.action
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Space,
    W,
    A,
    S,
    D,
}

#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        self.held.remove(&key);
    }

    pub fn release_all(&mut self) {
        self.held.clear();
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
    }

    /// Fold held keys into the tick intent. Arrows and WASD are aliases.
    pub fn intent(&self) -> InputIntent {
        InputIntent {
            left: self.is_held(Key::Left) || self.is_held(Key::A),
            right: self.is_held(Key::Right) || self.is_held(Key::D),
            up: self.is_held(Key::Up) || self.is_held(Key::W),
            down: self.is_held(Key::Down) || self.is_held(Key::S),
            action: self.is_held(Key::Space),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_down_sets_held_and_just_pressed() {
        let mut input = InputState::new();
        input.key_down(Key::Space);
        assert!(input.is_held(Key::Space));
        assert!(input.is_just_pressed(Key::Space));
    }

    #[test]
    fn end_frame_keeps_held_keys() {
        let mut input = InputState::new();
        input.key_down(Key::A);
        input.end_frame();
        assert!(!input.is_just_pressed(Key::A));
        assert!(input.is_held(Key::A));
        assert!(input.intent().left);
    }

    #[test]
    fn repeated_key_down_is_not_a_new_press() {
        let mut input = InputState::new();
        input.key_down(Key::D);
        input.end_frame();
        input.key_down(Key::D);
        assert!(!input.is_just_pressed(Key::D));
    }

    #[test]
    fn arrows_and_wasd_map_to_same_intent() {
        let mut arrows = InputState::new();
        arrows.key_down(Key::Left);
        arrows.key_down(Key::Up);
        let mut wasd = InputState::new();
        wasd.key_down(Key::A);
        wasd.key_down(Key::W);
        assert_eq!(arrows.intent(), wasd.intent());
        assert!(arrows.intent().wants_jump());
    }

    #[test]
    fn opposing_keys_cancel_on_axis() {
        let mut input = InputState::new();
        input.key_down(Key::Left);
        input.key_down(Key::Right);
        assert_eq!(input.intent().horizontal_axis(), 0.0);
        input.key_up(Key::Left);
        assert_eq!(input.intent().horizontal_axis(), 1.0);
    }

    #[test]
    fn vertical_axis_points_down_for_down_key() {
        let intent = InputIntent {
            down: true,
            ..InputIntent::IDLE
        };
        assert_eq!(intent.vertical_axis(), 1.0);
        assert!(!intent.wants_jump());
    }

    #[test]
    fn release_all_clears_intent() {
        let mut input = InputState::new();
        input.key_down(Key::Space);
        input.key_down(Key::S);
        input.release_all();
        assert_eq!(input.intent(), InputIntent::IDLE);
    }
}
