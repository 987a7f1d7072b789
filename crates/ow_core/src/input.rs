//! Keyboard state with level-triggered (held) and edge-triggered queries, plus
//! the four-direction binding used by gameplay.
//!
//! - **Held:** `is_held(key)` is true every frame the key is physically down.
//!   Movement reads held state through a [`KeyBindings`] snapshot.
//!
//! - **Edge (just_pressed):** true only until `end_frame()`. Command keys are
//!   read once per frame before it is called.

use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Key {
    W,
    A,
    S,
    D,
    Left,
    Right,
    Up,
    Down,
    Space,
    N,
    R,
    F3,
    Escape,
}

/// Per-step read-only view of the four movement directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionSnapshot {
    pub up: bool,
    pub left: bool,
    pub down: bool,
    pub right: bool,
}

/// Fixed direction-to-key mapping. Defaults to W/A/S/D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub up: Key,
    pub left: Key,
    pub down: Key,
    pub right: Key,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            up: Key::W,
            left: Key::A,
            down: Key::S,
            right: Key::D,
        }
    }
}

impl KeyBindings {
    pub fn snapshot(&self, input: &InputState) -> DirectionSnapshot {
        DirectionSnapshot {
            up: input.is_held(self.up),
            left: input.is_held(self.left),
            down: input.is_held(self.down),
            right: input.is_held(self.right),
        }
    }

    /// Bindings must map four distinct keys, otherwise two directions would
    /// always fire together.
    pub fn validate(&self) -> Result<(), String> {
        let keys = [self.up, self.left, self.down, self.right];
        let unique: HashSet<Key> = keys.iter().copied().collect();
        if unique.len() != keys.len() {
            return Err(format!(
                "Key bindings must be distinct (up={:?}, left={:?}, down={:?}, right={:?})",
                self.up, self.left, self.down, self.right
            ));
        }
        Ok(())
    }
}

pub struct InputState {
    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            just_pressed: HashSet::new(),
        }
    }

    pub fn key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        self.held.remove(&key);
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    /// Drop every held key, e.g. when the window loses focus and release
    /// events would never arrive.
    pub fn release_all(&mut self) {
        self.held.clear();
        self.just_pressed.clear();
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}
