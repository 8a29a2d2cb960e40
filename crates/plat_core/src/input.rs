//! Raw input state plus the edge detector every semantic binding is built on.
//!
//! - **Level-triggered (held):** `is_held(key)` is true every frame the key is
//!   physically down. The host feeds `key_down` / `key_up` events as they arrive
//!   from the window system, so a snapshot of `InputState` is the polled
//!   key/mouse state a frame sees.
//!
//! - **Edge-triggered:** derived by `EdgeDetector`, which compares the level
//!   for this frame with the level it saw last frame. Bindings own one detector
//!   each, so a key consumed by one action never steals the edge from another.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Space,
    Escape,
    W,
    A,
    S,
    D,
    E,
    R,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,
}

impl Key {
    /// Number keys in order, `Digit1` first.
    pub const DIGITS: [Key; 9] = [
        Key::Digit1,
        Key::Digit2,
        Key::Digit3,
        Key::Digit4,
        Key::Digit5,
        Key::Digit6,
        Key::Digit7,
        Key::Digit8,
        Key::Digit9,
    ];

    /// Zero-based digit key (`digit(0)` is `Digit1`).
    pub fn digit(index: usize) -> Option<Key> {
        Self::DIGITS.get(index).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseBtn {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: HashSet<Key>,
    mouse_held: HashSet<MouseBtn>,

    /// World-space cursor position.
    pub mouse_position: (f32, f32),
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot with exactly `keys` held.
    pub fn with_held(keys: &[Key]) -> Self {
        let mut input = Self::new();
        input.held.extend(keys.iter().copied());
        input
    }

    pub fn key_down(&mut self, key: Key) {
        self.held.insert(key);
    }

    pub fn key_up(&mut self, key: Key) {
        self.held.remove(&key);
    }

    pub fn mouse_down(&mut self, btn: MouseBtn) {
        self.mouse_held.insert(btn);
    }

    pub fn mouse_up(&mut self, btn: MouseBtn) {
        self.mouse_held.remove(&btn);
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// True when any of `keys` is held.
    pub fn any_held(&self, keys: &[Key]) -> bool {
        keys.iter().any(|key| self.held.contains(key))
    }

    pub fn is_mouse_held(&self, btn: MouseBtn) -> bool {
        self.mouse_held.contains(&btn)
    }
}

/// Result of feeding one frame's level into an `EdgeDetector`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonEdge {
    pub pressed: bool,
    pub just_pressed: bool,
    pub just_released: bool,
}

/// Previous-frame/current-frame comparator for a single binding.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeDetector {
    was_down: bool,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, down: bool) -> ButtonEdge {
        let edge = ButtonEdge {
            pressed: down,
            just_pressed: down && !self.was_down,
            just_released: !down && self.was_down,
        };
        self.was_down = down;
        edge
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_events_track_held_level() {
        let mut input = InputState::new();
        input.key_down(Key::A);
        input.key_down(Key::A);
        assert!(input.is_held(Key::A));
        input.key_up(Key::A);
        assert!(!input.is_held(Key::A));
        // Release without a prior press is harmless.
        input.key_up(Key::D);
        assert!(!input.is_held(Key::D));
    }

    #[test]
    fn test_mouse_events_track_held_level() {
        let mut input = InputState::new();
        input.mouse_down(MouseBtn::Left);
        assert!(input.is_mouse_held(MouseBtn::Left));
        assert!(!input.is_mouse_held(MouseBtn::Right));
        input.mouse_up(MouseBtn::Left);
        assert!(!input.is_mouse_held(MouseBtn::Left));
    }

    #[test]
    fn test_any_held_matches_alternate_bindings() {
        let input = InputState::with_held(&[Key::W]);
        assert!(input.any_held(&[Key::Space, Key::Up, Key::W]));
        assert!(!input.any_held(&[Key::Left, Key::A]));
    }

    #[test]
    fn test_digit_lookup() {
        assert_eq!(Key::digit(0), Some(Key::Digit1));
        assert_eq!(Key::digit(8), Some(Key::Digit9));
        assert_eq!(Key::digit(9), None);
    }

    #[test]
    fn test_edge_detector_rising_edge_only_once() {
        let mut edge = EdgeDetector::new();
        let first = edge.update(true);
        assert!(first.pressed && first.just_pressed);
        let held = edge.update(true);
        assert!(held.pressed && !held.just_pressed);
        let released = edge.update(false);
        assert!(!released.pressed && released.just_released);
        let idle = edge.update(false);
        assert_eq!(idle, ButtonEdge::default());
    }

}
