//! Semantic controls: raw keys and mouse buttons in, per-frame actions out.
//!
//! Each edge-triggered action owns its own `EdgeDetector`, so holding jump
//! never repeats and a key shared between bindings cannot swallow another
//! binding's edge. Edge history survives an attempt reset, so a key still held
//! from before the reset stays quiet until it is released and pressed again.

use plat_core::input::{ButtonEdge, EdgeDetector, InputState, Key, MouseBtn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveLeft,
    MoveRight,
    Jump,
    Interact,
    Restart,
    ExitToEditor,
    /// Mouse pick inside the character selector.
    Select,
    /// Numeric pick of the n-th character (0-based).
    Choose(usize),
}

#[derive(Debug, Clone)]
pub struct Bindings {
    pub move_left: Vec<Key>,
    pub move_right: Vec<Key>,
    pub jump: Vec<Key>,
    pub interact: Vec<Key>,
    pub restart: Vec<Key>,
    pub exit: Vec<Key>,
    pub choose: Vec<Key>,
    pub select: MouseBtn,
}

impl Default for Bindings {
    fn default() -> Self {
        Self {
            move_left: vec![Key::Left, Key::A],
            move_right: vec![Key::Right, Key::D],
            jump: vec![Key::Space, Key::Up, Key::W],
            interact: vec![Key::E],
            restart: vec![Key::R],
            exit: vec![Key::Escape],
            choose: Key::DIGITS.to_vec(),
            select: MouseBtn::Left,
        }
    }
}

impl Bindings {
    /// Keys bound to `action`. `Select` is a mouse binding and has none.
    pub fn keys(&self, action: Action) -> &[Key] {
        match action {
            Action::MoveLeft => &self.move_left,
            Action::MoveRight => &self.move_right,
            Action::Jump => &self.jump,
            Action::Interact => &self.interact,
            Action::Restart => &self.restart,
            Action::ExitToEditor => &self.exit,
            Action::Choose(index) => self
                .choose
                .get(index)
                .map(std::slice::from_ref)
                .unwrap_or(&[]),
            Action::Select => &[],
        }
    }
}

/// Everything the simulation reads from input in one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameActions {
    /// -1, 0 or +1. Both directions held cancel out.
    pub move_x: f32,
    pub jump: ButtonEdge,
    pub interact: ButtonEdge,
    pub restart: ButtonEdge,
    pub exit: ButtonEdge,
    pub select: ButtonEdge,
    /// First character index whose key went down this frame.
    pub choose: Option<usize>,
    pub mouse_position: glam::Vec2,
}

#[derive(Debug, Clone)]
pub struct ControlState {
    bindings: Bindings,
    jump: EdgeDetector,
    interact: EdgeDetector,
    restart: EdgeDetector,
    exit: EdgeDetector,
    select: EdgeDetector,
    choose: Vec<EdgeDetector>,
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new(Bindings::default())
    }
}

impl ControlState {
    pub fn new(bindings: Bindings) -> Self {
        let choose = vec![EdgeDetector::new(); bindings.choose.len()];
        Self {
            bindings,
            jump: EdgeDetector::new(),
            interact: EdgeDetector::new(),
            restart: EdgeDetector::new(),
            exit: EdgeDetector::new(),
            select: EdgeDetector::new(),
            choose,
        }
    }

    /// Sample `input` once. Call exactly once per simulated frame.
    pub fn poll(&mut self, input: &InputState) -> FrameActions {
        let held = |action| input.any_held(self.bindings.keys(action));

        let left = held(Action::MoveLeft);
        let right = held(Action::MoveRight);
        let move_x = match (left, right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        };

        let jump_down = held(Action::Jump);
        let interact_down = held(Action::Interact);
        let restart_down = held(Action::Restart);
        let exit_down = held(Action::ExitToEditor);
        let choose_down: Vec<bool> = (0..self.choose.len())
            .map(|i| held(Action::Choose(i)))
            .collect();

        let mut choose = None;
        for (index, (detector, down)) in self.choose.iter_mut().zip(choose_down).enumerate() {
            if detector.update(down).just_pressed && choose.is_none() {
                choose = Some(index);
            }
        }

        let (mx, my) = input.mouse_position;
        FrameActions {
            move_x,
            jump: self.jump.update(jump_down),
            interact: self.interact.update(interact_down),
            restart: self.restart.update(restart_down),
            exit: self.exit.update(exit_down),
            select: self.select.update(input.is_mouse_held(self.bindings.select)),
            choose,
            mouse_position: glam::Vec2::new(mx, my),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_directions_cancel() {
        let mut controls = ControlState::default();
        assert_eq!(controls.poll(&InputState::with_held(&[Key::A])).move_x, -1.0);
        assert_eq!(controls.poll(&InputState::with_held(&[Key::Right])).move_x, 1.0);
        assert_eq!(
            controls
                .poll(&InputState::with_held(&[Key::Left, Key::D]))
                .move_x,
            0.0
        );
    }

    #[test]
    fn held_jump_only_fires_once() {
        let mut controls = ControlState::default();
        let held = InputState::with_held(&[Key::Space]);
        assert!(controls.poll(&held).jump.just_pressed);
        assert!(!controls.poll(&held).jump.just_pressed);
        assert!(controls.poll(&held).jump.pressed);

        let released = controls.poll(&InputState::new());
        assert!(released.jump.just_released);
        assert!(controls.poll(&InputState::with_held(&[Key::W])).jump.just_pressed);
    }

    #[test]
    fn each_binding_tracks_its_own_edge() {
        let mut controls = ControlState::default();
        let first = controls.poll(&InputState::with_held(&[Key::Space]));
        assert!(first.jump.just_pressed);
        assert!(!first.restart.just_pressed);

        let second = controls.poll(&InputState::with_held(&[Key::Space, Key::R]));
        assert!(!second.jump.just_pressed, "jump still held");
        assert!(second.restart.just_pressed);

        let third = controls.poll(&InputState::with_held(&[Key::Space, Key::R]));
        assert!(!third.restart.just_pressed);
    }

    #[test]
    fn choose_reports_first_new_digit() {
        let mut controls = ControlState::default();
        assert_eq!(
            controls
                .poll(&InputState::with_held(&[Key::Digit2]))
                .choose,
            Some(1)
        );
        assert_eq!(
            controls
                .poll(&InputState::with_held(&[Key::Digit2, Key::Digit3]))
                .choose,
            Some(2)
        );
        assert_eq!(controls.poll(&InputState::new()).choose, None);
    }

    #[test]
    fn mouse_select_edges_and_position() {
        let mut controls = ControlState::default();
        let mut input = InputState::new();
        input.mouse_down(MouseBtn::Left);
        input.mouse_position = (12.0, 34.0);
        let actions = controls.poll(&input);
        assert!(actions.select.just_pressed);
        assert_eq!(actions.mouse_position, glam::Vec2::new(12.0, 34.0));
        assert!(!controls.poll(&input).select.just_pressed);
    }

    #[test]
    fn bindings_expose_keys_per_action() {
        let bindings = Bindings::default();
        assert_eq!(bindings.keys(Action::Choose(0)), &[Key::Digit1]);
        assert!(bindings.keys(Action::Choose(42)).is_empty());
        assert!(bindings.keys(Action::Select).is_empty());
        assert!(bindings.keys(Action::Jump).contains(&Key::Up));
    }
}
