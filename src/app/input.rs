use crate::render::CameraMovement;
use winit::event::MouseButton;
use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragButton {
    Rotate,
    Pan,
    Dolly,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerDrag {
    pub button: DragButton,
    pub dx: f32,
    pub dy: f32,
}

#[derive(Default, Debug, Clone, Copy)]
pub struct InputState {
    pub movement: CameraMovement,
    mouse_pos: Option<(f32, f32)>,
    // Rotate, pan, dolly.
    mouse_buttons: [bool; 3],
}

impl InputState {
    /// Updates the held-key flags. Returns false for keys that do not drive the camera.
    pub fn handle_key(&mut self, key: PhysicalKey, pressed: bool) -> bool {
        let PhysicalKey::Code(code) = key else {
            return false;
        };
        let flag = match code {
            KeyCode::KeyW | KeyCode::ArrowUp => &mut self.movement.move_forward,
            KeyCode::KeyS | KeyCode::ArrowDown => &mut self.movement.move_backward,
            KeyCode::KeyA | KeyCode::ArrowLeft => &mut self.movement.move_left,
            KeyCode::KeyD | KeyCode::ArrowRight => &mut self.movement.move_right,
            KeyCode::KeyE => &mut self.movement.move_up,
            KeyCode::KeyQ => &mut self.movement.move_down,
            _ => return false,
        };
        *flag = pressed;
        true
    }

    pub fn handle_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        let slot = match button {
            MouseButton::Left => 0,
            MouseButton::Right => 1,
            MouseButton::Middle => 2,
            _ => return,
        };
        self.mouse_buttons[slot] = pressed;
    }

    /// Records the cursor and reports a drag when an orbit button is held.
    pub fn handle_cursor(&mut self, x: f32, y: f32) -> Option<PointerDrag> {
        let previous = self.mouse_pos.replace((x, y));
        let (px, py) = previous?;
        let button = if self.mouse_buttons[0] {
            DragButton::Rotate
        } else if self.mouse_buttons[1] {
            DragButton::Pan
        } else if self.mouse_buttons[2] {
            DragButton::Dolly
        } else {
            return None;
        };
        Some(PointerDrag {
            button,
            dx: x - px,
            dy: y - py,
        })
    }

    pub fn cursor_left(&mut self) {
        self.mouse_pos = None;
    }

    /// Drops every held key and button, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> PhysicalKey {
        PhysicalKey::Code(code)
    }

    #[test]
    fn press_sets_and_release_clears() {
        let mut input = InputState::default();
        assert!(input.handle_key(key(KeyCode::KeyW), true));
        assert!(input.handle_key(key(KeyCode::KeyW), true));
        assert!(input.movement.move_forward);
        input.handle_key(key(KeyCode::KeyW), false);
        assert!(!input.movement.move_forward);
    }

    #[test]
    fn arrows_alias_wasd_and_qe_are_vertical() {
        let mut input = InputState::default();
        input.handle_key(key(KeyCode::ArrowUp), true);
        input.handle_key(key(KeyCode::ArrowDown), true);
        input.handle_key(key(KeyCode::ArrowLeft), true);
        input.handle_key(key(KeyCode::ArrowRight), true);
        input.handle_key(key(KeyCode::KeyE), true);
        input.handle_key(key(KeyCode::KeyQ), true);
        let expected = CameraMovement {
            move_forward: true,
            move_backward: true,
            move_left: true,
            move_right: true,
            move_up: true,
            move_down: true,
        };
        assert_eq!(input.movement, expected);
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        let mut input = InputState::default();
        assert!(!input.handle_key(key(KeyCode::KeyZ), true));
        assert!(!input.handle_key(key(KeyCode::Space), true));
        assert!(!input.movement.any());
    }

    #[test]
    fn drag_requires_a_held_button() {
        let mut input = InputState::default();
        assert_eq!(input.handle_cursor(10.0, 10.0), None);
        assert_eq!(input.handle_cursor(12.0, 10.0), None);

        input.handle_mouse_button(MouseButton::Right, true);
        let drag = input.handle_cursor(15.0, 8.0).unwrap();
        assert_eq!(drag.button, DragButton::Pan);
        assert_eq!((drag.dx, drag.dy), (3.0, -2.0));

        input.cursor_left();
        assert_eq!(input.handle_cursor(0.0, 0.0), None);
    }

    #[test]
    fn clear_releases_everything() {
        let mut input = InputState::default();
        input.handle_key(key(KeyCode::KeyD), true);
        input.handle_mouse_button(MouseButton::Left, true);
        input.clear();
        assert!(!input.movement.any());
        input.handle_cursor(1.0, 1.0);
        assert_eq!(input.handle_cursor(2.0, 2.0), None);
    }
}
