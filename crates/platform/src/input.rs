//! Held keys, held mouse buttons and per-frame cursor motion.
//!
//! The camera only needs drag deltas and the wireframe toggle is a held key,
//! so this tracks state rather than edges.

use std::collections::HashSet;

use winit::event::{ElementState, WindowEvent};
use winit::keyboard::PhysicalKey;

pub use winit::keyboard::KeyCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    fn from_winit(button: winit::event::MouseButton) -> Option<Self> {
        match button {
            winit::event::MouseButton::Left => Some(MouseButton::Left),
            winit::event::MouseButton::Right => Some(MouseButton::Right),
            winit::event::MouseButton::Middle => Some(MouseButton::Middle),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct InputState {
    held_keys: HashSet<KeyCode>,
    held_buttons: HashSet<MouseButton>,
    /// None until the first cursor event, so the first move is not a jump.
    cursor: Option<(f32, f32)>,
    /// Cursor motion accumulated since the last `end_frame`.
    motion: (f32, f32),
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one window event. Returns true if the event was an input event.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.on_key_pressed(code),
                        ElementState::Released => self.on_key_released(code),
                    }
                }
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = MouseButton::from_winit(*button) {
                    match state {
                        ElementState::Pressed => self.on_mouse_pressed(button),
                        ElementState::Released => self.on_mouse_released(button),
                    }
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.on_mouse_moved(position.x as f32, position.y as f32);
                true
            }
            WindowEvent::Focused(false) => {
                // Releases are not delivered to an unfocused window.
                self.held_keys.clear();
                self.held_buttons.clear();
                true
            }
            _ => false,
        }
    }

    pub fn on_key_pressed(&mut self, key: KeyCode) {
        self.held_keys.insert(key);
    }

    pub fn on_key_released(&mut self, key: KeyCode) {
        self.held_keys.remove(&key);
    }

    pub fn on_mouse_pressed(&mut self, button: MouseButton) {
        self.held_buttons.insert(button);
    }

    pub fn on_mouse_released(&mut self, button: MouseButton) {
        self.held_buttons.remove(&button);
    }

    pub fn on_mouse_moved(&mut self, x: f32, y: f32) {
        if let Some((old_x, old_y)) = self.cursor {
            self.motion.0 += x - old_x;
            self.motion.1 += y - old_y;
        }
        self.cursor = Some((x, y));
    }

    /// Clears the accumulated motion. Call once per rendered frame.
    pub fn end_frame(&mut self) {
        self.motion = (0.0, 0.0);
    }

    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.held_keys.contains(&key)
    }

    pub fn is_mouse_held(&self, button: MouseButton) -> bool {
        self.held_buttons.contains(&button)
    }

    pub fn cursor_position(&self) -> Option<(f32, f32)> {
        self.cursor
    }

    /// Motion this frame while `button` is held, in pixels.
    pub fn drag_delta(&self, button: MouseButton) -> Option<(f32, f32)> {
        (self.is_mouse_held(button) && self.motion != (0.0, 0.0)).then_some(self.motion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_held_key() {
        let mut input = InputState::new();
        assert!(!input.is_key_held(KeyCode::Digit1));
        input.on_key_pressed(KeyCode::Digit1);
        input.end_frame();
        assert!(input.is_key_held(KeyCode::Digit1));
        input.on_key_released(KeyCode::Digit1);
        assert!(!input.is_key_held(KeyCode::Digit1));
    }

    #[test]
    fn test_first_move_has_no_delta() {
        let mut input = InputState::new();
        input.on_mouse_pressed(MouseButton::Left);
        input.on_mouse_moved(400.0, 300.0);
        assert_eq!(input.drag_delta(MouseButton::Left), None);
        assert_eq!(input.cursor_position(), Some((400.0, 300.0)));
    }

    #[test]
    fn test_drag_accumulates_within_frame() {
        let mut input = InputState::new();
        input.on_mouse_moved(10.0, 10.0);
        input.on_mouse_pressed(MouseButton::Left);
        input.on_mouse_moved(13.0, 8.0);
        input.on_mouse_moved(15.0, 9.0);
        assert_eq!(input.drag_delta(MouseButton::Left), Some((5.0, -1.0)));
        assert_eq!(input.drag_delta(MouseButton::Right), None);

        input.end_frame();
        assert_eq!(input.drag_delta(MouseButton::Left), None);
    }

    #[test]
    fn test_motion_without_button_is_not_a_drag() {
        let mut input = InputState::new();
        input.on_mouse_moved(0.0, 0.0);
        input.on_mouse_moved(5.0, 5.0);
        assert_eq!(input.drag_delta(MouseButton::Left), None);

        input.on_mouse_pressed(MouseButton::Right);
        assert_eq!(input.drag_delta(MouseButton::Right), Some((5.0, 5.0)));
        input.on_mouse_released(MouseButton::Right);
        assert_eq!(input.drag_delta(MouseButton::Right), None);
    }
}
