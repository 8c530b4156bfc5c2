// Input state tracking for the mouse
// Abstracts winit events into a queryable per-frame snapshot

use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

pub struct InputState {
    // Mouse
    pub mouse_position: (f32, f32),
    /// Cursor travel accumulated since the last end_frame().
    pub mouse_delta: (f32, f32),
    left_held: bool,
    right_held: bool,
    has_position: bool,

    // Scroll: accumulated vertical scroll this frame, reset in end_frame()
    pub scroll_delta: f32,

    // Window dimensions (orbit speed is relative to window height)
    pub window_size: (u32, u32),
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self {
            mouse_position: (0.0, 0.0),
            mouse_delta: (0.0, 0.0),
            left_held: false,
            right_held: false,
            has_position: false,
            scroll_delta: 0.0,
            window_size: (0, 0),
        }
    }

    /// Feed a winit WindowEvent into the input state.
    /// Call this once per event before the app's own event handling.
    pub fn process_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                let next = (position.x as f32, position.y as f32);
                if self.has_position {
                    self.mouse_delta.0 += next.0 - self.mouse_position.0;
                    self.mouse_delta.1 += next.1 - self.mouse_position.1;
                }
                self.mouse_position = next;
                self.has_position = true;
            }
            WindowEvent::CursorLeft { .. } => {
                // Re-entering elsewhere must not register as a drag.
                self.has_position = false;
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                self.left_held = *state == ElementState::Pressed;
            }
            WindowEvent::MouseInput { state, button: MouseButton::Right, .. } => {
                self.right_held = *state == ElementState::Pressed;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.scroll_delta += y;
            }
            WindowEvent::Resized(size) => {
                self.window_size = (size.width, size.height);
            }
            _ => {}
        }
    }

    /// Call once per frame after update() and render() have consumed input.
    /// Resets per-frame accumulators.
    pub fn end_frame(&mut self) {
        self.scroll_delta = 0.0;
        self.mouse_delta = (0.0, 0.0);
    }

    /// True while the left button is held: cursor motion orbits the camera.
    pub fn is_orbit_drag(&self) -> bool {
        self.left_held
    }

    pub fn set_orbit_drag(&mut self, held: bool) {
        self.left_held = held;
    }

    /// True while the right button is held: cursor motion pans the camera.
    pub fn is_pan_drag(&self) -> bool {
        self.right_held
    }

    pub fn set_pan_drag(&mut self, held: bool) {
        self.right_held = held;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_frame_resets_accumulators() {
        let mut input = InputState::new();
        input.scroll_delta = 3.0;
        input.mouse_delta = (4.0, -2.0);
        input.end_frame();
        assert_eq!(input.scroll_delta, 0.0);
        assert_eq!(input.mouse_delta, (0.0, 0.0));
    }

    #[test]
    fn test_orbit_drag_follows_left_button() {
        let mut input = InputState::new();
        assert!(!input.is_orbit_drag());
        input.set_orbit_drag(true);
        assert!(input.is_orbit_drag());
        assert!(!input.is_pan_drag());
    }

    #[test]
    fn test_pan_drag_is_independent_of_orbit() {
        let mut input = InputState::new();
        input.set_pan_drag(true);
        assert!(input.is_pan_drag());
        assert!(!input.is_orbit_drag());
        input.set_pan_drag(false);
        assert!(!input.is_pan_drag());
    }
}
