//! # Input Callbacks
//!
//! Translates window-system input into camera-controller calls.
//!
//! Keys are tracked in a held-key vector of [`KEY_COUNT`] booleans indexed by GLFW-compatible
//! key numbers (letters are their uppercase ASCII codes, Escape is 256, ...). Press and
//! release events flip entries; once per frame [`InputState::update_camera_pose`] turns the
//! held movement keys into `move_*` calls. Mouse motion rotates the camera and the scroll
//! wheel zooms it.
//!
//! [`on_device_error`] is the one callback that does not touch the camera: errors the device
//! reports outside an error scope are unrecoverable and end the process.

use winit::event::{ElementState, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::camera::CameraController;

/// Size of the held-key vector; valid key numbers are `0..KEY_COUNT`.
pub const KEY_COUNT: usize = 1024;

pub const KEY_SPACE: i32 = 32;
pub const KEY_A: i32 = 65;
pub const KEY_D: i32 = 68;
pub const KEY_S: i32 = 83;
pub const KEY_W: i32 = 87;
pub const KEY_ESCAPE: i32 = 256;

/// Pixels per line when a touchpad reports its scroll in pixels.
const PIXELS_PER_SCROLL_LINE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Release,
    Repeat,
}

/// What the driver should do after an input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputResponse {
    Continue,
    CloseRequested,
}

/// Per-key "is held" flags.
#[derive(Debug, Clone)]
pub struct KeyStates {
    held: Vec<bool>,
}

impl Default for KeyStates {
    fn default() -> Self {
        Self {
            held: vec![false; KEY_COUNT],
        }
    }
}

impl KeyStates {
    /// Records `key` as held or released. Keys outside `0..KEY_COUNT` are ignored and
    /// `false` is returned.
    pub fn set(&mut self, key: i32, held: bool) -> bool {
        match slot(key) {
            Some(index) => {
                self.held[index] = held;
                true
            }
            None => false,
        }
    }

    pub fn is_held(&self, key: i32) -> bool {
        slot(key).is_some_and(|index| self.held[index])
    }

    pub fn held_count(&self) -> usize {
        self.held.iter().filter(|held| **held).count()
    }
}

fn slot(key: i32) -> Option<usize> {
    usize::try_from(key).ok().filter(|index| *index < KEY_COUNT)
}

/// Input state shared between event delivery and the per-frame update.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    keys: KeyStates,
    last_cursor: Option<(f64, f64)>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> &KeyStates {
        &self.keys
    }

    /// Key callback. Escape asks for the window to close; every in-range key updates the
    /// held-key vector.
    pub fn handle_key(&mut self, key: i32, action: KeyAction) -> InputResponse {
        match action {
            KeyAction::Press => {
                if !self.keys.set(key, true) {
                    log::trace!("Ignoring press of out-of-range key {key}");
                }
            }
            KeyAction::Release => {
                self.keys.set(key, false);
            }
            KeyAction::Repeat => {}
        }

        if key == KEY_ESCAPE && action == KeyAction::Press {
            InputResponse::CloseRequested
        } else {
            InputResponse::Continue
        }
    }

    /// Cursor-position callback.
    ///
    /// The first call only records the position. Afterwards the offset from the previous
    /// position, scaled by the controller's sensitivity, turns the camera; screen y grows
    /// downwards, so moving the mouse up raises the pitch.
    pub fn handle_cursor(&mut self, x: f64, y: f64, controller: &mut CameraController) {
        let (last_x, last_y) = *self.last_cursor.get_or_insert((x, y));

        let sensitivity = controller.rotation_sensitivity();
        controller.add_yaw_offset(sensitivity * (x - last_x) as f32);
        controller.add_pitch_offset(sensitivity * (last_y - y) as f32);

        self.last_cursor = Some((x, y));
    }

    /// Key callback for an event the HUD may have consumed.
    ///
    /// Releases always reach the held-key vector, so a key released while an egui widget
    /// has focus does not stay held. Consumed presses and repeats are dropped.
    pub fn handle_key_event(
        &mut self,
        key: i32,
        action: KeyAction,
        gui_consumed: bool,
    ) -> InputResponse {
        if gui_consumed && action != KeyAction::Release {
            return InputResponse::Continue;
        }
        self.handle_key(key, action)
    }

    /// Records the cursor position without turning the camera.
    ///
    /// Used for motion the HUD consumed, so the next camera-bound motion is measured from
    /// where the cursor really is.
    pub fn track_cursor(&mut self, x: f64, y: f64) {
        self.last_cursor = Some((x, y));
    }

    /// Scroll callback; the vertical offset goes straight to the zoom.
    pub fn handle_scroll(&mut self, y_offset: f32, controller: &mut CameraController) {
        controller.adjust_zoom(y_offset);
    }

    /// Applies one step of movement for every held movement key.
    ///
    /// Keys compose: W and A together move diagonally, by one step along each axis.
    pub fn update_camera_pose(&self, controller: &mut CameraController) {
        if self.keys.is_held(KEY_W) {
            controller.move_front();
        }
        if self.keys.is_held(KEY_S) {
            controller.move_back();
        }
        if self.keys.is_held(KEY_A) {
            controller.move_left();
        }
        if self.keys.is_held(KEY_D) {
            controller.move_right();
        }
    }

    /// Routes a winit window event to the matching callback.
    ///
    /// `gui_consumed` tells whether egui used the event. Consumed cursor motion still
    /// updates the last cursor position and consumed key releases still clear held keys;
    /// everything else consumed leaves the camera alone.
    pub fn handle_window_event(
        &mut self,
        event: &WindowEvent,
        controller: &mut CameraController,
        gui_consumed: bool,
    ) -> InputResponse {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state,
                        repeat,
                        ..
                    },
                ..
            } => {
                let Some(key) = key_index(*key_code) else {
                    return InputResponse::Continue;
                };
                let action = match (state, repeat) {
                    (ElementState::Pressed, true) => KeyAction::Repeat,
                    (ElementState::Pressed, false) => KeyAction::Press,
                    (ElementState::Released, _) => KeyAction::Release,
                };
                self.handle_key_event(key, action, gui_consumed)
            }
            WindowEvent::CursorMoved { position, .. } => {
                if gui_consumed {
                    self.track_cursor(position.x, position.y);
                } else {
                    self.handle_cursor(position.x, position.y, controller);
                }
                InputResponse::Continue
            }
            WindowEvent::MouseWheel { .. } if gui_consumed => InputResponse::Continue,
            WindowEvent::MouseWheel { delta, .. } => {
                let y_offset = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(position) => {
                        (position.y / PIXELS_PER_SCROLL_LINE) as f32
                    }
                };
                self.handle_scroll(y_offset, controller);
                InputResponse::Continue
            }
            _ => InputResponse::Continue,
        }
    }
}

/// Error callback for device errors raised outside any error scope.
///
/// Logs the device's description and terminates the process with a failure status.
pub fn on_device_error(error: wgpu::Error) {
    log::error!("Unrecoverable device error: {error}");
    std::process::exit(1);
}

/// Maps a physical key to its GLFW-compatible key number.
pub fn key_index(key_code: KeyCode) -> Option<i32> {
    use KeyCode::*;

    const LETTERS: [KeyCode; 26] = [
        KeyA, KeyB, KeyC, KeyD, KeyE, KeyF, KeyG, KeyH, KeyI, KeyJ, KeyK, KeyL, KeyM, KeyN,
        KeyO, KeyP, KeyQ, KeyR, KeyS, KeyT, KeyU, KeyV, KeyW, KeyX, KeyY, KeyZ,
    ];
    const DIGITS: [KeyCode; 10] = [
        Digit0, Digit1, Digit2, Digit3, Digit4, Digit5, Digit6, Digit7, Digit8, Digit9,
    ];
    const FUNCTION_KEYS: [KeyCode; 12] =
        [F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12];

    if let Some(offset) = LETTERS.iter().position(|code| *code == key_code) {
        return Some(KEY_A + offset as i32);
    }
    if let Some(offset) = DIGITS.iter().position(|code| *code == key_code) {
        return Some(48 + offset as i32);
    }
    if let Some(offset) = FUNCTION_KEYS.iter().position(|code| *code == key_code) {
        return Some(290 + offset as i32);
    }

    let key = match key_code {
        Space => KEY_SPACE,
        Escape => KEY_ESCAPE,
        Enter => 257,
        Tab => 258,
        Backspace => 259,
        ArrowRight => 262,
        ArrowLeft => 263,
        ArrowDown => 264,
        ArrowUp => 265,
        ShiftLeft => 340,
        ControlLeft => 341,
        AltLeft => 342,
        ShiftRight => 344,
        ControlRight => 345,
        AltRight => 346,
        _ => return None,
    };
    Some(key)
}
