use std::collections::HashSet;

use glam::{Vec2, Vec3};
use serde::Deserialize;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, KeyEvent},
    keyboard::{KeyCode, PhysicalKey},
};

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    /// Degrees of camera rotation per pixel of cursor movement.
    pub look_sensitivity: f32,
    pub right_key: KeyCode,
    pub left_key: KeyCode,
    pub up_key: KeyCode,
    pub down_key: KeyCode,
    pub forward_key: KeyCode,
    pub backward_key: KeyCode,
    pub fullscreen_key: KeyCode,
    pub quit_key: KeyCode,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            look_sensitivity: 0.05,
            right_key: KeyCode::KeyD,
            left_key: KeyCode::KeyA,
            up_key: KeyCode::Space,
            down_key: KeyCode::ControlLeft,
            forward_key: KeyCode::KeyW,
            backward_key: KeyCode::KeyS,
            fullscreen_key: KeyCode::KeyF,
            quit_key: KeyCode::Escape,
        }
    }
}

/// Input gathered since the previous frame.
///
/// `move_vector` is in camera space: x right, y up, z forward.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    pub move_vector: Vec3,
    pub look_delta: Vec2,
    pub toggle_fullscreen: bool,
    pub quit: bool,
}

pub struct InputManager {
    settings: InputSettings,
    held_keys: HashSet<KeyCode>,
    last_cursor_pos: Vec2,
    cursor_just_entered: bool,
    look_delta: Vec2,
    toggle_fullscreen: bool,
    quit: bool,
}

impl InputManager {
    pub fn new(settings: &InputSettings) -> InputManager {
        InputManager {
            settings: *settings,
            held_keys: HashSet::new(),
            last_cursor_pos: Vec2::ZERO,
            cursor_just_entered: true,
            look_delta: Vec2::ZERO,
            toggle_fullscreen: false,
            quit: false,
        }
    }

    pub fn handle_keyboard_input(&mut self, event: &KeyEvent) {
        self.handle_key(event.physical_key, event.state, event.repeat);
    }

    /// Every key maps to exactly one action.
    pub fn handle_key(&mut self, key: PhysicalKey, state: ElementState, repeat: bool) {
        let PhysicalKey::Code(code) = key else {
            return;
        };

        match state {
            ElementState::Pressed => {
                self.held_keys.insert(code);

                if repeat {
                    return;
                }
                if code == self.settings.fullscreen_key {
                    self.toggle_fullscreen = !self.toggle_fullscreen;
                } else if code == self.settings.quit_key {
                    self.quit = true;
                }
            }
            ElementState::Released => {
                self.held_keys.remove(&code);
            }
        }
    }

    pub fn handle_cursor_movement(&mut self, cursor_position: PhysicalPosition<f64>) {
        let cursor_pos: Vec2 = mint::Point2::from(cursor_position.cast::<f32>()).into();

        if !self.cursor_just_entered {
            self.look_delta += (cursor_pos - self.last_cursor_pos) * self.settings.look_sensitivity;
        }
        self.last_cursor_pos = cursor_pos;
        self.cursor_just_entered = false;
    }

    pub fn handle_cursor_enter(&mut self) {
        self.cursor_just_entered = true;
    }

    /// Releases every held key, e.g. when the window loses focus.
    pub fn clear_held_keys(&mut self) {
        self.held_keys.clear();
    }

    pub fn frame(&self) -> FrameInput {
        FrameInput {
            move_vector: self.move_vector(),
            look_delta: self.look_delta,
            toggle_fullscreen: self.toggle_fullscreen,
            quit: self.quit,
        }
    }

    /// Clears the per-frame deltas once the frame has consumed them.
    pub fn late_update(&mut self) {
        self.look_delta = Vec2::ZERO;
        self.toggle_fullscreen = false;
    }

    fn move_vector(&self) -> Vec3 {
        let axis = |positive: KeyCode, negative: KeyCode| {
            self.held(positive) as i32 as f32 - self.held(negative) as i32 as f32
        };

        Vec3::new(
            axis(self.settings.right_key, self.settings.left_key),
            axis(self.settings.up_key, self.settings.down_key),
            axis(self.settings.forward_key, self.settings.backward_key),
        )
    }

    fn held(&self, key: KeyCode) -> bool {
        self.held_keys.contains(&key)
    }
}
