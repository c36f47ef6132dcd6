use glam::Vec3;
use serde::Deserialize;

use crate::{core::input_manager::FrameInput, render::scene::Camera};

const MAX_PITCH: f32 = 89.0;

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub initial_pos: Vec3,
    /// Degrees around the world up axis; -90 looks down -Z.
    pub initial_yaw: f32,
    pub initial_pitch: f32,
    pub up: Vec3,
    /// World units per second.
    pub speed: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near_plane: f32,
    pub far_plane: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            initial_pos: Vec3::new(0.0, 0.0, 3.0),
            initial_yaw: -90.0,
            initial_pitch: 0.0,
            up: Vec3::Y,
            speed: 2.5,
            fov: 90.0,
            near_plane: 0.1,
            far_plane: 100.0,
        }
    }
}

/// Free-fly camera: mouse look in yaw/pitch, movement relative to the view.
pub struct CameraController {
    settings: CameraSettings,
    yaw: f32,
    pitch: f32,
    camera: Camera,
}

impl CameraController {
    pub fn new(settings: &CameraSettings, aspect_ratio: f32) -> CameraController {
        let pitch = settings.initial_pitch.clamp(-MAX_PITCH, MAX_PITCH);
        let camera = Camera::new(
            settings.initial_pos,
            front_from_angles(settings.initial_yaw, pitch),
            settings.up,
            settings.fov,
            aspect_ratio,
            settings.near_plane,
            settings.far_plane,
        );

        Self {
            settings: *settings,
            yaw: settings.initial_yaw,
            pitch,
            camera,
        }
    }

    pub fn update(&mut self, delta_time: f32, input: &FrameInput) {
        // cursor y grows downwards
        self.yaw += input.look_delta.x;
        self.pitch = (self.pitch - input.look_delta.y).clamp(-MAX_PITCH, MAX_PITCH);

        let front = front_from_angles(self.yaw, self.pitch);
        let up = self.settings.up;
        let right = front.cross(up).normalize_or_zero();

        let movement = right * input.move_vector.x + up * input.move_vector.y + front * input.move_vector.z;
        let position = self.camera.position() + self.settings.speed * delta_time * movement;

        self.camera.set_front(front);
        self.camera.set_position(position);
    }

    #[cfg(test)]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }
}

fn front_from_angles(yaw: f32, pitch: f32) -> Vec3 {
    let (yaw, pitch) = (yaw.to_radians(), pitch.to_radians());

    Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
}
