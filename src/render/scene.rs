use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use serde::Deserialize;

/// Single directional light of the Blinn-Phong model.
///
/// `direction` points from the surface towards the light.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub ambient_colour: Vec4,
    pub diffuse_colour: Vec4,
    pub specular_colour: Vec4,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::Z,
            ambient_colour: Vec4::ONE,
            diffuse_colour: Vec4::ONE,
            specular_colour: Vec4::ONE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Material {
    pub ambient_colour: Vec4,
    pub diffuse_colour: Vec4,
    pub specular_colour: Vec4,
    pub specular_power: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient_colour: Vec4::new(0.5, 0.0, 0.0, 1.0),
            diffuse_colour: Vec4::ONE,
            specular_colour: Vec4::ONE,
            specular_power: 25.0,
        }
    }
}

/// Placement of the model in the world. Rotation holds Euler angles in
/// radians, composed as `X * Y * Z`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelTransform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl ModelTransform {
    pub fn matrix(&self) -> Mat4 {
        let rotation = Mat4::from_rotation_x(self.rotation.x)
            * Mat4::from_rotation_y(self.rotation.y)
            * Mat4::from_rotation_z(self.rotation.z);

        Mat4::from_translation(self.position) * rotation * Mat4::from_scale(self.scale)
    }
}

/// Uniform block shared by `blinn_phong.vert` and `blinn_phong.frag`
/// (std140, set 0 binding 0).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    pub model_matrix: Mat4,
    pub view_matrix: Mat4,
    pub projection_matrix: Mat4,
    pub ambient_light_colour: Vec4,
    pub diffuse_light_colour: Vec4,
    pub specular_light_colour: Vec4,
    pub ambient_material_colour: Vec4,
    pub diffuse_material_colour: Vec4,
    pub specular_material_colour: Vec4,
    pub light_direction: Vec3,
    pub specular_power: f32,
    pub camera_position: Vec3,
    _padding: f32,
}

impl FrameUniforms {
    pub fn new(
        model_matrix: Mat4,
        camera: &mut Camera,
        light: &DirectionalLight,
        material: &Material,
    ) -> FrameUniforms {
        FrameUniforms {
            model_matrix,
            view_matrix: camera.view_matrix(),
            projection_matrix: camera.proj_matrix(),
            ambient_light_colour: light.ambient_colour,
            diffuse_light_colour: light.diffuse_colour,
            specular_light_colour: light.specular_colour,
            ambient_material_colour: material.ambient_colour,
            diffuse_material_colour: material.diffuse_colour,
            specular_material_colour: material.specular_colour,
            light_direction: light.direction,
            specular_power: material.specular_power,
            camera_position: camera.position(),
            _padding: 0.0,
        }
    }
}

pub struct Camera {
    position: Vec3,
    front: Vec3,
    up: Vec3,
    fov: f32,
    aspect_ratio: f32,
    near_plane: f32,
    far_plane: f32,
    is_dirty: bool,
    view_matrix: Mat4,
    proj_matrix: Mat4,
}

impl Camera {
    pub fn new(
        position: Vec3,
        front: Vec3,
        up: Vec3,
        fov: f32,
        aspect_ratio: f32,
        near_plane: f32,
        far_plane: f32,
    ) -> Camera {
        Camera {
            position,
            front,
            up,
            fov,
            aspect_ratio,
            near_plane,
            far_plane,
            is_dirty: true,
            view_matrix: Default::default(),
            proj_matrix: Default::default(),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.is_dirty = true;
    }

    #[cfg(test)]
    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn set_front(&mut self, front: Vec3) {
        self.front = front;
        self.is_dirty = true;
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
        self.is_dirty = true;
    }

    pub fn view_matrix(&mut self) -> Mat4 {
        if self.is_dirty {
            self.update_values();
            self.is_dirty = false;
        }

        self.view_matrix
    }

    pub fn proj_matrix(&mut self) -> Mat4 {
        if self.is_dirty {
            self.update_values();
            self.is_dirty = false;
        }

        self.proj_matrix
    }

    fn update_values(&mut self) {
        self.view_matrix = Mat4::look_at_rh(self.position, self.position + self.front, self.up);
        self.proj_matrix = Mat4::perspective_rh(
            self.fov.to_radians(),
            self.aspect_ratio,
            self.near_plane,
            self.far_plane,
        );
    }
}
