use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use wgpu::{VertexAttribute as WgpuAttribute, VertexFormat};

use super::backend::{ResourceError, ResourceResult};

/// Interleaved vertex consumed by the Blinn-Phong shader.
///
/// The colour is stored as a plain array because `glam::Vec4` is 16-byte
/// aligned and would pad the struct past 72 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub color: [f32; 4],
    pub tex_coord: Vec2,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub bitangent: Vec3,
}

/// Shader input slots. The discriminant is the `layout(location = N)` used by
/// `shaders/blinn_phong.vert`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    Position = 0,
    Color = 1,
    TexCoord = 2,
    Normal = 3,
    Tangent = 4,
    Bitangent = 5,
}

impl VertexAttribute {
    pub const ALL: [VertexAttribute; 6] = [
        VertexAttribute::Position,
        VertexAttribute::Color,
        VertexAttribute::TexCoord,
        VertexAttribute::Normal,
        VertexAttribute::Tangent,
        VertexAttribute::Bitangent,
    ];

    pub fn location(self) -> u32 {
        self as u32
    }

    pub fn format(self) -> VertexFormat {
        match self {
            VertexAttribute::Color => VertexFormat::Float32x4,
            VertexAttribute::TexCoord => VertexFormat::Float32x2,
            _ => VertexFormat::Float32x3,
        }
    }

    /// Number of `f32` components.
    pub fn components(self) -> u32 {
        match self {
            VertexAttribute::Color => 4,
            VertexAttribute::TexCoord => 2,
            _ => 3,
        }
    }

    /// Byte offset of the attribute inside [`Vertex`].
    pub fn offset(self) -> u64 {
        let offset = match self {
            VertexAttribute::Position => offset_of!(Vertex, position),
            VertexAttribute::Color => offset_of!(Vertex, color),
            VertexAttribute::TexCoord => offset_of!(Vertex, tex_coord),
            VertexAttribute::Normal => offset_of!(Vertex, normal),
            VertexAttribute::Tangent => offset_of!(Vertex, tangent),
            VertexAttribute::Bitangent => offset_of!(Vertex, bitangent),
        };

        offset as u64
    }
}

/// One declared vertex attribute, as bound by `GpuBackend::bind_vertex_layout`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub attribute: VertexAttribute,
    pub location: u32,
    pub components: u32,
    pub offset: u64,
}

impl From<VertexAttribute> for AttributeDescriptor {
    fn from(attribute: VertexAttribute) -> Self {
        AttributeDescriptor {
            attribute,
            location: attribute.location(),
            components: attribute.components(),
            offset: attribute.offset(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: [AttributeDescriptor; 6],
}

impl VertexLayout {
    #[cfg(test)]
    pub fn attribute(&self, attribute: VertexAttribute) -> &AttributeDescriptor {
        &self.attributes[attribute.location() as usize]
    }

    /// Attribute table handed to the render pipeline.
    pub fn wgpu_attributes(&self) -> [WgpuAttribute; 6] {
        self.attributes.map(|descriptor| WgpuAttribute {
            format: descriptor.attribute.format(),
            offset: descriptor.offset,
            shader_location: descriptor.location,
        })
    }

    /// Fails unless `self` is the layout `pipeline` was linked against.
    pub fn ensure_matches(&self, pipeline: &VertexLayout) -> ResourceResult<()> {
        if self != pipeline {
            return Err(ResourceError::LayoutMismatch);
        }

        Ok(())
    }
}

impl Vertex {
    pub fn new(position: Vec3, color: [f32; 4], tex_coord: Vec2, normal: Vec3) -> Vertex {
        Vertex {
            position,
            color,
            tex_coord,
            normal,
            ..Default::default()
        }
    }

    pub fn layout() -> VertexLayout {
        VertexLayout {
            stride: size_of::<Vertex>() as u64,
            attributes: VertexAttribute::ALL.map(AttributeDescriptor::from),
        }
    }
}
