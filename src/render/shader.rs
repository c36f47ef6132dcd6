use std::{
    borrow::Cow,
    fs,
    path::{Path, PathBuf},
};

use log::info;
use thiserror::Error;
use wgpu::{
    naga::ShaderStage, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry,
    BindingType, BlendState, BufferBindingType, ColorTargetState, ColorWrites, CompareFunction,
    DepthBiasState, DepthStencilState, Device, ErrorFilter, FragmentState, FrontFace,
    MultisampleState, PipelineLayoutDescriptor, PolygonMode, PrimitiveState, PrimitiveTopology,
    RenderPipeline, RenderPipelineDescriptor, SamplerBindingType, ShaderModule,
    ShaderModuleDescriptor, ShaderSource, ShaderStages, StencilState, TextureFormat,
    TextureSampleType, TextureViewDimension, VertexBufferLayout, VertexState, VertexStepMode,
};

use super::vertex::{Vertex, VertexLayout};

#[derive(Error, Debug)]
pub enum ShaderError {
    #[error("Failed to read shader {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to compile shader {path}: {message}")]
    Compile { path: PathBuf, message: String },
    #[error("Failed to link shader program: {0}")]
    Link(String),
}

/// Vertex + fragment GLSL pair linked into a render pipeline.
///
/// Bindings of group 0: the `FrameUniforms` block, the base texture and its
/// sampler.
pub struct ShaderProgram {
    pipeline: RenderPipeline,
    bind_group_layout: BindGroupLayout,
    vertex_layout: VertexLayout,
}

impl ShaderProgram {
    pub fn load(
        device: &Device,
        vertex_path: &Path,
        fragment_path: &Path,
        color_format: TextureFormat,
        depth_format: TextureFormat,
    ) -> Result<ShaderProgram, ShaderError> {
        let vertex_module = Self::compile(device, vertex_path, ShaderStage::Vertex)?;
        let fragment_module = Self::compile(device, fragment_path, ShaderStage::Fragment)?;

        let bind_group_layout = Self::create_bind_group_layout(device);

        let vertex_layout = Vertex::layout();
        let vertex_attributes = vertex_layout.wgpu_attributes();

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        device.push_error_scope(ErrorFilter::Validation);

        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("blinn_phong"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &vertex_module,
                entry_point: "main",
                buffers: &[VertexBufferLayout {
                    array_stride: vertex_layout.stride,
                    step_mode: VertexStepMode::Vertex,
                    attributes: &vertex_attributes,
                }],
            },
            primitive: PrimitiveState {
                topology: PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(DepthStencilState {
                format: depth_format,
                depth_write_enabled: true,
                depth_compare: CompareFunction::Less,
                stencil: StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(FragmentState {
                module: &fragment_module,
                entry_point: "main",
                targets: &[Some(ColorTargetState {
                    format: color_format,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::ALL,
                })],
            }),
            multiview: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(ShaderError::Link(err.to_string()));
        }

        info!(
            "Linked shader program {} + {}",
            vertex_path.display(),
            fragment_path.display()
        );

        Ok(ShaderProgram {
            pipeline,
            bind_group_layout,
            vertex_layout,
        })
    }

    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    pub fn bind_group_layout(&self) -> &BindGroupLayout {
        &self.bind_group_layout
    }

    /// Layout the pipeline was linked against.
    pub fn vertex_layout(&self) -> VertexLayout {
        self.vertex_layout
    }

    fn compile(device: &Device, path: &Path, stage: ShaderStage) -> Result<ShaderModule, ShaderError> {
        let source = fs::read_to_string(path).map_err(|source| ShaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        device.push_error_scope(ErrorFilter::Validation);

        let module = device.create_shader_module(ShaderModuleDescriptor {
            label: path.to_str(),
            source: ShaderSource::Glsl {
                shader: Cow::Owned(source),
                stage,
                defines: Default::default(),
            },
        });

        match pollster::block_on(device.pop_error_scope()) {
            Some(err) => Err(ShaderError::Compile {
                path: path.to_path_buf(),
                message: err.to_string(),
            }),
            None => Ok(module),
        }
    }

    fn create_bind_group_layout(device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: None,
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::VERTEX_FRAGMENT,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }
}
