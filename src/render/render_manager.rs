use std::{iter, path::PathBuf, sync::Arc};

use bytemuck::{bytes_of, Zeroable};
use log::{info, warn};
use serde::Deserialize;
use thiserror::Error;
use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    Adapter, BindGroup, BindGroupDescriptor, BindGroupEntry, BindingResource, Buffer,
    BufferUsages, Color, CompositeAlphaMode, Device, DeviceDescriptor, Extent3d, Instance, LoadOp,
    Operations, PresentMode, Queue, RenderPassColorAttachment, RenderPassDepthStencilAttachment,
    RenderPassDescriptor, RequestAdapterOptions, StoreOp, Surface, SurfaceConfiguration,
    SurfaceError, Texture, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages,
    TextureView,
};
use winit::{dpi::PhysicalSize, window::Window};

use crate::assets::texture_loader::{TextureData, TextureError};

use super::{
    mesh::MeshError,
    mesh_collection::MeshCollection,
    scene::FrameUniforms,
    shader::{ShaderError, ShaderProgram},
    texture::GpuTexture,
    wgpu_backend::WgpuBackend,
};

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("Requested adapter was None")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error(transparent)]
    Texture(#[from] TextureError),
    #[error("Surface reports no supported {0}")]
    UnsupportedSurface(&'static str),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub clear_color: [f64; 4],
    pub vsync: bool,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            vsync: true,
            vertex_shader: PathBuf::from("shaders/blinn_phong.vert"),
            fragment_shader: PathBuf::from("shaders/blinn_phong.frag"),
        }
    }
}

pub struct RenderManager<'a> {
    settings: RenderSettings,
    surface_config: SurfaceConfiguration,
    surface: Surface<'a>,
    backend: WgpuBackend,
    depth_texture: Texture,
    depth_view: TextureView,

    shader: ShaderProgram,
    uniform_buffer: Buffer,
    bind_group: BindGroup,
    _texture: GpuTexture,
}

impl<'a> RenderManager<'a> {
    pub async fn new(
        settings: &RenderSettings,
        window: Arc<Window>,
        texture: &TextureData,
    ) -> Result<RenderManager<'a>, RenderError> {
        let instance = Instance::new(Default::default());

        let (surface_width, surface_height) = window.inner_size().into();
        let surface = instance.create_surface(window)?;

        let (adapter, device, queue) = Self::create_wgpu_objects(&instance, &surface).await?;
        info!("Using adapter {:?}", adapter.get_info().name);

        let surface_config = Self::create_surface_config(
            &surface,
            &adapter,
            surface_width,
            surface_height,
            settings.vsync,
        )?;
        surface.configure(&device, &surface_config);

        let depth_texture = Self::create_depth_texture(&device, surface_width, surface_height);
        let depth_view = depth_texture.create_view(&Default::default());

        let shader = ShaderProgram::load(
            &device,
            &settings.vertex_shader,
            &settings.fragment_shader,
            surface_config.format,
            DEPTH_FORMAT,
        )?;

        let uniform_buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("frame_uniforms"),
            contents: bytes_of(&FrameUniforms::zeroed()),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });

        let texture = GpuTexture::new(&device, &queue, texture)?;
        let bind_group = Self::create_bind_group(&device, &shader, &uniform_buffer, &texture);

        let backend = WgpuBackend::new(device, queue, shader.vertex_layout());

        Ok(RenderManager {
            settings: settings.clone(),
            surface_config,
            surface,
            backend,
            depth_texture,
            depth_view,
            shader,
            uniform_buffer,
            bind_group,
            _texture: texture,
        })
    }

    pub fn backend_mut(&mut self) -> &mut WgpuBackend {
        &mut self.backend
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    pub fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }

        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.surface
            .configure(self.backend.device(), &self.surface_config);

        self.depth_texture =
            Self::create_depth_texture(self.backend.device(), size.width, size.height);
        self.depth_view = self.depth_texture.create_view(&Default::default());
    }

    pub fn render(
        &mut self,
        meshes: &MeshCollection,
        uniforms: &FrameUniforms,
    ) -> Result<(), RenderError> {
        let surface = match self.surface.get_current_texture() {
            Ok(surface) => surface,
            Err(err @ (SurfaceError::Lost | SurfaceError::Outdated | SurfaceError::Timeout)) => {
                warn!("Reconfiguring surface after {}", err);
                self.surface
                    .configure(self.backend.device(), &self.surface_config);
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let surface_view = surface.texture.create_view(&Default::default());

        self.backend
            .queue()
            .write_buffer(&self.uniform_buffer, 0, bytes_of(uniforms));

        meshes.render(&mut self.backend)?;
        let commands = self.backend.take_draw_commands();

        let mut encoder = self
            .backend
            .device()
            .create_command_encoder(&Default::default());

        {
            let [r, g, b, a] = self.settings.clear_color;
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: None,
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color { r, g, b, a }),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(self.shader.pipeline());
            pass.set_bind_group(0, &self.bind_group, &[]);
            self.backend.replay(&commands, &mut pass);
        }

        self.backend.queue().submit(iter::once(encoder.finish()));
        surface.present();

        Ok(())
    }

    async fn create_wgpu_objects(
        instance: &Instance,
        surface: &Surface<'a>,
    ) -> Result<(Adapter, Device, Queue), RenderError> {
        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                compatible_surface: Some(surface),
                ..Default::default()
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    ..Default::default()
                },
                None,
            )
            .await?;

        Ok((adapter, device, queue))
    }

    fn create_surface_config(
        surface: &Surface,
        adapter: &Adapter,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<SurfaceConfiguration, RenderError> {
        let surface_capabilities = surface.get_capabilities(adapter);
        let present_mode = if vsync {
            PresentMode::AutoVsync
        } else {
            PresentMode::AutoNoVsync
        };

        Ok(SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: choose_surface_format(&surface_capabilities.formats)?,
            width,
            height,
            present_mode,
            desired_maximum_frame_latency: 2,
            alpha_mode: choose_alpha_mode(&surface_capabilities.alpha_modes)?,
            view_formats: vec![],
        })
    }

    fn create_depth_texture(device: &Device, width: u32, height: u32) -> Texture {
        device.create_texture(&TextureDescriptor {
            label: Some("depth"),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    fn create_bind_group(
        device: &Device,
        shader: &ShaderProgram,
        uniform_buffer: &Buffer,
        texture: &GpuTexture,
    ) -> BindGroup {
        device.create_bind_group(&BindGroupDescriptor {
            label: None,
            layout: shader.bind_group_layout(),
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::TextureView(texture.view()),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: BindingResource::Sampler(texture.sampler()),
                },
            ],
        })
    }
}

/// Prefers an sRGB format, otherwise the first one the surface reports.
fn choose_surface_format(formats: &[TextureFormat]) -> Result<TextureFormat, RenderError> {
    formats
        .iter()
        .copied()
        .find(|format| format.is_srgb())
        .or_else(|| formats.first().copied())
        .ok_or(RenderError::UnsupportedSurface("texture format"))
}

fn choose_alpha_mode(alpha_modes: &[CompositeAlphaMode]) -> Result<CompositeAlphaMode, RenderError> {
    alpha_modes
        .first()
        .copied()
        .ok_or(RenderError::UnsupportedSurface("alpha mode"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_format_is_preferred() {
        let formats = [TextureFormat::Bgra8Unorm, TextureFormat::Bgra8UnormSrgb];
        assert_eq!(
            choose_surface_format(&formats).unwrap(),
            TextureFormat::Bgra8UnormSrgb
        );

        let linear_only = [TextureFormat::Rgba16Float];
        assert_eq!(
            choose_surface_format(&linear_only).unwrap(),
            TextureFormat::Rgba16Float
        );
    }

    #[test]
    fn surface_without_capabilities_is_an_error() {
        assert!(matches!(
            choose_surface_format(&[]),
            Err(RenderError::UnsupportedSurface("texture format"))
        ));
        assert!(matches!(
            choose_alpha_mode(&[]),
            Err(RenderError::UnsupportedSurface("alpha mode"))
        ));
        assert_eq!(
            choose_alpha_mode(&[CompositeAlphaMode::Opaque]).unwrap(),
            CompositeAlphaMode::Opaque
        );
    }
}
