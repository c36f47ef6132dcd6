use wgpu::{
    AddressMode, Device, ErrorFilter, Extent3d, FilterMode, ImageCopyTexture, ImageDataLayout,
    Origin3d, Queue, Sampler, SamplerDescriptor, Texture, TextureAspect, TextureDescriptor, TextureDimension,
    TextureFormat, TextureUsages, TextureView,
};

use crate::assets::texture_loader::{TextureData, TextureError};

/// Base colour texture sampled by the fragment shader.
pub struct GpuTexture {
    _texture: Texture,
    view: TextureView,
    sampler: Sampler,
}

impl GpuTexture {
    pub fn new(
        device: &Device,
        queue: &Queue,
        data: &TextureData,
    ) -> Result<GpuTexture, TextureError> {
        data.check_fits(device.limits().max_texture_dimension_2d)?;

        let size = Extent3d {
            width: data.width,
            height: data.height,
            depth_or_array_layers: 1,
        };

        device.push_error_scope(ErrorFilter::OutOfMemory);
        device.push_error_scope(ErrorFilter::Validation);

        let texture = device.create_texture(&TextureDescriptor {
            label: Some(data.name.as_str()),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8UnormSrgb,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            &data.data,
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * data.width),
                rows_per_image: Some(data.height),
            },
            size,
        );

        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());
        if let Some(err) = validation.or(out_of_memory) {
            return Err(TextureError::Upload {
                name: data.name.clone(),
                message: err.to_string(),
            });
        }

        let sampler = device.create_sampler(&SamplerDescriptor {
            label: None,
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            address_mode_w: AddressMode::Repeat,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: FilterMode::Nearest,
            ..Default::default()
        });

        Ok(GpuTexture {
            view: texture.create_view(&Default::default()),
            _texture: texture,
            sampler,
        })
    }

    pub fn view(&self) -> &TextureView {
        &self.view
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }
}
