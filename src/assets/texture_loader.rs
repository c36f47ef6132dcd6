use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Failed to load texture {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Texture {name} has invalid size {width}x{height}")]
    InvalidSize {
        name: String,
        width: u32,
        height: u32,
    },
    #[error("Texture {name} is {width}x{height}, the device allows at most {max_dimension}")]
    TooLarge {
        name: String,
        width: u32,
        height: u32,
        max_dimension: u32,
    },
    #[error("Failed to upload texture {name}: {message}")]
    Upload { name: String, message: String },
}

/// Decoded RGBA8 pixels ready for upload.
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub name: String,
}

impl TextureData {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|source| TextureError::Image {
            path: path.to_path_buf(),
            source,
        })?;

        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        info!("Loaded texture {} ({}x{})", path.display(), width, height);

        Self::from_rgba(rgba.into_raw(), width, height, &name)
    }

    pub fn from_rgba(data: Vec<u8>, width: u32, height: u32, name: &str) -> Result<Self, TextureError> {
        if width == 0 || height == 0 || data.len() != (width as usize) * (height as usize) * 4 {
            return Err(TextureError::InvalidSize {
                name: name.to_string(),
                width,
                height,
            });
        }

        Ok(Self {
            width,
            height,
            data,
            name: name.to_string(),
        })
    }

    /// Fails when either side exceeds the device's 2D texture limit.
    pub fn check_fits(&self, max_dimension: u32) -> Result<(), TextureError> {
        if self.width > max_dimension || self.height > max_dimension {
            return Err(TextureError::TooLarge {
                name: self.name.clone(),
                width: self.width,
                height: self.height,
                max_dimension,
            });
        }

        Ok(())
    }

    /// 1x1 white texture, used when the model has no texture.
    pub fn white() -> Self {
        Self {
            width: 1,
            height: 1,
            data: vec![255; 4],
            name: "white".to_string(),
        }
    }
}
