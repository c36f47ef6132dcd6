//! Settings file loading.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::info;
use thiserror::Error;

use super::app::AppSettings;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl AppSettings {
    /// Reads a TOML settings file. Missing keys keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<AppSettings, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let settings = Self::from_toml_str(&contents)?;
        info!("Loaded settings from {}", path.display());

        Ok(settings)
    }

    pub fn from_toml_str(contents: &str) -> Result<AppSettings, ConfigError> {
        Ok(toml::from_str(contents)?)
    }
}
