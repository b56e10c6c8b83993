//! Configuration system
//!
//! Scene configuration is plain serde data with defaults matching the stock
//! viewer. Files are read and written as TOML or RON depending on extension.

mod scene_config;

pub use scene_config::{
    CameraConfig, LightConfig, LightKindConfig, ModelConfig, ProjectionConfig, SceneConfig,
    ShaderConfig,
};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// File-backed configuration, encoded by extension (`.toml` or `.ron`)
pub trait Config: Serialize + DeserializeOwned + Default {
    /// Read and decode `path`
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = Format::of(path)?;
        let text = std::fs::read_to_string(path)?;
        let decoded = match format {
            Format::Toml => toml::from_str(&text).map_err(|e| e.to_string()),
            Format::Ron => ron::from_str(&text).map_err(|e| e.to_string()),
        };
        decoded.map_err(|reason| ConfigError::Parse {
            path: path.display().to_string(),
            reason,
        })
    }

    /// Encode and write to `path`, replacing any existing file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = match Format::of(path)? {
            Format::Toml => toml::to_string_pretty(self).map_err(|e| e.to_string()),
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| e.to_string()),
        }
        .map_err(ConfigError::Serialize)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Toml,
    Ron,
}

impl Format {
    fn of(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Failures reading, writing or validating configuration
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Filesystem access failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML/RON for the target type
    #[error("Failed to parse {path}: {reason}")]
    Parse {
        /// File being read
        path: String,
        /// Decoder message
        reason: String,
    },

    /// The value could not be encoded
    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),

    /// Extension is neither `.toml` nor `.ron`
    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// A value is outside its allowed range
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}
