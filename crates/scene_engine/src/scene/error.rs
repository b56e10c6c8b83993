use thiserror::Error;

use crate::assets::AssetError;
use crate::config::ConfigError;
use crate::render::gpu::GlVersion;
use crate::render::{GpuError, MaterialError};

/// Scene lifecycle errors
#[derive(Error, Debug)]
pub enum SceneError {
    /// The context is older than the shaders require
    #[error("OpenGL {required} or later is required, the context provides {found}")]
    UnsupportedContext {
        /// Minimum version
        required: GlVersion,
        /// Version the context reported
        found: GlVersion,
    },

    /// Operation needs GPU state that `initialize` has not created yet
    #[error("Scene is not initialized")]
    NotInitialized,

    /// `initialize` was called twice
    #[error("Scene is already initialized")]
    AlreadyInitialized,

    /// A lighting subroutine is absent from the fragment stage
    #[error("Fragment subroutine '{name}' not found in program")]
    MissingSubroutine {
        /// Configured subroutine name
        name: String,
    },

    /// The program lacks a uniform block the scene writes
    #[error("Program has no uniform block named '{block}'")]
    MissingUniformBlock {
        /// Block name
        block: &'static str,
    },

    /// The program's light block cannot hold the light parameters
    #[error("Light block holds {found} bytes, {required} required")]
    LightBlockTooSmall {
        /// Bytes the light writes
        required: usize,
        /// Bytes the program declares
        found: usize,
    },

    /// GPU call failed
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),

    /// Model, mesh or texture loading failed
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// Material creation failed
    #[error("Material error: {0}")]
    Material(#[from] MaterialError),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
