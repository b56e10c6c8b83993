//! Asset management system
//!
//! Managers own the GPU resources the scene draws with. Each one keeps a
//! [`ResourceCache`] from a stable key to an `Arc` of the resource, so a key
//! is uploaded at most once and the resource stays alive for as long as any
//! model still references it.

pub mod cache;
pub mod loader;
pub mod material_manager;
pub mod mesh_manager;
pub mod model;
pub mod model_manager;
pub mod mtl_parser;
pub mod obj_loader;
pub mod texture_manager;

pub use cache::ResourceCache;
pub use loader::{MaterialDescriptor, ModelAsset, ModelLoader};
pub use material_manager::MaterialManager;
pub use mesh_manager::MeshManager;
pub use model::{Model, ModelPart};
pub use model_manager::{ModelManager, ModelSources};
pub use mtl_parser::{MtlData, MtlParser};
pub use obj_loader::ObjModelLoader;
pub use texture_manager::TextureManager;

use std::path::PathBuf;

use thiserror::Error;

use crate::render::{GpuError, MaterialError};

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Asset file does not exist
    #[error("Asset not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Asset file exists but could not be parsed
    #[error("Failed to parse {}: {reason}", path.display())]
    Parse {
        /// File being parsed
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Parsed data is not usable
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Image decoding failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// A mesh names a material its model does not define
    #[error("Mesh '{mesh}' references unknown material '{material}'")]
    MissingMaterial {
        /// Mesh name
        mesh: String,
        /// Material name the mesh asked for
        material: String,
    },

    /// GPU upload failed
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),

    /// Material block creation failed
    #[error("Material error: {0}")]
    Material(#[from] MaterialError),

    /// IO error during asset loading
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
