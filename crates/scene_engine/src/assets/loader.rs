//! Model source abstraction

use std::path::{Path, PathBuf};

use crate::assets::AssetError;
use crate::render::{MaterialParams, MeshData};

/// Material definition as read from a model file
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDescriptor {
    /// Shading parameters; `params.name` is the material's name in the file
    pub params: MaterialParams,
    /// Color map, as written in the file
    pub color_texture: Option<PathBuf>,
    /// Normal map, as written in the file
    pub normal_texture: Option<PathBuf>,
}

/// CPU-side model: geometry plus the materials it references
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelAsset {
    /// Meshes, each naming its material (if any)
    pub meshes: Vec<MeshData>,
    /// Materials the meshes may reference
    pub materials: Vec<MaterialDescriptor>,
}

impl ModelAsset {
    /// Find a material by its name in the file
    pub fn material(&self, name: &str) -> Option<&MaterialDescriptor> {
        self.materials.iter().find(|m| m.params.name == name)
    }
}

/// Reads model files into [`ModelAsset`]s
pub trait ModelLoader: Send + Sync {
    /// Parse the model at `path`
    fn load(&self, path: &Path) -> Result<ModelAsset, AssetError>;
}
