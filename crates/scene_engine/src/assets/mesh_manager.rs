//! Mesh manager

use std::sync::Arc;

use crate::assets::{AssetError, ResourceCache};
use crate::render::{GpuContext, Mesh, MeshData};

/// Owns uploaded meshes by key
#[derive(Debug, Default)]
pub struct MeshManager {
    meshes: ResourceCache<Mesh>,
}

impl MeshManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload `data` under `key`, or return the mesh already stored there
    pub fn load_mesh<C: GpuContext + ?Sized>(
        &self,
        context: &mut C,
        key: &str,
        data: &MeshData,
    ) -> Result<Arc<Mesh>, AssetError> {
        self.meshes.get_or_try_insert(key, || {
            data.validate().map_err(AssetError::InvalidData)?;
            Ok(Mesh::upload(context, data)?)
        })
    }

    /// Look up a mesh
    pub fn get(&self, key: &str) -> Option<Arc<Mesh>> {
        self.meshes.get(key)
    }

    /// Whether `key` has been loaded
    pub fn contains(&self, key: &str) -> bool {
        self.meshes.contains(key)
    }

    /// Number of meshes
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Whether no mesh is loaded
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Keys of every loaded mesh
    pub fn keys(&self) -> Vec<String> {
        self.meshes.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{HeadlessContext, Vertex};

    fn triangle() -> MeshData {
        MeshData::new(
            "triangle",
            vec![
                Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
                Vertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
                Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
            ],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn test_load_is_idempotent() {
        let mut ctx = HeadlessContext::new();
        let manager = MeshManager::new();

        let first = manager.load_mesh(&mut ctx, "tri", &triangle()).unwrap();
        let second = manager.load_mesh(&mut ctx, "tri", &triangle()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(ctx.mesh_count(), 1);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_invalid_mesh_is_rejected() {
        let mut ctx = HeadlessContext::new();
        let manager = MeshManager::new();
        let mut data = triangle();
        data.indices = vec![0, 1, 7];

        let result = manager.load_mesh(&mut ctx, "bad", &data);
        assert!(matches!(result, Err(AssetError::InvalidData(_))));
        assert_eq!(ctx.mesh_count(), 0);
        assert!(manager.is_empty());
    }
}
