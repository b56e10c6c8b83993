//! Material manager

use std::sync::Arc;

use crate::assets::ResourceCache;
use crate::render::gpu::ProgramHandle;
use crate::render::{GpuContext, Material, MaterialError, MaterialParams};

/// Owns materials built against one program
#[derive(Debug)]
pub struct MaterialManager {
    program: ProgramHandle,
    materials: ResourceCache<Material>,
}

impl MaterialManager {
    /// Create a manager whose materials target `program`
    pub fn new(program: ProgramHandle) -> Self {
        Self {
            program,
            materials: ResourceCache::new(),
        }
    }

    /// Program every material is packed against
    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    /// Build the material stored under `key`, or return the existing one
    pub fn load_material<C: GpuContext + ?Sized>(
        &self,
        context: &mut C,
        key: &str,
        params: MaterialParams,
    ) -> Result<Arc<Material>, MaterialError> {
        self.materials
            .get_or_try_insert(key, || Material::new(context, self.program, params))
    }

    /// Look up a material
    pub fn get(&self, key: &str) -> Option<Arc<Material>> {
        self.materials.get(key)
    }

    /// Whether `key` has been loaded
    pub fn contains(&self, key: &str) -> bool {
        self.materials.contains(key)
    }

    /// Number of materials
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Whether no material is loaded
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Keys of every loaded material
    pub fn keys(&self) -> Vec<String> {
        self.materials.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessContext;

    #[test]
    fn test_material_built_once_per_key() {
        let mut ctx = HeadlessContext::new();
        let program = ctx.create_program("v", "f").unwrap();
        let manager = MaterialManager::new(program);

        let first = manager
            .load_material(&mut ctx, "ship/hull", MaterialParams::new("hull"))
            .unwrap();
        let buffers = ctx.buffer_count();
        let second = manager
            .load_material(&mut ctx, "ship/hull", MaterialParams::new("ignored"))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.name(), "hull");
        assert_eq!(ctx.buffer_count(), buffers);
    }

    #[test]
    fn test_program_without_block_fails() {
        let mut ctx = HeadlessContext::new().without_uniform_block("MaterialInfo");
        let program = ctx.create_program("v", "f").unwrap();
        let manager = MaterialManager::new(program);

        let result = manager.load_material(&mut ctx, "m", MaterialParams::new("m"));
        assert!(matches!(result, Err(MaterialError::MissingBlock { .. })));
        assert!(!manager.contains("m"));
    }
}
