//! Renderable models

use std::sync::Arc;

use crate::render::gpu::Capability;
use crate::render::{GpuContext, GpuResult, Material, Mesh, RasterState, Texture, TextureUnit};

/// One mesh drawn with one material
#[derive(Debug, Clone)]
pub struct ModelPart {
    /// Geometry
    pub mesh: Arc<Mesh>,
    /// Shading parameters
    pub material: Arc<Material>,
    /// Color map (unit 0)
    pub color_texture: Option<Arc<Texture>>,
    /// Normal map (unit 1)
    pub normal_texture: Option<Arc<Texture>>,
}

/// A named set of parts sharing resources with the managers
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    parts: Vec<ModelPart>,
}

impl Model {
    /// Create a model
    pub fn new(name: impl Into<String>, parts: Vec<ModelPart>) -> Self {
        Self {
            name: name.into(),
            parts,
        }
    }

    /// Model name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parts in draw order
    pub fn parts(&self) -> &[ModelPart] {
        &self.parts
    }

    /// Draw every part
    ///
    /// Two-sided materials are drawn with culling off; culling is restored
    /// afterwards when `raster` has it enabled.
    pub fn render<C: GpuContext + ?Sized>(&self, context: &mut C, raster: &RasterState) -> GpuResult<()> {
        for part in &self.parts {
            part.material.bind(context)?;
            if let Some(texture) = &part.color_texture {
                texture.bind(context, TextureUnit::Color)?;
            }
            if let Some(texture) = &part.normal_texture {
                texture.bind(context, TextureUnit::Normal)?;
            }

            let uncull = part.material.is_two_sided() && raster.cull_face;
            if uncull {
                context.set_capability(Capability::CullFace, false);
            }
            part.mesh.render(context)?;
            if uncull {
                context.set_capability(Capability::CullFace, true);
            }
        }
        log::trace!("Rendered model '{}' ({} parts)", self.name, self.parts.len());
        Ok(())
    }
}
