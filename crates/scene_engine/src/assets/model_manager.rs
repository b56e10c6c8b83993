//! Model manager
//!
//! Turns a model file into a [`Model`] by routing its meshes, materials and
//! textures through the other managers, so resources shared between models
//! are uploaded once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assets::{
    AssetError, MaterialDescriptor, MaterialManager, MeshManager, Model, ModelAsset, ModelLoader,
    ModelPart, ResourceCache, TextureManager,
};
use crate::render::{GpuContext, Material, MaterialParams, Texture};

/// Material used by parts that name none, shared by every model
///
/// Model materials are keyed `{model}/{material}`; this key has no `/`.
pub const FALLBACK_MATERIAL_KEY: &str = "default";

/// Managers a model load populates
#[derive(Debug, Clone, Copy)]
pub struct ModelSources<'a> {
    /// Mesh storage
    pub meshes: &'a MeshManager,
    /// Material storage
    pub materials: &'a MaterialManager,
    /// Texture storage
    pub textures: &'a TextureManager,
}

/// Owns loaded models by name
pub struct ModelManager {
    loader: Arc<dyn ModelLoader>,
    models: ResourceCache<Model>,
}

impl ModelManager {
    /// Create a manager reading files through `loader`
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            models: ResourceCache::new(),
        }
    }

    /// Load the model at `path` under `name`, or return the cached one
    ///
    /// Material references, mesh data and texture files are checked before
    /// any upload, so a rejected asset leaves the managers untouched. Mesh
    /// keys carry the part index and never collide within a model.
    pub fn load_model<C: GpuContext + ?Sized>(
        &self,
        context: &mut C,
        name: &str,
        path: impl AsRef<Path>,
        sources: ModelSources<'_>,
    ) -> Result<Arc<Model>, AssetError> {
        let path = path.as_ref();
        self.models.get_or_try_insert(name, || {
            let asset = self.loader.load(path)?;
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            Self::check_asset(&asset, base)?;

            let mut materials = HashMap::new();
            for descriptor in &asset.materials {
                let resolved = Self::load_material(context, name, base, descriptor, sources)?;
                materials.insert(descriptor.params.name.as_str(), resolved);
            }

            let mut parts = Vec::with_capacity(asset.meshes.len());
            for (index, data) in asset.meshes.iter().enumerate() {
                let (material, color_texture, normal_texture) = match data.material.as_deref() {
                    Some(material_name) => materials
                        .get(material_name)
                        .cloned()
                        .ok_or_else(|| AssetError::MissingMaterial {
                            mesh: data.name.clone(),
                            material: material_name.to_string(),
                        })?,
                    None => {
                        let material = sources.materials.load_material(
                            context,
                            FALLBACK_MATERIAL_KEY,
                            MaterialParams::new("default"),
                        )?;
                        (material, None, None)
                    }
                };

                let key = format!("{name}/{index}/{}", data.name);
                let mesh = sources.meshes.load_mesh(context, &key, data)?;
                parts.push(ModelPart {
                    mesh,
                    material,
                    color_texture,
                    normal_texture,
                });
            }

            log::info!("Loaded model '{}' from {:?} ({} parts)", name, path, parts.len());
            Ok(Model::new(name, parts))
        })
    }

    /// Reject an asset before anything is uploaded for it
    fn check_asset(asset: &ModelAsset, base: &Path) -> Result<(), AssetError> {
        for data in &asset.meshes {
            if let Some(material) = data.material.as_deref() {
                if asset.material(material).is_none() {
                    return Err(AssetError::MissingMaterial {
                        mesh: data.name.clone(),
                        material: material.to_string(),
                    });
                }
            }
            data.validate()
                .map_err(|reason| AssetError::InvalidData(format!("mesh '{}': {reason}", data.name)))?;
        }

        let textures = asset
            .materials
            .iter()
            .flat_map(|descriptor| [&descriptor.color_texture, &descriptor.normal_texture])
            .flatten();
        for texture in textures {
            let path = resolve(base, texture);
            if !path.is_file() {
                return Err(AssetError::NotFound(path));
            }
        }
        Ok(())
    }

    #[allow(clippy::type_complexity)]
    fn load_material<C: GpuContext + ?Sized>(
        context: &mut C,
        model: &str,
        base: &Path,
        descriptor: &MaterialDescriptor,
        sources: ModelSources<'_>,
    ) -> Result<(Arc<Material>, Option<Arc<Texture>>, Option<Arc<Texture>>), AssetError> {
        let key = format!("{model}/{}", descriptor.params.name);
        let material = sources.materials.load_material(context, &key, descriptor.params.clone())?;

        let color = descriptor
            .color_texture
            .as_ref()
            .map(|texture| sources.textures.load_texture(context, resolve(base, texture)))
            .transpose()?;
        let normal = descriptor
            .normal_texture
            .as_ref()
            .map(|texture| sources.textures.load_texture(context, resolve(base, texture)))
            .transpose()?;

        Ok((material, color, normal))
    }

    /// Look up a model by name
    pub fn get(&self, name: &str) -> Option<Arc<Model>> {
        self.models.get(name)
    }

    /// Whether `name` has been loaded
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains(name)
    }

    /// Number of models
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether no model is loaded
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Names of every loaded model
    pub fn keys(&self) -> Vec<String> {
        self.models.keys()
    }
}

impl std::fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelManager")
            .field("models", &self.models)
            .finish_non_exhaustive()
    }
}

/// Texture paths are relative to the model file unless absolute
fn resolve(base: &Path, texture: &Path) -> PathBuf {
    if texture.is_absolute() {
        texture.to_path_buf()
    } else {
        base.join(texture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ObjModelLoader;
    use crate::render::gpu::{Capability, ProgramHandle};
    use crate::render::{HeadlessContext, MeshData, RasterState, Vertex};
    use image::{Rgba, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed asset and counts how often it was asked
    struct FixedLoader {
        asset: ModelAsset,
        calls: Arc<AtomicUsize>,
    }

    impl ModelLoader for FixedLoader {
        fn load(&self, _path: &Path) -> Result<ModelAsset, AssetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.asset.clone())
        }
    }

    fn triangle(name: &str, material: Option<&str>) -> MeshData {
        let mut data = MeshData::new(
            name,
            vec![
                Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
                Vertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
                Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
            ],
            vec![0, 1, 2],
        );
        data.material = material.map(str::to_string);
        data
    }

    fn descriptor(name: &str) -> MaterialDescriptor {
        MaterialDescriptor {
            params: MaterialParams::new(name),
            color_texture: None,
            normal_texture: None,
        }
    }

    struct Fixture {
        ctx: HeadlessContext,
        meshes: MeshManager,
        materials: MaterialManager,
        textures: TextureManager,
    }

    impl Fixture {
        fn new() -> Self {
            let mut ctx = HeadlessContext::new();
            let program: ProgramHandle = ctx.create_program("v", "f").unwrap();
            Self {
                ctx,
                meshes: MeshManager::new(),
                materials: MaterialManager::new(program),
                textures: TextureManager::new(),
            }
        }

        fn load(&mut self, manager: &ModelManager, name: &str, path: &Path) -> Result<Arc<Model>, AssetError> {
            let sources = ModelSources {
                meshes: &self.meshes,
                materials: &self.materials,
                textures: &self.textures,
            };
            manager.load_model(&mut self.ctx, name, path, sources)
        }
    }

    #[test]
    fn test_load_populates_managers_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager = ModelManager::new(Arc::new(FixedLoader {
            asset: ModelAsset {
                meshes: vec![triangle("hull", Some("paint")), triangle("rotor", None)],
                materials: vec![descriptor("paint")],
            },
            calls: Arc::clone(&calls),
        }));
        let mut fixture = Fixture::new();

        let first = fixture.load(&manager, "ship", Path::new("ship.obj")).unwrap();
        let uploads = fixture.ctx.mesh_count();
        let second = fixture.load(&manager, "ship", Path::new("ship.obj")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(uploads, 2);
        assert_eq!(fixture.ctx.mesh_count(), 2);
        assert_eq!(first.parts().len(), 2);
        assert_eq!(fixture.materials.keys(), vec!["default".to_string(), "ship/paint".to_string()]);
        assert_eq!(fixture.meshes.keys(), vec!["ship/0/hull".to_string(), "ship/1/rotor".to_string()]);
        assert_eq!(first.parts()[0].material.name(), "paint");
    }

    #[test]
    fn test_unknown_material_fails_without_caching() {
        let manager = ModelManager::new(Arc::new(FixedLoader {
            asset: ModelAsset {
                meshes: vec![triangle("hull", Some("paint")), triangle("rotor", Some("missing"))],
                materials: vec![descriptor("paint")],
            },
            calls: Arc::new(AtomicUsize::new(0)),
        }));
        let mut fixture = Fixture::new();

        let result = fixture.load(&manager, "ship", Path::new("ship.obj"));
        assert!(matches!(
            result,
            Err(AssetError::MissingMaterial { ref material, .. }) if material == "missing"
        ));
        assert!(!manager.contains("ship"));
        assert!(fixture.materials.is_empty());
        assert!(fixture.meshes.is_empty());
        assert_eq!(fixture.ctx.mesh_count(), 0);
    }

    #[test]
    fn test_missing_texture_leaves_managers_untouched() {
        let mut rust = descriptor("rust");
        rust.color_texture = Some(PathBuf::from("rust.png"));
        let manager = ModelManager::new(Arc::new(FixedLoader {
            asset: ModelAsset {
                meshes: vec![triangle("hull", Some("paint")), triangle("keel", Some("rust"))],
                materials: vec![descriptor("paint"), rust],
            },
            calls: Arc::new(AtomicUsize::new(0)),
        }));
        let dir = tempfile::tempdir().unwrap();
        let mut fixture = Fixture::new();

        let result = fixture.load(&manager, "ship", &dir.path().join("ship.obj"));
        assert!(matches!(result, Err(AssetError::NotFound(ref path)) if path.ends_with("rust.png")));
        assert!(fixture.materials.is_empty());
        assert!(fixture.meshes.is_empty());
        assert!(fixture.textures.is_empty());
        assert_eq!(fixture.ctx.buffer_count(), 0);
    }

    #[test]
    fn test_unnamed_group_and_material_named_default_stay_distinct() {
        let obj = ObjModelLoader::parse(
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
             f 1 2 3\n\
             usemtl default\n\
             f 1 2 3 4\n",
        )
        .unwrap();
        let mut painted = descriptor("default");
        painted.params.shininess = 8.0;
        let manager = ModelManager::new(Arc::new(FixedLoader {
            asset: ModelAsset {
                meshes: obj.meshes,
                materials: vec![painted],
            },
            calls: Arc::new(AtomicUsize::new(0)),
        }));
        let mut fixture = Fixture::new();

        let model = fixture.load(&manager, "crate", Path::new("crate.obj")).unwrap();
        let index_counts: Vec<u32> = model.parts().iter().map(|part| part.mesh.index_count()).collect();
        assert_eq!(index_counts, vec![3, 6]);
        assert_eq!(fixture.ctx.mesh_count(), 2);
        assert_eq!(fixture.materials.keys(), vec!["crate/default".to_string(), "default".to_string()]);
        assert!(!Arc::ptr_eq(&model.parts()[0].material, &model.parts()[1].material));
        assert_eq!(model.parts()[1].material.params().shininess, 8.0);
    }

    #[test]
    fn test_textures_resolve_relative_to_model() {
        let dir = tempfile::tempdir().unwrap();
        RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]))
            .save(dir.path().join("hull.png"))
            .unwrap();

        let mut paint = descriptor("paint");
        paint.color_texture = Some(PathBuf::from("hull.png"));
        let manager = ModelManager::new(Arc::new(FixedLoader {
            asset: ModelAsset {
                meshes: vec![triangle("hull", Some("paint"))],
                materials: vec![paint],
            },
            calls: Arc::new(AtomicUsize::new(0)),
        }));
        let mut fixture = Fixture::new();

        let model = fixture.load(&manager, "ship", &dir.path().join("ship.obj")).unwrap();
        let texture = model.parts()[0].color_texture.as_ref().unwrap();
        assert_eq!(texture.key(), dir.path().join("hull.png").to_string_lossy());
        assert!(fixture.textures.contains(&dir.path().join("hull.png").to_string_lossy()));
    }

    #[test]
    fn test_two_sided_part_draws_without_culling() {
        let mut glass = descriptor("glass");
        glass.params.two_sided = true;
        let manager = ModelManager::new(Arc::new(FixedLoader {
            asset: ModelAsset {
                meshes: vec![triangle("window", Some("glass")), triangle("hull", None)],
                materials: vec![glass],
            },
            calls: Arc::new(AtomicUsize::new(0)),
        }));
        let mut fixture = Fixture::new();
        let model = fixture.load(&manager, "ship", Path::new("ship.obj")).unwrap();

        let raster = RasterState::default();
        raster.apply(&mut fixture.ctx);
        model.render(&mut fixture.ctx, &raster).unwrap();

        let draws = fixture.ctx.draw_calls();
        assert_eq!(draws.len(), 2);
        assert!(!draws[0].cull_face);
        assert!(draws[1].cull_face);
        assert!(fixture.ctx.is_enabled(Capability::CullFace));
    }
}
