//! Texture manager
//!
//! Decodes images with the `image` crate, converts them to RGBA8 and uploads
//! them once per key.

use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;

use crate::assets::{AssetError, ResourceCache};
use crate::render::{GpuContext, Texture};

/// Owns uploaded textures by key (file path for file-backed textures)
#[derive(Debug, Default)]
pub struct TextureManager {
    textures: ResourceCache<Texture>,
}

impl TextureManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an image file and upload it, keyed by its path
    pub fn load_texture<C: GpuContext + ?Sized>(
        &self,
        context: &mut C,
        path: impl AsRef<Path>,
    ) -> Result<Arc<Texture>, AssetError> {
        let path = path.as_ref();
        let key = path.to_string_lossy();

        self.textures.get_or_try_insert(&key, || {
            if !path.is_file() {
                return Err(AssetError::NotFound(path.to_path_buf()));
            }
            let image = image::open(path)?.to_rgba8();
            log::info!("Loaded image {}x{} from {:?}", image.width(), image.height(), path);
            Ok(Texture::upload(context, &*key, &image)?)
        })
    }

    /// Upload an in-memory image under `key`
    pub fn load_texture_from_image<C: GpuContext + ?Sized>(
        &self,
        context: &mut C,
        key: &str,
        image: &RgbaImage,
    ) -> Result<Arc<Texture>, AssetError> {
        self.textures
            .get_or_try_insert(key, || Ok(Texture::upload(context, key, image)?))
    }

    /// Look up a texture
    pub fn get(&self, key: &str) -> Option<Arc<Texture>> {
        self.textures.get(key)
    }

    /// Whether `key` has been loaded
    pub fn contains(&self, key: &str) -> bool {
        self.textures.contains(key)
    }

    /// Number of textures
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Whether no texture is loaded
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Keys of every loaded texture
    pub fn keys(&self) -> Vec<String> {
        self.textures.keys()
    }
}
