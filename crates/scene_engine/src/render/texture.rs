//! GPU textures

use image::RgbaImage;

use crate::render::gpu::{GpuContext, GpuResult, TextureDescriptor, TextureFormat, TextureHandle};

/// Fixed texture units the program samples from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureUnit {
    /// Base color, sampled through `texColor`
    Color,
    /// Tangent-space normals, sampled through `texNormal`
    Normal,
}

impl TextureUnit {
    /// Unit index
    pub const fn index(self) -> u32 {
        match self {
            Self::Color => 0,
            Self::Normal => 1,
        }
    }

    /// Sampler uniform bound to this unit
    pub const fn sampler_name(self) -> &'static str {
        match self {
            Self::Color => "texColor",
            Self::Normal => "texNormal",
        }
    }
}

/// GPU-resident texture
#[derive(Debug)]
pub struct Texture {
    key: String,
    handle: TextureHandle,
    width: u32,
    height: u32,
}

impl Texture {
    /// Upload an RGBA8 image with a full mip chain
    pub fn upload<C: GpuContext + ?Sized>(context: &mut C, key: impl Into<String>, image: &RgbaImage) -> GpuResult<Self> {
        let (width, height) = image.dimensions();
        let descriptor = TextureDescriptor {
            width,
            height,
            format: TextureFormat::Rgba8,
            generate_mipmaps: true,
        };
        let handle = context.create_texture(&descriptor, image.as_raw())?;
        let key = key.into();
        log::debug!("Uploaded texture '{}' ({}x{})", key, width, height);
        Ok(Self {
            key,
            handle,
            width,
            height,
        })
    }

    /// Bind to a texture unit
    pub fn bind<C: GpuContext + ?Sized>(&self, context: &mut C, unit: TextureUnit) -> GpuResult<()> {
        context.bind_texture(unit.index(), self.handle)
    }

    /// Cache key the texture was loaded under
    pub fn key(&self) -> &str {
        &self.key
    }

    /// GPU handle
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    /// Size in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
