//! Rendering primitives
//!
//! Everything the scene hands to the GPU: the context abstraction, camera,
//! light, materials, meshes, textures and rasterizer state.

pub mod camera;
pub mod gpu;
pub mod light;
pub mod material;
pub mod mesh;
pub mod state;
pub mod texture;

pub use camera::{Camera, CameraTranslation, Projection};
pub use gpu::{GpuContext, GpuError, GpuResult, HeadlessContext};
pub use light::{Attenuation, Light, LightBlock, LightKind, LightUniformData};
pub use material::{Material, MaterialError, MaterialParams};
pub use mesh::{Mesh, MeshData, Vertex};
pub use state::RasterState;
pub use texture::{Texture, TextureUnit};
