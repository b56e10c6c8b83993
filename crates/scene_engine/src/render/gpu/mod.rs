//! GPU context abstraction
//!
//! `GpuContext` is the function table the scene drives: state toggles,
//! program/uniform management, uniform buffers, textures, mesh buffers and
//! draw calls. It mirrors the subset of a GL 4.3 core profile the renderer
//! needs. Handles are opaque `u64` newtypes owned by the context.

pub mod headless;

pub use headless::HeadlessContext;

use bitflags::bitflags;
use std::fmt;
use thiserror::Error;

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::render::mesh::Vertex;

/// Result type for context operations
pub type GpuResult<T> = Result<T, GpuError>;

/// Errors reported by a GPU context
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// Shader compilation or program linking failed
    #[error("Failed to build program from '{vertex}' and '{fragment}': {reason}")]
    ProgramLink {
        /// Vertex stage source name
        vertex: String,
        /// Fragment stage source name
        fragment: String,
        /// Driver message
        reason: String,
    },

    /// A handle does not refer to a live resource
    #[error("Unknown {kind} handle {id}")]
    UnknownHandle {
        /// Resource kind
        kind: &'static str,
        /// Raw handle value
        id: u64,
    },

    /// Resource creation was rejected
    #[error("Resource creation failed: {0}")]
    ResourceCreation(String),
}

/// Context version (major.minor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlVersion {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
}

impl GlVersion {
    /// Lowest version the shaders target: uniform buffers, subroutines and
    /// programmable clip planes are all core here
    pub const MINIMUM: GlVersion = GlVersion::new(4, 3);

    /// Create a version
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for GlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u64);

/// Handle to a uniform buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Handle to a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to uploaded vertex + index buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

bitflags! {
    /// Framebuffer attachments to clear
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearBuffers: u32 {
        /// Color attachment
        const COLOR = 0b0001;
        /// Depth attachment
        const DEPTH = 0b0010;
        /// Stencil attachment
        const STENCIL = 0b0100;
    }
}

/// Toggleable fixed-function capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Depth testing
    DepthTest,
    /// Face culling
    CullFace,
    /// Multisample rasterization
    Multisample,
}

/// Depth comparison function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthFunc {
    /// Pass if incoming depth is less
    Less,
    /// Pass if incoming depth is less or equal
    LessEqual,
    /// Always pass
    Always,
}

/// Polygon rasterization mode (front and back faces)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolygonMode {
    /// Filled triangles
    #[default]
    Fill,
    /// Triangle edges only
    Line,
    /// Vertices only
    Point,
}

/// Programmable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
}

/// Value assignable to a plain (non-block) uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Signed integer (also used for sampler units)
    Int(i32),
    /// Float scalar
    Float(f32),
    /// 3-component vector
    Vec3(Vec3),
    /// 4-component vector
    Vec4(Vec4),
    /// 4x4 matrix
    Mat4(Mat4),
}

/// Type of a member inside a uniform block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockMemberType {
    /// `float`
    Float,
    /// `int`
    Int,
    /// `bool` (stored as 32-bit int)
    Bool,
    /// `vec4`
    Vec4,
}

impl BlockMemberType {
    /// Size in bytes inside a std140 block
    pub const fn size(self) -> usize {
        match self {
            Self::Float | Self::Int | Self::Bool => 4,
            Self::Vec4 => 16,
        }
    }

    /// Base alignment under std140 rules
    pub const fn std140_alignment(self) -> usize {
        match self {
            Self::Float | Self::Int | Self::Bool => 4,
            Self::Vec4 => 16,
        }
    }
}

/// One member of an introspected uniform block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMember {
    /// Member name as declared in the block
    pub name: String,
    /// Member type
    pub ty: BlockMemberType,
    /// Byte offset from the start of the block
    pub offset: usize,
}

/// Introspected uniform block layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlockInfo {
    /// Block name
    pub name: String,
    /// Binding point the block reads from
    pub binding: u32,
    /// Total size in bytes
    pub size: usize,
    /// Active members
    pub members: Vec<BlockMember>,
}

impl UniformBlockInfo {
    /// Find a member by name
    pub fn member(&self, name: &str) -> Option<&BlockMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Pixel format of uploaded texture data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA
    Rgba8,
}

/// Texture upload description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: TextureFormat,
    /// Generate a mip chain after upload
    pub generate_mipmaps: bool,
}

/// GPU function table driven by the scene
///
/// Implementations wrap a live graphics context. Calls are made from a single
/// thread, between `make current` and `swap` of the owning window.
pub trait GpuContext {
    /// Version of the context
    fn version(&self) -> GlVersion;

    /// Set the color used by `clear`
    fn clear_color(&mut self, color: [f32; 4]);

    /// Clear framebuffer attachments
    fn clear(&mut self, buffers: ClearBuffers);

    /// Enable or disable a capability
    fn set_capability(&mut self, capability: Capability, enabled: bool);

    /// Set the depth comparison function
    fn depth_func(&mut self, func: DepthFunc);

    /// Set polygon rasterization mode for both faces
    fn polygon_mode(&mut self, mode: PolygonMode);

    /// Set the viewport rectangle
    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);

    /// Compile and link a program from named vertex and fragment sources
    fn create_program(&mut self, vertex: &str, fragment: &str) -> GpuResult<ProgramHandle>;

    /// Make a program current
    fn use_program(&mut self, program: ProgramHandle) -> GpuResult<()>;

    /// Assign a plain uniform by name (unknown names are ignored, as GL does)
    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformValue) -> GpuResult<()>;

    /// Index of a subroutine function in a stage, if present
    fn subroutine_index(&self, program: ProgramHandle, stage: ShaderStage, name: &str) -> Option<u32>;

    /// Select active subroutines for a stage of the current program
    fn select_subroutines(&mut self, stage: ShaderStage, indices: &[u32]);

    /// Introspect a uniform block of a program
    fn uniform_block(&self, program: ProgramHandle, name: &str) -> Option<UniformBlockInfo>;

    /// Create a uniform buffer initialised with `data`
    fn create_uniform_buffer(&mut self, data: &[u8]) -> GpuResult<BufferHandle>;

    /// Replace the contents of a uniform buffer
    fn update_uniform_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> GpuResult<()>;

    /// Attach a uniform buffer to a binding point
    fn bind_uniform_buffer(&mut self, binding: u32, buffer: BufferHandle) -> GpuResult<()>;

    /// Upload a texture
    fn create_texture(&mut self, descriptor: &TextureDescriptor, pixels: &[u8]) -> GpuResult<TextureHandle>;

    /// Bind a texture to a texture unit
    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) -> GpuResult<()>;

    /// Upload vertex and index data
    fn create_mesh(&mut self, vertices: &[Vertex], indices: &[u32]) -> GpuResult<MeshHandle>;

    /// Draw `index_count` indices of a mesh as triangles
    fn draw_indexed(&mut self, mesh: MeshHandle, index_count: u32) -> GpuResult<()>;
}
