//! Material parameter blocks
//!
//! A `Material` packs its shading parameters into a uniform buffer laid out
//! exactly as the program's `MaterialInfo` block reports. The layout is
//! introspected and validated when the material is created, so a shader whose
//! block disagrees with the expected field set fails loudly instead of
//! corrupting the shading of every material sharing the program.
//!
//! Expected GLSL declaration (std140):
//!
//! ```glsl
//! layout (std140) uniform MaterialInfo {
//!     vec4  ambientColor;
//!     vec4  diffuseColor;
//!     vec4  specularColor;
//!     vec4  emissiveColor;
//!     float shininess;
//!     float shininessStrength;
//!     bool  hasTexture;
//!     bool  twoSided;
//! };
//! ```

use thiserror::Error;

use crate::foundation::math::Vec4;
use crate::render::gpu::{
    BlockMember, BlockMemberType, BufferHandle, GpuContext, GpuError, GpuResult, ProgramHandle,
    UniformBlockInfo,
};

/// Name of the uniform block materials write into
pub const MATERIAL_BLOCK: &str = "MaterialInfo";

/// Block members in declaration order
const FIELDS: [(&str, BlockMemberType); 8] = [
    ("ambientColor", BlockMemberType::Vec4),
    ("diffuseColor", BlockMemberType::Vec4),
    ("specularColor", BlockMemberType::Vec4),
    ("emissiveColor", BlockMemberType::Vec4),
    ("shininess", BlockMemberType::Float),
    ("shininessStrength", BlockMemberType::Float),
    ("hasTexture", BlockMemberType::Bool),
    ("twoSided", BlockMemberType::Bool),
];

/// Material errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MaterialError {
    /// The program declares no material block
    #[error("Program {program:?} has no uniform block named '{block}'")]
    MissingBlock {
        /// Expected block name
        block: &'static str,
        /// Program that was introspected
        program: ProgramHandle,
    },

    /// The block exists but its layout is not the one materials write
    #[error("Uniform block '{block}' layout mismatch: {reason}")]
    LayoutMismatch {
        /// Block name
        block: &'static str,
        /// What disagreed
        reason: String,
    },

    /// Buffer creation or upload failed
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
}

/// Shading parameters of a material
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialParams {
    /// Material name, unique within its material set
    pub name: String,
    /// Ambient reflectance (RGBA)
    pub ambient_color: Vec4,
    /// Diffuse reflectance (RGBA)
    pub diffuse_color: Vec4,
    /// Specular reflectance (RGBA)
    pub specular_color: Vec4,
    /// Emitted color (RGBA)
    pub emissive_color: Vec4,
    /// Specular exponent
    pub shininess: f32,
    /// Specular multiplier
    pub shininess_strength: f32,
    /// Whether the color texture unit should be sampled
    pub has_texture: bool,
    /// Shade both faces (no back-face culling)
    pub two_sided: bool,
}

impl MaterialParams {
    /// Create parameters with default colors
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            name: String::new(),
            ambient_color: Vec4::new(0.1, 0.1, 0.1, 1.0),
            diffuse_color: Vec4::new(0.8, 0.8, 0.8, 1.0),
            specular_color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            emissive_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            shininess: 32.0,
            shininess_strength: 1.0,
            has_texture: false,
            two_sided: false,
        }
    }
}

/// Canonical std140 layout of the material block
///
/// vec4 members align to 16 bytes, scalars to 4; the block size is rounded
/// up to 16.
pub fn std140_layout(binding: u32) -> UniformBlockInfo {
    let mut cursor = 0;
    let members = FIELDS
        .iter()
        .map(|&(name, ty)| {
            let offset = align_up(cursor, ty.std140_alignment());
            cursor = offset + ty.size();
            BlockMember {
                name: name.to_string(),
                ty,
                offset,
            }
        })
        .collect();

    UniformBlockInfo {
        name: MATERIAL_BLOCK.to_string(),
        binding,
        size: align_up(cursor, 16),
        members,
    }
}

const fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) / alignment * alignment
}

/// GPU-resident material
#[derive(Debug)]
pub struct Material {
    params: MaterialParams,
    program: ProgramHandle,
    layout: UniformBlockInfo,
    buffer: BufferHandle,
}

impl Material {
    /// Create a material and upload its parameter block
    ///
    /// Fails with [`MaterialError::MissingBlock`] or
    /// [`MaterialError::LayoutMismatch`] when the program's block cannot hold
    /// these parameters.
    pub fn new<C: GpuContext + ?Sized>(
        context: &mut C,
        program: ProgramHandle,
        params: MaterialParams,
    ) -> Result<Self, MaterialError> {
        let layout = Self::introspect(context, program)?;
        let bytes = Self::fill_buffer(&params, &layout);
        let buffer = context.create_uniform_buffer(&bytes)?;

        log::debug!(
            "Created material '{}' ({} byte block, binding {})",
            params.name,
            layout.size,
            layout.binding
        );

        Ok(Self {
            params,
            program,
            layout,
            buffer,
        })
    }

    /// Attach the parameter block to the program's binding point
    pub fn bind<C: GpuContext + ?Sized>(&self, context: &mut C) -> GpuResult<()> {
        context.bind_uniform_buffer(self.layout.binding, self.buffer)
    }

    /// Re-pack the parameters for another program and upload them
    pub fn rebind<C: GpuContext + ?Sized>(
        &mut self,
        context: &mut C,
        program: ProgramHandle,
    ) -> Result<(), MaterialError> {
        let layout = Self::introspect(context, program)?;
        let bytes = Self::fill_buffer(&self.params, &layout);
        context.update_uniform_buffer(self.buffer, &bytes)?;
        self.program = program;
        self.layout = layout;
        log::debug!("Rebound material '{}' to program {:?}", self.params.name, program);
        Ok(())
    }

    fn introspect<C: GpuContext + ?Sized>(
        context: &C,
        program: ProgramHandle,
    ) -> Result<UniformBlockInfo, MaterialError> {
        let layout = context
            .uniform_block(program, MATERIAL_BLOCK)
            .ok_or(MaterialError::MissingBlock {
                block: MATERIAL_BLOCK,
                program,
            })?;
        validate_layout(&layout)?;
        Ok(layout)
    }

    /// Pack parameters at the offsets of `layout`
    fn fill_buffer(params: &MaterialParams, layout: &UniformBlockInfo) -> Vec<u8> {
        let mut buffer = vec![0u8; layout.size];

        for member in &layout.members {
            let offset = member.offset;
            match member.name.as_str() {
                "ambientColor" => write_vec4(&mut buffer, offset, &params.ambient_color),
                "diffuseColor" => write_vec4(&mut buffer, offset, &params.diffuse_color),
                "specularColor" => write_vec4(&mut buffer, offset, &params.specular_color),
                "emissiveColor" => write_vec4(&mut buffer, offset, &params.emissive_color),
                "shininess" => write_bytes(&mut buffer, offset, bytemuck::bytes_of(&params.shininess)),
                "shininessStrength" => {
                    write_bytes(&mut buffer, offset, bytemuck::bytes_of(&params.shininess_strength));
                }
                "hasTexture" => write_bytes(&mut buffer, offset, bytemuck::bytes_of(&i32::from(params.has_texture))),
                "twoSided" => write_bytes(&mut buffer, offset, bytemuck::bytes_of(&i32::from(params.two_sided))),
                _ => {}
            }
        }

        buffer
    }

    /// Material name
    pub fn name(&self) -> &str {
        &self.params.name
    }

    /// Rename the material (the name is not part of the GPU block)
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.params.name = name.into();
    }

    /// Shading parameters
    pub fn params(&self) -> &MaterialParams {
        &self.params
    }

    /// Whether the color texture is sampled
    pub fn has_texture(&self) -> bool {
        self.params.has_texture
    }

    /// Whether both faces are shaded
    pub fn is_two_sided(&self) -> bool {
        self.params.two_sided
    }

    /// Program the block was packed for
    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    /// Layout the block was packed with
    pub fn layout(&self) -> &UniformBlockInfo {
        &self.layout
    }

    /// Uniform buffer holding the block
    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }
}

fn write_vec4(buffer: &mut [u8], offset: usize, value: &Vec4) {
    let components: [f32; 4] = (*value).into();
    write_bytes(buffer, offset, bytemuck::cast_slice(&components));
}

fn write_bytes(buffer: &mut [u8], offset: usize, bytes: &[u8]) {
    buffer[offset..offset + bytes.len()].copy_from_slice(bytes);
}

/// Check that an introspected block can hold exactly the material fields
fn validate_layout(layout: &UniformBlockInfo) -> Result<(), MaterialError> {
    let mismatch = |reason: String| MaterialError::LayoutMismatch {
        block: MATERIAL_BLOCK,
        reason,
    };

    if layout.members.len() != FIELDS.len() {
        return Err(mismatch(format!(
            "expected {} members, found {}",
            FIELDS.len(),
            layout.members.len()
        )));
    }

    for (name, ty) in FIELDS {
        let member = layout
            .member(name)
            .ok_or_else(|| mismatch(format!("missing member '{name}'")))?;
        if member.ty != ty {
            return Err(mismatch(format!(
                "member '{name}' is {:?}, expected {ty:?}",
                member.ty
            )));
        }
        if member.offset % ty.std140_alignment() != 0 {
            return Err(mismatch(format!(
                "member '{name}' at offset {} is not {}-byte aligned",
                member.offset,
                ty.std140_alignment()
            )));
        }
        if member.offset + ty.size() > layout.size {
            return Err(mismatch(format!(
                "member '{name}' at offset {} overruns the {} byte block",
                member.offset, layout.size
            )));
        }
    }

    let mut spans: Vec<(usize, usize, &str)> = layout
        .members
        .iter()
        .map(|m| (m.offset, m.offset + m.ty.size(), m.name.as_str()))
        .collect();
    spans.sort_unstable();
    for pair in spans.windows(2) {
        if pair[0].1 > pair[1].0 {
            return Err(mismatch(format!(
                "members '{}' and '{}' overlap",
                pair[0].2, pair[1].2
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::gpu::HeadlessContext;

    fn read_f32(bytes: &[u8], offset: usize) -> f32 {
        bytemuck::pod_read_unaligned(&bytes[offset..offset + 4])
    }

    fn read_i32(bytes: &[u8], offset: usize) -> i32 {
        bytemuck::pod_read_unaligned(&bytes[offset..offset + 4])
    }

    fn sample_params() -> MaterialParams {
        MaterialParams {
            name: "hull".to_string(),
            ambient_color: Vec4::new(0.1, 0.2, 0.3, 1.0),
            diffuse_color: Vec4::new(0.4, 0.5, 0.6, 1.0),
            specular_color: Vec4::new(0.7, 0.8, 0.9, 1.0),
            emissive_color: Vec4::new(0.0, 0.0, 0.1, 1.0),
            shininess: 50.0,
            shininess_strength: 0.5,
            has_texture: true,
            two_sided: false,
        }
    }

    #[test]
    fn test_std140_offsets() {
        let layout = std140_layout(0);
        let offsets: Vec<usize> = layout.members.iter().map(|m| m.offset).collect();
        assert_eq!(offsets, vec![0, 16, 32, 48, 64, 68, 72, 76]);
        assert_eq!(layout.size, 80);
    }

    #[test]
    fn test_fill_buffer_writes_fields_at_offsets() {
        let mut ctx = HeadlessContext::new();
        let program = ctx.create_program("v", "f").unwrap();
        let material = Material::new(&mut ctx, program, sample_params()).unwrap();

        let bytes = ctx.buffer_data(material.buffer()).unwrap();
        assert_eq!(bytes.len(), 80);
        assert_eq!(read_f32(bytes, 16), 0.4);
        assert_eq!(read_f32(bytes, 44), 1.0);
        assert_eq!(read_f32(bytes, 56), 0.1);
        assert_eq!(read_f32(bytes, 64), 50.0);
        assert_eq!(read_f32(bytes, 68), 0.5);
        assert_eq!(read_i32(bytes, 72), 1);
        assert_eq!(read_i32(bytes, 76), 0);
    }

    #[test]
    fn test_packing_follows_introspected_layout() {
        // A driver reporting a padded layout: scalars pushed to vec4 slots
        let mut layout = std140_layout(3);
        for (i, member) in layout.members.iter_mut().enumerate().skip(4) {
            member.offset = 64 + (i - 4) * 16;
        }
        layout.size = 128;

        let mut ctx = HeadlessContext::new().with_uniform_block(layout);
        let program = ctx.create_program("v", "f").unwrap();
        let material = Material::new(&mut ctx, program, sample_params()).unwrap();

        let bytes = ctx.buffer_data(material.buffer()).unwrap();
        assert_eq!(bytes.len(), 128);
        assert_eq!(read_f32(bytes, 80), 0.5);
        assert_eq!(read_i32(bytes, 96), 1);

        material.bind(&mut ctx).unwrap();
        assert_eq!(ctx.bound_uniform_buffer(3), Some(material.buffer()));
    }

    #[test]
    fn test_missing_block_is_rejected() {
        let mut ctx = HeadlessContext::new().without_uniform_block(MATERIAL_BLOCK);
        let program = ctx.create_program("v", "f").unwrap();
        let result = Material::new(&mut ctx, program, sample_params());
        assert!(matches!(result, Err(MaterialError::MissingBlock { .. })));
        assert_eq!(ctx.buffer_count(), 0);
    }

    #[test]
    fn test_missing_member_is_rejected() {
        let mut layout = std140_layout(0);
        layout.members.retain(|m| m.name != "twoSided");
        let mut ctx = HeadlessContext::new().with_uniform_block(layout);
        let program = ctx.create_program("v", "f").unwrap();
        assert!(matches!(
            Material::new(&mut ctx, program, sample_params()),
            Err(MaterialError::LayoutMismatch { .. })
        ));
    }

    #[test]
    fn test_misaligned_vec4_is_rejected() {
        let mut layout = std140_layout(0);
        layout.members[1].offset = 20;
        let mut ctx = HeadlessContext::new().with_uniform_block(layout);
        let program = ctx.create_program("v", "f").unwrap();
        let err = Material::new(&mut ctx, program, sample_params()).unwrap_err();
        assert!(err.to_string().contains("diffuseColor"));
    }

    #[test]
    fn test_overlapping_members_are_rejected() {
        let mut layout = std140_layout(0);
        layout.members[5].offset = 64;
        let mut ctx = HeadlessContext::new().with_uniform_block(layout);
        let program = ctx.create_program("v", "f").unwrap();
        assert!(matches!(
            Material::new(&mut ctx, program, sample_params()),
            Err(MaterialError::LayoutMismatch { .. })
        ));
    }

    #[test]
    fn test_rebind_reuploads_same_buffer() {
        let mut ctx = HeadlessContext::new();
        let first = ctx.create_program("v", "f").unwrap();
        let second = ctx.create_program("v2", "f2").unwrap();
        let mut material = Material::new(&mut ctx, first, sample_params()).unwrap();
        let buffer = material.buffer();

        material.rebind(&mut ctx, second).unwrap();
        assert_eq!(material.program(), second);
        assert_eq!(material.buffer(), buffer);
        assert_eq!(ctx.buffer_uploads(buffer), 2);
    }

    #[test]
    fn test_rename_keeps_block() {
        let mut ctx = HeadlessContext::new();
        let program = ctx.create_program("v", "f").unwrap();
        let mut material = Material::new(&mut ctx, program, sample_params()).unwrap();
        material.set_name("rotor");
        assert_eq!(material.name(), "rotor");
        assert_eq!(ctx.buffer_uploads(material.buffer()), 1);
    }
}
