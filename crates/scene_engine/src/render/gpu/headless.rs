//! Headless GPU context
//!
//! A `GpuContext` that keeps every resource in CPU memory and records the
//! state a real driver would hold. Used by the viewer's offscreen mode and as
//! the context double in tests: everything the scene does to the GPU can be
//! inspected afterwards.

use slotmap::{new_key_type, Key, KeyData, SlotMap};
use std::collections::{HashMap, HashSet};

use super::{
    BufferHandle, Capability, ClearBuffers, DepthFunc, GlVersion, GpuContext, GpuError, GpuResult,
    MeshHandle, PolygonMode, ProgramHandle, ShaderStage, TextureDescriptor, TextureHandle,
    UniformBlockInfo, UniformValue,
};
use crate::render::light::LightUniformData;
use crate::render::material;
use crate::render::mesh::Vertex;

new_key_type! {
    struct ProgramKey;
    struct BufferKey;
    struct TextureKey;
    struct MeshKey;
}

fn to_raw<K: Key>(key: K) -> u64 {
    key.data().as_ffi()
}

fn from_raw<K: From<KeyData>>(raw: u64) -> K {
    K::from(KeyData::from_ffi(raw))
}

/// Binding point of the material block in the default program layout
pub const DEFAULT_MATERIAL_BINDING: u32 = 0;

/// Binding point of the light block in the default program layout
pub const DEFAULT_LIGHT_BINDING: u32 = 1;

#[derive(Debug)]
struct ProgramRecord {
    vertex: String,
    fragment: String,
    uniforms: HashMap<String, UniformValue>,
}

#[derive(Debug)]
struct BufferRecord {
    data: Vec<u8>,
    uploads: usize,
}

#[derive(Debug)]
struct TextureRecord {
    descriptor: TextureDescriptor,
    byte_len: usize,
}

#[derive(Debug)]
struct MeshRecord {
    vertex_count: usize,
    index_count: usize,
}

/// One recorded draw call with the state it was issued under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    /// Mesh drawn
    pub mesh: MeshHandle,
    /// Number of indices
    pub index_count: u32,
    /// Program current at draw time
    pub program: Option<ProgramHandle>,
    /// Polygon mode at draw time
    pub polygon_mode: PolygonMode,
    /// Whether face culling was enabled at draw time
    pub cull_face: bool,
}

/// CPU-only implementation of [`GpuContext`]
#[derive(Debug)]
pub struct HeadlessContext {
    version: GlVersion,
    blocks: Vec<UniformBlockInfo>,
    fragment_subroutines: Vec<String>,
    link_error: Option<String>,

    programs: SlotMap<ProgramKey, ProgramRecord>,
    buffers: SlotMap<BufferKey, BufferRecord>,
    textures: SlotMap<TextureKey, TextureRecord>,
    meshes: SlotMap<MeshKey, MeshRecord>,

    clear_color: [f32; 4],
    clears: Vec<ClearBuffers>,
    capabilities: HashSet<Capability>,
    depth_func: DepthFunc,
    polygon_mode: PolygonMode,
    viewport: (i32, i32, u32, u32),
    current_program: Option<ProgramHandle>,
    subroutines: HashMap<ShaderStage, Vec<u32>>,
    uniform_bindings: HashMap<u32, BufferHandle>,
    texture_units: HashMap<u32, TextureHandle>,
    draw_calls: Vec<DrawCall>,
}

impl Default for HeadlessContext {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessContext {
    /// Create a 4.3 context whose programs expose the standard material and
    /// light blocks and the three lighting subroutines
    pub fn new() -> Self {
        Self {
            version: GlVersion::MINIMUM,
            blocks: vec![
                material::std140_layout(DEFAULT_MATERIAL_BINDING),
                LightUniformData::block_info(DEFAULT_LIGHT_BINDING),
            ],
            fragment_subroutines: vec![
                "phongModel".to_string(),
                "blinnPhongModel".to_string(),
                "rimLightModel".to_string(),
            ],
            link_error: None,
            programs: SlotMap::with_key(),
            buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
            clear_color: [0.0; 4],
            clears: Vec::new(),
            capabilities: HashSet::new(),
            depth_func: DepthFunc::Less,
            polygon_mode: PolygonMode::Fill,
            viewport: (0, 0, 0, 0),
            current_program: None,
            subroutines: HashMap::new(),
            uniform_bindings: HashMap::new(),
            texture_units: HashMap::new(),
            draw_calls: Vec::new(),
        }
    }

    /// Report a different context version
    pub fn with_version(mut self, major: u32, minor: u32) -> Self {
        self.version = GlVersion::new(major, minor);
        self
    }

    /// Add or replace a uniform block exposed by every program
    pub fn with_uniform_block(mut self, block: UniformBlockInfo) -> Self {
        self.blocks.retain(|b| b.name != block.name);
        self.blocks.push(block);
        self
    }

    /// Remove a uniform block from the program layout
    pub fn without_uniform_block(mut self, name: &str) -> Self {
        self.blocks.retain(|b| b.name != name);
        self
    }

    /// Replace the fragment subroutine names, indexed in order
    pub fn with_fragment_subroutines<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fragment_subroutines = names.into_iter().map(Into::into).collect();
        self
    }

    /// Make every program link fail with `reason`
    pub fn with_link_error(mut self, reason: impl Into<String>) -> Self {
        self.link_error = Some(reason.into());
        self
    }

    // ========================================================================
    // INSPECTION
    // ========================================================================

    /// Current clear color
    pub fn current_clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Every clear issued, in order
    pub fn clears(&self) -> &[ClearBuffers] {
        &self.clears
    }

    /// Whether a capability is enabled
    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Current depth function
    pub fn current_depth_func(&self) -> DepthFunc {
        self.depth_func
    }

    /// Current polygon mode
    pub fn current_polygon_mode(&self) -> PolygonMode {
        self.polygon_mode
    }

    /// Current viewport `(x, y, width, height)`
    pub fn current_viewport(&self) -> (i32, i32, u32, u32) {
        self.viewport
    }

    /// Program made current last
    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program
    }

    /// Source names a program was built from
    pub fn program_sources(&self, program: ProgramHandle) -> Option<(&str, &str)> {
        self.programs
            .get(from_raw::<ProgramKey>(program.0))
            .map(|p| (p.vertex.as_str(), p.fragment.as_str()))
    }

    /// Last value assigned to a uniform
    pub fn uniform(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        self.programs
            .get(from_raw::<ProgramKey>(program.0))
            .and_then(|p| p.uniforms.get(name).copied())
    }

    /// Subroutine selection for a stage
    pub fn selected_subroutines(&self, stage: ShaderStage) -> &[u32] {
        self.subroutines.get(&stage).map_or(&[], Vec::as_slice)
    }

    /// Buffer attached to a uniform binding point
    pub fn bound_uniform_buffer(&self, binding: u32) -> Option<BufferHandle> {
        self.uniform_bindings.get(&binding).copied()
    }

    /// Contents of a uniform buffer
    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers
            .get(from_raw::<BufferKey>(buffer.0))
            .map(|b| b.data.as_slice())
    }

    /// Number of times a buffer was written (creation included)
    pub fn buffer_uploads(&self, buffer: BufferHandle) -> usize {
        self.buffers
            .get(from_raw::<BufferKey>(buffer.0))
            .map_or(0, |b| b.uploads)
    }

    /// Texture bound to a unit
    pub fn bound_texture(&self, unit: u32) -> Option<TextureHandle> {
        self.texture_units.get(&unit).copied()
    }

    /// Upload description and byte size of a texture
    pub fn texture_info(&self, texture: TextureHandle) -> Option<(TextureDescriptor, usize)> {
        self.textures
            .get(from_raw::<TextureKey>(texture.0))
            .map(|t| (t.descriptor, t.byte_len))
    }

    /// Vertex and index count of an uploaded mesh
    pub fn mesh_info(&self, mesh: MeshHandle) -> Option<(usize, usize)> {
        self.meshes
            .get(from_raw::<MeshKey>(mesh.0))
            .map(|m| (m.vertex_count, m.index_count))
    }

    /// Number of linked programs
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Number of uniform buffers
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Number of uploaded textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Number of uploaded meshes
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Every draw call issued, in order
    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.draw_calls
    }

    fn check_buffer(&self, buffer: BufferHandle) -> GpuResult<BufferKey> {
        let key = from_raw::<BufferKey>(buffer.0);
        if self.buffers.contains_key(key) {
            Ok(key)
        } else {
            Err(GpuError::UnknownHandle { kind: "buffer", id: buffer.0 })
        }
    }
}

impl GpuContext for HeadlessContext {
    fn version(&self) -> GlVersion {
        self.version
    }

    fn clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    fn clear(&mut self, buffers: ClearBuffers) {
        self.clears.push(buffers);
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        if enabled {
            self.capabilities.insert(capability);
        } else {
            self.capabilities.remove(&capability);
        }
    }

    fn depth_func(&mut self, func: DepthFunc) {
        self.depth_func = func;
    }

    fn polygon_mode(&mut self, mode: PolygonMode) {
        self.polygon_mode = mode;
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport = (x, y, width, height);
    }

    fn create_program(&mut self, vertex: &str, fragment: &str) -> GpuResult<ProgramHandle> {
        if let Some(reason) = &self.link_error {
            return Err(GpuError::ProgramLink {
                vertex: vertex.to_string(),
                fragment: fragment.to_string(),
                reason: reason.clone(),
            });
        }
        let key = self.programs.insert(ProgramRecord {
            vertex: vertex.to_string(),
            fragment: fragment.to_string(),
            uniforms: HashMap::new(),
        });
        Ok(ProgramHandle(to_raw(key)))
    }

    fn use_program(&mut self, program: ProgramHandle) -> GpuResult<()> {
        if !self.programs.contains_key(from_raw::<ProgramKey>(program.0)) {
            return Err(GpuError::UnknownHandle { kind: "program", id: program.0 });
        }
        self.current_program = Some(program);
        Ok(())
    }

    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformValue) -> GpuResult<()> {
        let record = self
            .programs
            .get_mut(from_raw::<ProgramKey>(program.0))
            .ok_or(GpuError::UnknownHandle { kind: "program", id: program.0 })?;
        record.uniforms.insert(name.to_string(), value);
        Ok(())
    }

    fn subroutine_index(&self, program: ProgramHandle, stage: ShaderStage, name: &str) -> Option<u32> {
        if stage != ShaderStage::Fragment || !self.programs.contains_key(from_raw::<ProgramKey>(program.0)) {
            return None;
        }
        self.fragment_subroutines
            .iter()
            .position(|s| s == name)
            .and_then(|i| u32::try_from(i).ok())
    }

    fn select_subroutines(&mut self, stage: ShaderStage, indices: &[u32]) {
        self.subroutines.insert(stage, indices.to_vec());
    }

    fn uniform_block(&self, program: ProgramHandle, name: &str) -> Option<UniformBlockInfo> {
        if !self.programs.contains_key(from_raw::<ProgramKey>(program.0)) {
            return None;
        }
        self.blocks.iter().find(|b| b.name == name).cloned()
    }

    fn create_uniform_buffer(&mut self, data: &[u8]) -> GpuResult<BufferHandle> {
        let key = self.buffers.insert(BufferRecord {
            data: data.to_vec(),
            uploads: 1,
        });
        Ok(BufferHandle(to_raw(key)))
    }

    fn update_uniform_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> GpuResult<()> {
        let key = self.check_buffer(buffer)?;
        let record = &mut self.buffers[key];
        record.data.clear();
        record.data.extend_from_slice(data);
        record.uploads += 1;
        Ok(())
    }

    fn bind_uniform_buffer(&mut self, binding: u32, buffer: BufferHandle) -> GpuResult<()> {
        self.check_buffer(buffer)?;
        self.uniform_bindings.insert(binding, buffer);
        Ok(())
    }

    fn create_texture(&mut self, descriptor: &TextureDescriptor, pixels: &[u8]) -> GpuResult<TextureHandle> {
        let expected = descriptor.width as usize * descriptor.height as usize * 4;
        if pixels.len() != expected {
            return Err(GpuError::ResourceCreation(format!(
                "texture {}x{} expects {} bytes, got {}",
                descriptor.width,
                descriptor.height,
                expected,
                pixels.len()
            )));
        }
        let key = self.textures.insert(TextureRecord {
            descriptor: *descriptor,
            byte_len: pixels.len(),
        });
        Ok(TextureHandle(to_raw(key)))
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) -> GpuResult<()> {
        if !self.textures.contains_key(from_raw::<TextureKey>(texture.0)) {
            return Err(GpuError::UnknownHandle { kind: "texture", id: texture.0 });
        }
        self.texture_units.insert(unit, texture);
        Ok(())
    }

    fn create_mesh(&mut self, vertices: &[Vertex], indices: &[u32]) -> GpuResult<MeshHandle> {
        let key = self.meshes.insert(MeshRecord {
            vertex_count: vertices.len(),
            index_count: indices.len(),
        });
        Ok(MeshHandle(to_raw(key)))
    }

    fn draw_indexed(&mut self, mesh: MeshHandle, index_count: u32) -> GpuResult<()> {
        if !self.meshes.contains_key(from_raw::<MeshKey>(mesh.0)) {
            return Err(GpuError::UnknownHandle { kind: "mesh", id: mesh.0 });
        }
        self.draw_calls.push(DrawCall {
            mesh,
            index_count,
            program: self.current_program,
            polygon_mode: self.polygon_mode,
            cull_face: self.is_enabled(Capability::CullFace),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_round_trip_through_slotmap_keys() {
        let mut ctx = HeadlessContext::new();
        let a = ctx.create_uniform_buffer(&[1, 2, 3, 4]).unwrap();
        let b = ctx.create_uniform_buffer(&[5, 6]).unwrap();
        assert_ne!(a, b);
        assert_eq!(ctx.buffer_data(a), Some(&[1u8, 2, 3, 4][..]));
        assert_eq!(ctx.buffer_data(b), Some(&[5u8, 6][..]));
    }

    #[test]
    fn test_update_counts_uploads() {
        let mut ctx = HeadlessContext::new();
        let buffer = ctx.create_uniform_buffer(&[0; 8]).unwrap();
        ctx.update_uniform_buffer(buffer, &[1; 8]).unwrap();
        assert_eq!(ctx.buffer_uploads(buffer), 2);
        assert_eq!(ctx.buffer_data(buffer), Some(&[1u8; 8][..]));
    }

    #[test]
    fn test_unknown_handles_are_errors() {
        let mut ctx = HeadlessContext::new();
        assert!(matches!(
            ctx.bind_uniform_buffer(0, BufferHandle(42)),
            Err(GpuError::UnknownHandle { kind: "buffer", .. })
        ));
        assert!(ctx.use_program(ProgramHandle(7)).is_err());
        assert!(ctx.draw_indexed(MeshHandle(3), 3).is_err());
    }

    #[test]
    fn test_capabilities_toggle() {
        let mut ctx = HeadlessContext::new();
        ctx.set_capability(Capability::Multisample, true);
        assert!(ctx.is_enabled(Capability::Multisample));
        ctx.set_capability(Capability::Multisample, false);
        assert!(!ctx.is_enabled(Capability::Multisample));
    }

    #[test]
    fn test_program_exposes_default_blocks_and_subroutines() {
        let mut ctx = HeadlessContext::new();
        let program = ctx.create_program("a.vert", "a.frag").unwrap();
        assert!(ctx.uniform_block(program, "MaterialInfo").is_some());
        assert!(ctx.uniform_block(program, "LightInfo").is_some());
        assert_eq!(ctx.subroutine_index(program, ShaderStage::Fragment, "rimLightModel"), Some(2));
        assert_eq!(ctx.subroutine_index(program, ShaderStage::Vertex, "rimLightModel"), None);
    }

    #[test]
    fn test_link_error_is_reported() {
        let mut ctx = HeadlessContext::new().with_link_error("syntax error");
        let err = ctx.create_program("a.vert", "a.frag").unwrap_err();
        assert!(matches!(err, GpuError::ProgramLink { .. }));
    }

    #[test]
    fn test_texture_size_is_checked() {
        let mut ctx = HeadlessContext::new();
        let descriptor = TextureDescriptor {
            width: 2,
            height: 2,
            format: super::super::TextureFormat::Rgba8,
            generate_mipmaps: false,
        };
        assert!(ctx.create_texture(&descriptor, &[0; 16]).is_ok());
        assert!(ctx.create_texture(&descriptor, &[0; 15]).is_err());
    }

    #[test]
    fn test_draw_records_state() {
        let mut ctx = HeadlessContext::new();
        let mesh = ctx.create_mesh(&[Vertex::default(); 3], &[0, 1, 2]).unwrap();
        ctx.polygon_mode(PolygonMode::Line);
        ctx.draw_indexed(mesh, 3).unwrap();
        let call = ctx.draw_calls()[0];
        assert_eq!(call.polygon_mode, PolygonMode::Line);
        assert!(!call.cull_face);
    }
}
