//! Scene light
//!
//! One light drives the forward pass. Its variant (point or spot) is chosen
//! at configuration time; call sites use the shared setter surface and never
//! branch on the variant.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::Vec3;
use crate::render::gpu::{
    BlockMember, BlockMemberType, BufferHandle, GpuContext, GpuResult, UniformBlockInfo,
};

/// Name of the uniform block the light writes into
pub const LIGHT_BLOCK: &str = "LightInfo";

/// Distance attenuation factors: `1 / (c + l·d + q·d²)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    /// Constant term
    pub constant: f32,
    /// Linear term
    pub linear: f32,
    /// Quadratic term
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        }
    }
}

/// Variant-specific light data
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Omnidirectional light
    Point,
    /// Cone-shaped light
    Spot {
        /// Direction the cone points along
        direction: Vec3,
        /// Half-angle of the cone in degrees
        cutoff: f32,
    },
}

/// Light source
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    kind: LightKind,
    position: Vec3,
    diffuse_color: Vec3,
    specular_color: Vec3,
    attenuation: Attenuation,
    intensity: f32,
}

impl Light {
    /// Create a white point light at the origin
    pub fn point() -> Self {
        Self::with_kind(LightKind::Point)
    }

    /// Create a white spot light at the origin pointing down -Z
    pub fn spot(cutoff: f32) -> Self {
        Self::with_kind(LightKind::Spot {
            direction: Vec3::new(0.0, 0.0, -1.0),
            cutoff,
        })
    }

    fn with_kind(kind: LightKind) -> Self {
        Self {
            kind,
            position: Vec3::zeros(),
            diffuse_color: Vec3::new(1.0, 1.0, 1.0),
            specular_color: Vec3::new(1.0, 1.0, 1.0),
            attenuation: Attenuation::default(),
            intensity: 1.0,
        }
    }

    /// Move the light
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Set both diffuse and specular color
    pub fn set_color(&mut self, color: Vec3) {
        self.diffuse_color = color;
        self.specular_color = color;
    }

    /// Set the diffuse color
    pub fn set_diffuse_color(&mut self, color: Vec3) {
        self.diffuse_color = color;
    }

    /// Set the specular color
    pub fn set_specular_color(&mut self, color: Vec3) {
        self.specular_color = color;
    }

    /// Replace all attenuation factors
    pub fn set_attenuation(&mut self, attenuation: Attenuation) {
        self.attenuation = attenuation;
    }

    /// Set only the linear attenuation factor
    pub fn set_linear_attenuation(&mut self, linear: f32) {
        self.attenuation.linear = linear;
    }

    /// Set the intensity multiplier
    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
    }

    /// Point a spot light along `direction`; point lights ignore it
    pub fn aim_at(&mut self, direction: Vec3) {
        if let LightKind::Spot { direction: current, .. } = &mut self.kind {
            *current = direction;
        }
    }

    /// Set the spot cutoff in degrees; point lights ignore it
    pub fn set_cutoff(&mut self, degrees: f32) {
        if let LightKind::Spot { cutoff, .. } = &mut self.kind {
            *cutoff = degrees;
        }
    }

    /// Variant data
    pub fn kind(&self) -> LightKind {
        self.kind
    }

    /// Position in world space
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Diffuse color
    pub fn diffuse_color(&self) -> Vec3 {
        self.diffuse_color
    }

    /// Specular color
    pub fn specular_color(&self) -> Vec3 {
        self.specular_color
    }

    /// Attenuation factors
    pub fn attenuation(&self) -> Attenuation {
        self.attenuation
    }

    /// Intensity multiplier
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Pack the light into its std140 block
    pub fn uniform_data(&self) -> LightUniformData {
        let (direction, cutoff, kind) = match self.kind {
            LightKind::Point => (Vec3::zeros(), 180.0, LightUniformData::KIND_POINT),
            LightKind::Spot { direction, cutoff } => (direction, cutoff, LightUniformData::KIND_SPOT),
        };

        LightUniformData {
            position: [self.position.x, self.position.y, self.position.z, 1.0],
            direction: [direction.x, direction.y, direction.z, 0.0],
            diffuse_color: [self.diffuse_color.x, self.diffuse_color.y, self.diffuse_color.z, 1.0],
            specular_color: [self.specular_color.x, self.specular_color.y, self.specular_color.z, 1.0],
            attenuation: [
                self.attenuation.constant,
                self.attenuation.linear,
                self.attenuation.quadratic,
                self.intensity,
            ],
            cutoff,
            kind,
            _padding: [0; 2],
        }
    }

    /// Upload the light parameters and attach them to the light block
    pub fn render<C: GpuContext + ?Sized>(&self, context: &mut C, block: &LightBlock) -> GpuResult<()> {
        let data = self.uniform_data();
        context.update_uniform_buffer(block.buffer, bytemuck::bytes_of(&data))?;
        context.bind_uniform_buffer(block.binding, block.buffer)?;
        log::trace!("Uploaded light at {:?}", self.position);
        Ok(())
    }
}

/// Light parameters in std140 layout
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightUniformData {
    /// Position (xyz, w = 1)
    pub position: [f32; 4],
    /// Spot direction (xyz, w = 0)
    pub direction: [f32; 4],
    /// Diffuse color (rgb, a = 1)
    pub diffuse_color: [f32; 4],
    /// Specular color (rgb, a = 1)
    pub specular_color: [f32; 4],
    /// Constant, linear, quadratic attenuation and intensity
    pub attenuation: [f32; 4],
    /// Spot cutoff in degrees (180 for point lights)
    pub cutoff: f32,
    /// Variant tag
    pub kind: i32,
    /// Padding to a 16-byte multiple
    pub _padding: [i32; 2],
}

impl LightUniformData {
    /// Variant tag of a point light
    pub const KIND_POINT: i32 = 0;
    /// Variant tag of a spot light
    pub const KIND_SPOT: i32 = 1;

    /// Block description matching this struct
    pub fn block_info(binding: u32) -> UniformBlockInfo {
        let members = [
            ("position", BlockMemberType::Vec4, 0),
            ("direction", BlockMemberType::Vec4, 16),
            ("diffuseColor", BlockMemberType::Vec4, 32),
            ("specularColor", BlockMemberType::Vec4, 48),
            ("attenuation", BlockMemberType::Vec4, 64),
            ("cutoff", BlockMemberType::Float, 80),
            ("kind", BlockMemberType::Int, 84),
        ]
        .into_iter()
        .map(|(name, ty, offset)| BlockMember {
            name: name.to_string(),
            ty,
            offset,
        })
        .collect();

        UniformBlockInfo {
            name: LIGHT_BLOCK.to_string(),
            binding,
            size: std::mem::size_of::<Self>(),
            members,
        }
    }
}

/// Uniform buffer and binding point the light uploads into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightBlock {
    /// Buffer holding [`LightUniformData`]
    pub buffer: BufferHandle,
    /// Binding point of the block
    pub binding: u32,
}

impl LightBlock {
    /// Allocate the block's buffer
    pub fn create<C: GpuContext + ?Sized>(context: &mut C, binding: u32) -> GpuResult<Self> {
        let buffer = context.create_uniform_buffer(bytemuck::bytes_of(&LightUniformData::zeroed()))?;
        Ok(Self { buffer, binding })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::gpu::HeadlessContext;

    #[test]
    fn test_uniform_data_is_std140_sized() {
        assert_eq!(std::mem::size_of::<LightUniformData>(), 96);
        assert_eq!(LightUniformData::block_info(1).size, 96);
    }

    #[test]
    fn test_point_light_ignores_spot_setters() {
        let mut light = Light::point();
        light.aim_at(Vec3::new(1.0, 0.0, 0.0));
        light.set_cutoff(10.0);
        assert_eq!(light.kind(), LightKind::Point);
        assert_eq!(light.uniform_data().kind, LightUniformData::KIND_POINT);
    }

    #[test]
    fn test_spot_light_tracks_aim_and_cutoff() {
        let mut light = Light::spot(20.0);
        light.aim_at(Vec3::new(0.0, -1.0, 0.0));
        light.set_cutoff(15.0);
        assert_eq!(
            light.kind(),
            LightKind::Spot {
                direction: Vec3::new(0.0, -1.0, 0.0),
                cutoff: 15.0
            }
        );
    }

    #[test]
    fn test_uniform_data_packs_attenuation_and_intensity() {
        let mut light = Light::spot(20.0);
        light.set_linear_attenuation(0.1);
        light.set_intensity(2.0);
        light.set_position(Vec3::new(1.0, 2.0, 3.0));
        let data = light.uniform_data();
        assert_eq!(data.attenuation, [1.0, 0.1, 0.0, 2.0]);
        assert_eq!(data.position, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(data.cutoff, 20.0);
    }

    #[test]
    fn test_render_uploads_and_binds() {
        let mut ctx = HeadlessContext::new();
        let block = LightBlock::create(&mut ctx, 1).unwrap();
        let mut light = Light::point();
        light.set_color(Vec3::new(0.5, 0.5, 0.5));
        light.render(&mut ctx, &block).unwrap();

        assert_eq!(ctx.bound_uniform_buffer(1), Some(block.buffer));
        let bytes = ctx.buffer_data(block.buffer).unwrap();
        let uploaded: LightUniformData = bytemuck::pod_read_unaligned(bytes);
        assert_eq!(uploaded, light.uniform_data());
    }
}
