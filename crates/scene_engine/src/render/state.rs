//! Rasterizer configuration
//!
//! The polygon mode, culling and multisampling toggles live here instead of
//! as ambient context calls, so every transition goes through the scene's
//! toggle methods and can be inspected.

use crate::render::gpu::{Capability, GpuContext, PolygonMode};

/// Rasterizer state owned by the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterState {
    /// Polygon rasterization mode
    pub polygon_mode: PolygonMode,
    /// Back-face culling
    pub cull_face: bool,
    /// Multisample anti-aliasing
    pub multisample: bool,
}

impl Default for RasterState {
    fn default() -> Self {
        Self {
            polygon_mode: PolygonMode::Fill,
            cull_face: true,
            multisample: false,
        }
    }
}

impl RasterState {
    /// Switch polygon mode; filled polygons cull back faces, lines and
    /// points draw both faces
    pub fn select_polygon_mode(&mut self, mode: PolygonMode) {
        self.polygon_mode = mode;
        self.cull_face = mode == PolygonMode::Fill;
    }

    /// Push the full state to a context
    pub fn apply<C: GpuContext + ?Sized>(&self, context: &mut C) {
        context.polygon_mode(self.polygon_mode);
        context.set_capability(Capability::CullFace, self.cull_face);
        context.set_capability(Capability::Multisample, self.multisample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::gpu::HeadlessContext;

    #[test]
    fn test_polygon_mode_drives_culling() {
        let mut state = RasterState::default();
        state.select_polygon_mode(PolygonMode::Line);
        assert!(!state.cull_face);
        state.select_polygon_mode(PolygonMode::Fill);
        assert!(state.cull_face);
    }

    #[test]
    fn test_apply_pushes_every_field() {
        let mut ctx = HeadlessContext::new();
        let state = RasterState {
            polygon_mode: PolygonMode::Point,
            cull_face: false,
            multisample: true,
        };
        state.apply(&mut ctx);
        assert_eq!(ctx.current_polygon_mode(), PolygonMode::Point);
        assert!(!ctx.is_enabled(Capability::CullFace));
        assert!(ctx.is_enabled(Capability::Multisample));
    }
}
