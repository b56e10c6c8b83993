//! # Scene Engine
//!
//! A single-pass forward renderer for one model lit by one light.
//!
//! ## Features
//!
//! - **First-person camera**: local-axis movement, pan and tilt, perspective
//!   or orthographic projection
//! - **Uniform-buffer materials**: std140 parameter blocks validated against
//!   the program's layout at creation time
//! - **Switchable lighting**: Phong, Blinn-Phong and rim lighting selected
//!   through fragment subroutines
//! - **Shared resources**: model, material, texture and mesh managers that
//!   upload each key once
//! - **Backend-agnostic**: everything talks to a [`GpuContext`]; a recording
//!   [`HeadlessContext`] ships with the crate
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<(), SceneError> {
//!     let mut scene = Scene::new(SceneConfig::default());
//!     scene.initialize(HeadlessContext::new())?;
//!     scene.resize(1280, 720)?;
//!
//!     scene.set_forward_speed(2.0);
//!     scene.update(0.016)?;
//!     scene.render(0.016)?;
//!     Ok(())
//! }
//! ```
//!
//! [`GpuContext`]: render::GpuContext
//! [`HeadlessContext`]: render::HeadlessContext

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;

pub use scene::{FrameInfo, LightMode, Scene, SceneError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{AssetError, Model, ModelLoader, ObjModelLoader},
        config::{Config, SceneConfig},
        foundation::math::{Mat4, Transform, Vec3},
        render::{Camera, GpuContext, HeadlessContext, Light, Projection},
        FrameInfo, LightMode, Scene, SceneError,
    };
}
