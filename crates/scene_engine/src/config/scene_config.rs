//! Scene configuration knobs
//!
//! Everything the scene reads at construction and initialization time:
//! initial camera pose, unit scale, default light, shader names and the
//! model to load first.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{Config, ConfigError};
use crate::foundation::math::Vec3;

/// Sine of the smallest accepted angle between view and up
const PARALLEL_EPSILON: f32 = 1e-4;

/// Top-level scene configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Initial camera pose and projection
    pub camera: CameraConfig,
    /// Scale applied to velocity when translating the camera
    pub meters_to_units: f32,
    /// Default light parameters
    pub light: LightConfig,
    /// Shader program sources and subroutine names
    pub shaders: ShaderConfig,
    /// Framebuffer clear color (RGBA)
    pub clear_color: [f32; 4],
    /// Model loaded during initialization
    pub model: Option<ModelConfig>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            meters_to_units: 0.05,
            light: LightConfig::default(),
            shaders: ShaderConfig::default(),
            clear_color: [0.39, 0.39, 0.39, 0.0],
            model: Some(ModelConfig::default()),
        }
    }
}

impl Config for SceneConfig {}

impl SceneConfig {
    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.meters_to_units.is_finite() && self.meters_to_units > 0.0) {
            return Err(ConfigError::Invalid {
                field: "meters_to_units",
                reason: format!("must be a positive number, got {}", self.meters_to_units),
            });
        }
        self.camera.validate()
    }
}

/// Camera pose and projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Eye position in world space
    pub position: [f32; 3],
    /// Point the camera looks at
    pub view_center: [f32; 3],
    /// Up vector
    pub up: [f32; 3],
    /// Projection parameters
    pub projection: ProjectionConfig,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [-8.0, 6.0, -7.0],
            view_center: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            projection: ProjectionConfig::default(),
        }
    }
}

impl CameraConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.position == self.view_center {
            return Err(ConfigError::Invalid {
                field: "camera.view_center",
                reason: "must differ from camera.position".to_string(),
            });
        }

        let view = Vec3::from(self.view_center) - Vec3::from(self.position);
        if view.cross(&Vec3::from(self.up)).norm() <= PARALLEL_EPSILON * view.norm() {
            return Err(ConfigError::Invalid {
                field: "camera.up",
                reason: "must not be zero or parallel to the view direction".to_string(),
            });
        }

        let (near, far) = match self.projection {
            ProjectionConfig::Perspective { fov_degrees, near, far, .. } => {
                if !(fov_degrees > 0.0 && fov_degrees < 180.0) {
                    return Err(ConfigError::Invalid {
                        field: "camera.projection.fov_degrees",
                        reason: format!("must be in (0, 180), got {fov_degrees}"),
                    });
                }
                if near <= 0.0 {
                    return Err(ConfigError::Invalid {
                        field: "camera.projection.near",
                        reason: format!("must be positive for perspective, got {near}"),
                    });
                }
                (near, far)
            }
            ProjectionConfig::Orthographic { left, right, bottom, top, near, far } => {
                if left == right || bottom == top {
                    return Err(ConfigError::Invalid {
                        field: "camera.projection",
                        reason: "orthographic bounds must enclose a non-empty area".to_string(),
                    });
                }
                (near, far)
            }
        };

        if near >= far {
            return Err(ConfigError::Invalid {
                field: "camera.projection.far",
                reason: format!("far ({far}) must be greater than near ({near})"),
            });
        }
        Ok(())
    }
}

/// Projection parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProjectionConfig {
    /// Perspective projection
    Perspective {
        /// Vertical field of view in degrees
        fov_degrees: f32,
        /// Initial aspect ratio, replaced on the first resize
        aspect: f32,
        /// Near clipping plane
        near: f32,
        /// Far clipping plane
        far: f32,
    },
    /// Orthographic projection
    Orthographic {
        /// Left bound
        left: f32,
        /// Right bound
        right: f32,
        /// Bottom bound
        bottom: f32,
        /// Top bound
        top: f32,
        /// Near clipping plane
        near: f32,
        /// Far clipping plane
        far: f32,
    },
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self::Perspective {
            fov_degrees: 60.0,
            aspect: 4.0 / 3.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Which light variant the scene owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightKindConfig {
    /// Cone-shaped light following the camera
    Spot,
    /// Omnidirectional light
    Point,
}

/// Default light parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    /// Light variant
    pub kind: LightKindConfig,
    /// Diffuse color (RGB)
    pub diffuse_color: [f32; 3],
    /// Specular color (RGB)
    pub specular_color: [f32; 3],
    /// Linear attenuation factor
    pub linear_attenuation: f32,
    /// Intensity multiplier
    pub intensity: f32,
    /// Spot cutoff angle in degrees (ignored for point lights)
    pub cutoff_degrees: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            kind: LightKindConfig::Spot,
            diffuse_color: [1.0, 1.0, 1.0],
            specular_color: [1.0, 1.0, 1.0],
            linear_attenuation: 0.1,
            intensity: 2.0,
            cutoff_degrees: 20.0,
        }
    }
}

/// Shader sources and lighting subroutine names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Vertex shader source name
    pub vertex: String,
    /// Fragment shader source name
    pub fragment: String,
    /// Fragment subroutine implementing per-fragment Phong
    pub phong_subroutine: String,
    /// Fragment subroutine implementing per-fragment Blinn-Phong
    pub blinn_phong_subroutine: String,
    /// Fragment subroutine implementing rim lighting
    pub rim_lighting_subroutine: String,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            vertex: "resources/shaders/per-fragment-blinn-phong.vert".to_string(),
            fragment: "resources/shaders/per-fragment-blinn-phong.frag".to_string(),
            phong_subroutine: "phongModel".to_string(),
            blinn_phong_subroutine: "blinnPhongModel".to_string(),
            rim_lighting_subroutine: "rimLightModel".to_string(),
        }
    }
}

/// Model to load at initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Cache key of the model
    pub name: String,
    /// Asset path handed to the model loader
    pub path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "UH60".to_string(),
            path: PathBuf::from("assets/blackhawk/uh60.obj"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SceneConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.meters_to_units, 0.05);
        assert_eq!(config.camera.position, [-8.0, 6.0, -7.0]);
        assert_eq!(config.light.kind, LightKindConfig::Spot);
    }

    #[test]
    fn test_rejects_non_positive_unit_scale() {
        let config = SceneConfig {
            meters_to_units: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "meters_to_units", .. })
        ));
    }

    #[test]
    fn test_rejects_up_parallel_to_view() {
        let mut config = SceneConfig::default();
        config.camera.position = [0.0, 10.0, 0.0];
        config.camera.view_center = [0.0, 0.0, 0.0];
        config.camera.up = [0.0, 1.0, 0.0];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "camera.up", .. })
        ));

        config.camera.up = [0.0, 0.0, 1.0];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_clip_planes() {
        let mut config = SceneConfig::default();
        config.camera.projection = ProjectionConfig::Perspective {
            fov_degrees: 45.0,
            aspect: 1.0,
            near: 10.0,
            far: 1.0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.toml");

        let mut config = SceneConfig::default();
        config.light.kind = LightKindConfig::Point;
        config.camera.projection = ProjectionConfig::Orthographic {
            left: -5.0,
            right: 5.0,
            bottom: -5.0,
            top: 5.0,
            near: 0.1,
            far: 100.0,
        };
        config.save_to_file(&path).unwrap();

        let loaded = SceneConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.ron");
        std::fs::write(&path, "(meters_to_units: 0.5)").unwrap();

        let loaded = SceneConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.meters_to_units, 0.5);
        assert_eq!(loaded.camera, CameraConfig::default());
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let result = SceneConfig::load_from_file("scene.yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
