//! Math types and helpers
//!
//! Provides the nalgebra aliases used across the renderer plus the OpenGL-style
//! projection and view matrix builders.

pub use nalgebra::{Matrix4, Quaternion, Unit, Vector2, Vector3, Vector4};

/// Texture coordinate
pub type Vec2 = Vector2<f32>;
/// Position, direction or RGB color
pub type Vec3 = Vector3<f32>;
/// Homogeneous position or RGBA color
pub type Vec4 = Vector4<f32>;
/// Model, view and projection matrices
pub type Mat4 = Matrix4<f32>;
/// Point in world space
pub type Point3 = nalgebra::Point3<f32>;
/// Unit quaternion
pub type Quat = Unit<Quaternion<f32>>;

/// Model transform of the scene's active object
///
/// Composed as translation * rotation * scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Translation in world units
    pub position: Vec3,
    /// Orientation
    pub rotation: Quat,
    /// Per-axis scale
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::repeat(1.0),
        }
    }
}

impl Transform {
    /// No translation, rotation or scaling
    pub fn identity() -> Self {
        Self::default()
    }

    /// Identity transform moved to `position`
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Rotate around the world Y axis by `degrees`
    pub fn rotate_y(&mut self, degrees: f32) {
        let delta = Quat::from_axis_angle(&Vec3::y_axis(), utils::deg_to_rad(degrees));
        self.rotation = delta * self.rotation;
    }

    /// Set a uniform scale factor
    pub fn set_uniform_scale(&mut self, scale: f32) {
        self.scale = Vec3::repeat(scale);
    }

    /// Matrix uploaded as `modelMatrix`
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }
}

/// Angle helpers
pub mod utils {
    /// Degrees to radians; the scene API takes degrees everywhere
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees.to_radians()
    }
}

/// OpenGL-convention matrix builders
///
/// Right-handed view space looking down -Z, NDC depth in [-1, 1].
pub trait Mat4Ext {
    /// Perspective projection, `fov_y` in radians
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Orthographic projection
    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;

    /// View matrix for an eye at `eye` looking at `target`
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

#[rustfmt::skip]
impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let focal = 1.0 / (fov_y * 0.5).tan();
        let depth = near - far;
        Mat4::new(
            focal / aspect, 0.0,   0.0,                   0.0,
            0.0,            focal, 0.0,                   0.0,
            0.0,            0.0,   (far + near) / depth,  2.0 * far * near / depth,
            0.0,            0.0,   -1.0,                  0.0,
        )
    }

    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        let width = right - left;
        let height = top - bottom;
        let depth = far - near;
        Mat4::new(
            2.0 / width, 0.0,          0.0,          -(right + left) / width,
            0.0,         2.0 / height, 0.0,          -(top + bottom) / height,
            0.0,         0.0,          -2.0 / depth, -(far + near) / depth,
            0.0,         0.0,          0.0,          1.0,
        )
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let f = (target - eye).normalize();
        let s = f.cross(&up).normalize();
        let u = s.cross(&f);
        Mat4::new(
            s.x,  s.y,  s.z,  -s.dot(&eye),
            u.x,  u.y,  u.z,  -u.dot(&eye),
            -f.x, -f.y, -f.z, f.dot(&eye),
            0.0,  0.0,  0.0,  1.0,
        )
    }
}
