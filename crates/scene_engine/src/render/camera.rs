//! # 3D Camera System
//!
//! First-person camera described by a position, a view center and an up
//! vector, with either a perspective or an orthographic projection.
//!
//! ## Design Principles
//! - **On-demand matrices**: view and projection matrices are recomputed from
//!   state on every call, so a resize can never leave a stale matrix behind
//! - **One projection at a time**: the projection is an enum, switching type
//!   is always explicit
//! - **Local-frame movement**: translations are expressed in camera axes
//!   (x = right, y = up, z = view direction)

use crate::foundation::math::{utils, Mat4, Mat4Ext, Quat, Unit, Vec3};

/// Length below which a direction is treated as zero
const DEGENERATE_EPSILON: f32 = 1e-6;

/// Projection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective projection
    Perspective {
        /// Vertical field of view in degrees
        fov: f32,
        /// Aspect ratio (width / height)
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

impl Projection {
    /// Projection matrix for these parameters
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Self::Perspective { fov, aspect, near, far } => {
                Mat4::perspective(utils::deg_to_rad(fov), aspect, near, far)
            }
            Self::Orthographic { left, right, bottom, top, near, far } => {
                Mat4::orthographic(left, right, bottom, top, near, far)
            }
        }
    }
}

/// Whether a translation also moves the view center
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraTranslation {
    /// Move the view center with the camera (strafe)
    TranslateViewCenter,
    /// Keep the view center fixed (orbit-like dolly)
    DontTranslateViewCenter,
}

/// 3D camera
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    view_center: Vec3,
    up: Vec3,
    projection: Projection,
}

impl Camera {
    /// Create a camera from a pose and a projection
    pub fn new(position: Vec3, view_center: Vec3, up: Vec3, projection: Projection) -> Self {
        Self {
            position,
            view_center,
            up: up.normalize(),
            projection,
        }
    }

    /// Camera position in world space
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Point the camera looks at
    pub fn view_center(&self) -> Vec3 {
        self.view_center
    }

    /// Up vector
    pub fn up_vector(&self) -> Vec3 {
        self.up
    }

    /// Vector from position to view center
    pub fn view_vector(&self) -> Vec3 {
        self.view_center - self.position
    }

    /// Active projection
    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Move the camera without changing the view center
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Look at another point
    pub fn set_view_center(&mut self, view_center: Vec3) {
        self.view_center = view_center;
        log::trace!("Camera view center updated to: {:?}", view_center);
    }

    /// Replace the up vector
    pub fn set_up_vector(&mut self, up: Vec3) {
        self.up = up.normalize();
    }

    /// Switch to (or update) a perspective projection
    pub fn set_perspective_projection(&mut self, fov: f32, aspect: f32, near: f32, far: f32) {
        self.projection = Projection::Perspective { fov, aspect, near, far };
    }

    /// Switch to (or update) an orthographic projection
    pub fn set_orthographic_projection(&mut self, left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) {
        self.projection = Projection::Orthographic { left, right, bottom, top, near, far };
    }

    /// Apply a new viewport size to the current projection
    ///
    /// Perspective keeps fov/near/far and takes the new aspect ratio;
    /// orthographic keeps its bounds. The projection type never changes.
    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        match self.projection {
            Projection::Perspective { fov, near, far, aspect: previous } => {
                #[allow(clippy::cast_precision_loss)]
                let aspect = width as f32 / height.max(1) as f32;
                if (previous - aspect).abs() > 0.01 {
                    log::info!("Camera aspect ratio changed: {:.3} -> {:.3}", previous, aspect);
                }
                self.set_perspective_projection(fov, aspect, near, far);
            }
            Projection::Orthographic { left, right, bottom, top, near, far } => {
                self.set_orthographic_projection(left, right, bottom, top, near, far);
            }
        }
    }

    /// Translate in camera-local axes
    ///
    /// `local.x` moves along the right vector, `local.y` along the up vector
    /// and `local.z` along the view direction. The up vector is
    /// re-orthogonalised afterwards unless the view is parallel to it.
    pub fn translate(&mut self, local: Vec3, option: CameraTranslation) {
        if local == Vec3::zeros() {
            return;
        }

        let view_vector = self.view_vector();
        let mut world = Vec3::zeros();

        if local.x != 0.0 {
            if let Some(right) = self.right_vector() {
                world += local.x * right;
            }
        }
        if local.y != 0.0 {
            world += local.y * self.up;
        }
        if local.z != 0.0 {
            if let Some(forward) = view_vector.try_normalize(DEGENERATE_EPSILON) {
                world += local.z * forward;
            }
        }

        self.position += world;
        if option == CameraTranslation::TranslateViewCenter {
            self.view_center += world;
        }

        if let Some(right) = self.right_vector() {
            if let Some(up) = right.cross(&self.view_vector()).try_normalize(DEGENERATE_EPSILON) {
                self.up = up;
            }
        }
    }

    /// Unit right vector, or `None` when the view is parallel to up
    pub fn right_vector(&self) -> Option<Vec3> {
        self.view_vector().cross(&self.up).try_normalize(DEGENERATE_EPSILON)
    }

    /// Rotate the view direction about `axis` through the camera position
    pub fn pan(&mut self, degrees: f32, axis: Vec3) {
        let rotation = Quat::from_axis_angle(&Unit::new_normalize(axis), utils::deg_to_rad(degrees));
        self.rotate(rotation);
    }

    /// Rotate the view direction about the camera's right vector
    ///
    /// Ignored while the view is parallel to up, where no right axis exists.
    pub fn tilt(&mut self, degrees: f32) {
        let Some(right) = self.right_vector() else {
            log::debug!("Camera tilt skipped: view direction is parallel to up");
            return;
        };
        let rotation = Quat::from_axis_angle(&Unit::new_unchecked(right), utils::deg_to_rad(degrees));
        self.rotate(rotation);
    }

    fn rotate(&mut self, rotation: Quat) {
        let view_vector = rotation * self.view_vector();
        self.up = rotation * self.up;
        self.view_center = self.position + view_vector;
    }

    /// World-to-camera transform
    ///
    /// While the view is parallel to up, a perpendicular stand-in axis keeps
    /// the matrix finite.
    pub fn view_matrix(&self) -> Mat4 {
        let up = if self.right_vector().is_some() {
            self.up
        } else {
            let view = self.view_vector();
            let helper = if view.x.abs() < view.z.abs() { Vec3::x() } else { Vec3::z() };
            view.cross(&helper).cross(&view)
        };
        Mat4::look_at(self.position, self.view_center, up)
    }

    /// Camera-to-clip transform for the active projection
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    /// Combined world-to-clip transform `P × V`
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::zeros(),
            Vec3::new(0.0, 1.0, 0.0),
            Projection::Perspective {
                fov: 60.0,
                aspect: 4.0 / 3.0,
                near: 0.1,
                far: 1000.0,
            },
        )
    }
}
