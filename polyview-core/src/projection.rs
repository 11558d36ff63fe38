//! Camera and projection utilities
use std::fmt;
use std::str::FromStr;

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CameraError {
    #[error("camera position coincides with the look-at target")]
    EyeAtTarget,
    #[error("up vector is parallel to the viewing direction")]
    UpParallelToView,
    #[error("unknown projection kind `{0}`")]
    UnknownProjection(String),
}

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMode {
    Perspective,
    Orthographic,
}

impl fmt::Display for ProjectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Perspective => f.write_str("perspective"),
            Self::Orthographic => f.write_str("orthographic"),
        }
    }
}

impl FromStr for ProjectionMode {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "perspective" => Ok(Self::Perspective),
            "orthographic" => Ok(Self::Orthographic),
            other => Err(CameraError::UnknownProjection(other.to_string())),
        }
    }
}

/// Look-at camera. Holds only position, target and up; the view matrix is
/// derived on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f64>,
    pub look_at: Point3<f64>,
    pub up: Vector3<f64>,
}

impl Camera {
    pub fn new(position: Point3<f64>, look_at: Point3<f64>, up: Vector3<f64>) -> Self {
        Self {
            position,
            look_at,
            up,
        }
    }

    /// World-to-camera matrix.
    ///
    /// `z = normalize(position - look_at)`, `x = normalize(up x z)`, `y = z x x`;
    /// the rows of the rotation are `x, y, z` and the translation is
    /// `-rotation * position`.
    pub fn view_matrix(&self) -> Result<Matrix4<f64>, CameraError> {
        let forward = self.position - self.look_at;
        if forward.norm_squared() == 0.0 {
            return Err(CameraError::EyeAtTarget);
        }
        let z_axis = forward.normalize();

        let side = self.up.cross(&z_axis);
        if side.norm_squared() == 0.0 {
            return Err(CameraError::UpParallelToView);
        }
        let x_axis = side.normalize();
        let y_axis = z_axis.cross(&x_axis);

        let rotation = Matrix3::from_rows(&[
            x_axis.transpose(),
            y_axis.transpose(),
            z_axis.transpose(),
        ]);
        let translation = -(rotation * self.position.coords);

        let mut view = rotation.to_homogeneous();
        view.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
        Ok(view)
    }

    pub fn translate_position(&mut self, offset: Vector3<f64>) {
        self.position += offset;
    }

    pub fn translate_look_at(&mut self, offset: Vector3<f64>) {
        self.look_at += offset;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Point3::new(5.0, 5.0, 6.0),
            look_at: Point3::origin(),
            up: Vector3::z(),
        }
    }
}

/// Parameters for one of the two projection builders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in degrees.
        fov: f64,
        aspect_ratio: f64,
        near: f64,
        far: f64,
    },
    Orthographic {
        left: f64,
        right: f64,
        bottom: f64,
        top: f64,
        near: f64,
        far: f64,
    },
}

impl Projection {
    pub fn default_perspective() -> Self {
        Self::Perspective {
            fov: 90.0,
            aspect_ratio: 1.0,
            near: 0.1,
            far: 1000.0,
        }
    }

    pub fn default_orthographic() -> Self {
        Self::Orthographic {
            left: -1.0,
            right: 1.0,
            bottom: -1.0,
            top: 1.0,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Default parameters for `mode`.
    pub fn for_mode(mode: ProjectionMode) -> Self {
        match mode {
            ProjectionMode::Perspective => Self::default_perspective(),
            ProjectionMode::Orthographic => Self::default_orthographic(),
        }
    }

    pub fn mode(&self) -> ProjectionMode {
        match self {
            Self::Perspective { .. } => ProjectionMode::Perspective,
            Self::Orthographic { .. } => ProjectionMode::Orthographic,
        }
    }

    /// Create the projection matrix
    pub fn matrix(&self) -> Matrix4<f64> {
        match *self {
            Self::Perspective {
                fov,
                aspect_ratio,
                near,
                far,
            } => perspective_matrix(fov, aspect_ratio, near, far),
            Self::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => orthographic_matrix(left, right, bottom, top, near, far),
        }
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::default_perspective()
    }
}

/// Symmetric-frustum perspective matrix. The bottom row is `[0, 0, -1, 0]`, so
/// `w` carries the camera-space distance for the perspective divide.
#[rustfmt::skip]
pub fn perspective_matrix(fov_degrees: f64, aspect_ratio: f64, near: f64, far: f64) -> Matrix4<f64> {
    let tan_half_fov = (fov_degrees.to_radians() / 2.0).tan();
    let depth = far - near;

    Matrix4::new(
        1.0 / (aspect_ratio * tan_half_fov), 0.0, 0.0, 0.0,
        0.0, 1.0 / tan_half_fov, 0.0, 0.0,
        0.0, 0.0, -(far + near) / depth, -(2.0 * far * near) / depth,
        0.0, 0.0, -1.0, 0.0,
    )
}

/// Box-to-NDC matrix; `w` stays 1.
#[rustfmt::skip]
pub fn orthographic_matrix(
    left: f64,
    right: f64,
    bottom: f64,
    top: f64,
    near: f64,
    far: f64,
) -> Matrix4<f64> {
    Matrix4::new(
        2.0 / (right - left), 0.0, 0.0, -(right + left) / (right - left),
        0.0, 2.0 / (top - bottom), 0.0, -(top + bottom) / (top - bottom),
        0.0, 0.0, -2.0 / (far - near), -(far + near) / (far - near),
        0.0, 0.0, 0.0, 1.0,
    )
}
