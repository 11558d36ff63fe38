//! Affine transformation matrices and parsed transform commands.
use std::fmt;
use std::str::FromStr;

use nalgebra::{Matrix3, Matrix4, Point3, Unit, Vector3};
use thiserror::Error;

use crate::geometry::Mesh;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    #[error("rotation axis has zero length")]
    ZeroAxis,
    #[error("plane normal has zero length")]
    ZeroNormal,
    #[error("empty transform command")]
    EmptyCommand,
    #[error("unknown transform command `{0}`")]
    UnknownCommand(String),
    #[error("`{command}` expects {expected} numbers, got {found}")]
    ArgumentCount {
        command: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
}

/// Builders for the 4x4 and 3x3 matrices used by the mesh operators.
pub struct Transform;

impl Transform {
    /// Create a translation matrix
    pub fn translation_matrix(x: f64, y: f64, z: f64) -> Matrix4<f64> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// Create a scale matrix
    pub fn scale_matrix(sx: f64, sy: f64, sz: f64) -> Matrix4<f64> {
        Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz))
    }

    /// Rodrigues rotation of `angle` radians about the normalized `axis`.
    pub fn rotation_matrix(angle: f64, axis: &Vector3<f64>) -> Result<Matrix3<f64>, TransformError> {
        let axis = Unit::try_new(*axis, 0.0).ok_or(TransformError::ZeroAxis)?;
        let (ux, uy, uz) = (axis.x, axis.y, axis.z);
        let (sin, cos) = angle.sin_cos();
        let t = 1.0 - cos;

        Ok(Matrix3::new(
            cos + ux * ux * t,
            ux * uy * t - uz * sin,
            ux * uz * t + uy * sin,
            uy * ux * t + uz * sin,
            cos + uy * uy * t,
            uy * uz * t - ux * sin,
            uz * ux * t - uy * sin,
            uz * uy * t + ux * sin,
            cos + uz * uz * t,
        ))
    }

    /// Affine reflection through the plane with `normal` containing `point`.
    pub fn reflection_matrix(
        normal: &Vector3<f64>,
        point: &Point3<f64>,
    ) -> Result<Matrix4<f64>, TransformError> {
        let n = Unit::try_new(*normal, 0.0)
            .ok_or(TransformError::ZeroNormal)?
            .into_inner();
        let d = -n.dot(&point.coords);

        let linear = Matrix3::identity() - n * n.transpose() * 2.0;
        let offset = n * (-2.0 * d);
        Ok(Matrix4::new_translation(&offset) * linear.to_homogeneous())
    }

    /// Combined world-to-clip matrix.
    pub fn view_projection(view: &Matrix4<f64>, projection: &Matrix4<f64>) -> Matrix4<f64> {
        projection * view
    }
}

/// A single transform request, as typed by a user or read from a script.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOp {
    Translate(Vector3<f64>),
    Scale(Vector3<f64>),
    Rotate {
        angle: f64,
        axis: Vector3<f64>,
    },
    Reflect {
        normal: Vector3<f64>,
        point: Point3<f64>,
    },
    RotateAroundLine {
        p1: Point3<f64>,
        p2: Point3<f64>,
        angle: f64,
    },
}

impl TransformOp {
    /// Apply the operation to `mesh`. On error the mesh is left unchanged.
    pub fn apply(&self, mesh: &mut Mesh) -> Result<(), TransformError> {
        match self {
            Self::Translate(v) => {
                mesh.translate(v.x, v.y, v.z);
                Ok(())
            }
            Self::Scale(s) => {
                mesh.scale(s.x, s.y, s.z);
                Ok(())
            }
            Self::Rotate { angle, axis } => mesh.rotate(*angle, axis),
            Self::Reflect { normal, point } => mesh.reflect(normal, point),
            Self::RotateAroundLine { p1, p2, angle } => mesh.rotate_around_line(p1, p2, *angle),
        }
    }
}

fn parse_numbers(
    command: &'static str,
    args: &[&str],
    expected: usize,
) -> Result<Vec<f64>, TransformError> {
    if args.len() != expected {
        return Err(TransformError::ArgumentCount {
            command,
            expected,
            found: args.len(),
        });
    }
    // `f64::from_str` also accepts `nan` and `inf`, which would poison the mesh.
    args.iter()
        .map(|arg| match arg.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(TransformError::InvalidNumber((*arg).to_string())),
        })
        .collect()
}

impl FromStr for TransformOp {
    type Err = TransformError;

    /// Parses `translate dx dy dz`, `scale sx sy sz`, `rotate angle ax ay az`,
    /// `reflect nx ny nz px py pz` and `rotate-line x1 y1 z1 x2 y2 z2 angle`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let keyword = parts.next().ok_or(TransformError::EmptyCommand)?;
        let args: Vec<&str> = parts.collect();

        match keyword.to_ascii_lowercase().as_str() {
            "translate" | "move" => {
                let n = parse_numbers("translate", &args, 3)?;
                Ok(Self::Translate(Vector3::new(n[0], n[1], n[2])))
            }
            "scale" => {
                let n = parse_numbers("scale", &args, 3)?;
                Ok(Self::Scale(Vector3::new(n[0], n[1], n[2])))
            }
            "rotate" => {
                let n = parse_numbers("rotate", &args, 4)?;
                Ok(Self::Rotate {
                    angle: n[0],
                    axis: Vector3::new(n[1], n[2], n[3]),
                })
            }
            "reflect" => {
                let n = parse_numbers("reflect", &args, 6)?;
                Ok(Self::Reflect {
                    normal: Vector3::new(n[0], n[1], n[2]),
                    point: Point3::new(n[3], n[4], n[5]),
                })
            }
            "rotate-line" => {
                let n = parse_numbers("rotate-line", &args, 7)?;
                Ok(Self::RotateAroundLine {
                    p1: Point3::new(n[0], n[1], n[2]),
                    p2: Point3::new(n[3], n[4], n[5]),
                    angle: n[6],
                })
            }
            other => Err(TransformError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for TransformOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Translate(v) => write!(f, "translate {} {} {}", v.x, v.y, v.z),
            Self::Scale(s) => write!(f, "scale {} {} {}", s.x, s.y, s.z),
            Self::Rotate { angle, axis } => {
                write!(f, "rotate {} {} {} {}", angle, axis.x, axis.y, axis.z)
            }
            Self::Reflect { normal, point } => write!(
                f,
                "reflect {} {} {} {} {} {}",
                normal.x, normal.y, normal.z, point.x, point.y, point.z
            ),
            Self::RotateAroundLine { p1, p2, angle } => write!(
                f,
                "rotate-line {} {} {} {} {} {} {}",
                p1.x, p1.y, p1.z, p2.x, p2.y, p2.z, angle
            ),
        }
    }
}
