//! Canonical meshes and procedural surfaces.
//!
//! Every table below is wound counter-clockwise seen from outside, so
//! `(v1 - v0) x (v2 - v0)` is the outward normal of each face.
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use nalgebra::{Point3, Rotation3, Vector3};
use thiserror::Error;

use crate::geometry::{Edge, Face, Mesh};

/// Golden ratio, shared by the icosahedron and dodecahedron tables.
const PHI: f64 = 1.618_033_988_749_895;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PrimitiveError {
    #[error("unknown primitive `{0}`")]
    UnknownPrimitive(String),
    #[error("unknown axis `{0}`")]
    UnknownAxis(String),
    #[error("unknown surface function `{0}`")]
    UnknownSurface(String),
    #[error("{what} must be at least {min}, got {got}")]
    TooFew {
        what: &'static str,
        min: usize,
        got: usize,
    },
}

fn require(what: &'static str, min: usize, got: usize) -> Result<(), PrimitiveError> {
    if got < min {
        Err(PrimitiveError::TooFew { what, min, got })
    } else {
        Ok(())
    }
}

fn points(table: &[[f64; 3]]) -> Vec<Point3<f64>> {
    table.iter().map(|&[x, y, z]| Point3::new(x, y, z)).collect()
}

fn faces<const N: usize>(table: &[[usize; N]]) -> Vec<Face> {
    table.iter().map(|f| Face::new(f.to_vec())).collect()
}

pub fn tetrahedron() -> Mesh {
    let vertices = points(&[
        [1.0, 1.0, 1.0],
        [-1.0, -1.0, 1.0],
        [-1.0, 1.0, -1.0],
        [1.0, -1.0, -1.0],
    ]);
    Mesh::from_trusted_faces(vertices, faces(&[[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]]))
}

/// Axis-aligned cube centered at the origin with edge length `size`.
pub fn cube(size: f64) -> Mesh {
    let h = size / 2.0;
    let vertices = points(&[
        [-h, -h, h],
        [-h, h, h],
        [-h, -h, -h],
        [-h, h, -h],
        [h, -h, h],
        [h, h, h],
        [h, -h, -h],
        [h, h, -h],
    ]);
    let faces = faces(&[
        [0, 1, 3, 2], // -x
        [2, 3, 7, 6], // -z
        [6, 7, 5, 4], // +x
        [4, 5, 1, 0], // +z
        [2, 6, 4, 0], // -y
        [7, 3, 1, 5], // +y
    ]);
    Mesh::from_trusted_faces(vertices, faces)
}

pub fn octahedron() -> Mesh {
    let vertices = points(&[
        [1.0, 0.0, 0.0],
        [-1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, -1.0, 0.0],
        [0.0, 0.0, 1.0],
        [0.0, 0.0, -1.0],
    ]);
    let faces = faces(&[
        [0, 2, 4],
        [0, 5, 2],
        [0, 4, 3],
        [0, 3, 5],
        [1, 4, 2],
        [1, 2, 5],
        [1, 3, 4],
        [1, 5, 3],
    ]);
    Mesh::from_trusted_faces(vertices, faces)
}

pub fn icosahedron() -> Mesh {
    let vertices = points(&[
        [-1.0, PHI, 0.0],
        [1.0, PHI, 0.0],
        [-1.0, -PHI, 0.0],
        [1.0, -PHI, 0.0],
        [0.0, -1.0, PHI],
        [0.0, 1.0, PHI],
        [0.0, -1.0, -PHI],
        [0.0, 1.0, -PHI],
        [PHI, 0.0, -1.0],
        [PHI, 0.0, 1.0],
        [-PHI, 0.0, -1.0],
        [-PHI, 0.0, 1.0],
    ]);
    let faces = faces(&[
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ]);
    Mesh::from_trusted_faces(vertices, faces)
}

pub fn dodecahedron() -> Mesh {
    let (a, b) = (1.0 / PHI, PHI);
    let vertices = points(&[
        [-1.0, -1.0, -1.0],
        [-1.0, -1.0, 1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, 1.0, 1.0],
        [1.0, -1.0, -1.0],
        [1.0, -1.0, 1.0],
        [1.0, 1.0, -1.0],
        [1.0, 1.0, 1.0],
        [0.0, -a, -b],
        [0.0, -a, b],
        [0.0, a, -b],
        [0.0, a, b],
        [-a, -b, 0.0],
        [-a, b, 0.0],
        [a, -b, 0.0],
        [a, b, 0.0],
        [-b, 0.0, -a],
        [b, 0.0, -a],
        [-b, 0.0, a],
        [b, 0.0, a],
    ]);
    let faces = faces(&[
        [18, 16, 0, 12, 1],
        [10, 8, 0, 16, 2],
        [14, 12, 0, 8, 4],
        [3, 18, 1, 9, 11],
        [5, 9, 1, 12, 14],
        [3, 13, 2, 16, 18],
        [6, 10, 2, 13, 15],
        [15, 13, 3, 11, 7],
        [5, 14, 4, 17, 19],
        [6, 17, 4, 8, 10],
        [11, 9, 5, 19, 7],
        [19, 17, 6, 15, 7],
    ]);
    Mesh::from_trusted_faces(vertices, faces)
}

/// Latitude/longitude sphere centered at the origin.
///
/// `rings` counts vertex rings from pole to pole inclusive, so the mesh has
/// `rings * segments` vertices laid out row-major by ring. Edges join longitude
/// and latitude neighbors, wrapping around the seam.
pub fn uv_sphere(radius: f64, segments: usize, rings: usize) -> Result<Mesh, PrimitiveError> {
    require("segments", 3, segments)?;
    require("rings", 2, rings)?;
    let (s, r) = (segments, rings);

    let mut vertices = Vec::with_capacity(r * s);
    for i in 0..r {
        // sin(PI) is not exactly zero, so the south pole is pinned explicitly.
        let (sin_theta, cos_theta) = if i == r - 1 {
            (0.0, -1.0)
        } else {
            (PI * i as f64 / (r - 1) as f64).sin_cos()
        };
        for j in 0..s {
            let phi = 2.0 * PI * j as f64 / s as f64;
            vertices.push(Point3::new(
                radius * sin_theta * phi.cos(),
                radius * sin_theta * phi.sin(),
                radius * cos_theta,
            ));
        }
    }

    let mut edges = Vec::with_capacity(2 * r * s);
    for i in 0..r {
        for j in 0..s {
            edges.push(Edge::new(i * s + j, i * s + (j + 1) % s));
            if i > 0 {
                edges.push(Edge::new((i - 1) * s + j, i * s + j));
            }
        }
    }

    let mut faces = Vec::with_capacity(2 * (r - 1) * s);
    for i in 0..r - 1 {
        for j in 0..s {
            let next_j = (j + 1) % s;
            faces.push(Face::new(vec![i * s + j, (i + 1) * s + j, i * s + next_j]));
            faces.push(Face::new(vec![
                i * s + next_j,
                (i + 1) * s + j,
                (i + 1) * s + next_j,
            ]));
        }
    }

    Ok(Mesh::from_trusted_parts(vertices, edges, faces))
}

/// Coordinate axis used for surfaces of revolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn unit(self) -> Vector3<f64> {
        match self {
            Axis::X => Vector3::x(),
            Axis::Y => Vector3::y(),
            Axis::Z => Vector3::z(),
        }
    }
}

impl FromStr for Axis {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            other => Err(PrimitiveError::UnknownAxis(other.to_string())),
        }
    }
}

/// Sweep a polyline `profile` around `axis` in `segments` equal steps.
///
/// Consecutive copies of the profile are joined by quads and the seam is closed.
/// Faces point outward when the profile runs in the direction of the axis. Profile
/// points lying exactly on the axis collapse their quads into triangles.
pub fn revolve(profile: &[Point3<f64>], axis: Axis, segments: usize) -> Result<Mesh, PrimitiveError> {
    require("profile points", 2, profile.len())?;
    require("segments", 3, segments)?;
    let n = profile.len();
    let axis = nalgebra::Unit::new_unchecked(axis.unit());

    let mut vertices = Vec::with_capacity(n * segments);
    for i in 0..segments {
        let rotation = Rotation3::from_axis_angle(&axis, 2.0 * PI * i as f64 / segments as f64);
        vertices.extend(profile.iter().map(|p| rotation * p));
    }

    let mut faces = Vec::with_capacity(segments * (n - 1));
    for i in 0..segments {
        let prev = (i + segments - 1) % segments;
        for j in 0..n - 1 {
            let quad = [i * n + j, i * n + j + 1, prev * n + j + 1, prev * n + j];
            let mut loop_indices: Vec<usize> = Vec::with_capacity(4);
            for index in quad {
                let duplicate = loop_indices
                    .iter()
                    .any(|&k| vertices[k] == vertices[index]);
                if !duplicate {
                    loop_indices.push(index);
                }
            }
            if loop_indices.len() >= 3 {
                faces.push(Face::new(loop_indices));
            }
        }
    }

    Ok(Mesh::from_trusted_faces(vertices, faces))
}

/// Stock height functions for [`function_surface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceFunction {
    /// `sin(sqrt(x^2 + y^2))`
    Ripple,
    /// `x^2 - y^2`
    Saddle,
    /// `cos(x) * sin(y)`
    Waves,
}

impl SurfaceFunction {
    pub const ALL: [SurfaceFunction; 3] = [Self::Ripple, Self::Saddle, Self::Waves];

    pub fn eval(self, x: f64, y: f64) -> f64 {
        match self {
            Self::Ripple => (x * x + y * y).sqrt().sin(),
            Self::Saddle => x * x - y * y,
            Self::Waves => x.cos() * y.sin(),
        }
    }

    /// Sample the function over `[-PI, PI]` on both axes.
    pub fn build(self) -> Mesh {
        // Parameters are within the accepted range.
        function_surface((-PI, PI), (-PI, PI), 24, |x, y| self.eval(x, y)).unwrap_or_default()
    }
}

impl fmt::Display for SurfaceFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ripple => "ripple",
            Self::Saddle => "saddle",
            Self::Waves => "waves",
        };
        f.write_str(name)
    }
}

impl FromStr for SurfaceFunction {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|func| func.to_string() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| PrimitiveError::UnknownSurface(s.to_string()))
    }
}

/// Sample `z = f(x, y)` on a `(divisions + 1)^2` grid, row-major by x.
///
/// Quads are wound toward +z when both ranges are increasing.
pub fn function_surface<F>(
    x_range: (f64, f64),
    y_range: (f64, f64),
    divisions: usize,
    f: F,
) -> Result<Mesh, PrimitiveError>
where
    F: Fn(f64, f64) -> f64,
{
    require("divisions", 1, divisions)?;
    let n = divisions;
    let dx = (x_range.1 - x_range.0) / n as f64;
    let dy = (y_range.1 - y_range.0) / n as f64;

    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    for i in 0..=n {
        for j in 0..=n {
            let x = x_range.0 + i as f64 * dx;
            let y = y_range.0 + j as f64 * dy;
            vertices.push(Point3::new(x, y, f(x, y)));
        }
    }

    let mut faces = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            let v0 = i * (n + 1) + j;
            let v1 = v0 + 1;
            let v2 = v0 + (n + 1);
            let v3 = v2 + 1;
            faces.push(Face::new(vec![v0, v2, v3, v1]));
        }
    }

    Ok(Mesh::from_trusted_faces(vertices, faces))
}

/// Named canonical meshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Tetrahedron,
    Cube,
    Octahedron,
    Icosahedron,
    Dodecahedron,
    Sphere,
}

impl Primitive {
    pub const ALL: [Primitive; 6] = [
        Self::Cube,
        Self::Tetrahedron,
        Self::Octahedron,
        Self::Icosahedron,
        Self::Dodecahedron,
        Self::Sphere,
    ];

    pub fn build(self) -> Mesh {
        match self {
            Self::Tetrahedron => tetrahedron(),
            Self::Cube => cube(2.0),
            Self::Octahedron => octahedron(),
            Self::Icosahedron => icosahedron(),
            Self::Dodecahedron => dodecahedron(),
            // Parameters are within the accepted range.
            Self::Sphere => uv_sphere(3.0, 20, 21).unwrap_or_default(),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tetrahedron => "tetrahedron",
            Self::Cube => "cube",
            Self::Octahedron => "octahedron",
            Self::Icosahedron => "icosahedron",
            Self::Dodecahedron => "dodecahedron",
            Self::Sphere => "sphere",
        };
        f.write_str(name)
    }
}

impl FromStr for Primitive {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.to_string() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| PrimitiveError::UnknownPrimitive(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_outward(mesh: &Mesh) {
        let center = mesh.centroid().unwrap();
        for face in mesh.faces() {
            let normal = mesh.face_normal(face);
            let out = mesh.face_centroid(face) - center;
            assert!(normal.dot(&out) > 0.0, "face {:?} is wound inward", face.indices());
        }
    }

    #[test]
    fn test_platonic_counts() {
        let cases = [
            (tetrahedron(), 4, 6, 4),
            (cube(2.0), 8, 12, 6),
            (octahedron(), 6, 12, 8),
            (icosahedron(), 12, 30, 20),
            (dodecahedron(), 20, 30, 12),
        ];
        for (mesh, v, e, f) in cases {
            assert_eq!(mesh.vertex_count(), v);
            assert_eq!(mesh.edges().len(), e);
            assert_eq!(mesh.faces().len(), f);
            // Euler characteristic of a convex polyhedron.
            assert_eq!(v + f, e + 2);
        }
    }

    #[test]
    fn test_platonic_faces_wound_outward() {
        for mesh in [tetrahedron(), cube(2.0), octahedron(), icosahedron(), dodecahedron()] {
            assert_outward(&mesh);
        }
    }

    #[test]
    fn test_dodecahedron_faces_are_planar_pentagons() {
        let mesh = dodecahedron();
        for face in mesh.faces() {
            assert_eq!(face.len(), 5);
            let normal = mesh.face_normal(face).normalize();
            let v0 = mesh.vertices()[face.indices()[0]];
            for &i in face.indices() {
                assert_relative_eq!((mesh.vertices()[i] - v0).dot(&normal), 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_cube_size() {
        let mesh = cube(1.0);
        for v in mesh.vertices() {
            assert_relative_eq!(v.x.abs(), 0.5);
            assert_relative_eq!(v.y.abs(), 0.5);
            assert_relative_eq!(v.z.abs(), 0.5);
        }
    }

    #[test]
    fn test_uv_sphere_layout() {
        let (s, r) = (8, 6);
        let mesh = uv_sphere(2.0, s, r).unwrap();
        assert_eq!(mesh.vertex_count(), r * s);
        assert_eq!(mesh.faces().len(), 2 * (r - 1) * s);
        assert_eq!(mesh.edges().len(), r * s + (r - 1) * s);

        // Row-major by ring, poles first and last.
        assert_relative_eq!(mesh.vertices()[0], Point3::new(0.0, 0.0, 2.0));
        assert_relative_eq!(mesh.vertices()[(r - 1) * s].z, -2.0);
        for v in mesh.vertices() {
            assert_relative_eq!(v.coords.norm(), 2.0, epsilon = 1e-12);
        }

        // Winding for ring 1, last segment wraps to j = 0.
        let i = 1;
        let j = s - 1;
        let face = &mesh.faces()[2 * (i * s + j)];
        assert_eq!(face.indices(), &[i * s + j, (i + 1) * s + j, i * s]);
        let face = &mesh.faces()[2 * (i * s + j) + 1];
        assert_eq!(face.indices(), &[i * s, (i + 1) * s + j, (i + 1) * s]);

        // Seam edge wraps around.
        assert!(mesh.edges().contains(&Edge::new(i * s + j, i * s)));
    }

    #[test]
    fn test_uv_sphere_non_polar_faces_wound_outward() {
        let (s, r) = (10, 7);
        let mesh = uv_sphere(1.0, s, r).unwrap();
        let polar = |f: &Face| f.indices().iter().any(|&k| k < s || k >= (r - 1) * s);
        for face in mesh.faces().iter().filter(|f| !polar(f)) {
            let normal = mesh.face_normal(face);
            assert!(normal.dot(&mesh.face_centroid(face).coords) > 0.0);
        }
    }

    #[test]
    fn test_uv_sphere_pole_triangles_are_zero_area() {
        let (s, r) = (9, 5);
        let mesh = uv_sphere(1.5, s, r).unwrap();
        let north = mesh.vertices()[0];
        let south = mesh.vertices()[(r - 1) * s];
        assert!(mesh.vertices()[..s].iter().all(|v| *v == north));
        assert!(mesh.vertices()[(r - 1) * s..].iter().all(|v| *v == south));

        let is_pole = |k: usize| k < s || k >= (r - 1) * s;
        let pole_faces: Vec<&Face> = mesh
            .faces()
            .iter()
            .filter(|f| f.indices().iter().filter(|&&k| is_pole(k)).count() == 2)
            .collect();
        assert_eq!(pole_faces.len(), 2 * s);
        for face in pole_faces {
            assert_eq!(mesh.face_normal(face), Vector3::zeros());
            assert!(!mesh.is_face_visible(face, &Point3::new(0.0, 0.0, -10.0)));
            assert!(!mesh.is_face_visible(face, &Point3::new(0.0, 0.0, 10.0)));
        }
    }

    #[test]
    fn test_uv_sphere_rejects_small_parameters() {
        assert_eq!(
            uv_sphere(1.0, 2, 5),
            Err(PrimitiveError::TooFew {
                what: "segments",
                min: 3,
                got: 2
            })
        );
        assert!(uv_sphere(1.0, 8, 1).is_err());
    }

    #[test]
    fn test_revolve_cylinder() {
        let profile = [Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 2.0)];
        let mesh = revolve(&profile, Axis::Z, 12).unwrap();
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.faces().len(), 12);
        // Closed seam: 12 rungs plus two rings of 12.
        assert_eq!(mesh.edges().len(), 36);
        for face in mesh.faces() {
            let normal = mesh.face_normal(face);
            let radial = mesh.face_centroid(face).coords.xy();
            assert!(normal.xy().dot(&radial) > 0.0);
        }
    }

    #[test]
    fn test_revolve_cone_collapses_apex() {
        let profile = [Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 1.0, 1.0)];
        let mesh = revolve(&profile, Axis::X, 6).unwrap();
        assert_eq!(mesh.faces().len(), 6);
        assert!(mesh.faces().iter().all(|f| f.len() == 3));
    }

    #[test]
    fn test_function_surface_grid() {
        let mesh = function_surface((-1.0, 1.0), (-1.0, 1.0), 4, |x, y| SurfaceFunction::Saddle.eval(x, y))
            .unwrap();
        assert_eq!(mesh.vertex_count(), 25);
        assert_eq!(mesh.faces().len(), 16);
        assert_eq!(mesh.edges().len(), 2 * 4 * 5);
        assert_relative_eq!(mesh.vertices()[0], Point3::new(-1.0, -1.0, 0.0));
        assert_relative_eq!(mesh.vertices()[1], Point3::new(-1.0, -0.5, 0.75));

        let flat = function_surface((0.0, 1.0), (0.0, 1.0), 2, |_, _| 0.0).unwrap();
        for face in flat.faces() {
            assert!(flat.face_normal(face).z > 0.0);
        }
    }

    #[test]
    fn test_stock_surfaces() {
        for func in SurfaceFunction::ALL {
            let mesh = func.build();
            assert_eq!(mesh.vertex_count(), 25 * 25);
            assert_eq!(mesh.faces().len(), 24 * 24);
            assert_relative_eq!(mesh.vertices()[0], Point3::new(-PI, -PI, func.eval(-PI, -PI)));
        }
    }

    #[test]
    fn test_names_round_trip() {
        for p in Primitive::ALL {
            assert_eq!(p.to_string().parse::<Primitive>(), Ok(p));
        }
        assert_eq!("Cube".parse::<Primitive>(), Ok(Primitive::Cube));
        assert!("torus".parse::<Primitive>().is_err());
        assert_eq!("waves".parse::<SurfaceFunction>(), Ok(SurfaceFunction::Waves));
        assert_eq!("y".parse::<Axis>(), Ok(Axis::Y));
    }

    #[test]
    fn test_default_sphere() {
        let mesh = Primitive::Sphere.build();
        assert_eq!(mesh.vertex_count(), 20 * 21);
    }
}
