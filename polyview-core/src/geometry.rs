//! Mesh representation and in-place affine operators.
use std::collections::BTreeSet;

use log::trace;
use nalgebra::{Point3, Vector3};
use thiserror::Error;

use crate::transform::{Transform, TransformError};

/// Errors raised while building a mesh from raw index tables.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshError {
    #[error("vertex index {index} out of range for {vertex_count} vertices")]
    VertexIndexOutOfRange { index: usize, vertex_count: usize },
    #[error("face {face} has {len} vertices, at least 3 are required")]
    DegenerateFace { face: usize, len: usize },
}

/// An unordered pair of vertex indices. The smaller index is always stored first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    a: usize,
    b: usize,
}

impl Edge {
    pub fn new(a: usize, b: usize) -> Self {
        if a <= b {
            Self { a, b }
        } else {
            Self { a: b, b: a }
        }
    }

    pub fn a(&self) -> usize {
        self.a
    }

    pub fn b(&self) -> usize {
        self.b
    }
}

/// A planar polygon given as an ordered loop of vertex indices.
///
/// The winding is counter-clockwise seen from outside, so the cross product of the
/// first two edge vectors points outward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face {
    indices: Vec<usize>,
}

impl Face {
    pub fn new(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Consecutive index pairs, including the closing pair from last back to first.
    pub fn boundary(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.indices.len();
        (0..n).map(move |i| (self.indices[i], self.indices[(i + 1) % n]))
    }
}

impl From<Vec<usize>> for Face {
    fn from(indices: Vec<usize>) -> Self {
        Self::new(indices)
    }
}

/// Unique edges of a face list, in sorted order.
pub fn derive_edges(faces: &[Face]) -> Vec<Edge> {
    let edges: BTreeSet<Edge> = faces
        .iter()
        .flat_map(|face| face.boundary().map(|(a, b)| Edge::new(a, b)))
        .collect();
    edges.into_iter().collect()
}

/// A polyhedral mesh: vertices, edges and faces.
///
/// Every index held by an edge or a face is checked against the vertex count at
/// construction. Transform operators rewrite vertex positions in place and never
/// touch the index lists.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Point3<f64>>,
    edges: Vec<Edge>,
    faces: Vec<Face>,
}

impl Mesh {
    pub fn new(
        vertices: Vec<Point3<f64>>,
        edges: Vec<Edge>,
        faces: Vec<Face>,
    ) -> Result<Self, MeshError> {
        let vertex_count = vertices.len();
        let check = |index: usize| {
            if index < vertex_count {
                Ok(())
            } else {
                Err(MeshError::VertexIndexOutOfRange {
                    index,
                    vertex_count,
                })
            }
        };

        for edge in &edges {
            check(edge.a)?;
            check(edge.b)?;
        }
        for (i, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(MeshError::DegenerateFace {
                    face: i,
                    len: face.len(),
                });
            }
            for &index in face.indices() {
                check(index)?;
            }
        }

        Ok(Self {
            vertices,
            edges,
            faces,
        })
    }

    /// Build a mesh whose edge set is derived once from the face boundaries.
    pub fn from_faces(vertices: Vec<Point3<f64>>, faces: Vec<Face>) -> Result<Self, MeshError> {
        let edges = derive_edges(&faces);
        Self::new(vertices, edges, faces)
    }

    /// Build from hand-written tables that are known to be consistent.
    pub(crate) fn from_trusted_faces(vertices: Vec<Point3<f64>>, faces: Vec<Face>) -> Self {
        let edges = derive_edges(&faces);
        Self::from_trusted_parts(vertices, edges, faces)
    }

    pub(crate) fn from_trusted_parts(
        vertices: Vec<Point3<f64>>,
        edges: Vec<Edge>,
        faces: Vec<Face>,
    ) -> Self {
        debug_assert!(edges.iter().all(|e| e.b < vertices.len()));
        debug_assert!(faces
            .iter()
            .all(|f| f.len() >= 3 && f.indices().iter().all(|&i| i < vertices.len())));
        Self {
            vertices,
            edges,
            faces,
        }
    }

    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Mean of all vertex positions, `None` for an empty mesh.
    pub fn centroid(&self) -> Option<Point3<f64>> {
        if self.vertices.is_empty() {
            return None;
        }
        let sum = self
            .vertices
            .iter()
            .fold(Vector3::zeros(), |acc, v| acc + v.coords);
        Some(Point3::from(sum / self.vertices.len() as f64))
    }

    /// Unnormalized normal of a face: `(v1 - v0) x (v2 - v0)`.
    pub(crate) fn face_normal(&self, face: &Face) -> Vector3<f64> {
        let idx = face.indices();
        let v0 = self.vertices[idx[0]];
        let edge1 = self.vertices[idx[1]] - v0;
        let edge2 = self.vertices[idx[2]] - v0;
        edge1.cross(&edge2)
    }

    pub(crate) fn face_centroid(&self, face: &Face) -> Point3<f64> {
        let sum = face
            .indices()
            .iter()
            .fold(Vector3::zeros(), |acc, &i| acc + self.vertices[i].coords);
        Point3::from(sum / face.len() as f64)
    }

    /// Object-space backface test: the face is visible when its outward normal
    /// points toward `eye`. Zero-area faces are never visible.
    pub(crate) fn is_face_visible(&self, face: &Face, eye: &Point3<f64>) -> bool {
        let normal = self.face_normal(face);
        if normal.norm_squared() == 0.0 {
            trace!("culling zero-area face {:?}", face.indices());
            return false;
        }
        let view = eye - self.face_centroid(face);
        normal.dot(&view) > 0.0
    }

    pub fn translate(&mut self, dx: f64, dy: f64, dz: f64) {
        trace!("translate by ({dx}, {dy}, {dz})");
        self.apply_homogeneous(&Transform::translation_matrix(dx, dy, dz));
    }

    /// Scale about the current centroid, which stays fixed.
    pub fn scale(&mut self, sx: f64, sy: f64, sz: f64) {
        let Some(centroid) = self.centroid() else {
            return;
        };
        trace!("scale by ({sx}, {sy}, {sz}) about {centroid}");

        self.translate(-centroid.x, -centroid.y, -centroid.z);
        let scaling = Transform::scale_matrix(sx, sy, sz);
        self.apply_homogeneous(&scaling);
        self.translate(centroid.x, centroid.y, centroid.z);
    }

    /// Rotate by `angle` radians about `axis` through the coordinate origin.
    pub fn rotate(&mut self, angle: f64, axis: &Vector3<f64>) -> Result<(), TransformError> {
        let rotation = Transform::rotation_matrix(angle, axis)?;
        trace!("rotate by {angle} rad about {axis:?}");
        for vertex in &mut self.vertices {
            *vertex = rotation * *vertex;
        }
        Ok(())
    }

    /// Mirror the mesh through the plane with `normal` passing through `point`.
    ///
    /// Face windings are not corrected afterwards, so the mirrored faces turn inward
    /// and the backface test will draw the far side until the mesh is reflected again.
    pub fn reflect(
        &mut self,
        normal: &Vector3<f64>,
        point: &Point3<f64>,
    ) -> Result<(), TransformError> {
        let reflection = Transform::reflection_matrix(normal, point)?;
        trace!("reflect through plane n={normal:?} p={point}");
        self.apply_homogeneous(&reflection);
        Ok(())
    }

    /// Rotate by `angle` radians about the line through `p1` and `p2`.
    ///
    /// Equivalent to `translate(-p1)`, `rotate(angle, p2 - p1)`, `translate(p1)`.
    pub fn rotate_around_line(
        &mut self,
        p1: &Point3<f64>,
        p2: &Point3<f64>,
        angle: f64,
    ) -> Result<(), TransformError> {
        let axis = p2 - p1;
        if axis.norm_squared() == 0.0 {
            return Err(TransformError::ZeroAxis);
        }

        self.translate(-p1.x, -p1.y, -p1.z);
        self.rotate(angle, &axis)?;
        self.translate(p1.x, p1.y, p1.z);
        Ok(())
    }

    fn apply_homogeneous(&mut self, matrix: &nalgebra::Matrix4<f64>) {
        for vertex in &mut self.vertices {
            let h = matrix * vertex.to_homogeneous();
            *vertex = Point3::new(h.x, h.y, h.z);
        }
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            edges: Vec::new(),
            faces: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn triangle() -> Mesh {
        Mesh::from_faces(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![Face::new(vec![0, 1, 2])],
        )
        .unwrap()
    }

    #[test]
    fn test_edge_is_unordered() {
        assert_eq!(Edge::new(3, 1), Edge::new(1, 3));
        assert_eq!(Edge::new(3, 1).a(), 1);
    }

    #[test]
    fn test_face_boundary_wraps() {
        let face = Face::new(vec![4, 5, 6, 7]);
        let pairs: Vec<_> = face.boundary().collect();
        assert_eq!(pairs, vec![(4, 5), (5, 6), (6, 7), (7, 4)]);
    }

    #[test]
    fn test_derive_edges_deduplicates_shared_edges() {
        let faces = vec![Face::new(vec![0, 1, 2]), Face::new(vec![2, 1, 3])];
        let edges = derive_edges(&faces);
        assert_eq!(edges.len(), 5);
        assert!(edges.contains(&Edge::new(1, 2)));
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let result = Mesh::from_faces(
            vec![Point3::origin(); 3],
            vec![Face::new(vec![0, 1, 3])],
        );
        assert_eq!(
            result,
            Err(MeshError::VertexIndexOutOfRange {
                index: 3,
                vertex_count: 3
            })
        );
    }

    #[test]
    fn test_rejects_two_vertex_face() {
        let result = Mesh::new(vec![Point3::origin(); 2], vec![], vec![Face::new(vec![0, 1])]);
        assert!(matches!(result, Err(MeshError::DegenerateFace { face: 0, len: 2 })));
    }

    #[test]
    fn test_translate() {
        let mut mesh = triangle();
        mesh.translate(1.0, 2.0, 3.0);
        assert_relative_eq!(mesh.vertices()[1], Point3::new(2.0, 2.0, 3.0));
    }

    #[test]
    fn test_face_normal_and_visibility() {
        let mesh = triangle();
        let face = &mesh.faces()[0];
        assert_relative_eq!(mesh.face_normal(face), Vector3::new(0.0, 0.0, 1.0));
        assert!(mesh.is_face_visible(face, &Point3::new(0.0, 0.0, 5.0)));
        assert!(!mesh.is_face_visible(face, &Point3::new(0.0, 0.0, -5.0)));
        // Edge-on views are culled.
        assert!(!mesh.is_face_visible(face, &Point3::new(5.0, 5.0, 0.0)));
    }

    #[test]
    fn test_zero_area_face_is_never_visible() {
        let mesh = Mesh::from_faces(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)],
            vec![Face::new(vec![0, 1, 2])],
        )
        .unwrap();
        assert!(!mesh.is_face_visible(&mesh.faces()[0], &Point3::new(0.0, 0.0, 5.0)));
    }

    #[test]
    fn test_rotate_rejects_zero_axis_and_keeps_vertices() {
        let mut mesh = triangle();
        let before = mesh.clone();
        let result = mesh.rotate(1.0, &Vector3::zeros());
        assert!(matches!(result, Err(TransformError::ZeroAxis)));
        assert_eq!(mesh, before);
    }

    #[test]
    fn test_rotate_quarter_turn_about_z() {
        let mut mesh = triangle();
        mesh.rotate(std::f64::consts::FRAC_PI_2, &Vector3::new(0.0, 0.0, 2.0))
            .unwrap();
        assert_relative_eq!(mesh.vertices()[1], Point3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_empty_mesh_scale_is_noop() {
        let mut mesh = Mesh::default();
        mesh.scale(2.0, 2.0, 2.0);
        assert!(mesh.is_empty());
        assert!(mesh.centroid().is_none());
    }
}
