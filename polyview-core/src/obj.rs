//! OBJ-style mesh import and export.
//!
//! Only three line kinds are understood: `v x y z` (a missing `z` reads as 0),
//! `f i j k ...` and `l i j ...`, all with 1-based indices. Face tokens may carry
//! `/`-separated texture and normal indices, which are ignored. Every other line
//! is skipped.
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use log::info;
use nalgebra::Point3;
use nom::{
    bytes::complete::{tag, take_till},
    character::complete::{char, digit1, space0, space1},
    combinator::{all_consuming, map_res, opt},
    multi::many1,
    number::complete::double,
    sequence::{preceded, terminated},
    IResult,
};
use thiserror::Error;

use crate::geometry::{derive_edges, Edge, Face, Mesh, MeshError};

#[derive(Debug, Error)]
pub enum ObjError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: malformed `{keyword}` line")]
    Parse { line: usize, keyword: String },
    #[error("line {line}: vertex has {count} coordinates, expected 2 or 3")]
    VertexArity { line: usize, count: usize },
    #[error("line {line}: vertex index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        line: usize,
        index: usize,
        vertex_count: usize,
    },
    #[error("invalid mesh: {0}")]
    Mesh(#[from] MeshError),
}

fn coordinates(input: &str) -> IResult<&str, Vec<f64>> {
    preceded(tag("v"), many1(preceded(space1, double)))(input)
}

fn index_token(input: &str) -> IResult<&str, usize> {
    terminated(
        map_res(digit1, |digits: &str| digits.parse::<usize>()),
        opt(preceded(char('/'), take_till(|c: char| c.is_whitespace()))),
    )(input)
}

fn indices<'a>(keyword: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, Vec<usize>> {
    preceded(tag(keyword), many1(preceded(space1, index_token)))
}

/// Run `parser` over the whole of `line`, allowing trailing blanks.
fn parse_line<'a, O>(
    line: &'a str,
    number: usize,
    keyword: &str,
    parser: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> Result<O, ObjError> {
    all_consuming(terminated(parser, space0))(line)
        .map(|(_, out)| out)
        .map_err(|_| ObjError::Parse {
            line: number,
            keyword: keyword.to_string(),
        })
}

/// 1-based index tokens to 0-based indices, remembering the line for range checks.
fn zero_based(raw: Vec<usize>, line: usize, keyword: &str) -> Result<Vec<usize>, ObjError> {
    raw.into_iter()
        .map(|i| {
            i.checked_sub(1).ok_or_else(|| ObjError::Parse {
                line,
                keyword: keyword.to_string(),
            })
        })
        .collect()
}

/// Parse OBJ text into a mesh. Edges are the union of explicit `l` polylines
/// and the boundaries of every face.
pub fn parse_obj(text: &str) -> Result<Mesh, ObjError> {
    let mut vertices = Vec::new();
    let mut faces: Vec<(usize, Vec<usize>)> = Vec::new();
    let mut lines: Vec<(usize, Vec<usize>)> = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let number = i + 1;
        let line = raw.split('#').next().unwrap_or_default().trim();
        let Some(keyword) = line.split_whitespace().next() else {
            continue;
        };

        match keyword {
            "v" => {
                let coords = parse_line(line, number, keyword, coordinates)?;
                // `double` also reads `nan` and `inf`.
                if !coords.iter().all(|c| c.is_finite()) {
                    return Err(ObjError::Parse {
                        line: number,
                        keyword: keyword.to_string(),
                    });
                }
                let point = match coords[..] {
                    [x, y] => Point3::new(x, y, 0.0),
                    [x, y, z] => Point3::new(x, y, z),
                    _ => {
                        return Err(ObjError::VertexArity {
                            line: number,
                            count: coords.len(),
                        })
                    }
                };
                vertices.push(point);
            }
            "f" => {
                let raw = parse_line(line, number, keyword, indices("f"))?;
                faces.push((number, zero_based(raw, number, keyword)?));
            }
            "l" => {
                let raw = parse_line(line, number, keyword, indices("l"))?;
                lines.push((number, zero_based(raw, number, keyword)?));
            }
            _ => {}
        }
    }

    let vertex_count = vertices.len();
    for (line, list) in faces.iter().chain(lines.iter()) {
        if let Some(&index) = list.iter().find(|&&i| i >= vertex_count) {
            return Err(ObjError::IndexOutOfRange {
                line: *line,
                index: index + 1,
                vertex_count,
            });
        }
    }

    let faces: Vec<Face> = faces.into_iter().map(|(_, list)| Face::new(list)).collect();
    let mut edges: BTreeSet<Edge> = derive_edges(&faces).into_iter().collect();
    for (_, list) in &lines {
        edges.extend(list.windows(2).map(|pair| Edge::new(pair[0], pair[1])));
    }

    let mesh = Mesh::new(vertices, edges.into_iter().collect(), faces)?;
    info!(
        "loaded OBJ: {} vertices, {} faces, {} edges",
        mesh.vertex_count(),
        mesh.faces().len(),
        mesh.edges().len()
    );
    Ok(mesh)
}

pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Mesh, ObjError> {
    let text = fs::read_to_string(path)?;
    parse_obj(&text)
}

/// Format a mesh as OBJ text: vertices, then faces when the mesh has any,
/// otherwise one `l` line per edge.
pub fn to_obj_string(mesh: &Mesh) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    for v in mesh.vertices() {
        let _ = writeln!(out, "v {} {} {}", v.x, v.y, v.z);
    }
    if mesh.faces().is_empty() {
        for edge in mesh.edges() {
            let _ = writeln!(out, "l {} {}", edge.a() + 1, edge.b() + 1);
        }
    } else {
        for face in mesh.faces() {
            let tokens: Vec<String> = face.indices().iter().map(|i| (i + 1).to_string()).collect();
            let _ = writeln!(out, "f {}", tokens.join(" "));
        }
    }
    out
}

pub fn save_obj<P: AsRef<Path>>(mesh: &Mesh, path: P) -> Result<(), ObjError> {
    let path = path.as_ref();
    fs::write(path, to_obj_string(mesh))?;
    info!(
        "saved OBJ to {}: {} vertices, {} faces",
        path.display(),
        mesh.vertex_count(),
        mesh.faces().len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_faces_and_derive_edges() {
        let text = "\
# a square
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
f 1 2 3 4
";
        let mesh = parse_obj(text).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.faces()[0].indices(), &[0, 1, 2, 3]);
        assert_eq!(mesh.edges().len(), 4);
        assert!(mesh.edges().contains(&Edge::new(3, 0)));
    }

    #[test]
    fn test_face_tokens_with_slashes() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1/4/7 2//8 3/5\n";
        let mesh = parse_obj(text).unwrap();
        assert_eq!(mesh.faces()[0].indices(), &[0, 1, 2]);
    }

    #[test]
    fn test_two_coordinate_vertex_and_edge_lines() {
        let text = "v 1.5 -2\nv 0 0 1\nv 0 1 1\nl 1 2 3\n";
        let mesh = parse_obj(text).unwrap();
        assert_relative_eq!(mesh.vertices()[0], Point3::new(1.5, -2.0, 0.0));
        assert!(mesh.faces().is_empty());
        assert_eq!(mesh.edges(), &[Edge::new(0, 1), Edge::new(1, 2)]);
    }

    #[test]
    fn test_explicit_edges_merge_with_face_edges() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\nf 1 2 3\nl 1 4\nl 2 1\n";
        let mesh = parse_obj(text).unwrap();
        assert_eq!(mesh.edges().len(), 4);
    }

    #[test]
    fn test_out_of_range_index_is_fatal() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 4\n";
        match parse_obj(text) {
            Err(ObjError::IndexOutOfRange {
                line,
                index,
                vertex_count,
            }) => {
                assert_eq!((line, index, vertex_count), (4, 4, 3));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_zero_index_is_rejected() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n";
        assert!(matches!(parse_obj(text), Err(ObjError::Parse { line: 4, .. })));
    }

    #[test]
    fn test_vertex_arity() {
        assert!(matches!(
            parse_obj("v 1\n"),
            Err(ObjError::VertexArity { line: 1, count: 1 })
        ));
        assert!(matches!(
            parse_obj("v 1 2 3 4\n"),
            Err(ObjError::VertexArity { line: 1, count: 4 })
        ));
    }

    #[test]
    fn test_malformed_lines() {
        assert!(matches!(
            parse_obj("v 1 two 3\n"),
            Err(ObjError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            parse_obj("v 0 0 0\nf a b c\n"),
            Err(ObjError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_non_finite_coordinates_are_rejected() {
        assert!(matches!(
            parse_obj("v nan 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n"),
            Err(ObjError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            parse_obj("v 0 0 0\nv 1 inf 0\n"),
            Err(ObjError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 -infinity\n"),
            Err(ObjError::Parse { line: 3, .. })
        ));
    }

    #[test]
    fn test_faces_too_small_are_rejected() {
        let text = "v 0 0 0\nv 1 0 0\nf 1 2\n";
        assert!(matches!(
            parse_obj(text),
            Err(ObjError::Mesh(MeshError::DegenerateFace { .. }))
        ));
    }

    #[test]
    fn test_string_round_trip() {
        let mesh = primitives::icosahedron();
        let reloaded = parse_obj(&to_obj_string(&mesh)).unwrap();
        assert_eq!(reloaded, mesh);
    }

    #[test]
    fn test_edge_only_mesh_writes_l_lines() {
        let mesh = Mesh::new(
            vec![Point3::origin(), Point3::new(1.0, 2.0, 3.0)],
            vec![Edge::new(0, 1)],
            vec![],
        )
        .unwrap();
        assert_eq!(to_obj_string(&mesh), "v 0 0 0\nv 1 2 3\nl 1 2\n");
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_obj("/definitely/not/here.obj"),
            Err(ObjError::Io(_))
        ));
    }
}
