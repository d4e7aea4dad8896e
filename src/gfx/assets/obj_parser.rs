//! Geometry description parser
//!
//! Reads `v`, `vn`, `vt`, `f` and `usemtl` records into one
//! [`MeshPartition`] per material group. Faces are fan-triangulated and each
//! partition deduplicates its corners by (position, normal, texcoord) index,
//! so partition indices are dense over the partition's own vertex list.

use std::{collections::HashMap, io::BufRead};

use crate::{
    error::{Result, ViewerError},
    gfx::scene::vertex::Vertex3D,
};

/// One face corner, 0-based indices into the file-global lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceVertex {
    pub position: u32,
    pub texcoord: Option<u32>,
    pub normal: Option<u32>,
}

/// Geometry accumulated under one material
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshPartition {
    pub material: String,
    pub vertices: Vec<Vertex3D>,
    pub indices: Vec<u32>,
}

impl MeshPartition {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Parsed geometry and the sizes of the file-global attribute lists
#[derive(Debug, Clone, Default)]
pub struct GeometrySet {
    pub partitions: Vec<MeshPartition>,
    pub position_count: usize,
    pub normal_count: usize,
    pub texcoord_count: usize,
}

/// Corners of triangles not yet flushed into a partition
#[derive(Default)]
struct PendingGroup {
    material: String,
    corners: Vec<FaceVertex>,
}

struct GeometryParser {
    scale_divisor: f32,
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,
    pending: PendingGroup,
    partitions: Vec<MeshPartition>,
}

/// Parses a geometry stream, dividing every position by `scale_divisor`
pub fn parse_geometry(input: impl BufRead, scale_divisor: f32) -> Result<GeometrySet> {
    let mut parser = GeometryParser {
        scale_divisor,
        positions: Vec::new(),
        normals: Vec::new(),
        texcoords: Vec::new(),
        pending: PendingGroup::default(),
        partitions: Vec::new(),
    };

    for (index, line) in input.lines().enumerate() {
        let line_number = index + 1;
        let line = line.map_err(|e| malformed(line_number, format!("unreadable line: {}", e)))?;
        parser.parse_line(&line, line_number)?;
    }

    parser.flush();

    log::info!(
        "Parsed geometry: {} objects, {} vertices, {} normals, {} texture coords",
        parser.partitions.len(),
        parser.positions.len(),
        parser.normals.len(),
        parser.texcoords.len()
    );

    Ok(GeometrySet {
        partitions: parser.partitions,
        position_count: parser.positions.len(),
        normal_count: parser.normals.len(),
        texcoord_count: parser.texcoords.len(),
    })
}

impl GeometryParser {
    fn parse_line(&mut self, line: &str, line_number: usize) -> Result<()> {
        let mut tokens = line.split_whitespace();
        let Some(directive) = tokens.next() else {
            return Ok(());
        };
        if directive.starts_with('#') {
            return Ok(());
        }
        let operands: Vec<&str> = tokens.collect();

        match directive {
            "v" => {
                let [x, y, z] = floats::<3>(&operands, line_number, directive)?;
                let s = self.scale_divisor;
                self.positions.push([x / s, y / s, z / s]);
            }
            "vn" => {
                let normal = floats::<3>(&operands, line_number, directive)?;
                self.normals.push(normal);
            }
            "vt" => {
                // u, optional v, optional w; only (u, v) is kept
                if operands.is_empty() || operands.len() > 3 {
                    return Err(malformed(
                        line_number,
                        format!("vt expects 1 to 3 operands, found {}", operands.len()),
                    ));
                }
                let mut uv = [0.0f32; 2];
                for (slot, op) in uv.iter_mut().zip(operands.iter()) {
                    *slot = parse_float(op, line_number, directive)?;
                }
                if let Some(w) = operands.get(2) {
                    parse_float(w, line_number, directive)?;
                }
                self.texcoords.push(uv);
            }
            "f" => self.parse_face(&operands, line_number)?,
            "usemtl" => {
                let name = operands
                    .first()
                    .ok_or_else(|| malformed(line_number, "usemtl without a name".to_string()))?;
                self.flush();
                self.pending.material = name.to_string();
            }
            "s" | "g" | "mtllib" | "o" | "l" => {}
            other => {
                return Err(ViewerError::UnknownLineType {
                    line: line_number,
                    token: other.to_string(),
                })
            }
        }

        Ok(())
    }

    fn parse_face(&mut self, operands: &[&str], line_number: usize) -> Result<()> {
        if operands.len() < 3 {
            return Err(malformed(
                line_number,
                format!("face needs at least 3 vertices, found {}", operands.len()),
            ));
        }

        let corners = operands
            .iter()
            .map(|token| self.parse_face_vertex(token, line_number))
            .collect::<Result<Vec<_>>>()?;

        for triangle in fan_triangulate(corners.len()) {
            self.pending
                .corners
                .extend(triangle.iter().map(|&i| corners[i]));
        }

        Ok(())
    }

    /// `p`, `p/t`, `p//n` or `p/t/n`, 1-based or negative (relative)
    fn parse_face_vertex(&self, token: &str, line_number: usize) -> Result<FaceVertex> {
        let mut parts = token.split('/');
        let position = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| malformed(line_number, format!("face vertex '{}' has no position", token)))?;
        let texcoord = parts.next().filter(|t| !t.is_empty());
        let normal = parts.next().filter(|n| !n.is_empty());
        if parts.next().is_some() {
            return Err(malformed(
                line_number,
                format!("face vertex '{}' has too many components", token),
            ));
        }

        Ok(FaceVertex {
            position: resolve_index(position, self.positions.len(), line_number)?,
            texcoord: texcoord
                .map(|t| resolve_index(t, self.texcoords.len(), line_number))
                .transpose()?,
            normal: normal
                .map(|n| resolve_index(n, self.normals.len(), line_number))
                .transpose()?,
        })
    }

    /// Closes the pending material group into a partition. Empty groups
    /// produce nothing.
    fn flush(&mut self) {
        let group = std::mem::take(&mut self.pending);
        if group.corners.is_empty() {
            self.pending.material = group.material;
            return;
        }

        let mut emitted: HashMap<FaceVertex, u32> = HashMap::new();
        let mut partition = MeshPartition {
            material: group.material.clone(),
            vertices: Vec::new(),
            indices: Vec::with_capacity(group.corners.len()),
        };

        for corner in &group.corners {
            let index = *emitted.entry(*corner).or_insert_with(|| {
                partition.vertices.push(self.vertex(corner));
                (partition.vertices.len() - 1) as u32
            });
            partition.indices.push(index);
        }

        log::debug!(
            "Partition '{}': {} vertices, {} triangles",
            partition.material,
            partition.vertices.len(),
            partition.triangle_count()
        );

        self.partitions.push(partition);
        self.pending.material = group.material;
    }

    fn vertex(&self, corner: &FaceVertex) -> Vertex3D {
        Vertex3D {
            position: self.positions[corner.position as usize],
            normal: corner
                .normal
                .map(|n| self.normals[n as usize])
                .unwrap_or([0.0; 3]),
            tex_coords: corner
                .texcoord
                .map(|t| self.texcoords[t as usize])
                .unwrap_or([0.0; 2]),
        }
    }
}

/// Triangles (0, i, i + 1) for i in 1..k-1
pub fn fan_triangulate(vertex_count: usize) -> impl Iterator<Item = [usize; 3]> {
    (1..vertex_count.saturating_sub(1)).map(|i| [0, i, i + 1])
}

fn resolve_index(token: &str, len: usize, line: usize) -> Result<u32> {
    let raw: i64 = token
        .parse()
        .map_err(|_| malformed(line, format!("face index '{}' is not an integer", token)))?;

    let resolved = match raw {
        0 => None,
        r if r > 0 => Some(r - 1),
        r => Some(len as i64 + r),
    };

    match resolved {
        Some(i) if i >= 0 && (i as usize) < len => Ok(i as u32),
        _ => Err(malformed(
            line,
            format!("face index {} out of range for {} entries", raw, len),
        )),
    }
}

fn malformed(line: usize, reason: String) -> ViewerError {
    ViewerError::MalformedGeometryRecord { line, reason }
}

fn parse_float(token: &str, line: usize, directive: &str) -> Result<f32> {
    token
        .parse::<f32>()
        .map_err(|_| malformed(line, format!("{} operand '{}' is not a number", directive, token)))
}

fn floats<const N: usize>(operands: &[&str], line: usize, directive: &str) -> Result<[f32; N]> {
    if operands.len() != N {
        return Err(malformed(
            line,
            format!("{} expects {} operands, found {}", directive, N, operands.len()),
        ));
    }
    let mut values = [0.0f32; N];
    for (value, op) in values.iter_mut().zip(operands) {
        *value = parse_float(op, line, directive)?;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<GeometrySet> {
        parse_geometry(text.as_bytes(), 1.0)
    }

    const QUAD: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
";

    #[test]
    fn test_fan_triangulation_shares_first_vertex() {
        for k in 3..9 {
            let triangles: Vec<_> = fan_triangulate(k).collect();
            assert_eq!(triangles.len(), k - 2);
            assert!(triangles.iter().all(|t| t[0] == 0));
        }
        assert_eq!(fan_triangulate(2).count(), 0);
    }

    #[test]
    fn test_quad_becomes_two_triangles() {
        let set = parse(&format!("{}f 1 2 3 4\n", QUAD)).unwrap();
        assert_eq!(set.partitions.len(), 1);
        assert_eq!(set.partitions[0].indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(set.partitions[0].vertices.len(), 4);
    }

    #[test]
    fn test_positions_are_scaled() {
        let set = parse_geometry(format!("{}f 1 2 3\n", QUAD).as_bytes(), 100.0).unwrap();
        assert_eq!(set.partitions[0].vertices[1].position, [0.01, 0.0, 0.0]);
    }

    #[test]
    fn test_face_reference_forms() {
        let text = format!(
            "{}vn 0 0 1\nvt 0.5 0.25\nf 1/1/1 2//1 3/1 4\n",
            QUAD
        );
        let set = parse(&text).unwrap();
        let vertices = &set.partitions[0].vertices;
        assert_eq!(vertices[0].normal, [0.0, 0.0, 1.0]);
        assert_eq!(vertices[0].tex_coords, [0.5, 0.25]);
        assert_eq!(vertices[1].normal, [0.0, 0.0, 1.0]);
        assert_eq!(vertices[1].tex_coords, [0.0, 0.0]);
        assert_eq!(vertices[2].normal, [0.0; 3]);
        assert_eq!(vertices[2].tex_coords, [0.5, 0.25]);
        assert_eq!(vertices[3].normal, [0.0; 3]);
    }

    #[test]
    fn test_negative_indices_are_relative() {
        let set = parse(&format!("{}f -4 -3 -2\n", QUAD)).unwrap();
        assert_eq!(set.partitions[0].vertices[2].position, [1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_identical_triples_are_deduplicated() {
        let text = format!("{}f 1 2 3\nf 1 3 4\nf 3 2 1\n", QUAD);
        let set = parse(&text).unwrap();
        let partition = &set.partitions[0];
        assert_eq!(partition.vertices.len(), 4);
        assert_eq!(partition.indices, vec![0, 1, 2, 0, 2, 3, 2, 1, 0]);
    }

    #[test]
    fn test_same_position_different_normal_is_distinct() {
        let text = format!("{}vn 0 0 1\nvn 0 0 -1\nf 1//1 2//1 3//1\nf 1//2 3//2 4//2\n", QUAD);
        let partition = &parse(&text).unwrap().partitions[0];
        assert_eq!(partition.vertices.len(), 6);
    }

    #[test]
    fn test_material_switch_splits_partitions() {
        let text = format!(
            "{}usemtl first\nf 1 2 3\nusemtl second\nf 3 4 1\nf 1 2 3\n",
            QUAD
        );
        let set = parse(&text).unwrap();
        assert_eq!(set.partitions.len(), 2);
        assert_eq!(set.partitions[0].material, "first");
        assert_eq!(set.partitions[1].material, "second");

        // Each partition indexes its own vertex list
        for partition in &set.partitions {
            let max = *partition.indices.iter().max().unwrap();
            assert_eq!(max as usize + 1, partition.vertices.len());
        }
        assert_eq!(set.partitions[1].vertices[0].position, [1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_leading_usemtl_only_sets_material() {
        let text = format!("usemtl a\nusemtl b\n{}f 1 2 3\n", QUAD);
        let set = parse(&text).unwrap();
        assert_eq!(set.partitions.len(), 1);
        assert_eq!(set.partitions[0].material, "b");
    }

    #[test]
    fn test_ignorable_records() {
        let text = format!(
            "# comment\nmtllib scene.mtl\no thing\ng group\ns off\nl 1 2\n\n{}f 1 2 3\n",
            QUAD
        );
        assert_eq!(parse(&text).unwrap().partitions.len(), 1);
    }

    #[test]
    fn test_unknown_directive_is_fatal() {
        match parse("v 0 0 0\ncurv 0 1 1 2\n") {
            Err(ViewerError::UnknownLineType { line, token }) => {
                assert_eq!(line, 2);
                assert_eq!(token, "curv");
            }
            other => panic!("expected UnknownLineType, got {:?}", other.map(|s| s.partitions)),
        }
    }

    #[test]
    fn test_out_of_range_face_index() {
        assert!(matches!(
            parse(&format!("{}f 1 2 9\n", QUAD)),
            Err(ViewerError::MalformedGeometryRecord { line: 5, .. })
        ));
        assert!(matches!(
            parse(&format!("{}f 1 2\n", QUAD)),
            Err(ViewerError::MalformedGeometryRecord { .. })
        ));
    }

    #[test]
    fn test_empty_input_has_no_partitions() {
        let set = parse("").unwrap();
        assert!(set.partitions.is_empty());
    }
}
