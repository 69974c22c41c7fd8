//! Wavefront OBJ reading and writing
//!
//! Reading keeps polygons as authored and splits the file into objects on
//! `o` statements. Vertex indices are remapped per object, so each object's
//! mesh only holds the vertices its faces use. Writing emits a reference
//! mesh with one `vt` per corner carrying that corner's pixel UV.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use glam::{Vec2, Vec3};
use hashbrown::HashMap;
use vat_bake::{PolygonLoop, ReferenceMesh, SampledMesh};

/// Name given to faces that appear before any `o` statement
pub const DEFAULT_OBJECT_NAME: &str = "Object";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ObjError {
    #[error("line {line}: malformed '{keyword}' statement")]
    Malformed { line: usize, keyword: String },

    #[error("line {line}: index {index} is out of range ({count} defined)")]
    IndexOutOfRange { line: usize, index: i64, count: usize },
}

/// One named object of an OBJ file
#[derive(Debug, Clone)]
pub struct ObjObject {
    pub name: String,
    pub mesh: SampledMesh,
}

/// Accumulates one object's faces, remapping file-wide vertex indices
struct ObjectBuilder {
    name: String,
    local: HashMap<usize, u32>,
    positions: Vec<Vec3>,
    normals: Vec<Option<Vec3>>,
    polygons: Vec<PolygonLoop>,
    corner_uvs: Vec<Vec2>,
    uvs_complete: bool,
}

impl ObjectBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            local: HashMap::new(),
            positions: Vec::new(),
            normals: Vec::new(),
            polygons: Vec::new(),
            corner_uvs: Vec::new(),
            uvs_complete: true,
        }
    }

    fn vertex(&mut self, global: usize, position: Vec3) -> u32 {
        if let Some(&local) = self.local.get(&global) {
            return local;
        }
        let local = self.positions.len() as u32;
        self.local.insert(global, local);
        self.positions.push(position);
        self.normals.push(None);
        local
    }

    fn finish(self) -> ObjObject {
        let computed = if self.normals.iter().any(Option::is_none) {
            vertex_normals(&self.positions, &self.polygons)
        } else {
            Vec::new()
        };
        let normals = self
            .normals
            .iter()
            .enumerate()
            .map(|(i, n)| n.unwrap_or_else(|| computed[i]))
            .collect();

        let mut mesh = SampledMesh::new(self.positions, normals, self.polygons);
        if self.uvs_complete && !self.corner_uvs.is_empty() {
            mesh = mesh.with_corner_uvs(self.corner_uvs);
        }
        ObjObject {
            name: self.name,
            mesh,
        }
    }
}

/// Area-weighted vertex normals from polygon loops (Newell's method)
fn vertex_normals(positions: &[Vec3], polygons: &[PolygonLoop]) -> Vec<Vec3> {
    let mut sums = vec![Vec3::ZERO; positions.len()];
    for polygon in polygons {
        let mut face = Vec3::ZERO;
        for (i, &a) in polygon.iter().enumerate() {
            let b = polygon[(i + 1) % polygon.len()];
            face += positions[a as usize].cross(positions[b as usize]);
        }
        for &v in polygon {
            sums[v as usize] += face;
        }
    }
    sums.into_iter().map(|n| n.normalize_or(Vec3::Z)).collect()
}

/// Resolve a 1-based (or negative, relative) OBJ index
fn resolve_index(raw: &str, count: usize, line: usize, keyword: &str) -> Result<usize, ObjError> {
    let index: i64 = raw.parse().map_err(|_| ObjError::Malformed {
        line,
        keyword: keyword.to_string(),
    })?;
    let resolved = if index > 0 {
        index - 1
    } else {
        count as i64 + index
    };
    if index == 0 || resolved < 0 || resolved >= count as i64 {
        return Err(ObjError::IndexOutOfRange { line, index, count });
    }
    Ok(resolved as usize)
}

fn parse_floats<const N: usize>(
    parts: &[&str],
    line: usize,
    keyword: &str,
) -> Result<[f32; N], ObjError> {
    let malformed = || ObjError::Malformed {
        line,
        keyword: keyword.to_string(),
    };
    if parts.len() < N {
        return Err(malformed());
    }
    let mut out = [0.0; N];
    for (value, part) in out.iter_mut().zip(parts) {
        *value = part.parse().map_err(|_| malformed())?;
    }
    Ok(out)
}

/// Parse OBJ text into its objects, in order of first appearance
pub fn parse_obj(text: &str) -> Result<Vec<ObjObject>, ObjError> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut tex_coords: Vec<Vec2> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut objects: Vec<ObjectBuilder> = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let line_number = number + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts[0] {
            "v" => {
                let [x, y, z] = parse_floats::<3>(&parts[1..], line_number, "v")?;
                positions.push(Vec3::new(x, y, z));
            }
            "vt" => {
                let [u, v] = parse_floats::<2>(&parts[1..], line_number, "vt")?;
                tex_coords.push(Vec2::new(u, v));
            }
            "vn" => {
                let [x, y, z] = parse_floats::<3>(&parts[1..], line_number, "vn")?;
                normals.push(Vec3::new(x, y, z));
            }
            "o" => {
                let name = parts[1..].join(" ");
                let name = if name.is_empty() {
                    DEFAULT_OBJECT_NAME
                } else {
                    name.as_str()
                };
                objects.push(ObjectBuilder::new(name));
            }
            "f" => {
                if parts.len() < 4 {
                    return Err(ObjError::Malformed {
                        line: line_number,
                        keyword: "f".to_string(),
                    });
                }
                if objects.is_empty() {
                    objects.push(ObjectBuilder::new(DEFAULT_OBJECT_NAME));
                }
                let Some(object) = objects.last_mut() else {
                    continue;
                };

                let mut polygon = PolygonLoop::new();
                for token in &parts[1..] {
                    let mut fields = token.split('/');
                    let vi = resolve_index(
                        fields.next().unwrap_or_default(),
                        positions.len(),
                        line_number,
                        "f",
                    )?;
                    let vti = match fields.next() {
                        Some(raw) if !raw.is_empty() => {
                            Some(resolve_index(raw, tex_coords.len(), line_number, "f")?)
                        }
                        _ => None,
                    };
                    let vni = match fields.next() {
                        Some(raw) if !raw.is_empty() => {
                            Some(resolve_index(raw, normals.len(), line_number, "f")?)
                        }
                        _ => None,
                    };

                    let local = object.vertex(vi, positions[vi]);
                    if let Some(ni) = vni {
                        object.normals[local as usize] = Some(normals[ni]);
                    }
                    match vti {
                        Some(ti) => object.corner_uvs.push(tex_coords[ti]),
                        None => object.uvs_complete = false,
                    }
                    polygon.push(local);
                }
                object.polygons.push(polygon);
            }
            // Groups, materials and smoothing are not needed for baking
            _ => {}
        }
    }

    Ok(objects.into_iter().map(ObjectBuilder::finish).collect())
}

/// Read and parse an OBJ file
pub fn read_obj(path: &Path) -> Result<Vec<ObjObject>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read OBJ: {}", path.display()))?;
    parse_obj(&text).with_context(|| format!("Failed to parse OBJ: {}", path.display()))
}

/// Write a reference mesh as OBJ, pixel UVs as the texture coordinates
pub fn write_obj<W: Write>(writer: &mut W, reference: &ReferenceMesh) -> std::io::Result<()> {
    writeln!(writer, "# VAT reference mesh, rest frame {}", reference.frame)?;
    let mut vertex_offset = 1;
    let mut uv_offset = 1;

    for object in &reference.objects {
        let mesh = &object.mesh;
        writeln!(writer, "o {}", object.name)?;
        for p in &mesh.positions {
            writeln!(writer, "v {} {} {}", p.x, p.y, p.z)?;
        }
        for n in &mesh.normals {
            writeln!(writer, "vn {} {} {}", n.x, n.y, n.z)?;
        }
        for uv in object.pixel_uvs() {
            writeln!(writer, "vt {} {}", uv.x, uv.y)?;
        }

        let mut corner = 0;
        for polygon in &mesh.polygons {
            write!(writer, "f")?;
            for &v in polygon {
                let v = vertex_offset + v as usize;
                write!(writer, " {}/{}/{}", v, uv_offset + corner, v)?;
                corner += 1;
            }
            writeln!(writer)?;
        }

        vertex_offset += mesh.vertex_count();
        uv_offset += mesh.corner_count();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vat_bake::ReferenceObject;

    const TWO_OBJECTS: &str = "\
# test file
o Quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 2/2 3/3 4/4
o Tri
v 5 0 0
v 6 0 0
v 5 1 0
vn 0 0 -1
f -3//1 -2//1 -1//1
";

    #[test]
    fn test_parse_splits_objects_and_remaps() {
        let objects = parse_obj(TWO_OBJECTS).unwrap();
        assert_eq!(objects.len(), 2);

        let quad = &objects[0];
        assert_eq!(quad.name, "Quad");
        assert_eq!(quad.mesh.vertex_count(), 4);
        assert_eq!(quad.mesh.polygons[0].as_slice(), &[0, 1, 2, 3]);
        assert_eq!(quad.mesh.corner_uvs.as_ref().unwrap()[2], Vec2::new(1.0, 1.0));

        let tri = &objects[1];
        assert_eq!(tri.name, "Tri");
        assert_eq!(tri.mesh.positions[0], Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(tri.mesh.polygons[0].as_slice(), &[0, 1, 2]);
        assert_eq!(tri.mesh.normals[1], Vec3::new(0.0, 0.0, -1.0));
        assert!(tri.mesh.corner_uvs.is_none());
    }

    #[test]
    fn test_missing_normals_are_computed() {
        let objects = parse_obj(TWO_OBJECTS).unwrap();
        for n in &objects[0].mesh.normals {
            assert!((*n - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn test_faces_without_object_get_default_name() {
        let objects = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].name, DEFAULT_OBJECT_NAME);
    }

    #[test]
    fn test_empty_object_is_kept() {
        let objects = parse_obj("o Empty\n").unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].mesh.vertex_count(), 0);
    }

    #[test]
    fn test_bad_index_reports_line() {
        let err = parse_obj("v 0 0 0\nv 1 0 0\nf 1 2 7\n").unwrap_err();
        assert_eq!(
            err,
            ObjError::IndexOutOfRange {
                line: 3,
                index: 7,
                count: 2
            }
        );
    }

    #[test]
    fn test_malformed_vertex() {
        let err = parse_obj("v 0 nope 0\n").unwrap_err();
        assert!(matches!(err, ObjError::Malformed { line: 1, .. }));
    }

    #[test]
    fn test_write_uses_pixel_uvs_per_corner() {
        let objects = parse_obj(TWO_OBJECTS).unwrap();
        let reference = ReferenceMesh {
            objects: objects
                .into_iter()
                .map(|o| {
                    let uvs = vec![Vec2::new(0.25, 0.5); o.mesh.corner_count()];
                    ReferenceObject::new(o.name, o.mesh, uvs)
                })
                .collect(),
            frame: 1,
        };

        let mut out = Vec::new();
        write_obj(&mut out, &reference).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("o Quad"));
        assert!(text.contains("f 1/1/1 2/2/2 3/3/3 4/4/4"));
        assert!(text.contains("f 5/5/5 6/6/6 7/7/7"));
        assert_eq!(text.matches("vt 0.25 0.5").count(), 7);

        // Round trip keeps topology
        let back = parse_obj(&text).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[1].mesh.vertex_count(), 3);
    }
}
