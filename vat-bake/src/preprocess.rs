//! Mesh topology operations used while building reference meshes
//!
//! Both operations preserve polygon order and corner order, which is what
//! lets a baker line up corners of a rest-pose mesh with corners of a live
//! frame.

use glam::Vec2;
use hashbrown::{HashMap, HashSet};
use smallvec::smallvec;

use crate::sampler::{PolygonLoop, SampledMesh};

/// Mesh whose vertices were duplicated along split edges
#[derive(Debug, Clone, PartialEq)]
pub struct SplitMesh {
    pub mesh: SampledMesh,
    /// For every output vertex, the input vertex it was copied from
    pub source_vertex: Vec<u32>,
}

/// Topology operations on sampled meshes
pub trait MeshPreprocessor {
    /// Split every polygon into triangles; polygon `i`'s triangles stay
    /// contiguous and in input order
    fn triangulate(&self, mesh: &SampledMesh) -> SampledMesh;

    /// Give corners their own vertices across split edges
    ///
    /// `split_all` splits every edge (one vertex per corner); otherwise only
    /// edges flagged sharp are split.
    fn split_hard_edges(&self, mesh: &SampledMesh, split_all: bool) -> SplitMesh;
}

/// In-process implementation: fan triangulation and union-find edge splitting
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicPreprocessor;

impl MeshPreprocessor for BasicPreprocessor {
    fn triangulate(&self, mesh: &SampledMesh) -> SampledMesh {
        let mut polygons: Vec<PolygonLoop> = Vec::with_capacity(mesh.triangle_count());
        let mut uvs: Vec<Vec2> = Vec::new();

        let mut corner_base = 0;
        for polygon in &mesh.polygons {
            let n = polygon.len();
            if n >= 3 {
                for i in 1..n - 1 {
                    polygons.push(smallvec![polygon[0], polygon[i], polygon[i + 1]]);
                    if let Some(src) = &mesh.corner_uvs {
                        uvs.extend([0, i, i + 1].map(|k| src[corner_base + k]));
                    }
                }
            }
            corner_base += n;
        }

        SampledMesh {
            positions: mesh.positions.clone(),
            normals: mesh.normals.clone(),
            polygons,
            corner_uvs: mesh.corner_uvs.as_ref().map(|_| uvs),
            sharp_edges: mesh.sharp_edges.clone(),
        }
    }

    fn split_hard_edges(&self, mesh: &SampledMesh, split_all: bool) -> SplitMesh {
        let corners: Vec<(usize, u32)> = mesh.corners().map(|(_, p, v)| (p, v)).collect();

        // Corners sharing a smooth edge around the same vertex share a vertex
        let mut groups = UnionFind::new(corners.len());
        if !split_all {
            let sharp: HashSet<(u32, u32)> = mesh
                .sharp_edges
                .iter()
                .map(|&[a, b]| (a.min(b), a.max(b)))
                .collect();

            let mut edge_owner: HashMap<(u32, u32), usize> = HashMap::new();
            let mut corner = 0;
            for polygon in &mesh.polygons {
                let n = polygon.len();
                for k in 0..n {
                    let v = polygon[k];
                    let neighbours = [polygon[(k + n - 1) % n], polygon[(k + 1) % n]];
                    for w in neighbours {
                        if w == v || sharp.contains(&(v.min(w), v.max(w))) {
                            continue;
                        }
                        match edge_owner.get(&(v, w)) {
                            Some(&owner) => groups.union(corner + k, owner),
                            None => {
                                edge_owner.insert((v, w), corner + k);
                            }
                        }
                    }
                }
                corner += n;
            }
        }

        let mut positions = Vec::with_capacity(corners.len());
        let mut normals = Vec::with_capacity(corners.len());
        let mut source_vertex = Vec::with_capacity(corners.len());
        let mut new_index: HashMap<usize, u32> = HashMap::new();
        let mut referenced = vec![false; mesh.vertex_count()];
        let mut polygons: Vec<PolygonLoop> = mesh
            .polygons
            .iter()
            .map(|p| PolygonLoop::with_capacity(p.len()))
            .collect();

        for (c, &(p, v)) in corners.iter().enumerate() {
            let root = groups.find(c);
            let index = *new_index.entry(root).or_insert_with(|| {
                positions.push(mesh.positions[v as usize]);
                normals.push(mesh.normals[v as usize]);
                source_vertex.push(v);
                (positions.len() - 1) as u32
            });
            referenced[v as usize] = true;
            polygons[p].push(index);
        }

        // Loose vertices keep a slot at the end
        for (v, used) in referenced.iter().enumerate() {
            if !used {
                positions.push(mesh.positions[v]);
                normals.push(mesh.normals[v]);
                source_vertex.push(v as u32);
            }
        }

        let sharp_edges = if split_all {
            Vec::new()
        } else {
            remap_sharp_edges(&polygons, &source_vertex, &mesh.sharp_edges)
        };

        SplitMesh {
            mesh: SampledMesh {
                positions,
                normals,
                polygons,
                corner_uvs: mesh.corner_uvs.clone(),
                sharp_edges,
            },
            source_vertex,
        }
    }
}

/// Carry sharp flags over to the split polygons' edges
fn remap_sharp_edges(
    polygons: &[PolygonLoop],
    source_vertex: &[u32],
    sharp_edges: &[[u32; 2]],
) -> Vec<[u32; 2]> {
    if sharp_edges.is_empty() {
        return Vec::new();
    }
    let sharp: HashSet<(u32, u32)> = sharp_edges
        .iter()
        .map(|&[a, b]| (a.min(b), a.max(b)))
        .collect();

    let mut out = HashSet::new();
    for polygon in polygons {
        let n = polygon.len();
        for k in 0..n {
            let (a, b) = (polygon[k], polygon[(k + 1) % n]);
            let (sa, sb) = (source_vertex[a as usize], source_vertex[b as usize]);
            if sharp.contains(&(sa.min(sb), sa.max(sb))) {
                out.insert([a.min(b), a.max(b)]);
            }
        }
    }
    let mut edges: Vec<[u32; 2]> = out.into_iter().collect();
    edges.sort_unstable();
    edges
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Lower root wins so vertex numbering follows corner order
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}
