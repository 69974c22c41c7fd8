//! Per-frame sampling contract
//!
//! The baker never evaluates animation itself. It asks a [`MeshSource`] for
//! mesh snapshots and world transforms, strictly in increasing frame order
//! within a pass, and wraps the whole run in a [`BakeSession`] so the source
//! gets to clean up whatever transient state it created.

use glam::{Mat4, Quat, Vec2, Vec3};
use smallvec::SmallVec;

use crate::bounds::BoundsVolume;
use crate::error::{BakeError, Result};

/// Vertex indices of one polygon, in winding order
pub type PolygonLoop = SmallVec<[u32; 4]>;

/// One mesh snapshot of one object at one frame
///
/// Owned by the call that sampled it and dropped once consumed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampledMesh {
    pub positions: Vec<Vec3>,
    /// Parallel to `positions`
    pub normals: Vec<Vec3>,
    pub polygons: Vec<PolygonLoop>,
    /// Surface UVs per corner, in loop order (polygons concatenated)
    pub corner_uvs: Option<Vec<Vec2>>,
    /// Vertex pairs of edges flagged sharp
    pub sharp_edges: Vec<[u32; 2]>,
}

impl SampledMesh {
    pub fn new(positions: Vec<Vec3>, normals: Vec<Vec3>, polygons: Vec<PolygonLoop>) -> Self {
        Self {
            positions,
            normals,
            polygons,
            corner_uvs: None,
            sharp_edges: Vec::new(),
        }
    }

    pub fn with_corner_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.corner_uvs = Some(uvs);
        self
    }

    pub fn with_sharp_edges(mut self, edges: Vec<[u32; 2]>) -> Self {
        self.sharp_edges = edges;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn corner_count(&self) -> usize {
        self.polygons.iter().map(|p| p.len()).sum()
    }

    /// Triangles after fan triangulation
    pub fn triangle_count(&self) -> usize {
        self.polygons.iter().map(|p| p.len().saturating_sub(2)).sum()
    }

    /// `(corner_index, polygon_index, vertex)` in loop order
    pub fn corners(&self) -> impl Iterator<Item = (usize, usize, u32)> + '_ {
        self.polygons
            .iter()
            .enumerate()
            .flat_map(|(p, polygon)| polygon.iter().map(move |&v| (p, v)))
            .enumerate()
            .map(|(c, (p, v))| (c, p, v))
    }

    pub fn bounds(&self) -> BoundsVolume {
        BoundsVolume::from_points(self.positions.iter().copied())
    }

    /// Reject snapshots whose arrays disagree with each other
    pub fn validate(&self, object: usize, frame: i32) -> Result<()> {
        if self.normals.len() != self.positions.len() {
            return Err(BakeError::source(
                object,
                frame,
                format!(
                    "{} normals for {} vertices",
                    self.normals.len(),
                    self.positions.len()
                ),
            ));
        }
        let vertex_count = self.positions.len() as u32;
        if let Some(bad) = self
            .polygons
            .iter()
            .flat_map(|p| p.iter())
            .find(|&&v| v >= vertex_count)
        {
            return Err(BakeError::source(
                object,
                frame,
                format!("polygon references vertex {} of {}", bad, vertex_count),
            ));
        }
        if let Some(uvs) = &self.corner_uvs
            && uvs.len() != self.corner_count()
        {
            return Err(BakeError::source(
                object,
                frame,
                format!("{} corner UVs for {} corners", uvs.len(), self.corner_count()),
            ));
        }
        Ok(())
    }
}

/// Decomposed world transform of an object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl WorldTransform {
    pub const IDENTITY: WorldTransform = WorldTransform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Source of sampled animation data
///
/// Implementations must be deterministic for a fixed `(object, frame)` and
/// reflect every upstream deformation. A source may be stateful and only
/// valid for the frame it was last stepped to; the baker always calls
/// [`MeshSource::step_to`] before sampling a frame and never goes backwards
/// within a pass.
pub trait MeshSource {
    /// Number of selected objects; their order fixes their slot order
    fn object_count(&self) -> usize;

    fn object_name(&self, object: usize) -> String {
        format!("Object{}", object)
    }

    /// Mesh of `object` at `frame`, in world space
    fn sample(&mut self, object: usize, frame: i32) -> Result<SampledMesh>;

    fn world_transform(&mut self, object: usize, frame: i32) -> Result<WorldTransform>;

    /// Make `frame` the current frame (called for skipped frames too)
    fn step_to(&mut self, _frame: i32) -> Result<()> {
        Ok(())
    }

    /// Create transient state needed for baking
    fn begin_bake(&mut self) -> Result<()> {
        Ok(())
    }

    /// Remove everything `begin_bake` created; runs on success and failure
    fn end_bake(&mut self) {}
}

/// Scoped access to a [`MeshSource`] for the duration of one bake
///
/// Opening calls `begin_bake`; dropping steps the source back to the restore
/// frame and calls `end_bake`, whichever way the bake exits.
pub struct BakeSession<'a, S: MeshSource + ?Sized> {
    source: &'a mut S,
    current: Option<i32>,
    restore_frame: i32,
}

impl<'a, S: MeshSource + ?Sized> BakeSession<'a, S> {
    pub fn open(source: &'a mut S, restore_frame: i32) -> Result<Self> {
        source.begin_bake()?;
        Ok(Self {
            source,
            current: None,
            restore_frame,
        })
    }

    pub fn object_count(&self) -> usize {
        self.source.object_count()
    }

    pub fn object_name(&self, object: usize) -> String {
        self.source.object_name(object)
    }

    /// Step forward one frame at a time up to `frame`, or jump when rewinding
    pub fn advance_to(&mut self, frame: i32) -> Result<()> {
        match self.current {
            Some(current) if current == frame => {}
            Some(current) if current < frame => {
                for f in current + 1..=frame {
                    self.source.step_to(f)?;
                }
            }
            _ => self.source.step_to(frame)?,
        }
        self.current = Some(frame);
        Ok(())
    }

    pub fn sample(&mut self, object: usize, frame: i32) -> Result<SampledMesh> {
        self.advance_to(frame)?;
        let mesh = self.source.sample(object, frame)?;
        mesh.validate(object, frame)?;
        Ok(mesh)
    }

    /// Every object at `frame`, in selection order
    pub fn sample_all(&mut self, frame: i32) -> Result<Vec<SampledMesh>> {
        (0..self.object_count())
            .map(|object| self.sample(object, frame))
            .collect()
    }

    pub fn world_transform(&mut self, object: usize, frame: i32) -> Result<WorldTransform> {
        self.advance_to(frame)?;
        self.source.world_transform(object, frame)
    }

    /// Rewind to the start of a new pass
    pub fn rewind(&mut self) {
        self.current = None;
    }
}

impl<S: MeshSource + ?Sized> Drop for BakeSession<'_, S> {
    fn drop(&mut self) {
        if let Err(e) = self.source.step_to(self.restore_frame) {
            tracing::warn!("Failed to restore frame {}: {}", self.restore_frame, e);
        }
        self.source.end_bake();
    }
}
