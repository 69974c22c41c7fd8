//! Baker entry point and the pieces shared between bakers
//!
//! Every baker runs the same two-pass shape: a pre-pass that samples each
//! frame once to find peak element counts, bounds and the reference frame,
//! then a data pass that samples each frame again and writes raw values into
//! [`RawChannel`](crate::normalize::RawChannel)s sized from the pre-pass.
//! Normalization runs once after the data pass.

mod deformation;
mod rigid;
mod surface;


use std::fmt;
use std::str::FromStr;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::bounds::BoundsVolume;
use crate::buffer::PixelBuffer;
use crate::config::BakeConfig;
use crate::convention::CoordinateConvention;
use crate::error::{BakeError, Result};
use crate::frames::FramePlan;
use crate::lod::{LodEntry, build_ladder};
use crate::metadata::VatMetadata;
use crate::preprocess::{BasicPreprocessor, MeshPreprocessor};
use crate::reference::{ReferenceMesh, UvLayer};
use crate::sampler::{BakeSession, MeshSource, SampledMesh};

/// Animation regime, which selects the baker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VatKind {
    /// Fixed topology, per-vertex motion
    SoftBody,
    /// Rigid objects, per-object transforms
    RigidBody,
    /// Changing topology, per-corner lookup
    Fluid,
}

impl VatKind {
    pub const fn name(self) -> &'static str {
        match self {
            VatKind::SoftBody => "softbody",
            VatKind::RigidBody => "rigidbody",
            VatKind::Fluid => "fluid",
        }
    }
}

impl fmt::Display for VatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VatKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "softbody" | "soft_body" | "deformation" => Ok(VatKind::SoftBody),
            "rigidbody" | "rigid_body" | "rigid" => Ok(VatKind::RigidBody),
            "fluid" | "dynamic" | "surface" => Ok(VatKind::Fluid),
            other => Err(format!("unknown VAT kind '{}'", other)),
        }
    }
}

/// Pipeline stages, logged as the bake moves through them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeStage {
    Idle,
    PrePass,
    DataPass,
    Normalize,
    Done,
    Failed,
}

/// Everything a bake produces
#[derive(Debug, Clone)]
pub struct BakeResult {
    pub kind: VatKind,
    /// Normalized positions (or translation deltas)
    pub position: PixelBuffer,
    /// Unsigned normals, or rotation quaternions for rigid bakes
    pub rotation: PixelBuffer,
    /// Rigid bakes with separate scale packing only
    pub scale: Option<PixelBuffer>,
    /// Fluid bakes only
    pub lookup: Option<PixelBuffer>,
    pub reference: ReferenceMesh,
    pub metadata: VatMetadata,
    pub lods: Vec<LodEntry>,
}

/// Bake with the in-process [`BasicPreprocessor`]
pub fn bake<S: MeshSource + ?Sized>(
    kind: VatKind,
    source: &mut S,
    config: &BakeConfig,
) -> Result<BakeResult> {
    bake_with(kind, source, &BasicPreprocessor, config)
}

/// Run the baker for `kind` over every object of `source`
///
/// Validation happens before the source is touched. The source is wrapped in
/// a [`BakeSession`] for the whole run, so it is restored to the range start
/// and cleaned up whether the bake succeeds or fails.
pub fn bake_with<S: MeshSource + ?Sized>(
    kind: VatKind,
    source: &mut S,
    preprocessor: &dyn MeshPreprocessor,
    config: &BakeConfig,
) -> Result<BakeResult> {
    config.validate(kind)?;
    let plan = FramePlan::new(config.range, config.max_frames)?;
    if source.object_count() == 0 {
        return Err(BakeError::invalid_input("no objects selected"));
    }

    tracing::info!(
        "Baking {} VAT: {} objects, {} frames ({}..={} step {})",
        kind,
        source.object_count(),
        plan.count,
        plan.range.start,
        plan.last_frame(),
        plan.range.spacing
    );

    let mut stages = StageLog::new(kind);
    let result = {
        let mut session = BakeSession::open(source, config.range.start)?;
        let ctx = BakeContext {
            config,
            plan: &plan,
            convention: config.convention(),
            preprocessor,
        };
        match kind {
            VatKind::SoftBody => deformation::bake(&mut session, &ctx, &mut stages),
            VatKind::RigidBody => rigid::bake(&mut session, &ctx, &mut stages),
            VatKind::Fluid => surface::bake(&mut session, &ctx, &mut stages),
        }
    };

    match result {
        Ok(mut result) => {
            result.lods = build_ladder(&config.lods, &config.outputs.mesh.file_stem());
            stages.enter(BakeStage::Done);
            Ok(result)
        }
        Err(e) => {
            stages.enter(BakeStage::Failed);
            tracing::warn!("{} bake failed: {}", kind, e);
            Err(e)
        }
    }
}

/// Borrowed inputs every baker needs
struct BakeContext<'a> {
    config: &'a BakeConfig,
    plan: &'a FramePlan,
    convention: CoordinateConvention,
    preprocessor: &'a dyn MeshPreprocessor,
}

struct StageLog {
    kind: VatKind,
    stage: BakeStage,
}

impl StageLog {
    fn new(kind: VatKind) -> Self {
        Self {
            kind,
            stage: BakeStage::Idle,
        }
    }

    fn enter(&mut self, stage: BakeStage) {
        tracing::info!("{} bake: {:?} -> {:?}", self.kind, self.stage, stage);
        self.stage = stage;
    }
}

/// Element counts of one sampled frame
#[derive(Debug, Clone, PartialEq, Eq)]
struct FrameCounts {
    frame: i32,
    vertices: usize,
    triangles: usize,
    /// Vertex count of each object
    object_vertices: Vec<usize>,
}

impl FrameCounts {
    fn of(frame: i32, meshes: &[SampledMesh]) -> Self {
        let object_vertices: Vec<usize> = meshes.iter().map(SampledMesh::vertex_count).collect();
        Self {
            frame,
            vertices: object_vertices.iter().sum(),
            triangles: meshes.iter().map(SampledMesh::triangle_count).sum(),
            object_vertices,
        }
    }

    fn same_topology(&self, other: &FrameCounts) -> bool {
        self.vertices == other.vertices
            && self.triangles == other.triangles
            && self.object_vertices == other.object_vertices
    }

    fn drift_from(&self, expected: &FrameCounts) -> BakeError {
        BakeError::TopologyDrift {
            frame: self.frame,
            expected_vertices: expected.vertices,
            found_vertices: self.vertices,
            expected_triangles: expected.triangles,
            found_triangles: self.triangles,
        }
    }
}

/// What the mesh pre-pass learned about the animation
#[derive(Debug, Clone)]
struct MeshSurvey {
    /// Counts of every sampled frame, in order
    frames: Vec<FrameCounts>,
    /// Frame with the most triangles (earliest on ties)
    rest_frame: i32,
    peak_vertices: usize,
    peak_triangles: usize,
    /// Bounds of every converted position over every sampled frame
    live_bounds: BoundsVolume,
}

impl MeshSurvey {
    fn first(&self) -> &FrameCounts {
        &self.frames[0]
    }

    fn counts_at(&self, frame: i32) -> Option<&FrameCounts> {
        self.frames.iter().find(|counts| counts.frame == frame)
    }
}

/// Sample every planned frame once
fn survey_meshes<S: MeshSource + ?Sized>(
    session: &mut BakeSession<'_, S>,
    ctx: &BakeContext<'_>,
) -> Result<MeshSurvey> {
    let mut survey = MeshSurvey {
        frames: Vec::with_capacity(ctx.plan.count),
        rest_frame: ctx.plan.range.start,
        peak_vertices: 0,
        peak_triangles: 0,
        live_bounds: BoundsVolume::new(),
    };
    let mut rest_triangles = None;

    session.rewind();
    for (_, frame) in ctx.plan.frames() {
        let meshes = session.sample_all(frame)?;
        let counts = FrameCounts::of(frame, &meshes);
        tracing::debug!(
            "Frame {}: {} vertices, {} triangles",
            frame,
            counts.vertices,
            counts.triangles
        );

        if rest_triangles.is_none_or(|most| counts.triangles > most) {
            rest_triangles = Some(counts.triangles);
            survey.rest_frame = frame;
        }
        survey.peak_vertices = survey.peak_vertices.max(counts.vertices);
        survey.peak_triangles = survey.peak_triangles.max(counts.triangles);
        for mesh in &meshes {
            for &p in &mesh.positions {
                survey.live_bounds.update(ctx.convention.convert(p));
            }
        }
        survey.frames.push(counts);
    }

    if survey.frames.is_empty() {
        return Err(BakeError::invalid_input("frame range samples no frames"));
    }
    if survey.peak_vertices == 0 {
        return Err(BakeError::invalid_input("selected objects have no vertices"));
    }
    tracing::info!(
        "Rest frame {}: peak {} vertices, {} triangles",
        survey.rest_frame,
        survey.peak_vertices,
        survey.peak_triangles
    );
    Ok(survey)
}

/// Bounds of converted positions of several meshes
fn converted_bounds<'m>(
    meshes: impl IntoIterator<Item = &'m SampledMesh>,
    convention: &CoordinateConvention,
) -> BoundsVolume {
    let mut bounds = BoundsVolume::new();
    for mesh in meshes {
        for &p in &mesh.positions {
            bounds.update(convention.convert(p));
        }
    }
    bounds
}

/// Two UV layers holding each corner's offset from `origin`, in target space
///
/// Layer 1 carries `(x, y)`, layer 2 carries `(z, 0)`.
fn local_offset_layers(
    mesh: &SampledMesh,
    origin: Vec3,
    convention: &CoordinateConvention,
) -> [UvLayer; 2] {
    let offsets: Vec<Vec3> = mesh
        .corners()
        .map(|(_, _, v)| convention.convert(mesh.positions[v as usize] - origin))
        .collect();
    [
        UvLayer::new(
            "LocalOffsetXY",
            offsets.iter().map(|o| Vec2::new(o.x, o.y)).collect(),
        ),
        UvLayer::new(
            "LocalOffsetZ",
            offsets.iter().map(|o| Vec2::new(o.z, 0.0)).collect(),
        ),
    ]
}
