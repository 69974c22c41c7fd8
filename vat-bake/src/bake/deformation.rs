//! Per-vertex VAT for fixed-topology meshes (soft bodies, cloth)
//!
//! Every corner of the rest-pose mesh gets its own vertex and its own pixel
//! slot. Slot 0 of each frame block is never written. A frame whose element
//! counts differ from the first sampled frame aborts the bake.

use super::{BakeContext, BakeResult, BakeStage, FrameCounts, StageLog, VatKind};
use super::{converted_bounds, survey_meshes};
use crate::bounds::{Extents, SymmetricBounds};
use crate::config::DeformationEncoding;
use crate::error::Result;
use crate::layout::TextureLayout;
use crate::metadata::VatMetadata;
use crate::normalize::{EMPTY_PIXEL, RawChannel, unsign};
use crate::preprocess::SplitMesh;
use crate::reference::{ReferenceMesh, ReferenceObject};
use crate::sampler::{BakeSession, MeshSource};

/// Rest-pose object after splitting, with its first slot
struct RestObject {
    split: SplitMesh,
    slot_base: usize,
}

pub(super) fn bake<S: MeshSource + ?Sized>(
    session: &mut BakeSession<'_, S>,
    ctx: &BakeContext<'_>,
    stages: &mut StageLog,
) -> Result<BakeResult> {
    let convention = &ctx.convention;

    stages.enter(BakeStage::PrePass);
    let survey = survey_meshes(session, ctx)?;
    let first = survey.first();

    // A rest pose that differs from the first frame cannot address every
    // frame; report the first frame that drifts
    if survey
        .counts_at(survey.rest_frame)
        .is_some_and(|rest| !rest.same_topology(first))
        && let Some(drifting) = survey.frames.iter().find(|c| !c.same_topology(first))
    {
        return Err(drifting.drift_from(first));
    }

    session.rewind();
    let rest_meshes = session.sample_all(survey.rest_frame)?;
    let rest_bounds = converted_bounds(&rest_meshes, convention);

    let mut objects = Vec::with_capacity(rest_meshes.len());
    let mut slot_count = 0;
    for mesh in &rest_meshes {
        let split = ctx.preprocessor.split_hard_edges(mesh, true);
        let slot_base = slot_count;
        slot_count += split.mesh.vertex_count();
        objects.push(RestObject { split, slot_base });
    }

    // Slot 0 is the sentinel, vertex slots start at 1
    let layout = TextureLayout::plan(slot_count + 1, ctx.config.max_width)?
        .with_frames(ctx.plan.count)?;
    tracing::info!(
        "Deformation layout: {} slots -> {}x{} ({} rows per frame)",
        slot_count,
        layout.width,
        layout.height(),
        layout.rows_per_frame
    );

    let reference = ReferenceMesh {
        objects: objects
            .iter()
            .enumerate()
            .map(|(o, rest)| {
                let pixel_uvs = rest
                    .split
                    .mesh
                    .corners()
                    .map(|(_, _, v)| {
                        let slot = rest.slot_base + v as usize + 1;
                        layout.pixel_uv(layout.index(slot, 0), ctx.config.flip_v)
                    })
                    .collect();
                ReferenceObject::new(session.object_name(o), rest.split.mesh.clone(), pixel_uvs)
            })
            .collect(),
        frame: survey.rest_frame,
    };

    stages.enter(BakeStage::DataPass);
    let encoding = ctx.config.deformation_encoding;
    let mut position = RawChannel::new(&layout, EMPTY_PIXEL);
    let mut normal = RawChannel::new(&layout, EMPTY_PIXEL);
    let mut offsets = SymmetricBounds::new();

    session.rewind();
    for (fi, frame) in ctx.plan.frames() {
        let meshes = session.sample_all(frame)?;
        let counts = FrameCounts::of(frame, &meshes);
        if !counts.same_topology(first) {
            return Err(counts.drift_from(first));
        }

        for ((mesh, rest), rest_mesh) in meshes.iter().zip(&objects).zip(&rest_meshes) {
            for (i, &v) in rest.split.source_vertex.iter().enumerate() {
                let index = layout.index(rest.slot_base + i + 1, fi);
                let live = convention.convert(mesh.positions[v as usize]);
                let value = match encoding {
                    DeformationEncoding::Absolute => live,
                    DeformationEncoding::RestOffset => {
                        let offset = live - convention.convert(rest_mesh.positions[v as usize]);
                        offsets.update(offset);
                        offset
                    }
                };
                position.write(index, value, 1.0);

                let n = convention.convert(mesh.normals[v as usize]).normalize_or_zero();
                normal.write(index, unsign(n), 1.0);
            }
        }
        tracing::debug!("Frame {} written to row block {}", frame, fi);
    }

    stages.enter(BakeStage::Normalize);
    let live_bounds = survey.live_bounds;
    let (position, bounds_min, bounds_max) = match encoding {
        DeformationEncoding::Absolute => {
            let min = live_bounds.origin();
            let extent = live_bounds.divisor();
            (position.finish_direct(min, extent), min, min + extent)
        }
        DeformationEncoding::RestOffset => {
            let divisor = offsets.finalize();
            (position.finish_symmetric(divisor), -divisor, divisor)
        }
    };
    let extents = Extents::between(&rest_bounds, &live_bounds);

    let metadata = VatMetadata {
        fps: ctx.config.fps,
        kind: VatKind::SoftBody,
        pixel_count_u: layout.width,
        texture_height: layout.height(),
        row_height: layout.row_height(),
        rows_per_frame: layout.rows_per_frame,
        frame_count: layout.frame_count,
        element_count: slot_count,
        bounds_min: bounds_min.to_array(),
        bounds_max: bounds_max.to_array(),
        extents_min: extents.min.to_array(),
        extents_max: extents.max.to_array(),
        scale_bounds: None,
        lookup_width: None,
        lookup_height: None,
        encoding: Some(encoding.name().to_string()),
    };

    Ok(BakeResult {
        kind: VatKind::SoftBody,
        position,
        rotation: normal.finish_raw(),
        scale: None,
        lookup: None,
        reference,
        metadata,
        lods: Vec::new(),
    })
}
