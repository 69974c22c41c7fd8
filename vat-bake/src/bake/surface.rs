//! Lookup VAT for meshes whose topology changes between frames (fluids)
//!
//! Live vertices of each frame are packed into that frame's row block of the
//! transform textures in sampling order. A second texture, addressed by the
//! stable corner slots of a triangulated rest-pose mesh, tells the shader
//! where in the transform texture each corner lives in each frame. Corners a
//! frame has beyond the rest pose's capacity are skipped.

use glam::Vec2;

use super::{BakeContext, BakeResult, BakeStage, FrameCounts, StageLog, VatKind};
use super::{converted_bounds, local_offset_layers, survey_meshes};
use crate::bounds::Extents;
use crate::buffer::Pixel;
use crate::error::{BakeError, Result};
use crate::layout::TextureLayout;
use crate::metadata::VatMetadata;
use crate::normalize::{EMPTY_PIXEL, RawChannel, unsign};
use crate::reference::{ReferenceMesh, ReferenceObject};
use crate::sampler::{BakeSession, MeshSource};

pub(super) fn bake<S: MeshSource + ?Sized>(
    session: &mut BakeSession<'_, S>,
    ctx: &BakeContext<'_>,
    stages: &mut StageLog,
) -> Result<BakeResult> {
    let convention = &ctx.convention;
    let config = ctx.config;

    stages.enter(BakeStage::PrePass);
    let survey = survey_meshes(session, ctx)?;

    session.rewind();
    let rest_meshes = session.sample_all(survey.rest_frame)?;
    let rest_bounds = converted_bounds(&rest_meshes, convention);

    // Stable corner slots come from the triangulated rest pose
    let mut reference = ReferenceMesh {
        objects: Vec::with_capacity(rest_meshes.len()),
        frame: survey.rest_frame,
    };
    let mut corner_bases = Vec::with_capacity(rest_meshes.len());
    let mut capacities = Vec::with_capacity(rest_meshes.len());
    let mut corner_total = 0;
    let mut split_meshes = Vec::with_capacity(rest_meshes.len());
    for (object, mesh) in rest_meshes.iter().enumerate() {
        let triangulated = ctx.preprocessor.triangulate(mesh);
        let split = ctx
            .preprocessor
            .split_hard_edges(&triangulated, config.split_all_edges);
        corner_bases.push(corner_total);
        capacities.push(split.mesh.corner_count());
        corner_total += split.mesh.corner_count();
        let origin = session.world_transform(object, survey.rest_frame)?.translation;
        split_meshes.push((split.mesh, origin));
    }
    if corner_total == 0 {
        return Err(BakeError::invalid_input(format!(
            "rest frame {} has no triangles",
            survey.rest_frame
        )));
    }

    // Slot 0 of the transform textures is the sentinel every unused lookup
    // points at
    let transform_layout = TextureLayout::plan(survey.peak_vertices + 1, config.max_width)?
        .with_frames(ctx.plan.count)?;
    let lookup_layout =
        TextureLayout::plan(corner_total, config.data_max_width)?.with_frames(ctx.plan.count)?;
    tracing::info!(
        "Surface layouts: transform {}x{}, lookup {}x{} ({} corners)",
        transform_layout.width,
        transform_layout.height(),
        lookup_layout.width,
        lookup_layout.height(),
        corner_total
    );

    for (object, (mesh, origin)) in split_meshes.into_iter().enumerate() {
        let base = corner_bases[object];
        let pixel_uvs = (0..mesh.corner_count())
            .map(|c| lookup_layout.pixel_uv(lookup_layout.index(base + c, 0), config.flip_v))
            .collect();
        let mut entry = ReferenceObject::new(session.object_name(object), mesh, pixel_uvs);
        if config.local_offsets {
            for layer in local_offset_layers(&entry.mesh, origin, convention) {
                entry = entry.with_layer(layer);
            }
        }
        reference.objects.push(entry);
    }

    stages.enter(BakeStage::DataPass);
    let sentinel = transform_layout.pixel_uv(0, config.flip_v);
    let mut position = RawChannel::new(&transform_layout, EMPTY_PIXEL);
    let mut normal = RawChannel::new(&transform_layout, EMPTY_PIXEL);
    let mut lookup = RawChannel::new(&lookup_layout, [sentinel.x, sentinel.y, 0.0, 1.0]);
    let mut skipped_total = 0;

    session.rewind();
    for (fi, frame) in ctx.plan.frames() {
        let meshes = session.sample_all(frame)?;
        let counts = FrameCounts::of(frame, &meshes);
        if counts.vertices > survey.peak_vertices {
            return Err(BakeError::source(
                0,
                frame,
                format!(
                    "{} vertices after a pre-pass peak of {}; the source is not deterministic",
                    counts.vertices, survey.peak_vertices
                ),
            ));
        }

        let mut vertex_base = 0;
        let mut skipped = 0;
        for (object, mesh) in meshes.iter().enumerate() {
            for (v, (&p, &n)) in mesh.positions.iter().zip(&mesh.normals).enumerate() {
                let index = transform_layout.index(vertex_base + v + 1, fi);
                position.write(index, convention.convert(p), 1.0);
                normal.write(index, unsign(convention.convert(n).normalize_or_zero()), 1.0);
            }

            let triangulated = ctx.preprocessor.triangulate(mesh);
            let capacity = capacities[object];
            for (c, _, v) in triangulated.corners() {
                if c >= capacity {
                    skipped += 1;
                    continue;
                }
                let vertex_index = transform_layout.index(vertex_base + v as usize + 1, fi);
                let uv = transform_layout.pixel_uv(vertex_index, config.flip_v);
                let pixel: Pixel = if config.surface_uvs {
                    let surface = triangulated
                        .corner_uvs
                        .as_ref()
                        .map(|uvs| uvs[c].clamp(Vec2::ZERO, Vec2::ONE))
                        .unwrap_or(Vec2::Y);
                    [uv.x, uv.y, surface.x, surface.y]
                } else {
                    [uv.x, uv.y, 0.0, 1.0]
                };
                lookup.write_pixel(lookup_layout.index(corner_bases[object] + c, fi), pixel);
            }
            vertex_base += mesh.vertex_count();
        }

        if skipped > 0 {
            tracing::warn!(
                "Frame {}: {} corners beyond the rest pose's capacity skipped",
                frame,
                skipped
            );
            skipped_total += skipped;
        }
        tracing::debug!(
            "Frame {}: {} vertices, {} triangles",
            frame,
            counts.vertices,
            counts.triangles
        );
    }
    if skipped_total > 0 {
        tracing::info!("{} corners skipped over the whole bake", skipped_total);
    }

    stages.enter(BakeStage::Normalize);
    let live_bounds = survey.live_bounds;
    let min = live_bounds.origin();
    let extent = live_bounds.divisor();
    let extents = Extents::between(&rest_bounds, &live_bounds);

    let metadata = VatMetadata {
        fps: config.fps,
        kind: VatKind::Fluid,
        pixel_count_u: transform_layout.width,
        texture_height: transform_layout.height(),
        row_height: transform_layout.row_height(),
        rows_per_frame: transform_layout.rows_per_frame,
        frame_count: transform_layout.frame_count,
        element_count: survey.peak_vertices,
        bounds_min: min.to_array(),
        bounds_max: (min + extent).to_array(),
        extents_min: extents.min.to_array(),
        extents_max: extents.max.to_array(),
        scale_bounds: None,
        lookup_width: Some(lookup_layout.width),
        lookup_height: Some(lookup_layout.height()),
        encoding: Some("absolute".to_string()),
    };

    Ok(BakeResult {
        kind: VatKind::Fluid,
        position: position.finish_direct(min, extent),
        rotation: normal.finish_raw(),
        scale: None,
        lookup: Some(lookup.finish_raw()),
        reference,
        metadata,
        lods: Vec::new(),
    })
}
