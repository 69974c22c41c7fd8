//! Per-object VAT for collections of rigid bodies
//!
//! One pixel per object per frame. Translation, rotation and scale are stored
//! relative to each object's transform at the evaluation frame, so a frame
//! with no motion encodes as 0.5 in every position and scale channel.

use glam::{Mat4, Quat, Vec3};

use super::{BakeContext, BakeResult, BakeStage, StageLog, VatKind};
use super::{converted_bounds, local_offset_layers};
use crate::bounds::{BoundsVolume, Extents, SymmetricBounds};
use crate::config::ScalePacking;
use crate::error::{BakeError, Result};
use crate::layout::TextureLayout;
use crate::metadata::VatMetadata;
use crate::normalize::{EMPTY_PIXEL, RawChannel};
use crate::reference::{ReferenceMesh, ReferenceObject};
use crate::sampler::{BakeSession, MeshSource, WorldTransform};

/// Per-object values captured at the evaluation frame
struct RigidReference {
    /// Source-space translation
    origin: Vec3,
    location: Vec3,
    rotation_inverse: Quat,
    scale: Vec3,
    matrix_inverse: Mat4,
    /// World-space bounds of the mesh at the evaluation frame
    bounds: BoundsVolume,
}

impl RigidReference {
    fn capture(
        object: usize,
        frame: i32,
        transform: &WorldTransform,
        bounds: BoundsVolume,
        ctx: &BakeContext<'_>,
    ) -> Result<Self> {
        let scale = ctx.convention.convert_scale(transform.scale);
        if scale.cmpeq(Vec3::ZERO).any() {
            return Err(BakeError::invalid_input(format!(
                "object {} has zero scale at evaluation frame {}",
                object, frame
            )));
        }
        Ok(Self {
            origin: transform.translation,
            location: ctx.convention.convert(transform.translation),
            rotation_inverse: transform.rotation.normalize().inverse(),
            scale,
            matrix_inverse: transform.to_matrix().inverse(),
            bounds,
        })
    }

    /// Rotation from the reference to `rotation`, in target space, `w >= 0`
    fn rotation_delta(&self, rotation: Quat, ctx: &BakeContext<'_>) -> Quat {
        let delta = ctx
            .convention
            .convert_quaternion(rotation.normalize() * self.rotation_inverse);
        if delta.w < 0.0 { -delta } else { delta }
    }
}

pub(super) fn bake<S: MeshSource + ?Sized>(
    session: &mut BakeSession<'_, S>,
    ctx: &BakeContext<'_>,
    stages: &mut StageLog,
) -> Result<BakeResult> {
    let convention = &ctx.convention;
    let config = ctx.config;
    let object_count = session.object_count();
    let evaluation_frame = config.evaluation_frame();

    stages.enter(BakeStage::PrePass);
    session.rewind();
    let rest_meshes = session.sample_all(evaluation_frame)?;
    let mut references = Vec::with_capacity(object_count);
    for (object, mesh) in rest_meshes.iter().enumerate() {
        if mesh.vertex_count() == 0 {
            tracing::warn!(
                "Object {} ({}) has no vertices at frame {}",
                object,
                session.object_name(object),
                evaluation_frame
            );
        }
        let transform = session.world_transform(object, evaluation_frame)?;
        references.push(RigidReference::capture(
            object,
            evaluation_frame,
            &transform,
            mesh.bounds(),
            ctx,
        )?);
    }

    let layout =
        TextureLayout::plan(object_count, config.max_width)?.with_frames(ctx.plan.count)?;
    tracing::info!(
        "Rigid layout: {} objects -> {}x{}",
        object_count,
        layout.width,
        layout.height()
    );

    // Live bounds follow each object's rest box through its motion
    let mut live_bounds = BoundsVolume::new();
    session.rewind();
    for (_, frame) in ctx.plan.frames() {
        for (object, reference) in references.iter().enumerate() {
            if reference.bounds.is_empty() {
                continue;
            }
            let motion =
                session.world_transform(object, frame)?.to_matrix() * reference.matrix_inverse;
            for corner in reference.bounds.corners() {
                live_bounds.update(convention.convert(motion.transform_point3(corner)));
            }
        }
    }
    let rest_bounds = converted_bounds(&rest_meshes, convention);

    let mut reference = ReferenceMesh {
        objects: Vec::with_capacity(object_count),
        frame: evaluation_frame,
    };
    for ((object, mesh), rigid) in rest_meshes.into_iter().enumerate().zip(&references) {
        let pixel_uv = layout.pixel_uv(layout.index(object, 0), config.flip_v);
        let pixel_uvs = vec![pixel_uv; mesh.corner_count()];
        let mut entry = ReferenceObject::new(session.object_name(object), mesh, pixel_uvs);
        if config.local_offsets {
            for layer in local_offset_layers(&entry.mesh, rigid.origin, convention) {
                entry = entry.with_layer(layer);
            }
        }
        reference.objects.push(entry);
    }

    stages.enter(BakeStage::DataPass);
    let mut position = RawChannel::new(&layout, EMPTY_PIXEL);
    let mut rotation = RawChannel::new(&layout, EMPTY_PIXEL);
    let mut scale = RawChannel::new(&layout, EMPTY_PIXEL);
    let mut position_bounds = SymmetricBounds::new();
    let mut scale_bounds = SymmetricBounds::new();

    session.rewind();
    for (fi, frame) in ctx.plan.frames() {
        for (object, reference) in references.iter().enumerate() {
            let transform = session.world_transform(object, frame)?;
            let index = layout.index(object, fi);

            let location = convention.convert(transform.translation) - reference.location;
            position_bounds.update(location);
            position.write(index, location, 1.0);

            let ratio = convention.convert_scale(transform.scale) / reference.scale - Vec3::ONE;
            scale_bounds.update(ratio);
            scale.write(index, ratio, 1.0);

            let delta = reference.rotation_delta(transform.rotation, ctx);
            rotation.write(index, Vec3::new(delta.x, delta.y, delta.z), delta.w);
        }
        tracing::debug!("Frame {}: {} transforms written", frame, object_count);
    }

    stages.enter(BakeStage::Normalize);
    let position_divisor = position_bounds.finalize();
    let scale_divisor = scale_bounds.finalize();
    let written: Vec<usize> = (0..scale.len()).filter(|&i| scale.get(i).is_some()).collect();
    let mut position = position.finish_symmetric(position_divisor);
    let scale = scale.finish_symmetric(scale_divisor);

    let scale = match config.scale_packing {
        ScalePacking::Separate => Some(scale),
        ScalePacking::SingleChannel => {
            for &i in &written {
                position.pixels[i][3] = scale.pixels[i][0];
            }
            None
        }
    };
    let extents = Extents::between(&rest_bounds, &live_bounds);

    let metadata = VatMetadata {
        fps: config.fps,
        kind: VatKind::RigidBody,
        pixel_count_u: layout.width,
        texture_height: layout.height(),
        row_height: layout.row_height(),
        rows_per_frame: layout.rows_per_frame,
        frame_count: layout.frame_count,
        element_count: object_count,
        bounds_min: (-position_divisor).to_array(),
        bounds_max: position_divisor.to_array(),
        extents_min: extents.min.to_array(),
        extents_max: extents.max.to_array(),
        scale_bounds: Some(scale_divisor.to_array()),
        lookup_width: None,
        lookup_height: None,
        encoding: None,
    };

    Ok(BakeResult {
        kind: VatKind::RigidBody,
        position,
        rotation: rotation.finish_symmetric(Vec3::ONE),
        scale,
        lookup: None,
        reference,
        metadata,
        lods: Vec::new(),
    })
}
