//! Metadata record consumed by the shader that decodes the textures

use serde::{Deserialize, Serialize};

use crate::bake::VatKind;

/// Everything a shader needs to invert the normalization
///
/// Bounds are reported before normalization. For absolute deformation bakes
/// `bounds_min`/`bounds_max` are the box positions were mapped from; for
/// offset-encoded channels `bounds_max` is the symmetric divisor and
/// `bounds_min` its negation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VatMetadata {
    #[serde(rename = "FPS")]
    pub fps: f32,
    pub kind: VatKind,
    /// Width of the transform textures
    pub pixel_count_u: u32,
    pub texture_height: u32,
    /// Fraction of the texture height per frame
    pub row_height: f32,
    pub rows_per_frame: u32,
    pub frame_count: usize,
    /// Vertices (soft body, fluid) or objects (rigid body)
    pub element_count: usize,
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],
    pub extents_min: [f32; 3],
    pub extents_max: [f32; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_bounds: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}
