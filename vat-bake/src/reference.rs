//! Reference (rest-pose) meshes handed to the mesh exporter

use glam::Vec2;

use crate::bounds::BoundsVolume;
use crate::sampler::SampledMesh;

/// Name of the UV layer that addresses the transform texture
pub const PIXEL_UV_LAYER: &str = "PixelUVs";

/// Extra per-corner coordinates carried by a reference mesh
#[derive(Debug, Clone, PartialEq)]
pub struct UvLayer {
    pub name: String,
    /// One entry per corner, in loop order
    pub uvs: Vec<Vec2>,
}

impl UvLayer {
    pub fn new(name: impl Into<String>, uvs: Vec<Vec2>) -> Self {
        Self {
            name: name.into(),
            uvs,
        }
    }
}

/// One exported object of the reference mesh
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceObject {
    pub name: String,
    pub mesh: SampledMesh,
    /// Layer 0 is always [`PIXEL_UV_LAYER`]
    pub uv_layers: Vec<UvLayer>,
}

impl ReferenceObject {
    pub fn new(name: impl Into<String>, mesh: SampledMesh, pixel_uvs: Vec<Vec2>) -> Self {
        Self {
            name: name.into(),
            mesh,
            uv_layers: vec![UvLayer::new(PIXEL_UV_LAYER, pixel_uvs)],
        }
    }

    pub fn with_layer(mut self, layer: UvLayer) -> Self {
        self.uv_layers.push(layer);
        self
    }

    pub fn pixel_uvs(&self) -> &[Vec2] {
        self.uv_layers
            .first()
            .map(|layer| layer.uvs.as_slice())
            .unwrap_or_default()
    }

    pub fn layer(&self, name: &str) -> Option<&UvLayer> {
        self.uv_layers.iter().find(|layer| layer.name == name)
    }
}

/// Static geometry of a bake, captured at the reference frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferenceMesh {
    pub objects: Vec<ReferenceObject>,
    /// Frame the geometry was captured at
    pub frame: i32,
}

impl ReferenceMesh {
    pub fn vertex_count(&self) -> usize {
        self.objects.iter().map(|o| o.mesh.vertex_count()).sum()
    }

    pub fn corner_count(&self) -> usize {
        self.objects.iter().map(|o| o.mesh.corner_count()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.objects.iter().map(|o| o.mesh.triangle_count()).sum()
    }

    pub fn bounds(&self) -> BoundsVolume {
        let mut bounds = BoundsVolume::new();
        for object in &self.objects {
            bounds.merge(&object.mesh.bounds());
        }
        bounds
    }
}
