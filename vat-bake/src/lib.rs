//! vat-bake: vertex animation texture baking
//!
//! Turns a deterministic, per-frame mesh sampling function into normalized
//! pixel buffers plus the metadata a shader needs to decode them. Three
//! bakers cover the three motion regimes:
//!
//! - [`VatKind::SoftBody`]: fixed topology, one pixel per vertex per frame
//! - [`VatKind::RigidBody`]: rigid objects, one pixel per object per frame
//! - [`VatKind::Fluid`]: changing topology, per-corner lookup texture
//!
//! The crate does no file I/O. Sampling goes through [`MeshSource`], topology
//! work through [`MeshPreprocessor`]; writing images and meshes is left to
//! the caller.

pub mod bake;
pub mod bounds;
pub mod buffer;
pub mod config;
pub mod convention;
pub mod error;
pub mod frames;
pub mod layout;
pub mod lod;
pub mod memory;
pub mod metadata;
pub mod normalize;
pub mod preprocess;
pub mod reference;
pub mod sampler;

pub use bake::{BakeResult, BakeStage, VatKind, bake, bake_with};
pub use bounds::{BoundsVolume, Extents, SymmetricBounds};
pub use buffer::{ChannelDepth, Pixel, PixelBuffer};
pub use config::{BakeConfig, DeformationEncoding, OutputChannel, OutputSet, ScalePacking};
pub use convention::{AxisOrder, CoordinateConvention, EnginePreset};
pub use error::{BakeError, Result};
pub use frames::{AnimationRange, FramePlan};
pub use layout::{FrameLayout, TextureLayout};
pub use lod::{LodEntry, LodLevel};
pub use memory::MemorySource;
pub use metadata::VatMetadata;
pub use preprocess::{BasicPreprocessor, MeshPreprocessor, SplitMesh};
pub use reference::{ReferenceMesh, ReferenceObject, UvLayer};
pub use sampler::{BakeSession, MeshSource, PolygonLoop, SampledMesh, WorldTransform};
