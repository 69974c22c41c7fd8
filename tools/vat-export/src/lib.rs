//! vat-export library
//!
//! Reads a `vat.toml` manifest and a per-frame OBJ sequence, runs the
//! matching baker from `vat-bake`, and writes PNG textures, metadata JSON
//! and the reference mesh.

pub mod manifest;
pub mod obj;
pub mod pipeline;
pub mod source;
pub mod transforms;
pub mod writer;

pub use manifest::VatManifest;
pub use pipeline::{BakeReport, CheckReport, describe_layout, run_bake, run_check};
pub use source::ObjSequenceSource;
pub use transforms::TransformTrack;
