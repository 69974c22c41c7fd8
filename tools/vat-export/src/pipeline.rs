//! Manifest-driven bake and check runs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use vat_bake::{FramePlan, TextureLayout, VatKind};

use crate::manifest::{VatManifest, manifest_dir};
use crate::source::ObjSequenceSource;
use crate::writer::{check_output_dir, prepare_output_dir, write_outputs};

/// Outcome of a bake run
#[derive(Debug)]
pub struct BakeReport {
    pub kind: VatKind,
    pub output_dir: PathBuf,
    pub written: Vec<PathBuf>,
}

/// What `check` found without baking
#[derive(Debug)]
pub struct CheckReport {
    pub kind: VatKind,
    pub objects: Vec<String>,
    pub frame_count: usize,
    pub probe_vertices: usize,
    pub probe_polygons: usize,
}

/// Bake everything a manifest describes and write the enabled outputs
pub fn run_bake(manifest_path: &Path, output_override: Option<&Path>) -> Result<BakeReport> {
    let manifest = VatManifest::load(manifest_path)?;
    manifest.validate()?;

    let base = manifest_dir(manifest_path);
    let output_dir = manifest.output_dir(&base, output_override);
    prepare_output_dir(&output_dir)?;
    let mut source = ObjSequenceSource::open(&manifest, &base)?;

    let kind = manifest.bake.kind;
    let result = vat_bake::bake(kind, &mut source, &manifest.config)
        .with_context(|| format!("Failed to bake {}", manifest_path.display()))?;
    let written = write_outputs(&result, &manifest.config, &output_dir)?;

    Ok(BakeReport {
        kind,
        output_dir,
        written,
    })
}

/// Parse and validate a manifest and probe its first frame
pub fn run_check(manifest_path: &Path) -> Result<CheckReport> {
    let manifest = VatManifest::load(manifest_path)?;
    manifest.validate()?;

    let plan = FramePlan::new(manifest.config.range, manifest.config.max_frames)?;
    let base = manifest_dir(manifest_path);
    check_output_dir(&manifest.output_dir(&base, None))?;
    let source = ObjSequenceSource::open(&manifest, &base)?;
    let (probe_vertices, probe_polygons) = source.probe_counts();

    Ok(CheckReport {
        kind: manifest.bake.kind,
        objects: source.object_names().to_vec(),
        frame_count: plan.count,
        probe_vertices,
        probe_polygons,
    })
}

/// Human-readable layout of `count` elements over `frames` frames
pub fn describe_layout(count: usize, max_width: u32, frames: usize) -> Result<String> {
    let layout = TextureLayout::plan(count, max_width)?.with_frames(frames)?;
    Ok(format!(
        "{} elements (max width {}): {} x {} per frame, {} frames -> {} x {} texture",
        count,
        max_width,
        layout.width,
        layout.rows_per_frame,
        layout.frame_count,
        layout.width,
        layout.height()
    ))
}
