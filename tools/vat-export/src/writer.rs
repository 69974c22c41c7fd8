//! Writers for bake results: PNG textures, metadata JSON, reference OBJ

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use glam::Vec2;
use serde::Serialize;
use vat_bake::{
    BakeConfig, BakeResult, ChannelDepth, LodEntry, PixelBuffer, ReferenceMesh, VatMetadata,
};

use crate::obj::write_obj;

/// Write a pixel buffer as an RGBA PNG at the given channel depth
pub fn write_texture(buffer: &PixelBuffer, depth: ChannelDepth, path: &Path) -> Result<()> {
    let saved = match depth {
        ChannelDepth::Eight => {
            let image = image::RgbaImage::from_raw(buffer.width, buffer.height, buffer.to_unorm8())
                .context("Pixel buffer does not match its dimensions")?;
            image.save_with_format(path, image::ImageFormat::Png)
        }
        ChannelDepth::Sixteen => {
            let image = image::ImageBuffer::<image::Rgba<u16>, Vec<u16>>::from_raw(
                buffer.width,
                buffer.height,
                buffer.to_unorm16(),
            )
            .context("Pixel buffer does not match its dimensions")?;
            image.save_with_format(path, image::ImageFormat::Png)
        }
    };
    saved.with_context(|| format!("Failed to write texture: {}", path.display()))?;

    tracing::debug!(
        "Wrote {} ({}x{}, {}-bit)",
        path.display(),
        buffer.width,
        buffer.height,
        depth.bits()
    );
    Ok(())
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    fs::write(path, json).with_context(|| format!("Failed to write: {}", path.display()))?;
    tracing::debug!("Wrote {}", path.display());
    Ok(())
}

pub fn write_metadata(metadata: &VatMetadata, path: &Path) -> Result<()> {
    write_json(metadata, path)
}

pub fn write_lod_plan(entries: &[LodEntry], path: &Path) -> Result<()> {
    write_json(&entries, path)
}

/// Write the reference mesh as OBJ
pub fn write_reference_mesh(reference: &ReferenceMesh, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_obj(&mut writer, reference)
        .and_then(|()| writer.flush())
        .with_context(|| format!("Failed to write mesh: {}", path.display()))?;

    tracing::debug!(
        "Wrote {} ({} objects, {} vertices, {} corners)",
        path.display(),
        reference.objects.len(),
        reference.vertex_count(),
        reference.corner_count()
    );
    Ok(())
}

#[derive(Serialize)]
struct UvLayerDocument<'a> {
    frame: i32,
    objects: Vec<ObjectUvLayers<'a>>,
}

#[derive(Serialize)]
struct ObjectUvLayers<'a> {
    name: &'a str,
    layers: Vec<NamedUvs<'a>>,
}

#[derive(Serialize)]
struct NamedUvs<'a> {
    name: &'a str,
    uvs: &'a [Vec2],
}

fn has_extra_uv_layers(reference: &ReferenceMesh) -> bool {
    reference.objects.iter().any(|o| o.uv_layers.len() > 1)
}

/// Write UV layers past the pixel UVs as a JSON sidecar
///
/// OBJ holds a single texture coordinate set, so extra layers (local
/// offsets) travel next to the mesh. Returns `false` when there are none.
pub fn write_uv_layers(reference: &ReferenceMesh, path: &Path) -> Result<bool> {
    let objects: Vec<ObjectUvLayers<'_>> = reference
        .objects
        .iter()
        .filter(|o| o.uv_layers.len() > 1)
        .map(|o| ObjectUvLayers {
            name: &o.name,
            layers: o.uv_layers[1..]
                .iter()
                .map(|layer| NamedUvs {
                    name: &layer.name,
                    uvs: &layer.uvs,
                })
                .collect(),
        })
        .collect();
    if objects.is_empty() {
        return Ok(false);
    }

    write_json(
        &UvLayerDocument {
            frame: reference.frame,
            objects,
        },
        path,
    )?;
    Ok(true)
}

/// Check that `dir` is a directory or can become one, without creating it
pub fn check_output_dir(dir: &Path) -> Result<()> {
    let Some(existing) = dir.ancestors().find(|p| p.exists()) else {
        return Ok(());
    };
    if !existing.is_dir() {
        bail!(
            "Output directory {} is not usable: {} is not a directory",
            dir.display(),
            existing.display()
        );
    }
    Ok(())
}

/// Create the output directory up front, before anything is sampled
pub fn prepare_output_dir(dir: &Path) -> Result<()> {
    check_output_dir(dir)?;
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))
}

/// Outputs written under temporary names and renamed into place together
///
/// Dropping an uncommitted set removes every staged file.
struct StagedOutputs {
    staged: Vec<(PathBuf, PathBuf)>,
    committed: bool,
}

impl StagedOutputs {
    fn new() -> Self {
        Self {
            staged: Vec::new(),
            committed: false,
        }
    }

    /// Temporary path to write `target` to
    fn stage(&mut self, target: PathBuf) -> PathBuf {
        let mut name = target.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        let tmp = target.with_file_name(name);
        self.staged.push((tmp.clone(), target));
        tmp
    }

    fn commit(mut self) -> Result<Vec<PathBuf>> {
        for (_, target) in &self.staged {
            if target.is_dir() {
                bail!("Output path is a directory: {}", target.display());
            }
        }

        let mut moved: Vec<PathBuf> = Vec::with_capacity(self.staged.len());
        for (tmp, target) in &self.staged {
            if let Err(e) = fs::rename(tmp, target) {
                for path in &moved {
                    if let Err(e) = fs::remove_file(path) {
                        tracing::warn!("Failed to remove {}: {}", path.display(), e);
                    }
                }
                return Err(e).with_context(|| format!("Failed to write: {}", target.display()));
            }
            tracing::info!("Wrote {}", target.display());
            moved.push(target.clone());
        }
        self.committed = true;
        Ok(moved)
    }
}

impl Drop for StagedOutputs {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for (tmp, _) in self.staged.iter().filter(|(tmp, _)| tmp.exists()) {
            if let Err(e) = fs::remove_file(tmp) {
                tracing::warn!("Failed to remove {}: {}", tmp.display(), e);
            }
        }
    }
}

/// Write every enabled output of a bake into `dir`
///
/// Either every output lands in `dir` or none does. Returns the written
/// paths in write order.
pub fn write_outputs(
    result: &BakeResult,
    config: &BakeConfig,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    prepare_output_dir(dir)?;
    let outputs = &config.outputs;
    let mut staged = StagedOutputs::new();

    let textures = [
        (&outputs.position, Some(&result.position)),
        (&outputs.rotation, Some(&result.rotation)),
        (&outputs.scale, result.scale.as_ref()),
        (&outputs.lookup, result.lookup.as_ref()),
    ];
    for (channel, buffer) in textures {
        let Some(buffer) = buffer else { continue };
        if !channel.enabled {
            continue;
        }
        let path = staged.stage(dir.join(format!("{}.png", channel.file_stem())));
        write_texture(buffer, channel.depth, &path)?;
    }

    if outputs.metadata.enabled {
        let path = staged.stage(dir.join(format!("{}.json", outputs.metadata.file_stem())));
        write_metadata(&result.metadata, &path)?;
    }

    if outputs.mesh.enabled {
        let stem = outputs.mesh.file_stem();
        // The decimation itself happens downstream; every level starts from
        // the full reference mesh
        for entry in &result.lods {
            let path = staged.stage(dir.join(format!("{}.obj", entry.export_name)));
            write_reference_mesh(&result.reference, &path)?;
        }

        let path = staged.stage(dir.join(format!("{}.lods.json", stem)));
        write_lod_plan(&result.lods, &path)?;

        let target = dir.join(format!("{}.uv_layers.json", stem));
        if has_extra_uv_layers(&result.reference) {
            let path = staged.stage(target);
            write_uv_layers(&result.reference, &path)?;
        }
    }

    staged.commit()
}
