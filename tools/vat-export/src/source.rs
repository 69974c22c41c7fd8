//! Mesh source reading one OBJ file per frame
//!
//! Objects are matched across frames by name. The object list is fixed by
//! the first frame of the range (or by the manifest's `objects` selection);
//! an object missing from a later frame samples as an empty mesh. Only
//! sampled frames are read, so a sequence exported with a frame step needs
//! no files for the frames in between.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use vat_bake::{BakeError, MeshSource, SampledMesh, WorldTransform};

use crate::manifest::{VatManifest, frame_path};
use crate::obj::{ObjObject, read_obj};
use crate::transforms::TransformTrack;

pub struct ObjSequenceSource {
    base: PathBuf,
    pattern: String,
    names: Vec<String>,
    transforms: Option<TransformTrack>,
    /// Objects of the most recently read frame
    cached: Option<(i32, Vec<ObjObject>)>,
    current: Option<i32>,
}

impl ObjSequenceSource {
    /// Open the sequence a manifest describes, probing its first frame
    pub fn open(manifest: &VatManifest, base: &Path) -> Result<Self> {
        let probe_frame = manifest.config.range.start;
        let probe_path = manifest.frame_file(base, probe_frame)?;
        let objects = read_obj(&probe_path)?;

        let names: Vec<String> = if manifest.source.objects.is_empty() {
            objects.iter().map(|o| o.name.clone()).collect()
        } else {
            for name in &manifest.source.objects {
                if !objects.iter().any(|o| &o.name == name) {
                    bail!(
                        "Selected object '{}' not found in {}",
                        name,
                        probe_path.display()
                    );
                }
            }
            manifest.source.objects.clone()
        };

        let transforms = match manifest.transforms_file(base) {
            Some(path) => Some(TransformTrack::load(&path)?),
            None => None,
        };
        if let Some(track) = &transforms
            && let Some(missing) = names.iter().find(|name| !track.contains(name))
        {
            bail!("Transform track has no keys for object '{}'", missing);
        }

        tracing::info!(
            "Opened OBJ sequence {} ({} objects)",
            manifest.source.frames,
            names.len()
        );
        Ok(Self {
            base: base.to_path_buf(),
            pattern: manifest.source.frames.clone(),
            names,
            transforms,
            cached: Some((probe_frame, objects)),
            current: None,
        })
    }

    pub fn object_names(&self) -> &[String] {
        &self.names
    }

    /// Vertex and polygon totals of the probed frame
    pub fn probe_counts(&self) -> (usize, usize) {
        self.cached
            .iter()
            .flat_map(|(_, objects)| objects)
            .filter(|o| self.names.contains(&o.name))
            .fold((0, 0), |(v, p), o| {
                (v + o.mesh.vertex_count(), p + o.mesh.polygon_count())
            })
    }

    fn frame_objects(&mut self, frame: i32) -> Result<&[ObjObject]> {
        if self.cached.as_ref().is_none_or(|(f, _)| *f != frame) {
            let path = self.base.join(frame_path(&self.pattern, frame)?);
            let objects =
                read_obj(&path).with_context(|| format!("Failed to load frame {}", frame))?;
            tracing::debug!("Read {} ({} objects)", path.display(), objects.len());
            self.cached = Some((frame, objects));
        }
        Ok(self
            .cached
            .as_ref()
            .map(|(_, objects)| objects.as_slice())
            .unwrap_or_default())
    }
}

impl MeshSource for ObjSequenceSource {
    fn object_count(&self) -> usize {
        self.names.len()
    }

    fn object_name(&self, object: usize) -> String {
        self.names[object].clone()
    }

    fn sample(&mut self, object: usize, frame: i32) -> vat_bake::Result<SampledMesh> {
        let name = self.names[object].clone();
        let objects = self
            .frame_objects(frame)
            .map_err(|e| BakeError::source(object, frame, format!("{:#}", e)))?;
        match objects.iter().find(|o| o.name == name) {
            Some(found) => Ok(found.mesh.clone()),
            None => {
                tracing::debug!("Object '{}' missing at frame {}", name, frame);
                Ok(SampledMesh::default())
            }
        }
    }

    fn world_transform(&mut self, object: usize, frame: i32) -> vat_bake::Result<WorldTransform> {
        let Some(track) = &self.transforms else {
            return Ok(WorldTransform::IDENTITY);
        };
        track.sample(&self.names[object], frame).ok_or_else(|| {
            BakeError::source(object, frame, "object has no transform keys")
        })
    }

    fn step_to(&mut self, frame: i32) -> vat_bake::Result<()> {
        self.current = Some(frame);
        Ok(())
    }

    fn begin_bake(&mut self) -> vat_bake::Result<()> {
        tracing::debug!("Baking {} objects from {}", self.names.len(), self.pattern);
        Ok(())
    }

    fn end_bake(&mut self) {
        self.cached = None;
        if let Some(frame) = self.current.take() {
            tracing::debug!("Sequence released at frame {}", frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_frame(dir: &Path, frame: i32, z: f32) {
        let obj = format!(
            "o A\nv 0 0 {z}\nv 1 0 {z}\nv 0 1 {z}\nf 1 2 3\n\
             o B\nv 5 0 0\nv 6 0 0\nv 5 1 0\nf 4 5 6\n"
        );
        fs::write(dir.join(format!("seq_{:02}.obj", frame)), obj).unwrap();
    }

    fn manifest(extra: &str) -> VatManifest {
        VatManifest::parse(&format!(
            r#"
            [bake]
            kind = "softbody"

            [source]
            frames = "seq_{{frame:02}}.obj"
            {extra}

            [config]
            range = {{ start = 1, end = 3, spacing = 2 }}
            "#
        ))
        .unwrap()
    }

    #[test]
    fn test_objects_follow_first_frame() {
        let dir = tempdir().unwrap();
        write_frame(dir.path(), 1, 0.0);
        let source = ObjSequenceSource::open(&manifest(""), dir.path()).unwrap();
        assert_eq!(source.object_names(), &["A".to_string(), "B".to_string()]);
        assert_eq!(source.probe_counts(), (6, 2));
    }

    #[test]
    fn test_selection_filters_objects() {
        let dir = tempdir().unwrap();
        write_frame(dir.path(), 1, 0.0);
        let source =
            ObjSequenceSource::open(&manifest(r#"objects = ["B"]"#), dir.path()).unwrap();
        assert_eq!(source.object_count(), 1);
        assert_eq!(source.probe_counts(), (3, 1));

        let missing = ObjSequenceSource::open(&manifest(r#"objects = ["C"]"#), dir.path());
        assert!(missing.is_err());
    }

    #[test]
    fn test_sample_reads_only_requested_frames() {
        let dir = tempdir().unwrap();
        write_frame(dir.path(), 1, 0.0);
        write_frame(dir.path(), 3, 2.0);
        let mut source = ObjSequenceSource::open(&manifest(""), dir.path()).unwrap();

        // Frame 2 has no file and is only stepped over
        source.step_to(2).unwrap();
        source.step_to(3).unwrap();
        let mesh = source.sample(0, 3).unwrap();
        assert_eq!(mesh.positions[0].z, 2.0);
    }

    #[test]
    fn test_missing_frame_is_a_source_error() {
        let dir = tempdir().unwrap();
        write_frame(dir.path(), 1, 0.0);
        let mut source = ObjSequenceSource::open(&manifest(""), dir.path()).unwrap();
        let err = source.sample(1, 3).unwrap_err();
        assert!(matches!(err, BakeError::Source { object: 1, frame: 3, .. }));
    }

    #[test]
    fn test_transforms_must_cover_objects() {
        let dir = tempdir().unwrap();
        write_frame(dir.path(), 1, 0.0);
        fs::write(
            dir.path().join("t.json"),
            r#"{ "objects": { "A": [ { "frame": 1, "translation": [1, 2, 3] } ] } }"#,
        )
        .unwrap();

        let result = ObjSequenceSource::open(&manifest(r#"transforms = "t.json""#), dir.path());
        assert!(result.is_err());

        let mut source = ObjSequenceSource::open(
            &manifest("transforms = \"t.json\"\nobjects = [\"A\"]"),
            dir.path(),
        )
        .unwrap();
        let transform = source.world_transform(0, 1).unwrap();
        assert_eq!(transform.translation.y, 2.0);
    }

    #[test]
    fn test_without_track_transforms_are_identity() {
        let dir = tempdir().unwrap();
        write_frame(dir.path(), 1, 0.0);
        let mut source = ObjSequenceSource::open(&manifest(""), dir.path()).unwrap();
        assert_eq!(
            source.world_transform(1, 1).unwrap(),
            WorldTransform::IDENTITY
        );
    }
}
