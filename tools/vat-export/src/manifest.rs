//! Bake manifest (vat.toml) parsing
//!
//! ```toml
//! [bake]
//! kind = "softbody"
//! output = "baked"
//!
//! [source]
//! frames = "cache/cloth_{frame:04}.obj"
//!
//! [config]
//! range = { start = 1, end = 48 }
//! preset = "unity"
//! ```
//!
//! Relative paths resolve against the manifest's directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use vat_bake::{BakeConfig, VatKind};

/// Frame placeholder in source paths
const FRAME_PLACEHOLDER: &str = "{frame";

#[derive(Debug, Deserialize)]
pub struct VatManifest {
    pub bake: BakeSection,
    pub source: SourceSection,
    #[serde(default)]
    pub config: BakeConfig,
}

#[derive(Debug, Deserialize)]
pub struct BakeSection {
    pub kind: VatKind,
    /// Output directory
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_output() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Deserialize)]
pub struct SourceSection {
    /// Per-frame OBJ path with a `{frame}` or `{frame:0N}` placeholder
    pub frames: String,
    /// Rigid transform track (JSON)
    #[serde(default)]
    pub transforms: Option<PathBuf>,
    /// Objects to bake; every object of the first frame when empty
    #[serde(default)]
    pub objects: Vec<String>,
}

impl VatManifest {
    /// Load a manifest from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to load manifest: {}", path.display()))
    }

    /// Parse manifest content
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse vat.toml")
    }

    /// Manifest-level checks plus the core configuration checks
    pub fn validate(&self) -> Result<()> {
        frame_path(&self.source.frames, self.config.range.start)?;
        if self.bake.kind == VatKind::RigidBody && self.source.transforms.is_none() {
            bail!("Rigid body bakes need a [source] transforms file");
        }
        self.config.validate(self.bake.kind)?;
        Ok(())
    }

    /// Path of the OBJ file holding `frame`
    pub fn frame_file(&self, base: &Path, frame: i32) -> Result<PathBuf> {
        Ok(base.join(frame_path(&self.source.frames, frame)?))
    }

    pub fn transforms_file(&self, base: &Path) -> Option<PathBuf> {
        self.source.transforms.as_ref().map(|p| base.join(p))
    }

    /// Output directory; a command-line override is taken as given
    pub fn output_dir(&self, base: &Path, output_override: Option<&Path>) -> PathBuf {
        match output_override {
            Some(dir) => dir.to_path_buf(),
            None => base.join(&self.bake.output),
        }
    }
}

/// Directory relative manifest paths resolve against
pub fn manifest_dir(manifest_path: &Path) -> PathBuf {
    match manifest_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Substitute `frame` into a path pattern
///
/// `{frame}` writes the plain number, `{frame:04}` pads it with zeros to
/// four digits.
pub fn frame_path(pattern: &str, frame: i32) -> Result<String> {
    let Some(start) = pattern.find(FRAME_PLACEHOLDER) else {
        bail!("Frame pattern '{}' has no {{frame}} placeholder", pattern);
    };
    let end = pattern[start..]
        .find('}')
        .map(|offset| start + offset)
        .with_context(|| format!("Unterminated placeholder in '{}'", pattern))?;

    let spec = &pattern[start + FRAME_PLACEHOLDER.len()..end];
    let number = if spec.is_empty() {
        frame.to_string()
    } else {
        let width: usize = spec
            .strip_prefix(":0")
            .and_then(|w| w.parse().ok())
            .with_context(|| format!("Unsupported placeholder '{{frame{}}}'", spec))?;
        format!("{:0width$}", frame, width = width)
    };
    Ok(format!("{}{}{}", &pattern[..start], number, &pattern[end + 1..]))
}
