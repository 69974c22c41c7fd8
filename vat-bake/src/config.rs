//! Explicit bake configuration
//!
//! Every baker entry point takes a [`BakeConfig`] by reference; nothing in the
//! core reads ambient settings. All fields have defaults, so an empty TOML
//! table is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::bake::VatKind;
use crate::buffer::ChannelDepth;
use crate::convention::{CoordinateConvention, EnginePreset};
use crate::error::{BakeError, Result};
use crate::frames::AnimationRange;
use crate::lod::{LodLevel, validate_levels};

/// How the deformation baker stores positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeformationEncoding {
    /// Position inside the animation's bounding box (direct-interval law)
    #[default]
    Absolute,
    /// Offset from the rest-pose vertex (unit-interval law)
    RestOffset,
}

impl DeformationEncoding {
    pub const fn name(self) -> &'static str {
        match self {
            DeformationEncoding::Absolute => "absolute",
            DeformationEncoding::RestOffset => "rest_offset",
        }
    }
}

/// Where the rigid baker puts scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalePacking {
    /// Separate RGB scale texture
    #[default]
    Separate,
    /// Uniform scale in the position texture's alpha, no scale texture
    SingleChannel,
}

/// One output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputChannel {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub name: String,
    #[serde(default)]
    pub depth: ChannelDepth,
}

fn default_enabled() -> bool {
    true
}

impl OutputChannel {
    pub fn new(name: &str, depth: ChannelDepth) -> Self {
        Self {
            enabled: true,
            name: name.to_string(),
            depth,
        }
    }

    /// Name with unsafe characters replaced
    pub fn file_stem(&self) -> String {
        clean_name(&self.name)
    }
}

/// Every output of a bake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSet {
    #[serde(default = "default_mesh_output")]
    pub mesh: OutputChannel,
    #[serde(default = "default_metadata_output")]
    pub metadata: OutputChannel,
    #[serde(default = "default_position_output")]
    pub position: OutputChannel,
    /// Normals for deformation and surface bakes, rotations for rigid bakes
    #[serde(default = "default_rotation_output")]
    pub rotation: OutputChannel,
    #[serde(default = "default_scale_output")]
    pub scale: OutputChannel,
    #[serde(default = "default_lookup_output")]
    pub lookup: OutputChannel,
}

fn default_mesh_output() -> OutputChannel {
    OutputChannel::new("VAT_Mesh", ChannelDepth::Sixteen)
}

fn default_metadata_output() -> OutputChannel {
    OutputChannel::new("VAT_Data", ChannelDepth::Sixteen)
}

fn default_position_output() -> OutputChannel {
    OutputChannel::new("VAT_Position", ChannelDepth::Sixteen)
}

fn default_rotation_output() -> OutputChannel {
    OutputChannel::new("VAT_Rotation", ChannelDepth::Eight)
}

fn default_scale_output() -> OutputChannel {
    OutputChannel::new("VAT_Scale", ChannelDepth::Sixteen)
}

fn default_lookup_output() -> OutputChannel {
    OutputChannel::new("VAT_Lookup", ChannelDepth::Sixteen)
}

impl Default for OutputSet {
    fn default() -> Self {
        Self {
            mesh: default_mesh_output(),
            metadata: default_metadata_output(),
            position: default_position_output(),
            rotation: default_rotation_output(),
            scale: default_scale_output(),
            lookup: default_lookup_output(),
        }
    }
}

impl OutputSet {
    /// `(label, channel)` pairs a bake of `kind` produces
    pub fn relevant(
        &self,
        kind: VatKind,
        packing: ScalePacking,
    ) -> Vec<(&'static str, &OutputChannel)> {
        let mut outputs = vec![
            ("mesh", &self.mesh),
            ("metadata", &self.metadata),
            ("position texture", &self.position),
        ];
        match kind {
            VatKind::SoftBody => outputs.push(("normal texture", &self.rotation)),
            VatKind::RigidBody => {
                outputs.push(("rotation texture", &self.rotation));
                if packing == ScalePacking::Separate {
                    outputs.push(("scale texture", &self.scale));
                }
            }
            VatKind::Fluid => {
                outputs.push(("normal texture", &self.rotation));
                outputs.push(("lookup texture", &self.lookup));
            }
        }
        outputs
    }
}

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`
pub fn clean_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn default_fps() -> f32 {
    24.0
}

fn default_max_width() -> u32 {
    8192
}

fn default_true() -> bool {
    true
}

/// Settings for one bake run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BakeConfig {
    #[serde(default)]
    pub range: AnimationRange,

    /// Playback rate written to the metadata
    #[serde(default = "default_fps")]
    pub fps: f32,

    /// Maximum width of transform textures
    #[serde(default = "default_max_width")]
    pub max_width: u32,

    /// Maximum width of the lookup texture
    #[serde(default = "default_max_width")]
    pub data_max_width: u32,

    /// Vertical cap: at most this many frames end up in a texture
    #[serde(default)]
    pub max_frames: Option<u32>,

    /// Target engine; overrides `convention` when set
    #[serde(default)]
    pub preset: Option<EnginePreset>,

    #[serde(default)]
    pub convention: CoordinateConvention,

    /// Count V from the last row instead of the first
    #[serde(default)]
    pub flip_v: bool,

    #[serde(default)]
    pub deformation_encoding: DeformationEncoding,

    /// Reference frame of rigid bakes, defaults to the range start
    #[serde(default)]
    pub evaluation_frame: Option<i32>,

    #[serde(default)]
    pub scale_packing: ScalePacking,

    /// Split every edge of surface reference meshes, not just sharp ones
    #[serde(default = "default_true")]
    pub split_all_edges: bool,

    /// Store the source surface UVs in the lookup texture
    #[serde(default = "default_true")]
    pub surface_uvs: bool,

    /// Add UV layers holding each vertex's offset from its object origin
    #[serde(default)]
    pub local_offsets: bool,

    #[serde(default)]
    pub outputs: OutputSet,

    #[serde(default)]
    pub lods: Vec<LodLevel>,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            range: AnimationRange::default(),
            fps: default_fps(),
            max_width: default_max_width(),
            data_max_width: default_max_width(),
            max_frames: None,
            preset: None,
            convention: CoordinateConvention::default(),
            flip_v: false,
            deformation_encoding: DeformationEncoding::default(),
            evaluation_frame: None,
            scale_packing: ScalePacking::default(),
            split_all_edges: true,
            surface_uvs: true,
            local_offsets: false,
            outputs: OutputSet::default(),
            lods: Vec::new(),
        }
    }
}

impl BakeConfig {
    /// Effective coordinate convention
    pub fn convention(&self) -> CoordinateConvention {
        self.preset
            .map(EnginePreset::convention)
            .unwrap_or(self.convention)
    }

    pub fn evaluation_frame(&self) -> i32 {
        self.evaluation_frame.unwrap_or(self.range.start)
    }

    /// Fail-fast checks run before any sampling
    pub fn validate(&self, kind: VatKind) -> Result<()> {
        self.range.validate()?;
        if self.max_frames == Some(0) {
            return Err(BakeError::invalid_input("maximum frame count must be at least 1"));
        }
        if self.max_width == 0 || self.data_max_width == 0 {
            return Err(BakeError::invalid_input("maximum texture width must be at least 1"));
        }
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(BakeError::configuration(format!("invalid FPS {}", self.fps)));
        }
        validate_levels(&self.lods)?;

        if kind == VatKind::RigidBody {
            let frame = self.evaluation_frame();
            if frame < self.range.start || frame > self.range.end {
                return Err(BakeError::invalid_input(format!(
                    "evaluation frame {} is outside frames {}..={}",
                    frame, self.range.start, self.range.end
                )));
            }
        }

        let outputs = self.outputs.relevant(kind, self.scale_packing);
        if !outputs.iter().any(|(_, channel)| channel.enabled) {
            return Err(BakeError::configuration("no output is enabled"));
        }
        for (label, channel) in outputs {
            if channel.enabled && channel.file_stem().is_empty() {
                return Err(BakeError::configuration(format!("Incorrect {} name", label)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convention::AxisOrder;

    #[test]
    fn test_empty_table_gives_defaults() {
        let config: BakeConfig = toml::from_str("").unwrap();
        assert_eq!(config, BakeConfig::default());
        assert_eq!(config.fps, 24.0);
        assert_eq!(config.outputs.rotation.depth, ChannelDepth::Eight);
        assert_eq!(config.evaluation_frame(), 1);
    }

    #[test]
    fn test_parse_full_table() {
        let config: BakeConfig = toml::from_str(
            r#"
            fps = 30
            max_width = 512
            max_frames = 64
            preset = "unity"
            deformation_encoding = "rest_offset"
            scale_packing = "single_channel"
            evaluation_frame = 10

            [range]
            start = 10
            end = 40
            spacing = 2

            [outputs.position]
            name = "Cloth Pos"
            depth = 8

            [outputs.lookup]
            enabled = false
            name = "unused"

            [[lods]]
            reduction_rate = 100
            [[lods]]
            reduction_rate = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.range, AnimationRange::new(10, 40, 2));
        assert_eq!(config.convention().axis_order, AxisOrder::Xzy);
        assert_eq!(config.deformation_encoding, DeformationEncoding::RestOffset);
        assert_eq!(config.scale_packing, ScalePacking::SingleChannel);
        assert_eq!(config.outputs.position.file_stem(), "Cloth_Pos");
        assert_eq!(config.outputs.position.depth, ChannelDepth::Eight);
        assert!(!config.outputs.lookup.enabled);
        assert_eq!(config.lods.len(), 2);
        assert_eq!(config.evaluation_frame(), 10);
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("VAT Position/1"), "VAT_Position_1");
        assert_eq!(clean_name("a-b_c.d"), "a-b_c.d");
        assert_eq!(clean_name("   "), "");
    }

    #[test]
    fn test_validate_names_only_relevant_outputs() {
        let mut config = BakeConfig::default();
        config.outputs.lookup.name = String::new();
        assert!(config.validate(VatKind::SoftBody).is_ok());
        assert_eq!(
            config.validate(VatKind::Fluid),
            Err(BakeError::Configuration("Incorrect lookup texture name".into()))
        );
    }

    #[test]
    fn test_validate_requires_an_output() {
        let mut config = BakeConfig::default();
        for channel in [
            &mut config.outputs.mesh,
            &mut config.outputs.metadata,
            &mut config.outputs.position,
            &mut config.outputs.rotation,
        ] {
            channel.enabled = false;
        }
        assert!(config.validate(VatKind::SoftBody).is_err());
        assert!(config.validate(VatKind::RigidBody).is_ok());
    }

    #[test]
    fn test_validate_range() {
        let mut config = BakeConfig::default();
        config.range = AnimationRange::new(5, 1, 1);
        assert!(matches!(
            config.validate(VatKind::SoftBody),
            Err(BakeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_evaluation_frame_inside_range() {
        let mut config = BakeConfig {
            range: AnimationRange::new(10, 20, 5),
            ..Default::default()
        };
        config.evaluation_frame = Some(12);
        assert!(config.validate(VatKind::RigidBody).is_ok());

        for frame in [9, 21] {
            config.evaluation_frame = Some(frame);
            assert!(matches!(
                config.validate(VatKind::RigidBody),
                Err(BakeError::InvalidInput(_))
            ));
            // Only rigid bakes read the evaluation frame
            assert!(config.validate(VatKind::SoftBody).is_ok());
        }
    }
}
