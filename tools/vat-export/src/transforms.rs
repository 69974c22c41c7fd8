//! Rigid transform track: per-object world transforms keyed by frame
//!
//! ```json
//! {
//!   "objects": {
//!     "Crate": [
//!       { "frame": 1, "translation": [0, 0, 0], "rotation": [0, 0, 0, 1] },
//!       { "frame": 24, "translation": [0, 0, 4], "scale": [1, 1, 2] }
//!     ]
//!   }
//! }
//! ```
//!
//! Rotations are `[x, y, z, w]`. Between keys, translation and scale are
//! interpolated linearly and rotation spherically; outside the keyed range
//! the nearest key holds.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use glam::{Quat, Vec3};
use hashbrown::HashMap;
use serde::Deserialize;
use vat_bake::WorldTransform;

#[derive(Debug, Clone, Deserialize)]
pub struct TransformKey {
    pub frame: i32,
    #[serde(default)]
    pub translation: [f32; 3],
    #[serde(default = "default_rotation")]
    pub rotation: [f32; 4],
    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
}

fn default_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl TransformKey {
    fn to_transform(&self) -> WorldTransform {
        WorldTransform::new(
            Vec3::from_array(self.translation),
            Quat::from_array(self.rotation).normalize(),
            Vec3::from_array(self.scale),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransformTrack {
    pub objects: HashMap<String, Vec<TransformKey>>,
}

impl TransformTrack {
    /// Load a transform track from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read transforms: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to load transforms: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut track: TransformTrack =
            serde_json::from_str(content).context("Failed to parse transforms JSON")?;
        for (name, keys) in &mut track.objects {
            if keys.is_empty() {
                bail!("Object '{}' has no transform keys", name);
            }
            for key in keys.iter() {
                let rotation = Quat::from_array(key.rotation);
                if !rotation.is_finite() || rotation.length_squared() < 1e-12 {
                    bail!(
                        "Object '{}' has an invalid rotation {:?} at frame {}",
                        name,
                        key.rotation,
                        key.frame
                    );
                }
            }
            keys.sort_by_key(|k| k.frame);
        }
        Ok(track)
    }

    pub fn contains(&self, object: &str) -> bool {
        self.objects.contains_key(object)
    }

    /// World transform of `object` at `frame`, `None` for unknown objects
    pub fn sample(&self, object: &str, frame: i32) -> Option<WorldTransform> {
        let keys = self.objects.get(object)?;
        let next = keys.partition_point(|k| k.frame <= frame);
        if next == 0 {
            return keys.first().map(TransformKey::to_transform);
        }
        let before = &keys[next - 1];
        let Some(after) = keys.get(next) else {
            return Some(before.to_transform());
        };
        if before.frame == frame {
            return Some(before.to_transform());
        }

        let t = (frame - before.frame) as f32 / (after.frame - before.frame) as f32;
        let a = before.to_transform();
        let b = after.to_transform();
        Some(WorldTransform::new(
            a.translation.lerp(b.translation, t),
            a.rotation.slerp(b.rotation, t),
            a.scale.lerp(b.scale, t),
        ))
    }
}
