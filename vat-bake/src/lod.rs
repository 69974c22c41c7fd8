//! LOD ladder for the external decimation step

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{BakeError, Result};

/// One requested level of detail
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    /// Percentage of geometry kept, 0..=100
    pub reduction_rate: f32,
}

impl Default for LodLevel {
    fn default() -> Self {
        Self {
            reduction_rate: 100.0,
        }
    }
}

impl LodLevel {
    pub fn new(reduction_rate: f32) -> Self {
        Self { reduction_rate }
    }

    /// Planar decimation angle limit in radians: `π·(1 − rate/100)`
    pub fn angle_limit(&self) -> f32 {
        PI * (1.0 - self.reduction_rate / 100.0)
    }
}

/// A LOD level resolved to names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LodEntry {
    pub index: usize,
    pub display_name: String,
    pub export_name: String,
    pub reduction_rate: f32,
    pub angle_limit: f32,
}

pub fn validate_levels(levels: &[LodLevel]) -> Result<()> {
    for (i, level) in levels.iter().enumerate() {
        if !(0.0..=100.0).contains(&level.reduction_rate) {
            return Err(BakeError::configuration(format!(
                "LOD{} reduction rate {} is outside 0..=100",
                i, level.reduction_rate
            )));
        }
    }
    Ok(())
}

/// Resolve the ladder for a mesh called `mesh_name`
///
/// An empty list yields a single full-detail `LOD0`.
pub fn build_ladder(levels: &[LodLevel], mesh_name: &str) -> Vec<LodEntry> {
    let default_level = [LodLevel::default()];
    let levels = if levels.is_empty() {
        &default_level[..]
    } else {
        levels
    };

    levels
        .iter()
        .enumerate()
        .map(|(index, level)| LodEntry {
            index,
            display_name: format!("LOD{}", index),
            export_name: if index == 0 {
                mesh_name.to_string()
            } else {
                format!("{}_LOD{}", mesh_name, index)
            },
            reduction_rate: level.reduction_rate,
            angle_limit: level.angle_limit(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ladder_is_single_lod0() {
        let ladder = build_ladder(&[], "VAT_Mesh");
        assert_eq!(ladder.len(), 1);
        assert_eq!(ladder[0].display_name, "LOD0");
        assert_eq!(ladder[0].export_name, "VAT_Mesh");
        assert_eq!(ladder[0].angle_limit, 0.0);
    }

    #[test]
    fn test_ladder_names_and_angles() {
        let ladder = build_ladder(&[LodLevel::new(100.0), LodLevel::new(50.0), LodLevel::new(0.0)], "Cloth");
        assert_eq!(ladder[1].export_name, "Cloth_LOD1");
        assert_eq!(ladder[2].display_name, "LOD2");
        assert!((ladder[1].angle_limit - PI / 2.0).abs() < 1e-6);
        assert!((ladder[2].angle_limit - PI).abs() < 1e-6);
    }

    #[test]
    fn test_validate_rejects_out_of_range_rates() {
        assert!(validate_levels(&[LodLevel::new(100.0), LodLevel::new(0.0)]).is_ok());
        assert!(matches!(
            validate_levels(&[LodLevel::new(120.0)]),
            Err(BakeError::Configuration(_))
        ));
    }
}
