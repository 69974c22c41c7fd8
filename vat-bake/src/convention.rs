//! Coordinate convention: source space to target engine space
//!
//! A convention is applied in two steps: negate every flagged axis, then
//! permute the three components. Quaternions get the matching rotation-space
//! transform so positions and rotations stay consistent.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target component order, one of the six permutations of `xyz`
///
/// The name lists which source axis lands in each target slot, so `xzy`
/// produces `(x, z, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisOrder {
    #[default]
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
}

impl AxisOrder {
    pub const ALL: [AxisOrder; 6] = [
        AxisOrder::Xyz,
        AxisOrder::Xzy,
        AxisOrder::Yxz,
        AxisOrder::Yzx,
        AxisOrder::Zxy,
        AxisOrder::Zyx,
    ];

    /// Source component index feeding each target component
    #[inline]
    pub const fn indices(self) -> [usize; 3] {
        match self {
            AxisOrder::Xyz => [0, 1, 2],
            AxisOrder::Xzy => [0, 2, 1],
            AxisOrder::Yxz => [1, 0, 2],
            AxisOrder::Yzx => [1, 2, 0],
            AxisOrder::Zxy => [2, 0, 1],
            AxisOrder::Zyx => [2, 1, 0],
        }
    }

    /// True for the three transpositions (odd permutations)
    #[inline]
    pub const fn is_odd(self) -> bool {
        matches!(self, AxisOrder::Xzy | AxisOrder::Yxz | AxisOrder::Zyx)
    }

    /// Order that undoes this one
    pub const fn inverse(self) -> AxisOrder {
        match self {
            AxisOrder::Yzx => AxisOrder::Zxy,
            AxisOrder::Zxy => AxisOrder::Yzx,
            other => other,
        }
    }

    #[inline]
    pub fn permute(self, v: Vec3) -> Vec3 {
        let [a, b, c] = self.indices();
        let src = v.to_array();
        Vec3::new(src[a], src[b], src[c])
    }

    pub const fn name(self) -> &'static str {
        match self {
            AxisOrder::Xyz => "xyz",
            AxisOrder::Xzy => "xzy",
            AxisOrder::Yxz => "yxz",
            AxisOrder::Yzx => "yzx",
            AxisOrder::Zxy => "zxy",
            AxisOrder::Zyx => "zyx",
        }
    }
}

impl fmt::Display for AxisOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AxisOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AxisOrder::ALL
            .into_iter()
            .find(|order| order.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown axis order '{}' (expected one of xyz, xzy, yxz, yzx, zxy, zyx)", s))
    }
}

/// Axis flips plus axis order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateConvention {
    pub flip_x: bool,
    pub flip_y: bool,
    pub flip_z: bool,
    pub axis_order: AxisOrder,
}

impl CoordinateConvention {
    pub const IDENTITY: CoordinateConvention = CoordinateConvention {
        flip_x: false,
        flip_y: false,
        flip_z: false,
        axis_order: AxisOrder::Xyz,
    };

    pub const fn new(flip_x: bool, flip_y: bool, flip_z: bool, axis_order: AxisOrder) -> Self {
        Self {
            flip_x,
            flip_y,
            flip_z,
            axis_order,
        }
    }

    #[inline]
    fn flip_signs(&self) -> Vec3 {
        Vec3::new(
            if self.flip_x { -1.0 } else { 1.0 },
            if self.flip_y { -1.0 } else { 1.0 },
            if self.flip_z { -1.0 } else { 1.0 },
        )
    }

    /// True when the convention mirrors space (changes handedness)
    pub fn is_reflection(&self) -> bool {
        let flips = self.flip_x as u8 + self.flip_y as u8 + self.flip_z as u8;
        (flips % 2 == 1) != self.axis_order.is_odd()
    }

    /// Convert a position, offset or direction
    #[inline]
    pub fn convert(&self, v: Vec3) -> Vec3 {
        self.axis_order.permute(v * self.flip_signs())
    }

    /// Convert a rotation
    ///
    /// The imaginary part is flipped and permuted like a vector. Rotation axes
    /// are pseudovectors, so a handedness change also negates the imaginary
    /// part; `convert_quaternion(q) * convert(v) == convert(q * v)` holds for
    /// every convention.
    pub fn convert_quaternion(&self, q: Quat) -> Quat {
        let mut imaginary = self.convert(Vec3::new(q.x, q.y, q.z));
        if self.is_reflection() {
            imaginary = -imaginary;
        }
        Quat::from_xyzw(imaginary.x, imaginary.y, imaginary.z, q.w)
    }

    /// Convert a scale vector (permutation only, scales carry no sign)
    #[inline]
    pub fn convert_scale(&self, s: Vec3) -> Vec3 {
        self.axis_order.permute(s)
    }
}

impl From<EnginePreset> for CoordinateConvention {
    fn from(preset: EnginePreset) -> Self {
        preset.convention()
    }
}

/// Known target engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePreset {
    #[default]
    Blender,
    OldUnreal,
    Unity,
    Godot,
}

impl EnginePreset {
    pub const fn convention(self) -> CoordinateConvention {
        match self {
            EnginePreset::Blender => CoordinateConvention::new(false, false, false, AxisOrder::Xyz),
            EnginePreset::OldUnreal => CoordinateConvention::new(false, true, false, AxisOrder::Xyz),
            EnginePreset::Unity => CoordinateConvention::new(false, false, false, AxisOrder::Xzy),
            EnginePreset::Godot => CoordinateConvention::new(false, true, false, AxisOrder::Xzy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn assert_vec_eq(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-5, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_axis_orders_permute() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(AxisOrder::Xyz.permute(v), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(AxisOrder::Xzy.permute(v), Vec3::new(1.0, 3.0, 2.0));
        assert_eq!(AxisOrder::Yxz.permute(v), Vec3::new(2.0, 1.0, 3.0));
        assert_eq!(AxisOrder::Yzx.permute(v), Vec3::new(2.0, 3.0, 1.0));
        assert_eq!(AxisOrder::Zxy.permute(v), Vec3::new(3.0, 1.0, 2.0));
        assert_eq!(AxisOrder::Zyx.permute(v), Vec3::new(3.0, 2.0, 1.0));
    }

    #[test]
    fn test_yxz_is_involution() {
        let convention = CoordinateConvention::new(false, false, false, AxisOrder::Yxz);
        let v = Vec3::new(0.25, -4.0, 9.5);
        assert_eq!(convention.convert(convention.convert(v)), v);
    }

    #[test]
    fn test_flip_twice_is_identity() {
        let convention = CoordinateConvention::new(true, true, true, AxisOrder::Xyz);
        let v = Vec3::new(0.25, -4.0, 9.5);
        assert_eq!(convention.convert(v), -v);
        assert_eq!(convention.convert(convention.convert(v)), v);
    }

    #[test]
    fn test_three_cycles_invert_each_other() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        for order in AxisOrder::ALL {
            assert_eq!(order.inverse().permute(order.permute(v)), v, "order {}", order);
        }
    }

    #[test]
    fn test_flip_applies_before_permutation() {
        // Flip Y, then move Y into the Z slot
        let convention = CoordinateConvention::new(false, true, false, AxisOrder::Xzy);
        assert_eq!(
            convention.convert(Vec3::new(1.0, 2.0, 3.0)),
            Vec3::new(1.0, 3.0, -2.0)
        );
    }

    #[test]
    fn test_quaternion_real_part_untouched() {
        let q = Quat::from_xyzw(0.1, 0.2, 0.3, 0.927).normalize();
        for preset in [
            EnginePreset::Blender,
            EnginePreset::OldUnreal,
            EnginePreset::Unity,
            EnginePreset::Godot,
        ] {
            let converted = preset.convention().convert_quaternion(q);
            assert!((converted.w - q.w).abs() < 1e-6);
        }
    }

    #[test]
    fn test_quaternion_consistent_with_vectors() {
        let rotations = [
            Quat::from_rotation_z(FRAC_PI_2),
            Quat::from_rotation_x(0.7),
            Quat::from_axis_angle(Vec3::new(1.0, 2.0, -0.5).normalize(), 1.3),
        ];
        let v = Vec3::new(0.3, -1.2, 2.0);

        for order in AxisOrder::ALL {
            for flips in 0..8u8 {
                let convention =
                    CoordinateConvention::new(flips & 1 != 0, flips & 2 != 0, flips & 4 != 0, order);
                for q in rotations {
                    let expected = convention.convert(q * v);
                    let actual = convention.convert_quaternion(q) * convention.convert(v);
                    assert_vec_eq(actual, expected);
                }
            }
        }
    }

    #[test]
    fn test_reflection_parity() {
        assert!(!CoordinateConvention::IDENTITY.is_reflection());
        assert!(EnginePreset::OldUnreal.convention().is_reflection());
        assert!(EnginePreset::Unity.convention().is_reflection());
        // Two reflections cancel out
        assert!(!EnginePreset::Godot.convention().is_reflection());
    }

    #[test]
    fn test_axis_order_parsing() {
        assert_eq!("zxy".parse::<AxisOrder>(), Ok(AxisOrder::Zxy));
        assert_eq!("XZY".parse::<AxisOrder>(), Ok(AxisOrder::Xzy));
        assert!("xxy".parse::<AxisOrder>().is_err());
    }

    #[test]
    fn test_scale_ignores_flips() {
        let convention = CoordinateConvention::new(true, false, true, AxisOrder::Zyx);
        assert_eq!(
            convention.convert_scale(Vec3::new(1.0, 2.0, 3.0)),
            Vec3::new(3.0, 2.0, 1.0)
        );
    }
}
