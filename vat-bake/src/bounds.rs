//! Bounds accumulation and normalization divisors

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Smallest divisor handed to a shader
pub const MIN_DIVISOR: f32 = 0.01;

/// Divisors are rounded up to this many steps per unit (4 decimal places)
const DIVISOR_PRECISION: f64 = 10_000.0;

/// Round a per-axis range up to 4 decimals and floor it at [`MIN_DIVISOR`]
///
/// The result is never zero, so the consuming shader can always divide by it.
pub fn finalize_divisor(extent: Vec3) -> Vec3 {
    let round = |axis: f32| {
        let rounded = ((axis as f64) * DIVISOR_PRECISION).ceil() / DIVISOR_PRECISION;
        (rounded as f32).max(MIN_DIVISOR)
    };
    Vec3::new(round(extent.x), round(extent.y), round(extent.z))
}

/// Axis-aligned min/max over a stream of points
///
/// Starts inverted (`+inf` / `-inf`) and only ever grows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsVolume {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundsVolume {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundsVolume {
    pub const fn new() -> Self {
        Self {
            min: Vec3::INFINITY,
            max: Vec3::NEG_INFINITY,
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut bounds = Self::new();
        for p in points {
            bounds.update(p);
        }
        bounds
    }

    #[inline]
    pub fn update(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn merge(&mut self, other: &BoundsVolume) {
        if !other.is_empty() {
            self.update(other.min);
            self.update(other.max);
        }
    }

    /// True until the first point arrives
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn extent(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Normalization divisor for the direct-interval law
    pub fn divisor(&self) -> Vec3 {
        finalize_divisor(self.extent())
    }

    /// Lower corner, or the origin for an empty volume
    pub fn origin(&self) -> Vec3 {
        if self.is_empty() { Vec3::ZERO } else { self.min }
    }

    /// The eight box corners
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }
}

/// Per-axis `max(|value|)`, for signed quantities centred on zero
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SymmetricBounds {
    pub max_abs: Vec3,
}

impl SymmetricBounds {
    pub const fn new() -> Self {
        Self {
            max_abs: Vec3::ZERO,
        }
    }

    #[inline]
    pub fn update(&mut self, value: Vec3) {
        self.max_abs = self.max_abs.max(value.abs());
    }

    /// Normalization divisor for the unit-interval law
    pub fn finalize(&self) -> Vec3 {
        finalize_divisor(self.max_abs)
    }
}

/// How far the animated bounds reach past the rest-pose bounds
///
/// `min` holds growth on the negative side of each axis, `max` growth on the
/// positive side; both are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Extents {
    pub min: Vec3,
    pub max: Vec3,
}

impl Extents {
    pub fn between(rest: &BoundsVolume, live: &BoundsVolume) -> Self {
        if rest.is_empty() || live.is_empty() {
            return Self::default();
        }
        Self {
            min: (rest.min - live.min).max(Vec3::ZERO),
            max: (live.max - rest.max).max(Vec3::ZERO),
        }
    }
}
