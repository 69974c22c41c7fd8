//! Animation range and the sampled frame set

use serde::{Deserialize, Serialize};

use crate::error::{BakeError, Result};

/// Inclusive frame range sampled every `spacing` frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationRange {
    pub start: i32,
    pub end: i32,
    pub spacing: u32,
}

impl Default for AnimationRange {
    fn default() -> Self {
        Self {
            start: 1,
            end: 250,
            spacing: 1,
        }
    }
}

impl AnimationRange {
    pub const fn new(start: i32, end: i32, spacing: u32) -> Self {
        Self {
            start,
            end,
            spacing,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.spacing == 0 {
            return Err(BakeError::invalid_input("frame spacing must be at least 1"));
        }
        if self.end < self.start {
            return Err(BakeError::invalid_input(format!(
                "frame end {} is before frame start {}",
                self.end, self.start
            )));
        }
        Ok(())
    }

    /// `ceil((end - start + 1) / spacing)`
    pub fn frame_count(&self) -> usize {
        if self.spacing == 0 || self.end < self.start {
            return 0;
        }
        let span = (self.end as i64 - self.start as i64 + 1) as usize;
        span.div_ceil(self.spacing as usize)
    }

    pub fn sampled_frames(&self) -> impl Iterator<Item = i32> + use<> {
        let step = self.spacing.max(1) as usize;
        (self.start..=self.end).step_by(step)
    }
}

/// Sampled frames of a range after applying the optional vertical cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePlan {
    pub range: AnimationRange,
    /// Number of frames that end up in the texture
    pub count: usize,
}

impl FramePlan {
    pub fn new(range: AnimationRange, max_frames: Option<u32>) -> Result<Self> {
        range.validate()?;
        let full = range.frame_count();
        let count = match max_frames {
            Some(0) => {
                return Err(BakeError::invalid_input("maximum frame count must be at least 1"));
            }
            Some(cap) if (cap as usize) < full => {
                tracing::warn!(
                    "Frame range {}..={} samples {} frames, capped to {}",
                    range.start,
                    range.end,
                    full,
                    cap
                );
                cap as usize
            }
            _ => full,
        };
        Ok(Self { range, count })
    }

    /// `(frame_index, frame)` for every sampled frame, in increasing order
    pub fn frames(&self) -> impl Iterator<Item = (usize, i32)> + use<> {
        self.range.sampled_frames().take(self.count).enumerate()
    }

    /// Last frame that is written to the texture
    pub fn last_frame(&self) -> i32 {
        let offset = self.count.saturating_sub(1) as i64 * i64::from(self.range.spacing);
        i32::try_from(i64::from(self.range.start) + offset).unwrap_or(self.range.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count_matches_sampled_frames() {
        for start in [-3, 0, 1, 10] {
            for len in 1..40 {
                for spacing in 1..7u32 {
                    let range = AnimationRange::new(start, start + len - 1, spacing);
                    let expected = (len as usize).div_ceil(spacing as usize);
                    assert_eq!(range.frame_count(), expected);
                    assert_eq!(range.sampled_frames().count(), expected);
                }
            }
        }
    }

    #[test]
    fn test_sampled_frames_step() {
        let range = AnimationRange::new(1, 10, 3);
        let frames: Vec<i32> = range.sampled_frames().collect();
        assert_eq!(frames, vec![1, 4, 7, 10]);
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(matches!(
            AnimationRange::new(5, 4, 1).validate(),
            Err(BakeError::InvalidInput(_))
        ));
        assert!(matches!(
            AnimationRange::new(1, 4, 0).validate(),
            Err(BakeError::InvalidInput(_))
        ));
        assert!(AnimationRange::new(4, 4, 1).validate().is_ok());
    }

    #[test]
    fn test_frame_plan_cap() {
        let plan = FramePlan::new(AnimationRange::new(0, 99, 2), Some(10)).unwrap();
        assert_eq!(plan.count, 10);
        assert_eq!(plan.last_frame(), 18);
        assert_eq!(plan.frames().last(), Some((9, 18)));

        let uncapped = FramePlan::new(AnimationRange::new(0, 99, 2), Some(500)).unwrap();
        assert_eq!(uncapped.count, 50);
        assert!(FramePlan::new(AnimationRange::new(0, 9, 1), Some(0)).is_err());
    }

    #[test]
    fn test_last_frame_with_extreme_spacing() {
        let range = AnimationRange::new(i32::MIN, i32::MAX, u32::MAX);
        let plan = FramePlan::new(range, None).unwrap();
        assert_eq!(plan.count, 2);
        assert_eq!(plan.last_frame(), i32::MAX);
        assert_eq!(plan.frames().last(), Some((1, i32::MAX)));

        let single = FramePlan::new(AnimationRange::new(-5, 100, u32::MAX), None).unwrap();
        assert_eq!(single.count, 1);
        assert_eq!(single.last_frame(), -5);
    }
}
