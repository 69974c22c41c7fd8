//! Texture layout planning
//!
//! One frame occupies a contiguous block of `width × rows_per_frame` pixels;
//! frames are stacked vertically.

use glam::Vec2;

use crate::error::{BakeError, Result};

/// Pixel grid for one frame's worth of elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureLayout {
    pub width: u32,
    pub height: u32,
}

impl TextureLayout {
    /// Plan a grid holding `element_count` elements in rows of at most `max_width`
    ///
    /// `height = ceil(count / max_width)`, then `width = ceil(count / height)`
    /// so the remainder is spread over all rows instead of a ragged last row.
    pub fn plan(element_count: usize, max_width: u32) -> Result<Self> {
        if element_count == 0 {
            return Err(BakeError::invalid_input(
                "cannot plan a texture layout for zero elements",
            ));
        }
        if max_width == 0 {
            return Err(BakeError::invalid_input("maximum texture width must be at least 1"));
        }

        let height = element_count.div_ceil(max_width as usize);
        let width = element_count.div_ceil(height);

        let height = u32::try_from(height)
            .map_err(|_| BakeError::invalid_input("texture layout height overflows u32"))?;
        Ok(Self {
            width: width as u32,
            height,
        })
    }

    pub fn capacity(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Stack `frame_count` of these blocks on top of each other
    pub fn with_frames(self, frame_count: usize) -> Result<FrameLayout> {
        if frame_count == 0 {
            return Err(BakeError::invalid_input("cannot lay out zero frames"));
        }
        let total_rows = self.height as usize * frame_count;
        if total_rows > u32::MAX as usize {
            return Err(BakeError::invalid_input(format!(
                "{} frames of {} rows overflow the texture height",
                frame_count, self.height
            )));
        }
        Ok(FrameLayout {
            width: self.width,
            rows_per_frame: self.height,
            frame_count,
        })
    }
}

/// Multi-frame texture: one row block per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub width: u32,
    pub rows_per_frame: u32,
    pub frame_count: usize,
}

impl FrameLayout {
    pub fn height(&self) -> u32 {
        self.rows_per_frame * self.frame_count as u32
    }

    /// Pixels in one frame's row block
    pub fn row_stride(&self) -> usize {
        self.width as usize * self.rows_per_frame as usize
    }

    pub fn pixel_count(&self) -> usize {
        self.row_stride() * self.frame_count
    }

    /// Linear pixel index of `slot` within frame `frame_index`
    #[inline]
    pub fn index(&self, slot: usize, frame_index: usize) -> usize {
        slot + frame_index * self.row_stride()
    }

    /// Texture coordinate of the centre of linear pixel `index`
    ///
    /// V grows downwards from the first row unless `flip_v` is set.
    pub fn pixel_uv(&self, index: usize, flip_v: bool) -> Vec2 {
        let width = self.width as usize;
        let (column, row) = (index % width, index / width);
        let u = (column as f32 + 0.5) / self.width as f32;
        let v = (row as f32 + 0.5) / self.height() as f32;
        Vec2::new(u, if flip_v { 1.0 - v } else { v })
    }

    /// Fraction of the texture height covered by one frame
    pub fn row_height(&self) -> f32 {
        1.0 / self.frame_count as f32
    }
}
