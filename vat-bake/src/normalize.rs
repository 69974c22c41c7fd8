//! Normalization laws and raw channel accumulation
//!
//! Bakers write raw (pre-normalization) values into a [`RawChannel`] during
//! the data pass. Once every frame is in, the channel is finished with one of
//! the laws below; slots nobody wrote keep their sentinel fill.

use glam::Vec3;

use crate::buffer::{Pixel, PixelBuffer};
use crate::layout::FrameLayout;

/// Fill for transform texels that never receive data
pub const EMPTY_PIXEL: Pixel = [0.0, 0.0, 0.0, 0.0];

/// Unit-interval law: `clamp(x / divisor + 1, 0, 2) / 2`
///
/// Zero maps to 0.5; `±divisor` maps to 0 and 1.
#[inline]
pub fn unit_interval(x: f32, divisor: f32) -> f32 {
    (x / divisor + 1.0).clamp(0.0, 2.0) / 2.0
}

/// Inverse of [`unit_interval`] for values that were inside `±divisor`
#[inline]
pub fn unit_interval_inverse(y: f32, divisor: f32) -> f32 {
    (y * 2.0 - 1.0) * divisor
}

/// Direct-interval law: `clamp((x - min) / extent, 0, 1)`
#[inline]
pub fn direct_interval(x: f32, min: f32, extent: f32) -> f32 {
    ((x - min) / extent).clamp(0.0, 1.0)
}

#[inline]
pub fn direct_interval_inverse(y: f32, min: f32, extent: f32) -> f32 {
    min + y * extent
}

/// Move a unit direction from [-1, 1] into [0, 1]
#[inline]
pub fn unsign(v: Vec3) -> Vec3 {
    ((v + Vec3::ONE) / 2.0).clamp(Vec3::ZERO, Vec3::ONE)
}

/// A pixel buffer of raw values plus which texels were written
#[derive(Debug, Clone)]
pub struct RawChannel {
    buffer: PixelBuffer,
    written: Vec<bool>,
}

impl RawChannel {
    pub fn new(layout: &FrameLayout, fill: Pixel) -> Self {
        let buffer = PixelBuffer::for_layout(layout, fill);
        let written = vec![false; buffer.len()];
        Self { buffer, written }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[inline]
    pub fn write(&mut self, index: usize, rgb: Vec3, alpha: f32) {
        self.buffer.set(index, [rgb.x, rgb.y, rgb.z, alpha]);
        self.written[index] = true;
    }

    #[inline]
    pub fn write_pixel(&mut self, index: usize, pixel: Pixel) {
        self.buffer.set(index, pixel);
        self.written[index] = true;
    }

    /// Raw value at `index` if it was written
    pub fn get(&self, index: usize) -> Option<Pixel> {
        if *self.written.get(index)? {
            self.buffer.get(index)
        } else {
            None
        }
    }

    pub fn written_count(&self) -> usize {
        self.written.iter().filter(|&&w| w).count()
    }

    fn finish_with(mut self, f: impl Fn(usize, f32) -> f32) -> PixelBuffer {
        for (pixel, _) in self
            .buffer
            .pixels
            .iter_mut()
            .zip(&self.written)
            .filter(|(_, written)| **written)
        {
            for (channel, value) in pixel.iter_mut().take(3).enumerate() {
                *value = f(channel, *value);
            }
        }
        self.buffer
    }

    /// Unit-interval law on RGB, alpha kept
    pub fn finish_symmetric(self, divisor: Vec3) -> PixelBuffer {
        let divisor = divisor.to_array();
        self.finish_with(|channel, x| unit_interval(x, divisor[channel]))
    }

    /// Direct-interval law on RGB, alpha kept
    pub fn finish_direct(self, min: Vec3, extent: Vec3) -> PixelBuffer {
        let (min, extent) = (min.to_array(), extent.to_array());
        self.finish_with(|channel, x| direct_interval(x, min[channel], extent[channel]))
    }

    /// Values already in their final range
    pub fn finish_raw(self) -> PixelBuffer {
        self.buffer
    }
}
