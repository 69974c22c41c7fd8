//! Dense RGBA float pixel arrays and their quantized forms

use serde::{Deserialize, Serialize};

use crate::layout::FrameLayout;

/// One RGBA texel
pub type Pixel = [f32; 4];

/// Bits per channel of a written texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ChannelDepth {
    Eight,
    #[default]
    Sixteen,
}

impl ChannelDepth {
    pub const fn bits(self) -> u8 {
        match self {
            ChannelDepth::Eight => 8,
            ChannelDepth::Sixteen => 16,
        }
    }
}

impl TryFrom<u8> for ChannelDepth {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            8 => Ok(ChannelDepth::Eight),
            16 => Ok(ChannelDepth::Sixteen),
            other => Err(format!("unsupported channel depth {} (expected 8 or 16)", other)),
        }
    }
}

impl From<ChannelDepth> for u8 {
    fn from(depth: ChannelDepth) -> u8 {
        depth.bits()
    }
}

/// Convert f32 in [0, 1] to unorm8, rounding to nearest
#[inline]
pub fn f32_to_unorm8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Convert f32 in [0, 1] to unorm16, rounding to nearest
#[inline]
pub fn f32_to_unorm16(value: f32) -> u16 {
    (value.clamp(0.0, 1.0) * 65535.0).round() as u16
}

/// Row-major RGBA float image, first row first
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Pixel>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, fill: Pixel) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
        }
    }

    pub fn for_layout(layout: &FrameLayout, fill: Pixel) -> Self {
        Self::new(layout.width, layout.height(), fill)
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Pixel> {
        self.pixels.get(index).copied()
    }

    #[inline]
    pub fn set(&mut self, index: usize, pixel: Pixel) {
        self.pixels[index] = pixel;
    }

    /// Flat `[r, g, b, a, r, g, b, a, ...]` slice
    pub fn as_flat(&self) -> &[f32] {
        self.pixels.as_flattened()
    }

    pub fn to_unorm8(&self) -> Vec<u8> {
        self.as_flat().iter().map(|&v| f32_to_unorm8(v)).collect()
    }

    pub fn to_unorm16(&self) -> Vec<u16> {
        self.as_flat().iter().map(|&v| f32_to_unorm16(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unorm_conversion_rounds() {
        assert_eq!(f32_to_unorm8(0.0), 0);
        assert_eq!(f32_to_unorm8(0.5), 128);
        assert_eq!(f32_to_unorm8(1.0), 255);
        assert_eq!(f32_to_unorm8(2.0), 255);
        assert_eq!(f32_to_unorm8(-1.0), 0);
        assert_eq!(f32_to_unorm16(0.5), 32768);
        assert_eq!(f32_to_unorm16(1.0), 65535);
    }

    #[test]
    fn test_flat_layout_is_row_major_rgba() {
        let mut buffer = PixelBuffer::new(2, 2, [0.0; 4]);
        buffer.set(3, [1.0, 0.5, 0.25, 1.0]);
        let flat = buffer.as_flat();
        assert_eq!(flat.len(), 16);
        assert_eq!(&flat[12..16], &[1.0, 0.5, 0.25, 1.0]);
        assert_eq!(buffer.to_unorm8()[12..16], [255, 128, 64, 255]);
    }

    #[test]
    fn test_channel_depth_serde() {
        let depth: ChannelDepth = serde_json::from_str("8").unwrap();
        assert_eq!(depth, ChannelDepth::Eight);
        assert_eq!(serde_json::to_string(&ChannelDepth::Sixteen).unwrap(), "16");
        assert!(serde_json::from_str::<ChannelDepth>("12").is_err());
    }
}
