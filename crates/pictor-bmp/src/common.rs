/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use pictor_core::colorspace::ColorSpace;

/// Compression field of the info header
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BmpCompression {
    RGB,
    RLE8,
    RLE4,
    BITFIELDS,
    /// Windows CE extension, like `BITFIELDS` with an explicit alpha mask
    ALPHABITFIELDS,
    Unknown
}

impl BmpCompression {
    /// Map the raw header value to a compression scheme
    ///
    /// Returns `None` for schemes this crate cannot decode,
    /// i.e. embedded JPEG (4) and PNG (5) streams.
    pub fn from_u32(num: u32) -> Option<BmpCompression> {
        match num {
            0 => Some(BmpCompression::RGB),
            1 => Some(BmpCompression::RLE8),
            2 => Some(BmpCompression::RLE4),
            3 => Some(BmpCompression::BITFIELDS),
            6 => Some(BmpCompression::ALPHABITFIELDS),
            _ => None
        }
    }
    pub const fn is_rle(self) -> bool {
        matches!(self, BmpCompression::RLE4 | BmpCompression::RLE8)
    }
    pub const fn is_bitfields(self) -> bool {
        matches!(
            self,
            BmpCompression::BITFIELDS | BmpCompression::ALPHABITFIELDS
        )
    }
}

/// Layout of the decoded samples
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BmpPixelFormat {
    None,
    /// Indices into a palette, expanded to RGB
    PAL8,
    /// 8 bit image without a palette
    GRAY8,
    RGB,
    RGBA
}

impl BmpPixelFormat {
    pub const fn num_components(self) -> usize {
        match self {
            BmpPixelFormat::None => 0,
            BmpPixelFormat::GRAY8 => 1,
            BmpPixelFormat::PAL8 | BmpPixelFormat::RGB => 3,
            BmpPixelFormat::RGBA => 4
        }
    }
    pub const fn into_colorspace(self) -> ColorSpace {
        match self {
            BmpPixelFormat::None => ColorSpace::Unknown,
            BmpPixelFormat::GRAY8 => ColorSpace::Luma,
            BmpPixelFormat::PAL8 | BmpPixelFormat::RGB => ColorSpace::RGB,
            BmpPixelFormat::RGBA => ColorSpace::RGBA
        }
    }
}

/// A single channel described by a bitfield mask
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct MaskChannel {
    mask:  u32,
    shift: u32,
    bits:  u32
}

impl MaskChannel {
    pub fn new(mask: u32) -> MaskChannel {
        if mask == 0 {
            return MaskChannel::default();
        }
        let shift = mask.trailing_zeros();
        // only the contiguous run starting at the lowest set bit counts
        let bits = (mask >> shift).trailing_ones();

        MaskChannel { mask, shift, bits }
    }
    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }
    /// Extract the channel from `value` and scale it to eight bits
    #[inline(always)]
    pub fn extract(self, value: u32) -> u8 {
        if self.bits == 0 {
            return 0;
        }
        let v = (value & self.mask) >> self.shift;
        let v = v & ((1_u64 << self.bits) - 1) as u32;

        if self.bits >= 8 {
            (v >> (self.bits - 8)) as u8
        } else {
            let max = (1_u32 << self.bits) - 1;
            ((v * 255 + max / 2) / max) as u8
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::common::{BmpCompression, MaskChannel};

    #[test]
    fn mask_scaling() {
        let five = MaskChannel::new(0x7C00);
        assert_eq!(five.extract(0x7C00), 255);
        assert_eq!(five.extract(0), 0);
        assert_eq!(five.extract(0x4000), 132);

        let eight = MaskChannel::new(0xFF00_0000);
        assert_eq!(eight.extract(0x8000_0000), 128);

        let wide = MaskChannel::new(0x3FF);
        assert_eq!(wide.extract(0x3FF), 255);
        assert!(MaskChannel::new(0).is_empty());
    }

    #[test]
    fn compression_values() {
        assert_eq!(BmpCompression::from_u32(6), Some(BmpCompression::ALPHABITFIELDS));
        assert_eq!(BmpCompression::from_u32(4), None);
        assert!(BmpCompression::RLE4.is_rle());
    }
}
