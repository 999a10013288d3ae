/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![allow(clippy::upper_case_acronyms, non_camel_case_types)]

use pictor_core::colorspace::ColorSpace;

/// Chunk types the decoder acts on
///
/// See <https://www.w3.org/TR/png/#5Chunk-layout> and the
/// APNG extension for `acTL`, `fcTL` and `fdAT`
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PngChunkType {
    IHDR,
    PLTE,
    IDAT,
    IEND,
    tRNS,
    acTL,
    fcTL,
    fdAT,
    unkn
}

impl PngChunkType {
    pub fn from_bytes(name: &[u8; 4]) -> PngChunkType {
        match name {
            b"IHDR" => PngChunkType::IHDR,
            b"PLTE" => PngChunkType::PLTE,
            b"IDAT" => PngChunkType::IDAT,
            b"IEND" => PngChunkType::IEND,
            b"tRNS" => PngChunkType::tRNS,
            b"acTL" => PngChunkType::acTL,
            b"fcTL" => PngChunkType::fcTL,
            b"fdAT" => PngChunkType::fdAT,
            _ => PngChunkType::unkn
        }
    }
}

/// Return true if a chunk name marks a chunk that must be understood
/// to display the image (uppercase first letter)
pub const fn is_critical_chunk(name: &[u8; 4]) -> bool {
    name[0] & 0x20 == 0
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FilterMethod {
    None,
    Sub,
    Up,
    Average,
    Paeth
}

impl FilterMethod {
    pub const fn from_int(int: u8) -> Option<FilterMethod> {
        match int {
            0 => Some(FilterMethod::None),
            1 => Some(FilterMethod::Sub),
            2 => Some(FilterMethod::Up),
            3 => Some(FilterMethod::Average),
            4 => Some(FilterMethod::Paeth),
            _ => None
        }
    }
    pub const fn to_int(self) -> u8 {
        match self {
            FilterMethod::None => 0,
            FilterMethod::Sub => 1,
            FilterMethod::Up => 2,
            FilterMethod::Average => 3,
            FilterMethod::Paeth => 4
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum InterlaceMethod {
    #[default]
    Standard,
    Adam7
}

impl InterlaceMethod {
    pub const fn from_int(int: u8) -> Option<InterlaceMethod> {
        match int {
            0 => Some(Self::Standard),
            1 => Some(Self::Adam7),
            _ => None
        }
    }
}

/// Color type stored in the IHDR chunk
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum PngColor {
    #[default]
    Luma,
    Palette,
    LumaA,
    RGB,
    RGBA
}

impl PngColor {
    pub const fn num_components(self) -> u8 {
        match self {
            PngColor::Luma | PngColor::Palette => 1,
            PngColor::LumaA => 2,
            PngColor::RGB => 3,
            PngColor::RGBA => 4
        }
    }
    pub const fn from_int(int: u8) -> Option<PngColor> {
        match int {
            0 => Some(Self::Luma),
            2 => Some(Self::RGB),
            3 => Some(Self::Palette),
            4 => Some(Self::LumaA),
            6 => Some(Self::RGBA),
            _ => None
        }
    }
    pub const fn to_int(self) -> u8 {
        match self {
            Self::Luma => 0,
            Self::RGB => 2,
            Self::Palette => 3,
            Self::LumaA => 4,
            Self::RGBA => 6
        }
    }
    /// Color type used when writing pixels in `colorspace`
    pub const fn from_colorspace(colorspace: ColorSpace) -> Option<PngColor> {
        match colorspace {
            ColorSpace::Luma => Some(Self::Luma),
            ColorSpace::LumaA => Some(Self::LumaA),
            ColorSpace::RGB => Some(Self::RGB),
            ColorSpace::RGBA => Some(Self::RGBA),
            _ => None
        }
    }
    /// Whether `depth` is a legal bit depth for this color type
    pub const fn allows_depth(self, depth: u8) -> bool {
        match self {
            Self::Luma => matches!(depth, 1 | 2 | 4 | 8 | 16),
            Self::Palette => matches!(depth, 1 | 2 | 4 | 8),
            Self::LumaA | Self::RGB | Self::RGBA => matches!(depth, 8 | 16)
        }
    }
}

/// What happens to a frame's region before the next frame is rendered
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum DisposeOp {
    /// Leave the canvas as is
    #[default]
    None,
    /// Clear the region to fully transparent black
    Background,
    /// Restore the region to what it was before the frame was drawn
    Previous
}

impl DisposeOp {
    pub const fn from_int(int: u8) -> Option<DisposeOp> {
        match int {
            0 => Some(Self::None),
            1 => Some(Self::Background),
            2 => Some(Self::Previous),
            _ => None
        }
    }
}

/// How a frame's pixels are combined with the canvas
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum BlendOp {
    /// Overwrite the region including alpha
    #[default]
    Source,
    /// Alpha composite the frame over the region
    Over
}

impl BlendOp {
    pub const fn from_int(int: u8) -> Option<BlendOp> {
        match int {
            0 => Some(Self::Source),
            1 => Some(Self::Over),
            _ => None
        }
    }
}
