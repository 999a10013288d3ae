/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::string::String;
use core::fmt::{Debug, Display, Formatter};

use pictor_core::bytestream::ZByteIoError;
use pictor_core::color::ColorModelError;
use pictor_core::colorspace::ColorSpace;
use pictor_inflate::errors::InflateDecodeErrors;

/// Errors possible during png decoding
#[non_exhaustive]
pub enum PngDecodeErrors {
    /// The first eight bytes are not the png signature
    BadSignature,
    GenericStatic(&'static str),
    Generic(String),
    /// Stored and calculated crc of a chunk, in that order
    BadCrc(u32, u32),
    /// The zlib stream of the image data is corrupt
    ZlibDecodeErrors(InflateDecodeErrors),
    /// A scanline used a filter type outside 0..=4
    UnknownFilter(u8),
    /// Too large dimensions for a given width or height
    TooLargeDimensions(&'static str, usize, usize),
    /// A critical chunk this decoder does not understand
    UnsupportedCriticalChunk([u8; 4]),
    /// Pixel data referenced a missing palette entry
    InvalidPaletteIndex(ColorModelError),
    /// The requested animation frame does not exist
    NoMoreFrames,
    /// The output buffer is too small, expected vs found
    TooSmallOutput(usize, usize),
    IoErrors(ZByteIoError)
}

impl PngDecodeErrors {
    /// True if the file is well formed but uses a feature this
    /// decoder does not implement
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedCriticalChunk(_))
    }
}

impl Debug for PngDecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BadSignature => writeln!(f, "Bad PNG signature, not a png"),
            Self::GenericStatic(val) => writeln!(f, "{val:?}"),
            Self::Generic(val) => writeln!(f, "{val:?}"),
            Self::BadCrc(expected, found) => writeln!(
                f,
                "CRC does not match, expected {expected} but found {found}"
            ),
            Self::ZlibDecodeErrors(err) => {
                writeln!(f, "Error decoding idat chunks {err:?}")
            }
            Self::UnknownFilter(filter) => {
                writeln!(f, "Unknown scanline filter type {filter}")
            }
            Self::TooLargeDimensions(dimension, expected, found) => writeln!(
                f,
                "Too large dimensions for {dimension}, {found} exceeds {expected}"
            ),
            Self::UnsupportedCriticalChunk(name) => writeln!(
                f,
                "Unsupported critical chunk {:?}",
                String::from_utf8_lossy(name)
            ),
            Self::InvalidPaletteIndex(err) => writeln!(f, "{err:?}"),
            Self::NoMoreFrames => writeln!(f, "No more frames present"),
            Self::TooSmallOutput(expected, found) => writeln!(
                f,
                "Too small output, expected buffer with at least {expected} bytes but got one with {found} bytes"
            ),
            Self::IoErrors(err) => writeln!(f, "{err:?}")
        }
    }
}

impl Display for PngDecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PngDecodeErrors {}

impl From<&'static str> for PngDecodeErrors {
    fn from(val: &'static str) -> Self {
        Self::GenericStatic(val)
    }
}

impl From<String> for PngDecodeErrors {
    fn from(val: String) -> Self {
        Self::Generic(val)
    }
}

impl From<InflateDecodeErrors> for PngDecodeErrors {
    fn from(val: InflateDecodeErrors) -> Self {
        Self::ZlibDecodeErrors(val)
    }
}

impl From<ZByteIoError> for PngDecodeErrors {
    fn from(val: ZByteIoError) -> Self {
        Self::IoErrors(val)
    }
}

impl From<ColorModelError> for PngDecodeErrors {
    fn from(val: ColorModelError) -> Self {
        Self::InvalidPaletteIndex(val)
    }
}

/// Errors possible during png encoding
pub enum PngEncodeErrors {
    /// The colorspace has no png color type
    UnsupportedColorspace(ColorSpace),
    Generic(&'static str),
    /// Width or height is zero or does not fit in 31 bits
    InvalidDimensions(usize, usize),
    /// Input length is not `width*height*components`
    WrongInputSize(usize, usize),
    IoErrors(ZByteIoError)
}

impl Debug for PngEncodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnsupportedColorspace(colorspace) => {
                writeln!(f, "Cannot encode colorspace {colorspace:?} as png")
            }
            Self::Generic(val) => writeln!(f, "{val}"),
            Self::InvalidDimensions(width, height) => {
                writeln!(f, "Invalid dimensions {width}x{height} for png")
            }
            Self::WrongInputSize(expected, found) => {
                writeln!(f, "Expected input of {expected} bytes but found {found}")
            }
            Self::IoErrors(err) => writeln!(f, "{err:?}")
        }
    }
}

impl Display for PngEncodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PngEncodeErrors {}

impl From<ZByteIoError> for PngEncodeErrors {
    fn from(val: ZByteIoError) -> Self {
        Self::IoErrors(val)
    }
}
