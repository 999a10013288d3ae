/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::string::String;
use core::fmt::{Debug, Formatter};

use pictor_core::bytestream::ZByteIoError;
use pictor_core::color::ColorModelError;
use pictor_core::colorspace::ColorSpace;

/// BMP errors that can occur during decoding
#[non_exhaustive]
pub enum BmpDecoderErrors {
    /// The file/bytes do not start with `BM`
    InvalidMagicBytes,
    /// The output buffer is too small, expected at least
    /// a size but got another size
    TooSmallBuffer(usize, usize),
    /// Generic message
    GenericStatic(&'static str),
    /// Generic allocated message
    Generic(String),
    /// Too large dimensions for a given width or
    /// height
    TooLargeDimensions(&'static str, usize, usize),
    /// A calculation overflowed
    OverFlowOccurred,
    /// The compression field names a scheme we do not decode
    UnsupportedCompression(u32),
    /// The bit depth is valid for BMP but not for this header/compression pair
    UnsupportedDepth(u16),
    /// Pixel data referenced a missing palette entry
    InvalidPaletteIndex(ColorModelError),
    /// The RLE stream moved outside the image
    CorruptRle(&'static str),
    IoErrors(ZByteIoError)
}

impl BmpDecoderErrors {
    /// True if the error was raised for an otherwise well formed file
    /// using a feature this decoder does not implement
    pub const fn is_unsupported(&self) -> bool {
        matches!(
            self,
            BmpDecoderErrors::UnsupportedCompression(_) | BmpDecoderErrors::UnsupportedDepth(_)
        )
    }
}

impl Debug for BmpDecoderErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidMagicBytes => {
                writeln!(f, "Invalid magic bytes, file does not start with BM")
            }
            Self::TooSmallBuffer(expected, found) => {
                writeln!(
                    f,
                    "Too small of buffer, expected {} but found {}",
                    expected, found
                )
            }
            Self::GenericStatic(header) => {
                writeln!(f, "{}", header)
            }
            Self::TooLargeDimensions(dimension, expected, found) => {
                writeln!(
                    f,
                    "Too large dimensions for {dimension} , {found} exceeds {expected}"
                )
            }
            Self::Generic(message) => {
                writeln!(f, "{}", message)
            }
            Self::OverFlowOccurred => {
                writeln!(f, "Overflow occurred")
            }
            Self::UnsupportedCompression(value) => {
                writeln!(f, "Unsupported BMP compression scheme {value}")
            }
            Self::UnsupportedDepth(depth) => {
                writeln!(f, "Unsupported bit depth {depth}")
            }
            Self::InvalidPaletteIndex(err) => {
                writeln!(f, "{:?}", err)
            }
            Self::CorruptRle(reason) => {
                writeln!(f, "Corrupt RLE data: {reason}")
            }
            Self::IoErrors(err) => {
                writeln!(f, "{:?}", err)
            }
        }
    }
}

impl core::fmt::Display for BmpDecoderErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BmpDecoderErrors {}

impl From<ZByteIoError> for BmpDecoderErrors {
    fn from(value: ZByteIoError) -> Self {
        BmpDecoderErrors::IoErrors(value)
    }
}

impl From<ColorModelError> for BmpDecoderErrors {
    fn from(value: ColorModelError) -> Self {
        BmpDecoderErrors::InvalidPaletteIndex(value)
    }
}

impl From<&'static str> for BmpDecoderErrors {
    fn from(value: &'static str) -> Self {
        BmpDecoderErrors::GenericStatic(value)
    }
}

/// Errors that can occur during encoding
pub enum BmpEncoderErrors {
    /// The colorspace cannot be written to a bmp file
    UnsupportedColorspace(ColorSpace),
    /// Width or height does not fit the header or is zero
    InvalidDimensions(usize, usize),
    /// Input length is not `width*height*components`
    WrongInputSize(usize, usize),
    IoErrors(ZByteIoError)
}

impl Debug for BmpEncoderErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnsupportedColorspace(colorspace) => {
                writeln!(f, "Cannot encode colorspace {colorspace:?} as bmp")
            }
            Self::InvalidDimensions(width, height) => {
                writeln!(f, "Invalid dimensions {width}x{height} for bmp")
            }
            Self::WrongInputSize(expected, found) => {
                writeln!(f, "Expected input of {expected} bytes but found {found}")
            }
            Self::IoErrors(err) => {
                writeln!(f, "{:?}", err)
            }
        }
    }
}

impl core::fmt::Display for BmpEncoderErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BmpEncoderErrors {}

impl From<ZByteIoError> for BmpEncoderErrors {
    fn from(value: ZByteIoError) -> Self {
        BmpEncoderErrors::IoErrors(value)
    }
}
