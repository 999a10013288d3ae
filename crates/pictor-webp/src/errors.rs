/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Errors possible when decoding or encoding webp files
use alloc::string::String;
use core::fmt::{Debug, Display, Formatter};

use pictor_core::bytestream::ZByteIoError;
use pictor_core::colorspace::ColorSpace;

/// Errors possible during webp decoding
#[non_exhaustive]
pub enum WebpDecodeErrors {
    /// The file does not start with `RIFF` .. `WEBP`
    BadSignature,
    GenericStatic(&'static str),
    Generic(String),
    /// Dimension name, maximum allowed and value found
    TooLargeDimensions(&'static str, usize, usize),
    /// A chunk claims more bytes than the file holds,
    /// chunk name, bytes needed and bytes present
    TruncatedChunk([u8; 4], usize, usize),
    /// The file is valid but uses something this decoder does not implement
    Unsupported(&'static str),
    /// Prefix coded or boolean coded data is corrupt or ran out early
    EntropyError(&'static str),
    /// The lossless transforms or the lossy reconstruction hit invalid data
    TransformError(&'static str),
    /// The alpha plane uses an unknown filter or has the wrong size
    FilterError(&'static str),
    /// The requested animation frame does not exist
    NoMoreFrames,
    IoErrors(ZByteIoError)
}

impl WebpDecodeErrors {
    /// True if the file is well formed but uses a feature this
    /// decoder does not implement
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
    /// True if the error was raised while entropy decoding, running out
    /// of compressed data included
    pub const fn is_entropy_error(&self) -> bool {
        matches!(self, Self::EntropyError(_) | Self::TruncatedChunk(..))
    }
    pub const fn is_transform_error(&self) -> bool {
        matches!(self, Self::TransformError(_))
    }
    pub const fn is_filter_error(&self) -> bool {
        matches!(self, Self::FilterError(_))
    }
}

impl Debug for WebpDecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BadSignature => writeln!(f, "Bad RIFF/WEBP signature, not a webp file"),
            Self::GenericStatic(val) => writeln!(f, "{val:?}"),
            Self::Generic(val) => writeln!(f, "{val:?}"),
            Self::TooLargeDimensions(dimension, expected, found) => writeln!(
                f,
                "Too large dimensions for {dimension}, {found} exceeds {expected}"
            ),
            Self::TruncatedChunk(name, needed, present) => writeln!(
                f,
                "Chunk {:?} needs {needed} bytes but only {present} are present",
                String::from_utf8_lossy(name)
            ),
            Self::Unsupported(val) => writeln!(f, "Unsupported webp feature: {val}"),
            Self::EntropyError(val) => writeln!(f, "Corrupt entropy coded data: {val}"),
            Self::TransformError(val) => writeln!(f, "Invalid transform data: {val}"),
            Self::FilterError(val) => writeln!(f, "Invalid alpha data: {val}"),
            Self::NoMoreFrames => writeln!(f, "No more frames present"),
            Self::IoErrors(err) => writeln!(f, "{err:?}")
        }
    }
}

impl Display for WebpDecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for WebpDecodeErrors {}

impl From<&'static str> for WebpDecodeErrors {
    fn from(val: &'static str) -> Self {
        Self::GenericStatic(val)
    }
}

impl From<String> for WebpDecodeErrors {
    fn from(val: String) -> Self {
        Self::Generic(val)
    }
}

impl From<ZByteIoError> for WebpDecodeErrors {
    fn from(val: ZByteIoError) -> Self {
        Self::IoErrors(val)
    }
}

/// Errors possible during webp encoding
pub enum WebpEncodeErrors {
    /// The colorspace cannot be stored in a webp file
    UnsupportedColorspace(ColorSpace),
    Generic(&'static str),
    /// Width or height is zero or larger than 16384
    InvalidDimensions(usize, usize),
    /// Input length is not `width*height*components`
    WrongInputSize(usize, usize),
    IoErrors(ZByteIoError)
}

impl Debug for WebpEncodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnsupportedColorspace(colorspace) => {
                writeln!(f, "Cannot encode colorspace {colorspace:?} as webp")
            }
            Self::Generic(val) => writeln!(f, "{val}"),
            Self::InvalidDimensions(width, height) => {
                writeln!(f, "Invalid dimensions {width}x{height} for webp")
            }
            Self::WrongInputSize(expected, found) => {
                writeln!(f, "Expected input of {expected} bytes but found {found}")
            }
            Self::IoErrors(err) => writeln!(f, "{err:?}")
        }
    }
}

impl Display for WebpEncodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for WebpEncodeErrors {}

impl From<ZByteIoError> for WebpEncodeErrors {
    fn from(val: ZByteIoError) -> Self {
        Self::IoErrors(val)
    }
}
