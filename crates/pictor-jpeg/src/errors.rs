/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Contains most common errors that may be encountered in decoding a Decoder
//! image
use alloc::string::String;
use core::fmt::{Debug, Display, Formatter};

use pictor_core::bytestream::ZByteIoError;
use pictor_core::colorspace::ColorSpace;

use crate::misc::{
    START_OF_FRAME_EXT_AR, START_OF_FRAME_LOS_SEQ, START_OF_FRAME_LOS_SEQ_AR,
    START_OF_FRAME_PROG_DCT, START_OF_FRAME_PROG_DCT_AR
};

/// Common Decode errors
#[allow(clippy::module_name_repetitions)]
#[non_exhaustive]
pub enum DecodeErrors {
    /// Any other thing we do not know
    Format(String),
    /// Any other thing we do not know but we
    /// don't need to allocate space on the heap
    FormatStatic(&'static str),
    /// Illegal Magic Bytes
    IllegalMagicBytes(u16),
    /// problems with the Huffman Tables in a Decoder file
    HuffmanDecode(String),
    /// Image has zero width
    ZeroError,
    /// Discrete Quantization Tables error
    DqtError(String),
    /// Start of scan errors
    SosError(String),
    /// Start of frame errors
    SofError(String),
    /// The image uses a coding process or layout the decoder does not implement
    Unsupported(UnsupportedSchemes),
    /// MCU errors
    MCUError(String),
    /// The entropy coded data ended before the end of image marker
    ExhaustedData,
    /// Large image dimensions(Corrupted data)?
    LargeDimensions(usize),
    /// Too small output for size
    TooSmallOutput(usize, usize),
    IoErrors(ZByteIoError)
}

impl DecodeErrors {
    /// True if the file is a valid jpeg the decoder cannot handle
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
    /// True if the error came from the entropy coded segment rather
    /// than from a marker segment
    pub const fn is_entropy_error(&self) -> bool {
        matches!(
            self,
            Self::HuffmanDecode(_) | Self::MCUError(_) | Self::ExhaustedData
        )
    }
}

impl From<&'static str> for DecodeErrors {
    fn from(data: &'static str) -> Self {
        return Self::FormatStatic(data);
    }
}

impl From<ZByteIoError> for DecodeErrors {
    fn from(data: ZByteIoError) -> Self {
        return Self::IoErrors(data);
    }
}

impl Debug for DecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match &self {
            Self::Format(ref a) => write!(f, "{a:?}"),
            Self::FormatStatic(a) => write!(f, "{:?}", &a),

            Self::HuffmanDecode(ref reason) => {
                write!(f, "Error decoding huffman values: {reason}")
            }
            Self::ZeroError => write!(f, "Image width or height is set to zero, cannot continue"),
            Self::DqtError(ref reason) => write!(f, "Error parsing DQT segment. Reason:{reason}"),
            Self::SosError(ref reason) => write!(f, "Error parsing SOS Segment. Reason:{reason}"),
            Self::SofError(ref reason) => write!(f, "Error parsing SOF segment. Reason:{reason}"),
            Self::IllegalMagicBytes(bytes) => {
                write!(f, "Error parsing image. Illegal start bytes:{bytes:X}")
            }
            Self::MCUError(ref reason) => write!(f, "Error in decoding MCU. Reason {reason}"),
            Self::Unsupported(ref image_type) => {
                write!(f, "{image_type:?}")
            }
            Self::ExhaustedData => write!(f, "Exhausted data in the image before end of image"),
            Self::LargeDimensions(ref dimensions) => write!(
                f,
                "Too large dimensions {dimensions}, larger than the configured limit"
            ),
            Self::TooSmallOutput(expected, found) => write!(
                f,
                "Too small output, expected buffer with at least {expected} bytes but got one with {found} bytes"
            ),
            Self::IoErrors(error) => write!(f, "I/O errors {error:?}")
        }
    }
}

impl Display for DecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeErrors {}

/// Contains Unsupported/Yet-to-be supported Decoder image encoding types.
#[derive(Eq, PartialEq, Copy, Clone)]
pub enum UnsupportedSchemes {
    /// SOF_2 Progressive DCT, Huffman coding
    ProgressiveDctHuffman,
    /// SOF_3 Lossless (sequential), huffman coding,
    LosslessHuffman,
    /// SOF_5..SOF_7 and SOF_13..SOF_15, hierarchical coding
    Hierarchical(u8),
    /// SOF_9 Extended sequential DCT, arithmetic coding
    ExtendedSequentialDctArithmetic,
    /// SOF_10 Progressive DCT, arithmetic coding,
    ProgressiveDctArithmetic,
    /// SOF_11 Lossless ( sequential), arithmetic coding
    LosslessArithmetic,
    /// Samples with more than 8 bits of precision
    Precision(u8),
    /// Component counts other than 1 or 3, e.g CMYK
    ComponentCount(u8),
    /// Horizontal and vertical sampling factors above 2
    SamplingFactors(u8, u8)
}

impl Debug for UnsupportedSchemes {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match &self {
            Self::ProgressiveDctHuffman => write!(
                f,
                "The library cannot yet decode images encoded using Progressive DCT Huffman scheme"
            ),
            Self::LosslessHuffman => write!(
                f,
                "The library cannot yet decode images encoded with Lossless Huffman encoding scheme"
            ),
            Self::Hierarchical(sof) => write!(
                f,
                "The library cannot yet decode hierarchical images (SOF_{sof})"
            ),
            Self::ExtendedSequentialDctArithmetic => write!(
                f,
                "The library cannot yet decode images encoded with Extended Sequential DCT Arithmetic scheme"
            ),
            Self::ProgressiveDctArithmetic => write!(
                f,
                "The library cannot yet decode images encoded with Progressive DCT Arithmetic scheme"
            ),
            Self::LosslessArithmetic => write!(
                f,
                "The library cannot yet decode images encoded with Lossless Arithmetic encoding scheme"
            ),
            Self::Precision(bits) => write!(
                f,
                "The library can only decode 8-bit images, the image has {bits} bits of precision"
            ),
            Self::ComponentCount(count) => write!(
                f,
                "The library can only decode images with 1 or 3 components, the image has {count}"
            ),
            Self::SamplingFactors(h, v) => write!(
                f,
                "The library only supports sampling factors of 1 and 2, found ({h},{v})"
            )
        }
    }
}

impl UnsupportedSchemes {
    /// Create an unsupported scheme from the low byte of a
    /// start of frame marker
    #[must_use]
    pub fn from_int(int: u8) -> Option<UnsupportedSchemes> {
        let int = u16::from_be_bytes([0xff, int]);

        match int {
            START_OF_FRAME_PROG_DCT => Some(Self::ProgressiveDctHuffman),
            START_OF_FRAME_LOS_SEQ => Some(Self::LosslessHuffman),
            START_OF_FRAME_EXT_AR => Some(Self::ExtendedSequentialDctArithmetic),
            START_OF_FRAME_PROG_DCT_AR => Some(Self::ProgressiveDctArithmetic),
            START_OF_FRAME_LOS_SEQ_AR => Some(Self::LosslessArithmetic),
            0xffc5..=0xffc7 | 0xffcd..=0xffcf => Some(Self::Hierarchical((int & 0xF) as u8)),
            _ => None
        }
    }
}

/// Errors that may occur when encoding a jpeg
pub enum EncodeErrors {
    /// The colorspace cannot be written as a baseline jpeg
    UnsupportedColorspace(ColorSpace),
    /// Width or height is zero or larger than 65535
    InvalidDimensions(usize, usize),
    /// Input length is not `width*height*components`, expected vs found
    WrongInputSize(usize, usize),
    Generic(&'static str),
    IoErrors(ZByteIoError)
}

impl Debug for EncodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnsupportedColorspace(colorspace) => {
                writeln!(f, "Cannot encode colorspace {colorspace:?} as jpeg")
            }
            Self::InvalidDimensions(width, height) => {
                writeln!(f, "Invalid dimensions {width}x{height} for jpeg")
            }
            Self::WrongInputSize(expected, found) => {
                writeln!(f, "Expected input of {expected} bytes but found {found}")
            }
            Self::Generic(val) => writeln!(f, "{val}"),
            Self::IoErrors(err) => writeln!(f, "{err:?}")
        }
    }
}

impl Display for EncodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeErrors {}

impl From<ZByteIoError> for EncodeErrors {
    fn from(val: ZByteIoError) -> Self {
        Self::IoErrors(val)
    }
}
