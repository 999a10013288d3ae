/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Errors possible while decoding or encoding through the plugin interface
//!
//! Every codec crate has its own error type, they are folded into
//! [`ImageErrors`] here so callers only ever match on one taxonomy.
use std::fmt::{Debug, Display, Formatter};

use pictor_core::bitmap::BitmapError;
use pictor_core::color::ColorModelError;

use crate::codecs::ImageFormat;

/// Part of the decoding pipeline a [`ImageErrors::DecodeFailed`]
/// originated from
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
    /// Container or segment structure, checksums and frame headers
    Header,
    /// Entropy coded data, e.g. huffman codes or a truncated sample stream
    Entropy,
    /// Inverse transforms, color conversion and palette lookup
    Transform,
    /// Undoing prediction filters
    Filter
}

/// All errors the plugin interface can return
#[derive(Clone, Eq, PartialEq)]
pub enum ImageErrors {
    /// The signature or header did not validate when the decoder was created
    ///
    /// `format` is `None` when no known signature matched at all.
    InvalidFormat {
        format: Option<ImageFormat>,
        reason: String
    },
    /// The bitstream is malformed after the header validated
    DecodeFailed {
        format: ImageFormat,
        stage:  Stage,
        reason: String
    },
    /// A frame past [`frame_count`](crate::traits::ImageDecoderPlugin::frame_count)
    /// was requested
    IndexOutOfRange { index: usize, frame_count: usize },
    /// The encoder accepted its input but could not finish writing it
    EncodeFailed {
        format: ImageFormat,
        reason: String
    },
    /// The encoder cannot express the requested configuration
    UnsupportedConfiguration {
        format: ImageFormat,
        reason: String
    },
    /// The file is well formed but uses a feature the codec does not implement
    UnsupportedVariant {
        format: ImageFormat,
        reason: String
    }
}

impl ImageErrors {
    /// Format the error was raised for, if any
    pub const fn format(&self) -> Option<ImageFormat> {
        match self {
            Self::InvalidFormat { format, .. } => *format,
            Self::DecodeFailed { format, .. }
            | Self::EncodeFailed { format, .. }
            | Self::UnsupportedConfiguration { format, .. }
            | Self::UnsupportedVariant { format, .. } => Some(*format),
            Self::IndexOutOfRange { .. } => None
        }
    }
    /// Stage of a [`DecodeFailed`](Self::DecodeFailed) error
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::DecodeFailed { stage, .. } => Some(*stage),
            _ => None
        }
    }

    pub(crate) fn invalid_format<E: Debug>(format: ImageFormat, error: E) -> ImageErrors {
        ImageErrors::InvalidFormat {
            format: Some(format),
            reason: reason(error)
        }
    }
    pub(crate) fn decode_failed<E: Debug>(
        format: ImageFormat, stage: Stage, error: E
    ) -> ImageErrors {
        ImageErrors::DecodeFailed {
            format,
            stage,
            reason: reason(error)
        }
    }
    pub(crate) fn encode_failed<E: Debug>(format: ImageFormat, error: E) -> ImageErrors {
        ImageErrors::EncodeFailed {
            format,
            reason: reason(error)
        }
    }
    pub(crate) fn unsupported_config<E: Debug>(format: ImageFormat, error: E) -> ImageErrors {
        ImageErrors::UnsupportedConfiguration {
            format,
            reason: reason(error)
        }
    }
    pub(crate) fn unsupported_variant<E: Debug>(format: ImageFormat, error: E) -> ImageErrors {
        ImageErrors::UnsupportedVariant {
            format,
            reason: reason(error)
        }
    }
    /// Pixels handed back by a codec could not be turned into a bitmap
    pub(crate) fn from_color_model(format: ImageFormat, error: ColorModelError) -> ImageErrors {
        ImageErrors::decode_failed(format, Stage::Transform, error)
    }
    pub(crate) fn from_bitmap(format: ImageFormat, error: BitmapError) -> ImageErrors {
        ImageErrors::decode_failed(format, Stage::Transform, error)
    }
}

// codec errors print with a trailing newline
fn reason<E: Debug>(error: E) -> String {
    format!("{error:?}").trim_end().to_string()
}

impl Debug for ImageErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFormat {
                format: Some(format),
                reason
            } => {
                writeln!(f, "Invalid {} file: {reason}", format.name())
            }
            Self::InvalidFormat { format: None, reason } => {
                writeln!(f, "Unrecognized image: {reason}")
            }
            Self::DecodeFailed {
                format,
                stage,
                reason
            } => {
                writeln!(
                    f,
                    "Decoding {} failed at {stage:?} stage: {reason}",
                    format.name()
                )
            }
            Self::IndexOutOfRange { index, frame_count } => {
                writeln!(
                    f,
                    "Frame index {index} out of range, image has {frame_count} frame(s)"
                )
            }
            Self::EncodeFailed { format, reason } => {
                writeln!(f, "Encoding {} failed: {reason}", format.name())
            }
            Self::UnsupportedConfiguration { format, reason } => {
                writeln!(
                    f,
                    "Unsupported {} encoder configuration: {reason}",
                    format.name()
                )
            }
            Self::UnsupportedVariant { format, reason } => {
                writeln!(f, "Unsupported {} variant: {reason}", format.name())
            }
        }
    }
}

impl Display for ImageErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

impl std::error::Error for ImageErrors {}

#[cfg(test)]
mod tests {
    use crate::codecs::ImageFormat;
    use crate::errors::{ImageErrors, Stage};

    struct Codec;

    impl std::fmt::Debug for Codec {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            writeln!(f, "Not enough bytes")
        }
    }

    #[test]
    fn reasons_drop_trailing_newlines() {
        let err = ImageErrors::decode_failed(ImageFormat::Qoi, Stage::Entropy, Codec);
        assert_eq!(
            err,
            ImageErrors::DecodeFailed {
                format: ImageFormat::Qoi,
                stage:  Stage::Entropy,
                reason: "Not enough bytes".to_string()
            }
        );
        assert_eq!(err.stage(), Some(Stage::Entropy));
        assert_eq!(err.format(), Some(ImageFormat::Qoi));
    }

    #[test]
    fn index_errors_have_no_format() {
        let err = ImageErrors::IndexOutOfRange {
            index:       3,
            frame_count: 1
        };
        assert_eq!(err.format(), None);
        assert_eq!(err.stage(), None);
        assert!(format!("{err}").contains("index 3"));
    }

    #[test]
    fn unrecognized_input_has_no_format() {
        let err = ImageErrors::InvalidFormat {
            format: None,
            reason: "No known image signature found".to_string()
        };
        assert_eq!(err.format(), None);
        assert!(format!("{err}").starts_with("Unrecognized image"));

        let err = ImageErrors::invalid_format(ImageFormat::Bmp, Codec);
        assert_eq!(err.format(), Some(ImageFormat::Bmp));
        assert!(format!("{err}").contains("Invalid BMP file"));
    }
}
