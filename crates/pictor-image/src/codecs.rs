/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Entry point for all supported codecs the library understands
//!
//! The codecs here can be enabled and disabled at will through cargo features,
//! a format whose feature is off is still recognized by [`ImageFormat::guess`]
//! but asking for its decoder or encoder fails with
//! [`ImageErrors::UnsupportedVariant`].
#![allow(unused_imports, unused_variables)]

use pictor_core::log::trace;
use pictor_core::options::DecoderOptions;

use crate::config::EncoderConfig;
use crate::errors::ImageErrors;
use crate::traits::{ImageDecoderPlugin, ImageEncoder};

pub mod bmp;
pub mod jpeg;
pub mod png;
pub mod qoi;
pub mod webp;

/// All supported image formats
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum ImageFormat {
    /// Windows Bitmap Files
    Bmp,
    /// Portable Network Graphics, including animated png
    Png,
    /// Joint Photographic Experts Group, baseline
    Jpeg,
    /// WebP, lossy, lossless and animated
    WebP,
    /// Quite Okay Image
    Qoi
}

impl ImageFormat {
    /// Every format, in the order [`guess`](Self::guess) tries them
    pub const ALL: [ImageFormat; 5] = [
        ImageFormat::Png,
        ImageFormat::Jpeg,
        ImageFormat::Qoi,
        ImageFormat::WebP,
        ImageFormat::Bmp
    ];

    /// Human readable name of the format
    pub const fn name(self) -> &'static str {
        match self {
            ImageFormat::Bmp => "BMP",
            ImageFormat::Png => "PNG",
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::WebP => "WebP",
            ImageFormat::Qoi => "QOI"
        }
    }
    /// Canonical file extension, without the leading dot
    pub const fn extension(self) -> &'static str {
        match self {
            ImageFormat::Bmp => "bmp",
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::WebP => "webp",
            ImageFormat::Qoi => "qoi"
        }
    }
    /// Map a file extension to a format, case insensitive
    pub fn from_extension<P: AsRef<str>>(extension: P) -> Option<ImageFormat> {
        match extension.as_ref().to_ascii_lowercase().as_str() {
            "bmp" | "dib" => Some(ImageFormat::Bmp),
            "png" | "apng" => Some(ImageFormat::Png),
            "jpg" | "jpeg" | "jfif" => Some(ImageFormat::Jpeg),
            "webp" => Some(ImageFormat::WebP),
            "qoi" => Some(ImageFormat::Qoi),
            _ => None
        }
    }
    /// Cargo feature gating the codec
    pub const fn feature(self) -> &'static str {
        match self {
            ImageFormat::Bmp => "bmp",
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::WebP => "webp",
            ImageFormat::Qoi => "qoi"
        }
    }
    /// Whether this build carries a decoder and encoder for the format
    pub const fn is_enabled(self) -> bool {
        match self {
            ImageFormat::Bmp => cfg!(feature = "bmp"),
            ImageFormat::Png => cfg!(feature = "png"),
            ImageFormat::Jpeg => cfg!(feature = "jpeg"),
            ImageFormat::WebP => cfg!(feature = "webp"),
            ImageFormat::Qoi => cfg!(feature = "qoi")
        }
    }

    /// Guess the format of an encoded image from its signature
    pub fn guess(bytes: &[u8]) -> Option<ImageFormat> {
        let magic_bytes: [(&[u8], ImageFormat); 3] = [
            (&[137, 80, 78, 71, 13, 10, 26, 10], ImageFormat::Png),
            (&[0xff, 0xd8, 0xff], ImageFormat::Jpeg),
            (b"qoif", ImageFormat::Qoi)
        ];

        for (magic, format) in magic_bytes {
            if bytes.starts_with(magic) {
                trace!("Guessed format {:?} from magic bytes", format);
                return Some(format);
            }
        }
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }
        // a bare BM is too weak, let the decoder look at the header sizes too
        if bytes.starts_with(b"BM") && bmp_header_plausible(bytes) {
            return Some(ImageFormat::Bmp);
        }
        None
    }

    /// Create a decoder plugin for `data`, validating its headers
    pub fn decoder<'a>(
        self, data: &'a [u8]
    ) -> Result<Box<dyn ImageDecoderPlugin<'a> + 'a>, ImageErrors> {
        self.decoder_with_options(data, DecoderOptions::default())
    }

    /// Create a decoder plugin for `data` with custom options
    pub fn decoder_with_options<'a>(
        self, data: &'a [u8], options: DecoderOptions
    ) -> Result<Box<dyn ImageDecoderPlugin<'a> + 'a>, ImageErrors> {
        match self {
            ImageFormat::Bmp => {
                #[cfg(feature = "bmp")]
                {
                    Ok(Box::new(bmp::BmpImageDecoderPlugin::create_with_options(
                        data, options
                    )?))
                }
                #[cfg(not(feature = "bmp"))]
                {
                    Err(feature_disabled(self))
                }
            }
            ImageFormat::Png => {
                #[cfg(feature = "png")]
                {
                    Ok(Box::new(png::PngImageDecoderPlugin::create_with_options(
                        data, options
                    )?))
                }
                #[cfg(not(feature = "png"))]
                {
                    Err(feature_disabled(self))
                }
            }
            ImageFormat::Jpeg => {
                #[cfg(feature = "jpeg")]
                {
                    Ok(Box::new(jpeg::JpegImageDecoderPlugin::create_with_options(
                        data, options
                    )?))
                }
                #[cfg(not(feature = "jpeg"))]
                {
                    Err(feature_disabled(self))
                }
            }
            ImageFormat::WebP => {
                #[cfg(feature = "webp")]
                {
                    Ok(Box::new(webp::WebpImageDecoderPlugin::create_with_options(
                        data, options
                    )?))
                }
                #[cfg(not(feature = "webp"))]
                {
                    Err(feature_disabled(self))
                }
            }
            ImageFormat::Qoi => {
                #[cfg(feature = "qoi")]
                {
                    Ok(Box::new(qoi::QoiImageDecoderPlugin::create_with_options(
                        data, options
                    )?))
                }
                #[cfg(not(feature = "qoi"))]
                {
                    Err(feature_disabled(self))
                }
            }
        }
    }

    /// Create an encoder for this format
    ///
    /// The configuration is validated here, so a combination the format
    /// cannot express fails before any pixels are touched.
    pub fn encoder(self, config: EncoderConfig) -> Result<Box<dyn ImageEncoder>, ImageErrors> {
        config.validate(self)?;

        match self {
            ImageFormat::Bmp => {
                #[cfg(feature = "bmp")]
                {
                    Ok(Box::new(bmp::BmpWriter::new_with_config(config)))
                }
                #[cfg(not(feature = "bmp"))]
                {
                    Err(feature_disabled(self))
                }
            }
            ImageFormat::Png => {
                #[cfg(feature = "png")]
                {
                    Ok(Box::new(png::PngWriter::new_with_config(config)))
                }
                #[cfg(not(feature = "png"))]
                {
                    Err(feature_disabled(self))
                }
            }
            ImageFormat::Jpeg => {
                #[cfg(feature = "jpeg")]
                {
                    Ok(Box::new(jpeg::JpegWriter::new_with_config(config)))
                }
                #[cfg(not(feature = "jpeg"))]
                {
                    Err(feature_disabled(self))
                }
            }
            ImageFormat::WebP => {
                #[cfg(feature = "webp")]
                {
                    Ok(Box::new(webp::WebpWriter::new_with_config(config)))
                }
                #[cfg(not(feature = "webp"))]
                {
                    Err(feature_disabled(self))
                }
            }
            ImageFormat::Qoi => {
                #[cfg(feature = "qoi")]
                {
                    Ok(Box::new(qoi::QoiWriter::new_with_config(config)))
                }
                #[cfg(not(feature = "qoi"))]
                {
                    Err(feature_disabled(self))
                }
            }
        }
    }
}

fn feature_disabled(format: ImageFormat) -> ImageErrors {
    ImageErrors::UnsupportedVariant {
        format,
        reason: format!(
            "support for {} was not compiled in, enable the `{}` feature",
            format.name(),
            format.feature()
        )
    }
}

/// Check the file and info header sizes of something starting with `BM`
fn bmp_header_plausible(bytes: &[u8]) -> bool {
    #[cfg(feature = "bmp")]
    {
        pictor_bmp::probe_bmp(bytes)
    }
    #[cfg(not(feature = "bmp"))]
    {
        bytes.len() >= 18
            && matches!(
                u32::from_le_bytes([bytes[14], bytes[15], bytes[16], bytes[17]]),
                12 | 16 | 40 | 52 | 56 | 64 | 108 | 124
            )
    }
}

/// Sniff the format of `data` and create its decoder plugin
///
/// # Errors
/// [`ImageErrors::InvalidFormat`] without a format when no signature matches, otherwise
/// whatever the format's own `create` returns.
pub fn decoder_for<'a>(data: &'a [u8]) -> Result<Box<dyn ImageDecoderPlugin<'a> + 'a>, ImageErrors> {
    decoder_for_with_options(data, DecoderOptions::default())
}

/// [`decoder_for`] with custom decoder options
pub fn decoder_for_with_options<'a>(
    data: &'a [u8], options: DecoderOptions
) -> Result<Box<dyn ImageDecoderPlugin<'a> + 'a>, ImageErrors> {
    match ImageFormat::guess(data) {
        Some(format) => format.decoder_with_options(data, options),
        None => Err(ImageErrors::InvalidFormat {
            format: None,
            reason: "No known image signature found".to_string()
        })
    }
}

/// Create an encoder for `format` with the given configuration
pub fn encoder_for(
    format: ImageFormat, config: EncoderConfig
) -> Result<Box<dyn ImageEncoder>, ImageErrors> {
    format.encoder(config)
}

#[cfg(test)]
mod tests {
    use crate::codecs::ImageFormat;

    #[test]
    fn guess_signatures() {
        assert_eq!(
            ImageFormat::guess(&[137, 80, 78, 71, 13, 10, 26, 10, 0]),
            Some(ImageFormat::Png)
        );
        assert_eq!(ImageFormat::guess(&[0xff, 0xd8, 0xff, 0xe0]), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::guess(b"qoif\0\0\0\x01"), Some(ImageFormat::Qoi));
        assert_eq!(
            ImageFormat::guess(b"RIFF\x10\0\0\0WEBPVP8L"),
            Some(ImageFormat::WebP)
        );
        // a RIFF file that is not webp
        assert_eq!(ImageFormat::guess(b"RIFF\x10\0\0\0WAVEfmt "), None);
        assert_eq!(ImageFormat::guess(b"BM"), None);
        assert_eq!(ImageFormat::guess(&[]), None);
    }

    #[test]
    fn extensions_round_trip() {
        for format in ImageFormat::ALL {
            assert_eq!(ImageFormat::from_extension(format.extension()), Some(format));
        }
        assert_eq!(ImageFormat::from_extension("JPEG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("gif"), None);
    }
}
