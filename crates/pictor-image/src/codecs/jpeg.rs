/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![cfg(feature = "jpeg")]
//! Baseline JPEG support
use pictor_core::bitmap::Bitmap;
use pictor_core::bytestream::ZCursor;
use pictor_core::color::expand_to_rgba;
use pictor_core::colorspace::ColorSpace;
use pictor_core::log::trace;
use pictor_core::options::DecoderOptions;
use pictor_jpeg::errors::{DecodeErrors, EncodeErrors};
use pictor_jpeg::{JpegDecoder, JpegEncoder};

use crate::codecs::ImageFormat;
use crate::config::EncoderConfig;
use crate::errors::{ImageErrors, Stage};
use crate::frame::{rgba_bitmap, Frame, FrameCache};
use crate::traits::{ImageDecoderPlugin, ImageEncoder};

const FORMAT: ImageFormat = ImageFormat::Jpeg;

/// Classify an error raised after the first scan header
fn decode_stage(error: &DecodeErrors) -> Stage {
    if error.is_entropy_error() {
        return Stage::Entropy;
    }
    match error {
        DecodeErrors::TooSmallOutput(..) => Stage::Transform,
        _ => Stage::Header
    }
}

fn header_error(error: DecodeErrors) -> ImageErrors {
    if error.is_unsupported() {
        ImageErrors::unsupported_variant(FORMAT, error)
    } else {
        ImageErrors::invalid_format(FORMAT, error)
    }
}

/// JPEG decoder plugin, a single frame
///
/// Grayscale images decode to gray RGB pixels.
pub struct JpegImageDecoderPlugin<'a> {
    decoder:    JpegDecoder<ZCursor<&'a [u8]>>,
    width:      usize,
    height:     usize,
    colorspace: ColorSpace,
    cache:      FrameCache
}

fn render(
    decoder: &mut JpegDecoder<ZCursor<&[u8]>>, width: usize, height: usize, colorspace: ColorSpace
) -> Result<Frame, ImageErrors> {
    let pixels = decoder
        .decode()
        .map_err(|e| ImageErrors::decode_failed(FORMAT, decode_stage(&e), e))?;

    let rgba =
        expand_to_rgba(&pixels, colorspace).map_err(|e| ImageErrors::from_color_model(FORMAT, e))?;

    let bitmap = rgba_bitmap(FORMAT, width, height, &rgba, colorspace.has_alpha())?;
    Ok(Frame::still(bitmap))
}

impl<'a> ImageDecoderPlugin<'a> for JpegImageDecoderPlugin<'a> {
    fn create_with_options(data: &'a [u8], options: DecoderOptions) -> Result<Self, ImageErrors> {
        let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
        decoder.decode_headers().map_err(header_error)?;

        let (width, height) = decoder
            .dimensions()
            .ok_or_else(|| ImageErrors::invalid_format(FORMAT, "No dimensions after headers"))?;
        let colorspace = decoder
            .colorspace()
            .ok_or_else(|| ImageErrors::invalid_format(FORMAT, "No colorspace after headers"))?;

        trace!("JPEG plugin: {}x{} {:?}", width, height, colorspace);

        Ok(JpegImageDecoderPlugin {
            decoder,
            width,
            height,
            colorspace,
            cache: FrameCache::new(1)
        })
    }

    fn format(&self) -> ImageFormat {
        FORMAT
    }

    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn frame(&mut self, index: usize) -> Result<Frame, ImageErrors> {
        let (width, height, colorspace) = (self.width, self.height, self.colorspace);

        self.cache
            .get_or_render(index, |_| render(&mut self.decoder, width, height, colorspace))
    }
}

/// Baseline JPEG encoder
///
/// Alpha is always dropped, the quality defaults to 80.
pub struct JpegWriter {
    config: EncoderConfig
}

impl JpegWriter {
    pub fn new() -> JpegWriter {
        JpegWriter::new_with_config(EncoderConfig::default())
    }
    pub fn new_with_config(config: EncoderConfig) -> JpegWriter {
        JpegWriter { config }
    }
}

impl Default for JpegWriter {
    fn default() -> Self {
        JpegWriter::new()
    }
}

impl ImageEncoder for JpegWriter {
    fn format(&self) -> ImageFormat {
        FORMAT
    }

    fn config(&self) -> EncoderConfig {
        self.config
    }

    fn encode_into(&self, bitmap: &Bitmap, sink: &mut Vec<u8>) -> Result<usize, ImageErrors> {
        self.config.validate(FORMAT)?;

        let (pixels, options) = self.config.prepare(bitmap, false);

        let mut encoder = JpegEncoder::new(&pixels, options);
        Ok(encoder.encode(sink)?)
    }
}

impl From<EncodeErrors> for ImageErrors {
    fn from(error: EncodeErrors) -> Self {
        match error {
            EncodeErrors::UnsupportedColorspace(_)
            | EncodeErrors::InvalidDimensions(..)
            | EncodeErrors::WrongInputSize(..) => ImageErrors::unsupported_config(FORMAT, error),
            EncodeErrors::Generic(_) | EncodeErrors::IoErrors(_) => {
                ImageErrors::encode_failed(FORMAT, error)
            }
        }
    }
}
