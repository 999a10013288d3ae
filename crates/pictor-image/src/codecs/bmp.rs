/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![cfg(feature = "bmp")]
//! Windows bitmap support
use pictor_bmp::{BmpDecoder, BmpDecoderErrors, BmpEncoder, BmpEncoderErrors};
use pictor_core::bitmap::Bitmap;
use pictor_core::bytestream::ZCursor;
use pictor_core::color::expand_to_rgba;
use pictor_core::colorspace::ColorSpace;
use pictor_core::log::trace;
use pictor_core::options::DecoderOptions;

use crate::codecs::ImageFormat;
use crate::config::EncoderConfig;
use crate::errors::{ImageErrors, Stage};
use crate::frame::{rgba_bitmap, Frame, FrameCache};
use crate::traits::{ImageDecoderPlugin, ImageEncoder};

const FORMAT: ImageFormat = ImageFormat::Bmp;

/// Classify an error raised while reading pixel data
fn decode_stage(error: &BmpDecoderErrors) -> Stage {
    match error {
        BmpDecoderErrors::CorruptRle(_)
        | BmpDecoderErrors::IoErrors(_)
        | BmpDecoderErrors::TooSmallBuffer(..) => Stage::Entropy,
        BmpDecoderErrors::InvalidPaletteIndex(_) => Stage::Transform,
        _ => Stage::Header
    }
}

fn header_error(error: BmpDecoderErrors) -> ImageErrors {
    if error.is_unsupported() {
        ImageErrors::unsupported_variant(FORMAT, error)
    } else {
        ImageErrors::invalid_format(FORMAT, error)
    }
}

/// Bitmap decoder plugin, a single frame
pub struct BmpImageDecoderPlugin<'a> {
    decoder:    BmpDecoder<ZCursor<&'a [u8]>>,
    width:      usize,
    height:     usize,
    colorspace: ColorSpace,
    cache:      FrameCache
}

fn render(
    decoder: &mut BmpDecoder<ZCursor<&[u8]>>, width: usize, height: usize, colorspace: ColorSpace
) -> Result<Frame, ImageErrors> {
    let pixels = decoder
        .decode()
        .map_err(|e| ImageErrors::decode_failed(FORMAT, decode_stage(&e), e))?;

    let rgba =
        expand_to_rgba(&pixels, colorspace).map_err(|e| ImageErrors::from_color_model(FORMAT, e))?;

    let bitmap = rgba_bitmap(FORMAT, width, height, &rgba, colorspace.has_alpha())?;
    Ok(Frame::still(bitmap))
}

impl<'a> ImageDecoderPlugin<'a> for BmpImageDecoderPlugin<'a> {
    fn create_with_options(data: &'a [u8], options: DecoderOptions) -> Result<Self, ImageErrors> {
        let mut decoder = BmpDecoder::new_with_options(ZCursor::new(data), options);
        decoder.decode_headers().map_err(header_error)?;

        let (width, height) = decoder
            .dimensions()
            .ok_or_else(|| ImageErrors::invalid_format(FORMAT, "No dimensions after headers"))?;
        let colorspace = decoder
            .colorspace()
            .ok_or_else(|| ImageErrors::invalid_format(FORMAT, "No colorspace after headers"))?;

        trace!("BMP plugin: {}x{} {:?}", width, height, colorspace);

        Ok(BmpImageDecoderPlugin {
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

/// Bitmap encoder
///
/// Alpha is written as a 32 bit BITFIELDS image, opaque images as 24 bit
pub struct BmpWriter {
    config: EncoderConfig
}

impl BmpWriter {
    pub fn new() -> BmpWriter {
        BmpWriter::new_with_config(EncoderConfig::default())
    }
    pub fn new_with_config(config: EncoderConfig) -> BmpWriter {
        BmpWriter { config }
    }
}

impl Default for BmpWriter {
    fn default() -> Self {
        BmpWriter::new()
    }
}

impl ImageEncoder for BmpWriter {
    fn format(&self) -> ImageFormat {
        FORMAT
    }

    fn config(&self) -> EncoderConfig {
        self.config
    }

    fn encode_into(&self, bitmap: &Bitmap, sink: &mut Vec<u8>) -> Result<usize, ImageErrors> {
        self.config.validate(FORMAT)?;

        let keep_alpha = self.config.keep_alpha(bitmap);
        let (pixels, options) = self.config.prepare(bitmap, keep_alpha);

        let encoder = BmpEncoder::new(&pixels, options);
        Ok(encoder.encode(sink)?)
    }
}

impl From<BmpEncoderErrors> for ImageErrors {
    fn from(error: BmpEncoderErrors) -> Self {
        match error {
            BmpEncoderErrors::UnsupportedColorspace(_)
            | BmpEncoderErrors::InvalidDimensions(..)
            | BmpEncoderErrors::WrongInputSize(..) => ImageErrors::unsupported_config(FORMAT, error),
            BmpEncoderErrors::IoErrors(_) => ImageErrors::encode_failed(FORMAT, error)
        }
    }
}
