/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![cfg(feature = "qoi")]
//! Quite OK Image support
use pictor_core::bitmap::Bitmap;
use pictor_core::bytestream::ZCursor;
use pictor_core::color::expand_to_rgba;
use pictor_core::colorspace::ColorSpace;
use pictor_core::log::trace;
use pictor_core::options::DecoderOptions;
use pictor_qoi::{QoiDecoder, QoiEncodeErrors, QoiEncoder, QoiErrors};

use crate::codecs::ImageFormat;
use crate::config::EncoderConfig;
use crate::errors::{ImageErrors, Stage};
use crate::frame::{rgba_bitmap, Frame, FrameCache};
use crate::traits::{ImageDecoderPlugin, ImageEncoder};

const FORMAT: ImageFormat = ImageFormat::Qoi;

/// Classify an error raised while decoding ops
fn decode_stage(error: &QoiErrors) -> Stage {
    match error {
        QoiErrors::WrongMagicBytes
        | QoiErrors::UnknownChannels(_)
        | QoiErrors::UnknownColorspace(_)
        | QoiErrors::InvalidDimensions(..) => Stage::Header,
        _ => Stage::Entropy
    }
}

/// QOI decoder plugin, a single frame
pub struct QoiImageDecoderPlugin<'a> {
    decoder:    QoiDecoder<ZCursor<&'a [u8]>>,
    width:      usize,
    height:     usize,
    colorspace: ColorSpace,
    cache:      FrameCache
}

fn render(
    decoder: &mut QoiDecoder<ZCursor<&[u8]>>, width: usize, height: usize, colorspace: ColorSpace
) -> Result<Frame, ImageErrors> {
    let pixels = decoder
        .decode()
        .map_err(|e| ImageErrors::decode_failed(FORMAT, decode_stage(&e), e))?;

    let rgba =
        expand_to_rgba(&pixels, colorspace).map_err(|e| ImageErrors::from_color_model(FORMAT, e))?;

    let bitmap = rgba_bitmap(FORMAT, width, height, &rgba, colorspace.has_alpha())?;
    Ok(Frame::still(bitmap))
}

impl<'a> ImageDecoderPlugin<'a> for QoiImageDecoderPlugin<'a> {
    fn create_with_options(data: &'a [u8], options: DecoderOptions) -> Result<Self, ImageErrors> {
        let mut decoder = QoiDecoder::new_with_options(ZCursor::new(data), options);
        decoder
            .decode_headers()
            .map_err(|e| ImageErrors::invalid_format(FORMAT, e))?;

        let (width, height) = decoder
            .dimensions()
            .ok_or_else(|| ImageErrors::invalid_format(FORMAT, "No dimensions after headers"))?;
        let colorspace = decoder
            .colorspace()
            .ok_or_else(|| ImageErrors::invalid_format(FORMAT, "No colorspace after headers"))?;

        trace!("QOI plugin: {}x{} {:?}", width, height, colorspace);

        Ok(QoiImageDecoderPlugin {
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

/// QOI encoder
pub struct QoiWriter {
    config: EncoderConfig
}

impl QoiWriter {
    pub fn new() -> QoiWriter {
        QoiWriter::new_with_config(EncoderConfig::default())
    }
    pub fn new_with_config(config: EncoderConfig) -> QoiWriter {
        QoiWriter { config }
    }
}

impl Default for QoiWriter {
    fn default() -> Self {
        QoiWriter::new()
    }
}

impl ImageEncoder for QoiWriter {
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

        let mut encoder = QoiEncoder::new(&pixels, options);
        Ok(encoder.encode(sink)?)
    }
}

impl From<QoiEncodeErrors> for ImageErrors {
    fn from(error: QoiEncodeErrors) -> Self {
        match error {
            // the generic errors all reject the input before anything is written
            QoiEncodeErrors::UnsupportedColorspace(..)
            | QoiEncodeErrors::TooLargeDimensions(_)
            | QoiEncodeErrors::Generic(_) => ImageErrors::unsupported_config(FORMAT, error),
            QoiEncodeErrors::IoError(_) => ImageErrors::encode_failed(FORMAT, error)
        }
    }
}
