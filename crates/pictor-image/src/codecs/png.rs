/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![cfg(feature = "png")]
//! Portable network graphics support, animated png included
//!
//! Animation frames are composited on a canvas the size of the image,
//! so frame `n` needs every frame before it. The decoder renders them in
//! order and memoizes each one.
use pictor_core::bitmap::Bitmap;
use pictor_core::bytestream::ZCursor;
use pictor_core::log::{trace, warn};
use pictor_core::options::DecoderOptions;
use pictor_png::{ApngCanvas, PngDecodeErrors, PngDecoder, PngEncodeErrors, PngEncoder};

use crate::codecs::ImageFormat;
use crate::config::EncoderConfig;
use crate::errors::{ImageErrors, Stage};
use crate::frame::{rgba_bitmap, Frame, FrameCache};
use crate::traits::{ImageDecoderPlugin, ImageEncoder};

const FORMAT: ImageFormat = ImageFormat::Png;

fn decode_stage(error: &PngDecodeErrors) -> Stage {
    match error {
        PngDecodeErrors::ZlibDecodeErrors(_) => Stage::Entropy,
        PngDecodeErrors::UnknownFilter(_) => Stage::Filter,
        PngDecodeErrors::InvalidPaletteIndex(_) | PngDecodeErrors::TooSmallOutput(..) => {
            Stage::Transform
        }
        _ => Stage::Header
    }
}

fn frame_error(error: PngDecodeErrors) -> ImageErrors {
    ImageErrors::decode_failed(FORMAT, decode_stage(&error), error)
}

/// PNG and APNG decoder plugin
pub struct PngImageDecoderPlugin<'a> {
    decoder:     PngDecoder<ZCursor<&'a [u8]>>,
    width:       usize,
    height:      usize,
    has_alpha:   bool,
    frame_count: usize,
    loop_count:  Option<u32>,
    // present for animations
    canvas:      Option<ApngCanvas>,
    cache:       FrameCache
}

fn render(
    decoder: &mut PngDecoder<ZCursor<&[u8]>>, canvas: &mut Option<ApngCanvas>, width: usize,
    height: usize, has_alpha: bool
) -> Result<Frame, ImageErrors> {
    let frame = decoder.next_frame().map_err(frame_error)?.ok_or_else(|| {
        ImageErrors::decode_failed(FORMAT, Stage::Header, "Animation ended early")
    })?;

    match canvas {
        Some(canvas) => {
            let rgba = canvas.render(&frame).map_err(frame_error)?;
            let bitmap = rgba_bitmap(FORMAT, width, height, &rgba, true)?;

            Ok(Frame::new(bitmap, frame.control.duration_ms()))
        }
        None => {
            let bitmap = rgba_bitmap(FORMAT, width, height, &frame.pixels, has_alpha)?;
            Ok(Frame::still(bitmap))
        }
    }
}

impl<'a> ImageDecoderPlugin<'a> for PngImageDecoderPlugin<'a> {
    fn create_with_options(data: &'a [u8], options: DecoderOptions) -> Result<Self, ImageErrors> {
        let mut decoder = PngDecoder::new_with_options(ZCursor::new(data), options);

        decoder.decode_headers().map_err(|e| {
            if e.is_unsupported() {
                ImageErrors::unsupported_variant(FORMAT, e)
            } else {
                ImageErrors::invalid_format(FORMAT, e)
            }
        })?;

        let (width, height) = decoder
            .dimensions()
            .ok_or_else(|| ImageErrors::invalid_format(FORMAT, "No dimensions after headers"))?;
        let has_alpha = decoder.colorspace().is_some_and(|c| c.has_alpha());

        let frame_count = decoder.num_frames();
        let animated = decoder.is_animated();

        if animated && !decoder.default_image_is_frame() {
            warn!("Default image is not part of the animation, skipping it");
        }
        trace!(
            "PNG plugin: {}x{}, {} frame(s), alpha: {}",
            width,
            height,
            frame_count,
            has_alpha
        );
        let cache = if animated {
            FrameCache::new_sequential(frame_count)
        } else {
            FrameCache::new(1)
        };

        Ok(PngImageDecoderPlugin {
            width,
            height,
            has_alpha,
            frame_count,
            loop_count: if frame_count > 1 {
                decoder.num_plays()
            } else {
                None
            },
            canvas: animated.then(|| ApngCanvas::new(width, height)),
            cache,
            decoder
        })
    }

    fn format(&self) -> ImageFormat {
        FORMAT
    }

    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn loop_count(&self) -> Option<u32> {
        self.loop_count
    }

    fn frame(&mut self, index: usize) -> Result<Frame, ImageErrors> {
        let (width, height, has_alpha) = (self.width, self.height, self.has_alpha);

        self.cache.get_or_render(index, |_| {
            render(
                &mut self.decoder,
                &mut self.canvas,
                width,
                height,
                has_alpha
            )
        })
    }
}

/// PNG encoder
///
/// Effort 0 writes unfiltered rows with stored deflate blocks, higher
/// efforts pick a filter per row and search harder for matches.
pub struct PngWriter {
    config: EncoderConfig
}

impl PngWriter {
    pub fn new() -> PngWriter {
        PngWriter::new_with_config(EncoderConfig::default())
    }
    pub fn new_with_config(config: EncoderConfig) -> PngWriter {
        PngWriter { config }
    }
}

impl Default for PngWriter {
    fn default() -> Self {
        PngWriter::new()
    }
}

impl ImageEncoder for PngWriter {
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

        let mut encoder = PngEncoder::new(&pixels, options);
        Ok(encoder.encode(sink)?)
    }
}

impl From<PngEncodeErrors> for ImageErrors {
    fn from(error: PngEncodeErrors) -> Self {
        match error {
            PngEncodeErrors::UnsupportedColorspace(_)
            | PngEncodeErrors::InvalidDimensions(..)
            | PngEncodeErrors::WrongInputSize(..) => ImageErrors::unsupported_config(FORMAT, error),
            PngEncodeErrors::Generic(_) | PngEncodeErrors::IoErrors(_) => {
                ImageErrors::encode_failed(FORMAT, error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pictor_core::bytestream::ZByteIoError;
    use pictor_core::colorspace::ColorSpace;
    use pictor_png::PngEncodeErrors;

    use crate::codecs::ImageFormat;
    use crate::errors::ImageErrors;

    #[test]
    fn encode_errors_keep_their_kind() {
        let err = ImageErrors::from(PngEncodeErrors::IoErrors(ZByteIoError::Generic("disk full")));
        assert!(matches!(
            err,
            ImageErrors::EncodeFailed {
                format: ImageFormat::Png,
                ..
            }
        ));
        assert!(format!("{err}").contains("disk full"));

        let err = ImageErrors::from(PngEncodeErrors::UnsupportedColorspace(ColorSpace::YCbCr));
        assert!(matches!(err, ImageErrors::UnsupportedConfiguration { .. }));

        let err = ImageErrors::from(PngEncodeErrors::InvalidDimensions(0, 4));
        assert!(matches!(err, ImageErrors::UnsupportedConfiguration { .. }));
    }
}
