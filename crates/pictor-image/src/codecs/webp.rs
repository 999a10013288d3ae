/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![cfg(feature = "webp")]
//! WebP support, lossy, lossless and animated
use pictor_core::bitmap::Bitmap;
use pictor_core::bytestream::ZCursor;
use pictor_core::log::trace;
use pictor_core::options::DecoderOptions;
use pictor_webp::{
    WebpCanvas, WebpDecodeErrors, WebpDecoder, WebpEncodeErrors, WebpEncoder, WebpFormat
};

use crate::codecs::ImageFormat;
use crate::config::EncoderConfig;
use crate::errors::{ImageErrors, Stage};
use crate::frame::{rgba_bitmap, Frame, FrameCache};
use crate::traits::{ImageDecoderPlugin, ImageEncoder};

const FORMAT: ImageFormat = ImageFormat::WebP;

fn decode_stage(error: &WebpDecodeErrors) -> Stage {
    if error.is_entropy_error() {
        Stage::Entropy
    } else if error.is_transform_error() {
        Stage::Transform
    } else if error.is_filter_error() {
        Stage::Filter
    } else {
        Stage::Header
    }
}

/// WebP decoder plugin
///
/// Animation frames are composited in order on a canvas that starts
/// fully transparent.
pub struct WebpImageDecoderPlugin<'a> {
    decoder:     WebpDecoder<ZCursor<&'a [u8]>>,
    width:       usize,
    height:      usize,
    has_alpha:   bool,
    frame_count: usize,
    loop_count:  Option<u32>,
    canvas:      Option<WebpCanvas>,
    cache:       FrameCache
}

impl<'a> WebpImageDecoderPlugin<'a> {
    /// Bitstream the image, or its first frame, was stored with
    pub fn webp_format(&self) -> Option<WebpFormat> {
        self.decoder.info().map(|info| info.format)
    }
}

fn render(
    decoder: &mut WebpDecoder<ZCursor<&[u8]>>, canvas: &mut Option<WebpCanvas>, index: usize,
    width: usize, height: usize, has_alpha: bool
) -> Result<Frame, ImageErrors> {
    let frame = decoder
        .decode_frame(index)
        .map_err(|e| ImageErrors::decode_failed(FORMAT, decode_stage(&e), e))?;

    match canvas {
        Some(canvas) => {
            let rgba = canvas
                .render(&frame)
                .map_err(|e| ImageErrors::decode_failed(FORMAT, Stage::Header, e))?;
            let bitmap = rgba_bitmap(FORMAT, width, height, &rgba, true)?;

            Ok(Frame::new(bitmap, frame.control.duration_ms))
        }
        None => {
            let bitmap = rgba_bitmap(FORMAT, width, height, &frame.pixels, has_alpha)?;
            Ok(Frame::still(bitmap))
        }
    }
}

impl<'a> ImageDecoderPlugin<'a> for WebpImageDecoderPlugin<'a> {
    fn create_with_options(data: &'a [u8], options: DecoderOptions) -> Result<Self, ImageErrors> {
        let mut decoder = WebpDecoder::new_with_options(ZCursor::new(data), options);

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

        let animated = decoder.is_animated();
        let frame_count = decoder.num_frames();

        trace!(
            "WebP plugin: {}x{}, {} frame(s), alpha: {}",
            width,
            height,
            frame_count,
            has_alpha
        );
        let loop_count = if frame_count > 1 {
            decoder.loop_count().map(u32::from)
        } else {
            None
        };
        let cache = if animated {
            FrameCache::new_sequential(frame_count)
        } else {
            FrameCache::new(1)
        };

        Ok(WebpImageDecoderPlugin {
            decoder,
            width,
            height,
            has_alpha,
            frame_count,
            loop_count,
            canvas: animated.then(|| WebpCanvas::new(width, height)),
            cache
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

        self.cache.get_or_render(index, |position| {
            render(
                &mut self.decoder,
                &mut self.canvas,
                position,
                width,
                height,
                has_alpha
            )
        })
    }
}

/// WebP encoder
///
/// Without a quality the lossless bitstream is written, with one the
/// lossy bitstream plus a lossless alpha plane when alpha is kept.
pub struct WebpWriter {
    config: EncoderConfig
}

impl WebpWriter {
    pub fn new() -> WebpWriter {
        WebpWriter::new_with_config(EncoderConfig::default())
    }
    pub fn new_with_config(config: EncoderConfig) -> WebpWriter {
        WebpWriter { config }
    }
}

impl Default for WebpWriter {
    fn default() -> Self {
        WebpWriter::new()
    }
}

impl ImageEncoder for WebpWriter {
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
        let options = options.set_lossless(self.config.quality().is_none());

        let mut encoder = WebpEncoder::new(&pixels, options);
        Ok(encoder.encode(sink)?)
    }
}

impl From<WebpEncodeErrors> for ImageErrors {
    fn from(error: WebpEncodeErrors) -> Self {
        match error {
            WebpEncodeErrors::UnsupportedColorspace(_)
            | WebpEncodeErrors::InvalidDimensions(..)
            | WebpEncodeErrors::WrongInputSize(..) => ImageErrors::unsupported_config(FORMAT, error),
            WebpEncodeErrors::Generic(_) | WebpEncodeErrors::IoErrors(_) => {
                ImageErrors::encode_failed(FORMAT, error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pictor_core::bytestream::ZByteIoError;
    use pictor_core::colorspace::ColorSpace;
    use pictor_webp::WebpEncodeErrors;

    use crate::codecs::ImageFormat;
    use crate::errors::ImageErrors;

    #[test]
    fn internal_encoder_failures_are_not_configuration_errors() {
        let err = ImageErrors::from(WebpEncodeErrors::Generic("VP8 first partition is too large"));
        assert_eq!(
            err,
            ImageErrors::EncodeFailed {
                format: ImageFormat::WebP,
                reason: "VP8 first partition is too large".to_string()
            }
        );

        let err = ImageErrors::from(WebpEncodeErrors::IoErrors(ZByteIoError::NotEnoughBuffer(8, 2)));
        assert_eq!(err.format(), Some(ImageFormat::WebP));
        assert!(matches!(err, ImageErrors::EncodeFailed { .. }));

        for error in [
            WebpEncodeErrors::UnsupportedColorspace(ColorSpace::YCbCr),
            WebpEncodeErrors::InvalidDimensions(20000, 1),
            WebpEncodeErrors::WrongInputSize(12, 10)
        ] {
            assert!(matches!(
                ImageErrors::from(error),
                ImageErrors::UnsupportedConfiguration {
                    format: ImageFormat::WebP,
                    ..
                }
            ));
        }
    }
}
