/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Traits every codec implements to plug into the library
//!
//! A decoder is created from the full encoded buffer, validates the
//! signature and headers up front and then hands out frames by index.
//! An encoder turns a [`Bitmap`] back into bytes.
use pictor_core::bitmap::Bitmap;
use pictor_core::options::DecoderOptions;

use crate::codecs::ImageFormat;
use crate::config::EncoderConfig;
use crate::errors::ImageErrors;
use crate::frame::Frame;

/// The uniform decoder contract
///
/// Header derived metadata (`size`, `frame_count`, `is_animated`,
/// `loop_count`) is known once the decoder exists and stays valid even
/// after a frame fails to decode.
pub trait ImageDecoderPlugin<'a> {
    /// Validate the signature and headers of `data` and build a decoder
    ///
    /// # Errors
    /// - [`ImageErrors::InvalidFormat`] for a bad signature or header
    /// - [`ImageErrors::UnsupportedVariant`] for a recognized file using a feature
    ///   the codec does not implement
    fn create(data: &'a [u8]) -> Result<Self, ImageErrors>
    where
        Self: Sized
    {
        Self::create_with_options(data, DecoderOptions::default())
    }

    /// Like [`create`](Self::create) with custom decoder options
    fn create_with_options(data: &'a [u8], options: DecoderOptions) -> Result<Self, ImageErrors>
    where
        Self: Sized;

    /// Format this decoder understands
    fn format(&self) -> ImageFormat;

    /// `(width, height)` of the image, or of the animation canvas
    fn size(&self) -> (usize, usize);

    /// Number of frames, always at least one
    fn frame_count(&self) -> usize {
        1
    }

    /// True only for images with more than one frame
    fn is_animated(&self) -> bool {
        self.frame_count() > 1
    }

    /// Number of times an animation plays, `Some(0)` is forever
    ///
    /// `None` for still images
    fn loop_count(&self) -> Option<u32> {
        None
    }

    /// Decode frame `index`
    ///
    /// Requesting the same index twice returns an equal result, frames of
    /// an animation may be requested in any order.
    ///
    /// # Errors
    /// - [`ImageErrors::IndexOutOfRange`] for `index >= frame_count()`
    /// - [`ImageErrors::DecodeFailed`] for a malformed bitstream
    fn frame(&mut self, index: usize) -> Result<Frame, ImageErrors>;

    /// Decode every frame in order
    fn frames(&mut self) -> Result<Vec<Frame>, ImageErrors> {
        (0..self.frame_count()).map(|i| self.frame(i)).collect()
    }
}

/// The uniform encoder contract
pub trait ImageEncoder {
    /// Format this encoder produces
    fn format(&self) -> ImageFormat;

    /// Configuration the encoder was created with
    fn config(&self) -> EncoderConfig;

    /// Encode `bitmap`, appending the bytes to `sink`
    ///
    /// Returns the number of bytes written.
    fn encode_into(&self, bitmap: &Bitmap, sink: &mut Vec<u8>) -> Result<usize, ImageErrors>;

    /// Encode `bitmap` into a new buffer
    ///
    /// Produces exactly the bytes [`encode_into`](Self::encode_into) appends.
    fn encode(&self, bitmap: &Bitmap) -> Result<Vec<u8>, ImageErrors> {
        let mut sink = Vec::new();
        self.encode_into(bitmap, &mut sink)?;
        Ok(sink)
    }
}
