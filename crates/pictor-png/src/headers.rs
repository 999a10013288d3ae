/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Parsing of the chunks that precede image data
use alloc::format;

use pictor_core::bytestream::ZByteReaderTrait;
use pictor_core::color::Color;
use pictor_core::log::{trace, warn};

use crate::apng::{AnimationControl, FrameControl};
use crate::decoder::PngChunk;
use crate::enums::{is_critical_chunk, BlendOp, DisposeOp, InterlaceMethod, PngColor};
use crate::error::PngDecodeErrors;
use crate::PngDecoder;

pub(crate) mod writers;

impl<T: ZByteReaderTrait> PngDecoder<T> {
    pub(crate) fn parse_ihdr(&mut self, chunk: PngChunk) -> Result<(), PngDecodeErrors> {
        if self.seen_hdr {
            return Err(PngDecodeErrors::GenericStatic("Multiple IHDR, corrupt PNG"));
        }
        if chunk.length != 13 {
            return Err(PngDecodeErrors::GenericStatic("BAD IHDR length"));
        }
        let width = self.stream.get_u32_be_err()? as usize;
        let height = self.stream.get_u32_be_err()? as usize;

        if width == 0 || height == 0 {
            return Err(PngDecodeErrors::GenericStatic("Width or height cannot be zero"));
        }
        if width > (1 << 31) - 1 || height > (1 << 31) - 1 {
            return Err(PngDecodeErrors::GenericStatic(
                "Width or height exceeds 2^31-1, corrupt PNG"
            ));
        }
        if width > self.options.get_max_width() {
            return Err(PngDecodeErrors::TooLargeDimensions(
                "width",
                self.options.get_max_width(),
                width
            ));
        }
        if height > self.options.get_max_height() {
            return Err(PngDecodeErrors::TooLargeDimensions(
                "height",
                self.options.get_max_height(),
                height
            ));
        }
        let depth = self.stream.get_u8_err()?;
        let color_int = self.stream.get_u8_err()?;

        let color = PngColor::from_int(color_int)
            .ok_or_else(|| PngDecodeErrors::Generic(format!("Unknown color value {color_int}")))?;

        if !color.allows_depth(depth) {
            return Err(PngDecodeErrors::Generic(format!(
                "Bit depth {depth} is not allowed for color type {color:?}"
            )));
        }
        if self.stream.get_u8_err()? != 0 {
            return Err(PngDecodeErrors::GenericStatic("Unknown compression method"));
        }
        let filter_method = self.stream.get_u8_err()?;

        if filter_method != 0 {
            return Err(PngDecodeErrors::Generic(format!(
                "Unknown filter method {filter_method}"
            )));
        }
        let interlace_method = self.stream.get_u8_err()?;

        let interlace = InterlaceMethod::from_int(interlace_method).ok_or_else(|| {
            PngDecodeErrors::Generic(format!("Unknown interlace method {interlace_method}"))
        })?;

        self.png_info.width = width;
        self.png_info.height = height;
        self.png_info.depth = depth;
        self.png_info.color = color;
        self.png_info.component = color.num_components();
        self.png_info.interlace_method = interlace;
        self.seen_hdr = true;

        trace!("Width: {}", width);
        trace!("Height: {}", height);
        trace!("Depth: {}", depth);
        trace!("Color: {:?}", color);
        trace!("Interlace: {:?}", interlace);

        Ok(())
    }

    pub(crate) fn parse_plte(&mut self, chunk: PngChunk) -> Result<(), PngDecodeErrors> {
        if self.seen_plte {
            return Err(PngDecodeErrors::GenericStatic("Multiple PLTE chunks, corrupt PNG"));
        }
        if self.seen_trns {
            return Err(PngDecodeErrors::GenericStatic("tRNS chunk before PLTE"));
        }
        if chunk.length % 3 != 0 || chunk.length == 0 || chunk.length > 256 * 3 {
            return Err(PngDecodeErrors::Generic(format!(
                "Invalid PLTE length {}",
                chunk.length
            )));
        }
        match self.png_info.color {
            PngColor::Luma | PngColor::LumaA => {
                if self.options.get_strict_mode() {
                    return Err(PngDecodeErrors::GenericStatic(
                        "PLTE chunk is not allowed for grayscale images"
                    ));
                }
                warn!("Ignoring PLTE chunk in a grayscale image");
                return Ok(());
            }
            // a suggested palette for true color images, nothing to do
            PngColor::RGB | PngColor::RGBA => return Ok(()),
            PngColor::Palette => ()
        }
        let entries = chunk.length / 3;

        if entries > 1 << self.png_info.depth {
            if self.options.get_strict_mode() {
                return Err(PngDecodeErrors::Generic(format!(
                    "PLTE has {entries} entries but bit depth {} allows {}",
                    self.png_info.depth,
                    1 << self.png_info.depth
                )));
            }
            warn!("PLTE has more entries than the bit depth can index");
        }
        self.palette.clear();

        for _ in 0..entries {
            let [r, g, b] = self.stream.read_fixed_bytes_or_error::<3>()?;
            self.palette.push(Color::from_rgb(r, g, b));
        }
        self.seen_plte = true;
        trace!("Palette entries: {}", entries);

        Ok(())
    }

    pub(crate) fn parse_trns(&mut self, chunk: PngChunk) -> Result<(), PngDecodeErrors> {
        if self.seen_trns {
            return Err(PngDecodeErrors::GenericStatic("Multiple tRNS chunks, corrupt PNG"));
        }
        let mask = if self.png_info.depth == 16 {
            u16::MAX
        } else {
            (1_u16 << self.png_info.depth) - 1
        };

        match self.png_info.color {
            PngColor::Palette => {
                if !self.seen_plte {
                    return Err(PngDecodeErrors::GenericStatic("tRNS chunk before PLTE"));
                }
                let mut length = chunk.length;

                if length > self.palette.len() {
                    if self.options.get_strict_mode() {
                        return Err(PngDecodeErrors::GenericStatic(
                            "tRNS chunk has more entries than the palette"
                        ));
                    }
                    warn!("tRNS chunk has more entries than the palette, truncating");
                    length = self.palette.len();
                }
                for i in 0..length {
                    let alpha = self.stream.get_u8_err()?;
                    self.palette[i] = self.palette[i].with_alpha(alpha);
                }
            }
            PngColor::Luma => {
                if chunk.length != 2 {
                    return Err(PngDecodeErrors::GenericStatic("Bad tRNS length for grayscale"));
                }
                let key = self.stream.get_u16_be_err()? & mask;
                self.trns_key = Some([key, 0, 0]);
            }
            PngColor::RGB => {
                if chunk.length != 6 {
                    return Err(PngDecodeErrors::GenericStatic("Bad tRNS length for RGB"));
                }
                let r = self.stream.get_u16_be_err()? & mask;
                let g = self.stream.get_u16_be_err()? & mask;
                let b = self.stream.get_u16_be_err()? & mask;
                self.trns_key = Some([r, g, b]);
            }
            PngColor::LumaA | PngColor::RGBA => {
                if self.options.get_strict_mode() {
                    return Err(PngDecodeErrors::GenericStatic(
                        "tRNS chunk is not allowed for images with an alpha channel"
                    ));
                }
                warn!("Ignoring tRNS chunk in an image with an alpha channel");
                return Ok(());
            }
        }
        self.seen_trns = true;
        Ok(())
    }

    pub(crate) fn parse_actl(&mut self, chunk: PngChunk) -> Result<(), PngDecodeErrors> {
        if self.actl.is_some() {
            return Err(PngDecodeErrors::GenericStatic("Multiple acTL chunks, corrupt PNG"));
        }
        if chunk.length != 8 {
            return Err(PngDecodeErrors::GenericStatic("Bad acTL length"));
        }
        let num_frames = self.stream.get_u32_be_err()?;
        let num_plays = self.stream.get_u32_be_err()?;

        if num_frames == 0 {
            return Err(PngDecodeErrors::GenericStatic("acTL declares zero frames"));
        }
        trace!("APNG frames: {}, plays: {}", num_frames, num_plays);

        self.actl = Some(AnimationControl {
            num_frames,
            num_plays
        });
        Ok(())
    }

    /// Parse an fcTL chunk, checking the region fits the canvas
    pub(crate) fn parse_fctl(&mut self, chunk: PngChunk) -> Result<FrameControl, PngDecodeErrors> {
        if chunk.length != 26 {
            return Err(PngDecodeErrors::GenericStatic("Bad fcTL length"));
        }
        let sequence_number = self.stream.get_u32_be_err()?;
        let width = self.stream.get_u32_be_err()? as usize;
        let height = self.stream.get_u32_be_err()? as usize;
        let x_offset = self.stream.get_u32_be_err()? as usize;
        let y_offset = self.stream.get_u32_be_err()? as usize;
        let delay_num = self.stream.get_u16_be_err()?;
        let delay_den = self.stream.get_u16_be_err()?;
        let dispose = self.stream.get_u8_err()?;
        let blend = self.stream.get_u8_err()?;

        let dispose_op = DisposeOp::from_int(dispose)
            .ok_or_else(|| PngDecodeErrors::Generic(format!("Unknown dispose op {dispose}")))?;
        let blend_op = BlendOp::from_int(blend)
            .ok_or_else(|| PngDecodeErrors::Generic(format!("Unknown blend op {blend}")))?;

        if width == 0 || height == 0 {
            return Err(PngDecodeErrors::GenericStatic("fcTL with a zero sized frame"));
        }
        if x_offset.saturating_add(width) > self.png_info.width
            || y_offset.saturating_add(height) > self.png_info.height
        {
            return Err(PngDecodeErrors::GenericStatic(
                "fcTL frame region lies outside the image"
            ));
        }
        self.check_sequence(sequence_number)?;

        Ok(FrameControl {
            sequence_number,
            width,
            height,
            x_offset,
            y_offset,
            delay_num,
            delay_den,
            dispose_op,
            blend_op
        })
    }

    /// fcTL and fdAT chunks share a single increasing sequence
    pub(crate) fn check_sequence(&mut self, sequence: u32) -> Result<(), PngDecodeErrors> {
        if sequence != self.next_sequence {
            if self.options.get_strict_mode() {
                return Err(PngDecodeErrors::Generic(format!(
                    "Out of order APNG sequence number, expected {} but found {sequence}",
                    self.next_sequence
                )));
            }
            warn!(
                "Out of order APNG sequence number, expected {} but found {}",
                self.next_sequence,
                sequence
            );
        }
        self.next_sequence = sequence.wrapping_add(1);
        Ok(())
    }

    /// Chunks we do not interpret
    pub(crate) fn handle_unknown(&mut self, chunk: PngChunk) -> Result<(), PngDecodeErrors> {
        if is_critical_chunk(&chunk.chunk) {
            return Err(PngDecodeErrors::UnsupportedCriticalChunk(chunk.chunk));
        }
        trace!(
            "Skipping chunk {:?} of length {}",
            core::str::from_utf8(&chunk.chunk).unwrap_or("????"),
            chunk.length
        );
        Ok(())
    }
}
