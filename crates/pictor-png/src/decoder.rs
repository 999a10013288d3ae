/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::vec::Vec;
use alloc::{format, vec};

use pictor_core::bytestream::{ZByteReaderTrait, ZReader};
use pictor_core::color::{expand_to_rgba, Color, ColorModelError};
use pictor_core::colorspace::ColorSpace;
use pictor_core::log::{error, trace, warn};
use pictor_core::options::DecoderOptions;
use pictor_inflate::{DeflateDecoder, DeflateOptions};

use crate::apng::{AnimationControl, FrameControl, PngFrame};
use crate::constants::{
    ADAM7_X_ORIGIN, ADAM7_X_SPACING, ADAM7_Y_ORIGIN, ADAM7_Y_SPACING, DEPTH_SCALE_TABLE,
    PNG_SIGNATURE, PNG_SIGNATURE_BYTES
};
use crate::enums::{is_critical_chunk, FilterMethod, InterlaceMethod, PngChunkType, PngColor};
use crate::error::PngDecodeErrors;
use crate::filters::de_filter_row;

#[derive(Copy, Clone)]
pub(crate) struct PngChunk {
    pub length:     usize,
    pub chunk_type: PngChunkType,
    pub chunk:      [u8; 4]
}

/// Image information from the IHDR chunk
#[derive(Default, Debug, Copy, Clone)]
pub struct PngInfo {
    pub width:            usize,
    pub height:           usize,
    pub depth:            u8,
    pub color:            PngColor,
    pub component:        u8,
    pub interlace_method: InterlaceMethod
}

/// A PNG and APNG decoder
///
/// # Usage
/// Decoding the default image
///
/// ```no_run
/// use pictor_core::bytestream::ZCursor;
/// use pictor_png::PngDecoder;
///
/// let mut decoder = PngDecoder::new(ZCursor::new(&[]));
/// let pixels = decoder.decode().unwrap();
/// ```
///
/// Walking the frames of an animation, composited on a canvas
///
/// ```no_run
/// use pictor_core::bytestream::ZCursor;
/// use pictor_png::{ApngCanvas, PngDecoder};
///
/// let mut decoder = PngDecoder::new(ZCursor::new(&[]));
/// decoder.decode_headers().unwrap();
/// let (w, h) = decoder.dimensions().unwrap();
/// let mut canvas = ApngCanvas::new(w, h);
///
/// while let Some(frame) = decoder.next_frame().unwrap() {
///     let rgba = canvas.render(&frame).unwrap();
///     println!("{} ms, {} bytes", frame.control.duration_ms(), rgba.len());
/// }
/// ```
pub struct PngDecoder<T>
where
    T: ZByteReaderTrait
{
    pub(crate) stream:        ZReader<T>,
    pub(crate) options:       DecoderOptions,
    pub(crate) png_info:      PngInfo,
    pub(crate) palette:       Vec<Color>,
    pub(crate) trns_key:      Option<[u16; 3]>,
    pub(crate) seen_hdr:      bool,
    pub(crate) seen_plte:     bool,
    pub(crate) seen_trns:     bool,
    pub(crate) actl:          Option<AnimationControl>,
    pub(crate) next_sequence: u32,
    default_fctl:             Option<FrameControl>,
    decoded_headers:          bool,
    // offset of the first IDAT chunk
    idat_start:               usize,
    // where the search for the next animation frame continues
    frame_position:           usize,
    frames_decoded:           usize
}

impl<T: ZByteReaderTrait> PngDecoder<T> {
    /// Create a new decoder reading from `data`
    pub fn new(data: T) -> PngDecoder<T> {
        PngDecoder::new_with_options(data, DecoderOptions::default())
    }
    /// Create a new decoder with the specified options
    pub fn new_with_options(data: T, options: DecoderOptions) -> PngDecoder<T> {
        PngDecoder {
            stream: ZReader::new(data),
            options,
            png_info: PngInfo::default(),
            palette: Vec::new(),
            trns_key: None,
            seen_hdr: false,
            seen_plte: false,
            seen_trns: false,
            actl: None,
            next_sequence: 0,
            default_fctl: None,
            decoded_headers: false,
            idat_start: 0,
            frame_position: 0,
            frames_decoded: 0
        }
    }

    /// Read the length and name of the chunk at the current position
    fn read_chunk_name(&mut self) -> Result<(usize, [u8; 4]), PngDecodeErrors> {
        let length = self.stream.get_u32_be_err()? as usize;
        let name = self.stream.read_fixed_bytes_or_error::<4>()?;

        if length > (1 << 31) - 1 {
            return Err(PngDecodeErrors::GenericStatic("Chunk length exceeds 2^31-1"));
        }
        Ok((length, name))
    }

    /// Confirm the chunk whose name was just read is complete and its crc matches
    ///
    /// The stream is left at the start of the chunk data.
    fn verify_chunk(&mut self, length: usize, name: [u8; 4]) -> Result<PngChunk, PngDecodeErrors> {
        let chunk_type = PngChunkType::from_bytes(&name);

        if !self.stream.has(length + 4)? {
            let err = format!(
                "Not enough bytes for chunk {:?}, bytes requested are {}, but bytes present are {}",
                chunk_type,
                length + 4,
                self.stream.remaining()?
            );
            error!("{}", err);
            return Err(PngDecodeErrors::Generic(err));
        }
        #[cfg(feature = "crc")]
        {
            if self.options.png_get_confirm_crc() {
                use crate::crc::calc_crc_with_bytes;

                let stored = self.stream.peek_at(length, 4)?;
                let crc = u32::from_be_bytes([stored[0], stored[1], stored[2], stored[3]]);

                let data = self.stream.peek_at(0, length)?;
                let calc_crc = !calc_crc_with_bytes(data, calc_crc_with_bytes(&name, u32::MAX));

                if crc != calc_crc {
                    return Err(PngDecodeErrors::BadCrc(crc, calc_crc));
                }
            }
        }
        Ok(PngChunk {
            length,
            chunk_type,
            chunk: name
        })
    }

    /// Read the next chunk header, applying the crc policy
    ///
    /// Returns `None` for an ancillary chunk with a bad crc that
    /// was tolerated, the stream then points at the next chunk.
    fn read_chunk_header(&mut self) -> Result<Option<PngChunk>, PngDecodeErrors> {
        let (length, name) = self.read_chunk_name()?;

        match self.verify_chunk(length, name) {
            Ok(chunk) => Ok(Some(chunk)),
            Err(PngDecodeErrors::BadCrc(expected, found))
                if !is_critical_chunk(&name)
                    && PngChunkType::from_bytes(&name) == PngChunkType::unkn
                    && !self.options.get_strict_mode() =>
            {
                warn!(
                    "Bad crc for ancillary chunk, expected {} found {}, skipping it",
                    expected,
                    found
                );
                self.stream.skip(length + 4)?;
                Ok(None)
            }
            Err(e) => Err(e)
        }
    }

    /// Decode the signature and all chunks up to the first IDAT
    ///
    /// Image data is not touched, so this succeeds for files whose image
    /// data is corrupt or truncated.
    pub fn decode_headers(&mut self) -> Result<(), PngDecodeErrors> {
        if self.decoded_headers {
            return Ok(());
        }
        let signature = self.stream.get_u64_be_err()?;

        if signature != PNG_SIGNATURE {
            return Err(PngDecodeErrors::BadSignature);
        }
        if self.stream.peek_at(4, 4)? != b"IHDR" {
            return Err(PngDecodeErrors::GenericStatic("First chunk not IHDR, Corrupt PNG"));
        }
        loop {
            let position = self.stream.position()? as usize;
            let (length, name) = self.read_chunk_name()?;

            if &name == b"IDAT" {
                self.stream.set_position(position)?;
                self.idat_start = position;
                break;
            }
            self.stream.set_position(position)?;

            let Some(header) = self.read_chunk_header()? else {
                continue;
            };
            let data_start = self.stream.position()? as usize;

            match header.chunk_type {
                PngChunkType::IHDR => self.parse_ihdr(header)?,
                PngChunkType::PLTE => self.parse_plte(header)?,
                PngChunkType::tRNS => self.parse_trns(header)?,
                PngChunkType::acTL => self.parse_actl(header)?,
                PngChunkType::fcTL => {
                    let control = self.parse_fctl(header)?;

                    if self.default_fctl.is_some() {
                        return Err(PngDecodeErrors::GenericStatic(
                            "Multiple fcTL chunks before IDAT"
                        ));
                    }
                    if control.x_offset != 0
                        || control.y_offset != 0
                        || control.width != self.png_info.width
                        || control.height != self.png_info.height
                    {
                        return Err(PngDecodeErrors::GenericStatic(
                            "fcTL of the default image does not cover the whole image"
                        ));
                    }
                    self.default_fctl = Some(control);
                }
                PngChunkType::IEND => {
                    return Err(PngDecodeErrors::GenericStatic("No IDAT chunk before IEND"))
                }
                PngChunkType::fdAT => {
                    return Err(PngDecodeErrors::GenericStatic("fdAT chunk before IDAT"))
                }
                PngChunkType::unkn => self.handle_unknown(header)?,
                PngChunkType::IDAT => ()
            }
            self.stream.set_position(data_start + length + 4)?;
        }
        if !self.seen_hdr {
            return Err(PngDecodeErrors::GenericStatic("No IHDR chunk"));
        }
        if self.png_info.color == PngColor::Palette && !self.seen_plte {
            return Err(PngDecodeErrors::GenericStatic(
                "Palette image without a PLTE chunk"
            ));
        }
        if self.default_fctl.is_some() && self.actl.is_none() {
            warn!("fcTL chunk without acTL, ignoring animation data");
            self.default_fctl = None;
        }
        self.frame_position = self.idat_start;
        self.decoded_headers = true;

        Ok(())
    }

    /// Image dimensions, or `None` if headers were not decoded
    pub const fn dimensions(&self) -> Option<(usize, usize)> {
        if !self.decoded_headers {
            return None;
        }
        Some((self.png_info.width, self.png_info.height))
    }
    /// Header information, or `None` if headers were not decoded
    pub const fn info(&self) -> Option<&PngInfo> {
        if !self.decoded_headers {
            return None;
        }
        Some(&self.png_info)
    }
    /// Colorspace of the pixels returned by [`decode`](Self::decode)
    ///
    /// Palettes become RGB, and a tRNS chunk adds an alpha channel
    pub const fn colorspace(&self) -> Option<ColorSpace> {
        if !self.decoded_headers {
            return None;
        }
        let colorspace = match (self.png_info.color, self.seen_trns) {
            (PngColor::Luma, false) => ColorSpace::Luma,
            (PngColor::Luma, true) | (PngColor::LumaA, _) => ColorSpace::LumaA,
            (PngColor::RGB | PngColor::Palette, false) => ColorSpace::RGB,
            (PngColor::RGB | PngColor::Palette, true) | (PngColor::RGBA, _) => ColorSpace::RGBA
        };
        Some(colorspace)
    }
    /// Whether the file carries an animation and animated decoding is enabled
    pub const fn is_animated(&self) -> bool {
        self.actl.is_some() && self.options.png_decode_animated()
    }
    /// Number of frames [`next_frame`](Self::next_frame) produces
    pub const fn num_frames(&self) -> usize {
        match self.actl {
            Some(actl) if self.options.png_decode_animated() => actl.num_frames as usize,
            _ => 1
        }
    }
    /// Number of times the animation plays, 0 being forever
    ///
    /// `None` for still images
    pub const fn num_plays(&self) -> Option<u32> {
        match self.actl {
            Some(actl) if self.options.png_decode_animated() => Some(actl.num_plays),
            _ => None
        }
    }
    /// Whether the default image is the first frame of the animation
    pub const fn default_image_is_frame(&self) -> bool {
        self.default_fctl.is_some()
    }

    /// Decode the default image
    ///
    /// Pixels are 8 bits per sample in the layout returned by
    /// [`colorspace`](Self::colorspace)
    pub fn decode(&mut self) -> Result<Vec<u8>, PngDecodeErrors> {
        self.decode_headers()?;

        self.stream.set_position(self.idat_start)?;
        let data = self.collect_idat()?;
        self.expect_iend()?;

        let (width, height) = (self.png_info.width, self.png_info.height);
        self.decode_image_data(&data, width, height)
    }

    /// Decode the next frame, returning `None` after the last one
    ///
    /// Still images produce one frame covering the whole image. Frames
    /// are not composited, see [`ApngCanvas`](crate::ApngCanvas).
    pub fn next_frame(&mut self) -> Result<Option<PngFrame>, PngDecodeErrors> {
        self.decode_headers()?;

        if self.frames_decoded >= self.num_frames() {
            return Ok(None);
        }
        let (control, data) = if !self.is_animated() {
            let (width, height) = (self.png_info.width, self.png_info.height);
            let control = FrameControl {
                width,
                height,
                ..Default::default()
            };
            self.stream.set_position(self.idat_start)?;
            (control, self.collect_idat()?)
        } else if self.frames_decoded == 0 && self.default_fctl.is_some() {
            let control = self.default_fctl.unwrap_or_default();
            self.stream.set_position(self.idat_start)?;
            (control, self.collect_idat()?)
        } else {
            self.stream.set_position(self.frame_position)?;
            let control = self.find_next_fctl()?;
            (control, self.collect_fdat()?)
        };
        self.frame_position = self.stream.position()? as usize;
        self.frames_decoded += 1;

        if self.frames_decoded == self.num_frames() {
            self.expect_iend()?;
        }
        trace!(
            "Frame {} at ({},{}) size {}x{}",
            self.frames_decoded - 1,
            control.x_offset,
            control.y_offset,
            control.width,
            control.height
        );
        let pixels = self.decode_image_data(&data, control.width, control.height)?;
        let colorspace = self.colorspace().unwrap_or(ColorSpace::RGBA);
        let pixels = expand_to_rgba(&pixels, colorspace)?;

        Ok(Some(PngFrame { control, pixels }))
    }

    /// Concatenate consecutive IDAT chunks starting at the current position
    fn collect_idat(&mut self) -> Result<Vec<u8>, PngDecodeErrors> {
        let mut data = Vec::new();

        loop {
            let position = self.stream.position()? as usize;
            let (length, name) = self.read_chunk_name()?;

            if &name != b"IDAT" {
                self.stream.set_position(position)?;
                break;
            }
            self.verify_chunk(length, name)?;
            data.extend_from_slice(&self.stream.read_vec(length)?);
            self.stream.skip(4)?;
        }
        Ok(data)
    }

    /// Skip chunks until the next fcTL and parse it
    fn find_next_fctl(&mut self) -> Result<FrameControl, PngDecodeErrors> {
        loop {
            let Some(header) = self.read_chunk_header()? else {
                continue;
            };
            let data_start = self.stream.position()? as usize;

            match header.chunk_type {
                PngChunkType::fcTL => {
                    let control = self.parse_fctl(header)?;
                    self.stream.set_position(data_start + header.length + 4)?;
                    return Ok(control);
                }
                PngChunkType::IEND => {
                    return Err(PngDecodeErrors::GenericStatic(
                        "Animation ended before all frames were found"
                    ))
                }
                PngChunkType::fdAT => {
                    return Err(PngDecodeErrors::GenericStatic("fdAT chunk without fcTL"))
                }
                PngChunkType::unkn => self.handle_unknown(header)?,
                _ => ()
            }
            self.stream.set_position(data_start + header.length + 4)?;
        }
    }

    /// Concatenate the payload of consecutive fdAT chunks
    fn collect_fdat(&mut self) -> Result<Vec<u8>, PngDecodeErrors> {
        let mut data = Vec::new();

        loop {
            let position = self.stream.position()? as usize;
            let (length, name) = self.read_chunk_name()?;

            if &name != b"fdAT" {
                self.stream.set_position(position)?;
                break;
            }
            self.verify_chunk(length, name)?;

            if length < 4 {
                return Err(PngDecodeErrors::GenericStatic("fdAT chunk too short"));
            }
            let sequence = self.stream.get_u32_be_err()?;
            self.check_sequence(sequence)?;

            data.extend_from_slice(&self.stream.read_vec(length - 4)?);
            self.stream.skip(4)?;
        }
        if data.is_empty() {
            return Err(PngDecodeErrors::GenericStatic("Frame without fdAT data"));
        }
        Ok(data)
    }

    /// Walk the remaining chunks making sure the file ends with IEND
    fn expect_iend(&mut self) -> Result<(), PngDecodeErrors> {
        loop {
            let Some(header) = self.read_chunk_header()? else {
                continue;
            };
            if header.chunk_type == PngChunkType::IEND {
                break;
            }
            if header.chunk_type == PngChunkType::unkn {
                self.handle_unknown(header)?;
            }
            self.stream.skip(header.length + 4)?;
        }
        if !self.stream.eof()? {
            warn!("Trailing bytes after IEND chunk");
        }
        Ok(())
    }

    /// Inflate, unfilter and expand image data of a `width` x `height` image
    fn decode_image_data(
        &self, compressed: &[u8], width: usize, height: usize
    ) -> Result<Vec<u8>, PngDecodeErrors> {
        let info = self.png_info;
        let expected = self.raw_size(width, height);

        let options = DeflateOptions::default()
            .set_limit(self.options.inflate_get_limit())
            .set_confirm_checksum(self.options.inflate_get_confirm_adler())
            .set_size_hint(expected);

        let data = DeflateDecoder::new_with_options(compressed, options).decode_zlib()?;

        if data.len() < expected {
            error!(
                "Image data is {} bytes but {} bytes are needed",
                data.len(),
                expected
            );
            return Err(PngDecodeErrors::GenericStatic("Not enough image data"));
        }
        if data.len() > expected {
            warn!("{} extra bytes after image data", data.len() - expected);
        }
        let out_components = self.out_components();

        match info.interlace_method {
            InterlaceMethod::Standard => Ok(self.decode_pass(&data, width, height)?.0),
            InterlaceMethod::Adam7 => {
                let mut out = vec![0_u8; width * height * out_components];
                let mut offset = 0;

                for p in 0..7 {
                    let (pass_width, pass_height) = adam7_pass_size(p, width, height);

                    if pass_width == 0 || pass_height == 0 {
                        continue;
                    }
                    let (pixels, consumed) =
                        self.decode_pass(&data[offset..], pass_width, pass_height)?;
                    offset += consumed;

                    for (j, row) in pixels.chunks_exact(pass_width * out_components).enumerate() {
                        let y = j * ADAM7_Y_SPACING[p] + ADAM7_Y_ORIGIN[p];

                        for (i, px) in row.chunks_exact(out_components).enumerate() {
                            let x = i * ADAM7_X_SPACING[p] + ADAM7_X_ORIGIN[p];
                            let start = (y * width + x) * out_components;
                            out[start..start + out_components].copy_from_slice(px);
                        }
                    }
                }
                Ok(out)
            }
        }
    }

    /// Bytes of filtered data for a `width` x `height` image, filter bytes included
    fn raw_size(&self, width: usize, height: usize) -> usize {
        match self.png_info.interlace_method {
            InterlaceMethod::Standard => (self.row_bytes(width) + 1) * height,
            InterlaceMethod::Adam7 => (0..7)
                .map(|p| adam7_pass_size(p, width, height))
                .filter(|(w, h)| *w != 0 && *h != 0)
                .map(|(w, h)| (self.row_bytes(w) + 1) * h)
                .sum()
        }
    }

    fn row_bytes(&self, width: usize) -> usize {
        let bits = width * usize::from(self.png_info.component) * usize::from(self.png_info.depth);
        (bits + 7) / 8
    }

    fn out_components(&self) -> usize {
        self.colorspace().map_or(4, |c| c.num_components())
    }

    /// Unfilter and expand one image (or Adam7 pass), returning
    /// the pixels and the number of bytes consumed from `data`
    fn decode_pass(
        &self, data: &[u8], width: usize, height: usize
    ) -> Result<(Vec<u8>, usize), PngDecodeErrors> {
        let row_bytes = self.row_bytes(width);
        let needed = (row_bytes + 1) * height;

        if data.len() < needed {
            return Err(PngDecodeErrors::GenericStatic("Not enough image data"));
        }
        let bits_per_pixel =
            usize::from(self.png_info.component) * usize::from(self.png_info.depth);
        // filters work on whole bytes
        let filter_components = ((bits_per_pixel + 7) / 8).max(1);

        let out_stride = width * self.out_components();
        let mut out = vec![0_u8; out_stride * height];

        let mut prev_row = vec![0_u8; row_bytes];
        let mut current = vec![0_u8; row_bytes];

        for (in_row, out_row) in data[..needed]
            .chunks_exact(row_bytes + 1)
            .zip(out.chunks_exact_mut(out_stride))
        {
            let filter =
                FilterMethod::from_int(in_row[0]).ok_or(PngDecodeErrors::UnknownFilter(in_row[0]))?;

            de_filter_row(filter, &prev_row, &in_row[1..], &mut current, filter_components);
            self.expand_row(&current, width, out_row)?;

            core::mem::swap(&mut prev_row, &mut current);
        }
        Ok((out, needed))
    }

    /// Convert one unfiltered scanline into 8 bit output samples
    fn expand_row(&self, raw: &[u8], width: usize, out: &mut [u8]) -> Result<(), PngDecodeErrors> {
        let info = &self.png_info;
        let depth = info.depth;

        if info.color != PngColor::Palette && !self.seen_trns {
            if depth == 8 {
                out.copy_from_slice(&raw[..out.len()]);
                return Ok(());
            }
            if depth == 16 {
                // keep the most significant byte of each big endian sample
                for (o, s) in out.iter_mut().zip(raw.chunks_exact(2)) {
                    *o = s[0];
                }
                return Ok(());
            }
        }
        let components = usize::from(info.component);
        let out_components = self.out_components();
        let scale = |v: u16| -> u8 {
            match depth {
                16 => (v >> 8) as u8,
                8 => v as u8,
                _ => (v as u8).wrapping_mul(DEPTH_SCALE_TABLE[usize::from(depth)])
            }
        };

        for (x, px) in out.chunks_exact_mut(out_components).take(width).enumerate() {
            let mut samples = [0_u16; 4];

            for (c, sample) in samples.iter_mut().take(components).enumerate() {
                *sample = read_sample(raw, x * components + c, depth);
            }
            match info.color {
                PngColor::Palette => {
                    let index = usize::from(samples[0]);
                    let color = self.palette.get(index).ok_or(
                        ColorModelError::IndexOutOfRange {
                            index,
                            palette_len: self.palette.len()
                        }
                    )?;
                    px.copy_from_slice(&color.to_array()[..out_components]);
                }
                PngColor::Luma => {
                    px[0] = scale(samples[0]);

                    if let Some(key) = self.trns_key {
                        px[1] = if samples[0] == key[0] { 0 } else { 255 };
                    }
                }
                PngColor::RGB => {
                    for c in 0..3 {
                        px[c] = scale(samples[c]);
                    }
                    if let Some(key) = self.trns_key {
                        px[3] = if samples[..3] == key { 0 } else { 255 };
                    }
                }
                PngColor::LumaA | PngColor::RGBA => {
                    for (o, s) in px.iter_mut().zip(samples) {
                        *o = scale(s);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Read sample number `index` of a scanline packed at `depth` bits per sample
#[inline]
fn read_sample(raw: &[u8], index: usize, depth: u8) -> u16 {
    match depth {
        16 => u16::from_be_bytes([raw[2 * index], raw[2 * index + 1]]),
        8 => u16::from(raw[index]),
        _ => {
            let depth = usize::from(depth);
            let bit = index * depth;
            let shift = 8 - depth - (bit % 8);
            let mask = (1_u16 << depth) - 1;

            (u16::from(raw[bit / 8]) >> shift) & mask
        }
    }
}

/// Width and height of Adam7 pass `p`
const fn adam7_pass_size(p: usize, width: usize, height: usize) -> (usize, usize) {
    let w = if width > ADAM7_X_ORIGIN[p] {
        (width - ADAM7_X_ORIGIN[p] + ADAM7_X_SPACING[p] - 1) / ADAM7_X_SPACING[p]
    } else {
        0
    };
    let h = if height > ADAM7_Y_ORIGIN[p] {
        (height - ADAM7_Y_ORIGIN[p] + ADAM7_Y_SPACING[p] - 1) / ADAM7_Y_SPACING[p]
    } else {
        0
    };
    (w, h)
}

/// Return true if `bytes` start with the png signature
pub fn probe_png(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE_BYTES)
}

#[cfg(test)]
mod tests {
    use crate::decoder::{adam7_pass_size, read_sample};

    #[test]
    fn adam7_pass_sizes_cover_image() {
        for (w, h) in [(1, 1), (3, 2), (8, 8), (47, 33)] {
            let total: usize = (0..7)
                .map(|p| adam7_pass_size(p, w, h))
                .map(|(pw, ph)| pw * ph)
                .sum();
            assert_eq!(total, w * h);
        }
        assert_eq!(adam7_pass_size(1, 4, 4), (0, 1));
    }

    #[test]
    fn packed_samples() {
        let raw = [0b1011_0010, 0xAB, 0xCD];
        assert_eq!(read_sample(&raw, 0, 1), 1);
        assert_eq!(read_sample(&raw, 1, 1), 0);
        assert_eq!(read_sample(&raw, 1, 2), 0b11);
        assert_eq!(read_sample(&raw, 1, 4), 0b0010);
        assert_eq!(read_sample(&raw[1..], 0, 16), 0xABCD);
    }
}
