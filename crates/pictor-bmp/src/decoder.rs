/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

// BMP has been extended multiple times, the layout we handle is
//
// - A 14 byte file header, `BM`, file size, two reserved u16's and the offset
//   to the pixel data.
// - An info header whose first u32 is its own size. 12 bytes for Windows v2 and
//   OS/2 v1 (u16 width and height), 16 or 64 bytes for OS/2 v2, 40 for Windows v3,
//   52 and 56 for the Adobe extensions, 108 for v4 and 124 for v5.
//   Headers of 40 bytes and above carry a compression field.
// - Three (or four, for ALPHABITFIELDS) u32 masks when the compression is
//   BITFIELDS. In headers of 52 bytes and up they are part of the header, in a 40
//   byte header they follow it. Either way they start at offset 54.
// - A color table for images with 8 bits per pixel or less, BGR triplets for the
//   12 byte header, BGR0 quads otherwise.
// - Pixel data at the offset from the file header. Rows are stored bottom-up
//   unless the height is negative and each row is padded to a multiple of four
//   bytes.
//
// 32 bit images without masks are treated as BGRA if at least one alpha byte is
// non-zero and opaque BGR otherwise.

use alloc::vec::Vec;
use alloc::{format, vec};

use pictor_core::bytestream::{ZByteIoError, ZByteReaderTrait, ZReader};
use pictor_core::color::{resolve_palette, Color};
use pictor_core::colorspace::ColorSpace;
use pictor_core::log::{error, trace, warn};
use pictor_core::options::DecoderOptions;

use crate::common::{BmpCompression, BmpPixelFormat, MaskChannel};
use crate::utils::{expand_bits_to_byte, flip_rows, padded_row_size};
use crate::BmpDecoderErrors;

const FILE_HEADER_SIZE: usize = 14;

/// Probe some bytes to see
/// if they consist of a BMP image
pub fn probe_bmp(bytes: &[u8]) -> bool {
    if let Some(magic_bytes) = bytes.get(0..2) {
        if magic_bytes == b"BM" {
            // skip file_size   -> 4
            // skip reserved    -> 4
            // skip data offset -> 4
            if let Some(size) = bytes.get(14..18) {
                let size = u32::from_le_bytes([size[0], size[1], size[2], size[3]]);
                return is_known_header_size(size);
            }
        }
    }
    false
}

const fn is_known_header_size(size: u32) -> bool {
    matches!(size, 12 | 16 | 40 | 52 | 56 | 64 | 108 | 124)
}

/// A BMP decoder.
///
/// # Usage
/// The decoder can be used to read image information and or get the pixels out of a valid bmp
/// image.
///
/// ## Extracting image metadata
/// - use `decode_headers` + utility functions to get information
/// ```no_run
/// use pictor_bmp::BmpDecoder;
/// use pictor_core::bytestream::ZCursor;
///
/// fn main()->Result<(),pictor_bmp::BmpDecoderErrors>{
///
///     let source = ZCursor::new(b"BMP");
///     let mut decoder = BmpDecoder::new(source);
///     decoder.decode_headers()?;
///     // after decoding headers, we can safely access the image metadata
///     // unwrap won't panic
///     let (w,h) = decoder.dimensions().unwrap();
///     println!("Image width: {}\t Image height: {}",w,h);
///     println!("Colorspace: {:?}\t",decoder.colorspace().unwrap());
///
///     Ok(())
/// }
/// ```
///
/// ## Just getting the pixels
///
/// ```no_run
/// use pictor_bmp::BmpDecoder;
/// use pictor_core::bytestream::ZCursor;
///
/// fn main()->Result<(),pictor_bmp::BmpDecoderErrors>{
///
///     let source = ZCursor::new(b"BMP");
///     let mut decoder = BmpDecoder::new(source);
///     let pixels = decoder.decode()?;
///     println!("Pixels length:{}",pixels.len());
///     Ok(())
/// }
/// ```
pub struct BmpDecoder<T>
where
    T: ZByteReaderTrait
{
    bytes:           ZReader<T>,
    options:         DecoderOptions,
    width:           usize,
    height:          usize,
    bottom_up:       bool,
    masks:           [MaskChannel; 4],
    decoded_headers: bool,
    pix_fmt:         BmpPixelFormat,
    comp:            BmpCompression,
    palette:         Vec<Color>,
    depth:           u16
}

impl<T> BmpDecoder<T>
where
    T: ZByteReaderTrait
{
    /// Create a new bmp decoder that reads data from
    /// `data`
    ///
    /// # Arguments
    /// - `data`: The buffer from which we will read bytes from
    ///
    /// # Returns
    /// - A BMP decoder instance
    pub fn new(data: T) -> BmpDecoder<T> {
        BmpDecoder::new_with_options(data, DecoderOptions::default())
    }
    /// Create a new decoder instance with specified options
    ///
    /// # Arguments
    ///
    /// * `data`: The buffer from which we will read data from
    /// * `options`:  Specialized options for this decoder
    ///
    /// returns: A BMP Decoder instance
    ///
    pub fn new_with_options(data: T, options: DecoderOptions) -> BmpDecoder<T> {
        BmpDecoder {
            bytes: ZReader::new(data),
            options,
            decoded_headers: false,
            width: 0,
            height: 0,
            comp: BmpCompression::Unknown,
            masks: [MaskChannel::default(); 4],
            pix_fmt: BmpPixelFormat::None,
            bottom_up: true,
            depth: 0,
            palette: vec![]
        }
    }

    /// Decode headers stored in the bmp file and store
    /// information in the decode context
    ///
    /// After calling this, most information fields will be filled
    /// except the actual decoding bytes
    ///
    /// # Returns
    /// - Ok(()) Indicates everything was okay during header parsing
    /// - Err: Error that occurred when decoding headers
    pub fn decode_headers(&mut self) -> Result<(), BmpDecoderErrors> {
        if self.decoded_headers {
            return Ok(());
        }

        if &self.bytes.read_fixed_bytes_or_error::<2>()? != b"BM" {
            return Err(BmpDecoderErrors::InvalidMagicBytes);
        }
        // 4 bytes file size
        // skip 4 reserved bytes
        self.bytes.skip(8)?;

        let data_offset = self.bytes.get_u32_le_err()?;
        let ihsize = self.bytes.get_u32_le_err()?;

        if !is_known_header_size(ihsize) {
            return Err(BmpDecoderErrors::GenericStatic(
                "Unknown information header size"
            ));
        }
        if ihsize.saturating_add(FILE_HEADER_SIZE as u32) > data_offset {
            return Err(BmpDecoderErrors::GenericStatic(
                "Pixel data offset points inside the header"
            ));
        }

        let (width, height) = if ihsize == 12 {
            // os/2 v1 and windows v2 images
            let width = i64::from(self.bytes.get_u16_le_err()?);
            let height = i64::from(self.bytes.get_u16_le_err()?);
            (width, height)
        } else {
            let width = i64::from(self.bytes.get_u32_le_err()? as i32);
            let height = i64::from(self.bytes.get_u32_le_err()? as i32);
            (width, height)
        };

        if width <= 0 {
            return Err(BmpDecoderErrors::GenericStatic(
                "Width is zero or negative, invalid image"
            ));
        }
        if height == 0 {
            return Err(BmpDecoderErrors::GenericStatic(
                "Height is zero, invalid image"
            ));
        }
        // a negative height means rows are stored top to bottom
        self.bottom_up = height > 0;
        self.width = width as usize;
        self.height = height.unsigned_abs() as usize;

        if self.height > self.options.get_max_height() {
            return Err(BmpDecoderErrors::TooLargeDimensions(
                "height",
                self.options.get_max_height(),
                self.height
            ));
        }
        if self.width > self.options.get_max_width() {
            return Err(BmpDecoderErrors::TooLargeDimensions(
                "width",
                self.options.get_max_width(),
                self.width
            ));
        }

        trace!("Width: {}", self.width);
        trace!("Height: {}", self.height);

        // planes
        if self.bytes.get_u16_le_err()? != 1 {
            return Err(BmpDecoderErrors::GenericStatic("Invalid BMP header"));
        }

        let depth = self.bytes.get_u16_le_err()?;

        if depth == 0 {
            return Err(BmpDecoderErrors::GenericStatic(
                "Depth is zero, invalid image"
            ));
        }

        let compression = if ihsize >= 40 {
            let raw = self.bytes.get_u32_le_err()?;
            BmpCompression::from_u32(raw).ok_or(BmpDecoderErrors::UnsupportedCompression(raw))?
        } else {
            BmpCompression::RGB
        };

        match (depth, compression) {
            (1 | 2 | 4 | 8 | 16 | 24 | 32, BmpCompression::RGB)
            | (8, BmpCompression::RLE8)
            | (4, BmpCompression::RLE4)
            | (16 | 32, BmpCompression::BITFIELDS | BmpCompression::ALPHABITFIELDS) => (),
            (1 | 2 | 4 | 8 | 16 | 24 | 32, _) => {
                return Err(BmpDecoderErrors::Generic(format!(
                    "Compression {compression:?} cannot be used with a depth of {depth}"
                )));
            }
            (d, _) => return Err(BmpDecoderErrors::UnsupportedDepth(d))
        }
        if depth == 2 {
            warn!("Depth of 2 not officially supported");
        }

        // bytes between the headers and the pixel data
        let mut gap = (data_offset - ihsize) as usize - FILE_HEADER_SIZE;

        if compression.is_bitfields() {
            self.bytes.set_position(FILE_HEADER_SIZE + 40)?;

            let red = self.bytes.get_u32_le_err()?;
            let green = self.bytes.get_u32_le_err()?;
            let blue = self.bytes.get_u32_le_err()?;
            let has_alpha_mask = ihsize >= 56 || compression == BmpCompression::ALPHABITFIELDS;
            let alpha = if has_alpha_mask {
                self.bytes.get_u32_le_err()?
            } else {
                0
            };
            if ihsize == 40 {
                gap = gap.saturating_sub(if has_alpha_mask { 16 } else { 12 });
            }
            self.masks = [red, green, blue, alpha].map(MaskChannel::new);

            if self.masks[..3].iter().any(|x| x.is_empty()) {
                return Err(BmpDecoderErrors::GenericStatic("Empty color mask"));
            }
        } else if depth == 16 {
            // default is 5 bits per channel, top bit unused
            self.masks = [31_u32 << 10, 31 << 5, 31, 0].map(MaskChannel::new);
        }

        self.pix_fmt = match depth {
            32 => BmpPixelFormat::RGBA,
            24 => BmpPixelFormat::RGB,
            16 if self.masks[3].is_empty() => BmpPixelFormat::RGB,
            16 => BmpPixelFormat::RGBA,
            8 if gap == 0 && !compression.is_rle() => BmpPixelFormat::GRAY8,
            _ => BmpPixelFormat::PAL8
        };

        if self.pix_fmt == BmpPixelFormat::PAL8 {
            self.read_palette(depth, ihsize, gap)?;
        }

        trace!("Pixel format : {:?}", self.pix_fmt);
        trace!("Compression  : {:?}", compression);
        trace!("Bit depth: {:?}", depth);
        self.comp = compression;
        self.depth = depth;

        self.bytes.set_position(0)?;
        if !self.bytes.has(data_offset as usize)? {
            return Err(BmpDecoderErrors::GenericStatic(
                "Pixel data offset lies past the end of the file"
            ));
        }
        self.bytes.set_position(data_offset as usize)?;

        self.decoded_headers = true;

        Ok(())
    }

    fn read_palette(&mut self, depth: u16, ihsize: u32, gap: usize) -> Result<(), BmpDecoderErrors> {
        // OS/2 bitmap, 3 bytes per palette entry
        let entry_size = if ihsize == 12 { 3 } else { 4 };
        let max_colors = 1_usize << depth;
        let mut colors = max_colors;

        if ihsize >= 40 {
            self.bytes.set_position(46)?;
            let declared = self.bytes.get_u32_le_err()? as usize;

            if declared > max_colors {
                let msg = format!("Incorrect number of colors {} for depth {}", declared, depth);
                if self.options.get_strict_mode() {
                    return Err(BmpDecoderErrors::Generic(msg));
                }
                warn!("{}", msg);
            } else if declared != 0 {
                colors = declared;
            }
        }
        let available = gap / entry_size;

        if available == 0 {
            return Err(BmpDecoderErrors::Generic(format!(
                "Unknown palette for {}-color bmp",
                max_colors
            )));
        }
        if colors > available {
            warn!(
                "Palette declares {} entries but only {} fit before pixel data",
                colors,
                available
            );
            colors = available;
        }
        // palette location
        self.bytes.set_position(FILE_HEADER_SIZE + ihsize as usize)?;

        let mut palette = Vec::with_capacity(colors);

        for _ in 0..colors {
            let entry = if entry_size == 3 {
                let [b, g, r] = self.bytes.read_fixed_bytes_or_error::<3>()?;
                Color::from_rgb(r, g, b)
            } else {
                // the fourth byte is reserved, palette entries are always opaque
                let [b, g, r, _] = self.bytes.read_fixed_bytes_or_error::<4>()?;
                Color::from_rgb(r, g, b)
            };
            palette.push(entry);
        }
        trace!("Palette entries: {}", palette.len());
        self.palette = palette;

        Ok(())
    }

    /// Return the expected size of the output buffer for which
    /// a contiguous slice of `&[u8]` can store it without needing reallocation
    ///
    /// Returns `None` if headers haven't been decoded or if calculation overflows
    pub fn output_buf_size(&self) -> Option<usize> {
        if !self.decoded_headers {
            return None;
        }
        self.width
            .checked_mul(self.height)?
            .checked_mul(self.pix_fmt.num_components())
    }

    /// Get dimensions of the image
    ///
    /// This is a tuple of width,height
    ///
    /// # Returns
    /// - `Some((width,height))`  - The image dimensions
    /// - `None`: Indicates that the image headers weren't decoded
    ///    or an error occurred during decoding the headers
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        if !self.decoded_headers {
            return None;
        }
        Some((self.width, self.height))
    }
    /// Get the image colorspace or none if the headers weren't decoded
    ///
    /// Paletted images are expanded to RGB, images with 8 bits per pixel
    /// and no palette are grayscale.
    pub fn colorspace(&self) -> Option<ColorSpace> {
        if !self.decoded_headers {
            return None;
        }
        Some(self.pix_fmt.into_colorspace())
    }
    /// Bits per pixel of the stored image
    pub fn bit_depth(&self) -> Option<u16> {
        if !self.decoded_headers {
            return None;
        }
        Some(self.depth)
    }
    /// Compression scheme of the stored pixels
    pub fn compression(&self) -> Option<BmpCompression> {
        if !self.decoded_headers {
            return None;
        }
        Some(self.comp)
    }
    /// Decode an image returning the decoded bytes as an
    /// allocated `Vec<u8>` or an error if decoding could not be completed
    ///
    ///
    /// Also see [`decode_into`](Self::decode_into) which decodes into
    /// a pre-allocated buffer
    pub fn decode(&mut self) -> Result<Vec<u8>, BmpDecoderErrors> {
        self.decode_headers()?;
        let mut output = vec![
            0_u8;
            self.output_buf_size()
                .ok_or(BmpDecoderErrors::OverFlowOccurred)?
        ];

        self.decode_into(&mut output)?;

        Ok(output)
    }

    /// Decode an encoded image into a buffer or return an error
    /// if something bad occurred
    ///
    /// Also see [`decode`](Self::decode) which allocates and decodes into buffer
    pub fn decode_into(&mut self, buf: &mut [u8]) -> Result<(), BmpDecoderErrors> {
        self.decode_headers()?;

        let output_size = self
            .output_buf_size()
            .ok_or(BmpDecoderErrors::OverFlowOccurred)?;

        if buf.len() < output_size {
            return Err(BmpDecoderErrors::TooSmallBuffer(output_size, buf.len()));
        }
        let buf = &mut buf[0..output_size];

        // every path below writes rows in storage order, the
        // flip at the end puts them top to bottom
        match self.pix_fmt {
            BmpPixelFormat::PAL8 => {
                let indices = if self.comp.is_rle() {
                    self.decode_rle()?
                } else {
                    self.read_packed_indices()?
                };
                self.expand_palette(&indices, buf)?;
            }
            BmpPixelFormat::GRAY8 => self.read_rows(buf, 1)?,
            BmpPixelFormat::RGB | BmpPixelFormat::RGBA => match self.depth {
                24 => {
                    self.read_rows(buf, 3)?;
                    // then flip bgr to rgb
                    buf.chunks_exact_mut(3).for_each(|pix| pix.swap(0, 2));
                }
                16 => self.decode_masked_16(buf)?,
                32 => self.decode_32(buf)?,
                d => return Err(BmpDecoderErrors::UnsupportedDepth(d))
            },
            BmpPixelFormat::None => {
                return Err(BmpDecoderErrors::GenericStatic("Unsupported Pixel format"));
            }
        }
        if self.bottom_up {
            flip_rows(buf, self.width * self.pix_fmt.num_components());
        }
        Ok(())
    }

    /// Read `components` bytes per pixel rows, dropping the padding
    fn read_rows(&mut self, buf: &mut [u8], components: usize) -> Result<(), BmpDecoderErrors> {
        let out_width = self.width * components;
        // includes pad bytes (multiple of 4)
        let in_width = padded_row_size(self.width, components * 8);

        for out in buf.chunks_exact_mut(out_width) {
            self.bytes.read_exact_bytes(out)?;
            self.skip_padding(in_width - out_width)?;
        }
        Ok(())
    }

    /// Skip the padding closing a row, a file cut inside it is truncated
    fn skip_padding(&mut self, padding: usize) -> Result<(), BmpDecoderErrors> {
        let remaining = self.bytes.remaining()?;

        if remaining < padding {
            return Err(ZByteIoError::NotEnoughBytes(padding, remaining).into());
        }
        self.bytes.skip(padding)?;
        Ok(())
    }

    /// Unpack 1, 2, 4 or 8 bit palette indices, one byte per pixel
    fn read_packed_indices(&mut self) -> Result<Vec<u8>, BmpDecoderErrors> {
        let depth = usize::from(self.depth);
        let packed_width = (self.width * depth + 7) / 8;
        let padding = padded_row_size(self.width, depth) - packed_width;

        let mut packed = vec![0_u8; packed_width];
        let mut indices = vec![0_u8; self.width * self.height];

        for out in indices.chunks_exact_mut(self.width) {
            self.bytes.read_exact_bytes(&mut packed)?;
            self.skip_padding(padding)?;
            expand_bits_to_byte(depth, &packed, out);
        }
        Ok(indices)
    }

    /// Resolve palette indices into RGB, an index past the palette is an error
    fn expand_palette(&self, indices: &[u8], buf: &mut [u8]) -> Result<(), BmpDecoderErrors> {
        let mut rgba = vec![0_u8; indices.len() * 4];

        if let Err(e) = resolve_palette(indices, &self.palette, &mut rgba) {
            error!("Bad palette index: {:?}", e);
            return Err(e.into());
        }
        for (out, pix) in buf.chunks_exact_mut(3).zip(rgba.chunks_exact(4)) {
            out.copy_from_slice(&pix[..3]);
        }
        Ok(())
    }

    fn decode_masked_16(&mut self, buf: &mut [u8]) -> Result<(), BmpDecoderErrors> {
        let components = self.pix_fmt.num_components();
        let padding = padded_row_size(self.width, 16) - self.width * 2;
        let [mr, mg, mb, ma] = self.masks;
        let mut row = vec![0_u8; self.width * 2];

        for out in buf.chunks_exact_mut(self.width * components) {
            self.bytes.read_exact_bytes(&mut row)?;
            self.skip_padding(padding)?;

            for (pix, v) in out.chunks_exact_mut(components).zip(row.chunks_exact(2)) {
                let v = u32::from(u16::from_le_bytes([v[0], v[1]]));

                pix[0] = mr.extract(v);
                pix[1] = mg.extract(v);
                pix[2] = mb.extract(v);

                if components == 4 {
                    pix[3] = ma.extract(v);
                }
            }
        }
        Ok(())
    }

    fn decode_32(&mut self, buf: &mut [u8]) -> Result<(), BmpDecoderErrors> {
        // bpp of 32 doesn't have padding
        let mut row = vec![0_u8; self.width * 4];

        if self.comp.is_bitfields() {
            let [mr, mg, mb, ma] = self.masks;

            for out in buf.chunks_exact_mut(self.width * 4) {
                self.bytes.read_exact_bytes(&mut row)?;

                for (pix, v) in out.chunks_exact_mut(4).zip(row.chunks_exact(4)) {
                    let v = u32::from_le_bytes([v[0], v[1], v[2], v[3]]);

                    pix[0] = mr.extract(v);
                    pix[1] = mg.extract(v);
                    pix[2] = mb.extract(v);
                    // no alpha mask, image is opaque
                    pix[3] = if ma.is_empty() { 255 } else { ma.extract(v) };
                }
            }
            return Ok(());
        }
        for out in buf.chunks_exact_mut(self.width * 4) {
            self.bytes.read_exact_bytes(&mut row)?;

            for (pix, v) in out.chunks_exact_mut(4).zip(row.chunks_exact(4)) {
                // swap bgr and rgb
                pix.copy_from_slice(&[v[2], v[1], v[0], v[3]]);
            }
        }
        if buf.chunks_exact(4).all(|pix| pix[3] == 0) {
            trace!("All alpha bytes are zero, treating image as opaque");
            buf.chunks_exact_mut(4).for_each(|pix| pix[3] = 255);
        }
        Ok(())
    }

    /// Decode RLE4 or RLE8 data into one palette index per pixel,
    /// rows in storage order
    ///
    /// * A non-zero first byte is a run, the second byte holds the index
    ///   (or two alternating nibbles for RLE4) repeated that many times.
    /// * A zero first byte is an escape, the second byte tells which
    ///   * 0: end of line
    ///   * 1: end of bitmap
    ///   * 2: delta, the next two bytes move the position right and up
    ///   * 3+: absolute mode, that many indices follow literally, padded
    ///     to an even number of bytes.
    ///
    /// Pixels the stream never touches keep index zero.
    fn decode_rle(&mut self) -> Result<Vec<u8>, BmpDecoderErrors> {
        let (width, height) = (self.width, self.height);
        let is_rle4 = self.comp == BmpCompression::RLE4;
        let nibble = |byte: u8, i: usize| -> u8 {
            if !is_rle4 {
                byte
            } else if i & 1 == 0 {
                byte >> 4
            } else {
                byte & 0x0F
            }
        };

        let mut indices = vec![0_u8; width * height];
        let (mut x, mut y) = (0_usize, 0_usize);

        while y < height {
            let count = usize::from(self.bytes.get_u8_err()?);
            let value = self.bytes.get_u8_err()?;

            if count > 0 {
                if x + count > width {
                    if self.options.get_strict_mode() {
                        return Err(BmpDecoderErrors::CorruptRle("run goes past row end"));
                    }
                    warn!("RLE run goes past row end, clipping");
                }
                for i in 0..count.min(width.saturating_sub(x)) {
                    indices[y * width + x + i] = nibble(value, i);
                }
                x += count;
                continue;
            }
            match value {
                0 => {
                    // end of line
                    x = 0;
                    y += 1;
                }
                1 => {
                    // end of picture
                    return Ok(indices);
                }
                2 => {
                    x += usize::from(self.bytes.get_u8_err()?);
                    y += usize::from(self.bytes.get_u8_err()?);

                    if y > height || (y == height && x > 0) {
                        return Err(BmpDecoderErrors::CorruptRle("delta moves outside image"));
                    }
                }
                literal => {
                    let literal = usize::from(literal);
                    let byte_count = if is_rle4 { (literal + 1) / 2 } else { literal };
                    let bytes = self.bytes.read_vec(byte_count)?;
                    // absolute runs are padded to 16 bits
                    self.bytes.skip(byte_count & 1)?;

                    for i in 0..literal {
                        if x + i < width {
                            let byte = bytes[if is_rle4 { i / 2 } else { i }];
                            indices[y * width + x + i] = nibble(byte, i);
                        }
                    }
                    x += literal;
                }
            }
        }
        if self.bytes.get_u16_be() != 1 {
            warn!("RLE warning, no end of picture code");
        }
        Ok(indices)
    }
}
