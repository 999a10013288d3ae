/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::vec;

use pictor_core::bytestream::{ZByteWriterTrait, ZWriter};
use pictor_core::color::expand_to_rgba;
use pictor_core::log::trace;
use pictor_core::options::EncoderOptions;

use crate::utils::padded_row_size;
use crate::BmpEncoderErrors;

const FILE_HEADER_SIZE: u32 = 14;
const INFO_HEADER_SIZE: u32 = 40;
const V4_HEADER_SIZE: u32 = 108;
/// 72 DPI
const PIXELS_PER_METER: u32 = 2835;
/// `sRGB` as a little endian four cc
const LCS_SRGB: u32 = 0x7352_4742;

/// A BMP encoder
///
/// Images without alpha are written as 24 bit uncompressed rows,
/// images with alpha as 32 bit `BITFIELDS` with a version 4 header
/// so readers pick up the alpha mask. Rows are written bottom-up.
///
/// Grayscale and BGR(A) input is expanded before writing.
///
/// # Example
/// ```
/// use pictor_bmp::BmpEncoder;
/// use pictor_core::colorspace::ColorSpace;
/// use pictor_core::options::EncoderOptions;
///
/// let pixels = [0_u8; 10 * 10 * 4];
/// let mut sink = vec![];
/// let written = BmpEncoder::new(&pixels, EncoderOptions::new(10, 10, ColorSpace::RGBA))
///     .encode(&mut sink)
///     .unwrap();
/// assert_eq!(written, sink.len());
/// ```
pub struct BmpEncoder<'a> {
    data:    &'a [u8],
    options: EncoderOptions
}

impl<'a> BmpEncoder<'a> {
    /// Create a new encoder
    ///
    /// # Arguments
    /// - data: Pixels, `width*height*components` bytes
    /// - options: Width, height and colorspace of `data`
    pub const fn new(data: &'a [u8], options: EncoderOptions) -> BmpEncoder<'a> {
        BmpEncoder { data, options }
    }

    /// Size of the encoded file, headers included
    pub fn encoded_size(&self) -> usize {
        let (depth, header) = self.layout();
        let rows = padded_row_size(self.options.get_width(), depth) * self.options.get_height();

        rows + (FILE_HEADER_SIZE + header) as usize
    }

    fn layout(&self) -> (usize, u32) {
        if self.options.get_colorspace().has_alpha() {
            (32, V4_HEADER_SIZE)
        } else {
            (24, INFO_HEADER_SIZE)
        }
    }

    /// Encode the pixels into `sink`
    ///
    /// # Returns
    /// - Ok(size): Bytes written to the sink
    /// - Err: The reason encoding failed
    pub fn encode<T: ZByteWriterTrait>(&self, sink: T) -> Result<usize, BmpEncoderErrors> {
        let (width, height) = (self.options.get_width(), self.options.get_height());
        let colorspace = self.options.get_colorspace();

        if width == 0 || height == 0 || width > i32::MAX as usize || height > i32::MAX as usize {
            return Err(BmpEncoderErrors::InvalidDimensions(width, height));
        }
        let expected = width
            .checked_mul(height)
            .and_then(|x| x.checked_mul(colorspace.num_components()))
            .ok_or(BmpEncoderErrors::InvalidDimensions(width, height))?;

        if self.data.len() != expected {
            return Err(BmpEncoderErrors::WrongInputSize(expected, self.data.len()));
        }
        let rgba = expand_to_rgba(self.data, colorspace)
            .map_err(|_| BmpEncoderErrors::UnsupportedColorspace(colorspace))?;

        let (depth, header_size) = self.layout();
        let row_size = padded_row_size(width, depth);
        let image_size = u32::try_from(row_size * height)
            .map_err(|_| BmpEncoderErrors::InvalidDimensions(width, height))?;
        let data_offset = FILE_HEADER_SIZE + header_size;
        let file_size = image_size
            .checked_add(data_offset)
            .ok_or(BmpEncoderErrors::InvalidDimensions(width, height))?;

        trace!("Writing {} bit bmp with a {} byte header", depth, header_size);

        let mut writer = ZWriter::new(sink);
        writer.reserve(file_size as usize)?;

        // file header
        writer.write_const_bytes(b"BM")?;
        writer.write_u32_le_err(file_size)?;
        writer.write_u32_le_err(0)?;
        writer.write_u32_le_err(data_offset)?;

        // info header
        writer.write_u32_le_err(header_size)?;
        writer.write_u32_le_err(width as u32)?;
        // positive height, bottom-up rows
        writer.write_u32_le_err(height as u32)?;
        writer.write_u16_le_err(1)?;
        writer.write_u16_le_err(depth as u16)?;
        writer.write_u32_le_err(if depth == 32 { 3 } else { 0 })?;
        writer.write_u32_le_err(image_size)?;
        writer.write_u32_le_err(PIXELS_PER_METER)?;
        writer.write_u32_le_err(PIXELS_PER_METER)?;
        // colors used, important colors
        writer.write_u32_le_err(0)?;
        writer.write_u32_le_err(0)?;

        if header_size == V4_HEADER_SIZE {
            // masks for BGRA byte order
            writer.write_u32_le_err(0x00FF_0000)?;
            writer.write_u32_le_err(0x0000_FF00)?;
            writer.write_u32_le_err(0x0000_00FF)?;
            writer.write_u32_le_err(0xFF00_0000)?;
            writer.write_u32_le_err(LCS_SRGB)?;
            // CIE endpoints and gamma, unused for sRGB
            writer.write_all(&[0; 48])?;
        }

        let components = depth / 8;
        let mut row = vec![0_u8; row_size];

        for src in rgba.chunks_exact(width * 4).rev() {
            for (out, pix) in row.chunks_exact_mut(components).zip(src.chunks_exact(4)) {
                out[0] = pix[2];
                out[1] = pix[1];
                out[2] = pix[0];

                if components == 4 {
                    out[3] = pix[3];
                }
            }
            writer.write_all(&row)?;
        }
        writer.flush()?;

        Ok(writer.bytes_written())
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use pictor_core::bytestream::ZCursor;
    use pictor_core::colorspace::ColorSpace;
    use pictor_core::options::EncoderOptions;

    use crate::{BmpCompression, BmpDecoder, BmpEncoder};

    fn encode(pixels: &[u8], w: usize, h: usize, colorspace: ColorSpace) -> Vec<u8> {
        let mut out = vec![];
        BmpEncoder::new(pixels, EncoderOptions::new(w, h, colorspace))
            .encode(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn rgb_round_trip_with_padding() {
        // a width of 5 needs one pad byte per row
        let pixels: Vec<u8> = (0..5 * 3 * 3).map(|x| (x * 5) as u8).collect();
        let encoded = encode(&pixels, 5, 3, ColorSpace::RGB);
        assert_eq!(encoded.len(), 54 + 16 * 3);

        let mut decoder = BmpDecoder::new(ZCursor::new(&encoded));
        assert_eq!(decoder.decode().unwrap(), pixels);
        assert_eq!(decoder.colorspace(), Some(ColorSpace::RGB));
        assert_eq!(decoder.bit_depth(), Some(24));
    }

    #[test]
    fn rgba_uses_bitfields() {
        let pixels: Vec<u8> = (0..4 * 2 * 4).map(|x| (x * 7) as u8).collect();
        let encoded = encode(&pixels, 4, 2, ColorSpace::RGBA);
        assert_eq!(encoded.len(), 122 + 32);

        let mut decoder = BmpDecoder::new(ZCursor::new(&encoded));
        assert_eq!(decoder.decode().unwrap(), pixels);
        assert_eq!(decoder.compression(), Some(BmpCompression::BITFIELDS));
        assert_eq!(decoder.colorspace(), Some(ColorSpace::RGBA));
    }

    #[test]
    fn luma_is_expanded() {
        let encoded = encode(&[10, 20], 2, 1, ColorSpace::Luma);
        let mut decoder = BmpDecoder::new(ZCursor::new(&encoded));
        assert_eq!(decoder.decode().unwrap(), [10, 10, 10, 20, 20, 20]);
    }

    #[test]
    fn bad_input_is_rejected() {
        let encoder = BmpEncoder::new(&[0; 5], EncoderOptions::new(2, 1, ColorSpace::RGB));
        assert!(encoder.encode(&mut vec![]).is_err());

        let encoder = BmpEncoder::new(&[], EncoderOptions::new(0, 1, ColorSpace::RGB));
        assert!(encoder.encode(&mut vec![]).is_err());
    }
}
