/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Baseline jpeg encoder
//!
//! Color images are written as YCbCr with 2x2 chroma subsampling,
//! grayscale images as a single component. Alpha channels are dropped.
use alloc::vec;
use alloc::vec::Vec;

use pictor_core::bytestream::{ZByteWriterTrait, ZWriter};
use pictor_core::colorspace::ColorSpace;
use pictor_core::log::trace;
use pictor_core::options::EncoderOptions;

use crate::encoder::fdct::fdct_quantize;
use crate::encoder::tables::{
    AC_CHROMA_BITS, AC_CHROMA_VALUES, AC_LUMA_BITS, AC_LUMA_VALUES, CHROMA_QUANT, DC_CHROMA_BITS,
    DC_CHROMA_VALUES, DC_LUMA_BITS, DC_LUMA_VALUES, LUMA_QUANT
};
use crate::errors::EncodeErrors;
use crate::misc::UN_ZIGZAG;

mod fdct;
mod tables;

/// Colorspaces the encoder accepts
pub const SUPPORTED_COLORSPACES: [ColorSpace; 4] = [
    ColorSpace::Luma,
    ColorSpace::LumaA,
    ColorSpace::RGB,
    ColorSpace::RGBA
];

/// Huffman codes of every symbol, as `(code, length)`
struct HuffmanCodes {
    codes: [(u16, u8); 256]
}

impl HuffmanCodes {
    fn new(bits: &[u8; 16], values: &[u8]) -> HuffmanCodes {
        let mut codes = [(0, 0); 256];
        let mut code = 0_u16;
        let mut symbols = values.iter();

        for (length, &count) in (1_u8..).zip(bits) {
            for _ in 0..count {
                if let Some(&symbol) = symbols.next() {
                    codes[usize::from(symbol)] = (code, length);
                }
                code = code.wrapping_add(1);
            }
            code = code.wrapping_shl(1);
        }
        HuffmanCodes { codes }
    }
}

/// Entropy coded segment writer, stuffs a zero after every 0xFF
struct BitWriter {
    buffer: u32,
    bits:   u8,
    out:    Vec<u8>
}

impl BitWriter {
    fn new(capacity: usize) -> BitWriter {
        BitWriter {
            buffer: 0,
            bits:   0,
            out:    Vec::with_capacity(capacity)
        }
    }

    /// Write the low `length` bits of `value`, `length` is at most 16
    #[allow(clippy::cast_possible_truncation)]
    fn put_bits(&mut self, value: u32, length: u8) {
        if length == 0 {
            return;
        }
        self.buffer = (self.buffer << length) | (value & ((1 << length) - 1));
        self.bits += length;

        while self.bits >= 8 {
            let byte = (self.buffer >> (self.bits - 8)) as u8;
            self.out.push(byte);

            if byte == 0xFF {
                self.out.push(0x00);
            }
            self.bits -= 8;
        }
        self.buffer &= (1 << self.bits) - 1;
    }

    fn put_code(&mut self, codes: &HuffmanCodes, symbol: u8) {
        let (code, length) = codes.codes[usize::from(symbol)];
        self.put_bits(u32::from(code), length);
    }

    /// Pad the last byte with one bits
    fn flush(&mut self) {
        if self.bits > 0 {
            let pad = 8 - self.bits;
            self.put_bits((1 << pad) - 1, pad);
        }
    }
}

/// Number of bits needed for `value` and the bits to write for it
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn value_bits(value: i32) -> (u8, u32) {
    let size = (32 - value.unsigned_abs().leading_zeros()) as u8;
    let bits = if value < 0 {
        value + (1 << size) - 1
    } else {
        value
    };
    (size, bits as u32)
}

/// Scale a quantization table for `quality` in 1..=100
#[allow(clippy::cast_possible_truncation)]
fn scale_table(table: &[u16; 64], quality: u8) -> [u16; 64] {
    let quality = u32::from(quality.clamp(1, 100));
    let scale = if quality < 50 {
        5000 / quality
    } else {
        200 - quality * 2
    };
    table.map(|x| ((u32::from(x) * scale + 50) / 100).clamp(1, 255) as u16)
}

struct ComponentTables<'a> {
    qt: &'a [u16; 64],
    dc: &'a HuffmanCodes,
    ac: &'a HuffmanCodes
}

/// Transform, quantize and write one block
fn encode_block(
    writer: &mut BitWriter, block: &[f32; 64], tables: &ComponentTables, dc_pred: &mut i32
) {
    let mut coeffs = [0_i32; 64];
    fdct_quantize(block, tables.qt, &mut coeffs);

    let diff = coeffs[0] - *dc_pred;
    *dc_pred = coeffs[0];

    let (size, bits) = value_bits(diff);
    writer.put_code(tables.dc, size);
    writer.put_bits(bits, size);

    let mut run = 0_u8;

    for &pos in &UN_ZIGZAG[1..] {
        let coeff = coeffs[pos];

        if coeff == 0 {
            run += 1;
            continue;
        }
        while run > 15 {
            // sixteen zeroes
            writer.put_code(tables.ac, 0xF0);
            run -= 16;
        }
        let (size, bits) = value_bits(coeff);
        writer.put_code(tables.ac, (run << 4) | size);
        writer.put_bits(bits, size);
        run = 0;
    }
    if run > 0 {
        // end of block
        writer.put_code(tables.ac, 0x00);
    }
}

/// A baseline jpeg encoder
///
/// # Example
/// - Encode a 16 by 16 RGB image
///
/// ```
/// use pictor_core::colorspace::ColorSpace;
/// use pictor_core::options::EncoderOptions;
/// use pictor_jpeg::JpegEncoder;
///
/// let pixels = vec![127_u8; 16 * 16 * 3];
/// let options = EncoderOptions::new(16, 16, ColorSpace::RGB).set_quality(90);
/// let mut sink = vec![];
/// JpegEncoder::new(&pixels, options).encode(&mut sink).unwrap();
/// assert_eq!(&sink[..2], &[0xFF, 0xD8]);
/// ```
pub struct JpegEncoder<'a> {
    data:    &'a [u8],
    options: EncoderOptions
}

impl<'a> JpegEncoder<'a> {
    /// Create a new encoder for `data`, laid out as described by `options`
    ///
    /// Quality is read from [`EncoderOptions::get_quality`]
    pub const fn new(data: &'a [u8], options: EncoderOptions) -> JpegEncoder<'a> {
        JpegEncoder { data, options }
    }

    fn check(&self) -> Result<(), EncodeErrors> {
        let colorspace = self.options.get_colorspace();

        if !SUPPORTED_COLORSPACES.contains(&colorspace) {
            return Err(EncodeErrors::UnsupportedColorspace(colorspace));
        }
        let (width, height) = (self.options.get_width(), self.options.get_height());

        if width == 0 || height == 0 || width > 65535 || height > 65535 {
            return Err(EncodeErrors::InvalidDimensions(width, height));
        }
        let expected = width * height * colorspace.num_components();

        if self.data.len() != expected {
            return Err(EncodeErrors::WrongInputSize(expected, self.data.len()));
        }
        Ok(())
    }

    /// Encode the image into `sink`, returning the number of bytes written
    pub fn encode<T: ZByteWriterTrait>(&mut self, sink: T) -> Result<usize, EncodeErrors> {
        self.check()?;

        let colorspace = self.options.get_colorspace();
        let is_color = !colorspace.is_grayscale();
        let quality = self.options.get_quality();

        trace!("Encoding jpeg at quality {quality}, color: {is_color}");

        let luma_qt = scale_table(&LUMA_QUANT, quality);
        let chroma_qt = scale_table(&CHROMA_QUANT, quality);

        let mut writer = ZWriter::new(sink);

        write_headers(&mut writer, &self.options, is_color, &luma_qt, &chroma_qt)?;

        let entropy = if is_color {
            self.encode_color(&luma_qt, &chroma_qt)
        } else {
            self.encode_gray(&luma_qt)
        };
        writer.write_all(&entropy)?;
        // EOI
        writer.write_u16_be_err(0xFFD9)?;
        writer.flush()?;

        Ok(writer.bytes_written())
    }

    /// Convert to YCbCr (or copy luma) and pad each plane to a multiple of
    /// `block` by edge replication
    #[allow(clippy::cast_possible_truncation)]
    fn padded_planes(&self, block: usize) -> (usize, usize, [Vec<u8>; 3]) {
        let width = self.options.get_width();
        let height = self.options.get_height();
        let components = self.options.get_colorspace().num_components();
        let is_color = components >= 3;

        let padded_width = width.div_ceil(block) * block;
        let padded_height = height.div_ceil(block) * block;

        let mut planes: [Vec<u8>; 3] = Default::default();
        let plane_count = if is_color { 3 } else { 1 };

        for plane in &mut planes[..plane_count] {
            *plane = vec![0; padded_width * padded_height];
        }

        for y in 0..padded_height {
            let src_row = &self.data[y.min(height - 1) * width * components..][..width * components];

            for x in 0..padded_width {
                let px = &src_row[x.min(width - 1) * components..][..components];
                let pos = y * padded_width + x;

                if is_color {
                    let (r, g, b) = (i32::from(px[0]), i32::from(px[1]), i32::from(px[2]));

                    let luma = (19595 * r + 38470 * g + 7471 * b + 32768) >> 16;
                    let cb = (-11059 * r - 21709 * g + 32768 * b + (128 << 16) + 32767) >> 16;
                    let cr = (32768 * r - 27439 * g - 5329 * b + (128 << 16) + 32767) >> 16;

                    planes[0][pos] = luma.clamp(0, 255) as u8;
                    planes[1][pos] = cb.clamp(0, 255) as u8;
                    planes[2][pos] = cr.clamp(0, 255) as u8;
                } else {
                    planes[0][pos] = px[0];
                }
            }
        }
        (padded_width, padded_height, planes)
    }

    fn encode_gray(&self, luma_qt: &[u16; 64]) -> Vec<u8> {
        let (padded_width, padded_height, planes) = self.padded_planes(8);

        let dc = HuffmanCodes::new(&DC_LUMA_BITS, &DC_LUMA_VALUES);
        let ac = HuffmanCodes::new(&AC_LUMA_BITS, &AC_LUMA_VALUES);
        let tables = ComponentTables {
            qt: luma_qt,
            dc: &dc,
            ac: &ac
        };
        let mut writer = BitWriter::new(padded_width * padded_height / 4);
        let mut block = [0.0; 64];
        let mut dc_pred = 0;

        for y in (0..padded_height).step_by(8) {
            for x in (0..padded_width).step_by(8) {
                load_block(&planes[0], padded_width, x, y, &mut block);
                encode_block(&mut writer, &block, &tables, &mut dc_pred);
            }
        }
        writer.flush();
        writer.out
    }

    #[allow(clippy::cast_possible_truncation)]
    fn encode_color(&self, luma_qt: &[u16; 64], chroma_qt: &[u16; 64]) -> Vec<u8> {
        let (padded_width, padded_height, planes) = self.padded_planes(16);

        // 2x2 box filter for chroma
        let chroma_width = padded_width / 2;
        let chroma_height = padded_height / 2;
        let subsample = |plane: &[u8]| {
            let mut out = vec![0_u8; chroma_width * chroma_height];

            for (y, row) in out.chunks_exact_mut(chroma_width).enumerate() {
                let top = &plane[2 * y * padded_width..][..padded_width];
                let bottom = &plane[(2 * y + 1) * padded_width..][..padded_width];

                for (x, sample) in row.iter_mut().enumerate() {
                    let sum = u16::from(top[2 * x])
                        + u16::from(top[2 * x + 1])
                        + u16::from(bottom[2 * x])
                        + u16::from(bottom[2 * x + 1]);
                    *sample = ((sum + 2) >> 2) as u8;
                }
            }
            out
        };
        let cb = subsample(&planes[1]);
        let cr = subsample(&planes[2]);

        let dc_luma = HuffmanCodes::new(&DC_LUMA_BITS, &DC_LUMA_VALUES);
        let ac_luma = HuffmanCodes::new(&AC_LUMA_BITS, &AC_LUMA_VALUES);
        let dc_chroma = HuffmanCodes::new(&DC_CHROMA_BITS, &DC_CHROMA_VALUES);
        let ac_chroma = HuffmanCodes::new(&AC_CHROMA_BITS, &AC_CHROMA_VALUES);

        let luma_tables = ComponentTables {
            qt: luma_qt,
            dc: &dc_luma,
            ac: &ac_luma
        };
        let chroma_tables = ComponentTables {
            qt: chroma_qt,
            dc: &dc_chroma,
            ac: &ac_chroma
        };

        let mut writer = BitWriter::new(padded_width * padded_height / 2);
        let mut block = [0.0; 64];
        let mut dc_preds = [0; 3];

        for y in (0..padded_height).step_by(16) {
            for x in (0..padded_width).step_by(16) {
                for (dy, dx) in [(0, 0), (0, 8), (8, 0), (8, 8)] {
                    load_block(&planes[0], padded_width, x + dx, y + dy, &mut block);
                    encode_block(&mut writer, &block, &luma_tables, &mut dc_preds[0]);
                }
                load_block(&cb, chroma_width, x / 2, y / 2, &mut block);
                encode_block(&mut writer, &block, &chroma_tables, &mut dc_preds[1]);

                load_block(&cr, chroma_width, x / 2, y / 2, &mut block);
                encode_block(&mut writer, &block, &chroma_tables, &mut dc_preds[2]);
            }
        }
        writer.flush();
        writer.out
    }
}

/// Copy the 8x8 block at `x`,`y` into `block`, level shifted
fn load_block(plane: &[u8], stride: usize, x: usize, y: usize, block: &mut [f32; 64]) {
    for (row, out) in block.chunks_exact_mut(8).enumerate() {
        let samples = &plane[(y + row) * stride + x..][..8];

        for (o, s) in out.iter_mut().zip(samples) {
            *o = f32::from(*s) - 128.0;
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn write_headers<T: ZByteWriterTrait>(
    writer: &mut ZWriter<T>, options: &EncoderOptions, is_color: bool, luma_qt: &[u16; 64],
    chroma_qt: &[u16; 64]
) -> Result<(), EncodeErrors> {
    // SOI
    writer.write_u16_be_err(0xFFD8)?;

    // APP0, JFIF 1.01 with no thumbnail
    writer.write_u16_be_err(0xFFE0)?;
    writer.write_u16_be_err(16)?;
    writer.write_all(b"JFIF\0")?;
    writer.write_all(&[1, 1, 0])?;
    writer.write_u16_be_err(1)?;
    writer.write_u16_be_err(1)?;
    writer.write_all(&[0, 0])?;

    // DQT
    let qt_tables = [luma_qt, chroma_qt];
    let qt_tables = if is_color {
        &qt_tables[..]
    } else {
        &qt_tables[..1]
    };
    writer.write_u16_be_err(0xFFDB)?;
    writer.write_u16_be_err(2 + 65 * qt_tables.len() as u16)?;

    for (id, table) in (0_u8..).zip(qt_tables) {
        writer.write_u8_err(id)?;
        for &pos in &UN_ZIGZAG {
            writer.write_u8_err(table[pos] as u8)?;
        }
    }

    // SOF0
    let components: &[(u8, u8, u8)] = if is_color {
        &[(1, 0x22, 0), (2, 0x11, 1), (3, 0x11, 1)]
    } else {
        &[(1, 0x11, 0)]
    };
    writer.write_u16_be_err(0xFFC0)?;
    writer.write_u16_be_err(8 + 3 * components.len() as u16)?;
    writer.write_u8_err(8)?;
    writer.write_u16_be_err(options.get_height() as u16)?;
    writer.write_u16_be_err(options.get_width() as u16)?;
    writer.write_u8_err(components.len() as u8)?;

    for &(id, sampling, qt) in components {
        writer.write_all(&[id, sampling, qt])?;
    }

    // DHT
    let mut huffman_tables: Vec<(u8, &[u8; 16], &[u8])> = vec![
        (0x00, &DC_LUMA_BITS, DC_LUMA_VALUES.as_slice()),
        (0x10, &AC_LUMA_BITS, AC_LUMA_VALUES.as_slice()),
    ];
    if is_color {
        huffman_tables.push((0x01, &DC_CHROMA_BITS, DC_CHROMA_VALUES.as_slice()));
        huffman_tables.push((0x11, &AC_CHROMA_BITS, AC_CHROMA_VALUES.as_slice()));
    }
    let dht_length: usize = huffman_tables.iter().map(|(_, _, v)| 17 + v.len()).sum();

    writer.write_u16_be_err(0xFFC4)?;
    writer.write_u16_be_err(2 + dht_length as u16)?;

    for (class_id, bits, values) in huffman_tables {
        writer.write_u8_err(class_id)?;
        writer.write_all(bits)?;
        writer.write_all(values)?;
    }

    // SOS
    writer.write_u16_be_err(0xFFDA)?;
    writer.write_u16_be_err(6 + 2 * components.len() as u16)?;
    writer.write_u8_err(components.len() as u8)?;

    for &(id, _, table) in components {
        writer.write_all(&[id, (table << 4) | table])?;
    }
    // Ss, Se, Ah/Al
    writer.write_all(&[0, 63, 0])?;

    Ok(())
}
