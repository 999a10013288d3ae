/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! VP8L bitstream decoding
use alloc::vec;
use alloc::vec::Vec;

use pictor_core::log::trace;
use pictor_inflate::bitstream::BitStreamReader;
use pictor_inflate::huffman::HuffmanTree;

use crate::errors::WebpDecodeErrors;
use crate::lossless::transforms::{add_pixels, color_index_bits, Transform};
use crate::lossless::{
    cache_index, div_round_up, plane_distance, CODE_LENGTH_ORDER, MAX_CACHE_BITS,
    NUM_CODE_LENGTH_CODES, NUM_DISTANCE_CODES, NUM_LENGTH_CODES, NUM_LITERAL_CODES,
    VP8L_HEADER_SIZE, VP8L_SIGNATURE
};

const TRUNCATED: WebpDecodeErrors = WebpDecodeErrors::EntropyError("VP8L bitstream is truncated");

/// Contents of the five byte VP8L header
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Vp8lHeader {
    pub width:      usize,
    pub height:     usize,
    /// Set by encoders when some pixel is not opaque, informative only
    pub alpha_hint: bool
}

/// Parse the signature, dimensions and version of a VP8L stream
pub fn read_vp8l_header(data: &[u8]) -> Result<Vp8lHeader, WebpDecodeErrors> {
    if data.len() < VP8L_HEADER_SIZE {
        return Err(WebpDecodeErrors::GenericStatic("VP8L header is truncated"));
    }
    if data[0] != VP8L_SIGNATURE {
        return Err(WebpDecodeErrors::GenericStatic("Bad VP8L signature"));
    }
    let bits = u32::from_le_bytes([data[1], data[2], data[3], data[4]]);
    let version = bits >> 29;

    if version != 0 {
        return Err(WebpDecodeErrors::GenericStatic("Unknown VP8L version"));
    }
    Ok(Vp8lHeader {
        width:      ((bits & 0x3fff) + 1) as usize,
        height:     (((bits >> 14) & 0x3fff) + 1) as usize,
        alpha_hint: (bits >> 28) & 1 == 1
    })
}

/// The five prefix codes used for one region of the image
struct PrefixCodeGroup {
    green:    HuffmanTree,
    red:      HuffmanTree,
    blue:     HuffmanTree,
    alpha:    HuffmanTree,
    distance: HuffmanTree
}

#[inline(always)]
fn read_symbol(tree: &HuffmanTree, br: &mut BitStreamReader) -> Result<usize, WebpDecodeErrors> {
    // a code with a single symbol takes no bits
    if let Some(symbol) = tree.single_symbol() {
        return Ok(usize::from(symbol));
    }
    tree.decode(br)
        .map(usize::from)
        .ok_or(WebpDecodeErrors::EntropyError("Invalid prefix code in VP8L stream"))
}

fn build_tree(lengths: &[u8]) -> Result<HuffmanTree, WebpDecodeErrors> {
    let tree = HuffmanTree::new(lengths).map_err(WebpDecodeErrors::EntropyError)?;

    if tree.is_empty() {
        return Err(WebpDecodeErrors::EntropyError("Empty prefix code in VP8L stream"));
    }
    Ok(tree)
}

fn read_code_lengths(
    br: &mut BitStreamReader, code_length_tree: &HuffmanTree, lengths: &mut [u8]
) -> Result<(), WebpDecodeErrors> {
    let mut max_symbol = if br.get_bits(1) == 1 {
        let length_bits = 2 + 2 * br.get_bits(3) as u8;
        let max_symbol = 2 + br.get_bits(length_bits) as usize;

        if max_symbol > lengths.len() {
            return Err(WebpDecodeErrors::EntropyError("Invalid VP8L code length count"));
        }
        max_symbol
    } else {
        lengths.len()
    };
    let mut symbol = 0;
    let mut previous = 8;

    while symbol < lengths.len() && max_symbol > 0 {
        max_symbol -= 1;

        let code = read_symbol(code_length_tree, br)?;

        if code < 16 {
            lengths[symbol] = code as u8;
            symbol += 1;

            if code != 0 {
                previous = code as u8;
            }
            continue;
        }
        let (extra_bits, offset) = match code {
            16 => (2, 3),
            17 => (3, 3),
            _ => (7, 11)
        };
        let repeat = br.get_bits(extra_bits) as usize + offset;

        if symbol + repeat > lengths.len() {
            return Err(WebpDecodeErrors::EntropyError("VP8L code lengths overflow"));
        }
        let value = if code == 16 { previous } else { 0 };
        lengths[symbol..symbol + repeat].fill(value);
        symbol += repeat;
    }
    if br.is_overrun() {
        return Err(TRUNCATED);
    }
    Ok(())
}

fn read_prefix_code(
    br: &mut BitStreamReader, alphabet_size: usize
) -> Result<HuffmanTree, WebpDecodeErrors> {
    let mut lengths = vec![0_u8; alphabet_size];

    if br.get_bits(1) == 1 {
        // one or two symbols, each with a one bit code
        let num_symbols = br.get_bits(1) + 1;
        let first_bits = if br.get_bits(1) == 1 { 8 } else { 1 };
        let first = br.get_bits(first_bits) as usize;
        let second = (num_symbols == 2).then(|| br.get_bits(8) as usize);

        for symbol in core::iter::once(first).chain(second) {
            let length = lengths
                .get_mut(symbol)
                .ok_or(WebpDecodeErrors::EntropyError("VP8L symbol out of range"))?;
            *length = 1;
        }
    } else {
        let num_codes = br.get_bits(4) as usize + 4;
        let mut code_lengths = [0_u8; NUM_CODE_LENGTH_CODES];

        for &position in &CODE_LENGTH_ORDER[..num_codes] {
            code_lengths[position] = br.get_bits(3) as u8;
        }
        let code_length_tree = build_tree(&code_lengths)?;
        read_code_lengths(br, &code_length_tree, &mut lengths)?;
    }
    if br.is_overrun() {
        return Err(TRUNCATED);
    }
    build_tree(&lengths)
}

#[inline]
fn read_copy_value(symbol: usize, br: &mut BitStreamReader) -> usize {
    if symbol < 4 {
        return symbol + 1;
    }
    let extra_bits = (symbol - 2) >> 1;
    let offset = (2 + (symbol & 1)) << extra_bits;
    offset + br.get_bits(extra_bits as u8) as usize + 1
}

struct ColorCache {
    bits:    u8,
    entries: Vec<u32>
}

impl ColorCache {
    fn new(bits: u8) -> ColorCache {
        let size = if bits == 0 { 0 } else { 1 << bits };
        ColorCache {
            bits,
            entries: vec![0; size]
        }
    }

    #[inline(always)]
    fn insert(&mut self, argb: u32) {
        if self.bits > 0 {
            self.entries[cache_index(argb, self.bits)] = argb;
        }
    }
}

/// Decode one entropy coded image of `width` x `height` pixels
///
/// Only the main image may carry a color cache and meta prefix codes,
/// transform data and the palette never do.
fn decode_image_stream(
    br: &mut BitStreamReader, width: usize, height: usize, is_main: bool
) -> Result<Vec<u32>, WebpDecodeErrors> {
    let cache_bits = if br.get_bits(1) == 1 {
        let bits = br.get_bits(4) as u8;
        if !(1..=MAX_CACHE_BITS).contains(&bits) {
            return Err(WebpDecodeErrors::EntropyError("Invalid VP8L color cache size"));
        }
        bits
    } else {
        0
    };
    let (meta_bits, meta_codes) = if is_main && br.get_bits(1) == 1 {
        let bits = br.get_bits(3) as usize + 2;
        let image = decode_image_stream(
            br,
            div_round_up(width, bits),
            div_round_up(height, bits),
            false
        )?;
        let codes: Vec<usize> = image.iter().map(|p| ((p >> 8) & 0xffff) as usize).collect();
        (bits, codes)
    } else {
        (0, Vec::new())
    };
    let num_groups = meta_codes.iter().max().map_or(1, |m| m + 1);
    let cache_size = if cache_bits == 0 { 0 } else { 1 << cache_bits };

    let mut groups = Vec::with_capacity(num_groups);

    for _ in 0..num_groups {
        groups.push(PrefixCodeGroup {
            green:    read_prefix_code(br, NUM_LITERAL_CODES + NUM_LENGTH_CODES + cache_size)?,
            red:      read_prefix_code(br, NUM_LITERAL_CODES)?,
            blue:     read_prefix_code(br, NUM_LITERAL_CODES)?,
            alpha:    read_prefix_code(br, NUM_LITERAL_CODES)?,
            distance: read_prefix_code(br, NUM_DISTANCE_CODES)?
        });
    }
    let total = width * height;
    let tiles_per_row = div_round_up(width, meta_bits);
    let mut cache = ColorCache::new(cache_bits);
    let mut pixels = vec![0_u32; total];
    let mut pos = 0;

    while pos < total {
        let group = if meta_codes.is_empty() {
            &groups[0]
        } else {
            let (x, y) = (pos % width, pos / width);
            &groups[meta_codes[(y >> meta_bits) * tiles_per_row + (x >> meta_bits)]]
        };
        let green = read_symbol(&group.green, br)?;

        if green < NUM_LITERAL_CODES {
            let red = read_symbol(&group.red, br)?;
            let blue = read_symbol(&group.blue, br)?;
            let alpha = read_symbol(&group.alpha, br)?;
            let argb = ((alpha << 24) | (red << 16) | (green << 8) | blue) as u32;

            pixels[pos] = argb;
            cache.insert(argb);
            pos += 1;
        } else if green < NUM_LITERAL_CODES + NUM_LENGTH_CODES {
            let length = read_copy_value(green - NUM_LITERAL_CODES, br);
            let distance_symbol = read_symbol(&group.distance, br)?;
            let distance = plane_distance(width, read_copy_value(distance_symbol, br));

            if distance > pos || pos + length > total {
                return Err(WebpDecodeErrors::EntropyError("Invalid VP8L backward reference"));
            }
            for k in pos..pos + length {
                pixels[k] = pixels[k - distance];
                cache.insert(pixels[k]);
            }
            pos += length;
        } else {
            let index = green - NUM_LITERAL_CODES - NUM_LENGTH_CODES;
            let argb = cache.entries[index];

            pixels[pos] = argb;
            cache.insert(argb);
            pos += 1;
        }
        if br.is_overrun() {
            return Err(TRUNCATED);
        }
    }
    Ok(pixels)
}

/// Decode the transforms and pixels of a VP8L stream positioned after
/// its header
///
/// This is also the layout of losslessly compressed alpha planes.
pub fn decode_image_data(
    data: &[u8], width: usize, height: usize
) -> Result<Vec<u32>, WebpDecodeErrors> {
    let mut br = BitStreamReader::new(data);
    decode_with_transforms(&mut br, width, height)
}

fn decode_with_transforms(
    br: &mut BitStreamReader, width: usize, height: usize
) -> Result<Vec<u32>, WebpDecodeErrors> {
    let mut transforms = Vec::new();
    let mut coded_width = width;
    let mut seen = 0_u8;

    while br.get_bits(1) == 1 {
        let kind = br.get_bits(2) as u8;

        if seen & (1 << kind) != 0 {
            return Err(WebpDecodeErrors::TransformError("VP8L transform repeated"));
        }
        seen |= 1 << kind;

        let transform = match kind {
            0 | 1 => {
                let bits = br.get_bits(3) as usize + 2;
                let data = decode_image_stream(
                    br,
                    div_round_up(coded_width, bits),
                    div_round_up(height, bits),
                    false
                )?;
                if kind == 0 {
                    Transform::Predictor { bits, modes: data }
                } else {
                    Transform::CrossColor {
                        bits,
                        multipliers: data
                    }
                }
            }
            2 => Transform::SubtractGreen,
            _ => {
                let size = br.get_bits(8) as usize + 1;
                let mut palette = decode_image_stream(br, size, 1, false)?;

                // the palette is delta coded
                for k in 1..palette.len() {
                    palette[k] = add_pixels(palette[k], palette[k - 1]);
                }
                Transform::ColorIndexing {
                    bits: color_index_bits(size),
                    palette
                }
            }
        };
        trace!("VP8L transform {} at width {}", kind, coded_width);

        let declared_width = coded_width;
        if let Transform::ColorIndexing { bits, .. } = &transform {
            coded_width = div_round_up(coded_width, *bits);
        }
        transforms.push((transform, declared_width));
    }
    let mut pixels = decode_image_stream(br, coded_width, height, true)?;

    for (transform, declared_width) in transforms.iter().rev() {
        pixels = transform.invert(pixels, *declared_width, height);
    }
    Ok(pixels)
}

/// Decoder of a complete VP8L stream
pub struct Vp8lDecoder<'a> {
    data:   &'a [u8],
    header: Vp8lHeader
}

impl<'a> Vp8lDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Result<Vp8lDecoder<'a>, WebpDecodeErrors> {
        let header = read_vp8l_header(data)?;
        Ok(Vp8lDecoder { data, header })
    }

    pub const fn header(&self) -> Vp8lHeader {
        self.header
    }

    /// Decode to `0xAARRGGBB` pixels
    pub fn decode_argb(&self) -> Result<Vec<u32>, WebpDecodeErrors> {
        decode_image_data(
            &self.data[VP8L_HEADER_SIZE..],
            self.header.width,
            self.header.height
        )
    }

    /// Decode to interleaved RGBA bytes
    pub fn decode_rgba(&self) -> Result<Vec<u8>, WebpDecodeErrors> {
        Ok(argb_to_rgba(&self.decode_argb()?))
    }
}

pub fn argb_to_rgba(argb: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(argb.len() * 4);
    for pixel in argb {
        let [a, r, g, b] = pixel.to_be_bytes();
        out.extend_from_slice(&[r, g, b, a]);
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::lossless::decoder::{read_vp8l_header, Vp8lDecoder};

    // 2x1 image, a red and a blue pixel, written by hand:
    // no transforms, no cache, no meta codes, simple codes throughout
    fn two_pixels() -> Vec<u8> {
        use pictor_inflate::bitstream::BitStreamWriter;

        let mut bw = BitStreamWriter::new();
        bw.put_bits(0x2f, 8);
        bw.put_bits(1, 14);
        bw.put_bits(0, 14);
        bw.put_bits(0, 1);
        bw.put_bits(0, 3);
        // no transform, no cache, no meta codes
        bw.put_bits(0, 1);
        bw.put_bits(0, 1);
        bw.put_bits(0, 1);
        // green: single symbol 0
        bw.put_bits(1, 1);
        bw.put_bits(0, 1);
        bw.put_bits(0, 1);
        bw.put_bits(0, 1);
        // red: symbols 0 and 255
        bw.put_bits(1, 1);
        bw.put_bits(1, 1);
        bw.put_bits(0, 1);
        bw.put_bits(0, 1);
        bw.put_bits(255, 8);
        // blue: symbols 0 and 255
        bw.put_bits(1, 1);
        bw.put_bits(1, 1);
        bw.put_bits(0, 1);
        bw.put_bits(0, 1);
        bw.put_bits(255, 8);
        // alpha: single symbol 255
        bw.put_bits(1, 1);
        bw.put_bits(0, 1);
        bw.put_bits(1, 1);
        bw.put_bits(255, 8);
        // distance: single symbol 0
        bw.put_bits(1, 1);
        bw.put_bits(0, 1);
        bw.put_bits(0, 1);
        bw.put_bits(0, 1);
        // red pixel: red 255, blue 0
        bw.put_bits(1, 1);
        bw.put_bits(0, 1);
        // blue pixel
        bw.put_bits(0, 1);
        bw.put_bits(1, 1);
        bw.finish()
    }

    #[test]
    fn header_fields() {
        let header = read_vp8l_header(&[0x2f, 0x1d, 0x80, 0x08, 0x10]).unwrap();
        assert_eq!(header.width, 30);
        assert_eq!(header.height, 35);
        assert!(header.alpha_hint);
        assert!(read_vp8l_header(&[0x2e, 0, 0, 0, 0]).is_err());
        assert!(read_vp8l_header(&[0x2f, 0, 0, 0, 0x20]).is_err());
    }

    #[test]
    fn hand_written_stream() {
        let data = two_pixels();
        let decoder = Vp8lDecoder::new(&data).unwrap();
        let pixels = decoder.decode_rgba().unwrap();
        assert_eq!(pixels, [255, 0, 0, 255, 0, 0, 255, 255]);
    }

    #[test]
    fn truncated_stream_fails() {
        let data = two_pixels();
        let decoder = Vp8lDecoder::new(&data[..8]).unwrap();
        assert!(decoder.decode_rgba().unwrap_err().is_entropy_error());
    }
}
