/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! VP8L encoding
//!
//! Images with at most 256 colors are coded through a palette, others
//! through the subtract green and predictor transforms. Pixels are then
//! matched against earlier ones with a hash chain and coded with one
//! group of prefix codes.
use alloc::collections::BTreeSet;
use alloc::vec;
use alloc::vec::Vec;

use pictor_core::log::trace;
use pictor_inflate::bitstream::BitStreamWriter;
use pictor_inflate::huffman::{build_code_lengths, build_codes};

use crate::errors::WebpEncodeErrors;
use crate::lossless::transforms::{
    choose_predictors, forward_predictor, pack_color_index, sub_pixels, subtract_green
};
use crate::lossless::{
    cache_index, div_round_up, plane_distance, value_to_prefix, CODE_LENGTH_ORDER, CODE_TO_PLANE,
    NUM_CODE_LENGTH_CODES, NUM_DISTANCE_CODES, NUM_LENGTH_CODES, NUM_LITERAL_CODES,
    VP8L_SIGNATURE
};

const MAX_DIMENSION: usize = 1 << 14;
const HASH_BITS: u32 = 16;
const MIN_MATCH: usize = 3;
const MAX_MATCH: usize = 4096;
// largest distance the 40 distance codes reach
const MAX_DISTANCE: usize = (1 << 20) - 120;
const NO_POSITION: usize = usize::MAX;
const CACHE_BITS: u8 = 10;
const PREDICTOR_BITS: usize = 4;
const CHAIN_DEPTH: [usize; 10] = [0, 4, 8, 16, 32, 48, 64, 128, 256, 512];

enum Token {
    Literal(u32),
    CacheHit(usize),
    Copy { length: usize, distance: usize }
}

struct PrefixCode {
    lengths: Vec<u8>,
    codes:   Vec<u16>
}

impl PrefixCode {
    #[inline(always)]
    fn write(&self, bw: &mut BitStreamWriter, symbol: usize) {
        bw.put_bits(u32::from(self.codes[symbol]), self.lengths[symbol]);
    }
}

#[inline]
fn pair_hash(a: u32, b: u32) -> usize {
    let key = (u64::from(a) << 32) | u64::from(b);
    (key.wrapping_mul(0x9e37_79b9_7f4a_7c15) >> (64 - HASH_BITS)) as usize
}

/// Length of the match between the pixels at `src` and `dst`, `src` < `dst`
#[inline]
fn match_length(pixels: &[u32], src: usize, dst: usize, max: usize) -> usize {
    pixels[src..src + max]
        .iter()
        .zip(&pixels[dst..dst + max])
        .take_while(|(a, b)| a == b)
        .count()
}

struct HashChain {
    head: Vec<usize>,
    prev: Vec<usize>
}

impl HashChain {
    fn new(len: usize) -> HashChain {
        HashChain {
            head: vec![NO_POSITION; 1 << HASH_BITS],
            prev: vec![NO_POSITION; len]
        }
    }

    fn insert(&mut self, pixels: &[u32], pos: usize) {
        if pos + 1 < pixels.len() {
            let hash = pair_hash(pixels[pos], pixels[pos + 1]);
            self.prev[pos] = self.head[hash];
            self.head[hash] = pos;
        }
    }

    /// Longest earlier match for `pos` within `depth` chain steps, the
    /// pixel to the left and the one above are always tried
    fn find(&self, pixels: &[u32], pos: usize, width: usize, depth: usize) -> (usize, usize) {
        let mut best = (0, 0);

        if pos + 1 >= pixels.len() {
            return best;
        }
        let max = MAX_MATCH.min(pixels.len() - pos);
        let mut candidate = self.head[pair_hash(pixels[pos], pixels[pos + 1])];
        let mut steps = depth;

        while candidate != NO_POSITION && steps > 0 && pos - candidate <= MAX_DISTANCE {
            let length = match_length(pixels, candidate, pos, max);

            if length > best.0 {
                best = (length, pos - candidate);
            }
            if length == max {
                return best;
            }
            candidate = self.prev[candidate];
            steps -= 1;
        }
        for distance in [1, width] {
            if distance <= pos {
                let length = match_length(pixels, pos - distance, pos, max);
                if length > best.0 {
                    best = (length, distance);
                }
            }
        }
        best
    }
}

fn tokenize(pixels: &[u32], width: usize, cache_bits: u8, effort: u8) -> Vec<Token> {
    let depth = CHAIN_DEPTH[usize::from(effort.min(9))];
    let mut chain = HashChain::new(pixels.len());
    let mut cache = vec![0_u32; if cache_bits > 0 { 1 << cache_bits } else { 0 }];
    let mut tokens = Vec::with_capacity(pixels.len() / 2);
    let mut pos = 0;

    let remember = |chain: &mut HashChain, cache: &mut [u32], at: usize| {
        chain.insert(pixels, at);
        if cache_bits > 0 {
            cache[cache_index(pixels[at], cache_bits)] = pixels[at];
        }
    };

    while pos < pixels.len() {
        let (length, distance) = if depth > 0 {
            chain.find(pixels, pos, width, depth)
        } else {
            (0, 0)
        };
        if length >= MIN_MATCH {
            tokens.push(Token::Copy { length, distance });

            for at in pos..pos + length {
                remember(&mut chain, &mut cache, at);
            }
            pos += length;
            continue;
        }
        let pixel = pixels[pos];

        if cache_bits > 0 && cache[cache_index(pixel, cache_bits)] == pixel {
            tokens.push(Token::CacheHit(cache_index(pixel, cache_bits)));
        } else {
            tokens.push(Token::Literal(pixel));
        }
        remember(&mut chain, &mut cache, pos);
        pos += 1;
    }
    tokens
}

/// Distance code of a backward reference, the short codes are used
/// when one reaches the same pixel
fn distance_to_code(width: usize, distance: usize) -> usize {
    let (dy, dx) = (distance / width, distance % width);
    let mut candidates = [None, None];

    if dx <= 8 && dy < 8 {
        candidates[0] = Some(dy * 16 + 8 - dx);
    }
    if dx + 8 > width && dy < 7 {
        candidates[1] = Some((dy + 1) * 16 + 8 + (width - dx));
    }
    for entry in candidates.into_iter().flatten() {
        if let Some(index) = CODE_TO_PLANE.iter().position(|e| usize::from(*e) == entry) {
            if plane_distance(width, index + 1) == distance {
                return index + 1;
            }
        }
    }
    distance + CODE_TO_PLANE.len()
}

/// Split code lengths into literal lengths and repeat codes 16 to 18,
/// paired with their extra bits
fn run_length_tokens(lengths: &[u8]) -> Vec<(usize, u32)> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < lengths.len() {
        let value = lengths[i];
        let mut run = lengths[i..].iter().take_while(|x| **x == value).count();
        i += run;

        if value == 0 {
            while run >= 11 {
                let chunk = run.min(138);
                tokens.push((18, (chunk - 11) as u32));
                run -= chunk;
            }
            if run >= 3 {
                tokens.push((17, (run - 3) as u32));
                run = 0;
            }
        } else {
            tokens.push((usize::from(value), 0));
            run -= 1;

            while run >= 3 {
                let chunk = run.min(6);
                tokens.push((16, (chunk - 3) as u32));
                run -= chunk;
            }
        }
        tokens.extend(core::iter::repeat((usize::from(value), 0)).take(run));
    }
    tokens
}

fn write_code_lengths(bw: &mut BitStreamWriter, lengths: &[u8]) {
    let tokens = run_length_tokens(lengths);
    let mut histogram = [0_u32; NUM_CODE_LENGTH_CODES];

    for (code, _) in &tokens {
        histogram[*code] += 1;
    }
    let code_lengths = build_code_lengths(&histogram, 7);
    let codes = build_codes(&code_lengths);

    let mut num_codes = NUM_CODE_LENGTH_CODES;
    while num_codes > 4 && code_lengths[CODE_LENGTH_ORDER[num_codes - 1]] == 0 {
        num_codes -= 1;
    }
    bw.put_bits(0, 1);
    bw.put_bits((num_codes - 4) as u32, 4);

    for &position in &CODE_LENGTH_ORDER[..num_codes] {
        bw.put_bits(u32::from(code_lengths[position]), 3);
    }
    // lengths for the whole alphabet follow
    bw.put_bits(0, 1);

    for (code, extra) in tokens {
        bw.put_bits(u32::from(codes[code]), code_lengths[code]);
        match code {
            16 => bw.put_bits(extra, 2),
            17 => bw.put_bits(extra, 3),
            18 => bw.put_bits(extra, 7),
            _ => ()
        }
    }
}

/// Write the prefix code for `histogram` and return it
fn write_prefix_code(bw: &mut BitStreamWriter, histogram: &[u32]) -> PrefixCode {
    let used: Vec<usize> = histogram
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .map(|(symbol, _)| symbol)
        .take(3)
        .collect();

    if used.len() <= 2 && used.iter().all(|s| *s < NUM_LITERAL_CODES) {
        let symbols = if used.is_empty() { vec![0] } else { used };

        bw.put_bits(1, 1);
        bw.put_bits((symbols.len() - 1) as u32, 1);

        if symbols[0] < 2 {
            bw.put_bits(0, 1);
            bw.put_bits(symbols[0] as u32, 1);
        } else {
            bw.put_bits(1, 1);
            bw.put_bits(symbols[0] as u32, 8);
        }
        let mut lengths = vec![0_u8; histogram.len()];

        if let [first, second] = symbols[..] {
            bw.put_bits(second as u32, 8);
            lengths[first] = 1;
            lengths[second] = 1;
        }
        // a lone symbol takes no bits at all
        let codes = build_codes(&lengths);
        return PrefixCode { lengths, codes };
    }
    let lengths = build_code_lengths(histogram, 15);
    write_code_lengths(bw, &lengths);

    PrefixCode {
        codes: build_codes(&lengths),
        lengths
    }
}

/// Entropy code `pixels`, an image `width` pixels wide
fn write_image_stream(
    bw: &mut BitStreamWriter, pixels: &[u32], width: usize, is_main: bool, effort: u8
) {
    let cache_bits = if is_main && effort > 0 { CACHE_BITS } else { 0 };
    let cache_size = if cache_bits > 0 { 1 << cache_bits } else { 0 };
    let tokens = tokenize(pixels, width, cache_bits, effort);

    if cache_bits > 0 {
        bw.put_bits(1, 1);
        bw.put_bits(u32::from(cache_bits), 4);
    } else {
        bw.put_bits(0, 1);
    }
    if is_main {
        // a single group of prefix codes
        bw.put_bits(0, 1);
    }
    let mut green = vec![0_u32; NUM_LITERAL_CODES + NUM_LENGTH_CODES + cache_size];
    let mut red = vec![0_u32; NUM_LITERAL_CODES];
    let mut blue = vec![0_u32; NUM_LITERAL_CODES];
    let mut alpha = vec![0_u32; NUM_LITERAL_CODES];
    let mut distance = vec![0_u32; NUM_DISTANCE_CODES];

    for token in &tokens {
        match *token {
            Token::Literal(argb) => {
                let [a, r, g, b] = argb.to_be_bytes();
                green[usize::from(g)] += 1;
                red[usize::from(r)] += 1;
                blue[usize::from(b)] += 1;
                alpha[usize::from(a)] += 1;
            }
            Token::CacheHit(index) => green[NUM_LITERAL_CODES + NUM_LENGTH_CODES + index] += 1,
            Token::Copy {
                length,
                distance: dist
            } => {
                green[NUM_LITERAL_CODES + value_to_prefix(length).0] += 1;
                distance[value_to_prefix(distance_to_code(width, dist)).0] += 1;
            }
        }
    }
    let codes = [
        write_prefix_code(bw, &green),
        write_prefix_code(bw, &red),
        write_prefix_code(bw, &blue),
        write_prefix_code(bw, &alpha),
        write_prefix_code(bw, &distance)
    ];

    for token in &tokens {
        match *token {
            Token::Literal(argb) => {
                let [a, r, g, b] = argb.to_be_bytes();
                codes[0].write(bw, usize::from(g));
                codes[1].write(bw, usize::from(r));
                codes[2].write(bw, usize::from(b));
                codes[3].write(bw, usize::from(a));
            }
            Token::CacheHit(index) => {
                codes[0].write(bw, NUM_LITERAL_CODES + NUM_LENGTH_CODES + index);
            }
            Token::Copy {
                length,
                distance: dist
            } => {
                let (symbol, extra_bits, extra) = value_to_prefix(length);
                codes[0].write(bw, NUM_LITERAL_CODES + symbol);
                bw.put_bits(extra, extra_bits);

                let (symbol, extra_bits, extra) = value_to_prefix(distance_to_code(width, dist));
                codes[4].write(bw, symbol);
                bw.put_bits(extra, extra_bits);
            }
        }
    }
}

/// The sorted distinct colors of `pixels` if there are at most 256
fn collect_palette(pixels: &[u32]) -> Option<Vec<u32>> {
    let mut colors = BTreeSet::new();
    let mut last = None;

    for &pixel in pixels {
        if last == Some(pixel) {
            continue;
        }
        last = Some(pixel);
        colors.insert(pixel);

        if colors.len() > 256 {
            return None;
        }
    }
    Some(colors.into_iter().collect())
}

/// Encoder of `0xAARRGGBB` pixels into a VP8L stream
pub struct Vp8lEncoder<'a> {
    pixels: &'a [u32],
    width:  usize,
    height: usize,
    effort: u8
}

impl<'a> Vp8lEncoder<'a> {
    pub fn new(pixels: &'a [u32], width: usize, height: usize) -> Vp8lEncoder<'a> {
        Vp8lEncoder {
            pixels,
            width,
            height,
            effort: 4
        }
    }

    /// Set how hard to look for matches, from 0 to 9
    ///
    /// Effort 0 disables backward references, the color cache and the
    /// predictor transform.
    pub fn set_effort(&mut self, effort: u8) {
        self.effort = effort.min(9);
    }

    fn check(&self) -> Result<(), WebpEncodeErrors> {
        if self.width == 0
            || self.height == 0
            || self.width > MAX_DIMENSION
            || self.height > MAX_DIMENSION
        {
            return Err(WebpEncodeErrors::InvalidDimensions(self.width, self.height));
        }
        if self.pixels.len() != self.width * self.height {
            return Err(WebpEncodeErrors::WrongInputSize(
                self.width * self.height,
                self.pixels.len()
            ));
        }
        Ok(())
    }

    /// Encode into a complete VP8L stream, header included
    pub fn encode(&self) -> Result<Vec<u8>, WebpEncodeErrors> {
        self.check()?;

        let has_alpha = self.pixels.iter().any(|p| p >> 24 != 0xff);
        let mut bw = BitStreamWriter::with_capacity(self.pixels.len());

        bw.put_bits(u32::from(VP8L_SIGNATURE), 8);
        bw.put_bits((self.width - 1) as u32, 14);
        bw.put_bits((self.height - 1) as u32, 14);
        bw.put_bits(u32::from(has_alpha), 1);
        bw.put_bits(0, 3);

        self.write_image_data(&mut bw);
        Ok(bw.finish())
    }

    /// Encode the transforms and pixels only, the layout alpha planes use
    pub fn encode_image_data(&self) -> Result<Vec<u8>, WebpEncodeErrors> {
        self.check()?;

        let mut bw = BitStreamWriter::with_capacity(self.pixels.len());
        self.write_image_data(&mut bw);
        Ok(bw.finish())
    }

    fn write_image_data(&self, bw: &mut BitStreamWriter) {
        let (width, height) = (self.width, self.height);
        let mut coded_width = width;

        let pixels = if let Some(palette) = collect_palette(self.pixels) {
            trace!("VP8L palette of {} colors", palette.len());

            bw.put_bits(1, 1);
            bw.put_bits(3, 2);
            bw.put_bits((palette.len() - 1) as u32, 8);

            let mut deltas = palette.clone();
            for k in (1..deltas.len()).rev() {
                deltas[k] = sub_pixels(deltas[k], deltas[k - 1]);
            }
            write_image_stream(bw, &deltas, palette.len(), false, self.effort);

            let packed = pack_color_index(self.pixels, width, height, &palette);
            coded_width = packed.len() / height;
            packed
        } else {
            let mut pixels = self.pixels.to_vec();

            bw.put_bits(1, 1);
            bw.put_bits(2, 2);
            subtract_green(&mut pixels);

            if self.effort > 0 {
                let modes = choose_predictors(&pixels, width, height, PREDICTOR_BITS);

                bw.put_bits(1, 1);
                bw.put_bits(0, 2);
                bw.put_bits((PREDICTOR_BITS - 2) as u32, 3);
                write_image_stream(bw, &modes, div_round_up(width, PREDICTOR_BITS), false, self.effort);

                pixels = forward_predictor(&pixels, width, PREDICTOR_BITS, &modes);
            }
            pixels
        };
        // end of transforms
        bw.put_bits(0, 1);
        write_image_stream(bw, &pixels, coded_width, true, self.effort);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use nanorand::{Rng, WyRand};

    use crate::lossless::decoder::{decode_image_data, Vp8lDecoder};
    use crate::lossless::encoder::{distance_to_code, run_length_tokens, Vp8lEncoder};
    use crate::lossless::plane_distance;

    fn round_trip(pixels: &[u32], width: usize, height: usize, effort: u8) {
        let mut encoder = Vp8lEncoder::new(pixels, width, height);
        encoder.set_effort(effort);
        let data = encoder.encode().unwrap();

        let decoder = Vp8lDecoder::new(&data).unwrap();
        assert_eq!(decoder.header().width, width);
        assert_eq!(decoder.header().height, height);
        assert_eq!(decoder.decode_argb().unwrap(), pixels);
    }

    #[test]
    fn distance_codes_invert() {
        for width in [1, 3, 8, 17, 100] {
            for distance in 1..400 {
                let code = distance_to_code(width, distance);
                assert_eq!(plane_distance(width, code), distance, "{width} {distance}");
            }
        }
    }

    #[test]
    fn run_lengths_expand_back() {
        let mut lengths = vec![0_u8; 200];
        lengths[5..30].fill(7);
        lengths[40] = 3;
        lengths[41..45].fill(0);
        let tokens = run_length_tokens(&lengths);

        let mut expanded = Vec::new();
        let mut previous = 8;
        for (code, extra) in tokens {
            match code {
                16 => expanded.extend(core::iter::repeat(previous).take(extra as usize + 3)),
                17 => expanded.extend(core::iter::repeat(0).take(extra as usize + 3)),
                18 => expanded.extend(core::iter::repeat(0).take(extra as usize + 11)),
                _ => {
                    expanded.push(code as u8);
                    if code != 0 {
                        previous = code as u8;
                    }
                }
            }
        }
        assert_eq!(expanded, lengths);
    }

    #[test]
    fn few_colors_use_a_palette() {
        let colors = [0xff00_0000, 0xffff_0000, 0x8000_ff00];
        let pixels: Vec<u32> = (0..37 * 5).map(|i| colors[(i / 7) % 3]).collect();
        round_trip(&pixels, 37, 5, 4);
    }

    #[test]
    fn noise_round_trips_at_every_effort() {
        let mut rng = WyRand::new_seed(11);
        let pixels: Vec<u32> = (0..23 * 17).map(|_| rng.generate::<u32>()).collect();

        for effort in [0, 1, 4, 9] {
            round_trip(&pixels, 23, 17, effort);
        }
    }

    #[test]
    fn gradients_round_trip() {
        let (width, height) = (64, 48);
        let pixels: Vec<u32> = (0..width * height)
            .map(|i| {
                let (x, y) = ((i % width) as u32, (i / width) as u32);
                0xff00_0000 | (x * 4) << 16 | (y * 5) << 8 | (x + y)
            })
            .collect();
        round_trip(&pixels, width, height, 4);
    }

    #[test]
    fn single_pixel() {
        round_trip(&[0x1234_5678], 1, 1, 4);
        round_trip(&[0x1234_5678], 1, 1, 0);
    }

    #[test]
    fn headerless_data() {
        let pixels: Vec<u32> = (0..40).map(|i| (i * 6) << 8).collect();
        let data = Vp8lEncoder::new(&pixels, 8, 5).encode_image_data().unwrap();
        assert_eq!(decode_image_data(&data, 8, 5).unwrap(), pixels);
    }

    #[test]
    fn bad_sizes_are_rejected() {
        assert!(Vp8lEncoder::new(&[0; 4], 0, 4).encode().is_err());
        assert!(Vp8lEncoder::new(&[0; 4], 3, 1).encode().is_err());
        assert!(Vp8lEncoder::new(&[0; 20000], 20000, 1).encode().is_err());
    }
}
