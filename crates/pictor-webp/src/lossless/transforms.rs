/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The four VP8L transforms, in both directions
use alloc::vec;
use alloc::vec::Vec;

use crate::lossless::div_round_up;

const OPAQUE_BLACK: u32 = 0xff00_0000;

/// A transform as read from the bitstream, applied in reverse order
pub enum Transform {
    /// Spatial prediction, one of 14 predictors per tile
    Predictor { bits: usize, modes: Vec<u32> },
    /// Decorrelation of red and blue from green, per tile
    CrossColor { bits: usize, multipliers: Vec<u32> },
    SubtractGreen,
    /// Palette lookup with up to 8 indices packed per pixel
    ColorIndexing { bits: usize, palette: Vec<u32> }
}

impl Transform {
    /// Undo the transform on `pixels`, an image `width` pixels wide
    ///
    /// `width` is the width the transform was declared at, the color
    /// indexing transform widens the image back to it.
    pub fn invert(&self, mut pixels: Vec<u32>, width: usize, height: usize) -> Vec<u32> {
        match self {
            Transform::Predictor { bits, modes } => {
                inverse_predictor(&mut pixels, width, *bits, modes);
                pixels
            }
            Transform::CrossColor { bits, multipliers } => {
                inverse_cross_color(&mut pixels, width, *bits, multipliers);
                pixels
            }
            Transform::SubtractGreen => {
                add_green(&mut pixels);
                pixels
            }
            Transform::ColorIndexing { bits, palette } => {
                expand_color_index(&pixels, width, height, *bits, palette)
            }
        }
    }
}

#[inline(always)]
const fn channel(argb: u32, shift: u32) -> i32 {
    ((argb >> shift) & 0xff) as i32
}

/// Per channel addition modulo 256
#[inline]
pub fn add_pixels(a: u32, b: u32) -> u32 {
    let alpha_green = (a & 0xff00_ff00).wrapping_add(b & 0xff00_ff00);
    let red_blue = (a & 0x00ff_00ff).wrapping_add(b & 0x00ff_00ff);
    (alpha_green & 0xff00_ff00) | (red_blue & 0x00ff_00ff)
}

/// Per channel subtraction modulo 256
#[inline]
pub fn sub_pixels(a: u32, b: u32) -> u32 {
    let alpha_green = 0x00ff_00ff_u32
        .wrapping_add(a & 0xff00_ff00)
        .wrapping_sub(b & 0xff00_ff00);
    let red_blue = 0xff00_ff00_u32
        .wrapping_add(a & 0x00ff_00ff)
        .wrapping_sub(b & 0x00ff_00ff);
    (alpha_green & 0xff00_ff00) | (red_blue & 0x00ff_00ff)
}

#[inline]
const fn average2(a: u32, b: u32) -> u32 {
    (((a ^ b) & 0xfefe_fefe) >> 1) + (a & b)
}

fn select(top: u32, left: u32, top_left: u32) -> u32 {
    let mut score = 0;
    for shift in [24, 16, 8, 0] {
        score += (channel(left, shift) - channel(top_left, shift)).abs()
            - (channel(top, shift) - channel(top_left, shift)).abs();
    }
    if score <= 0 {
        top
    } else {
        left
    }
}

fn clamp_add_subtract_full(a: u32, b: u32, c: u32) -> u32 {
    let mut out = 0;
    for shift in [24, 16, 8, 0] {
        let value = (channel(a, shift) + channel(b, shift) - channel(c, shift)).clamp(0, 255);
        out |= (value as u32) << shift;
    }
    out
}

fn clamp_add_subtract_half(a: u32, b: u32) -> u32 {
    let mut out = 0;
    for shift in [24, 16, 8, 0] {
        let x = channel(a, shift);
        let value = (x + (x - channel(b, shift)) / 2).clamp(0, 255);
        out |= (value as u32) << shift;
    }
    out
}

/// Prediction of the pixel at `pos` from its already known neighbours
///
/// Only valid away from the first row and column. The top right
/// neighbour of the last column is the first pixel of the current row.
pub fn predict(mode: u32, pixels: &[u32], pos: usize, width: usize) -> u32 {
    let left = pixels[pos - 1];
    let top = pixels[pos - width];
    let top_right = pixels[pos - width + 1];
    let top_left = pixels[pos - width - 1];

    match mode {
        1 => left,
        2 => top,
        3 => top_right,
        4 => top_left,
        5 => average2(average2(left, top_right), top),
        6 => average2(left, top_left),
        7 => average2(left, top),
        8 => average2(top_left, top),
        9 => average2(top, top_right),
        10 => average2(average2(left, top_left), average2(top, top_right)),
        11 => select(top, left, top_left),
        12 => clamp_add_subtract_full(left, top, top_left),
        13 => clamp_add_subtract_half(average2(left, top), top_left),
        _ => OPAQUE_BLACK
    }
}

/// Prediction of the pixel at `pos` using `modes`, one per tile
#[inline]
fn tile_prediction(pixels: &[u32], pos: usize, width: usize, bits: usize, modes: &[u32]) -> u32 {
    let (x, y) = (pos % width, pos / width);

    if y == 0 {
        if x == 0 {
            OPAQUE_BLACK
        } else {
            pixels[pos - 1]
        }
    } else if x == 0 {
        pixels[pos - width]
    } else {
        let tiles_per_row = div_round_up(width, bits);
        let mode = (modes[(y >> bits) * tiles_per_row + (x >> bits)] >> 8) & 15;
        predict(mode, pixels, pos, width)
    }
}

fn inverse_predictor(pixels: &mut [u32], width: usize, bits: usize, modes: &[u32]) {
    for pos in 0..pixels.len() {
        let prediction = tile_prediction(pixels, pos, width, bits, modes);
        pixels[pos] = add_pixels(pixels[pos], prediction);
    }
}

#[inline]
fn color_delta(multiplier: u8, color: u8) -> i32 {
    (i32::from(multiplier as i8) * i32::from(color as i8)) >> 5
}

fn inverse_cross_color(pixels: &mut [u32], width: usize, bits: usize, multipliers: &[u32]) {
    let tiles_per_row = div_round_up(width, bits);

    for (pos, pixel) in pixels.iter_mut().enumerate() {
        let (x, y) = (pos % width, pos / width);
        let m = multipliers[(y >> bits) * tiles_per_row + (x >> bits)];

        let green_to_red = m as u8;
        let green_to_blue = (m >> 8) as u8;
        let red_to_blue = (m >> 16) as u8;

        let green = (*pixel >> 8) as u8;
        let red = (((*pixel >> 16) & 0xff) as i32 + color_delta(green_to_red, green)) & 0xff;
        let blue = ((*pixel & 0xff) as i32
            + color_delta(green_to_blue, green)
            + color_delta(red_to_blue, red as u8))
            & 0xff;

        *pixel = (*pixel & 0xff00_ff00) | ((red as u32) << 16) | blue as u32;
    }
}

fn add_green(pixels: &mut [u32]) {
    for pixel in pixels.iter_mut() {
        let green = (*pixel >> 8) & 0xff;
        let red_blue = (*pixel & 0x00ff_00ff).wrapping_add((green << 16) | green);
        *pixel = (*pixel & 0xff00_ff00) | (red_blue & 0x00ff_00ff);
    }
}

/// Remove green from red and blue
pub fn subtract_green(pixels: &mut [u32]) {
    for pixel in pixels.iter_mut() {
        let green = (*pixel >> 8) & 0xff;
        let red_blue = (*pixel | 0xff00_ff00).wrapping_sub((green << 16) | green);
        *pixel = (*pixel & 0xff00_ff00) | (red_blue & 0x00ff_00ff);
    }
}

/// Pixels packed into each byte of the index image, as a shift
pub const fn color_index_bits(palette_size: usize) -> usize {
    if palette_size > 16 {
        0
    } else if palette_size > 4 {
        1
    } else if palette_size > 2 {
        2
    } else {
        3
    }
}

fn expand_color_index(
    packed: &[u32], width: usize, height: usize, bits: usize, palette: &[u32]
) -> Vec<u32> {
    let bits_per_pixel = 8 >> bits;
    let mask = (1_u32 << bits_per_pixel) - 1;
    let packed_width = div_round_up(width, bits);
    let mut out = vec![0; width * height];

    for (row, packed_row) in out.chunks_exact_mut(width).zip(packed.chunks_exact(packed_width)) {
        for (x, pixel) in row.iter_mut().enumerate() {
            let green = (packed_row[x >> bits] >> 8) & 0xff;
            let shift = (x & ((1 << bits) - 1)) * bits_per_pixel;
            let index = (green >> shift) & mask;
            // indices past the palette are transparent black
            *pixel = palette.get(index as usize).copied().unwrap_or(0);
        }
    }
    out
}

/// Replace each pixel with its palette index and pack the indices
///
/// Every pixel must be present in `palette`, which is sorted.
pub fn pack_color_index(pixels: &[u32], width: usize, height: usize, palette: &[u32]) -> Vec<u32> {
    let bits = color_index_bits(palette.len());
    let bits_per_pixel = 8 >> bits;
    let packed_width = div_round_up(width, bits);
    let mut packed = vec![OPAQUE_BLACK; packed_width * height];

    for (packed_row, row) in packed.chunks_exact_mut(packed_width).zip(pixels.chunks_exact(width)) {
        for (x, pixel) in row.iter().enumerate() {
            let index = palette.binary_search(pixel).unwrap_or(0) as u32;
            let shift = 8 + (x & ((1 << bits) - 1)) * bits_per_pixel;
            packed_row[x >> bits] |= index << shift;
        }
    }
    packed
}

/// Cost of coding a residual, small values in either direction are cheap
fn residual_cost(residual: u32) -> u32 {
    [24, 16, 8, 0]
        .iter()
        .map(|shift| {
            let v = (residual >> shift) & 0xff;
            v.min(256 - v)
        })
        .sum()
}

/// Pick the cheapest predictor for every `1 << bits` tile
///
/// Returns the mode image, the mode sits in the green channel.
pub fn choose_predictors(pixels: &[u32], width: usize, height: usize, bits: usize) -> Vec<u32> {
    let tiles_wide = div_round_up(width, bits);
    let tiles_high = div_round_up(height, bits);
    let mut modes = Vec::with_capacity(tiles_wide * tiles_high);

    for ty in 0..tiles_high {
        for tx in 0..tiles_wide {
            let rows = (ty << bits).max(1)..((ty + 1) << bits).min(height);
            let columns = (tx << bits).max(1)..((tx + 1) << bits).min(width);

            let mut best = (u32::MAX, 0);

            for mode in 0..14 {
                let mut cost = 0;
                for y in rows.clone() {
                    for x in columns.clone() {
                        let pos = y * width + x;
                        cost += residual_cost(sub_pixels(pixels[pos], predict(mode, pixels, pos, width)));
                    }
                }
                if cost < best.0 {
                    best = (cost, mode);
                }
            }
            modes.push(OPAQUE_BLACK | (best.1 << 8));
        }
    }
    modes
}

/// Replace pixels with their prediction residuals
pub fn forward_predictor(pixels: &[u32], width: usize, bits: usize, modes: &[u32]) -> Vec<u32> {
    (0..pixels.len())
        .map(|pos| sub_pixels(pixels[pos], tile_prediction(pixels, pos, width, bits, modes)))
        .collect()
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use nanorand::{Rng, WyRand};

    use crate::lossless::transforms::{
        add_pixels, choose_predictors, forward_predictor, pack_color_index, sub_pixels,
        subtract_green, Transform
    };

    #[test]
    fn channel_arithmetic_wraps() {
        assert_eq!(add_pixels(0xff01_02ff, 0x0101_0101), 0x0002_0300);
        assert_eq!(sub_pixels(0x0002_0300, 0x0101_0101), 0xff01_02ff);
    }

    #[test]
    fn predictor_round_trip() {
        let mut rng = WyRand::new_seed(3);
        let (width, height) = (19, 11);
        let pixels: Vec<u32> = (0..width * height).map(|_| rng.generate::<u32>()).collect();

        let modes = choose_predictors(&pixels, width, height, 2);
        let residuals = forward_predictor(&pixels, width, 2, &modes);
        let transform = Transform::Predictor { bits: 2, modes };

        assert_eq!(transform.invert(residuals, width, height), pixels);
    }

    #[test]
    fn subtract_green_round_trip() {
        let pixels = vec![0x8040_20f0, 0x0000_ff00, 0xffff_ffff];
        let mut coded = pixels.clone();
        subtract_green(&mut coded);
        assert_eq!(coded[1], 0x0001_ff01);
        assert_eq!(Transform::SubtractGreen.invert(coded, 3, 1), pixels);
    }

    #[test]
    fn color_indices_pack_and_expand() {
        let palette = vec![0xff00_0000, 0xff12_3456, 0xffff_ffff];
        let pixels: Vec<u32> = (0..15).map(|i| palette[i % 3]).collect();

        let packed = pack_color_index(&pixels, 5, 3, &palette);
        // four two bit indices per pixel for a three color palette
        assert_eq!(packed.len(), 2 * 3);

        let transform = Transform::ColorIndexing { bits: 2, palette };
        assert_eq!(transform.invert(packed, 5, 3), pixels);
    }

    #[test]
    fn cross_color_with_zero_multipliers_is_identity() {
        let pixels = vec![0x1122_3344; 6];
        let transform = Transform::CrossColor {
            bits:        2,
            multipliers: vec![0; 2]
        };
        assert_eq!(transform.invert(pixels.clone(), 6, 1), pixels);
    }
}
