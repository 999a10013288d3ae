/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Forward discrete cosine transform and quantization

/// `DCT_MATRIX[u][x]` is `C(u)/2 * cos((2x+1)u*pi/16)`
#[rustfmt::skip]
const DCT_MATRIX: [[f32; 8]; 8] = [
    [0.353_553_39, 0.353_553_39, 0.353_553_39, 0.353_553_39, 0.353_553_39, 0.353_553_39, 0.353_553_39, 0.353_553_39],
    [0.490_392_64, 0.415_734_8, 0.277_785_12, 0.097_545_16, -0.097_545_16, -0.277_785_12, -0.415_734_8, -0.490_392_64],
    [0.461_939_77, 0.191_341_72, -0.191_341_72, -0.461_939_77, -0.461_939_77, -0.191_341_72, 0.191_341_72, 0.461_939_77],
    [0.415_734_8, -0.097_545_16, -0.490_392_64, -0.277_785_12, 0.277_785_12, 0.490_392_64, 0.097_545_16, -0.415_734_8],
    [0.353_553_39, -0.353_553_39, -0.353_553_39, 0.353_553_39, 0.353_553_39, -0.353_553_39, -0.353_553_39, 0.353_553_39],
    [0.277_785_12, -0.490_392_64, 0.097_545_16, 0.415_734_8, -0.415_734_8, -0.097_545_16, 0.490_392_64, -0.277_785_12],
    [0.191_341_72, -0.461_939_77, 0.461_939_77, -0.191_341_72, -0.191_341_72, 0.461_939_77, -0.461_939_77, 0.191_341_72],
    [0.097_545_16, -0.277_785_12, 0.415_734_8, -0.490_392_64, 0.490_392_64, -0.415_734_8, 0.277_785_12, -0.097_545_16],
];

/// Largest magnitude the standard AC tables can code
const MAX_AC: i32 = 1023;

#[inline]
#[allow(clippy::cast_possible_truncation)]
fn round(value: f32) -> i32 {
    if value >= 0.0 {
        (value + 0.5) as i32
    } else {
        (value - 0.5) as i32
    }
}

/// Transform a level shifted block and divide it by `qt_table`
///
/// Input and output are in natural (row major) order
pub(crate) fn fdct_quantize(block: &[f32; 64], qt_table: &[u16; 64], out: &mut [i32; 64]) {
    let mut rows = [0.0_f32; 64];

    for (input, output) in block.chunks_exact(8).zip(rows.chunks_exact_mut(8)) {
        for (coeff, basis) in output.iter_mut().zip(DCT_MATRIX.iter()) {
            *coeff = input.iter().zip(basis).map(|(a, b)| a * b).sum();
        }
    }
    for v in 0..8 {
        for u in 0..8 {
            let coeff: f32 = (0..8).map(|y| DCT_MATRIX[v][y] * rows[y * 8 + u]).sum();
            let pos = v * 8 + u;
            let quantized = round(coeff / f32::from(qt_table[pos]));

            out[pos] = if pos == 0 {
                quantized
            } else {
                quantized.clamp(-MAX_AC, MAX_AC)
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::encoder::fdct::fdct_quantize;

    #[test]
    fn flat_block_only_has_dc() {
        let block = [10.0_f32; 64];
        let mut out = [0_i32; 64];
        fdct_quantize(&block, &[1; 64], &mut out);
        // DC of a flat block is 8 times its value
        assert_eq!(out[0], 80);
        assert!(out[1..].iter().all(|x| *x == 0));
    }

    #[test]
    fn quantization_divides() {
        let block = [-64.0_f32; 64];
        let mut out = [0_i32; 64];
        fdct_quantize(&block, &[16; 64], &mut out);
        assert_eq!(out[0], -32);
    }
}
