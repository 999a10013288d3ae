/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Forward and inverse transforms of VP8
//!
//! Integer only, every rounding matches the reference decoder bit
//! for bit.

#[inline(always)]
const fn mul1(a: i32) -> i32 {
    ((a * 20091) >> 16) + a
}

#[inline(always)]
const fn mul2(a: i32) -> i32 {
    (a * 35468) >> 16
}

/// Inverse DCT of `coeffs` added to the 4x4 block at `offset`
pub fn idct_add(coeffs: &[i32], dst: &mut [u8], offset: usize, stride: usize) {
    if coeffs.iter().all(|x| *x == 0) {
        return;
    }
    let mut tmp = [0_i32; 16];

    for i in 0..4 {
        let a = coeffs[i] + coeffs[8 + i];
        let b = coeffs[i] - coeffs[8 + i];
        let c = mul2(coeffs[4 + i]) - mul1(coeffs[12 + i]);
        let d = mul1(coeffs[4 + i]) + mul2(coeffs[12 + i]);

        tmp[i * 4] = a + d;
        tmp[i * 4 + 1] = b + c;
        tmp[i * 4 + 2] = b - c;
        tmp[i * 4 + 3] = a - d;
    }
    for i in 0..4 {
        let dc = tmp[i] + 4;
        let a = dc + tmp[8 + i];
        let b = dc - tmp[8 + i];
        let c = mul2(tmp[4 + i]) - mul1(tmp[12 + i]);
        let d = mul1(tmp[4 + i]) + mul2(tmp[12 + i]);

        let start = offset + i * stride;
        for (px, v) in dst[start..start + 4].iter_mut().zip([a + d, b + c, b - c, a - d]) {
            *px = (i32::from(*px) + (v >> 3)).clamp(0, 255) as u8;
        }
    }
}

/// Inverse Walsh-Hadamard transform of the second order luma block
///
/// Returns the DC coefficient of each of the sixteen luma blocks.
pub fn inverse_wht(input: &[i32; 16]) -> [i32; 16] {
    let mut tmp = [0_i32; 16];
    let mut out = [0_i32; 16];

    for i in 0..4 {
        let a0 = input[i] + input[12 + i];
        let a1 = input[4 + i] + input[8 + i];
        let a2 = input[4 + i] - input[8 + i];
        let a3 = input[i] - input[12 + i];

        tmp[i] = a0 + a1;
        tmp[8 + i] = a0 - a1;
        tmp[4 + i] = a3 + a2;
        tmp[12 + i] = a3 - a2;
    }
    for i in 0..4 {
        let dc = tmp[i * 4] + 3;
        let a0 = dc + tmp[i * 4 + 3];
        let a1 = tmp[i * 4 + 1] + tmp[i * 4 + 2];
        let a2 = tmp[i * 4 + 1] - tmp[i * 4 + 2];
        let a3 = dc - tmp[i * 4 + 3];

        out[i * 4] = (a0 + a1) >> 3;
        out[i * 4 + 1] = (a3 + a2) >> 3;
        out[i * 4 + 2] = (a0 - a1) >> 3;
        out[i * 4 + 3] = (a3 - a2) >> 3;
    }
    out
}

/// Forward DCT of the difference between `src` and `reference`,
/// both 4x4 blocks in raster order
pub fn forward_dct(src: &[u8; 16], reference: &[u8; 16]) -> [i32; 16] {
    let mut tmp = [0_i32; 16];
    let mut out = [0_i32; 16];

    for i in 0..4 {
        let d: [i32; 4] =
            core::array::from_fn(|k| i32::from(src[i * 4 + k]) - i32::from(reference[i * 4 + k]));
        let a0 = d[0] + d[3];
        let a1 = d[1] + d[2];
        let a2 = d[1] - d[2];
        let a3 = d[0] - d[3];

        tmp[i * 4] = (a0 + a1) * 8;
        tmp[i * 4 + 1] = (a2 * 2217 + a3 * 5352 + 1812) >> 9;
        tmp[i * 4 + 2] = (a0 - a1) * 8;
        tmp[i * 4 + 3] = (a3 * 2217 - a2 * 5352 + 937) >> 9;
    }
    for i in 0..4 {
        let a0 = tmp[i] + tmp[12 + i];
        let a1 = tmp[4 + i] + tmp[8 + i];
        let a2 = tmp[4 + i] - tmp[8 + i];
        let a3 = tmp[i] - tmp[12 + i];

        out[i] = (a0 + a1 + 7) >> 4;
        out[4 + i] = ((a2 * 2217 + a3 * 5352 + 12000) >> 16) + i32::from(a3 != 0);
        out[8 + i] = (a0 - a1 + 7) >> 4;
        out[12 + i] = (a3 * 2217 - a2 * 5352 + 51000) >> 16;
    }
    out
}

/// Forward Walsh-Hadamard transform of the sixteen luma DC coefficients
pub fn forward_wht(dcs: &[i32; 16]) -> [i32; 16] {
    let mut tmp = [0_i32; 16];
    let mut out = [0_i32; 16];

    for i in 0..4 {
        let a0 = dcs[i * 4] + dcs[i * 4 + 2];
        let a1 = dcs[i * 4 + 1] + dcs[i * 4 + 3];
        let a2 = dcs[i * 4 + 1] - dcs[i * 4 + 3];
        let a3 = dcs[i * 4] - dcs[i * 4 + 2];

        tmp[i * 4] = a0 + a1;
        tmp[i * 4 + 1] = a3 + a2;
        tmp[i * 4 + 2] = a3 - a2;
        tmp[i * 4 + 3] = a0 - a1;
    }
    for i in 0..4 {
        let a0 = tmp[i] + tmp[8 + i];
        let a1 = tmp[4 + i] + tmp[12 + i];
        let a2 = tmp[4 + i] - tmp[12 + i];
        let a3 = tmp[i] - tmp[8 + i];

        out[i] = (a0 + a1) >> 1;
        out[4 + i] = (a3 + a2) >> 1;
        out[8 + i] = (a3 - a2) >> 1;
        out[12 + i] = (a0 - a1) >> 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::lossy::transform::{forward_dct, idct_add, inverse_wht};

    #[test]
    fn dc_only_idct_is_flat() {
        let mut coeffs = [0_i32; 16];
        coeffs[0] = 80;
        let mut block = [100_u8; 16];
        idct_add(&coeffs, &mut block, 0, 4);
        // (80 + 4) >> 3 added to every sample
        assert!(block.iter().all(|x| *x == 110));
    }

    #[test]
    fn dct_round_trip_is_close() {
        let src: [u8; 16] = core::array::from_fn(|i| (i * 13 % 251) as u8);
        let reference = [128_u8; 16];
        let coeffs = forward_dct(&src, &reference);

        let mut block = reference;
        idct_add(&coeffs, &mut block, 0, 4);

        for (a, b) in block.iter().zip(src.iter()) {
            assert!((i32::from(*a) - i32::from(*b)).abs() <= 1);
        }
    }

    #[test]
    fn wht_of_a_lone_dc_spreads_evenly() {
        let mut input = [0_i32; 16];
        input[0] = 77;
        let out = inverse_wht(&input);
        assert!(out.iter().all(|x| *x == (77 + 3) >> 3));
    }
}
