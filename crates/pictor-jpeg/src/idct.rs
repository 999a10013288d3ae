/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Integer inverse DCT
//!
//! A separable 8x8 transform with 12 bits of fixed point precision,
//! columns first then rows. The row pass also undoes the level shift
//! and clamps to 0..=255.

/// Rounding for the row pass plus the +128 level shift
const SCALE_BITS: i32 = 512 + 65536 + (128 << 17);

#[inline(always)]
fn wa(a: i32, b: i32) -> i32 {
    a.wrapping_add(b)
}

#[inline(always)]
fn ws(a: i32, b: i32) -> i32 {
    a.wrapping_sub(b)
}

#[inline(always)]
fn wm(a: i32, b: i32) -> i32 {
    a.wrapping_mul(b)
}

/// One dimensional transform of eight values, `bias` is added to the
/// even part before the caller shifts the results down
#[inline(always)]
fn idct_1d(s: [i32; 8], bias: i32) -> [i32; 8] {
    // even part
    let p1 = wm(wa(s[2], s[6]), 2217);
    let t2 = wa(p1, wm(s[6], -7567));
    let t3 = wa(p1, wm(s[2], 3135));

    let t0 = wa(s[0], s[4]) << 12;
    let t1 = ws(s[0], s[4]) << 12;

    let x0 = wa(wa(t0, t3), bias);
    let x3 = wa(ws(t0, t3), bias);
    let x1 = wa(wa(t1, t2), bias);
    let x2 = wa(ws(t1, t2), bias);

    // odd part
    let (o0, o1, o2, o3) = (s[7], s[5], s[3], s[1]);

    let p3 = wa(o0, o2);
    let p4 = wa(o1, o3);
    let p1 = wa(o0, o3);
    let p2 = wa(o1, o2);
    let p5 = wm(wa(p3, p4), 4816);

    let p1 = wa(p5, wm(p1, -3685));
    let p2 = wa(p5, wm(p2, -10497));
    let p3 = wm(p3, -8034);
    let p4 = wm(p4, -1597);

    let e3 = wa(wm(o3, 6149), wa(p1, p4));
    let e2 = wa(wm(o2, 12586), wa(p2, p3));
    let e1 = wa(wm(o1, 8410), wa(p2, p4));
    let e0 = wa(wm(o0, 1223), wa(p1, p3));

    [
        wa(x0, e3),
        wa(x1, e2),
        wa(x2, e1),
        wa(x3, e0),
        ws(x3, e0),
        ws(x2, e1),
        ws(x1, e2),
        ws(x0, e3)
    ]
}

/// Clamp values between 0 and 255
#[inline]
#[allow(clippy::cast_possible_truncation)]
fn clamp(a: i32) -> i16 {
    a.clamp(0, 255) as i16
}

/// Transform a dequantized block in natural order and write the 8x8
/// samples to `out_vector`, rows `stride` apart
///
/// `in_vector` is used as scratch space.
pub fn idct_int(in_vector: &mut [i32; 64], out_vector: &mut [i16], stride: usize) {
    if in_vector[1..].iter().all(|x| *x == 0) {
        // dc only, a flat block
        let coeff = clamp(wa(wa(in_vector[0], 4), 1024) >> 3);

        for row in out_vector.chunks_mut(stride).take(8) {
            row[..8].fill(coeff);
        }
        return;
    }

    // vertical pass
    for col in 0..8 {
        let column = core::array::from_fn(|row| in_vector[row * 8 + col]);
        let out = idct_1d(column, 512);

        for (row, value) in out.iter().enumerate() {
            in_vector[row * 8 + col] = value >> 10;
        }
    }

    // horizontal pass
    for (row, out_row) in in_vector
        .chunks_exact(8)
        .zip(out_vector.chunks_mut(stride))
    {
        let values = idct_1d([row[0], row[1], row[2], row[3], row[4], row[5], row[6], row[7]], SCALE_BITS);

        for (out, value) in out_row[..8].iter_mut().zip(values) {
            *out = clamp(value >> 17);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::idct::idct_int;

    #[test]
    fn flat_block() {
        let mut block = [0_i32; 64];
        // dc of 80 is a mean of 10 above the level shift
        block[0] = 80;
        let mut out = [0_i16; 64];
        idct_int(&mut block, &mut out, 8);
        assert!(out.iter().all(|x| *x == 138));
    }

    #[test]
    fn full_transform_matches_flat_path() {
        // a tiny AC coefficient forces the full transform
        let mut block = [0_i32; 64];
        block[0] = -160;
        block[63] = 1;
        let mut out = [0_i16; 64];
        idct_int(&mut block, &mut out, 8);
        assert!(out.iter().all(|x| (i32::from(*x) - 108).abs() <= 1));
    }

    #[test]
    fn respects_stride() {
        let mut block = [0_i32; 64];
        block[0] = 1016;
        let mut out = [0_i16; 16 * 8];
        idct_int(&mut block, &mut out, 16);
        for row in out.chunks_exact(16) {
            assert!(row[..8].iter().all(|x| *x == 255));
            assert!(row[8..].iter().all(|x| *x == 0));
        }
    }
}
