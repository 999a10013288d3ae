/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

// Bt.601 Full Range inverse coefficients computed with 14 bits of precision with MPFR.
// This is important to keep them in i16.
// In most cases LLVM will detect what we're doing i16 widening to i32 math and will use
// appropriate optimizations.
pub(crate) const Y_CF: i16 = 16384;
pub(crate) const CR_CF: i16 = 22970;
pub(crate) const CB_CF: i16 = 29032;
pub(crate) const C_G_CR_COEF_1: i16 = -11700;
pub(crate) const C_G_CB_COEF_2: i16 = -5638;
pub(crate) const YUV_PREC: i16 = 14;
// Rounding const for YUV -> RGB conversion: floating equivalent 0.499(9).
pub(crate) const YUV_RND: i16 = (1 << (YUV_PREC - 1)) - 1;

/// Limit values to 0 and 255
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp(a: i32) -> u8 {
    a.clamp(0, 255) as u8
}

/// Convert one row of YCbCr samples to interleaved RGB
///
/// Stops at the shortest of the inputs or `output.len() / 3`
pub fn ycbcr_to_rgb(y: &[i16], cb: &[i16], cr: &[i16], output: &mut [u8]) {
    for ((&y, (cb, cr)), out) in y
        .iter()
        .zip(cb.iter().zip(cr.iter()))
        .zip(output.chunks_exact_mut(3))
    {
        let cr = cr - 128;
        let cb = cb - 128;

        let y0 = i32::from(y) * i32::from(Y_CF) + i32::from(YUV_RND);

        let r = (y0 + i32::from(cr) * i32::from(CR_CF)) >> YUV_PREC;
        let g = (y0
            + i32::from(cr) * i32::from(C_G_CR_COEF_1)
            + i32::from(cb) * i32::from(C_G_CB_COEF_2))
            >> YUV_PREC;
        let b = (y0 + i32::from(cb) * i32::from(CB_CF)) >> YUV_PREC;

        out[0] = clamp(r);
        out[1] = clamp(g);
        out[2] = clamp(b);
    }
}

/// Interleave three planes that already hold RGB samples
pub fn interleave_rgb(r: &[i16], g: &[i16], b: &[i16], output: &mut [u8]) {
    for ((&r, (&g, &b)), out) in r.iter().zip(g.iter().zip(b)).zip(output.chunks_exact_mut(3)) {
        out[0] = clamp(i32::from(r));
        out[1] = clamp(i32::from(g));
        out[2] = clamp(i32::from(b));
    }
}

/// Copy a row of luma samples
pub fn ycbcr_to_grayscale(y: &[i16], output: &mut [u8]) {
    for (y, out) in y.iter().zip(output.iter_mut()) {
        *out = clamp(i32::from(*y));
    }
}
