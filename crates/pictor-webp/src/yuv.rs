/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Conversion between RGBA and the 4:2:0 planes VP8 codes
//!
//! Both directions use the fixed point BT.601 limited range coefficients
//! libwebp uses. Upsampling of chroma blends the two nearest chroma rows
//! and columns with 9-3-3-1 weights.
use alloc::vec::Vec;

use crate::lossy::decoder::YuvPlanes;

const YUV_FIX: u32 = 16;
const YUV_HALF: i32 = 1 << (YUV_FIX - 1);
// chroma is computed from the sum of four pixels, two more bits
const UV_FIX: u32 = YUV_FIX + 2;
const UV_HALF: i32 = 1 << (UV_FIX - 1);

#[inline]
fn rgb_to_y(r: i32, g: i32, b: i32) -> u8 {
    ((16839 * r + 33059 * g + 6420 * b + (16 << YUV_FIX) + YUV_HALF) >> YUV_FIX) as u8
}

#[inline]
fn rgb_to_u(r: i32, g: i32, b: i32) -> u8 {
    let u = (-9719 * r - 19081 * g + 28800 * b + (128 << UV_FIX) + UV_HALF) >> UV_FIX;
    u.clamp(0, 255) as u8
}

#[inline]
fn rgb_to_v(r: i32, g: i32, b: i32) -> u8 {
    let v = (28800 * r - 24116 * g - 4684 * b + (128 << UV_FIX) + UV_HALF) >> UV_FIX;
    v.clamp(0, 255) as u8
}

/// Convert `width * height` RGBA pixels into macroblock padded planes
///
/// Alpha is ignored. Samples past the image edge repeat the last row and
/// column so the padding costs as little as possible to encode.
pub fn rgba_to_yuv420(rgba: &[u8], width: usize, height: usize) -> YuvPlanes {
    let mut planes = YuvPlanes::new(width, height);

    let pixel = |x: usize, y: usize| {
        let offset = (y.min(height - 1) * width + x.min(width - 1)) * 4;
        (
            i32::from(rgba[offset]),
            i32::from(rgba[offset + 1]),
            i32::from(rgba[offset + 2])
        )
    };
    let y_stride = planes.y_stride;

    for (y, row) in planes.y.chunks_exact_mut(y_stride).enumerate() {
        for (x, out) in row.iter_mut().enumerate() {
            let (r, g, b) = pixel(x, y);
            *out = rgb_to_y(r, g, b);
        }
    }
    let uv_stride = planes.uv_stride;

    for (y, (u_row, v_row)) in planes
        .u
        .chunks_exact_mut(uv_stride)
        .zip(planes.v.chunks_exact_mut(uv_stride))
        .enumerate()
    {
        for x in 0..uv_stride {
            let (mut r, mut g, mut b) = (0, 0, 0);

            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let (pr, pg, pb) = pixel(2 * x + dx, 2 * y + dy);
                r += pr;
                g += pg;
                b += pb;
            }
            u_row[x] = rgb_to_u(r, g, b);
            v_row[x] = rgb_to_v(r, g, b);
        }
    }
    planes
}

#[inline]
fn mult_hi(value: i32, coeff: i32) -> i32 {
    (value * coeff) >> 8
}

#[inline]
fn clip8(value: i32) -> u8 {
    if value & !16383 == 0 {
        (value >> 6) as u8
    } else if value < 0 {
        0
    } else {
        255
    }
}

#[inline]
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let (y, u, v) = (i32::from(y), i32::from(u), i32::from(v));
    let luma = mult_hi(y, 19077);

    [
        clip8(luma + mult_hi(v, 26149) - 14234),
        clip8(luma - mult_hi(u, 6419) - mult_hi(v, 13320) + 8708),
        clip8(luma + mult_hi(u, 33050) - 17685)
    ]
}

/// Upsample one chroma row to `width` samples
///
/// `near` is the closest chroma row and weighs three times as much as `far`
fn upsample_row(near: &[u8], far: &[u8], width: usize, out: &mut [u8]) {
    let mut top_left = i32::from(near[0]);
    let mut left = i32::from(far[0]);

    out[0] = ((3 * top_left + left + 2) >> 2) as u8;

    let last = (width - 1) >> 1;

    for x in 1..=last {
        let top = i32::from(near[x]);
        let current = i32::from(far[x]);

        let avg = top_left + top + left + current + 8;
        let diag_12 = (avg + 2 * (top + left)) >> 3;
        let diag_03 = (avg + 2 * (top_left + current)) >> 3;

        out[2 * x - 1] = ((diag_12 + top_left) >> 1) as u8;
        out[2 * x] = ((diag_03 + top) >> 1) as u8;

        top_left = top;
        left = current;
    }
    if width & 1 == 0 {
        out[width - 1] = ((3 * top_left + left + 2) >> 2) as u8;
    }
}

/// Convert decoded planes to RGBA with opaque alpha
pub fn yuv420_to_rgba(planes: &YuvPlanes) -> Vec<u8> {
    let (width, height) = (planes.width, planes.height);
    let mut output = Vec::with_capacity(width * height * 4);

    let mut u_row = alloc::vec![0; width];
    let mut v_row = alloc::vec![0; width];

    fn chroma_row(plane: &[u8], row: usize, stride: usize) -> &[u8] {
        &plane[row * stride..(row + 1) * stride]
    }
    let stride = planes.uv_stride;

    for y in 0..height {
        let (near, far) = if y == 0 {
            (0, 0)
        } else if y & 1 == 1 {
            ((y - 1) >> 1, ((y + 1) >> 1).min((height - 1) >> 1))
        } else {
            (y >> 1, (y >> 1) - 1)
        };
        upsample_row(
            chroma_row(&planes.u, near, stride),
            chroma_row(&planes.u, far, stride),
            width,
            &mut u_row
        );
        upsample_row(
            chroma_row(&planes.v, near, stride),
            chroma_row(&planes.v, far, stride),
            width,
            &mut v_row
        );
        let luma = &planes.y[y * planes.y_stride..y * planes.y_stride + width];

        for ((l, u), v) in luma.iter().zip(&u_row).zip(&v_row) {
            let [r, g, b] = yuv_to_rgb(*l, *u, *v);
            output.extend_from_slice(&[r, g, b, 255]);
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use crate::yuv::{rgba_to_yuv420, yuv420_to_rgba, yuv_to_rgb};

    #[test]
    fn gray_levels_survive_conversion() {
        for level in [0_u8, 16, 128, 235, 255] {
            let pixels = [level, level, level, 255].repeat(6 * 5);
            let planes = rgba_to_yuv420(&pixels, 6, 5);
            let back = yuv420_to_rgba(&planes);

            assert_eq!(back.len(), pixels.len());
            for (a, b) in back.iter().zip(&pixels) {
                assert!(a.abs_diff(*b) <= 2, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn primaries_are_close() {
        for rgb in [[255_u8, 0, 0], [0, 255, 0], [0, 0, 255], [200, 100, 50]] {
            let pixels = [rgb[0], rgb[1], rgb[2], 255].repeat(4);
            let planes = rgba_to_yuv420(&pixels, 2, 2);
            let back = yuv_to_rgb(planes.y[0], planes.u[0], planes.v[0]);

            for (a, b) in back.iter().zip(&rgb) {
                assert!(a.abs_diff(*b) <= 4, "{back:?} vs {rgb:?}");
            }
        }
    }

    #[test]
    fn padding_repeats_edges() {
        let pixels: Vec<u8> = (0..3 * 2).flat_map(|i| [i as u8 * 40, 0, 0, 255]).collect();
        let planes = rgba_to_yuv420(&pixels, 3, 2);

        assert_eq!(planes.y_stride, 16);
        let last = planes.y[2];
        assert!(planes.y[3..16].iter().all(|v| *v == last));
        assert_eq!(planes.y[15 * 16 + 2], planes.y[16 + 2]);
    }
}
