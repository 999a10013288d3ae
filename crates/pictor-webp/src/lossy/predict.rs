/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Intra predictors of VP8
//!
//! Predictors write into a work buffer of `BPS` bytes per row whose
//! row above and column to the left of the block hold the neighbouring
//! reconstructed samples.

/// Stride of the prediction work buffers
pub const BPS: usize = 32;

// 16x16 luma and 8x8 chroma modes
pub const DC_PRED: u8 = 0;
pub const TM_PRED: u8 = 1;
pub const V_PRED: u8 = 2;
pub const H_PRED: u8 = 3;

// 4x4 luma modes
pub const B_DC_PRED: u8 = 0;
pub const B_TM_PRED: u8 = 1;
pub const B_VE_PRED: u8 = 2;
pub const B_HE_PRED: u8 = 3;
pub const B_RD_PRED: u8 = 4;
pub const B_VR_PRED: u8 = 5;
pub const B_LD_PRED: u8 = 6;
pub const B_VL_PRED: u8 = 7;
pub const B_HD_PRED: u8 = 8;
pub const B_HU_PRED: u8 = 9;

#[inline(always)]
fn clip8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

#[inline(always)]
fn avg3(a: u8, b: u8, c: u8) -> u8 {
    ((u16::from(a) + 2 * u16::from(b) + u16::from(c) + 2) >> 2) as u8
}

#[inline(always)]
fn avg2(a: u8, b: u8) -> u8 {
    ((u16::from(a) + u16::from(b) + 1) >> 1) as u8
}

/// Predict a `size` x `size` block with one of the whole block modes
///
/// `has_top` and `has_left` tell whether the neighbours are inside the
/// frame, the DC predictor only averages the ones that are.
pub fn predict_block(
    ws: &mut [u8], offset: usize, size: usize, mode: u8, has_top: bool, has_left: bool
) {
    let shift = if size == 16 { 4 } else { 3 };

    match mode {
        DC_PRED => {
            let top: u32 = ws[offset - BPS..offset - BPS + size]
                .iter()
                .map(|x| u32::from(*x))
                .sum();
            let left: u32 = (0..size)
                .map(|y| u32::from(ws[offset + y * BPS - 1]))
                .sum();
            let half = (size >> 1) as u32;

            let value = match (has_top, has_left) {
                (true, true) => (top + left + size as u32) >> (shift + 1),
                (true, false) => (top + half) >> shift,
                (false, true) => (left + half) >> shift,
                (false, false) => 128
            };
            for y in 0..size {
                let start = offset + y * BPS;
                ws[start..start + size].fill(value as u8);
            }
        }
        TM_PRED => {
            let top_left = i32::from(ws[offset - BPS - 1]);

            for y in 0..size {
                let left = i32::from(ws[offset + y * BPS - 1]);
                for x in 0..size {
                    let top = i32::from(ws[offset - BPS + x]);
                    ws[offset + y * BPS + x] = clip8(top + left - top_left);
                }
            }
        }
        V_PRED => {
            for y in 0..size {
                let start = offset + y * BPS;
                ws.copy_within(offset - BPS..offset - BPS + size, start);
            }
        }
        _ => {
            for y in 0..size {
                let start = offset + y * BPS;
                let left = ws[start - 1];
                ws[start..start + size].fill(left);
            }
        }
    }
}

/// Predict a 4x4 luma sub block
///
/// Eight samples of the row above are read, the last four being the
/// samples above and to the right of the block.
pub fn predict_4x4(ws: &mut [u8], offset: usize, mode: u8) {
    let above = offset - BPS;
    let [a, b, c, d, e, f, g, h] = [
        ws[above],
        ws[above + 1],
        ws[above + 2],
        ws[above + 3],
        ws[above + 4],
        ws[above + 5],
        ws[above + 6],
        ws[above + 7]
    ];
    let [i, j, k, l] = [
        ws[offset - 1],
        ws[offset + BPS - 1],
        ws[offset + 2 * BPS - 1],
        ws[offset + 3 * BPS - 1]
    ];
    let x = ws[above - 1];

    // out[y][x]
    let mut out = [[0_u8; 4]; 4];

    match mode {
        B_DC_PRED => {
            let sum: u32 = [a, b, c, d, i, j, k, l].iter().map(|v| u32::from(*v)).sum();
            out = [[((sum + 4) >> 3) as u8; 4]; 4];
        }
        B_TM_PRED => {
            let top = [a, b, c, d];
            for (row, left) in out.iter_mut().zip([i, j, k, l]) {
                for (px, top) in row.iter_mut().zip(top) {
                    *px = clip8(i32::from(top) + i32::from(left) - i32::from(x));
                }
            }
        }
        B_VE_PRED => {
            let row = [avg3(x, a, b), avg3(a, b, c), avg3(b, c, d), avg3(c, d, e)];
            out = [row; 4];
        }
        B_HE_PRED => {
            out[0] = [avg3(x, i, j); 4];
            out[1] = [avg3(i, j, k); 4];
            out[2] = [avg3(j, k, l); 4];
            out[3] = [avg3(k, l, l); 4];
        }
        B_RD_PRED => {
            out[3][0] = avg3(j, k, l);
            out[3][1] = avg3(i, j, k);
            out[2][0] = out[3][1];
            out[3][2] = avg3(x, i, j);
            out[2][1] = out[3][2];
            out[1][0] = out[3][2];
            out[3][3] = avg3(a, x, i);
            out[2][2] = out[3][3];
            out[1][1] = out[3][3];
            out[0][0] = out[3][3];
            out[2][3] = avg3(b, a, x);
            out[1][2] = out[2][3];
            out[0][1] = out[2][3];
            out[1][3] = avg3(c, b, a);
            out[0][2] = out[1][3];
            out[0][3] = avg3(d, c, b);
        }
        B_VR_PRED => {
            out[0][0] = avg2(x, a);
            out[2][1] = out[0][0];
            out[0][1] = avg2(a, b);
            out[2][2] = out[0][1];
            out[0][2] = avg2(b, c);
            out[2][3] = out[0][2];
            out[0][3] = avg2(c, d);
            out[3][0] = avg3(k, j, i);
            out[2][0] = avg3(j, i, x);
            out[1][0] = avg3(i, x, a);
            out[3][1] = out[1][0];
            out[1][1] = avg3(x, a, b);
            out[3][2] = out[1][1];
            out[1][2] = avg3(a, b, c);
            out[3][3] = out[1][2];
            out[1][3] = avg3(b, c, d);
        }
        B_LD_PRED => {
            out[0][0] = avg3(a, b, c);
            out[0][1] = avg3(b, c, d);
            out[1][0] = out[0][1];
            out[0][2] = avg3(c, d, e);
            out[1][1] = out[0][2];
            out[2][0] = out[0][2];
            out[0][3] = avg3(d, e, f);
            out[1][2] = out[0][3];
            out[2][1] = out[0][3];
            out[3][0] = out[0][3];
            out[1][3] = avg3(e, f, g);
            out[2][2] = out[1][3];
            out[3][1] = out[1][3];
            out[2][3] = avg3(f, g, h);
            out[3][2] = out[2][3];
            out[3][3] = avg3(g, h, h);
        }
        B_VL_PRED => {
            out[0][0] = avg2(a, b);
            out[0][1] = avg2(b, c);
            out[2][0] = out[0][1];
            out[0][2] = avg2(c, d);
            out[2][1] = out[0][2];
            out[0][3] = avg2(d, e);
            out[2][2] = out[0][3];
            out[1][0] = avg3(a, b, c);
            out[1][1] = avg3(b, c, d);
            out[3][0] = out[1][1];
            out[1][2] = avg3(c, d, e);
            out[3][1] = out[1][2];
            out[1][3] = avg3(d, e, f);
            out[3][2] = out[1][3];
            out[2][3] = avg3(e, f, g);
            out[3][3] = avg3(f, g, h);
        }
        B_HD_PRED => {
            out[0][0] = avg2(i, x);
            out[1][2] = out[0][0];
            out[1][0] = avg2(j, i);
            out[2][2] = out[1][0];
            out[2][0] = avg2(k, j);
            out[3][2] = out[2][0];
            out[3][0] = avg2(l, k);
            out[0][3] = avg3(a, b, c);
            out[0][2] = avg3(x, a, b);
            out[0][1] = avg3(i, x, a);
            out[1][3] = out[0][1];
            out[1][1] = avg3(j, i, x);
            out[2][3] = out[1][1];
            out[2][1] = avg3(k, j, i);
            out[3][3] = out[2][1];
            out[3][1] = avg3(l, k, j);
        }
        _ => {
            // B_HU_PRED
            out[0][0] = avg2(i, j);
            out[0][2] = avg2(j, k);
            out[1][0] = out[0][2];
            out[1][2] = avg2(k, l);
            out[2][0] = out[1][2];
            out[0][1] = avg3(i, j, k);
            out[0][3] = avg3(j, k, l);
            out[1][1] = out[0][3];
            out[1][3] = avg3(k, l, l);
            out[2][1] = out[1][3];
            out[2][2] = l;
            out[2][3] = l;
            out[3] = [l; 4];
        }
    }
    for (y, row) in out.iter().enumerate() {
        let start = offset + y * BPS;
        ws[start..start + 4].copy_from_slice(row);
    }
}

#[cfg(test)]
mod tests {
    use crate::lossy::predict::*;

    fn work_buffer() -> [u8; BPS * 17] {
        let mut ws = [0_u8; BPS * 17];
        // row above holds 10, 20, 30 .. , left column 5
        for x in 0..21 {
            ws[x] = (x * 10) as u8;
        }
        for y in 1..17 {
            ws[y * BPS] = 5;
        }
        ws
    }

    #[test]
    fn dc_uses_available_edges() {
        let mut ws = work_buffer();
        let offset = BPS + 1;
        predict_block(&mut ws, offset, 16, DC_PRED, false, false);
        assert_eq!(ws[offset], 128);

        predict_block(&mut ws, offset, 16, DC_PRED, false, true);
        assert_eq!(ws[offset + 3 * BPS + 7], 5);
    }

    #[test]
    fn vertical_and_horizontal_copy_edges() {
        let mut ws = work_buffer();
        let offset = BPS + 1;
        predict_block(&mut ws, offset, 8, V_PRED, true, true);
        assert_eq!(ws[offset + 7 * BPS + 2], 30);

        predict_block(&mut ws, offset, 8, H_PRED, true, true);
        assert_eq!(ws[offset + 7 * BPS + 2], 5);
    }

    #[test]
    fn hu_fills_the_bottom_row_with_the_last_left_sample() {
        let mut ws = work_buffer();
        let offset = BPS + 1;
        predict_4x4(&mut ws, offset, B_HU_PRED);
        assert_eq!(&ws[offset + 3 * BPS..offset + 3 * BPS + 4], &[5, 5, 5, 5]);
    }
}
