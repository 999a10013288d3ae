/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! VP8 key frame encoding
//!
//! Every macroblock is predicted as a whole with the cheapest of the
//! four 16x16 modes, coefficients are coded with the default
//! probabilities in a single token partition. The loop filter is left
//! disabled.
use alloc::vec;
use alloc::vec::Vec;

use pictor_core::log::trace;

use crate::errors::WebpEncodeErrors;
use crate::lossy::arith::BoolEncoder;
use crate::lossy::decoder::{load_edges, BandProbs, QuantMatrix, YuvPlanes, VP8_FRAME_HEADER_SIZE};
use crate::lossy::predict::{predict_block, BPS, DC_PRED, H_PRED, TM_PRED, V_PRED};
use crate::lossy::tables::{
    BANDS, CAT_TABLES, COEFF_UPDATE_PROBS, DEFAULT_COEFF_PROBS, NUM_PROBAS, ZIGZAG
};
use crate::lossy::transform::{forward_dct, forward_wht, idct_add, inverse_wht};

const MAX_LEVEL: i32 = 2047;
const MAX_PARTITION_SIZE: usize = (1 << 19) - 1;
static ALL_MODES: [u8; 4] = [DC_PRED, TM_PRED, V_PRED, H_PRED];
const ORIGIN: usize = BPS + 1;

/// Map a quality in `1..=100` to a quantizer index in `0..=127`,
/// 100 being the finest
pub fn quality_to_quantizer(quality: u8) -> i32 {
    let quality = i32::from(quality.clamp(1, 100));
    ((100 - quality) * 127 + 49) / 99
}

fn quantize(coeff: i32, q: i32) -> i32 {
    let level = ((coeff.abs() + (q >> 1)) / q).min(MAX_LEVEL);
    if coeff < 0 {
        -level
    } else {
        level
    }
}

/// Sum of absolute differences between a predicted block and the source
fn sad(ws: &[u8], source: &[u8], size: usize) -> u32 {
    let mut total = 0;

    for y in 0..size {
        let predicted = &ws[ORIGIN + y * BPS..ORIGIN + y * BPS + size];
        let wanted = &source[y * size..(y + 1) * size];

        total += predicted
            .iter()
            .zip(wanted)
            .map(|(a, b)| u32::from(a.abs_diff(*b)))
            .sum::<u32>();
    }
    total
}

/// Encoder of a single VP8 key frame
pub struct Vp8Encoder<'a> {
    source:       &'a YuvPlanes,
    quant:        QuantMatrix,
    quantizer:    i32,
    search_modes: bool
}

impl<'a> Vp8Encoder<'a> {
    /// Create an encoder for planes produced by [`rgba_to_yuv420`]
    ///
    /// With `search_modes` off every block uses DC prediction.
    ///
    /// [`rgba_to_yuv420`]: crate::yuv::rgba_to_yuv420
    pub fn new(source: &'a YuvPlanes, quality: u8, search_modes: bool) -> Vp8Encoder<'a> {
        let quantizer = quality_to_quantizer(quality);

        Vp8Encoder {
            source,
            quant: QuantMatrix::new(quantizer, &[0; 5]),
            quantizer,
            search_modes
        }
    }

    fn candidate_modes(&self) -> &'static [u8] {
        if self.search_modes {
            &ALL_MODES
        } else {
            &ALL_MODES[..1]
        }
    }

    /// Encode the frame, returning the contents of a `VP8 ` chunk
    pub fn encode(&self) -> Result<Vec<u8>, WebpEncodeErrors> {
        let source = self.source;

        if source.width > 16383 || source.height > 16383 {
            return Err(WebpEncodeErrors::InvalidDimensions(source.width, source.height));
        }
        let mb_width = source.y_stride / 16;
        let mb_height = source.y.len() / (16 * source.y_stride);

        let mut recon = YuvPlanes::new(source.width, source.height);
        let mut header = BoolEncoder::new();
        let mut tokens = BoolEncoder::new();
        let mut top_nz = vec![[0_u8; 9]; mb_width];

        self.write_frame_header(&mut header);

        for my in 0..mb_height {
            let mut left_nz = [0_u8; 9];

            for (mx, top) in top_nz.iter_mut().enumerate() {
                let luma = self.encode_luma(&mut recon, mx, my, &mut tokens, top, &mut left_nz);
                let chroma = self.encode_chroma(&mut recon, mx, my, &mut tokens, top, &mut left_nz);

                // whole block prediction, no 4x4 sub modes
                header.put_bool(145, true);
                write_luma_mode(&mut header, luma);
                write_chroma_mode(&mut header, chroma);
            }
        }
        let first = header.finish();
        let tokens = tokens.finish();

        if first.len() > MAX_PARTITION_SIZE {
            return Err(WebpEncodeErrors::Generic("VP8 first partition is too large"));
        }
        trace!(
            "VP8 quantizer {}, first partition {} bytes, tokens {} bytes",
            self.quantizer,
            first.len(),
            tokens.len()
        );
        // key frame, version 0, shown
        let tag = (1_u32 << 4) | ((first.len() as u32) << 5);
        let mut out = Vec::with_capacity(VP8_FRAME_HEADER_SIZE + first.len() + tokens.len());

        out.extend_from_slice(&tag.to_le_bytes()[..3]);
        out.extend_from_slice(&[0x9d, 0x01, 0x2a]);
        out.extend_from_slice(&(source.width as u16).to_le_bytes());
        out.extend_from_slice(&(source.height as u16).to_le_bytes());
        out.extend_from_slice(&first);
        out.extend_from_slice(&tokens);

        Ok(out)
    }

    fn write_frame_header(&self, enc: &mut BoolEncoder) {
        // color space, clamping and segmentation
        enc.put_flag(false);
        enc.put_flag(false);
        enc.put_flag(false);
        // filter type, level, sharpness and deltas
        enc.put_flag(false);
        enc.put_literal(0, 6);
        enc.put_literal(0, 3);
        enc.put_flag(false);
        // a single token partition
        enc.put_literal(0, 2);

        enc.put_literal(self.quantizer as u32, 7);
        for _ in 0..5 {
            enc.put_flag(false);
        }
        // refresh entropy probabilities
        enc.put_flag(false);

        for prob in COEFF_UPDATE_PROBS.iter().flatten().flatten().flatten() {
            enc.put_bool(*prob, false);
        }
        // no skip flags
        enc.put_flag(false);
    }

    fn encode_luma(
        &self, recon: &mut YuvPlanes, mx: usize, my: usize, tokens: &mut BoolEncoder,
        top: &mut [u8; 9], left: &mut [u8; 9]
    ) -> u8 {
        let stride = self.source.y_stride;
        let source: [u8; 256] = core::array::from_fn(|i| {
            self.source.y[(my * 16 + i / 16) * stride + mx * 16 + i % 16]
        });
        let mut edges = [0_u8; BPS * 17];
        load_edges(&mut edges, &recon.y, stride, 16, mx, my, None);

        let mut best = (u32::MAX, DC_PRED, edges);

        for &mode in self.candidate_modes() {
            let mut ws = edges;
            predict_block(&mut ws, ORIGIN, 16, mode, my > 0, mx > 0);
            let cost = sad(&ws, &source, 16);

            if cost < best.0 {
                best = (cost, mode, ws);
            }
        }
        let (_, mode, mut pred) = best;

        let blocks: [[i32; 16]; 16] = core::array::from_fn(|n| {
            let (bx, by) = ((n & 3) * 4, (n >> 2) * 4);
            let src = core::array::from_fn(|i| source[(by + i / 4) * 16 + bx + i % 4]);
            let reference =
                core::array::from_fn(|i| pred[ORIGIN + (by + i / 4) * BPS + bx + i % 4]);
            forward_dct(&src, &reference)
        });
        // dc values of all sub blocks go through the second order transform
        let y2 = self.quant.y2;
        let wht = forward_wht(&core::array::from_fn(|n| blocks[n][0]));
        let levels: [i32; 16] =
            core::array::from_fn(|n| quantize(wht[ZIGZAG[n]], y2[usize::from(n > 0)]));

        let ctx = usize::from(top[8] + left[8]);
        let non_zero = write_tokens(tokens, &DEFAULT_COEFF_PROBS[1], &levels, ctx, 0);
        top[8] = u8::from(non_zero);
        left[8] = top[8];

        let mut dequant = [0_i32; 16];
        for (n, level) in levels.iter().enumerate() {
            dequant[ZIGZAG[n]] = level * y2[usize::from(n > 0)];
        }
        let dc_values = inverse_wht(&dequant);
        let ac = self.quant.y1[1];

        for (n, block) in blocks.iter().enumerate() {
            let mut levels = [0_i32; 16];
            for k in 1..16 {
                levels[k] = quantize(block[ZIGZAG[k]], ac);
            }
            let (x, y) = (n & 3, n >> 2);
            let ctx = usize::from(top[x] + left[y]);
            let non_zero = write_tokens(tokens, &DEFAULT_COEFF_PROBS[0], &levels, ctx, 1);
            top[x] = u8::from(non_zero);
            left[y] = top[x];

            let mut coeffs = [0_i32; 16];
            for k in 1..16 {
                coeffs[ZIGZAG[k]] = levels[k] * ac;
            }
            coeffs[0] = dc_values[n];
            idct_add(&coeffs, &mut pred, ORIGIN + y * 4 * BPS + x * 4, BPS);
        }
        for y in 0..16 {
            let start = (my * 16 + y) * stride + mx * 16;
            let row = ORIGIN + y * BPS;
            recon.y[start..start + 16].copy_from_slice(&pred[row..row + 16]);
        }
        mode
    }

    fn encode_chroma(
        &self, recon: &mut YuvPlanes, mx: usize, my: usize, tokens: &mut BoolEncoder,
        top: &mut [u8; 9], left: &mut [u8; 9]
    ) -> u8 {
        let stride = self.source.uv_stride;
        let gather = |plane: &[u8]| -> [u8; 64] {
            core::array::from_fn(|i| plane[(my * 8 + i / 8) * stride + mx * 8 + i % 8])
        };
        let sources = [gather(&self.source.u), gather(&self.source.v)];

        let mut u_edges = [0_u8; BPS * 9];
        let mut v_edges = [0_u8; BPS * 9];
        load_edges(&mut u_edges, &recon.u, stride, 8, mx, my, None);
        load_edges(&mut v_edges, &recon.v, stride, 8, mx, my, None);

        // both planes share one mode, it is scored on their sum
        let mut best = (u32::MAX, DC_PRED, [u_edges, v_edges]);

        for &mode in self.candidate_modes() {
            let mut predicted = [u_edges, v_edges];
            for ws in predicted.iter_mut() {
                predict_block(ws, ORIGIN, 8, mode, my > 0, mx > 0);
            }
            let cost = sad(&predicted[0], &sources[0], 8) + sad(&predicted[1], &sources[1], 8);

            if cost < best.0 {
                best = (cost, mode, predicted);
            }
        }
        let (_, mode, predicted) = best;
        let uv = self.quant.uv;

        for (plane, (mut pred, source)) in predicted.into_iter().zip(sources).enumerate() {
            for n in 0..4 {
                let (x, y) = (n & 1, n >> 1);
                let (bx, by) = (x * 4, y * 4);
                let src = core::array::from_fn(|i| source[(by + i / 4) * 8 + bx + i % 4]);
                let reference =
                    core::array::from_fn(|i| pred[ORIGIN + (by + i / 4) * BPS + bx + i % 4]);
                let coeffs = forward_dct(&src, &reference);

                let levels: [i32; 16] =
                    core::array::from_fn(|k| quantize(coeffs[ZIGZAG[k]], uv[usize::from(k > 0)]));

                let (tx, ly) = (4 + plane * 2 + x, 4 + plane * 2 + y);
                let ctx = usize::from(top[tx] + left[ly]);
                let non_zero = write_tokens(tokens, &DEFAULT_COEFF_PROBS[2], &levels, ctx, 0);
                top[tx] = u8::from(non_zero);
                left[ly] = top[tx];

                let mut dequant = [0_i32; 16];
                for (k, level) in levels.iter().enumerate() {
                    dequant[ZIGZAG[k]] = level * uv[usize::from(k > 0)];
                }
                idct_add(&dequant, &mut pred, ORIGIN + by * BPS + bx, BPS);
            }
            let target = if plane == 0 {
                &mut recon.u
            } else {
                &mut recon.v
            };
            for y in 0..8 {
                let start = (my * 8 + y) * stride + mx * 8;
                let row = ORIGIN + y * BPS;
                target[start..start + 8].copy_from_slice(&pred[row..row + 8]);
            }
        }
        mode
    }
}

fn write_luma_mode(enc: &mut BoolEncoder, mode: u8) {
    match mode {
        V_PRED => {
            enc.put_bool(156, false);
            enc.put_bool(163, true);
        }
        H_PRED => {
            enc.put_bool(156, true);
            enc.put_bool(128, false);
        }
        TM_PRED => {
            enc.put_bool(156, true);
            enc.put_bool(128, true);
        }
        _ => {
            enc.put_bool(156, false);
            enc.put_bool(163, false);
        }
    }
}

fn write_chroma_mode(enc: &mut BoolEncoder, mode: u8) {
    if mode == DC_PRED {
        enc.put_bool(142, false);
        return;
    }
    enc.put_bool(142, true);

    if mode == V_PRED {
        enc.put_bool(114, false);
    } else {
        enc.put_bool(114, true);
        enc.put_bool(183, mode == TM_PRED);
    }
}

fn write_large_value(enc: &mut BoolEncoder, p: &[u8; NUM_PROBAS], value: i32) {
    if value <= 4 {
        enc.put_bool(p[3], false);

        if value == 2 {
            enc.put_bool(p[4], false);
        } else {
            enc.put_bool(p[4], true);
            enc.put_bool(p[5], value == 4);
        }
    } else if value <= 10 {
        enc.put_bool(p[3], true);
        enc.put_bool(p[6], false);

        if value <= 6 {
            enc.put_bool(p[7], false);
            enc.put_bool(159, value == 6);
        } else {
            enc.put_bool(p[7], true);
            enc.put_bool(165, (value - 7) >> 1 == 1);
            enc.put_bool(145, (value - 7) & 1 == 1);
        }
    } else {
        enc.put_bool(p[3], true);
        enc.put_bool(p[6], true);

        let category: usize = if value < 19 {
            0
        } else if value < 35 {
            1
        } else if value < 67 {
            2
        } else {
            3
        };
        enc.put_bool(p[8], category >> 1 == 1);
        enc.put_bool(p[9 + (category >> 1)], category & 1 == 1);

        let extra = value - 3 - (8 << category);
        let table = CAT_TABLES[category];

        for (k, prob) in table.iter().enumerate() {
            enc.put_bool(*prob, (extra >> (table.len() - 1 - k)) & 1 == 1);
        }
    }
}

/// Code the levels of one block, given in zigzag order, from position
/// `first`. Returns whether any of them is non zero.
fn write_tokens(
    enc: &mut BoolEncoder, probs: &BandProbs, levels: &[i32; 16], ctx: usize, first: usize
) -> bool {
    let mut p = &probs[BANDS[first]][ctx];

    let Some(last) = (first..16).rev().find(|n| levels[*n] != 0) else {
        enc.put_bool(p[0], false);
        return false;
    };
    let mut n = first;

    while n < 16 {
        if n > last {
            // end of block
            enc.put_bool(p[0], false);
            break;
        }
        enc.put_bool(p[0], true);

        while levels[n] == 0 {
            enc.put_bool(p[1], false);
            n += 1;
            p = &probs[BANDS[n]][0];
        }
        enc.put_bool(p[1], true);

        let value = levels[n].abs();
        let next_ctx = if value == 1 {
            enc.put_bool(p[2], false);
            1
        } else {
            enc.put_bool(p[2], true);
            write_large_value(enc, p, value);
            2
        };
        enc.put_flag(levels[n] < 0);

        n += 1;
        p = &probs[BANDS[n]][next_ctx];
    }
    true
}

#[cfg(test)]
mod tests {
    use crate::lossy::arith::{BoolDecoder, BoolEncoder};
    use crate::lossy::encoder::{quality_to_quantizer, quantize, write_large_value};
    use crate::lossy::tables::DEFAULT_COEFF_PROBS;

    #[test]
    fn quality_maps_to_the_quantizer_range() {
        assert_eq!(quality_to_quantizer(100), 0);
        assert_eq!(quality_to_quantizer(1), 127);
        // out of range qualities are clamped
        assert_eq!(quality_to_quantizer(0), 127);
        assert_eq!(quality_to_quantizer(250), 0);
        assert!(quality_to_quantizer(80) < quality_to_quantizer(50));
    }

    #[test]
    fn quantize_rounds_to_nearest() {
        assert_eq!(quantize(14, 10), 1);
        assert_eq!(quantize(15, 10), 2);
        assert_eq!(quantize(-15, 10), -2);
        assert_eq!(quantize(1_000_000, 1), 2047);
    }

    #[test]
    fn large_values_survive_the_token_tree() {
        let p = &DEFAULT_COEFF_PROBS[0][1][2];

        for value in [2, 3, 4, 5, 6, 7, 10, 11, 18, 19, 34, 35, 66, 67, 2047] {
            let mut enc = BoolEncoder::new();
            write_large_value(&mut enc, p, value);
            let data = enc.finish();

            let mut dec = BoolDecoder::new(&data);
            assert_eq!(crate::lossy::decoder::read_large_value(&mut dec, p), value);
        }
    }
}
