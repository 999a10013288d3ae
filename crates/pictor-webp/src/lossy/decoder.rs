/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! VP8 key frame decoding
//!
//! The first partition carries the frame header and the per macroblock
//! modes, the token partitions carry the residual coefficients. The
//! frame is fully reconstructed before the loop filter runs, prediction
//! always sees unfiltered samples.
use alloc::vec;
use alloc::vec::Vec;

use pictor_core::log::trace;

use crate::errors::WebpDecodeErrors;
use crate::lossy::arith::BoolDecoder;
use crate::lossy::filter::{normal_edge, simple_edge, FilterParams};
use crate::lossy::predict::{
    predict_4x4, predict_block, BPS, B_DC_PRED, B_HD_PRED, B_HE_PRED, B_HU_PRED, B_LD_PRED,
    B_RD_PRED, B_TM_PRED, B_VE_PRED, B_VL_PRED, B_VR_PRED, DC_PRED, H_PRED, TM_PRED, V_PRED
};
use crate::lossy::tables::{
    AC_TABLE, BANDS, BMODE_PROBS, CAT_TABLES, COEFF_UPDATE_PROBS, DC_TABLE, DEFAULT_COEFF_PROBS,
    NUM_BANDS, NUM_CTX, NUM_PROBAS, NUM_TYPES, ZIGZAG
};
use crate::lossy::transform::{idct_add, inverse_wht};

pub type CoeffProbs = [[[[u8; NUM_PROBAS]; NUM_CTX]; NUM_BANDS]; NUM_TYPES];
pub(crate) type BandProbs = [[[u8; NUM_PROBAS]; NUM_CTX]; NUM_BANDS];

const KEYFRAME_START_CODE: [u8; 3] = [0x9d, 0x01, 0x2a];

/// Size of the uncompressed key frame header
pub const VP8_FRAME_HEADER_SIZE: usize = 10;

/// Contents of the uncompressed part of a key frame
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Vp8FrameHeader {
    pub width:                usize,
    pub height:               usize,
    pub first_partition_size: usize
}

/// Parse the frame tag, start code and dimensions of a VP8 key frame
pub fn read_frame_header(data: &[u8]) -> Result<Vp8FrameHeader, WebpDecodeErrors> {
    if data.len() < VP8_FRAME_HEADER_SIZE {
        return Err(WebpDecodeErrors::GenericStatic("VP8 frame header is truncated"));
    }
    let bits = u32::from(data[0]) | (u32::from(data[1]) << 8) | (u32::from(data[2]) << 16);

    if bits & 1 != 0 {
        return Err(WebpDecodeErrors::GenericStatic("VP8 frame is not a key frame"));
    }
    if (bits >> 1) & 7 > 3 {
        return Err(WebpDecodeErrors::GenericStatic("Unknown VP8 profile"));
    }
    if (bits >> 4) & 1 == 0 {
        return Err(WebpDecodeErrors::GenericStatic("VP8 frame is not displayable"));
    }
    if data[3..6] != KEYFRAME_START_CODE {
        return Err(WebpDecodeErrors::GenericStatic("Bad VP8 start code"));
    }
    // the upper two bits are a scaling hint
    let width = usize::from(u16::from_le_bytes([data[6], data[7]]) & 0x3fff);
    let height = usize::from(u16::from_le_bytes([data[8], data[9]]) & 0x3fff);

    if width == 0 || height == 0 {
        return Err(WebpDecodeErrors::GenericStatic("VP8 frame has zero dimensions"));
    }
    Ok(Vp8FrameHeader {
        width,
        height,
        first_partition_size: (bits >> 5) as usize
    })
}

/// Decoded planes, padded to whole macroblocks
pub struct YuvPlanes {
    pub width:     usize,
    pub height:    usize,
    pub y:         Vec<u8>,
    pub u:         Vec<u8>,
    pub v:         Vec<u8>,
    pub y_stride:  usize,
    pub uv_stride: usize
}

impl YuvPlanes {
    /// Zeroed planes covering `width` x `height` rounded up to macroblocks
    pub fn new(width: usize, height: usize) -> YuvPlanes {
        let mb_width = (width + 15) >> 4;
        let mb_height = (height + 15) >> 4;
        let y_stride = mb_width * 16;
        let uv_stride = mb_width * 8;

        YuvPlanes {
            width,
            height,
            y: vec![0; y_stride * mb_height * 16],
            u: vec![0; uv_stride * mb_height * 8],
            v: vec![0; uv_stride * mb_height * 8],
            y_stride,
            uv_stride
        }
    }
}

/// Dequantization factors, DC then AC
#[derive(Copy, Clone, Default)]
pub(crate) struct QuantMatrix {
    pub(crate) y1: [i32; 2],
    pub(crate) y2: [i32; 2],
    pub(crate) uv: [i32; 2]
}

impl QuantMatrix {
    /// Factors for quantizer index `q` with the per plane deltas applied
    pub(crate) fn new(q: i32, deltas: &[i32; 5]) -> QuantMatrix {
        let dc = |v: i32, max: i32| i32::from(DC_TABLE[v.clamp(0, max) as usize]);
        let ac = |v: i32| i32::from(AC_TABLE[v.clamp(0, 127) as usize]);

        let [y1_dc, y2_dc, y2_ac, uv_dc, uv_ac] = *deltas;

        QuantMatrix {
            y1: [dc(q + y1_dc, 127), ac(q)],
            y2: [dc(q + y2_dc, 127) * 2, ((ac(q + y2_ac) * 101_581) >> 16).max(8)],
            uv: [dc(q + uv_dc, 117), ac(q + uv_ac)]
        }
    }
}

#[derive(Copy, Clone, Default)]
struct Segmentation {
    enabled:      bool,
    update_map:   bool,
    absolute:     bool,
    quantizer:    [i32; 4],
    filter_level: [i32; 4],
    probs:        [u8; 3]
}

#[derive(Copy, Clone, Default)]
struct LoopFilterHeader {
    simple:      bool,
    level:       i32,
    sharpness:   i32,
    use_deltas:  bool,
    ref_deltas:  [i32; 4],
    mode_deltas: [i32; 4]
}

#[derive(Copy, Clone, Default)]
struct MacroblockInfo {
    segment:      usize,
    is_i4x4:      bool,
    filter_inner: bool
}

struct MacroblockModes {
    segment:   usize,
    skip:      bool,
    is_i4x4:   bool,
    luma:      u8,
    sub_modes: [u8; 16],
    chroma:    u8
}

pub struct Vp8Decoder<'a> {
    header:        Vp8FrameHeader,
    bool_decoder:  BoolDecoder<'a>,
    partitions:    Vec<BoolDecoder<'a>>,
    segmentation:  Segmentation,
    filter:        LoopFilterHeader,
    quant:         [QuantMatrix; 4],
    probs:         CoeffProbs,
    skip_prob:     Option<u8>,
    mb_width:      usize,
    mb_height:     usize,
    // non zero flags of the bottom blocks of the row above, per column:
    // four luma, two u, two v and the second order dc
    top_nz:        Vec<[u8; 9]>,
    // 4x4 modes of the bottom sub blocks of the row above
    top_modes:     Vec<[u8; 4]>,
    planes:        YuvPlanes,
    mb_info:       Vec<MacroblockInfo>
}

impl<'a> Vp8Decoder<'a> {
    /// Parse the frame header and split the token partitions
    pub fn new(data: &'a [u8]) -> Result<Vp8Decoder<'a>, WebpDecodeErrors> {
        let header = read_frame_header(data)?;
        let first_end = VP8_FRAME_HEADER_SIZE + header.first_partition_size;

        let first = data
            .get(VP8_FRAME_HEADER_SIZE..first_end)
            .ok_or(WebpDecodeErrors::EntropyError("First partition is truncated"))?;

        let mut br = BoolDecoder::new(first);
        // color space and clamping type, both have a single meaning in webp
        br.read_flag();
        br.read_flag();

        let segmentation = read_segmentation(&mut br);
        let filter = read_filter_header(&mut br);
        let num_partitions = 1_usize << br.read_literal(2);
        let partitions = split_partitions(&data[first_end..], num_partitions)?;

        let base_q = br.read_literal(7) as i32;
        let deltas: [i32; 5] = core::array::from_fn(|_| br.read_optional_signed(4));

        let quant = core::array::from_fn(|s| {
            let q = match (segmentation.enabled, segmentation.absolute) {
                (true, true) => segmentation.quantizer[s],
                (true, false) => base_q + segmentation.quantizer[s],
                (false, _) => base_q
            };
            QuantMatrix::new(q, &deltas)
        });
        // refresh entropy probabilities, meaningless without inter frames
        br.read_flag();

        let mut probs = DEFAULT_COEFF_PROBS;

        for (t, bands) in probs.iter_mut().enumerate() {
            for (b, contexts) in bands.iter_mut().enumerate() {
                for (c, values) in contexts.iter_mut().enumerate() {
                    for (p, value) in values.iter_mut().enumerate() {
                        if br.read_bool(COEFF_UPDATE_PROBS[t][b][c][p]) {
                            *value = br.read_literal(8) as u8;
                        }
                    }
                }
            }
        }
        let skip_prob = br.read_flag().then(|| br.read_literal(8) as u8);

        if br.is_exhausted() {
            return Err(WebpDecodeErrors::EntropyError("VP8 frame header is truncated"));
        }
        trace!(
            "VP8 {}x{}, {} partitions, base quantizer {}, filter level {}",
            header.width,
            header.height,
            num_partitions,
            base_q,
            filter.level
        );
        let mb_width = (header.width + 15) >> 4;
        let mb_height = (header.height + 15) >> 4;

        Ok(Vp8Decoder {
            header,
            bool_decoder: br,
            partitions,
            segmentation,
            filter,
            quant,
            probs,
            skip_prob,
            mb_width,
            mb_height,
            top_nz: vec![[0; 9]; mb_width],
            top_modes: vec![[B_DC_PRED; 4]; mb_width],
            planes: YuvPlanes::new(header.width, header.height),
            mb_info: Vec::with_capacity(mb_width * mb_height)
        })
    }

    pub const fn dimensions(&self) -> (usize, usize) {
        (self.header.width, self.header.height)
    }

    /// Decode the whole frame into padded YUV 4:2:0 planes
    pub fn decode(mut self) -> Result<YuvPlanes, WebpDecodeErrors> {
        let partition_mask = self.partitions.len() - 1;

        for my in 0..self.mb_height {
            let mut left_nz = [0_u8; 9];
            let mut left_modes = [B_DC_PRED; 4];
            let partition = my & partition_mask;

            for mx in 0..self.mb_width {
                let modes = self.read_modes(mx, &mut left_modes);
                let mut coeffs = [0_i32; 384];

                let non_zero = if modes.skip {
                    let top = &mut self.top_nz[mx];
                    top[..8].fill(0);
                    left_nz[..8].fill(0);

                    if !modes.is_i4x4 {
                        top[8] = 0;
                        left_nz[8] = 0;
                    }
                    false
                } else {
                    read_residuals(
                        &mut self.partitions[partition],
                        &self.probs,
                        &self.quant[modes.segment],
                        modes.is_i4x4,
                        &mut self.top_nz[mx],
                        &mut left_nz,
                        &mut coeffs
                    )
                };
                if self.partitions[partition].is_exhausted() {
                    return Err(WebpDecodeErrors::EntropyError(
                        "Premature end of VP8 token partition"
                    ));
                }
                self.mb_info.push(MacroblockInfo {
                    segment:      modes.segment,
                    is_i4x4:      modes.is_i4x4,
                    filter_inner: modes.is_i4x4 || non_zero
                });
                reconstruct_macroblock(&mut self.planes, mx, my, self.mb_width, &modes, &coeffs);
            }
            if self.bool_decoder.is_exhausted() {
                return Err(WebpDecodeErrors::EntropyError(
                    "Premature end of VP8 first partition"
                ));
            }
        }
        self.apply_loop_filter();

        Ok(self.planes)
    }

    fn read_modes(&mut self, mx: usize, left_modes: &mut [u8; 4]) -> MacroblockModes {
        let br = &mut self.bool_decoder;

        let segment = if self.segmentation.update_map {
            let probs = self.segmentation.probs;

            if !br.read_bool(probs[0]) {
                usize::from(br.read_bool(probs[1]))
            } else {
                2 + usize::from(br.read_bool(probs[2]))
            }
        } else {
            0
        };
        let skip = match self.skip_prob {
            Some(prob) => br.read_bool(prob),
            None => false
        };
        let is_i4x4 = !br.read_bool(145);
        let top_modes = &mut self.top_modes[mx];
        let mut sub_modes = [B_DC_PRED; 16];
        let mut luma = DC_PRED;

        if is_i4x4 {
            for (y, left_mode) in left_modes.iter_mut().enumerate() {
                let mut left = *left_mode;

                for (x, top) in top_modes.iter_mut().enumerate() {
                    let probs = &BMODE_PROBS[usize::from(*top)][usize::from(left)];
                    let mode = read_sub_mode(br, probs);

                    sub_modes[y * 4 + x] = mode;
                    *top = mode;
                    left = mode;
                }
                *left_mode = left;
            }
        } else {
            luma = if br.read_bool(156) {
                if br.read_bool(128) {
                    TM_PRED
                } else {
                    H_PRED
                }
            } else if br.read_bool(163) {
                V_PRED
            } else {
                DC_PRED
            };
            // whole block modes share values with their 4x4 counterparts
            *top_modes = [luma; 4];
            *left_modes = [luma; 4];
        }
        let chroma = if !br.read_bool(142) {
            DC_PRED
        } else if !br.read_bool(114) {
            V_PRED
        } else if br.read_bool(183) {
            TM_PRED
        } else {
            H_PRED
        };
        MacroblockModes {
            segment,
            skip,
            is_i4x4,
            luma,
            sub_modes,
            chroma
        }
    }

    /// Filter strength of each segment, for whole block and 4x4 predicted
    /// macroblocks
    fn filter_params(&self) -> [[FilterParams; 2]; 4] {
        let header = &self.filter;
        let mut out = [[FilterParams::default(); 2]; 4];

        for (segment, params) in out.iter_mut().enumerate() {
            let base = if self.segmentation.enabled {
                let level = self.segmentation.filter_level[segment];
                if self.segmentation.absolute {
                    level
                } else {
                    level + header.level
                }
            } else {
                header.level
            };
            for (i4x4, param) in params.iter_mut().enumerate() {
                let mut level = base;

                if header.use_deltas {
                    // intra frames only use the first reference and mode delta
                    level += header.ref_deltas[0];
                    if i4x4 == 1 {
                        level += header.mode_deltas[0];
                    }
                }
                let level = level.clamp(0, 63);

                if level == 0 {
                    continue;
                }
                let mut interior = level;

                if header.sharpness > 0 {
                    interior >>= if header.sharpness > 4 { 2 } else { 1 };
                    interior = interior.min(9 - header.sharpness);
                }
                let interior = interior.max(1);

                *param = FilterParams {
                    limit:          2 * level + interior,
                    interior_limit: interior,
                    hev_threshold:  if level >= 40 {
                        2
                    } else if level >= 15 {
                        1
                    } else {
                        0
                    }
                };
            }
        }
        out
    }

    fn apply_loop_filter(&mut self) {
        if self.filter.level == 0 {
            return;
        }
        let strengths = self.filter_params();
        let simple = self.filter.simple;

        for my in 0..self.mb_height {
            for mx in 0..self.mb_width {
                let info = self.mb_info[my * self.mb_width + mx];
                let params = strengths[info.segment][usize::from(info.is_i4x4)];

                if params.limit == 0 {
                    continue;
                }
                if simple {
                    filter_macroblock_simple(&mut self.planes, mx, my, &params, info.filter_inner);
                } else {
                    filter_macroblock_normal(&mut self.planes, mx, my, &params, info.filter_inner);
                }
            }
        }
    }
}

fn read_segmentation(br: &mut BoolDecoder) -> Segmentation {
    let mut segmentation = Segmentation {
        probs: [255; 3],
        ..Default::default()
    };
    segmentation.enabled = br.read_flag();

    if !segmentation.enabled {
        return segmentation;
    }
    segmentation.update_map = br.read_flag();
    let update_data = br.read_flag();

    if update_data {
        segmentation.absolute = br.read_flag();
        segmentation.quantizer = core::array::from_fn(|_| br.read_optional_signed(7));
        segmentation.filter_level = core::array::from_fn(|_| br.read_optional_signed(6));
    }
    if segmentation.update_map {
        segmentation.probs = core::array::from_fn(|_| {
            if br.read_flag() {
                br.read_literal(8) as u8
            } else {
                255
            }
        });
    }
    segmentation
}

fn read_filter_header(br: &mut BoolDecoder) -> LoopFilterHeader {
    let mut header = LoopFilterHeader {
        simple: br.read_flag(),
        level: br.read_literal(6) as i32,
        sharpness: br.read_literal(3) as i32,
        ..Default::default()
    };
    header.use_deltas = br.read_flag();

    if header.use_deltas && br.read_flag() {
        header.ref_deltas = core::array::from_fn(|_| br.read_optional_signed(6));
        header.mode_deltas = core::array::from_fn(|_| br.read_optional_signed(6));
    }
    header
}

/// Split the data after the first partition into token partitions
fn split_partitions(data: &[u8], count: usize) -> Result<Vec<BoolDecoder>, WebpDecodeErrors> {
    let table_size = 3 * (count - 1);

    if data.len() < table_size {
        return Err(WebpDecodeErrors::EntropyError("VP8 partition table is truncated"));
    }
    let (sizes, mut rest) = data.split_at(table_size);
    let mut partitions = Vec::with_capacity(count);

    for size in sizes.chunks_exact(3) {
        let size = usize::from(size[0]) | (usize::from(size[1]) << 8) | (usize::from(size[2]) << 16);

        if size > rest.len() {
            return Err(WebpDecodeErrors::EntropyError("VP8 token partition is truncated"));
        }
        let (partition, tail) = rest.split_at(size);
        partitions.push(BoolDecoder::new(partition));
        rest = tail;
    }
    if rest.is_empty() {
        return Err(WebpDecodeErrors::EntropyError("Missing VP8 token partition"));
    }
    partitions.push(BoolDecoder::new(rest));

    Ok(partitions)
}

fn read_sub_mode(br: &mut BoolDecoder, probs: &[u8; 9]) -> u8 {
    if !br.read_bool(probs[0]) {
        B_DC_PRED
    } else if !br.read_bool(probs[1]) {
        B_TM_PRED
    } else if !br.read_bool(probs[2]) {
        B_VE_PRED
    } else if !br.read_bool(probs[3]) {
        if !br.read_bool(probs[4]) {
            B_HE_PRED
        } else if !br.read_bool(probs[5]) {
            B_RD_PRED
        } else {
            B_VR_PRED
        }
    } else if !br.read_bool(probs[6]) {
        B_LD_PRED
    } else if !br.read_bool(probs[7]) {
        B_VL_PRED
    } else if !br.read_bool(probs[8]) {
        B_HD_PRED
    } else {
        B_HU_PRED
    }
}

/// Token values of two and more
pub(crate) fn read_large_value(br: &mut BoolDecoder, p: &[u8; NUM_PROBAS]) -> i32 {
    if !br.read_bool(p[3]) {
        if !br.read_bool(p[4]) {
            2
        } else {
            3 + i32::from(br.read_bool(p[5]))
        }
    } else if !br.read_bool(p[6]) {
        if !br.read_bool(p[7]) {
            5 + i32::from(br.read_bool(159))
        } else {
            let high = i32::from(br.read_bool(165));
            let low = i32::from(br.read_bool(145));
            7 + 2 * high + low
        }
    } else {
        let bit1 = usize::from(br.read_bool(p[8]));
        let bit0 = usize::from(br.read_bool(p[9 + bit1]));
        let category = 2 * bit1 + bit0;

        let mut value = 0;
        for &prob in CAT_TABLES[category] {
            value = 2 * value + i32::from(br.read_bool(prob));
        }
        value + 3 + (8 << category)
    }
}

/// Decode the tokens of one 4x4 block starting at position `first`
///
/// Coefficients are stored dequantized in raster order. Returns the
/// position after the last non zero coefficient.
fn read_coefficients(
    br: &mut BoolDecoder, probs: &BandProbs, ctx: usize, dq: [i32; 2], first: usize,
    out: &mut [i32]
) -> usize {
    let mut n = first;
    let mut p = &probs[BANDS[n]][ctx];

    while n < 16 {
        if !br.read_bool(p[0]) {
            // end of block
            return n;
        }
        while !br.read_bool(p[1]) {
            n += 1;
            if n == 16 {
                return 16;
            }
            p = &probs[BANDS[n]][0];
        }
        let (value, next_ctx) = if !br.read_bool(p[2]) {
            (1, 1)
        } else {
            (read_large_value(br, p), 2)
        };
        let value = if br.read_flag() { -value } else { value };

        out[ZIGZAG[n]] = value * dq[usize::from(n > 0)];
        n += 1;
        p = &probs[BANDS[n]][next_ctx];
    }
    16
}

/// Decode all coefficients of a macroblock, returns true if any block
/// carries more than a DC value
fn read_residuals(
    br: &mut BoolDecoder, probs: &CoeffProbs, quant: &QuantMatrix, is_i4x4: bool,
    top: &mut [u8; 9], left: &mut [u8; 9], coeffs: &mut [i32; 384]
) -> bool {
    let mut non_zero = false;

    let (first, luma_type) = if is_i4x4 {
        (0, 3)
    } else {
        let mut dc = [0_i32; 16];
        let ctx = usize::from(top[8] + left[8]);
        let nz = read_coefficients(br, &probs[1], ctx, quant.y2, 0, &mut dc);

        top[8] = u8::from(nz > 0);
        left[8] = top[8];

        if nz > 1 {
            for (block, value) in coeffs.chunks_exact_mut(16).zip(inverse_wht(&dc)) {
                block[0] = value;
            }
        } else {
            let value = (dc[0] + 3) >> 3;
            for block in coeffs.chunks_exact_mut(16).take(16) {
                block[0] = value;
            }
        }
        (1, 0)
    };
    for y in 0..4 {
        let mut l = left[y];

        for x in 0..4 {
            let ctx = usize::from(l + top[x]);
            let start = (y * 4 + x) * 16;
            let block = &mut coeffs[start..start + 16];
            let nz = read_coefficients(br, &probs[luma_type], ctx, quant.y1, first, block);

            l = u8::from(nz > first);
            top[x] = l;
            non_zero |= nz > 1 || block[0] != 0;
        }
        left[y] = l;
    }
    for plane in 0..2 {
        for y in 0..2 {
            let mut l = left[4 + plane * 2 + y];

            for x in 0..2 {
                let ctx = usize::from(l + top[4 + plane * 2 + x]);
                let start = (16 + plane * 4 + y * 2 + x) * 16;
                let block = &mut coeffs[start..start + 16];
                let nz = read_coefficients(br, &probs[2], ctx, quant.uv, 0, block);

                l = u8::from(nz > 0);
                top[4 + plane * 2 + x] = l;
                non_zero |= nz > 1 || block[0] != 0;
            }
            left[4 + plane * 2 + y] = l;
        }
    }
    non_zero
}

/// Fill the row above and the column left of a prediction work buffer
///
/// Samples outside the frame are 127 above and 129 to the left.
pub(crate) fn load_edges(
    ws: &mut [u8], plane: &[u8], stride: usize, size: usize, mx: usize, my: usize,
    top_right: Option<usize>
) {
    let x0 = mx * size;
    let y0 = my * size;
    let extra = top_right.map_or(0, |_| 4);

    if my == 0 {
        ws[..size + 1 + extra].fill(127);
    } else {
        let above = (y0 - 1) * stride;
        ws[0] = if mx == 0 { 129 } else { plane[above + x0 - 1] };
        ws[1..size + 1].copy_from_slice(&plane[above + x0..above + x0 + size]);

        if let Some(mb_width) = top_right {
            if mx + 1 < mb_width {
                ws[size + 1..size + 5].copy_from_slice(&plane[above + x0 + size..above + x0 + size + 4]);
            } else {
                ws[size + 1..size + 5].fill(plane[above + x0 + size - 1]);
            }
        }
    }
    for y in 0..size {
        ws[(y + 1) * BPS] = if mx == 0 {
            129
        } else {
            plane[(y0 + y) * stride + x0 - 1]
        };
    }
}

fn reconstruct_macroblock(
    planes: &mut YuvPlanes, mx: usize, my: usize, mb_width: usize, modes: &MacroblockModes,
    coeffs: &[i32; 384]
) {
    let mut ws = [0_u8; BPS * 17];
    let origin = BPS + 1;

    load_edges(&mut ws, &planes.y, planes.y_stride, 16, mx, my, Some(mb_width));

    if modes.is_i4x4 {
        // sub blocks on the right edge see the macroblock's top right samples
        for row in [4, 8, 12] {
            ws.copy_within(17..21, row * BPS + 17);
        }
        for (n, mode) in modes.sub_modes.iter().enumerate() {
            let offset = origin + (n >> 2) * 4 * BPS + (n & 3) * 4;
            predict_4x4(&mut ws, offset, *mode);
            idct_add(&coeffs[n * 16..n * 16 + 16], &mut ws, offset, BPS);
        }
    } else {
        predict_block(&mut ws, origin, 16, modes.luma, my > 0, mx > 0);

        for n in 0..16 {
            let offset = origin + (n >> 2) * 4 * BPS + (n & 3) * 4;
            idct_add(&coeffs[n * 16..n * 16 + 16], &mut ws, offset, BPS);
        }
    }
    for y in 0..16 {
        let start = (my * 16 + y) * planes.y_stride + mx * 16;
        planes.y[start..start + 16].copy_from_slice(&ws[origin + y * BPS..origin + y * BPS + 16]);
    }
    let uv_stride = planes.uv_stride;

    for (plane, blocks) in [&mut planes.u, &mut planes.v]
        .into_iter()
        .zip(coeffs[256..].chunks_exact(64))
    {
        let mut cs = [0_u8; BPS * 9];
        load_edges(&mut cs, &plane[..], uv_stride, 8, mx, my, None);
        predict_block(&mut cs, origin, 8, modes.chroma, my > 0, mx > 0);

        for n in 0..4 {
            let offset = origin + (n >> 1) * 4 * BPS + (n & 1) * 4;
            idct_add(&blocks[n * 16..n * 16 + 16], &mut cs, offset, BPS);
        }
        for y in 0..8 {
            let start = (my * 8 + y) * uv_stride + mx * 8;
            plane[start..start + 8].copy_from_slice(&cs[origin + y * BPS..origin + y * BPS + 8]);
        }
    }
}

fn filter_macroblock_simple(
    planes: &mut YuvPlanes, mx: usize, my: usize, params: &FilterParams, inner: bool
) {
    let stride = planes.y_stride;
    let origin = my * 16 * stride + mx * 16;
    let luma = &mut planes.y;

    if mx > 0 {
        simple_edge(luma, origin, 1, stride, 16, params.limit + 4);
    }
    if inner {
        for x in [4, 8, 12] {
            simple_edge(luma, origin + x, 1, stride, 16, params.limit);
        }
    }
    if my > 0 {
        simple_edge(luma, origin, stride, 1, 16, params.limit + 4);
    }
    if inner {
        for y in [4, 8, 12] {
            simple_edge(luma, origin + y * stride, stride, 1, 16, params.limit);
        }
    }
}

fn filter_macroblock_normal(
    planes: &mut YuvPlanes, mx: usize, my: usize, params: &FilterParams, inner: bool
) {
    let y_stride = planes.y_stride;
    let uv_stride = planes.uv_stride;
    let y_origin = my * 16 * y_stride + mx * 16;
    let uv_origin = my * 8 * uv_stride + mx * 8;
    let edge_limit = params.limit + 4;

    // vertical edges first, left macroblock edge then the inner ones
    if mx > 0 {
        normal_edge(&mut planes.y, y_origin, 1, y_stride, 16, edge_limit, params, false);
        for chroma in [&mut planes.u, &mut planes.v] {
            normal_edge(chroma, uv_origin, 1, uv_stride, 8, edge_limit, params, false);
        }
    }
    if inner {
        for x in [4, 8, 12] {
            normal_edge(&mut planes.y, y_origin + x, 1, y_stride, 16, params.limit, params, true);
        }
        for chroma in [&mut planes.u, &mut planes.v] {
            normal_edge(chroma, uv_origin + 4, 1, uv_stride, 8, params.limit, params, true);
        }
    }
    if my > 0 {
        normal_edge(&mut planes.y, y_origin, y_stride, 1, 16, edge_limit, params, false);
        for chroma in [&mut planes.u, &mut planes.v] {
            normal_edge(chroma, uv_origin, uv_stride, 1, 8, edge_limit, params, false);
        }
    }
    if inner {
        for y in [4, 8, 12] {
            let start = y_origin + y * y_stride;
            normal_edge(&mut planes.y, start, y_stride, 1, 16, params.limit, params, true);
        }
        for chroma in [&mut planes.u, &mut planes.v] {
            let start = uv_origin + 4 * uv_stride;
            normal_edge(chroma, start, uv_stride, 1, 8, params.limit, params, true);
        }
    }
}
