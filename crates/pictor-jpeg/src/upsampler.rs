/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Up-sampling routines
//!
//! Chroma planes are brought to full resolution with a triangle filter,
//! each output sample weighs its nearest input sample by 3/4 and the next
//! nearest by 1/4.
use alloc::vec;
use alloc::vec::Vec;

use crate::components::SampleRatios;

/// Double the width of a single row
pub fn upsample_horizontal(input: &[i16], output: &mut [i16]) {
    debug_assert_eq!(input.len() * 2, output.len());

    if input.len() == 1 {
        output.fill(input[0]);
        return;
    }
    output[0] = input[0];
    output[1] = (input[0] * 3 + input[1] + 2) >> 2;

    // The readable version
    //
    //      for i in 1..input.len() - 1{
    //         let sample = 3 * input[i] + 2;
    //         out[i * 2] = (sample + input[i - 1]) >> 2;
    //         out[i * 2 + 1] = (sample + input[i + 1]) >> 2;
    //     }
    for (output_window, input_window) in output[2..].chunks_exact_mut(2).zip(input.windows(3)) {
        let sample = 3 * input_window[1] + 2;

        output_window[0] = (sample + input_window[0]) >> 2;
        output_window[1] = (sample + input_window[2]) >> 2;
    }
    let out_len = output.len() - 2;
    let input_len = input.len() - 2;

    let f_out = &mut output[out_len..];
    let i_last = &input[input_len..];

    f_out[0] = (3 * i_last[1] + i_last[0] + 2) >> 2;
    f_out[1] = i_last[1];
}

/// Produce the two output rows that straddle input row `current`
///
/// `above` and `below` are the neighbouring input rows, the first and
/// last rows use themselves as neighbours
pub fn upsample_vertical(
    above: &[i16], current: &[i16], below: &[i16], out_top: &mut [i16], out_bottom: &mut [i16]
) {
    for ((((near, up), down), ot), ob) in current
        .iter()
        .zip(above)
        .zip(below)
        .zip(out_top.iter_mut())
        .zip(out_bottom.iter_mut())
    {
        let sample = 3 * near + 2;

        *ot = (sample + up) >> 2;
        *ob = (sample + down) >> 2;
    }
}

/// Scale a whole `width` x `height` plane up according to `ratio`
///
/// Returns the plane unchanged if no scaling is needed
pub fn upsample_plane(plane: Vec<i16>, width: usize, height: usize, ratio: SampleRatios) -> Vec<i16> {
    let vertical = |input: &[i16]| {
        let mut output = vec![0; width * height * 2];

        for (y, out_rows) in output.chunks_exact_mut(width * 2).enumerate() {
            let (out_top, out_bottom) = out_rows.split_at_mut(width);

            let current = &input[y * width..(y + 1) * width];
            let above = &input[y.saturating_sub(1) * width..][..width];
            let below = &input[(y + 1).min(height - 1) * width..][..width];

            upsample_vertical(above, current, below, out_top, out_bottom);
        }
        output
    };
    let horizontal = |input: &[i16], rows: usize| {
        let mut output = vec![0; width * rows * 2];

        for (in_row, out_row) in input
            .chunks_exact(width)
            .zip(output.chunks_exact_mut(width * 2))
        {
            upsample_horizontal(in_row, out_row);
        }
        output
    };

    match ratio {
        SampleRatios::None => plane,
        SampleRatios::H => horizontal(&plane, height),
        SampleRatios::V => vertical(&plane),
        SampleRatios::HV => {
            let tall = vertical(&plane);
            horizontal(&tall, height * 2)
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use crate::components::SampleRatios;
    use crate::upsampler::{upsample_horizontal, upsample_plane};

    #[test]
    fn horizontal_triangle_filter() {
        let input = [0_i16, 100, 200];
        let mut output = [0_i16; 6];
        upsample_horizontal(&input, &mut output);
        assert_eq!(output, [0, 25, 75, 125, 175, 200]);
    }

    #[test]
    fn flat_planes_stay_flat() {
        let plane = vec![77_i16; 4 * 3];
        for ratio in [SampleRatios::H, SampleRatios::V, SampleRatios::HV] {
            let out = upsample_plane(plane.clone(), 4, 3, ratio);
            assert!(out.iter().all(|x| *x == 77));
        }
        let out = upsample_plane(plane.clone(), 4, 3, SampleRatios::HV);
        assert_eq!(out.len(), 4 * 3 * 4);
    }

    #[test]
    fn vertical_edges_replicate() {
        // two rows, a single column
        let plane = vec![0_i16, 100];
        let out = upsample_plane(plane, 1, 2, SampleRatios::V);
        assert_eq!(out, vec![0, 25, 75, 100]);
    }
}
