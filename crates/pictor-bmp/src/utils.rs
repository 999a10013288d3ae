/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

/// Split packed samples of `depth` bits into one byte per sample,
/// most significant bits first.
///
/// Output past the number of samples `input` carries is left untouched.
pub(crate) fn expand_bits_to_byte(depth: usize, input: &[u8], out: &mut [u8]) {
    if depth == 8 {
        let len = out.len().min(input.len());
        out[..len].copy_from_slice(&input[..len]);
        return;
    }
    let per_byte = 8 / depth;
    let mask = (1_u8 << depth) - 1;

    for (chunk, byte) in out.chunks_mut(per_byte).zip(input) {
        for (i, sample) in chunk.iter_mut().enumerate() {
            let shift = 8 - depth * (i + 1);
            *sample = (byte >> shift) & mask;
        }
    }
}

/// Number of bytes a stored row takes, rows are padded to four bytes
pub(crate) const fn padded_row_size(width: usize, depth: usize) -> usize {
    ((width * depth + 31) / 32) * 4
}

/// Reverse the order of `stride` sized rows in place
pub(crate) fn flip_rows(buf: &mut [u8], stride: usize) {
    if stride == 0 {
        return;
    }
    let rows = buf.len() / stride;
    let (top, bottom) = buf.split_at_mut((rows / 2) * stride);
    // skip the middle row of an odd height image
    let bottom_start = bottom.len() - (rows / 2) * stride;

    for (a, b) in top
        .chunks_exact_mut(stride)
        .zip(bottom[bottom_start..].rchunks_exact_mut(stride))
    {
        a.swap_with_slice(b);
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::{expand_bits_to_byte, flip_rows, padded_row_size};

    #[test]
    fn expand_depths() {
        let mut out = [9_u8; 10];
        expand_bits_to_byte(1, &[0b1010_0001, 0b1100_0000], &mut out);
        assert_eq!(out, [1, 0, 1, 0, 0, 0, 0, 1, 1, 1]);

        let mut out = [0_u8; 3];
        expand_bits_to_byte(4, &[0xAB, 0xC0], &mut out);
        assert_eq!(out, [0xA, 0xB, 0xC]);

        let mut out = [0_u8; 4];
        expand_bits_to_byte(2, &[0b11_10_01_00], &mut out);
        assert_eq!(out, [3, 2, 1, 0]);
    }

    #[test]
    fn row_padding() {
        assert_eq!(padded_row_size(1, 24), 4);
        assert_eq!(padded_row_size(47, 24), 144);
        assert_eq!(padded_row_size(9, 1), 4);
        assert_eq!(padded_row_size(3, 32), 12);
    }

    #[test]
    fn flip_odd_and_even() {
        let mut rows = [1, 1, 2, 2, 3, 3];
        flip_rows(&mut rows, 2);
        assert_eq!(rows, [3, 3, 2, 2, 1, 1]);

        let mut rows = [1, 2, 3, 4];
        flip_rows(&mut rows, 1);
        assert_eq!(rows, [4, 3, 2, 1]);
    }
}
