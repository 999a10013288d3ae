/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Scanline filters
//!
//! Reconstruction treats the row above the first scanline as zeros,
//! so callers pass a zeroed previous row instead of using special
//! first row variants.
use crate::enums::FilterMethod;

/// Undo `filter` on `raw` writing the reconstructed scanline to `current`
///
/// `components` is the number of bytes in a complete pixel, rounded up to one
/// for bit depths below eight.
pub fn de_filter_row(
    filter: FilterMethod, prev_row: &[u8], raw: &[u8], current: &mut [u8], components: usize
) {
    match filter {
        FilterMethod::None => current.copy_from_slice(raw),
        FilterMethod::Sub => handle_sub(raw, current, components),
        FilterMethod::Up => handle_up(prev_row, raw, current),
        FilterMethod::Average => handle_avg(prev_row, raw, current, components),
        FilterMethod::Paeth => handle_paeth(prev_row, raw, current, components)
    }
}

#[allow(clippy::manual_memcpy)]
pub fn handle_sub(raw: &[u8], current: &mut [u8], components: usize) {
    if current.len() < components || raw.len() < components {
        current.copy_from_slice(raw);
        return;
    }
    // handle leftmost byte explicitly
    for i in 0..components {
        current[i] = raw[i];
    }
    let end = current.len().min(raw.len());

    for i in components..end {
        let a = current[i - components];
        current[i] = raw[i].wrapping_add(a);
    }
}

pub fn handle_up(prev_row: &[u8], raw: &[u8], current: &mut [u8]) {
    for ((filt, recon), up) in raw.iter().zip(current).zip(prev_row) {
        *recon = (*filt).wrapping_add(*up)
    }
}

pub fn handle_avg(prev_row: &[u8], raw: &[u8], current: &mut [u8], components: usize) {
    let end = current.len().min(raw.len()).min(prev_row.len());
    let first = components.min(end);

    for i in 0..first {
        current[i] = raw[i].wrapping_add(prev_row[i] >> 1);
    }
    for i in first..end {
        let a = current[i - components];
        let b = prev_row[i];
        // average without overflow, from stanford bit-hacks
        let c = (a & b) + ((a ^ b) >> 1);

        current[i] = raw[i].wrapping_add(c);
    }
}

pub fn handle_paeth(prev_row: &[u8], raw: &[u8], current: &mut [u8], components: usize) {
    let end = current.len().min(raw.len()).min(prev_row.len());
    let first = components.min(end);

    for i in 0..first {
        current[i] = raw[i].wrapping_add(paeth(0, prev_row[i], 0));
    }
    for i in first..end {
        let paeth_res = paeth(
            current[i - components],
            prev_row[i],
            prev_row[i - components]
        );
        current[i] = raw[i].wrapping_add(paeth_res)
    }
}

#[inline(always)]
pub fn paeth(a: u8, b: u8, c: u8) -> u8 {
    // From stb, equivalent to the reference predictor but with
    // fewer data dependencies
    let a = i32::from(a);
    let b = i32::from(b);
    let c = i32::from(c);
    let thresh = c * 3 - (a + b);
    let lo = if a < b { a } else { b };
    let hi = if a < b { b } else { a };

    let t0 = if hi <= thresh { lo } else { c };
    let t1 = if thresh <= lo { hi } else { t0 };
    t1 as u8
}

/// Apply `filter` to `current`, writing the filter byte followed by the
/// residuals into `out`
///
/// `out` must be one byte longer than `current`, `previous` is all zeros
/// for the first row.
pub fn filter_scanline(
    current: &[u8], previous: &[u8], out: &mut [u8], filter: FilterMethod, components: usize
) {
    let (filter_byte, out) = out.split_at_mut(1);
    filter_byte[0] = filter.to_int();

    for i in 0..current.len() {
        let left = if i >= components { current[i - components] } else { 0 };
        let up = previous[i];
        let up_left = if i >= components { previous[i - components] } else { 0 };

        let prediction = match filter {
            FilterMethod::None => 0,
            FilterMethod::Sub => left,
            FilterMethod::Up => up,
            FilterMethod::Average => ((u16::from(left) + u16::from(up)) >> 1) as u8,
            FilterMethod::Paeth => paeth(left, up, up_left)
        };
        out[i] = current[i].wrapping_sub(prediction);
    }
}

/// Pick the filter whose residuals have the smallest sum when each
/// byte is read as a signed value
///
/// `scratch` must be one byte longer than `current`.
pub fn choose_compression_filter(
    current: &[u8], previous: &[u8], scratch: &mut [u8], components: usize
) -> FilterMethod {
    const FILTERS: [FilterMethod; 5] = [
        FilterMethod::None,
        FilterMethod::Sub,
        FilterMethod::Up,
        FilterMethod::Average,
        FilterMethod::Paeth
    ];
    let mut best = FilterMethod::None;
    let mut best_score = u64::MAX;

    for filter in FILTERS {
        filter_scanline(current, previous, scratch, filter, components);

        let score: u64 = scratch[1..]
            .iter()
            .map(|x| u64::from((*x as i8).unsigned_abs()))
            .sum();

        if score < best_score {
            best_score = score;
            best = filter;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use crate::enums::FilterMethod;
    use crate::filters::{choose_compression_filter, de_filter_row, filter_scanline, paeth};

    #[test]
    fn paeth_matches_reference() {
        fn reference(a: u8, b: u8, c: u8) -> u8 {
            let p = i16::from(a) + i16::from(b) - i16::from(c);
            let pa = (p - i16::from(a)).abs();
            let pb = (p - i16::from(b)).abs();
            let pc = (p - i16::from(c)).abs();
            if pa <= pb && pa <= pc {
                a
            } else if pb <= pc {
                b
            } else {
                c
            }
        }
        for a in (0..=255).step_by(15) {
            for b in (0..=255).step_by(17) {
                for c in (0..=255).step_by(13) {
                    assert_eq!(paeth(a, b, c), reference(a, b, c));
                }
            }
        }
    }

    #[test]
    fn every_filter_reverses() {
        let previous: Vec<u8> = (0..24_u8).map(|x| x.wrapping_mul(37)).collect();
        let current: Vec<u8> = (0..24_u8).map(|x| x.wrapping_mul(91) ^ 0x5A).collect();

        for filter in [
            FilterMethod::None,
            FilterMethod::Sub,
            FilterMethod::Up,
            FilterMethod::Average,
            FilterMethod::Paeth
        ] {
            let mut filtered = vec![0; current.len() + 1];
            filter_scanline(&current, &previous, &mut filtered, filter, 3);
            assert_eq!(filtered[0], filter.to_int());

            let mut recon = vec![0; current.len()];
            de_filter_row(filter, &previous, &filtered[1..], &mut recon, 3);
            assert_eq!(recon, current, "{filter:?}");
        }
    }

    #[test]
    fn flat_rows_prefer_up() {
        let row = [9_u8, 200, 33, 9, 200, 33, 9, 200, 1];
        let mut scratch = [0; 10];
        let filter = choose_compression_filter(&row, &row, &mut scratch, 3);
        assert_eq!(filter, FilterMethod::Up);
    }
}
