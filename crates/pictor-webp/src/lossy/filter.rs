/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! VP8 in-loop deblocking filters
//!
//! Every function filters the edge that lies between sample `pos - step`
//! and `pos`, `step` moving across the edge and `stride` along it.

#[inline(always)]
fn sclip1(v: i32) -> i32 {
    v.clamp(-128, 127)
}

#[inline(always)]
fn sclip2(v: i32) -> i32 {
    v.clamp(-16, 15)
}

#[inline(always)]
fn clip8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

#[inline(always)]
fn at(buf: &[u8], pos: usize) -> i32 {
    i32::from(buf[pos])
}

/// Adjust the two samples closest to the edge
fn filter2(buf: &mut [u8], pos: usize, step: usize) {
    let p1 = at(buf, pos - 2 * step);
    let p0 = at(buf, pos - step);
    let q0 = at(buf, pos);
    let q1 = at(buf, pos + step);

    let a = 3 * (q0 - p0) + sclip1(p1 - q1);
    let a1 = sclip2((a + 4) >> 3);
    let a2 = sclip2((a + 3) >> 3);

    buf[pos - step] = clip8(p0 + a2);
    buf[pos] = clip8(q0 - a1);
}

/// Adjust four samples, used on edges inside a macroblock
fn filter4(buf: &mut [u8], pos: usize, step: usize) {
    let p1 = at(buf, pos - 2 * step);
    let p0 = at(buf, pos - step);
    let q0 = at(buf, pos);
    let q1 = at(buf, pos + step);

    let a = 3 * (q0 - p0);
    let a1 = sclip2((a + 4) >> 3);
    let a2 = sclip2((a + 3) >> 3);
    let a3 = (a1 + 1) >> 1;

    buf[pos - 2 * step] = clip8(p1 + a3);
    buf[pos - step] = clip8(p0 + a2);
    buf[pos] = clip8(q0 - a1);
    buf[pos + step] = clip8(q1 - a3);
}

/// Adjust six samples, used on macroblock edges
fn filter6(buf: &mut [u8], pos: usize, step: usize) {
    let p2 = at(buf, pos - 3 * step);
    let p1 = at(buf, pos - 2 * step);
    let p0 = at(buf, pos - step);
    let q0 = at(buf, pos);
    let q1 = at(buf, pos + step);
    let q2 = at(buf, pos + 2 * step);

    let a = sclip1(3 * (q0 - p0) + sclip1(p1 - q1));
    let a1 = (27 * a + 63) >> 7;
    let a2 = (18 * a + 63) >> 7;
    let a3 = (9 * a + 63) >> 7;

    buf[pos - 3 * step] = clip8(p2 + a3);
    buf[pos - 2 * step] = clip8(p1 + a2);
    buf[pos - step] = clip8(p0 + a1);
    buf[pos] = clip8(q0 - a1);
    buf[pos + step] = clip8(q1 - a2);
    buf[pos + 2 * step] = clip8(q2 - a3);
}

#[inline(always)]
fn high_edge_variance(buf: &[u8], pos: usize, step: usize, threshold: i32) -> bool {
    (at(buf, pos - 2 * step) - at(buf, pos - step)).abs() > threshold
        || (at(buf, pos + step) - at(buf, pos)).abs() > threshold
}

#[inline(always)]
fn needs_filter(buf: &[u8], pos: usize, step: usize, threshold: i32) -> bool {
    4 * (at(buf, pos - step) - at(buf, pos)).abs()
        + (at(buf, pos - 2 * step) - at(buf, pos + step)).abs()
        <= threshold
}

fn needs_filter_normal(
    buf: &[u8], pos: usize, step: usize, threshold: i32, interior_limit: i32
) -> bool {
    if !needs_filter(buf, pos, step, threshold) {
        return false;
    }
    // p3 p2 p1 p0 | q0 q1 q2 q3
    let v: [i32; 8] = core::array::from_fn(|k| at(buf, pos + k * step - 4 * step));

    (0..3).all(|k| (v[k] - v[k + 1]).abs() <= interior_limit)
        && (4..7).all(|k| (v[k] - v[k + 1]).abs() <= interior_limit)
}

/// Strength of the filter for one macroblock
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FilterParams {
    /// Edge limit, zero disables filtering
    pub limit:          i32,
    pub interior_limit: i32,
    pub hev_threshold:  i32
}

/// Filter `len` positions along the edge with the simple filter
pub fn simple_edge(buf: &mut [u8], pos: usize, step: usize, stride: usize, len: usize, limit: i32) {
    let threshold = 2 * limit + 1;

    for k in 0..len {
        let p = pos + k * stride;
        if needs_filter(buf, p, step, threshold) {
            filter2(buf, p, step);
        }
    }
}

/// Filter `len` positions along the edge with the normal filter
///
/// `inner` selects the weaker four tap filter used inside macroblocks.
pub fn normal_edge(
    buf: &mut [u8], pos: usize, step: usize, stride: usize, len: usize, limit: i32,
    params: &FilterParams, inner: bool
) {
    let threshold = 2 * limit + 1;

    for k in 0..len {
        let p = pos + k * stride;

        if !needs_filter_normal(buf, p, step, threshold, params.interior_limit) {
            continue;
        }
        if high_edge_variance(buf, p, step, params.hev_threshold) {
            filter2(buf, p, step);
        } else if inner {
            filter4(buf, p, step);
        } else {
            filter6(buf, p, step);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::lossy::filter::{normal_edge, simple_edge, FilterParams};

    #[test]
    fn small_steps_are_smoothed() {
        // a 1x8 row with a step of 10 in the middle
        let mut row = [60_u8, 60, 60, 60, 70, 70, 70, 70];
        simple_edge(&mut row, 4, 1, 1, 1, 30);
        assert!(row[3] > 60 && row[4] < 70);
    }

    #[test]
    fn real_edges_are_kept() {
        let mut row = [0_u8, 0, 0, 0, 255, 255, 255, 255];
        let params = FilterParams {
            limit:          10,
            interior_limit: 5,
            hev_threshold:  1
        };
        normal_edge(&mut row, 4, 1, 1, 1, params.limit, &params, false);
        assert_eq!(row, [0, 0, 0, 0, 255, 255, 255, 255]);
    }
}
