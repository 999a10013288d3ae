/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Lossless (VP8L) coding
//!
//! Pixels are handled as packed `0xAARRGGBB` words throughout.
pub mod decoder;
pub mod encoder;
pub mod transforms;

/// First byte of every VP8L stream
pub const VP8L_SIGNATURE: u8 = 0x2f;
/// Signature, dimensions, alpha hint and version
pub const VP8L_HEADER_SIZE: usize = 5;

pub(crate) const NUM_LITERAL_CODES: usize = 256;
pub(crate) const NUM_LENGTH_CODES: usize = 24;
pub(crate) const NUM_DISTANCE_CODES: usize = 40;
pub(crate) const NUM_CODE_LENGTH_CODES: usize = 19;
pub(crate) const MAX_CACHE_BITS: u8 = 11;

/// Order in which code length code lengths are stored
pub(crate) const CODE_LENGTH_ORDER: [usize; NUM_CODE_LENGTH_CODES] =
    [17, 18, 0, 1, 2, 3, 4, 5, 16, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];

/// Two dimensional neighbourhood of the short distance codes,
/// `(dy << 4) | (8 - dx)` for distance code `i + 1`
pub(crate) const CODE_TO_PLANE: [u8; 120] = [
    0x18, 0x07, 0x17, 0x19, 0x28, 0x06, 0x27, 0x29, 0x16, 0x1a, 0x26, 0x2a, 0x38, 0x05, 0x37, 0x39,
    0x15, 0x1b, 0x36, 0x3a, 0x25, 0x2b, 0x48, 0x04, 0x47, 0x49, 0x14, 0x1c, 0x35, 0x3b, 0x46, 0x4a,
    0x24, 0x2c, 0x58, 0x45, 0x4b, 0x34, 0x3c, 0x03, 0x57, 0x59, 0x13, 0x1d, 0x56, 0x5a, 0x23, 0x2d,
    0x44, 0x4c, 0x55, 0x5b, 0x33, 0x3d, 0x68, 0x02, 0x67, 0x69, 0x12, 0x1e, 0x66, 0x6a, 0x22, 0x2e,
    0x54, 0x5c, 0x43, 0x4d, 0x65, 0x6b, 0x32, 0x3e, 0x78, 0x01, 0x77, 0x79, 0x53, 0x5d, 0x11, 0x1f,
    0x64, 0x6c, 0x42, 0x4e, 0x76, 0x7a, 0x21, 0x2f, 0x75, 0x7b, 0x31, 0x3f, 0x63, 0x6d, 0x52, 0x5e,
    0x00, 0x74, 0x7c, 0x41, 0x4f, 0x10, 0x20, 0x62, 0x6e, 0x30, 0x73, 0x7d, 0x51, 0x5f, 0x40, 0x72,
    0x7e, 0x61, 0x6f, 0x50, 0x71, 0x7f, 0x60, 0x70
];

#[inline]
pub(crate) const fn div_round_up(size: usize, bits: usize) -> usize {
    (size + (1 << bits) - 1) >> bits
}

/// Index of `argb` in a color cache of `1 << bits` entries
#[inline]
pub(crate) const fn cache_index(argb: u32, bits: u8) -> usize {
    (argb.wrapping_mul(0x1e35_a7bd) >> (32 - bits)) as usize
}

/// Pixel distance of a backward reference distance code
pub(crate) fn plane_distance(width: usize, code: usize) -> usize {
    if code > CODE_TO_PLANE.len() {
        return code - CODE_TO_PLANE.len();
    }
    let entry = CODE_TO_PLANE[code - 1];
    let dy = (entry >> 4) as isize;
    let dx = 8 - (entry & 15) as isize;
    let distance = dy * width as isize + dx;

    distance.max(1) as usize
}

/// Prefix symbol of a length or distance value, extra bit count and
/// extra bits
pub(crate) fn value_to_prefix(value: usize) -> (usize, u8, u32) {
    let n = value - 1;
    if n < 4 {
        return (n, 0, 0);
    }
    let high_bit = (usize::BITS - 1 - n.leading_zeros()) as usize;
    let second = (n >> (high_bit - 1)) & 1;
    let extra_bits = high_bit - 1;

    (
        2 * high_bit + second,
        extra_bits as u8,
        (n & ((1 << extra_bits) - 1)) as u32
    )
}

#[cfg(test)]
mod tests {
    use crate::lossless::{plane_distance, value_to_prefix, CODE_TO_PLANE};

    #[test]
    fn prefix_bounds() {
        assert_eq!(value_to_prefix(1), (0, 0, 0));
        assert_eq!(value_to_prefix(4), (3, 0, 0));
        // 5 and 6 share symbol 4 with one extra bit
        assert_eq!(value_to_prefix(5), (4, 1, 0));
        assert_eq!(value_to_prefix(6), (4, 1, 1));
        assert_eq!(value_to_prefix(7), (5, 1, 0));
        assert_eq!(value_to_prefix(4096).0, 23);
    }

    #[test]
    fn short_codes_map_to_neighbours() {
        // code 1 is the pixel above, code 2 the one to the left
        assert_eq!(plane_distance(100, 1), 100);
        assert_eq!(plane_distance(100, 2), 1);
        assert_eq!(plane_distance(100, 121), 1);
        assert_eq!(plane_distance(100, 150), 30);
        // clamped for narrow images
        assert_eq!(plane_distance(1, 4), 1);
        assert_eq!(CODE_TO_PLANE.len(), 120);
    }
}
