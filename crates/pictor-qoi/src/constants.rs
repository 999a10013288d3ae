/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

pub const QOI_OP_INDEX: u8 = 0x00; /* 00xxxxxx */
pub const QOI_OP_DIFF: u8 = 0x40; /* 01xxxxxx */
pub const QOI_OP_LUMA: u8 = 0x80; /* 10xxxxxx */
pub const QOI_OP_RUN: u8 = 0xc0; /* 11xxxxxx */
pub const QOI_OP_RGB: u8 = 0xfe; /* 11111110 */
pub const QOI_OP_RGBA: u8 = 0xff; /* 11111111 */

pub const QOI_MASK_2: u8 = 0xc0; /* 11000000 */

/// `qoif` as a big endian integer
pub const QOI_MAGIC: u32 = u32::from_be_bytes(*b"qoif");

pub const QOI_HEADER_SIZE: usize = 14;
pub const QOI_PADDING: usize = 8;

/// Bytes that terminate every stream
pub const QOI_END_MARKER: [u8; QOI_PADDING] = [0, 0, 0, 0, 0, 0, 0, 1];

/// Longest run a single `QOI_OP_RUN` can express
pub const QOI_MAX_RUN: u8 = 62;

/// Position of `px` in the 64 entry color index
#[inline(always)]
pub const fn color_hash(px: [u8; 4]) -> usize {
    (px[0] as usize * 3 + px[1] as usize * 5 + px[2] as usize * 7 + px[3] as usize * 11) % 64
}
