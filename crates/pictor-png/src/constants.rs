/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

pub const PNG_SIGNATURE: u64 = 0x89504E470D0A1A0A;

pub const PNG_SIGNATURE_BYTES: [u8; 8] = PNG_SIGNATURE.to_be_bytes();

/// Size of the payload of each IDAT chunk written by the encoder
pub const IDAT_CHUNK_SIZE: usize = 8192;

/// Adam7 pass origins and spacing
pub const ADAM7_X_ORIGIN: [usize; 7] = [0, 4, 0, 2, 0, 1, 0];
pub const ADAM7_Y_ORIGIN: [usize; 7] = [0, 0, 4, 0, 2, 0, 1];
pub const ADAM7_X_SPACING: [usize; 7] = [8, 8, 4, 4, 2, 2, 1];
pub const ADAM7_Y_SPACING: [usize; 7] = [8, 8, 8, 4, 4, 2, 2];

/// Multipliers that scale 1, 2 and 4 bit gray samples to the full byte range
pub const DEPTH_SCALE_TABLE: [u8; 9] = [0, 0xff, 0x55, 0, 0x11, 0, 0, 0, 0x01];
