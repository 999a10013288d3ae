/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//!Miscellaneous stuff
use core::fmt;

/// Start of baseline DCT Huffman coding
pub const START_OF_FRAME_BASE: u16 = 0xffc0;

/// Start of another frame
pub const START_OF_FRAME_EXT_SEQ: u16 = 0xffc1;

/// Start of progressive DCT encoding
pub const START_OF_FRAME_PROG_DCT: u16 = 0xffc2;

/// Start of Lossless sequential Huffman coding
pub const START_OF_FRAME_LOS_SEQ: u16 = 0xffc3;

/// Start of extended sequential DCT arithmetic coding
pub const START_OF_FRAME_EXT_AR: u16 = 0xffc9;

/// Start of Progressive DCT arithmetic coding
pub const START_OF_FRAME_PROG_DCT_AR: u16 = 0xffca;

/// Start of Lossless sequential Arithmetic coding
pub const START_OF_FRAME_LOS_SEQ_AR: u16 = 0xffcb;

/// Undo run length encoding of coefficients by placing them in natural order
#[rustfmt::skip]
pub const UN_ZIGZAG: [usize; 64] = [
     0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// Markers that identify the supported Start of Frame types
#[derive(Eq, PartialEq, Copy, Clone, Default)]
pub enum SOFMarkers {
    /// Baseline DCT markers
    #[default]
    BaselineDct,
    /// SOF_1 Extended sequential DCT,Huffman coding
    ExtendedSequentialHuffman
}

impl SOFMarkers {
    /// Create a marker from an integer
    pub fn from_int(int: u16) -> Option<SOFMarkers> {
        match int {
            START_OF_FRAME_BASE => Some(Self::BaselineDct),
            START_OF_FRAME_EXT_SEQ => Some(Self::ExtendedSequentialHuffman),
            _ => None
        }
    }
}

impl fmt::Debug for SOFMarkers {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            Self::BaselineDct => write!(f, "Baseline DCT"),
            Self::ExtendedSequentialHuffman => {
                write!(f, "Extended sequential DCT, Huffman Coding")
            }
        }
    }
}

/// Undo zig-zag ordering of a quantization table
pub fn un_zig_zag<T>(a: &[T; 64]) -> [i32; 64]
where
    T: Copy,
    i32: From<T>
{
    let mut output = [0; 64];

    for (zigzag, natural) in UN_ZIGZAG.iter().enumerate() {
        output[*natural] = i32::from(a[zigzag]);
    }
    output
}

#[cfg(test)]
mod tests {
    use crate::misc::{un_zig_zag, UN_ZIGZAG};

    #[test]
    fn zigzag_is_a_permutation() {
        let mut seen = [false; 64];
        for pos in UN_ZIGZAG {
            assert!(!seen[pos]);
            seen[pos] = true;
        }
    }

    #[test]
    fn un_zig_zag_places_values() {
        let input: [u8; 64] = core::array::from_fn(|i| i as u8);
        let output = un_zig_zag(&input);
        // second zig-zag entry is the first row, second column
        assert_eq!(output[1], 1);
        // third is the second row, first column
        assert_eq!(output[8], 2);
        assert_eq!(output[63], 63);
    }
}
