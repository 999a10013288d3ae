/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! This file contains a single struct `HuffmanTable` that
//! stores Huffman tables needed during `BitStream` decoding.
use alloc::format;

use crate::errors::DecodeErrors;

/// Determines how many bits of lookahead we have for our bitstream decoder.
pub const HUFF_LOOKAHEAD: u8 = 9;

/// A struct which contains necessary tables for decoding a JPEG
/// huffman encoded bitstream
pub struct HuffmanTable {
    /// Largest code of length k, -1 if no codes of that length exist
    pub(crate) maxcode:  [i32; 18],
    /// Value added to a code of length k to find its index in `values`
    pub(crate) offset:   [i32; 18],
    /// Lookup table for codes of `HUFF_LOOKAHEAD` bits or less.
    ///
    /// Each entry is `(code length << 8) | symbol`, zero means the code
    /// is longer than the lookahead
    pub(crate) lookup:   [u16; 1 << HUFF_LOOKAHEAD],
    /// Symbols in order of increasing code length
    pub(crate) values:   [u8; 256],
    /// Number of symbols in the table
    pub(crate) num_syms: usize
}

impl HuffmanTable {
    /// Build a table from the DHT code length counts and symbols.
    ///
    /// `codes[1..=16]` holds the number of codes of each length
    pub fn new(codes: &[u8; 17], values: [u8; 256]) -> Result<HuffmanTable, DecodeErrors> {
        let mut table = HuffmanTable {
            maxcode: [-1; 18],
            offset: [0; 18],
            lookup: [0; 1 << HUFF_LOOKAHEAD],
            values,
            num_syms: 0
        };
        table.make_derived_table(codes)?;

        Ok(table)
    }

    /// Compute derived values for a Huffman table
    ///
    /// This routine performs some validation checks on the table
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn make_derived_table(&mut self, num_symbols: &[u8; 17]) -> Result<(), DecodeErrors> {
        // canonical code assignment, section C.2 of the standard
        let mut code: i32 = 0;
        let mut index: i32 = 0;

        for length in 1..=16_usize {
            let count = i32::from(num_symbols[length]);

            if count > 0 {
                // offset turns a code of this length into an index into values
                self.offset[length] = index - code;

                for _ in 0..count {
                    // codes of a length must fit in that many bits
                    if code >= (1 << length) {
                        return Err(DecodeErrors::HuffmanDecode(format!(
                            "Bad Huffman Table, more codes than fit in {length} bits"
                        )));
                    }
                    if index >= 256 {
                        return Err(DecodeErrors::HuffmanDecode(format!(
                            "Bad Huffman Table, {index} symbols is more than 256"
                        )));
                    }
                    if length <= usize::from(HUFF_LOOKAHEAD) {
                        let shift = usize::from(HUFF_LOOKAHEAD) - length;
                        let start = (code as usize) << shift;
                        let entry = ((length as u16) << 8) | u16::from(self.values[index as usize]);

                        self.lookup[start..start + (1 << shift)].fill(entry);
                    }
                    code += 1;
                    index += 1;
                }
                self.maxcode[length] = code - 1;
            }
            code <<= 1;
        }
        self.num_syms = index as usize;
        // sentinel, ensures the slow path terminates
        self.maxcode[17] = i32::MAX;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::huffman::{HuffmanTable, HUFF_LOOKAHEAD};

    #[test]
    fn short_codes_fill_the_lookup_table() {
        // two codes of length 1 and two of length 2 is over subscribed
        let mut counts = [0_u8; 17];
        counts[1] = 2;
        counts[2] = 2;
        assert!(HuffmanTable::new(&counts, [0; 256]).is_err());

        // one code of length 1 ("0"), two of length 2 ("10","11")
        let mut counts = [0_u8; 17];
        counts[1] = 1;
        counts[2] = 2;
        let mut values = [0_u8; 256];
        values[..3].copy_from_slice(&[5, 6, 7]);

        let table = HuffmanTable::new(&counts, values).unwrap();
        let half = 1 << (HUFF_LOOKAHEAD - 1);
        assert_eq!(table.lookup[0], (1 << 8) | 5);
        assert_eq!(table.lookup[half - 1], (1 << 8) | 5);
        assert_eq!(table.lookup[half], (2 << 8) | 6);
        assert_eq!(table.lookup[(1 << HUFF_LOOKAHEAD) - 1], (2 << 8) | 7);
        assert_eq!(table.num_syms, 3);
    }

    #[test]
    fn oversubscribed_short_codes_are_rejected() {
        // three one bit codes would run past the lookup table
        let mut counts = [0_u8; 17];
        counts[1] = 3;
        assert!(HuffmanTable::new(&counts, [0; 256]).is_err());

        let mut counts = [0_u8; 17];
        counts[3] = 9;
        assert!(HuffmanTable::new(&counts, [0; 256]).is_err());

        // a complete code is fine, one more is not
        let mut counts = [0_u8; 17];
        counts[2] = 4;
        assert!(HuffmanTable::new(&counts, [0; 256]).is_ok());
        counts[3] = 1;
        assert!(HuffmanTable::new(&counts, [0; 256]).is_err());
    }

    #[test]
    fn long_codes_use_maxcode() {
        // 255 codes of length 8 and one of length 12
        let mut counts = [0_u8; 17];
        counts[8] = 255;
        counts[12] = 1;
        let table = HuffmanTable::new(&counts, [1; 256]).unwrap();
        assert_eq!(table.maxcode[8], 254);
        // 255 << 4 is the only 12 bit code
        assert_eq!(table.maxcode[12], 255 << 4);
        assert_eq!(table.offset[12] + (255 << 4), 255);
    }
}
