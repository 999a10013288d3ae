/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Boolean entropy coder of VP8
//!
//! Every bit is coded with an 8 bit probability of it being zero,
//! the coder keeps an interval that is split in proportion to that
//! probability on each call.
use alloc::vec::Vec;

pub struct BoolDecoder<'a> {
    data:      &'a [u8],
    position:  usize,
    value:     u32,
    range:     u32,
    bit_count: u32,
    // zero bytes handed out after the data ran out
    over_read: usize
}

impl<'a> BoolDecoder<'a> {
    pub fn new(data: &'a [u8]) -> BoolDecoder<'a> {
        let mut decoder = BoolDecoder {
            data,
            position: 0,
            value: 0,
            range: 255,
            bit_count: 0,
            over_read: 0
        };
        let first = decoder.next_byte();
        let second = decoder.next_byte();
        decoder.value = (first << 8) | second;
        decoder
    }

    #[inline(always)]
    fn next_byte(&mut self) -> u32 {
        match self.data.get(self.position) {
            Some(byte) => {
                self.position += 1;
                u32::from(*byte)
            }
            None => {
                self.over_read += 1;
                0
            }
        }
    }

    /// Read one bit whose probability of being zero is `prob / 256`
    #[inline(always)]
    pub fn read_bool(&mut self, prob: u8) -> bool {
        let split = 1 + (((self.range - 1) * u32::from(prob)) >> 8);
        let big_split = split << 8;

        let bit = if self.value >= big_split {
            self.range -= split;
            self.value -= big_split;
            true
        } else {
            self.range = split;
            false
        };
        while self.range < 128 {
            self.value <<= 1;
            self.range <<= 1;
            self.bit_count += 1;

            if self.bit_count == 8 {
                self.bit_count = 0;
                self.value |= self.next_byte();
            }
        }
        bit
    }

    /// Read a bit with even odds
    #[inline(always)]
    pub fn read_flag(&mut self) -> bool {
        self.read_bool(128)
    }

    /// Read an `bits` wide unsigned value, most significant bit first
    pub fn read_literal(&mut self, bits: u8) -> u32 {
        let mut value = 0;

        for _ in 0..bits {
            value = (value << 1) | u32::from(self.read_flag());
        }
        value
    }

    /// A magnitude followed by a sign bit
    pub fn read_signed(&mut self, bits: u8) -> i32 {
        let value = self.read_literal(bits) as i32;

        if self.read_flag() {
            -value
        } else {
            value
        }
    }

    /// A presence flag followed by a signed value, zero when absent
    pub fn read_optional_signed(&mut self, bits: u8) -> i32 {
        if self.read_flag() {
            self.read_signed(bits)
        } else {
            0
        }
    }

    /// Return true if the decoder needed bytes past the end of its data
    ///
    /// The decoder always holds one byte of look ahead, so a single
    /// phantom byte is still part of a complete stream.
    pub const fn is_exhausted(&self) -> bool {
        self.over_read > 1
    }
}

pub struct BoolEncoder {
    out:       Vec<u8>,
    range:     u32,
    bottom:    u32,
    bit_count: i32
}

impl BoolEncoder {
    pub fn new() -> BoolEncoder {
        BoolEncoder {
            out:       Vec::new(),
            range:     255,
            bottom:    0,
            bit_count: 24
        }
    }

    /// Propagate a carry into bytes already written
    fn add_one_to_output(&mut self) {
        for byte in self.out.iter_mut().rev() {
            if *byte == 255 {
                *byte = 0;
            } else {
                *byte += 1;
                return;
            }
        }
    }

    #[inline(always)]
    pub fn put_bool(&mut self, prob: u8, bit: bool) {
        let split = 1 + (((self.range - 1) * u32::from(prob)) >> 8);

        if bit {
            self.bottom = self.bottom.wrapping_add(split);
            self.range -= split;
        } else {
            self.range = split;
        }
        while self.range < 128 {
            self.range <<= 1;

            if self.bottom & (1 << 31) != 0 {
                self.add_one_to_output();
            }
            self.bottom <<= 1;
            self.bit_count -= 1;

            if self.bit_count == 0 {
                self.out.push((self.bottom >> 24) as u8);
                self.bottom &= (1 << 24) - 1;
                self.bit_count = 8;
            }
        }
    }

    #[inline(always)]
    pub fn put_flag(&mut self, bit: bool) {
        self.put_bool(128, bit);
    }

    pub fn put_literal(&mut self, value: u32, bits: u8) {
        for shift in (0..bits).rev() {
            self.put_flag((value >> shift) & 1 == 1);
        }
    }

    /// Flush the interval and return the coded bytes
    pub fn finish(mut self) -> Vec<u8> {
        for _ in 0..32 {
            self.put_flag(false);
        }
        self.out
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use nanorand::{Rng, WyRand};

    use crate::lossy::arith::{BoolDecoder, BoolEncoder};

    #[test]
    fn decoder_reads_what_encoder_wrote() {
        let mut rng = WyRand::new_seed(7);
        let bits: Vec<(u8, bool)> = (0..5000)
            .map(|_| {
                let prob = rng.generate_range(1_u8..255);
                (prob, rng.generate::<u8>() >= prob)
            })
            .collect();

        let mut encoder = BoolEncoder::new();
        encoder.put_literal(0x5a, 7);
        for &(prob, bit) in &bits {
            encoder.put_bool(prob, bit);
        }
        let data = encoder.finish();

        let mut decoder = BoolDecoder::new(&data);
        assert_eq!(decoder.read_literal(7), 0x5a);
        for &(prob, bit) in &bits {
            assert_eq!(decoder.read_bool(prob), bit);
        }
        assert!(!decoder.is_exhausted());
    }

    #[test]
    fn signed_values() {
        let mut encoder = BoolEncoder::new();
        // flag, magnitude 5 in four bits, negative sign
        encoder.put_flag(true);
        encoder.put_literal(5, 4);
        encoder.put_flag(true);
        encoder.put_flag(false);
        let data = encoder.finish();

        let mut decoder = BoolDecoder::new(&data);
        assert_eq!(decoder.read_optional_signed(4), -5);
        assert_eq!(decoder.read_optional_signed(4), 0);
    }

    #[test]
    fn running_out_is_reported() {
        let mut decoder = BoolDecoder::new(&[0x12]);
        for _ in 0..64 {
            decoder.read_flag();
        }
        assert!(decoder.is_exhausted());
    }
}
