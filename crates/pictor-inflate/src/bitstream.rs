/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! `BitStreamReader` and `BitStreamWriter` API
//!
//! This module provides an interface to read and write bits (and bytes)
//! in least significant bit first order, the order used by deflate and
//! webp lossless.
use alloc::vec::Vec;

pub struct BitStreamReader<'src> {
    // buffer from which we are pulling in bits from
    // used in decompression.
    src:       &'src [u8],
    // position in our buffer,
    position:  usize,
    // zero bytes fed into the buffer after the source ran out
    over_read: usize,
    bits_left: u8,
    buffer:    u64
}

impl<'src> BitStreamReader<'src> {
    /// Create a new `BitStreamReader` instance
    pub fn new(in_buffer: &'src [u8]) -> BitStreamReader<'src> {
        BitStreamReader {
            bits_left: 0,
            buffer:    0,
            src:       in_buffer,
            position:  0,
            over_read: 0
        }
    }
    /// Refill the bitstream ensuring the buffer has bits between
    /// 56 and 63.
    ///
    /// Past the end of the source the buffer is padded with zeroes,
    /// [`is_overrun`](Self::is_overrun) reports if any of them were consumed.
    #[inline(always)]
    pub fn refill(&mut self) {
        if self.bits_left >= 56 {
            return;
        }
        match self.src.get(self.position..self.position + 8) {
            Some(bytes) => {
                let mut buf = [0; 8];
                buf.copy_from_slice(bytes);
                // create a u64 from an array of u8's
                let new_buffer = u64::from_le_bytes(buf);
                // num indicates how many bytes we actually consumed.
                let num = 63 ^ self.bits_left;
                // offset position
                self.position += (num >> 3) as usize;
                // shift number of bits
                self.buffer |= new_buffer << self.bits_left;
                // update bits left
                // bits left are now between 56-63
                self.bits_left |= 56;
            }
            None => self.refill_slow()
        }
    }
    #[inline(never)]
    fn refill_slow(&mut self) {
        while self.bits_left < 56 {
            let byte = match self.src.get(self.position) {
                Some(byte) => {
                    self.position += 1;
                    *byte
                }
                None => {
                    self.over_read += 1;
                    0
                }
            };
            self.buffer |= u64::from(byte) << self.bits_left;
            self.bits_left += 8;
        }
    }

    /// Look at the next `num_bits` bits without consuming them
    #[inline(always)]
    pub fn peek_bits(&mut self, num_bits: u8) -> u64 {
        debug_assert!(num_bits <= 56);
        if self.bits_left < num_bits {
            self.refill();
        }
        self.buffer & ((1_u64 << num_bits) - 1)
    }

    /// Read `num_bits` bits, at most 56 at a time
    #[inline(always)]
    pub fn get_bits(&mut self, num_bits: u8) -> u64 {
        if num_bits == 0 {
            return 0;
        }
        let value = self.peek_bits(num_bits);
        self.drop_bits(num_bits);
        value
    }

    #[inline(always)]
    pub fn drop_bits(&mut self, bits: u8) {
        debug_assert!(self.bits_left >= bits);
        self.bits_left -= bits;
        self.buffer >>= bits;
    }
    /// Get number of bits left in the bit buffer.
    pub const fn get_bits_left(&self) -> u8 {
        self.bits_left
    }

    /// Reset buffer and bits left to zero.
    pub fn reset(&mut self) {
        self.buffer = 0;
        self.bits_left = 0;
        self.over_read = 0;
    }

    /// Discard bits until the stream sits on a byte boundary
    pub fn align_to_byte(&mut self) {
        let extra = self.bits_left % 8;
        self.drop_bits(extra);
    }

    /// Copy `count` whole bytes into `sink`
    ///
    /// The stream must be byte aligned. Returns false if the source does
    /// not have enough bytes.
    pub fn read_aligned_bytes(&mut self, sink: &mut Vec<u8>, count: usize) -> bool {
        debug_assert_eq!(self.bits_left % 8, 0);
        let mut count = count;
        // drain what the bit buffer already holds
        while count > 0 && self.bits_left >= 8 {
            sink.push(self.get_bits(8) as u8);
            count -= 1;
        }
        if self.is_overrun() {
            return false;
        }
        if count == 0 {
            return true;
        }
        // the fast refill may have loaded bits past `position`,
        // they are stale once `position` moves
        self.reset();

        match self.src.get(self.position..self.position + count) {
            Some(bytes) => {
                sink.extend_from_slice(bytes);
                self.position += count;
                true
            }
            None => false
        }
    }
    /// Return true if the reader handed out bits that were not in the source
    #[inline(always)]
    pub const fn is_overrun(&self) -> bool {
        self.over_read * 8 > self.bits_left as usize
    }

    /// Return the number of whole source bytes not yet consumed,
    /// counting what sits unread in the bit buffer.
    pub const fn remaining_bytes(&self) -> usize {
        let buffered = (self.bits_left / 8) as usize;
        let real_buffered = buffered.saturating_sub(self.over_read);
        self.src.len().saturating_sub(self.position) + real_buffered
    }
}

/// Accumulates bits least significant first and emits whole bytes
#[derive(Default)]
pub struct BitStreamWriter {
    buffer: u64,
    bits:   u8,
    out:    Vec<u8>
}

impl BitStreamWriter {
    pub fn new() -> BitStreamWriter {
        BitStreamWriter::default()
    }
    pub fn with_capacity(capacity: usize) -> BitStreamWriter {
        BitStreamWriter {
            buffer: 0,
            bits:   0,
            out:    Vec::with_capacity(capacity)
        }
    }
    /// Write the low `num_bits` bits of `value`, at most 32 at a time
    #[inline(always)]
    pub fn put_bits(&mut self, value: u32, num_bits: u8) {
        debug_assert!(num_bits <= 32);
        debug_assert!(num_bits == 32 || value >> num_bits == 0);

        self.buffer |= u64::from(value) << self.bits;
        self.bits += num_bits;

        while self.bits >= 8 {
            self.out.push(self.buffer as u8);
            self.buffer >>= 8;
            self.bits -= 8;
        }
    }
    /// Pad with zero bits up to the next byte boundary
    pub fn align_to_byte(&mut self) {
        if self.bits > 0 {
            self.out.push(self.buffer as u8);
            self.buffer = 0;
            self.bits = 0;
        }
    }
    /// Append bytes, the writer must be byte aligned
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        debug_assert_eq!(self.bits, 0);
        self.out.extend_from_slice(bytes);
    }
    /// Number of bits written so far
    pub fn bits_written(&self) -> usize {
        self.out.len() * 8 + usize::from(self.bits)
    }
    /// Flush remaining bits and return the bytes
    pub fn finish(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.out
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use crate::bitstream::{BitStreamReader, BitStreamWriter};

    #[test]
    fn writer_reader_agree() {
        let mut writer = BitStreamWriter::new();
        writer.put_bits(0b101, 3);
        writer.put_bits(0x1234, 16);
        writer.put_bits(1, 1);
        let bytes = writer.finish();

        let mut reader = BitStreamReader::new(&bytes);
        assert_eq!(reader.get_bits(3), 0b101);
        assert_eq!(reader.get_bits(16), 0x1234);
        assert_eq!(reader.get_bits(1), 1);
        assert!(!reader.is_overrun());
    }

    #[test]
    fn aligned_copy_resumes_at_the_right_byte() {
        let data: Vec<u8> = (0..32).collect();
        let mut reader = BitStreamReader::new(&data);
        assert_eq!(reader.get_bits(8), 0);

        // part of the copy comes from the bit buffer, the rest from the source
        let mut sink = Vec::new();
        assert!(reader.read_aligned_bytes(&mut sink, 10));
        assert_eq!(sink, (1..=10).collect::<Vec<u8>>());

        assert_eq!(reader.get_bits(8), 11);
        assert_eq!(reader.get_bits(16), u64::from(u16::from_le_bytes([12, 13])));
    }

    #[test]
    fn reading_past_end_is_detected() {
        let data = [0xff_u8];
        let mut reader = BitStreamReader::new(&data);
        assert_eq!(reader.get_bits(8), 0xff);
        assert!(!reader.is_overrun());
        reader.get_bits(1);
        assert!(reader.is_overrun());
    }
}
