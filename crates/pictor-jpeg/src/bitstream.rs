/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! This file exposes a single struct that can decode a huffman encoded
//! Bitstream in a JPEG file
//!
//! Bits are kept in a 64 bit buffer aligned to the most significant bit,
//! bytes are pulled in until a marker is found, after which the buffer is
//! padded with zeroes.
use alloc::format;

use pictor_core::bytestream::{ZByteReaderTrait, ZReader};
use pictor_core::log::trace;

use crate::errors::DecodeErrors;
use crate::huffman::{HuffmanTable, HUFF_LOOKAHEAD};
use crate::marker::Marker;
use crate::misc::UN_ZIGZAG;

/// How many padding bytes past the end of the data we tolerate before
/// declaring the stream truncated
const MAX_OVERREAD: usize = 64;

/// A `BitStream` struct, a bit by bit reader with super powers
pub(crate) struct BitStream {
    /// A MSB aligned buffer of bits
    buffer:          u64,
    /// Number of valid bits in `buffer`
    bits_left:       u8,
    /// The marker that stopped the entropy coded data, if any
    pub marker:      Option<Marker>,
    /// Number of zero bytes stuffed after the input ended
    pub overread_by: usize
}

impl BitStream {
    /// Create a new BitStream
    pub(crate) const fn new() -> BitStream {
        BitStream {
            buffer:      0,
            bits_left:   0,
            marker:      None,
            overread_by: 0
        }
    }

    /// Fill the buffer with at least 57 bits
    ///
    /// Byte stuffing (`0xFF00`) is undone here and markers are recorded
    #[inline]
    fn refill<T: ZByteReaderTrait>(&mut self, reader: &mut ZReader<T>) -> Result<(), DecodeErrors> {
        while self.bits_left <= 56 {
            let byte = if self.marker.is_some() {
                0
            } else {
                match self.next_byte(reader)? {
                    Some(byte) => byte,
                    None => {
                        self.overread_by += 1;
                        0
                    }
                }
            };
            self.buffer |= u64::from(byte) << (56 - self.bits_left);
            self.bits_left += 8;
        }
        Ok(())
    }

    /// Read the next data byte, `None` once a marker or the end of the
    /// input is reached
    fn next_byte<T: ZByteReaderTrait>(
        &mut self, reader: &mut ZReader<T>
    ) -> Result<Option<u8>, DecodeErrors> {
        if reader.eof()? {
            return Ok(None);
        }
        let byte = reader.get_u8_err()?;

        if byte != 0xFF {
            return Ok(Some(byte));
        }
        // fill bytes, 0xFF 0xFF ...
        let mut next = 0xFF;

        while next == 0xFF {
            if reader.eof()? {
                return Ok(None);
            }
            next = reader.get_u8_err()?;
        }
        if next == 0x00 {
            // stuffed byte
            return Ok(Some(0xFF));
        }
        match Marker::from_u8(next) {
            Some(marker) => {
                trace!("Found marker {marker:?} in entropy coded data");
                self.marker = Some(marker);
                Ok(None)
            }
            None => Err(DecodeErrors::MCUError(format!(
                "Unknown marker 0xFF{next:X} in entropy coded data"
            )))
        }
    }

    /// True if the stream ended without a marker and we padded more than
    /// a block could ever need
    pub(crate) const fn is_exhausted(&self) -> bool {
        self.marker.is_none() && self.overread_by > MAX_OVERREAD
    }

    #[inline(always)]
    const fn peek_bits(&self, bits: u8) -> u32 {
        (self.buffer >> (64 - bits as u32)) as u32
    }

    #[inline(always)]
    fn drop_bits(&mut self, bits: u8) {
        self.buffer <<= bits;
        self.bits_left -= bits;
    }

    /// Read `bits` bits, `bits` must be between 1 and 16
    #[inline]
    fn get_bits<T: ZByteReaderTrait>(
        &mut self, reader: &mut ZReader<T>, bits: u8
    ) -> Result<u32, DecodeErrors> {
        if self.bits_left < bits {
            self.refill(reader)?;
        }
        let value = self.peek_bits(bits);
        self.drop_bits(bits);
        Ok(value)
    }

    /// Decode one huffman symbol
    #[inline]
    pub(crate) fn decode_huff<T: ZByteReaderTrait>(
        &mut self, reader: &mut ZReader<T>, table: &HuffmanTable
    ) -> Result<u8, DecodeErrors> {
        if self.bits_left < 16 {
            self.refill(reader)?;
        }
        let entry = table.lookup[self.peek_bits(HUFF_LOOKAHEAD) as usize];

        if entry != 0 {
            self.drop_bits((entry >> 8) as u8);
            return Ok((entry & 0xFF) as u8);
        }
        // slow path, codes longer than the lookahead
        for length in (HUFF_LOOKAHEAD + 1)..=16 {
            let code = self.peek_bits(length) as i32;

            if code <= table.maxcode[usize::from(length)] {
                self.drop_bits(length);

                let index = (code + table.offset[usize::from(length)]) as usize;

                return table
                    .values
                    .get(index)
                    .filter(|_| index < table.num_syms)
                    .copied()
                    .ok_or_else(|| {
                        DecodeErrors::HuffmanDecode(format!("Bad Huffman code index {index}"))
                    });
            }
        }
        Err(DecodeErrors::HuffmanDecode(format!(
            "Bad Huffman code 0x{:04X}, corrupt JPEG",
            self.peek_bits(16)
        )))
    }

    /// Read `size` bits and extend them to a signed value, section F.2.2.1
    #[inline]
    pub(crate) fn receive_extend<T: ZByteReaderTrait>(
        &mut self, reader: &mut ZReader<T>, size: u8
    ) -> Result<i32, DecodeErrors> {
        if size == 0 {
            return Ok(0);
        }
        let value = self.get_bits(reader, size)? as i32;

        if value < (1 << (size - 1)) {
            Ok(value - (1 << size) + 1)
        } else {
            Ok(value)
        }
    }

    /// Decode a single block of 64 coefficients, dequantized and in
    /// natural order
    ///
    /// `block` must be zeroed by the caller
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn decode_mcu_block<T: ZByteReaderTrait>(
        &mut self, reader: &mut ZReader<T>, dc_table: &HuffmanTable, ac_table: &HuffmanTable,
        qt_table: &[i32; 64], block: &mut [i32; 64], dc_prediction: &mut i32
    ) -> Result<(), DecodeErrors> {
        let size = self.decode_huff(reader, dc_table)?;

        if size > 11 {
            return Err(DecodeErrors::HuffmanDecode(format!(
                "Invalid DC difference magnitude {size}"
            )));
        }
        let diff = self.receive_extend(reader, size)?;

        *dc_prediction = dc_prediction.wrapping_add(diff);
        block[0] = dc_prediction.wrapping_mul(qt_table[0]);

        let mut k = 1;

        while k < 64 {
            let rs = self.decode_huff(reader, ac_table)?;
            let run = usize::from(rs >> 4);
            let size = rs & 0x0F;

            if size == 0 {
                if run != 15 {
                    // end of block
                    break;
                }
                // sixteen zeroes
                k += 16;
                continue;
            }
            k += run;

            if k > 63 {
                return Err(DecodeErrors::MCUError(format!(
                    "Coefficient index {k} outside of a block, corrupt JPEG"
                )));
            }
            let value = self.receive_extend(reader, size)?;
            let pos = UN_ZIGZAG[k];

            block[pos] = value.wrapping_mul(qt_table[pos]);
            k += 1;
        }
        Ok(())
    }

    /// Discard buffered bits and the marker after a restart
    pub(crate) fn reset(&mut self) {
        self.buffer = 0;
        self.bits_left = 0;
        self.marker = None;
    }
}

#[cfg(test)]
mod tests {
    use pictor_core::bytestream::{ZCursor, ZReader};

    use crate::bitstream::BitStream;
    use crate::marker::Marker;

    #[test]
    fn stuffed_bytes_and_markers() {
        let data = [0xAB_u8, 0xFF, 0x00, 0x12, 0xFF, 0xD9];
        let mut reader = ZReader::new(ZCursor::new(&data[..]));
        let mut stream = BitStream::new();

        assert_eq!(stream.get_bits(&mut reader, 8).unwrap(), 0xAB);
        assert_eq!(stream.get_bits(&mut reader, 8).unwrap(), 0xFF);
        assert_eq!(stream.get_bits(&mut reader, 8).unwrap(), 0x12);
        // padding after the marker
        assert_eq!(stream.get_bits(&mut reader, 16).unwrap(), 0);
        assert_eq!(stream.marker, Some(Marker::EOI));
        assert!(!stream.is_exhausted());
    }

    #[test]
    fn receive_extend_signs() {
        // 0b0 1 bit => -1, 0b1 => 1, 0b00 2 bits => -3
        let data = [0b0100_0000_u8];
        let mut reader = ZReader::new(ZCursor::new(&data[..]));
        let mut stream = BitStream::new();

        assert_eq!(stream.receive_extend(&mut reader, 1).unwrap(), -1);
        assert_eq!(stream.receive_extend(&mut reader, 1).unwrap(), 1);
        assert_eq!(stream.receive_extend(&mut reader, 2).unwrap(), -3);
    }

    #[test]
    fn overread_without_marker() {
        let data = [0_u8; 4];
        let mut reader = ZReader::new(ZCursor::new(&data[..]));
        let mut stream = BitStream::new();

        for _ in 0..40 {
            stream.get_bits(&mut reader, 16).unwrap();
        }
        assert!(stream.is_exhausted());
    }
}
