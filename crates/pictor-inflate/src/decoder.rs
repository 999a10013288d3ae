/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::format;
use alloc::vec;
use alloc::vec::Vec;

use pictor_core::log::trace;

use crate::bitstream::BitStreamReader;
use crate::constants::{
    fixed_litlen_lengths, DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN, DEFLATE_BLOCKTYPE_STATIC,
    DEFLATE_BLOCKTYPE_UNCOMPRESSED, DEFLATE_END_OF_BLOCK, DEFLATE_NUM_PRECODE_SYMS,
    DEFLATE_PRECODE_LENS_PERMUTATION, FIXED_OFFSET_LENGTHS, LENGTH_BASE, LENGTH_EXTRA_BITS,
    OFFSET_BASE, OFFSET_EXTRA_BITS
};
use crate::errors::{DecodeErrorStatus, InflateDecodeErrors};
use crate::huffman::HuffmanTree;
use crate::utils::calc_adler_hash;

/// Options that influence decompression
#[derive(Copy, Clone, Debug)]
pub struct DeflateOptions {
    limit:            usize,
    confirm_checksum: bool,
    size_hint:        usize
}

impl Default for DeflateOptions {
    fn default() -> Self {
        DeflateOptions {
            limit:            1 << 30,
            confirm_checksum: true,
            size_hint:        37000
        }
    }
}

impl DeflateOptions {
    /// Get deflate/zlib limit option
    ///
    /// The decoder won't extend the inbuilt limit and will
    /// return an error if the limit is exceeded
    pub const fn get_limit(&self) -> usize {
        self.limit
    }
    /// Set a limit to the internal vector
    /// used to store decoded zlib/deflate output.
    #[must_use]
    pub fn set_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
    /// Get whether the decoder will confirm a checksum
    /// after decoding
    pub const fn get_confirm_checksum(&self) -> bool {
        self.confirm_checksum
    }
    /// Set whether the decoder should confirm a checksum
    /// after decoding
    ///
    /// For zlib this is the adler32 trailing the stream
    #[must_use]
    pub fn set_confirm_checksum(mut self, yes: bool) -> Self {
        self.confirm_checksum = yes;
        self
    }
    /// Get the default size hint for the decompressor
    pub const fn get_size_hint(&self) -> usize {
        self.size_hint
    }
    /// Set the size hint for the decompressor
    ///
    /// This is the initial capacity of the output vector,
    /// callers that know the decompressed size can avoid reallocations
    #[must_use]
    pub fn set_size_hint(mut self, hint: usize) -> Self {
        self.size_hint = hint;
        self
    }
}

/// A deflate decoder instance.
///
/// The decoder manages output buffer as opposed to requiring the caller to provide a pre-allocated buffer
/// it tracks number of bytes written and on successfully reaching the
/// end of the block, will return a vector with exactly
/// the number of decompressed bytes.
pub struct DeflateDecoder<'a> {
    data:     &'a [u8],
    position: usize,
    options:  DeflateOptions
}

impl<'a> DeflateDecoder<'a> {
    /// Create a new decompressor that will read compressed
    /// data from `data` and return a new vector containing new data
    pub fn new(data: &'a [u8]) -> DeflateDecoder<'a> {
        DeflateDecoder::new_with_options(data, DeflateOptions::default())
    }
    /// Create new decoder with specified options
    pub fn new_with_options(data: &'a [u8], options: DeflateOptions) -> DeflateDecoder<'a> {
        DeflateDecoder {
            data,
            position: 0,
            options
        }
    }
    /// Decode zlib-encoded data returning the uncompressed in a `Vec<u8>`
    /// or an error if something went wrong.
    ///
    /// Bytes consumed will be from the data passed when the
    /// `new` method was called.
    pub fn decode_zlib(&mut self) -> Result<Vec<u8>, InflateDecodeErrors> {
        if self.data.len() < 2 {
            return Err(InflateDecodeErrors::new_with_error(
                DecodeErrorStatus::InsufficientData
            ));
        }
        // Zlib flags
        // See https://www.ietf.org/rfc/rfc1950.txt for
        // the RFC
        let cmf = self.data[0];
        let flg = self.data[1];

        let cm = cmf & 0xF;
        let cinfo = cmf >> 4;

        // confirm we have the right deflate methods
        if cm != 8 {
            if cm == 15 {
                return Err(InflateDecodeErrors::new_with_error(DecodeErrorStatus::Generic(
                    "CM of 15 is preserved by the standard,currently don't know how to handle it"
                )));
            }
            return Err(InflateDecodeErrors::new_with_error(
                DecodeErrorStatus::GenericStr(format!("Unknown zlib compression method {cm}"))
            ));
        }
        if cinfo > 7 {
            return Err(InflateDecodeErrors::new_with_error(
                DecodeErrorStatus::GenericStr(format!(
                    "Unknown cinfo `{cinfo}` greater than 7, not allowed"
                ))
            ));
        }
        let flag_checks = (u16::from(cmf) * 256) + u16::from(flg);

        if flag_checks % 31 != 0 {
            return Err(InflateDecodeErrors::new_with_error(
                DecodeErrorStatus::Generic("FCHECK integrity not preserved")
            ));
        }
        if (flg >> 5) & 1 == 1 {
            return Err(InflateDecodeErrors::new_with_error(
                DecodeErrorStatus::Generic("Preset dictionaries are not supported")
            ));
        }

        self.position = 2;

        let (data, end) = self.decode_deflate_inner()?;

        if self.options.confirm_checksum {
            let adler_bytes = match self.data.get(end..end + 4) {
                Some(bytes) => bytes,
                None => {
                    return Err(InflateDecodeErrors::new(
                        DecodeErrorStatus::InsufficientData,
                        data
                    ))
                }
            };
            let mut stored = [0; 4];
            stored.copy_from_slice(adler_bytes);

            let expected = u32::from_be_bytes(stored);
            let found = calc_adler_hash(&data);

            if expected != found {
                return Err(InflateDecodeErrors::new(
                    DecodeErrorStatus::MismatchedAdler(expected, found),
                    data
                ));
            }
        }
        Ok(data)
    }

    /// Decode a raw deflate stream
    pub fn decode_deflate(&mut self) -> Result<Vec<u8>, InflateDecodeErrors> {
        self.position = 0;
        let (data, _) = self.decode_deflate_inner()?;
        Ok(data)
    }

    /// Decode deflate blocks starting at `self.position`, returning the
    /// output and the byte position just past the final block
    fn decode_deflate_inner(&mut self) -> Result<(Vec<u8>, usize), InflateDecodeErrors> {
        let start = self.position;
        let mut out = Vec::with_capacity(self.options.size_hint.min(self.options.limit));
        let mut stream = BitStreamReader::new(&self.data[start..]);

        match self.decode_blocks(&mut stream, &mut out) {
            Ok(()) => {
                let end = self.data.len() - stream.remaining_bytes();
                self.position = end;
                Ok((out, end))
            }
            Err(error) => Err(InflateDecodeErrors::new(error, out))
        }
    }

    fn decode_blocks(
        &self, stream: &mut BitStreamReader, out: &mut Vec<u8>
    ) -> Result<(), DecodeErrorStatus> {
        let mut fixed_trees: Option<(HuffmanTree, HuffmanTree)> = None;

        loop {
            let is_last_block = stream.get_bits(1) == 1;
            let block_type = stream.get_bits(2);

            if stream.is_overrun() {
                return Err(DecodeErrorStatus::InsufficientData);
            }

            match block_type {
                DEFLATE_BLOCKTYPE_UNCOMPRESSED => {
                    stream.align_to_byte();
                    let len = stream.get_bits(16) as usize;
                    let nlen = stream.get_bits(16) as usize;

                    if stream.is_overrun() {
                        return Err(DecodeErrorStatus::InsufficientData);
                    }
                    if len != (!nlen & 0xFFFF) {
                        return Err(DecodeErrorStatus::Generic(
                            "Stored block length does not match its complement"
                        ));
                    }
                    if out.len() + len > self.options.limit {
                        return Err(DecodeErrorStatus::OutputLimitExceeded(
                            self.options.limit,
                            out.len() + len
                        ));
                    }
                    if !stream.read_aligned_bytes(out, len) {
                        return Err(DecodeErrorStatus::InsufficientData);
                    }
                }
                DEFLATE_BLOCKTYPE_STATIC => {
                    if fixed_trees.is_none() {
                        let litlen = HuffmanTree::new(&fixed_litlen_lengths())
                            .map_err(DecodeErrorStatus::Generic)?;
                        let offset = HuffmanTree::new(&FIXED_OFFSET_LENGTHS)
                            .map_err(DecodeErrorStatus::Generic)?;
                        fixed_trees = Some((litlen, offset));
                    }
                    if let Some((litlen, offset)) = &fixed_trees {
                        self.decode_huffman_block(stream, out, litlen, offset)?;
                    }
                }
                DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN => {
                    let (litlen, offset) = read_dynamic_trees(stream)?;
                    self.decode_huffman_block(stream, out, &litlen, &offset)?;
                }
                _ => return Err(DecodeErrorStatus::Generic("Reserved block type 3 encountered"))
            }
            if is_last_block {
                break;
            }
        }
        trace!("Inflated {} bytes", out.len());
        Ok(())
    }

    fn decode_huffman_block(
        &self, stream: &mut BitStreamReader, out: &mut Vec<u8>, litlen: &HuffmanTree,
        offset: &HuffmanTree
    ) -> Result<(), DecodeErrorStatus> {
        let limit = self.options.limit;

        loop {
            let symbol = decode_symbol(stream, litlen)?;

            if symbol < 256 {
                if out.len() >= limit {
                    return Err(DecodeErrorStatus::OutputLimitExceeded(limit, out.len() + 1));
                }
                out.push(symbol as u8);
                continue;
            }
            if symbol == DEFLATE_END_OF_BLOCK {
                return Ok(());
            }
            let length_index = usize::from(symbol - 257);

            if length_index >= LENGTH_BASE.len() {
                return Err(DecodeErrorStatus::GenericStr(format!(
                    "Invalid length symbol {symbol}"
                )));
            }
            let length = usize::from(LENGTH_BASE[length_index])
                + stream.get_bits(LENGTH_EXTRA_BITS[length_index]) as usize;

            let offset_symbol = usize::from(decode_symbol(stream, offset)?);

            if offset_symbol >= OFFSET_BASE.len() {
                return Err(DecodeErrorStatus::GenericStr(format!(
                    "Invalid offset symbol {offset_symbol}"
                )));
            }
            let distance = usize::from(OFFSET_BASE[offset_symbol])
                + stream.get_bits(OFFSET_EXTRA_BITS[offset_symbol]) as usize;

            if stream.is_overrun() {
                return Err(DecodeErrorStatus::InsufficientData);
            }
            if distance > out.len() {
                return Err(DecodeErrorStatus::GenericStr(format!(
                    "Offset {distance} points before start of output of {} bytes",
                    out.len()
                )));
            }
            if out.len() + length > limit {
                return Err(DecodeErrorStatus::OutputLimitExceeded(limit, out.len() + length));
            }
            let source = out.len() - distance;

            if distance >= length {
                out.extend_from_within(source..source + length);
            } else {
                // overlapping copy, the match repeats its own output
                for i in 0..length {
                    let byte = out[source + i];
                    out.push(byte);
                }
            }
        }
    }
}

fn decode_symbol(stream: &mut BitStreamReader, tree: &HuffmanTree) -> Result<u16, DecodeErrorStatus> {
    let symbol = tree.decode(stream);

    if stream.is_overrun() {
        return Err(DecodeErrorStatus::InsufficientData);
    }
    symbol.ok_or(DecodeErrorStatus::CorruptData)
}

fn read_dynamic_trees(
    stream: &mut BitStreamReader
) -> Result<(HuffmanTree, HuffmanTree), DecodeErrorStatus> {
    let num_litlen_syms = 257 + stream.get_bits(5) as usize;
    let num_offset_syms = 1 + stream.get_bits(5) as usize;
    let num_explicit_precode_lens = 4 + stream.get_bits(4) as usize;

    if num_litlen_syms > 286 || num_offset_syms > 30 {
        return Err(DecodeErrorStatus::Generic(
            "Too many length or distance symbols in dynamic block"
        ));
    }

    let mut precode_lens = [0_u8; DEFLATE_NUM_PRECODE_SYMS];

    for i in DEFLATE_PRECODE_LENS_PERMUTATION
        .iter()
        .take(num_explicit_precode_lens)
    {
        precode_lens[usize::from(*i)] = stream.get_bits(3) as u8;
    }
    if stream.is_overrun() {
        return Err(DecodeErrorStatus::InsufficientData);
    }
    let precode = HuffmanTree::new(&precode_lens).map_err(DecodeErrorStatus::Generic)?;

    let total = num_litlen_syms + num_offset_syms;
    let mut lens = vec![0_u8; total];
    let mut i = 0;

    while i < total {
        let symbol = decode_symbol(stream, &precode)?;

        let (value, repeat) = match symbol {
            0..=15 => (symbol as u8, 1),
            16 => {
                if i == 0 {
                    return Err(DecodeErrorStatus::Generic(
                        "Repeat code with no previous code length"
                    ));
                }
                (lens[i - 1], 3 + stream.get_bits(2) as usize)
            }
            17 => (0, 3 + stream.get_bits(3) as usize),
            _ => (0, 11 + stream.get_bits(7) as usize)
        };
        if i + repeat > total {
            return Err(DecodeErrorStatus::Generic("Code length repeat overflows the table"));
        }
        lens[i..i + repeat].fill(value);
        i += repeat;
    }
    if stream.is_overrun() {
        return Err(DecodeErrorStatus::InsufficientData);
    }
    if lens[256] == 0 {
        return Err(DecodeErrorStatus::Generic("Missing end of block code"));
    }
    let litlen = HuffmanTree::new(&lens[..num_litlen_syms]).map_err(DecodeErrorStatus::Generic)?;
    let offset = HuffmanTree::new(&lens[num_litlen_syms..]).map_err(DecodeErrorStatus::Generic)?;

    Ok((litlen, offset))
}

#[cfg(test)]
mod tests {
    use crate::errors::DecodeErrorStatus;
    use crate::DeflateDecoder;

    #[test]
    fn stored_block() {
        // final stored block holding "abc"
        let data = [0x01, 0x03, 0x00, 0xFC, 0xFF, b'a', b'b', b'c'];
        let out = DeflateDecoder::new(&data).decode_deflate().unwrap();
        assert_eq!(out, b"abc");
    }

    #[test]
    fn fixed_block_with_match() {
        // zlib compressed "aaaaaaaaaa" using a fixed block
        let data = [0x78, 0x9c, 0x4b, 0x4c, 0x84, 0x01, 0x00, 0x14, 0xe1, 0x03, 0xcb];
        let out = DeflateDecoder::new(&data).decode_zlib().unwrap();
        assert_eq!(out, b"aaaaaaaaaa");
    }

    #[test]
    fn truncated_stream_is_insufficient_data() {
        let data = [0x01, 0x03, 0x00, 0xFC, 0xFF, b'a'];
        let err = DeflateDecoder::new(&data).decode_deflate().unwrap_err();
        assert!(matches!(err.error, DecodeErrorStatus::InsufficientData));
    }

    #[test]
    fn bad_zlib_header() {
        let data = [0x78, 0x9d, 0x03, 0x00];
        assert!(DeflateDecoder::new(&data).decode_zlib().is_err());
    }
}
