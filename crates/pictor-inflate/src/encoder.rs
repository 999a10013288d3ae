/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::vec::Vec;

use pictor_core::log::trace;

use crate::bitstream::BitStreamWriter;
use crate::constants::{
    fixed_litlen_lengths, DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN, DEFLATE_BLOCKTYPE_STATIC,
    DEFLATE_BLOCKTYPE_UNCOMPRESSED, DEFLATE_NUM_LITLEN_SYMS, DEFLATE_NUM_OFFSET_SYMS,
    DEFLATE_NUM_PRECODE_SYMS, DEFLATE_PRECODE_LENS_PERMUTATION, FIXED_OFFSET_LENGTHS,
    LENGTH_BASE, LENGTH_EXTRA_BITS, OFFSET_BASE, OFFSET_EXTRA_BITS
};
use crate::huffman::{build_code_lengths, build_codes};
use crate::lz77::{tokenize, Token};
use crate::utils::calc_adler_hash;

/// Tokens grouped into one block before deciding how to code it
const TOKENS_PER_BLOCK: usize = 1 << 14;

const MAX_STORED_LEN: usize = u16::MAX as usize;

/// Options for the compressor
#[derive(Debug, Copy, Clone)]
pub struct DeflateEncodingOptions {
    level: u8
}

impl Default for DeflateEncodingOptions {
    fn default() -> Self {
        DeflateEncodingOptions { level: 6 }
    }
}

impl DeflateEncodingOptions {
    /// Compression level between 0 (store only) and 9 (slowest)
    pub const fn get_level(&self) -> u8 {
        self.level
    }
    /// Set the compression level, values above 9 are treated as 9
    #[must_use]
    pub fn set_level(mut self, level: u8) -> Self {
        self.level = level.min(9);
        self
    }
}

pub struct DeflateEncoder<'a> {
    data:    &'a [u8],
    options: DeflateEncodingOptions
}

impl<'a> DeflateEncoder<'a> {
    /// Create a new deflate encoder with the default level.
    pub fn new(data: &'a [u8]) -> DeflateEncoder<'a> {
        DeflateEncoder::new_with_options(data, DeflateEncodingOptions::default())
    }
    pub fn new_with_options(data: &'a [u8], options: DeflateEncodingOptions) -> DeflateEncoder<'a> {
        DeflateEncoder { data, options }
    }

    fn write_zlib_header(&self, out: &mut Vec<u8>) {
        const ZLIB_CM_DEFLATE: u16 = 8;
        const ZLIB_CINFO_32K_WINDOW: u16 = 7;

        let level_hint: u16 = match self.options.level {
            0 | 1 => 0,
            2..=5 => 1,
            6 => 2,
            _ => 3
        };

        let mut hdr = (ZLIB_CM_DEFLATE << 8) | (ZLIB_CINFO_32K_WINDOW << 12);

        hdr |= level_hint << 6;
        hdr |= 31 - (hdr % 31);

        out.extend_from_slice(&hdr.to_be_bytes());
    }

    /// Compress into a zlib stream, header and adler32 trailer included
    pub fn encode_zlib(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() / 2 + 64);

        self.write_zlib_header(&mut out);
        out.extend_from_slice(&self.encode_deflate());
        out.extend_from_slice(&calc_adler_hash(self.data).to_be_bytes());

        out
    }

    /// Compress into a raw deflate stream
    pub fn encode_deflate(&self) -> Vec<u8> {
        let mut writer = BitStreamWriter::with_capacity(self.data.len() / 2 + 64);

        if self.options.level == 0 || self.data.is_empty() {
            encode_no_compression(&mut writer, self.data, true);
            return writer.finish();
        }
        let tokens = tokenize(self.data, self.options.level);

        trace!(
            "Deflate: {} bytes became {} tokens",
            self.data.len(),
            tokens.len()
        );
        let num_blocks = tokens.len().div_ceil(TOKENS_PER_BLOCK);
        let mut input_position = 0;

        for (i, block) in tokens.chunks(TOKENS_PER_BLOCK).enumerate() {
            let is_last = i + 1 == num_blocks;
            let block_len: usize = block.iter().map(|t| t.len()).sum();
            let raw = &self.data[input_position..input_position + block_len];

            write_block(&mut writer, block, raw, is_last);
            input_position += block_len;
        }
        writer.finish()
    }
}

/// Encode a deflate data block with no compression
fn encode_no_compression(writer: &mut BitStreamWriter, data: &[u8], is_last: bool) {
    // an empty stream still needs one block
    if data.is_empty() {
        writer.put_bits(u32::from(is_last), 1);
        writer.put_bits(DEFLATE_BLOCKTYPE_UNCOMPRESSED as u32, 2);
        writer.align_to_byte();
        writer.put_bits(0, 16);
        writer.put_bits(0xFFFF, 16);
        return;
    }
    let num_chunks = data.len().div_ceil(MAX_STORED_LEN);

    for (i, chunk) in data.chunks(MAX_STORED_LEN).enumerate() {
        let bfinal = is_last && i + 1 == num_chunks;
        let len = chunk.len() as u16;

        writer.put_bits(u32::from(bfinal), 1);
        writer.put_bits(DEFLATE_BLOCKTYPE_UNCOMPRESSED as u32, 2);
        writer.align_to_byte();
        writer.put_bits(u32::from(len), 16);
        writer.put_bits(u32::from(!len), 16);
        writer.put_bytes(chunk);
    }
}

fn length_symbol(length: usize) -> usize {
    LENGTH_BASE
        .iter()
        .rposition(|base| usize::from(*base) <= length)
        .unwrap_or(0)
}

fn offset_symbol(distance: usize) -> usize {
    OFFSET_BASE
        .iter()
        .rposition(|base| usize::from(*base) <= distance)
        .unwrap_or(0)
}

struct BlockStats {
    litlen: [u32; DEFLATE_NUM_LITLEN_SYMS],
    offset: [u32; DEFLATE_NUM_OFFSET_SYMS],
    /// extra bits spent on lengths and distances, independent of the codes
    extra:  u64
}

impl BlockStats {
    fn gather(tokens: &[Token]) -> BlockStats {
        let mut stats = BlockStats {
            litlen: [0; DEFLATE_NUM_LITLEN_SYMS],
            offset: [0; DEFLATE_NUM_OFFSET_SYMS],
            extra:  0
        };
        for token in tokens {
            match *token {
                Token::Literal(byte) => stats.litlen[usize::from(byte)] += 1,
                Token::Match { length, distance } => {
                    let l = length_symbol(usize::from(length));
                    let d = offset_symbol(usize::from(distance));

                    stats.litlen[257 + l] += 1;
                    stats.offset[d] += 1;
                    stats.extra +=
                        u64::from(LENGTH_EXTRA_BITS[l]) + u64::from(OFFSET_EXTRA_BITS[d]);
                }
            }
        }
        // end of block
        stats.litlen[256] = 1;
        stats
    }

    fn data_cost(&self, litlen_lens: &[u8], offset_lens: &[u8]) -> u64 {
        let lit: u64 = self
            .litlen
            .iter()
            .zip(litlen_lens)
            .map(|(f, l)| u64::from(*f) * u64::from(*l))
            .sum();
        let off: u64 = self
            .offset
            .iter()
            .zip(offset_lens)
            .map(|(f, l)| u64::from(*f) * u64::from(*l))
            .sum();
        lit + off + self.extra
    }
}

/// Run length code the concatenated code lengths with precode symbols 0..=18,
/// returning `(symbol, extra_bits_value)` pairs
fn run_length_code(lens: &[u8]) -> Vec<(u8, u8)> {
    let mut out = Vec::with_capacity(lens.len());
    let mut i = 0;

    while i < lens.len() {
        let value = lens[i];
        let mut run = 1;
        while i + run < lens.len() && lens[i + run] == value {
            run += 1;
        }
        i += run;

        if value == 0 {
            let mut remaining = run;
            while remaining >= 11 {
                let count = remaining.min(138);
                out.push((18, (count - 11) as u8));
                remaining -= count;
            }
            if remaining >= 3 {
                out.push((17, (remaining - 3) as u8));
                remaining = 0;
            }
            out.extend(core::iter::repeat((0, 0)).take(remaining));
        } else {
            out.push((value, 0));
            let mut remaining = run - 1;
            while remaining >= 3 {
                let count = remaining.min(6);
                out.push((16, (count - 3) as u8));
                remaining -= count;
            }
            out.extend(core::iter::repeat((value, 0)).take(remaining));
        }
    }
    out
}

const fn precode_extra_bits(symbol: u8) -> u8 {
    match symbol {
        16 => 2,
        17 => 3,
        18 => 7,
        _ => 0
    }
}

/// Everything needed to write a dynamic block header
struct DynamicHeader {
    litlen_lens:  Vec<u8>,
    offset_lens:  Vec<u8>,
    num_litlen:   usize,
    num_offset:   usize,
    precode_lens: Vec<u8>,
    num_precode:  usize,
    rle:          Vec<(u8, u8)>
}

impl DynamicHeader {
    fn new(stats: &BlockStats) -> DynamicHeader {
        let litlen_lens = build_code_lengths(&stats.litlen, 15);

        let mut offset_freqs = stats.offset;
        if offset_freqs.iter().all(|f| *f == 0) {
            // a literal only block still transmits a distance code
            offset_freqs[0] = 1;
        }
        let offset_lens = build_code_lengths(&offset_freqs[..30], 15);

        let num_litlen = 257 + litlen_lens[257..286].iter().rposition(|l| *l != 0).map_or(0, |p| p + 1);
        let num_offset = 1 + offset_lens[1..].iter().rposition(|l| *l != 0).map_or(0, |p| p + 1);

        let mut all_lens = Vec::with_capacity(num_litlen + num_offset);
        all_lens.extend_from_slice(&litlen_lens[..num_litlen]);
        all_lens.extend_from_slice(&offset_lens[..num_offset]);

        let rle = run_length_code(&all_lens);
        let mut precode_freqs = [0_u32; DEFLATE_NUM_PRECODE_SYMS];
        for (symbol, _) in &rle {
            precode_freqs[usize::from(*symbol)] += 1;
        }
        let precode_lens = build_code_lengths(&precode_freqs, 7);

        let num_precode = DEFLATE_PRECODE_LENS_PERMUTATION
            .iter()
            .rposition(|p| precode_lens[usize::from(*p)] != 0)
            .map_or(4, |p| (p + 1).max(4));

        DynamicHeader {
            litlen_lens,
            offset_lens,
            num_litlen,
            num_offset,
            precode_lens,
            num_precode,
            rle
        }
    }

    fn header_cost(&self) -> u64 {
        let rle_bits: u64 = self
            .rle
            .iter()
            .map(|(s, _)| {
                u64::from(self.precode_lens[usize::from(*s)]) + u64::from(precode_extra_bits(*s))
            })
            .sum();
        5 + 5 + 4 + 3 * self.num_precode as u64 + rle_bits
    }

    fn write(&self, writer: &mut BitStreamWriter) {
        writer.put_bits((self.num_litlen - 257) as u32, 5);
        writer.put_bits((self.num_offset - 1) as u32, 5);
        writer.put_bits((self.num_precode - 4) as u32, 4);

        for p in DEFLATE_PRECODE_LENS_PERMUTATION.iter().take(self.num_precode) {
            writer.put_bits(u32::from(self.precode_lens[usize::from(*p)]), 3);
        }
        let precode_codes = build_codes(&self.precode_lens);

        for (symbol, extra) in &self.rle {
            let s = usize::from(*symbol);
            writer.put_bits(u32::from(precode_codes[s]), self.precode_lens[s]);
            let extra_bits = precode_extra_bits(*symbol);
            if extra_bits > 0 {
                writer.put_bits(u32::from(*extra), extra_bits);
            }
        }
    }
}

fn write_tokens(writer: &mut BitStreamWriter, tokens: &[Token], litlen_lens: &[u8], offset_lens: &[u8]) {
    let litlen_codes = build_codes(litlen_lens);
    let offset_codes = build_codes(offset_lens);

    for token in tokens {
        match *token {
            Token::Literal(byte) => {
                let s = usize::from(byte);
                writer.put_bits(u32::from(litlen_codes[s]), litlen_lens[s]);
            }
            Token::Match { length, distance } => {
                let length = usize::from(length);
                let distance = usize::from(distance);
                let l = length_symbol(length);
                let d = offset_symbol(distance);

                writer.put_bits(u32::from(litlen_codes[257 + l]), litlen_lens[257 + l]);
                if LENGTH_EXTRA_BITS[l] > 0 {
                    let extra = length - usize::from(LENGTH_BASE[l]);
                    writer.put_bits(extra as u32, LENGTH_EXTRA_BITS[l]);
                }
                writer.put_bits(u32::from(offset_codes[d]), offset_lens[d]);
                if OFFSET_EXTRA_BITS[d] > 0 {
                    let extra = distance - usize::from(OFFSET_BASE[d]);
                    writer.put_bits(extra as u32, OFFSET_EXTRA_BITS[d]);
                }
            }
        }
    }
    writer.put_bits(u32::from(litlen_codes[256]), litlen_lens[256]);
}

/// Write `tokens` as whichever of stored, fixed or dynamic block is smallest
fn write_block(writer: &mut BitStreamWriter, tokens: &[Token], raw: &[u8], is_last: bool) {
    let stats = BlockStats::gather(tokens);
    let dynamic = DynamicHeader::new(&stats);
    let fixed_litlen = fixed_litlen_lengths();

    let dynamic_cost =
        dynamic.header_cost() + stats.data_cost(&dynamic.litlen_lens, &dynamic.offset_lens);
    let fixed_cost = stats.data_cost(&fixed_litlen, &FIXED_OFFSET_LENGTHS);
    let stored_cost = (raw.len() as u64 + 5 * raw.len().div_ceil(MAX_STORED_LEN) as u64) * 8 + 7;

    if stored_cost < dynamic_cost.min(fixed_cost) {
        encode_no_compression(writer, raw, is_last);
    } else if fixed_cost <= dynamic_cost {
        writer.put_bits(u32::from(is_last), 1);
        writer.put_bits(DEFLATE_BLOCKTYPE_STATIC as u32, 2);
        write_tokens(writer, tokens, &fixed_litlen, &FIXED_OFFSET_LENGTHS);
    } else {
        writer.put_bits(u32::from(is_last), 1);
        writer.put_bits(DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN as u32, 2);
        dynamic.write(writer);
        write_tokens(writer, tokens, &dynamic.litlen_lens, &dynamic.offset_lens);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use crate::encoder::{length_symbol, offset_symbol, run_length_code};
    use crate::{DeflateDecoder, DeflateEncoder, DeflateEncodingOptions};

    #[test]
    fn symbol_lookup_edges() {
        assert_eq!(length_symbol(3), 0);
        assert_eq!(length_symbol(257), 27);
        assert_eq!(length_symbol(258), 28);
        assert_eq!(offset_symbol(1), 0);
        assert_eq!(offset_symbol(32768), 29);
    }

    #[test]
    fn run_length_codes_cover_all_lengths() {
        let lens = [0_u8; 150];
        let rle = run_length_code(&lens);
        assert_eq!(rle, [(18, 127), (18, 1)]);

        let lens = [5_u8; 8];
        assert_eq!(run_length_code(&lens), [(5, 0), (16, 3), (5, 0)]);
    }

    #[test]
    fn every_level_round_trips() {
        let data: Vec<u8> = (0..70_000_u32)
            .map(|x| (x % 251) as u8 ^ ((x / 1000) as u8))
            .collect();

        for level in 0..=9 {
            let options = DeflateEncodingOptions::default().set_level(level);
            let compressed = DeflateEncoder::new_with_options(&data, options).encode_zlib();
            let decoded = DeflateDecoder::new(&compressed).decode_zlib().unwrap();
            assert_eq!(decoded, data, "level {level}");
        }
    }

    #[test]
    fn empty_input() {
        let compressed = DeflateEncoder::new(&[]).encode_zlib();
        let decoded = DeflateDecoder::new(&compressed).decode_zlib().unwrap();
        assert!(decoded.is_empty());
    }
}
