/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Canonical Huffman codes, the way deflate and webp lossless lay them out.
//!
//! Codes are described purely by their code lengths, codewords are assigned
//! in increasing order of length and, within a length, symbol value.
//! Bits are packed least significant bit first, hence codewords are stored
//! bit reversed.
use alloc::vec;
use alloc::vec::Vec;

use crate::bitstream::BitStreamReader;

/// Longest code length any of the supported formats allow
pub const MAX_CODE_LENGTH: usize = 15;

/// Number of bits resolved with a single table lookup
const FAST_BITS: u8 = 9;

/// A decoding table for a canonical Huffman code
pub struct HuffmanTree {
    /// `(symbol << 4) | length` for every `FAST_BITS` wide bit pattern
    /// whose code is at most `FAST_BITS` long, zero otherwise
    fast:    Vec<u32>,
    /// number of codes of each length
    counts:  [u16; MAX_CODE_LENGTH + 1],
    /// symbols ordered by their canonical code
    symbols: Vec<u16>,
    single:  Option<u16>
}

impl HuffmanTree {
    /// Build a tree from per symbol code lengths, zero meaning unused
    ///
    /// Over-subscribed codes are rejected. An incomplete code is only
    /// accepted if it has a single symbol, an all zero code is accepted
    /// but decoding from it always fails.
    pub fn new(lengths: &[u8]) -> Result<HuffmanTree, &'static str> {
        let mut counts = [0_u16; MAX_CODE_LENGTH + 1];

        for &len in lengths {
            if usize::from(len) > MAX_CODE_LENGTH {
                return Err("Huffman code length too long");
            }
            counts[usize::from(len)] += 1;
        }
        counts[0] = 0;

        let used: usize = counts.iter().map(|x| usize::from(*x)).sum();

        // check the code is not over-subscribed
        let mut left: i32 = 1;
        for count in &counts[1..] {
            left <<= 1;
            left -= i32::from(*count);
            if left < 0 {
                return Err("Over-subscribed huffman code");
            }
        }
        if left > 0 && used > 1 {
            return Err("Incomplete huffman code");
        }
        // offsets of the first symbol of each length in `symbols`
        let mut offsets = [0_u16; MAX_CODE_LENGTH + 2];
        for len in 1..=MAX_CODE_LENGTH {
            offsets[len + 1] = offsets[len] + counts[len];
        }
        let mut symbols = vec![0_u16; used];

        for (symbol, &len) in lengths.iter().enumerate() {
            if len != 0 {
                let pos = &mut offsets[usize::from(len)];
                symbols[usize::from(*pos)] = symbol as u16;
                *pos += 1;
            }
        }
        let single = if used == 1 { Some(symbols[0]) } else { None };

        // fill the fast lookup table
        let mut fast = vec![0_u32; 1 << FAST_BITS];
        let codes = build_codes(lengths);

        for (symbol, (&len, &code)) in lengths.iter().zip(codes.iter()).enumerate() {
            if len == 0 || len > FAST_BITS {
                continue;
            }
            let entry = ((symbol as u32) << 4) | u32::from(len);
            let step = 1_usize << len;
            let mut pos = usize::from(code);

            while pos < fast.len() {
                fast[pos] = entry;
                pos += step;
            }
        }

        Ok(HuffmanTree {
            fast,
            counts,
            symbols,
            single
        })
    }

    /// The only symbol of a code with exactly one used symbol
    pub const fn single_symbol(&self) -> Option<u16> {
        self.single
    }

    /// Return true if no symbol has a code
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Decode one symbol, returning `None` if the bits do not form a code
    #[inline(always)]
    pub fn decode(&self, stream: &mut BitStreamReader) -> Option<u16> {
        let bits = stream.peek_bits(MAX_CODE_LENGTH as u8);
        let entry = self.fast[(bits & ((1 << FAST_BITS) - 1)) as usize];

        if entry != 0 {
            stream.drop_bits((entry & 15) as u8);
            return Some((entry >> 4) as u16);
        }
        self.decode_slow(stream, bits)
    }

    #[inline(never)]
    fn decode_slow(&self, stream: &mut BitStreamReader, bits: u64) -> Option<u16> {
        // walk the canonical code one bit at a time
        let mut code: i32 = 0;
        let mut first: i32 = 0;
        let mut index: i32 = 0;

        for len in 1..=MAX_CODE_LENGTH {
            code |= ((bits >> (len - 1)) & 1) as i32;
            let count = i32::from(self.counts[len]);

            if code - first < count {
                stream.drop_bits(len as u8);
                return self.symbols.get((index + code - first) as usize).copied();
            }
            index += count;
            first += count;
            first <<= 1;
            code <<= 1;
        }
        None
    }
}

/// Assign canonical codewords to `lengths`, bit reversed for LSB first writing
pub fn build_codes(lengths: &[u8]) -> Vec<u16> {
    let mut bl_count = [0_u16; MAX_CODE_LENGTH + 1];

    for &len in lengths {
        bl_count[usize::from(len).min(MAX_CODE_LENGTH)] += 1;
    }
    bl_count[0] = 0;

    let mut next_code = [0_u16; MAX_CODE_LENGTH + 1];
    let mut code = 0_u16;

    for bits in 1..=MAX_CODE_LENGTH {
        code = (code + bl_count[bits - 1]) << 1;
        next_code[bits] = code;
    }

    lengths
        .iter()
        .map(|&len| {
            if len == 0 {
                return 0;
            }
            let code = next_code[usize::from(len)];
            next_code[usize::from(len)] = code.wrapping_add(1);
            code.reverse_bits() >> (16 - u16::from(len))
        })
        .collect()
}

fn take_smallest(weights: &[u64], num_leaves: usize, leaf: &mut usize, internal: &mut usize) -> usize {
    let use_leaf =
        *leaf < num_leaves && (*internal >= weights.len() || weights[*leaf] <= weights[*internal]);

    if use_leaf {
        *leaf += 1;
        *leaf - 1
    } else {
        *internal += 1;
        *internal - 1
    }
}

/// Compute Huffman code lengths for `freqs` no longer than `max_len`
///
/// Symbols with a zero frequency get no code. If only one symbol is used
/// a second one is given a code too so the result is always a complete code
/// when any symbol is used.
pub fn build_code_lengths(freqs: &[u32], max_len: u8) -> Vec<u8> {
    let max_len = usize::from(max_len).min(MAX_CODE_LENGTH);
    let mut lengths = vec![0_u8; freqs.len()];

    let mut leaves: Vec<(u32, u16)> = freqs
        .iter()
        .enumerate()
        .filter(|(_, f)| **f > 0)
        .map(|(sym, f)| (*f, sym as u16))
        .collect();

    match leaves.len() {
        0 => return lengths,
        1 => {
            let used = usize::from(leaves[0].1);
            let other = usize::from(used == 0);

            lengths[used] = 1;
            if other < lengths.len() {
                lengths[other] = 1;
            }
            return lengths;
        }
        _ => ()
    }
    leaves.sort_unstable();

    let num_leaves = leaves.len();
    // leaves first, then internal nodes in creation order
    let mut weights: Vec<u64> = leaves.iter().map(|l| u64::from(l.0)).collect();
    let mut parent = vec![0_usize; 2 * num_leaves - 1];

    let (mut leaf, mut internal) = (0, num_leaves);

    for _ in 0..num_leaves - 1 {
        let a = take_smallest(&weights, num_leaves, &mut leaf, &mut internal);
        let b = take_smallest(&weights, num_leaves, &mut leaf, &mut internal);

        parent[a] = weights.len();
        parent[b] = weights.len();
        weights.push(weights[a] + weights[b]);
    }
    // the root is the last node created, parents always come after children
    let root = weights.len() - 1;
    let mut depth = vec![0_usize; weights.len()];

    for node in (0..root).rev() {
        depth[node] = depth[parent[node]] + 1;
    }

    // histogram of lengths, clamping overlong ones
    let mut num_codes = [0_u32; MAX_CODE_LENGTH + 1];
    for d in &depth[..num_leaves] {
        num_codes[(*d).min(max_len)] += 1;
    }
    let mut total: u64 = (1..=max_len)
        .map(|i| u64::from(num_codes[i]) << (max_len - i))
        .sum();

    while total > (1 << max_len) {
        num_codes[max_len] -= 1;
        for i in (1..max_len).rev() {
            if num_codes[i] != 0 {
                num_codes[i] -= 1;
                num_codes[i + 1] += 2;
                break;
            }
        }
        total -= 1;
    }

    // least frequent symbols get the longest codes
    let mut sorted = leaves.iter();
    for len in (1..=max_len).rev() {
        for _ in 0..num_codes[len] {
            if let Some((_, sym)) = sorted.next() {
                lengths[usize::from(*sym)] = len as u8;
            }
        }
    }
    lengths
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use crate::bitstream::{BitStreamReader, BitStreamWriter};
    use crate::huffman::{build_code_lengths, build_codes, HuffmanTree};

    fn kraft_sum(lengths: &[u8]) -> f64 {
        lengths
            .iter()
            .filter(|l| **l > 0)
            .map(|l| 1.0 / f64::from(1_u32 << *l))
            .sum()
    }

    #[test]
    fn lengths_are_limited_and_complete() {
        // fibonacci frequencies produce a very deep unrestricted tree
        let mut freqs = Vec::new();
        let (mut a, mut b) = (1_u32, 1_u32);
        for _ in 0..30 {
            freqs.push(a);
            let c = a + b;
            a = b;
            b = c;
        }
        let lengths = build_code_lengths(&freqs, 7);
        assert!(lengths.iter().all(|l| *l > 0 && *l <= 7));
        assert!((kraft_sum(&lengths) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn single_symbol_gets_a_partner() {
        let lengths = build_code_lengths(&[0, 0, 5, 0], 15);
        assert_eq!(lengths, [1, 0, 1, 0]);
    }

    #[test]
    fn over_subscribed_is_rejected() {
        assert!(HuffmanTree::new(&[1, 1, 1]).is_err());
        assert!(HuffmanTree::new(&[2, 2, 2]).is_err());
        assert!(HuffmanTree::new(&[0, 1]).is_ok());
    }

    #[test]
    fn encode_then_decode_symbols() {
        let freqs: Vec<u32> = (0..40).map(|x| (x * 7 % 13) + 1).collect();
        let lengths = build_code_lengths(&freqs, 15);
        let codes = build_codes(&lengths);
        let tree = HuffmanTree::new(&lengths).unwrap();

        let message: Vec<usize> = (0..200).map(|x| (x * 31) % 40).collect();
        let mut writer = BitStreamWriter::new();
        for &sym in &message {
            writer.put_bits(u32::from(codes[sym]), lengths[sym]);
        }
        let bytes = writer.finish();
        let mut reader = BitStreamReader::new(&bytes);

        for &sym in &message {
            assert_eq!(tree.decode(&mut reader), Some(sym as u16));
        }
    }
}
