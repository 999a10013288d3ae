/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Hash chain LZ77 match finder
use alloc::vec;
use alloc::vec::Vec;

use crate::constants::{DEFLATE_MAX_MATCH_LEN, DEFLATE_MIN_MATCH_LEN, DEFLATE_WINDOW_SIZE};

const HASH_BITS: u32 = 15;
const WINDOW_MASK: usize = DEFLATE_WINDOW_SIZE - 1;

/// Matches of minimum length this far back cost more than the literals
const TOO_FAR: usize = 4096;

/// How many chain links to follow at each compression level
const MAX_CHAIN: [usize; 10] = [0, 4, 8, 16, 32, 64, 128, 256, 1024, 4096];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Token {
    Literal(u8),
    Match { length: u16, distance: u16 }
}

impl Token {
    /// Number of input bytes the token covers
    pub const fn len(self) -> usize {
        match self {
            Token::Literal(_) => 1,
            Token::Match { length, .. } => length as usize
        }
    }
}

struct MatchFinder<'a> {
    data:      &'a [u8],
    head:      Vec<i32>,
    prev:      Vec<i32>,
    max_chain: usize
}

impl<'a> MatchFinder<'a> {
    fn new(data: &'a [u8], max_chain: usize) -> MatchFinder<'a> {
        MatchFinder {
            data,
            head: vec![-1; 1 << HASH_BITS],
            prev: vec![-1; DEFLATE_WINDOW_SIZE],
            max_chain
        }
    }

    #[inline(always)]
    fn hash(&self, pos: usize) -> usize {
        let v = (u32::from(self.data[pos]) << 16)
            | (u32::from(self.data[pos + 1]) << 8)
            | u32::from(self.data[pos + 2]);

        (v.wrapping_mul(0x9E37_79B1) >> (32 - HASH_BITS)) as usize
    }

    #[inline(always)]
    fn insert(&mut self, pos: usize) {
        if pos + DEFLATE_MIN_MATCH_LEN > self.data.len() {
            return;
        }
        let h = self.hash(pos);
        self.prev[pos & WINDOW_MASK] = self.head[h];
        self.head[h] = pos as i32;
    }

    /// Longest earlier match for the bytes at `pos`, as `(length, distance)`
    fn find(&self, pos: usize) -> (usize, usize) {
        let data = self.data;

        if pos + DEFLATE_MIN_MATCH_LEN > data.len() {
            return (0, 0);
        }
        let max_len = DEFLATE_MAX_MATCH_LEN.min(data.len() - pos);
        let mut best_len = 0;
        let mut best_dist = 0;
        let mut candidate = self.head[self.hash(pos)];
        let mut chain = self.max_chain;

        while candidate >= 0 && chain > 0 {
            let cand = candidate as usize;
            let distance = pos - cand;

            if distance > DEFLATE_WINDOW_SIZE {
                break;
            }
            if data[cand + best_len] == data[pos + best_len] {
                let length = data[cand..cand + max_len]
                    .iter()
                    .zip(&data[pos..pos + max_len])
                    .take_while(|(a, b)| a == b)
                    .count();

                if length > best_len {
                    best_len = length;
                    best_dist = distance;

                    if length == max_len {
                        break;
                    }
                }
            }
            let next = self.prev[cand & WINDOW_MASK];
            // stale links point forward once the window slot was reused
            if next >= candidate {
                break;
            }
            candidate = next;
            chain -= 1;
        }
        if best_len < DEFLATE_MIN_MATCH_LEN
            || (best_len == DEFLATE_MIN_MATCH_LEN && best_dist > TOO_FAR)
        {
            return (0, 0);
        }
        (best_len, best_dist)
    }
}

/// Split `data` into literals and back references
pub fn tokenize(data: &[u8], level: u8) -> Vec<Token> {
    let level = usize::from(level.min(9));
    let mut tokens = Vec::with_capacity(data.len() / 2 + 16);

    if level == 0 {
        tokens.extend(data.iter().map(|x| Token::Literal(*x)));
        return tokens;
    }
    let lazy = level >= 4;
    let mut finder = MatchFinder::new(data, MAX_CHAIN[level]);
    let mut i = 0;

    while i < data.len() {
        let (length, distance) = finder.find(i);

        if length == 0 {
            tokens.push(Token::Literal(data[i]));
            finder.insert(i);
            i += 1;
            continue;
        }
        finder.insert(i);

        if lazy && length < DEFLATE_MAX_MATCH_LEN {
            let (next_length, _) = finder.find(i + 1);

            if next_length > length {
                // a better match starts on the next byte
                tokens.push(Token::Literal(data[i]));
                i += 1;
                continue;
            }
        }
        tokens.push(Token::Match {
            length:   length as u16,
            distance: distance as u16
        });
        for pos in i + 1..i + length {
            finder.insert(pos);
        }
        i += length;
    }
    tokens
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use crate::lz77::{tokenize, Token};

    fn expand(tokens: &[Token]) -> Vec<u8> {
        let mut out = Vec::new();
        for token in tokens {
            match *token {
                Token::Literal(byte) => out.push(byte),
                Token::Match { length, distance } => {
                    let start = out.len() - usize::from(distance);
                    for i in 0..usize::from(length) {
                        let byte = out[start + i];
                        out.push(byte);
                    }
                }
            }
        }
        out
    }

    #[test]
    fn tokens_reproduce_input() {
        let data: Vec<u8> = (0..5000_u32).map(|x| ((x * x) % 7 + x % 3) as u8).collect();
        for level in [1, 4, 9] {
            let tokens = tokenize(&data, level);
            assert_eq!(expand(&tokens), data);
            assert!(tokens.len() < data.len());
        }
    }

    #[test]
    fn runs_become_overlapping_matches() {
        let data = [7_u8; 300];
        let tokens = tokenize(&data, 6);
        assert_eq!(tokens[0], Token::Literal(7));
        assert_eq!(
            tokens[1],
            Token::Match {
                length:   258,
                distance: 1
            }
        );
        assert_eq!(expand(&tokens), data);
    }
}
