/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::io::prelude::*;
use std::io::Cursor;

use nanorand::{Rng, WyRand};
use pictor_inflate::errors::DecodeErrorStatus;
use pictor_inflate::{DeflateDecoder, DeflateEncoder, DeflateEncodingOptions};

fn decode_writer_flate(bytes: &[u8]) -> Vec<u8> {
    let mut writer = Vec::new();

    let mut deflater = flate2::read::ZlibDecoder::new(Cursor::new(bytes));

    deflater.read_to_end(&mut writer).unwrap();

    writer
}

fn encode_writer_flate(bytes: &[u8], level: u32) -> Vec<u8> {
    let mut encoder =
        flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::new(level));
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

fn decode_writer_pictor(bytes: &[u8]) -> Vec<u8> {
    let mut deflater = DeflateDecoder::new(bytes);

    deflater.decode_zlib().unwrap()
}

/// Data with a mixture of noise and repetition, roughly what
/// filtered image rows look like
fn sample_data(seed: u64, size: usize) -> Vec<u8> {
    let mut rng = WyRand::new_seed(seed);
    let mut data = Vec::with_capacity(size);

    while data.len() < size {
        let choice = rng.generate_range(0_u32..4);
        match choice {
            0 => {
                let len = rng.generate_range(1_usize..64);
                for _ in 0..len {
                    data.push(rng.generate::<u8>());
                }
            }
            1 => {
                let len = rng.generate_range(3_usize..300);
                let byte = rng.generate::<u8>();
                data.extend(std::iter::repeat(byte).take(len));
            }
            _ if data.len() > 10 => {
                let start = rng.generate_range(0..data.len() - 1);
                let len = rng.generate_range(1..(data.len() - start).min(200));
                data.extend_from_within(start..start + len);
            }
            _ => data.push(0)
        }
    }
    data.truncate(size);
    data
}

#[test]
fn test_similarity_with_flate2_streams() {
    for (seed, size) in [(1, 10), (2, 1000), (3, 100_000), (4, 300_000)] {
        let data = sample_data(seed, size);

        for level in [0, 1, 6, 9] {
            let compressed = encode_writer_flate(&data, level);
            let pictor_data = decode_writer_pictor(&compressed);

            assert_eq!(pictor_data.len(), data.len());
            assert!(pictor_data == data, "seed {seed} level {level} did not match");
        }
    }
}

#[test]
fn test_flate2_reads_our_streams() {
    for (seed, size) in [(5, 1), (6, 4096), (7, 200_000)] {
        let data = sample_data(seed, size);

        for level in 0..=9 {
            let options = DeflateEncodingOptions::default().set_level(level);
            let compressed = DeflateEncoder::new_with_options(&data, options).encode_zlib();

            assert!(decode_writer_flate(&compressed) == data, "seed {seed} level {level}");
            assert!(decode_writer_pictor(&compressed) == data);
        }
    }
}

#[test]
fn test_stored_blocks_followed_by_more_blocks() {
    // stored blocks hold at most 64 KiB, so these span several of them
    let mut rng = WyRand::new_seed(11);
    for size in [70_000, 100_000, 300_000] {
        let mut data = vec![0_u8; size];
        rng.fill(&mut data);

        let compressed = encode_writer_flate(&data, 0);
        assert!(decode_writer_pictor(&compressed) == data, "flate2 {size}");

        let options = DeflateEncodingOptions::default().set_level(0);
        let compressed = DeflateEncoder::new_with_options(&data, options).encode_zlib();
        assert!(decode_writer_pictor(&compressed) == data, "level 0 {size}");

        // noise makes the compressor fall back to stored blocks between others
        let compressed = DeflateEncoder::new(&data[..size / 3]).encode_zlib();
        assert!(decode_writer_pictor(&compressed) == data[..size / 3], "default {size}");
    }
}

#[test]
fn test_compression_actually_compresses() {
    let data = sample_data(8, 50_000);
    let compressed = DeflateEncoder::new(&data).encode_zlib();
    assert!(compressed.len() < data.len());
}

#[test]
fn test_truncation_is_reported() {
    let data = sample_data(9, 10_000);
    let compressed = DeflateEncoder::new(&data).encode_zlib();
    // drop part of the deflate body and the adler32 trailer
    let truncated = &compressed[..compressed.len() / 2];

    let err = DeflateDecoder::new(truncated).decode_zlib().unwrap_err();
    assert!(matches!(err.error, DecodeErrorStatus::InsufficientData));
}

#[test]
fn test_limit_is_respected() {
    let data = vec![0_u8; 10_000];
    let compressed = DeflateEncoder::new(&data).encode_zlib();

    let options = pictor_inflate::DeflateOptions::default().set_limit(100);
    let err = DeflateDecoder::new_with_options(&compressed, options)
        .decode_zlib()
        .unwrap_err();
    assert!(matches!(
        err.error,
        DecodeErrorStatus::OutputLimitExceeded(100, _)
    ));
}

#[test]
fn test_adler_mismatch() {
    let data = sample_data(10, 2000);
    let mut compressed = DeflateEncoder::new(&data).encode_zlib();
    let last = compressed.len() - 1;
    compressed[last] ^= 0xFF;

    let err = DeflateDecoder::new(&compressed).decode_zlib().unwrap_err();
    assert!(matches!(err.error, DecodeErrorStatus::MismatchedAdler(_, _)));
    // data decoded so far is still handed back
    assert_eq!(err.data, data);

    let options = pictor_inflate::DeflateOptions::default().set_confirm_checksum(false);
    let decoded = DeflateDecoder::new_with_options(&compressed, options)
        .decode_zlib()
        .unwrap();
    assert_eq!(decoded, data);
}
