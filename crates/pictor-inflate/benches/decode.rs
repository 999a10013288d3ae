/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::io::Read;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use pictor_inflate::{DeflateDecoder, DeflateEncoder};

fn make_data() -> Vec<u8> {
    // a gradient with some structure, similar to a filtered image
    (0..1_000_000_u32)
        .map(|x| ((x % 1024) / 4) as u8 ^ ((x / 4096) as u8 & 7))
        .collect()
}

fn decode_writer_flate(bytes: &[u8]) -> Vec<u8> {
    let mut writer = Vec::new();
    let mut deflater = flate2::read::ZlibDecoder::new(bytes);
    deflater.read_to_end(&mut writer).unwrap();
    writer
}

fn decode_writer_pictor(bytes: &[u8]) -> Vec<u8> {
    let mut deflater = DeflateDecoder::new(bytes);
    deflater.decode_zlib().unwrap()
}

fn decode_test(c: &mut Criterion) {
    let data = DeflateEncoder::new(&make_data()).encode_zlib();

    let mut group = c.benchmark_group("zlib decoding");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("flate/zlib", |b| {
        b.iter(|| black_box(decode_writer_flate(data.as_slice())))
    });

    group.bench_function("pictor-inflate", |b| {
        b.iter(|| black_box(decode_writer_pictor(data.as_slice())))
    });
}

fn encode_test(c: &mut Criterion) {
    let data = make_data();

    let mut group = c.benchmark_group("zlib encoding");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("pictor-inflate", |b| {
        b.iter(|| black_box(DeflateEncoder::new(&data).encode_zlib()))
    });
}

criterion_group!(benches, decode_test, encode_test);
criterion_main!(benches);
