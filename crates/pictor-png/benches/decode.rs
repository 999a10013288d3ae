/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use pictor_core::bytestream::ZCursor;
use pictor_core::colorspace::ColorSpace;
use pictor_core::options::EncoderOptions;
use pictor_png::{PngDecoder, PngEncoder};

const WIDTH: usize = 1024;
const HEIGHT: usize = 768;

fn make_image() -> Vec<u8> {
    let mut pixels = Vec::with_capacity(WIDTH * HEIGHT * 3);
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            pixels.extend_from_slice(&[
                (x * 255 / WIDTH) as u8,
                (y * 255 / HEIGHT) as u8,
                ((x * y) >> 6) as u8
            ]);
        }
    }
    pixels
}

fn decode_pictor_png(data: &[u8]) -> Vec<u8> {
    PngDecoder::new(ZCursor::new(data)).decode().unwrap()
}

fn decode_ref(data: &[u8]) -> Vec<u8> {
    let decoder = png::Decoder::new(data);
    let mut reader = decoder.read_info().unwrap();
    let mut out = vec![0; reader.output_buffer_size()];
    reader.next_frame(&mut out).unwrap();
    out
}

fn bench_decode(c: &mut Criterion) {
    let pixels = make_image();
    let mut data = vec![];
    PngEncoder::new(&pixels, EncoderOptions::new(WIDTH, HEIGHT, ColorSpace::RGB))
        .encode(&mut data)
        .unwrap();

    let mut group = c.benchmark_group("png: Simple decode");

    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("pictor-png", |b| {
        b.iter(|| black_box(decode_pictor_png(data.as_slice())))
    });
    group.bench_function("image-rs/png", |b| {
        b.iter(|| black_box(decode_ref(data.as_slice())))
    });
}

criterion_group!(name=benches;
      config={
      let c = Criterion::default();
        c.measurement_time(Duration::from_secs(20))
      };
    targets=bench_decode);

criterion_main!(benches);
