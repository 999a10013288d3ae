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
use pictor_jpeg::{JpegDecoder, JpegEncoder};

const WIDTH: usize = 1024;
const HEIGHT: usize = 768;

fn make_image(colorspace: ColorSpace) -> Vec<u8> {
    let components = colorspace.num_components();
    let mut pixels = Vec::with_capacity(WIDTH * HEIGHT * components);
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let px = [
                (x * 255 / WIDTH) as u8,
                (y * 255 / HEIGHT) as u8,
                ((x * y) >> 6) as u8
            ];
            pixels.extend_from_slice(&px[..components]);
        }
    }
    pixels
}

fn decode_pictor_jpeg(data: &[u8]) -> Vec<u8> {
    JpegDecoder::new(ZCursor::new(data)).decode().unwrap()
}

fn decode_jpeg_decoder(data: &[u8]) -> Vec<u8> {
    jpeg_decoder::Decoder::new(data).decode().unwrap()
}

fn bench(c: &mut Criterion, name: &str, colorspace: ColorSpace) {
    let pixels = make_image(colorspace);
    let mut data = vec![];
    JpegEncoder::new(&pixels, EncoderOptions::new(WIDTH, HEIGHT, colorspace))
        .encode(&mut data)
        .unwrap();

    let mut group = c.benchmark_group(name);

    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("pictor-jpeg", |b| {
        b.iter(|| black_box(decode_pictor_jpeg(data.as_slice())))
    });
    group.bench_function("jpeg-decoder", |b| {
        b.iter(|| black_box(decode_jpeg_decoder(data.as_slice())))
    });
}

fn bench_decode_ycbcr(c: &mut Criterion) {
    bench(c, "jpeg: YCbCr 4:2:0 decode", ColorSpace::RGB);
}

fn bench_decode_grayscale(c: &mut Criterion) {
    bench(c, "jpeg: Grayscale decode", ColorSpace::Luma);
}

criterion_group!(name=benches;
      config={
      let c = Criterion::default();
        c.measurement_time(Duration::from_secs(20))
      };
    targets=bench_decode_ycbcr, bench_decode_grayscale);

criterion_main!(benches);
