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
use pictor_webp::{WebpDecoder, WebpEncoder};

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

fn decode_pictor_webp(data: &[u8]) -> Vec<u8> {
    WebpDecoder::new(ZCursor::new(data)).decode().unwrap()
}

fn decode_ref(data: &[u8]) -> Vec<u8> {
    image::load_from_memory_with_format(data, image::ImageFormat::WebP)
        .unwrap()
        .into_bytes()
}

fn bench_decode(c: &mut Criterion) {
    let pixels = make_image();

    for (name, lossless) in [("lossless", true), ("lossy", false)] {
        let mut data = vec![];
        let options = EncoderOptions::new(WIDTH, HEIGHT, ColorSpace::RGB).set_lossless(lossless);
        WebpEncoder::new(&pixels, options)
            .encode(&mut data)
            .unwrap();

        let mut group = c.benchmark_group(format!("webp: {name} decode"));

        group.throughput(Throughput::Bytes(data.len() as u64));

        group.bench_function("pictor-webp", |b| {
            b.iter(|| black_box(decode_pictor_webp(data.as_slice())))
        });
        group.bench_function("image-rs/webp", |b| {
            b.iter(|| black_box(decode_ref(data.as_slice())))
        });
    }
}

criterion_group!(name=benches;
      config={
      let c = Criterion::default();
        c.measurement_time(Duration::from_secs(20))
      };
    targets=bench_decode);

criterion_main!(benches);
