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
use pictor_qoi::{QoiDecoder, QoiEncoder};

const WIDTH: usize = 1024;
const HEIGHT: usize = 768;

/// Smooth gradients with flat patches, what photos and screenshots mix
fn make_image() -> Vec<u8> {
    let mut pixels = Vec::with_capacity(WIDTH * HEIGHT * 4);
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let flat = (x / 64 + y / 64) % 3 == 0;
            let (r, g, b) = if flat {
                (200, 200, 200)
            } else {
                ((x * 255 / WIDTH) as u8, (y * 255 / HEIGHT) as u8, ((x ^ y) & 0xff) as u8)
            };
            pixels.extend_from_slice(&[r, g, b, 255]);
        }
    }
    pixels
}

fn decode_pictor_qoi(data: &[u8]) -> Vec<u8> {
    QoiDecoder::new(ZCursor::new(data)).decode().unwrap()
}

fn bench_decode(c: &mut Criterion) {
    let pixels = make_image();
    let mut data = vec![];
    QoiEncoder::new(
        &pixels,
        EncoderOptions::new(WIDTH, HEIGHT, ColorSpace::RGBA)
    )
    .encode(&mut data)
    .unwrap();

    let mut group = c.benchmark_group("qoi: Simple decode");

    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("pictor-qoi", |b| {
        b.iter(|| black_box(decode_pictor_qoi(data.as_slice())))
    });
}

criterion_group!(name=benches;
      config={
      let c = Criterion::default();
        c.measurement_time(Duration::from_secs(20))
      };
    targets=bench_decode);

criterion_main!(benches);
