/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Every format documents its own loop count convention, each is checked
//! on its own
use pictor_image::pictor_core::colorspace::ColorSpace;
use pictor_image::pictor_core::options::EncoderOptions;
use pictor_image::{decoder_for, ImageFormat};
use pictor_inflate::DeflateEncoder;
use pictor_webp::{FrameControl, WebpAnimationEncoder};

use crate::{conformance, png_chunk};

/// A 1x1 apng with `frames` opaque frames played `plays` times
fn apng(frames: u32, plays: u32) -> Vec<u8> {
    let mut ihdr = 1_u32.to_be_bytes().to_vec();
    ihdr.extend_from_slice(&1_u32.to_be_bytes());
    ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);

    let mut actl = frames.to_be_bytes().to_vec();
    actl.extend_from_slice(&plays.to_be_bytes());

    let mut out = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    out.extend(png_chunk(b"IHDR", &ihdr));
    out.extend(png_chunk(b"acTL", &actl));

    let mut sequence = 0_u32;
    for frame in 0..frames {
        let mut fctl = sequence.to_be_bytes().to_vec();
        for v in [1_u32, 1, 0, 0] {
            fctl.extend_from_slice(&v.to_be_bytes());
        }
        // 50ms, dispose none, blend source
        fctl.extend_from_slice(&[0, 5, 0, 100, 0, 0]);
        out.extend(png_chunk(b"fcTL", &fctl));
        sequence += 1;

        let zlib = DeflateEncoder::new(&[0, 40 * frame as u8, 0, 0, 255]).encode_zlib();
        if frame == 0 {
            out.extend(png_chunk(b"IDAT", &zlib));
        } else {
            let mut fdat = sequence.to_be_bytes().to_vec();
            fdat.extend_from_slice(&zlib);
            out.extend(png_chunk(b"fdAT", &fdat));
            sequence += 1;
        }
    }
    out.extend(png_chunk(b"IEND", &[]));
    out
}

/// A 2x2 animated webp with `frames` frames and the given loop count
fn animated_webp(frames: usize, loop_count: u16) -> Vec<u8> {
    let options = EncoderOptions::new(2, 2, ColorSpace::RGBA).set_lossless(true);
    let mut encoder = WebpAnimationEncoder::new(options);
    encoder.set_loop_count(loop_count);

    for frame in 0..frames {
        let control = FrameControl {
            width: 2,
            height: 2,
            duration_ms: 30,
            ..Default::default()
        };
        let pixels = [frame as u8 * 50, 0, 0, 255].repeat(4);
        encoder.add_frame(&pixels, control).unwrap();
    }
    let mut file = vec![];
    encoder.encode(&mut file).unwrap();
    file
}

#[test]
fn test_still_formats_have_no_loop_count() {
    let conformance = conformance();

    for case in &conformance.cases {
        for bitmap in conformance.gradients() {
            let data = case.encode(&bitmap);
            let decoder = decoder_for(&data).unwrap();

            assert_eq!(decoder.loop_count(), None, "{}", case.name);
        }
    }
}

#[test]
fn test_png_loop_count() {
    // zero plays is an endless loop
    for plays in [0, 1, 7] {
        let data = apng(3, plays);
        let mut decoder = decoder_for(&data).unwrap();

        assert_eq!(decoder.format(), ImageFormat::Png);
        assert_eq!(decoder.frame_count(), 3);
        assert!(decoder.is_animated());
        assert_eq!(decoder.loop_count(), Some(plays));

        let frames = decoder.frames().unwrap();
        assert!(frames.iter().all(|f| f.duration_ms() == 50));
        assert_eq!(frames[2].bitmap().as_bytes(), [80_u8, 0, 0, 255]);
    }
    // a single frame animation is a still image
    let data = apng(1, 4);
    let decoder = decoder_for(&data).unwrap();
    assert_eq!(decoder.frame_count(), 1);
    assert!(!decoder.is_animated());
    assert_eq!(decoder.loop_count(), None);
}

#[test]
fn test_webp_loop_count() {
    // zero is an endless loop
    for loop_count in [0, 1, 5] {
        let data = animated_webp(2, loop_count);
        let mut decoder = decoder_for(&data).unwrap();

        assert_eq!(decoder.format(), ImageFormat::WebP);
        assert_eq!(decoder.frame_count(), 2);
        assert!(decoder.is_animated());
        assert_eq!(decoder.loop_count(), Some(u32::from(loop_count)));

        let last = decoder.frame(1).unwrap();
        assert_eq!(last.duration_ms(), 30);
        assert_eq!(last.bitmap().as_bytes(), [50_u8, 0, 0, 255].repeat(4));
    }
    let data = animated_webp(1, 3);
    let decoder = decoder_for(&data).unwrap();
    assert_eq!(decoder.frame_count(), 1);
    assert!(!decoder.is_animated());
    assert_eq!(decoder.loop_count(), None);
}
