/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use nanorand::{Rng, WyRand};
use pictor_image::pictor_core::bitmap::{Bitmap, BitmapFormat};
use pictor_image::pictor_core::color::Color;
use pictor_image::{decoder_for, ImageFormat};

use crate::{conformance, TestCase};

#[test]
#[allow(clippy::uninlined_format_args)]
fn test_gradients() {
    let conformance = conformance();

    let mut error = false;
    let mut failed = Vec::new();

    for case in &conformance.cases {
        for bitmap in conformance.gradients() {
            let data = case.encode(&bitmap);

            let mut decoder = decoder_for(&data).unwrap();
            assert_eq!(decoder.format(), case.format(), "{}", case.name);

            let frame = decoder.frame(0).unwrap();

            let matches = if case.lossless {
                frame.bitmap().pixels() == bitmap.pixels()
            } else {
                frame.size() == bitmap.size()
            };
            if decoder.size() != bitmap.size() || !matches {
                error = true;
                failed.push(case.to_owned());
                eprintln!(
                    "Mismatch for case {:?} with {:?}, decoded {:?}\n",
                    case.name,
                    bitmap.format(),
                    frame.bitmap()
                );
            }
        }
    }
    if error {
        panic!("Errors found during round trips\n {:#?}", failed);
    }
}

#[test]
fn test_single_frame_invariant() {
    let conformance = conformance();

    for case in &conformance.cases {
        let [bitmap, _] = conformance.gradients();
        let data = case.encode(&bitmap);
        let mut decoder = decoder_for(&data).unwrap();

        assert_eq!(decoder.frame_count(), 1, "{}", case.name);
        assert!(!decoder.is_animated(), "{}", case.name);
        assert_eq!(decoder.loop_count(), None, "{}", case.name);
        assert_eq!(decoder.frame(0).unwrap().duration_ms(), 0, "{}", case.name);
    }
}

#[test]
fn test_single_pixel() {
    let conformance = conformance();

    for case in conformance.cases.iter().filter(|c| c.lossless) {
        for color in [Color::from_rgb(200, 16, 77), Color::new(3, 250, 128, 90)] {
            let mut bitmap = Bitmap::new(BitmapFormat::Rgba8888, 1, 1).unwrap();
            bitmap.set_pixel(0, 0, color);

            let data = case.encode(&bitmap);
            let decoded = decoder_for(&data).unwrap().frame(0).unwrap();

            assert_eq!(decoded.bitmap().get_pixel(0, 0), Some(color), "{}", case.name);
        }
    }
}

#[test]
fn test_random_buffers() {
    let conformance = conformance();
    let mut rng = WyRand::new_seed(0x434F_4E46);

    for case in &conformance.cases {
        for _ in 0..4 {
            let width = rng.generate_range(1_usize..70);
            let height = rng.generate_range(1_usize..70);

            let mut rgba = vec![0_u8; width * height * 4];
            rng.fill(&mut rgba);
            let bitmap = Bitmap::from_rgba(BitmapFormat::Rgba8888, width, height, &rgba).unwrap();

            let data = case.encode(&bitmap);
            let frame = decoder_for(&data).unwrap().frame(0).unwrap();

            assert_eq!(frame.size(), (width, height), "{}", case.name);

            if case.lossless {
                assert_eq!(
                    frame.bitmap().pixels(),
                    bitmap.pixels(),
                    "{} {}x{}",
                    case.name,
                    width,
                    height
                );
            }
        }
    }
}
