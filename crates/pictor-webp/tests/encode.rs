/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Files written by the encoder are read back with `image`
use nanorand::{Rng, WyRand};
use pictor_core::bytestream::ZCursor;
use pictor_core::colorspace::ColorSpace;
use pictor_core::options::EncoderOptions;
use pictor_webp::{FrameControl, WebpAnimationEncoder, WebpDecoder, WebpEncoder};

fn encode(pixels: &[u8], options: EncoderOptions) -> Vec<u8> {
    let mut out = vec![];
    WebpEncoder::new(pixels, options).encode(&mut out).unwrap();
    out
}

fn decode_with_image(file: &[u8]) -> image::DynamicImage {
    image::load_from_memory_with_format(file, image::ImageFormat::WebP).unwrap()
}

fn psnr(a: &[u8], b: &[u8]) -> f64 {
    let mse = a
        .iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        / a.len() as f64;
    if mse == 0.0 {
        return f64::INFINITY;
    }
    10.0 * (255.0 * 255.0 / mse).log10()
}

#[test]
fn lossless_files_decode_in_image() {
    let mut rng = WyRand::new_seed(0x5745_4250);

    for _ in 0..8 {
        let width = rng.generate_range(1_usize..60);
        let height = rng.generate_range(1_usize..60);
        let effort = rng.generate_range(0_u8..10);

        let mut pixels = vec![0; width * height * 4];
        rng.fill(&mut pixels);
        // a few flat runs so backward references show up
        for px in pixels.chunks_exact_mut(4).step_by(3) {
            px.copy_from_slice(&[9, 8, 7, 255]);
        }
        let options = EncoderOptions::new(width, height, ColorSpace::RGBA)
            .set_lossless(true)
            .set_effort(effort);
        let file = encode(&pixels, options);

        let decoded = decode_with_image(&file).to_rgba8().into_raw();
        assert_eq!(decoded, pixels, "{width}x{height} effort {effort}");
    }
}

#[test]
fn lossless_palette_images() {
    let (w, h) = (31, 9);
    for colors in [2_usize, 4, 16, 200] {
        let pixels: Vec<u8> = (0..w * h)
            .flat_map(|i| {
                let c = ((i * 7) % colors) as u8;
                [c, c.wrapping_mul(3), 255 - c, 255]
            })
            .collect();
        let options = EncoderOptions::new(w, h, ColorSpace::RGBA).set_lossless(true);
        let file = encode(&pixels, options);

        let decoded = decode_with_image(&file).to_rgba8().into_raw();
        assert_eq!(decoded, pixels, "{colors} colors");
    }
}

#[test]
fn lossy_quality_is_reasonable() {
    let (w, h) = (64, 48);
    let pixels: Vec<u8> = (0..h)
        .flat_map(|y| (0..w).flat_map(move |x| [(x * 4) as u8, (y * 5) as u8, 128]))
        .collect();

    let mut previous = 0.0;
    for quality in [20, 60, 95] {
        let options = EncoderOptions::new(w, h, ColorSpace::RGB)
            .set_quality(quality)
            .set_lossless(false);
        let file = encode(&pixels, options);

        let reference = decode_with_image(&file).to_rgb8().into_raw();
        let ours = WebpDecoder::new(ZCursor::new(&file)).decode().unwrap();
        assert_eq!(ours.len(), reference.len());

        let score = psnr(&ours, &pixels);
        assert!(score > 25.0, "quality {quality}: {score}");
        assert!(score + 0.5 >= previous, "quality {quality}: {score} < {previous}");
        assert!(psnr(&ours, &reference) > 35.0);
        previous = score;
    }
}

#[test]
fn lossy_with_alpha_decodes_in_image() {
    let (w, h) = (23, 19);
    let pixels: Vec<u8> = (0..w * h)
        .flat_map(|i| [200, 40, 90, (i * 3 % 256) as u8])
        .collect();
    let options = EncoderOptions::new(w, h, ColorSpace::RGBA)
        .set_quality(80)
        .set_effort(6)
        .set_lossless(false);
    let file = encode(&pixels, options);

    let decoded = decode_with_image(&file).to_rgba8().into_raw();
    for (a, b) in decoded.chunks_exact(4).zip(pixels.chunks_exact(4)) {
        assert_eq!(a[3], b[3]);
    }
}

#[test]
fn animation_round_trip() {
    let options = EncoderOptions::new(6, 4, ColorSpace::RGBA).set_lossless(true);
    let mut encoder = WebpAnimationEncoder::new(options);
    encoder.set_loop_count(2);

    let full = FrameControl {
        width: 6,
        height: 4,
        duration_ms: 40,
        ..Default::default()
    };
    let corner = FrameControl {
        x_offset: 2,
        y_offset: 2,
        width: 2,
        height: 2,
        duration_ms: 80,
        ..Default::default()
    };
    encoder
        .add_frame(&[10, 20, 30, 255].repeat(24), full)
        .unwrap();
    encoder
        .add_frame(&[0, 255, 0, 255].repeat(4), corner)
        .unwrap();
    assert!(encoder
        .add_frame(&[0; 16], FrameControl { x_offset: 1, ..corner })
        .is_err());

    let mut file = vec![];
    encoder.encode(&mut file).unwrap();

    let mut decoder = WebpDecoder::new(ZCursor::new(&file));
    decoder.decode_headers().unwrap();
    assert_eq!(decoder.num_frames(), 2);
    assert_eq!(decoder.loop_count(), Some(2));

    let second = decoder.decode_frame(1).unwrap();
    assert_eq!(second.control, corner);
    assert_eq!(second.pixels, [0, 255, 0, 255].repeat(4));
}
