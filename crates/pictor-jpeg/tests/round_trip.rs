/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Encoder and decoder checks, with jpeg-decoder as the reference decoder
use nanorand::{Rng, WyRand};
use pictor_core::bytestream::ZCursor;
use pictor_core::colorspace::ColorSpace;
use pictor_core::options::{DecoderOptions, EncoderOptions};
use pictor_jpeg::{DecodeErrors, EncodeErrors, JpegDecoder, JpegEncoder, UnsupportedSchemes};
use xxhash_rust::xxh3::xxh3_64;

fn gradient(width: usize, height: usize, components: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width * height * components);
    for y in 0..height {
        for x in 0..width {
            let px = [
                (x * 255 / width) as u8,
                (y * 255 / height) as u8,
                (x + y) as u8,
                255
            ];
            pixels.extend_from_slice(&px[..components]);
        }
    }
    pixels
}

fn encode(pixels: &[u8], width: usize, height: usize, colorspace: ColorSpace, quality: u8) -> Vec<u8> {
    let options = EncoderOptions::new(width, height, colorspace).set_quality(quality);
    let mut out = vec![];
    JpegEncoder::new(pixels, options).encode(&mut out).unwrap();
    out
}

fn decode(data: &[u8]) -> Vec<u8> {
    JpegDecoder::new(ZCursor::new(data)).decode().unwrap()
}

fn mean_abs_diff(a: &[u8], b: &[u8]) -> f64 {
    assert_eq!(a.len(), b.len());
    let sum: u64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| u64::from(x.abs_diff(*y)))
        .sum();
    sum as f64 / a.len() as f64
}

fn max_abs_diff(a: &[u8], b: &[u8]) -> u8 {
    a.iter().zip(b).map(|(x, y)| x.abs_diff(*y)).max().unwrap_or(0)
}

#[test]
fn color_image_matches_jpeg_decoder() {
    let pixels = gradient(47, 33, 3);
    let data = encode(&pixels, 47, 33, ColorSpace::RGB, 90);

    let ours = decode(&data);

    let mut reference = jpeg_decoder::Decoder::new(data.as_slice());
    let theirs = reference.decode().unwrap();
    let info = reference.info().unwrap();

    assert_eq!((info.width, info.height), (47, 33));
    assert_eq!(info.pixel_format, jpeg_decoder::PixelFormat::RGB24);
    assert!(mean_abs_diff(&ours, &theirs) < 1.0);
    assert!(max_abs_diff(&ours, &theirs) <= 8);
}

#[test]
fn grayscale_image_matches_jpeg_decoder() {
    let pixels = gradient(47, 33, 1);
    let data = encode(&pixels, 47, 33, ColorSpace::Luma, 75);

    let mut decoder = JpegDecoder::new(ZCursor::new(&data));
    let ours = decoder.decode().unwrap();
    assert_eq!(decoder.colorspace(), Some(ColorSpace::Luma));

    let theirs = jpeg_decoder::Decoder::new(data.as_slice()).decode().unwrap();
    assert_eq!(ours.len(), 47 * 33);
    assert!(max_abs_diff(&ours, &theirs) <= 2);
}

#[test]
fn high_quality_is_close_to_the_source() {
    let pixels = gradient(64, 48, 3);
    let data = encode(&pixels, 64, 48, ColorSpace::RGB, 95);
    assert!(mean_abs_diff(&decode(&data), &pixels) < 4.0);
}

#[test]
fn alpha_is_dropped() {
    let pixels = gradient(47, 33, 4);
    let data = encode(&pixels, 47, 33, ColorSpace::RGBA, 80);

    let mut decoder = JpegDecoder::new(ZCursor::new(&data));
    let decoded = decoder.decode().unwrap();

    assert_eq!(decoder.dimensions(), Some((47, 33)));
    assert_eq!(decoder.colorspace(), Some(ColorSpace::RGB));
    assert_eq!(decoded.len(), 47 * 33 * 3);
}

#[test]
fn single_pixel() {
    for (colorspace, components) in [(ColorSpace::RGB, 3), (ColorSpace::Luma, 1)] {
        let pixels = vec![90_u8; components];
        let data = encode(&pixels, 1, 1, colorspace, 100);
        let decoded = decode(&data);

        assert_eq!(decoded.len(), components);
        assert!(decoded.iter().all(|x| x.abs_diff(90) <= 2));
    }
}

#[test]
fn encoding_is_deterministic() {
    let pixels = gradient(47, 33, 3);
    let a = encode(&pixels, 47, 33, ColorSpace::RGB, 80);
    let b = encode(&pixels, 47, 33, ColorSpace::RGB, 80);
    assert_eq!(a, b);
    assert_eq!(decode(&a), decode(&b));
}

#[test]
fn random_noise_decodes_the_same_every_time() {
    let mut rng = WyRand::new_seed(0x4A50_4547);

    for _ in 0..8 {
        let width = rng.generate_range(1_usize..50);
        let height = rng.generate_range(1_usize..50);
        let mut pixels = vec![0_u8; width * height * 3];
        rng.fill(&mut pixels);

        let data = encode(&pixels, width, height, ColorSpace::RGB, 85);
        let first = decode(&data);

        assert_eq!(first.len(), pixels.len(), "{width}x{height}");
        assert_eq!(xxh3_64(&first), xxh3_64(&decode(&data)), "{width}x{height}");

        let theirs = jpeg_decoder::Decoder::new(data.as_slice()).decode().unwrap();
        assert_eq!(theirs.len(), first.len());
    }
}

#[test]
fn quality_changes_size() {
    let pixels = gradient(64, 64, 3);
    let low = encode(&pixels, 64, 64, ColorSpace::RGB, 10);
    let high = encode(&pixels, 64, 64, ColorSpace::RGB, 100);
    assert!(low.len() < high.len());
}

#[test]
fn bad_encoder_input() {
    let pixels = [0_u8; 12];

    let result = JpegEncoder::new(&pixels, EncoderOptions::new(2, 2, ColorSpace::BGR)).encode(&mut vec![]);
    assert!(matches!(result, Err(EncodeErrors::UnsupportedColorspace(_))));

    let result = JpegEncoder::new(&pixels, EncoderOptions::new(0, 2, ColorSpace::RGB)).encode(&mut vec![]);
    assert!(matches!(result, Err(EncodeErrors::InvalidDimensions(0, 2))));

    let result = JpegEncoder::new(&pixels, EncoderOptions::new(3, 3, ColorSpace::RGB)).encode(&mut vec![]);
    assert!(matches!(result, Err(EncodeErrors::WrongInputSize(27, 12))));
}

#[test]
fn truncated_headers_are_not_entropy_errors() {
    let data = encode(&gradient(16, 16, 3), 16, 16, ColorSpace::RGB, 80);

    for length in [0, 1, 2, 10, 100] {
        let err = JpegDecoder::new(ZCursor::new(&data[..length]))
            .decode_headers()
            .unwrap_err();
        assert!(!err.is_entropy_error(), "{err:?}");
    }
}

#[test]
fn truncated_scans_are_entropy_errors() {
    let pixels = gradient(47, 33, 3);
    let data = encode(&pixels, 47, 33, ColorSpace::RGB, 80);

    // missing end of image marker and a scan cut in half
    let sos = data.windows(2).position(|w| w == [0xFF, 0xDA]).unwrap();
    let half = sos + (data.len() - sos) / 2;

    for length in [data.len() - 2, half] {
        let mut decoder = JpegDecoder::new(ZCursor::new(&data[..length]));
        decoder.decode_headers().unwrap();
        let err = decoder.decode().unwrap_err();
        assert!(err.is_entropy_error(), "{err:?}");
    }
}

#[test]
fn progressive_images_are_unsupported() {
    let data = [0xFF, 0xD8, 0xFF, 0xC2, 0x00, 0x11, 0x08, 0x00, 0x10, 0x00, 0x10, 0x03];
    let err = JpegDecoder::new(ZCursor::new(&data)).decode().unwrap_err();

    assert!(err.is_unsupported());
    assert!(matches!(
        err,
        DecodeErrors::Unsupported(UnsupportedSchemes::ProgressiveDctHuffman)
    ));
}

#[test]
fn bad_magic_bytes() {
    let err = JpegDecoder::new(ZCursor::new(&[0x89_u8, b'P', b'N', b'G'][..]))
        .decode()
        .unwrap_err();
    assert!(matches!(err, DecodeErrors::IllegalMagicBytes(0x8950)));
}

#[test]
fn dimension_limits() {
    let data = encode(&gradient(40, 20, 3), 40, 20, ColorSpace::RGB, 80);
    let options = DecoderOptions::default().set_max_width(32);
    let result = JpegDecoder::new_with_options(ZCursor::new(&data), options).decode();
    assert!(result.is_err());
}

/// Returns everything before the SOS marker and the entropy coded data
fn split_at_scan(data: &[u8]) -> (&[u8], &[u8]) {
    let sos = data.windows(2).position(|w| w == [0xFF, 0xDA]).unwrap();
    let length = usize::from(u16::from_be_bytes([data[sos + 2], data[sos + 3]]));
    let scan_start = sos + 2 + length;
    (&data[..sos], &data[scan_start..data.len() - 2])
}

#[test]
fn restart_intervals_reset_prediction() {
    let left: Vec<u8> = (0..64).map(|i| (i * 3) as u8).collect();
    let right: Vec<u8> = (0..64).map(|i| 250 - (i * 2) as u8).collect();

    let left_jpeg = encode(&left, 8, 8, ColorSpace::Luma, 50);
    let right_jpeg = encode(&right, 8, 8, ColorSpace::Luma, 50);
    let wide_jpeg = encode(&vec![0; 16 * 8], 16, 8, ColorSpace::Luma, 50);

    let (headers, _) = split_at_scan(&wide_jpeg);
    let sos = &wide_jpeg[headers.len()..][..10];

    // each 8x8 image starts with a zero dc prediction, so joining their
    // scans with a restart marker after every MCU gives a valid 16x8 image
    let mut joined = headers.to_vec();
    joined.extend_from_slice(&[0xFF, 0xDD, 0x00, 0x04, 0x00, 0x01]);
    joined.extend_from_slice(sos);
    joined.extend_from_slice(split_at_scan(&left_jpeg).1);
    joined.extend_from_slice(&[0xFF, 0xD0]);
    joined.extend_from_slice(split_at_scan(&right_jpeg).1);
    joined.extend_from_slice(&[0xFF, 0xD9]);

    let decoded = decode(&joined);
    let left_decoded = decode(&left_jpeg);
    let right_decoded = decode(&right_jpeg);

    for y in 0..8 {
        assert_eq!(&decoded[y * 16..y * 16 + 8], &left_decoded[y * 8..y * 8 + 8]);
        assert_eq!(&decoded[y * 16 + 8..y * 16 + 16], &right_decoded[y * 8..y * 8 + 8]);
    }
    let theirs = jpeg_decoder::Decoder::new(joined.as_slice()).decode().unwrap();
    assert!(max_abs_diff(&theirs, &decoded) <= 2);
}
