/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use nanorand::{Rng, WyRand};
use pictor_bmp::{BmpDecoder, BmpDecoderErrors, BmpEncoder};
use pictor_core::bytestream::ZCursor;
use pictor_core::colorspace::ColorSpace;
use pictor_core::options::{DecoderOptions, EncoderOptions};

const RED: [u8; 4] = [0, 0, 255, 0];
const GREEN: [u8; 4] = [0, 255, 0, 0];
const BLUE: [u8; 4] = [255, 0, 0, 0];

/// A 40 byte info header
fn info_header(width: i32, height: i32, depth: u16, compression: u32, colors: u32) -> Vec<u8> {
    let mut header = vec![];
    header.extend_from_slice(&40_u32.to_le_bytes());
    header.extend_from_slice(&width.to_le_bytes());
    header.extend_from_slice(&height.to_le_bytes());
    header.extend_from_slice(&1_u16.to_le_bytes());
    header.extend_from_slice(&depth.to_le_bytes());
    header.extend_from_slice(&compression.to_le_bytes());
    header.extend_from_slice(&[0; 12]);
    header.extend_from_slice(&colors.to_le_bytes());
    header.extend_from_slice(&0_u32.to_le_bytes());
    header
}

fn build(info: &[u8], palette: &[[u8; 4]], pixels: &[u8]) -> Vec<u8> {
    let offset = 14 + info.len() + palette.len() * 4;
    let mut file = vec![];
    file.extend_from_slice(b"BM");
    file.extend_from_slice(&((offset + pixels.len()) as u32).to_le_bytes());
    file.extend_from_slice(&[0; 4]);
    file.extend_from_slice(&(offset as u32).to_le_bytes());
    file.extend_from_slice(info);
    palette.iter().for_each(|x| file.extend_from_slice(x));
    file.extend_from_slice(pixels);
    file
}

fn decode(file: &[u8]) -> Result<Vec<u8>, BmpDecoderErrors> {
    BmpDecoder::new(ZCursor::new(file)).decode()
}

#[test]
fn one_bit_palette() {
    let black = [0, 0, 0, 0];
    let white = [255, 255, 255, 0];
    // bottom row first, each row padded to four bytes
    let pixels = [0b1010_0000, 0, 0, 0, 0b0100_0000, 0, 0, 0];
    let file = build(&info_header(3, 2, 1, 0, 2), &[black, white], &pixels);

    assert_eq!(
        decode(&file).unwrap(),
        [0, 0, 0, 255, 255, 255, 0, 0, 0, 255, 255, 255, 0, 0, 0, 255, 255, 255]
    );
}

#[test]
fn rle8_runs_and_absolute() {
    #[rustfmt::skip]
    let stream = [
        // bottom row, run of one, absolute run of three (padded), end of line
        1, 1, 0, 3, 2, 0, 1, 0, 0, 0,
        // top row, run of four then end of bitmap
        4, 2, 0, 1
    ];
    let file = build(&info_header(4, 2, 8, 1, 3), &[RED, GREEN, BLUE], &stream);
    let mut decoder = BmpDecoder::new(ZCursor::new(&file));
    let pixels = decoder.decode().unwrap();

    assert_eq!(decoder.colorspace(), Some(ColorSpace::RGB));
    assert_eq!(&pixels[..12], [0, 0, 255].repeat(4));
    assert_eq!(
        &pixels[12..],
        [0, 255, 0, 0, 0, 255, 255, 0, 0, 0, 255, 0]
    );
}

#[test]
fn rle4_alternates_nibbles() {
    let stream = [5, 0x01, 0, 1];
    let file = build(&info_header(5, 1, 4, 2, 2), &[RED, GREEN], &stream);

    assert_eq!(
        decode(&file).unwrap(),
        [255, 0, 0, 0, 255, 0, 255, 0, 0, 0, 255, 0, 255, 0, 0]
    );
}

#[test]
fn palette_index_out_of_range_fails() {
    let stream = [2, 5, 0, 1];
    let file = build(&info_header(2, 1, 8, 1, 3), &[RED, GREEN, BLUE], &stream);

    assert!(matches!(
        decode(&file),
        Err(BmpDecoderErrors::InvalidPaletteIndex(_))
    ));
}

#[test]
fn top_down_555() {
    // a negative height stores rows top to bottom
    let pixels = [0x00, 0x7C, 0, 0, 0x1F, 0x00, 0, 0, 0xE0, 0x03, 0, 0];
    let file = build(&info_header(1, -3, 16, 0, 0), &[], &pixels);

    assert_eq!(decode(&file).unwrap(), [255, 0, 0, 0, 0, 255, 0, 255, 0]);
}

#[test]
fn zero_alpha_32_bit_is_opaque() {
    let pixels = [1, 2, 3, 0, 4, 5, 6, 0];
    let file = build(&info_header(2, 1, 32, 0, 0), &[], &pixels);
    assert_eq!(decode(&file).unwrap(), [3, 2, 1, 255, 6, 5, 4, 255]);

    let pixels = [1, 2, 3, 0, 4, 5, 6, 9];
    let file = build(&info_header(2, 1, 32, 0, 0), &[], &pixels);
    assert_eq!(decode(&file).unwrap(), [3, 2, 1, 0, 6, 5, 4, 9]);
}

#[test]
fn eight_bit_without_palette_is_gray() {
    let file = build(&info_header(2, 1, 8, 0, 0), &[], &[7, 9, 0, 0]);
    let mut decoder = BmpDecoder::new(ZCursor::new(&file));

    assert_eq!(decoder.decode().unwrap(), [7, 9]);
    assert_eq!(decoder.colorspace(), Some(ColorSpace::Luma));
}

#[test]
fn malformed_headers() {
    let file = build(&info_header(0, 1, 24, 0, 0), &[], &[0; 4]);
    assert!(decode(&file).is_err());

    let file = build(&info_header(1, 1, 24, 4, 0), &[], &[0; 4]);
    let err = decode(&file).unwrap_err();
    assert!(err.is_unsupported());

    let file = build(&info_header(1, 1, 7, 0, 0), &[], &[0; 4]);
    assert!(decode(&file).unwrap_err().is_unsupported());

    assert!(matches!(
        decode(b"BX"),
        Err(BmpDecoderErrors::InvalidMagicBytes)
    ));

    let file = build(&info_header(100, 100, 24, 0, 0), &[], &[]);
    let options = DecoderOptions::default().set_max_width(50);
    assert!(matches!(
        BmpDecoder::new_with_options(ZCursor::new(&file), options).decode_headers(),
        Err(BmpDecoderErrors::TooLargeDimensions(..))
    ));
}

#[test]
fn truncation() {
    let pixels = vec![128_u8; 8 * 8 * 3];
    let mut file = vec![];
    BmpEncoder::new(&pixels, EncoderOptions::new(8, 8, ColorSpace::RGB))
        .encode(&mut file)
        .unwrap();

    for cut in [10, 30, 53] {
        let mut decoder = BmpDecoder::new(ZCursor::new(&file[..cut]));
        assert!(decoder.decode_headers().is_err(), "cut at {cut}");
    }
    let mut decoder = BmpDecoder::new(ZCursor::new(&file[..file.len() - 5]));
    assert!(decoder.decode_headers().is_ok());
    assert!(decoder.decode().is_err());
}

#[test]
fn random_round_trips() {
    let mut rng = WyRand::new_seed(0xB3);

    for _ in 0..20 {
        let width = rng.generate_range(1_usize..40);
        let height = rng.generate_range(1_usize..40);
        let colorspace = if rng.generate_range(0_u8..2) == 0 {
            ColorSpace::RGBA
        } else {
            ColorSpace::RGB
        };
        let pixels: Vec<u8> = (0..width * height * colorspace.num_components())
            .map(|_| rng.generate::<u8>())
            .collect();

        let mut file = vec![];
        BmpEncoder::new(&pixels, EncoderOptions::new(width, height, colorspace))
            .encode(&mut file)
            .unwrap();

        let mut decoder = BmpDecoder::new(ZCursor::new(&file));
        assert_eq!(decoder.decode().unwrap(), pixels);
        assert_eq!(decoder.dimensions(), Some((width, height)));
    }
}
