/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Decoder tests against hand built and `png` crate encoded files
use nanorand::{Rng, WyRand};
use pictor_core::bytestream::ZCursor;
use pictor_core::color::Color;
use pictor_core::colorspace::ColorSpace;
use pictor_core::options::{DecoderOptions, EncoderOptions};
use pictor_inflate::DeflateEncoder;
use pictor_png::{ApngCanvas, PngDecodeErrors, PngDecoder, PngEncoder};

fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = u32::MAX;
    for &byte in bytes {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 == 1 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
        }
    }
    !crc
}

fn chunk(name: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = (data.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(name);
    out.extend_from_slice(data);
    out.extend_from_slice(&crc32(&out[4..]).to_be_bytes());
    out
}

fn ihdr(width: u32, height: u32, depth: u8, color: u8, interlace: u8) -> Vec<u8> {
    let mut data = width.to_be_bytes().to_vec();
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[depth, color, 0, 0, interlace]);
    chunk(b"IHDR", &data)
}

fn fctl(
    sequence: u32, w: u32, h: u32, x: u32, y: u32, delay: (u16, u16), dispose: u8, blend: u8
) -> Vec<u8> {
    let mut data = Vec::new();
    for v in [sequence, w, h, x, y] {
        data.extend_from_slice(&v.to_be_bytes());
    }
    data.extend_from_slice(&delay.0.to_be_bytes());
    data.extend_from_slice(&delay.1.to_be_bytes());
    data.extend_from_slice(&[dispose, blend]);
    chunk(b"fcTL", &data)
}

fn fdat(sequence: u32, raw: &[u8]) -> Vec<u8> {
    let mut data = sequence.to_be_bytes().to_vec();
    data.extend_from_slice(&DeflateEncoder::new(raw).encode_zlib());
    chunk(b"fdAT", &data)
}

fn png_file(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    for c in chunks {
        out.extend_from_slice(c);
    }
    out
}

fn idat(raw: &[u8]) -> Vec<u8> {
    chunk(b"IDAT", &DeflateEncoder::new(raw).encode_zlib())
}

fn encode_with_png_crate(
    width: u32, height: u32, color: png::ColorType, depth: png::BitDepth, data: &[u8],
    palette: Option<&[u8]>, trns: Option<&[u8]>
) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(color);
        encoder.set_depth(depth);
        if let Some(palette) = palette {
            encoder.set_palette(palette.to_vec());
        }
        if let Some(trns) = trns {
            encoder.set_trns(trns.to_vec());
        }
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(data).unwrap();
        writer.finish().unwrap();
    }
    out
}

#[test]
fn gray_low_depths_are_scaled() {
    let (width, height) = (5_usize, 3_usize);

    for (depth, png_depth) in [
        (1_usize, png::BitDepth::One),
        (2, png::BitDepth::Two),
        (4, png::BitDepth::Four)
    ] {
        let max = (1 << depth) - 1;
        let row_bytes = (width * depth + 7) / 8;
        let mut packed = vec![0_u8; row_bytes * height];
        let mut expected = Vec::new();

        for y in 0..height {
            for x in 0..width {
                let v = (x + y) & max;
                let bit = x * depth;
                packed[y * row_bytes + bit / 8] |= (v << (8 - depth - bit % 8)) as u8;
                expected.push((v * 255 / max) as u8);
            }
        }
        let file = encode_with_png_crate(
            width as u32,
            height as u32,
            png::ColorType::Grayscale,
            png_depth,
            &packed,
            None,
            None
        );
        let mut decoder = PngDecoder::new(ZCursor::new(&file));
        let pixels = decoder.decode().unwrap();
        assert_eq!(decoder.colorspace(), Some(ColorSpace::Luma));
        assert_eq!(pixels, expected, "depth {depth}");
    }
}

#[test]
fn sixteen_bit_keeps_high_byte() {
    let data: Vec<u8> = (0..4 * 2 * 6).map(|x| (x * 13) as u8).collect();
    let file = encode_with_png_crate(
        4,
        2,
        png::ColorType::Rgb,
        png::BitDepth::Sixteen,
        &data,
        None,
        None
    );
    let pixels = PngDecoder::new(ZCursor::new(&file)).decode().unwrap();
    let expected: Vec<u8> = data.chunks_exact(2).map(|x| x[0]).collect();
    assert_eq!(pixels, expected);
}

#[test]
fn palette_with_transparency() {
    let palette = [255_u8, 0, 0, 0, 255, 0, 0, 0, 255];
    let trns = [0_u8, 128];
    let indices = [0_u8, 1, 2, 2, 1, 0];
    let file = encode_with_png_crate(
        3,
        2,
        png::ColorType::Indexed,
        png::BitDepth::Eight,
        &indices,
        Some(&palette[..]),
        Some(&trns[..])
    );
    let mut decoder = PngDecoder::new(ZCursor::new(&file));
    let pixels = decoder.decode().unwrap();
    assert_eq!(decoder.colorspace(), Some(ColorSpace::RGBA));

    let expected: Vec<u8> = indices
        .iter()
        .flat_map(|&i| {
            let i = usize::from(i);
            let alpha = trns.get(i).copied().unwrap_or(255);
            [palette[i * 3], palette[i * 3 + 1], palette[i * 3 + 2], alpha]
        })
        .collect();
    assert_eq!(pixels, expected);
}

#[test]
fn palette_index_out_of_range_fails() {
    let file = png_file(&[
        ihdr(2, 1, 8, 3, 0),
        chunk(b"PLTE", &[1, 2, 3]),
        idat(&[0, 0, 1]),
        chunk(b"IEND", &[])
    ]);
    let mut decoder = PngDecoder::new(ZCursor::new(&file));
    decoder.decode_headers().unwrap();
    assert!(matches!(
        decoder.decode(),
        Err(PngDecodeErrors::InvalidPaletteIndex(_))
    ));
}

#[test]
fn gray_color_key_adds_alpha() {
    let data = [7_u8, 8, 7, 9];
    let file = encode_with_png_crate(
        2,
        2,
        png::ColorType::Grayscale,
        png::BitDepth::Eight,
        &data,
        None,
        Some(&[0_u8, 7][..])
    );
    let mut decoder = PngDecoder::new(ZCursor::new(&file));
    let pixels = decoder.decode().unwrap();
    assert_eq!(decoder.colorspace(), Some(ColorSpace::LumaA));
    assert_eq!(pixels, [7, 0, 8, 255, 7, 0, 9, 255]);
}

#[test]
fn adam7_interlaced_rgb() {
    const XORIG: [usize; 7] = [0, 4, 0, 2, 0, 1, 0];
    const YORIG: [usize; 7] = [0, 0, 4, 0, 2, 0, 1];
    const XSPC: [usize; 7] = [8, 8, 4, 4, 2, 2, 1];
    const YSPC: [usize; 7] = [8, 8, 8, 4, 4, 2, 2];

    let (width, height) = (11, 7);
    let image: Vec<u8> = (0..width * height * 3).map(|x| (x * 5 % 256) as u8).collect();

    let mut raw = Vec::new();
    for p in 0..7 {
        let mut rows = Vec::new();
        for y in (YORIG[p]..height).step_by(YSPC[p]) {
            let mut row = vec![0_u8];
            for x in (XORIG[p]..width).step_by(XSPC[p]) {
                let i = (y * width + x) * 3;
                row.extend_from_slice(&image[i..i + 3]);
            }
            if row.len() > 1 {
                rows.push(row);
            }
        }
        rows.iter().for_each(|r| raw.extend_from_slice(r));
    }
    let file = png_file(&[
        ihdr(width as u32, height as u32, 8, 2, 1),
        idat(&raw),
        chunk(b"IEND", &[])
    ]);
    let pixels = PngDecoder::new(ZCursor::new(&file)).decode().unwrap();
    assert_eq!(pixels, image);
}

#[test]
fn bad_crc_is_detected() {
    let mut file = png_file(&[ihdr(1, 1, 8, 0, 0), idat(&[0, 9]), chunk(b"IEND", &[])]);
    // last byte of the IHDR crc
    file[8 + 8 + 13 + 3] ^= 0xFF;

    let mut decoder = PngDecoder::new(ZCursor::new(&file));
    assert!(matches!(
        decoder.decode_headers(),
        Err(PngDecodeErrors::BadCrc(_, _))
    ));

    let options = DecoderOptions::default().png_set_confirm_crc(false);
    let mut decoder = PngDecoder::new_with_options(ZCursor::new(&file), options);
    assert_eq!(decoder.decode().unwrap(), [9]);
}

#[test]
fn unknown_critical_chunk_is_unsupported() {
    let file = png_file(&[
        ihdr(1, 1, 8, 0, 0),
        chunk(b"ABCD", &[1, 2]),
        idat(&[0, 9]),
        chunk(b"IEND", &[])
    ]);
    let err = PngDecoder::new(ZCursor::new(&file))
        .decode_headers()
        .unwrap_err();
    assert!(err.is_unsupported());

    // ancillary chunks are skipped
    let file = png_file(&[
        ihdr(1, 1, 8, 0, 0),
        chunk(b"abCD", &[1, 2]),
        idat(&[0, 9]),
        chunk(b"IEND", &[])
    ]);
    assert_eq!(PngDecoder::new(ZCursor::new(&file)).decode().unwrap(), [9]);
}

#[test]
fn truncation() {
    let data: Vec<u8> = (0..30 * 20 * 3).map(|x| (x % 256) as u8).collect();
    let mut file = vec![];
    PngEncoder::new(&data, EncoderOptions::new(30, 20, ColorSpace::RGB))
        .encode(&mut file)
        .unwrap();

    for cut in [0, 7, 8, 20, 32] {
        let mut decoder = PngDecoder::new(ZCursor::new(&file[..cut]));
        assert!(decoder.decode_headers().is_err(), "cut at {cut}");
    }
    for cut in [file.len() / 2, file.len() - 13, file.len() - 1] {
        let mut decoder = PngDecoder::new(ZCursor::new(&file[..cut]));
        decoder.decode_headers().unwrap();
        assert!(decoder.decode().is_err(), "cut at {cut}");
    }
}

#[test]
fn apng_with_default_image_as_first_frame() {
    let red = [255_u8, 0, 0, 255];
    let half_blue = [0_u8, 0, 255, 128];

    let mut frame0 = vec![0_u8];
    frame0.extend_from_slice(&red);
    frame0.extend_from_slice(&red);
    let mut frame1 = vec![0_u8];
    frame1.extend_from_slice(&half_blue);

    let mut actl = 2_u32.to_be_bytes().to_vec();
    actl.extend_from_slice(&3_u32.to_be_bytes());

    let file = png_file(&[
        ihdr(2, 1, 8, 6, 0),
        chunk(b"acTL", &actl),
        fctl(0, 2, 1, 0, 0, (1, 10), 0, 0),
        idat(&frame0),
        fctl(1, 1, 1, 1, 0, (20, 0), 0, 1),
        fdat(2, &frame1),
        chunk(b"IEND", &[])
    ]);
    let mut decoder = PngDecoder::new(ZCursor::new(&file));
    decoder.decode_headers().unwrap();
    assert!(decoder.is_animated());
    assert!(decoder.default_image_is_frame());
    assert_eq!(decoder.num_frames(), 2);
    assert_eq!(decoder.num_plays(), Some(3));

    let mut canvas = ApngCanvas::new(2, 1);

    let first = decoder.next_frame().unwrap().unwrap();
    assert_eq!(first.control.duration_ms(), 100);
    assert_eq!(canvas.render(&first).unwrap(), [red, red].concat());

    let second = decoder.next_frame().unwrap().unwrap();
    assert_eq!(second.control.duration_ms(), 200);
    assert_eq!((second.control.x_offset, second.control.width), (1, 1));

    let blended = Color::new(0, 0, 255, 128)
        .blend_over(Color::new(255, 0, 0, 255))
        .to_array();
    assert_eq!(canvas.render(&second).unwrap(), [red, blended].concat());

    assert!(decoder.next_frame().unwrap().is_none());
}

#[test]
fn apng_default_image_outside_animation() {
    let mut actl = 1_u32.to_be_bytes().to_vec();
    actl.extend_from_slice(&0_u32.to_be_bytes());

    let file = png_file(&[
        ihdr(1, 1, 8, 2, 0),
        chunk(b"acTL", &actl),
        idat(&[0, 255, 0, 0]),
        fctl(0, 1, 1, 0, 0, (0, 0), 0, 0),
        fdat(1, &[0, 0, 0, 255]),
        chunk(b"IEND", &[])
    ]);
    let mut decoder = PngDecoder::new(ZCursor::new(&file));
    decoder.decode_headers().unwrap();
    assert!(!decoder.default_image_is_frame());
    assert_eq!(decoder.num_frames(), 1);
    assert_eq!(decoder.num_plays(), Some(0));

    let frame = decoder.next_frame().unwrap().unwrap();
    assert_eq!(frame.pixels, [0, 0, 255, 255]);
    assert!(decoder.next_frame().unwrap().is_none());

    // the still image is the default image
    assert_eq!(decoder.decode().unwrap(), [255, 0, 0]);

    // animation can be turned off
    let options = DecoderOptions::default().png_set_decode_animated(false);
    let mut decoder = PngDecoder::new_with_options(ZCursor::new(&file), options);
    decoder.decode_headers().unwrap();
    assert!(!decoder.is_animated());
    assert_eq!(decoder.num_plays(), None);
    let frame = decoder.next_frame().unwrap().unwrap();
    assert_eq!(frame.pixels, [255, 0, 0, 255]);
}

#[test]
fn random_round_trips() {
    let mut rng = WyRand::new_seed(0x504E47);

    for _ in 0..20 {
        let width = rng.generate_range(1_usize..40);
        let height = rng.generate_range(1_usize..40);
        let colorspace = [
            ColorSpace::Luma,
            ColorSpace::LumaA,
            ColorSpace::RGB,
            ColorSpace::RGBA
        ][rng.generate_range(0_usize..4)];
        let effort = rng.generate_range(0_u8..10);

        let mut data = vec![0_u8; width * height * colorspace.num_components()];
        rng.fill(&mut data);

        let options = EncoderOptions::new(width, height, colorspace).set_effort(effort);
        let mut file = vec![];
        PngEncoder::new(&data, options).encode(&mut file).unwrap();

        // cross check with the reference decoder
        let reference = png::Decoder::new(file.as_slice());
        let mut reader = reference.read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size()];
        reader.next_frame(&mut buf).unwrap();
        assert_eq!(buf, data);

        let mut decoder = PngDecoder::new(ZCursor::new(&file));
        assert_eq!(decoder.decode().unwrap(), data);
        assert_eq!(decoder.colorspace(), Some(colorspace));
    }
}
