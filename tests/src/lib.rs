/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Conformance harness for every pictor codec
//!
//! The format matrix lives in `conformance.json` next to this crate's
//! manifest, each case is run against an opaque and a translucent
//! gradient.
#![allow(unused_imports, unused)]

use std::fs::read;
use std::path::{Path, PathBuf};

use pictor_image::pictor_core::bitmap::{Bitmap, BitmapFormat};
use pictor_image::{encoder_for, EncoderConfig, ImageFormat};
use serde::Deserialize;
use xxhash_rust::xxh3::xxh3_128;

mod determinism;
mod loop_count;
mod round_trip;
mod truncation;

#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonFormat {
    Bmp,
    Png,
    Jpeg,
    WebP,
    Qoi
}

impl JsonFormat {
    pub fn to_format(self) -> ImageFormat {
        match self {
            Self::Bmp => ImageFormat::Bmp,
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::WebP => ImageFormat::WebP,
            Self::Qoi => ImageFormat::Qoi
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct TestCase {
    pub name:     String,
    pub format:   JsonFormat,
    pub lossless: bool,
    pub quality:  Option<u8>,
    pub effort:   Option<u8>,
    pub comment:  Option<String>
}

impl TestCase {
    pub fn format(&self) -> ImageFormat {
        self.format.to_format()
    }
    pub fn config(&self) -> EncoderConfig {
        let mut config = EncoderConfig::new();

        if let Some(quality) = self.quality {
            config = config.set_quality(quality);
        }
        if let Some(effort) = self.effort {
            config = config.set_effort(effort);
        }
        config
    }
    /// Encode `bitmap` with this case's format and configuration
    pub fn encode(&self, bitmap: &Bitmap) -> Vec<u8> {
        encoder_for(self.format(), self.config())
            .and_then(|encoder| encoder.encode(bitmap))
            .unwrap_or_else(|e| panic!("{}: {:?}", self.name, e))
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct Conformance {
    pub width:  usize,
    pub height: usize,
    pub cases:  Vec<TestCase>
}

impl Conformance {
    /// The opaque gradient followed by its translucent variant
    pub fn gradients(&self) -> [Bitmap; 2] {
        [
            gradient(self.width, self.height, false),
            gradient(self.width, self.height, true)
        ]
    }
}

pub fn conformance() -> Conformance {
    let file = Path::new(env!("CARGO_MANIFEST_DIR")).join("conformance.json");
    let json_file = read(file).unwrap();

    serde_json::from_slice(&json_file).unwrap()
}

/// Pixel `(x, y)` is `(x*255/w, y*255/h, x+y, 255)`, with alpha `255-x`
/// for the translucent variant
pub fn gradient(width: usize, height: usize, alpha: bool) -> Bitmap {
    let mut rgba = Vec::with_capacity(width * height * 4);

    for y in 0..height {
        for x in 0..width {
            let a = if alpha { 255 - x } else { 255 };
            rgba.extend_from_slice(&[
                (x * 255 / width) as u8,
                (y * 255 / height) as u8,
                (x + y) as u8,
                a as u8
            ]);
        }
    }
    let format = if alpha {
        BitmapFormat::Rgba8888
    } else {
        BitmapFormat::Rgbx8888
    };
    Bitmap::from_rgba(format, width, height, &rgba).unwrap()
}

pub fn hash(contents: &[u8]) -> u128 {
    xxh3_128(contents)
}

/// Offset of the first byte a decoder only needs once it decodes pixels
///
/// Anything shorter fails when the decoder is created, anything longer
/// but still truncated fails when a frame is decoded.
pub fn body_start(format: ImageFormat, data: &[u8]) -> usize {
    match format {
        // pixel array offset from the file header
        ImageFormat::Bmp => u32::from_le_bytes([data[10], data[11], data[12], data[13]]) as usize,
        // length and type of the first IDAT chunk
        ImageFormat::Png => find(data, b"IDAT") + 4,
        ImageFormat::Qoi => 14,
        // end of the SOS segment
        ImageFormat::Jpeg => {
            let mut position = 2;
            loop {
                assert_eq!(data[position], 0xFF, "marker expected at {position}");
                let marker = data[position + 1];
                let length = u16::from_be_bytes([data[position + 2], data[position + 3]]);

                position += 2 + usize::from(length);

                if marker == 0xDA {
                    break position;
                }
            }
        }
        // RIFF header, chunk header and the fixed part of the first chunk
        ImageFormat::WebP => {
            if &data[12..16] == b"VP8L" {
                25
            } else {
                30
            }
        }
        _ => panic!("no body offset for {format:?}")
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
        .unwrap()
}

pub fn crc32(bytes: &[u8]) -> u32 {
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

pub fn png_chunk(name: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = (data.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(name);
    out.extend_from_slice(data);
    out.extend_from_slice(&crc32(&out[4..]).to_be_bytes());
    out
}
