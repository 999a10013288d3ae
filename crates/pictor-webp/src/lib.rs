/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! A WebP decoder and encoder
//!
//! # Features
//! - Lossy (VP8 key frames) and lossless (VP8L) images
//! - Alpha channels of lossy images, raw or losslessly compressed and
//!   with any of the prediction filters
//! - Animations, frames can be decoded one at a time and composited
//!   with [`WebpCanvas`]
//! - A lossless encoder with color indexing, prediction, backward
//!   references and a color cache
//! - A lossy encoder with per macroblock mode selection
//! - `no_std` with `alloc`
//!
//! Lossy pixels go through libwebp's fixed point YUV conversion, so
//! decoding gives the same pixels libwebp produces.
//!
//! # Example
//! ```
//! use pictor_core::bytestream::ZCursor;
//! use pictor_core::colorspace::ColorSpace;
//! use pictor_core::options::EncoderOptions;
//! use pictor_webp::{WebpDecoder, WebpEncoder};
//!
//! let pixels: Vec<u8> = (0..8 * 8 * 4).map(|x| x as u8).collect();
//! let options = EncoderOptions::new(8, 8, ColorSpace::RGBA).set_lossless(true);
//! let mut sink = vec![];
//! WebpEncoder::new(&pixels, options).encode(&mut sink).unwrap();
//!
//! let mut decoder = WebpDecoder::new(ZCursor::new(&sink));
//! assert_eq!(decoder.decode().unwrap(), pixels);
//! assert_eq!(decoder.colorspace(), Some(ColorSpace::RGBA));
//! ```
#![cfg_attr(not(feature = "std"), no_std)]
#![macro_use]
extern crate alloc;

pub use animation::{BlendMethod, DisposeMethod, FrameControl, WebpCanvas, WebpFrame};
pub use decoder::{probe_webp, WebpDecoder, WebpFormat, WebpInfo};
pub use encoder::{WebpAnimationEncoder, WebpEncoder};
pub use errors::{WebpDecodeErrors, WebpEncodeErrors};
pub use pictor_core;

mod alpha;
mod animation;
mod decoder;
mod encoder;
mod errors;
mod lossless;
mod lossy;
mod riff;
mod yuv;
