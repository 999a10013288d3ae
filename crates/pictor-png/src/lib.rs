/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! A PNG and APNG decoder and encoder
//!
//! # Features
//! - All color types and bit depths, including Adam7 interlaced images
//! - tRNS transparency for palette, gray and truecolor images
//! - Animated png, frames can be decoded one at a time and composited
//!   with [`ApngCanvas`]
//! - An encoder with adaptive per scanline filter selection
//! - `no_std` with `alloc`
//!
//! Decoded samples are always 8 bits, 16 bit images keep the most
//! significant byte of each sample.
//!
//! # Example
//! ```
//! use pictor_core::bytestream::ZCursor;
//! use pictor_core::colorspace::ColorSpace;
//! use pictor_core::options::EncoderOptions;
//! use pictor_png::{PngDecoder, PngEncoder};
//!
//! let pixels: Vec<u8> = (0..8 * 8 * 4).map(|x| x as u8).collect();
//! let mut sink = vec![];
//! PngEncoder::new(&pixels, EncoderOptions::new(8, 8, ColorSpace::RGBA))
//!     .encode(&mut sink)
//!     .unwrap();
//!
//! let mut decoder = PngDecoder::new(ZCursor::new(&sink));
//! assert_eq!(decoder.decode().unwrap(), pixels);
//! assert_eq!(decoder.colorspace(), Some(ColorSpace::RGBA));
//! ```
#![cfg_attr(not(feature = "std"), no_std)]
#![macro_use]
extern crate alloc;

pub use apng::{AnimationControl, ApngCanvas, FrameControl, PngFrame};
pub use decoder::{probe_png, PngDecoder, PngInfo};
pub use encoder::PngEncoder;
pub use enums::{BlendOp, DisposeOp, InterlaceMethod, PngColor};
pub use error::{PngDecodeErrors, PngEncodeErrors};
pub use pictor_core;

mod apng;
mod constants;
mod crc;
mod decoder;
mod encoder;
mod enums;
mod error;
mod filters;
mod headers;
