/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! This crate provides a library for decoding and encoding baseline jpeg images
//!
//! # Features
//!  - Baseline (SOF0) and extended sequential Huffman (SOF1) 8-bit images
//!  - Grayscale and three component YCbCr or RGB images
//!  - Sampling factors of 1 and 2 with fancy upsampling
//!  - Restart intervals
//!  - A baseline encoder with quality control
//!  - `no_std` with the alloc crate
//!
//! Progressive, lossless, hierarchical and arithmetic coded images are
//! reported as [`DecodeErrors::Unsupported`].
//!
//! # Examples
//!
//! ## Decode a jpeg from memory
//!
//! ```no_run
//! use pictor_core::bytestream::ZCursor;
//! use pictor_jpeg::JpegDecoder;
//! let data = std::fs::read("a_jpeg.jpg").unwrap();
//! let mut decoder = JpegDecoder::new(ZCursor::new(&data));
//! let pixels = decoder.decode().unwrap();
//! ```
//!
//! ## Encode and decode again
//! ```
//! use pictor_core::bytestream::ZCursor;
//! use pictor_core::colorspace::ColorSpace;
//! use pictor_core::options::EncoderOptions;
//! use pictor_jpeg::{JpegDecoder, JpegEncoder};
//!
//! let pixels = vec![200_u8; 20 * 10];
//! let mut jpeg = vec![];
//! JpegEncoder::new(&pixels, EncoderOptions::new(20, 10, ColorSpace::Luma))
//!     .encode(&mut jpeg)
//!     .unwrap();
//!
//! let mut decoder = JpegDecoder::new(ZCursor::new(&jpeg));
//! let decoded = decoder.decode().unwrap();
//! assert_eq!(decoder.dimensions(), Some((20, 10)));
//! assert_eq!(decoded.len(), pixels.len());
//! ```
#![cfg_attr(not(feature = "std"), no_std)]
#![macro_use]
extern crate alloc;
extern crate core;

pub use pictor_core;

pub use crate::decoder::{probe_jpeg, ImageInfo, JpegDecoder};
pub use crate::encoder::JpegEncoder;
pub use crate::errors::{DecodeErrors, EncodeErrors, UnsupportedSchemes};
pub use crate::misc::SOFMarkers;

mod bitstream;
mod color_convert;
mod components;
mod decoder;
mod encoder;
pub mod errors;
mod headers;
mod huffman;
mod idct;
mod marker;
mod mcu;
mod misc;
mod upsampler;
mod worker;
