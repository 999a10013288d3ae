/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */
//! A versatile BMP decoder and encoder
//!
//! # Supported formats
//! - RLE (4 bit and 8 bit)
//! - Paletted images (1 bit, 2 bits, 4 bits and 8 bits)
//! - Uncompressed 24 bit and 32 bit images
//! - Masked images (16 bit and 32 bit, `BITFIELDS` and `ALPHABITFIELDS`)
//!
//! # Unsupported formats
//! - Embedded PNG and JPEGs
//! - OS/2 Huffman and RLE24 compression
//!
//! The encoder writes 24 bit uncompressed files for opaque images and
//! 32 bit `BITFIELDS` files with a version 4 header when alpha is present.
//!
//! # Example
//! ```
//! use pictor_bmp::{BmpDecoder, BmpEncoder};
//! use pictor_core::bytestream::ZCursor;
//! use pictor_core::colorspace::ColorSpace;
//! use pictor_core::options::EncoderOptions;
//!
//! let pixels = [255_u8, 0, 0, 0, 255, 0, 0, 0, 255];
//! let mut encoded = vec![];
//! BmpEncoder::new(&pixels, EncoderOptions::new(3, 1, ColorSpace::RGB))
//!     .encode(&mut encoded)
//!     .unwrap();
//!
//! let mut decoder = BmpDecoder::new(ZCursor::new(&encoded));
//! assert_eq!(decoder.decode().unwrap(), pixels);
//! ```
#![cfg_attr(not(feature = "std"), no_std)]
#![macro_use]
extern crate alloc;

pub use pictor_core;

pub use crate::common::{BmpCompression, BmpPixelFormat};
pub use crate::decoder::{probe_bmp, BmpDecoder};
pub use crate::encoder::BmpEncoder;
pub use crate::errors::{BmpDecoderErrors, BmpEncoderErrors};

mod common;
mod decoder;
mod encoder;
mod errors;
mod utils;
