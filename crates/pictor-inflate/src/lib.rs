/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! A deflate decoder and encoder.
//!
//! This crate features a deflate/zlib decoder inspired by
//! Eric Bigger's [libdeflate] and a matching compressor
//! that searches for LZ77 matches with hash chains and emits
//! fixed, dynamic or stored blocks, whichever is smallest.
//!
//! The bit level primitives and canonical Huffman code construction
//! are public since other pictor codecs (webp lossless) use the same
//! LSB-first prefix code conventions.
//!
//! # Usage
//!
//! Decoding deflate data
//!
//! ```no_run
//! use pictor_inflate::DeflateDecoder;
//! let totally_valid_data = [0;23];
//! let mut decoder = DeflateDecoder::new(&totally_valid_data);
//!
//! let decompressed =decoder.decode_deflate();
//! ```
//!
//! Decoding zlib data without confirming the adler32 checksum
//! ```no_run
//! use pictor_inflate::DeflateDecoder;
//! use pictor_inflate::DeflateOptions;
//! let totally_valid_data=[0;23];
//! let mut options = DeflateOptions::default()
//!                     .set_confirm_checksum(false);
//! let decoder =  DeflateDecoder::new_with_options(&totally_valid_data,options);
//! ```
//!
//! Compressing into a zlib stream
//! ```
//! use pictor_inflate::{DeflateDecoder, DeflateEncoder};
//! let data = b"hello hello hello hello";
//! let compressed = DeflateEncoder::new(data).encode_zlib();
//! let decoded = DeflateDecoder::new(&compressed).decode_zlib().unwrap();
//! assert_eq!(&decoded, data);
//! ```
//!
//! [libdeflate]: https://github.com/ebiggers/libdeflate
#![cfg_attr(not(feature = "std"), no_std)]
extern crate alloc;

pub use crate::decoder::{DeflateDecoder, DeflateOptions};
pub use crate::encoder::{DeflateEncoder, DeflateEncodingOptions};

pub mod bitstream;
mod constants;
mod decoder;
mod encoder;
pub mod errors;
pub mod huffman;
mod lz77;
mod utils;
