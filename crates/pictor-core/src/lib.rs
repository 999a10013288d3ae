/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Core routines shared by all pictor codecs
//!
//! This crate provides a set of core routines shared
//! by the decoders and encoders under the `pictor` umbrella
//!
//! It currently contains
//!
//! - A bytestream reader and writer with endian aware reads and writes
//! - Colorspace information shared by images
//! - Image decoder and encoder options
//! - The canonical [`Color`](color::Color) sample and the [`Bitmap`](bitmap::Bitmap)
//!   pixel buffer every codec decodes into and encodes from
//! - Color model conversions between native sample layouts and RGBA
//!
//! This library is `#[no_std]` with `alloc` needed for defining `Vec`
//! which we need for storing decoded bytes.
//!
//! # Features
//!  - `std`: Enables `std::error::Error` implementations.
//!
//!  - `log`: Forwards the logging macros in [`log`] to the `log` crate,
//!     without it they compile to nothing.
//!
//!  - `serde`: Enables serializing of some of the data structures
//!     present in the crate
#![cfg_attr(not(feature = "std"), no_std)]
#![macro_use]
extern crate alloc;

pub mod bitmap;
pub mod bytestream;
pub mod color;
pub mod colorspace;
pub mod log;
pub mod options;
mod serde;
