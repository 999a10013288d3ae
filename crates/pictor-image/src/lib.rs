/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! A uniform interface over the pictor image codecs
//!
//! Every supported format implements [`ImageDecoderPlugin`] and
//! [`ImageEncoder`], so callers can decode and encode without knowing
//! which codec sits behind the bytes.
//!
//! # Example
//! Encode a bitmap as png and read it back
//! ```
//! use pictor_image::pictor_core::bitmap::{Bitmap, BitmapFormat};
//! use pictor_image::{decoder_for, encoder_for, EncoderConfig, ImageFormat};
//!
//! let rgba = [255, 0, 0, 255, 0, 255, 0, 128];
//! let bitmap = Bitmap::from_rgba(BitmapFormat::Rgba8888, 2, 1, &rgba).unwrap();
//!
//! let encoder = encoder_for(ImageFormat::Png, EncoderConfig::default()).unwrap();
//! let bytes = encoder.encode(&bitmap).unwrap();
//!
//! let mut decoder = decoder_for(&bytes).unwrap();
//! assert_eq!(decoder.format(), ImageFormat::Png);
//! assert_eq!(decoder.frame_count(), 1);
//!
//! let frame = decoder.frame(0).unwrap();
//! assert_eq!(frame.bitmap().as_bytes(), &rgba);
//! ```
//!
//! # Features
//! - `bmp`, `png`, `jpeg`, `webp`, `qoi`: the individual codecs, `image_formats`
//!   enables all of them
//! - `log`: log through the `log` crate
//! - `serde-support`: serialize formats, encoder configurations and errors
//! - `std`: forwarded to the codec crates
pub use codecs::{decoder_for, decoder_for_with_options, encoder_for, ImageFormat};
pub use config::{ColorMode, EncoderConfig};
pub use errors::{ImageErrors, Stage};
pub use frame::{Frame, FrameCache};
pub use pictor_core;
pub use traits::{ImageDecoderPlugin, ImageEncoder};

pub mod codecs;
pub mod config;
pub mod errors;
pub mod frame;
mod serde;
pub mod traits;
