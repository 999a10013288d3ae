/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The in-memory pixel buffer decoders produce and encoders consume
use alloc::vec;
use alloc::vec::Vec;
use core::fmt::{Debug, Formatter};

use crate::color::Color;
use crate::options::DEFAULT_MAX_DIMENSION;

/// Largest width or height a [`Bitmap`] may have
pub const MAX_DIMENSION: usize = DEFAULT_MAX_DIMENSION;

/// Pixel format tag of a bitmap
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BitmapFormat {
    /// Four channels, alpha is meaningful
    Rgba8888,
    /// Four channels, alpha is always 255
    Rgbx8888
}

impl BitmapFormat {
    pub const fn has_alpha(self) -> bool {
        matches!(self, BitmapFormat::Rgba8888)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum BitmapError {
    /// Width or height was zero
    ZeroDimensions,
    /// Width or height was larger than [`MAX_DIMENSION`]
    TooLarge { width: usize, height: usize },
    /// The sample buffer does not match the dimensions
    BufferSize { expected: usize, found: usize }
}

impl Debug for BitmapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ZeroDimensions => writeln!(f, "Bitmap dimensions cannot be zero"),
            Self::TooLarge { width, height } => writeln!(
                f,
                "Bitmap dimensions {width}x{height} exceed maximum of {MAX_DIMENSION}x{MAX_DIMENSION}"
            ),
            Self::BufferSize { expected, found } => {
                writeln!(f, "Expected a buffer of {expected} bytes but found {found}")
            }
        }
    }
}

impl core::fmt::Display for BitmapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BitmapError {}

/// A two dimensional grid of [`Color`] samples stored row major
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    width:  usize,
    height: usize,
    format: BitmapFormat,
    pixels: Vec<Color>
}

impl Debug for Bitmap {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .finish()
    }
}

fn check_dimensions(width: usize, height: usize) -> Result<(), BitmapError> {
    if width == 0 || height == 0 {
        return Err(BitmapError::ZeroDimensions);
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(BitmapError::TooLarge { width, height });
    }
    Ok(())
}

impl Bitmap {
    /// Create a bitmap filled with transparent black,
    /// or opaque black for [`BitmapFormat::Rgbx8888`]
    pub fn new(format: BitmapFormat, width: usize, height: usize) -> Result<Bitmap, BitmapError> {
        check_dimensions(width, height)?;

        let fill = match format {
            BitmapFormat::Rgba8888 => Color::TRANSPARENT,
            BitmapFormat::Rgbx8888 => Color::from_rgb(0, 0, 0)
        };
        Ok(Bitmap {
            width,
            height,
            format,
            pixels: vec![fill; width * height]
        })
    }
    /// Create a bitmap from interleaved RGBA bytes
    pub fn from_rgba(
        format: BitmapFormat, width: usize, height: usize, rgba: &[u8]
    ) -> Result<Bitmap, BitmapError> {
        check_dimensions(width, height)?;

        let expected = width * height * 4;
        if rgba.len() != expected {
            return Err(BitmapError::BufferSize {
                expected,
                found: rgba.len()
            });
        }
        let mut pixels: Vec<Color> = bytemuck::cast_slice::<u8, Color>(rgba).to_vec();

        if format == BitmapFormat::Rgbx8888 {
            pixels.iter_mut().for_each(|px| px.a = 255);
        }
        Ok(Bitmap {
            width,
            height,
            format,
            pixels
        })
    }
    /// `(width, height)` of the bitmap
    pub const fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }
    pub const fn width(&self) -> usize {
        self.width
    }
    pub const fn height(&self) -> usize {
        self.height
    }
    pub const fn format(&self) -> BitmapFormat {
        self.format
    }
    /// Return the pixel at `(x, y)` or `None` if out of bounds
    #[inline]
    pub fn get_pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }
    /// Write the pixel at `(x, y)`, returning false if out of bounds
    ///
    /// Bitmaps without alpha store the color as opaque
    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let color = match self.format {
            BitmapFormat::Rgba8888 => color,
            BitmapFormat::Rgbx8888 => color.with_alpha(255)
        };
        self.pixels[y * self.width + x] = color;
        true
    }
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }
    /// Interleaved RGBA view of the pixels
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
    /// Interleaved RGB copy of the pixels, alpha is dropped
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 3);
        for px in &self.pixels {
            out.extend_from_slice(&[px.r, px.g, px.b]);
        }
        out
    }
    /// Return true if any pixel is not fully opaque
    pub fn has_transparency(&self) -> bool {
        self.format.has_alpha() && self.pixels.iter().any(|px| !px.is_opaque())
    }
}
