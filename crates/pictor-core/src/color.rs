/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The canonical color sample and conversions from native sample layouts
//!
//! Every codec produces and consumes interleaved 8-bit samples in some
//! [`ColorSpace`]; the routines here reconcile those layouts with the
//! four channel [`Color`] the rest of the library speaks.
use alloc::vec::Vec;
use core::fmt::{Debug, Formatter};

use bytemuck::{Pod, Zeroable};

use crate::colorspace::ColorSpace;

/// A single straight (non premultiplied) alpha RGBA sample
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8
}

/// Multiply two 8 bit values treating them as fractions of 255, rounding to nearest
#[inline(always)]
const fn mul_div_255(a: u32, b: u32) -> u32 {
    let t = a * b + 128;
    (t + (t >> 8)) >> 8
}

impl Color {
    /// Transparent black, what most canvases start out as
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Color {
        Color { r, g, b, a }
    }
    /// Create an opaque color
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b, a: 255 }
    }
    pub const fn from_array(v: [u8; 4]) -> Color {
        Color::new(v[0], v[1], v[2], v[3])
    }
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
    pub const fn with_alpha(self, a: u8) -> Color {
        Color::new(self.r, self.g, self.b, a)
    }
    pub const fn is_opaque(self) -> bool {
        self.a == 255
    }
    /// Scale color channels by alpha
    pub const fn premultiplied(self) -> Color {
        let a = self.a as u32;
        Color::new(
            mul_div_255(self.r as u32, a) as u8,
            mul_div_255(self.g as u32, a) as u8,
            mul_div_255(self.b as u32, a) as u8,
            self.a
        )
    }
    /// Undo [`premultiplied`](Self::premultiplied).
    ///
    /// A fully transparent sample has no recoverable color and
    /// becomes transparent black.
    pub fn unpremultiplied(self) -> Color {
        if self.a == 0 {
            return Color::TRANSPARENT;
        }
        let a = u32::from(self.a);
        let un = |c: u8| ((u32::from(c) * 255 + a / 2) / a).min(255) as u8;

        Color::new(un(self.r), un(self.g), un(self.b), self.a)
    }
    /// Composite `self` over `dst` using straight alpha
    ///
    /// This is the `OVER` operator both animated png and animated webp
    /// specify for frame blending.
    pub fn blend_over(self, dst: Color) -> Color {
        if self.a == 255 || dst.a == 0 {
            return self;
        }
        if self.a == 0 {
            return dst;
        }
        let src_a = u32::from(self.a);
        let dst_a = mul_div_255(u32::from(dst.a), 255 - src_a);
        let out_a = src_a + dst_a;

        let mix = |s: u8, d: u8| {
            ((u32::from(s) * src_a + u32::from(d) * dst_a + out_a / 2) / out_a).min(255) as u8
        };
        Color::new(
            mix(self.r, dst.r),
            mix(self.g, dst.g),
            mix(self.b, dst.b),
            out_a.min(255) as u8
        )
    }
}

/// Errors raised while reconciling a native sample layout with RGBA
#[derive(Clone, PartialEq, Eq)]
pub enum ColorModelError {
    /// The layout cannot be converted without more information,
    /// e.g. YCbCr needs the codec specific matrix
    UnsupportedColorspace(ColorSpace),
    /// A palette index pointed outside the palette
    IndexOutOfRange { index: usize, palette_len: usize },
    /// Input length is not a whole number of pixels
    LengthMismatch { expected: usize, found: usize }
}

impl Debug for ColorModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnsupportedColorspace(color) => {
                writeln!(f, "Cannot convert colorspace {color:?} to RGBA")
            }
            Self::IndexOutOfRange { index, palette_len } => {
                writeln!(
                    f,
                    "Palette index {index} out of range for a palette with {palette_len} entries"
                )
            }
            Self::LengthMismatch { expected, found } => {
                writeln!(f, "Expected {expected} bytes of samples but found {found}")
            }
        }
    }
}

impl core::fmt::Display for ColorModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ColorModelError {}

/// Expand interleaved samples in `colorspace` into RGBA
///
/// Formats without alpha become fully opaque.
pub fn expand_to_rgba(input: &[u8], colorspace: ColorSpace) -> Result<Vec<u8>, ColorModelError> {
    let components = colorspace.num_components();

    if components == 0 || colorspace == ColorSpace::YCbCr {
        return Err(ColorModelError::UnsupportedColorspace(colorspace));
    }
    if input.len() % components != 0 {
        return Err(ColorModelError::LengthMismatch {
            expected: input.len() - input.len() % components + components,
            found:    input.len()
        });
    }
    let mut out = Vec::with_capacity((input.len() / components) * 4);

    match colorspace {
        ColorSpace::RGBA => out.extend_from_slice(input),
        ColorSpace::RGB => {
            for px in input.chunks_exact(3) {
                out.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
        }
        ColorSpace::BGR => {
            for px in input.chunks_exact(3) {
                out.extend_from_slice(&[px[2], px[1], px[0], 255]);
            }
        }
        ColorSpace::BGRA => {
            for px in input.chunks_exact(4) {
                out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
            }
        }
        ColorSpace::Luma => {
            for &y in input {
                out.extend_from_slice(&[y, y, y, 255]);
            }
        }
        ColorSpace::LumaA => {
            for px in input.chunks_exact(2) {
                out.extend_from_slice(&[px[0], px[0], px[0], px[1]]);
            }
        }
        _ => return Err(ColorModelError::UnsupportedColorspace(colorspace))
    }
    Ok(out)
}

/// Convert RGBA samples into `colorspace`
///
/// Converting to a layout without alpha drops the alpha channel,
/// converting to grayscale uses the BT.601 luma weights.
pub fn rgba_to_colorspace(input: &[u8], colorspace: ColorSpace) -> Result<Vec<u8>, ColorModelError> {
    if input.len() % 4 != 0 {
        return Err(ColorModelError::LengthMismatch {
            expected: input.len() - input.len() % 4 + 4,
            found:    input.len()
        });
    }
    let luma = |px: &[u8]| -> u8 {
        let y = 19595 * u32::from(px[0]) + 38470 * u32::from(px[1]) + 7471 * u32::from(px[2]);
        ((y + (1 << 15)) >> 16) as u8
    };
    let pixels = input.len() / 4;
    let mut out = Vec::with_capacity(pixels * colorspace.num_components());

    match colorspace {
        ColorSpace::RGBA => out.extend_from_slice(input),
        ColorSpace::RGB => input
            .chunks_exact(4)
            .for_each(|px| out.extend_from_slice(&px[..3])),
        ColorSpace::BGR => input
            .chunks_exact(4)
            .for_each(|px| out.extend_from_slice(&[px[2], px[1], px[0]])),
        ColorSpace::BGRA => input
            .chunks_exact(4)
            .for_each(|px| out.extend_from_slice(&[px[2], px[1], px[0], px[3]])),
        ColorSpace::Luma => input.chunks_exact(4).for_each(|px| out.push(luma(px))),
        ColorSpace::LumaA => input
            .chunks_exact(4)
            .for_each(|px| out.extend_from_slice(&[luma(px), px[3]])),
        _ => return Err(ColorModelError::UnsupportedColorspace(colorspace))
    }
    Ok(out)
}

/// Resolve palette `indices` into RGBA samples written to `output`
///
/// `output` must hold four bytes per index. An index past the end
/// of the palette is an error, it is never clamped.
pub fn resolve_palette(
    indices: &[u8], palette: &[Color], output: &mut [u8]
) -> Result<(), ColorModelError> {
    if output.len() != indices.len() * 4 {
        return Err(ColorModelError::LengthMismatch {
            expected: indices.len() * 4,
            found:    output.len()
        });
    }
    for (&index, out) in indices.iter().zip(output.chunks_exact_mut(4)) {
        let color = palette
            .get(usize::from(index))
            .ok_or(ColorModelError::IndexOutOfRange {
                index:       usize::from(index),
                palette_len: palette.len()
            })?;
        out.copy_from_slice(&color.to_array());
    }
    Ok(())
}

/// Return true if any RGBA sample is not fully opaque
pub fn has_transparency(rgba: &[u8]) -> bool {
    rgba.chunks_exact(4).any(|px| px[3] != 255)
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use crate::color::{
        expand_to_rgba, has_transparency, resolve_palette, rgba_to_colorspace, Color,
        ColorModelError
    };
    use crate::colorspace::ColorSpace;

    #[test]
    fn premultiply_round_trip_of_opaque() {
        let c = Color::from_rgb(10, 200, 255);
        assert_eq!(c.premultiplied(), c);
        assert_eq!(c.premultiplied().unpremultiplied(), c);
        assert_eq!(Color::new(200, 100, 50, 0).unpremultiplied(), Color::TRANSPARENT);
        assert_eq!(Color::new(255, 255, 255, 128).premultiplied().r, 128);
    }

    #[test]
    fn blend_over_edges() {
        let red = Color::from_rgb(255, 0, 0);
        let blue = Color::from_rgb(0, 0, 255);
        assert_eq!(red.blend_over(blue), red);
        assert_eq!(Color::TRANSPARENT.blend_over(blue), blue);
        let half = Color::new(255, 0, 0, 128).blend_over(blue);
        assert_eq!(half.a, 255);
        assert!(half.r > 120 && half.r < 135);
        assert!(half.b > 120 && half.b < 135);
    }

    #[test]
    fn expand_layouts() {
        assert_eq!(
            expand_to_rgba(&[1, 2, 3], ColorSpace::BGR).unwrap(),
            [3, 2, 1, 255]
        );
        assert_eq!(
            expand_to_rgba(&[9, 100], ColorSpace::LumaA).unwrap(),
            [9, 9, 9, 100]
        );
        assert!(matches!(
            expand_to_rgba(&[0; 3], ColorSpace::YCbCr),
            Err(ColorModelError::UnsupportedColorspace(_))
        ));
        assert!(expand_to_rgba(&[0; 4], ColorSpace::RGB).is_err());
    }

    #[test]
    fn alpha_is_dropped_not_rejected() {
        let rgb = rgba_to_colorspace(&[1, 2, 3, 4, 5, 6, 7, 8], ColorSpace::RGB).unwrap();
        assert_eq!(rgb, [1, 2, 3, 5, 6, 7]);
        let luma = rgba_to_colorspace(&[255, 255, 255, 0], ColorSpace::Luma).unwrap();
        assert_eq!(luma, [255]);
    }

    #[test]
    fn palette_index_out_of_range_is_an_error() {
        let palette = [Color::from_rgb(1, 1, 1), Color::from_rgb(2, 2, 2)];
        let mut out = vec![0; 8];
        resolve_palette(&[1, 0], &palette, &mut out).unwrap();
        assert_eq!(out, [2, 2, 2, 255, 1, 1, 1, 255]);
        assert_eq!(
            resolve_palette(&[2, 0], &palette, &mut out),
            Err(ColorModelError::IndexOutOfRange {
                index:       2,
                palette_len: 2
            })
        );
        assert!(!has_transparency(&out));
    }
}
