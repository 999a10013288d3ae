/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Global encoder options

use crate::colorspace::ColorSpace;

/// Options shared by encoders
///
/// Encoders ignore the options they have no use for, e.g. the bmp
/// encoder ignores `quality`.
#[derive(Debug, Copy, Clone)]
pub struct EncoderOptions {
    width:      usize,
    height:     usize,
    colorspace: ColorSpace,
    quality:    u8,
    effort:     u8,
    lossless:   bool
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            width:      0,
            height:     0,
            colorspace: ColorSpace::RGB,
            quality:    80,
            effort:     4,
            lossless:   true
        }
    }
}

impl EncoderOptions {
    /// Create new encode options
    ///
    /// # Arguments
    ///
    /// * `width`: Image width
    /// * `height`: Image height
    /// * `colorspace`: Image colorspaces
    pub fn new(width: usize, height: usize, colorspace: ColorSpace) -> EncoderOptions {
        EncoderOptions {
            width,
            height,
            colorspace,
            ..Default::default()
        }
    }
    /// Get the width for which the image will be encoded in
    pub const fn get_width(&self) -> usize {
        self.width
    }

    /// Get height for which the image will be encoded in
    pub const fn get_height(&self) -> usize {
        self.height
    }
    /// Get the colorspace for which the encoder will treat the
    /// input pixels as
    pub const fn get_colorspace(&self) -> ColorSpace {
        self.colorspace
    }
    /// Get the quality for which the image will be encoded with
    ///
    ///  # Lossy
    /// - Higher quality means more fidelity with the source image
    ///   and usually a bigger file
    ///
    /// # Lossless
    ///   Ignored
    pub const fn get_quality(&self) -> u8 {
        self.quality
    }
    /// Get the encoding effort
    ///
    /// Higher values spend more time looking for matches, they never
    /// change what the decoder reconstructs.
    pub const fn get_effort(&self) -> u8 {
        self.effort
    }
    /// Whether formats with both lossy and lossless modes should use
    /// the lossless one
    pub const fn get_lossless(&self) -> bool {
        self.lossless
    }
    /// Set width for the image to be encoded
    pub fn set_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }
    /// Set height for the image to be encoded
    pub fn set_height(mut self, height: usize) -> Self {
        self.height = height;
        self
    }
    /// Set the colorspace of the input pixels
    pub fn set_colorspace(mut self, colorspace: ColorSpace) -> Self {
        self.colorspace = colorspace;
        self
    }
    /// Set encoder quality, values are clamped to 1..=100
    pub fn set_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }
    /// Set encoding effort, values are clamped to 0..=9
    pub fn set_effort(mut self, effort: u8) -> Self {
        self.effort = effort.min(9);
        self
    }
    /// Set whether the lossless mode should be used where a format has one
    pub fn set_lossless(mut self, yes: bool) -> Self {
        self.lossless = yes;
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::colorspace::ColorSpace;
    use crate::options::EncoderOptions;

    #[test]
    fn setters_clamp() {
        let options = EncoderOptions::new(4, 5, ColorSpace::RGBA)
            .set_quality(0)
            .set_effort(200);
        assert_eq!(options.get_quality(), 1);
        assert_eq!(options.get_effort(), 9);
        assert_eq!(options.get_width(), 4);
        assert_eq!(options.get_colorspace(), ColorSpace::RGBA);
    }
}
