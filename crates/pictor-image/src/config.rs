/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Format independent encoder configuration
use std::borrow::Cow;

use pictor_core::bitmap::Bitmap;
use pictor_core::colorspace::ColorSpace;
use pictor_core::options::EncoderOptions;

use crate::codecs::ImageFormat;
use crate::errors::ImageErrors;

/// Whether the alpha channel is written
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum ColorMode {
    /// Keep alpha only when the bitmap has a pixel that is not fully opaque
    #[default]
    Auto,
    /// Always write an alpha channel
    WithAlpha,
    /// Never write an alpha channel, alpha is dropped
    WithoutAlpha
}

/// Trade-offs an encoder should make
///
/// Fields left unset use the format's default. Which fields a format
/// accepts:
///
/// | Format | quality | effort | `WithAlpha` |
/// |--------|---------|--------|-------------|
/// | BMP    | no      | no     | yes         |
/// | PNG    | no      | 0..=9  | yes         |
/// | JPEG   | 1..=100 | no     | no          |
/// | WebP   | 1..=100 | 0..=9  | yes         |
/// | QOI    | no      | no     | yes         |
///
/// For WebP setting a quality selects the lossy bitstream, leaving it
/// unset selects the lossless one.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct EncoderConfig {
    quality:    Option<u8>,
    effort:     Option<u8>,
    color_mode: ColorMode
}

impl EncoderConfig {
    pub fn new() -> EncoderConfig {
        EncoderConfig::default()
    }
    /// Set the lossy quality, 1 is worst and 100 best
    pub fn set_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }
    /// Set the compression effort, 0 is fastest and 9 smallest
    pub fn set_effort(mut self, effort: u8) -> Self {
        self.effort = Some(effort);
        self
    }
    pub fn set_color_mode(mut self, mode: ColorMode) -> Self {
        self.color_mode = mode;
        self
    }
    pub const fn quality(&self) -> Option<u8> {
        self.quality
    }
    pub const fn effort(&self) -> Option<u8> {
        self.effort
    }
    pub const fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// Check that `format` can express this configuration
    ///
    /// # Errors
    /// [`ImageErrors::UnsupportedConfiguration`] naming the offending field
    pub fn validate(&self, format: ImageFormat) -> Result<(), ImageErrors> {
        let (quality_ok, effort_ok, alpha_ok) = match format {
            ImageFormat::Bmp | ImageFormat::Qoi => (false, false, true),
            ImageFormat::Png => (false, true, true),
            ImageFormat::Jpeg => (true, false, false),
            ImageFormat::WebP => (true, true, true)
        };
        let fail = |reason: String| {
            Err(ImageErrors::UnsupportedConfiguration {
                format,
                reason
            })
        };

        if let Some(quality) = self.quality {
            if !quality_ok {
                return fail(format!("{} has no quality setting", format.name()));
            }
            if !(1..=100).contains(&quality) {
                return fail(format!("Quality {quality} outside 1..=100"));
            }
        }
        if let Some(effort) = self.effort {
            if !effort_ok {
                return fail(format!("{} has no effort setting", format.name()));
            }
            if effort > 9 {
                return fail(format!("Effort {effort} outside 0..=9"));
            }
        }
        if self.color_mode == ColorMode::WithAlpha && !alpha_ok {
            return fail(format!("{} cannot store an alpha channel", format.name()));
        }
        Ok(())
    }

    /// Whether `bitmap` should be written with an alpha channel
    pub(crate) fn keep_alpha(&self, bitmap: &Bitmap) -> bool {
        match self.color_mode {
            ColorMode::Auto => bitmap.has_transparency(),
            ColorMode::WithAlpha => true,
            ColorMode::WithoutAlpha => false
        }
    }

    /// Interleaved samples of `bitmap` and the options describing them
    pub(crate) fn prepare<'b>(
        &self, bitmap: &'b Bitmap, keep_alpha: bool
    ) -> (Cow<'b, [u8]>, EncoderOptions) {
        let (width, height) = bitmap.size();

        let (pixels, colorspace) = if keep_alpha {
            (Cow::Borrowed(bitmap.as_bytes()), ColorSpace::RGBA)
        } else {
            (Cow::Owned(bitmap.to_rgb_bytes()), ColorSpace::RGB)
        };
        let mut options = EncoderOptions::new(width, height, colorspace);

        if let Some(quality) = self.quality {
            options = options.set_quality(quality);
        }
        if let Some(effort) = self.effort {
            options = options.set_effort(effort);
        }
        (pixels, options)
    }
}

#[cfg(test)]
mod tests {
    use crate::codecs::ImageFormat;
    use crate::config::{ColorMode, EncoderConfig};
    use crate::errors::ImageErrors;

    fn rejected(config: EncoderConfig, format: ImageFormat) -> bool {
        matches!(
            config.validate(format),
            Err(ImageErrors::UnsupportedConfiguration { .. })
        )
    }

    #[test]
    fn defaults_are_valid_everywhere() {
        for format in ImageFormat::ALL {
            assert!(EncoderConfig::new().validate(format).is_ok(), "{format:?}");
        }
    }

    #[test]
    fn lossless_formats_reject_quality() {
        let config = EncoderConfig::new().set_quality(90);

        assert!(rejected(config, ImageFormat::Bmp));
        assert!(rejected(config, ImageFormat::Png));
        assert!(rejected(config, ImageFormat::Qoi));
        assert!(!rejected(config, ImageFormat::Jpeg));
        assert!(!rejected(config, ImageFormat::WebP));
    }

    #[test]
    fn effort_support_and_range() {
        let config = EncoderConfig::new().set_effort(9);
        assert!(!rejected(config, ImageFormat::Png));
        assert!(!rejected(config, ImageFormat::WebP));
        assert!(rejected(config, ImageFormat::Jpeg));
        assert!(rejected(config, ImageFormat::Bmp));

        assert!(rejected(EncoderConfig::new().set_effort(10), ImageFormat::Png));
    }

    #[test]
    fn quality_range() {
        assert!(rejected(EncoderConfig::new().set_quality(0), ImageFormat::Jpeg));
        assert!(rejected(EncoderConfig::new().set_quality(101), ImageFormat::WebP));
        assert!(!rejected(EncoderConfig::new().set_quality(1), ImageFormat::Jpeg));
    }

    #[test]
    fn jpeg_cannot_keep_alpha() {
        let with = EncoderConfig::new().set_color_mode(ColorMode::WithAlpha);
        let without = EncoderConfig::new().set_color_mode(ColorMode::WithoutAlpha);

        assert!(rejected(with, ImageFormat::Jpeg));
        assert!(!rejected(without, ImageFormat::Jpeg));
        assert!(!rejected(with, ImageFormat::Png));
    }
}
