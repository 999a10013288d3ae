/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Global Decoder options

/// Largest width or height any decoder accepts by default
pub const DEFAULT_MAX_DIMENSION: usize = 1 << 14;

/// Decoder options that are flags
#[derive(Copy, Debug, Clone)]
struct DecoderFlags {
    /// Whether the decoder should confirm and report adler mismatch
    inflate_confirm_adler: bool,
    /// Whether the PNG decoder should confirm crc
    png_confirm_crc:       bool,
    /// Whether recoverable non-conformance should be reported as an error
    strict_mode:           bool,
    /// Decode all frames for an animated png
    png_decode_animated:   bool
}

impl Default for DecoderFlags {
    fn default() -> Self {
        DecoderFlags {
            inflate_confirm_adler: true,
            png_confirm_crc:       true,
            strict_mode:           false,
            png_decode_animated:   true
        }
    }
}

/// Decoder options
///
/// Not all options are respected by all decoders,
/// each option documents the decoders that read it.
#[derive(Debug, Copy, Clone)]
pub struct DecoderOptions {
    /// Maximum width for which decoders will
    /// not try to decode images larger than
    /// the specified width.
    ///
    /// - Default value: 16384
    /// - Respected by: `all decoders`
    max_width:     usize,
    /// Maximum height for which decoders will not
    /// try to decode images larger than the
    /// specified height
    ///
    /// - Default value: 16384
    /// - Respected by: `all decoders`
    max_height:    usize,
    /// Maximum size for inflate output.
    ///
    /// - Default value: 1 GiB
    /// - Respected by: `png` and the webp alpha plane
    deflate_limit: usize,
    /// Boolean flags that influence decoding
    flags:         DecoderFlags
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            max_width:     DEFAULT_MAX_DIMENSION,
            max_height:    DEFAULT_MAX_DIMENSION,
            deflate_limit: 1 << 30,
            flags:         DecoderFlags::default()
        }
    }
}

impl DecoderOptions {
    /// Create options where recoverable non-conformance is fatal
    /// and all checksums are verified
    pub fn new_strict() -> DecoderOptions {
        DecoderOptions::default().set_strict_mode(true)
    }

    /// Get maximum width configured for which the decoder
    /// should not try to decode images greater than this width
    pub const fn get_max_width(&self) -> usize {
        self.max_width
    }

    /// Get maximum height configured for which the decoder should
    /// not try to decode images greater than this height
    pub const fn get_max_height(&self) -> usize {
        self.max_height
    }

    /// Return true whether the decoder should be in strict mode
    /// And reject most errors
    pub const fn get_strict_mode(&self) -> bool {
        self.flags.strict_mode
    }

    /// Set maximum width for which the decoder should not try
    /// decoding images greater than that width
    ///
    /// # Arguments
    ///
    /// * `width`:  The maximum width allowed
    pub fn set_max_width(mut self, width: usize) -> Self {
        self.max_width = width;
        self
    }

    /// Set maximum height for which the decoder should not try
    /// decoding images greater than that height
    pub fn set_max_height(mut self, height: usize) -> Self {
        self.max_height = height;
        self
    }

    /// Set whether the decoder should be in standards conforming/
    /// strict mode
    ///
    /// This reduces the error tolerance level for the decoders and invalid
    /// samples will be rejected by the decoder
    ///
    /// # Arguments
    ///
    /// * `yes`: True to enable strict mode, false to disable it
    pub fn set_strict_mode(mut self, yes: bool) -> Self {
        self.flags.strict_mode = yes;
        self
    }

    /// Whether the inflate decoder should confirm
    /// adler checksums
    pub const fn inflate_get_confirm_adler(&self) -> bool {
        self.flags.inflate_confirm_adler
    }
    /// Set whether the inflate decoder should confirm
    /// adler checksums
    pub fn inflate_set_confirm_adler(mut self, yes: bool) -> Self {
        self.flags.inflate_confirm_adler = yes;
        self
    }
    /// Get default inflate limit for which the decoder
    /// will not try to decompress further
    pub const fn inflate_get_limit(&self) -> usize {
        self.deflate_limit
    }
    /// Set the default inflate limit for which decompressors
    /// relying on inflate won't surpass
    pub fn inflate_set_limit(mut self, limit: usize) -> Self {
        self.deflate_limit = limit;
        self
    }
    /// Whether the png decoder should confirm chunk CRC values
    pub const fn png_get_confirm_crc(&self) -> bool {
        self.flags.png_confirm_crc
    }
    /// Set whether the png decoder should confirm
    /// CRC 32 checksums
    pub fn png_set_confirm_crc(mut self, yes: bool) -> Self {
        self.flags.png_confirm_crc = yes;
        self
    }
    /// Whether the png decoder should expose the frames of an animated png.
    ///
    /// When false, only the default image is decoded
    pub const fn png_decode_animated(&self) -> bool {
        self.flags.png_decode_animated
    }
    /// Set whether the png decoder should expose animation frames
    pub fn png_set_decode_animated(mut self, yes: bool) -> Self {
        self.flags.png_decode_animated = yes;
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::options::DecoderOptions;

    #[test]
    fn builder_sets_flags() {
        let options = DecoderOptions::default()
            .set_max_width(10)
            .png_set_confirm_crc(false)
            .inflate_set_limit(100);
        assert_eq!(options.get_max_width(), 10);
        assert_eq!(options.get_max_height(), 1 << 14);
        assert!(!options.png_get_confirm_crc());
        assert!(options.inflate_get_confirm_adler());
        assert_eq!(options.inflate_get_limit(), 100);
        assert!(DecoderOptions::new_strict().get_strict_mode());
    }
}
