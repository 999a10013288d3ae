/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::vec;
use alloc::vec::Vec;

use pictor_core::bytestream::{ZByteWriterTrait, ZWriter};
use pictor_core::log::trace;
use pictor_core::options::EncoderOptions;
use pictor_inflate::{DeflateEncoder, DeflateEncodingOptions};

use crate::constants::{IDAT_CHUNK_SIZE, PNG_SIGNATURE};
use crate::enums::{FilterMethod, PngColor};
use crate::error::PngEncodeErrors;
use crate::filters::{choose_compression_filter, filter_scanline};
use crate::headers::writers::{ihdr_bytes, write_chunk};

/// A PNG encoder for 8 bit Luma, LumaA, RGB and RGBA images
///
/// The effort in the options controls both filter selection and the
/// compression level, effort 0 writes every scanline unfiltered.
///
/// # Example
/// ```
/// use pictor_core::colorspace::ColorSpace;
/// use pictor_core::options::EncoderOptions;
/// use pictor_png::PngEncoder;
///
/// let pixels = [128_u8; 16 * 16 * 3];
/// let mut encoder = PngEncoder::new(&pixels, EncoderOptions::new(16, 16, ColorSpace::RGB));
/// let mut sink = vec![];
/// encoder.encode(&mut sink).unwrap();
/// assert_eq!(&sink[1..4], b"PNG");
/// ```
pub struct PngEncoder<'a> {
    data:    &'a [u8],
    options: EncoderOptions
}

impl<'a> PngEncoder<'a> {
    /// Create a new encoder for `data` described by `options`
    pub const fn new(data: &'a [u8], options: EncoderOptions) -> PngEncoder<'a> {
        PngEncoder { data, options }
    }

    fn validate(&self) -> Result<(PngColor, u32, u32), PngEncodeErrors> {
        let colorspace = self.options.get_colorspace();
        let color = PngColor::from_colorspace(colorspace)
            .ok_or(PngEncodeErrors::UnsupportedColorspace(colorspace))?;

        let (width, height) = (self.options.get_width(), self.options.get_height());

        if width == 0 || height == 0 || width > (1 << 31) - 1 || height > (1 << 31) - 1 {
            return Err(PngEncodeErrors::InvalidDimensions(width, height));
        }
        let expected = width
            .checked_mul(height)
            .and_then(|x| x.checked_mul(colorspace.num_components()))
            .ok_or(PngEncodeErrors::Generic("Image dimensions overflow"))?;

        if self.data.len() != expected {
            return Err(PngEncodeErrors::WrongInputSize(expected, self.data.len()));
        }
        Ok((color, width as u32, height as u32))
    }

    /// Filter every scanline, each output row starts with its filter byte
    fn add_filters(&self) -> Vec<u8> {
        let components = self.options.get_colorspace().num_components();
        let scanline_size = self.options.get_width() * components;
        let adaptive = self.options.get_effort() > 0;

        let mut filtered = vec![0; (scanline_size + 1) * self.options.get_height()];
        let mut scratch = vec![0; scanline_size + 1];
        // the row above the first scanline is all zeros
        let zero_row = vec![0; scanline_size];
        let mut previous: &[u8] = &zero_row;

        for (current, out) in self
            .data
            .chunks_exact(scanline_size)
            .zip(filtered.chunks_exact_mut(scanline_size + 1))
        {
            let filter = if adaptive {
                choose_compression_filter(current, previous, &mut scratch, components)
            } else {
                FilterMethod::None
            };
            filter_scanline(current, previous, out, filter, components);
            previous = current;
        }
        filtered
    }

    /// Encode the image into `sink`, returning the number of bytes written
    pub fn encode<T: ZByteWriterTrait>(&mut self, sink: T) -> Result<usize, PngEncodeErrors> {
        let (color, width, height) = self.validate()?;

        let filtered = self.add_filters();
        let level = self.options.get_effort().min(9);
        let compressed = DeflateEncoder::new_with_options(
            &filtered,
            DeflateEncodingOptions::default().set_level(level)
        )
        .encode_zlib();

        trace!(
            "Filtered {} bytes, compressed to {} bytes at level {}",
            filtered.len(),
            compressed.len(),
            level
        );
        let mut writer = ZWriter::new(sink);

        writer.write_u64_be_err(PNG_SIGNATURE)?;
        write_chunk(b"IHDR", &ihdr_bytes(width, height, color), &mut writer)?;

        // Most decoders love data in 8KB chunks, since
        // probably libpng does that by default
        for chunk in compressed.chunks(IDAT_CHUNK_SIZE) {
            write_chunk(b"IDAT", chunk, &mut writer)?;
        }
        write_chunk(b"IEND", &[], &mut writer)?;
        writer.flush()?;

        Ok(writer.bytes_written())
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use pictor_core::bytestream::ZCursor;
    use pictor_core::colorspace::ColorSpace;
    use pictor_core::options::EncoderOptions;

    use crate::{PngDecoder, PngEncoder};

    #[test]
    fn test_simple_write() {
        let width = 40;
        let height = 10;
        let data = vec![100_u8; width * height];

        let options = EncoderOptions::new(width, height, ColorSpace::Luma);

        let mut encoder = PngEncoder::new(&data, options);
        let mut sink = vec![];

        encoder.encode(&mut sink).unwrap();
        let mut decoder = PngDecoder::new(ZCursor::new(&sink));
        let bytes = decoder.decode().unwrap();
        assert_eq!(decoder.colorspace(), Some(ColorSpace::Luma));
        assert_eq!(&data, &bytes);
    }

    #[test]
    fn every_effort_round_trips() {
        let (w, h) = (23, 9);
        let data: Vec<u8> = (0..w * h * 4).map(|i| ((i * 31) ^ (i >> 3)) as u8).collect();

        for effort in 0..=9 {
            let options = EncoderOptions::new(w, h, ColorSpace::RGBA).set_effort(effort);
            let mut sink = vec![];
            PngEncoder::new(&data, options).encode(&mut sink).unwrap();

            let pixels = PngDecoder::new(ZCursor::new(&sink)).decode().unwrap();
            assert_eq!(pixels, data, "effort {effort}");
        }
    }

    #[test]
    fn large_images_split_idat() {
        let (w, h) = (200, 100);
        let data: Vec<u8> = (0..w * h * 3).map(|i| (i * 7919 % 251) as u8).collect();
        let options = EncoderOptions::new(w, h, ColorSpace::RGB).set_effort(0);
        let mut sink = vec![];
        PngEncoder::new(&data, options).encode(&mut sink).unwrap();

        let idat_count = sink.windows(4).filter(|x| *x == &b"IDAT"[..]).count();
        assert!(idat_count > 1);

        let pixels = PngDecoder::new(ZCursor::new(&sink)).decode().unwrap();
        assert_eq!(pixels, data);
    }

    #[test]
    fn rejects_bad_input() {
        let data = [0_u8; 12];
        let options = EncoderOptions::new(2, 2, ColorSpace::YCbCr);
        assert!(PngEncoder::new(&data, options).encode(&mut vec![]).is_err());

        let options = EncoderOptions::new(2, 2, ColorSpace::RGBA);
        assert!(PngEncoder::new(&data, options).encode(&mut vec![]).is_err());

        let options = EncoderOptions::new(0, 2, ColorSpace::RGB);
        assert!(PngEncoder::new(&[], options).encode(&mut vec![]).is_err());
    }
}
