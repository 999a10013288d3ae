/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use pictor_core::bytestream::{ZByteWriterTrait, ZWriter};
use pictor_core::colorspace::ColorSpace;
use pictor_core::options::EncoderOptions;

use crate::constants::{
    color_hash, QOI_END_MARKER, QOI_HEADER_SIZE, QOI_MAGIC, QOI_MAX_RUN, QOI_OP_DIFF,
    QOI_OP_INDEX, QOI_OP_LUMA, QOI_OP_RGB, QOI_OP_RGBA, QOI_OP_RUN, QOI_PADDING
};
use crate::decoder::QoiColorspace;
use crate::QoiEncodeErrors;

const SUPPORTED_COLORSPACES: [ColorSpace; 2] = [ColorSpace::RGB, ColorSpace::RGBA];

/// Quite Ok Image Encoder
///
/// # Example
/// - Encode a 100 by 100 RGB image
///
/// ```
/// use pictor_core::colorspace::ColorSpace;
/// use pictor_core::options::EncoderOptions;
/// use pictor_qoi::QoiEncoder;
/// use pictor_qoi::QoiEncodeErrors;
///
/// const W:usize=100;
/// const H:usize=100;
///
/// fn main()->Result<(), QoiEncodeErrors>{
///     let pixels = std::array::from_fn::<u8,{W * H * 3},_>(|i| (i%256) as u8);
///     let mut encoder = QoiEncoder::new(&pixels,EncoderOptions::new(W,H,ColorSpace::RGB));
///     let mut sink = vec![];
///     let written = encoder.encode(&mut sink)?;
///     assert_eq!(written, sink.len());
///     Ok(())
///}
/// ```
pub struct QoiEncoder<'a> {
    // raw pixels, in RGB or RBGA
    pixel_data: &'a [u8],
    options:    EncoderOptions,
    layout:     QoiColorspace
}

impl<'a> QoiEncoder<'a> {
    /// Create a new encoder which will encode the pixels
    ///
    /// # Arguments
    /// - data: Pixel data, size must be equal to `width*height*colorspace channels`
    /// - options: Encoder details for data, this contains width, height and number of color components
    pub const fn new(data: &'a [u8], options: EncoderOptions) -> QoiEncoder<'a> {
        QoiEncoder {
            pixel_data: data,
            options,
            layout: QoiColorspace::sRGB
        }
    }
    /// Set the transfer characteristics written to the header
    pub fn set_color_layout(&mut self, layout: QoiColorspace) {
        self.layout = layout;
    }

    /// Return the maximum size for which the encoder can safely
    /// encode the image without fearing for an out of space error
    pub fn max_size(&self) -> usize {
        self.options.get_width()
            * self.options.get_height()
            * (self.options.get_colorspace().num_components() + 1)
            + QOI_HEADER_SIZE
            + QOI_PADDING
    }
    fn encode_headers<T: ZByteWriterTrait>(
        &self, writer: &mut ZWriter<T>
    ) -> Result<usize, QoiEncodeErrors> {
        let options = &self.options;

        let channels = match options.get_colorspace() {
            ColorSpace::RGB => 3,
            ColorSpace::RGBA => 4,
            _ => {
                return Err(QoiEncodeErrors::UnsupportedColorspace(
                    options.get_colorspace(),
                    &SUPPORTED_COLORSPACES
                ))
            }
        };
        if options.get_width() == 0 || options.get_height() == 0 {
            return Err(QoiEncodeErrors::Generic("Cannot encode a zero sized image"));
        }
        let expected_len = options
            .get_width()
            .checked_mul(options.get_height())
            .and_then(|x| x.checked_mul(usize::from(channels)))
            .ok_or(QoiEncodeErrors::Generic("Image dimensions overflow"))?;

        if self.pixel_data.len() != expected_len {
            return Err(QoiEncodeErrors::Generic(
                "Expected length doesn't match pixels length"
            ));
        }
        let width = u32::try_from(options.get_width())
            .map_err(|_| QoiEncodeErrors::TooLargeDimensions(options.get_width()))?;
        let height = u32::try_from(options.get_height())
            .map_err(|_| QoiEncodeErrors::TooLargeDimensions(options.get_height()))?;

        writer.write_u32_be_err(QOI_MAGIC)?;
        writer.write_u32_be_err(width)?;
        writer.write_u32_be_err(height)?;
        writer.write_u8_err(channels)?;
        writer.write_u8_err(u8::from(self.layout == QoiColorspace::Linear))?;

        Ok(usize::from(channels))
    }
    /// Encode the pixels into `sink`
    ///
    /// # Returns
    /// - Ok(size): Actual bytes used for encoding
    /// - Err: The error encountered during encoding
    pub fn encode<T: ZByteWriterTrait>(&mut self, sink: T) -> Result<usize, QoiEncodeErrors> {
        let mut stream = ZWriter::new(sink);

        let channel_count = self.encode_headers(&mut stream)?;

        stream.reserve(self.max_size())?;

        let mut index = [[0_u8; 4]; 64];
        // starting pixel
        let mut px = [0, 0, 0, 255];
        let mut px_prev = [0, 0, 0, 255];

        let mut run: u8 = 0;

        for pix_chunk in self.pixel_data.chunks_exact(channel_count) {
            px[0..channel_count].copy_from_slice(pix_chunk);

            if px == px_prev {
                run += 1;

                if run == QOI_MAX_RUN {
                    stream.write_u8_err(QOI_OP_RUN | (run - 1))?;
                    run = 0;
                }
                continue;
            }
            if run > 0 {
                stream.write_u8_err(QOI_OP_RUN | (run - 1))?;
                run = 0;
            }
            let index_pos = color_hash(px);

            if index[index_pos] == px {
                stream.write_u8_err(QOI_OP_INDEX | (index_pos as u8))?;
            } else {
                index[index_pos] = px;

                if px[3] == px_prev[3] {
                    write_rgb_delta(&mut stream, px, px_prev)?;
                } else {
                    stream.write_u8_err(QOI_OP_RGBA)?;
                    stream.write_const_bytes(&px)?;
                }
            }
            px_prev = px;
        }
        if run > 0 {
            stream.write_u8_err(QOI_OP_RUN | (run - 1))?;
        }
        stream.write_const_bytes(&QOI_END_MARKER)?;
        stream.flush()?;

        Ok(stream.bytes_written())
    }
}

/// Emit the smallest of DIFF, LUMA or RGB for a pixel whose alpha
/// did not change
fn write_rgb_delta<T: ZByteWriterTrait>(
    stream: &mut ZWriter<T>, px: [u8; 4], prev: [u8; 4]
) -> Result<(), QoiEncodeErrors> {
    let vr = px[0].wrapping_sub(prev[0]) as i8;
    let vg = px[1].wrapping_sub(prev[1]) as i8;
    let vb = px[2].wrapping_sub(prev[2]) as i8;

    let vg_r = vr.wrapping_sub(vg);
    let vg_b = vb.wrapping_sub(vg);

    let small = |v: i8| (-2..=1).contains(&v);

    if small(vr) && small(vg) && small(vb) {
        let op = QOI_OP_DIFF
            | (((vr + 2) as u8) << 4)
            | (((vg + 2) as u8) << 2)
            | ((vb + 2) as u8);
        stream.write_u8_err(op)?;
    } else if (-32..=31).contains(&vg) && (-8..=7).contains(&vg_r) && (-8..=7).contains(&vg_b) {
        stream.write_u8_err(QOI_OP_LUMA | ((vg + 32) as u8))?;
        stream.write_u8_err((((vg_r + 8) as u8) << 4) | ((vg_b + 8) as u8))?;
    } else {
        stream.write_u8_err(QOI_OP_RGB)?;
        stream.write_const_bytes(&[px[0], px[1], px[2]])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use pictor_core::bytestream::ZCursor;
    use pictor_core::colorspace::ColorSpace;
    use pictor_core::options::EncoderOptions;

    use crate::{QoiDecoder, QoiEncoder};

    fn round_trip(pixels: &[u8], w: usize, h: usize, colorspace: ColorSpace) -> Vec<u8> {
        let mut encoder = QoiEncoder::new(pixels, EncoderOptions::new(w, h, colorspace));
        let mut output = vec![];
        encoder.encode(&mut output).unwrap();

        let mut decoder = QoiDecoder::new(ZCursor::new(&output));
        decoder.decode().unwrap()
    }

    #[test]
    fn test_qoi_encode_rgb() {
        const W: usize = 100;
        const H: usize = 100;

        let pixels: Vec<u8> = (0..W * H * 3).map(|i| (i % 256) as u8).collect();
        assert_eq!(round_trip(&pixels, W, H, ColorSpace::RGB), pixels);
    }

    #[test]
    fn test_qoi_encode_rgba() {
        const W: usize = 100;
        const H: usize = 100;

        let pixels: Vec<u8> = (0..W * H * 4).map(|i| ((i * 7) % 256) as u8).collect();
        assert_eq!(round_trip(&pixels, W, H, ColorSpace::RGBA), pixels);
    }

    #[test]
    fn long_runs_are_split() {
        // 200 identical pixels need several run ops
        let pixels = [10_u8, 20, 30, 40].repeat(200);
        assert_eq!(round_trip(&pixels, 20, 10, ColorSpace::RGBA), pixels);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let pixels = [0_u8; 10];
        let mut encoder = QoiEncoder::new(&pixels, EncoderOptions::new(2, 2, ColorSpace::RGB));
        assert!(encoder.encode(&mut vec![]).is_err());

        let mut encoder = QoiEncoder::new(&pixels, EncoderOptions::new(10, 1, ColorSpace::Luma));
        assert!(encoder.encode(&mut vec![]).is_err());
    }
}
