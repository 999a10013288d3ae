/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::vec;
use alloc::vec::Vec;

use pictor_core::bytestream::{ZByteReaderTrait, ZReader};
use pictor_core::colorspace::ColorSpace;
use pictor_core::log::{trace, warn};
use pictor_core::options::DecoderOptions;

use crate::constants::{
    color_hash, QOI_END_MARKER, QOI_MASK_2, QOI_OP_DIFF, QOI_OP_INDEX, QOI_OP_LUMA, QOI_OP_RGB,
    QOI_OP_RGBA
};
use crate::errors::QoiErrors;

/// Transfer characteristics stored in the header
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum QoiColorspace {
    /// sRGB with linear alpha
    sRGB,
    /// All channels linear
    Linear
}

/// A Quite OK Image decoder
///
/// The decoder is initialized by calling `new`
/// and either of [`decode_headers`] to decode headers
/// or [`decode`] to return uncompressed pixels
///
/// Additional methods are provided that give more
/// details of the compressed image like width and height
/// are accessible after decoding headers
///
/// [`decode_headers`]:QoiDecoder::decode_headers
/// [`decode`]:QoiDecoder::decode
pub struct QoiDecoder<T>
where
    T: ZByteReaderTrait
{
    width:             usize,
    height:            usize,
    colorspace:        ColorSpace,
    colorspace_layout: QoiColorspace,
    decoded_headers:   bool,
    stream:            ZReader<T>,
    options:           DecoderOptions
}

impl<T> QoiDecoder<T>
where
    T: ZByteReaderTrait
{
    /// Create a new QOI format decoder with the default options
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pictor_core::bytestream::ZCursor;
    /// let mut decoder = pictor_qoi::QoiDecoder::new(ZCursor::new(&[]));
    /// // additional code
    /// ```
    pub fn new(data: T) -> QoiDecoder<T> {
        QoiDecoder::new_with_options(data, DecoderOptions::default())
    }
    /// Create a new QOI format decoder that obeys specified restrictions
    ///
    /// E.g can be used to set width and height limits to prevent OOM attacks
    ///
    /// # Example
    /// ```
    /// use pictor_core::bytestream::ZCursor;
    /// use pictor_core::options::DecoderOptions;
    /// use pictor_qoi::QoiDecoder;
    /// // only decode images less than 10 in both width and height
    ///
    /// let options = DecoderOptions::default().set_max_width(10).set_max_height(10);
    ///
    /// let mut decoder = QoiDecoder::new_with_options(ZCursor::new([]), options);
    /// ```
    pub fn new_with_options(data: T, options: DecoderOptions) -> QoiDecoder<T> {
        QoiDecoder {
            width: 0,
            height: 0,
            colorspace: ColorSpace::RGB,
            colorspace_layout: QoiColorspace::sRGB,
            decoded_headers: false,
            stream: ZReader::new(data),
            options
        }
    }
    /// Decode a QOI header storing needed information into
    /// the decoder instance
    ///
    /// # Returns
    ///
    /// - On success: Nothing
    /// - On error: The error encountered when decoding headers
    pub fn decode_headers(&mut self) -> Result<(), QoiErrors> {
        if self.decoded_headers {
            return Ok(());
        }
        let magic = self.stream.read_fixed_bytes_or_error::<4>()?;

        if &magic != b"qoif" {
            return Err(QoiErrors::WrongMagicBytes);
        }

        let width = self.stream.get_u32_be_err()? as usize;
        let height = self.stream.get_u32_be_err()? as usize;
        let channels = self.stream.get_u8_err()?;
        let colorspace_layout = self.stream.get_u8_err()?;

        if width == 0
            || height == 0
            || width > self.options.get_max_width()
            || height > self.options.get_max_height()
        {
            return Err(QoiErrors::InvalidDimensions(width, height));
        }

        self.colorspace = match channels {
            3 => ColorSpace::RGB,
            4 => ColorSpace::RGBA,
            _ => return Err(QoiErrors::UnknownChannels(channels))
        };
        self.colorspace_layout = match colorspace_layout {
            0 => QoiColorspace::sRGB,
            1 => QoiColorspace::Linear,
            _ => {
                if self.options.get_strict_mode() {
                    return Err(QoiErrors::UnknownColorspace(colorspace_layout));
                }
                warn!("Unknown/invalid colorspace value {colorspace_layout}, expected 0 or 1");
                QoiColorspace::sRGB
            }
        };
        self.width = width;
        self.height = height;

        trace!("Image width: {:?}", self.width);
        trace!("Image height: {:?}", self.height);
        trace!("Image colorspace:{:?}", self.colorspace);
        self.decoded_headers = true;

        Ok(())
    }
    /// Return the number of bytes required to hold a decoded image frame
    ///
    /// # Returns
    ///  - `Some(usize)`: Minimum size for a buffer needed to decode the image
    ///  - `None`: Indicates the image headers were not decoded or
    ///    the size overflows
    pub fn output_buffer_size(&self) -> Option<usize> {
        if !self.decoded_headers {
            return None;
        }
        self.width
            .checked_mul(self.height)?
            .checked_mul(self.colorspace.num_components())
    }

    /// Decode the bytes of a QOI image data, returning the
    /// uncompressed bytes or the error encountered during decoding
    ///
    /// Pixels are returned in the colorspace reported by
    /// [`colorspace`](Self::colorspace), RGB or RGBA
    pub fn decode(&mut self) -> Result<Vec<u8>, QoiErrors> {
        self.decode_headers()?;

        let size = self
            .output_buffer_size()
            .ok_or(QoiErrors::GenericStatic("Image dimensions overflow"))?;

        let mut output = vec![0; size];

        self.decode_into(&mut output)?;

        Ok(output)
    }

    /// Decode a compressed Qoi image and store the contents
    /// into the output buffer
    ///
    /// Returns an error if the buffer cannot hold the contents
    /// of the buffer
    pub fn decode_into(&mut self, pixels: &mut [u8]) -> Result<(), QoiErrors> {
        self.decode_headers()?;

        let size = self
            .output_buffer_size()
            .ok_or(QoiErrors::GenericStatic("Image dimensions overflow"))?;

        if pixels.len() < size {
            return Err(QoiErrors::TooSmallOutput(size, pixels.len()));
        }
        let pixels = &mut pixels[..size];

        if self.colorspace.num_components() == 3 {
            self.decode_inner_generic::<3>(pixels)
        } else {
            self.decode_inner_generic::<4>(pixels)
        }
    }
    fn decode_inner_generic<const SIZE: usize>(
        &mut self, pixels: &mut [u8]
    ) -> Result<(), QoiErrors> {
        let mut index = [[0_u8; 4]; 64];
        // starting pixel
        let mut px = [0, 0, 0, 255];

        let mut run = 0;

        for pix_chunk in pixels.chunks_exact_mut(SIZE) {
            if run > 0 {
                run -= 1;
                pix_chunk.copy_from_slice(&px[0..SIZE]);
                continue;
            }
            let chunk = self.stream.get_u8_err()?;

            if chunk == QOI_OP_RGB {
                let packed_bytes = self.stream.read_fixed_bytes_or_error::<3>()?;
                px[..3].copy_from_slice(&packed_bytes);
            } else if chunk == QOI_OP_RGBA {
                px = self.stream.read_fixed_bytes_or_error::<4>()?;
            } else {
                match chunk & QOI_MASK_2 {
                    QOI_OP_INDEX => {
                        px = index[usize::from(chunk & 63)];
                    }
                    QOI_OP_DIFF => {
                        px[0] = px[0].wrapping_add(((chunk >> 4) & 0x03).wrapping_sub(2));
                        px[1] = px[1].wrapping_add(((chunk >> 2) & 0x03).wrapping_sub(2));
                        px[2] = px[2].wrapping_add((chunk & 0x03).wrapping_sub(2));
                    }
                    QOI_OP_LUMA => {
                        let b2 = self.stream.get_u8_err()?;
                        let vg = (chunk & 0x3f).wrapping_sub(32);

                        px[0] = px[0].wrapping_add(vg.wrapping_sub(8).wrapping_add(b2 >> 4));
                        px[1] = px[1].wrapping_add(vg);
                        px[2] = px[2].wrapping_add(vg.wrapping_sub(8).wrapping_add(b2 & 0x0f));
                    }
                    _ => {
                        // QOI_OP_RUN, the current pixel is the first of the run
                        run = usize::from(chunk & 0x3f);
                    }
                }
            }
            pix_chunk.copy_from_slice(&px[0..SIZE]);
            index[color_hash(px)] = px;
        }
        let remaining = self.stream.read_fixed_bytes_or_error::<8>()?;

        if remaining != QOI_END_MARKER {
            if self.options.get_strict_mode() {
                return Err(QoiErrors::GenericStatic(
                    "Last bytes do not match QOI signature"
                ));
            }
            warn!("Last bytes do not match QOI signature");
        }

        trace!("Finished decoding image");

        Ok(())
    }

    /// Returns QOI colorspace or none if the headers haven't been decoded
    ///
    /// Colorspace returned can either be [RGB] or [RGBA]
    ///
    /// [RGB]: pictor_core::colorspace::ColorSpace::RGB
    /// [RGBA]: pictor_core::colorspace::ColorSpace::RGBA
    pub const fn colorspace(&self) -> Option<ColorSpace> {
        if self.decoded_headers {
            Some(self.colorspace)
        } else {
            None
        }
    }
    /// Transfer characteristics declared by the header
    pub const fn color_layout(&self) -> Option<QoiColorspace> {
        if self.decoded_headers {
            Some(self.colorspace_layout)
        } else {
            None
        }
    }

    /// Return the width and height of the image
    ///
    /// Or none if the headers haven't been decoded
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pictor_core::bytestream::ZCursor;
    /// use pictor_qoi::QoiDecoder;
    /// let mut decoder = QoiDecoder::new(ZCursor::new(&[]));
    ///
    /// decoder.decode_headers().unwrap();
    /// // get dimensions now.
    /// let (w,h)=decoder.dimensions().unwrap();
    /// ```
    pub const fn dimensions(&self) -> Option<(usize, usize)> {
        if self.decoded_headers {
            return Some((self.width, self.height));
        }
        None
    }
}
