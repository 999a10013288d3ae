/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::vec::Vec;

use pictor_core::bytestream::{ZByteWriterTrait, ZWriter};
use pictor_core::color::expand_to_rgba;
use pictor_core::colorspace::ColorSpace;
use pictor_core::log::trace;
use pictor_core::options::EncoderOptions;

use crate::alpha::encode_alpha;
use crate::animation::FrameControl;
use crate::errors::WebpEncodeErrors;
use crate::lossless::encoder::Vp8lEncoder;
use crate::lossy::encoder::Vp8Encoder;
use crate::riff::{
    chunk_size, put_u24, write_chunk, write_riff_header, ALPH, ANIM, ANMF, VP8, VP8L, VP8X
};
use crate::yuv::rgba_to_yuv420;

const SUPPORTED_COLORSPACES: [ColorSpace; 4] = [
    ColorSpace::RGB,
    ColorSpace::RGBA,
    ColorSpace::Luma,
    ColorSpace::LumaA
];

const MAX_LOSSLESS_DIMENSION: usize = 16384;
const MAX_LOSSY_DIMENSION: usize = 16383;

/// Chunks making up one encoded image, in file order
struct ImageChunks {
    chunks:    Vec<([u8; 4], Vec<u8>)>,
    has_alpha: bool
}

impl ImageChunks {
    fn len(&self) -> usize {
        self.chunks.iter().map(|(_, data)| chunk_size(data.len())).sum()
    }
}

fn check_dimensions(width: usize, height: usize, lossless: bool) -> Result<(), WebpEncodeErrors> {
    let max = if lossless {
        MAX_LOSSLESS_DIMENSION
    } else {
        MAX_LOSSY_DIMENSION
    };
    if width == 0 || height == 0 || width > max || height > max {
        return Err(WebpEncodeErrors::InvalidDimensions(width, height));
    }
    Ok(())
}

/// Convert input pixels to RGBA, validating colorspace and length
fn input_to_rgba(
    data: &[u8], width: usize, height: usize, colorspace: ColorSpace
) -> Result<Vec<u8>, WebpEncodeErrors> {
    if !SUPPORTED_COLORSPACES.contains(&colorspace) {
        return Err(WebpEncodeErrors::UnsupportedColorspace(colorspace));
    }
    let expected = width * height * colorspace.num_components();

    if data.len() != expected {
        return Err(WebpEncodeErrors::WrongInputSize(expected, data.len()));
    }
    expand_to_rgba(data, colorspace)
        .map_err(|_| WebpEncodeErrors::Generic("Could not convert input to RGBA"))
}

/// Encode RGBA pixels into the chunks of one image
///
/// `keep_alpha` false makes every pixel opaque.
fn encode_image(
    rgba: &[u8], width: usize, height: usize, options: &EncoderOptions, keep_alpha: bool
) -> Result<ImageChunks, WebpEncodeErrors> {
    let lossless = options.get_lossless();
    check_dimensions(width, height, lossless)?;

    let has_alpha = keep_alpha && rgba.chunks_exact(4).any(|px| px[3] != 255);

    if lossless {
        let argb: Vec<u32> = rgba
            .chunks_exact(4)
            .map(|px| {
                let alpha = if keep_alpha { px[3] } else { 255 };
                u32::from_be_bytes([alpha, px[0], px[1], px[2]])
            })
            .collect();

        let mut encoder = Vp8lEncoder::new(&argb, width, height);
        encoder.set_effort(options.get_effort());

        return Ok(ImageChunks {
            chunks: alloc::vec![(VP8L, encoder.encode()?)],
            has_alpha
        });
    }
    let planes = rgba_to_yuv420(rgba, width, height);
    let bitstream =
        Vp8Encoder::new(&planes, options.get_quality(), options.get_effort() > 0).encode()?;

    let mut chunks = Vec::with_capacity(2);

    if has_alpha {
        let alpha: Vec<u8> = rgba.chunks_exact(4).map(|px| px[3]).collect();
        chunks.push((ALPH, encode_alpha(&alpha, width, height, options.get_effort())?));
    }
    chunks.push((VP8, bitstream));

    Ok(ImageChunks { chunks, has_alpha })
}

fn vp8x_payload(flags: u8, width: usize, height: usize) -> Vec<u8> {
    let mut payload = alloc::vec![flags, 0, 0, 0];
    put_u24(&mut payload, (width - 1) as u32);
    put_u24(&mut payload, (height - 1) as u32);
    payload
}

/// A WebP encoder
///
/// Images are stored lossless (`VP8L`) when
/// [`EncoderOptions::get_lossless`] is set, otherwise lossy (`VP8 `) at the
/// configured quality. Lossy images with transparent pixels carry their
/// alpha channel in a losslessly compressed `ALPH` chunk.
///
/// # Example
/// ```
/// use pictor_core::colorspace::ColorSpace;
/// use pictor_core::options::EncoderOptions;
/// use pictor_webp::WebpEncoder;
///
/// let pixels = [0_u8, 127, 255].repeat(16 * 16);
/// let options = EncoderOptions::new(16, 16, ColorSpace::RGB).set_lossless(true);
/// let mut sink = vec![];
/// let written = WebpEncoder::new(&pixels, options).encode(&mut sink).unwrap();
/// assert_eq!(written, sink.len());
/// ```
pub struct WebpEncoder<'a> {
    data:    &'a [u8],
    options: EncoderOptions
}

impl<'a> WebpEncoder<'a> {
    /// Create an encoder for `data` laid out as `options` describes
    ///
    /// RGB, RGBA, Luma and LumaA inputs are accepted.
    pub const fn new(data: &'a [u8], options: EncoderOptions) -> WebpEncoder<'a> {
        WebpEncoder { data, options }
    }

    /// Encode the image into `sink`, returning the number of bytes written
    pub fn encode<T: ZByteWriterTrait>(&mut self, sink: T) -> Result<usize, WebpEncodeErrors> {
        let (width, height) = (self.options.get_width(), self.options.get_height());
        let colorspace = self.options.get_colorspace();

        let rgba = input_to_rgba(self.data, width, height, colorspace)?;
        let image = encode_image(&rgba, width, height, &self.options, colorspace.has_alpha())?;

        let mut writer = ZWriter::new(sink);

        // alpha next to a lossy bitstream needs the extended layout
        let extended = image.has_alpha && !self.options.get_lossless();

        if extended {
            let vp8x = vp8x_payload(1 << 4, width, height);
            write_riff_header(&mut writer, chunk_size(vp8x.len()) + image.len())?;
            write_chunk(&mut writer, VP8X, &vp8x)?;
        } else {
            write_riff_header(&mut writer, image.len())?;
        }
        for (fourcc, data) in &image.chunks {
            write_chunk(&mut writer, *fourcc, data)?;
        }
        writer.flush()?;

        trace!(
            "Encoded {}x{} webp, lossless: {}, alpha: {}",
            width,
            height,
            self.options.get_lossless(),
            image.has_alpha
        );
        Ok(writer.bytes_written())
    }
}

/// An encoder of animated WebP files
///
/// Every frame is encoded with the same options, whose width and height
/// give the canvas size.
///
/// # Example
/// ```
/// use pictor_core::colorspace::ColorSpace;
/// use pictor_core::options::EncoderOptions;
/// use pictor_webp::{FrameControl, WebpAnimationEncoder};
///
/// let options = EncoderOptions::new(2, 2, ColorSpace::RGBA).set_lossless(true);
/// let mut encoder = WebpAnimationEncoder::new(options);
/// let control = FrameControl { width: 2, height: 2, duration_ms: 100, ..Default::default() };
///
/// encoder.add_frame(&[255, 0, 0, 255].repeat(4), control).unwrap();
/// encoder.add_frame(&[0, 0, 255, 255].repeat(4), control).unwrap();
///
/// let mut sink = vec![];
/// encoder.encode(&mut sink).unwrap();
/// ```
pub struct WebpAnimationEncoder {
    options:    EncoderOptions,
    loop_count: u16,
    background: [u8; 4],
    frames:     Vec<(FrameControl, ImageChunks)>
}

impl WebpAnimationEncoder {
    pub fn new(options: EncoderOptions) -> WebpAnimationEncoder {
        WebpAnimationEncoder {
            options,
            loop_count: 0,
            background: [0; 4],
            frames: Vec::new()
        }
    }
    /// Times to play the animation, 0 (the default) loops forever
    pub fn set_loop_count(&mut self, loop_count: u16) {
        self.loop_count = loop_count;
    }
    /// RGBA background color stored as a hint in the `ANIM` chunk
    pub fn set_background_color(&mut self, rgba: [u8; 4]) {
        self.background = rgba;
    }

    /// Encode a frame of `control.width * control.height` pixels in
    /// the colorspace of the encoder options
    ///
    /// Frame offsets must be even.
    pub fn add_frame(&mut self, data: &[u8], control: FrameControl) -> Result<(), WebpEncodeErrors> {
        let (canvas_w, canvas_h) = (self.options.get_width(), self.options.get_height());

        if control.x_offset % 2 != 0 || control.y_offset % 2 != 0 {
            return Err(WebpEncodeErrors::Generic("Frame offsets must be even"));
        }
        if control.width == 0
            || control.height == 0
            || control.x_offset + control.width > canvas_w
            || control.y_offset + control.height > canvas_h
        {
            return Err(WebpEncodeErrors::InvalidDimensions(control.width, control.height));
        }
        let colorspace = self.options.get_colorspace();
        let rgba = input_to_rgba(data, control.width, control.height, colorspace)?;
        let image = encode_image(
            &rgba,
            control.width,
            control.height,
            &self.options,
            colorspace.has_alpha()
        )?;
        self.frames.push((control, image));

        Ok(())
    }

    /// Number of frames added so far
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Write the animation into `sink`, returning the number of bytes written
    pub fn encode<T: ZByteWriterTrait>(&mut self, sink: T) -> Result<usize, WebpEncodeErrors> {
        let (width, height) = (self.options.get_width(), self.options.get_height());

        if self.frames.is_empty() {
            return Err(WebpEncodeErrors::Generic("An animation needs at least one frame"));
        }
        if width == 0 || height == 0 || width > 1 << 24 || height > 1 << 24 {
            return Err(WebpEncodeErrors::InvalidDimensions(width, height));
        }
        let has_alpha = self.frames.iter().any(|(_, image)| image.has_alpha);
        let flags = (1 << 1) | (u8::from(has_alpha) << 4);
        let vp8x = vp8x_payload(flags, width, height);

        let [r, g, b, a] = self.background;
        let mut anim = alloc::vec![b, g, r, a];
        anim.extend_from_slice(&self.loop_count.to_le_bytes());

        let mut frames = Vec::with_capacity(self.frames.len());

        for (control, image) in &self.frames {
            let mut payload = control.to_anmf();
            let mut inner = ZWriter::new(&mut payload);

            for (fourcc, data) in &image.chunks {
                write_chunk(&mut inner, *fourcc, data)?;
            }
            frames.push(payload);
        }
        let body = chunk_size(vp8x.len())
            + chunk_size(anim.len())
            + frames.iter().map(|f| chunk_size(f.len())).sum::<usize>();

        let mut writer = ZWriter::new(sink);
        write_riff_header(&mut writer, body)?;
        write_chunk(&mut writer, VP8X, &vp8x)?;
        write_chunk(&mut writer, ANIM, &anim)?;

        for frame in &frames {
            write_chunk(&mut writer, ANMF, frame)?;
        }
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

    use crate::{WebpDecoder, WebpEncoder};

    fn encode(pixels: &[u8], options: EncoderOptions) -> Vec<u8> {
        let mut out = vec![];
        let written = WebpEncoder::new(pixels, options).encode(&mut out).unwrap();
        assert_eq!(written, out.len());
        out
    }

    #[test]
    fn lossless_rgba_round_trip() {
        let pixels: Vec<u8> = (0..13 * 7 * 4).map(|i| (i * 31 % 256) as u8).collect();
        let options = EncoderOptions::new(13, 7, ColorSpace::RGBA).set_lossless(true);
        let file = encode(&pixels, options);

        assert_eq!(&file[12..16], b"VP8L");
        let mut decoder = WebpDecoder::new(ZCursor::new(&file));
        assert_eq!(decoder.decode().unwrap(), pixels);
    }

    #[test]
    fn lossy_alpha_uses_extended_layout() {
        let pixels: Vec<u8> = (0..20 * 20)
            .flat_map(|i| [100, 150, 200, (i % 256) as u8])
            .collect();
        let options = EncoderOptions::new(20, 20, ColorSpace::RGBA)
            .set_quality(90)
            .set_lossless(false);
        let file = encode(&pixels, options);

        assert_eq!(&file[12..16], b"VP8X");
        let mut decoder = WebpDecoder::new(ZCursor::new(&file));
        let decoded = decoder.decode().unwrap();

        assert_eq!(decoder.colorspace(), Some(ColorSpace::RGBA));
        // alpha is lossless even in lossy files
        for (a, b) in decoded.chunks_exact(4).zip(pixels.chunks_exact(4)) {
            assert_eq!(a[3], b[3]);
        }
    }

    #[test]
    fn opaque_lossy_is_simple() {
        let pixels = [10_u8, 200, 30].repeat(9 * 9);
        let options = EncoderOptions::new(9, 9, ColorSpace::RGB)
            .set_quality(75)
            .set_lossless(false);
        let file = encode(&pixels, options);

        assert_eq!(&file[12..16], b"VP8 ");
        let mut decoder = WebpDecoder::new(ZCursor::new(&file));
        let decoded = decoder.decode().unwrap();
        assert_eq!(decoded.len(), pixels.len());
        assert_eq!(decoder.colorspace(), Some(ColorSpace::RGB));
    }

    #[test]
    fn bad_inputs() {
        let pixels = [0_u8; 12];
        let mut out = vec![];
        let options = EncoderOptions::new(2, 2, ColorSpace::RGBA);
        assert!(WebpEncoder::new(&pixels, options).encode(&mut out).is_err());

        let options = EncoderOptions::new(4, 1, ColorSpace::YCbCr);
        assert!(WebpEncoder::new(&pixels, options).encode(&mut out).is_err());

        let options = EncoderOptions::new(0, 4, ColorSpace::RGB);
        assert!(WebpEncoder::new(&[], options).encode(&mut out).is_err());
    }
}
