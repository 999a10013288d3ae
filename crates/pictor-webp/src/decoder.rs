/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::vec::Vec;
use core::ops::Range;

use pictor_core::bytestream::{ZByteReaderTrait, ZReader};
use pictor_core::colorspace::ColorSpace;
use pictor_core::log::{error, trace, warn};
use pictor_core::options::DecoderOptions;

use crate::alpha::decode_alpha;
use crate::animation::{FrameControl, WebpCanvas, WebpFrame, ANMF_HEADER_SIZE};
use crate::errors::WebpDecodeErrors;
use crate::lossless::decoder::{read_vp8l_header, Vp8lDecoder};
use crate::lossy::decoder::{read_frame_header, Vp8Decoder};
use crate::riff::{
    chunk_size, get_u24, read_riff_header, Chunk, ChunkIter, ALPH, ANIM, ANMF, RIFF_HEADER_SIZE,
    VP8, VP8L, VP8X
};
use crate::yuv::yuv420_to_rgba;

const VP8X_SIZE: usize = 10;
const ANIM_SIZE: usize = 6;

const VP8X_ANIMATION: u8 = 1 << 1;
const VP8X_ALPHA: u8 = 1 << 4;

/// The flavour of a webp file, decided by its first chunk
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum WebpFormat {
    /// A single `VP8 ` chunk
    #[default]
    Lossy,
    /// A single `VP8L` chunk
    Lossless,
    /// A `VP8X` chunk followed by alpha, animation or metadata chunks
    Extended
}

/// Information gathered while decoding headers
#[derive(Debug, Copy, Clone, Default)]
pub struct WebpInfo {
    /// Canvas width
    pub width:            usize,
    /// Canvas height
    pub height:           usize,
    pub format:           WebpFormat,
    /// Some pixel may be transparent
    pub has_alpha:        bool,
    pub is_animated:      bool,
    /// Times to play the animation, 0 means forever
    pub loop_count:       u16,
    /// RGBA background color hint from the `ANIM` chunk
    pub background_color: [u8; 4]
}

/// Where the chunks of one frame live in the file
#[derive(Clone, Debug)]
enum FrameLayout {
    /// Image chunks of a still image, an optional `ALPH` and the bitstream
    Still(Range<usize>),
    /// Payload of an `ANMF` chunk, `present` bytes of the `declared` exist
    Animated {
        start:    usize,
        present:  usize,
        declared: usize
    }
}

/// A WebP decoder
///
/// Handles lossy and lossless images, lossy images with an alpha
/// channel and animations.
///
/// # Usage
/// Decoding a still image, or the first frame of an animation
///
/// ```no_run
/// use pictor_core::bytestream::ZCursor;
/// use pictor_webp::WebpDecoder;
///
/// let mut decoder = WebpDecoder::new(ZCursor::new(&[]));
/// let pixels = decoder.decode().unwrap();
/// ```
///
/// Walking the frames of an animation, composited on a canvas
///
/// ```no_run
/// use pictor_core::bytestream::ZCursor;
/// use pictor_webp::{WebpCanvas, WebpDecoder};
///
/// let mut decoder = WebpDecoder::new(ZCursor::new(&[]));
/// decoder.decode_headers().unwrap();
/// let (w, h) = decoder.dimensions().unwrap();
/// let mut canvas = WebpCanvas::new(w, h);
///
/// while let Some(frame) = decoder.next_frame().unwrap() {
///     let rgba = canvas.render(&frame).unwrap();
///     println!("{} ms, {} bytes", frame.control.duration_ms, rgba.len());
/// }
/// ```
pub struct WebpDecoder<T>
where
    T: ZByteReaderTrait
{
    stream:          ZReader<T>,
    options:         DecoderOptions,
    info:            WebpInfo,
    // the whole file, RIFF header included
    data:            Vec<u8>,
    // length the RIFF header claims
    file_size:       usize,
    frames:          Vec<FrameLayout>,
    decoded_headers: bool,
    frames_decoded:  usize
}

impl<T: ZByteReaderTrait> WebpDecoder<T> {
    /// Create a new decoder reading from `data`
    pub fn new(data: T) -> WebpDecoder<T> {
        WebpDecoder::new_with_options(data, DecoderOptions::default())
    }
    /// Create a new decoder with the specified options
    pub fn new_with_options(data: T, options: DecoderOptions) -> WebpDecoder<T> {
        WebpDecoder {
            stream: ZReader::new(data),
            options,
            info: WebpInfo::default(),
            data: Vec::new(),
            file_size: 0,
            frames: Vec::new(),
            decoded_headers: false,
            frames_decoded: 0
        }
    }

    /// Validate the RIFF header and the header of the first chunk
    ///
    /// For animations the frame chunks are located but not decoded. A file
    /// cut short after its headers still succeeds here, the missing data
    /// is reported when decoding pixels.
    pub fn decode_headers(&mut self) -> Result<(), WebpDecodeErrors> {
        if self.decoded_headers {
            return Ok(());
        }
        let data = self.stream.remaining_bytes()?.to_vec();
        let riff = read_riff_header(&data)?;

        if riff.file_size < data.len() {
            warn!(
                "{} bytes of trailing data after the RIFF chunk",
                data.len() - riff.file_size
            );
        }
        let end = riff.file_size.min(data.len());
        let body = &data[RIFF_HEADER_SIZE..end];

        let first = ChunkIter::new(body)
            .next()
            .ok_or(WebpDecodeErrors::GenericStatic("No chunks after the RIFF header"))?;

        let mut info = WebpInfo::default();
        let frames = match first.fourcc {
            VP8 => {
                let header = read_frame_header(first.data)?;
                info.width = header.width;
                info.height = header.height;
                info.format = WebpFormat::Lossy;

                alloc::vec![FrameLayout::Still(RIFF_HEADER_SIZE..end)]
            }
            VP8L => {
                let header = read_vp8l_header(first.data)?;
                info.width = header.width;
                info.height = header.height;
                info.has_alpha = header.alpha_hint;
                info.format = WebpFormat::Lossless;

                alloc::vec![FrameLayout::Still(RIFF_HEADER_SIZE..end)]
            }
            VP8X => {
                let rest = (RIFF_HEADER_SIZE + chunk_size(first.declared)).min(end);
                parse_extended(&first, &data[rest..end], rest, &mut info)?
            }
            _ => {
                return Err(WebpDecodeErrors::GenericStatic(
                    "First chunk is not VP8, VP8L or VP8X"
                ))
            }
        };
        if info.width > self.options.get_max_width() {
            return Err(WebpDecodeErrors::TooLargeDimensions(
                "width",
                self.options.get_max_width(),
                info.width
            ));
        }
        if info.height > self.options.get_max_height() {
            return Err(WebpDecodeErrors::TooLargeDimensions(
                "height",
                self.options.get_max_height(),
                info.height
            ));
        }
        trace!("Format: {:?}", info.format);
        trace!("Width: {}, Height: {}", info.width, info.height);
        trace!("Alpha: {}, Frames: {}", info.has_alpha, frames.len());

        self.info = info;
        self.frames = frames;
        self.file_size = riff.file_size;
        self.data = data;
        self.decoded_headers = true;

        Ok(())
    }

    /// Image dimensions, or `None` if headers were not decoded
    pub const fn dimensions(&self) -> Option<(usize, usize)> {
        if !self.decoded_headers {
            return None;
        }
        Some((self.info.width, self.info.height))
    }
    /// Header information, or `None` if headers were not decoded
    pub const fn info(&self) -> Option<&WebpInfo> {
        if !self.decoded_headers {
            return None;
        }
        Some(&self.info)
    }
    /// Colorspace of the pixels returned by [`decode`](Self::decode)
    pub const fn colorspace(&self) -> Option<ColorSpace> {
        if !self.decoded_headers {
            return None;
        }
        if self.info.has_alpha {
            Some(ColorSpace::RGBA)
        } else {
            Some(ColorSpace::RGB)
        }
    }
    pub const fn is_animated(&self) -> bool {
        self.info.is_animated
    }
    /// Number of frames [`next_frame`](Self::next_frame) produces
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }
    /// Number of times the animation plays, 0 being forever
    ///
    /// `None` for still images
    pub const fn loop_count(&self) -> Option<u16> {
        if self.info.is_animated {
            Some(self.info.loop_count)
        } else {
            None
        }
    }

    /// Decode the image
    ///
    /// Animations produce their first frame composited on the canvas.
    /// Pixels are laid out as returned by [`colorspace`](Self::colorspace).
    pub fn decode(&mut self) -> Result<Vec<u8>, WebpDecodeErrors> {
        self.decode_headers()?;

        let frame = self.decode_frame(0)?;

        let rgba = if self.info.is_animated {
            WebpCanvas::new(self.info.width, self.info.height).render(&frame)?
        } else {
            frame.pixels
        };
        if self.info.has_alpha {
            return Ok(rgba);
        }
        let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
        rgba.chunks_exact(4)
            .for_each(|px| rgb.extend_from_slice(&px[..3]));

        Ok(rgb)
    }

    /// Decode the next frame, returning `None` after the last one
    ///
    /// Still images produce one frame covering the whole canvas. Frames
    /// are RGBA and not composited, see [`WebpCanvas`].
    pub fn next_frame(&mut self) -> Result<Option<WebpFrame>, WebpDecodeErrors> {
        self.decode_headers()?;

        if self.frames_decoded >= self.frames.len() {
            return Ok(None);
        }
        let frame = self.decode_frame(self.frames_decoded)?;
        self.frames_decoded += 1;

        Ok(Some(frame))
    }

    /// Decode the frame at `index` in RGBA without compositing it
    pub fn decode_frame(&mut self, index: usize) -> Result<WebpFrame, WebpDecodeErrors> {
        self.decode_headers()?;

        let layout = self
            .frames
            .get(index)
            .ok_or(WebpDecodeErrors::NoMoreFrames)?;

        if self.file_size > self.data.len() {
            error!(
                "File holds {} bytes but the RIFF header claims {}",
                self.data.len(),
                self.file_size
            );
            return Err(WebpDecodeErrors::TruncatedChunk(
                *b"RIFF",
                self.file_size,
                self.data.len()
            ));
        }
        let (width, height) = (self.info.width, self.info.height);

        match layout {
            FrameLayout::Still(range) => {
                let image = decode_image_chunks(ChunkIter::new(&self.data[range.clone()]))?;

                if (image.width, image.height) != (width, height) {
                    return Err(WebpDecodeErrors::GenericStatic(
                        "Bitstream dimensions differ from the canvas"
                    ));
                }
                let control = FrameControl {
                    width,
                    height,
                    ..Default::default()
                };
                Ok(WebpFrame {
                    control,
                    pixels: image.pixels
                })
            }
            FrameLayout::Animated {
                start,
                present,
                declared
            } => {
                if present < declared {
                    return Err(WebpDecodeErrors::TruncatedChunk(ANMF, *declared, *present));
                }
                let payload = &self.data[*start..*start + *present];
                let control = FrameControl::from_anmf(payload)?;

                if control.x_offset + control.width > width
                    || control.y_offset + control.height > height
                {
                    return Err(WebpDecodeErrors::GenericStatic(
                        "Animation frame lies outside the canvas"
                    ));
                }
                let image = decode_image_chunks(ChunkIter::new(&payload[ANMF_HEADER_SIZE..]))?;

                if (image.width, image.height) != (control.width, control.height) {
                    return Err(WebpDecodeErrors::GenericStatic(
                        "Bitstream dimensions differ from the ANMF frame size"
                    ));
                }
                trace!(
                    "Frame {} at ({},{}) size {}x{}",
                    index,
                    control.x_offset,
                    control.y_offset,
                    control.width,
                    control.height
                );
                Ok(WebpFrame {
                    control,
                    pixels: image.pixels
                })
            }
        }
    }
}

/// Parse a `VP8X` chunk and locate the frames following it
///
/// `rest` holds the chunks after `VP8X`, starting at `offset` in the file.
fn parse_extended(
    vp8x: &Chunk, rest: &[u8], offset: usize, info: &mut WebpInfo
) -> Result<Vec<FrameLayout>, WebpDecodeErrors> {
    if vp8x.data.len() < VP8X_SIZE {
        return Err(WebpDecodeErrors::TruncatedChunk(
            VP8X,
            VP8X_SIZE,
            vp8x.data.len()
        ));
    }
    let flags = vp8x.data[0];

    info.format = WebpFormat::Extended;
    info.width = get_u24(&vp8x.data[4..]) as usize + 1;
    info.height = get_u24(&vp8x.data[7..]) as usize + 1;
    info.has_alpha = flags & VP8X_ALPHA != 0;
    info.is_animated = flags & VP8X_ANIMATION != 0;

    if !info.is_animated {
        if ChunkIter::new(rest).any(|chunk| chunk.fourcc == ALPH) {
            info.has_alpha = true;
        }
        return Ok(alloc::vec![FrameLayout::Still(offset..offset + rest.len())]);
    }
    let mut frames = Vec::new();

    for chunk in ChunkIter::new(rest) {
        match chunk.fourcc {
            ANIM if chunk.data.len() >= ANIM_SIZE => {
                let [b, g, r, a] = [chunk.data[0], chunk.data[1], chunk.data[2], chunk.data[3]];
                info.background_color = [r, g, b, a];
                info.loop_count = u16::from_le_bytes([chunk.data[4], chunk.data[5]]);
            }
            ANMF => frames.push(FrameLayout::Animated {
                start:    offset + chunk.offset,
                present:  chunk.data.len(),
                declared: chunk.declared
            }),
            _ => trace!("Skipping chunk {:?}", chunk.fourcc)
        }
    }
    if frames.is_empty() {
        return Err(WebpDecodeErrors::GenericStatic("Animated webp without frames"));
    }
    Ok(frames)
}

struct DecodedImage {
    width:  usize,
    height: usize,
    pixels: Vec<u8>
}

/// Decode the first `VP8 ` or `VP8L` bitstream among `chunks` to RGBA
///
/// An `ALPH` chunk seen before a `VP8 ` bitstream supplies its alpha.
fn decode_image_chunks<'a>(
    chunks: impl Iterator<Item = Chunk<'a>>
) -> Result<DecodedImage, WebpDecodeErrors> {
    let mut alpha = None;

    for chunk in chunks {
        match chunk.fourcc {
            ALPH => {
                if alpha.is_none() {
                    alpha = Some(chunk.payload()?);
                }
            }
            VP8 => {
                let decoder = Vp8Decoder::new(chunk.payload()?)?;
                let (width, height) = decoder.dimensions();
                let mut pixels = yuv420_to_rgba(&decoder.decode()?);

                if let Some(alpha) = alpha {
                    let plane = decode_alpha(alpha, width, height)?;

                    for (pixel, a) in pixels.chunks_exact_mut(4).zip(plane) {
                        pixel[3] = a;
                    }
                }
                return Ok(DecodedImage {
                    width,
                    height,
                    pixels
                });
            }
            VP8L => {
                if alpha.is_some() {
                    warn!("Ignoring ALPH chunk of a lossless image");
                }
                let decoder = Vp8lDecoder::new(chunk.payload()?)?;
                let header = decoder.header();

                return Ok(DecodedImage {
                    width:  header.width,
                    height: header.height,
                    pixels: decoder.decode_rgba()?
                });
            }
            ANIM | ANMF | VP8X => {
                return Err(WebpDecodeErrors::GenericStatic(
                    "Unexpected chunk in image data"
                ))
            }
            _ => warn!("Skipping unknown chunk {:?}", chunk.fourcc)
        }
    }
    Err(WebpDecodeErrors::GenericStatic("No VP8 or VP8L bitstream found"))
}

/// Return true if `bytes` start with a RIFF header of a webp file
pub fn probe_webp(bytes: &[u8]) -> bool {
    bytes.len() >= RIFF_HEADER_SIZE && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP"
}
