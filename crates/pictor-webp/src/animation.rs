/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Animation frame model and canvas composition
use alloc::vec;
use alloc::vec::Vec;

use pictor_core::color::Color;

use crate::errors::WebpDecodeErrors;

/// How a frame is combined with the canvas
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum BlendMethod {
    /// Alpha blend the frame over the canvas
    #[default]
    AlphaBlend,
    /// Replace the canvas region with the frame
    NoBlend
}

/// What happens to the frame region once the frame was shown
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum DisposeMethod {
    #[default]
    None,
    /// Clear the region to transparent black
    Background
}

/// Placement and timing of a frame, the contents of an `ANMF` header
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameControl {
    pub x_offset:    usize,
    pub y_offset:    usize,
    pub width:       usize,
    pub height:      usize,
    pub duration_ms: u32,
    pub blend:       BlendMethod,
    pub dispose:     DisposeMethod
}

/// Size of the fixed part of an `ANMF` payload
pub(crate) const ANMF_HEADER_SIZE: usize = 16;

impl FrameControl {
    /// Parse the first 16 bytes of an `ANMF` payload
    pub(crate) fn from_anmf(data: &[u8]) -> Result<FrameControl, WebpDecodeErrors> {
        use crate::riff::get_u24;

        if data.len() < ANMF_HEADER_SIZE {
            return Err(WebpDecodeErrors::TruncatedChunk(
                *b"ANMF",
                ANMF_HEADER_SIZE,
                data.len()
            ));
        }
        let flags = data[15];

        Ok(FrameControl {
            x_offset:    get_u24(&data[0..]) as usize * 2,
            y_offset:    get_u24(&data[3..]) as usize * 2,
            width:       get_u24(&data[6..]) as usize + 1,
            height:      get_u24(&data[9..]) as usize + 1,
            duration_ms: get_u24(&data[12..]),
            blend:       if flags & 2 != 0 {
                BlendMethod::NoBlend
            } else {
                BlendMethod::AlphaBlend
            },
            dispose:     if flags & 1 != 0 {
                DisposeMethod::Background
            } else {
                DisposeMethod::None
            }
        })
    }

    /// Serialize into the fixed part of an `ANMF` payload
    ///
    /// Offsets are stored halved, odd offsets are rounded down.
    pub(crate) fn to_anmf(self) -> Vec<u8> {
        use crate::riff::put_u24;

        let mut out = Vec::with_capacity(ANMF_HEADER_SIZE);
        put_u24(&mut out, (self.x_offset / 2) as u32);
        put_u24(&mut out, (self.y_offset / 2) as u32);
        put_u24(&mut out, (self.width - 1) as u32);
        put_u24(&mut out, (self.height - 1) as u32);
        put_u24(&mut out, self.duration_ms.min(0xff_ffff));

        let mut flags = 0;
        if self.blend == BlendMethod::NoBlend {
            flags |= 2;
        }
        if self.dispose == DisposeMethod::Background {
            flags |= 1;
        }
        out.push(flags);
        out
    }
}

/// A single decoded frame before composition
///
/// `pixels` holds `control.width * control.height` RGBA samples
#[derive(Clone)]
pub struct WebpFrame {
    pub control: FrameControl,
    pub pixels:  Vec<u8>
}

/// An RGBA canvas animation frames are rendered on
///
/// The canvas starts fully transparent, the background color of the
/// `ANIM` chunk is only a hint and is not used.
pub struct WebpCanvas {
    width:           usize,
    height:          usize,
    canvas:          Vec<u8>,
    pending_dispose: Option<FrameControl>,
    frames_rendered: usize
}

impl WebpCanvas {
    pub fn new(width: usize, height: usize) -> WebpCanvas {
        WebpCanvas {
            width,
            height,
            canvas: vec![0; width * height * 4],
            pending_dispose: None,
            frames_rendered: 0
        }
    }
    /// Number of frames rendered so far
    pub const fn frames_rendered(&self) -> usize {
        self.frames_rendered
    }

    /// Blend `frame` into the canvas and return the resulting image
    pub fn render(&mut self, frame: &WebpFrame) -> Result<Vec<u8>, WebpDecodeErrors> {
        let control = frame.control;

        if control.x_offset + control.width > self.width
            || control.y_offset + control.height > self.height
        {
            return Err(WebpDecodeErrors::GenericStatic(
                "Frame region lies outside the canvas"
            ));
        }
        if frame.pixels.len() != control.width * control.height * 4 {
            return Err(WebpDecodeErrors::GenericStatic(
                "Frame pixels do not match the frame size"
            ));
        }
        if let Some(previous) = self.pending_dispose.take() {
            if previous.dispose == DisposeMethod::Background {
                self.clear(&previous);
            }
        }
        let stride = self.width * 4;
        let region_stride = control.width * 4;

        for (y, src_row) in frame.pixels.chunks_exact(region_stride).enumerate() {
            let start = (control.y_offset + y) * stride + control.x_offset * 4;
            let dst_row = &mut self.canvas[start..start + region_stride];

            match control.blend {
                BlendMethod::NoBlend => dst_row.copy_from_slice(src_row),
                BlendMethod::AlphaBlend => {
                    for (dst, src) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                        let s = Color::new(src[0], src[1], src[2], src[3]);
                        let d = Color::new(dst[0], dst[1], dst[2], dst[3]);
                        dst.copy_from_slice(&s.blend_over(d).to_array());
                    }
                }
            }
        }
        self.pending_dispose = Some(control);
        self.frames_rendered += 1;

        Ok(self.canvas.clone())
    }

    fn clear(&mut self, control: &FrameControl) {
        let stride = self.width * 4;

        for y in control.y_offset..control.y_offset + control.height {
            let start = y * stride + control.x_offset * 4;
            self.canvas[start..start + control.width * 4].fill(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use crate::animation::{BlendMethod, DisposeMethod, FrameControl, WebpCanvas, WebpFrame};

    fn frame(
        x: usize, y: usize, w: usize, h: usize, rgba: [u8; 4], dispose: DisposeMethod,
        blend: BlendMethod
    ) -> WebpFrame {
        WebpFrame {
            control: FrameControl {
                x_offset: x,
                y_offset: y,
                width: w,
                height: h,
                dispose,
                blend,
                ..Default::default()
            },
            pixels:  rgba.repeat(w * h)
        }
    }

    #[test]
    fn anmf_header_round_trip() {
        let control = FrameControl {
            x_offset:    4,
            y_offset:    10,
            width:       300,
            height:      1,
            duration_ms: 90,
            blend:       BlendMethod::NoBlend,
            dispose:     DisposeMethod::Background
        };
        let bytes = control.to_anmf();
        assert_eq!(bytes.len(), 16);
        assert_eq!(FrameControl::from_anmf(&bytes).unwrap(), control);
        assert!(FrameControl::from_anmf(&bytes[..15]).is_err());
    }

    #[test]
    fn dispose_background_clears_region() {
        let mut canvas = WebpCanvas::new(2, 1);
        let red = [255, 0, 0, 255];
        let first = canvas
            .render(&frame(0, 0, 2, 1, red, DisposeMethod::Background, BlendMethod::NoBlend))
            .unwrap();
        assert_eq!(first, red.repeat(2));

        let blue = [0, 0, 255, 255];
        let second = canvas
            .render(&frame(1, 0, 1, 1, blue, DisposeMethod::None, BlendMethod::AlphaBlend))
            .unwrap();
        assert_eq!(second, vec![0, 0, 0, 0, 0, 0, 255, 255]);
        assert_eq!(canvas.frames_rendered(), 2);
    }

    #[test]
    fn transparent_frames_keep_canvas() {
        let mut canvas = WebpCanvas::new(1, 1);
        let green = [0, 255, 0, 255];
        canvas
            .render(&frame(0, 0, 1, 1, green, DisposeMethod::None, BlendMethod::NoBlend))
            .unwrap();
        let second = canvas
            .render(&frame(0, 0, 1, 1, [0; 4], DisposeMethod::None, BlendMethod::AlphaBlend))
            .unwrap();
        assert_eq!(second, green);

        let third = canvas
            .render(&frame(0, 0, 1, 1, [0; 4], DisposeMethod::None, BlendMethod::NoBlend))
            .unwrap();
        assert_eq!(third, [0; 4]);
    }

    #[test]
    fn region_outside_canvas_fails() {
        let mut canvas = WebpCanvas::new(2, 2);
        let result = canvas.render(&frame(
            1,
            1,
            2,
            2,
            [0; 4],
            DisposeMethod::None,
            BlendMethod::NoBlend
        ));
        assert!(result.is_err());
    }
}
