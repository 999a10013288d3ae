/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Animated png frame model and canvas composition
use alloc::vec;
use alloc::vec::Vec;

use pictor_core::color::Color;

use crate::enums::{BlendOp, DisposeOp};
use crate::error::PngDecodeErrors;

/// Contents of the `acTL` chunk
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct AnimationControl {
    /// Number of frames in the animation
    pub num_frames: u32,
    /// Times to play the animation, 0 means forever
    pub num_plays:  u32
}

/// Contents of an `fcTL` chunk
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameControl {
    pub sequence_number: u32,
    pub width:           usize,
    pub height:          usize,
    pub x_offset:        usize,
    pub y_offset:        usize,
    pub delay_num:       u16,
    pub delay_den:       u16,
    pub dispose_op:      DisposeOp,
    pub blend_op:        BlendOp
}

impl FrameControl {
    /// Frame delay in milliseconds
    ///
    /// A zero denominator is read as hundredths of a second.
    pub fn duration_ms(&self) -> u32 {
        let den = if self.delay_den == 0 {
            100
        } else {
            u32::from(self.delay_den)
        };
        u32::from(self.delay_num) * 1000 / den
    }
}

/// A single decoded frame before composition
///
/// `pixels` holds `control.width * control.height` RGBA samples
pub struct PngFrame {
    pub control: FrameControl,
    pub pixels:  Vec<u8>
}

/// An RGBA canvas animation frames are rendered on
///
/// Frames must be rendered in order, each call returns a snapshot of the
/// whole canvas after the frame was blended in.
pub struct ApngCanvas {
    width:           usize,
    height:          usize,
    canvas:          Vec<u8>,
    // disposal of the last rendered frame, applied before the next one
    pending_dispose: Option<(FrameControl, Option<Vec<u8>>)>,
    frames_rendered: usize
}

impl ApngCanvas {
    /// Create a fully transparent canvas
    pub fn new(width: usize, height: usize) -> ApngCanvas {
        ApngCanvas {
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
    pub fn render(&mut self, frame: &PngFrame) -> Result<Vec<u8>, PngDecodeErrors> {
        let control = frame.control;

        if control.x_offset + control.width > self.width
            || control.y_offset + control.height > self.height
        {
            return Err(PngDecodeErrors::GenericStatic(
                "Frame region lies outside the canvas"
            ));
        }
        if frame.pixels.len() != control.width * control.height * 4 {
            return Err(PngDecodeErrors::TooSmallOutput(
                control.width * control.height * 4,
                frame.pixels.len()
            ));
        }
        if let Some((previous, saved)) = self.pending_dispose.take() {
            self.dispose(&previous, saved);
        }
        let mut dispose = control.dispose_op;

        if self.frames_rendered == 0 && dispose == DisposeOp::Previous {
            // nothing to go back to for the first frame
            dispose = DisposeOp::Background;
        }
        let saved = (dispose == DisposeOp::Previous).then(|| self.canvas.clone());

        let stride = self.width * 4;
        let region_stride = control.width * 4;

        for (y, src_row) in frame.pixels.chunks_exact(region_stride).enumerate() {
            let start = (control.y_offset + y) * stride + control.x_offset * 4;
            let dst_row = &mut self.canvas[start..start + region_stride];

            match control.blend_op {
                BlendOp::Source => dst_row.copy_from_slice(src_row),
                BlendOp::Over => {
                    for (dst, src) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                        let s = Color::new(src[0], src[1], src[2], src[3]);
                        let d = Color::new(dst[0], dst[1], dst[2], dst[3]);
                        dst.copy_from_slice(&s.blend_over(d).to_array());
                    }
                }
            }
        }
        let output = self.canvas.clone();

        let mut pending = control;
        pending.dispose_op = dispose;
        self.pending_dispose = Some((pending, saved));
        self.frames_rendered += 1;

        Ok(output)
    }

    fn dispose(&mut self, control: &FrameControl, saved: Option<Vec<u8>>) {
        match control.dispose_op {
            DisposeOp::None => (),
            DisposeOp::Background => {
                let stride = self.width * 4;

                for y in control.y_offset..control.y_offset + control.height {
                    let start = y * stride + control.x_offset * 4;
                    self.canvas[start..start + control.width * 4].fill(0);
                }
            }
            DisposeOp::Previous => {
                if let Some(saved) = saved {
                    self.canvas = saved;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use crate::apng::{ApngCanvas, FrameControl, PngFrame};
    use crate::enums::{BlendOp, DisposeOp};

    fn frame(
        x: usize, y: usize, w: usize, h: usize, rgba: [u8; 4], dispose: DisposeOp, blend: BlendOp
    ) -> PngFrame {
        PngFrame {
            control: FrameControl {
                width: w,
                height: h,
                x_offset: x,
                y_offset: y,
                dispose_op: dispose,
                blend_op: blend,
                ..Default::default()
            },
            pixels:  rgba.repeat(w * h)
        }
    }

    #[test]
    fn durations() {
        let mut control = FrameControl {
            delay_num: 1,
            delay_den: 0,
            ..Default::default()
        };
        assert_eq!(control.duration_ms(), 10);
        control.delay_den = 4;
        assert_eq!(control.duration_ms(), 250);
    }

    #[test]
    fn dispose_background_clears_region() {
        let mut canvas = ApngCanvas::new(2, 1);
        let red = [255, 0, 0, 255];
        let first = canvas
            .render(&frame(0, 0, 2, 1, red, DisposeOp::Background, BlendOp::Source))
            .unwrap();
        assert_eq!(first, red.repeat(2));

        let blue = [0, 0, 255, 255];
        let second = canvas
            .render(&frame(1, 0, 1, 1, blue, DisposeOp::None, BlendOp::Source))
            .unwrap();
        assert_eq!(second, vec![0, 0, 0, 0, 0, 0, 255, 255]);
    }

    #[test]
    fn dispose_previous_restores() {
        let mut canvas = ApngCanvas::new(1, 1);
        let red = [255, 0, 0, 255];
        let green = [0, 255, 0, 255];
        canvas
            .render(&frame(0, 0, 1, 1, red, DisposeOp::None, BlendOp::Source))
            .unwrap();
        let second = canvas
            .render(&frame(0, 0, 1, 1, green, DisposeOp::Previous, BlendOp::Source))
            .unwrap();
        assert_eq!(second, green);

        let clear = [0, 0, 0, 0];
        let third = canvas
            .render(&frame(0, 0, 1, 1, clear, DisposeOp::None, BlendOp::Over))
            .unwrap();
        assert_eq!(third, red);
    }

    #[test]
    fn region_outside_canvas_fails() {
        let mut canvas = ApngCanvas::new(2, 2);
        let result = canvas.render(&frame(1, 1, 2, 2, [0; 4], DisposeOp::None, BlendOp::Source));
        assert!(result.is_err());
    }
}
