/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! A single image frame and the per decoder frame memo
//!
//! One or more frames make an image, an image with more than one
//! frame is considered animated.
use pictor_core::bitmap::{Bitmap, BitmapFormat};
use pictor_core::log::trace;

use crate::codecs::ImageFormat;
use crate::errors::ImageErrors;

/// A decoded frame, the pixels plus how long they are shown
///
/// Still images have a duration of zero.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    bitmap:      Bitmap,
    duration_ms: u32
}

impl Frame {
    pub fn new(bitmap: Bitmap, duration_ms: u32) -> Frame {
        Frame {
            bitmap,
            duration_ms
        }
    }
    /// A frame without timing
    pub fn still(bitmap: Bitmap) -> Frame {
        Frame::new(bitmap, 0)
    }
    pub const fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }
    pub fn into_bitmap(self) -> Bitmap {
        self.bitmap
    }
    /// Presentation time in milliseconds
    pub const fn duration_ms(&self) -> u32 {
        self.duration_ms
    }
    pub const fn size(&self) -> (usize, usize) {
        self.bitmap.size()
    }
}

/// Build the bitmap of a decoded frame from RGBA samples
///
/// Images without an alpha channel become [`BitmapFormat::Rgbx8888`].
pub(crate) fn rgba_bitmap(
    format: ImageFormat, width: usize, height: usize, rgba: &[u8], has_alpha: bool
) -> Result<Bitmap, ImageErrors> {
    let bitmap_format = if has_alpha {
        BitmapFormat::Rgba8888
    } else {
        BitmapFormat::Rgbx8888
    };
    Bitmap::from_rgba(bitmap_format, width, height, rgba)
        .map_err(|e| ImageErrors::from_bitmap(format, e))
}

/// Memo of decoded frames owned by one decoder
///
/// Frames of a sequential animation depend on every frame before them,
/// so once frame `n` fails every later frame fails with the same error
/// without decoding anything. Independent frames only remember their
/// own result.
pub struct FrameCache {
    entries:       Vec<Option<Result<Frame, ImageErrors>>>,
    sequential:    bool,
    first_failure: Option<usize>
}

impl FrameCache {
    /// Cache for `frame_count` frames that decode on their own
    pub fn new(frame_count: usize) -> FrameCache {
        FrameCache {
            entries:       vec![None; frame_count],
            sequential:    false,
            first_failure: None
        }
    }
    /// Cache for frames composited on top of each other
    pub fn new_sequential(frame_count: usize) -> FrameCache {
        FrameCache {
            sequential: true,
            ..FrameCache::new(frame_count)
        }
    }
    pub fn frame_count(&self) -> usize {
        self.entries.len()
    }
    /// Number of frames decoded so far, successfully or not
    pub fn decoded(&self) -> usize {
        self.entries.iter().filter(|x| x.is_some()).count()
    }

    /// Memoized result for `index`, if there is one
    pub fn get(&self, index: usize) -> Option<Result<Frame, ImageErrors>> {
        if self.sequential {
            if let Some(failed) = self.first_failure {
                if index >= failed {
                    return self.entries.get(failed).cloned().flatten();
                }
            }
        }
        self.entries.get(index).cloned().flatten()
    }

    /// Store the result of decoding `index`
    pub fn insert(&mut self, index: usize, result: Result<Frame, ImageErrors>) {
        if result.is_err() && self.first_failure.map_or(true, |failed| index < failed) {
            self.first_failure = Some(index);
        }
        if let Some(slot) = self.entries.get_mut(index) {
            *slot = Some(result);
        }
    }

    /// Return the memoized frame or decode it with `render`
    ///
    /// For a sequential cache `render` is called for every frame between
    /// the last decoded one and `index`, in order.
    pub fn get_or_render<F>(&mut self, index: usize, mut render: F) -> Result<Frame, ImageErrors>
    where
        F: FnMut(usize) -> Result<Frame, ImageErrors>
    {
        if index >= self.frame_count() {
            return Err(ImageErrors::IndexOutOfRange {
                index,
                frame_count: self.frame_count()
            });
        }
        if let Some(result) = self.get(index) {
            return result;
        }
        let mut position = if self.sequential {
            self.entries
                .iter()
                .take_while(|x| matches!(x, Some(Ok(_))))
                .count()
        } else {
            index
        };
        loop {
            trace!("Decoding frame {}", position);

            let result = render(position);
            self.insert(position, result.clone());

            if result.is_err() || position >= index {
                return result;
            }
            position += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use pictor_core::bitmap::{Bitmap, BitmapFormat};

    use crate::codecs::ImageFormat;
    use crate::errors::{ImageErrors, Stage};
    use crate::frame::{Frame, FrameCache};

    fn frame(duration: u32) -> Frame {
        Frame::new(Bitmap::new(BitmapFormat::Rgba8888, 1, 1).unwrap(), duration)
    }

    fn failure() -> ImageErrors {
        ImageErrors::DecodeFailed {
            format: ImageFormat::Png,
            stage:  Stage::Entropy,
            reason: "broken".to_string()
        }
    }

    #[test]
    fn independent_frames_render_once() {
        let mut cache = FrameCache::new(3);
        let mut calls = vec![];

        for index in [2, 0, 2, 0] {
            let result = cache.get_or_render(index, |i| {
                calls.push(i);
                Ok(frame(i as u32))
            });
            assert_eq!(result.unwrap().duration_ms(), index as u32);
        }
        assert_eq!(calls, [2, 0]);
        assert_eq!(cache.decoded(), 2);
    }

    #[test]
    fn sequential_frames_render_in_order() {
        let mut cache = FrameCache::new_sequential(4);
        let mut calls = vec![];

        cache
            .get_or_render(2, |i| {
                calls.push(i);
                Ok(frame(i as u32))
            })
            .unwrap();
        cache
            .get_or_render(3, |i| {
                calls.push(i);
                Ok(frame(i as u32))
            })
            .unwrap();
        assert_eq!(calls, [0, 1, 2, 3]);
        assert_eq!(cache.get(1).unwrap().unwrap().duration_ms(), 1);
    }

    #[test]
    fn sequential_failure_is_replayed() {
        let mut cache = FrameCache::new_sequential(4);
        let mut calls = 0;

        let first = cache.get_or_render(3, |i| {
            calls += 1;
            if i == 1 {
                Err(failure())
            } else {
                Ok(frame(0))
            }
        });
        assert_eq!(first, Err(failure()));
        assert_eq!(calls, 2);

        let later = cache.get_or_render(2, |_| panic!("must not decode again"));
        assert_eq!(later, Err(failure()));
        // frames before the failure are still there
        assert!(cache.get_or_render(0, |_| panic!()).is_ok());
    }

    #[test]
    fn out_of_range() {
        let mut cache = FrameCache::new(1);
        assert_eq!(
            cache.get_or_render(1, |_| Ok(frame(0))),
            Err(ImageErrors::IndexOutOfRange {
                index:       1,
                frame_count: 1
            })
        );
    }
}
