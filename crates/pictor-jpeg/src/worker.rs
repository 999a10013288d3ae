/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use alloc::format;
use alloc::vec::Vec;
use core::mem;

use pictor_core::bytestream::ZByteReaderTrait;
use pictor_core::colorspace::ColorSpace;

use crate::color_convert::{interleave_rgb, ycbcr_to_grayscale, ycbcr_to_rgb};
use crate::components::SampleRatios;
use crate::errors::DecodeErrors;
use crate::upsampler::upsample_plane;
use crate::JpegDecoder;

impl<T: ZByteReaderTrait> JpegDecoder<T> {
    /// Upsample the decoded component planes, convert them to the output
    /// colorspace and write them to `pixels`
    pub(crate) fn post_process(&mut self, pixels: &mut [u8]) -> Result<(), DecodeErrors> {
        let width = usize::from(self.info.width);
        let height = usize::from(self.info.height);
        let full_width = self.mcu_x * self.h_max * 8;

        let mut planes: [Vec<i16>; 3] = Default::default();

        for (component, plane) in self.components.iter_mut().zip(planes.iter_mut()) {
            let mut samples = mem::take(&mut component.plane);

            if component.sample_ratio != SampleRatios::None {
                let valid_width = (width * component.horizontal_sample).div_ceil(self.h_max);
                let valid_height = (height * component.vertical_sample).div_ceil(self.v_max);

                pad_plane(
                    &mut samples,
                    component.width_stride,
                    component.plane_height,
                    valid_width,
                    valid_height
                );
            }
            *plane = upsample_plane(
                samples,
                component.width_stride,
                component.plane_height,
                component.sample_ratio
            );
        }
        let components = self.components.len();
        let out_components = if self.input_colorspace == ColorSpace::Luma {
            1
        } else {
            3
        };
        let row_bytes = width * out_components;

        if planes[..components]
            .iter()
            .any(|plane| plane.len() < full_width * (height.max(1) - 1) + width)
        {
            return Err(DecodeErrors::FormatStatic(
                "Component plane smaller than the image"
            ));
        }

        for (y, out) in pixels
            .chunks_exact_mut(row_bytes)
            .take(height)
            .enumerate()
        {
            let start = y * full_width;
            let end = start + width;

            match (self.input_colorspace, components) {
                (ColorSpace::Luma, _) | (_, 1) => {
                    ycbcr_to_grayscale(&planes[0][start..end], out);
                }
                (ColorSpace::RGB, 3) => interleave_rgb(
                    &planes[0][start..end],
                    &planes[1][start..end],
                    &planes[2][start..end],
                    out
                ),
                (_, 3) => ycbcr_to_rgb(
                    &planes[0][start..end],
                    &planes[1][start..end],
                    &planes[2][start..end],
                    out
                ),
                _ => {
                    return Err(DecodeErrors::Format(format!(
                        "Cannot convert {components} components to {:?}",
                        self.input_colorspace
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Replicate the last valid column and row of a subsampled plane into
/// its padding so the upsampling filter does not pull in blocks that
/// were never coded
fn pad_plane(
    plane: &mut [i16], stride: usize, rows: usize, valid_width: usize, valid_height: usize
) {
    if valid_width == 0 || valid_height == 0 {
        return;
    }
    let valid_width = valid_width.min(stride);
    let valid_height = valid_height.min(rows);

    for row in plane.chunks_exact_mut(stride).take(valid_height) {
        let edge = row[valid_width - 1];
        row[valid_width..].fill(edge);
    }
    let (top, bottom) = plane.split_at_mut(valid_height * stride);
    let last_row = &top[(valid_height - 1) * stride..];

    for row in bottom.chunks_exact_mut(stride) {
        row.copy_from_slice(last_row);
    }
}
