/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The `ALPH` chunk, alpha of lossy images
//!
//! One header byte followed by the plane, raw or as a headerless VP8L
//! stream carrying alpha in its green channel. Samples may be coded as
//! differences to a prediction from their neighbours.
use alloc::vec;
use alloc::vec::Vec;

use pictor_core::log::trace;

use crate::errors::{WebpDecodeErrors, WebpEncodeErrors};
use crate::lossless::decoder::decode_image_data;
use crate::lossless::encoder::Vp8lEncoder;

const COMPRESSION_NONE: u8 = 0;
const COMPRESSION_LOSSLESS: u8 = 1;

/// Prediction applied to alpha samples before compression
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AlphaFilter {
    None,
    Horizontal,
    Vertical,
    Gradient
}

impl AlphaFilter {
    const ALL: [AlphaFilter; 4] = [
        AlphaFilter::None,
        AlphaFilter::Horizontal,
        AlphaFilter::Vertical,
        AlphaFilter::Gradient
    ];

    const fn from_bits(bits: u8) -> AlphaFilter {
        match bits & 3 {
            0 => AlphaFilter::None,
            1 => AlphaFilter::Horizontal,
            2 => AlphaFilter::Vertical,
            _ => AlphaFilter::Gradient
        }
    }

    const fn to_bits(self) -> u8 {
        match self {
            AlphaFilter::None => 0,
            AlphaFilter::Horizontal => 1,
            AlphaFilter::Vertical => 2,
            AlphaFilter::Gradient => 3
        }
    }
}

#[inline]
fn gradient(left: u8, top: u8, top_left: u8) -> u8 {
    (i16::from(left) + i16::from(top) - i16::from(top_left)).clamp(0, 255) as u8
}

/// Prediction of sample `x` of a row, `prev` is the row above when there is one
#[inline]
fn prediction(filter: AlphaFilter, row: &[u8], prev: Option<&[u8]>, x: usize) -> u8 {
    match (filter, prev) {
        (AlphaFilter::None, _) => 0,
        // first rows only predict from the left
        (_, None) => {
            if x == 0 {
                0
            } else {
                row[x - 1]
            }
        }
        (_, Some(above)) if x == 0 => above[0],
        (AlphaFilter::Horizontal, Some(_)) => row[x - 1],
        (AlphaFilter::Vertical, Some(above)) => above[x],
        (AlphaFilter::Gradient, Some(above)) => gradient(row[x - 1], above[x], above[x - 1])
    }
}

/// Undo `filter` in place on a `width` pixels wide plane
pub fn unfilter(filter: AlphaFilter, plane: &mut [u8], width: usize) {
    if filter == AlphaFilter::None {
        return;
    }
    for y in 0..plane.len() / width {
        let (done, rest) = plane.split_at_mut(y * width);
        let prev = y.checked_sub(1).map(|p| &done[p * width..]);
        let row = &mut rest[..width];

        for x in 0..width {
            let predicted = prediction(filter, row, prev, x);
            row[x] = row[x].wrapping_add(predicted);
        }
    }
}

/// Apply `filter` to a `width` pixels wide plane
pub fn filter(filter: AlphaFilter, plane: &[u8], width: usize) -> Vec<u8> {
    let mut out = vec![0; plane.len()];

    for (y, (row, out_row)) in plane.chunks_exact(width).zip(out.chunks_exact_mut(width)).enumerate() {
        let prev = y.checked_sub(1).map(|p| &plane[p * width..(p + 1) * width]);

        for x in 0..width {
            out_row[x] = row[x].wrapping_sub(prediction(filter, row, prev, x));
        }
    }
    out
}

/// Decode the contents of an `ALPH` chunk into one byte per pixel
pub fn decode_alpha(data: &[u8], width: usize, height: usize) -> Result<Vec<u8>, WebpDecodeErrors> {
    let (&header, payload) = data
        .split_first()
        .ok_or(WebpDecodeErrors::EntropyError("ALPH chunk is empty"))?;

    let compression = header & 3;
    let filter = AlphaFilter::from_bits(header >> 2);
    let preprocessing = (header >> 4) & 3;

    if preprocessing > 1 || header >> 6 != 0 {
        return Err(WebpDecodeErrors::FilterError("Invalid ALPH header"));
    }
    trace!("ALPH compression {}, filter {:?}", compression, filter);

    let mut plane = match compression {
        COMPRESSION_NONE => {
            let raw = payload
                .get(..width * height)
                .ok_or(WebpDecodeErrors::EntropyError("Raw alpha plane is truncated"))?;
            raw.to_vec()
        }
        COMPRESSION_LOSSLESS => decode_image_data(payload, width, height)?
            .iter()
            .map(|p| (p >> 8) as u8)
            .collect(),
        _ => return Err(WebpDecodeErrors::Unsupported("Unknown alpha compression method"))
    };
    unfilter(filter, &mut plane, width);

    Ok(plane)
}

/// Compress an alpha plane into the contents of an `ALPH` chunk
///
/// From effort 5 upwards every filter is tried and the smallest result kept.
pub fn encode_alpha(
    alpha: &[u8], width: usize, height: usize, effort: u8
) -> Result<Vec<u8>, WebpEncodeErrors> {
    if alpha.len() != width * height {
        return Err(WebpEncodeErrors::WrongInputSize(width * height, alpha.len()));
    }
    let filters: &[AlphaFilter] = if effort >= 5 {
        &AlphaFilter::ALL
    } else {
        &AlphaFilter::ALL[..1]
    };
    let mut best: Option<Vec<u8>> = None;

    for &candidate in filters {
        let filtered = filter(candidate, alpha, width);
        let pixels: Vec<u32> = filtered.iter().map(|a| u32::from(*a) << 8).collect();

        let mut encoder = Vp8lEncoder::new(&pixels, width, height);
        encoder.set_effort(effort);

        let mut chunk = vec![COMPRESSION_LOSSLESS | (candidate.to_bits() << 2)];
        chunk.extend_from_slice(&encoder.encode_image_data()?);

        if best.as_ref().map_or(true, |b| chunk.len() < b.len()) {
            best = Some(chunk);
        }
    }
    best.ok_or(WebpEncodeErrors::Generic("No alpha filter was tried"))
}
