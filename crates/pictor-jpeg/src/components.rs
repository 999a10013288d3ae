/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! This module exports a single struct to store information about
//! JPEG image components
//!
//! The data is extracted from a SOF header.

use alloc::format;
use alloc::vec::Vec;

use pictor_core::log::trace;

use crate::errors::{DecodeErrors, UnsupportedSchemes};

/// Component Data from start of frame
#[derive(Clone)]
pub(crate) struct Components {
    /// The type of component that has the metadata below, can be Y,Cb or Cr
    pub component_id:              ComponentID,
    /// Identifier used by the scan headers to refer to this component
    pub id:                        u8,
    /// Sub-sampling ratio of this component in the x-plane
    pub vertical_sample:           usize,
    /// Sub-sampling ratio of this component in the y-plane
    pub horizontal_sample:         usize,
    /// DC huffman table position
    pub dc_huff_table:             usize,
    /// AC huffman table position for this element.
    pub ac_huff_table:             usize,
    /// Quantization table number
    pub quantization_table_number: u8,
    /// Specifies quantization table to use with this component
    pub quantization_table:        [i32; 64],
    /// dc prediction for the component
    pub dc_pred:                   i32,
    /// How much this component is scaled up to reach the full image size
    pub sample_ratio:              SampleRatios,
    /// Width of the sample plane, a whole number of MCUs
    pub width_stride:              usize,
    /// Height of the sample plane, a whole number of MCUs
    pub plane_height:              usize,
    /// Samples of this component as written by the IDCT, before upsampling
    pub plane:                     Vec<i16>,
    /// Set once a scan carried data for this component
    pub seen_in_scan:              bool
}

impl Components {
    /// Create a new instance from three bytes from the start of frame
    #[inline]
    pub fn from(a: [u8; 3], pos: u8) -> Result<Components, DecodeErrors> {
        // the component id is the position in the start of frame,
        // the identifier byte itself is arbitrary
        let component_id = match pos {
            0 => ComponentID::Y,
            1 => ComponentID::Cb,
            2 => ComponentID::Cr,
            _ => {
                return Err(DecodeErrors::Format(format!(
                    "Unknown component id found,{pos}, expected value between 0 and 2"
                )))
            }
        };

        let horizontal_sample = a[1] >> 4;
        let vertical_sample = a[1] & 0x0f;

        if horizontal_sample == 0 || vertical_sample == 0 || horizontal_sample > 4 || vertical_sample > 4
        {
            return Err(DecodeErrors::SofError(format!(
                "Invalid sampling factors ({horizontal_sample},{vertical_sample}) for component {component_id:?}"
            )));
        }
        if horizontal_sample > 2 || vertical_sample > 2 {
            return Err(DecodeErrors::Unsupported(UnsupportedSchemes::SamplingFactors(
                horizontal_sample,
                vertical_sample
            )));
        }
        let quantization_table_number = a[2];

        if usize::from(quantization_table_number) >= crate::decoder::MAX_COMPONENTS {
            return Err(DecodeErrors::SofError(format!(
                "Too large quantization number :{quantization_table_number}, expected value between 0 and 3"
            )));
        }

        trace!(
            "Component {component_id:?}, id={}, sampling ({horizontal_sample},{vertical_sample}), qt={quantization_table_number}",
            a[0]
        );

        Ok(Components {
            component_id,
            id: a[0],
            vertical_sample: usize::from(vertical_sample),
            horizontal_sample: usize::from(horizontal_sample),
            quantization_table_number,
            quantization_table: [0; 64],
            // These two will be set with sof marker
            dc_huff_table: 0,
            ac_huff_table: 0,
            dc_pred: 0,
            sample_ratio: SampleRatios::None,
            width_stride: 0,
            plane_height: 0,
            plane: Vec::new(),
            seen_in_scan: false
        })
    }
}

/// Component ID's
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum ComponentID {
    /// Luminance channel
    Y,
    /// Blue chrominance
    Cb,
    /// Red chrominance
    Cr
}

/// Upsampling needed to bring a component to the full image resolution
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum SampleRatios {
    /// Horizontal and vertical scale of two
    HV,
    /// Vertical scale of two
    V,
    /// Horizontal scale of two
    H,
    /// Already at full resolution
    None
}

impl SampleRatios {
    /// Ratio from the largest sampling factors of the frame to
    /// those of one component
    pub fn new(h_max: usize, v_max: usize, horizontal: usize, vertical: usize) -> SampleRatios {
        match (h_max / horizontal, v_max / vertical) {
            (2, 2) => SampleRatios::HV,
            (1, 2) => SampleRatios::V,
            (2, 1) => SampleRatios::H,
            _ => SampleRatios::None
        }
    }
}
