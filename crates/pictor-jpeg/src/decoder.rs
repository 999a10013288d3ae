/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Main image logic.
#![allow(clippy::doc_markdown)]

use alloc::string::ToString;
use alloc::vec::Vec;
use alloc::{format, vec};

use pictor_core::bytestream::{ZByteReaderTrait, ZReader};
use pictor_core::colorspace::ColorSpace;
use pictor_core::log::{error, info, trace, warn};
use pictor_core::options::DecoderOptions;

use crate::components::{Components, SampleRatios};
use crate::errors::{DecodeErrors, UnsupportedSchemes};
use crate::headers::{
    parse_app14, parse_dqt, parse_dri, parse_huffman, parse_sos, parse_start_of_frame,
    skip_segment
};
use crate::huffman::HuffmanTable;
use crate::marker::Marker;
use crate::misc::SOFMarkers;

/// Maximum components
pub(crate) const MAX_COMPONENTS: usize = 4;

/// A JPEG Decoder Instance.
#[allow(clippy::upper_case_acronyms)]
pub struct JpegDecoder<T: ZByteReaderTrait> {
    /// Struct to hold image information from SOI
    pub(crate) info:              ImageInfo,
    ///  Quantization tables, in natural order
    pub(crate) qt_tables:         [Option<[i32; 64]>; MAX_COMPONENTS],
    /// DC Huffman Tables with a maximum of 4 tables for each  component
    pub(crate) dc_huffman_tables: [Option<HuffmanTable>; MAX_COMPONENTS],
    /// AC Huffman Tables with a maximum of 4 tables for each component
    pub(crate) ac_huffman_tables: [Option<HuffmanTable>; MAX_COMPONENTS],
    /// Image components, holds information like DC prediction and quantization
    /// tables of a component
    pub(crate) components:        Vec<Components>,
    /// maximum horizontal component of all channels in the image
    pub(crate) h_max:             usize,
    // maximum vertical component of all channels in the image
    pub(crate) v_max:             usize,
    /// Number of MCU's in the x plane
    pub(crate) mcu_x:             usize,
    /// Number of MCU's in the y plane
    pub(crate) mcu_y:             usize,
    /// Image input colorspace, should be YCbCr for a sane image, might be
    /// grayscale too
    pub(crate) input_colorspace:  ColorSpace,
    /// Start of spectral scan
    pub(crate) spec_start:        u8,
    /// End of spectral scan
    pub(crate) spec_end:          u8,
    /// Successive approximation bit position high
    pub(crate) succ_high:         u8,
    /// Successive approximation bit position low
    pub(crate) succ_low:          u8,
    /// Number of components in the current scan.
    pub(crate) num_scans:         u8,
    /// Indices into `components` of the current scan's components, in scan order
    pub(crate) z_order:           [usize; MAX_COMPONENTS],
    /// restart markers
    pub(crate) restart_interval:  usize,
    pub(crate) todo:              usize,
    /// Transform flag of an Adobe APP14 segment
    pub(crate) adobe_transform:   Option<u8>,
    // decoder options
    pub(crate) options:           DecoderOptions,
    // byte-stream
    pub(crate) stream:            ZReader<T>,
    pub(crate) seen_sof:          bool,
    // Indicate whether headers have been decoded
    pub(crate) headers_decoded:   bool
}

impl<T> JpegDecoder<T>
where
    T: ZByteReaderTrait
{
    fn default(options: DecoderOptions, buffer: T) -> Self {
        JpegDecoder {
            info: ImageInfo::default(),
            qt_tables: [None, None, None, None],
            dc_huffman_tables: [None, None, None, None],
            ac_huffman_tables: [None, None, None, None],
            components: vec![],
            // Interleaved information
            h_max: 1,
            v_max: 1,
            mcu_x: 0,
            mcu_y: 0,
            // Colorspace
            input_colorspace: ColorSpace::YCbCr,
            spec_start: 0,
            spec_end: 0,
            succ_high: 0,
            succ_low: 0,
            num_scans: 0,
            z_order: [0; MAX_COMPONENTS],
            restart_interval: 0,
            todo: 0,
            adobe_transform: None,
            options,
            stream: ZReader::new(buffer),
            seen_sof: false,
            headers_decoded: false
        }
    }

    /// Create a new Decoder instance
    ///
    /// # Arguments
    /// - `data`: The jpeg bytes, anything implementing `ZByteReaderTrait`
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new(data: T) -> JpegDecoder<T> {
        JpegDecoder::default(DecoderOptions::default(), data)
    }

    /// Create a new decoder with the specified options to be used for decoding
    /// an image
    #[must_use]
    pub fn new_with_options(data: T, options: DecoderOptions) -> JpegDecoder<T> {
        JpegDecoder::default(options, data)
    }

    /// Decode the image into a newly allocated buffer
    ///
    /// Three component images are returned as RGB, one component images as
    /// Luma, see [colorspace](Self::colorspace)
    ///
    /// # Errors
    /// See DecodeErrors for an explanation
    pub fn decode(&mut self) -> Result<Vec<u8>, DecodeErrors> {
        self.decode_headers()?;
        let size = self.output_buffer_size().ok_or(DecodeErrors::FormatStatic(
            "Image dimensions overflow a usize"
        ))?;
        let mut out = vec![0; size];
        self.decode_into(&mut out)?;
        Ok(out)
    }

    /// Decode the image into a pre-allocated buffer
    ///
    /// The buffer must be at least [output_buffer_size](Self::output_buffer_size)
    /// bytes long
    pub fn decode_into(&mut self, out: &mut [u8]) -> Result<(), DecodeErrors> {
        self.decode_headers()?;

        let size = self.output_buffer_size().ok_or(DecodeErrors::FormatStatic(
            "Image dimensions overflow a usize"
        ))?;
        if out.len() < size {
            return Err(DecodeErrors::TooSmallOutput(size, out.len()));
        }
        self.setup_component_params()?;
        self.decode_scans()?;
        self.post_process(&mut out[..size])?;

        trace!("Finished decoding image");
        Ok(())
    }

    /// Returns the image information
    ///
    /// This **must** be called after a subsequent call to `decode` or
    /// `decode_headers` otherwise it will return None
    #[must_use]
    pub fn info(&self) -> Option<ImageInfo> {
        if !self.headers_decoded {
            return None;
        }
        Some(self.info.clone())
    }

    /// Get the width and height of the image, or None if headers
    /// are not decoded
    #[must_use]
    pub const fn dimensions(&self) -> Option<(usize, usize)> {
        if !self.headers_decoded {
            return None;
        }
        Some((self.info.width as usize, self.info.height as usize))
    }

    /// Get the colorspace the image pixels will be decoded into
    #[must_use]
    pub const fn colorspace(&self) -> Option<ColorSpace> {
        if !self.headers_decoded {
            return None;
        }
        match self.input_colorspace {
            ColorSpace::Luma => Some(ColorSpace::Luma),
            _ => Some(ColorSpace::RGB)
        }
    }

    /// Size of the buffer [decode_into](Self::decode_into) needs
    #[must_use]
    pub fn output_buffer_size(&self) -> Option<usize> {
        let (width, height) = self.dimensions()?;
        let colorspace = self.colorspace()?;

        width
            .checked_mul(height)?
            .checked_mul(colorspace.num_components())
    }

    /// Decode Decoder headers
    ///
    /// This routine takes care of parsing supported headers from a Decoder
    /// image
    ///
    /// # Supported Headers
    ///  - APP(14) -> Adobe transform flag
    ///  - SOF(0), SOF(1)
    ///  - DQT -> Quantization tables
    ///  - DHT -> Huffman tables
    ///  - DRI -> Restart intervals
    ///  - SOS -> Start of Scan
    /// # Unsupported Headers
    ///  - SOF(n) -> Decoder images which are not baseline
    ///  - DAC -> Images using Arithmetic tables
    ///
    /// Other application segments and comments are skipped
    ///
    /// # Errors
    /// See DecodeErrors enum for list of possible errors during decoding
    pub fn decode_headers(&mut self) -> Result<(), DecodeErrors> {
        if self.headers_decoded {
            trace!("Headers decoded!");
            return Ok(());
        }
        // First two bytes should be jpeg soi marker
        let magic_bytes = self.stream.get_u16_be_err()?;

        let mut last_byte = 0;
        let mut bytes_before_marker = 0;

        if magic_bytes != 0xffd8 {
            return Err(DecodeErrors::IllegalMagicBytes(magic_bytes));
        }

        loop {
            // read a byte
            let m = self.stream.get_u8_err()?;
            // Last byte should be 0xFF to confirm existence of a marker since markers look
            // like OxFF(some marker data)
            if last_byte == 0xFF {
                let marker = Marker::from_u8(m);

                if let Some(n) = marker {
                    if bytes_before_marker > 3 {
                        if self.options.get_strict_mode() {
                            return Err(DecodeErrors::FormatStatic(
                                "[strict-mode]: Extra bytes between headers"
                            ));
                        }

                        error!(
                            "Extra bytes {} before marker 0xFF{:X}",
                            bytes_before_marker - 3,
                            m
                        );
                    }

                    bytes_before_marker = 0;

                    self.parse_marker_inner(n)?;

                    if n == Marker::SOS {
                        self.headers_decoded = true;
                        return Ok(());
                    }
                    last_byte = 0;
                    continue;
                } else if m != 0xFF && m != 0x00 {
                    bytes_before_marker = 0;

                    warn!("Marker 0xFF{:X} not known", m);

                    skip_segment(self)?;
                    last_byte = 0;
                    continue;
                }
            }
            last_byte = m;
            bytes_before_marker += 1;
        }
    }

    pub(crate) fn parse_marker_inner(&mut self, m: Marker) -> Result<(), DecodeErrors> {
        match m {
            Marker::SOF(v @ (0 | 1)) => {
                let marker = SOFMarkers::from_int(0xffc0 | u16::from(v)).unwrap_or_default();

                info!("Image encoding scheme =`{:?}`", marker);
                // get components
                parse_start_of_frame(marker, self)?;
            }
            // Start of Frame Segments not supported
            Marker::SOF(v) => {
                let feature = UnsupportedSchemes::from_int(0xC0 + v);

                if let Some(feature) = feature {
                    return Err(DecodeErrors::Unsupported(feature));
                }

                return Err(DecodeErrors::Format("Unsupported image format".to_string()));
            }
            // Quantization tables
            Marker::DQT => {
                parse_dqt(self)?;
            }
            // Huffman tables
            Marker::DHT => {
                parse_huffman(self)?;
            }
            // Start of Scan Data
            Marker::SOS => {
                parse_sos(self)?;
            }
            Marker::EOI => return Err(DecodeErrors::FormatStatic("Premature End of image")),

            Marker::DAC | Marker::DNL => {
                return Err(DecodeErrors::Format(format!(
                    "Parsing of the following header `{m:?}` is not supported,\
                                cannot continue"
                )));
            }
            Marker::DRI => {
                info!("DRI marker present");
                parse_dri(self)?;
            }
            Marker::APP(14) => {
                parse_app14(self)?;
            }
            Marker::SOI | Marker::RST(_) => {
                // stand alone markers, no length follows
                warn!("Unexpected marker {m:?} outside of entropy coded data");
            }
            _ => {
                trace!("Skipping marker {:?}", m);
                skip_segment(self)?;
            }
        }
        Ok(())
    }

    /// Compute MCU counts and allocate the sample plane of every component
    pub(crate) fn setup_component_params(&mut self) -> Result<(), DecodeErrors> {
        let width = usize::from(self.info.width);
        let height = usize::from(self.info.height);

        if self.components.len() == 1 {
            // a single component is always coded as 8x8 blocks,
            // whatever its sampling factors say
            let component = &mut self.components[0];
            if component.horizontal_sample != 1 || component.vertical_sample != 1 {
                warn!("Grayscale image with down-sampled component, resetting component details");
            }
            component.horizontal_sample = 1;
            component.vertical_sample = 1;
        }
        self.h_max = self
            .components
            .iter()
            .map(|c| c.horizontal_sample)
            .max()
            .unwrap_or(1);
        self.v_max = self
            .components
            .iter()
            .map(|c| c.vertical_sample)
            .max()
            .unwrap_or(1);

        self.mcu_x = width.div_ceil(8 * self.h_max);
        self.mcu_y = height.div_ceil(8 * self.v_max);

        trace!(
            "MCU grid {}x{} with sampling ({},{})",
            self.mcu_x,
            self.mcu_y,
            self.h_max,
            self.v_max
        );

        for component in &mut self.components {
            component.width_stride = self.mcu_x * component.horizontal_sample * 8;
            component.plane_height = self.mcu_y * component.vertical_sample * 8;
            component.sample_ratio = SampleRatios::new(
                self.h_max,
                self.v_max,
                component.horizontal_sample,
                component.vertical_sample
            );
            let size = component
                .width_stride
                .checked_mul(component.plane_height)
                .ok_or(DecodeErrors::LargeDimensions(width.max(height)))?;

            component.plane = vec![0; size];
            component.seen_in_scan = false;
        }
        if self.components.len() == 3 {
            let ids = [
                self.components[0].id,
                self.components[1].id,
                self.components[2].id
            ];
            if self.adobe_transform == Some(0) || ids == *b"RGB" {
                info!("Three component image stored as RGB");
                self.input_colorspace = ColorSpace::RGB;
            }
        }
        Ok(())
    }
}

/// Return true if `bytes` starts with a jpeg start of image marker
pub fn probe_jpeg(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0xFF, 0xD8, 0xFF])
}

/// A struct representing Image Information
#[derive(Default, Clone, Eq, PartialEq, Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct ImageInfo {
    /// Width of the image
    pub width:      u16,
    /// Height of image
    pub height:     u16,
    /// Start of frame markers
    pub sof:        SOFMarkers,
    /// Number of components
    pub components: u8
}
