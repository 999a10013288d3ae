/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Decoding of entropy coded scans into component sample planes
use alloc::format;

use pictor_core::bytestream::{ZByteReaderTrait, ZReader};
use pictor_core::log::{error, trace, warn};

use crate::bitstream::BitStream;
use crate::components::Components;
use crate::decoder::MAX_COMPONENTS;
use crate::errors::DecodeErrors;
use crate::headers::parse_sos;
use crate::huffman::HuffmanTable;
use crate::idct::idct_int;
use crate::marker::Marker;
use crate::JpegDecoder;

/// The size of a DC block for a MCU.
pub const DCT_BLOCK: usize = 64;

impl<T: ZByteReaderTrait> JpegDecoder<T> {
    /// Check for existence of DC and AC Huffman Tables and quantization
    /// tables of the current scan's components, and bind the quantization
    /// tables to them
    pub(crate) fn check_tables(&mut self) -> Result<(), DecodeErrors> {
        for &index in &self.z_order[..usize::from(self.num_scans)] {
            let component = &mut self.components[index];

            if self.dc_huffman_tables[component.dc_huff_table].is_none() {
                return Err(DecodeErrors::HuffmanDecode(format!(
                    "No DC table for component {:?}",
                    component.component_id
                )));
            }
            if self.ac_huffman_tables[component.ac_huff_table].is_none() {
                return Err(DecodeErrors::HuffmanDecode(format!(
                    "No AC table for component {:?}",
                    component.component_id
                )));
            }
            let qt_table = self.qt_tables[usize::from(component.quantization_table_number)]
                .ok_or_else(|| {
                    DecodeErrors::DqtError(format!(
                        "No quantization table {} for component {:?}",
                        component.quantization_table_number, component.component_id
                    ))
                })?;
            component.quantization_table = qt_table;
        }
        Ok(())
    }

    /// Decode every scan of the image, stopping at the end of image marker
    pub(crate) fn decode_scans(&mut self) -> Result<(), DecodeErrors> {
        loop {
            let mut marker = self.decode_scan()?;

            // tables may be redefined between scans
            loop {
                match marker {
                    Marker::EOI => {
                        trace!("Found EOI marker");
                        return self.check_all_components_seen();
                    }
                    Marker::SOS => {
                        parse_sos(self)?;
                        break;
                    }
                    Marker::RST(_) => {
                        warn!("Stray {marker:?} marker between scans");
                    }
                    Marker::SOF(_) => {
                        return Err(DecodeErrors::FormatStatic(
                            "Start of frame found after the first scan"
                        ));
                    }
                    _ => self.parse_marker_inner(marker)?
                }
                marker = get_marker(&mut self.stream)?;
            }
        }
    }

    fn check_all_components_seen(&self) -> Result<(), DecodeErrors> {
        if let Some(missing) = self.components.iter().find(|c| !c.seen_in_scan) {
            if self.options.get_strict_mode() {
                return Err(DecodeErrors::Format(format!(
                    "Component {:?} is not present in any scan",
                    missing.component_id
                )));
            }
            error!(
                "Component {:?} is not present in any scan, it will be left empty",
                missing.component_id
            );
        }
        Ok(())
    }

    /// Decode a single scan and return the marker that follows it
    ///
    /// Scans with one component are not interleaved, they cover the
    /// component's own block grid. Others are coded in MCUs.
    #[allow(clippy::similar_names)]
    fn decode_scan(&mut self) -> Result<Marker, DecodeErrors> {
        self.check_tables()?;

        let mut stream = BitStream::new();
        let mut tmp = [0_i32; DCT_BLOCK];

        let num_scans = usize::from(self.num_scans);
        let mut scan_components = [0; MAX_COMPONENTS];
        scan_components[..num_scans].copy_from_slice(&self.z_order[..num_scans]);
        let scan_components = &scan_components[..num_scans];

        for &index in scan_components {
            self.components[index].dc_pred = 0;
            self.components[index].seen_in_scan = true;
        }
        self.todo = self.restart_interval;

        if num_scans == 1 {
            let index = scan_components[0];
            let component = &self.components[index];

            let comp_width = (usize::from(self.info.width) * component.horizontal_sample)
                .div_ceil(self.h_max);
            let comp_height = (usize::from(self.info.height) * component.vertical_sample)
                .div_ceil(self.v_max);

            let blocks_x = comp_width.div_ceil(8);
            let blocks_y = comp_height.div_ceil(8);

            trace!("Non interleaved scan of {blocks_x}x{blocks_y} blocks for component {index}");

            for block_y in 0..blocks_y {
                for block_x in 0..blocks_x {
                    let component = &mut self.components[index];
                    let (dc_table, ac_table) = tables_for(
                        &self.dc_huffman_tables,
                        &self.ac_huffman_tables,
                        component
                    )?;
                    decode_block(
                        &mut self.stream,
                        &mut stream,
                        dc_table,
                        ac_table,
                        component,
                        &mut tmp,
                        block_y * 8,
                        block_x * 8
                    )?;
                    let is_last = block_y + 1 == blocks_y && block_x + 1 == blocks_x;
                    self.end_of_mcu(&mut stream, is_last)?;
                }
            }
        } else {
            for mcu_y in 0..self.mcu_y {
                for mcu_x in 0..self.mcu_x {
                    for &index in scan_components {
                        let component = &mut self.components[index];
                        let (dc_table, ac_table) = tables_for(
                            &self.dc_huffman_tables,
                            &self.ac_huffman_tables,
                            component
                        )?;

                        for v_samp in 0..component.vertical_sample {
                            for h_samp in 0..component.horizontal_sample {
                                let row = (mcu_y * component.vertical_sample + v_samp) * 8;
                                let col = (mcu_x * component.horizontal_sample + h_samp) * 8;

                                decode_block(
                                    &mut self.stream,
                                    &mut stream,
                                    dc_table,
                                    ac_table,
                                    component,
                                    &mut tmp,
                                    row,
                                    col
                                )?;
                            }
                        }
                    }
                    let is_last = mcu_y + 1 == self.mcu_y && mcu_x + 1 == self.mcu_x;
                    self.end_of_mcu(&mut stream, is_last)?;
                }
            }
        }
        // whatever follows the scan has to be a marker
        match stream.marker.take() {
            Some(marker) => Ok(marker),
            None => get_marker(&mut self.stream)
        }
    }

    /// Bookkeeping after every MCU, restarts and truncation checks
    fn end_of_mcu(&mut self, stream: &mut BitStream, is_last: bool) -> Result<(), DecodeErrors> {
        if stream.is_exhausted() {
            error!("Premature end of buffer");
            return Err(DecodeErrors::ExhaustedData);
        }
        if self.restart_interval > 0 {
            self.todo = self.todo.saturating_sub(1);

            if self.todo == 0 && !is_last {
                self.handle_rst(stream)?;
            }
        }
        Ok(())
    }

    // handle RST markers.
    #[cold]
    pub(crate) fn handle_rst(&mut self, stream: &mut BitStream) -> Result<(), DecodeErrors> {
        self.todo = self.restart_interval;

        let marker = match stream.marker.take() {
            Some(marker) => marker,
            None => get_marker(&mut self.stream)?
        };
        // left over bits are padding
        stream.reset();

        match marker {
            Marker::RST(_) => {
                // Initialize dc predictions to zero for all components
                self.components.iter_mut().for_each(|x| x.dc_pred = 0);
                Ok(())
            }
            _ => {
                if self.options.get_strict_mode() {
                    return Err(DecodeErrors::MCUError(format!(
                        "Marker {marker:?} found where a restart marker was expected"
                    )));
                }
                error!(
                    "Marker `{:?}` Found within Huffman Stream, possibly corrupt jpeg",
                    marker
                );
                // the rest of the scan decodes as padding
                stream.marker = Some(marker);
                Ok(())
            }
        }
    }
}

fn tables_for<'a>(
    dc_tables: &'a [Option<HuffmanTable>; MAX_COMPONENTS],
    ac_tables: &'a [Option<HuffmanTable>; MAX_COMPONENTS], component: &Components
) -> Result<(&'a HuffmanTable, &'a HuffmanTable), DecodeErrors> {
    let dc_table = dc_tables[component.dc_huff_table % MAX_COMPONENTS]
        .as_ref()
        .ok_or(DecodeErrors::FormatStatic("Missing DC huffman table"))?;
    let ac_table = ac_tables[component.ac_huff_table % MAX_COMPONENTS]
        .as_ref()
        .ok_or(DecodeErrors::FormatStatic("Missing AC huffman table"))?;
    Ok((dc_table, ac_table))
}

/// Decode one block and write its samples at `row`,`col` of the
/// component plane
#[allow(clippy::too_many_arguments)]
fn decode_block<T: ZByteReaderTrait>(
    reader: &mut ZReader<T>, stream: &mut BitStream, dc_table: &HuffmanTable,
    ac_table: &HuffmanTable, component: &mut Components, tmp: &mut [i32; DCT_BLOCK], row: usize,
    col: usize
) -> Result<(), DecodeErrors> {
    // Fill the array with zeroes, decode_mcu_block expects
    // a zero based array.
    tmp.fill(0);

    stream.decode_mcu_block(
        reader,
        dc_table,
        ac_table,
        &component.quantization_table,
        tmp,
        &mut component.dc_pred
    )?;

    let position = row * component.width_stride + col;
    let out = component
        .plane
        .get_mut(position..)
        .ok_or(DecodeErrors::FormatStatic("Block outside of component plane"))?;

    idct_int(tmp, out, component.width_stride);

    Ok(())
}

/// Read until the next marker, skipping any bytes before it
pub(crate) fn get_marker<T: ZByteReaderTrait>(
    reader: &mut ZReader<T>
) -> Result<Marker, DecodeErrors> {
    // read until we get a marker
    while !reader.eof()? {
        let marker = reader.get_u8_err()?;

        if marker == 255 {
            if reader.eof()? {
                break;
            }
            let mut r = reader.get_u8_err()?;
            // 0xFF 0XFF(some images may be like that)
            while r == 0xFF {
                if reader.eof()? {
                    return Err(DecodeErrors::ExhaustedData);
                }
                r = reader.get_u8_err()?;
            }

            if r != 0 {
                return Marker::from_u8(r)
                    .ok_or_else(|| DecodeErrors::Format(format!("Unknown marker 0xFF{r:X}")));
            }
        }
    }
    Err(DecodeErrors::ExhaustedData)
}
