/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Decode Decoder markers/segments
//!
//! This file deals with decoding header information in a jpeg file
//!
use alloc::format;
use alloc::string::ToString;
use alloc::vec::Vec;

use pictor_core::bytestream::ZByteReaderTrait;
use pictor_core::colorspace::ColorSpace;
use pictor_core::log::{debug, trace, warn};

use crate::components::Components;
use crate::decoder::{JpegDecoder, MAX_COMPONENTS};
use crate::errors::{DecodeErrors, UnsupportedSchemes};
use crate::huffman::HuffmanTable;
use crate::misc::{un_zig_zag, SOFMarkers};

/// Read the length of a marker segment, excluding the two length bytes,
/// and make sure the whole segment is present
pub(crate) fn read_segment_length<T: ZByteReaderTrait>(
    decoder: &mut JpegDecoder<T>
) -> Result<usize, DecodeErrors> {
    let length = decoder.stream.get_u16_be_err()?;

    let length = usize::from(length.checked_sub(2).ok_or(DecodeErrors::Format(format!(
        "Found a marker with invalid length : {length}"
    )))?);

    if !decoder.stream.has(length)? {
        return Err(DecodeErrors::FormatStatic("Marker segment extends past end of file"));
    }
    Ok(length)
}

/// Skip a segment we do not interpret
pub(crate) fn skip_segment<T: ZByteReaderTrait>(
    decoder: &mut JpegDecoder<T>
) -> Result<(), DecodeErrors> {
    let length = read_segment_length(decoder)?;
    trace!("Skipping {length} bytes");
    decoder.stream.skip(length)?;
    Ok(())
}

///**B.2.4.2 Huffman table-specification syntax**
#[allow(clippy::similar_names, clippy::cast_sign_loss)]
pub(crate) fn parse_huffman<T: ZByteReaderTrait>(
    decoder: &mut JpegDecoder<T>
) -> Result<(), DecodeErrors> {
    // Read the length of the Huffman table
    let mut dht_length = read_segment_length(decoder)? as i32;

    while dht_length > 16 {
        // HT information
        let ht_info = decoder.stream.get_u8_err()?;
        // third bit indicates whether the huffman encoding is DC or AC type
        let dc_or_ac = (ht_info >> 4) & 0xF;
        // Indicate the position of this table, should be less than 4;
        let index = (ht_info & 0xF) as usize;
        // read the number of symbols
        let mut num_symbols: [u8; 17] = [0; 17];

        if index >= MAX_COMPONENTS {
            return Err(DecodeErrors::HuffmanDecode(format!(
                "Invalid DHT index {index}, expected between 0 and 3"
            )));
        }

        if dc_or_ac > 1 {
            return Err(DecodeErrors::HuffmanDecode(format!(
                "Invalid DHT position {dc_or_ac}, should be 0 or 1"
            )));
        }

        decoder.stream.read_exact_bytes(&mut num_symbols[1..17])?;

        dht_length -= 1 + 16;

        let symbols_sum: i32 = num_symbols.iter().map(|f| i32::from(*f)).sum();

        // The sum of the number of symbols cannot be greater than 256;
        if symbols_sum > 256 {
            return Err(DecodeErrors::FormatStatic(
                "Encountered Huffman table with excessive length in DHT"
            ));
        }
        if symbols_sum > dht_length {
            return Err(DecodeErrors::HuffmanDecode(format!(
                "Excessive Huffman table of length {symbols_sum} found when header length is {dht_length}"
            )));
        }
        dht_length -= symbols_sum;
        // A table containing symbols in increasing code length
        let mut symbols = [0; 256];

        decoder
            .stream
            .read_exact_bytes(&mut symbols[0..(symbols_sum as usize)])?;

        trace!("Assigning {} huffman table {index}", if dc_or_ac == 0 { "DC" } else { "AC" });
        // store
        match dc_or_ac {
            0 => {
                decoder.dc_huffman_tables[index] = Some(HuffmanTable::new(&num_symbols, symbols)?);
            }
            _ => {
                decoder.ac_huffman_tables[index] = Some(HuffmanTable::new(&num_symbols, symbols)?);
            }
        }
    }

    if dht_length > 0 {
        return Err(DecodeErrors::FormatStatic("Bogus Huffman table definition"));
    }

    Ok(())
}

///**B.2.4.1 Quantization table-specification syntax**
#[allow(clippy::cast_possible_truncation, clippy::needless_range_loop)]
pub(crate) fn parse_dqt<T: ZByteReaderTrait>(img: &mut JpegDecoder<T>) -> Result<(), DecodeErrors> {
    let mut qt_length = read_segment_length(img)?;

    // A single DQT header may have multiple QT's
    while qt_length > 0 {
        let qt_info = img.stream.get_u8_err()?;
        // 0 = 8 bit otherwise 16 bit dqt
        let precision = (qt_info >> 4) as usize;
        // last 4 bits give us position
        let table_position = (qt_info & 0x0f) as usize;
        let precision_value = 64 * (precision + 1);

        if precision_value + 1 > qt_length {
            return Err(DecodeErrors::DqtError(format!("Invalid QT table bytes left :{}. Too small to construct a valid qt table which should be {} long", qt_length, precision_value + 1)));
        }

        let dct_table = match precision {
            0 => {
                let mut qt_values = [0_u8; 64];

                img.stream.read_exact_bytes(&mut qt_values)?;
                // carry out un zig-zag here
                un_zig_zag(&qt_values)
            }
            1 => {
                // 16 bit quantization tables
                let mut qt_values = [0_u16; 64];

                for i in 0..64 {
                    qt_values[i] = img.stream.get_u16_be_err()?;
                }
                un_zig_zag(&qt_values)
            }
            _ => {
                return Err(DecodeErrors::DqtError(format!(
                    "Expected QT precision value of either 0 or 1, found {precision:?}"
                )));
            }
        };
        qt_length -= precision_value + 1;

        if table_position >= MAX_COMPONENTS {
            return Err(DecodeErrors::DqtError(format!(
                "Too large table position for QT :{table_position}, expected between 0 and 3"
            )));
        }

        trace!("Assigning qt table {table_position} with precision {precision}");
        img.qt_tables[table_position] = Some(dct_table);
    }

    return Ok(());
}

/// Section:`B.2.2 Frame header syntax`
pub(crate) fn parse_start_of_frame<T: ZByteReaderTrait>(
    sof: SOFMarkers, img: &mut JpegDecoder<T>
) -> Result<(), DecodeErrors> {
    if img.seen_sof {
        return Err(DecodeErrors::SofError(
            "Two Start of Frame Markers".to_string()
        ));
    }
    // Get length of the frame header
    let length = read_segment_length(img)? + 2;
    // usually 8, but can be 12 and 16, we currently support only 8
    let dt_precision = img.stream.get_u8_err()?;

    if dt_precision != 8 {
        return Err(DecodeErrors::Unsupported(UnsupportedSchemes::Precision(
            dt_precision
        )));
    }

    // read  and set the image height.
    let img_height = img.stream.get_u16_be_err()?;
    // read and set the image width
    let img_width = img.stream.get_u16_be_err()?;

    trace!("Image width  :{}", img_width);
    trace!("Image height :{}", img_height);

    // a height of zero defers to a DNL marker, which we do not handle
    if img_width == 0 || img_height == 0 {
        return Err(DecodeErrors::ZeroError);
    }

    if usize::from(img_width) > img.options.get_max_width() {
        return Err(DecodeErrors::Format(format!("Image width {} greater than width limit {}. If use `set_limits` if you want to support huge images", img_width, img.options.get_max_width())));
    }

    if usize::from(img_height) > img.options.get_max_height() {
        return Err(DecodeErrors::Format(format!("Image height {} greater than height limit {}. If use `set_limits` if you want to support huge images", img_height, img.options.get_max_height())));
    }

    // Number of components for the image.
    let num_components = img.stream.get_u8_err()?;

    if num_components == 0 {
        return Err(DecodeErrors::SofError(
            "Number of components cannot be zero.".to_string()
        ));
    }

    let expected = 8 + 3 * usize::from(num_components);
    // length should be equal to num components
    if length != expected {
        return Err(DecodeErrors::SofError(format!(
            "Length of start of frame differs from expected {expected},value is {length}"
        )));
    }

    trace!("Image components : {}", num_components);

    img.input_colorspace = match num_components {
        1 => ColorSpace::Luma,
        3 => ColorSpace::YCbCr,
        _ => {
            return Err(DecodeErrors::Unsupported(UnsupportedSchemes::ComponentCount(
                num_components
            )))
        }
    };

    let mut components = Vec::with_capacity(usize::from(num_components));
    let mut temp = [0; 3];

    for pos in 0..num_components {
        // read 3 bytes for each component
        img.stream.read_exact_bytes(&mut temp)?;

        if components.iter().any(|c: &Components| c.id == temp[0]) {
            return Err(DecodeErrors::SofError(format!(
                "Duplicate component id {} in start of frame",
                temp[0]
            )));
        }
        // create a component.
        let component = Components::from(temp, pos)?;

        components.push(component);
    }
    img.seen_sof = true;

    img.info.width = img_width;
    img.info.height = img_height;
    img.info.components = num_components;
    img.info.sof = sof;

    img.components = components;

    Ok(())
}

/// Parse a start of scan data
pub(crate) fn parse_sos<T: ZByteReaderTrait>(
    image: &mut JpegDecoder<T>
) -> Result<(), DecodeErrors> {
    if !image.seen_sof {
        return Err(DecodeErrors::SosError(
            "Start of scan found before start of frame".to_string()
        ));
    }
    // Scan header length
    let ls = read_segment_length(image)? + 2;
    // Number of image components in scan
    let ns = image.stream.get_u8_err()?;

    let mut seen: [i32; MAX_COMPONENTS] = [-1; MAX_COMPONENTS];

    let smallest_size = 6 + 2 * usize::from(ns);

    if ls != smallest_size {
        return Err(DecodeErrors::SosError(format!(
            "Bad SOS length {ls},corrupt jpeg"
        )));
    }

    // Check number of components.
    if ns == 0 || usize::from(ns) > image.components.len() {
        return Err(DecodeErrors::SosError(format!(
            "Invalid number of components in start of scan {ns}, expected in range 1..={}",
            image.components.len()
        )));
    }
    image.num_scans = ns;

    for i in 0..usize::from(ns) {
        let id = image.stream.get_u8_err()?;

        if seen.contains(&i32::from(id)) {
            return Err(DecodeErrors::SosError(format!(
                "Duplicate ID {id} seen twice in the same component"
            )));
        }

        seen[i] = i32::from(id);
        // DC and AC huffman table position
        // top 4 bits contain dc huffman destination table
        // lower four bits contain ac huffman destination table
        let y = image.stream.get_u8_err()?;

        let j = image
            .components
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| {
                DecodeErrors::SosError(format!(
                    "Invalid component id {}, expected one one of {:?}",
                    id,
                    image.components.iter().map(|c| c.id).collect::<Vec<_>>()
                ))
            })?;

        let component = &mut image.components[j];
        component.dc_huff_table = usize::from((y >> 4) & 0xF);
        component.ac_huff_table = usize::from(y & 0xF);

        if component.dc_huff_table >= MAX_COMPONENTS || component.ac_huff_table >= MAX_COMPONENTS {
            return Err(DecodeErrors::SosError(format!(
                "Invalid huffman table destination {y:X} for component {id}"
            )));
        }
        image.z_order[i] = j;

        trace!(
            "Assigned huffman tables {}/{} to component {j}, id={}",
            image.components[j].dc_huff_table,
            image.components[j].ac_huff_table,
            image.components[j].id,
        );
    }

    // Start of spectral / predictor selection. (between 0 and 63)
    image.spec_start = image.stream.get_u8_err()?;
    // End of spectral selection
    image.spec_end = image.stream.get_u8_err()?;

    let bit_approx = image.stream.get_u8_err()?;
    // successive approximation bit position high
    image.succ_high = bit_approx >> 4;
    // successive approximation bit position low
    image.succ_low = bit_approx & 0xF;

    if image.spec_start != 0 || image.spec_end != 63 || bit_approx != 0 {
        // sequential images always code the whole block
        if image.options.get_strict_mode() {
            return Err(DecodeErrors::SosError(format!(
                "Invalid spectral selection {}..={} or approximation {bit_approx:X} for a sequential image",
                image.spec_start, image.spec_end
            )));
        }
        warn!(
            "Ignoring spectral selection Ss={} Se={} Ah={} Al={} of a sequential image",
            image.spec_start, image.spec_end, image.succ_high, image.succ_low
        );
    }

    debug!("Start of scan with {ns} components");

    Ok(())
}

/// Parse a define restart interval segment
pub(crate) fn parse_dri<T: ZByteReaderTrait>(
    decoder: &mut JpegDecoder<T>
) -> Result<(), DecodeErrors> {
    if read_segment_length(decoder)? != 2 {
        return Err(DecodeErrors::FormatStatic("Bad DRI length, Corrupt JPEG"));
    }
    decoder.restart_interval = usize::from(decoder.stream.get_u16_be_err()?);
    decoder.todo = decoder.restart_interval;

    trace!("Restart interval {}", decoder.restart_interval);
    Ok(())
}

/// Parse Adobe App14 segment, it tells us whether the three components
/// are stored as YCbCr or as plain RGB
pub(crate) fn parse_app14<T: ZByteReaderTrait>(
    decoder: &mut JpegDecoder<T>
) -> Result<(), DecodeErrors> {
    let length = read_segment_length(decoder)?;

    if length < 12 {
        decoder.stream.skip(length)?;
        return Ok(());
    }
    let mut header = [0_u8; 12];
    decoder.stream.read_exact_bytes(&mut header)?;

    if &header[..5] == b"Adobe" {
        // version (2), flags0 (2), flags1 (2) then the transform byte
        let transform = header[11];
        trace!("Adobe APP14 marker with transform {transform}");
        decoder.adobe_transform = Some(transform);
    }
    decoder.stream.skip(length - 12)?;

    Ok(())
}
