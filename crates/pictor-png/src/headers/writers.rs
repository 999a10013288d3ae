/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use pictor_core::bytestream::{ZByteIoError, ZByteWriterTrait, ZWriter};

use crate::crc::calc_crc_with_bytes;
use crate::enums::PngColor;

/// Contents of an IHDR chunk for an 8 bit, non interlaced image
pub(crate) fn ihdr_bytes(width: u32, height: u32, color: PngColor) -> [u8; 13] {
    let mut out = [0; 13];
    out[0..4].copy_from_slice(&width.to_be_bytes());
    out[4..8].copy_from_slice(&height.to_be_bytes());
    // depth
    out[8] = 8;
    out[9] = color.to_int();
    // compression, filter and interlace methods are all zero
    out
}

/// Write a whole png chunk
///
/// Format is length - chunk type - [data] - crc, where the crc
/// covers the chunk type and data.
pub(crate) fn write_chunk<T: ZByteWriterTrait>(
    name: &[u8; 4], data: &[u8], writer: &mut ZWriter<T>
) -> Result<(), ZByteIoError> {
    let length = u32::try_from(data.len())?;

    writer.write_u32_be_err(length)?;
    writer.write_const_bytes(name)?;
    writer.write_all(data)?;
    // crc is a continuous function, so first crc the chunk name
    // and then crc that with the chunk bytes passing in the previous crc
    let crc = calc_crc_with_bytes(name, u32::MAX);
    let crc = !calc_crc_with_bytes(data, crc);
    writer.write_u32_be_err(crc)?;
    Ok(())
}
