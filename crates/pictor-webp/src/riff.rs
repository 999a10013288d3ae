/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! RIFF container framing
//!
//! A webp file is `RIFF`, a little endian size, `WEBP` and a sequence of
//! chunks. Each chunk is a fourcc, a little endian payload size and the
//! payload, padded to an even length.
use pictor_core::bytestream::{ZByteIoError, ZByteWriterTrait, ZWriter};

use crate::errors::WebpDecodeErrors;

pub(crate) const RIFF_HEADER_SIZE: usize = 12;
pub(crate) const CHUNK_HEADER_SIZE: usize = 8;

pub(crate) const VP8: [u8; 4] = *b"VP8 ";
pub(crate) const VP8L: [u8; 4] = *b"VP8L";
pub(crate) const VP8X: [u8; 4] = *b"VP8X";
pub(crate) const ALPH: [u8; 4] = *b"ALPH";
pub(crate) const ANIM: [u8; 4] = *b"ANIM";
pub(crate) const ANMF: [u8; 4] = *b"ANMF";

/// A chunk as found in the file
///
/// `data` holds the payload bytes that are actually present, which is
/// fewer than `declared` when the file was cut short.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Chunk<'a> {
    pub fourcc:   [u8; 4],
    pub data:     &'a [u8],
    pub declared: usize,
    /// Start of the payload within the slice being iterated
    pub offset:   usize
}

impl<'a> Chunk<'a> {
    pub const fn is_truncated(&self) -> bool {
        self.data.len() < self.declared
    }
    /// Payload of the chunk, failing if the file ends inside it
    pub fn payload(&self) -> Result<&'a [u8], WebpDecodeErrors> {
        if self.is_truncated() {
            return Err(WebpDecodeErrors::TruncatedChunk(
                self.fourcc,
                self.declared,
                self.data.len()
            ));
        }
        Ok(self.data)
    }
}

/// Iterator over consecutive chunks of a byte slice
///
/// Iteration stops at the first incomplete chunk header. A chunk whose
/// payload runs past the end is still returned, with a short `data`.
pub(crate) struct ChunkIter<'a> {
    data:     &'a [u8],
    position: usize
}

impl<'a> ChunkIter<'a> {
    pub const fn new(data: &'a [u8]) -> ChunkIter<'a> {
        ChunkIter { data, position: 0 }
    }
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Chunk<'a>> {
        let header = self
            .data
            .get(self.position..self.position.saturating_add(CHUNK_HEADER_SIZE))?;

        let fourcc = [header[0], header[1], header[2], header[3]];
        let declared = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;

        let start = self.position + CHUNK_HEADER_SIZE;
        let end = start.saturating_add(declared).min(self.data.len());

        self.position = start
            .saturating_add(declared)
            .saturating_add(declared & 1);

        Some(Chunk {
            fourcc,
            data: &self.data[start..end],
            declared,
            offset: start
        })
    }
}

/// The RIFF header of a webp file
#[derive(Copy, Clone, Debug)]
pub(crate) struct RiffHeader {
    /// Total file length the header claims, `RIFF` and size included
    pub file_size: usize
}

/// Validate the `RIFF` .. `WEBP` header
pub(crate) fn read_riff_header(data: &[u8]) -> Result<RiffHeader, WebpDecodeErrors> {
    if data.len() < RIFF_HEADER_SIZE {
        return Err(WebpDecodeErrors::BadSignature);
    }
    if &data[0..4] != b"RIFF" || &data[8..12] != b"WEBP" {
        return Err(WebpDecodeErrors::BadSignature);
    }
    let size = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;

    if size < 4 {
        return Err(WebpDecodeErrors::GenericStatic("RIFF size too small"));
    }
    Ok(RiffHeader {
        file_size: size + CHUNK_HEADER_SIZE
    })
}

/// Write one chunk, padding odd payloads with a zero byte
pub(crate) fn write_chunk<T: ZByteWriterTrait>(
    writer: &mut ZWriter<T>, fourcc: [u8; 4], payload: &[u8]
) -> Result<(), ZByteIoError> {
    writer.write_const_bytes(&fourcc)?;
    writer.write_u32_le_err(payload.len() as u32)?;
    writer.write_all(payload)?;

    if payload.len() & 1 == 1 {
        writer.write_u8_err(0)?;
    }
    Ok(())
}

/// Bytes a chunk occupies once written
pub(crate) const fn chunk_size(payload_len: usize) -> usize {
    CHUNK_HEADER_SIZE + payload_len + (payload_len & 1)
}

/// Write the RIFF header for a body of `body_len` bytes of chunks
pub(crate) fn write_riff_header<T: ZByteWriterTrait>(
    writer: &mut ZWriter<T>, body_len: usize
) -> Result<(), ZByteIoError> {
    writer.write_const_bytes(b"RIFF")?;
    writer.write_u32_le_err((body_len + 4) as u32)?;
    writer.write_const_bytes(b"WEBP")
}

/// Append a little endian 24 bit value
pub(crate) fn put_u24(out: &mut alloc::vec::Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes()[..3]);
}

/// Read a little endian 24 bit value, `data` must hold three bytes
pub(crate) fn get_u24(data: &[u8]) -> u32 {
    u32::from(data[0]) | (u32::from(data[1]) << 8) | (u32::from(data[2]) << 16)
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use pictor_core::bytestream::ZWriter;

    use crate::riff::{chunk_size, read_riff_header, write_chunk, ChunkIter};

    #[test]
    fn odd_chunks_are_padded() {
        let mut out = vec![];
        let mut writer = ZWriter::new(&mut out);
        write_chunk(&mut writer, *b"ABCD", &[1, 2, 3]).unwrap();
        write_chunk(&mut writer, *b"EFGH", &[4, 5]).unwrap();
        drop(writer);

        assert_eq!(out.len(), chunk_size(3) + chunk_size(2));

        let chunks: Vec<_> = ChunkIter::new(&out).collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(&chunks[0].fourcc, b"ABCD");
        assert_eq!(chunks[0].data, &[1, 2, 3]);
        assert_eq!(chunks[1].data, &[4, 5]);
        assert_eq!(chunks[1].offset, chunk_size(3) + 8);
    }

    #[test]
    fn truncated_chunk_is_reported() {
        let mut data = b"VP8L".to_vec();
        data.extend_from_slice(&100_u32.to_le_bytes());
        data.extend_from_slice(&[0; 10]);

        let chunks: Vec<_> = ChunkIter::new(&data).collect();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_truncated());
        assert!(chunks[0].payload().unwrap_err().is_entropy_error());
        // half a chunk header is not a chunk
        assert_eq!(ChunkIter::new(&data[..6]).count(), 0);
    }

    #[test]
    fn riff_header() {
        let mut data = b"RIFF".to_vec();
        data.extend_from_slice(&20_u32.to_le_bytes());
        data.extend_from_slice(b"WEBP");
        assert_eq!(read_riff_header(&data).unwrap().file_size, 28);

        data[8] = b'X';
        assert!(read_riff_header(&data).is_err());
        assert!(read_riff_header(b"RIFF").is_err());
    }
}
