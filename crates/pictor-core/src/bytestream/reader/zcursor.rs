/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use crate::bytestream::{ZByteIoError, ZByteReaderTrait, ZSeekFrom};

/// An in-memory cursor over anything that can be viewed as a byte slice
///
/// This is the reader all pictor decoders are fed with
pub struct ZCursor<T: AsRef<[u8]>> {
    stream:   T,
    position: usize
}

impl<T: AsRef<[u8]>> ZCursor<T> {
    pub fn new(buffer: T) -> ZCursor<T> {
        ZCursor {
            stream:   buffer,
            position: 0
        }
    }
    #[inline]
    fn len(&self) -> usize {
        self.stream.as_ref().len()
    }
    #[inline]
    fn advance(&mut self, num: usize) {
        self.position = self.position.saturating_add(num);
    }
}

impl<T: AsRef<[u8]>> ZByteReaderTrait for ZCursor<T> {
    #[inline(always)]
    fn read_byte_no_error(&mut self) -> u8 {
        let byte = self.stream.as_ref().get(self.position).copied().unwrap_or(0);
        self.advance(1);
        byte
    }
    #[inline(always)]
    fn read_exact_bytes(&mut self, buf: &mut [u8]) -> Result<(), ZByteIoError> {
        let start = self.position;
        match start
            .checked_add(buf.len())
            .and_then(|end| self.stream.as_ref().get(start..end))
        {
            Some(slice) => {
                buf.copy_from_slice(slice);
                self.advance(buf.len());
                Ok(())
            }
            None => Err(ZByteIoError::NotEnoughBytes(
                buf.len(),
                self.len().saturating_sub(start)
            ))
        }
    }

    #[inline(always)]
    fn read_const_bytes<const N: usize>(&mut self, buf: &mut [u8; N]) -> Result<(), ZByteIoError> {
        self.read_exact_bytes(buf)
    }

    #[inline(always)]
    fn read_const_bytes_no_error<const N: usize>(&mut self, buf: &mut [u8; N]) {
        if self.read_exact_bytes(buf).is_err() {
            buf.fill(0);
            // consume what is left so that eof is reported
            self.position = self.position.max(self.len());
        }
    }

    #[inline(always)]
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, ZByteIoError> {
        let data = self.stream.as_ref();
        let start = core::cmp::min(self.position, data.len());
        let end = core::cmp::min(start.saturating_add(buf.len()), data.len());

        buf[..end - start].copy_from_slice(&data[start..end]);
        self.advance(end - start);

        Ok(end - start)
    }

    #[inline(always)]
    fn peek_bytes(&mut self, buf: &mut [u8]) -> Result<usize, ZByteIoError> {
        let position = self.position;
        let bytes_read = self.read_bytes(buf)?;
        self.position = position;

        Ok(bytes_read)
    }

    #[inline(always)]
    fn peek_exact_bytes(&mut self, buf: &mut [u8]) -> Result<(), ZByteIoError> {
        let position = self.position;
        self.read_exact_bytes(buf)?;
        self.position = position;
        Ok(())
    }

    fn z_seek(&mut self, from: ZSeekFrom) -> Result<u64, ZByteIoError> {
        let new_position = match from {
            ZSeekFrom::Start(position) => i64::try_from(position)?,
            ZSeekFrom::End(position) => i64::try_from(self.len())?.saturating_add(position),
            ZSeekFrom::Current(position) => i64::try_from(self.position)?.saturating_add(position)
        };
        if new_position < 0 {
            return Err(ZByteIoError::SeekError("Cannot seek before start of stream"));
        }
        self.position = usize::try_from(new_position)?;

        Ok(self.position as u64)
    }

    #[inline(always)]
    fn is_eof(&mut self) -> Result<bool, ZByteIoError> {
        Ok(self.position >= self.len())
    }

    #[inline(always)]
    fn z_position(&mut self) -> Result<u64, ZByteIoError> {
        Ok(self.position as u64)
    }

    #[inline(always)]
    fn z_size(&mut self) -> Result<u64, ZByteIoError> {
        Ok(self.len() as u64)
    }

    fn read_remaining(&mut self, sink: &mut alloc::vec::Vec<u8>) -> Result<usize, ZByteIoError> {
        let data = self.stream.as_ref();
        let start = core::cmp::min(self.position, data.len());
        sink.extend_from_slice(&data[start..]);
        let read = data.len() - start;
        self.advance(read);
        Ok(read)
    }
}
