/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use crate::bytestream::{ZByteIoError, ZByteWriterTrait};

enum Mode {
    // Big endian
    BE,
    // Little Endian
    LE
}

/// Encapsulates a simple Byte writer with
/// support for Endian aware writes
///
/// The writer keeps track of how many bytes went into the sink
pub struct ZWriter<T: ZByteWriterTrait> {
    buffer:        T,
    bytes_written: usize
}

impl<T: ZByteWriterTrait> ZWriter<T> {
    /// Create a new writer for the sink
    pub fn new(data: T) -> ZWriter<T> {
        ZWriter {
            buffer:        data,
            bytes_written: 0
        }
    }
    /// Destroy this writer returning the underlying sink
    pub fn inner(self) -> T {
        self.buffer
    }
    /// Return the number of bytes the writer has written
    ///
    /// ```
    /// use pictor_core::bytestream::ZWriter;
    /// let mut sink = vec![];
    /// let mut stream = ZWriter::new(&mut sink);
    /// stream.write_u16_be_err(1).unwrap();
    /// assert_eq!(stream.bytes_written(), 2);
    /// ```
    pub const fn bytes_written(&self) -> usize {
        self.bytes_written
    }
    /// Write all bytes in `buf` or error out
    pub fn write_all(&mut self, buf: &[u8]) -> Result<(), ZByteIoError> {
        self.buffer.write_all_bytes(buf)?;
        self.bytes_written += buf.len();
        Ok(())
    }
    /// Write a fixed size array into the sink
    pub fn write_const_bytes<const N: usize>(&mut self, buf: &[u8; N]) -> Result<(), ZByteIoError> {
        self.buffer.write_const_bytes(buf)?;
        self.bytes_written += N;
        Ok(())
    }
    /// Write a single byte into the sink or error out
    /// if there is not enough space
    pub fn write_u8_err(&mut self, byte: u8) -> Result<(), ZByteIoError> {
        self.write_const_bytes(&[byte])
    }
    /// Hint the sink about the expected size of the output
    pub fn reserve(&mut self, size: usize) -> Result<(), ZByteIoError> {
        self.buffer.reserve_capacity(size)
    }
    /// Flush the underlying sink
    pub fn flush(&mut self) -> Result<(), ZByteIoError> {
        self.buffer.flush_bytes()
    }
}

macro_rules! write_single_type {
    ($name:tt,$name2:tt,$name3:tt,$int_type:tt) => {
        impl<T: ZByteWriterTrait> ZWriter<T> {
            #[inline(always)]
            fn $name(&mut self, byte: $int_type, mode: Mode) -> Result<(), ZByteIoError> {
                let bytes = match mode {
                    Mode::BE => byte.to_be_bytes(),
                    Mode::LE => byte.to_le_bytes()
                };
                self.write_const_bytes(&bytes)
            }

            #[doc=concat!("Write ",stringify!($int_type)," as a big endian integer")]
            #[doc=concat!("Returning an error if the underlying sink cannot support a ",stringify!($int_type)," write.")]
            #[inline]
            pub fn $name2(&mut self, byte: $int_type) -> Result<(), ZByteIoError> {
                self.$name(byte, Mode::BE)
            }

            #[doc=concat!("Write ",stringify!($int_type)," as a little endian integer")]
            #[doc=concat!("Returning an error if the underlying sink cannot support a ",stringify!($int_type)," write.")]
            #[inline]
            pub fn $name3(&mut self, byte: $int_type) -> Result<(), ZByteIoError> {
                self.$name(byte, Mode::LE)
            }
        }
    };
}

write_single_type!(write_u64_inner, write_u64_be_err, write_u64_le_err, u64);
write_single_type!(write_u32_inner, write_u32_be_err, write_u32_le_err, u32);
write_single_type!(write_u16_inner, write_u16_be_err, write_u16_le_err, u16);

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use crate::bytestream::ZWriter;

    #[test]
    fn writes_are_counted() {
        let mut sink = Vec::new();
        let mut writer = ZWriter::new(&mut sink);
        writer.write_u32_le_err(0x0403_0201).unwrap();
        writer.write_u16_be_err(0x0506).unwrap();
        writer.write_u8_err(7).unwrap();
        assert_eq!(writer.bytes_written(), 7);
        assert_eq!(sink, [1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn slice_sink_runs_out() {
        let mut storage = [0_u8; 3];
        let mut writer = ZWriter::new(&mut storage[..]);
        assert!(writer.write_u16_be_err(1).is_ok());
        assert!(writer.write_u16_be_err(1).is_err());
    }
}
