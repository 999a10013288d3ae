/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Table driven CRC-32 (ISO 3309) as used by PNG chunks

const fn make_crc_table() -> [u32; 256] {
    let mut table = [0_u32; 256];
    let mut n = 0;

    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;

        while k < 8 {
            if c & 1 == 1 {
                c = 0xEDB8_8320 ^ (c >> 1);
            } else {
                c >>= 1;
            }
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
}

static CRC_TABLE: [u32; 256] = make_crc_table();

/// Update a running crc with `bytes`
///
/// The running value starts at `u32::MAX` and the final
/// checksum is its complement.
#[inline]
pub fn calc_crc_with_bytes(bytes: &[u8], crc: u32) -> u32 {
    let mut c = crc;

    for &byte in bytes {
        c = CRC_TABLE[((c ^ u32::from(byte)) & 0xFF) as usize] ^ (c >> 8);
    }
    c
}

#[cfg(test)]
mod tests {
    use crate::crc::calc_crc_with_bytes;

    fn calc_crc(bytes: &[u8]) -> u32 {
        !calc_crc_with_bytes(bytes, u32::MAX)
    }

    #[test]
    fn iend_crc() {
        assert_eq!(calc_crc(b"IEND"), 0xAE42_6082);
    }

    #[test]
    fn crc_is_continuous() {
        let whole = calc_crc(b"IDATsome bytes");
        let split = !calc_crc_with_bytes(b"some bytes", calc_crc_with_bytes(b"IDAT", u32::MAX));
        assert_eq!(whole, split);
    }
}
