/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

/// Calculate the adler32 checksum of `data` the way zlib stores it
#[cfg(feature = "zlib")]
pub fn calc_adler_hash(data: &[u8]) -> u32 {
    use simd_adler32::Adler32;

    let mut hasher = Adler32::new();
    hasher.write(data);
    hasher.finish()
}

/// Calculate the adler32 checksum of `data` the way zlib stores it
#[cfg(not(feature = "zlib"))]
pub fn calc_adler_hash(data: &[u8]) -> u32 {
    const MOD_ADLER: u32 = 65521;
    // largest n such that 255n(n+1)/2 + (n+1)(MOD_ADLER-1) fits in a u32
    const CHUNK: usize = 5552;

    let mut a: u32 = 1;
    let mut b: u32 = 0;

    for chunk in data.chunks(CHUNK) {
        for &byte in chunk {
            a += u32::from(byte);
            b += a;
        }
        a %= MOD_ADLER;
        b %= MOD_ADLER;
    }
    (b << 16) | a
}

#[cfg(test)]
mod tests {
    use crate::utils::calc_adler_hash;

    #[test]
    fn known_adler_values() {
        assert_eq!(calc_adler_hash(b""), 1);
        assert_eq!(calc_adler_hash(b"Wikipedia"), 0x11E6_0398);
    }
}
