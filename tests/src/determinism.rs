/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::thread;

use pictor_image::decoder_for;

use crate::{conformance, hash};

/// Hash and duration of every frame in `data`
fn decode_all(data: &[u8]) -> Vec<(u128, u32)> {
    let mut decoder = decoder_for(data).unwrap();

    decoder
        .frames()
        .unwrap()
        .iter()
        .map(|frame| (hash(frame.bitmap().as_bytes()), frame.duration_ms()))
        .collect()
}

#[test]
fn test_repeated_decodes() {
    let conformance = conformance();

    for case in &conformance.cases {
        for bitmap in conformance.gradients() {
            let data = case.encode(&bitmap);
            assert_eq!(decode_all(&data), decode_all(&data), "{}", case.name);
        }
    }
}

#[test]
fn test_concurrent_decodes() {
    let conformance = conformance();

    for case in &conformance.cases {
        let [_, bitmap] = conformance.gradients();
        let data = case.encode(&bitmap);
        let expected = decode_all(&data);

        thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| decode_all(&data))).collect();

            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected, "{}", case.name);
            }
        });
    }
}

#[test]
fn test_encoding_is_stable() {
    let conformance = conformance();

    for case in &conformance.cases {
        let [_, bitmap] = conformance.gradients();
        assert_eq!(
            hash(&case.encode(&bitmap)),
            hash(&case.encode(&bitmap)),
            "{}",
            case.name
        );
    }
}
