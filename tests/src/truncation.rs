/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use pictor_image::{decoder_for, ImageErrors};

use crate::{body_start, conformance};

#[test]
fn test_truncated_headers() {
    let conformance = conformance();

    for case in &conformance.cases {
        for bitmap in conformance.gradients() {
            let data = case.encode(&bitmap);
            let body = body_start(case.format(), &data);

            for length in 0..body {
                match decoder_for(&data[..length]) {
                    Err(ImageErrors::InvalidFormat { .. }) => (),
                    Err(e) => panic!("{} cut at {length}: {e:?}", case.name),
                    Ok(_) => panic!("{} cut at {length} was accepted", case.name)
                }
            }
        }
    }
}

#[test]
fn test_truncated_bodies() {
    let conformance = conformance();

    for case in &conformance.cases {
        for bitmap in conformance.gradients() {
            let data = case.encode(&bitmap);
            let body = body_start(case.format(), &data);
            let step = ((data.len() - body) / 48).max(1);

            let lengths = (body..data.len()).step_by(step).chain([data.len() - 1]);

            for length in lengths {
                let mut decoder = decoder_for(&data[..length])
                    .unwrap_or_else(|e| panic!("{} cut at {length}: {e:?}", case.name));

                assert_eq!(decoder.size(), bitmap.size());

                match decoder.frame(0) {
                    Err(ImageErrors::DecodeFailed { format, .. }) => {
                        assert_eq!(format, case.format())
                    }
                    Err(e) => panic!("{} cut at {length}: {e:?}", case.name),
                    Ok(_) => panic!("{} cut at {length} decoded", case.name)
                }
            }
        }
    }
}
