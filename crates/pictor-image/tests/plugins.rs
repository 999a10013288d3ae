/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Still images through the uniform decoder and encoder interface
use nanorand::{Rng, WyRand};
use pictor_core::bitmap::{Bitmap, BitmapFormat};
use pictor_core::color::Color;
use pictor_core::options::DecoderOptions;
use pictor_image::codecs::png::PngWriter;
use pictor_image::{
    decoder_for, decoder_for_with_options, encoder_for, ColorMode, EncoderConfig, ImageEncoder,
    ImageErrors, ImageFormat
};

const LOSSLESS: [ImageFormat; 4] = [
    ImageFormat::Bmp,
    ImageFormat::Png,
    ImageFormat::Qoi,
    ImageFormat::WebP
];

fn gradient(alpha: bool) -> Bitmap {
    let (width, height) = (47, 33);
    let mut rgba = Vec::with_capacity(width * height * 4);

    for y in 0..height {
        for x in 0..width {
            let a = if alpha { 255 - x } else { 255 };
            rgba.extend_from_slice(&[
                (x * 255 / width) as u8,
                (y * 255 / height) as u8,
                (x + y) as u8,
                a as u8
            ]);
        }
    }
    let format = if alpha {
        BitmapFormat::Rgba8888
    } else {
        BitmapFormat::Rgbx8888
    };
    Bitmap::from_rgba(format, width, height, &rgba).unwrap()
}

fn encode(format: ImageFormat, config: EncoderConfig, bitmap: &Bitmap) -> Vec<u8> {
    encoder_for(format, config).unwrap().encode(bitmap).unwrap()
}

fn decode(data: &[u8]) -> Bitmap {
    let mut decoder = decoder_for(data).unwrap();
    decoder.frame(0).unwrap().into_bitmap()
}

fn mean_abs_diff(a: &Bitmap, b: &Bitmap) -> f64 {
    let total: u64 = a
        .to_rgb_bytes()
        .iter()
        .zip(b.to_rgb_bytes())
        .map(|(x, y)| u64::from(x.abs_diff(y)))
        .sum();
    total as f64 / (a.width() * a.height() * 3) as f64
}

#[test]
fn lossless_round_trips() {
    for alpha in [false, true] {
        let bitmap = gradient(alpha);

        for format in LOSSLESS {
            let data = encode(format, EncoderConfig::default(), &bitmap);
            let mut decoder = decoder_for(&data).unwrap();

            assert_eq!(decoder.format(), format);
            assert_eq!(decoder.size(), (47, 33));
            assert_eq!(decoder.frame_count(), 1);
            assert!(!decoder.is_animated());
            assert_eq!(decoder.loop_count(), None);

            let frame = decoder.frame(0).unwrap();
            assert_eq!(frame.duration_ms(), 0);
            assert_eq!(frame.bitmap().format(), bitmap.format(), "{format:?}");
            assert_eq!(frame.bitmap().pixels(), bitmap.pixels(), "{format:?}");
        }
    }
}

#[test]
fn lossy_formats_keep_dimensions() {
    let bitmap = gradient(false);

    for format in [ImageFormat::Jpeg, ImageFormat::WebP] {
        let config = EncoderConfig::new().set_quality(90);
        let decoded = decode(&encode(format, config, &bitmap));

        assert_eq!(decoded.size(), bitmap.size(), "{format:?}");
        assert!(!decoded.has_transparency());
        assert!(mean_abs_diff(&decoded, &bitmap) < 8.0, "{format:?}");
    }
}

#[test]
fn jpeg_drops_alpha() {
    let decoded = decode(&encode(
        ImageFormat::Jpeg,
        EncoderConfig::default(),
        &gradient(true)
    ));
    assert_eq!(decoded.format(), BitmapFormat::Rgbx8888);
    assert!(decoded.pixels().iter().all(|px| px.a == 255));
}

#[test]
fn color_modes() {
    let translucent = gradient(true);
    let opaque = gradient(false);

    let without = EncoderConfig::new().set_color_mode(ColorMode::WithoutAlpha);
    let decoded = decode(&encode(ImageFormat::Png, without, &translucent));
    assert_eq!(decoded.format(), BitmapFormat::Rgbx8888);
    assert_eq!(decoded.to_rgb_bytes(), translucent.to_rgb_bytes());

    let with = EncoderConfig::new().set_color_mode(ColorMode::WithAlpha);
    let decoded = decode(&encode(ImageFormat::Qoi, with, &opaque));
    assert_eq!(decoded.format(), BitmapFormat::Rgba8888);
    assert_eq!(decoded.pixels(), opaque.pixels());

    // auto keeps alpha only when a pixel needs it
    let opaque_rgba = Bitmap::from_rgba(BitmapFormat::Rgba8888, 47, 33, opaque.as_bytes()).unwrap();
    let decoded = decode(&encode(ImageFormat::Png, EncoderConfig::default(), &opaque_rgba));
    assert_eq!(decoded.format(), BitmapFormat::Rgbx8888);
}

#[test]
fn single_pixel_images() {
    let mut bitmap = Bitmap::new(BitmapFormat::Rgbx8888, 1, 1).unwrap();
    bitmap.set_pixel(0, 0, Color::from_rgb(12, 140, 230));

    for format in ImageFormat::ALL {
        let decoded = decode(&encode(format, EncoderConfig::default(), &bitmap));
        assert_eq!(decoded.size(), (1, 1), "{format:?}");

        if format != ImageFormat::Jpeg {
            assert_eq!(decoded.pixels(), bitmap.pixels(), "{format:?}");
        }
    }
}

#[test]
fn random_bitmaps_survive_lossless_formats() {
    let mut rng = WyRand::new_seed(0x5049_4354);

    for _ in 0..12 {
        let width = rng.generate_range(1_usize..40);
        let height = rng.generate_range(1_usize..40);
        let format = if rng.generate_range(0_u8..2) == 0 {
            BitmapFormat::Rgba8888
        } else {
            BitmapFormat::Rgbx8888
        };
        let mut rgba = vec![0; width * height * 4];
        rng.fill(&mut rgba);

        let bitmap = Bitmap::from_rgba(format, width, height, &rgba).unwrap();

        for image_format in LOSSLESS {
            let decoded = decode(&encode(image_format, EncoderConfig::default(), &bitmap));
            assert_eq!(
                decoded.pixels(),
                bitmap.pixels(),
                "{image_format:?} {width}x{height}"
            );
        }
    }
}

#[test]
fn noisy_png_round_trips() {
    let mut rng = WyRand::new_seed(0x4E4F_4953);
    let mut rgba = vec![0_u8; 64 * 64 * 4];
    rng.fill(&mut rgba);

    let bitmap = Bitmap::from_rgba(BitmapFormat::Rgba8888, 64, 64, &rgba).unwrap();
    for effort in [0, 4, 9] {
        let config = EncoderConfig::new().set_effort(effort);
        let decoded = decode(&encode(ImageFormat::Png, config, &bitmap));
        assert_eq!(decoded.pixels(), bitmap.pixels(), "effort {effort}");
    }
}

#[test]
fn encode_matches_encode_into() {
    let bitmap = gradient(true);

    for format in ImageFormat::ALL {
        let encoder = encoder_for(format, EncoderConfig::default()).unwrap();
        let whole = encoder.encode(&bitmap).unwrap();

        let mut sink = b"prefix".to_vec();
        let written = encoder.encode_into(&bitmap, &mut sink).unwrap();

        assert_eq!(written, whole.len(), "{format:?}");
        assert_eq!(&sink[..6], b"prefix");
        assert_eq!(&sink[6..], &whole[..], "{format:?}");
    }
}

#[test]
fn encoding_is_deterministic() {
    let bitmap = gradient(true);

    for format in ImageFormat::ALL {
        let config = match format {
            ImageFormat::Jpeg => EncoderConfig::new().set_quality(75),
            _ => EncoderConfig::default()
        };
        assert_eq!(
            encode(format, config, &bitmap),
            encode(format, config, &bitmap),
            "{format:?}"
        );
    }
}

#[test]
fn unsupported_configurations() {
    let cases = [
        (ImageFormat::Png, EncoderConfig::new().set_quality(50)),
        (ImageFormat::Bmp, EncoderConfig::new().set_effort(3)),
        (ImageFormat::Qoi, EncoderConfig::new().set_quality(100)),
        (ImageFormat::WebP, EncoderConfig::new().set_effort(10)),
        (ImageFormat::Jpeg, EncoderConfig::new().set_quality(0)),
        (
            ImageFormat::Jpeg,
            EncoderConfig::new().set_color_mode(ColorMode::WithAlpha)
        )
    ];
    for (format, config) in cases {
        match encoder_for(format, config) {
            Err(ImageErrors::UnsupportedConfiguration { format: f, .. }) => {
                assert_eq!(f, format)
            }
            Err(e) => panic!("{format:?}: unexpected error {e:?}"),
            Ok(_) => panic!("{format:?}: {config:?} accepted")
        }
    }
    // writers built directly check too
    let writer = PngWriter::new_with_config(EncoderConfig::new().set_quality(50));
    assert!(matches!(
        writer.encode(&gradient(false)),
        Err(ImageErrors::UnsupportedConfiguration { .. })
    ));
}

#[test]
fn frames_past_the_end() {
    let data = encode(ImageFormat::Qoi, EncoderConfig::default(), &gradient(false));
    let mut decoder = decoder_for(&data).unwrap();

    assert_eq!(
        decoder.frame(1),
        Err(ImageErrors::IndexOutOfRange {
            index:       1,
            frame_count: 1
        })
    );
    let first = decoder.frame(0).unwrap();
    assert_eq!(decoder.frame(0).unwrap(), first);
    assert_eq!(decoder.frames().unwrap(), vec![first]);
}

#[test]
fn unknown_and_corrupt_inputs() {
    let unknown: [&[u8]; 3] = [b"GIF89a\x01\x00\x01\x00", b"", b"BMP but not really"];
    for data in unknown {
        assert!(matches!(
            decoder_for(data),
            Err(ImageErrors::InvalidFormat { format: None, .. })
        ));
    }

    let mut png = encode(ImageFormat::Png, EncoderConfig::default(), &gradient(false));
    // zero width in IHDR
    png[16..20].copy_from_slice(&[0; 4]);
    match decoder_for(&png) {
        Err(e) => {
            assert!(matches!(e, ImageErrors::InvalidFormat { .. }), "{e:?}");
            assert_eq!(e.format(), Some(ImageFormat::Png));
        }
        Ok(_) => panic!("zero width image accepted")
    };
}

/// Create a decoder and decode the first frame, whichever fails first
fn decode_result(data: &[u8]) -> Result<Bitmap, ImageErrors> {
    decoder_for(data).and_then(|mut decoder| decoder.frame(0).map(|f| f.into_bitmap()))
}

#[test]
fn oversubscribed_jpeg_huffman_table() {
    let mut jpeg = encode(ImageFormat::Jpeg, EncoderConfig::default(), &gradient(false));
    assert!(decode_result(&jpeg).is_ok());

    // code counts of the luminance dc table, three codes move from length 3 to length 1
    let counts = [0_u8, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
    let start = jpeg
        .windows(counts.len())
        .position(|w| w == counts)
        .unwrap();
    jpeg[start] = 3;
    jpeg[start + 2] = 2;

    let err = decode_result(&jpeg).unwrap_err();
    assert_eq!(err.format(), Some(ImageFormat::Jpeg), "{err:?}");
}

#[test]
fn corrupted_jpeg_bytes_are_errors_not_panics() {
    let jpeg = encode(
        ImageFormat::Jpeg,
        EncoderConfig::default(),
        &gradient(false)
    );
    let mut rng = WyRand::new_seed(0x4A46_5546);

    for _ in 0..400 {
        let mut data = jpeg.clone();
        for _ in 0..3 {
            let position = rng.generate_range(2..data.len());
            data[position] = rng.generate();
        }
        // any outcome is fine as long as it is returned
        let _ = decode_result(&data);
    }
}

#[test]
fn truncated_bodies_fail_when_decoding() {
    let data = encode(ImageFormat::Qoi, EncoderConfig::default(), &gradient(false));
    let truncated = &data[..data.len() - 20];

    let mut decoder = decoder_for(truncated).unwrap();
    assert_eq!(decoder.size(), (47, 33));

    let err = decoder.frame(0).unwrap_err();
    assert!(matches!(err, ImageErrors::DecodeFailed { .. }), "{err:?}");
    assert_eq!(err.format(), Some(ImageFormat::Qoi));
    // the failure is remembered
    assert_eq!(decoder.frame(0).unwrap_err(), err);
}

#[test]
fn decoder_options_are_forwarded() {
    let data = encode(ImageFormat::Png, EncoderConfig::default(), &gradient(false));

    let options = DecoderOptions::default().set_max_width(16);
    assert!(matches!(
        decoder_for_with_options(&data, options),
        Err(ImageErrors::InvalidFormat {
            format: Some(ImageFormat::Png),
            ..
        })
    ));
    assert!(decoder_for_with_options(&data, DecoderOptions::default()).is_ok());
}
