/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![cfg(feature = "serde-support")]

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::codecs::ImageFormat;
use crate::config::{ColorMode, EncoderConfig};
use crate::errors::{ImageErrors, Stage};

impl Serialize for ImageFormat {
    #[allow(clippy::uninlined_format_args)]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer
    {
        serializer.serialize_str(&format!("{:?}", self))
    }
}

impl Serialize for Stage {
    #[allow(clippy::uninlined_format_args)]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer
    {
        serializer.serialize_str(&format!("{:?}", self))
    }
}

impl Serialize for ColorMode {
    #[allow(clippy::uninlined_format_args)]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer
    {
        serializer.serialize_str(&format!("{:?}", self))
    }
}

impl Serialize for EncoderConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer
    {
        let mut state = serializer.serialize_struct("EncoderConfig", 3)?;

        state.serialize_field("quality", &self.quality())?;
        state.serialize_field("effort", &self.effort())?;
        state.serialize_field("color_mode", &self.color_mode())?;

        state.end()
    }
}

impl Serialize for ImageErrors {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer
    {
        let kind = match self {
            ImageErrors::InvalidFormat { .. } => "InvalidFormat",
            ImageErrors::DecodeFailed { .. } => "DecodeFailed",
            ImageErrors::EncodeFailed { .. } => "EncodeFailed",
            ImageErrors::IndexOutOfRange { .. } => "IndexOutOfRange",
            ImageErrors::UnsupportedConfiguration { .. } => "UnsupportedConfiguration",
            ImageErrors::UnsupportedVariant { .. } => "UnsupportedVariant"
        };
        let mut state = serializer.serialize_struct("ImageErrors", 4)?;

        state.serialize_field("kind", kind)?;
        state.serialize_field("format", &self.format())?;
        state.serialize_field("stage", &self.stage())?;
        state.serialize_field("message", format!("{self:?}").trim_end())?;

        state.end()
    }
}
