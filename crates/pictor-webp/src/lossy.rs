/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Lossy (VP8 key frame) coding
pub mod arith;
pub mod decoder;
pub mod encoder;
pub mod filter;
pub mod predict;
pub mod tables;
pub mod transform;
