// lib.rs      gifmux crate.
//
// Copyright (c) 2019-2023  Douglas Lau
//
//! Animated GIF encoding with neural-net color quantization.
//!
//! A [Muxer] accepts frames in any of four 8-bit pixel layouts, learns
//! 256-color palettes with [NeuQuant], and writes a GIF89a stream.
//!
//! [Muxer]: struct.Muxer.html
//! [NeuQuant]: struct.NeuQuant.html
#![forbid(unsafe_code)]

#[macro_use]
extern crate log;

mod accum;
pub mod block;
mod convert;
mod encode;
mod error;
mod mux;
mod neuquant;
mod palette;
mod private;

pub use crate::accum::{FrameAccumulator, PixelArena};
pub use crate::convert::{canonical_bytes, convert, PixelFormat};
pub use crate::encode::{BlockEnc, FrameEnc};
pub use crate::error::{Error, Result};
pub use crate::mux::IndexedFrame;
pub use crate::neuquant::{NeuQuant, QUALITY_MAX, QUALITY_MIN};
pub use crate::palette::{Palette, PALETTE_LEN};
pub use crate::private::{ColorMap, Config, Muxer};
