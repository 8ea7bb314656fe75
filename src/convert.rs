// convert.rs
//
// Copyright (c) 2019-2023  Douglas Lau
//
//! Pixel format conversion to canonical BGR24
use crate::error::{Error, Result};
use std::convert::TryFrom;
use std::str::FromStr;

/// Channels in a canonical (BGR24) pixel
pub const CANONICAL_BPP: usize = 3;

/// Layout of source pixel data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Blue, green, red; 8 bits each
    Bgr24,
    /// Red, green, blue; 8 bits each
    Rgb24,
    /// Blue, green, red, alpha; 8 bits each
    Bgra32,
    /// Red, green, blue, alpha; 8 bits each
    Rgba32,
}

impl TryFrom<u8> for PixelFormat {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        use self::PixelFormat::*;
        match tag {
            0 => Ok(Bgr24),
            1 => Ok(Rgb24),
            2 => Ok(Bgra32),
            3 => Ok(Rgba32),
            _ => Err(Error::UnsupportedFormat),
        }
    }
}

impl FromStr for PixelFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        use self::PixelFormat::*;
        match s.to_ascii_lowercase().as_str() {
            "bgr24" => Ok(Bgr24),
            "rgb24" => Ok(Rgb24),
            "bgra32" => Ok(Bgra32),
            "rgba32" => Ok(Rgba32),
            _ => Err(Error::UnsupportedFormat),
        }
    }
}

impl PixelFormat {
    /// Get the number of bytes per source pixel
    pub fn bytes_per_pixel(self) -> usize {
        use self::PixelFormat::*;
        match self {
            Bgr24 | Rgb24 => 3,
            Bgra32 | Rgba32 => 4,
        }
    }

    /// Get the source buffer size for a frame
    pub fn frame_bytes(self, width: u16, height: u16) -> usize {
        usize::from(width) * usize::from(height) * self.bytes_per_pixel()
    }

    /// Is red stored before blue?
    fn red_first(self) -> bool {
        match self {
            PixelFormat::Rgb24 | PixelFormat::Rgba32 => true,
            PixelFormat::Bgr24 | PixelFormat::Bgra32 => false,
        }
    }
}

/// Get the canonical buffer size for a frame
pub fn canonical_bytes(width: u16, height: u16) -> usize {
    usize::from(width) * usize::from(height) * CANONICAL_BPP
}

/// Convert pixels to canonical BGR24.
///
/// * `src` Source pixels, at least `width * height` in `format` layout.
/// * `dst` Destination, exactly `width * height * 3` bytes.
///
/// Nothing is written unless both buffers are large enough.
pub fn convert(format: PixelFormat, src: &[u8], width: u16, height: u16,
    dst: &mut [u8]) -> Result<()>
{
    let n_bytes = canonical_bytes(width, height);
    if src.len() < format.frame_bytes(width, height) {
        return Err(Error::FrameBufferTooSmall);
    }
    if dst.len() != n_bytes {
        return Err(Error::FrameBufferTooSmall);
    }
    if format == PixelFormat::Bgr24 {
        dst.copy_from_slice(&src[..n_bytes]);
        return Ok(());
    }
    let bpp = format.bytes_per_pixel();
    let red_first = format.red_first();
    for (d, s) in dst.chunks_exact_mut(CANONICAL_BPP)
        .zip(src.chunks_exact(bpp))
    {
        if red_first {
            d[0] = s[2];
            d[1] = s[1];
            d[2] = s[0];
        } else {
            d.copy_from_slice(&s[..CANONICAL_BPP]);
        }
    }
    Ok(())
}
