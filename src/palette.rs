// palette.rs
//
// Copyright (c) 2023  Douglas Lau
//
use pix::rgb::{Rgb, SRgb8};

/// Number of entries in a palette
pub const PALETTE_LEN: usize = 256;

/// Color palette with exactly 256 entries
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    /// Colors in index order
    colors: Vec<SRgb8>,
}

impl Palette {
    /// Create a palette from colors in index order.
    ///
    /// Missing entries are filled with black; extras are ignored.
    pub fn with_colors<I>(colors: I) -> Self
    where
        I: IntoIterator<Item = SRgb8>,
    {
        let mut colors: Vec<SRgb8> =
            colors.into_iter().take(PALETTE_LEN).collect();
        colors.resize(PALETTE_LEN, SRgb8::new(0, 0, 0));
        Palette { colors }
    }

    /// Get all colors in index order
    pub fn colors(&self) -> &[SRgb8] {
        &self.colors
    }

    /// Get one entry
    pub fn entry(&self, idx: u8) -> SRgb8 {
        self.colors[usize::from(idx)]
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Get color table bytes (red, green, blue for each entry)
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.colors.len() * 3);
        for clr in &self.colors {
            buf.push(u8::from(Rgb::red(*clr)));
            buf.push(u8::from(Rgb::green(*clr)));
            buf.push(u8::from(Rgb::blue(*clr)));
        }
        buf
    }
}
