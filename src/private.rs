// private.rs
//
// Copyright (c) 2019-2023  Douglas Lau
//
//! Private module for top-level items
use crate::convert::PixelFormat;
use crate::error::{Error, Result};
use crate::mux::Session;
use crate::neuquant::{QUALITY_MAX, QUALITY_MIN};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Color map (palette) strategy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMap {
    /// One palette learned at close from every frame.
    ///
    /// All frames must have the same dimensions.  Canonical pixels for
    /// every frame are retained until [close], so memory use grows with
    /// the total number of pixels pushed.
    ///
    /// [close]: struct.Muxer.html#method.close
    Global,
    /// One palette learned per frame, as each frame is pushed
    Local,
}

impl Default for ColorMap {
    fn default() -> Self {
        ColorMap::Local
    }
}

/// Muxer configuration
///
/// ## Example
/// ```
/// use gifmux::{ColorMap, Config};
///
/// let config = Config::new(320, 240)
///     .with_quality(5)
///     .with_color_map(ColorMap::Global)
///     .with_loop_count(3);
/// assert_eq!(config.quality(), 5);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Canvas width
    width: u16,
    /// Canvas height
    height: u16,
    /// Quantizer sample factor (1-30)
    quality: u8,
    /// Color map strategy
    color_map: ColorMap,
    /// Animation loop count (0 means forever)
    loop_count: u16,
    /// Bytes to reserve for pixel storage
    prealloc_hint: usize,
}

impl Config {
    /// Create a configuration with canvas dimensions
    pub fn new(width: u16, height: u16) -> Self {
        Config {
            width,
            height,
            quality: 10,
            color_map: ColorMap::default(),
            loop_count: 0,
            prealloc_hint: 0,
        }
    }

    /// Set quality: 1 (best, slowest) to 30 (fastest).
    ///
    /// Values outside that range are clamped.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.max(QUALITY_MIN).min(QUALITY_MAX);
        self
    }

    /// Set color map strategy
    pub fn with_color_map(mut self, color_map: ColorMap) -> Self {
        self.color_map = color_map;
        self
    }

    /// Set loop count (0 means loop forever)
    pub fn with_loop_count(mut self, loop_count: u16) -> Self {
        self.loop_count = loop_count;
        self
    }

    /// Set number of bytes to reserve for pixel storage at open
    pub fn with_prealloc_hint(mut self, prealloc_hint: usize) -> Self {
        self.prealloc_hint = prealloc_hint;
        self
    }

    /// Get canvas width
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Get canvas height
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Get quality
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Get color map strategy
    pub fn color_map(&self) -> ColorMap {
        self.color_map
    }

    /// Get loop count
    pub fn loop_count(&self) -> u16 {
        self.loop_count
    }

    /// Get preallocation hint (bytes)
    pub fn prealloc_hint(&self) -> usize {
        self.prealloc_hint
    }
}

/// Animated GIF muxer
///
/// A muxer is either closed or open.  [open] starts an encoding session,
/// [push] adds frames, and [close] finishes the file and releases all
/// memory.  A closed muxer can be opened again.
///
/// ## Example
/// ```
/// use gifmux::{Config, Muxer, PixelFormat};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut out = Vec::new();
/// let mut mux = Muxer::new();
/// mux.open_writer(&mut out, &Config::new(2, 2))?;
/// let red = [255, 0, 0].repeat(4);
/// mux.push(PixelFormat::Rgb24, &red, 2, 2, 50)?;
/// mux.close()?;
/// # drop(mux);
/// assert_eq!(&out[..6], b"GIF89a");
/// # Ok(())
/// # }
/// ```
///
/// [close]: struct.Muxer.html#method.close
/// [open]: struct.Muxer.html#method.open
/// [push]: struct.Muxer.html#method.push
pub struct Muxer<W: Write> {
    /// Open session
    session: Option<Session<W>>,
}

impl<W: Write> Default for Muxer<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl Muxer<BufWriter<File>> {
    /// Open a session writing to a file.
    ///
    /// The file is created (or truncated) only if the muxer is closed.
    pub fn open<P: AsRef<Path>>(&mut self, path: P, config: &Config)
        -> Result<()>
    {
        if self.is_open() {
            return Err(Error::AlreadyOpen);
        }
        let file = File::create(path)?;
        self.open_writer(BufWriter::new(file), config)
    }
}

impl<W: Write> Muxer<W> {
    /// Create a closed muxer
    pub fn new() -> Self {
        Muxer { session: None }
    }

    /// Open a session writing to `writer`.
    ///
    /// Writes the header, screen descriptor and loop extension.  On failure
    /// the muxer stays closed.
    pub fn open_writer(&mut self, writer: W, config: &Config) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyOpen);
        }
        self.session = Some(Session::start(writer, config)?);
        Ok(())
    }

    /// Check if a session is open
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Get the number of frames pushed in the open session
    pub fn frame_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.frame_count())
    }

    /// Push one frame.
    ///
    /// * `format` Layout of `pixels`.
    /// * `pixels` At least `width * height` pixels.
    /// * `delay_cs` Delay time, in centiseconds.
    ///
    /// With a local color map, the frame is quantized and written
    /// immediately.  With a global color map, it is buffered until
    /// [close](#method.close).
    pub fn push(&mut self, format: PixelFormat, pixels: &[u8], width: u16,
        height: u16, delay_cs: u16) -> Result<()>
    {
        let session = self.session.as_mut().ok_or(Error::NotOpen)?;
        if pixels.is_empty() || width == 0 || height == 0 {
            return Err(Error::NullOrEmptyFrame);
        }
        session.push(format, pixels, width, height, delay_cs)
    }

    /// Close the session.
    ///
    /// Buffered frames are written, then the trailer, and the writer is
    /// flushed.  The muxer is closed afterward, even on error.
    pub fn close(&mut self) -> Result<()> {
        let session = self.session.take().ok_or(Error::NotOpen)?;
        session.finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn quality_clamped() {
        assert_eq!(Config::new(1, 1).with_quality(0).quality(), 1);
        assert_eq!(Config::new(1, 1).with_quality(31).quality(), 30);
        assert_eq!(Config::new(1, 1).quality(), 10);
    }

    #[test]
    fn state_machine() {
        let mut out: Vec<u8> = vec![];
        let mut other: Vec<u8> = vec![];
        let mut mux = Muxer::new();
        let px = [1, 2, 3];
        assert!(matches!(mux.push(PixelFormat::Bgr24, &px, 1, 1, 0),
            Err(Error::NotOpen)));
        assert!(matches!(mux.close(), Err(Error::NotOpen)));
        mux.open_writer(&mut out, &Config::new(1, 1)).unwrap();
        assert!(mux.is_open());
        assert!(matches!(mux.open_writer(&mut other, &Config::new(1, 1)),
            Err(Error::AlreadyOpen)));
        assert!(matches!(mux.push(PixelFormat::Bgr24, &[], 1, 1, 0),
            Err(Error::NullOrEmptyFrame)));
        assert!(matches!(mux.push(PixelFormat::Bgr24, &px, 0, 1, 0),
            Err(Error::NullOrEmptyFrame)));
        mux.push(PixelFormat::Bgr24, &px, 1, 1, 0).unwrap();
        assert_eq!(mux.frame_count(), 1);
        mux.close().unwrap();
        assert!(!mux.is_open());
        assert_eq!(mux.frame_count(), 0);
        assert!(matches!(mux.push(PixelFormat::Bgr24, &px, 1, 1, 0),
            Err(Error::NotOpen)));
        assert!(matches!(mux.close(), Err(Error::NotOpen)));
    }

    #[test]
    fn failed_push_keeps_count() {
        let mut out: Vec<u8> = vec![];
        let mut mux = Muxer::new();
        mux.open_writer(&mut out, &Config::new(2, 2)).unwrap();
        assert!(matches!(mux.push(PixelFormat::Rgba32, &[0; 4], 2, 2, 0),
            Err(Error::FrameBufferTooSmall)));
        assert_eq!(mux.frame_count(), 0);
        mux.close().unwrap();
    }
}
