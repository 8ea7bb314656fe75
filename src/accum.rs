// accum.rs
//
// Copyright (c) 2023  Douglas Lau
//
//! Frame accumulation for the muxer
use crate::convert::{canonical_bytes, convert, PixelFormat};
use crate::error::{Error, Result};

/// Growable byte arena for canonical pixels
#[derive(Debug, Default)]
pub struct PixelArena {
    /// Pixel bytes
    buf: Vec<u8>,
}

impl PixelArena {
    /// Reserve capacity for at least `additional` more bytes
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        self.buf.try_reserve(additional)?;
        Ok(())
    }

    /// Grow by `len` bytes, returning the new tail
    pub fn append(&mut self, len: usize) -> Result<&mut [u8]> {
        let start = self.buf.len();
        self.buf.try_reserve(len)?;
        self.buf.resize(start + len, 0);
        Ok(&mut self.buf[start..])
    }

    /// Overwrite from the start with `len` bytes, keeping capacity
    pub fn stage(&mut self, len: usize) -> Result<&mut [u8]> {
        self.buf.clear();
        self.append(len)
    }

    /// Drop the last `len` bytes
    fn truncate_tail(&mut self, len: usize) {
        let n = self.buf.len().saturating_sub(len);
        self.buf.truncate(n);
    }

    /// Get pixel bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Get number of bytes stored
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Get allocated capacity (bytes)
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Remove all bytes and free storage
    pub fn release(&mut self) {
        self.buf = Vec::new();
    }
}

/// Pixel storage and delay table for one encoding session
#[derive(Debug, Default)]
pub struct FrameAccumulator {
    /// Canonical pixels
    arena: PixelArena,
    /// Frame delays, in centiseconds (global color map only)
    delays: Vec<u16>,
    /// Dimensions of the first frame (global color map only)
    frame_size: Option<(u16, u16)>,
}

impl FrameAccumulator {
    /// Free storage and clear the delay table, then reserve `prealloc`
    /// bytes
    pub fn reset(&mut self, prealloc: usize) -> Result<()> {
        self.arena.release();
        self.delays = Vec::new();
        self.frame_size = None;
        if prealloc > 0 {
            self.arena.reserve(prealloc)?;
        }
        Ok(())
    }

    /// Convert one frame into the reusable buffer, replacing any previous
    /// frame
    pub fn stage_frame(&mut self, format: PixelFormat, pixels: &[u8],
        width: u16, height: u16) -> Result<&[u8]>
    {
        let dst = self.arena.stage(canonical_bytes(width, height))?;
        convert(format, pixels, width, height, dst)?;
        Ok(self.arena.as_slice())
    }

    /// Convert and append one frame, recording its delay
    pub fn append_frame(&mut self, format: PixelFormat, pixels: &[u8],
        width: u16, height: u16, delay_cs: u16) -> Result<()>
    {
        match self.frame_size {
            Some(sz) if sz != (width, height) => {
                return Err(Error::FrameSizeMismatch)
            }
            _ => (),
        }
        let len = canonical_bytes(width, height);
        self.delays.try_reserve(1)?;
        let dst = self.arena.append(len)?;
        if let Err(e) = convert(format, pixels, width, height, dst) {
            self.arena.truncate_tail(len);
            return Err(e);
        }
        self.delays.push(delay_cs);
        self.frame_size = Some((width, height));
        Ok(())
    }

    /// Get number of buffered frames
    pub fn frame_count(&self) -> usize {
        self.delays.len()
    }

    /// Get dimensions of buffered frames
    pub fn frame_size(&self) -> Option<(u16, u16)> {
        self.frame_size
    }

    /// Get all buffered pixels
    pub fn pixels(&self) -> &[u8] {
        self.arena.as_slice()
    }

    /// Get buffered bytes
    pub fn len_bytes(&self) -> usize {
        self.arena.len()
    }

    /// Iterate over buffered frames as (pixels, delay) in push order
    pub fn frames(&self) -> impl Iterator<Item = (&[u8], u16)> + '_ {
        let len = self.frame_size
            .map(|(w, h)| canonical_bytes(w, h))
            .unwrap_or(0)
            .max(1);
        self.arena
            .as_slice()
            .chunks(len)
            .zip(self.delays.iter().copied())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arena_growth() {
        let mut arena = PixelArena::default();
        arena.reserve(100).unwrap();
        assert!(arena.capacity() >= 100);
        arena.append(6).unwrap().copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        arena.append(3).unwrap().copy_from_slice(&[7, 8, 9]);
        assert_eq!(arena.as_slice(), &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        arena.stage(3).unwrap().copy_from_slice(&[9, 9, 9]);
        assert_eq!(arena.as_slice(), &[9, 9, 9]);
        assert!(arena.capacity() >= 9);
        arena.release();
        assert!(arena.is_empty());
        assert_eq!(arena.capacity(), 0);
    }

    #[test]
    fn global_frames() {
        let mut acc = FrameAccumulator::default();
        acc.reset(0).unwrap();
        acc.append_frame(PixelFormat::Rgb24, &[1, 2, 3, 4, 5, 6], 2, 1, 10)
            .unwrap();
        acc.append_frame(PixelFormat::Bgr24, &[7, 8, 9, 10, 11, 12], 2, 1, 20)
            .unwrap();
        assert_eq!(acc.frame_count(), 2);
        let frames: Vec<_> = acc.frames().collect();
        assert_eq!(frames[0], (&[3, 2, 1, 6, 5, 4][..], 10));
        assert_eq!(frames[1], (&[7, 8, 9, 10, 11, 12][..], 20));
        assert_eq!(acc.pixels().len(), 12);
    }

    #[test]
    fn size_mismatch() {
        let mut acc = FrameAccumulator::default();
        acc.append_frame(PixelFormat::Bgr24, &[0; 12], 2, 2, 5).unwrap();
        let res = acc.append_frame(PixelFormat::Bgr24, &[0; 9], 3, 1, 5);
        assert!(matches!(res, Err(Error::FrameSizeMismatch)));
        assert_eq!(acc.frame_count(), 1);
        assert_eq!(acc.len_bytes(), 12);
        acc.append_frame(PixelFormat::Bgr24, &[0; 12], 2, 2, 5).unwrap();
        assert_eq!(acc.frame_count(), 2);
    }

    #[test]
    fn failed_convert_leaves_no_tail() {
        let mut acc = FrameAccumulator::default();
        let res = acc.append_frame(PixelFormat::Rgba32, &[0; 7], 2, 1, 5);
        assert!(matches!(res, Err(Error::FrameBufferTooSmall)));
        assert_eq!(acc.len_bytes(), 0);
        assert_eq!(acc.frame_count(), 0);
        assert_eq!(acc.frame_size(), None);
    }

    #[test]
    fn staged_frame() {
        let mut acc = FrameAccumulator::default();
        let px = acc.stage_frame(PixelFormat::Rgba32,
            &[1, 2, 3, 255, 4, 5, 6, 255], 2, 1).unwrap();
        assert_eq!(px, &[3, 2, 1, 6, 5, 4]);
        let px = acc.stage_frame(PixelFormat::Bgr24, &[1, 2, 3], 1, 1)
            .unwrap();
        assert_eq!(px, &[1, 2, 3]);
        assert_eq!(acc.frame_count(), 0);
    }

    #[test]
    fn reset_frees() {
        let mut acc = FrameAccumulator::default();
        acc.append_frame(PixelFormat::Bgr24, &[0; 12], 2, 2, 5).unwrap();
        acc.reset(0).unwrap();
        assert_eq!(acc.frame_count(), 0);
        assert_eq!(acc.len_bytes(), 0);
        assert_eq!(acc.frame_size(), None);
    }
}
