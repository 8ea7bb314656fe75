// mux.rs
//
// Copyright (c) 2023  Douglas Lau
//
//! Encoding session: frame assembly for the muxer
use crate::accum::FrameAccumulator;
use crate::block::*;
use crate::convert::PixelFormat;
use crate::encode::{BlockEnc, FrameEnc};
use crate::error::Result;
use crate::neuquant::NeuQuant;
use crate::palette::{Palette, PALETTE_LEN};
use crate::private::{ColorMap, Config};
use pix::{gray::Gray8, Raster};
use std::io::Write;

/// LZW minimum code size for 256-entry color tables
const MIN_CODE_SIZE: u8 = 8;

/// Buffered population size which triggers a warning (global color map)
const LARGE_POPULATION: usize = 64 * 1024 * 1024;

/// Raster of palette indices for one frame
pub struct IndexedFrame<'a> {
    /// Palette indices
    raster: Raster<Gray8>,
    /// Palette for the indices
    palette: &'a Palette,
    /// Delay time, in centiseconds
    delay_cs: u16,
}

/// One open encoding session
pub(crate) struct Session<W: Write> {
    /// Container writer
    enc: FrameEnc<W>,
    /// Session configuration
    config: Config,
    /// Pixel storage
    accum: FrameAccumulator,
    /// Number of frames pushed
    n_frames: usize,
    /// Has the large population warning been logged?
    warned: bool,
}

impl<'a> IndexedFrame<'a> {
    /// Classify canonical pixels against a learned palette.
    ///
    /// * `nq` Quantizer which produced `palette`.
    /// * `pixels` Canonical BGR24 pixels, `width * height`.
    pub fn quantize(nq: &NeuQuant, palette: &'a Palette, pixels: &[u8],
        width: u16, height: u16, delay_cs: u16) -> Self
    {
        let mut indices = vec![0; usize::from(width) * usize::from(height)];
        nq.map_pixels(pixels, &mut indices);
        let raster = Raster::with_u8_buffer(u32::from(width),
            u32::from(height), indices);
        IndexedFrame {
            raster,
            palette,
            delay_cs,
        }
    }

    /// Get the index raster
    pub fn raster(&self) -> &Raster<Gray8> {
        &self.raster
    }

    /// Get the delay time (centiseconds)
    pub fn delay_time_cs(&self) -> u16 {
        self.delay_cs
    }

    /// Build the frame blocks
    pub fn to_frame(&self) -> Frame {
        let mut control = GraphicControl::default();
        control.set_disposal_method(DisposalMethod::Keep);
        control.set_user_input(false);
        control.set_transparent_color(None);
        control.set_delay_time_cs(self.delay_cs);
        let tbl = ColorTableConfig::new(ColorTableExistence::Present,
            PALETTE_LEN as u16);
        let image_desc = ImageDesc::default()
            .with_left(0)
            .with_top(0)
            .with_width(self.raster.width() as u16)
            .with_height(self.raster.height() as u16)
            .with_color_table_config(&tbl);
        let colors = self.palette.to_rgb_bytes();
        let data = self.raster.as_u8_slice().to_vec();
        Frame {
            graphic_control_ext: Some(control),
            image_desc,
            local_color_table: Some(LocalColorTable::with_colors(&colors)),
            image_data: ImageData::with_indices(MIN_CODE_SIZE, data),
        }
    }
}

impl<W: Write> Session<W> {
    /// Start a session, writing the preamble
    pub fn start(writer: W, config: &Config) -> Result<Self> {
        let mut accum = FrameAccumulator::default();
        accum.reset(config.prealloc_hint())?;
        let mut enc = FrameEnc::new(BlockEnc::new(writer));
        let preamble = Preamble {
            header: Header::default(),
            logical_screen_desc: LogicalScreenDesc::default()
                .with_screen_width(config.width())
                .with_screen_height(config.height())
                .with_color_resolution(8),
            loop_count_ext: Some(Application::with_loop_count(
                config.loop_count(),
            )),
        };
        enc.encode_preamble(preamble)?;
        info!("open: {}x{}, {:?} color map, quality {}, loop {}",
            config.width(), config.height(), config.color_map(),
            config.quality(), config.loop_count());
        Ok(Session {
            enc,
            config: config.clone(),
            accum,
            n_frames: 0,
            warned: false,
        })
    }

    /// Get the number of frames pushed
    pub fn frame_count(&self) -> usize {
        self.n_frames
    }

    /// Push one frame
    pub fn push(&mut self, format: PixelFormat, pixels: &[u8], width: u16,
        height: u16, delay_cs: u16) -> Result<()>
    {
        match self.config.color_map() {
            ColorMap::Local => {
                self.encode_local(format, pixels, width, height, delay_cs)?
            }
            ColorMap::Global => {
                self.accum.append_frame(format, pixels, width, height,
                    delay_cs)?;
                self.check_population();
            }
        }
        self.n_frames += 1;
        debug!("push: frame {} ({}x{}, {} cs)", self.n_frames, width, height,
            delay_cs);
        Ok(())
    }

    /// Quantize and write one frame with its own palette
    fn encode_local(&mut self, format: PixelFormat, pixels: &[u8],
        width: u16, height: u16, delay_cs: u16) -> Result<()>
    {
        let pixels = self.accum.stage_frame(format, pixels, width, height)?;
        let nq = NeuQuant::new(self.config.quality(), pixels)?;
        let palette = nq.palette();
        let frame = IndexedFrame::quantize(&nq, &palette, pixels, width,
            height, delay_cs);
        self.enc.encode_frame(frame.to_frame())
    }

    /// Log a warning when buffered pixels grow large
    fn check_population(&mut self) {
        let len = self.accum.len_bytes();
        if !self.warned && len > LARGE_POPULATION {
            warn!("global color map: {} bytes buffered in {} frames",
                len, self.accum.frame_count());
            self.warned = true;
        }
    }

    /// Quantize and write all buffered frames with one shared palette
    fn encode_global(&mut self) -> Result<()> {
        let (width, height) = match self.accum.frame_size() {
            Some(sz) => sz,
            None => return Ok(()),
        };
        let nq = NeuQuant::new(self.config.quality(), self.accum.pixels())?;
        let palette = nq.palette();
        for (pixels, delay_cs) in self.accum.frames() {
            let frame = IndexedFrame::quantize(&nq, &palette, pixels, width,
                height, delay_cs);
            self.enc.encode_frame(frame.to_frame())?;
        }
        Ok(())
    }

    /// Finish the session, consuming it.
    ///
    /// The trailer is written even if encoding buffered frames fails; the
    /// first error is returned.
    pub fn finish(mut self) -> Result<()> {
        let res = match self.config.color_map() {
            ColorMap::Global => self.encode_global(),
            ColorMap::Local => Ok(()),
        };
        let Session {
            mut enc,
            accum,
            n_frames,
            ..
        } = self;
        drop(accum);
        let fin = enc.finish();
        info!("close: {} frames", n_frames);
        res.and(fin)
    }
}
