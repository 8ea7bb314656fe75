// encode.rs
//
// Copyright (c) 2019-2023  Douglas Lau
//
//! Container writer for GIF89a blocks
use crate::block::*;
use crate::error::Result;
use std::io::{self, Write};

/// Block encoder
///
/// Writes [Block]s to the underlying writer as they are encoded.
///
/// [Block]: block/enum.Block.html
pub struct BlockEnc<W: Write> {
    /// Writer for output data
    writer: W,
}

/// Frame encoder
///
/// Enforces the block sequence: one [Preamble], any number of [Frame]s,
/// then a trailer written by [finish](#method.finish).
///
/// [Frame]: block/struct.Frame.html
/// [Preamble]: block/struct.Preamble.html
pub struct FrameEnc<W: Write> {
    /// Block encoder
    block_enc: BlockEnc<W>,
    /// Has the preamble been encoded?
    has_preamble: bool,
}

impl<W: Write> BlockEnc<W> {
    /// Create a new block encoder
    pub fn new(writer: W) -> Self {
        BlockEnc { writer }
    }

    /// Encode one block
    pub fn encode<B>(&mut self, block: B) -> Result<()>
    where
        B: Into<Block>,
    {
        use crate::block::Block::*;
        let mut w = &mut self.writer;
        let block = block.into();
        match &block {
            Header(b) => b.format(&mut w)?,
            LogicalScreenDesc(b) => b.format(&mut w)?,
            GraphicControl(b) => b.format(&mut w)?,
            Application(b) => b.format(&mut w)?,
            ImageDesc(b) => b.format(&mut w)?,
            LocalColorTable(b) => b.format(&mut w)?,
            ImageData(b) => b.format(&mut w)?,
            Trailer(b) => b.format(&mut w)?,
        }
        debug!("  block  : {}", block.name());
        Ok(())
    }

    /// Flush the underlying writer
    pub fn flush(&mut self) -> Result<()> {
        Ok(self.writer.flush()?)
    }
}

impl<W: Write> FrameEnc<W> {
    /// Create a new frame encoder
    pub fn new(block_enc: BlockEnc<W>) -> Self {
        FrameEnc {
            block_enc,
            has_preamble: false,
        }
    }

    /// Encode the preamble blocks
    pub fn encode_preamble(&mut self, preamble: Preamble) -> Result<()> {
        if self.has_preamble {
            return Err(io::Error::new(io::ErrorKind::InvalidInput,
                "preamble already encoded").into());
        }
        self.block_enc.encode(preamble.header)?;
        self.block_enc.encode(preamble.logical_screen_desc)?;
        if let Some(b) = preamble.loop_count_ext {
            self.block_enc.encode(b)?;
        }
        self.has_preamble = true;
        Ok(())
    }

    /// Encode one frame
    pub fn encode_frame(&mut self, frame: Frame) -> Result<()> {
        if !self.has_preamble {
            return Err(io::Error::new(io::ErrorKind::InvalidInput,
                "frame encoded before preamble").into());
        }
        if let Some(b) = frame.graphic_control_ext {
            self.block_enc.encode(b)?;
        }
        self.block_enc.encode(frame.image_desc)?;
        if let Some(b) = frame.local_color_table {
            self.block_enc.encode(b)?;
        }
        self.block_enc.encode(frame.image_data)
    }

    /// Write the trailer and flush the stream
    pub fn finish(&mut self) -> Result<()> {
        self.block_enc.encode(Trailer::default())?;
        self.block_enc.flush()
    }
}

impl Block {
    /// Get a short name for the block
    fn name(&self) -> &'static str {
        use crate::block::Block::*;
        match self {
            Header(_) => "Header",
            LogicalScreenDesc(_) => "LogicalScreenDesc",
            GraphicControl(_) => "GraphicControl",
            Application(_) => "Application",
            ImageDesc(_) => "ImageDesc",
            LocalColorTable(_) => "LocalColorTable",
            ImageData(_) => "ImageData",
            Trailer(_) => "Trailer",
        }
    }
}

impl Header {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(b"GIF")?;
        w.write_all(&self.version())
    }
}

impl LogicalScreenDesc {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut buf = Vec::with_capacity(7);
        buf.extend_from_slice(&self.screen_width().to_le_bytes());
        buf.extend_from_slice(&self.screen_height().to_le_bytes());
        buf.push(self.flags());
        buf.push(self.background_color_idx());
        buf.push(self.pixel_aspect_ratio());
        w.write_all(&buf)
    }
}

impl GraphicControl {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(BlockCode::Extension_.signature())?;
        let mut buf = Vec::with_capacity(7);
        buf.push(ExtensionCode::GraphicControl_.into());
        buf.push(4);    // block size
        buf.push(self.flags());
        buf.extend_from_slice(&self.delay_time_cs().to_le_bytes());
        buf.push(self.transparent_color_idx());
        buf.push(0);    // block size
        w.write_all(&buf)
    }
}

impl Application {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(BlockCode::Extension_.signature())?;
        w.write_all(&[ExtensionCode::Application_.into()])?;
        for c in self.app_data() {
            assert!(c.len() < 256);
            let len = c.len() as u8;
            w.write_all(&[len])?;   // block size
            w.write_all(c)?;
        }
        w.write_all(&[0])   // block size
    }
}

impl ImageDesc {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(BlockCode::ImageDesc_.signature())?;
        let mut buf = Vec::with_capacity(9);
        buf.extend_from_slice(&self.left().to_le_bytes());
        buf.extend_from_slice(&self.top().to_le_bytes());
        buf.extend_from_slice(&self.width().to_le_bytes());
        buf.extend_from_slice(&self.height().to_le_bytes());
        buf.push(self.flags());
        w.write_all(&buf)
    }
}

impl LocalColorTable {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(self.colors())
    }
}

impl ImageData {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&[self.min_code_size()])?;
        self.format_block(w)?;
        w.write_all(&[0])
    }
    fn format_block<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut bw = BlockWriter::new(w);
        self.format_data(&mut bw)?;
        bw.flush()
    }
    fn format_data<W: Write>(&self, bw: &mut BlockWriter<W>)
        -> io::Result<()>
    {
        // end code is written when the encoder drops
        let mut enc = lzw::Encoder::new(lzw::LsbWriter::new(bw),
            self.min_code_size())?;
        enc.encode_bytes(self.data())
    }
}

/// Writer which splits data into sub-blocks
struct BlockWriter<'a, W: Write> {
    writer: &'a mut W,
    buf: Vec<u8>,
}

impl<'a, W: Write> BlockWriter<'a, W> {
    fn new(writer: &'a mut W) -> Self {
        let buf = Vec::with_capacity(256);
        BlockWriter { writer, buf }
    }
}

impl<'a, W: Write> Write for BlockWriter<'a, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let remaining = 0xFF - self.buf.len();
        let consumed = remaining.min(buf.len());
        self.buf.extend_from_slice(&buf[..consumed]);
        if self.buf.len() == 0xFF {
            self.writer.write_all(&[0xFF])?;
            self.writer.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(consumed)
    }
    fn flush(&mut self) -> io::Result<()> {
        let len = self.buf.len();
        if len > 0 {
            self.writer.write_all(&[len as u8])?;
            self.writer.write_all(&self.buf[..len])?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Trailer {
    fn format<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(BlockCode::Trailer_.signature())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn preamble_bytes() {
        let mut out: Vec<u8> = vec![];
        let mut enc = FrameEnc::new(BlockEnc::new(&mut out));
        let preamble = Preamble {
            header: Header::default(),
            logical_screen_desc: LogicalScreenDesc::default()
                .with_screen_width(0x0102)
                .with_screen_height(3)
                .with_color_resolution(8),
            loop_count_ext: Some(Application::with_loop_count(5)),
        };
        enc.encode_preamble(preamble).unwrap();
        enc.finish().unwrap();
        let mut expected = b"GIF89a".to_vec();
        expected.extend_from_slice(&[0x02, 0x01, 0x03, 0x00, 0x70, 0, 0]);
        expected.extend_from_slice(&[0x21, 0xFF, 0x0B]);
        expected.extend_from_slice(b"NETSCAPE2.0");
        expected.extend_from_slice(&[0x03, 0x01, 0x05, 0x00, 0x00, 0x3B]);
        assert_eq!(out, expected);
    }

    #[test]
    fn graphic_control_bytes() {
        let mut out: Vec<u8> = vec![];
        let mut gc = GraphicControl::default();
        gc.set_disposal_method(DisposalMethod::Keep);
        gc.set_delay_time_cs(300);
        BlockEnc::new(&mut out).encode(gc).unwrap();
        assert_eq!(out, [0x21, 0xF9, 0x04, 0x04, 0x2C, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn frame_before_preamble() {
        let mut out: Vec<u8> = vec![];
        let mut enc = FrameEnc::new(BlockEnc::new(&mut out));
        let frame = Frame {
            graphic_control_ext: None,
            image_desc: ImageDesc::default().with_width(1).with_height(1),
            local_color_table: None,
            image_data: ImageData::with_indices(2, vec![0]),
        };
        assert!(enc.encode_frame(frame).is_err());
    }

    #[test]
    fn sub_blocks() {
        let mut out: Vec<u8> = vec![];
        {
            let mut bw = BlockWriter::new(&mut out);
            bw.write_all(&[7; 300]).unwrap();
            bw.flush().unwrap();
        }
        assert_eq!(out.len(), 302);
        assert_eq!(out[0], 0xFF);
        assert_eq!(out[256], 45);
    }
}
