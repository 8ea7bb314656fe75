// block.rs
//
// Copyright (c) 2019  Douglas Lau
//
//! GIF89a blocks written by the container encoder

const CHANNELS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTableExistence {
    Absent,
    Present,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTableConfig {
    existence: ColorTableExistence,
    table_len: usize,   // must be between 2...256
}

impl Default for ColorTableConfig {
    fn default() -> Self {
        let existence = ColorTableExistence::Absent;
        let table_len = 2;
        ColorTableConfig { existence, table_len }
    }
}

impl ColorTableConfig {
    /// Create a color table config; `table_len` rounds up to a power of 2
    pub fn new(existence: ColorTableExistence, table_len: u16) -> Self {
        let table_len = (table_len as usize).max(2).next_power_of_two().min(256);
        ColorTableConfig { existence, table_len }
    }
    pub fn len(&self) -> usize {
        match self.existence {
            ColorTableExistence::Absent => 0,
            ColorTableExistence::Present => self.table_len,
        }
    }
    fn len_bits(&self) -> u8 {
        let sz = self.table_len;
        for b in 0..7 {
            if (sz >> (b + 1)) == 1 {
                return b;
            }
        }
        7
    }
    pub fn size_bytes(&self) -> usize {
        self.len() * CHANNELS
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DisposalMethod {
    NoAction,
    Keep,
    Background,
    Previous,
    Reserved(u8),
}

impl Default for DisposalMethod {
    fn default() -> Self {
        DisposalMethod::NoAction
    }
}

impl From<u8> for DisposalMethod {
    fn from(n: u8) -> Self {
        use self::DisposalMethod::*;
        match n & 0b0111 {
            0 => NoAction,
            1 => Keep,
            2 => Background,
            3 => Previous,
            _ => Reserved(n),
        }
    }
}

impl From<DisposalMethod> for u8 {
    fn from(d: DisposalMethod) -> Self {
        use self::DisposalMethod::*;
        match d {
            NoAction => 0,
            Keep => 1,
            Background => 2,
            Previous => 3,
            Reserved(n) => n & 0b0111,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum BlockCode {
    Extension_,
    ImageDesc_,
    Trailer_,
}

impl BlockCode {
    pub fn signature(&self) -> &'static [u8] {
        use self::BlockCode::*;
        match self {
            ImageDesc_ => b",", // (0x2C) Image separator
            Extension_ => b"!", // (0x21) Extension introducer
            Trailer_ => b";",   // (0x3B) GIF trailer
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ExtensionCode {
    GraphicControl_,
    Application_,
}

impl From<ExtensionCode> for u8 {
    fn from(t: ExtensionCode) -> Self {
        use self::ExtensionCode::*;
        match t {
            GraphicControl_ => 0xF9,
            Application_ => 0xFF,
        }
    }
}

#[derive(Debug)]
pub struct Header {
    version: [u8; 3],
}

impl Default for Header {
    fn default() -> Self {
        Header::with_version(*b"89a")
    }
}

impl Header {
    pub fn with_version(version: [u8; 3]) -> Self {
        Header { version }
    }
    pub fn version(&self) -> [u8; 3] {
        self.version
    }
}

#[derive(Debug, Default)]
pub struct LogicalScreenDesc {
    screen_width: u16,
    screen_height: u16,
    flags: u8,
    background_color_idx: u8,   // index into global color table
    pixel_aspect_ratio: u8,
}

impl LogicalScreenDesc {
    const COLOR_TABLE_PRESENT: u8  = 0b1000_0000;
    const COLOR_RESOLUTION: u8     = 0b0111_0000;

    pub fn with_screen_width(mut self, screen_width: u16) -> Self {
        self.screen_width = screen_width;
        self
    }
    pub fn screen_width(&self) -> u16 {
        self.screen_width
    }
    pub fn with_screen_height(mut self, screen_height: u16) -> Self {
        self.screen_height = screen_height;
        self
    }
    pub fn screen_height(&self) -> u16 {
        self.screen_height
    }
    pub fn flags(&self) -> u8 {
        self.flags
    }
    /// Get color resolution (bits per primary color)
    pub fn color_resolution(&self) -> u8 {
        ((self.flags & Self::COLOR_RESOLUTION) >> 4) + 1
    }
    /// Set color resolution (bits per primary color, 1-8)
    pub fn with_color_resolution(mut self, bits: u8) -> Self {
        let bits = bits.max(1).min(8) - 1;
        self.flags = (self.flags & !Self::COLOR_RESOLUTION) | (bits << 4);
        self
    }
    pub fn has_color_table(&self) -> bool {
        self.flags & Self::COLOR_TABLE_PRESENT != 0
    }
    pub fn background_color_idx(&self) -> u8 {
        self.background_color_idx
    }
    pub fn pixel_aspect_ratio(&self) -> u8 {
        self.pixel_aspect_ratio
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GraphicControl {
    flags: u8,
    delay_time_cs: u16,      // delay in centiseconds (hundredths of a second)
    transparent_color_idx: u8,
}

impl GraphicControl {
    const DISPOSAL_METHOD: u8   = 0b0001_1100;
    const USER_INPUT: u8        = 0b0000_0010;
    const TRANSPARENT_COLOR: u8 = 0b0000_0001;

    pub fn flags(&self) -> u8 {
        self.flags
    }
    pub fn disposal_method(&self) -> DisposalMethod {
        ((self.flags & Self::DISPOSAL_METHOD) >> 2).into()
    }
    pub fn set_disposal_method(&mut self, disposal_method: DisposalMethod) {
        let d: u8 = disposal_method.into();
        self.flags = (self.flags & !Self::DISPOSAL_METHOD) | (d << 2);
    }
    pub fn user_input(&self) -> bool {
        (self.flags & Self::USER_INPUT) != 0
    }
    pub fn set_user_input(&mut self, user_input: bool) {
        let u = (user_input as u8) << 1;
        self.flags = (self.flags & !Self::USER_INPUT) | u;
    }
    pub fn delay_time_cs(&self) -> u16 {
        self.delay_time_cs
    }
    pub fn set_delay_time_cs(&mut self, delay_time_cs: u16) {
        self.delay_time_cs = delay_time_cs;
    }
    pub fn transparent_color(&self) -> Option<u8> {
        if self.flags & Self::TRANSPARENT_COLOR != 0 {
            Some(self.transparent_color_idx)
        } else {
            None
        }
    }
    pub fn transparent_color_idx(&self) -> u8 {
        self.transparent_color_idx
    }
    pub fn set_transparent_color(&mut self, transparent_color: Option<u8>) {
        match transparent_color {
            Some(t) => {
                self.flags |= Self::TRANSPARENT_COLOR;
                self.transparent_color_idx = t;
            },
            None => {
                self.flags &= !Self::TRANSPARENT_COLOR;
                self.transparent_color_idx = 0;
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct Application {
    app_data: Vec<Vec<u8>>,     // sequence of sub-blocks
}

impl Application {
    pub fn with_loop_count(loop_count: u16) -> Self {
        let mut app_data = vec![];
        app_data.push(b"NETSCAPE2.0".to_vec());
        let [lo, hi] = loop_count.to_le_bytes();
        app_data.push(vec![1, lo, hi]);
        Application { app_data }
    }
    pub fn app_data(&self) -> &Vec<Vec<u8>> {
        &self.app_data
    }
}

#[derive(Debug, Default)]
pub struct ImageDesc {
    left: u16,
    top: u16,
    width: u16,
    height: u16,
    flags: u8,
}

impl ImageDesc {
    const COLOR_TABLE_PRESENT: u8  = 0b1000_0000;
    const INTERLACED: u8           = 0b0100_0000;
    const COLOR_TABLE_SIZE: u8     = 0b0000_0111;

    pub fn with_left(mut self, left: u16) -> Self {
        self.left = left;
        self
    }
    pub fn left(&self) -> u16 {
        self.left
    }
    pub fn with_top(mut self, top: u16) -> Self {
        self.top = top;
        self
    }
    pub fn top(&self) -> u16 {
        self.top
    }
    pub fn with_width(mut self, width: u16) -> Self {
        self.width = width;
        self
    }
    pub fn width(&self) -> u16 {
        self.width
    }
    pub fn with_height(mut self, height: u16) -> Self {
        self.height = height;
        self
    }
    pub fn height(&self) -> u16 {
        self.height
    }
    pub fn flags(&self) -> u8 {
        self.flags
    }
    pub fn interlaced(&self) -> bool {
        (self.flags & Self::INTERLACED) != 0
    }
    pub fn with_color_table_config(mut self, tbl: &ColorTableConfig) -> Self {
        let mut flags = self.flags & Self::INTERLACED;
        flags |= tbl.len_bits() & Self::COLOR_TABLE_SIZE;
        if tbl.existence == ColorTableExistence::Present {
            flags |= Self::COLOR_TABLE_PRESENT;
        }
        self.flags = flags;
        self
    }
}

#[derive(Debug, Default)]
pub struct LocalColorTable {
    colors: Vec<u8>,
}

impl LocalColorTable {
    pub fn with_colors(colors: &[u8]) -> Self {
        assert_eq!(colors.len() / CHANNELS * CHANNELS, colors.len());
        let colors = colors.to_vec();
        LocalColorTable { colors }
    }
    pub fn len(&self) -> usize {
        self.colors.len()
    }
    pub fn colors(&self) -> &[u8] {
        &self.colors
    }
}

#[derive(Debug)]
pub struct ImageData {
    min_code_size: u8,
    data: Vec<u8>,  // uncompressed color indices
}

impl ImageData {
    pub fn with_indices(min_code_size: u8, data: Vec<u8>) -> Self {
        ImageData { min_code_size, data }
    }
    pub fn min_code_size(&self) -> u8 {
        self.min_code_size.max(2)   // must be >= 2
    }
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[derive(Debug, Default)]
pub struct Trailer { }

#[derive(Debug)]
pub enum Block {
    Header(Header),
    LogicalScreenDesc(LogicalScreenDesc),
    GraphicControl(GraphicControl),
    Application(Application),
    ImageDesc(ImageDesc),
    LocalColorTable(LocalColorTable),
    ImageData(ImageData),
    Trailer(Trailer),
}

impl From<Header> for Block {
    fn from(b: Header) -> Self {
        Block::Header(b)
    }
}

impl From<LogicalScreenDesc> for Block {
    fn from(b: LogicalScreenDesc) -> Self {
        Block::LogicalScreenDesc(b)
    }
}

impl From<GraphicControl> for Block {
    fn from(b: GraphicControl) -> Self {
        Block::GraphicControl(b)
    }
}

impl From<Application> for Block {
    fn from(b: Application) -> Self {
        Block::Application(b)
    }
}

impl From<ImageDesc> for Block {
    fn from(b: ImageDesc) -> Self {
        Block::ImageDesc(b)
    }
}

impl From<LocalColorTable> for Block {
    fn from(b: LocalColorTable) -> Self {
        Block::LocalColorTable(b)
    }
}

impl From<ImageData> for Block {
    fn from(b: ImageData) -> Self {
        Block::ImageData(b)
    }
}

impl From<Trailer> for Block {
    fn from(b: Trailer) -> Self {
        Block::Trailer(b)
    }
}

/// Blocks at the start of a file, before any frame
#[derive(Debug, Default)]
pub struct Preamble {
    pub header: Header,
    pub logical_screen_desc: LogicalScreenDesc,
    pub loop_count_ext: Option<Application>,
}

/// Blocks for one image of an animation
#[derive(Debug)]
pub struct Frame {
    pub graphic_control_ext: Option<GraphicControl>,
    pub image_desc: ImageDesc,
    pub local_color_table: Option<LocalColorTable>,
    pub image_data: ImageData,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn block_size() {
        assert!(std::mem::size_of::<Block>() <= 40);
    }

    #[test]
    fn color_table_len() {
        let t = ColorTableConfig::new(ColorTableExistence::Present, 0); // 0-2
        assert_eq!(t.len_bits(), 0);
        let t = ColorTableConfig::new(ColorTableExistence::Present, 4); // 3-4
        assert_eq!(t.len_bits(), 1);
        let present = ColorTableExistence::Present;
        let t = ColorTableConfig::new(present, 17); // 17-32
        assert_eq!(t.len_bits(), 4);
        let t = ColorTableConfig::new(present, 256); // 129-256
        assert_eq!(t.len_bits(), 7);
        assert_eq!(t.size_bytes(), 768);
        let t = ColorTableConfig::default();
        assert_eq!(t.len_bits(), 0);
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn loop_count() {
        let b = Application::with_loop_count(0);
        assert_eq!(b.app_data()[0], b"NETSCAPE2.0".to_vec());
        assert_eq!(b.app_data()[1], vec![1, 0, 0]);
        let b = Application::with_loop_count(5);
        assert_eq!(b.app_data()[1], vec![1, 5, 0]);
        let b = Application::with_loop_count(0x1234);
        assert_eq!(b.app_data()[1], vec![1, 0x34, 0x12]);
    }

    #[test]
    fn graphic_control_flags() {
        let mut gc = GraphicControl::default();
        gc.set_disposal_method(DisposalMethod::Keep);
        assert_eq!(gc.flags(), 0b0000_0100);
        assert_eq!(gc.disposal_method(), DisposalMethod::Keep);
        gc.set_user_input(true);
        assert!(gc.user_input());
        gc.set_user_input(false);
        assert!(!gc.user_input());
        gc.set_transparent_color(Some(7));
        assert_eq!(gc.transparent_color(), Some(7));
        gc.set_transparent_color(None);
        assert_eq!(gc.transparent_color(), None);
        assert_eq!(gc.flags(), 0b0000_0100);
    }

    #[test]
    fn screen_desc_flags() {
        let d = LogicalScreenDesc::default().with_color_resolution(8);
        assert_eq!(d.flags(), 0x70);
        assert_eq!(d.color_resolution(), 8);
        assert!(!d.has_color_table());
    }

    #[test]
    fn image_desc_flags() {
        let tbl = ColorTableConfig::new(ColorTableExistence::Present, 256);
        let d = ImageDesc::default()
            .with_width(3)
            .with_height(2)
            .with_color_table_config(&tbl);
        assert_eq!(d.flags(), 0x87);
        assert!(!d.interlaced());
        assert_eq!((d.width(), d.height()), (3, 2));
    }
}
