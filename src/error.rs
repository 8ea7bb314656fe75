// error.rs
//
// Copyright (c) 2019-2023  Douglas Lau
//
use std::collections::TryReserveError;
use std::fmt;
use std::io;

/// Errors encountered while encoding
#[derive(Debug)]
pub enum Error {
    /// Container serialization or file I/O failed.
    ContainerWrite(io::Error),
    /// [open](struct.Muxer.html#method.open) called on an open muxer.
    AlreadyOpen,
    /// Operation requires an open muxer.
    NotOpen,
    /// Frame has no pixel data, or a zero dimension.
    NullOrEmptyFrame,
    /// Pixel format tag not recognized.
    UnsupportedFormat,
    /// Pixel buffer smaller than the frame dimensions require.
    FrameBufferTooSmall,
    /// Frame dimensions differ from the first frame (global color map).
    FrameSizeMismatch,
    /// Color quantizer given no pixels.
    EmptyInput,
    /// Pixel buffer could not grow.
    OutOfMemory,
}

/// Gifmux result type
pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ContainerWrite(err) => err.fmt(fmt),
            _ => fmt::Debug::fmt(self, fmt),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::ContainerWrite(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::ContainerWrite(err)
    }
}

impl From<TryReserveError> for Error {
    fn from(_err: TryReserveError) -> Self {
        Error::OutOfMemory
    }
}
