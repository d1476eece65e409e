use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Not a frame recording (bad magic)")]
    BadMagic,

    #[error("Unsupported recording version {0}")]
    UnsupportedVersion(u16),

    #[error("Unknown pixel format code {0}")]
    UnknownPixelFormat(u8),

    #[error("Recording truncated at byte {offset}")]
    Truncated { offset: usize },

    #[error("Invalid UTF-8 in {field}")]
    InvalidText { field: &'static str },

    #[error("{field} is too long ({len} bytes)")]
    FieldTooLong { field: &'static str, len: usize },

    #[error("Frame timestamp {timestamp_us}us precedes previous frame at {previous_us}us")]
    TimestampRegression { previous_us: u64, timestamp_us: u64 },
}
