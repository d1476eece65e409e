use crate::metadata::MetadataError;
use crate::source::SourceError;
use framering::RingError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("Reader is not open")]
    NotOpen,

    #[error("Failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: SourceError,
    },

    #[error("Unsupported stream: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Timestamp {requested_us}us exceeds stream length {duration_us}us")]
    SeekOutOfRange { requested_us: u64, duration_us: u64 },

    #[error("Failed to spawn producer thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("Producer thread panicked")]
    ProducerLost,

    #[error("Ring error: {0}")]
    Ring(#[from] RingError),

    #[error("Invalid reader configuration: {0}")]
    Config(&'static str),
}
