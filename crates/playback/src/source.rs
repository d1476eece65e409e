use crate::metadata::StreamMetadata;
use recording::RecordingError;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Recording error: {0}")]
    Recording(#[from] RecordingError),

    #[error("Source is paused")]
    Paused,

    #[error("Device error: {0}")]
    Device(String),
}

/// One delivery from a source: the device sequence id and the raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFrame<P> {
    pub sequence: u64,
    pub payload: P,
}

/// A pull-based frame source driven by the producer thread.
///
/// The source moves onto the producer thread while a session streams and is
/// handed back to the reader when the thread is joined.
pub trait FrameSource: Send + 'static {
    type Payload: Send + 'static;

    fn metadata(&self) -> StreamMetadata;

    /// Wait up to `timeout` for the next delivery.
    ///
    /// `Ok(None)` means nothing arrived in time. A device may deliver the same
    /// sequence id more than once; the producer filters repeats.
    fn pull_next_frame(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<SourceFrame<Self::Payload>>, SourceError>;

    fn pause(&mut self) -> Result<(), SourceError>;

    fn resume(&mut self) -> Result<(), SourceError>;

    /// Absolute seek, in microseconds from the start of the stream.
    fn seek(&mut self, offset_us: u64) -> Result<(), SourceError>;

    /// Position of the most recent delivery, in microseconds.
    fn current_position_us(&self) -> u64;

    fn stream_duration_us(&self) -> u64 {
        self.metadata().stream_length_us
    }

    fn close(&mut self) {}
}

/// Creates sources for [`crate::BagReader::open`].
pub trait SourceOpener {
    type Source: FrameSource;

    fn open(&mut self, path: &Path) -> Result<Self::Source, SourceError>;
}
