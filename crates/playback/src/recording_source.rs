use crate::metadata::StreamMetadata;
use crate::source::{FrameSource, SourceError, SourceFrame, SourceOpener};
use recording::RecordingReader;
use std::path::Path;
use std::time::Duration;

/// [`FrameSource`] over a memory-mapped recording file.
///
/// Records are delivered in file order, repeats included; payloads are copied
/// out of the mapping.
pub struct RecordingSource {
    reader: RecordingReader,
    cursor: usize,
    position_us: u64,
    paused: bool,
}

impl RecordingSource {
    pub fn new(reader: RecordingReader) -> Self {
        Self {
            reader,
            cursor: 0,
            position_us: 0,
            paused: false,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl FrameSource for RecordingSource {
    type Payload = Vec<u8>;

    fn metadata(&self) -> StreamMetadata {
        StreamMetadata::from(self.reader.header())
    }

    fn pull_next_frame(
        &mut self,
        _timeout: Duration,
    ) -> Result<Option<SourceFrame<Vec<u8>>>, SourceError> {
        if self.paused {
            return Err(SourceError::Paused);
        }
        let Some(record) = self.reader.record(self.cursor) else {
            return Ok(None);
        };

        self.cursor += 1;
        self.position_us = record.timestamp_us;
        Ok(Some(SourceFrame {
            sequence: record.sequence,
            payload: record.data.to_vec(),
        }))
    }

    fn pause(&mut self) -> Result<(), SourceError> {
        self.paused = true;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), SourceError> {
        self.paused = false;
        Ok(())
    }

    fn seek(&mut self, offset_us: u64) -> Result<(), SourceError> {
        self.cursor = self.reader.seek_index(offset_us);
        self.position_us = offset_us;
        Ok(())
    }

    fn current_position_us(&self) -> u64 {
        self.position_us
    }

    fn stream_duration_us(&self) -> u64 {
        self.reader.header().stream_length_us
    }

    fn close(&mut self) {
        tracing::debug!(
            path = %self.reader.path().display(),
            delivered = self.cursor,
            "Recording source released"
        );
    }
}

/// Opens recording files for a [`crate::BagReader`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordingOpener;

impl SourceOpener for RecordingOpener {
    type Source = RecordingSource;

    fn open(&mut self, path: &Path) -> Result<RecordingSource, SourceError> {
        Ok(RecordingSource::new(RecordingReader::open(path)?))
    }
}
