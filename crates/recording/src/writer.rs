use crate::errors::RecordingError;
use crate::header::{RecordingHeader, STREAM_LENGTH_OFFSET};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Appends frames to a recording file.
///
/// Timestamps must be non-decreasing. [`RecordingWriter::finish`] patches the
/// stream length into the header when the caller left it at zero.
pub struct RecordingWriter {
    file: BufWriter<File>,
    header: RecordingHeader,
    frames: u64,
    last_timestamp_us: Option<u64>,
}

impl RecordingWriter {
    /// Create (or truncate) `path` and write the header.
    pub fn create(path: impl AsRef<Path>, header: RecordingHeader) -> Result<Self, RecordingError> {
        let encoded = header.encode()?;
        let mut file = BufWriter::new(File::create(path)?);
        file.write_all(&encoded)?;

        Ok(Self {
            file,
            header,
            frames: 0,
            last_timestamp_us: None,
        })
    }

    pub fn write_frame(
        &mut self,
        sequence: u64,
        timestamp_us: u64,
        data: &[u8],
    ) -> Result<(), RecordingError> {
        if let Some(previous_us) = self.last_timestamp_us
            && timestamp_us < previous_us
        {
            return Err(RecordingError::TimestampRegression {
                previous_us,
                timestamp_us,
            });
        }

        let len = u32::try_from(data.len()).map_err(|_| RecordingError::FieldTooLong {
            field: "frame payload",
            len: data.len(),
        })?;

        self.file.write_all(&sequence.to_le_bytes())?;
        self.file.write_all(&timestamp_us.to_le_bytes())?;
        self.file.write_all(&len.to_le_bytes())?;
        self.file.write_all(data)?;

        self.frames += 1;
        self.last_timestamp_us = Some(timestamp_us);
        Ok(())
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Flush everything and return the header as stored on disk.
    ///
    /// An unset stream length becomes the last timestamp plus one frame period.
    pub fn finish(mut self) -> Result<RecordingHeader, RecordingError> {
        if self.header.stream_length_us == 0 {
            self.header.stream_length_us = self
                .last_timestamp_us
                .map(|last| last + self.header.frame_period_us())
                .unwrap_or(0);
        }

        self.file.flush()?;
        let mut file = self.file.into_inner().map_err(|e| e.into_error())?;
        file.seek(SeekFrom::Start(STREAM_LENGTH_OFFSET))?;
        file.write_all(&self.header.stream_length_us.to_le_bytes())?;
        file.sync_all()?;

        tracing::debug!(
            frames = self.frames,
            stream_length_us = self.header.stream_length_us,
            "Recording finished"
        );

        Ok(self.header)
    }
}
