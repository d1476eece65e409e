use crate::errors::RecordingError;
use crate::header::{ByteCursor, RECORD_PREFIX_SIZE, RecordingHeader};
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Location of one record inside the mapped file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordEntry {
    pub sequence: u64,
    pub timestamp_us: u64,
    offset: usize,
    len: usize,
}

/// A record borrowed from the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub sequence: u64,
    pub timestamp_us: u64,
    pub data: &'a [u8],
}

/// Read-only, memory-mapped view of a recording with a timestamp index.
pub struct RecordingReader {
    _file: File,
    mmap: Mmap,
    path: PathBuf,
    header: RecordingHeader,
    index: Vec<RecordEntry>,
}

impl RecordingReader {
    /// Map `path`, parse the header and index every record.
    ///
    /// A partially written trailing record is treated as corruption.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RecordingError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;

        // memmap2 refuses empty mappings on some platforms.
        if file.metadata()?.len() == 0 {
            return Err(RecordingError::Truncated { offset: 0 });
        }

        let mmap = unsafe { MmapOptions::new().map(&file)? };
        let (header, header_size) = RecordingHeader::decode(&mmap)?;
        let index = build_index(&mmap, header_size)?;

        tracing::debug!(
            path = %path.display(),
            frames = index.len(),
            "Recording indexed"
        );

        Ok(Self {
            _file: file,
            mmap,
            path,
            header,
            index,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &RecordingHeader {
        &self.header
    }

    pub fn entries(&self) -> &[RecordEntry] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn record(&self, position: usize) -> Option<Record<'_>> {
        let entry = self.index.get(position)?;
        Some(Record {
            sequence: entry.sequence,
            timestamp_us: entry.timestamp_us,
            data: &self.mmap[entry.offset..entry.offset + entry.len],
        })
    }

    /// Position of the first record at or after `timestamp_us`
    /// (`len()` when every record is earlier).
    pub fn seek_index(&self, timestamp_us: u64) -> usize {
        self.index
            .partition_point(|entry| entry.timestamp_us < timestamp_us)
    }
}

fn build_index(buf: &[u8], start: usize) -> Result<Vec<RecordEntry>, RecordingError> {
    let mut cursor = ByteCursor::at(buf, start);
    let mut index = Vec::new();

    while cursor.remaining() > 0 {
        if cursor.remaining() < RECORD_PREFIX_SIZE {
            return Err(RecordingError::Truncated {
                offset: cursor.position(),
            });
        }
        let sequence = cursor.u64()?;
        let timestamp_us = cursor.u64()?;
        let len = cursor.u32()? as usize;
        let offset = cursor.position();
        cursor.take(len)?;

        index.push(RecordEntry {
            sequence,
            timestamp_us,
            offset,
            len,
        });
    }

    Ok(index)
}
