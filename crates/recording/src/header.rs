use crate::errors::RecordingError;
use crate::format::PixelFormat;

/// File layout (all integers little-endian):
///
/// ```text
/// offset  size  field
///      0     8  magic "FRAMEREC"
///      8     2  version
///     10     1  colour pixel format code
///     11     1  depth pixel format code
///     12     4  width
///     16     4  height
///     20     8  colour fps (f64)
///     28     8  depth fps (f64)
///     36     8  stream length in microseconds
///     44     2  device name length, then UTF-8 bytes
///      .     2  serial number length, then UTF-8 bytes
/// ```
///
/// The header is followed by records: sequence (u64), timestamp in
/// microseconds (u64), payload length (u32), payload bytes.
pub const MAGIC: &[u8; 8] = b"FRAMEREC";
pub const VERSION: u16 = 1;

/// Offset of the stream length field, patched when a writer finishes.
pub(crate) const STREAM_LENGTH_OFFSET: u64 = 36;

/// Size of the fixed part of the header, before the two text fields.
const FIXED_SIZE: usize = 44;

/// Per-record prefix: sequence + timestamp + payload length.
pub const RECORD_PREFIX_SIZE: usize = 8 + 8 + 4;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordingHeader {
    pub device_name: String,
    pub serial_number: String,
    pub color_format: PixelFormat,
    pub depth_format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub depth_fps: f64,
    /// Zero until the writer finishes, then the playable duration.
    pub stream_length_us: u64,
}

impl RecordingHeader {
    pub fn encode(&self) -> Result<Vec<u8>, RecordingError> {
        let mut out = Vec::with_capacity(
            FIXED_SIZE + 4 + self.device_name.len() + self.serial_number.len(),
        );
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.push(self.color_format as u8);
        out.push(self.depth_format as u8);
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.fps.to_le_bytes());
        out.extend_from_slice(&self.depth_fps.to_le_bytes());
        out.extend_from_slice(&self.stream_length_us.to_le_bytes());
        put_text(&mut out, "device_name", &self.device_name)?;
        put_text(&mut out, "serial_number", &self.serial_number)?;
        Ok(out)
    }

    /// Parse the header at the start of `buf`; returns it with its encoded size.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), RecordingError> {
        let mut cursor = ByteCursor::new(buf);

        if cursor.take(MAGIC.len())? != MAGIC {
            return Err(RecordingError::BadMagic);
        }
        let version = cursor.u16()?;
        if version != VERSION {
            return Err(RecordingError::UnsupportedVersion(version));
        }

        let color_format = PixelFormat::from_u8(cursor.u8()?)?;
        let depth_format = PixelFormat::from_u8(cursor.u8()?)?;
        let width = cursor.u32()?;
        let height = cursor.u32()?;
        let fps = cursor.f64()?;
        let depth_fps = cursor.f64()?;
        let stream_length_us = cursor.u64()?;
        let device_name = cursor.text("device_name")?;
        let serial_number = cursor.text("serial_number")?;

        Ok((
            Self {
                device_name,
                serial_number,
                color_format,
                depth_format,
                width,
                height,
                fps,
                depth_fps,
                stream_length_us,
            },
            cursor.position(),
        ))
    }

    /// Nominal spacing between frames, in microseconds.
    pub fn frame_period_us(&self) -> u64 {
        if self.fps > 0.0 {
            (1_000_000.0 / self.fps).round() as u64
        } else {
            0
        }
    }
}

fn put_text(out: &mut Vec<u8>, field: &'static str, text: &str) -> Result<(), RecordingError> {
    let len = u16::try_from(text.len()).map_err(|_| RecordingError::FieldTooLong {
        field,
        len: text.len(),
    })?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(text.as_bytes());
    Ok(())
}

/// Bounds-checked little-endian reads over a byte slice.
pub(crate) struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8], RecordingError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or(RecordingError::Truncated { offset: self.pos })?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], RecordingError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, RecordingError> {
        Ok(self.array::<1>()?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16, RecordingError> {
        self.array().map(u16::from_le_bytes)
    }

    pub(crate) fn u32(&mut self) -> Result<u32, RecordingError> {
        self.array().map(u32::from_le_bytes)
    }

    pub(crate) fn u64(&mut self) -> Result<u64, RecordingError> {
        self.array().map(u64::from_le_bytes)
    }

    pub(crate) fn f64(&mut self) -> Result<f64, RecordingError> {
        self.array().map(f64::from_le_bytes)
    }

    fn text(&mut self, field: &'static str) -> Result<String, RecordingError> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| RecordingError::InvalidText { field })
    }
}
