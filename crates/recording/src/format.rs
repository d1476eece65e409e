use crate::errors::RecordingError;
use serde::Serialize;

/// Sensor pixel formats a recording can declare for its colour and depth streams.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PixelFormat {
    #[serde(rename = "Z16")]
    Z16 = 1,
    #[serde(rename = "YUYV")]
    Yuyv = 2,
    #[serde(rename = "RGB8")]
    Rgb8 = 3,
    #[serde(rename = "BGR8")]
    Bgr8 = 4,
    #[serde(rename = "RGBA8")]
    Rgba8 = 5,
    #[serde(rename = "BGRA8")]
    Bgra8 = 6,
    #[serde(rename = "Y8")]
    Y8 = 7,
    #[serde(rename = "Y16")]
    Y16 = 8,
}

impl PixelFormat {
    pub fn from_u8(code: u8) -> Result<Self, RecordingError> {
        match code {
            1 => Ok(PixelFormat::Z16),
            2 => Ok(PixelFormat::Yuyv),
            3 => Ok(PixelFormat::Rgb8),
            4 => Ok(PixelFormat::Bgr8),
            5 => Ok(PixelFormat::Rgba8),
            6 => Ok(PixelFormat::Bgra8),
            7 => Ok(PixelFormat::Y8),
            8 => Ok(PixelFormat::Y16),
            other => Err(RecordingError::UnknownPixelFormat(other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PixelFormat::Z16 => "Z16",
            PixelFormat::Yuyv => "YUYV",
            PixelFormat::Rgb8 => "RGB8",
            PixelFormat::Bgr8 => "BGR8",
            PixelFormat::Rgba8 => "RGBA8",
            PixelFormat::Bgra8 => "BGRA8",
            PixelFormat::Y8 => "Y8",
            PixelFormat::Y16 => "Y16",
        }
    }

    /// Interleaved channels per pixel (YUYV counts as two).
    pub fn channels(&self) -> u8 {
        match self {
            PixelFormat::Z16 | PixelFormat::Y8 | PixelFormat::Y16 => 1,
            PixelFormat::Yuyv => 2,
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 3,
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
        }
    }

    /// Width of one channel sample in bytes.
    pub fn bytes_per_sample(&self) -> u8 {
        match self {
            PixelFormat::Z16 | PixelFormat::Y16 => 2,
            _ => 1,
        }
    }

    pub fn frame_size(&self, width: u32, height: u32) -> usize {
        width as usize
            * height as usize
            * self.channels() as usize
            * self.bytes_per_sample() as usize
    }
}
