use recording::{PixelFormat, RecordingHeader};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Slowest stream accepted; keeps frame periods and pull timeouts bounded.
pub const MIN_FPS: f64 = 0.1;
/// Longest frame period handed to the producer and consumer waits.
const MAX_FRAME_PERIOD: Duration = Duration::from_secs(10);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetadataError {
    #[error("Frame rate must be a finite value of at least 0.1 fps, got {0}")]
    InvalidFrameRate(f64),

    #[error("Different frame rates for color ({color} fps) and depth ({depth} fps) streams are not supported")]
    FrameRateMismatch { color: f64, depth: f64 },

    #[error("Only 8 bit color formats are supported, got {0}")]
    UnsupportedColorFormat(&'static str),

    #[error("Only 16 bit depth formats are supported, got {0}")]
    UnsupportedDepthFormat(&'static str),
}

/// Per-session description of the stream, rebuilt on every open and seek.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamMetadata {
    pub device_name: String,
    pub serial_number: String,
    pub color_format: PixelFormat,
    pub depth_format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    #[serde(skip)]
    pub depth_fps: f64,
    #[serde(rename = "stream_length_usec")]
    pub stream_length_us: u64,
}

impl StreamMetadata {
    pub fn validate(&self) -> Result<(), MetadataError> {
        if !self.fps.is_finite() || self.fps < MIN_FPS {
            return Err(MetadataError::InvalidFrameRate(self.fps));
        }
        if self.fps != self.depth_fps {
            return Err(MetadataError::FrameRateMismatch {
                color: self.fps,
                depth: self.depth_fps,
            });
        }
        if self.color_format.bytes_per_sample() != 1 {
            return Err(MetadataError::UnsupportedColorFormat(
                self.color_format.name(),
            ));
        }
        if self.depth_format.bytes_per_sample() != 2 || self.depth_format.channels() != 1 {
            return Err(MetadataError::UnsupportedDepthFormat(
                self.depth_format.name(),
            ));
        }
        Ok(())
    }

    /// Nominal time between frames, clamped to between one millisecond and
    /// ten seconds.
    pub fn frame_period(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.fps)
            .unwrap_or(MAX_FRAME_PERIOD)
            .clamp(Duration::from_millis(1), MAX_FRAME_PERIOD)
    }

    pub fn color_frame_size(&self) -> usize {
        self.color_format.frame_size(self.width, self.height)
    }

    pub fn depth_frame_size(&self) -> usize {
        self.depth_format.frame_size(self.width, self.height)
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl From<&RecordingHeader> for StreamMetadata {
    fn from(header: &RecordingHeader) -> Self {
        Self {
            device_name: header.device_name.clone(),
            serial_number: header.serial_number.clone(),
            color_format: header.color_format,
            depth_format: header.depth_format,
            width: header.width,
            height: header.height,
            fps: header.fps,
            depth_fps: header.depth_fps,
            stream_length_us: header.stream_length_us,
        }
    }
}
