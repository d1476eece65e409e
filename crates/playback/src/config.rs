use crate::errors::ReaderError;
use anyhow::Context;
use common::{env_flag, env_or};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub use common::Environment;

pub const DEFAULT_CAPACITY: usize = 32;
pub const DEFAULT_REFILL_FACTOR: usize = 4;
pub const DEFAULT_PULL_TIMEOUT_FRAMES: u32 = 10;
pub const DEFAULT_PULL_ATTEMPTS: u32 = 1;
pub const DEFAULT_OPEN_ATTEMPTS: u32 = 3;

/// Buffering and flow-control settings of a [`crate::BagReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Ring slots, fixed for the lifetime of the reader.
    pub capacity: usize,
    /// A paused producer resumes once at most `capacity / refill_factor`
    /// frames are left unread, and never while the ring is full.
    pub refill_factor: usize,
    /// Pull timeout, in frame periods.
    pub pull_timeout_frames: u32,
    /// Consecutive empty pulls before the stream counts as finished.
    pub pull_attempts: u32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            refill_factor: DEFAULT_REFILL_FACTOR,
            pull_timeout_frames: DEFAULT_PULL_TIMEOUT_FRAMES,
            pull_attempts: DEFAULT_PULL_ATTEMPTS,
        }
    }
}

impl ReaderConfig {
    pub fn from_env() -> Self {
        Self {
            capacity: env_or("BUFFER_CAPACITY", DEFAULT_CAPACITY),
            refill_factor: env_or("REFILL_FACTOR", DEFAULT_REFILL_FACTOR),
            pull_timeout_frames: env_or("PULL_TIMEOUT_FRAMES", DEFAULT_PULL_TIMEOUT_FRAMES),
            pull_attempts: env_or("PULL_ATTEMPTS", DEFAULT_PULL_ATTEMPTS),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ReaderError> {
        if self.capacity == 0 {
            return Err(ReaderError::Config("capacity must be at least 1"));
        }
        if self.refill_factor == 0 {
            return Err(ReaderError::Config("refill factor must be at least 1"));
        }
        if self.pull_timeout_frames == 0 {
            return Err(ReaderError::Config("pull timeout must be at least one frame"));
        }
        if self.pull_attempts == 0 {
            return Err(ReaderError::Config("pull attempts must be at least 1"));
        }
        Ok(())
    }

    /// Fill level at or below which a paused producer is woken. Always below
    /// capacity, so a full ring keeps the producer paused.
    pub fn low_water(&self) -> usize {
        (self.capacity / self.refill_factor.max(1)).min(self.capacity.saturating_sub(1))
    }

    pub fn pull_timeout(&self, frame_period: Duration) -> Duration {
        frame_period.saturating_mul(self.pull_timeout_frames)
    }
}

/// Settings of the `playback` binary.
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    pub environment: Environment,
    pub recording_path: PathBuf,
    pub start_offset_us: u64,
    /// Sleep between frames to replay at the recorded rate.
    pub realtime: bool,
    pub otlp_endpoint: Option<String>,
    pub open_attempts: u32,
    pub reader: ReaderConfig,
}

impl PlaybackConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();

        let recording_path = env::var("RECORDING_PATH")
            .map(PathBuf::from)
            .context("RECORDING_PATH must point at a frame recording")?;

        let otlp_endpoint = env::var("OTLP_ENDPOINT")
            .ok()
            .filter(|endpoint| !endpoint.trim().is_empty());

        let reader = ReaderConfig::from_env();
        reader.validate().context("Invalid buffer settings")?;

        Ok(Self {
            environment,
            recording_path,
            start_offset_us: env_or("START_OFFSET_US", 0),
            realtime: env_flag("REALTIME", false),
            otlp_endpoint,
            open_attempts: env_or("OPEN_ATTEMPTS", DEFAULT_OPEN_ATTEMPTS),
            reader,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: [&str; 9] = [
        "RECORDING_PATH",
        "START_OFFSET_US",
        "REALTIME",
        "OTLP_ENDPOINT",
        "BUFFER_CAPACITY",
        "REFILL_FACTOR",
        "PULL_TIMEOUT_FRAMES",
        "PULL_ATTEMPTS",
        "OPEN_ATTEMPTS",
    ];

    // SAFETY (for the env mutations below): every test touching the process
    // environment is #[serial].
    fn clear_env() {
        for key in KEYS {
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    fn test_low_water_mark() {
        assert_eq!(ReaderConfig::default().low_water(), 8);
        assert_eq!(ReaderConfig::with_capacity(4).low_water(), 1);

        let config = ReaderConfig {
            capacity: 4,
            refill_factor: 2,
            ..ReaderConfig::default()
        };
        assert_eq!(config.low_water(), 2);
    }

    #[test]
    fn test_low_water_stays_below_capacity() {
        let config = ReaderConfig {
            capacity: 4,
            refill_factor: 1,
            ..ReaderConfig::default()
        };
        assert_eq!(config.low_water(), 3);

        let config = ReaderConfig {
            capacity: 1,
            refill_factor: 1,
            ..ReaderConfig::default()
        };
        assert_eq!(config.low_water(), 0);
    }

    #[test]
    fn test_pull_timeout_scales_with_frame_period() {
        let config = ReaderConfig::default();
        assert_eq!(
            config.pull_timeout(Duration::from_millis(33)),
            Duration::from_millis(330)
        );
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        assert!(ReaderConfig::default().validate().is_ok());
        assert!(ReaderConfig::with_capacity(0).validate().is_err());

        let config = ReaderConfig {
            refill_factor: 0,
            ..ReaderConfig::default()
        };
        assert!(matches!(config.validate(), Err(ReaderError::Config(_))));

        let config = ReaderConfig {
            pull_attempts: 0,
            ..ReaderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_reader_config_from_env() {
        clear_env();
        assert_eq!(ReaderConfig::from_env(), ReaderConfig::default());

        unsafe {
            env::set_var("BUFFER_CAPACITY", "4");
            env::set_var("REFILL_FACTOR", "2");
            env::set_var("PULL_ATTEMPTS", "nonsense");
        }
        let config = ReaderConfig::from_env();
        assert_eq!(config.capacity, 4);
        assert_eq!(config.refill_factor, 2);
        assert_eq!(config.pull_attempts, DEFAULT_PULL_ATTEMPTS);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_playback_config_requires_recording_path() {
        clear_env();
        assert!(PlaybackConfig::from_env().is_err());

        unsafe {
            env::set_var("RECORDING_PATH", "/tmp/session.frec");
            env::set_var("REALTIME", "yes");
            env::set_var("START_OFFSET_US", "1500000");
            env::set_var("OTLP_ENDPOINT", " ");
        }
        let config = PlaybackConfig::from_env().unwrap();
        assert_eq!(config.recording_path, PathBuf::from("/tmp/session.frec"));
        assert!(config.realtime);
        assert_eq!(config.start_offset_us, 1_500_000);
        assert_eq!(config.otlp_endpoint, None);
        assert_eq!(config.open_attempts, DEFAULT_OPEN_ATTEMPTS);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_playback_config_rejects_zero_capacity() {
        clear_env();
        unsafe {
            env::set_var("RECORDING_PATH", "/tmp/session.frec");
            env::set_var("BUFFER_CAPACITY", "0");
        }
        assert!(PlaybackConfig::from_env().is_err());
        clear_env();
    }
}
