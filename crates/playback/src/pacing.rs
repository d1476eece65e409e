use std::time::{Duration, Instant};

/// Replays frames at their recorded rate.
///
/// The first frame after construction or [`PlaybackPacing::reset`] anchors
/// stream time to wall time; later frames are due at the anchor plus their
/// timestamp offset.
pub struct PlaybackPacing {
    enabled: bool,
    anchor: Option<(Instant, u64)>,
}

impl PlaybackPacing {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            anchor: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Forget the anchor, e.g. after a seek.
    pub fn reset(&mut self) {
        self.anchor = None;
    }

    /// How long to wait at `now` before presenting a frame at `timestamp_us`.
    pub fn delay_for(&mut self, timestamp_us: u64, now: Instant) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }

        match self.anchor {
            Some((start, start_us)) if timestamp_us >= start_us => {
                let due = start + Duration::from_micros(timestamp_us - start_us);
                due.saturating_duration_since(now)
            }
            _ => {
                self.anchor = Some((now, timestamp_us));
                Duration::ZERO
            }
        }
    }

    pub fn wait(&mut self, timestamp_us: u64) {
        let delay = self.delay_for(timestamp_us, Instant::now());
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}
