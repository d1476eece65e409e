#![allow(dead_code)]

use playback::{
    FrameSource, ReaderEvent, ReaderObserver, SourceError, SourceFrame, SourceOpener,
    StreamMetadata,
};
use recording::PixelFormat;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub const FRAME_PERIOD_US: u64 = 10_000;

/// What a [`ScriptedSource`] delivers.
#[derive(Debug, Clone)]
pub struct Script {
    /// Device sequence ids in delivery order; frame `i` sits at `i * FRAME_PERIOD_US`.
    pub sequences: Vec<u64>,
    pub fail_at: Option<usize>,
    /// Seeks to any offset past the start fail.
    pub fail_seek: bool,
    pub pull_delay: Duration,
    pub fps: f64,
    pub depth_fps: f64,
}

impl Script {
    pub fn sequential(count: u64) -> Self {
        Self::with_sequences(&(1..=count).collect::<Vec<_>>())
    }

    pub fn with_sequences(sequences: &[u64]) -> Self {
        Self {
            sequences: sequences.to_vec(),
            fail_at: None,
            fail_seek: false,
            pull_delay: Duration::ZERO,
            fps: 100.0,
            depth_fps: 100.0,
        }
    }

    pub fn duration_us(&self) -> u64 {
        self.sequences.len() as u64 * FRAME_PERIOD_US
    }
}

/// Shared record of what the producer did to the source.
#[derive(Default)]
pub struct SourceLog {
    pub paused: AtomicBool,
    pub pauses: AtomicUsize,
    pub resumes: AtomicUsize,
    pub pulls: AtomicUsize,
    pub closes: AtomicUsize,
    pub seeks: Mutex<Vec<u64>>,
}

pub struct ScriptedSource {
    script: Script,
    cursor: usize,
    position_us: u64,
    paused: bool,
    log: Arc<SourceLog>,
}

impl FrameSource for ScriptedSource {
    type Payload = String;

    fn metadata(&self) -> StreamMetadata {
        StreamMetadata {
            device_name: "scripted".to_string(),
            serial_number: "0000".to_string(),
            color_format: PixelFormat::Rgb8,
            depth_format: PixelFormat::Z16,
            width: 4,
            height: 4,
            fps: self.script.fps,
            depth_fps: self.script.depth_fps,
            stream_length_us: self.script.duration_us(),
        }
    }

    fn pull_next_frame(
        &mut self,
        _timeout: Duration,
    ) -> Result<Option<SourceFrame<String>>, SourceError> {
        self.log.pulls.fetch_add(1, Ordering::Relaxed);
        if self.paused {
            return Err(SourceError::Paused);
        }
        if !self.script.pull_delay.is_zero() {
            thread::sleep(self.script.pull_delay);
        }
        if self.script.fail_at == Some(self.cursor) {
            return Err(SourceError::Device("cable unplugged".to_string()));
        }
        let Some(&sequence) = self.script.sequences.get(self.cursor) else {
            return Ok(None);
        };

        self.position_us = self.cursor as u64 * FRAME_PERIOD_US;
        self.cursor += 1;
        Ok(Some(SourceFrame {
            sequence,
            payload: format!("frame-{}", sequence),
        }))
    }

    fn pause(&mut self) -> Result<(), SourceError> {
        self.paused = true;
        self.log.paused.store(true, Ordering::Release);
        self.log.pauses.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn resume(&mut self) -> Result<(), SourceError> {
        self.paused = false;
        self.log.paused.store(false, Ordering::Release);
        self.log.resumes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn seek(&mut self, offset_us: u64) -> Result<(), SourceError> {
        if self.script.fail_seek && offset_us > 0 {
            return Err(SourceError::Device("index missing".to_string()));
        }
        self.cursor = offset_us.div_ceil(FRAME_PERIOD_US) as usize;
        self.position_us = offset_us;
        self.log.seeks.lock().unwrap().push(offset_us);
        Ok(())
    }

    fn current_position_us(&self) -> u64 {
        self.position_us
    }

    fn close(&mut self) {
        self.log.closes.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct ScriptedOpener {
    pub script: Script,
    pub log: Arc<SourceLog>,
    pub fail_open: bool,
    pub opens: usize,
}

impl ScriptedOpener {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            log: Arc::new(SourceLog::default()),
            fail_open: false,
            opens: 0,
        }
    }
}

impl SourceOpener for ScriptedOpener {
    type Source = ScriptedSource;

    fn open(&mut self, _path: &Path) -> Result<ScriptedSource, SourceError> {
        if self.fail_open {
            return Err(SourceError::Device("no such device".to_string()));
        }
        self.opens += 1;
        Ok(ScriptedSource {
            script: self.script.clone(),
            cursor: 0,
            position_us: 0,
            paused: false,
            log: Arc::clone(&self.log),
        })
    }
}

/// Observer keeping the debug rendering of every event.
#[derive(Default)]
pub struct EventLog(Mutex<Vec<String>>);

impl ReaderObserver for EventLog {
    fn on_event(&self, event: &ReaderEvent<'_>) {
        self.0.lock().unwrap().push(format!("{:?}", event));
    }
}

impl EventLog {
    pub fn count(&self, prefix: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.starts_with(prefix))
            .count()
    }
}

pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}
