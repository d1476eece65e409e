use crate::config::ReaderConfig;
use crate::observer::{ReaderEvent, ReaderObserver};
use crate::signals::StreamSignals;
use crate::source::{FrameSource, SourceError, SourceFrame};
use framering::RingWriter;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub(crate) const THREAD_NAME: &str = "frame-reader";

/// States of the producer thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerState {
    /// Source running, frames flowing into the ring.
    Filling,
    /// Source paused until the consumer drains to the low-water mark.
    Paused,
    /// No more frames will arrive; end of stream has been signalled.
    DrainingEof,
    Stopped,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ProducerSettings {
    pub pull_timeout: Duration,
    pub pull_attempts: u32,
    pub low_water: usize,
    /// Producer thread stack; the platform default when `None`.
    pub stack_size: Option<usize>,
}

impl ProducerSettings {
    pub(crate) fn new(config: &ReaderConfig, frame_period: Duration) -> Self {
        Self {
            pull_timeout: config.pull_timeout(frame_period),
            pull_attempts: config.pull_attempts.max(1),
            low_water: config.low_water(),
            stack_size: None,
        }
    }
}

enum Pull<P> {
    Fresh(SourceFrame<P>),
    Exhausted,
    Interrupted,
}

/// Handle to a running producer thread. Joining hands the source back.
pub(crate) struct Producer<S> {
    handle: JoinHandle<Option<S>>,
}

/// A producer thread that could not be started. The source is handed back
/// so the caller can still close it.
pub(crate) struct SpawnFailure<S> {
    pub error: io::Error,
    pub source: Option<S>,
}

impl<S: FrameSource> Producer<S> {
    pub(crate) fn spawn(
        source: S,
        writer: RingWriter<SourceFrame<S::Payload>>,
        signals: Arc<StreamSignals>,
        observer: Arc<dyn ReaderObserver>,
        settings: ProducerSettings,
        start_offset_us: u64,
    ) -> Result<Self, SpawnFailure<S>> {
        let worker = ProducerLoop {
            source,
            writer,
            signals,
            observer,
            settings,
            last_sequence: None,
            pending: None,
        };

        // The thread takes the loop out of the slot; a failed spawn leaves it there.
        let slot = Arc::new(Mutex::new(Some(worker)));
        let thread_slot = Arc::clone(&slot);

        let mut builder = thread::Builder::new().name(THREAD_NAME.to_string());
        if let Some(stack_size) = settings.stack_size {
            builder = builder.stack_size(stack_size);
        }

        match builder.spawn(move || {
            let worker = thread_slot.lock().take();
            worker.map(|worker| worker.run(start_offset_us))
        }) {
            Ok(handle) => Ok(Self { handle }),
            Err(error) => {
                let source = slot.lock().take().map(|worker| worker.source);
                Err(SpawnFailure { error, source })
            }
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the thread and take the source back; `None` if the thread panicked.
    pub(crate) fn stop(self, signals: &StreamSignals) -> Option<S> {
        signals.request_stop();
        self.handle.join().ok().flatten()
    }
}

struct ProducerLoop<S: FrameSource> {
    source: S,
    writer: RingWriter<SourceFrame<S::Payload>>,
    signals: Arc<StreamSignals>,
    observer: Arc<dyn ReaderObserver>,
    settings: ProducerSettings,
    /// Last accepted device sequence id.
    last_sequence: Option<u64>,
    /// Frame pulled but refused by a full ring; written first on resume.
    pending: Option<(SourceFrame<S::Payload>, u64)>,
}

impl<S: FrameSource> ProducerLoop<S> {
    fn run(mut self, start_offset_us: u64) -> S {
        let mut state = match self.source.seek(start_offset_us) {
            Ok(()) => {
                self.observer
                    .on_event(&ReaderEvent::ProducerStarted { offset_us: start_offset_us });
                ProducerState::Filling
            }
            Err(e) => self.fail(e),
        };

        loop {
            state = match state {
                ProducerState::Filling => self.fill(),
                ProducerState::Paused => self.pause(),
                ProducerState::DrainingEof => self.finish(),
                ProducerState::Stopped => break,
            };
        }

        self.source
    }

    fn fill(&mut self) -> ProducerState {
        if let Err(e) = self.source.resume() {
            return self.fail(e);
        }
        self.observer.on_event(&ReaderEvent::Resumed {
            head: self.writer.head(),
            tail: self.writer.tail(),
        });

        if let Some((frame, timestamp_us)) = self.pending.take()
            && !self.publish(frame, timestamp_us)
        {
            return ProducerState::Paused;
        }

        while self.signals.is_streaming() {
            if self.writer.is_full() {
                return ProducerState::Paused;
            }

            match self.next_fresh_frame() {
                Ok(Pull::Fresh(frame)) => {
                    let timestamp_us = self.source.current_position_us();
                    self.last_sequence = Some(frame.sequence);
                    if !self.publish(frame, timestamp_us) {
                        return ProducerState::Paused;
                    }
                }
                Ok(Pull::Exhausted) => return ProducerState::DrainingEof,
                Ok(Pull::Interrupted) => break,
                Err(e) => return self.fail(e),
            }
        }

        ProducerState::Paused
    }

    /// Pull until a frame newer than the last accepted one arrives.
    fn next_fresh_frame(&mut self) -> Result<Pull<S::Payload>, SourceError> {
        let mut timeouts = 0;

        loop {
            if !self.signals.is_streaming() {
                return Ok(Pull::Interrupted);
            }

            match self.source.pull_next_frame(self.settings.pull_timeout)? {
                Some(frame) if self.is_fresh(frame.sequence) => return Ok(Pull::Fresh(frame)),
                Some(frame) => {
                    self.observer.on_event(&ReaderEvent::DuplicateSkipped {
                        sequence: frame.sequence,
                        last_accepted: self.last_sequence.unwrap_or_default(),
                    });
                }
                None => {
                    timeouts += 1;
                    if timeouts >= self.settings.pull_attempts {
                        return Ok(Pull::Exhausted);
                    }
                }
            }
        }
    }

    fn is_fresh(&self, sequence: u64) -> bool {
        self.last_sequence.is_none_or(|last| sequence > last)
    }

    /// Write one frame into the ring and wake the consumer. Returns false
    /// (keeping the frame) when the ring is full.
    fn publish(&mut self, frame: SourceFrame<S::Payload>, timestamp_us: u64) -> bool {
        let sequence = frame.sequence;
        match self.writer.push(frame, timestamp_us) {
            Ok(head) => {
                self.observer.on_event(&ReaderEvent::FrameAccepted {
                    sequence,
                    timestamp_us,
                    head,
                });
                self.signals.frames_published();
                true
            }
            Err(frame) => {
                self.pending = Some((frame, timestamp_us));
                false
            }
        }
    }

    fn pause(&mut self) -> ProducerState {
        if let Err(e) = self.source.pause() {
            return self.fail(e);
        }
        self.observer.on_event(&ReaderEvent::Paused {
            head: self.writer.head(),
            tail: self.writer.tail(),
        });

        let low_water = self.settings.low_water;
        let writer = &self.writer;
        self.signals.wait_for_room(|| writer.len() <= low_water);

        if self.signals.is_streaming() {
            ProducerState::Filling
        } else {
            ProducerState::Stopped
        }
    }

    fn finish(&self) -> ProducerState {
        self.signals.mark_eof();
        self.observer.on_event(&ReaderEvent::SourceExhausted {
            accepted: self.writer.head(),
        });
        ProducerState::Stopped
    }

    fn fail(&self, error: SourceError) -> ProducerState {
        self.observer
            .on_event(&ReaderEvent::SourceFailed { error: &error });
        ProducerState::DrainingEof
    }
}
