use crate::metadata::{MetadataError, StreamMetadata};
use crate::source::SourceError;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::path::Path;

/// Diagnostics emitted by the reader and its producer thread.
#[derive(Debug)]
pub enum ReaderEvent<'a> {
    Opened {
        path: &'a Path,
        metadata: &'a StreamMetadata,
    },
    OpenFailed {
        path: &'a Path,
        error: &'a SourceError,
    },
    InvalidMetadata {
        path: &'a Path,
        error: &'a MetadataError,
    },
    Closed {
        path: &'a Path,
    },
    ProducerStarted {
        offset_us: u64,
    },
    Resumed {
        head: u64,
        tail: u64,
    },
    Paused {
        head: u64,
        tail: u64,
    },
    FrameAccepted {
        sequence: u64,
        timestamp_us: u64,
        head: u64,
    },
    DuplicateSkipped {
        sequence: u64,
        last_accepted: u64,
    },
    /// The producer stopped pulling: timeouts or a fatal error.
    SourceExhausted {
        accepted: u64,
    },
    SourceFailed {
        error: &'a SourceError,
    },
    /// The consumer drained the last buffered frame.
    EndOfStream,
    ProducerLost,
    Seeked {
        timestamp_us: u64,
    },
    SeekRejected {
        requested_us: u64,
        duration_us: u64,
    },
    NotOpen {
        operation: &'static str,
    },
}

/// Receives [`ReaderEvent`]s from both the consumer and producer threads.
pub trait ReaderObserver: Send + Sync {
    fn on_event(&self, event: &ReaderEvent<'_>);
}

/// Default observer: logs through `tracing` and counts through the global
/// OpenTelemetry meter.
pub struct TracingObserver {
    frames_counter: Counter<u64>,
    duplicates_counter: Counter<u64>,
    pauses_counter: Counter<u64>,
    errors_counter: Counter<u64>,
}

impl TracingObserver {
    pub fn new() -> Self {
        let meter = global::meter("playback");
        let frames_counter = meter
            .u64_counter("playback_frames_accepted_total")
            .with_description("Frames written to the ring by the producer")
            .build();
        let duplicates_counter = meter
            .u64_counter("playback_frames_duplicate_total")
            .with_description("Repeated deliveries discarded by the producer")
            .build();
        let pauses_counter = meter
            .u64_counter("playback_producer_pauses_total")
            .with_description("Times the producer paused the source on a full ring")
            .build();
        let errors_counter = meter
            .u64_counter("playback_errors_total")
            .with_description("Open, source and usage errors")
            .build();

        Self {
            frames_counter,
            duplicates_counter,
            pauses_counter,
            errors_counter,
        }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderObserver for TracingObserver {
    fn on_event(&self, event: &ReaderEvent<'_>) {
        match event {
            ReaderEvent::Opened { path, metadata } => {
                tracing::info!(
                    path = %path.display(),
                    device = %metadata.device_name,
                    fps = metadata.fps,
                    stream_length_us = metadata.stream_length_us,
                    "Recording opened"
                );
            }
            ReaderEvent::OpenFailed { path, error } => {
                tracing::warn!("Unable to open {}: {}", path.display(), error);
                self.errors_counter
                    .add(1, &[KeyValue::new("kind", "open")]);
            }
            ReaderEvent::InvalidMetadata { path, error } => {
                tracing::error!("Unsupported stream in {}: {}", path.display(), error);
                self.errors_counter
                    .add(1, &[KeyValue::new("kind", "metadata")]);
            }
            ReaderEvent::Closed { path } => {
                tracing::info!(path = %path.display(), "Recording closed");
            }
            ReaderEvent::ProducerStarted { offset_us } => {
                tracing::debug!(offset_us, "Frame reader started");
            }
            ReaderEvent::Resumed { head, tail } => {
                tracing::debug!(head, tail, "Resume reading");
            }
            ReaderEvent::Paused { head, tail } => {
                tracing::debug!(head, tail, "Pause reading");
                self.pauses_counter.add(1, &[]);
            }
            ReaderEvent::FrameAccepted {
                sequence,
                timestamp_us,
                head,
            } => {
                tracing::trace!(sequence, timestamp_us, head, "Frame buffered");
                self.frames_counter.add(1, &[]);
            }
            ReaderEvent::DuplicateSkipped {
                sequence,
                last_accepted,
            } => {
                tracing::trace!(sequence, last_accepted, "Repeated frame skipped");
                self.duplicates_counter.add(1, &[]);
            }
            ReaderEvent::SourceExhausted { accepted } => {
                tracing::debug!(accepted, "Source exhausted");
            }
            ReaderEvent::SourceFailed { error } => {
                tracing::error!("Frame source failed, ending stream: {}", error);
                self.errors_counter
                    .add(1, &[KeyValue::new("kind", "source")]);
            }
            ReaderEvent::EndOfStream => {
                tracing::info!("End of stream reached");
            }
            ReaderEvent::ProducerLost => {
                tracing::error!("Frame reader thread panicked");
                self.errors_counter
                    .add(1, &[KeyValue::new("kind", "producer")]);
            }
            ReaderEvent::Seeked { timestamp_us } => {
                tracing::debug!(timestamp_us, "Seek complete");
            }
            ReaderEvent::SeekRejected {
                requested_us,
                duration_us,
            } => {
                tracing::warn!(
                    "Timestamp {} exceeds maximum {} (us)",
                    requested_us,
                    duration_us
                );
            }
            ReaderEvent::NotOpen { operation } => {
                tracing::warn!("{} called before open", operation);
                self.errors_counter
                    .add(1, &[KeyValue::new("kind", "usage")]);
            }
        }
    }
}
