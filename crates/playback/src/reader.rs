use crate::config::ReaderConfig;
use crate::errors::ReaderError;
use crate::metadata::StreamMetadata;
use crate::observer::{ReaderEvent, ReaderObserver, TracingObserver};
use crate::producer::{Producer, ProducerSettings};
use crate::signals::StreamSignals;
use crate::source::{FrameSource, SourceFrame, SourceOpener};
use framering::{RingError, RingReader, RingWriter};
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Reported by [`BagReader::current_timestamp_us`] while no stream is open.
pub const NOT_OPEN_TIMESTAMP: u64 = u64::MAX;

type Payload<O> = <<O as SourceOpener>::Source as FrameSource>::Payload;

/// A frame handed to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<P> {
    pub sequence: u64,
    /// Microseconds from the start of the stream.
    pub timestamp_us: u64,
    pub payload: P,
}

/// Read-only view of the playback position, usable from any thread.
#[derive(Debug, Clone)]
pub struct PositionHandle {
    position: Arc<AtomicU64>,
}

impl PositionHandle {
    pub fn timestamp_us(&self) -> u64 {
        self.position.load(Ordering::Acquire)
    }
}

struct Streaming<S> {
    path: PathBuf,
    metadata: StreamMetadata,
    producer: Producer<S>,
    eof_reported: bool,
}

enum Session<S> {
    Closed,
    Streaming(Streaming<S>),
}

/// Buffered, blocking frame reader over a pull-based source.
///
/// A background `frame-reader` thread pulls frames from the source into a
/// fixed ring, pausing the source while the ring is full. The owner of the
/// `BagReader` is the single consumer.
///
/// # Example
/// ```no_run
/// use playback::{BagReader, ReaderConfig, RecordingOpener};
///
/// let mut reader = BagReader::new(RecordingOpener, ReaderConfig::default())?;
/// reader.open("walk.frec", 0)?;
/// while let Some(frame) = reader.next_frame()? {
///     println!("{} @ {}us", frame.sequence, frame.timestamp_us);
/// }
/// # Ok::<(), playback::ReaderError>(())
/// ```
pub struct BagReader<O: SourceOpener> {
    opener: O,
    config: ReaderConfig,
    ring: RingReader<SourceFrame<Payload<O>>>,
    signals: Arc<StreamSignals>,
    observer: Arc<dyn ReaderObserver>,
    position: Arc<AtomicU64>,
    session: Session<O::Source>,
}

impl<O: SourceOpener> BagReader<O> {
    pub fn new(opener: O, config: ReaderConfig) -> Result<Self, ReaderError> {
        Self::with_observer(opener, config, Arc::new(TracingObserver::new()))
    }

    pub fn with_observer(
        opener: O,
        config: ReaderConfig,
        observer: Arc<dyn ReaderObserver>,
    ) -> Result<Self, ReaderError> {
        config.validate()?;
        let ring = RingReader::with_capacity(config.capacity)?;

        Ok(Self {
            opener,
            config,
            ring,
            signals: Arc::new(StreamSignals::new()),
            observer,
            position: Arc::new(AtomicU64::new(NOT_OPEN_TIMESTAMP)),
            session: Session::Closed,
        })
    }

    /// Open `path` and start buffering from `start_offset_us`.
    ///
    /// An open session is closed first. On failure the reader stays closed
    /// and no thread is left running.
    pub fn open(&mut self, path: impl AsRef<Path>, start_offset_us: u64) -> Result<(), ReaderError> {
        let path = path.as_ref();
        self.close();

        let source = match self.opener.open(path) {
            Ok(source) => source,
            Err(error) => {
                self.observer
                    .on_event(&ReaderEvent::OpenFailed { path, error: &error });
                return Err(ReaderError::Open {
                    path: path.to_path_buf(),
                    source: error,
                });
            }
        };

        self.start(path.to_path_buf(), source, start_offset_us)?;
        if let Session::Streaming(streaming) = &self.session {
            self.observer.on_event(&ReaderEvent::Opened {
                path,
                metadata: &streaming.metadata,
            });
        }
        Ok(())
    }

    /// Validate the source, reset the ring and spawn a producer for it.
    fn start(
        &mut self,
        path: PathBuf,
        mut source: O::Source,
        start_offset_us: u64,
    ) -> Result<(), ReaderError> {
        let metadata = source.metadata();
        if let Err(error) = metadata.validate() {
            self.observer.on_event(&ReaderEvent::InvalidMetadata {
                path: &path,
                error: &error,
            });
            source.close();
            return Err(error.into());
        }

        let writer = match self.claim_writer() {
            Ok(writer) => writer,
            Err(error) => {
                source.close();
                return Err(error.into());
            }
        };

        self.signals.begin();
        self.position.store(0, Ordering::Release);

        let settings = ProducerSettings::new(&self.config, metadata.frame_period());
        let producer = match Producer::spawn(
            source,
            writer,
            Arc::clone(&self.signals),
            Arc::clone(&self.observer),
            settings,
            start_offset_us,
        ) {
            Ok(producer) => producer,
            Err(failure) => {
                self.signals.request_stop();
                self.position.store(NOT_OPEN_TIMESTAMP, Ordering::Release);
                if let Some(mut source) = failure.source {
                    source.close();
                }
                return Err(ReaderError::Spawn(failure.error));
            }
        };

        self.session = Session::Streaming(Streaming {
            path,
            metadata,
            producer,
            eof_reported: false,
        });
        Ok(())
    }

    fn claim_writer(
        &mut self,
    ) -> Result<RingWriter<SourceFrame<Payload<O>>>, RingError> {
        self.ring.reset()?;
        self.ring.writer().ok_or(RingError::WriterActive)
    }

    /// Stop the producer and release the source. No-op when closed.
    pub fn close(&mut self) {
        let Session::Streaming(streaming) = mem::replace(&mut self.session, Session::Closed) else {
            return;
        };

        match streaming.producer.stop(&self.signals) {
            Some(mut source) => source.close(),
            None => self.observer.on_event(&ReaderEvent::ProducerLost),
        }
        self.position.store(NOT_OPEN_TIMESTAMP, Ordering::Release);
        self.observer.on_event(&ReaderEvent::Closed {
            path: &streaming.path,
        });
    }

    pub fn is_open(&self) -> bool {
        matches!(self.session, Session::Streaming(_))
    }

    /// True once the producer has finished and every buffered frame was read.
    pub fn is_end_of_stream(&self) -> bool {
        let Session::Streaming(streaming) = &self.session else {
            return false;
        };
        let finished = self.signals.is_eof() || streaming.producer.is_finished();
        finished && self.ring.is_empty()
    }

    /// Block until the next frame is buffered.
    ///
    /// Returns `Ok(None)` once the stream has ended and the ring is drained.
    pub fn next_frame(&mut self) -> Result<Option<Frame<Payload<O>>>, ReaderError> {
        let Session::Streaming(streaming) = &mut self.session else {
            self.observer.on_event(&ReaderEvent::NotOpen {
                operation: "next_frame",
            });
            return Err(ReaderError::NotOpen);
        };

        let low_water = self.config.low_water();
        let frame_period = streaming.metadata.frame_period();
        if !self.signals.is_eof() && self.ring.len() <= low_water {
            self.signals.wake_producer();
        }

        loop {
            // Load the EOF flag before looking at the ring: everything published
            // before it was set is then visible to `pop`.
            let finished = self.signals.is_eof() || streaming.producer.is_finished();

            if let Some((frame, timestamp_us)) = self.ring.pop() {
                self.position.store(timestamp_us, Ordering::Release);
                if !finished && self.ring.len() <= low_water {
                    self.signals.wake_producer();
                }
                return Ok(Some(Frame {
                    sequence: frame.sequence,
                    timestamp_us,
                    payload: frame.payload,
                }));
            }

            if finished {
                if !streaming.eof_reported {
                    streaming.eof_reported = true;
                    self.observer.on_event(&ReaderEvent::EndOfStream);
                }
                return Ok(None);
            }

            let ring = &self.ring;
            let signals = &self.signals;
            signals.wait_for_frames(frame_period, || !ring.is_empty() || signals.is_eof());
        }
    }

    /// Restart playback at `timestamp_us`.
    ///
    /// Rejected without any state change when the timestamp is at or past the
    /// end of the stream. The position reads 0 until the next frame.
    ///
    /// The source itself seeks on the producer thread, after this returns. If
    /// that seek fails the call still succeeds: the stream ends with no frames
    /// and the observer sees [`ReaderEvent::SourceFailed`].
    pub fn seek_timestamp(&mut self, timestamp_us: u64) -> Result<(), ReaderError> {
        let streaming = match mem::replace(&mut self.session, Session::Closed) {
            Session::Streaming(streaming) => streaming,
            Session::Closed => {
                self.observer.on_event(&ReaderEvent::NotOpen {
                    operation: "seek_timestamp",
                });
                return Err(ReaderError::NotOpen);
            }
        };

        let duration_us = streaming.metadata.stream_length_us;
        if timestamp_us >= duration_us {
            self.session = Session::Streaming(streaming);
            self.observer.on_event(&ReaderEvent::SeekRejected {
                requested_us: timestamp_us,
                duration_us,
            });
            return Err(ReaderError::SeekOutOfRange {
                requested_us: timestamp_us,
                duration_us,
            });
        }

        let Streaming { path, producer, .. } = streaming;
        let Some(source) = producer.stop(&self.signals) else {
            self.position.store(NOT_OPEN_TIMESTAMP, Ordering::Release);
            self.observer.on_event(&ReaderEvent::ProducerLost);
            return Err(ReaderError::ProducerLost);
        };

        if let Err(e) = self.start(path, source, timestamp_us) {
            self.position.store(NOT_OPEN_TIMESTAMP, Ordering::Release);
            return Err(e);
        }
        self.observer.on_event(&ReaderEvent::Seeked { timestamp_us });
        Ok(())
    }

    /// Timestamp of the last frame returned by [`Self::next_frame`]; 0 before
    /// the first read of a session and [`NOT_OPEN_TIMESTAMP`] while closed.
    pub fn current_timestamp_us(&self) -> u64 {
        if !self.is_open() {
            self.observer.on_event(&ReaderEvent::NotOpen {
                operation: "current_timestamp_us",
            });
        }
        self.position.load(Ordering::Acquire)
    }

    pub fn position_handle(&self) -> PositionHandle {
        PositionHandle {
            position: Arc::clone(&self.position),
        }
    }

    pub fn metadata(&self) -> Option<&StreamMetadata> {
        match &self.session {
            Session::Streaming(streaming) => Some(&streaming.metadata),
            Session::Closed => None,
        }
    }

    pub fn metadata_json(&self) -> Option<serde_json::Value> {
        self.metadata().and_then(|metadata| metadata.to_json().ok())
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.session {
            Session::Streaming(streaming) => Some(&streaming.path),
            Session::Closed => None,
        }
    }

    /// Frames produced but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }
}

impl<O: SourceOpener> Drop for BagReader<O> {
    fn drop(&mut self) {
        self.close();
    }
}
