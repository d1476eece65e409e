pub mod config;
pub mod errors;
pub mod metadata;
pub mod observer;
pub mod pacing;
pub mod producer;
pub mod reader;
pub mod recording_source;
pub mod source;

mod signals;

pub use config::{PlaybackConfig, ReaderConfig};
pub use errors::ReaderError;
pub use metadata::{MetadataError, StreamMetadata};
pub use observer::{ReaderEvent, ReaderObserver, TracingObserver};
pub use pacing::PlaybackPacing;
pub use producer::ProducerState;
pub use reader::{BagReader, Frame, NOT_OPEN_TIMESTAMP, PositionHandle};
pub use recording_source::{RecordingOpener, RecordingSource};
pub use source::{FrameSource, SourceError, SourceFrame, SourceOpener};
