pub mod errors;
pub mod format;
pub mod header;
pub mod reader;
pub mod writer;

pub use errors::RecordingError;
pub use format::PixelFormat;
pub use header::RecordingHeader;
pub use reader::{Record, RecordEntry, RecordingReader};
pub use writer::RecordingWriter;
