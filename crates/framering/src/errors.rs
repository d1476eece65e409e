use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    #[error("Ring capacity must be at least one slot")]
    ZeroCapacity,

    #[error("A ring writer is still alive")]
    WriterActive,
}
