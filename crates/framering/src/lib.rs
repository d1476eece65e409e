//! Fixed-capacity single-producer/single-consumer slot ring.
//!
//! Slots are indexed by two unbounded `u64` counters; only their use as slot
//! indices wraps. See [`ring`] for the publication protocol.

pub mod errors;
pub mod ring;

pub use errors::RingError;
pub use ring::{RingCursor, RingReader, RingWriter};
