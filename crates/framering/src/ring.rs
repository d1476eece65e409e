use crate::errors::RingError;
use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// SAFETY & MEMORY ORDERING:
///
/// `head` counts slots ever written, `tail` slots ever read. The writer owns
/// every slot outside `[tail, head)`, the reader owns every slot inside it.
///
/// Writer protocol:
/// 1. Load `tail` with `Ordering::Acquire` (the reader's take of the slot
///    being reused happens-before this point)
/// 2. Refuse the write if `head - tail == capacity`
/// 3. Store the item and its timestamp into slot `head % capacity`
/// 4. Publish `head + 1` with `Ordering::Release`
///
/// Reader protocol:
/// 1. Load `head` with `Ordering::Acquire`; if it moved past `tail`, the
///    slot contents and timestamp are guaranteed visible
/// 2. Take the item out of slot `tail % capacity` and read its timestamp
/// 3. Publish `tail + 1` with `Ordering::Release`, handing the slot back
///
/// Only one `RingWriter` exists at a time (`writer_claimed`), and the
/// `RingReader` is not `Clone`, so each counter has a single writer.
struct Shared<T> {
    slots: Box<[UnsafeCell<Option<T>>]>,
    timestamps: Box<[AtomicU64]>,
    head: AtomicU64,
    tail: AtomicU64,
    writer_claimed: AtomicBool,
}

// Slot access is partitioned between one writer and one reader by the
// counter protocol above.
unsafe impl<T: Send> Sync for Shared<T> {}

impl<T> Shared<T> {
    #[inline]
    fn capacity(&self) -> u64 {
        self.slots.len() as u64
    }

    #[inline]
    fn index(&self, counter: u64) -> usize {
        (counter % self.capacity()) as usize
    }
}

/// Consumer end of the ring. Owns the `tail` counter.
pub struct RingReader<T> {
    shared: Arc<Shared<T>>,
    tail: u64,
}

/// Producer end of the ring. Owns the `head` counter and releases its claim
/// when dropped.
pub struct RingWriter<T> {
    shared: Arc<Shared<T>>,
    head: u64,
}

/// Read-only view of the counters, usable from any thread.
pub struct RingCursor<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for RingCursor<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send> RingReader<T> {
    /// Allocate `capacity` empty slots. Storage is never reallocated afterwards.
    pub fn with_capacity(capacity: usize) -> Result<Self, RingError> {
        if capacity == 0 {
            return Err(RingError::ZeroCapacity);
        }

        let slots = (0..capacity).map(|_| UnsafeCell::new(None)).collect();
        let timestamps = (0..capacity).map(|_| AtomicU64::new(0)).collect();

        Ok(Self {
            shared: Arc::new(Shared {
                slots,
                timestamps,
                head: AtomicU64::new(0),
                tail: AtomicU64::new(0),
                writer_claimed: AtomicBool::new(false),
            }),
            tail: 0,
        })
    }

    /// Claim the writer role. Returns `None` while another writer is alive.
    pub fn writer(&self) -> Option<RingWriter<T>> {
        self.shared
            .writer_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;

        Some(RingWriter {
            shared: Arc::clone(&self.shared),
            head: self.shared.head.load(Ordering::Acquire),
        })
    }

    pub fn cursor(&self) -> RingCursor<T> {
        RingCursor {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Take the oldest unread item with its timestamp, or `None` when empty.
    pub fn pop(&mut self) -> Option<(T, u64)> {
        let head = self.shared.head.load(Ordering::Acquire);
        if self.tail == head {
            return None;
        }

        let idx = self.shared.index(self.tail);
        // SAFETY: tail < head, so this slot was published by the writer's
        // Release store of head (observed by the Acquire load above) and the
        // writer will not touch it again until tail moves past it.
        let item = unsafe { (*self.shared.slots[idx].get()).take() };
        let timestamp = self.shared.timestamps[idx].load(Ordering::Relaxed);

        self.tail += 1;
        self.shared.tail.store(self.tail, Ordering::Release);

        item.map(|item| (item, timestamp))
    }

    /// Drop every buffered item and rewind both counters to zero.
    ///
    /// Fails with [`RingError::WriterActive`] while a writer is alive.
    pub fn reset(&mut self) -> Result<(), RingError> {
        // Hold the writer claim for the duration of the reset.
        if self
            .shared
            .writer_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RingError::WriterActive);
        }

        for (slot, timestamp) in self.shared.slots.iter().zip(self.shared.timestamps.iter()) {
            // SAFETY: no writer exists (claim held) and the reader is borrowed
            // mutably, so nothing else can access the slot.
            unsafe { *slot.get() = None };
            timestamp.store(0, Ordering::Relaxed);
        }

        self.shared.head.store(0, Ordering::Release);
        self.shared.tail.store(0, Ordering::Release);
        self.tail = 0;

        self.shared.writer_claimed.store(false, Ordering::Release);
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.shared.slots.len()
    }

    pub fn tail(&self) -> u64 {
        self.tail
    }

    pub fn head(&self) -> u64 {
        self.shared.head.load(Ordering::Acquire)
    }

    /// Unread items, exact from the reader's side up to concurrent writes.
    pub fn len(&self) -> usize {
        (self.head() - self.tail) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Send> RingWriter<T> {
    /// Store `item` in slot `head % capacity` and publish it.
    ///
    /// Returns the new head, or hands `item` back when the ring is full.
    pub fn push(&mut self, item: T, timestamp_us: u64) -> Result<u64, T> {
        let tail = self.shared.tail.load(Ordering::Acquire);
        if self.head - tail >= self.shared.capacity() {
            return Err(item);
        }

        let idx = self.shared.index(self.head);
        // SAFETY: head - tail < capacity, so the slot lies outside the
        // reader's window [tail, head). The Acquire load of tail orders the
        // reader's earlier take of this slot before our write.
        unsafe { *self.shared.slots[idx].get() = Some(item) };
        self.shared.timestamps[idx].store(timestamp_us, Ordering::Relaxed);

        self.head += 1;
        self.shared.head.store(self.head, Ordering::Release);

        Ok(self.head)
    }

    pub fn capacity(&self) -> usize {
        self.shared.slots.len()
    }

    pub fn head(&self) -> u64 {
        self.head
    }

    pub fn tail(&self) -> u64 {
        self.shared.tail.load(Ordering::Acquire)
    }

    /// Unread items, exact from the writer's side up to concurrent reads.
    pub fn len(&self) -> usize {
        (self.head - self.tail()) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }
}

impl<T> Drop for RingWriter<T> {
    fn drop(&mut self) {
        self.shared.writer_claimed.store(false, Ordering::Release);
    }
}

impl<T> RingCursor<T> {
    pub fn head(&self) -> u64 {
        self.shared.head.load(Ordering::Acquire)
    }

    pub fn tail(&self) -> u64 {
        self.shared.tail.load(Ordering::Acquire)
    }

    /// Unread items. `tail` is loaded first so the difference never underflows;
    /// it is clamped to capacity because the two loads are not one snapshot.
    pub fn len(&self) -> usize {
        let tail = self.tail();
        let head = self.head();
        (head.saturating_sub(tail) as usize).min(self.shared.slots.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.slots.len()
    }
}
