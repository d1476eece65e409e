use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Flags and wake-ups shared by the reader and its producer thread.
///
/// `eof` is stored with Release after the producer's last `head` publish, so
/// a consumer that loads it with Acquire and then finds the ring empty has
/// seen every frame. Notifiers take `lock` before notifying; a waiter checks
/// its predicate under the same lock, so no wake-up falls between the check
/// and the wait.
pub(crate) struct StreamSignals {
    streaming: AtomicBool,
    eof: AtomicBool,
    lock: Mutex<()>,
    need_frames: Condvar,
    frames_ready: Condvar,
}

impl StreamSignals {
    pub(crate) fn new() -> Self {
        Self {
            streaming: AtomicBool::new(false),
            eof: AtomicBool::new(false),
            lock: Mutex::new(()),
            need_frames: Condvar::new(),
            frames_ready: Condvar::new(),
        }
    }

    /// Arm the flags for a fresh producer.
    pub(crate) fn begin(&self) {
        self.eof.store(false, Ordering::Release);
        self.streaming.store(true, Ordering::Release);
    }

    pub(crate) fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.eof.load(Ordering::Acquire)
    }

    /// Producer side: no further frames will be published.
    pub(crate) fn mark_eof(&self) {
        self.eof.store(true, Ordering::Release);
        self.frames_published();
    }

    /// Clear the streaming flag and wake both sides.
    pub(crate) fn request_stop(&self) {
        self.streaming.store(false, Ordering::Release);
        let _guard = self.lock.lock();
        self.need_frames.notify_all();
        self.frames_ready.notify_all();
    }

    /// Consumer side: ask a paused producer to re-check the fill level.
    pub(crate) fn wake_producer(&self) {
        let _guard = self.lock.lock();
        self.need_frames.notify_one();
    }

    /// Producer side: a frame was published or the stream ended.
    pub(crate) fn frames_published(&self) {
        let _guard = self.lock.lock();
        self.frames_ready.notify_one();
    }

    /// Block the producer until the session stops or `has_room` holds.
    pub(crate) fn wait_for_room(&self, mut has_room: impl FnMut() -> bool) {
        let mut guard = self.lock.lock();
        self.need_frames
            .wait_while(&mut guard, |_| self.is_streaming() && !has_room());
    }

    /// Block the consumer for at most `timeout` until `ready` holds.
    pub(crate) fn wait_for_frames(&self, timeout: Duration, mut ready: impl FnMut() -> bool) {
        let mut guard = self.lock.lock();
        let _timed_out = self
            .frames_ready
            .wait_while_for(&mut guard, |_| !ready(), timeout);
    }
}
