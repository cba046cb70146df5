//! Spin-based reader-writer lock with writer preference and in-place
//! reader→writer promotion.
//!
//! A single 64-bit word encodes the whole lock state: a pending-writer
//! bit, an active-writer bit and a reader count. All transitions are
//! compare-and-swap loops; there are no syscalls and no queues, so the
//! lock is only suitable for short critical sections — cache reads and
//! single-info mutations, which is exactly how the caches use it.
//!
//! The pending-writer bit blocks new readers from entering, so a
//! stream of readers cannot starve a writer waiting to promote.
//!
//! Promotion consumes the reader guard and yields a writer guard, so
//! the type system rules out promoting the same guard twice. On the
//! uncontended path the promotion happens in place: the reader slot is
//! retained while the pending bit drains the other readers out. When
//! another writer is already pending, the reader slot is surrendered
//! and re-acquired once that writer finishes.

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

const PENDING_WRITER: u64 = 1 << 62;
const ACTIVE_WRITER: u64 = 1 << 63;
const WRITER_BITS: u64 = PENDING_WRITER | ACTIVE_WRITER;

/// A reader-writer spin lock owning the data it guards.
pub struct SpinReaderWriterLock<T> {
    state: AtomicU64,
    data: UnsafeCell<T>,
}

// Readers alias &T and the writer is exclusive, same contract as RwLock.
unsafe impl<T: Send> Send for SpinReaderWriterLock<T> {}
unsafe impl<T: Send + Sync> Sync for SpinReaderWriterLock<T> {}

impl<T> SpinReaderWriterLock<T> {
    /// Creates an unlocked lock around `data`.
    pub const fn new(data: T) -> Self {
        Self {
            state: AtomicU64::new(0),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquires a shared reader lock, spinning while a writer is
    /// pending or active.
    pub fn acquire_reader(&self) -> ReaderGuard<'_, T> {
        loop {
            let state = self.state.load(Ordering::Relaxed);
            if state & WRITER_BITS == 0
                && self
                    .state
                    .compare_exchange_weak(state, state + 1, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            {
                return ReaderGuard { lock: self };
            }

            std::hint::spin_loop();
        }
    }

    /// Acquires an exclusive writer lock.
    pub fn acquire_writer(&self) -> WriterGuard<'_, T> {
        self.acquire_reader().promote_to_writer()
    }

    /// Returns `true` if a writer is waiting for readers to drain.
    pub fn is_writer_pending(&self) -> bool {
        self.state.load(Ordering::Relaxed) & PENDING_WRITER != 0
    }

    /// Returns `true` if a writer holds the lock.
    pub fn is_writer_active(&self) -> bool {
        self.state.load(Ordering::Relaxed) & ACTIVE_WRITER != 0
    }
}

/// Shared guard returned by [`SpinReaderWriterLock::acquire_reader`].
pub struct ReaderGuard<'a, T> {
    lock: &'a SpinReaderWriterLock<T>,
}

impl<'a, T> ReaderGuard<'a, T> {
    /// Promotes this reader to the (sole) writer.
    ///
    /// Sets the pending bit to block new readers, then spins until this
    /// guard holds the only reader slot and flips to active.
    pub fn promote_to_writer(self) -> WriterGuard<'a, T> {
        let lock = self.lock;
        std::mem::forget(self);

        // claim the pending bit; on loss, surrender the reader slot so
        // the winning writer is not deadlocked waiting for us
        loop {
            let state = lock.state.load(Ordering::Relaxed);
            if state & WRITER_BITS == 0 {
                if lock
                    .state
                    .compare_exchange_weak(
                        state,
                        state | PENDING_WRITER,
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    )
                    .is_ok()
                {
                    break;
                }
            } else {
                lock.state.fetch_sub(1, Ordering::Release);
                loop {
                    if lock.state.load(Ordering::Relaxed) & WRITER_BITS == 0 {
                        break;
                    }
                    std::hint::spin_loop();
                }
                lock.state.fetch_add(1, Ordering::Acquire);
            }

            std::hint::spin_loop();
        }

        // wait for the other readers to drain, then activate
        loop {
            let state = lock.state.load(Ordering::Relaxed);
            if state & !WRITER_BITS == 1
                && lock
                    .state
                    .compare_exchange_weak(
                        state,
                        state | ACTIVE_WRITER,
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    )
                    .is_ok()
            {
                return WriterGuard { lock };
            }

            std::hint::spin_loop();
        }
    }
}

impl<T> Deref for ReaderGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // shared access is protected by the reader count
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for ReaderGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.state.fetch_sub(1, Ordering::Release);
    }
}

/// Exclusive guard returned by promotion or
/// [`SpinReaderWriterLock::acquire_writer`].
pub struct WriterGuard<'a, T> {
    lock: &'a SpinReaderWriterLock<T>,
}

impl<'a, T> WriterGuard<'a, T> {
    /// Demotes this writer back to a reader, clearing the writer bits
    /// while keeping the reader slot.
    pub fn demote_to_reader(self) -> ReaderGuard<'a, T> {
        let lock = self.lock;
        std::mem::forget(self);

        lock.state.fetch_sub(WRITER_BITS, Ordering::Release);
        ReaderGuard { lock }
    }
}

impl<T> Deref for WriterGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for WriterGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // exclusive access is protected by the active-writer bit
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for WriterGuard<'_, T> {
    fn drop(&mut self) {
        // clear both writer bits and the retained reader slot at once
        self.lock
            .state
            .fetch_sub(WRITER_BITS + 1, Ordering::Release);
    }
}
