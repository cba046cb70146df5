//! Small shared utilities.

pub mod spin_lock;

pub use spin_lock::{ReaderGuard, SpinReaderWriterLock, WriterGuard};
