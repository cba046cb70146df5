//! # Block Storage
//!
//! The chain-sync handlers and the finalization overlay consume block
//! storage through a narrow trait; the node's persistent store lives
//! outside this crate and plugs in behind it.
//!
//! ```text
//! block_storage.rs — the storage trait and its error type
//! memory.rs        — in-memory implementation (tests, tools)
//! cache.rs         — view/modifier access over the spin RWLock
//! aggregate.rs     — block-change notification decoration
//! ```
//!
//! The only invariants consumers rely on: `chain_height()` is
//! monotonic non-decreasing and `load_block_element(h)` is idempotent
//! for committed `h`. Holding a [`cache::BlockStorageView`] pins a
//! consistent snapshot.

pub mod aggregate;
pub mod block_storage;
pub mod cache;
pub mod memory;

pub use aggregate::AggregateBlockStorage;
pub use block_storage::{BlockStorage, StorageError};
pub use cache::{BlockStorageCache, BlockStorageModifier, BlockStorageView};
pub use memory::MemoryBlockStorage;
