//! Lock-gated access to a block storage.
//!
//! Handlers hold read views while the block-range consumer commits
//! through the modifier. The spin RWLock's writer preference keeps a
//! committing writer from being starved by a stream of sync requests.

use crate::model::block::Block;
use crate::model::elements::BlockElement;
use crate::model::types::{Hash256, Height};
use crate::utils::spin_lock::{ReaderGuard, SpinReaderWriterLock, WriterGuard};

use super::block_storage::{BlockStorage, StorageError};

/// A block storage behind a reader-writer lock.
pub struct BlockStorageCache {
    lock: SpinReaderWriterLock<Box<dyn BlockStorage>>,
}

impl BlockStorageCache {
    /// Creates a cache around `storage`.
    pub fn new(storage: Box<dyn BlockStorage>) -> Self {
        Self {
            lock: SpinReaderWriterLock::new(storage),
        }
    }

    /// Acquires a read view pinning a consistent snapshot.
    pub fn view(&self) -> BlockStorageView<'_> {
        BlockStorageView {
            guard: self.lock.acquire_reader(),
        }
    }

    /// Acquires the exclusive write modifier.
    pub fn modifier(&self) -> BlockStorageModifier<'_> {
        BlockStorageModifier {
            guard: self.lock.acquire_writer(),
        }
    }
}

/// Read-only view of a block storage.
pub struct BlockStorageView<'a> {
    guard: ReaderGuard<'a, Box<dyn BlockStorage>>,
}

impl BlockStorageView<'_> {
    /// Current chain height.
    pub fn chain_height(&self) -> Height {
        self.guard.chain_height()
    }

    /// Loads the block at `height`.
    pub fn load_block(&self, height: Height) -> Result<Block, StorageError> {
        self.guard.load_block(height)
    }

    /// Loads the block element at `height`.
    pub fn load_block_element(&self, height: Height) -> Result<BlockElement, StorageError> {
        self.guard.load_block_element(height)
    }

    /// Loads up to `max_hashes` block hashes starting at `height`.
    pub fn load_hashes_from(
        &self,
        height: Height,
        max_hashes: usize,
    ) -> Result<Vec<Hash256>, StorageError> {
        self.guard.load_hashes_from(height, max_hashes)
    }
}

/// Exclusive write access to a block storage.
pub struct BlockStorageModifier<'a> {
    guard: WriterGuard<'a, Box<dyn BlockStorage>>,
}

impl BlockStorageModifier<'_> {
    /// Current chain height.
    pub fn chain_height(&self) -> Height {
        self.guard.chain_height()
    }

    /// Appends `element` at the next chain height.
    pub fn save_block(&mut self, element: BlockElement) -> Result<(), StorageError> {
        self.guard.save_block(element)
    }

    /// Drops all blocks above `height`.
    pub fn drop_blocks_after(&mut self, height: Height) -> Result<(), StorageError> {
        self.guard.drop_blocks_after(height)
    }
}
