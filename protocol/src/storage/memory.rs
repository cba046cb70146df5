//! In-memory block storage.
//!
//! Backs tests and offline tools. Heights map directly onto a vector:
//! the element at index `i` is the block at height `i + 1`.

use crate::model::block::Block;
use crate::model::elements::BlockElement;
use crate::model::types::{Hash256, Height};

use super::block_storage::{BlockStorage, StorageError};

/// Vector-backed block storage.
#[derive(Default)]
pub struct MemoryBlockStorage {
    elements: Vec<BlockElement>,
}

impl MemoryBlockStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage seeded with `elements`, which must be at
    /// consecutive heights starting at 1.
    pub fn with_elements(elements: Vec<BlockElement>) -> Self {
        Self { elements }
    }

    fn index_of(&self, height: Height) -> Result<usize, StorageError> {
        let raw = height.unwrap();
        if raw == 0 || raw > self.elements.len() as u64 {
            return Err(StorageError::BlockNotFound(height));
        }

        Ok((raw - 1) as usize)
    }
}

impl BlockStorage for MemoryBlockStorage {
    fn chain_height(&self) -> Height {
        Height(self.elements.len() as u64)
    }

    fn load_block(&self, height: Height) -> Result<Block, StorageError> {
        Ok(self.elements[self.index_of(height)?].block.clone())
    }

    fn load_block_element(&self, height: Height) -> Result<BlockElement, StorageError> {
        Ok(self.elements[self.index_of(height)?].clone())
    }

    fn load_hashes_from(
        &self,
        height: Height,
        max_hashes: usize,
    ) -> Result<Vec<Hash256>, StorageError> {
        let start = self.index_of(height)?;
        Ok(self.elements[start..]
            .iter()
            .take(max_hashes)
            .map(|element| element.entity_hash)
            .collect())
    }

    fn save_block(&mut self, element: BlockElement) -> Result<(), StorageError> {
        let chain_height = self.chain_height();
        if element.block.header.height != chain_height + 1 {
            return Err(StorageError::OutOfOrderSave {
                height: element.block.header.height,
                chain_height,
            });
        }

        self.elements.push(element);
        Ok(())
    }

    fn drop_blocks_after(&mut self, height: Height) -> Result<(), StorageError> {
        self.elements.truncate(height.unwrap() as usize);
        Ok(())
    }
}
