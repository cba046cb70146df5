//! Block storage decoration that publishes block changes.

use crate::model::block::Block;
use crate::model::elements::BlockElement;
use crate::model::types::{Hash256, Height};
use crate::subscribers::traits::BlockChangeSubscriber;

use super::block_storage::{BlockStorage, StorageError};

/// Delegates to an inner storage and notifies a block change
/// subscriber after every successful mutation.
///
/// The store happens first: a notified subscriber can always load the
/// block it was told about.
pub struct AggregateBlockStorage {
    storage: Box<dyn BlockStorage>,
    subscriber: Box<dyn BlockChangeSubscriber>,
}

impl AggregateBlockStorage {
    /// Creates an aggregate around `storage` and `subscriber`.
    pub fn new(
        storage: Box<dyn BlockStorage>,
        subscriber: Box<dyn BlockChangeSubscriber>,
    ) -> Self {
        Self {
            storage,
            subscriber,
        }
    }
}

impl BlockStorage for AggregateBlockStorage {
    fn chain_height(&self) -> Height {
        self.storage.chain_height()
    }

    fn load_block(&self, height: Height) -> Result<Block, StorageError> {
        self.storage.load_block(height)
    }

    fn load_block_element(&self, height: Height) -> Result<BlockElement, StorageError> {
        self.storage.load_block_element(height)
    }

    fn load_hashes_from(
        &self,
        height: Height,
        max_hashes: usize,
    ) -> Result<Vec<Hash256>, StorageError> {
        self.storage.load_hashes_from(height, max_hashes)
    }

    fn save_block(&mut self, element: BlockElement) -> Result<(), StorageError> {
        self.storage.save_block(element.clone())?;
        self.subscriber.notify_block(&element);
        Ok(())
    }

    fn drop_blocks_after(&mut self, height: Height) -> Result<(), StorageError> {
        self.storage.drop_blocks_after(height)?;
        self.subscriber.notify_drop_blocks_after(height);
        Ok(())
    }
}
