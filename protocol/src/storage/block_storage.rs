//! Block storage trait.

use thiserror::Error;

use crate::model::block::Block;
use crate::model::elements::BlockElement;
use crate::model::types::{Hash256, Height};
use crate::model::ModelError;

/// Errors raised by block and proof storages.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no block stored at height {0}")]
    BlockNotFound(Height),

    #[error("cannot save block at height {height} when chain height is {chain_height}")]
    OutOfOrderSave { height: Height, chain_height: Height },

    #[error("no proof stored for {0}")]
    ProofNotFound(String),

    #[error("stored entity is corrupt: {0}")]
    Corrupt(#[from] ModelError),

    #[error("storage io failure: {0}")]
    Io(#[from] std::io::Error),
}

/// An append-and-load service for block elements.
///
/// Implementations persist however they like; consumers only assume
/// that `chain_height` never decreases outside `drop_blocks_after` and
/// that loads of committed heights are idempotent.
pub trait BlockStorage: Send + Sync {
    /// Current chain height.
    fn chain_height(&self) -> Height;

    /// Loads the block at `height`.
    fn load_block(&self, height: Height) -> Result<Block, StorageError>;

    /// Loads the hash-annotated block element at `height`.
    fn load_block_element(&self, height: Height) -> Result<BlockElement, StorageError>;

    /// Loads up to `max_hashes` block entity hashes starting at
    /// `height`.
    fn load_hashes_from(&self, height: Height, max_hashes: usize)
        -> Result<Vec<Hash256>, StorageError>;

    /// Appends `element` at the next chain height.
    fn save_block(&mut self, element: BlockElement) -> Result<(), StorageError>;

    /// Drops all blocks above `height`.
    fn drop_blocks_after(&mut self, height: Height) -> Result<(), StorageError>;
}
