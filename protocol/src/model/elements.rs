//! Hash-annotated block views.

use crate::model::block::Block;
use crate::model::types::{GenerationHash, Hash256};

/// Hash annotations for one transaction inside a block, parallel to the
/// block's transaction vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransactionElement {
    /// Canonical content hash of the transaction.
    pub entity_hash: Hash256,
    /// Hash fed to the block merkle builder.
    pub merkle_component_hash: Hash256,
}

/// A block plus its entity hash, generation hash and per-transaction
/// hash annotations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockElement {
    /// The block itself.
    pub block: Block,
    /// Canonical content hash of the block.
    pub entity_hash: Hash256,
    /// Generation hash of the block.
    pub generation_hash: GenerationHash,
    /// Per-transaction annotations, parallel to `block.transactions`.
    pub transactions: Vec<TransactionElement>,
    /// Root hashes of the state sub-caches at this block, when the
    /// producing node recorded them.
    pub sub_cache_merkle_roots: Vec<Hash256>,
}

impl BlockElement {
    /// Creates an element with empty annotations.
    pub fn new(block: Block) -> Self {
        Self {
            block,
            entity_hash: Hash256::ZERO,
            generation_hash: GenerationHash::ZERO,
            transactions: Vec::new(),
            sub_cache_merkle_roots: Vec::new(),
        }
    }
}
