//! Prevote-chain patcher.
//!
//! When a round finalizes a block the prevoted chain holds but the
//! local chain does not, the backed-up prevote blocks are fed into the
//! block-range consumer so the local chain can adopt the finalized
//! branch.

use std::sync::Arc;

use crate::model::block::Block;
use crate::model::types::{FinalizationRound, Hash256, Height, HeightHashPair};
use crate::storage::block_storage::StorageError;
use crate::storage::cache::BlockStorageCache;
use crate::subscribers::traits::FinalizationSubscriber;

use super::prevote::PrevoteChainBackups;

/// Receives the blocks of a recovered prevote chain, or the error that
/// prevented loading a backup that should have been present.
pub type PatchingBlockRangeConsumer = Box<dyn FnMut(Result<Vec<Block>, StorageError>) + Send>;

/// Finalization subscriber that patches the local chain with a
/// prevoted chain when the prevoted chain, but not the local chain,
/// contains the finalized block.
pub struct FinalizationPatchingSubscriber {
    prevote_backups: Box<dyn PrevoteChainBackups>,
    block_storage: Arc<BlockStorageCache>,
    block_range_consumer: PatchingBlockRangeConsumer,
}

impl FinalizationPatchingSubscriber {
    /// Creates a subscriber around `prevote_backups`, `block_storage`
    /// and `block_range_consumer`.
    pub fn new(
        prevote_backups: Box<dyn PrevoteChainBackups>,
        block_storage: Arc<BlockStorageCache>,
        block_range_consumer: PatchingBlockRangeConsumer,
    ) -> Self {
        Self {
            prevote_backups,
            block_storage,
            block_range_consumer,
        }
    }

    fn is_block_local(&self, height: Height, hash: &Hash256) -> bool {
        let storage_view = self.block_storage.view();
        if storage_view.chain_height() < height {
            return false;
        }

        // a load miss at or below the tip counts as a mismatch
        storage_view
            .load_block_element(height)
            .map(|element| element.entity_hash == *hash)
            .unwrap_or(false)
    }
}

impl FinalizationSubscriber for FinalizationPatchingSubscriber {
    fn notify_finalized_block(&mut self, round: FinalizationRound, height: Height, hash: Hash256) {
        let pair = HeightHashPair::new(height, hash);
        if !self.is_block_local(height, &hash) && self.prevote_backups.contains(round, &pair) {
            tracing::info!(%round, block = %pair, "patching local chain from prevote backup");

            // load all blocks up to and including the finalized height
            let block_range = self.prevote_backups.load(round, height);
            (self.block_range_consumer)(block_range);
        }

        self.prevote_backups.remove(round);
    }
}
