//! Prevote chain backups.
//!
//! A voter backs a provisional branch during each finalization round.
//! The branch is backed up so that when the round finalizes a block
//! the local chain does not yet hold, the backed-up blocks can be
//! replayed into the block-range consumer.

use std::collections::HashMap;

use crate::model::block::Block;
use crate::model::types::{FinalizationRound, Hash256, Height, HeightHashPair};
use crate::storage::block_storage::StorageError;

/// Manager of backed up prevote chains.
pub trait PrevoteChainBackups: Send {
    /// Returns `true` if the backed up chain for `round` contains
    /// `height_hash_pair`.
    fn contains(&self, round: FinalizationRound, height_hash_pair: &HeightHashPair) -> bool;

    /// Loads the backed up chain for `round` up to and including
    /// `max_height`.
    fn load(&self, round: FinalizationRound, max_height: Height)
        -> Result<Vec<Block>, StorageError>;

    /// Removes the backed up chain for `round`.
    fn remove(&mut self, round: FinalizationRound);
}

struct BackupEntry {
    block: Block,
    entity_hash: Hash256,
}

/// In-memory prevote chain backup store.
#[derive(Default)]
pub struct MemoryPrevoteChainBackups {
    backups: HashMap<FinalizationRound, Vec<BackupEntry>>,
}

impl MemoryPrevoteChainBackups {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backs up `blocks` (with their entity hashes) for `round`,
    /// replacing any previous backup.
    pub fn backup(&mut self, round: FinalizationRound, blocks: Vec<(Block, Hash256)>) {
        let entries = blocks
            .into_iter()
            .map(|(block, entity_hash)| BackupEntry { block, entity_hash })
            .collect();
        self.backups.insert(round, entries);
    }
}

impl PrevoteChainBackups for MemoryPrevoteChainBackups {
    fn contains(&self, round: FinalizationRound, height_hash_pair: &HeightHashPair) -> bool {
        self.backups
            .get(&round)
            .map(|entries| {
                entries.iter().any(|entry| {
                    entry.block.header.height == height_hash_pair.height
                        && entry.entity_hash == height_hash_pair.hash
                })
            })
            .unwrap_or(false)
    }

    fn load(
        &self,
        round: FinalizationRound,
        max_height: Height,
    ) -> Result<Vec<Block>, StorageError> {
        let entries = self
            .backups
            .get(&round)
            .ok_or_else(|| StorageError::ProofNotFound(format!("prevote chain for {}", round)))?;

        Ok(entries
            .iter()
            .filter(|entry| entry.block.header.height <= max_height)
            .map(|entry| entry.block.clone())
            .collect())
    }

    fn remove(&mut self, round: FinalizationRound) {
        self.backups.remove(&round);
    }
}
