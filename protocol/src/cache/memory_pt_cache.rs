//! In-memory partial transactions cache.
//!
//! Stores aggregate transactions awaiting cosignatures. The container
//! mirrors the unconfirmed cache — insertion-ordered ids, hash lookup,
//! byte and count admission — and additionally keeps the cosignatures
//! collected so far for each parent transaction.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::model::info::TransactionInfo;
use crate::model::transaction::{Cosignature, Transaction};
use crate::model::types::{
    to_short_hash, BlockFeeMultiplier, Hash256, ShortHash, ShortHashesSet, Timestamp,
};
use crate::utils::spin_lock::{ReaderGuard, SpinReaderWriterLock, WriterGuard};

use super::options::MemoryCacheOptions;

struct PtEntry {
    transaction_info: TransactionInfo,
    cosignatures: Vec<Cosignature>,
}

struct PtCacheState {
    options: MemoryCacheOptions,
    id_sequence: u64,
    entries: BTreeMap<u64, PtEntry>,
    id_lookup: HashMap<Hash256, u64>,
    memory_size: u64,
}

impl PtCacheState {
    fn new(options: MemoryCacheOptions) -> Self {
        Self {
            options,
            id_sequence: 0,
            entries: BTreeMap::new(),
            id_lookup: HashMap::new(),
            memory_size: 0,
        }
    }

    fn remove(&mut self, hash: &Hash256) -> Option<TransactionInfo> {
        let id = self.id_lookup.remove(hash)?;
        let entry = self
            .entries
            .remove(&id)
            .expect("id lookup and entry map are maintained together");
        self.memory_size -= entry.transaction_info.memory_size();
        Some(entry.transaction_info)
    }
}

/// Partial (aggregate) transactions cache.
pub struct MemoryPtCache {
    state: SpinReaderWriterLock<PtCacheState>,
}

impl MemoryPtCache {
    /// Creates a cache bounded by `options`.
    pub fn new(options: MemoryCacheOptions) -> Self {
        Self {
            state: SpinReaderWriterLock::new(PtCacheState::new(options)),
        }
    }

    /// Acquires a read view.
    pub fn view(&self) -> MemoryPtCacheView<'_> {
        MemoryPtCacheView {
            guard: self.state.acquire_reader(),
        }
    }

    /// Acquires the exclusive write modifier.
    pub fn modifier(&self) -> MemoryPtCacheModifier<'_> {
        MemoryPtCacheModifier {
            guard: self.state.acquire_writer(),
        }
    }
}

/// Read view of a [`MemoryPtCache`].
pub struct MemoryPtCacheView<'a> {
    guard: ReaderGuard<'a, PtCacheState>,
}

impl MemoryPtCacheView<'_> {
    /// Number of cached partial transactions.
    pub fn size(&self) -> usize {
        self.guard.entries.len()
    }

    /// Returns `true` if a partial transaction with `hash` is cached.
    pub fn contains(&self, hash: &Hash256) -> bool {
        self.guard.id_lookup.contains_key(hash)
    }

    /// Calls `consumer` for each cached info in insertion order until
    /// it returns `false`.
    pub fn for_each<F>(&self, mut consumer: F)
    where
        F: FnMut(&TransactionInfo) -> bool,
    {
        for entry in self.guard.entries.values() {
            if !consumer(&entry.transaction_info) {
                break;
            }
        }
    }

    /// Short hashes of all cached partial transactions, in insertion
    /// order.
    pub fn short_hashes(&self) -> Vec<ShortHash> {
        self.guard
            .entries
            .values()
            .map(|entry| to_short_hash(&entry.transaction_info.entity_hash))
            .collect()
    }

    /// Cosignatures collected so far for the partial transaction with
    /// `hash`.
    pub fn cosignatures(&self, hash: &Hash256) -> Option<Vec<Cosignature>> {
        let id = self.guard.id_lookup.get(hash)?;
        Some(self.guard.entries[id].cosignatures.clone())
    }

    /// Returns cached partial transactions unknown to a peer, with the
    /// same filter and cap rules as the unconfirmed cache.
    pub fn unknown_transactions(
        &self,
        min_fee_multiplier: BlockFeeMultiplier,
        known_short_hashes: &ShortHashesSet,
    ) -> Vec<Arc<Transaction>> {
        let max_response_size = self.guard.options.max_response_size;
        let mut total_size = 0u64;
        let mut transactions = Vec::new();
        for entry in self.guard.entries.values() {
            let transaction_info = &entry.transaction_info;
            if known_short_hashes.contains(&to_short_hash(&transaction_info.entity_hash)) {
                continue;
            }

            let transaction = &transaction_info.transaction;
            let size = u64::from(transaction.size());
            if transaction.max_fee.unwrap()
                < u64::from(min_fee_multiplier.unwrap()).saturating_mul(size)
            {
                continue;
            }

            if total_size + size > max_response_size {
                break;
            }

            total_size += size;
            transactions.push(Arc::clone(transaction));
        }

        transactions
    }
}

/// Write access to a [`MemoryPtCache`].
pub struct MemoryPtCacheModifier<'a> {
    guard: WriterGuard<'a, PtCacheState>,
}

impl MemoryPtCacheModifier<'_> {
    /// Number of cached partial transactions.
    pub fn size(&self) -> usize {
        self.guard.entries.len()
    }

    /// Cumulative serialized size of cached partial transactions.
    pub fn memory_size(&self) -> u64 {
        self.guard.memory_size
    }

    /// Adds `transaction_info` without cosignatures.
    ///
    /// Returns `false` on duplicate entity hash or when a count or
    /// byte limit would be exceeded.
    pub fn add(&mut self, transaction_info: TransactionInfo) -> bool {
        let state = &mut *self.guard;
        if state.id_lookup.contains_key(&transaction_info.entity_hash) {
            return false;
        }

        if state.entries.len() >= state.options.max_transaction_count {
            return false;
        }

        if state.memory_size + transaction_info.memory_size() > state.options.max_cache_size {
            return false;
        }

        state.id_sequence += 1;
        state
            .id_lookup
            .insert(transaction_info.entity_hash, state.id_sequence);
        state.memory_size += transaction_info.memory_size();
        state.entries.insert(
            state.id_sequence,
            PtEntry {
                transaction_info,
                cosignatures: Vec::new(),
            },
        );
        true
    }

    /// Attaches `cosignature` to the partial transaction with
    /// `parent_hash`.
    ///
    /// Returns the parent info when the cosignature was attached, or
    /// `None` when the parent is unknown or the cosigner already
    /// signed.
    pub fn add_cosignature(
        &mut self,
        parent_hash: &Hash256,
        cosignature: Cosignature,
    ) -> Option<TransactionInfo> {
        let state = &mut *self.guard;
        let id = *state.id_lookup.get(parent_hash)?;
        let entry = state
            .entries
            .get_mut(&id)
            .expect("id lookup and entry map are maintained together");

        let is_duplicate_cosigner = entry
            .cosignatures
            .iter()
            .any(|existing| existing.signer_public_key == cosignature.signer_public_key);
        if is_duplicate_cosigner {
            return None;
        }

        entry.cosignatures.push(cosignature);
        Some(entry.transaction_info.clone())
    }

    /// Removes the partial transaction with `hash`, returning its
    /// info.
    pub fn remove(&mut self, hash: &Hash256) -> Option<TransactionInfo> {
        self.guard.remove(hash)
    }

    /// Removes all partial transactions, returning them in insertion
    /// order.
    pub fn remove_all(&mut self) -> Vec<TransactionInfo> {
        let state = &mut *self.guard;
        state.id_lookup.clear();
        state.memory_size = 0;
        std::mem::take(&mut state.entries)
            .into_values()
            .map(|entry| entry.transaction_info)
            .collect()
    }

    /// Removes every partial transaction with a deadline before
    /// `timestamp`, returning the pruned infos.
    pub fn prune(&mut self, timestamp: Timestamp) -> Vec<TransactionInfo> {
        self.prune_if(|transaction_info| transaction_info.transaction.deadline < timestamp)
    }

    /// Removes every partial transaction matching `predicate`,
    /// returning the removed infos in insertion order.
    pub fn prune_if<F>(&mut self, mut predicate: F) -> Vec<TransactionInfo>
    where
        F: FnMut(&TransactionInfo) -> bool,
    {
        let matching_hashes: Vec<Hash256> = self
            .guard
            .entries
            .values()
            .filter(|entry| predicate(&entry.transaction_info))
            .map(|entry| entry.transaction_info.entity_hash)
            .collect();

        matching_hashes
            .iter()
            .filter_map(|hash| self.guard.remove(hash))
            .collect()
    }
}
