//! In-memory unconfirmed transactions cache.
//!
//! Infos are stored under monotonically increasing ids, so iteration
//! order is insertion order and a re-added transaction moves to the
//! end. A hash lookup maps entity hashes onto ids, and per-signer
//! counters support harvesting throttles.
//!
//! Access goes through `view()` / `modifier()` over the spin RWLock:
//! many concurrent views, one modifier, and a view pins a consistent
//! snapshot for as long as it is held.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::model::info::TransactionInfo;
use crate::model::transaction::Transaction;
use crate::model::types::{
    to_short_hash, BlockFeeMultiplier, Hash256, Key, ShortHash, ShortHashesSet, Timestamp,
};
use crate::utils::spin_lock::{ReaderGuard, SpinReaderWriterLock, WriterGuard};

use super::options::MemoryCacheOptions;

struct UtCacheState {
    options: MemoryCacheOptions,
    id_sequence: u64,
    transaction_infos: BTreeMap<u64, TransactionInfo>,
    id_lookup: HashMap<Hash256, u64>,
    signer_counts: HashMap<Key, usize>,
    memory_size: u64,
}

impl UtCacheState {
    fn new(options: MemoryCacheOptions) -> Self {
        Self {
            options,
            id_sequence: 0,
            transaction_infos: BTreeMap::new(),
            id_lookup: HashMap::new(),
            signer_counts: HashMap::new(),
            memory_size: 0,
        }
    }

    fn add(&mut self, transaction_info: TransactionInfo) -> bool {
        if self.id_lookup.contains_key(&transaction_info.entity_hash) {
            return false;
        }

        if self.transaction_infos.len() >= self.options.max_transaction_count {
            return false;
        }

        if self.memory_size + transaction_info.memory_size() > self.options.max_cache_size {
            return false;
        }

        self.id_sequence += 1;
        self.id_lookup
            .insert(transaction_info.entity_hash, self.id_sequence);
        *self
            .signer_counts
            .entry(transaction_info.transaction.signer_public_key)
            .or_insert(0) += 1;
        self.memory_size += transaction_info.memory_size();
        self.transaction_infos
            .insert(self.id_sequence, transaction_info);
        true
    }

    fn remove(&mut self, hash: &Hash256) -> Option<TransactionInfo> {
        let id = self.id_lookup.remove(hash)?;
        let transaction_info = self
            .transaction_infos
            .remove(&id)
            .expect("id lookup and info map are maintained together");

        let signer = transaction_info.transaction.signer_public_key;
        if let Some(count) = self.signer_counts.get_mut(&signer) {
            *count -= 1;
            if *count == 0 {
                self.signer_counts.remove(&signer);
            }
        }

        self.memory_size -= transaction_info.memory_size();
        Some(transaction_info)
    }
}

/// Deadline-bounded unconfirmed transactions cache.
pub struct MemoryUtCache {
    state: SpinReaderWriterLock<UtCacheState>,
}

impl MemoryUtCache {
    /// Creates a cache bounded by `options`.
    pub fn new(options: MemoryCacheOptions) -> Self {
        Self {
            state: SpinReaderWriterLock::new(UtCacheState::new(options)),
        }
    }

    /// Acquires a read view.
    pub fn view(&self) -> MemoryUtCacheView<'_> {
        MemoryUtCacheView {
            guard: self.state.acquire_reader(),
        }
    }

    /// Acquires the exclusive write modifier.
    pub fn modifier(&self) -> MemoryUtCacheModifier<'_> {
        MemoryUtCacheModifier {
            guard: self.state.acquire_writer(),
        }
    }
}

/// Read view of a [`MemoryUtCache`].
pub struct MemoryUtCacheView<'a> {
    guard: ReaderGuard<'a, UtCacheState>,
}

impl MemoryUtCacheView<'_> {
    /// Number of cached transactions.
    pub fn size(&self) -> usize {
        self.guard.transaction_infos.len()
    }

    /// Returns `true` if a transaction with `hash` is cached.
    pub fn contains(&self, hash: &Hash256) -> bool {
        self.guard.id_lookup.contains_key(hash)
    }

    /// Calls `consumer` for each cached info in insertion order until
    /// it returns `false`.
    pub fn for_each<F>(&self, mut consumer: F)
    where
        F: FnMut(&TransactionInfo) -> bool,
    {
        for transaction_info in self.guard.transaction_infos.values() {
            if !consumer(transaction_info) {
                break;
            }
        }
    }

    /// Short hashes of all cached transactions, in insertion order.
    pub fn short_hashes(&self) -> Vec<ShortHash> {
        self.guard
            .transaction_infos
            .values()
            .map(|transaction_info| to_short_hash(&transaction_info.entity_hash))
            .collect()
    }

    /// Returns cached transactions unknown to a peer, in insertion
    /// order.
    ///
    /// A transaction qualifies when its short hash is not in
    /// `known_short_hashes` and it offers at least `min_fee_multiplier`
    /// fee per byte. Collection stops at the first transaction that
    /// would push the cumulative serialized size past the configured
    /// response cap; no attempt is made to scan past it for a smaller
    /// one.
    pub fn unknown_transactions(
        &self,
        min_fee_multiplier: BlockFeeMultiplier,
        known_short_hashes: &ShortHashesSet,
    ) -> Vec<Arc<Transaction>> {
        let max_response_size = self.guard.options.max_response_size;
        let mut total_size = 0u64;
        let mut transactions = Vec::new();
        for transaction_info in self.guard.transaction_infos.values() {
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

/// Write access to a [`MemoryUtCache`].
pub struct MemoryUtCacheModifier<'a> {
    guard: WriterGuard<'a, UtCacheState>,
}

impl MemoryUtCacheModifier<'_> {
    /// Number of cached transactions.
    pub fn size(&self) -> usize {
        self.guard.transaction_infos.len()
    }

    /// Cumulative serialized size of cached transactions.
    pub fn memory_size(&self) -> u64 {
        self.guard.memory_size
    }

    /// Adds `transaction_info` to the cache.
    ///
    /// Returns `false` when an info with the same entity hash is
    /// already cached, or when admitting the info would exceed the
    /// transaction count or byte limits. Removals free their budget
    /// immediately, so a remove-then-add swap inside one modifier
    /// succeeds at capacity.
    pub fn add(&mut self, transaction_info: TransactionInfo) -> bool {
        self.guard.add(transaction_info)
    }

    /// Removes the transaction with `hash`, returning its info.
    pub fn remove(&mut self, hash: &Hash256) -> Option<TransactionInfo> {
        self.guard.remove(hash)
    }

    /// Removes all transactions, returning them in insertion order.
    pub fn remove_all(&mut self) -> Vec<TransactionInfo> {
        let state = &mut *self.guard;
        state.id_lookup.clear();
        state.signer_counts.clear();
        state.memory_size = 0;
        std::mem::take(&mut state.transaction_infos)
            .into_values()
            .collect()
    }

    /// Removes every transaction with a deadline before `timestamp`,
    /// returning the pruned infos.
    ///
    /// The whole container is scanned; deadlines are not monotonic in
    /// id order because re-inserts move transactions to the end.
    pub fn prune(&mut self, timestamp: Timestamp) -> Vec<TransactionInfo> {
        self.remove_if(|transaction_info| transaction_info.transaction.deadline < timestamp)
    }

    /// Removes every transaction matching `predicate`, returning the
    /// removed infos in insertion order.
    pub fn remove_if<F>(&mut self, mut predicate: F) -> Vec<TransactionInfo>
    where
        F: FnMut(&TransactionInfo) -> bool,
    {
        let matching_hashes: Vec<Hash256> = self
            .guard
            .transaction_infos
            .values()
            .filter(|transaction_info| predicate(transaction_info))
            .map(|transaction_info| transaction_info.entity_hash)
            .collect();

        matching_hashes
            .iter()
            .filter_map(|hash| self.guard.remove(hash))
            .collect()
    }

    /// Number of cached transactions signed by `signer`.
    pub fn count(&self, signer: &Key) -> usize {
        self.guard.signer_counts.get(signer).copied().unwrap_or(0)
    }
}
