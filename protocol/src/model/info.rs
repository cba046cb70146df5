//! Hash-annotated transaction handles.
//!
//! A [`TransactionInfo`] is the unit the mempool caches store: a shared
//! pointer to the immutable transaction plus its entity hash and merkle
//! component hash. Identity is the entity hash — equality and hashing
//! ignore everything else, which lets net-change tracking use plain
//! hash sets.

use std::collections::HashSet;
use std::sync::Arc;

use crate::model::transaction::Transaction;
use crate::model::types::Hash256;

/// A transaction plus its entity hash and merkle component hash.
#[derive(Clone, Debug)]
pub struct TransactionInfo {
    /// The shared transaction.
    pub transaction: Arc<Transaction>,
    /// Canonical content hash of the transaction.
    pub entity_hash: Hash256,
    /// Hash fed to the block merkle builder; equals `entity_hash`
    /// unless the plugin contributes supplementary buffers.
    pub merkle_component_hash: Hash256,
}

impl TransactionInfo {
    /// Creates an info whose merkle component hash equals its entity
    /// hash.
    pub fn new(transaction: Arc<Transaction>, entity_hash: Hash256) -> Self {
        Self {
            transaction,
            entity_hash,
            merkle_component_hash: entity_hash,
        }
    }

    /// Approximate memory footprint of the stored transaction.
    pub fn memory_size(&self) -> u64 {
        u64::from(self.transaction.size())
    }
}

impl PartialEq for TransactionInfo {
    fn eq(&self, other: &Self) -> bool {
        self.entity_hash == other.entity_hash
    }
}

impl Eq for TransactionInfo {}

impl std::hash::Hash for TransactionInfo {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.entity_hash.hash(state);
    }
}

/// Unordered set of transaction infos keyed by entity hash.
pub type TransactionInfosSet = HashSet<TransactionInfo>;

/// A transaction plus its entity hash, without a merkle component hash.
///
/// Used where the merkle component is not yet known, e.g. for partial
/// transactions that have not been completed.
#[derive(Clone, Debug)]
pub struct DetachedTransactionInfo {
    /// The shared transaction.
    pub transaction: Arc<Transaction>,
    /// Canonical content hash of the transaction.
    pub entity_hash: Hash256,
}

impl DetachedTransactionInfo {
    /// Creates a detached info.
    pub fn new(transaction: Arc<Transaction>, entity_hash: Hash256) -> Self {
        Self {
            transaction,
            entity_hash,
        }
    }

    /// Attaches a merkle component hash, producing a full info.
    pub fn attach(self, merkle_component_hash: Hash256) -> TransactionInfo {
        TransactionInfo {
            transaction: self.transaction,
            entity_hash: self.entity_hash,
            merkle_component_hash,
        }
    }
}
