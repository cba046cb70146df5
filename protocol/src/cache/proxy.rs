//! Cache proxies.
//!
//! The subscription manager hands the node either a plain memory cache
//! or an aggregate (subscriber-notifying) one, depending on whether
//! change subscribers were registered. The proxy folds both shapes
//! behind one surface so consumers write a single call pattern:
//! acquire a modifier, mutate, `commit()`.

use std::sync::Arc;

use crate::model::info::TransactionInfo;
use crate::model::transaction::Cosignature;
use crate::model::types::{Hash256, Key, Timestamp};

use super::aggregate::{
    AggregatePtCache, AggregatePtCacheModifier, AggregateUtCache, AggregateUtCacheModifier,
};
use super::memory_pt_cache::{
    MemoryPtCache, MemoryPtCacheModifier, MemoryPtCacheView,
};
use super::memory_ut_cache::{
    MemoryUtCache, MemoryUtCacheModifier, MemoryUtCacheView,
};
use super::options::MemoryCacheOptions;
use super::subscribers::{PtChangeSubscriber, UtChangeSubscriber};

// ---------------------------------------------------------------------------
// MemoryUtCacheProxy
// ---------------------------------------------------------------------------

/// An unconfirmed transactions cache, optionally decorated with change
/// notifications.
pub struct MemoryUtCacheProxy {
    cache: Arc<MemoryUtCache>,
    aggregate: Option<AggregateUtCache>,
}

impl MemoryUtCacheProxy {
    /// Creates a plain proxy without change notifications.
    pub fn new(options: MemoryCacheOptions) -> Self {
        Self {
            cache: Arc::new(MemoryUtCache::new(options)),
            aggregate: None,
        }
    }

    /// Creates a proxy that publishes net changes to `subscriber`.
    pub fn with_subscriber(
        options: MemoryCacheOptions,
        subscriber: Box<dyn UtChangeSubscriber>,
    ) -> Self {
        let cache = Arc::new(MemoryUtCache::new(options));
        let aggregate = AggregateUtCache::new(Arc::clone(&cache), subscriber);
        Self {
            cache,
            aggregate: Some(aggregate),
        }
    }

    /// Acquires a read view.
    pub fn view(&self) -> MemoryUtCacheView<'_> {
        self.cache.view()
    }

    /// Shared handle to the underlying memory cache, for read-side
    /// consumers like the pull-transactions handler.
    pub fn cache(&self) -> Arc<MemoryUtCache> {
        Arc::clone(&self.cache)
    }

    /// Acquires the write modifier (change-tracking when a subscriber
    /// is attached).
    pub fn modifier(&self) -> UtCacheModifier<'_> {
        match &self.aggregate {
            None => UtCacheModifier::Plain(self.cache.modifier()),
            Some(aggregate) => UtCacheModifier::Aggregate(aggregate.modifier()),
        }
    }
}

/// Write modifier over a [`MemoryUtCacheProxy`].
pub enum UtCacheModifier<'a> {
    /// Direct modifier without change notifications.
    Plain(MemoryUtCacheModifier<'a>),
    /// Change-tracking modifier.
    Aggregate(AggregateUtCacheModifier<'a>),
}

impl UtCacheModifier<'_> {
    /// Number of cached transactions.
    pub fn size(&self) -> usize {
        match self {
            Self::Plain(modifier) => modifier.size(),
            Self::Aggregate(modifier) => modifier.size(),
        }
    }

    /// Cumulative serialized size of cached transactions.
    pub fn memory_size(&self) -> u64 {
        match self {
            Self::Plain(modifier) => modifier.memory_size(),
            Self::Aggregate(modifier) => modifier.memory_size(),
        }
    }

    /// Number of cached transactions signed by `signer`.
    pub fn count(&self, signer: &Key) -> usize {
        match self {
            Self::Plain(modifier) => modifier.count(signer),
            Self::Aggregate(modifier) => modifier.count(signer),
        }
    }

    /// Adds `transaction_info` to the cache.
    pub fn add(&mut self, transaction_info: TransactionInfo) -> bool {
        match self {
            Self::Plain(modifier) => modifier.add(transaction_info),
            Self::Aggregate(modifier) => modifier.add(transaction_info),
        }
    }

    /// Removes the transaction with `hash`.
    pub fn remove(&mut self, hash: &Hash256) -> Option<TransactionInfo> {
        match self {
            Self::Plain(modifier) => modifier.remove(hash),
            Self::Aggregate(modifier) => modifier.remove(hash),
        }
    }

    /// Removes all transactions.
    pub fn remove_all(&mut self) -> Vec<TransactionInfo> {
        match self {
            Self::Plain(modifier) => modifier.remove_all(),
            Self::Aggregate(modifier) => modifier.remove_all(),
        }
    }

    /// Removes every transaction with a deadline before `timestamp`.
    pub fn prune(&mut self, timestamp: Timestamp) -> Vec<TransactionInfo> {
        match self {
            Self::Plain(modifier) => modifier.prune(timestamp),
            Self::Aggregate(modifier) => modifier.prune(timestamp),
        }
    }

    /// Releases the modifier, publishing tracked changes when a
    /// subscriber is attached.
    pub fn commit(self) {
        match self {
            Self::Plain(_) => {}
            Self::Aggregate(modifier) => modifier.commit(),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryPtCacheProxy
// ---------------------------------------------------------------------------

/// A partial transactions cache, optionally decorated with change
/// notifications.
pub struct MemoryPtCacheProxy {
    cache: Arc<MemoryPtCache>,
    aggregate: Option<AggregatePtCache>,
}

impl MemoryPtCacheProxy {
    /// Creates a plain proxy without change notifications.
    pub fn new(options: MemoryCacheOptions) -> Self {
        Self {
            cache: Arc::new(MemoryPtCache::new(options)),
            aggregate: None,
        }
    }

    /// Creates a proxy that publishes net changes to `subscriber`.
    pub fn with_subscriber(
        options: MemoryCacheOptions,
        subscriber: Box<dyn PtChangeSubscriber>,
    ) -> Self {
        let cache = Arc::new(MemoryPtCache::new(options));
        let aggregate = AggregatePtCache::new(Arc::clone(&cache), subscriber);
        Self {
            cache,
            aggregate: Some(aggregate),
        }
    }

    /// Acquires a read view.
    pub fn view(&self) -> MemoryPtCacheView<'_> {
        self.cache.view()
    }

    /// Shared handle to the underlying memory cache.
    pub fn cache(&self) -> Arc<MemoryPtCache> {
        Arc::clone(&self.cache)
    }

    /// Acquires the write modifier (change-tracking when a subscriber
    /// is attached).
    pub fn modifier(&self) -> PtCacheModifier<'_> {
        match &self.aggregate {
            None => PtCacheModifier::Plain(self.cache.modifier()),
            Some(aggregate) => PtCacheModifier::Aggregate(aggregate.modifier()),
        }
    }
}

/// Write modifier over a [`MemoryPtCacheProxy`].
pub enum PtCacheModifier<'a> {
    /// Direct modifier without change notifications.
    Plain(MemoryPtCacheModifier<'a>),
    /// Change-tracking modifier.
    Aggregate(AggregatePtCacheModifier<'a>),
}

impl PtCacheModifier<'_> {
    /// Number of cached partial transactions.
    pub fn size(&self) -> usize {
        match self {
            Self::Plain(modifier) => modifier.size(),
            Self::Aggregate(modifier) => modifier.size(),
        }
    }

    /// Adds `transaction_info` to the cache.
    pub fn add(&mut self, transaction_info: TransactionInfo) -> bool {
        match self {
            Self::Plain(modifier) => modifier.add(transaction_info),
            Self::Aggregate(modifier) => modifier.add(transaction_info),
        }
    }

    /// Attaches `cosignature` to the partial transaction with
    /// `parent_hash`.
    pub fn add_cosignature(
        &mut self,
        parent_hash: &Hash256,
        cosignature: Cosignature,
    ) -> Option<TransactionInfo> {
        match self {
            Self::Plain(modifier) => modifier.add_cosignature(parent_hash, cosignature),
            Self::Aggregate(modifier) => modifier.add_cosignature(parent_hash, cosignature),
        }
    }

    /// Removes the partial transaction with `hash`.
    pub fn remove(&mut self, hash: &Hash256) -> Option<TransactionInfo> {
        match self {
            Self::Plain(modifier) => modifier.remove(hash),
            Self::Aggregate(modifier) => modifier.remove(hash),
        }
    }

    /// Removes all partial transactions.
    pub fn remove_all(&mut self) -> Vec<TransactionInfo> {
        match self {
            Self::Plain(modifier) => modifier.remove_all(),
            Self::Aggregate(modifier) => modifier.remove_all(),
        }
    }

    /// Removes every partial transaction with a deadline before
    /// `timestamp`.
    pub fn prune(&mut self, timestamp: Timestamp) -> Vec<TransactionInfo> {
        match self {
            Self::Plain(modifier) => modifier.prune(timestamp),
            Self::Aggregate(modifier) => modifier.prune(timestamp),
        }
    }

    /// Releases the modifier, publishing tracked changes when a
    /// subscriber is attached.
    pub fn commit(self) {
        match self {
            Self::Plain(_) => {}
            Self::Aggregate(modifier) => modifier.commit(),
        }
    }
}
