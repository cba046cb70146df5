//! Change-tracking cache decorations.
//!
//! An aggregate cache wraps a memory cache and a change subscriber.
//! Its modifier forwards every operation to the real modifier while
//! recording net changes; `commit()` publishes removes before adds so
//! a downstream observer sees net state rather than intermediate
//! churn, then flushes the subscriber.
//!
//! The flush does not live in `Drop`: subscribers may panic, and a
//! panicking destructor is unrecoverable by design. Callers must end
//! every modifier with an explicit `commit()` or `cancel()`; dropping
//! an uncommitted modifier is a bug and panics.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::model::change_tracker::TransactionChangeTracker;
use crate::model::info::TransactionInfo;
use crate::model::transaction::Cosignature;
use crate::model::types::{Hash256, Key, Timestamp};

use super::memory_pt_cache::{MemoryPtCache, MemoryPtCacheModifier};
use super::memory_ut_cache::{MemoryUtCache, MemoryUtCacheModifier};
use super::subscribers::{PtChangeSubscriber, UtChangeSubscriber};

// ---------------------------------------------------------------------------
// AggregateUtCache
// ---------------------------------------------------------------------------

/// An unconfirmed transactions cache that publishes net changes to a
/// subscriber.
pub struct AggregateUtCache {
    cache: Arc<MemoryUtCache>,
    subscriber: Mutex<Box<dyn UtChangeSubscriber>>,
}

impl AggregateUtCache {
    /// Creates an aggregate around `cache` and `subscriber`.
    pub fn new(cache: Arc<MemoryUtCache>, subscriber: Box<dyn UtChangeSubscriber>) -> Self {
        Self {
            cache,
            subscriber: Mutex::new(subscriber),
        }
    }

    /// Acquires a read view of the underlying cache.
    pub fn view(&self) -> super::memory_ut_cache::MemoryUtCacheView<'_> {
        self.cache.view()
    }

    /// Acquires a change-tracking modifier.
    pub fn modifier(&self) -> AggregateUtCacheModifier<'_> {
        AggregateUtCacheModifier {
            modifier: self.cache.modifier(),
            subscriber: self.subscriber.lock(),
            tracker: TransactionChangeTracker::new(),
            is_settled: false,
        }
    }
}

/// Change-tracking modifier over a [`MemoryUtCache`].
pub struct AggregateUtCacheModifier<'a> {
    modifier: MemoryUtCacheModifier<'a>,
    subscriber: MutexGuard<'a, Box<dyn UtChangeSubscriber>>,
    tracker: TransactionChangeTracker,
    is_settled: bool,
}

impl AggregateUtCacheModifier<'_> {
    /// Number of cached transactions.
    pub fn size(&self) -> usize {
        self.modifier.size()
    }

    /// Cumulative serialized size of cached transactions.
    pub fn memory_size(&self) -> u64 {
        self.modifier.memory_size()
    }

    /// Number of cached transactions signed by `signer`.
    pub fn count(&self, signer: &Key) -> usize {
        self.modifier.count(signer)
    }

    /// Adds `transaction_info`, recording a net add on success.
    pub fn add(&mut self, transaction_info: TransactionInfo) -> bool {
        if !self.modifier.add(transaction_info.clone()) {
            return false;
        }

        self.tracker.add(transaction_info);
        true
    }

    /// Removes the transaction with `hash`, recording a net remove.
    pub fn remove(&mut self, hash: &Hash256) -> Option<TransactionInfo> {
        let transaction_info = self.modifier.remove(hash)?;
        self.tracker.remove(transaction_info.clone());
        Some(transaction_info)
    }

    /// Removes all transactions, recording a net remove for each.
    pub fn remove_all(&mut self) -> Vec<TransactionInfo> {
        let transaction_infos = self.modifier.remove_all();
        for transaction_info in &transaction_infos {
            self.tracker.remove(transaction_info.clone());
        }

        transaction_infos
    }

    /// Prunes by deadline; pruned infos bypass change tracking.
    pub fn prune(&mut self, timestamp: Timestamp) -> Vec<TransactionInfo> {
        self.modifier.prune(timestamp)
    }

    /// Publishes net changes (removes first, then adds), flushes the
    /// subscriber and releases the modifier.
    pub fn commit(mut self) {
        let removed = self.tracker.removed_transaction_infos();
        if !removed.is_empty() {
            self.subscriber.notify_removes(removed);
        }

        let added = self.tracker.added_transaction_infos();
        if !added.is_empty() {
            self.subscriber.notify_adds(added);
        }

        self.subscriber.flush();
        self.tracker.reset();
        self.is_settled = true;
    }

    /// Releases the modifier without publishing anything. The cache
    /// mutations themselves remain applied.
    pub fn cancel(mut self) {
        self.is_settled = true;
    }
}

impl Drop for AggregateUtCacheModifier<'_> {
    fn drop(&mut self) {
        if !self.is_settled && !std::thread::panicking() {
            panic!("aggregate ut cache modifier dropped without commit or cancel");
        }
    }
}

// ---------------------------------------------------------------------------
// AggregatePtCache
// ---------------------------------------------------------------------------

/// A partial transactions cache that publishes net changes to a
/// subscriber.
pub struct AggregatePtCache {
    cache: Arc<MemoryPtCache>,
    subscriber: Mutex<Box<dyn PtChangeSubscriber>>,
}

impl AggregatePtCache {
    /// Creates an aggregate around `cache` and `subscriber`.
    pub fn new(cache: Arc<MemoryPtCache>, subscriber: Box<dyn PtChangeSubscriber>) -> Self {
        Self {
            cache,
            subscriber: Mutex::new(subscriber),
        }
    }

    /// Acquires a read view of the underlying cache.
    pub fn view(&self) -> super::memory_pt_cache::MemoryPtCacheView<'_> {
        self.cache.view()
    }

    /// Acquires a change-tracking modifier.
    pub fn modifier(&self) -> AggregatePtCacheModifier<'_> {
        AggregatePtCacheModifier {
            modifier: self.cache.modifier(),
            subscriber: self.subscriber.lock(),
            tracker: TransactionChangeTracker::new(),
            is_settled: false,
        }
    }
}

/// Change-tracking modifier over a [`MemoryPtCache`].
pub struct AggregatePtCacheModifier<'a> {
    modifier: MemoryPtCacheModifier<'a>,
    subscriber: MutexGuard<'a, Box<dyn PtChangeSubscriber>>,
    tracker: TransactionChangeTracker,
    is_settled: bool,
}

impl AggregatePtCacheModifier<'_> {
    /// Number of cached partial transactions.
    pub fn size(&self) -> usize {
        self.modifier.size()
    }

    /// Cumulative serialized size of cached partial transactions.
    pub fn memory_size(&self) -> u64 {
        self.modifier.memory_size()
    }

    /// Adds `transaction_info`, recording a net add on success.
    pub fn add(&mut self, transaction_info: TransactionInfo) -> bool {
        if !self.modifier.add(transaction_info.clone()) {
            return false;
        }

        self.tracker.add(transaction_info);
        true
    }

    /// Attaches `cosignature` to the partial transaction with
    /// `parent_hash`, notifying the subscriber eagerly on success.
    pub fn add_cosignature(
        &mut self,
        parent_hash: &Hash256,
        cosignature: Cosignature,
    ) -> Option<TransactionInfo> {
        let parent = self.modifier.add_cosignature(parent_hash, cosignature)?;
        self.subscriber.notify_add_cosignature(&parent, &cosignature);
        Some(parent)
    }

    /// Removes the partial transaction with `hash`, recording a net
    /// remove.
    pub fn remove(&mut self, hash: &Hash256) -> Option<TransactionInfo> {
        let transaction_info = self.modifier.remove(hash)?;
        self.tracker.remove(transaction_info.clone());
        Some(transaction_info)
    }

    /// Removes all partial transactions, recording a net remove for
    /// each.
    pub fn remove_all(&mut self) -> Vec<TransactionInfo> {
        let transaction_infos = self.modifier.remove_all();
        for transaction_info in &transaction_infos {
            self.tracker.remove(transaction_info.clone());
        }

        transaction_infos
    }

    /// Prunes by deadline; pruned infos bypass change tracking.
    pub fn prune(&mut self, timestamp: Timestamp) -> Vec<TransactionInfo> {
        self.modifier.prune(timestamp)
    }

    /// Publishes net changes (removes first, then adds), flushes the
    /// subscriber and releases the modifier.
    pub fn commit(mut self) {
        let removed = self.tracker.removed_transaction_infos();
        if !removed.is_empty() {
            self.subscriber.notify_remove_partials(removed);
        }

        let added = self.tracker.added_transaction_infos();
        if !added.is_empty() {
            self.subscriber.notify_add_partials(added);
        }

        self.subscriber.flush();
        self.tracker.reset();
        self.is_settled = true;
    }

    /// Releases the modifier without publishing anything.
    pub fn cancel(mut self) {
        self.is_settled = true;
    }
}

impl Drop for AggregatePtCacheModifier<'_> {
    fn drop(&mut self) {
        if !self.is_settled && !std::thread::panicking() {
            panic!("aggregate pt cache modifier dropped without commit or cancel");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::options::MemoryCacheOptions;
    use crate::model::info::TransactionInfosSet;
    use crate::testing;

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Event {
        Adds(Vec<Hash256>),
        Removes(Vec<Hash256>),
        Cosignature(Hash256, Key),
        Flush,
    }

    #[derive(Default)]
    struct EventLog {
        events: parking_lot::Mutex<Vec<Event>>,
    }

    impl EventLog {
        fn sorted_hashes(infos: &TransactionInfosSet) -> Vec<Hash256> {
            let mut hashes: Vec<Hash256> =
                infos.iter().map(|info| info.entity_hash).collect();
            hashes.sort();
            hashes
        }
    }

    struct RecordingUtSubscriber {
        log: Arc<EventLog>,
    }

    impl UtChangeSubscriber for RecordingUtSubscriber {
        fn notify_adds(&mut self, transaction_infos: &TransactionInfosSet) {
            self.log
                .events
                .lock()
                .push(Event::Adds(EventLog::sorted_hashes(transaction_infos)));
        }

        fn notify_removes(&mut self, transaction_infos: &TransactionInfosSet) {
            self.log
                .events
                .lock()
                .push(Event::Removes(EventLog::sorted_hashes(transaction_infos)));
        }

        fn flush(&mut self) {
            self.log.events.lock().push(Event::Flush);
        }
    }

    struct RecordingPtSubscriber {
        log: Arc<EventLog>,
    }

    impl PtChangeSubscriber for RecordingPtSubscriber {
        fn notify_add_partials(&mut self, transaction_infos: &TransactionInfosSet) {
            self.log
                .events
                .lock()
                .push(Event::Adds(EventLog::sorted_hashes(transaction_infos)));
        }

        fn notify_add_cosignature(
            &mut self,
            parent_transaction_info: &TransactionInfo,
            cosignature: &Cosignature,
        ) {
            self.log.events.lock().push(Event::Cosignature(
                parent_transaction_info.entity_hash,
                cosignature.signer_public_key,
            ));
        }

        fn notify_remove_partials(&mut self, transaction_infos: &TransactionInfosSet) {
            self.log
                .events
                .lock()
                .push(Event::Removes(EventLog::sorted_hashes(transaction_infos)));
        }

        fn flush(&mut self) {
            self.log.events.lock().push(Event::Flush);
        }
    }

    fn create_ut_aggregate() -> (AggregateUtCache, Arc<EventLog>) {
        let log = Arc::new(EventLog::default());
        let aggregate = AggregateUtCache::new(
            Arc::new(MemoryUtCache::new(MemoryCacheOptions::new(
                1_000_000, 1_000_000, 1_000,
            ))),
            Box::new(RecordingUtSubscriber {
                log: Arc::clone(&log),
            }),
        );
        (aggregate, log)
    }

    fn create_pt_aggregate() -> (AggregatePtCache, Arc<EventLog>) {
        let log = Arc::new(EventLog::default());
        let aggregate = AggregatePtCache::new(
            Arc::new(MemoryPtCache::new(MemoryCacheOptions::new(
                1_000_000, 1_000_000, 1_000,
            ))),
            Box::new(RecordingPtSubscriber {
                log: Arc::clone(&log),
            }),
        );
        (aggregate, log)
    }

    #[test]
    fn commit_publishes_adds_and_flush() {
        let (aggregate, log) = create_ut_aggregate();
        let infos = testing::create_transaction_infos(2);
        let mut expected_hashes: Vec<Hash256> =
            infos.iter().map(|info| info.entity_hash).collect();
        expected_hashes.sort();

        let mut modifier = aggregate.modifier();
        for info in infos {
            assert!(modifier.add(info));
        }
        modifier.commit();

        assert_eq!(
            vec![Event::Adds(expected_hashes), Event::Flush],
            log.events.lock().clone()
        );
    }

    #[test]
    fn commit_publishes_removes_before_adds() {
        let (aggregate, log) = create_ut_aggregate();
        let seeded = testing::create_transaction_infos(2);
        {
            let mut modifier = aggregate.modifier();
            for info in seeded.clone() {
                modifier.add(info);
            }
            modifier.commit();
        }
        log.events.lock().clear();

        let fresh = testing::create_transaction_info_with_deadline(55);
        let mut modifier = aggregate.modifier();
        modifier.remove(&seeded[0].entity_hash);
        modifier.add(fresh.clone());
        modifier.commit();

        assert_eq!(
            vec![
                Event::Removes(vec![seeded[0].entity_hash]),
                Event::Adds(vec![fresh.entity_hash]),
                Event::Flush,
            ],
            log.events.lock().clone()
        );
    }

    #[test]
    fn add_then_remove_within_one_modifier_publishes_nothing_but_flush() {
        let (aggregate, log) = create_ut_aggregate();
        let info = testing::create_transaction_info_with_deadline(9);
        let hash = info.entity_hash;

        let mut modifier = aggregate.modifier();
        modifier.add(info);
        modifier.remove(&hash);
        modifier.commit();

        assert_eq!(vec![Event::Flush], log.events.lock().clone());
    }

    #[test]
    fn failed_add_is_not_tracked() {
        let (aggregate, log) = create_ut_aggregate();
        let info = testing::create_transaction_info_with_deadline(9);
        {
            let mut modifier = aggregate.modifier();
            modifier.add(info.clone());
            modifier.commit();
        }
        log.events.lock().clear();

        let mut modifier = aggregate.modifier();
        assert!(!modifier.add(info));
        modifier.commit();

        assert_eq!(vec![Event::Flush], log.events.lock().clone());
    }

    #[test]
    fn remove_all_publishes_removes() {
        let (aggregate, log) = create_ut_aggregate();
        let infos = testing::create_transaction_infos(3);
        let mut expected_hashes: Vec<Hash256> =
            infos.iter().map(|info| info.entity_hash).collect();
        expected_hashes.sort();
        {
            let mut modifier = aggregate.modifier();
            for info in infos {
                modifier.add(info);
            }
            modifier.commit();
        }
        log.events.lock().clear();

        let mut modifier = aggregate.modifier();
        let removed = modifier.remove_all();
        modifier.commit();

        assert_eq!(3, removed.len());
        assert_eq!(
            vec![Event::Removes(expected_hashes), Event::Flush],
            log.events.lock().clone()
        );
    }

    #[test]
    fn cancel_publishes_nothing() {
        let (aggregate, log) = create_ut_aggregate();

        let mut modifier = aggregate.modifier();
        modifier.add(testing::create_transaction_info_with_deadline(1));
        modifier.cancel();

        assert!(log.events.lock().is_empty());
        // the mutation itself still happened
        assert_eq!(1, aggregate.view().size());
    }

    #[test]
    #[should_panic(expected = "dropped without commit or cancel")]
    fn dropping_uncommitted_modifier_panics() {
        let (aggregate, _log) = create_ut_aggregate();

        let mut modifier = aggregate.modifier();
        modifier.add(testing::create_transaction_info_with_deadline(1));
        drop(modifier);
    }

    #[test]
    fn pt_commit_batches_partials() {
        let (aggregate, log) = create_pt_aggregate();
        let info = testing::create_transaction_info_with_deadline(4);
        let hash = info.entity_hash;

        let mut modifier = aggregate.modifier();
        modifier.add(info);
        modifier.commit();

        assert_eq!(
            vec![Event::Adds(vec![hash]), Event::Flush],
            log.events.lock().clone()
        );
    }

    #[test]
    fn pt_cosignature_notification_is_eager() {
        let (aggregate, log) = create_pt_aggregate();
        let info = testing::create_transaction_info_with_deadline(4);
        let hash = info.entity_hash;
        let cosigner = testing::random_key();

        let mut modifier = aggregate.modifier();
        modifier.add(info);
        modifier.add_cosignature(
            &hash,
            Cosignature {
                signer_public_key: cosigner,
                signature: crate::model::types::Signature([1u8; 64]),
            },
        );

        // the cosignature event fires before commit
        assert_eq!(
            vec![Event::Cosignature(hash, cosigner)],
            log.events.lock().clone()
        );
        modifier.commit();

        assert_eq!(
            vec![
                Event::Cosignature(hash, cosigner),
                Event::Adds(vec![hash]),
                Event::Flush,
            ],
            log.events.lock().clone()
        );
    }

    #[test]
    fn pt_cosignature_for_unknown_parent_is_not_published() {
        let (aggregate, log) = create_pt_aggregate();

        let mut modifier = aggregate.modifier();
        let parent = modifier.add_cosignature(
            &testing::random_hash(),
            Cosignature {
                signer_public_key: testing::random_key(),
                signature: crate::model::types::Signature([1u8; 64]),
            },
        );
        modifier.commit();

        assert!(parent.is_none());
        assert_eq!(vec![Event::Flush], log.events.lock().clone());
    }

    #[test]
    fn subscriber_panic_escapes_commit() {
        struct PanickingSubscriber;

        impl UtChangeSubscriber for PanickingSubscriber {
            fn notify_adds(&mut self, _transaction_infos: &TransactionInfosSet) {
                panic!("subscriber failure is fatal");
            }

            fn notify_removes(&mut self, _transaction_infos: &TransactionInfosSet) {}

            fn flush(&mut self) {}
        }

        let aggregate = AggregateUtCache::new(
            Arc::new(MemoryUtCache::new(MemoryCacheOptions::new(
                1_000_000, 1_000_000, 1_000,
            ))),
            Box::new(PanickingSubscriber),
        );

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut modifier = aggregate.modifier();
            modifier.add(testing::create_transaction_info_with_deadline(1));
            modifier.commit();
        }));

        assert!(outcome.is_err());
    }

    #[test]
    fn count_and_sizes_delegate_to_inner_modifier() {
        let (aggregate, _log) = create_ut_aggregate();
        let signer = testing::random_key();
        let info = testing::create_transaction_info(testing::create_transaction_with_signer(
            signer, 1,
        ));
        let size = info.memory_size();

        let mut modifier = aggregate.modifier();
        modifier.add(info);
        assert_eq!(1, modifier.size());
        assert_eq!(size, modifier.memory_size());
        assert_eq!(1, modifier.count(&signer));
        modifier.commit();
    }
}
