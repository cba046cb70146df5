//! Single-shot subscription assembly.
//!
//! During startup the host registers any number of subscribers per
//! concern, then creates each aggregate exactly once. Creating moves
//! the accumulated subscribers into the aggregate and burns the slot,
//! so two components can never co-own a subscriber list.

use thiserror::Error;

use crate::cache::options::MemoryCacheOptions;
use crate::cache::proxy::{MemoryPtCacheProxy, MemoryUtCacheProxy};
use crate::cache::subscribers::{PtChangeSubscriber, UtChangeSubscriber};
use crate::model::transaction::Transaction;
use crate::model::types::Hash256;
use crate::storage::aggregate::AggregateBlockStorage;
use crate::storage::block_storage::BlockStorage;

use super::aggregates::{
    AggregateBlockChangeSubscriber, AggregateFinalizationSubscriber, AggregateNodeSubscriber,
    AggregatePtChangeSubscriber, AggregateStateChangeSubscriber,
    AggregateTransactionStatusSubscriber, AggregateUtChangeSubscriber,
};
use super::traits::{
    BlockChangeSubscriber, FinalizationSubscriber, NodeSubscriber, StateChangeSubscriber,
    TransactionStatusSubscriber,
};

/// Subscriber slots managed by the subscription manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriberType {
    /// Block change subscribers.
    BlockChange,
    /// Unconfirmed transactions change subscribers.
    UtChange,
    /// Partial transactions change subscribers.
    PtChange,
    /// Transaction status subscribers.
    TransactionStatus,
    /// State change subscribers.
    StateChange,
    /// Node subscribers.
    Node,
    /// Finalization subscribers.
    Finalization,
}

const NUM_SUBSCRIBER_TYPES: usize = 7;

/// Errors raised by subscription assembly.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("subscription aggregate has already been created for {0:?}")]
    AlreadyCreated(SubscriberType),
}

/// Logs every rejected transaction; always part of the transaction
/// status aggregate.
struct LoggingTransactionStatusSubscriber;

impl TransactionStatusSubscriber for LoggingTransactionStatusSubscriber {
    fn notify_status(&mut self, transaction: &Transaction, hash: Hash256, status: u32) {
        if status != 0 {
            tracing::warn!(
                %hash,
                status,
                deadline = %transaction.deadline,
                "rejected transaction"
            );
        } else {
            tracing::trace!(%hash, deadline = %transaction.deadline, "transaction status");
        }
    }

    fn flush(&mut self) {}
}

/// One-shot builder of subscriber aggregates, the decorated block
/// storage and the mempool cache proxies.
pub struct SubscriptionManager {
    storage: Option<Box<dyn BlockStorage>>,
    block_change_subscribers: Vec<Box<dyn BlockChangeSubscriber>>,
    ut_change_subscribers: Vec<Box<dyn UtChangeSubscriber>>,
    pt_change_subscribers: Vec<Box<dyn PtChangeSubscriber>>,
    transaction_status_subscribers: Vec<Box<dyn TransactionStatusSubscriber>>,
    state_change_subscribers: Vec<Box<dyn StateChangeSubscriber>>,
    node_subscribers: Vec<Box<dyn NodeSubscriber>>,
    finalization_subscribers: Vec<Box<dyn FinalizationSubscriber>>,
    used: [bool; NUM_SUBSCRIBER_TYPES],
}

impl SubscriptionManager {
    /// Creates a manager around the node's file-backed block
    /// `storage`.
    pub fn new(storage: Box<dyn BlockStorage>) -> Self {
        Self {
            storage: Some(storage),
            block_change_subscribers: Vec::new(),
            ut_change_subscribers: Vec::new(),
            pt_change_subscribers: Vec::new(),
            transaction_status_subscribers: Vec::new(),
            state_change_subscribers: Vec::new(),
            node_subscribers: Vec::new(),
            finalization_subscribers: Vec::new(),
            used: [false; NUM_SUBSCRIBER_TYPES],
        }
    }

    fn require_unused(&self, subscriber_type: SubscriberType) -> Result<(), SubscriptionError> {
        if self.used[subscriber_type as usize] {
            return Err(SubscriptionError::AlreadyCreated(subscriber_type));
        }

        Ok(())
    }

    fn mark_used(&mut self, subscriber_type: SubscriberType) -> Result<(), SubscriptionError> {
        self.require_unused(subscriber_type)?;
        self.used[subscriber_type as usize] = true;
        Ok(())
    }

    // region add

    /// Registers a block change subscriber.
    pub fn add_block_change_subscriber(
        &mut self,
        subscriber: Box<dyn BlockChangeSubscriber>,
    ) -> Result<(), SubscriptionError> {
        self.require_unused(SubscriberType::BlockChange)?;
        self.block_change_subscribers.push(subscriber);
        Ok(())
    }

    /// Registers an unconfirmed transactions change subscriber.
    pub fn add_ut_change_subscriber(
        &mut self,
        subscriber: Box<dyn UtChangeSubscriber>,
    ) -> Result<(), SubscriptionError> {
        self.require_unused(SubscriberType::UtChange)?;
        self.ut_change_subscribers.push(subscriber);
        Ok(())
    }

    /// Registers a partial transactions change subscriber.
    pub fn add_pt_change_subscriber(
        &mut self,
        subscriber: Box<dyn PtChangeSubscriber>,
    ) -> Result<(), SubscriptionError> {
        self.require_unused(SubscriberType::PtChange)?;
        self.pt_change_subscribers.push(subscriber);
        Ok(())
    }

    /// Registers a transaction status subscriber.
    pub fn add_transaction_status_subscriber(
        &mut self,
        subscriber: Box<dyn TransactionStatusSubscriber>,
    ) -> Result<(), SubscriptionError> {
        self.require_unused(SubscriberType::TransactionStatus)?;
        self.transaction_status_subscribers.push(subscriber);
        Ok(())
    }

    /// Registers a state change subscriber.
    pub fn add_state_change_subscriber(
        &mut self,
        subscriber: Box<dyn StateChangeSubscriber>,
    ) -> Result<(), SubscriptionError> {
        self.require_unused(SubscriberType::StateChange)?;
        self.state_change_subscribers.push(subscriber);
        Ok(())
    }

    /// Registers a node subscriber.
    pub fn add_node_subscriber(
        &mut self,
        subscriber: Box<dyn NodeSubscriber>,
    ) -> Result<(), SubscriptionError> {
        self.require_unused(SubscriberType::Node)?;
        self.node_subscribers.push(subscriber);
        Ok(())
    }

    /// Registers a finalization subscriber.
    pub fn add_finalization_subscriber(
        &mut self,
        subscriber: Box<dyn FinalizationSubscriber>,
    ) -> Result<(), SubscriptionError> {
        self.require_unused(SubscriberType::Finalization)?;
        self.finalization_subscribers.push(subscriber);
        Ok(())
    }

    // endregion

    // region create - subscriber

    /// Moves the block change subscribers into an aggregate.
    pub fn create_block_change_subscriber(
        &mut self,
    ) -> Result<Box<dyn BlockChangeSubscriber>, SubscriptionError> {
        self.mark_used(SubscriberType::BlockChange)?;
        Ok(Box::new(AggregateBlockChangeSubscriber::new(
            std::mem::take(&mut self.block_change_subscribers),
        )))
    }

    /// Moves the ut change subscribers into an aggregate.
    pub fn create_ut_change_subscriber(
        &mut self,
    ) -> Result<Box<dyn UtChangeSubscriber>, SubscriptionError> {
        self.mark_used(SubscriberType::UtChange)?;
        Ok(Box::new(AggregateUtChangeSubscriber::new(std::mem::take(
            &mut self.ut_change_subscribers,
        ))))
    }

    /// Moves the pt change subscribers into an aggregate.
    pub fn create_pt_change_subscriber(
        &mut self,
    ) -> Result<Box<dyn PtChangeSubscriber>, SubscriptionError> {
        self.mark_used(SubscriberType::PtChange)?;
        Ok(Box::new(AggregatePtChangeSubscriber::new(std::mem::take(
            &mut self.pt_change_subscribers,
        ))))
    }

    /// Moves the transaction status subscribers into an aggregate,
    /// always appending the logging subscriber.
    pub fn create_transaction_status_subscriber(
        &mut self,
    ) -> Result<Box<dyn TransactionStatusSubscriber>, SubscriptionError> {
        self.mark_used(SubscriberType::TransactionStatus)?;
        self.transaction_status_subscribers
            .push(Box::new(LoggingTransactionStatusSubscriber));
        Ok(Box::new(AggregateTransactionStatusSubscriber::new(
            std::mem::take(&mut self.transaction_status_subscribers),
        )))
    }

    /// Moves the state change subscribers into an aggregate.
    pub fn create_state_change_subscriber(
        &mut self,
    ) -> Result<Box<dyn StateChangeSubscriber>, SubscriptionError> {
        self.mark_used(SubscriberType::StateChange)?;
        Ok(Box::new(AggregateStateChangeSubscriber::new(
            std::mem::take(&mut self.state_change_subscribers),
        )))
    }

    /// Moves the node subscribers into an aggregate.
    pub fn create_node_subscriber(
        &mut self,
    ) -> Result<Box<dyn NodeSubscriber>, SubscriptionError> {
        self.mark_used(SubscriberType::Node)?;
        Ok(Box::new(AggregateNodeSubscriber::new(std::mem::take(
            &mut self.node_subscribers,
        ))))
    }

    /// Moves the finalization subscribers into an aggregate.
    pub fn create_finalization_subscriber(
        &mut self,
    ) -> Result<Box<dyn FinalizationSubscriber>, SubscriptionError> {
        self.mark_used(SubscriberType::Finalization)?;
        Ok(Box::new(AggregateFinalizationSubscriber::new(
            std::mem::take(&mut self.finalization_subscribers),
        )))
    }

    // endregion

    // region create - container

    /// Moves the block storage out, decorated with block change
    /// notifications when any block change subscribers were
    /// registered.
    pub fn create_block_storage(&mut self) -> Result<Box<dyn BlockStorage>, SubscriptionError> {
        if !self.block_change_subscribers.is_empty() {
            let subscriber = self.create_block_change_subscriber()?;
            let storage = self
                .storage
                .take()
                .expect("storage is present until the block change slot is used");
            return Ok(Box::new(AggregateBlockStorage::new(storage, subscriber)));
        }

        self.mark_used(SubscriberType::BlockChange)?;
        Ok(self
            .storage
            .take()
            .expect("storage is present until the block change slot is used"))
    }

    /// Creates the unconfirmed transactions cache, aggregate when any
    /// ut change subscribers were registered.
    pub fn create_ut_cache(
        &mut self,
        options: MemoryCacheOptions,
    ) -> Result<MemoryUtCacheProxy, SubscriptionError> {
        if !self.ut_change_subscribers.is_empty() {
            let subscriber = self.create_ut_change_subscriber()?;
            return Ok(MemoryUtCacheProxy::with_subscriber(options, subscriber));
        }

        self.mark_used(SubscriberType::UtChange)?;
        Ok(MemoryUtCacheProxy::new(options))
    }

    /// Creates the partial transactions cache, aggregate when any pt
    /// change subscribers were registered.
    pub fn create_pt_cache(
        &mut self,
        options: MemoryCacheOptions,
    ) -> Result<MemoryPtCacheProxy, SubscriptionError> {
        if !self.pt_change_subscribers.is_empty() {
            let subscriber = self.create_pt_change_subscriber()?;
            return Ok(MemoryPtCacheProxy::with_subscriber(options, subscriber));
        }

        self.mark_used(SubscriberType::PtChange)?;
        Ok(MemoryPtCacheProxy::new(options))
    }

    // endregion
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::elements::BlockElement;
    use crate::model::info::TransactionInfosSet;
    use crate::model::types::Height;
    use crate::storage::memory::MemoryBlockStorage;
    use crate::testing;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingBlockChangeSubscriber {
        blocks: Arc<AtomicUsize>,
    }

    impl BlockChangeSubscriber for CountingBlockChangeSubscriber {
        fn notify_block(&mut self, _block_element: &BlockElement) {
            self.blocks.fetch_add(1, Ordering::SeqCst);
        }

        fn notify_drop_blocks_after(&mut self, _height: Height) {}
    }

    struct CountingUtChangeSubscriber {
        adds: Arc<AtomicUsize>,
    }

    impl UtChangeSubscriber for CountingUtChangeSubscriber {
        fn notify_adds(&mut self, transaction_infos: &TransactionInfosSet) {
            self.adds.fetch_add(transaction_infos.len(), Ordering::SeqCst);
        }

        fn notify_removes(&mut self, _transaction_infos: &TransactionInfosSet) {}

        fn flush(&mut self) {}
    }

    fn create_manager() -> SubscriptionManager {
        SubscriptionManager::new(Box::new(MemoryBlockStorage::new()))
    }

    fn options() -> MemoryCacheOptions {
        MemoryCacheOptions::new(1_000_000, 1_000_000, 100)
    }

    #[test]
    fn create_is_single_shot_per_slot() {
        let mut manager = create_manager();

        assert!(manager.create_ut_change_subscriber().is_ok());
        assert!(matches!(
            manager.create_ut_change_subscriber(),
            Err(SubscriptionError::AlreadyCreated(SubscriberType::UtChange))
        ));
    }

    #[test]
    fn add_after_create_is_rejected() {
        let mut manager = create_manager();
        manager.create_node_subscriber().unwrap();

        struct NopNodeSubscriber;
        impl NodeSubscriber for NopNodeSubscriber {
            fn notify_node(&mut self, _node: &super::super::traits::NodeInfo) {}
            fn notify_incoming_node(
                &mut self,
                _identity: &crate::model::types::Key,
                _service_id: super::super::traits::ServiceIdentifier,
            ) -> bool {
                true
            }
        }

        assert!(matches!(
            manager.add_node_subscriber(Box::new(NopNodeSubscriber)),
            Err(SubscriptionError::AlreadyCreated(SubscriberType::Node))
        ));
    }

    #[test]
    fn create_block_storage_without_subscribers_returns_plain_storage() {
        let mut manager = create_manager();

        let mut storage = manager.create_block_storage().unwrap();
        let element = testing::create_block_elements(1).pop().unwrap();
        storage.save_block(element).unwrap();

        assert_eq!(Height(1), storage.chain_height());
        // the slot is burnt either way
        assert!(manager.create_block_change_subscriber().is_err());
    }

    #[test]
    fn create_block_storage_with_subscribers_returns_aggregate() {
        let blocks = Arc::new(AtomicUsize::new(0));
        let mut manager = create_manager();
        manager
            .add_block_change_subscriber(Box::new(CountingBlockChangeSubscriber {
                blocks: Arc::clone(&blocks),
            }))
            .unwrap();

        let mut storage = manager.create_block_storage().unwrap();
        storage
            .save_block(testing::create_block_elements(1).pop().unwrap())
            .unwrap();

        assert_eq!(1, blocks.load(Ordering::SeqCst));
    }

    #[test]
    fn create_ut_cache_without_subscribers_is_plain() {
        let mut manager = create_manager();

        let proxy = manager.create_ut_cache(options()).unwrap();
        let mut modifier = proxy.modifier();
        assert!(modifier.add(testing::create_transaction_info_with_deadline(1)));
        modifier.commit();

        assert_eq!(1, proxy.view().size());
        assert!(manager.create_ut_change_subscriber().is_err());
    }

    #[test]
    fn create_ut_cache_with_subscribers_is_aggregate() {
        let adds = Arc::new(AtomicUsize::new(0));
        let mut manager = create_manager();
        manager
            .add_ut_change_subscriber(Box::new(CountingUtChangeSubscriber {
                adds: Arc::clone(&adds),
            }))
            .unwrap();

        let proxy = manager.create_ut_cache(options()).unwrap();
        let mut modifier = proxy.modifier();
        modifier.add(testing::create_transaction_info_with_deadline(1));
        modifier.commit();

        assert_eq!(1, adds.load(Ordering::SeqCst));
    }

    #[test]
    fn create_pt_cache_slots_are_independent_of_ut() {
        let mut manager = create_manager();

        assert!(manager.create_ut_cache(options()).is_ok());
        assert!(manager.create_pt_cache(options()).is_ok());
        assert!(matches!(
            manager.create_pt_cache(options()),
            Err(SubscriptionError::AlreadyCreated(SubscriberType::PtChange))
        ));
    }

    #[test]
    fn transaction_status_aggregate_always_contains_logging_subscriber() {
        let mut manager = create_manager();

        let mut subscriber = manager.create_transaction_status_subscriber().unwrap();
        // the logging subscriber is present and does not panic
        let transaction = testing::create_transaction(5);
        subscriber.notify_status(&transaction, testing::random_hash(), 42);
        subscriber.flush();
    }

    #[test]
    fn multiple_adds_accumulate_before_create() {
        let adds = Arc::new(AtomicUsize::new(0));
        let mut manager = create_manager();
        for _ in 0..3 {
            manager
                .add_ut_change_subscriber(Box::new(CountingUtChangeSubscriber {
                    adds: Arc::clone(&adds),
                }))
                .unwrap();
        }

        let mut subscriber = manager.create_ut_change_subscriber().unwrap();
        let mut infos = TransactionInfosSet::new();
        infos.insert(testing::create_transaction_info_with_deadline(1));
        subscriber.notify_adds(&infos);

        assert_eq!(3, adds.load(Ordering::SeqCst));
    }
}
