//! Fan-out subscriber aggregates.
//!
//! Each aggregate owns a list of boxed subscribers and forwards every
//! notification to all of them in registration order. The subscription
//! manager builds one aggregate per slot so the rest of the node deals
//! with exactly one subscriber per concern.

use crate::cache::subscribers::{PtChangeSubscriber, UtChangeSubscriber};
use crate::model::elements::BlockElement;
use crate::model::info::{TransactionInfo, TransactionInfosSet};
use crate::model::transaction::{Cosignature, Transaction};
use crate::model::types::{ChainScore, FinalizationRound, Hash256, Height, Key};

use super::traits::{
    BlockChangeSubscriber, FinalizationSubscriber, NodeInfo, NodeSubscriber, ServiceIdentifier,
    StateChangeInfo, StateChangeSubscriber, TransactionStatusSubscriber,
};

/// Forwards block change notifications to all owned subscribers.
pub struct AggregateBlockChangeSubscriber {
    subscribers: Vec<Box<dyn BlockChangeSubscriber>>,
}

impl AggregateBlockChangeSubscriber {
    /// Creates an aggregate around `subscribers`.
    pub fn new(subscribers: Vec<Box<dyn BlockChangeSubscriber>>) -> Self {
        Self { subscribers }
    }
}

impl BlockChangeSubscriber for AggregateBlockChangeSubscriber {
    fn notify_block(&mut self, block_element: &BlockElement) {
        for subscriber in &mut self.subscribers {
            subscriber.notify_block(block_element);
        }
    }

    fn notify_drop_blocks_after(&mut self, height: Height) {
        for subscriber in &mut self.subscribers {
            subscriber.notify_drop_blocks_after(height);
        }
    }
}

/// Forwards finalization notifications to all owned subscribers.
pub struct AggregateFinalizationSubscriber {
    subscribers: Vec<Box<dyn FinalizationSubscriber>>,
}

impl AggregateFinalizationSubscriber {
    /// Creates an aggregate around `subscribers`.
    pub fn new(subscribers: Vec<Box<dyn FinalizationSubscriber>>) -> Self {
        Self { subscribers }
    }
}

impl FinalizationSubscriber for AggregateFinalizationSubscriber {
    fn notify_finalized_block(&mut self, round: FinalizationRound, height: Height, hash: Hash256) {
        for subscriber in &mut self.subscribers {
            subscriber.notify_finalized_block(round, height, hash);
        }
    }
}

/// Forwards node notifications to all owned subscribers.
pub struct AggregateNodeSubscriber {
    subscribers: Vec<Box<dyn NodeSubscriber>>,
}

impl AggregateNodeSubscriber {
    /// Creates an aggregate around `subscribers`.
    pub fn new(subscribers: Vec<Box<dyn NodeSubscriber>>) -> Self {
        Self { subscribers }
    }
}

impl NodeSubscriber for AggregateNodeSubscriber {
    fn notify_node(&mut self, node: &NodeInfo) {
        for subscriber in &mut self.subscribers {
            subscriber.notify_node(node);
        }
    }

    fn notify_incoming_node(&mut self, identity: &Key, service_id: ServiceIdentifier) -> bool {
        // every subscriber is notified; the connection is accepted only
        // when none vetoes it
        let mut is_accepted = true;
        for subscriber in &mut self.subscribers {
            is_accepted &= subscriber.notify_incoming_node(identity, service_id);
        }

        is_accepted
    }
}

/// Forwards state change notifications to all owned subscribers.
pub struct AggregateStateChangeSubscriber {
    subscribers: Vec<Box<dyn StateChangeSubscriber>>,
}

impl AggregateStateChangeSubscriber {
    /// Creates an aggregate around `subscribers`.
    pub fn new(subscribers: Vec<Box<dyn StateChangeSubscriber>>) -> Self {
        Self { subscribers }
    }
}

impl StateChangeSubscriber for AggregateStateChangeSubscriber {
    fn notify_score_change(&mut self, chain_score: ChainScore) {
        for subscriber in &mut self.subscribers {
            subscriber.notify_score_change(chain_score);
        }
    }

    fn notify_state_change(&mut self, state_change_info: &StateChangeInfo) {
        for subscriber in &mut self.subscribers {
            subscriber.notify_state_change(state_change_info);
        }
    }
}

/// Forwards transaction status notifications to all owned subscribers.
pub struct AggregateTransactionStatusSubscriber {
    subscribers: Vec<Box<dyn TransactionStatusSubscriber>>,
}

impl AggregateTransactionStatusSubscriber {
    /// Creates an aggregate around `subscribers`.
    pub fn new(subscribers: Vec<Box<dyn TransactionStatusSubscriber>>) -> Self {
        Self { subscribers }
    }
}

impl TransactionStatusSubscriber for AggregateTransactionStatusSubscriber {
    fn notify_status(&mut self, transaction: &Transaction, hash: Hash256, status: u32) {
        for subscriber in &mut self.subscribers {
            subscriber.notify_status(transaction, hash, status);
        }
    }

    fn flush(&mut self) {
        for subscriber in &mut self.subscribers {
            subscriber.flush();
        }
    }
}

/// Forwards unconfirmed-transaction change notifications to all owned
/// subscribers.
pub struct AggregateUtChangeSubscriber {
    subscribers: Vec<Box<dyn UtChangeSubscriber>>,
}

impl AggregateUtChangeSubscriber {
    /// Creates an aggregate around `subscribers`.
    pub fn new(subscribers: Vec<Box<dyn UtChangeSubscriber>>) -> Self {
        Self { subscribers }
    }
}

impl UtChangeSubscriber for AggregateUtChangeSubscriber {
    fn notify_adds(&mut self, transaction_infos: &TransactionInfosSet) {
        for subscriber in &mut self.subscribers {
            subscriber.notify_adds(transaction_infos);
        }
    }

    fn notify_removes(&mut self, transaction_infos: &TransactionInfosSet) {
        for subscriber in &mut self.subscribers {
            subscriber.notify_removes(transaction_infos);
        }
    }

    fn flush(&mut self) {
        for subscriber in &mut self.subscribers {
            subscriber.flush();
        }
    }
}

/// Forwards partial-transaction change notifications to all owned
/// subscribers.
pub struct AggregatePtChangeSubscriber {
    subscribers: Vec<Box<dyn PtChangeSubscriber>>,
}

impl AggregatePtChangeSubscriber {
    /// Creates an aggregate around `subscribers`.
    pub fn new(subscribers: Vec<Box<dyn PtChangeSubscriber>>) -> Self {
        Self { subscribers }
    }
}

impl PtChangeSubscriber for AggregatePtChangeSubscriber {
    fn notify_add_partials(&mut self, transaction_infos: &TransactionInfosSet) {
        for subscriber in &mut self.subscribers {
            subscriber.notify_add_partials(transaction_infos);
        }
    }

    fn notify_add_cosignature(
        &mut self,
        parent_transaction_info: &TransactionInfo,
        cosignature: &Cosignature,
    ) {
        for subscriber in &mut self.subscribers {
            subscriber.notify_add_cosignature(parent_transaction_info, cosignature);
        }
    }

    fn notify_remove_partials(&mut self, transaction_infos: &TransactionInfosSet) {
        for subscriber in &mut self.subscribers {
            subscriber.notify_remove_partials(transaction_infos);
        }
    }

    fn flush(&mut self) {
        for subscriber in &mut self.subscribers {
            subscriber.flush();
        }
    }
}
