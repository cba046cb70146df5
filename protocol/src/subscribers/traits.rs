//! Subscriber interfaces.
//!
//! Subscribers observe state transitions; they never drive them. A
//! subscriber that panics during a notification takes the process down
//! — a half-notified subscriber set is unrecoverable.

use crate::model::elements::BlockElement;
use crate::model::transaction::Transaction;
use crate::model::types::{ChainScore, FinalizationRound, Hash256, Height, Key};

/// Observes block saves and drops.
///
/// `Sync` is required because the subscriber rides inside the block
/// storage, which is shared across handler threads.
pub trait BlockChangeSubscriber: Send + Sync {
    /// Indicates `block_element` was saved.
    fn notify_block(&mut self, block_element: &BlockElement);

    /// Indicates all blocks after `height` were dropped.
    fn notify_drop_blocks_after(&mut self, height: Height);
}

/// Observes block finalization.
pub trait FinalizationSubscriber: Send {
    /// Indicates the block at (`height`, `hash`) was finalized during
    /// `round`.
    fn notify_finalized_block(&mut self, round: FinalizationRound, height: Height, hash: Hash256);
}

/// Identifies a node-local service a peer connects to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceIdentifier(pub u32);

/// A partner node's identity as seen by the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeInfo {
    /// Identity key of the node.
    pub identity_key: Key,
    /// Advertised host.
    pub host: String,
    /// Friendly name.
    pub name: String,
}

/// Observes node discovery and incoming connections.
pub trait NodeSubscriber: Send {
    /// Indicates `node` was discovered or updated.
    fn notify_node(&mut self, node: &NodeInfo);

    /// Indicates a node with `identity` connected to `service_id`.
    /// Returning `false` rejects the connection.
    fn notify_incoming_node(&mut self, identity: &Key, service_id: ServiceIdentifier) -> bool;
}

/// Net result of executing a block: the score delta and new height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateChangeInfo {
    /// Change in cumulative chain score.
    pub score_delta: ChainScore,
    /// Height after the change.
    pub height: Height,
}

/// Observes chain score and state changes.
pub trait StateChangeSubscriber: Send {
    /// Indicates the chain score changed to `chain_score`.
    fn notify_score_change(&mut self, chain_score: ChainScore);

    /// Indicates state changed per `state_change_info`.
    fn notify_state_change(&mut self, state_change_info: &StateChangeInfo);
}

/// Observes transaction validation outcomes.
pub trait TransactionStatusSubscriber: Send {
    /// Indicates `transaction` with `hash` completed validation with
    /// `status` (zero means success).
    fn notify_status(&mut self, transaction: &Transaction, hash: Hash256, status: u32);

    /// Flushes queued status notifications.
    fn flush(&mut self);
}
