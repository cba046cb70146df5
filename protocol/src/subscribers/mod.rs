//! # Subscribers
//!
//! Subscriber traits, their fan-out aggregates and the one-shot
//! subscription manager that assembles them at startup.

pub mod aggregates;
pub mod manager;
pub mod traits;

pub use aggregates::{
    AggregateBlockChangeSubscriber, AggregateFinalizationSubscriber, AggregateNodeSubscriber,
    AggregatePtChangeSubscriber, AggregateStateChangeSubscriber,
    AggregateTransactionStatusSubscriber, AggregateUtChangeSubscriber,
};
pub use manager::{SubscriberType, SubscriptionError, SubscriptionManager};
pub use traits::{
    BlockChangeSubscriber, FinalizationSubscriber, NodeInfo, NodeSubscriber, ServiceIdentifier,
    StateChangeInfo, StateChangeSubscriber, TransactionStatusSubscriber,
};
