//! # Data Model
//!
//! The entities the protocol agrees on: blocks, transactions, their
//! hash-annotated views, the plugin registry that interprets
//! transaction payloads, and finalization proofs. Everything here is
//! bit-exact on the wire — serialization is explicit little-endian,
//! field by field.

pub mod block;
pub mod change_tracker;
pub(crate) mod codec;
pub mod elements;
pub mod entity_hasher;
pub mod finalization;
pub mod info;
pub mod registry;
pub mod transaction;
pub mod types;

pub use codec::padded_size;

use thiserror::Error;

use types::EntityType;

/// Errors raised while interpreting wire entities.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("entity truncated: expected {expected} bytes, {available} available")]
    TruncatedEntity { expected: usize, available: usize },

    #[error("declared entity size {declared} is below the minimum {minimum}")]
    InvalidEntitySize { declared: usize, minimum: usize },

    #[error("unexpected entity type {0}")]
    UnexpectedEntityType(EntityType),

    #[error("no plugin registered for transaction type {0}")]
    UnknownTransactionType(EntityType),
}
