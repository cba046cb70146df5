//! # Chain Operations
//!
//! Full-block signing and verification, the finalization hash tree
//! and the offline integrity walker.

pub mod block_extensions;
pub mod hash_tree;
pub mod integrity;
pub mod transaction_extensions;

pub use block_extensions::{BlockExtensions, VerifyFullBlockResult};
pub use hash_tree::FinalizationHashTree;
pub use integrity::{verify_chain, ChainFault, IntegrityReport};
pub use transaction_extensions::TransactionExtensions;
