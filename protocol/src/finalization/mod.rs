//! # Finalization Overlay
//!
//! Proof storage with subscriber notification, prevote chain backups
//! and the patcher that adopts a finalized-but-missing branch.

pub mod patching;
pub mod prevote;
pub mod proof_storage;

pub use patching::FinalizationPatchingSubscriber;
pub use prevote::{MemoryPrevoteChainBackups, PrevoteChainBackups};
pub use proof_storage::{AggregateProofStorage, MemoryProofStorage, ProofStorage};
