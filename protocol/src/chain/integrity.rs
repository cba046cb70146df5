//! Offline chain integrity verification.
//!
//! Walks every stored block from height 1 to the tip, checking the
//! previous-block linkage, the stored entity hash and the full-block
//! cryptography, then cross-checks the latest finalization proof
//! against the chain. Findings are collected rather than
//! short-circuited so a report covers the whole chain.

use crate::model::entity_hasher::calculate_block_hash;
use crate::model::types::{Hash256, Height};
use crate::storage::cache::BlockStorageView;
use crate::storage::StorageError;

use super::block_extensions::{BlockExtensions, VerifyFullBlockResult};
use crate::finalization::proof_storage::ProofStorage;

/// A single integrity finding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainFault {
    /// A block's previous-block hash does not match its predecessor.
    BrokenChainLink {
        height: Height,
        expected: Hash256,
        actual: Hash256,
    },
    /// A stored entity hash does not match the recomputed hash.
    EntityHashMismatch {
        height: Height,
        stored: Hash256,
        computed: Hash256,
    },
    /// A block failed signature or transactions-hash verification.
    BlockVerificationFailure {
        height: Height,
        result: VerifyFullBlockResult,
    },
    /// The latest finalization proof names a hash the chain does not
    /// hold at that height.
    ProofHashMismatch {
        height: Height,
        proof_hash: Hash256,
        block_hash: Hash256,
    },
}

impl std::fmt::Display for ChainFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BrokenChainLink {
                height,
                expected,
                actual,
            } => write!(
                f,
                "broken chain link at {}: expected previous hash {}, found {}",
                height, expected, actual
            ),
            Self::EntityHashMismatch {
                height,
                stored,
                computed,
            } => write!(
                f,
                "entity hash mismatch at {}: stored {}, computed {}",
                height, stored, computed
            ),
            Self::BlockVerificationFailure { height, result } => {
                write!(f, "block verification failure at {}: {}", height, result)
            }
            Self::ProofHashMismatch {
                height,
                proof_hash,
                block_hash,
            } => write!(
                f,
                "finalization proof at {} names {}, chain holds {}",
                height, proof_hash, block_hash
            ),
        }
    }
}

/// Outcome of an integrity walk.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    /// All findings, in walk order.
    pub faults: Vec<ChainFault>,
    /// Number of blocks examined.
    pub num_blocks_checked: u64,
}

impl IntegrityReport {
    /// Returns `true` if the walk found nothing wrong.
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }

    /// Process exit code for the report: 0 clean, 1 chain-link
    /// failure, 2 block hash/signature failure, 3 proof-hash failure.
    /// Link failures dominate, then block failures, then proof
    /// failures.
    pub fn exit_code(&self) -> i32 {
        let has_link_fault = self
            .faults
            .iter()
            .any(|fault| matches!(fault, ChainFault::BrokenChainLink { .. }));
        if has_link_fault {
            return 1;
        }

        let has_block_fault = self.faults.iter().any(|fault| {
            matches!(
                fault,
                ChainFault::EntityHashMismatch { .. } | ChainFault::BlockVerificationFailure { .. }
            )
        });
        if has_block_fault {
            return 2;
        }

        if !self.faults.is_empty() {
            return 3;
        }

        0
    }
}

/// Walks the chain in `storage_view` and cross-checks `proof_storage`,
/// verifying with `extensions`.
pub fn verify_chain(
    storage_view: &BlockStorageView<'_>,
    proof_storage: &dyn ProofStorage,
    extensions: &BlockExtensions<'_>,
) -> Result<IntegrityReport, StorageError> {
    let mut report = IntegrityReport::default();
    let chain_height = storage_view.chain_height();

    let mut previous_hash = Hash256::ZERO;
    for raw_height in 1..=chain_height.unwrap() {
        let height = Height(raw_height);
        let element = storage_view.load_block_element(height)?;
        let block = &element.block;

        if raw_height > 1 && block.header.previous_block_hash != previous_hash {
            report.faults.push(ChainFault::BrokenChainLink {
                height,
                expected: previous_hash,
                actual: block.header.previous_block_hash,
            });
        }

        let computed_hash = calculate_block_hash(block);
        if computed_hash != element.entity_hash {
            report.faults.push(ChainFault::EntityHashMismatch {
                height,
                stored: element.entity_hash,
                computed: computed_hash,
            });
        }

        match extensions.verify_full_block(block) {
            Ok(VerifyFullBlockResult::Success) => {}
            Ok(result) => {
                report
                    .faults
                    .push(ChainFault::BlockVerificationFailure { height, result });
            }
            Err(error) => return Err(StorageError::Corrupt(error)),
        }

        previous_hash = element.entity_hash;
        report.num_blocks_checked += 1;
    }

    let statistics = proof_storage.statistics();
    if statistics.height > Height(0) && statistics.height <= chain_height {
        let element = storage_view.load_block_element(statistics.height)?;
        if element.entity_hash != statistics.hash {
            report.faults.push(ChainFault::ProofHashMismatch {
                height: statistics.height,
                proof_hash: statistics.hash,
                block_hash: element.entity_hash,
            });
        }
    }

    for fault in &report.faults {
        tracing::error!(%fault, "chain integrity fault");
    }

    Ok(report)
}
