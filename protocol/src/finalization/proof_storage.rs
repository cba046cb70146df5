//! Finalization proof storage.

use crate::model::finalization::{FinalizationProof, FinalizationStatistics};
use crate::model::types::{FinalizationEpoch, Height};
use crate::storage::block_storage::StorageError;
use crate::subscribers::traits::FinalizationSubscriber;

/// An append-and-load service for finalization proofs.
///
/// Saves are monotonic in round: implementations may assume callers
/// route writes through [`AggregateProofStorage`], which drops stale
/// rounds before they reach the inner store.
pub trait ProofStorage: Send {
    /// Identity of the most recently saved proof.
    fn statistics(&self) -> FinalizationStatistics;

    /// Loads the latest proof of `epoch`.
    fn load_proof_at_epoch(&self, epoch: FinalizationEpoch)
        -> Result<FinalizationProof, StorageError>;

    /// Loads the latest proof at `height`.
    fn load_proof_at_height(&self, height: Height) -> Result<FinalizationProof, StorageError>;

    /// Saves `proof`.
    fn save_proof(&mut self, proof: &FinalizationProof) -> Result<(), StorageError>;
}

/// Vector-backed proof storage for tests and offline tools.
#[derive(Default)]
pub struct MemoryProofStorage {
    proofs: Vec<FinalizationProof>,
}

impl MemoryProofStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProofStorage for MemoryProofStorage {
    fn statistics(&self) -> FinalizationStatistics {
        self.proofs
            .last()
            .map(|proof| FinalizationStatistics {
                round: proof.round,
                height: proof.height,
                hash: proof.hash,
            })
            .unwrap_or_default()
    }

    fn load_proof_at_epoch(
        &self,
        epoch: FinalizationEpoch,
    ) -> Result<FinalizationProof, StorageError> {
        self.proofs
            .iter()
            .rev()
            .find(|proof| proof.round.epoch == epoch)
            .cloned()
            .ok_or_else(|| StorageError::ProofNotFound(format!("epoch {}", epoch)))
    }

    fn load_proof_at_height(&self, height: Height) -> Result<FinalizationProof, StorageError> {
        self.proofs
            .iter()
            .rev()
            .find(|proof| proof.height == height)
            .cloned()
            .ok_or_else(|| StorageError::ProofNotFound(format!("height {}", height)))
    }

    fn save_proof(&mut self, proof: &FinalizationProof) -> Result<(), StorageError> {
        self.proofs.push(proof.clone());
        Ok(())
    }
}

/// Proof storage decoration that notifies a finalization subscriber.
///
/// A save is either store-then-notify or dropped entirely: a proof
/// older than the current statistics round never reaches the inner
/// store and never notifies.
pub struct AggregateProofStorage {
    storage: Box<dyn ProofStorage>,
    subscriber: Box<dyn FinalizationSubscriber>,
}

impl AggregateProofStorage {
    /// Creates an aggregate around `storage` and `subscriber`.
    pub fn new(storage: Box<dyn ProofStorage>, subscriber: Box<dyn FinalizationSubscriber>) -> Self {
        Self {
            storage,
            subscriber,
        }
    }
}

impl ProofStorage for AggregateProofStorage {
    fn statistics(&self) -> FinalizationStatistics {
        self.storage.statistics()
    }

    fn load_proof_at_epoch(
        &self,
        epoch: FinalizationEpoch,
    ) -> Result<FinalizationProof, StorageError> {
        self.storage.load_proof_at_epoch(epoch)
    }

    fn load_proof_at_height(&self, height: Height) -> Result<FinalizationProof, StorageError> {
        self.storage.load_proof_at_height(height)
    }

    fn save_proof(&mut self, proof: &FinalizationProof) -> Result<(), StorageError> {
        let current_statistics = self.statistics();
        if current_statistics.round > proof.round {
            tracing::debug!(
                proof_round = %proof.round,
                last_round = %current_statistics.round,
                "skipping save of older proof"
            );
            return Ok(());
        }

        if current_statistics.round == proof.round && current_statistics.height.unwrap() != 0 {
            tracing::info!(round = %proof.round, "re-saving proof for current round");
        }

        self.storage.save_proof(proof)?;
        self.subscriber
            .notify_finalized_block(proof.round, proof.height, proof.hash);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{FinalizationRound, Hash256};
    use std::sync::Arc;

    #[derive(Default)]
    struct NotificationLog {
        notifications: parking_lot::Mutex<Vec<(FinalizationRound, Height, Hash256)>>,
    }

    struct RecordingSubscriber {
        log: Arc<NotificationLog>,
    }

    impl FinalizationSubscriber for RecordingSubscriber {
        fn notify_finalized_block(
            &mut self,
            round: FinalizationRound,
            height: Height,
            hash: Hash256,
        ) {
            self.log.notifications.lock().push((round, height, hash));
        }
    }

    fn proof(epoch: u32, point: u32, height: u64, tag: u8) -> FinalizationProof {
        FinalizationProof {
            round: FinalizationRound::new(epoch, point),
            height: Height(height),
            hash: Hash256([tag; 32]),
            witness: vec![tag; 8],
        }
    }

    fn create_aggregate() -> (AggregateProofStorage, Arc<NotificationLog>) {
        let log = Arc::new(NotificationLog::default());
        let storage = AggregateProofStorage::new(
            Box::new(MemoryProofStorage::new()),
            Box::new(RecordingSubscriber {
                log: Arc::clone(&log),
            }),
        );
        (storage, log)
    }

    #[test]
    fn save_stores_then_notifies() {
        let (mut storage, log) = create_aggregate();

        storage.save_proof(&proof(1, 2, 100, 0xAA)).unwrap();

        let statistics = storage.statistics();
        assert_eq!(FinalizationRound::new(1, 2), statistics.round);
        assert_eq!(Height(100), statistics.height);
        assert_eq!(
            vec![(FinalizationRound::new(1, 2), Height(100), Hash256([0xAA; 32]))],
            log.notifications.lock().clone()
        );
    }

    #[test]
    fn stale_round_save_is_dropped_without_notification() {
        let (mut storage, log) = create_aggregate();
        storage.save_proof(&proof(2, 5, 200, 0xBB)).unwrap();
        log.notifications.lock().clear();

        storage.save_proof(&proof(2, 4, 190, 0xCC)).unwrap();

        // the newer statistics survive and nothing was notified
        assert_eq!(FinalizationRound::new(2, 5), storage.statistics().round);
        assert_eq!(Height(200), storage.statistics().height);
        assert!(log.notifications.lock().is_empty());
    }

    #[test]
    fn stale_epoch_save_is_dropped_without_notification() {
        let (mut storage, log) = create_aggregate();
        storage.save_proof(&proof(3, 0, 300, 0xDD)).unwrap();
        log.notifications.lock().clear();

        storage.save_proof(&proof(2, 9, 290, 0xEE)).unwrap();

        assert_eq!(FinalizationRound::new(3, 0), storage.statistics().round);
        assert!(log.notifications.lock().is_empty());
    }

    #[test]
    fn equal_round_save_stores_and_notifies() {
        let (mut storage, log) = create_aggregate();
        storage.save_proof(&proof(2, 5, 200, 0xBB)).unwrap();

        storage.save_proof(&proof(2, 5, 200, 0xBB)).unwrap();

        assert_eq!(2, log.notifications.lock().len());
    }

    #[test]
    fn loads_delegate_to_inner_storage() {
        let (mut storage, _log) = create_aggregate();
        storage.save_proof(&proof(1, 1, 100, 0x11)).unwrap();
        storage.save_proof(&proof(2, 1, 200, 0x22)).unwrap();

        assert_eq!(
            Hash256([0x11; 32]),
            storage
                .load_proof_at_epoch(crate::model::types::FinalizationEpoch(1))
                .unwrap()
                .hash
        );
        assert_eq!(
            Hash256([0x22; 32]),
            storage.load_proof_at_height(Height(200)).unwrap().hash
        );
        assert!(storage.load_proof_at_height(Height(300)).is_err());
    }

    #[test]
    fn memory_storage_statistics_default_to_zero() {
        let storage = MemoryProofStorage::new();

        let statistics = storage.statistics();
        assert_eq!(FinalizationRound::default(), statistics.round);
        assert_eq!(Height(0), statistics.height);
    }
}
