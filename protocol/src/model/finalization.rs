//! Finalization proof records.
//!
//! A proof asserts that a quorum of voters finalized the block at a
//! given (height, hash) during a round. The quorum witness itself is
//! opaque to this layer — only its framing is understood here.

use crate::model::codec::Reader;
use crate::model::types::{FinalizationRound, Hash256, Height};
use crate::model::ModelError;

/// Byte length of the fixed proof prefix
/// (`size || epoch || point || height || hash`).
pub const PROOF_HEADER_SIZE: usize = 4 + 4 + 4 + 8 + Hash256::SIZE;

/// A finalization proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalizationProof {
    /// Round during which the block was finalized.
    pub round: FinalizationRound,
    /// Height of the finalized block.
    pub height: Height,
    /// Hash of the finalized block.
    pub hash: Hash256,
    /// Opaque quorum witness bytes.
    pub witness: Vec<u8>,
}

impl FinalizationProof {
    /// Declared wire size in bytes.
    pub fn size(&self) -> u32 {
        (PROOF_HEADER_SIZE + self.witness.len()) as u32
    }

    /// Serializes the proof.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size() as usize);
        bytes.extend_from_slice(&self.size().to_le_bytes());
        bytes.extend_from_slice(&self.round.epoch.unwrap().to_le_bytes());
        bytes.extend_from_slice(&self.round.point.unwrap().to_le_bytes());
        bytes.extend_from_slice(&self.height.unwrap().to_le_bytes());
        bytes.extend_from_slice(&self.hash.0);
        bytes.extend_from_slice(&self.witness);
        bytes
    }

    /// Deserializes a proof from the front of `bytes`, consuming
    /// exactly the declared size.
    pub fn deserialize(bytes: &[u8]) -> Result<(Self, usize), ModelError> {
        let mut reader = Reader::new(bytes);
        let size = reader.read_u32()? as usize;
        if size < PROOF_HEADER_SIZE {
            return Err(ModelError::InvalidEntitySize {
                declared: size,
                minimum: PROOF_HEADER_SIZE,
            });
        }
        if size > bytes.len() {
            return Err(ModelError::TruncatedEntity {
                expected: size,
                available: bytes.len(),
            });
        }

        let round = FinalizationRound::new(reader.read_u32()?, reader.read_u32()?);
        let height = Height(reader.read_u64()?);
        let hash = reader.read_hash()?;
        let witness = reader.read_bytes(size - PROOF_HEADER_SIZE)?;

        Ok((
            Self {
                round,
                height,
                hash,
                witness,
            },
            size,
        ))
    }
}

/// Identity of the most recently saved proof.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FinalizationStatistics {
    /// Round of the latest proof.
    pub round: FinalizationRound,
    /// Finalized height.
    pub height: Height,
    /// Finalized block hash.
    pub hash: Hash256,
}
