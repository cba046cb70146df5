//! Block wire structure.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  entity header (104 bytes)                   │
//! │  ├── size: u32                               │
//! │  ├── type: u16                               │
//! │  ├── version: u8                             │
//! │  ├── network: u8                             │
//! │  ├── signer_public_key: [u8; 32]             │
//! │  └── signature: [u8; 64]                     │
//! ├──────────────────────────────────────────────┤
//! │  height: u64                                 │
//! │  timestamp: u64                              │
//! │  difficulty: u64                             │
//! │  previous_block_hash: [u8; 32]               │
//! │  transactions_hash: [u8; 32]                 │
//! ├──────────────────────────────────────────────┤
//! │  footer: [u8; 8]  (reserved)                 │
//! ├──────────────────────────────────────────────┤
//! │  transactions, each padded to 8 bytes        │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The signable range of a block is the header body between the entity
//! header and the footer (`height` through `transactions_hash`). The
//! footer is excluded from both the signature and the entity hash, so
//! reserved bytes can change without invalidating stored chains.

use crate::model::codec::{padded_size, Reader};
use crate::model::transaction::{Transaction, ENTITY_HEADER_SIZE};
use crate::model::types::{
    Difficulty, EntityType, Hash256, Height, Key, NetworkIdentifier, Signature, Timestamp,
};
use crate::model::ModelError;

/// Byte length of the block header body covered by the signature
/// (`height` through `transactions_hash`).
pub const BLOCK_HEADER_BODY_SIZE: usize = 8 + 8 + 8 + Hash256::SIZE + Hash256::SIZE;

/// Byte length of the reserved block footer.
pub const BLOCK_FOOTER_SIZE: usize = 8;

/// Byte length of the full fixed block header.
pub const BLOCK_HEADER_SIZE: usize = ENTITY_HEADER_SIZE + BLOCK_HEADER_BODY_SIZE + BLOCK_FOOTER_SIZE;

/// Block header: everything except the transaction list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    /// Entity version.
    pub version: u8,
    /// Network this block belongs to.
    pub network: NetworkIdentifier,
    /// Public key of the harvester that signed the block.
    pub signer_public_key: Key,
    /// Signature over the header body.
    pub signature: Signature,
    /// Block height; the first block of a chain has height 1.
    pub height: Height,
    /// Network timestamp at which the block was harvested.
    pub timestamp: Timestamp,
    /// Block difficulty.
    pub difficulty: Difficulty,
    /// Entity hash of the previous block, zero for the first block.
    pub previous_block_hash: Hash256,
    /// Merkle root over the merkle component hashes of the block's
    /// transactions.
    pub transactions_hash: Hash256,
}

/// A full block: header plus an ordered transaction list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// Block metadata and chain linkage.
    pub header: BlockHeader,
    /// Ordered transactions included in this block.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Declared wire size in bytes: the fixed header plus every
    /// transaction at its 8-byte-aligned size.
    pub fn size(&self) -> u32 {
        let transactions_size: usize = self
            .transactions
            .iter()
            .map(|transaction| padded_size(transaction.size() as usize))
            .sum();
        (BLOCK_HEADER_SIZE + transactions_size) as u32
    }

    /// Serializes the header body covered by the signature and the
    /// entity hash (`height` through `transactions_hash`, footer
    /// excluded).
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(BLOCK_HEADER_BODY_SIZE);
        bytes.extend_from_slice(&self.header.height.unwrap().to_le_bytes());
        bytes.extend_from_slice(&self.header.timestamp.unwrap().to_le_bytes());
        bytes.extend_from_slice(&self.header.difficulty.unwrap().to_le_bytes());
        bytes.extend_from_slice(&self.header.previous_block_hash.0);
        bytes.extend_from_slice(&self.header.transactions_hash.0);
        bytes
    }

    /// Serializes the complete block.
    pub fn serialize(&self) -> Vec<u8> {
        let size = self.size() as usize;
        let mut bytes = Vec::with_capacity(size);
        bytes.extend_from_slice(&(size as u32).to_le_bytes());
        bytes.extend_from_slice(&EntityType::BLOCK.0.to_le_bytes());
        bytes.push(self.header.version);
        bytes.push(self.header.network.0);
        bytes.extend_from_slice(&self.header.signer_public_key.0);
        bytes.extend_from_slice(&self.header.signature.0);
        bytes.extend_from_slice(&self.signable_bytes());
        bytes.extend_from_slice(&[0u8; BLOCK_FOOTER_SIZE]);

        for transaction in &self.transactions {
            let start = bytes.len();
            bytes.extend_from_slice(&transaction.serialize());
            let written = bytes.len() - start;
            bytes.resize(start + padded_size(written), 0);
        }

        bytes
    }

    /// Deserializes a block from the front of `bytes`, consuming
    /// exactly the declared size. Returns the block and the number of
    /// bytes consumed.
    pub fn deserialize(bytes: &[u8]) -> Result<(Self, usize), ModelError> {
        let mut reader = Reader::new(bytes);
        let size = reader.read_u32()? as usize;
        if size < BLOCK_HEADER_SIZE {
            return Err(ModelError::InvalidEntitySize {
                declared: size,
                minimum: BLOCK_HEADER_SIZE,
            });
        }
        if size > bytes.len() {
            return Err(ModelError::TruncatedEntity {
                expected: size,
                available: bytes.len(),
            });
        }

        let entity_type = EntityType(reader.read_u16()?);
        if entity_type != EntityType::BLOCK {
            return Err(ModelError::UnexpectedEntityType(entity_type));
        }

        let version = reader.read_u8()?;
        let network = NetworkIdentifier(reader.read_u8()?);
        let signer_public_key = reader.read_key()?;
        let signature = reader.read_signature()?;
        let height = Height(reader.read_u64()?);
        let timestamp = Timestamp(reader.read_u64()?);
        let difficulty = Difficulty(reader.read_u64()?);
        let previous_block_hash = reader.read_hash()?;
        let transactions_hash = reader.read_hash()?;
        reader.skip(BLOCK_FOOTER_SIZE)?;

        let mut transactions = Vec::new();
        while reader.offset() < size {
            let (transaction, consumed) =
                Transaction::deserialize(&bytes[reader.offset()..size])?;
            let step = padded_size(consumed).min(size - reader.offset());
            reader.skip(step)?;
            transactions.push(transaction);
        }

        Ok((
            Self {
                header: BlockHeader {
                    version,
                    network,
                    signer_public_key,
                    signature,
                    height,
                    timestamp,
                    difficulty,
                    previous_block_hash,
                    transactions_hash,
                },
                transactions,
            },
            size,
        ))
    }
}
