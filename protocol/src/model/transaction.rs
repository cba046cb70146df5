//! Transaction wire structure.
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
//! │  max_fee: u64                                │
//! │  deadline: u64                               │
//! ├──────────────────────────────────────────────┤
//! │  payload: [u8; size - 120]  (plugin-defined) │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The signable (and hashable) range of a transaction starts after the
//! entity header: `max_fee || deadline || payload`, prefixed with the
//! network generation hash seed when signing.

use crate::model::codec::Reader;
use crate::model::types::{
    Amount, EntityType, Key, NetworkIdentifier, Signature, Timestamp,
};
use crate::model::ModelError;

/// Byte length of the entity header shared by blocks and transactions
/// (the `size`-through-`signature` prefix).
pub const ENTITY_HEADER_SIZE: usize = 4 + 2 + 1 + 1 + Key::SIZE + Signature::SIZE;

/// Byte length of the fixed transaction header.
pub const TRANSACTION_HEADER_SIZE: usize = ENTITY_HEADER_SIZE + 8 + 8;

/// A transaction: fixed header plus a plugin-defined payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Plugin-defined transaction type.
    pub entity_type: EntityType,
    /// Entity version.
    pub version: u8,
    /// Network this transaction is valid on.
    pub network: NetworkIdentifier,
    /// Public key of the account that signed the transaction.
    pub signer_public_key: Key,
    /// Signature over the generation-hash-seed-prefixed data buffer.
    pub signature: Signature,
    /// Maximum fee the signer will pay.
    pub max_fee: Amount,
    /// Deadline after which the transaction is prunable.
    pub deadline: Timestamp,
    /// Plugin-defined payload bytes.
    pub payload: Vec<u8>,
}

impl Transaction {
    /// Declared wire size in bytes.
    pub fn size(&self) -> u32 {
        (TRANSACTION_HEADER_SIZE + self.payload.len()) as u32
    }

    /// Fee per byte offered by this transaction, rounded down.
    pub fn fee_per_byte(&self) -> u64 {
        self.max_fee.unwrap() / u64::from(self.size())
    }

    /// Serializes the transaction body (everything past the entity
    /// header): `max_fee || deadline || payload`.
    ///
    /// This is the default data buffer fed to entity hashing and
    /// signing unless a plugin narrows it.
    pub fn body_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(16 + self.payload.len());
        bytes.extend_from_slice(&self.max_fee.unwrap().to_le_bytes());
        bytes.extend_from_slice(&self.deadline.unwrap().to_le_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Serializes the complete transaction.
    pub fn serialize(&self) -> Vec<u8> {
        let size = self.size() as usize;
        let mut bytes = Vec::with_capacity(size);
        bytes.extend_from_slice(&self.size().to_le_bytes());
        bytes.extend_from_slice(&self.entity_type.0.to_le_bytes());
        bytes.push(self.version);
        bytes.push(self.network.0);
        bytes.extend_from_slice(&self.signer_public_key.0);
        bytes.extend_from_slice(&self.signature.0);
        bytes.extend_from_slice(&self.body_bytes());
        bytes
    }

    /// Deserializes a transaction from the front of `bytes`, consuming
    /// exactly the declared size. Returns the transaction and the
    /// number of bytes consumed.
    pub fn deserialize(bytes: &[u8]) -> Result<(Self, usize), ModelError> {
        let mut reader = Reader::new(bytes);
        let size = reader.read_u32()? as usize;
        if size < TRANSACTION_HEADER_SIZE {
            return Err(ModelError::InvalidEntitySize {
                declared: size,
                minimum: TRANSACTION_HEADER_SIZE,
            });
        }
        if size > bytes.len() {
            return Err(ModelError::TruncatedEntity {
                expected: size,
                available: bytes.len(),
            });
        }

        let entity_type = EntityType(reader.read_u16()?);
        let version = reader.read_u8()?;
        let network = NetworkIdentifier(reader.read_u8()?);
        let signer_public_key = reader.read_key()?;
        let signature = reader.read_signature()?;
        let max_fee = Amount(reader.read_u64()?);
        let deadline = Timestamp(reader.read_u64()?);
        let payload = reader.read_bytes(size - TRANSACTION_HEADER_SIZE)?;

        Ok((
            Self {
                entity_type,
                version,
                network,
                signer_public_key,
                signature,
                max_fee,
                deadline,
                payload,
            },
            size,
        ))
    }
}

/// A cosignature attached to a partial (aggregate) transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cosignature {
    /// Public key of the cosigner.
    pub signer_public_key: Key,
    /// Cosigner's signature over the parent transaction hash.
    pub signature: Signature,
}
