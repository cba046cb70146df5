//! Full-block hashing, signing and verification.
//!
//! Ties together the entity hasher, the merkle builder and the signer:
//! the transactions hash is the merkle root over the merkle component
//! hashes of the block's transactions, the block signature covers the
//! header body (which includes that root), and verification replays
//! both plus every transaction signature.

use std::fmt;

use crate::crypto::merkle::MerkleHashBuilder;
use crate::crypto::signer::{verify, KeyPair};
use crate::model::block::Block;
use crate::model::elements::{BlockElement, TransactionElement};
use crate::model::entity_hasher::{
    calculate_block_hash, calculate_merkle_component_hash, calculate_transaction_hash,
    calculate_transaction_hash_with_buffer,
};
use crate::model::registry::TransactionRegistry;
use crate::model::transaction::Transaction;
use crate::model::types::{GenerationHash, GenerationHashSeed, Hash256};
use crate::model::ModelError;

use super::transaction_extensions::TransactionExtensions;

/// Possible results of verifying a full block, in check order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyFullBlockResult {
    /// Block is valid.
    Success,
    /// Block header signature is invalid.
    InvalidBlockSignature,
    /// Stored transactions hash does not match the recomputed root.
    InvalidBlockTransactionsHash,
    /// A transaction signature is invalid.
    InvalidTransactionSignature,
}

impl fmt::Display for VerifyFullBlockResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::InvalidBlockSignature => write!(f, "invalid block signature"),
            Self::InvalidBlockTransactionsHash => write!(f, "invalid block transactions hash"),
            Self::InvalidTransactionSignature => write!(f, "invalid transaction signature"),
        }
    }
}

/// Extensions for working with full blocks.
///
/// Without a registry, transaction hashes cover the full transaction
/// body. With a registry, each transaction's plugin declares the data
/// buffer and any merkle supplementary buffers.
pub struct BlockExtensions<'a> {
    generation_hash_seed: GenerationHashSeed,
    registry: Option<&'a TransactionRegistry>,
}

impl<'a> BlockExtensions<'a> {
    /// Creates extensions for blocks containing only basic
    /// transactions.
    pub fn new(generation_hash_seed: GenerationHashSeed) -> Self {
        Self {
            generation_hash_seed,
            registry: None,
        }
    }

    /// Creates extensions for blocks containing transactions
    /// registered in `registry`.
    pub fn with_registry(
        generation_hash_seed: GenerationHashSeed,
        registry: &'a TransactionRegistry,
    ) -> Self {
        Self {
            generation_hash_seed,
            registry: Some(registry),
        }
    }

    fn transaction_entity_hash(&self, transaction: &Transaction) -> Result<Hash256, ModelError> {
        match self.registry {
            None => Ok(calculate_transaction_hash(
                transaction,
                &self.generation_hash_seed,
            )),
            Some(registry) => {
                let plugin = registry
                    .find_plugin(transaction.entity_type)
                    .ok_or(ModelError::UnknownTransactionType(transaction.entity_type))?;
                Ok(calculate_transaction_hash_with_buffer(
                    transaction,
                    &self.generation_hash_seed,
                    &plugin.data_buffer(transaction),
                ))
            }
        }
    }

    fn transaction_merkle_component_hash(
        &self,
        transaction: &Transaction,
        entity_hash: Hash256,
    ) -> Result<Hash256, ModelError> {
        match self.registry {
            None => Ok(entity_hash),
            Some(registry) => calculate_merkle_component_hash(transaction, entity_hash, registry),
        }
    }

    /// Calculates the block transactions hash of `block`.
    pub fn calculate_block_transactions_hash(&self, block: &Block) -> Result<Hash256, ModelError> {
        let mut builder = MerkleHashBuilder::with_capacity(block.transactions.len());
        for transaction in &block.transactions {
            let entity_hash = self.transaction_entity_hash(transaction)?;
            let merkle_component_hash =
                self.transaction_merkle_component_hash(transaction, entity_hash)?;
            builder.update(merkle_component_hash);
        }

        Ok(builder.finalize())
    }

    /// Calculates and writes the block transactions hash of `block`.
    pub fn update_block_transactions_hash(&self, block: &mut Block) -> Result<(), ModelError> {
        block.header.transactions_hash = self.calculate_block_transactions_hash(block)?;
        Ok(())
    }

    /// Updates the transactions hash of `block`, then signs its header
    /// with `signer`.
    pub fn sign_full_block(&self, signer: &KeyPair, block: &mut Block) -> Result<(), ModelError> {
        self.update_block_transactions_hash(block)?;
        block.header.signature = signer.sign(&block.signable_bytes());
        Ok(())
    }

    /// Verifies a full block: header signature first, then the
    /// transactions hash, then every transaction signature.
    /// Short-circuits at the first failure.
    pub fn verify_full_block(&self, block: &Block) -> Result<VerifyFullBlockResult, ModelError> {
        if !verify(
            &block.header.signer_public_key,
            &block.signable_bytes(),
            &block.header.signature,
        ) {
            return Ok(VerifyFullBlockResult::InvalidBlockSignature);
        }

        let expected = self.calculate_block_transactions_hash(block)?;
        if expected != block.header.transactions_hash {
            return Ok(VerifyFullBlockResult::InvalidBlockTransactionsHash);
        }

        let transaction_extensions = TransactionExtensions::new(self.generation_hash_seed);
        for transaction in &block.transactions {
            if !transaction_extensions.verify(transaction) {
                return Ok(VerifyFullBlockResult::InvalidTransactionSignature);
            }
        }

        Ok(VerifyFullBlockResult::Success)
    }

    /// Converts `block` into a hash-annotated block element with the
    /// specified block generation hash.
    pub fn convert_block_to_block_element(
        &self,
        block: Block,
        generation_hash: GenerationHash,
    ) -> Result<BlockElement, ModelError> {
        let mut transactions = Vec::with_capacity(block.transactions.len());
        for transaction in &block.transactions {
            let entity_hash = self.transaction_entity_hash(transaction)?;
            let merkle_component_hash =
                self.transaction_merkle_component_hash(transaction, entity_hash)?;
            transactions.push(TransactionElement {
                entity_hash,
                merkle_component_hash,
            });
        }

        let entity_hash = calculate_block_hash(&block);
        Ok(BlockElement {
            block,
            entity_hash,
            generation_hash,
            transactions,
            sub_cache_merkle_roots: Vec::new(),
        })
    }
}
