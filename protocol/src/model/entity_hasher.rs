//! Canonical entity hashing.
//!
//! The entity hash of a block or transaction commits to the `R` half
//! of its signature, its signer and its data buffer — for transactions
//! the per-network generation hash seed is mixed in between signer and
//! buffer, so a transaction hash is only meaningful on one network.
//! The signature's `S` half and the entity header prefix are excluded,
//! which keeps the hash stable across re-serialization.

use crate::crypto::hasher::Sha3_256Builder;
use crate::crypto::merkle::MerkleHashBuilder;
use crate::model::block::Block;
use crate::model::elements::TransactionElement;
use crate::model::registry::TransactionRegistry;
use crate::model::transaction::Transaction;
use crate::model::types::{GenerationHashSeed, Hash256};
use crate::model::ModelError;

fn calculate_hash(
    signature_r: &[u8],
    signer: &[u8],
    generation_hash_seed: Option<&GenerationHashSeed>,
    buffer: &[u8],
) -> Hash256 {
    let mut builder = Sha3_256Builder::new();
    builder.update(signature_r);
    // the signer is hashed explicitly to match sign/verify behavior
    builder.update(signer);

    if let Some(seed) = generation_hash_seed {
        builder.update(seed.as_bytes());
    }

    builder.update(buffer);
    builder.finalize()
}

/// Calculates the entity hash of `block`.
///
/// The hashed buffer is the block header body; transactions and the
/// reserved footer do not participate (the header already commits to
/// the transactions through the transactions hash).
pub fn calculate_block_hash(block: &Block) -> Hash256 {
    calculate_hash(
        block.header.signature.r_part(),
        &block.header.signer_public_key.0,
        None,
        &block.signable_bytes(),
    )
}

/// Calculates the entity hash of `transaction` for the network with
/// seed `generation_hash_seed`, hashing the full transaction body.
pub fn calculate_transaction_hash(
    transaction: &Transaction,
    generation_hash_seed: &GenerationHashSeed,
) -> Hash256 {
    calculate_transaction_hash_with_buffer(
        transaction,
        generation_hash_seed,
        &transaction.body_bytes(),
    )
}

/// Calculates the entity hash of `transaction` over an explicit data
/// `buffer` (the range the transaction's plugin declares).
pub fn calculate_transaction_hash_with_buffer(
    transaction: &Transaction,
    generation_hash_seed: &GenerationHashSeed,
    buffer: &[u8],
) -> Hash256 {
    calculate_hash(
        transaction.signature.r_part(),
        &transaction.signer_public_key.0,
        Some(generation_hash_seed),
        buffer,
    )
}

/// Calculates the merkle component hash of `transaction` given its
/// entity hash (`transaction_hash`).
///
/// When the plugin declares no supplementary buffers the component
/// hash is the entity hash itself; otherwise the buffers are folded in
/// after it, in plugin-declared order.
pub fn calculate_merkle_component_hash(
    transaction: &Transaction,
    transaction_hash: Hash256,
    registry: &TransactionRegistry,
) -> Result<Hash256, ModelError> {
    let plugin = registry
        .find_plugin(transaction.entity_type)
        .ok_or(ModelError::UnknownTransactionType(transaction.entity_type))?;

    let supplementary_buffers = plugin.merkle_supplementary_buffers(transaction);
    if supplementary_buffers.is_empty() {
        return Ok(transaction_hash);
    }

    let mut builder = Sha3_256Builder::new();
    builder.update(transaction_hash.as_bytes());
    for buffer in &supplementary_buffers {
        builder.update(buffer);
    }

    Ok(builder.finalize())
}

/// Calculates the complete merkle tree over the merkle component
/// hashes of `transaction_elements`.
pub fn calculate_merkle_tree(transaction_elements: &[TransactionElement]) -> Vec<Hash256> {
    let mut builder = MerkleHashBuilder::with_capacity(transaction_elements.len());
    for element in transaction_elements {
        builder.update(element.merkle_component_hash);
    }

    builder.finalize_tree()
}

/// Calculates both hashes of `transaction` in place into `element`,
/// using the plugin-declared data buffer.
pub fn update_element_hashes(
    registry: &TransactionRegistry,
    generation_hash_seed: &GenerationHashSeed,
    transaction: &Transaction,
    element: &mut TransactionElement,
) -> Result<(), ModelError> {
    let plugin = registry
        .find_plugin(transaction.entity_type)
        .ok_or(ModelError::UnknownTransactionType(transaction.entity_type))?;

    element.entity_hash = calculate_transaction_hash_with_buffer(
        transaction,
        generation_hash_seed,
        &plugin.data_buffer(transaction),
    );
    element.merkle_component_hash =
        calculate_merkle_component_hash(transaction, element.entity_hash, registry)?;
    Ok(())
}
