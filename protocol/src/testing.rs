//! Shared test fixtures.
//!
//! Compiled for tests only. Deadlines double as sequence markers: the
//! n-th generated transaction gets deadline `n + 1`, which lets cache
//! tests assert ordering by reading deadlines back.

use std::sync::Arc;

use rand::RngCore;

use crate::chain::block_extensions::BlockExtensions;
use crate::chain::transaction_extensions::TransactionExtensions;
use crate::crypto::signer::KeyPair;
use crate::model::block::{Block, BlockHeader};
use crate::model::elements::BlockElement;
use crate::model::entity_hasher::calculate_transaction_hash;
use crate::model::info::TransactionInfo;
use crate::model::transaction::Transaction;
use crate::model::types::{
    Amount, Difficulty, EntityType, GenerationHashSeed, Hash256, Height, Key, NetworkIdentifier,
    Signature, Timestamp,
};

/// Transaction type used by tests throughout the crate.
pub const TEST_TRANSACTION_TYPE: EntityType = EntityType(0x4154);

/// Network identifier used by tests.
pub const TEST_NETWORK: NetworkIdentifier = NetworkIdentifier(0x68);

/// Generation hash seed used by tests.
pub fn generation_hash_seed() -> GenerationHashSeed {
    Hash256([0x57; 32])
}

/// Generates a random 32-byte hash.
pub fn random_hash() -> Hash256 {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    Hash256(bytes)
}

/// Generates a random public key (not necessarily on the curve).
pub fn random_key() -> Key {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    Key(bytes)
}

/// Creates an unsigned transaction with the given deadline, a random
/// signer and a 16-byte payload.
pub fn create_transaction(deadline: u64) -> Transaction {
    create_transaction_with_signer(random_key(), deadline)
}

/// Creates an unsigned transaction for `signer` with the given
/// deadline.
pub fn create_transaction_with_signer(signer: Key, deadline: u64) -> Transaction {
    let mut signature = Signature::default();
    rand::thread_rng().fill_bytes(&mut signature.0);

    Transaction {
        entity_type: TEST_TRANSACTION_TYPE,
        version: 1,
        network: TEST_NETWORK,
        signer_public_key: signer,
        signature,
        max_fee: Amount(10 * 136),
        deadline: Timestamp(deadline),
        payload: vec![0xA5; 16],
    }
}

/// Creates a transaction info around `transaction` with its real
/// entity hash.
pub fn create_transaction_info(transaction: Transaction) -> TransactionInfo {
    let entity_hash = calculate_transaction_hash(&transaction, &generation_hash_seed());
    TransactionInfo::new(Arc::new(transaction), entity_hash)
}

/// Creates `count` transaction infos with deadlines `1..=count`.
pub fn create_transaction_infos(count: u64) -> Vec<TransactionInfo> {
    (1..=count)
        .map(|deadline| create_transaction_info(create_transaction(deadline)))
        .collect()
}

/// Creates a transaction info with the given deadline.
pub fn create_transaction_info_with_deadline(deadline: u64) -> TransactionInfo {
    create_transaction_info(create_transaction(deadline))
}

/// Creates an unsigned block at `height` linked to
/// `previous_block_hash`.
pub fn create_block(height: u64, previous_block_hash: Hash256) -> Block {
    Block {
        header: BlockHeader {
            version: 1,
            network: TEST_NETWORK,
            signer_public_key: random_key(),
            signature: Signature::default(),
            height: Height(height),
            timestamp: Timestamp(1_000 + height),
            difficulty: Difficulty(100_000),
            previous_block_hash,
            transactions_hash: Hash256::ZERO,
        },
        transactions: Vec::new(),
    }
}

/// Creates a fully signed block with `transactions` at `height`.
pub fn create_signed_block(
    signer: &KeyPair,
    height: u64,
    previous_block_hash: Hash256,
    transactions: Vec<Transaction>,
) -> Block {
    let mut block = create_block(height, previous_block_hash);
    block.header.signer_public_key = signer.public_key();
    block.transactions = transactions;
    BlockExtensions::new(generation_hash_seed())
        .sign_full_block(signer, &mut block)
        .expect("signing a basic block cannot fail");
    block
}

/// Creates a signed transaction for a fresh random signer.
pub fn create_signed_transaction(deadline: u64) -> Transaction {
    let signer = KeyPair::generate();
    let mut transaction = create_transaction_with_signer(signer.public_key(), deadline);
    TransactionExtensions::new(generation_hash_seed()).sign(&signer, &mut transaction);
    transaction
}

/// Creates a linked chain of `count` signed empty blocks as block
/// elements at heights `1..=count`.
pub fn create_block_elements(count: u64) -> Vec<BlockElement> {
    let signer = KeyPair::generate();
    let extensions = BlockExtensions::new(generation_hash_seed());

    let mut elements = Vec::with_capacity(count as usize);
    let mut previous_hash = Hash256::ZERO;
    for height in 1..=count {
        let block = create_signed_block(&signer, height, previous_hash, Vec::new());
        let element = extensions
            .convert_block_to_block_element(block, random_hash())
            .expect("conversion of a basic block cannot fail");
        previous_hash = element.entity_hash;
        elements.push(element);
    }

    elements
}
