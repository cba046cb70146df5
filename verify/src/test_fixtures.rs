//! Test fixtures for the verify tool.

use meridian_protocol::chain::BlockExtensions;
use meridian_protocol::crypto::KeyPair;
use meridian_protocol::model::block::{Block, BlockHeader};
use meridian_protocol::model::elements::BlockElement;
use meridian_protocol::model::types::{
    Difficulty, GenerationHashSeed, Hash256, Height, NetworkIdentifier, Signature, Timestamp,
};
use rand::RngCore;

/// Generation hash seed used by verify tests.
pub fn generation_hash_seed() -> GenerationHashSeed {
    Hash256([0x57; 32])
}

/// Generates a random 32-byte hash.
pub fn random_hash() -> Hash256 {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    Hash256(bytes)
}

/// Creates a linked chain of `count` signed empty blocks as block
/// elements at heights `1..=count`.
pub fn create_chain_elements(count: u64) -> Vec<BlockElement> {
    let signer = KeyPair::generate();
    let extensions = BlockExtensions::new(generation_hash_seed());

    let mut elements = Vec::with_capacity(count as usize);
    let mut previous_hash = Hash256::ZERO;
    for height in 1..=count {
        let mut block = Block {
            header: BlockHeader {
                version: 1,
                network: NetworkIdentifier(0x68),
                signer_public_key: signer.public_key(),
                signature: Signature::default(),
                height: Height(height),
                timestamp: Timestamp(1_000 + height),
                difficulty: Difficulty(100_000),
                previous_block_hash: previous_hash,
                transactions_hash: Hash256::ZERO,
            },
            transactions: Vec::new(),
        };
        extensions
            .sign_full_block(&signer, &mut block)
            .expect("signing a basic block cannot fail");

        let element = extensions
            .convert_block_to_block_element(block, random_hash())
            .expect("conversion of a basic block cannot fail");
        previous_hash = element.entity_hash;
        elements.push(element);
    }

    elements
}
