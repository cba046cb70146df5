//! CLI walkthrough of the Meridian sync core.
//!
//! Builds a short signed chain, verifies it block by block, runs a
//! finalization round through the proof storage, and replays a
//! pull-blocks exchange against the in-memory storage.
//!
//! Run with:
//!   cargo run --example demo

use std::sync::Arc;

use bytes::Bytes;

use meridian_protocol::chain::{BlockExtensions, VerifyFullBlockResult};
use meridian_protocol::crypto::KeyPair;
use meridian_protocol::finalization::proof_storage::ProofStorage;
use meridian_protocol::finalization::{AggregateProofStorage, MemoryProofStorage};
use meridian_protocol::handlers::{
    register_pull_blocks_handler, HandlerContext, PullBlocksHandlerConfig, ServerPacketHandlers,
    SourceIdentity,
};
use meridian_protocol::model::block::{Block, BlockHeader};
use meridian_protocol::model::finalization::FinalizationProof;
use meridian_protocol::model::types::{
    Difficulty, FinalizationRound, Hash256, Height, Key, NetworkIdentifier, Signature, Timestamp,
};
use meridian_protocol::net::packet::{Packet, PacketType};
use meridian_protocol::storage::{BlockStorageCache, MemoryBlockStorage};
use meridian_protocol::subscribers::FinalizationSubscriber;

const CHAIN_LENGTH: u64 = 8;

struct PrintingSubscriber;

impl FinalizationSubscriber for PrintingSubscriber {
    fn notify_finalized_block(&mut self, round: FinalizationRound, height: Height, hash: Hash256) {
        println!("  -> finalization subscriber: round {round}, block {hash} @ {height}");
    }
}

fn main() {
    println!("== Meridian sync core demo ==");
    println!();

    // 1. build and sign a chain
    println!("building a {CHAIN_LENGTH}-block chain...");
    let harvester = KeyPair::generate();
    let seed = Hash256([0x57; 32]);
    let extensions = BlockExtensions::new(seed);

    let mut elements = Vec::new();
    let mut previous_hash = Hash256::ZERO;
    for height in 1..=CHAIN_LENGTH {
        let mut block = Block {
            header: BlockHeader {
                version: 1,
                network: NetworkIdentifier(0x68),
                signer_public_key: harvester.public_key(),
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
            .sign_full_block(&harvester, &mut block)
            .expect("signing without a registry cannot fail");

        let element = extensions
            .convert_block_to_block_element(block, Hash256([height as u8; 32]))
            .expect("conversion without a registry cannot fail");
        previous_hash = element.entity_hash;
        println!("  block {:>2}: {}", height, element.entity_hash);
        elements.push(element);
    }

    // 2. verify every block
    println!();
    println!("verifying the chain...");
    for element in &elements {
        let result = extensions
            .verify_full_block(&element.block)
            .expect("verification without a registry cannot fail");
        assert_eq!(VerifyFullBlockResult::Success, result);
    }
    println!("  all {} blocks verify", elements.len());

    // 3. finalize the mid-chain block through the proof storage
    println!();
    println!("saving a finalization proof...");
    let finalized = &elements[4];
    let mut proof_storage = AggregateProofStorage::new(
        Box::new(MemoryProofStorage::new()),
        Box::new(PrintingSubscriber),
    );
    proof_storage
        .save_proof(&FinalizationProof {
            round: FinalizationRound::new(1, 3),
            height: finalized.block.header.height,
            hash: finalized.entity_hash,
            witness: Vec::new(),
        })
        .expect("memory proof storage does not fail");
    println!(
        "  statistics now: round {}, height {}",
        proof_storage.statistics().round,
        proof_storage.statistics().height
    );

    // 4. serve a pull-blocks request against the chain
    println!();
    println!("serving a pull-blocks request (height 3, up to 4 blocks)...");
    let storage = Arc::new(BlockStorageCache::new(Box::new(
        MemoryBlockStorage::with_elements(elements),
    )));
    let mut handlers = ServerPacketHandlers::new();
    register_pull_blocks_handler(
        &mut handlers,
        storage,
        PullBlocksHandlerConfig {
            max_blocks: 4,
            max_response_bytes: 1024 * 1024,
        },
    );

    let mut request_data = Vec::new();
    request_data.extend_from_slice(&3u64.to_le_bytes());
    request_data.extend_from_slice(&10u32.to_le_bytes());
    request_data.extend_from_slice(&(1024u32 * 1024).to_le_bytes());
    let request = Packet::new(PacketType::PullBlocks, Bytes::from(request_data));

    let mut context = HandlerContext::new(SourceIdentity {
        public_key: Key([0xEE; 32]),
        host: "demo".to_string(),
    });
    handlers.process(&request, &mut context);

    let response = context.take_response().expect("the request is well-formed");
    for buffer in &response.buffers {
        let (block, _) = Block::deserialize(buffer).expect("served blocks deserialize");
        println!(
            "  <- block {} ({} bytes)",
            block.header.height,
            block.size()
        );
    }

    println!();
    println!("done.");
}
