//! Chain sync handlers: statistics, block pulls and block pushes.

use std::sync::Arc;

use bytes::Bytes;

use crate::model::block::Block;
use crate::model::registry::{is_block_size_valid, TransactionRegistry};
use crate::model::types::{ChainScore, Height};
use crate::net::packet::{Packet, PacketType};
use crate::net::payload::{payload_from_entities, payload_from_entity, PacketPayloadBuilder};
use crate::storage::cache::BlockStorageCache;

use super::height_request::{process_height_request, HeightRequest, HeightRequestInfo};
use super::{create_push_entity_handler, RangeConsumer, ServerPacketHandlers};

/// Supplies the current chain score.
pub type ChainScoreSupplier = Arc<dyn Fn() -> ChainScore + Send + Sync>;

/// Supplies the current finalized height.
pub type FinalizedHeightSupplier = Arc<dyn Fn() -> Height + Send + Sync>;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

struct PullBlockRequest {
    height: Height,
}

impl HeightRequest for PullBlockRequest {
    const PACKET_TYPE: PacketType = PacketType::PullBlock;
    const DATA_SIZE: usize = 8;

    fn parse(data: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&data[..8]);
        Self {
            height: Height(u64::from_le_bytes(raw)),
        }
    }

    fn height(&self) -> Height {
        self.height
    }
}

struct BlockHashesRequest {
    height: Height,
    num_hashes: u32,
}

impl HeightRequest for BlockHashesRequest {
    const PACKET_TYPE: PacketType = PacketType::BlockHashes;
    const DATA_SIZE: usize = 12;

    fn parse(data: &[u8]) -> Self {
        let mut height_raw = [0u8; 8];
        height_raw.copy_from_slice(&data[..8]);
        Self {
            height: Height(u64::from_le_bytes(height_raw)),
            num_hashes: u32::from_le_bytes([data[8], data[9], data[10], data[11]]),
        }
    }

    fn height(&self) -> Height {
        self.height
    }
}

struct PullBlocksRequest {
    height: Height,
    num_blocks: u32,
    num_response_bytes: u32,
}

impl HeightRequest for PullBlocksRequest {
    const PACKET_TYPE: PacketType = PacketType::PullBlocks;
    const DATA_SIZE: usize = 16;

    fn parse(data: &[u8]) -> Self {
        let mut height_raw = [0u8; 8];
        height_raw.copy_from_slice(&data[..8]);
        Self {
            height: Height(u64::from_le_bytes(height_raw)),
            num_blocks: u32::from_le_bytes([data[8], data[9], data[10], data[11]]),
            num_response_bytes: u32::from_le_bytes([data[12], data[13], data[14], data[15]]),
        }
    }

    fn height(&self) -> Height {
        self.height
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Registers a chain statistics handler that responds with the chain
/// height, the finalized height and the two-part chain score.
pub fn register_chain_statistics_handler(
    handlers: &mut ServerPacketHandlers,
    storage: Arc<BlockStorageCache>,
    chain_score_supplier: ChainScoreSupplier,
    finalized_height_supplier: FinalizedHeightSupplier,
) {
    handlers.register_handler(
        PacketType::ChainStatistics,
        Box::new(move |packet, context| {
            if !packet.is_valid(PacketType::ChainStatistics) || packet.data_size() != 0 {
                return;
            }

            let (score_high, score_low) = chain_score_supplier().parts();
            let mut builder = PacketPayloadBuilder::new(PacketType::ChainStatistics);
            builder.append_value(storage.view().chain_height().unwrap());
            builder.append_value(finalized_height_supplier().unwrap());
            builder.append_value(score_high);
            builder.append_value(score_low);
            context.response(builder.build());
        }),
    );
}

/// Registers a pull block handler that responds with one block; height
/// zero pulls the chain tip.
pub fn register_pull_block_handler(handlers: &mut ServerPacketHandlers, storage: Arc<BlockStorageCache>) {
    handlers.register_handler(
        PacketType::PullBlock,
        Box::new(move |packet, context| {
            let storage_view = storage.view();
            let Some(info) = process_height_request::<PullBlockRequest>(
                &storage_view,
                packet,
                context,
                true,
            ) else {
                return;
            };

            match storage_view.load_block(info.normalized_request_height) {
                Ok(block) => context.response(payload_from_entity(
                    PacketType::PullBlock,
                    Bytes::from(block.serialize()),
                )),
                Err(error) => {
                    tracing::warn!(height = %info.normalized_request_height, %error, "pull block load failed");
                }
            }
        }),
    );
}

/// Registers a block hashes handler that responds with at most
/// `max_hashes` block hashes starting at the requested height.
pub fn register_block_hashes_handler(
    handlers: &mut ServerPacketHandlers,
    storage: Arc<BlockStorageCache>,
    max_hashes: u32,
) {
    handlers.register_handler(
        PacketType::BlockHashes,
        Box::new(move |packet, context| {
            let storage_view = storage.view();
            let Some(info) = process_height_request::<BlockHashesRequest>(
                &storage_view,
                packet,
                context,
                false,
            ) else {
                return;
            };

            let num_hashes = max_hashes
                .min(info.request.num_hashes)
                .min(info.num_available_blocks());
            match storage_view.load_hashes_from(info.request.height(), num_hashes as usize) {
                Ok(hashes) => context.response(crate::net::payload::payload_from_values(
                    PacketType::BlockHashes,
                    &hashes,
                )),
                Err(error) => {
                    tracing::warn!(height = %info.request.height(), %error, "block hashes load failed");
                }
            }
        }),
    );
}

/// Configuration for the pull blocks handler.
#[derive(Clone, Copy, Debug)]
pub struct PullBlocksHandlerConfig {
    /// Maximum blocks to return.
    pub max_blocks: u32,
    /// Maximum cumulative response bytes.
    pub max_response_bytes: u32,
}

fn clamp_num_blocks(info: &HeightRequestInfo<PullBlocksRequest>, config: &PullBlocksHandlerConfig) -> u32 {
    config
        .max_blocks
        .min(info.request.num_blocks)
        .min(info.num_available_blocks())
}

/// Registers a pull blocks handler that responds with consecutive
/// blocks subject to two independent caps: a block count cap and a
/// cumulative byte cap. At least one block is returned when the
/// requested height exists.
pub fn register_pull_blocks_handler(
    handlers: &mut ServerPacketHandlers,
    storage: Arc<BlockStorageCache>,
    config: PullBlocksHandlerConfig,
) {
    handlers.register_handler(
        PacketType::PullBlocks,
        Box::new(move |packet, context| {
            let storage_view = storage.view();
            let Some(info) = process_height_request::<PullBlocksRequest>(
                &storage_view,
                packet,
                context,
                false,
            ) else {
                return;
            };

            let num_blocks = clamp_num_blocks(&info, &config);
            let num_response_bytes = config
                .max_response_bytes
                .min(info.request.num_response_bytes);

            let mut payload_size = 0u32;
            let mut blocks = Vec::new();
            for i in 0..num_blocks {
                let height = info.request.height() + u64::from(i);
                let block = match storage_view.load_block(height) {
                    Ok(block) => block,
                    Err(error) => {
                        tracing::warn!(%height, %error, "pull blocks load failed");
                        return;
                    }
                };

                // the first block is always returned
                let block_size = block.size();
                if !blocks.is_empty() && payload_size + block_size > num_response_bytes {
                    break;
                }

                payload_size += block_size;
                blocks.push(Bytes::from(block.serialize()));
            }

            context.response(payload_from_entities(PacketType::PullBlocks, blocks));
        }),
    );
}

/// Registers a push block handler that validates pushed blocks against
/// `registry` and forwards them to `block_range_consumer` tagged with
/// the source peer identity.
pub fn register_push_block_handler(
    handlers: &mut ServerPacketHandlers,
    registry: Arc<TransactionRegistry>,
    block_range_consumer: RangeConsumer<Block>,
) {
    handlers.register_handler(
        PacketType::PushBlock,
        create_push_entity_handler(
            move |block: &Block| is_block_size_valid(block, &registry),
            block_range_consumer,
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_utils::{process, test_source};
    use crate::handlers::{AnnotatedEntityRange, HandlerContext};
    use crate::model::registry::BasicTransactionPlugin;
    use crate::net::payload::FixedSizeValue;
    use crate::net::PACKET_HEADER_SIZE;
    use crate::storage::memory::MemoryBlockStorage;
    use crate::testing;
    use parking_lot::Mutex;

    fn storage_cache(chain_height: u64) -> Arc<BlockStorageCache> {
        Arc::new(BlockStorageCache::new(Box::new(
            MemoryBlockStorage::with_elements(testing::create_block_elements(chain_height)),
        )))
    }

    fn height_packet(packet_type: PacketType, height: u64) -> Packet {
        Packet::new(packet_type, Bytes::from(height.to_le_bytes().to_vec()))
    }

    // region chain statistics

    fn register_statistics(chain_height: u64, finalized: u64, score: ChainScore) -> ServerPacketHandlers {
        let mut handlers = ServerPacketHandlers::new();
        register_chain_statistics_handler(
            &mut handlers,
            storage_cache(chain_height),
            Arc::new(move || score),
            Arc::new(move || Height(finalized)),
        );
        handlers
    }

    #[test]
    fn chain_statistics_handler_writes_four_u64_response() {
        let handlers = register_statistics(12, 7, ChainScore::from_parts(0x1234, 0x5678));

        let (was_processed, response) =
            process(&handlers, &Packet::header_only(PacketType::ChainStatistics));

        assert!(was_processed);
        let response = response.unwrap();
        assert_eq!(PacketType::ChainStatistics, response.header.packet_type);
        assert_eq!((PACKET_HEADER_SIZE + 32) as u32, response.header.size);

        let mut data = Vec::new();
        for buffer in &response.buffers {
            data.extend_from_slice(buffer);
        }
        assert_eq!(12, u64::read(&data[0..]));
        assert_eq!(7, u64::read(&data[8..]));
        assert_eq!(0x1234, u64::read(&data[16..]));
        assert_eq!(0x5678, u64::read(&data[24..]));
    }

    #[test]
    fn chain_statistics_handler_ignores_packet_with_data() {
        let handlers = register_statistics(12, 7, ChainScore::from_parts(0, 0));

        let packet = Packet::new(PacketType::ChainStatistics, Bytes::from(vec![0u8; 4]));
        let (was_processed, response) = process(&handlers, &packet);

        assert!(was_processed);
        assert!(response.is_none());
    }

    // endregion

    // region pull block

    fn register_pull_block(chain_height: u64) -> ServerPacketHandlers {
        let mut handlers = ServerPacketHandlers::new();
        register_pull_block_handler(&mut handlers, storage_cache(chain_height));
        handlers
    }

    #[test]
    fn pull_block_handler_returns_requested_block() {
        let handlers = register_pull_block(12);

        let (_, response) = process(&handlers, &height_packet(PacketType::PullBlock, 7));

        let response = response.unwrap();
        assert_eq!(PacketType::PullBlock, response.header.packet_type);
        let (block, _) = Block::deserialize(&response.buffers[0]).unwrap();
        assert_eq!(Height(7), block.header.height);
    }

    #[test]
    fn pull_block_handler_normalizes_zero_to_tip() {
        let handlers = register_pull_block(12);

        let (_, response) = process(&handlers, &height_packet(PacketType::PullBlock, 0));

        let (block, _) = Block::deserialize(&response.unwrap().buffers[0]).unwrap();
        assert_eq!(Height(12), block.header.height);
    }

    #[test]
    fn pull_block_handler_rejects_height_above_tip_with_empty_response() {
        let handlers = register_pull_block(12);

        let (_, response) = process(&handlers, &height_packet(PacketType::PullBlock, 13));

        let response = response.unwrap();
        assert_eq!(PACKET_HEADER_SIZE as u32, response.header.size);
        assert!(response.buffers.is_empty());
    }

    #[test]
    fn pull_block_handler_ignores_malformed_request() {
        let handlers = register_pull_block(12);

        let malformed = Packet::new(PacketType::PullBlock, Bytes::from(vec![0u8; 7]));
        let (was_processed, response) = process(&handlers, &malformed);

        assert!(was_processed);
        assert!(response.is_none());
    }

    // endregion

    // region block hashes

    fn block_hashes_packet(height: u64, num_hashes: u32) -> Packet {
        let mut data = Vec::new();
        data.extend_from_slice(&height.to_le_bytes());
        data.extend_from_slice(&num_hashes.to_le_bytes());
        Packet::new(PacketType::BlockHashes, Bytes::from(data))
    }

    fn register_block_hashes(chain_height: u64, max_hashes: u32) -> ServerPacketHandlers {
        let mut handlers = ServerPacketHandlers::new();
        register_block_hashes_handler(&mut handlers, storage_cache(chain_height), max_hashes);
        handlers
    }

    fn response_hash_count(response: &crate::net::PacketPayload) -> usize {
        response.data_size() / 32
    }

    #[test]
    fn block_hashes_handler_returns_requested_hashes() {
        let handlers = register_block_hashes(12, 100);

        let (_, response) = process(&handlers, &block_hashes_packet(3, 5));

        let response = response.unwrap();
        assert_eq!(PacketType::BlockHashes, response.header.packet_type);
        assert_eq!(5, response_hash_count(&response));
    }

    #[test]
    fn block_hashes_handler_clamps_to_server_max() {
        let handlers = register_block_hashes(12, 4);

        let (_, response) = process(&handlers, &block_hashes_packet(3, 10));

        assert_eq!(4, response_hash_count(&response.unwrap()));
    }

    #[test]
    fn block_hashes_handler_clamps_to_available_blocks() {
        let handlers = register_block_hashes(12, 100);

        let (_, response) = process(&handlers, &block_hashes_packet(10, 10));

        assert_eq!(3, response_hash_count(&response.unwrap()));
    }

    #[test]
    fn block_hashes_handler_rejects_zero_height() {
        let handlers = register_block_hashes(12, 100);

        let (_, response) = process(&handlers, &block_hashes_packet(0, 10));

        assert_eq!(
            PACKET_HEADER_SIZE as u32,
            response.unwrap().header.size
        );
    }

    // endregion

    // region pull blocks

    fn pull_blocks_packet(height: u64, num_blocks: u32, num_response_bytes: u32) -> Packet {
        let mut data = Vec::new();
        data.extend_from_slice(&height.to_le_bytes());
        data.extend_from_slice(&num_blocks.to_le_bytes());
        data.extend_from_slice(&num_response_bytes.to_le_bytes());
        Packet::new(PacketType::PullBlocks, Bytes::from(data))
    }

    fn register_pull_blocks(chain_height: u64, config: PullBlocksHandlerConfig) -> ServerPacketHandlers {
        let mut handlers = ServerPacketHandlers::new();
        register_pull_blocks_handler(&mut handlers, storage_cache(chain_height), config);
        handlers
    }

    fn response_block_heights(response: &crate::net::PacketPayload) -> Vec<u64> {
        response
            .buffers
            .iter()
            .map(|buffer| {
                let (block, _) = Block::deserialize(buffer).unwrap();
                block.header.height.unwrap()
            })
            .collect()
    }

    fn default_config() -> PullBlocksHandlerConfig {
        PullBlocksHandlerConfig {
            max_blocks: 5,
            max_response_bytes: 10 * 1024 * 1024,
        }
    }

    #[test]
    fn pull_blocks_handler_clamps_count_to_server_max() {
        let handlers = register_pull_blocks(12, default_config());

        let (_, response) = process(&handlers, &pull_blocks_packet(3, 10, 10 * 1024 * 1024));

        assert_eq!(
            vec![3, 4, 5, 6, 7],
            response_block_heights(&response.unwrap())
        );
    }

    #[test]
    fn pull_blocks_handler_respects_byte_cap_boundaries() {
        // empty blocks all serialize to the same size
        let block_size = testing::create_block_elements(1)[0].block.size();
        let three_blocks = 3 * block_size;

        let assert_heights = |num_response_bytes: u32, expected: Vec<u64>| {
            let handlers = register_pull_blocks(12, default_config());
            let (_, response) =
                process(&handlers, &pull_blocks_packet(3, 10, num_response_bytes));
            assert_eq!(expected, response_block_heights(&response.unwrap()));
        };

        assert_heights(three_blocks - 1, vec![3, 4]);
        assert_heights(three_blocks, vec![3, 4, 5]);
        assert_heights(three_blocks + 1, vec![3, 4, 5]);
    }

    #[test]
    fn pull_blocks_handler_always_returns_first_block() {
        // a byte cap below one block still yields the requested block
        let handlers = register_pull_blocks(12, default_config());

        let (_, response) = process(&handlers, &pull_blocks_packet(3, 10, 1));

        assert_eq!(vec![3], response_block_heights(&response.unwrap()));
    }

    #[test]
    fn pull_blocks_handler_clamps_byte_cap_to_server_max() {
        let block_size = testing::create_block_elements(1)[0].block.size();
        let handlers = register_pull_blocks(
            12,
            PullBlocksHandlerConfig {
                max_blocks: 10,
                max_response_bytes: 2 * block_size,
            },
        );

        let (_, response) = process(&handlers, &pull_blocks_packet(3, 10, u32::MAX));

        assert_eq!(vec![3, 4], response_block_heights(&response.unwrap()));
    }

    #[test]
    fn pull_blocks_handler_rejects_height_above_tip_with_empty_response() {
        let handlers = register_pull_blocks(12, default_config());

        let (_, response) = process(&handlers, &pull_blocks_packet(13, 10, u32::MAX));

        assert_eq!(PACKET_HEADER_SIZE as u32, response.unwrap().header.size);
    }

    #[test]
    fn pull_blocks_handler_clamps_count_to_available() {
        let handlers = register_pull_blocks(12, default_config());

        let (_, response) = process(&handlers, &pull_blocks_packet(11, 10, u32::MAX));

        assert_eq!(vec![11, 12], response_block_heights(&response.unwrap()));
    }

    // endregion

    // region push block

    #[test]
    fn push_block_handler_forwards_valid_block() {
        let registry = Arc::new(crate::model::registry::TransactionRegistry::from_plugins(
            vec![Box::new(BasicTransactionPlugin::new(
                testing::TEST_TRANSACTION_TYPE,
            ))],
        ));
        let consumed: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&consumed);

        let mut handlers = ServerPacketHandlers::new();
        register_push_block_handler(
            &mut handlers,
            registry,
            Arc::new(move |range: AnnotatedEntityRange<Block>| {
                log.lock().push(range.entities.len());
            }),
        );

        let signer = crate::crypto::KeyPair::generate();
        let block = testing::create_signed_block(
            &signer,
            1,
            crate::model::types::Hash256::ZERO,
            vec![testing::create_signed_transaction(5)],
        );
        let packet = Packet::new(PacketType::PushBlock, Bytes::from(block.serialize()));

        let mut context = HandlerContext::new(test_source());
        assert!(handlers.process(&packet, &mut context));
        assert_eq!(vec![1], consumed.lock().clone());
    }

    #[test]
    fn push_block_handler_drops_block_with_unregistered_transaction_type() {
        let registry = Arc::new(crate::model::registry::TransactionRegistry::new());
        let consumed: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&consumed);

        let mut handlers = ServerPacketHandlers::new();
        register_push_block_handler(
            &mut handlers,
            registry,
            Arc::new(move |range: AnnotatedEntityRange<Block>| {
                log.lock().push(range.entities.len());
            }),
        );

        let signer = crate::crypto::KeyPair::generate();
        let block = testing::create_signed_block(
            &signer,
            1,
            crate::model::types::Hash256::ZERO,
            vec![testing::create_signed_transaction(5)],
        );
        let packet = Packet::new(PacketType::PushBlock, Bytes::from(block.serialize()));

        let mut context = HandlerContext::new(test_source());
        handlers.process(&packet, &mut context);
        assert!(consumed.lock().is_empty());
    }

    // endregion
}
