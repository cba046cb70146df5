//! Sub-cache merkle roots handler.

use std::sync::Arc;

use crate::model::types::Height;
use crate::net::packet::PacketType;
use crate::net::payload::payload_from_values;
use crate::storage::cache::BlockStorageCache;

use super::height_request::{process_height_request, HeightRequest};
use super::ServerPacketHandlers;

struct SubCacheMerkleRootsRequest {
    height: Height,
}

impl HeightRequest for SubCacheMerkleRootsRequest {
    const PACKET_TYPE: PacketType = PacketType::SubCacheMerkleRoots;
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

/// Registers a handler that responds with the sub-cache merkle root
/// hashes recorded for the requested block; the response is empty when
/// the block recorded none.
pub fn register_sub_cache_merkle_roots_handler(
    handlers: &mut ServerPacketHandlers,
    storage: Arc<BlockStorageCache>,
) {
    handlers.register_handler(
        PacketType::SubCacheMerkleRoots,
        Box::new(move |packet, context| {
            let storage_view = storage.view();
            let Some(info) = process_height_request::<SubCacheMerkleRootsRequest>(
                &storage_view,
                packet,
                context,
                false,
            ) else {
                return;
            };

            match storage_view.load_block_element(info.request.height()) {
                Ok(element) => context.response(payload_from_values(
                    PacketType::SubCacheMerkleRoots,
                    &element.sub_cache_merkle_roots,
                )),
                Err(error) => {
                    tracing::warn!(height = %info.request.height(), %error, "merkle roots load failed");
                }
            }
        }),
    );
}
