//! Height-keyed request processing.
//!
//! Every storage-backed handler starts the same way: coerce the packet
//! into its request type, compare the requested height against the
//! chain tip, and answer out-of-range requests with an empty
//! header-only response (which clients read as "unavailable"). Height
//! zero means "chain tip" where a handler opts in.

use crate::model::types::Height;
use crate::net::packet::{Packet, PacketType};
use crate::net::payload::PacketPayload;
use crate::storage::cache::BlockStorageView;

use super::HandlerContext;

/// A fixed-size request carrying a height.
pub trait HeightRequest: Sized {
    /// Packet type of the request.
    const PACKET_TYPE: PacketType;

    /// Exact data size of the request.
    const DATA_SIZE: usize;

    /// Parses the request from exactly [`Self::DATA_SIZE`] bytes.
    fn parse(data: &[u8]) -> Self;

    /// The requested height.
    fn height(&self) -> Height;
}

/// Information about a successfully processed height request.
pub struct HeightRequestInfo<R> {
    /// Current chain height.
    pub chain_height: Height,
    /// Requested height with the zero sentinel resolved to the tip.
    pub normalized_request_height: Height,
    /// The coerced request.
    pub request: R,
}

impl<R> HeightRequestInfo<R> {
    /// Number of blocks available from the normalized height to the
    /// tip, inclusive.
    pub fn num_available_blocks(&self) -> u32 {
        ((self.chain_height - self.normalized_request_height) + 1) as u32
    }
}

/// Processes a height request `packet`.
///
/// Returns `None` without a response for a malformed packet; returns
/// `None` with an empty header-only response for an out-of-range
/// height (above the tip, or zero when `allow_zero` is false).
pub fn process_height_request<R: HeightRequest>(
    storage_view: &BlockStorageView<'_>,
    packet: &Packet,
    context: &mut HandlerContext,
    allow_zero: bool,
) -> Option<HeightRequestInfo<R>> {
    if !packet.is_valid(R::PACKET_TYPE) || packet.data.len() != R::DATA_SIZE {
        return None;
    }

    let request = R::parse(&packet.data);
    let chain_height = storage_view.chain_height();
    tracing::trace!(
        local_height = %chain_height,
        request_height = %request.height(),
        "processing height request"
    );

    let is_zero_request = request.height() == Height(0);
    if chain_height < request.height() || (!allow_zero && is_zero_request) {
        context.response(PacketPayload::header_only(R::PACKET_TYPE));
        return None;
    }

    let normalized_request_height = if is_zero_request {
        chain_height
    } else {
        request.height()
    };

    Some(HeightRequestInfo {
        chain_height,
        normalized_request_height,
        request,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_utils;
    use crate::storage::cache::BlockStorageCache;
    use crate::storage::memory::MemoryBlockStorage;
    use crate::testing;
    use bytes::Bytes;

    struct TestRequest {
        height: Height,
    }

    impl HeightRequest for TestRequest {
        const PACKET_TYPE: PacketType = PacketType::PullBlock;
        const DATA_SIZE: usize = 8;

        fn parse(data: &[u8]) -> Self {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(data);
            Self {
                height: Height(u64::from_le_bytes(raw)),
            }
        }

        fn height(&self) -> Height {
            self.height
        }
    }

    fn storage_cache(chain_height: u64) -> BlockStorageCache {
        BlockStorageCache::new(Box::new(MemoryBlockStorage::with_elements(
            testing::create_block_elements(chain_height),
        )))
    }

    fn request_packet(height: u64) -> Packet {
        Packet::new(PacketType::PullBlock, Bytes::from(height.to_le_bytes().to_vec()))
    }

    fn process(
        chain_height: u64,
        packet: &Packet,
        allow_zero: bool,
    ) -> (Option<HeightRequestInfo<TestRequest>>, Option<PacketPayload>) {
        let cache = storage_cache(chain_height);
        let view = cache.view();
        let mut context = HandlerContext::new(test_utils::test_source());
        let info = process_height_request(&view, packet, &mut context, allow_zero);
        (info, context.take_response())
    }

    #[test]
    fn valid_height_request_is_accepted() {
        let (info, response) = process(12, &request_packet(7), false);

        let info = info.expect("request is valid");
        assert_eq!(Height(12), info.chain_height);
        assert_eq!(Height(7), info.normalized_request_height);
        assert_eq!(6, info.num_available_blocks());
        assert!(response.is_none());
    }

    #[test]
    fn request_at_tip_is_accepted() {
        let (info, _) = process(12, &request_packet(12), false);

        assert_eq!(1, info.unwrap().num_available_blocks());
    }

    #[test]
    fn malformed_packet_gets_no_response() {
        let wrong_type = Packet::new(PacketType::PullBlocks, Bytes::from(vec![0u8; 8]));
        let (info, response) = process(12, &wrong_type, false);
        assert!(info.is_none());
        assert!(response.is_none());

        let wrong_size = Packet::new(PacketType::PullBlock, Bytes::from(vec![0u8; 7]));
        let (info, response) = process(12, &wrong_size, false);
        assert!(info.is_none());
        assert!(response.is_none());
    }

    #[test]
    fn height_above_tip_gets_empty_response() {
        let (info, response) = process(12, &request_packet(13), false);

        assert!(info.is_none());
        let response = response.expect("an empty response is written");
        assert_eq!(8, response.header.size);
        assert_eq!(PacketType::PullBlock, response.header.packet_type);
        assert!(response.buffers.is_empty());
    }

    #[test]
    fn zero_height_is_rejected_when_not_allowed() {
        let (info, response) = process(12, &request_packet(0), false);

        assert!(info.is_none());
        assert_eq!(8, response.expect("empty response").header.size);
    }

    #[test]
    fn zero_height_normalizes_to_tip_when_allowed() {
        let (info, response) = process(12, &request_packet(0), true);

        let info = info.expect("zero height is allowed");
        assert_eq!(Height(12), info.normalized_request_height);
        assert_eq!(1, info.num_available_blocks());
        assert!(response.is_none());
    }
}
