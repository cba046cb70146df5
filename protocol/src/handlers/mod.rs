//! # Server Packet Handlers
//!
//! The type-dispatched registry the sync server runs on: each packet
//! type maps to one handler, handlers never fail outwards — they
//! either write a response into the context or silently drop malformed
//! input.

pub mod chain;
pub mod height_request;
pub mod merkle_roots;
pub mod transactions;

use std::collections::HashMap;
use std::sync::Arc;

use crate::net::extract::{extract_entities, WireEntity};
use crate::net::packet::{Packet, PacketType};
use crate::net::payload::PacketPayload;
use crate::model::types::Key;

pub use chain::{
    register_block_hashes_handler, register_chain_statistics_handler, register_pull_block_handler,
    register_pull_blocks_handler, register_push_block_handler, PullBlocksHandlerConfig,
};
pub use height_request::{process_height_request, HeightRequest, HeightRequestInfo};
pub use merkle_roots::register_sub_cache_merkle_roots_handler;
pub use transactions::{
    register_pull_transactions_handler, register_push_transactions_handler, UtRetriever,
};

/// Identity of the peer a packet arrived from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceIdentity {
    /// Peer public key.
    pub public_key: Key,
    /// Peer host.
    pub host: String,
}

/// A batch of entities tagged with the peer that pushed them.
pub struct AnnotatedEntityRange<T> {
    /// The extracted entities.
    pub entities: Vec<T>,
    /// The pushing peer.
    pub source: SourceIdentity,
}

/// Consumes an annotated range of pushed entities.
pub type RangeConsumer<T> = Arc<dyn Fn(AnnotatedEntityRange<T>) + Send + Sync>;

/// Per-packet handler invocation context: the packet source and the
/// single response slot.
pub struct HandlerContext {
    source: SourceIdentity,
    response: Option<PacketPayload>,
}

impl HandlerContext {
    /// Creates a context for a packet from `source`.
    pub fn new(source: SourceIdentity) -> Self {
        Self {
            source,
            response: None,
        }
    }

    /// The packet source.
    pub fn source(&self) -> &SourceIdentity {
        &self.source
    }

    /// Sets the response payload.
    pub fn response(&mut self, payload: PacketPayload) {
        self.response = Some(payload);
    }

    /// Returns `true` if a response was set.
    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    /// Takes the response payload, if any.
    pub fn take_response(&mut self) -> Option<PacketPayload> {
        self.response.take()
    }
}

/// A registered packet handler.
pub type PacketHandler = Box<dyn Fn(&Packet, &mut HandlerContext) + Send + Sync>;

/// Type-dispatched packet handler registry.
#[derive(Default)]
pub struct ServerPacketHandlers {
    handlers: HashMap<u32, PacketHandler>,
}

impl ServerPacketHandlers {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered handlers.
    pub fn size(&self) -> usize {
        self.handlers.len()
    }

    /// Registers `handler` for `packet_type`, replacing any previous
    /// registration.
    pub fn register_handler(&mut self, packet_type: PacketType, handler: PacketHandler) {
        self.handlers.insert(packet_type.to_code(), handler);
    }

    /// Returns `true` if a handler is registered for `packet_type`.
    pub fn can_process(&self, packet_type: PacketType) -> bool {
        self.handlers.contains_key(&packet_type.to_code())
    }

    /// Dispatches `packet` to its handler. Returns `false` when no
    /// handler is registered for the packet's type.
    pub fn process(&self, packet: &Packet, context: &mut HandlerContext) -> bool {
        let Some(handler) = self.handlers.get(&packet.header.packet_type.to_code()) else {
            return false;
        };

        handler(packet, context);
        true
    }
}

/// Creates a push handler that extracts a full entity range from the
/// packet and forwards it, tagged with the source identity, to
/// `range_consumer`. An empty or malformed range is logged and
/// dropped.
pub fn create_push_entity_handler<T, V>(
    validator: V,
    range_consumer: RangeConsumer<T>,
) -> PacketHandler
where
    T: WireEntity + Send + Sync + 'static,
    V: Fn(&T) -> bool + Send + Sync + 'static,
{
    Box::new(move |packet, context| {
        let entities = extract_entities(packet, &validator);
        if entities.is_empty() {
            tracing::warn!(%packet, "rejecting empty range");
            return;
        }

        tracing::trace!(%packet, num_entities = entities.len(), "received valid packet");
        range_consumer(AnnotatedEntityRange {
            entities,
            source: context.source().clone(),
        });
    })
}
