//! Transaction push and pull handlers.

use std::sync::Arc;

use bytes::Bytes;

use crate::model::registry::{is_transaction_size_valid, TransactionRegistry};
use crate::model::transaction::Transaction;
use crate::model::types::{BlockFeeMultiplier, ShortHash, ShortHashesSet};
use crate::net::extract::count_fixed_size_structures;
use crate::net::packet::PacketType;
use crate::net::payload::{payload_from_entities, FixedSizeValue};

use super::{create_push_entity_handler, RangeConsumer, ServerPacketHandlers};

/// Retrieves unconfirmed transactions above a fee multiplier that are
/// not in a set of known short hashes.
pub type UtRetriever =
    Arc<dyn Fn(BlockFeeMultiplier, &ShortHashesSet) -> Vec<Arc<Transaction>> + Send + Sync>;

/// Registers a push transactions handler that validates pushed
/// transactions against `registry` and forwards them to
/// `transaction_range_consumer` tagged with the source peer identity.
pub fn register_push_transactions_handler(
    handlers: &mut ServerPacketHandlers,
    registry: Arc<TransactionRegistry>,
    transaction_range_consumer: RangeConsumer<Transaction>,
) {
    handlers.register_handler(
        PacketType::PushTransactions,
        create_push_entity_handler(
            move |transaction: &Transaction| is_transaction_size_valid(transaction, &registry),
            transaction_range_consumer,
        ),
    );
}

struct PullTransactionsRequest {
    min_fee_multiplier: BlockFeeMultiplier,
    short_hashes: ShortHashesSet,
}

/// Parses `{ min_fee_multiplier: u32, short_hashes: u32[] }`. An empty
/// short hash tail is accepted; a partial trailing structure is not.
fn parse_pull_transactions_request(data: &[u8]) -> Option<PullTransactionsRequest> {
    if data.len() < 4 {
        return None;
    }

    let min_fee_multiplier = BlockFeeMultiplier(u32::read(data));
    let tail = &data[4..];
    let num_short_hashes = count_fixed_size_structures::<ShortHash>(tail);
    if num_short_hashes == 0 && !tail.is_empty() {
        return None;
    }

    let mut short_hashes = ShortHashesSet::with_capacity(num_short_hashes);
    for index in 0..num_short_hashes {
        short_hashes.insert(ShortHash::read(&tail[index * ShortHash::SIZE..]));
    }

    Some(PullTransactionsRequest {
        min_fee_multiplier,
        short_hashes,
    })
}

/// Registers a pull transactions handler that responds with the
/// unconfirmed transactions returned by `ut_retriever`.
pub fn register_pull_transactions_handler(
    handlers: &mut ServerPacketHandlers,
    ut_retriever: UtRetriever,
) {
    handlers.register_handler(
        PacketType::PullTransactions,
        Box::new(move |packet, context| {
            if !packet.is_valid(PacketType::PullTransactions) {
                return;
            }

            let Some(request) = parse_pull_transactions_request(&packet.data) else {
                return;
            };

            let transactions = ut_retriever(request.min_fee_multiplier, &request.short_hashes);
            context.response(payload_from_entities(
                PacketType::PullTransactions,
                transactions
                    .iter()
                    .map(|transaction| Bytes::from(transaction.serialize())),
            ));
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_utils::{process, test_source};
    use crate::handlers::{AnnotatedEntityRange, HandlerContext};
    use crate::model::registry::BasicTransactionPlugin;
    use crate::model::types::to_short_hash;
    use crate::net::packet::Packet;
    use crate::net::PACKET_HEADER_SIZE;
    use crate::testing;
    use parking_lot::Mutex;

    // region push transactions

    fn registered_push_handlers(
        consumed: &Arc<Mutex<Vec<Vec<u64>>>>,
    ) -> ServerPacketHandlers {
        let registry = Arc::new(TransactionRegistry::from_plugins(vec![Box::new(
            BasicTransactionPlugin::new(testing::TEST_TRANSACTION_TYPE),
        )]));
        let log = Arc::clone(consumed);

        let mut handlers = ServerPacketHandlers::new();
        register_push_transactions_handler(
            &mut handlers,
            registry,
            Arc::new(move |range: AnnotatedEntityRange<Transaction>| {
                log.lock().push(
                    range
                        .entities
                        .iter()
                        .map(|transaction| transaction.deadline.unwrap())
                        .collect(),
                );
            }),
        );
        handlers
    }

    #[test]
    fn push_transactions_handler_forwards_valid_range() {
        let consumed = Arc::new(Mutex::new(Vec::new()));
        let handlers = registered_push_handlers(&consumed);

        let mut bytes = testing::create_transaction(1).serialize();
        bytes.extend_from_slice(&testing::create_transaction(2).serialize());
        let packet = Packet::new(PacketType::PushTransactions, Bytes::from(bytes));

        let mut context = HandlerContext::new(test_source());
        handlers.process(&packet, &mut context);

        assert_eq!(vec![vec![1, 2]], consumed.lock().clone());
    }

    #[test]
    fn push_transactions_handler_drops_empty_range() {
        let consumed = Arc::new(Mutex::new(Vec::new()));
        let handlers = registered_push_handlers(&consumed);

        let packet = Packet::header_only(PacketType::PushTransactions);
        let mut context = HandlerContext::new(test_source());
        handlers.process(&packet, &mut context);

        assert!(consumed.lock().is_empty());
    }

    #[test]
    fn push_transactions_handler_drops_unregistered_type() {
        let consumed = Arc::new(Mutex::new(Vec::new()));
        let handlers = registered_push_handlers(&consumed);

        let mut transaction = testing::create_transaction(1);
        transaction.entity_type = crate::model::types::EntityType(0x9999);
        let packet = Packet::new(
            PacketType::PushTransactions,
            Bytes::from(transaction.serialize()),
        );

        let mut context = HandlerContext::new(test_source());
        handlers.process(&packet, &mut context);

        assert!(consumed.lock().is_empty());
    }

    // endregion

    // region pull transactions

    fn pull_packet(min_fee_multiplier: u32, short_hashes: &[ShortHash]) -> Packet {
        let mut data = Vec::new();
        data.extend_from_slice(&min_fee_multiplier.to_le_bytes());
        for short_hash in short_hashes {
            data.extend_from_slice(&short_hash.0.to_le_bytes());
        }
        Packet::new(PacketType::PullTransactions, Bytes::from(data))
    }

    fn registered_pull_handlers(
        requests: &Arc<Mutex<Vec<(u32, Vec<ShortHash>)>>>,
        transactions: Vec<Arc<Transaction>>,
    ) -> ServerPacketHandlers {
        let log = Arc::clone(requests);
        let mut handlers = ServerPacketHandlers::new();
        register_pull_transactions_handler(
            &mut handlers,
            Arc::new(move |min_fee_multiplier, known_short_hashes| {
                let mut sorted: Vec<ShortHash> = known_short_hashes.iter().copied().collect();
                sorted.sort();
                log.lock().push((min_fee_multiplier.unwrap(), sorted));
                transactions.clone()
            }),
        );
        handlers
    }

    #[test]
    fn pull_transactions_handler_delegates_parsed_request() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let transaction = Arc::new(testing::create_transaction(9));
        let handlers = registered_pull_handlers(&requests, vec![Arc::clone(&transaction)]);

        let (_, response) = process(
            &handlers,
            &pull_packet(42, &[ShortHash(7), ShortHash(11)]),
        );

        assert_eq!(
            vec![(42, vec![ShortHash(7), ShortHash(11)])],
            requests.lock().clone()
        );

        let response = response.unwrap();
        assert_eq!(PacketType::PullTransactions, response.header.packet_type);
        assert_eq!(transaction.serialize(), response.buffers[0].to_vec());
    }

    #[test]
    fn pull_transactions_handler_accepts_empty_short_hash_tail() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handlers = registered_pull_handlers(&requests, Vec::new());

        let (_, response) = process(&handlers, &pull_packet(5, &[]));

        assert_eq!(vec![(5, Vec::new())], requests.lock().clone());
        assert_eq!(
            PACKET_HEADER_SIZE as u32,
            response.unwrap().header.size
        );
    }

    #[test]
    fn pull_transactions_handler_ignores_short_data() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handlers = registered_pull_handlers(&requests, Vec::new());

        let packet = Packet::new(PacketType::PullTransactions, Bytes::from(vec![0u8; 3]));
        let (was_processed, response) = process(&handlers, &packet);

        assert!(was_processed);
        assert!(requests.lock().is_empty());
        assert!(response.is_none());
    }

    #[test]
    fn pull_transactions_handler_ignores_partial_short_hash() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handlers = registered_pull_handlers(&requests, Vec::new());

        let packet = Packet::new(
            PacketType::PullTransactions,
            Bytes::from(vec![0u8; 4 + 6]),
        );
        let (_, response) = process(&handlers, &packet);

        assert!(requests.lock().is_empty());
        assert!(response.is_none());
    }

    #[test]
    fn pull_transactions_request_round_trips_through_ut_cache() {
        // end to end: a seeded cache behind the retriever
        let cache = Arc::new(crate::cache::MemoryUtCache::new(
            crate::cache::MemoryCacheOptions::new(1_000_000, 1_000_000, 100),
        ));
        {
            let mut modifier = cache.modifier();
            for info in testing::create_transaction_infos(4) {
                modifier.add(info);
            }
        }

        let known = cache.view().short_hashes()[0];
        let retriever_cache = Arc::clone(&cache);
        let mut handlers = ServerPacketHandlers::new();
        register_pull_transactions_handler(
            &mut handlers,
            Arc::new(move |min_fee_multiplier, known_short_hashes| {
                retriever_cache
                    .view()
                    .unknown_transactions(min_fee_multiplier, known_short_hashes)
            }),
        );

        let (_, response) = process(&handlers, &pull_packet(0, &[known]));

        let response = response.unwrap();
        assert_eq!(3, response.buffers.len());
        let (first, _) = Transaction::deserialize(&response.buffers[0]).unwrap();
        assert_eq!(2, first.deadline.unwrap());
    }

    #[test]
    fn short_hash_collisions_are_possible_by_construction() {
        // two distinct hashes sharing a prefix collide in short hash
        // space; pull clients must tolerate the false positive
        let a = crate::model::types::Hash256([0x11; 32]);
        let mut b_bytes = [0x22u8; 32];
        b_bytes[..4].copy_from_slice(&a.0[..4]);
        let b = crate::model::types::Hash256(b_bytes);

        assert_ne!(a, b);
        assert_eq!(to_short_hash(&a), to_short_hash(&b));
    }

    // endregion
}
