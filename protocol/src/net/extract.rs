//! Entity and structure extraction from packet data.
//!
//! Extraction is strict where it matters: a multi-entity packet must
//! be covered exactly by its entities' declared sizes, and a
//! fixed-structure packet must be an exact multiple of the structure
//! size. A shortfall or overflow yields nothing rather than a prefix.

use crate::model::block::Block;
use crate::model::transaction::Transaction;
use crate::model::ModelError;

use super::packet::Packet;
use super::payload::FixedSizeValue;

/// A variable-size entity that can be read from the front of a byte
/// slice, consuming its declared size.
pub trait WireEntity: Sized {
    /// Deserializes an entity, returning it and the bytes consumed.
    fn deserialize_entity(bytes: &[u8]) -> Result<(Self, usize), ModelError>;
}

impl WireEntity for Block {
    fn deserialize_entity(bytes: &[u8]) -> Result<(Self, usize), ModelError> {
        Block::deserialize(bytes)
    }
}

impl WireEntity for Transaction {
    fn deserialize_entity(bytes: &[u8]) -> Result<(Self, usize), ModelError> {
        Transaction::deserialize(bytes)
    }
}

/// Extracts the first entity from `packet` when its declared size fits
/// the available data and `validator` accepts it.
pub fn extract_entity<T, V>(packet: &Packet, validator: V) -> Option<T>
where
    T: WireEntity,
    V: Fn(&T) -> bool,
{
    let (entity, _) = T::deserialize_entity(&packet.data).ok()?;
    validator(&entity).then_some(entity)
}

/// Extracts all entities from `packet`.
///
/// Returns an empty vector unless the entities' declared sizes cover
/// the packet data exactly and `validator` accepts every one of them.
pub fn extract_entities<T, V>(packet: &Packet, validator: V) -> Vec<T>
where
    T: WireEntity,
    V: Fn(&T) -> bool,
{
    let mut entities = Vec::new();
    let mut offset = 0usize;
    while offset < packet.data.len() {
        let Ok((entity, consumed)) = T::deserialize_entity(&packet.data[offset..]) else {
            return Vec::new();
        };

        if !validator(&entity) {
            return Vec::new();
        }

        offset += consumed;
        entities.push(entity);
    }

    entities
}

/// Number of complete `T` structures in `bytes`, or zero when `bytes`
/// is not an exact multiple of the structure size.
pub fn count_fixed_size_structures<T: FixedSizeValue>(bytes: &[u8]) -> usize {
    if bytes.len() % T::SIZE != 0 {
        return 0;
    }

    bytes.len() / T::SIZE
}

/// Extracts fixed-size structures covering `bytes` exactly.
pub fn read_fixed_size_structures<T: FixedSizeValue>(bytes: &[u8]) -> Vec<T> {
    let count = count_fixed_size_structures::<T>(bytes);
    (0..count)
        .map(|index| T::read(&bytes[index * T::SIZE..]))
        .collect()
}

/// Extracts fixed-size structures covering the packet data exactly.
pub fn extract_fixed_size_structures<T: FixedSizeValue>(packet: &Packet) -> Vec<T> {
    read_fixed_size_structures(&packet.data)
}
