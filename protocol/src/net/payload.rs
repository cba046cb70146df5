//! Packet payloads and the size-checked payload builder.
//!
//! A payload is a packet header plus an ordered list of byte buffers;
//! the sum of the buffer sizes plus the header equals the declared
//! packet size. The builder size-checks every append against a
//! configurable ceiling; the first violation (including arithmetic
//! overflow of the size field) latches a sticky failure and `build()`
//! then yields the unset payload.

use bytes::Bytes;

use crate::model::types::{Hash256, ShortHash};

use super::packet::{Packet, PacketHeader, PacketType, PACKET_HEADER_SIZE};

/// A value with a fixed wire size, usable in homogeneous packet
/// sections.
pub trait FixedSizeValue: Copy {
    /// Wire size in bytes.
    const SIZE: usize;

    /// Appends the little-endian encoding to `out`.
    fn write(&self, out: &mut Vec<u8>);

    /// Reads a value from exactly `SIZE` bytes.
    fn read(bytes: &[u8]) -> Self;
}

impl FixedSizeValue for u32 {
    const SIZE: usize = 4;

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read(bytes: &[u8]) -> Self {
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

impl FixedSizeValue for u64 {
    const SIZE: usize = 8;

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        u64::from_le_bytes(raw)
    }
}

impl FixedSizeValue for ShortHash {
    const SIZE: usize = 4;

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0.to_le_bytes());
    }

    fn read(bytes: &[u8]) -> Self {
        ShortHash(u32::read(bytes))
    }
}

impl FixedSizeValue for Hash256 {
    const SIZE: usize = 32;

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }

    fn read(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 32];
        raw.copy_from_slice(&bytes[..32]);
        Hash256(raw)
    }
}

/// A packet header plus the buffers forming its data section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketPayload {
    /// Packet header covering all buffers.
    pub header: PacketHeader,
    /// Ordered data buffers.
    pub buffers: Vec<Bytes>,
}

impl PacketPayload {
    /// The unset payload, produced by a failed builder. Writing it is
    /// an error.
    pub fn unset() -> Self {
        Self {
            header: PacketHeader {
                size: 0,
                packet_type: PacketType::Other(0),
            },
            buffers: Vec::new(),
        }
    }

    /// A payload with a header and no data.
    pub fn header_only(packet_type: PacketType) -> Self {
        Self {
            header: PacketHeader::new(packet_type, 0),
            buffers: Vec::new(),
        }
    }

    /// A payload around an existing packet.
    pub fn from_packet(packet: Packet) -> Self {
        Self {
            header: packet.header,
            buffers: if packet.data.is_empty() {
                Vec::new()
            } else {
                vec![packet.data]
            },
        }
    }

    /// Returns `true` for the unset payload.
    pub fn is_unset(&self) -> bool {
        self.header.size == 0
    }

    /// Number of data bytes across all buffers.
    pub fn data_size(&self) -> usize {
        self.buffers.iter().map(|buffer| buffer.len()).sum()
    }
}

/// Size-checked builder for packet payloads.
pub struct PacketPayloadBuilder {
    packet_type: PacketType,
    max_packet_data_size: u32,
    buffers: Vec<Bytes>,
    data_size: u32,
    has_error: bool,
}

impl PacketPayloadBuilder {
    /// Creates a builder for packets of `packet_type` without a
    /// practical size ceiling.
    pub fn new(packet_type: PacketType) -> Self {
        Self::with_max_size(packet_type, u32::MAX - PACKET_HEADER_SIZE as u32)
    }

    /// Creates a builder with a `max_packet_data_size` ceiling.
    pub fn with_max_size(packet_type: PacketType, max_packet_data_size: u32) -> Self {
        Self {
            packet_type,
            max_packet_data_size,
            buffers: Vec::new(),
            data_size: 0,
            has_error: false,
        }
    }

    fn try_reserve(&mut self, additional: usize) -> bool {
        if self.has_error {
            return false;
        }

        let fits = u32::try_from(additional)
            .ok()
            .and_then(|additional| self.data_size.checked_add(additional))
            .map(|new_size| new_size <= self.max_packet_data_size)
            .unwrap_or(false);
        if !fits {
            self.has_error = true;
            return false;
        }

        true
    }

    /// Appends a serialized entity.
    pub fn append_entity(&mut self, entity_bytes: Bytes) -> bool {
        if !self.try_reserve(entity_bytes.len()) {
            return false;
        }

        self.data_size += entity_bytes.len() as u32;
        if !entity_bytes.is_empty() {
            self.buffers.push(entity_bytes);
        }
        true
    }

    /// Appends multiple serialized entities; stops and fails on the
    /// first that does not fit.
    pub fn append_entities<I>(&mut self, entities: I) -> bool
    where
        I: IntoIterator<Item = Bytes>,
    {
        for entity_bytes in entities {
            if !self.append_entity(entity_bytes) {
                return false;
            }
        }

        true
    }

    /// Appends a single fixed-size value.
    pub fn append_value<T: FixedSizeValue>(&mut self, value: T) -> bool {
        self.append_values(std::slice::from_ref(&value))
    }

    /// Appends a sequence of fixed-size values as one buffer.
    pub fn append_values<T: FixedSizeValue>(&mut self, values: &[T]) -> bool {
        let total = values.len() * T::SIZE;
        if !self.try_reserve(total) {
            return false;
        }

        let mut bytes = Vec::with_capacity(total);
        for value in values {
            value.write(&mut bytes);
        }

        self.data_size += total as u32;
        if !bytes.is_empty() {
            self.buffers.push(Bytes::from(bytes));
        }
        true
    }

    /// Builds the payload; a failed builder yields the unset payload.
    pub fn build(self) -> PacketPayload {
        if self.has_error {
            return PacketPayload::unset();
        }

        PacketPayload {
            header: PacketHeader::new(self.packet_type, self.data_size),
            buffers: self.buffers,
        }
    }
}

// ---------------------------------------------------------------------------
// Factory helpers
// ---------------------------------------------------------------------------

/// Creates a payload of `packet_type` around one serialized entity.
pub fn payload_from_entity(packet_type: PacketType, entity_bytes: Bytes) -> PacketPayload {
    payload_from_entities(packet_type, std::iter::once(entity_bytes))
}

/// Creates a payload of `packet_type` around multiple serialized
/// entities.
pub fn payload_from_entities<I>(packet_type: PacketType, entities: I) -> PacketPayload
where
    I: IntoIterator<Item = Bytes>,
{
    let mut builder = PacketPayloadBuilder::new(packet_type);
    builder.append_entities(entities);
    builder.build()
}

/// Creates a payload of `packet_type` around a fixed-size value range.
pub fn payload_from_values<T: FixedSizeValue>(
    packet_type: PacketType,
    values: &[T],
) -> PacketPayload {
    let mut builder = PacketPayloadBuilder::new(packet_type);
    builder.append_values(values);
    builder.build()
}
