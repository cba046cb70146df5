//! Signed packet envelope.
//!
//! Every outgoing payload is wrapped in a `SecureSigned` packet whose
//! data section is `signature (64) || child header (8) || child data`.
//! The signature is made over the SHA3-256 digest of the child packet
//! (header and data), so tampering with either is detected. The size
//! ceiling applies to the child packet's data, not to the envelope.

use bytes::Bytes;

use crate::crypto::hasher::Sha3_256Builder;
use crate::crypto::signer::{verify, KeyPair};
use crate::model::types::{Key, Signature};

use super::io::{BatchPacketReader, IoError, PacketIo};
use super::packet::{Packet, PacketHeader, PacketType, PACKET_HEADER_SIZE};
use super::payload::{PacketPayload, PacketPayloadBuilder};

/// How a connection authenticates its packets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionSecurityMode {
    /// Packets travel unwrapped.
    None,
    /// Packets travel inside signed envelopes.
    Signed,
}

fn hash_child_packet(child_header: &PacketHeader, child_buffers: &[&[u8]]) -> [u8; 32] {
    let mut builder = Sha3_256Builder::new();
    builder.update(&child_header.serialize());
    for buffer in child_buffers {
        builder.update(buffer);
    }
    builder.finalize().0
}

fn decode_secure_signed(packet: &Packet, remote_key: &Key) -> Result<Packet, IoError> {
    if packet.header.packet_type != PacketType::SecureSigned {
        return Err(IoError::MalformedData);
    }

    if packet.data.len() < Signature::SIZE + PACKET_HEADER_SIZE {
        return Err(IoError::MalformedData);
    }

    let mut signature = Signature::default();
    signature
        .0
        .copy_from_slice(&packet.data[..Signature::SIZE]);

    let child_header = PacketHeader::deserialize(&packet.data[Signature::SIZE..])
        .map_err(|_| IoError::MalformedData)?;
    let child_data = &packet.data[Signature::SIZE + PACKET_HEADER_SIZE..];
    if child_header.size as usize != PACKET_HEADER_SIZE + child_data.len() {
        return Err(IoError::MalformedData);
    }

    let digest = hash_child_packet(&child_header, &[child_data]);
    if !verify(remote_key, &digest, &signature) {
        return Err(IoError::SecurityError);
    }

    Ok(Packet {
        header: child_header,
        data: packet.data.slice(Signature::SIZE + PACKET_HEADER_SIZE..),
    })
}

/// Packet io decoration that signs outgoing payloads and verifies
/// incoming envelopes.
pub struct SecureSignedPacketIo<T: PacketIo> {
    inner: T,
    key_pair: KeyPair,
    remote_key: Key,
    max_signed_packet_data_size: u32,
}

impl<T: PacketIo> SecureSignedPacketIo<T> {
    /// Creates a secure io around `inner`, signing with `key_pair` and
    /// verifying against `remote_key`. A child packet carrying more
    /// than `max_signed_packet_data_size` data bytes is rejected.
    pub fn new(
        inner: T,
        key_pair: KeyPair,
        remote_key: Key,
        max_signed_packet_data_size: u32,
    ) -> Self {
        Self {
            inner,
            key_pair,
            remote_key,
            max_signed_packet_data_size,
        }
    }
}

impl<T: PacketIo> PacketIo for SecureSignedPacketIo<T> {
    fn write(&mut self, payload: &PacketPayload) -> Result<(), IoError> {
        if payload.is_unset() {
            return Err(IoError::MalformedData);
        }

        let child_data_size = payload.data_size();
        if child_data_size as u64 > u64::from(self.max_signed_packet_data_size) {
            return Err(IoError::MalformedData);
        }

        let child_buffers: Vec<&[u8]> =
            payload.buffers.iter().map(|buffer| buffer.as_ref()).collect();
        let digest = hash_child_packet(&payload.header, &child_buffers);
        let signature = self.key_pair.sign(&digest);

        let mut child_bytes =
            Vec::with_capacity(PACKET_HEADER_SIZE + child_data_size);
        child_bytes.extend_from_slice(&payload.header.serialize());
        for buffer in &payload.buffers {
            child_bytes.extend_from_slice(buffer);
        }

        let mut builder = PacketPayloadBuilder::new(PacketType::SecureSigned);
        builder.append_entity(Bytes::copy_from_slice(&signature.0));
        builder.append_entity(Bytes::from(child_bytes));
        let envelope = builder.build();

        self.inner.write(&envelope)
    }

    fn read(&mut self) -> Result<Packet, IoError> {
        let packet = self.inner.read()?;
        decode_secure_signed(&packet, &self.remote_key)
    }
}

/// Batch reader that verifies every incoming envelope until the
/// underlying stream ends.
pub struct SecureSignedBatchPacketReader<T: PacketIo> {
    inner: T,
    remote_key: Key,
}

impl<T: PacketIo> SecureSignedBatchPacketReader<T> {
    /// Creates a batch reader around `inner`, verifying against
    /// `remote_key`.
    pub fn new(inner: T, remote_key: Key) -> Self {
        Self { inner, remote_key }
    }
}

impl<T: PacketIo> BatchPacketReader for SecureSignedBatchPacketReader<T> {
    fn read_multiple(&mut self, consumer: &mut dyn FnMut(Packet)) -> Result<usize, IoError> {
        let mut num_delivered = 0usize;
        loop {
            let packet = match self.inner.read() {
                Ok(packet) => packet,
                Err(IoError::Closed) => return Ok(num_delivered),
                Err(error) => return Err(error),
            };

            consumer(decode_secure_signed(&packet, &self.remote_key)?);
            num_delivered += 1;
        }
    }
}

/// A packet io that is either raw or wrapped in the signed envelope,
/// per the connection security mode.
pub enum SecurePacketIo<T: PacketIo> {
    /// Unwrapped io (`ConnectionSecurityMode::None`).
    Raw(T),
    /// Signed envelope io.
    Signed(SecureSignedPacketIo<T>),
}

impl<T: PacketIo> SecurePacketIo<T> {
    /// Wraps `inner` according to `mode`.
    pub fn new(
        mode: ConnectionSecurityMode,
        inner: T,
        key_pair: KeyPair,
        remote_key: Key,
        max_signed_packet_data_size: u32,
    ) -> Self {
        match mode {
            ConnectionSecurityMode::None => Self::Raw(inner),
            ConnectionSecurityMode::Signed => Self::Signed(SecureSignedPacketIo::new(
                inner,
                key_pair,
                remote_key,
                max_signed_packet_data_size,
            )),
        }
    }
}

impl<T: PacketIo> PacketIo for SecurePacketIo<T> {
    fn write(&mut self, payload: &PacketPayload) -> Result<(), IoError> {
        match self {
            Self::Raw(io) => io.write(payload),
            Self::Signed(io) => io.write(payload),
        }
    }

    fn read(&mut self) -> Result<Packet, IoError> {
        match self {
            Self::Raw(io) => io.read(),
            Self::Signed(io) => io.read(),
        }
    }
}
