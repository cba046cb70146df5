//! Packet io traits and socket operation codes.

use thiserror::Error;

use super::packet::Packet;
use super::payload::PacketPayload;

/// Socket operation failure codes.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum IoError {
    /// The transport failed to produce a packet.
    #[error("socket read error")]
    ReadError,

    /// The transport failed to accept a packet.
    #[error("socket write error")]
    WriteError,

    /// Packet shape violation: wrong type, size mismatch, truncated
    /// entity or arithmetic overflow.
    #[error("malformed packet data")]
    MalformedData,

    /// Signature verification failure.
    #[error("packet security check failed")]
    SecurityError,

    /// The transport reached an orderly end of stream.
    #[error("connection closed")]
    Closed,
}

/// Reads and writes framed packets.
///
/// Operations are synchronous from the caller's view; deadlines and
/// retries belong to the underlying socket primitives.
pub trait PacketIo: Send {
    /// Writes `payload` as a single packet.
    fn write(&mut self, payload: &PacketPayload) -> Result<(), IoError>;

    /// Reads the next packet.
    fn read(&mut self) -> Result<Packet, IoError>;
}

/// Reads packets until the underlying stream ends.
pub trait BatchPacketReader: Send {
    /// Reads packets, handing each to `consumer`, until the underlying
    /// io reports [`IoError::Closed`]. Returns the number of packets
    /// delivered.
    fn read_multiple(&mut self, consumer: &mut dyn FnMut(Packet)) -> Result<usize, IoError>;
}
