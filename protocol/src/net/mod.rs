//! # Wire Protocol Plumbing
//!
//! Length-prefixed packet framing, size-checked payload assembly,
//! strict entity extraction, the signed packet envelope and the read
//! rate monitor.

pub mod extract;
pub mod io;
pub mod packet;
pub mod payload;
pub mod rate_monitor;
pub mod secure;

pub use io::{BatchPacketReader, IoError, PacketIo};
pub use packet::{Packet, PacketHeader, PacketType, PACKET_HEADER_SIZE};
pub use payload::{PacketPayload, PacketPayloadBuilder};
pub use rate_monitor::ReadRateMonitorPacketIo;
pub use secure::{
    ConnectionSecurityMode, SecurePacketIo, SecureSignedBatchPacketReader, SecureSignedPacketIo,
};
