//! Wire packet framing.
//!
//! Every packet on the wire is `{ size: u32 LE, type: u32 LE }`
//! followed by `size - 8` data bytes. Packet type codes are stable
//! protocol identifiers; unknown codes survive round trips through
//! [`PacketType::Other`].

use std::fmt;

use bytes::Bytes;

use super::io::IoError;

/// Byte length of the packet header.
pub const PACKET_HEADER_SIZE: usize = 8;

/// Well-known packet types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Chain statistics request/response.
    ChainStatistics,
    /// Single block request.
    PullBlock,
    /// Block range request.
    PullBlocks,
    /// Block hashes request.
    BlockHashes,
    /// Unsolicited block delivery.
    PushBlock,
    /// Unsolicited transactions delivery.
    PushTransactions,
    /// Unconfirmed transactions request.
    PullTransactions,
    /// Sub-cache merkle roots request.
    SubCacheMerkleRoots,
    /// Signed envelope around another packet.
    SecureSigned,
    /// Any other code.
    Other(u32),
}

impl PacketType {
    /// Wire code of this packet type.
    pub fn to_code(self) -> u32 {
        match self {
            Self::ChainStatistics => 1,
            Self::PullBlock => 2,
            Self::PullBlocks => 3,
            Self::BlockHashes => 4,
            Self::PushBlock => 5,
            Self::PushTransactions => 6,
            Self::PullTransactions => 7,
            Self::SubCacheMerkleRoots => 8,
            Self::SecureSigned => 0x100,
            Self::Other(code) => code,
        }
    }

    /// Packet type for a wire `code`.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::ChainStatistics,
            2 => Self::PullBlock,
            3 => Self::PullBlocks,
            4 => Self::BlockHashes,
            5 => Self::PushBlock,
            6 => Self::PushTransactions,
            7 => Self::PullTransactions,
            8 => Self::SubCacheMerkleRoots,
            0x100 => Self::SecureSigned,
            code => Self::Other(code),
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChainStatistics => write!(f, "chain statistics"),
            Self::PullBlock => write!(f, "pull block"),
            Self::PullBlocks => write!(f, "pull blocks"),
            Self::BlockHashes => write!(f, "block hashes"),
            Self::PushBlock => write!(f, "push block"),
            Self::PushTransactions => write!(f, "push transactions"),
            Self::PullTransactions => write!(f, "pull transactions"),
            Self::SubCacheMerkleRoots => write!(f, "sub cache merkle roots"),
            Self::SecureSigned => write!(f, "secure signed"),
            Self::Other(code) => write!(f, "packet type {:#x}", code),
        }
    }
}

/// Fixed packet prefix: declared size and type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketHeader {
    /// Total packet size in bytes, header included.
    pub size: u32,
    /// Packet type.
    pub packet_type: PacketType,
}

impl PacketHeader {
    /// Creates a header for a packet with `data_size` payload bytes.
    pub fn new(packet_type: PacketType, data_size: u32) -> Self {
        Self {
            size: PACKET_HEADER_SIZE as u32 + data_size,
            packet_type,
        }
    }

    /// Serializes the header.
    pub fn serialize(&self) -> [u8; PACKET_HEADER_SIZE] {
        let mut bytes = [0u8; PACKET_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.size.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.packet_type.to_code().to_le_bytes());
        bytes
    }

    /// Deserializes a header from the front of `bytes`.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, IoError> {
        if bytes.len() < PACKET_HEADER_SIZE {
            return Err(IoError::MalformedData);
        }

        let size = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if (size as usize) < PACKET_HEADER_SIZE {
            return Err(IoError::MalformedData);
        }

        let code = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Ok(Self {
            size,
            packet_type: PacketType::from_code(code),
        })
    }
}

/// A framed packet: header plus owned data bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    /// Packet header.
    pub header: PacketHeader,
    /// Data bytes (`header.size - 8` of them).
    pub data: Bytes,
}

impl Packet {
    /// Creates a packet of `packet_type` around `data`.
    pub fn new(packet_type: PacketType, data: Bytes) -> Self {
        Self {
            header: PacketHeader::new(packet_type, data.len() as u32),
            data,
        }
    }

    /// Creates a data-less packet of `packet_type`.
    pub fn header_only(packet_type: PacketType) -> Self {
        Self::new(packet_type, Bytes::new())
    }

    /// Number of data bytes.
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the packet has `packet_type` and a size
    /// consistent with its data.
    pub fn is_valid(&self, packet_type: PacketType) -> bool {
        self.header.packet_type == packet_type
            && self.header.size as usize == PACKET_HEADER_SIZE + self.data.len()
    }

    /// Serializes the whole packet.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(PACKET_HEADER_SIZE + self.data.len());
        bytes.extend_from_slice(&self.header.serialize());
        bytes.extend_from_slice(&self.data);
        bytes
    }

    /// Deserializes a packet from `bytes`, which must contain exactly
    /// one packet.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IoError> {
        let header = PacketHeader::deserialize(bytes)?;
        if header.size as usize != bytes.len() {
            return Err(IoError::MalformedData);
        }

        Ok(Self {
            header,
            data: Bytes::copy_from_slice(&bytes[PACKET_HEADER_SIZE..]),
        })
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "packet ({}, {} bytes)",
            self.header.packet_type, self.header.size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_type_codes_round_trip() {
        let types = [
            PacketType::ChainStatistics,
            PacketType::PullBlock,
            PacketType::PullBlocks,
            PacketType::BlockHashes,
            PacketType::PushBlock,
            PacketType::PushTransactions,
            PacketType::PullTransactions,
            PacketType::SubCacheMerkleRoots,
            PacketType::SecureSigned,
            PacketType::Other(0xDEAD),
        ];

        for packet_type in types {
            assert_eq!(packet_type, PacketType::from_code(packet_type.to_code()));
        }
    }

    #[test]
    fn header_serializes_little_endian() {
        let header = PacketHeader::new(PacketType::PullBlocks, 16);
        let bytes = header.serialize();

        assert_eq!([24, 0, 0, 0], bytes[0..4]);
        assert_eq!([3, 0, 0, 0], bytes[4..8]);
    }

    #[test]
    fn packet_round_trips_through_bytes() {
        let packet = Packet::new(PacketType::PushTransactions, Bytes::from(vec![1, 2, 3, 4]));
        let bytes = packet.to_bytes();

        assert_eq!(12, bytes.len());
        assert_eq!(packet, Packet::from_bytes(&bytes).unwrap());
    }

    #[test]
    fn from_bytes_rejects_size_mismatch() {
        let packet = Packet::new(PacketType::PushTransactions, Bytes::from(vec![1, 2, 3, 4]));
        let mut bytes = packet.to_bytes();
        bytes.push(0xFF);

        assert!(matches!(
            Packet::from_bytes(&bytes),
            Err(IoError::MalformedData)
        ));
    }

    #[test]
    fn from_bytes_rejects_undersized_declaration() {
        let mut bytes = vec![0u8; 12];
        bytes[0] = 4; // size 4 < header size

        assert!(Packet::from_bytes(&bytes).is_err());
    }

    #[test]
    fn is_valid_checks_type_and_size() {
        let packet = Packet::new(PacketType::PullBlock, Bytes::from(vec![0u8; 8]));

        assert!(packet.is_valid(PacketType::PullBlock));
        assert!(!packet.is_valid(PacketType::PullBlocks));

        let mut inconsistent = packet;
        inconsistent.header.size += 1;
        assert!(!inconsistent.is_valid(PacketType::PullBlock));
    }
}
