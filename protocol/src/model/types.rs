//! Fundamental value types shared across the protocol.
//!
//! Everything on the wire reduces to these: 32-byte digests, 64-bit
//! heights and timestamps, 4-byte short hashes. They are deliberately
//! small newtypes so that a `Height` cannot be passed where a
//! `Timestamp` is expected — the compiler catches the class of bug
//! that plagues untyped `u64` soup.

use std::collections::HashSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Hash256
// ---------------------------------------------------------------------------

/// A 32-byte opaque digest.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// Size of the digest in bytes.
    pub const SIZE: usize = 32;

    /// The all-zero digest, used as the empty-merkle-tree sentinel.
    pub const ZERO: Hash256 = Hash256([0u8; 32]);

    /// Parses a digest from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Hash256(bytes))
    }

    /// Returns the digest as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Hash256(bytes)
    }
}

/// Per-network constant mixed into transaction hashes to prevent
/// cross-network replay.
pub type GenerationHashSeed = Hash256;

/// Generation hash of a single block.
pub type GenerationHash = Hash256;

// ---------------------------------------------------------------------------
// Key / Signature
// ---------------------------------------------------------------------------

/// A 32-byte ed25519 public key.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(pub [u8; 32]);

impl Key {
    /// Size of the key in bytes.
    pub const SIZE: usize = 32;
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", hex::encode(self.0))
    }
}

/// A 64-byte ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Size of the signature in bytes.
    pub const SIZE: usize = 64;

    /// First half of the signature (the `R` point), the part that is
    /// mixed into entity hashes.
    pub fn r_part(&self) -> &[u8] {
        &self.0[..32]
    }
}

impl Default for Signature {
    fn default() -> Self {
        Signature([0u8; 64])
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// Base values
// ---------------------------------------------------------------------------

macro_rules! base_value {
    ($(#[$meta:meta])* $name:ident, $repr:ty) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub $repr);

        impl $name {
            /// Returns the underlying raw value.
            pub fn unwrap(self) -> $repr {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$repr> for $name {
            fn from(value: $repr) -> Self {
                $name(value)
            }
        }
    };
}

base_value!(
    /// Block height. Real heights start at 1; 0 is the request-tip
    /// sentinel on the wire and never names a stored block.
    Height,
    u64
);

base_value!(
    /// Network timestamp in milliseconds.
    Timestamp,
    u64
);

base_value!(
    /// Block difficulty.
    Difficulty,
    u64
);

base_value!(
    /// Token amount in the smallest indivisible unit.
    Amount,
    u64
);

base_value!(
    /// Fee-per-byte multiplier used to filter mempool transactions.
    BlockFeeMultiplier,
    u32
);

base_value!(
    /// Finalization epoch.
    FinalizationEpoch,
    u32
);

base_value!(
    /// Finalization point within an epoch.
    FinalizationPoint,
    u32
);

impl std::ops::Add<u64> for Height {
    type Output = Height;

    fn add(self, rhs: u64) -> Height {
        Height(self.0 + rhs)
    }
}

impl std::ops::Sub for Height {
    type Output = u64;

    fn sub(self, rhs: Height) -> u64 {
        self.0 - rhs.0
    }
}

// ---------------------------------------------------------------------------
// ShortHash
// ---------------------------------------------------------------------------

/// The first four bytes of a [`Hash256`] reinterpreted as a
/// little-endian `u32`.
///
/// Short hashes are a probabilistic filter key: two distinct hashes may
/// collide, so callers must tolerate false positives, but a short hash
/// derived from a stored hash always matches itself (no false
/// negatives).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShortHash(pub u32);

impl ShortHash {
    /// Size of a short hash on the wire.
    pub const SIZE: usize = 4;

    /// Returns the underlying raw value.
    pub fn unwrap(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ShortHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Derives the short hash of `hash`.
pub fn to_short_hash(hash: &Hash256) -> ShortHash {
    ShortHash(u32::from_le_bytes([
        hash.0[0], hash.0[1], hash.0[2], hash.0[3],
    ]))
}

/// Unordered set of short hashes.
pub type ShortHashesSet = HashSet<ShortHash>;

// ---------------------------------------------------------------------------
// HeightHashPair
// ---------------------------------------------------------------------------

/// Unique identity of a block inside a forest: its height and hash.
///
/// Equality and hashing are over both fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct HeightHashPair {
    /// Block height.
    pub height: Height,
    /// Block hash.
    pub hash: Hash256,
}

impl HeightHashPair {
    /// Creates a pair from `height` and `hash`.
    pub fn new(height: Height, hash: Hash256) -> Self {
        Self { height, hash }
    }
}

impl fmt::Display for HeightHashPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.hash, self.height)
    }
}

// ---------------------------------------------------------------------------
// FinalizationRound
// ---------------------------------------------------------------------------

/// Coordinate of the finalization overlay: an epoch and a point within
/// it, ordered lexicographically.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FinalizationRound {
    /// Finalization epoch.
    pub epoch: FinalizationEpoch,
    /// Finalization point.
    pub point: FinalizationPoint,
}

impl FinalizationRound {
    /// Creates a round from raw `epoch` and `point` values.
    pub fn new(epoch: u32, point: u32) -> Self {
        Self {
            epoch: FinalizationEpoch(epoch),
            point: FinalizationPoint(point),
        }
    }
}

impl fmt::Display for FinalizationRound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.epoch, self.point)
    }
}

// ---------------------------------------------------------------------------
// ChainScore
// ---------------------------------------------------------------------------

/// Cumulative chain score, a 128-bit quantity carried on the wire as
/// two 64-bit halves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChainScore(pub u128);

impl ChainScore {
    /// Creates a score from its high and low halves.
    pub fn from_parts(high: u64, low: u64) -> Self {
        ChainScore(((high as u128) << 64) | low as u128)
    }

    /// Splits the score into its high and low halves.
    pub fn parts(self) -> (u64, u64) {
        ((self.0 >> 64) as u64, self.0 as u64)
    }
}

impl fmt::Display for ChainScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Network / entity tags
// ---------------------------------------------------------------------------

/// Network identifier byte carried in every entity header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NetworkIdentifier(pub u8);

/// Entity type tag. Block types are fixed by the protocol; transaction
/// types are defined by the plugins registered at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityType(pub u16);

impl EntityType {
    /// A normal block produced by a harvester.
    pub const BLOCK: EntityType = EntityType(0x8001);
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}
