//! # Cryptographic Primitives
//!
//! Everything security-related in the protocol flows through here:
//! entity hashing, merkle roots, block and packet signatures.
//!
//! We deliberately chose boring, well-audited cryptography:
//!
//! - **Ed25519** for signatures — fast, deterministic, strict verification.
//! - **SHA3-256** for hashing — every digest in the chain is SHA3-256,
//!   from transaction entity hashes to the signed-packet envelope.
//!
//! Everything here is a thin, type-safe wrapper around audited
//! implementations.

pub mod hasher;
pub mod merkle;
pub mod signer;

// Re-export the things call sites actually need so they don't have to
// memorize the module hierarchy.
pub use hasher::{sha3_256, sha3_256_multi, Sha3_256Builder};
pub use merkle::MerkleHashBuilder;
pub use signer::{verify, verify_multi, KeyPair};
