//! SHA3-256 hashing.
//!
//! Every digest in the protocol — entity hashes, merkle nodes, packet
//! signatures — comes out of SHA3-256. The incremental builder mirrors
//! the streaming shape hashing call sites want: feed the signature
//! half, the signer, the body, then finalize, without assembling a
//! contiguous buffer first.

use sha3::{Digest, Sha3_256};

use crate::model::types::Hash256;

/// Incremental SHA3-256 builder producing a [`Hash256`].
#[derive(Default)]
pub struct Sha3_256Builder {
    inner: Sha3_256,
}

impl Sha3_256Builder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds `data` into the hash.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalizes the hash.
    pub fn finalize(self) -> Hash256 {
        let digest = self.inner.finalize();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&digest);
        Hash256(hash)
    }
}

/// Computes the SHA3-256 hash of `data` in one shot.
pub fn sha3_256(data: &[u8]) -> Hash256 {
    let mut builder = Sha3_256Builder::new();
    builder.update(data);
    builder.finalize()
}

/// Hashes multiple byte slices as if they were concatenated.
///
/// Avoids the temporary buffer when hashing composite structures like
/// `signature_r || signer || body`.
pub fn sha3_256_multi(parts: &[&[u8]]) -> Hash256 {
    let mut builder = Sha3_256Builder::new();
    for part in parts {
        builder.update(part);
    }
    builder.finalize()
}
