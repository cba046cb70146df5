//! Ed25519 signing and verification.
//!
//! Strict verification is used throughout: non-canonical `S` values and
//! small-order public keys are rejected, so a signature that verifies
//! here verifies on every honest node.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand_core::OsRng;
use thiserror::Error;

use crate::model::types::{Key, Signature};

/// Errors raised by key material handling.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid private key bytes")]
    InvalidPrivateKey,

    #[error("invalid hex encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// An ed25519 key pair.
pub struct KeyPair {
    signing: SigningKey,
}

impl KeyPair {
    /// Generates a fresh random key pair.
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Reconstructs a key pair from 32 private key bytes.
    pub fn from_private_bytes(bytes: [u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(&bytes),
        }
    }

    /// Reconstructs a key pair from a hex-encoded private key.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self::from_private_bytes(bytes))
    }

    /// Returns the public key.
    pub fn public_key(&self) -> Key {
        Key(self.signing.verifying_key().to_bytes())
    }

    /// Signs `data`, producing a deterministic 64-byte signature.
    pub fn sign(&self, data: &[u8]) -> Signature {
        Signature(self.signing.sign(data).to_bytes())
    }

    /// Signs multiple byte slices as if they were concatenated.
    pub fn sign_multi(&self, parts: &[&[u8]]) -> Signature {
        let total = parts.iter().map(|part| part.len()).sum();
        let mut message = Vec::with_capacity(total);
        for part in parts {
            message.extend_from_slice(part);
        }
        self.sign(&message)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print private key material
        write!(f, "KeyPair({})", self.public_key())
    }
}

/// Verifies `signature` over `data` against `public_key`.
///
/// Returns `false` for any failure: bad signature, public key off the
/// curve, or a non-canonical `S`. Callers map `false` to their own
/// security error; no distinction is leaked.
pub fn verify(public_key: &Key, data: &[u8], signature: &Signature) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };

    let signature = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify_strict(data, &signature).is_ok()
}

/// Verifies `signature` over the concatenation of `parts`.
pub fn verify_multi(public_key: &Key, parts: &[&[u8]], signature: &Signature) -> bool {
    let total = parts.iter().map(|part| part.len()).sum();
    let mut message = Vec::with_capacity(total);
    for part in parts {
        message.extend_from_slice(part);
    }
    verify(public_key, &message, signature)
}
