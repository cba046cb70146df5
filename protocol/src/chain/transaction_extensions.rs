//! Transaction signing and verification.
//!
//! The signed range of a transaction is the generation hash seed
//! followed by the transaction body, so a signature made for one
//! network never verifies on another.

use crate::crypto::signer::{verify_multi, KeyPair};
use crate::model::transaction::Transaction;
use crate::model::types::GenerationHashSeed;

/// Signing and verification for standalone transactions.
pub struct TransactionExtensions {
    generation_hash_seed: GenerationHashSeed,
}

impl TransactionExtensions {
    /// Creates extensions for the network with `generation_hash_seed`.
    pub fn new(generation_hash_seed: GenerationHashSeed) -> Self {
        Self {
            generation_hash_seed,
        }
    }

    /// Signs `transaction` with `signer`, writing the signature in
    /// place.
    pub fn sign(&self, signer: &KeyPair, transaction: &mut Transaction) {
        transaction.signature =
            signer.sign_multi(&[self.generation_hash_seed.as_bytes(), &transaction.body_bytes()]);
    }

    /// Verifies the signature of `transaction`.
    pub fn verify(&self, transaction: &Transaction) -> bool {
        verify_multi(
            &transaction.signer_public_key,
            &[self.generation_hash_seed.as_bytes(), &transaction.body_bytes()],
            &transaction.signature,
        )
    }
}
