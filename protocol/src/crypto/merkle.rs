//! Balanced-duplication merkle hash builder.
//!
//! Leaves are appended one by one; finalization reduces the layers
//! bottom-up, duplicating the final hash of a layer whenever the layer
//! is odd. The root of a single leaf is the leaf itself; the root of
//! zero leaves is the all-zero digest.

use crate::crypto::hasher::sha3_256_multi;
use crate::model::types::Hash256;

/// Builder for a merkle hash over a sequence of 32-byte leaves.
#[derive(Default)]
pub struct MerkleHashBuilder {
    hashes: Vec<Hash256>,
}

impl MerkleHashBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new builder expecting about `capacity` leaves.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            hashes: Vec::with_capacity(capacity),
        }
    }

    /// Appends a leaf.
    pub fn update(&mut self, hash: Hash256) {
        self.hashes.push(hash);
    }

    /// Finalizes the merkle root.
    pub fn finalize(self) -> Hash256 {
        match self.hashes.len() {
            0 => Hash256::ZERO,
            1 => self.hashes[0],
            _ => {
                let mut level = self.hashes;
                while level.len() > 1 {
                    level = reduce(&mut level);
                }
                level[0]
            }
        }
    }

    /// Finalizes the complete tree in layered order: the (padded)
    /// leaves first, then each reduced layer, ending with the root.
    pub fn finalize_tree(self) -> Vec<Hash256> {
        match self.hashes.len() {
            0 => Vec::new(),
            1 => self.hashes,
            _ => {
                let mut tree = Vec::with_capacity(tree_size(self.hashes.len()));
                let mut level = self.hashes;
                while level.len() > 1 {
                    if level.len() % 2 != 0 {
                        level.push(*level.last().expect("level is non-empty"));
                    }
                    tree.extend_from_slice(&level);
                    level = reduce(&mut level);
                }
                tree.push(level[0]);
                tree
            }
        }
    }
}

/// Pads `level` to an even length by duplicating its final hash, then
/// hashes adjacent pairs into the next layer.
fn reduce(level: &mut Vec<Hash256>) -> Vec<Hash256> {
    if level.len() % 2 != 0 {
        level.push(*level.last().expect("level is non-empty"));
    }

    level
        .chunks(2)
        .map(|pair| sha3_256_multi(&[pair[0].as_bytes(), pair[1].as_bytes()]))
        .collect()
}

/// Number of nodes in a merkle tree with `leaf_count` leaves.
pub fn tree_size(leaf_count: usize) -> usize {
    if leaf_count < 2 {
        return leaf_count;
    }

    let mut count = 0;
    let mut level = leaf_count;
    while level > 1 {
        level += level % 2;
        count += level;
        level /= 2;
    }

    count + 1
}
