//! Finalization hash tree.
//!
//! An in-memory forest of (height, hash) nodes with parent back-links,
//! used by the finalization orchestrator to reason about which hashes
//! descend from an already-finalized block. Nodes live in an arena and
//! parents are arena indices, so branches can join without lifetime
//! gymnastics.
//!
//! Any node is considered to be an ancestor and descendant of itself.

use std::collections::HashMap;

use crate::model::types::{Hash256, Height, HeightHashPair};

struct TreeNode {
    key: HeightHashPair,
    parent: Option<usize>,
}

/// Forest of height/hash nodes with parent pointers.
#[derive(Default)]
pub struct FinalizationHashTree {
    nodes: Vec<TreeNode>,
    lookup: HashMap<HeightHashPair, usize>,
}

impl FinalizationHashTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tree nodes.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if `key` is contained in this tree.
    pub fn contains(&self, key: &HeightHashPair) -> bool {
        self.lookup.contains_key(key)
    }

    /// Returns `true` if `child_key` descends from `parent_key`,
    /// inclusive.
    ///
    /// Walks parent pointers from `child_key`; when `child_key` is not
    /// in the tree the answer is `false` even if the keys are equal.
    pub fn is_descendant(&self, parent_key: &HeightHashPair, child_key: &HeightHashPair) -> bool {
        let mut current = self.lookup.get(child_key).copied();
        while let Some(index) = current {
            let node = &self.nodes[index];
            if node.key == *parent_key {
                return true;
            }

            current = node.parent;
        }

        false
    }

    /// Finds all ancestors of `key` in leaf-to-root order, inclusive.
    pub fn find_ancestors(&self, key: &HeightHashPair) -> Vec<HeightHashPair> {
        let mut ancestors = Vec::new();
        let mut current = self.lookup.get(key).copied();
        while let Some(index) = current {
            let node = &self.nodes[index];
            ancestors.push(node.key);
            current = node.parent;
        }

        ancestors
    }

    /// Adds a branch of `hashes` at consecutive heights starting at
    /// `height`.
    ///
    /// Each node's parent is the node handled for the predecessor
    /// height-hash. A node that already exists keeps its original
    /// parent — the first-seen parent wins, preserving the earliest
    /// branch.
    pub fn add_branch(&mut self, height: Height, hashes: &[Hash256]) {
        let mut parent: Option<usize> = None;
        for (i, hash) in hashes.iter().enumerate() {
            let key = HeightHashPair::new(height + i as u64, *hash);
            let index = match self.lookup.get(&key) {
                Some(&existing) => {
                    if self.nodes[existing].parent != parent {
                        tracing::debug!(
                            node = %key,
                            "duplicate branch insert with conflicting parent, keeping first-seen"
                        );
                    }
                    existing
                }
                None => {
                    let index = self.nodes.len();
                    self.nodes.push(TreeNode { key, parent });
                    self.lookup.insert(key, index);
                    index
                }
            };

            parent = Some(index);
        }
    }
}
