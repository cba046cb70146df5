//! Net-change tracking for transaction infos.

use crate::model::info::{TransactionInfo, TransactionInfosSet};

/// Tracks transaction additions and removals, keeping only the net
/// changes.
///
/// Re-adding an info that was previously marked removed cancels the
/// removal instead of recording an add, and vice versa. This works
/// because transactions are immutable — an info that round-trips
/// through remove-then-add is indistinguishable from one that never
/// left.
#[derive(Default)]
pub struct TransactionChangeTracker {
    added: TransactionInfosSet,
    removed: TransactionInfosSet,
}

impl TransactionChangeTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Infos net-added since the last reset.
    pub fn added_transaction_infos(&self) -> &TransactionInfosSet {
        &self.added
    }

    /// Infos net-removed since the last reset.
    pub fn removed_transaction_infos(&self) -> &TransactionInfosSet {
        &self.removed
    }

    /// Marks `transaction_info` as added.
    pub fn add(&mut self, transaction_info: TransactionInfo) {
        if !self.removed.remove(&transaction_info) {
            self.added.insert(transaction_info);
        }
    }

    /// Marks `transaction_info` as removed.
    pub fn remove(&mut self, transaction_info: TransactionInfo) {
        if !self.added.remove(&transaction_info) {
            self.removed.insert(transaction_info);
        }
    }

    /// Clears all tracked changes.
    pub fn reset(&mut self) {
        self.added.clear();
        self.removed.clear();
    }
}
