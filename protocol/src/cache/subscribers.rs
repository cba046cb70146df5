//! Mempool change subscriber interfaces.
//!
//! Subscribers observe net changes only: a transaction that enters and
//! leaves the cache within one modifier lifetime is never reported.
//! Cosignature attachment is the exception — it fires eagerly, since a
//! cosignature has no meaning after its parent leaves the cache.

use crate::model::info::{TransactionInfo, TransactionInfosSet};
use crate::model::transaction::Cosignature;

/// Unconfirmed transactions change subscriber.
pub trait UtChangeSubscriber: Send {
    /// Indicates `transaction_infos` were added to unconfirmed
    /// transactions.
    fn notify_adds(&mut self, transaction_infos: &TransactionInfosSet);

    /// Indicates `transaction_infos` were removed from unconfirmed
    /// transactions.
    fn notify_removes(&mut self, transaction_infos: &TransactionInfosSet);

    /// Flushes all pending unconfirmed transactions changes.
    fn flush(&mut self);
}

/// Partial transactions change subscriber.
pub trait PtChangeSubscriber: Send {
    /// Indicates `transaction_infos` were added to partial
    /// transactions, without any cosignatures.
    fn notify_add_partials(&mut self, transaction_infos: &TransactionInfosSet);

    /// Indicates `cosignature` was attached to the partial transaction
    /// described by `parent_transaction_info`.
    fn notify_add_cosignature(
        &mut self,
        parent_transaction_info: &TransactionInfo,
        cosignature: &Cosignature,
    );

    /// Indicates `transaction_infos` were removed from partial
    /// transactions.
    fn notify_remove_partials(&mut self, transaction_infos: &TransactionInfosSet);

    /// Flushes all pending partial transactions changes.
    fn flush(&mut self);
}
