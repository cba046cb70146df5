//! Memory cache tuning knobs.

/// Limits applied to an in-memory transactions cache.
#[derive(Clone, Copy, Debug)]
pub struct MemoryCacheOptions {
    /// Maximum cumulative serialized size of transactions returned by
    /// a single unknown-transactions query.
    pub max_response_size: u64,
    /// Maximum cumulative serialized size of cached transactions.
    pub max_cache_size: u64,
    /// Maximum number of cached transactions.
    pub max_transaction_count: usize,
}

impl MemoryCacheOptions {
    /// Creates options with the given limits.
    pub fn new(max_response_size: u64, max_cache_size: u64, max_transaction_count: usize) -> Self {
        Self {
            max_response_size,
            max_cache_size,
            max_transaction_count,
        }
    }
}

impl Default for MemoryCacheOptions {
    fn default() -> Self {
        Self {
            max_response_size: 5 * 1024 * 1024,
            max_cache_size: 20 * 1024 * 1024,
            max_transaction_count: 100_000,
        }
    }
}
