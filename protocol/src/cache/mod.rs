//! # Mempool Caches
//!
//! Unconfirmed and partial transaction caches with insertion-ordered
//! iteration, short-hash filtering, byte/count admission control and
//! net-change subscriber notifications.
//!
//! ```text
//! memory_ut_cache.rs — unconfirmed transactions (signer counters)
//! memory_pt_cache.rs — partial transactions (cosignatures)
//! aggregate.rs       — change-tracking modifiers (commit/cancel)
//! proxy.rs           — plain-vs-aggregate selection
//! subscribers.rs     — ut/pt change subscriber traits
//! options.rs         — size limits
//! ```

pub mod aggregate;
pub mod memory_pt_cache;
pub mod memory_ut_cache;
pub mod options;
pub mod proxy;
pub mod subscribers;

pub use aggregate::{AggregatePtCache, AggregateUtCache};
pub use memory_pt_cache::{MemoryPtCache, MemoryPtCacheView};
pub use memory_ut_cache::{MemoryUtCache, MemoryUtCacheView};
pub use options::MemoryCacheOptions;
pub use proxy::{MemoryPtCacheProxy, MemoryUtCacheProxy, PtCacheModifier, UtCacheModifier};
pub use subscribers::{PtChangeSubscriber, UtChangeSubscriber};
