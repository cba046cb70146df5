// Copyright (c) 2026 Meridian Contributors. MIT License.
// See LICENSE for details.

//! # Meridian Protocol — Core Library
//!
//! The consensus-and-networking core of the Meridian proof-of-stake
//! ledger: the hash lineage that makes a sequence of blocks a
//! verifiable chain, the finalization overlay that makes blocks
//! irrevocable, the mempool caches, and the chain-sync wire protocol.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual concerns of
//! the sync core:
//!
//! - **crypto** — SHA3-256 hashing, merkle building, ed25519 signing.
//! - **model** — wire entities, entity hashing, the plugin registry.
//! - **chain** — full-block sign/verify, the finalization hash tree,
//!   the offline integrity walker.
//! - **cache** — unconfirmed and partial transaction mempools.
//! - **finalization** — proof storage, prevote backups, the patcher.
//! - **net** — packet framing, signed envelopes, rate monitoring.
//! - **handlers** — the server side of the chain-sync protocol.
//! - **storage** — the block storage seam and its decorations.
//! - **subscribers** — fan-out aggregates and the one-shot manager.
//! - **utils** — the spin reader-writer lock everything above shares.
//!
//! ## Design Philosophy
//!
//! 1. Wire formats are explicit little-endian, field by field.
//! 2. Consensus-critical bytes never pass through a reflection-driven
//!    serializer.
//! 3. Handlers never fail outward; they respond or stay silent.
//! 4. If it touches a hash, it has tests.

pub mod cache;
pub mod chain;
pub mod crypto;
pub mod finalization;
pub mod handlers;
pub mod model;
pub mod net;
pub mod storage;
pub mod subscribers;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
