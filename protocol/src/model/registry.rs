//! Transaction plugin registry.
//!
//! Each transaction type is backed by a plugin that knows which byte
//! range of the transaction participates in hashing and signing, and
//! which supplementary buffers fold into the merkle component hash.
//! The registry is assembled once at startup and immutable afterwards.

use std::collections::HashMap;

use crate::model::block::Block;
use crate::model::transaction::Transaction;
use crate::model::types::EntityType;

/// Behavior a transaction type contributes to hashing and validation.
pub trait TransactionPlugin: Send + Sync {
    /// Transaction type this plugin handles.
    fn entity_type(&self) -> EntityType;

    /// The byte range fed to entity hashing and signing.
    ///
    /// Defaults to the full transaction body (`max_fee` through the end
    /// of the payload). Plugins narrow this when trailing payload bytes
    /// must not affect the entity hash (e.g. attached cosignatures).
    fn data_buffer(&self, transaction: &Transaction) -> Vec<u8> {
        transaction.body_bytes()
    }

    /// Buffers folded into the merkle component hash after the entity
    /// hash, in plugin-declared order. Empty means the merkle component
    /// hash equals the entity hash.
    fn merkle_supplementary_buffers(&self, _transaction: &Transaction) -> Vec<Vec<u8>> {
        Vec::new()
    }

    /// Returns `true` if the declared transaction size is plausible for
    /// this type.
    fn is_size_valid(&self, _transaction: &Transaction) -> bool {
        true
    }
}

/// A plugin with default hashing behavior, sufficient for transaction
/// types whose whole body participates in the entity hash.
pub struct BasicTransactionPlugin {
    entity_type: EntityType,
}

impl BasicTransactionPlugin {
    /// Creates a basic plugin for `entity_type`.
    pub fn new(entity_type: EntityType) -> Self {
        Self { entity_type }
    }
}

impl TransactionPlugin for BasicTransactionPlugin {
    fn entity_type(&self) -> EntityType {
        self.entity_type
    }
}

/// Immutable map from transaction type to plugin.
#[derive(Default)]
pub struct TransactionRegistry {
    plugins: HashMap<EntityType, Box<dyn TransactionPlugin>>,
}

impl TransactionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry from `plugins`.
    pub fn from_plugins(plugins: Vec<Box<dyn TransactionPlugin>>) -> Self {
        let mut registry = Self::new();
        for plugin in plugins {
            registry.register(plugin);
        }
        registry
    }

    /// Adds `plugin` to the registry. Call sites do this during startup
    /// assembly only.
    pub fn register(&mut self, plugin: Box<dyn TransactionPlugin>) {
        self.plugins.insert(plugin.entity_type(), plugin);
    }

    /// Finds the plugin for `entity_type`.
    pub fn find_plugin(&self, entity_type: EntityType) -> Option<&dyn TransactionPlugin> {
        self.plugins.get(&entity_type).map(|plugin| plugin.as_ref())
    }

    /// Returns `true` if a plugin is registered for `entity_type`.
    pub fn contains(&self, entity_type: EntityType) -> bool {
        self.plugins.contains_key(&entity_type)
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` if no plugins are registered.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// Returns `true` if `transaction` has a registered type and a size
/// that type accepts.
pub fn is_transaction_size_valid(transaction: &Transaction, registry: &TransactionRegistry) -> bool {
    registry
        .find_plugin(transaction.entity_type)
        .map(|plugin| plugin.is_size_valid(transaction))
        .unwrap_or(false)
}

/// Returns `true` if every transaction in `block` has a registered type
/// and a valid size.
pub fn is_block_size_valid(block: &Block, registry: &TransactionRegistry) -> bool {
    block
        .transactions
        .iter()
        .all(|transaction| is_transaction_size_valid(transaction, registry))
}
