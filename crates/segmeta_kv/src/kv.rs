//! Transactional key-value store trait definition.

use crate::error::KvResult;
use std::collections::BTreeMap;

/// Default maximum number of operations a single transaction may carry.
pub const DEFAULT_MAX_TXN_OPS: usize = 128;

/// A set of key-value writes, ordered by key.
pub type KvBatch = BTreeMap<String, Vec<u8>>;

/// A transactional key-value store.
///
/// Stores are **opaque byte stores** keyed by strings. The catalog owns the
/// key ranges it writes; a store must not interpret them.
///
/// # Invariants
///
/// - `multi_save`, `multi_remove` and `multi_save_and_remove` are atomic:
///   either every operation in the call is applied or none is
/// - A multi-key call whose operation count exceeds the store's ceiling is
///   rejected as a whole
/// - `load_with_prefix` returns pairs in ascending key order
/// - Removing an absent key is not an error
///
/// # Implementors
///
/// - [`super::InMemoryKv`] - For tests and embedded use
/// - [`super::InstrumentedKv`] - Recording wrapper around another store
pub trait TxnKv: Send + Sync {
    /// Loads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::KeyNotFound`](crate::KvError::KeyNotFound) if the
    /// key is absent, or a store error if the read fails.
    fn load(&self, key: &str) -> KvResult<Vec<u8>>;

    /// Stores a single key.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn save(&self, key: &str, value: &[u8]) -> KvResult<()>;

    /// Removes a single key.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails.
    fn remove(&self, key: &str) -> KvResult<()>;

    /// Atomically stores every pair in `kvs`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is too large or the write fails.
    fn multi_save(&self, kvs: &KvBatch) -> KvResult<()>;

    /// Atomically removes every key in `keys`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is too large or the removal fails.
    fn multi_remove(&self, keys: &[String]) -> KvResult<()>;

    /// Atomically stores `saves` and removes `removals` in one transaction.
    ///
    /// A key present in both sets ends up removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is too large or the write fails.
    fn multi_save_and_remove(&self, saves: &KvBatch, removals: &[String]) -> KvResult<()>;

    /// Loads every pair whose key starts with `prefix`, in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan fails.
    fn load_with_prefix(&self, prefix: &str) -> KvResult<Vec<(String, Vec<u8>)>>;
}
