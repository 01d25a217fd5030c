//! In-memory transactional key-value store.

use crate::error::{KvError, KvResult};
use crate::kv::{KvBatch, TxnKv, DEFAULT_MAX_TXN_OPS};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An ordered in-memory key-value store.
///
/// This store keeps all pairs in a `BTreeMap` and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Embedding the catalog without an external store
///
/// Multi-key calls are applied under a single write lock, which makes them
/// atomic. Calls carrying more operations than the configured ceiling are
/// rejected before anything is applied, mirroring what a real transactional
/// store does.
///
/// # Example
///
/// ```rust
/// use segmeta_kv::{InMemoryKv, KvBatch, TxnKv};
///
/// let kv = InMemoryKv::with_max_txn_ops(2);
/// let mut batch = KvBatch::new();
/// batch.insert("a".to_string(), b"1".to_vec());
/// batch.insert("b".to_string(), b"2".to_vec());
/// batch.insert("c".to_string(), b"3".to_vec());
///
/// assert!(kv.multi_save(&batch).is_err());
/// assert!(kv.is_empty());
/// ```
#[derive(Debug)]
pub struct InMemoryKv {
    data: RwLock<BTreeMap<String, Vec<u8>>>,
    max_txn_ops: usize,
}

impl Default for InMemoryKv {
    fn default() -> Self {
        Self::with_max_txn_ops(DEFAULT_MAX_TXN_OPS)
    }
}

impl InMemoryKv {
    /// Creates a new empty store with the default transaction ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty store with a custom transaction ceiling.
    #[must_use]
    pub fn with_max_txn_ops(max_txn_ops: usize) -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            max_txn_ops,
        }
    }

    /// Creates a store pre-populated with `entries`.
    ///
    /// Useful for seeding records written by older layouts.
    #[must_use]
    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        let store = Self::new();
        store.data.write().extend(entries);
        store
    }

    /// Returns the per-transaction operation ceiling.
    #[must_use]
    pub fn max_txn_ops(&self) -> usize {
        self.max_txn_ops
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Returns every stored key in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    /// Returns a copy of all stored pairs.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.data.read().clone()
    }

    fn check_ops(&self, ops: usize) -> KvResult<()> {
        if ops > self.max_txn_ops {
            return Err(KvError::TxnTooLarge {
                ops,
                max: self.max_txn_ops,
            });
        }
        Ok(())
    }
}

impl TxnKv for InMemoryKv {
    fn load(&self, key: &str) -> KvResult<Vec<u8>> {
        self.data
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| KvError::key_not_found(key))
    }

    fn save(&self, key: &str, value: &[u8]) -> KvResult<()> {
        self.data.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> KvResult<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn multi_save(&self, kvs: &KvBatch) -> KvResult<()> {
        self.check_ops(kvs.len())?;
        let mut data = self.data.write();
        for (key, value) in kvs {
            data.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn multi_remove(&self, keys: &[String]) -> KvResult<()> {
        self.check_ops(keys.len())?;
        let mut data = self.data.write();
        for key in keys {
            data.remove(key);
        }
        Ok(())
    }

    fn multi_save_and_remove(&self, saves: &KvBatch, removals: &[String]) -> KvResult<()> {
        self.check_ops(saves.len() + removals.len())?;
        let mut data = self.data.write();
        for (key, value) in saves {
            data.insert(key.clone(), value.clone());
        }
        for key in removals {
            data.remove(key);
        }
        Ok(())
    }

    fn load_with_prefix(&self, prefix: &str) -> KvResult<Vec<(String, Vec<u8>)>> {
        let data = self.data.read();
        Ok(data
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}
