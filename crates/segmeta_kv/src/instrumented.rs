//! Recording store wrapper.
//!
//! [`InstrumentedKv`] wraps any other [`TxnKv`] and keeps a log of every
//! mutating call that reached the inner store. It can also be told to fail
//! reads or to fail writes after a number of successful transactions, which
//! is how partial multi-chunk commits are exercised.

use crate::error::{KvError, KvResult};
use crate::kv::{KvBatch, TxnKv};
use parking_lot::Mutex;

/// The primitive a recorded transaction went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnKind {
    /// `save`
    Save,
    /// `remove`
    Remove,
    /// `multi_save`
    MultiSave,
    /// `multi_remove`
    MultiRemove,
    /// `multi_save_and_remove`
    MultiSaveAndRemove,
}

/// One mutating call that was applied to the inner store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnRecord {
    /// Which primitive was called.
    pub kind: TxnKind,
    /// Keys written, in key order.
    pub saves: Vec<String>,
    /// Keys removed, in call order.
    pub removals: Vec<String>,
}

impl TxnRecord {
    /// Total number of operations in this transaction.
    #[must_use]
    pub fn ops(&self) -> usize {
        self.saves.len() + self.removals.len()
    }
}

#[derive(Debug, Default)]
struct Faults {
    /// Number of further writes allowed before every write fails.
    writes_left: Option<usize>,
    fail_reads: bool,
}

/// A store wrapper that records transactions and injects failures.
#[derive(Debug)]
pub struct InstrumentedKv<K> {
    inner: K,
    log: Mutex<Vec<TxnRecord>>,
    faults: Mutex<Faults>,
}

impl<K: TxnKv> InstrumentedKv<K> {
    /// Wraps `inner`.
    pub fn new(inner: K) -> Self {
        Self {
            inner,
            log: Mutex::new(Vec::new()),
            faults: Mutex::new(Faults::default()),
        }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &K {
        &self.inner
    }

    /// Returns every applied transaction in order.
    pub fn transactions(&self) -> Vec<TxnRecord> {
        self.log.lock().clone()
    }

    /// Number of applied transactions.
    pub fn txn_count(&self) -> usize {
        self.log.lock().len()
    }

    /// Total number of keys written across all applied transactions.
    pub fn saved_key_count(&self) -> usize {
        self.log.lock().iter().map(|t| t.saves.len()).sum()
    }

    /// Forgets all recorded transactions.
    pub fn reset_log(&self) {
        self.log.lock().clear();
    }

    /// Lets `n` more writes through, then fails every write.
    pub fn fail_writes_after(&self, n: usize) {
        self.faults.lock().writes_left = Some(n);
    }

    /// Makes every read fail.
    pub fn fail_reads(&self) {
        self.faults.lock().fail_reads = true;
    }

    /// Clears all injected failures.
    pub fn heal(&self) {
        *self.faults.lock() = Faults::default();
    }

    fn check_read(&self) -> KvResult<()> {
        if self.faults.lock().fail_reads {
            return Err(KvError::unavailable("injected read failure"));
        }
        Ok(())
    }

    fn check_write(&self) -> KvResult<()> {
        if self.faults.lock().writes_left == Some(0) {
            return Err(KvError::unavailable("injected write failure"));
        }
        Ok(())
    }

    /// Charges one applied write against the `fail_writes_after` budget.
    fn spend_write(&self) {
        if let Some(left) = &mut self.faults.lock().writes_left {
            *left = left.saturating_sub(1);
        }
    }

    fn record(&self, kind: TxnKind, saves: Vec<String>, removals: Vec<String>) {
        self.spend_write();
        self.log.lock().push(TxnRecord {
            kind,
            saves,
            removals,
        });
    }
}

impl<K: TxnKv> TxnKv for InstrumentedKv<K> {
    fn load(&self, key: &str) -> KvResult<Vec<u8>> {
        self.check_read()?;
        self.inner.load(key)
    }

    fn save(&self, key: &str, value: &[u8]) -> KvResult<()> {
        self.check_write()?;
        self.inner.save(key, value)?;
        self.record(TxnKind::Save, vec![key.to_string()], Vec::new());
        Ok(())
    }

    fn remove(&self, key: &str) -> KvResult<()> {
        self.check_write()?;
        self.inner.remove(key)?;
        self.record(TxnKind::Remove, Vec::new(), vec![key.to_string()]);
        Ok(())
    }

    fn multi_save(&self, kvs: &KvBatch) -> KvResult<()> {
        self.check_write()?;
        self.inner.multi_save(kvs)?;
        self.record(TxnKind::MultiSave, kvs.keys().cloned().collect(), Vec::new());
        Ok(())
    }

    fn multi_remove(&self, keys: &[String]) -> KvResult<()> {
        self.check_write()?;
        self.inner.multi_remove(keys)?;
        self.record(TxnKind::MultiRemove, Vec::new(), keys.to_vec());
        Ok(())
    }

    fn multi_save_and_remove(&self, saves: &KvBatch, removals: &[String]) -> KvResult<()> {
        self.check_write()?;
        self.inner.multi_save_and_remove(saves, removals)?;
        self.record(
            TxnKind::MultiSaveAndRemove,
            saves.keys().cloned().collect(),
            removals.to_vec(),
        );
        Ok(())
    }

    fn load_with_prefix(&self, prefix: &str) -> KvResult<Vec<(String, Vec<u8>)>> {
        self.check_read()?;
        self.inner.load_with_prefix(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryKv;

    #[test]
    fn records_applied_transactions() {
        let kv = InstrumentedKv::new(InMemoryKv::new());
        kv.save("a", b"1").unwrap();
        kv.multi_remove(&["a".to_string()]).unwrap();

        let log = kv.transactions();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].kind, TxnKind::Save);
        assert_eq!(log[1].kind, TxnKind::MultiRemove);
        assert_eq!(log[1].ops(), 1);
    }

    #[test]
    fn rejected_transactions_are_not_recorded() {
        let kv = InstrumentedKv::new(InMemoryKv::with_max_txn_ops(1));
        let mut batch = KvBatch::new();
        batch.insert("a".to_string(), vec![]);
        batch.insert("b".to_string(), vec![]);
        assert!(kv.multi_save(&batch).is_err());
        assert_eq!(kv.txn_count(), 0);
    }

    #[test]
    fn fail_writes_after_lets_n_through() {
        let kv = InstrumentedKv::new(InMemoryKv::new());
        kv.fail_writes_after(1);
        assert!(kv.save("a", b"1").is_ok());
        assert!(matches!(kv.save("b", b"2"), Err(KvError::Unavailable(_))));
        assert_eq!(kv.inner().keys(), vec!["a".to_string()]);

        kv.heal();
        assert!(kv.save("b", b"2").is_ok());
    }

    #[test]
    fn rejected_writes_do_not_spend_budget() {
        let kv = InstrumentedKv::new(InMemoryKv::with_max_txn_ops(1));
        kv.fail_writes_after(1);
        let mut batch = KvBatch::new();
        batch.insert("a".to_string(), vec![]);
        batch.insert("b".to_string(), vec![]);
        assert!(matches!(
            kv.multi_save(&batch),
            Err(KvError::TxnTooLarge { ops: 2, max: 1 })
        ));

        assert!(kv.save("c", b"3").is_ok());
        assert!(matches!(kv.save("d", b"4"), Err(KvError::Unavailable(_))));
        assert_eq!(kv.txn_count(), 1);
    }

    #[test]
    fn fail_reads_blocks_loads_and_scans() {
        let kv = InstrumentedKv::new(InMemoryKv::new());
        kv.save("a", b"1").unwrap();
        kv.fail_reads();
        assert!(kv.load("a").is_err());
        assert!(kv.load_with_prefix("").is_err());
        assert!(kv.save("b", b"2").is_ok());
    }
}
