//! Bounded transaction writer.
//!
//! The store caps how many operations one transaction may carry. Writes and
//! removals of arbitrary size are split into chunks of at most that many
//! operations, in key order, and committed one transaction per chunk.
//!
//! Only a single chunk is atomic. When chunk `i + 1` fails, chunks `0..=i`
//! stay committed and the failure is reported as
//! [`CatalogError::PartialCommit`]; readers between chunks may observe the
//! half-applied state.

use segmeta_kv::{KvBatch, TxnKv};
use tracing::{debug, warn};

use crate::error::{CatalogError, CatalogResult};

/// Splits `kvs` into key-ordered chunks of at most `max_ops` pairs.
#[must_use]
pub fn chunk_writes(kvs: &KvBatch, max_ops: usize) -> Vec<KvBatch> {
    let max_ops = max_ops.max(1);
    let mut chunks = Vec::with_capacity(kvs.len().div_ceil(max_ops));
    let mut current = KvBatch::new();
    for (key, value) in kvs {
        current.insert(key.clone(), value.clone());
        if current.len() == max_ops {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Splits writes and removals into joint chunks of at most `max_ops`
/// operations.
///
/// Writes fill chunks first, in key order; removals follow, sorted and
/// deduplicated, topping up the last write chunk before opening new ones.
#[must_use]
pub fn chunk_writes_and_removes(
    writes: &KvBatch,
    removes: &[String],
    max_ops: usize,
) -> Vec<(KvBatch, Vec<String>)> {
    let max_ops = max_ops.max(1);
    let mut removes = removes.to_vec();
    removes.sort();
    removes.dedup();

    let mut chunks: Vec<(KvBatch, Vec<String>)> = chunk_writes(writes, max_ops)
        .into_iter()
        .map(|w| (w, Vec::new()))
        .collect();

    for key in removes {
        match chunks.last_mut() {
            Some((w, r)) if w.len() + r.len() < max_ops => r.push(key),
            _ => chunks.push((KvBatch::new(), vec![key])),
        }
    }
    chunks
}

/// Commits unbounded write sets through a store with a transaction ceiling.
pub struct BatchWriter<'a> {
    kv: &'a dyn TxnKv,
    max_ops: usize,
}

impl<'a> BatchWriter<'a> {
    /// Creates a writer over `kv` issuing at most `max_ops` operations per
    /// transaction.
    pub fn new(kv: &'a dyn TxnKv, max_ops: usize) -> Self {
        Self {
            kv,
            max_ops: max_ops.max(1),
        }
    }

    /// Writes every pair in `kvs`, one `multi_save` per chunk.
    ///
    /// Returns the number of transactions issued; an empty set issues none.
    ///
    /// # Errors
    ///
    /// A failure of the first transaction is returned as the store error.
    /// A later failure is [`CatalogError::PartialCommit`].
    pub fn commit_writes(&self, kvs: &KvBatch) -> CatalogResult<usize> {
        let chunks = chunk_writes(kvs, self.max_ops);
        let total = chunks.len();
        for (i, chunk) in chunks.iter().enumerate() {
            self.kv
                .multi_save(chunk)
                .map_err(|e| chunk_failed(i, total, e))?;
            debug!(chunk = i + 1, total, ops = chunk.len(), "committed write chunk");
        }
        Ok(total)
    }

    /// Writes `writes` and removes `removes`, one `multi_save_and_remove`
    /// per joint chunk.
    ///
    /// Returns the number of transactions issued.
    ///
    /// # Errors
    ///
    /// Same as [`BatchWriter::commit_writes`].
    pub fn commit_writes_and_removes(
        &self,
        writes: &KvBatch,
        removes: &[String],
    ) -> CatalogResult<usize> {
        let chunks = chunk_writes_and_removes(writes, removes, self.max_ops);
        let total = chunks.len();
        for (i, (saves, removals)) in chunks.iter().enumerate() {
            self.kv
                .multi_save_and_remove(saves, removals)
                .map_err(|e| chunk_failed(i, total, e))?;
            debug!(
                chunk = i + 1,
                total,
                saves = saves.len(),
                removals = removals.len(),
                "committed joint chunk"
            );
        }
        Ok(total)
    }
}

fn chunk_failed(committed: usize, total: usize, source: segmeta_kv::KvError) -> CatalogError {
    if committed == 0 {
        return CatalogError::Kv(source);
    }
    warn!(
        committed,
        total,
        error = %source,
        "multi-transaction commit failed part-way, earlier chunks remain applied"
    );
    CatalogError::PartialCommit {
        committed,
        total,
        source,
    }
}
