//! Catalog configuration.

use segmeta_kv::DEFAULT_MAX_TXN_OPS;

use crate::error::{CatalogError, CatalogResult};

/// Default root of the blob-storage namespace log paths live under.
pub const DEFAULT_STORAGE_ROOT: &str = "files";

/// Configuration for a [`Catalog`](crate::Catalog).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Root that compact log paths are resolved against.
    pub storage_root: String,

    /// Maximum number of operations in one store transaction.
    pub max_txn_ops: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            storage_root: DEFAULT_STORAGE_ROOT.to_string(),
            max_txn_ops: DEFAULT_MAX_TXN_OPS,
        }
    }
}

impl CatalogConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the storage root.
    #[must_use]
    pub fn storage_root(mut self, root: impl Into<String>) -> Self {
        self.storage_root = root.into();
        self
    }

    /// Sets the per-transaction operation ceiling.
    #[must_use]
    pub fn max_txn_ops(mut self, ops: usize) -> Self {
        self.max_txn_ops = ops;
        self
    }

    /// Checks that the configuration can be used.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidConfig`] if `max_txn_ops` is zero.
    pub fn validate(&self) -> CatalogResult<()> {
        if self.max_txn_ops == 0 {
            return Err(CatalogError::invalid_config("max_txn_ops must be at least 1"));
        }
        Ok(())
    }
}
