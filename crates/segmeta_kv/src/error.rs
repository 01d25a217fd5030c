//! Error types for key-value store operations.

use thiserror::Error;

/// Result type for key-value store operations.
pub type KvResult<T> = Result<T, KvError>;

/// Errors that can occur during key-value store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KvError {
    /// The requested key does not exist.
    #[error("key not found: {key}")]
    KeyNotFound {
        /// The missing key.
        key: String,
    },

    /// A single transaction carried more operations than the store accepts.
    #[error("transaction too large: {ops} operations, limit is {max}")]
    TxnTooLarge {
        /// Number of operations in the rejected transaction.
        ops: usize,
        /// The store's per-transaction ceiling.
        max: usize,
    },

    /// The store could not serve the request (network or storage failure).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl KvError {
    /// Creates a key-not-found error.
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Returns true if this error means the key is simply absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }
}
