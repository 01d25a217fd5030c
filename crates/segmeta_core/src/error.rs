//! Error types for catalog operations.

use segmeta_kv::KvError;
use thiserror::Error;

use crate::types::SegmentIdent;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur in catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The underlying store failed.
    #[error("store error: {0}")]
    Kv(#[from] KvError),

    /// A record could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] segmeta_codec::CodecError),

    /// A log entry path is neither compact nor a well-formed explicit path.
    #[error("invalid log path: {path:?}")]
    InvalidLogPath {
        /// The offending path.
        path: String,
    },

    /// A stored key does not parse as a catalog key.
    #[error("invalid catalog key: {key}")]
    InvalidKey {
        /// The offending key.
        key: String,
    },

    /// The requested segment has no header record.
    #[error("segment not found: {ident}")]
    SegmentNotFound {
        /// Identity of the missing segment.
        ident: SegmentIdent,
    },

    /// A multi-transaction commit failed after some transactions landed.
    ///
    /// The first `committed` transactions stay applied.
    #[error("commit failed after {committed} of {total} transactions: {source}")]
    PartialCommit {
        /// Transactions applied before the failure.
        committed: usize,
        /// Transactions the commit was split into.
        total: usize,
        /// The store error that stopped the commit.
        #[source]
        source: KvError,
    },

    /// The catalog configuration is unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },
}

impl CatalogError {
    /// Creates an invalid log path error.
    pub fn invalid_log_path(path: impl Into<String>) -> Self {
        Self::InvalidLogPath { path: path.into() }
    }

    /// Creates an invalid key error.
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
