//! Log entry path encoding.
//!
//! A log file's storage path is fully determined by the segment identity,
//! the field, the log kind and the log id:
//!
//! ```text
//! {root}/insert_log/{collection}/{partition}/{segment}/{field}/{log_id}
//! {root}/delta_log/{collection}/{partition}/{segment}/{log_id}
//! {root}/stats_log/{collection}/{partition}/{segment}/{field}/{log_id}
//! ```
//!
//! Decomposed records therefore store only the log id (compact form).
//! Records written before that carry the path itself (legacy form).

use crate::error::{CatalogError, CatalogResult};
use crate::types::{LogEntry, LogKind, SegmentIdent, UniqueId};

/// How a stored log entry identifies its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogPath<'a> {
    /// Only the log id is stored; the path is derived.
    Compact(UniqueId),
    /// An explicit, already resolved path.
    Legacy(&'a str),
}

impl<'a> LogPath<'a> {
    /// Classifies a log entry by the encoding it carries.
    #[must_use]
    pub fn of(entry: &'a LogEntry) -> Self {
        if entry.log_path.is_empty() {
            Self::Compact(entry.log_id)
        } else {
            Self::Legacy(&entry.log_path)
        }
    }

    /// Returns the log id, parsing it out of an explicit path if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidLogPath`] if an explicit path does not
    /// end in a log id.
    pub fn log_id(self) -> CatalogResult<UniqueId> {
        match self {
            Self::Compact(id) => Ok(id),
            Self::Legacy(path) => decode_log_path(path),
        }
    }
}

/// Builds the full storage path of a log file.
#[must_use]
pub fn encode_log_path(
    root: &str,
    kind: LogKind,
    ident: SegmentIdent,
    field_id: UniqueId,
    log_id: UniqueId,
) -> String {
    let SegmentIdent {
        collection_id: c,
        partition_id: p,
        segment_id: s,
    } = ident;
    let tail = match kind {
        LogKind::Delete => format!("{}/{c}/{p}/{s}/{log_id}", kind.path_dir()),
        LogKind::Insert | LogKind::Stats => {
            format!("{}/{c}/{p}/{s}/{field_id}/{log_id}", kind.path_dir())
        }
    };
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        tail
    } else {
        format!("{root}/{tail}")
    }
}

/// Extracts the log id from an explicit log path.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidLogPath`] if the last path component is
/// not a decimal log id.
pub fn decode_log_path(path: &str) -> CatalogResult<UniqueId> {
    path.rsplit('/')
        .next()
        .filter(|last| !last.is_empty() && last.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|last| last.parse().ok())
        .ok_or_else(|| CatalogError::invalid_log_path(path))
}
