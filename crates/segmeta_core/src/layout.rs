//! Mapping between segment records and catalog key-value pairs.
//!
//! A segment is persisted as one header record plus one record per
//! non-empty field log group:
//!
//! - The header is the segment with every log group stripped and its row
//!   count taken from the insert logs whenever they hold rows
//! - Each field log group is stored in compact form, log ids only
//! - A group the segment still lists but holds no entries has no record;
//!   a record left from before it was emptied must be removed
//!
//! Reading goes the other way. A header that still carries log groups was
//! written by the monolithic layout and is returned as-is; looking up field
//! log records for it would find nothing and silently drop its logs.

use std::collections::HashSet;

use segmeta_codec::{Decode, Encode};
use segmeta_kv::KvBatch;
use tracing::{debug, warn};

use crate::error::CatalogResult;
use crate::keys;
use crate::log_path::{encode_log_path, LogPath};
use crate::types::{FieldLog, LogEntry, LogKind, Segment, SegmentIdent};

/// The key-value pairs one segment decomposes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecomposedSegment {
    /// Header key.
    pub header_key: String,
    /// Encoded header record.
    pub header_value: Vec<u8>,
    /// Field log group records.
    pub field_logs: KvBatch,
    /// Keys of the listed groups that hold no entries.
    pub emptied_groups: Vec<String>,
}

impl DecomposedSegment {
    /// Number of keys the segment writes.
    #[must_use]
    pub fn key_count(&self) -> usize {
        1 + self.field_logs.len()
    }

    /// Every key the segment writes, header first.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        std::iter::once(self.header_key.clone())
            .chain(self.field_logs.keys().cloned())
            .collect()
    }

    /// Moves every pair into `batch`, dropping the emptied group keys.
    pub fn append_to(self, batch: &mut KvBatch) {
        batch.insert(self.header_key, self.header_value);
        batch.extend(self.field_logs);
    }

    /// Returns every pair as one batch.
    #[must_use]
    pub fn into_batch(self) -> KvBatch {
        let mut batch = KvBatch::new();
        self.append_to(&mut batch);
        batch
    }
}

/// Returns the header form of `segment`: no log groups, row count taken
/// from the insert logs when they hold any rows.
#[must_use]
pub fn segment_header(segment: &Segment) -> Segment {
    let mut header = segment.without_logs();
    let rows = segment.stored_row_count();
    if rows != segment.num_of_rows {
        warn!(
            segment = %segment.ident(),
            supplied = segment.num_of_rows,
            from_logs = rows,
            "segment row count disagrees with insert logs, correcting"
        );
        header.num_of_rows = rows;
    }
    header
}

/// Encodes the header record of `segment`.
///
/// # Errors
///
/// Returns an error if the header cannot be encoded.
pub fn encode_header(segment: &Segment) -> CatalogResult<(String, Vec<u8>)> {
    let header = segment_header(segment);
    Ok((keys::segment_key(segment.ident()), header.encode()?))
}

fn compact_group(group: &FieldLog) -> CatalogResult<FieldLog> {
    let entries = group
        .entries
        .iter()
        .map(|entry| -> CatalogResult<LogEntry> {
            let log_id = LogPath::of(entry).log_id()?;
            Ok(LogEntry {
                log_id,
                log_path: String::new(),
                ..entry.clone()
            })
        })
        .collect::<CatalogResult<Vec<_>>>()?;
    Ok(FieldLog::new(group.field_id, entries))
}

fn stored_groups(segment: &Segment) -> impl Iterator<Item = (LogKind, &FieldLog)> {
    LogKind::ALL.into_iter().flat_map(move |kind| {
        segment
            .logs(kind)
            .iter()
            .filter(|group| !group.entries.is_empty())
            .map(move |group| (kind, group))
    })
}

/// Encodes every non-empty field log group of `segment` in compact form.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidLogPath`](crate::CatalogError::InvalidLogPath)
/// if any entry's path is malformed.
pub fn field_log_kvs(segment: &Segment) -> CatalogResult<KvBatch> {
    let ident = segment.ident();
    let mut kvs = KvBatch::new();
    for (kind, group) in stored_groups(segment) {
        let compacted = compact_group(group)?;
        kvs.insert(
            keys::field_log_key(ident, group.field_id, kind),
            compacted.encode()?,
        );
    }
    Ok(kvs)
}

/// Keys of every field log group `segment` lists, empty or not.
#[must_use]
pub fn field_log_keys(segment: &Segment) -> Vec<String> {
    let ident = segment.ident();
    LogKind::ALL
        .into_iter()
        .flat_map(|kind| {
            segment
                .logs(kind)
                .iter()
                .map(move |group| keys::field_log_key(ident, group.field_id, kind))
        })
        .collect()
}

/// Keys of the groups `segment` lists without entries, unless another
/// group of the same kind and field does hold entries.
#[must_use]
pub fn emptied_field_log_keys(segment: &Segment) -> Vec<String> {
    let ident = segment.ident();
    let stored: HashSet<_> = stored_groups(segment)
        .map(|(kind, group)| (kind, group.field_id))
        .collect();
    LogKind::ALL
        .into_iter()
        .flat_map(|kind| {
            segment
                .logs(kind)
                .iter()
                .filter(|group| group.entries.is_empty())
                .map(move |group| (kind, group.field_id))
        })
        .filter(|slot| !stored.contains(slot))
        .map(|(kind, field_id)| keys::field_log_key(ident, field_id, kind))
        .collect()
}

/// Decomposes `segment` into its header and field log records.
///
/// Log paths are validated before anything is encoded, so a malformed
/// segment yields no pairs at all.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidLogPath`](crate::CatalogError::InvalidLogPath)
/// for a malformed log path, or a codec error.
pub fn decompose(segment: &Segment) -> CatalogResult<DecomposedSegment> {
    let field_logs = field_log_kvs(segment)?;
    let (header_key, header_value) = encode_header(segment)?;
    Ok(DecomposedSegment {
        header_key,
        header_value,
        field_logs,
        emptied_groups: emptied_field_log_keys(segment),
    })
}

/// The two shapes a header record can have on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredSegment {
    /// Header only; log groups live under their own keys.
    Decomposed(Segment),
    /// Self-contained record with its log groups embedded.
    Monolithic(Segment),
}

impl StoredSegment {
    /// Decodes a header record and classifies its shape.
    ///
    /// # Errors
    ///
    /// Returns a codec error if `bytes` is not a segment record.
    pub fn decode(bytes: &[u8]) -> CatalogResult<Self> {
        let segment = Segment::decode(bytes)?;
        Ok(if segment.has_logs() {
            Self::Monolithic(segment)
        } else {
            Self::Decomposed(segment)
        })
    }

    /// Identity of the stored segment.
    #[must_use]
    pub fn ident(&self) -> SegmentIdent {
        match self {
            Self::Decomposed(s) | Self::Monolithic(s) => s.ident(),
        }
    }
}

/// Rebuilds a full segment from its header and field log records.
///
/// `related` may hold records of any log kind; records belonging to a
/// different segment are ignored. Compact entries get their path derived
/// against `root`, explicit paths are kept. Groups come back in ascending
/// field order.
///
/// # Errors
///
/// Returns an error if a record cannot be decoded or a related key is not a
/// field log key.
pub fn recompose(root: &str, header: &[u8], related: &[(String, Vec<u8>)]) -> CatalogResult<Segment> {
    let mut segment = match StoredSegment::decode(header)? {
        StoredSegment::Monolithic(segment) => {
            warn!(
                segment = %segment.ident(),
                "read segment stored in monolithic layout"
            );
            return Ok(segment);
        }
        StoredSegment::Decomposed(header) => header,
    };

    let ident = segment.ident();
    for (key, value) in related {
        let (kind, owner, _) = keys::parse_field_log_key(key)?;
        if owner != ident {
            debug!(key = %key, segment = %ident, "skipping field log of another segment");
            continue;
        }
        let mut group = FieldLog::decode(value)?;
        let field_id = group.field_id;
        for entry in &mut group.entries {
            let compact_id = match LogPath::of(entry) {
                LogPath::Compact(id) => Some(id),
                LogPath::Legacy(_) => None,
            };
            if let Some(log_id) = compact_id {
                entry.log_path = encode_log_path(root, kind, ident, field_id, log_id);
            }
        }
        segment.logs_mut(kind).push(group);
    }

    for kind in LogKind::ALL {
        segment.logs_mut(kind).sort_by_key(|g| g.field_id);
    }
    Ok(segment)
}
