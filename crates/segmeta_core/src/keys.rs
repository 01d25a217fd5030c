//! Catalog key space.
//!
//! ```text
//! datacoord-meta/s/{collection}/{partition}/{segment}                 segment header
//! datacoord-meta/binlog/{collection}/{partition}/{segment}/{field}    insert log group
//! datacoord-meta/deltalog/{collection}/{partition}/{segment}/{field}  delete log group
//! datacoord-meta/statslog/{collection}/{partition}/{segment}/{field}  stats log group
//! datacoord-meta/flushed-segment/{collection}/{partition}/{segment}   flushed marker
//! datacoord-meta/channel-cp/{vchannel}                                channel checkpoint
//! datacoord-meta/channel-removal/{channel}                            channel tombstone
//! ```
//!
//! Every prefix returned here ends in `/`, so a scan for segment 1 never
//! picks up segment 11.

use crate::error::{CatalogError, CatalogResult};
use crate::types::{LogKind, SegmentIdent, UniqueId};

/// Root of every key the catalog owns.
pub const META_ROOT: &str = "datacoord-meta";
/// Segment header records.
pub const SEGMENT_PREFIX: &str = "datacoord-meta/s";
/// Flushed-segment markers.
pub const FLUSHED_SEGMENT_PREFIX: &str = "datacoord-meta/flushed-segment";
/// Channel checkpoints.
pub const CHANNEL_CHECKPOINT_PREFIX: &str = "datacoord-meta/channel-cp";
/// Channel tombstones.
pub const CHANNEL_REMOVAL_PREFIX: &str = "datacoord-meta/channel-removal";
/// Value stored under a channel tombstone key.
pub const CHANNEL_TOMBSTONE: &[u8] = b"removed";

/// Key of a segment's header record.
#[must_use]
pub fn segment_key(ident: SegmentIdent) -> String {
    format!(
        "{SEGMENT_PREFIX}/{}/{}/{}",
        ident.collection_id, ident.partition_id, ident.segment_id
    )
}

/// Key of one field log group.
#[must_use]
pub fn field_log_key(ident: SegmentIdent, field_id: UniqueId, kind: LogKind) -> String {
    format!(
        "{}{}/{}/{}/{field_id}",
        field_log_prefix(kind),
        ident.collection_id,
        ident.partition_id,
        ident.segment_id
    )
}

/// Key of a segment's flushed marker.
#[must_use]
pub fn flushed_segment_key(ident: SegmentIdent) -> String {
    format!(
        "{FLUSHED_SEGMENT_PREFIX}/{}/{}/{}",
        ident.collection_id, ident.partition_id, ident.segment_id
    )
}

/// Key of a virtual channel's checkpoint.
#[must_use]
pub fn channel_checkpoint_key(vchannel: &str) -> String {
    format!("{CHANNEL_CHECKPOINT_PREFIX}/{vchannel}")
}

/// Key of a channel's tombstone.
#[must_use]
pub fn channel_tombstone_key(channel: &str) -> String {
    format!("{CHANNEL_REMOVAL_PREFIX}/{channel}")
}

/// Prefix covering every segment header.
#[must_use]
pub fn segment_prefix() -> String {
    format!("{SEGMENT_PREFIX}/")
}

/// Prefix covering every field log group of one kind.
#[must_use]
pub fn field_log_prefix(kind: LogKind) -> String {
    format!("{META_ROOT}/{}/", kind.key_dir())
}

/// Prefix covering one segment's field log groups of one kind.
#[must_use]
pub fn segment_field_log_prefix(ident: SegmentIdent, kind: LogKind) -> String {
    format!(
        "{}{}/{}/{}/",
        field_log_prefix(kind),
        ident.collection_id,
        ident.partition_id,
        ident.segment_id
    )
}

/// Prefix covering the flushed markers of one partition.
#[must_use]
pub fn flushed_segment_prefix(collection_id: UniqueId, partition_id: UniqueId) -> String {
    format!("{FLUSHED_SEGMENT_PREFIX}/{collection_id}/{partition_id}/")
}

/// Prefix covering every channel checkpoint.
#[must_use]
pub fn channel_checkpoint_prefix() -> String {
    format!("{CHANNEL_CHECKPOINT_PREFIX}/")
}

/// A range of segments addressed by a prefix scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentScope {
    /// Every segment.
    All,
    /// Every segment of one collection.
    Collection(UniqueId),
    /// Every segment of one partition.
    Partition(UniqueId, UniqueId),
    /// A single segment.
    Segment(SegmentIdent),
}

impl SegmentScope {
    fn suffix(self) -> String {
        match self {
            Self::All => String::new(),
            Self::Collection(c) => format!("{c}/"),
            Self::Partition(c, p) => format!("{c}/{p}/"),
            Self::Segment(ident) => format!(
                "{}/{}/{}/",
                ident.collection_id, ident.partition_id, ident.segment_id
            ),
        }
    }

    /// Prefix of the header records in this scope.
    ///
    /// A single segment's header is a key, not a prefix; scanning it would
    /// also match longer segment ids, so `Segment` is narrowed to its
    /// partition and filtered by the caller.
    #[must_use]
    pub fn header_prefix(self) -> String {
        match self {
            Self::Segment(ident) => {
                Self::Partition(ident.collection_id, ident.partition_id).header_prefix()
            }
            other => format!("{}{}", segment_prefix(), other.suffix()),
        }
    }

    /// Prefix of the field log groups of one kind in this scope.
    #[must_use]
    pub fn field_log_prefix(self, kind: LogKind) -> String {
        format!("{}{}", field_log_prefix(kind), self.suffix())
    }

    /// Returns true if `ident` falls inside this scope.
    #[must_use]
    pub fn contains(self, ident: SegmentIdent) -> bool {
        match self {
            Self::All => true,
            Self::Collection(c) => ident.collection_id == c,
            Self::Partition(c, p) => ident.collection_id == c && ident.partition_id == p,
            Self::Segment(s) => ident == s,
        }
    }
}

fn parse_ids<const N: usize>(key: &str, rest: &str) -> CatalogResult<[UniqueId; N]> {
    let mut ids = [0; N];
    let mut parts = rest.split('/');
    for slot in &mut ids {
        *slot = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| CatalogError::invalid_key(key))?;
    }
    if parts.next().is_some() {
        return Err(CatalogError::invalid_key(key));
    }
    Ok(ids)
}

/// Parses a segment header key back into its identity.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidKey`] if `key` is not a header key.
pub fn parse_segment_key(key: &str) -> CatalogResult<SegmentIdent> {
    let rest = key
        .strip_prefix(&segment_prefix())
        .ok_or_else(|| CatalogError::invalid_key(key))?;
    let [c, p, s] = parse_ids::<3>(key, rest)?;
    Ok(SegmentIdent::new(c, p, s))
}

/// Parses a field log key back into its kind, segment and field.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidKey`] if `key` is not a field log key.
pub fn parse_field_log_key(key: &str) -> CatalogResult<(LogKind, SegmentIdent, UniqueId)> {
    for kind in LogKind::ALL {
        if let Some(rest) = key.strip_prefix(&field_log_prefix(kind)) {
            let [c, p, s, f] = parse_ids::<4>(key, rest)?;
            return Ok((kind, SegmentIdent::new(c, p, s), f));
        }
    }
    Err(CatalogError::invalid_key(key))
}

/// Parses a flushed marker key back into its segment identity.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidKey`] if `key` is not a marker key.
pub fn parse_flushed_segment_key(key: &str) -> CatalogResult<SegmentIdent> {
    let rest = key
        .strip_prefix(FLUSHED_SEGMENT_PREFIX)
        .and_then(|r| r.strip_prefix('/'))
        .ok_or_else(|| CatalogError::invalid_key(key))?;
    let [c, p, s] = parse_ids::<3>(key, rest)?;
    Ok(SegmentIdent::new(c, p, s))
}

/// Extracts the virtual channel name from a checkpoint key.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidKey`] if `key` is not a checkpoint key.
pub fn parse_channel_checkpoint_key(key: &str) -> CatalogResult<&str> {
    key.strip_prefix(CHANNEL_CHECKPOINT_PREFIX)
        .and_then(|r| r.strip_prefix('/'))
        .filter(|name| !name.is_empty())
        .ok_or_else(|| CatalogError::invalid_key(key))
}
