//! In-memory segment and channel model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 64-bit identifier used for collections, partitions, segments, fields and logs.
pub type UniqueId = i64;

/// Lifecycle state of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SegmentState {
    /// Unset.
    #[default]
    None,
    /// The segment is known not to exist.
    NotExist,
    /// Accepting inserts.
    Growing,
    /// No longer accepting inserts, not yet flushed.
    Sealed,
    /// Fully persisted.
    Flushed,
    /// Flush in progress.
    Flushing,
    /// Retired, awaiting garbage collection.
    Dropped,
    /// Being populated by a bulk import.
    Importing,
}

impl SegmentState {
    /// Returns the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::NotExist => "NotExist",
            Self::Growing => "Growing",
            Self::Sealed => "Sealed",
            Self::Flushed => "Flushed",
            Self::Flushing => "Flushing",
            Self::Dropped => "Dropped",
            Self::Importing => "Importing",
        }
    }
}

impl fmt::Display for SegmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three kinds of log a segment is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogKind {
    /// Insert (binlog) logs; the source of the segment's row count.
    Insert,
    /// Delete logs.
    Delete,
    /// Statistics logs.
    Stats,
}

impl LogKind {
    /// Every log kind, in storage order.
    pub const ALL: [Self; 3] = [Self::Insert, Self::Delete, Self::Stats];

    /// Directory name used in the catalog key space.
    #[must_use]
    pub const fn key_dir(self) -> &'static str {
        match self {
            Self::Insert => "binlog",
            Self::Delete => "deltalog",
            Self::Stats => "statslog",
        }
    }

    /// Directory name used in blob storage paths.
    #[must_use]
    pub const fn path_dir(self) -> &'static str {
        match self {
            Self::Insert => "insert_log",
            Self::Delete => "delta_log",
            Self::Stats => "stats_log",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_dir())
    }
}

/// Identity of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentIdent {
    /// Owning collection.
    pub collection_id: UniqueId,
    /// Owning partition.
    pub partition_id: UniqueId,
    /// The segment itself.
    pub segment_id: UniqueId,
}

impl SegmentIdent {
    /// Creates a segment identity.
    #[must_use]
    pub const fn new(collection_id: UniqueId, partition_id: UniqueId, segment_id: UniqueId) -> Self {
        Self {
            collection_id,
            partition_id,
            segment_id,
        }
    }
}

impl fmt::Display for SegmentIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.collection_id, self.partition_id, self.segment_id
        )
    }
}

/// A position in an ingestion channel's message stream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MsgPosition {
    /// Physical channel name.
    pub channel_name: String,
    /// Opaque message id within the channel.
    pub msg_id: Vec<u8>,
    /// Consumer group the position was taken from.
    pub msg_group: String,
    /// Timestamp of the message.
    pub timestamp: u64,
}

/// One log file of a segment.
///
/// In memory `log_path` holds the full storage path. When persisted in the
/// decomposed layout the path is dropped and only `log_id` is kept; the path
/// is derived again on read.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogEntry {
    /// Number of rows (or records) in the log.
    pub entries_num: i64,
    /// Smallest timestamp covered.
    pub timestamp_from: u64,
    /// Largest timestamp covered.
    pub timestamp_to: u64,
    /// Explicit storage path, empty in compact form.
    pub log_path: String,
    /// Size of the log file in bytes.
    pub log_size: i64,
    /// Log identifier the compact path is derived from.
    pub log_id: UniqueId,
}

impl LogEntry {
    /// Creates an entry carrying an explicit path.
    #[must_use]
    pub fn with_path(entries_num: i64, log_path: impl Into<String>) -> Self {
        Self {
            entries_num,
            log_path: log_path.into(),
            ..Self::default()
        }
    }

    /// Creates an entry in compact form.
    #[must_use]
    pub fn compact(entries_num: i64, log_id: UniqueId) -> Self {
        Self {
            entries_num,
            log_id,
            ..Self::default()
        }
    }
}

/// The ordered log entries of one kind for one field of a segment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldLog {
    /// Field the logs belong to.
    pub field_id: UniqueId,
    /// Log entries in write order.
    pub entries: Vec<LogEntry>,
}

impl FieldLog {
    /// Creates a field log group.
    #[must_use]
    pub fn new(field_id: UniqueId, entries: Vec<LogEntry>) -> Self {
        Self { field_id, entries }
    }

    /// Sum of entry counts across the group.
    #[must_use]
    pub fn total_entries(&self) -> i64 {
        self.entries.iter().map(|e| e.entries_num).sum()
    }
}

/// A segment record.
///
/// The persisted header carries every attribute except the three log group
/// lists, which are stored under their own keys. A record written before
/// that split carries its log groups inline.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Segment {
    /// Segment id.
    pub id: UniqueId,
    /// Owning collection.
    pub collection_id: UniqueId,
    /// Owning partition.
    pub partition_id: UniqueId,
    /// Virtual channel the segment consumes.
    pub insert_channel: String,
    /// Row count; replaced by the insert log total on write when that is
    /// non-zero.
    pub num_of_rows: i64,
    /// Lifecycle state.
    pub state: SegmentState,
    /// Row capacity of the segment.
    pub max_row_num: i64,
    /// Expiry timestamp of the last allocation.
    pub last_expire_time: u64,
    /// Position of the first message in the segment.
    pub start_position: Option<MsgPosition>,
    /// Position up to which DML has been applied.
    pub dml_position: Option<MsgPosition>,
    /// Insert logs, one group per field.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub insert_logs: Vec<FieldLog>,
    /// Delete logs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub delete_logs: Vec<FieldLog>,
    /// Statistics logs, one group per field.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stats_logs: Vec<FieldLog>,
    /// Whether compaction produced this segment.
    pub created_by_compaction: bool,
    /// Segments this one was compacted from.
    pub compaction_from: Vec<UniqueId>,
    /// Time the segment was dropped, zero if live.
    pub dropped_at: u64,
}

impl Segment {
    /// Creates an empty segment with the given identity.
    #[must_use]
    pub fn new(collection_id: UniqueId, partition_id: UniqueId, id: UniqueId) -> Self {
        Self {
            id,
            collection_id,
            partition_id,
            ..Self::default()
        }
    }

    /// Returns the segment's identity.
    #[must_use]
    pub fn ident(&self) -> SegmentIdent {
        SegmentIdent::new(self.collection_id, self.partition_id, self.id)
    }

    /// Returns the log groups of one kind.
    #[must_use]
    pub fn logs(&self, kind: LogKind) -> &[FieldLog] {
        match kind {
            LogKind::Insert => &self.insert_logs,
            LogKind::Delete => &self.delete_logs,
            LogKind::Stats => &self.stats_logs,
        }
    }

    /// Returns the log groups of one kind mutably.
    pub fn logs_mut(&mut self, kind: LogKind) -> &mut Vec<FieldLog> {
        match kind {
            LogKind::Insert => &mut self.insert_logs,
            LogKind::Delete => &mut self.delete_logs,
            LogKind::Stats => &mut self.stats_logs,
        }
    }

    /// Returns true if any log group is present.
    #[must_use]
    pub fn has_logs(&self) -> bool {
        LogKind::ALL.iter().any(|k| !self.logs(*k).is_empty())
    }

    /// Row count implied by the insert logs.
    ///
    /// Every field of a segment holds the same rows, so the first insert
    /// group is authoritative. A segment without insert logs has no rows.
    #[must_use]
    pub fn row_count_from_logs(&self) -> i64 {
        self.insert_logs
            .first()
            .map_or(0, FieldLog::total_entries)
    }

    /// Row count to persist.
    ///
    /// The insert logs win whenever they account for any rows. A segment
    /// whose rows are not flushed to insert logs yet keeps its own count.
    #[must_use]
    pub fn stored_row_count(&self) -> i64 {
        match self.row_count_from_logs() {
            0 => self.num_of_rows,
            rows => rows,
        }
    }

    /// Returns a copy without any log groups.
    #[must_use]
    pub fn without_logs(&self) -> Self {
        Self {
            insert_logs: Vec::new(),
            delete_logs: Vec::new(),
            stats_logs: Vec::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_count_uses_first_insert_group_only() {
        let mut seg = Segment::new(1, 2, 3);
        seg.insert_logs = vec![
            FieldLog::new(100, vec![LogEntry::compact(5, 1), LogEntry::compact(7, 2)]),
            FieldLog::new(101, vec![LogEntry::compact(12, 3)]),
        ];
        assert_eq!(seg.row_count_from_logs(), 12);
    }

    #[test]
    fn row_count_without_insert_logs_is_zero() {
        let mut seg = Segment::new(1, 2, 3);
        seg.num_of_rows = 40;
        seg.delete_logs = vec![FieldLog::new(0, vec![LogEntry::compact(3, 9)])];
        assert_eq!(seg.row_count_from_logs(), 0);
        assert_eq!(seg.stored_row_count(), 40);

        seg.insert_logs = vec![FieldLog::new(0, vec![LogEntry::compact(7, 1)])];
        assert_eq!(seg.stored_row_count(), 7);
    }

    #[test]
    fn without_logs_keeps_attributes() {
        let mut seg = Segment::new(1, 2, 3);
        seg.state = SegmentState::Flushed;
        seg.insert_channel = "dml-0_v0".into();
        seg.stats_logs = vec![FieldLog::new(100, vec![LogEntry::compact(1, 1)])];

        let header = seg.without_logs();
        assert!(!header.has_logs());
        assert_eq!(header.state, SegmentState::Flushed);
        assert_eq!(header.insert_channel, "dml-0_v0");
        assert!(seg.has_logs());
    }

    #[test]
    fn log_kind_dirs() {
        assert_eq!(LogKind::Insert.key_dir(), "binlog");
        assert_eq!(LogKind::Delete.path_dir(), "delta_log");
        assert_eq!(LogKind::Stats.to_string(), "statslog");
    }

    #[test]
    fn ident_orders_by_collection_partition_segment() {
        let mut idents = vec![
            SegmentIdent::new(2, 1, 1),
            SegmentIdent::new(1, 2, 1),
            SegmentIdent::new(1, 1, 10),
            SegmentIdent::new(1, 1, 2),
        ];
        idents.sort();
        assert_eq!(idents[0], SegmentIdent::new(1, 1, 2));
        assert_eq!(idents[3], SegmentIdent::new(2, 1, 1));
        assert_eq!(idents[0].to_string(), "1/1/2");
    }
}
