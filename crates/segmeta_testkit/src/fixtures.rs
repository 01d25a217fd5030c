//! Segment fixtures and catalog harnesses.
//!
//! The fixture ids and paths follow what a data coordinator writes for a
//! small flushed segment: collection 2, partition 1, segment 11, field 1,
//! every log numbered 99 under storage root `a`.

use std::sync::Arc;

use segmeta_codec::Encode;
use segmeta_core::{
    encode_log_path, keys, Catalog, CatalogConfig, FieldLog, LogEntry, LogKind, MsgPosition,
    Segment, SegmentState, UniqueId,
};
use segmeta_kv::{InMemoryKv, InstrumentedKv};

/// Collection of every fixture segment.
pub const COLLECTION_ID: UniqueId = 2;
/// Partition of every fixture segment.
pub const PARTITION_ID: UniqueId = 1;
/// Id of [`flushed_segment`].
pub const SEGMENT_ID: UniqueId = 11;
/// Id of [`dropped_segment`].
pub const DROPPED_SEGMENT_ID: UniqueId = 1;
/// Field every fixture log belongs to.
pub const FIELD_ID: UniqueId = 1;
/// Id of every fixture log.
pub const LOG_ID: UniqueId = 99;
/// Storage root fixture paths live under.
pub const STORAGE_ROOT: &str = "a";
/// Rows per fixture log entry.
pub const ENTRIES_PER_LOG: i64 = 5;

/// Full path of the fixture log of `kind` for `segment_id`.
pub fn fixture_log_path(kind: LogKind, segment_id: UniqueId) -> String {
    let ident = Segment::new(COLLECTION_ID, PARTITION_ID, segment_id).ident();
    encode_log_path(STORAGE_ROOT, kind, ident, FIELD_ID, LOG_ID)
}

/// A segment carrying one log of each kind with explicit paths.
///
/// Its supplied row count (100) disagrees with its insert logs (5).
pub fn segment_with_logs(segment_id: UniqueId, state: SegmentState) -> Segment {
    let mut segment = Segment::new(COLLECTION_ID, PARTITION_ID, segment_id);
    segment.num_of_rows = 100;
    segment.state = state;
    segment.insert_channel = "by-dev-rootcoord-dml_0_2v0".to_string();
    for kind in LogKind::ALL {
        segment.logs_mut(kind).push(FieldLog::new(
            FIELD_ID,
            vec![LogEntry::with_path(
                ENTRIES_PER_LOG,
                fixture_log_path(kind, segment_id),
            )],
        ));
    }
    segment
}

/// The flushed fixture segment.
pub fn flushed_segment() -> Segment {
    segment_with_logs(SEGMENT_ID, SegmentState::Flushed)
}

/// The dropped fixture segment.
pub fn dropped_segment() -> Segment {
    segment_with_logs(DROPPED_SEGMENT_ID, SegmentState::Dropped)
}

/// The flushed fixture segment with a stats log path that has no log id.
pub fn invalid_path_segment() -> Segment {
    let mut segment = flushed_segment();
    segment.stats_logs[0].entries.push(LogEntry::with_path(1, "badpath"));
    segment
}

/// A segment with one compact insert log for each of `fields` fields.
///
/// It decomposes into `fields + 1` keys; every group holds ten rows.
pub fn wide_segment(segment_id: UniqueId, fields: i64) -> Segment {
    let mut segment = Segment::new(COLLECTION_ID, PARTITION_ID, segment_id);
    segment.state = SegmentState::Flushed;
    segment.insert_logs = (0..fields)
        .map(|field| FieldLog::new(field, vec![LogEntry::compact(10, 1_000 + field)]))
        .collect();
    segment.num_of_rows = 10;
    segment
}

/// The header record a monolithic-layout writer stored for `segment`.
pub fn legacy_record(segment: &Segment) -> (String, Vec<u8>) {
    (
        keys::segment_key(segment.ident()),
        segment.encode().expect("fixture segment encodes"),
    )
}

/// A checkpoint position on `channel`.
pub fn checkpoint_position(channel: &str, timestamp: u64) -> MsgPosition {
    MsgPosition {
        channel_name: channel.to_string(),
        msg_id: timestamp.to_be_bytes().to_vec(),
        msg_group: "datanode-1".to_string(),
        timestamp,
    }
}

/// A catalog over a recording in-memory store.
pub struct TestCatalog {
    /// The store, for inspecting transactions and injecting faults.
    pub kv: Arc<InstrumentedKv<InMemoryKv>>,
    /// The catalog under test.
    pub catalog: Catalog,
}

impl TestCatalog {
    /// Creates an empty catalog rooted at [`STORAGE_ROOT`].
    pub fn new() -> Self {
        Self::with_entries(Vec::new())
    }

    /// Creates a catalog whose store already holds `entries`.
    pub fn with_entries(entries: Vec<(String, Vec<u8>)>) -> Self {
        Self::with_store(
            InMemoryKv::with_entries(entries),
            CatalogConfig::new().storage_root(STORAGE_ROOT),
        )
    }

    /// Creates a catalog over `store` with `config`.
    pub fn with_store(store: InMemoryKv, config: CatalogConfig) -> Self {
        let kv = Arc::new(InstrumentedKv::new(store));
        let catalog = Catalog::new(kv.clone(), config).expect("valid test config");
        Self { kv, catalog }
    }
}

impl Default for TestCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestCatalog {
    type Target = Catalog;

    fn deref(&self) -> &Self::Target {
        &self.catalog
    }
}
