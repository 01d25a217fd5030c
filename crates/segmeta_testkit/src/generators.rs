//! Property-based test generators using proptest.
//!
//! Generated segments keep the invariants the catalog relies on: field ids
//! are unique within one log kind, entry counts are non-negative, and every
//! explicit log path ends in the log id it stands for.

use std::collections::BTreeMap;

use proptest::prelude::*;
use segmeta_core::{
    encode_log_path, FieldLog, LogEntry, LogKind, MsgPosition, Segment, SegmentIdent,
    SegmentState, UniqueId,
};

use crate::fixtures::STORAGE_ROOT;

/// Raw entry parameters: row count, log id, whether the path is explicit.
type EntrySeed = (i64, UniqueId, bool);

/// Strategy for segment identities in a small id space, so generated
/// segments share collections and partitions.
pub fn segment_ident_strategy() -> impl Strategy<Value = SegmentIdent> {
    (1i64..4, 1i64..4, 1i64..200).prop_map(|(c, p, s)| SegmentIdent::new(c, p, s))
}

/// Strategy for segment states.
pub fn segment_state_strategy() -> impl Strategy<Value = SegmentState> {
    prop_oneof![
        Just(SegmentState::Growing),
        Just(SegmentState::Sealed),
        Just(SegmentState::Flushing),
        Just(SegmentState::Flushed),
        Just(SegmentState::Dropped),
        Just(SegmentState::Importing),
    ]
}

fn entry_seed_strategy() -> impl Strategy<Value = EntrySeed> {
    (0i64..10_000, 1i64..1_000_000, any::<bool>())
}

fn groups_strategy(max_fields: usize) -> impl Strategy<Value = BTreeMap<UniqueId, Vec<EntrySeed>>> {
    prop::collection::btree_map(
        0i64..300,
        prop::collection::vec(entry_seed_strategy(), 1..4),
        0..=max_fields,
    )
}

fn build_groups(
    ident: SegmentIdent,
    kind: LogKind,
    seeds: BTreeMap<UniqueId, Vec<EntrySeed>>,
) -> Vec<FieldLog> {
    seeds
        .into_iter()
        .map(|(field_id, entries)| {
            let entries = entries
                .into_iter()
                .map(|(entries_num, log_id, explicit)| {
                    if explicit {
                        let path = encode_log_path(STORAGE_ROOT, kind, ident, field_id, log_id);
                        LogEntry {
                            log_size: entries_num * 8,
                            ..LogEntry::with_path(entries_num, path)
                        }
                    } else {
                        LogEntry {
                            log_size: entries_num * 8,
                            ..LogEntry::compact(entries_num, log_id)
                        }
                    }
                })
                .collect();
            FieldLog::new(field_id, entries)
        })
        .collect()
}

/// Strategy for segments with at most `max_fields` groups per log kind.
///
/// Explicit paths are rooted at [`STORAGE_ROOT`]. The supplied row count is
/// arbitrary and usually disagrees with the insert logs.
pub fn segment_strategy(max_fields: usize) -> impl Strategy<Value = Segment> {
    (
        segment_ident_strategy(),
        segment_state_strategy(),
        0i64..100_000,
        groups_strategy(max_fields),
        groups_strategy(max_fields),
        groups_strategy(max_fields),
    )
        .prop_map(|(ident, state, rows, insert, delete, stats)| {
            let mut segment =
                Segment::new(ident.collection_id, ident.partition_id, ident.segment_id);
            segment.state = state;
            segment.num_of_rows = rows;
            segment.insert_logs = build_groups(ident, LogKind::Insert, insert);
            segment.delete_logs = build_groups(ident, LogKind::Delete, delete);
            segment.stats_logs = build_groups(ident, LogKind::Stats, stats);
            segment
        })
}

/// Strategy for up to `max_len` segments with distinct identities.
pub fn distinct_segments_strategy(
    max_len: usize,
    max_fields: usize,
) -> impl Strategy<Value = Vec<Segment>> {
    prop::collection::vec(segment_strategy(max_fields), 0..=max_len).prop_map(|segments| {
        let mut by_ident = BTreeMap::new();
        for segment in segments {
            by_ident.insert(segment.ident(), segment);
        }
        by_ident.into_values().collect()
    })
}

/// Strategy for virtual channel names.
pub fn channel_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_-]{0,23}").expect("Invalid regex")
}

/// Strategy for message positions.
pub fn msg_position_strategy() -> impl Strategy<Value = MsgPosition> {
    (
        channel_name_strategy(),
        prop::collection::vec(any::<u8>(), 0..16),
        any::<u64>(),
    )
        .prop_map(|(channel_name, msg_id, timestamp)| MsgPosition {
            channel_name,
            msg_id,
            msg_group: "datanode".to_string(),
            timestamp,
        })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
