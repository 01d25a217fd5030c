//! The segment and channel catalog.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use segmeta_codec::{Decode, Encode};
use segmeta_kv::{KvBatch, TxnKv};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::batch::BatchWriter;
use crate::config::CatalogConfig;
use crate::error::{CatalogError, CatalogResult};
use crate::keys::{self, SegmentScope};
use crate::layout::{self, decompose, DecomposedSegment};
use crate::types::{LogKind, MsgPosition, Segment, SegmentIdent, SegmentState, UniqueId};

/// Value of a flushed-segment marker.
#[derive(Debug, Serialize, Deserialize)]
struct FlushedMarker {
    segment_id: UniqueId,
}

/// Writes and removals gathered for one catalog call.
#[derive(Debug, Default)]
struct Mutation {
    writes: KvBatch,
    removes: Vec<String>,
}

impl Mutation {
    fn push(&mut self, mut segment: DecomposedSegment) {
        self.removes.append(&mut segment.emptied_groups);
        segment.append_to(&mut self.writes);
    }

    fn insert(&mut self, key: String, value: Vec<u8>) {
        self.writes.insert(key, value);
    }

    fn remove(&mut self, key: String) {
        self.removes.push(key);
    }
}

/// Persistent catalog of segments, channel checkpoints and channel
/// tombstones.
///
/// The catalog keeps no state of its own besides its configuration and the
/// store handle; every call is a self-contained sequence of store requests.
/// Callers must serialize mutations of the same segment.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use segmeta_core::{Catalog, CatalogConfig, FieldLog, LogEntry, Segment};
/// use segmeta_kv::InMemoryKv;
///
/// let catalog = Catalog::new(Arc::new(InMemoryKv::new()), CatalogConfig::default()).unwrap();
///
/// let mut segment = Segment::new(1, 10, 100);
/// segment.num_of_rows = 999;
/// segment.insert_logs = vec![FieldLog::new(0, vec![LogEntry::compact(42, 7)])];
/// catalog.add_segment(&segment).unwrap();
///
/// let listed = catalog.list_segments().unwrap();
/// assert_eq!(listed.len(), 1);
/// assert_eq!(listed[0].num_of_rows, 42);
/// assert_eq!(listed[0].insert_logs[0].entries[0].log_path, "files/insert_log/1/10/100/0/7");
/// ```
pub struct Catalog {
    kv: Arc<dyn TxnKv>,
    config: CatalogConfig,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Catalog {
    /// Creates a catalog over `kv`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidConfig`] if `config` is unusable.
    pub fn new(kv: Arc<dyn TxnKv>, config: CatalogConfig) -> CatalogResult<Self> {
        config.validate()?;
        Ok(Self { kv, config })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    fn writer(&self) -> BatchWriter<'_> {
        BatchWriter::new(self.kv.as_ref(), self.config.max_txn_ops)
    }

    /// Commits `mutation`, returning the number of transactions issued.
    ///
    /// A key that is both written and removed is written.
    fn commit(&self, mutation: Mutation) -> CatalogResult<usize> {
        let Mutation { writes, mut removes } = mutation;
        removes.retain(|key| !writes.contains_key(key));
        if removes.is_empty() {
            self.writer().commit_writes(&writes)
        } else {
            self.writer().commit_writes_and_removes(&writes, &removes)
        }
    }

    // ---- segments -------------------------------------------------------

    /// Persists a new segment.
    ///
    /// The stored row count is taken from the insert logs when they hold rows.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidLogPath`] without writing anything if
    /// a log path is malformed, or the store error if the write fails.
    pub fn add_segment(&self, segment: &Segment) -> CatalogResult<()> {
        let batch = decompose(segment)?.into_batch();
        self.writer().commit_writes(&batch)?;
        debug!(segment = %segment.ident(), keys = batch.len(), "added segment");
        Ok(())
    }

    /// Persists the current form of every segment in `segments`.
    ///
    /// Records of groups a segment has emptied are removed in the same
    /// commit. An empty slice writes nothing.
    ///
    /// # Errors
    ///
    /// Same as [`Catalog::add_segment`]; a failure after the first
    /// transaction is [`CatalogError::PartialCommit`].
    pub fn alter_segments(&self, segments: &[Segment]) -> CatalogResult<()> {
        if segments.is_empty() {
            return Ok(());
        }
        let mut mutation = Mutation::default();
        for segment in segments {
            mutation.push(decompose(segment)?);
        }
        let txns = self.commit(mutation)?;
        debug!(segments = segments.len(), txns, "altered segments");
        Ok(())
    }

    /// Persists one segment transition.
    ///
    /// Records of groups `new` has emptied are removed. When `new` enters [`SegmentState::Flushed`] a flushed marker is
    /// written alongside it.
    ///
    /// # Errors
    ///
    /// Same as [`Catalog::alter_segments`].
    pub fn alter_segment(&self, new: &Segment, old: &Segment) -> CatalogResult<()> {
        let mut mutation = Mutation::default();
        mutation.push(decompose(new)?);
        if new.state == SegmentState::Flushed && old.state != SegmentState::Flushed {
            let marker = FlushedMarker { segment_id: new.id };
            mutation.insert(keys::flushed_segment_key(new.ident()), marker.encode()?);
        }
        self.commit(mutation)?;
        Ok(())
    }

    /// Persists the outcome of a compaction: the altered source segments and
    /// the segment they were compacted into.
    ///
    /// A dropped source segment whose field log records are already stored
    /// only has its header rewritten; its row count still comes from the log
    /// groups it carries. Every other segment is written in full, which also
    /// moves monolithic records into the decomposed layout.
    ///
    /// # Errors
    ///
    /// A failed read aborts the call before anything is written. Otherwise
    /// same as [`Catalog::alter_segments`].
    pub fn alter_segments_and_add_new_segment(
        &self,
        segments: &[Segment],
        new_segment: Option<&Segment>,
    ) -> CatalogResult<()> {
        let mut mutation = Mutation::default();
        for segment in segments {
            if segment.state == SegmentState::Dropped && self.has_field_logs(segment.ident())? {
                let (key, value) = layout::encode_header(segment)?;
                mutation.insert(key, value);
            } else {
                mutation.push(decompose(segment)?);
            }
        }
        if let Some(new_segment) = new_segment {
            mutation.push(decompose(new_segment)?);
        }
        let key_count = mutation.writes.len();
        let txns = self.commit(mutation)?;
        info!(
            sources = segments.len(),
            new_segment = ?new_segment.map(Segment::ident),
            keys = key_count,
            txns,
            "persisted compaction result"
        );
        Ok(())
    }

    /// Undoes [`Catalog::alter_segments_and_add_new_segment`]: restores the
    /// source segments and removes every key of the compacted segment.
    ///
    /// # Errors
    ///
    /// Same as [`Catalog::alter_segments`].
    pub fn revert_alter_segments_and_add_new_segment(
        &self,
        segments: &[Segment],
        removal: Option<&Segment>,
    ) -> CatalogResult<()> {
        let mut mutation = Mutation::default();
        for segment in segments {
            mutation.push(decompose(segment)?);
        }
        if let Some(removal) = removal {
            mutation.remove(keys::segment_key(removal.ident()));
            for key in layout::field_log_keys(removal) {
                mutation.remove(key);
            }
            mutation.remove(keys::flushed_segment_key(removal.ident()));
        }
        self.commit(mutation)?;
        info!(
            restored = segments.len(),
            removed = ?removal.map(Segment::ident),
            "reverted compaction result"
        );
        Ok(())
    }

    /// Removes a segment's header and the field log records of every group
    /// it lists, empty or not, in one transaction.
    ///
    /// Only the groups listed on `segment` are removed; records the
    /// in-memory copy does not know about are left behind.
    ///
    /// # Errors
    ///
    /// Returns the store error if the removal fails.
    pub fn drop_segment(&self, segment: &Segment) -> CatalogResult<()> {
        let mut removals = layout::field_log_keys(segment);
        removals.push(keys::segment_key(segment.ident()));
        removals.sort();
        removals.dedup();
        self.kv.multi_remove(&removals)?;
        debug!(segment = %segment.ident(), keys = removals.len(), "dropped segment");
        Ok(())
    }

    /// Marks many segments dropped by rewriting their header records.
    ///
    /// An empty slice writes nothing.
    ///
    /// # Errors
    ///
    /// Same as [`Catalog::alter_segments`].
    pub fn save_dropped_segments_in_batch(&self, segments: &[Segment]) -> CatalogResult<()> {
        if segments.is_empty() {
            return Ok(());
        }
        let mut batch = KvBatch::new();
        for segment in segments {
            let mut dropped = layout::segment_header(segment);
            dropped.state = SegmentState::Dropped;
            batch.insert(keys::segment_key(segment.ident()), dropped.encode()?);
        }
        let txns = self.writer().commit_writes(&batch)?;
        debug!(segments = segments.len(), txns, "saved dropped segments");
        Ok(())
    }

    /// Lists every segment.
    ///
    /// # Errors
    ///
    /// Returns an error if a scan fails or a stored record is corrupt.
    pub fn list_segments(&self) -> CatalogResult<Vec<Segment>> {
        self.list_segments_in(SegmentScope::All)
    }

    /// Lists the segments in `scope`, ordered by identity.
    ///
    /// Decomposed and monolithic records are resolved independently, so a
    /// store holding both layouts lists correctly.
    ///
    /// # Errors
    ///
    /// Returns an error if a scan fails or a stored record is corrupt.
    pub fn list_segments_in(&self, scope: SegmentScope) -> CatalogResult<Vec<Segment>> {
        let mut related: HashMap<SegmentIdent, Vec<(String, Vec<u8>)>> = HashMap::new();
        for kind in LogKind::ALL {
            for (key, value) in self.kv.load_with_prefix(&scope.field_log_prefix(kind))? {
                let (_, ident, _) = keys::parse_field_log_key(&key)?;
                related.entry(ident).or_default().push((key, value));
            }
        }

        let mut headers = Vec::new();
        for (key, value) in self.kv.load_with_prefix(&scope.header_prefix())? {
            let ident = keys::parse_segment_key(&key)?;
            if scope.contains(ident) {
                headers.push((ident, value));
            }
        }
        headers.sort_by_key(|(ident, _)| *ident);

        let root = &self.config.storage_root;
        let mut segments = Vec::with_capacity(headers.len());
        for (ident, header) in headers {
            let records = related.remove(&ident).unwrap_or_default();
            segments.push(layout::recompose(root, &header, &records)?);
        }
        for ident in related.keys() {
            debug!(segment = %ident, "field log records without a segment header");
        }
        Ok(segments)
    }

    /// Loads a single segment.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::SegmentNotFound`] if the segment has no
    /// header record.
    pub fn load_segment(
        &self,
        collection_id: UniqueId,
        partition_id: UniqueId,
        segment_id: UniqueId,
    ) -> CatalogResult<Segment> {
        let ident = SegmentIdent::new(collection_id, partition_id, segment_id);
        let header = self
            .kv
            .load(&keys::segment_key(ident))
            .map_err(|e| {
                if e.is_not_found() {
                    CatalogError::SegmentNotFound { ident }
                } else {
                    e.into()
                }
            })?;
        let mut records = Vec::new();
        for kind in LogKind::ALL {
            records.extend(
                self.kv
                    .load_with_prefix(&keys::segment_field_log_prefix(ident, kind))?,
            );
        }
        layout::recompose(&self.config.storage_root, &header, &records)
    }

    /// Ids of the segments of one partition that carry a flushed marker.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan fails or a marker key is corrupt.
    pub fn list_flushed_segment_ids(
        &self,
        collection_id: UniqueId,
        partition_id: UniqueId,
    ) -> CatalogResult<Vec<UniqueId>> {
        let prefix = keys::flushed_segment_prefix(collection_id, partition_id);
        let mut ids = self
            .kv
            .load_with_prefix(&prefix)?
            .into_iter()
            .map(|(key, _)| keys::parse_flushed_segment_key(&key).map(|ident| ident.segment_id))
            .collect::<CatalogResult<Vec<_>>>()?;
        ids.sort_unstable();
        Ok(ids)
    }

    fn has_field_logs(&self, ident: SegmentIdent) -> CatalogResult<bool> {
        for kind in LogKind::ALL {
            let prefix = keys::segment_field_log_prefix(ident, kind);
            if !self.kv.load_with_prefix(&prefix)?.is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    // ---- channel checkpoints -------------------------------------------

    /// Records how far a virtual channel has been consumed.
    ///
    /// # Errors
    ///
    /// Returns the store error if the write fails.
    pub fn save_channel_checkpoint(&self, vchannel: &str, position: &MsgPosition) -> CatalogResult<()> {
        self.kv
            .save(&keys::channel_checkpoint_key(vchannel), &position.encode()?)?;
        Ok(())
    }

    /// Returns every channel checkpoint, keyed by virtual channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan fails or a checkpoint is corrupt.
    pub fn list_channel_checkpoints(&self) -> CatalogResult<BTreeMap<String, MsgPosition>> {
        let mut checkpoints = BTreeMap::new();
        for (key, value) in self.kv.load_with_prefix(&keys::channel_checkpoint_prefix())? {
            let vchannel = keys::parse_channel_checkpoint_key(&key)?.to_string();
            checkpoints.insert(vchannel, MsgPosition::decode(&value)?);
        }
        Ok(checkpoints)
    }

    /// Removes a virtual channel's checkpoint.
    ///
    /// # Errors
    ///
    /// Returns the store error if the removal fails.
    pub fn drop_channel_checkpoint(&self, vchannel: &str) -> CatalogResult<()> {
        self.kv.remove(&keys::channel_checkpoint_key(vchannel))?;
        Ok(())
    }

    // ---- channel tombstones --------------------------------------------

    /// Records that `channel` has been permanently retired.
    ///
    /// # Errors
    ///
    /// Returns the store error if the write fails.
    pub fn mark_channel_deleted(&self, channel: &str) -> CatalogResult<()> {
        self.kv
            .save(&keys::channel_tombstone_key(channel), keys::CHANNEL_TOMBSTONE)?;
        info!(channel, "marked channel deleted");
        Ok(())
    }

    /// Returns true if `channel` carries a tombstone.
    ///
    /// # Errors
    ///
    /// Returns the store error if the read fails for any reason other than
    /// the key being absent.
    pub fn is_channel_dropped(&self, channel: &str) -> CatalogResult<bool> {
        match self.kv.load(&keys::channel_tombstone_key(channel)) {
            Ok(value) => Ok(value == keys::CHANNEL_TOMBSTONE),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes a channel's tombstone.
    ///
    /// # Errors
    ///
    /// Returns the store error if the removal fails.
    pub fn drop_channel(&self, channel: &str) -> CatalogResult<()> {
        self.kv.remove(&keys::channel_tombstone_key(channel))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_path::encode_log_path;
    use crate::types::{FieldLog, LogEntry};
    use segmeta_kv::{InMemoryKv, InstrumentedKv, TxnKind};

    const ROOT: &str = "a";

    fn catalog() -> (Arc<InstrumentedKv<InMemoryKv>>, Catalog) {
        let kv = Arc::new(InstrumentedKv::new(InMemoryKv::new()));
        let catalog = Catalog::new(kv.clone(), CatalogConfig::new().storage_root(ROOT)).unwrap();
        (kv, catalog)
    }

    fn seeded(entries: Vec<(String, Vec<u8>)>) -> (Arc<InstrumentedKv<InMemoryKv>>, Catalog) {
        let kv = Arc::new(InstrumentedKv::new(InMemoryKv::with_entries(entries)));
        let catalog = Catalog::new(kv.clone(), CatalogConfig::new().storage_root(ROOT)).unwrap();
        (kv, catalog)
    }

    /// Segment with one group of each kind, written with explicit paths.
    fn flushed_segment(id: UniqueId) -> Segment {
        let mut seg = Segment::new(2, 1, id);
        seg.num_of_rows = 100;
        seg.state = SegmentState::Flushed;
        for kind in LogKind::ALL {
            let path = encode_log_path(ROOT, kind, seg.ident(), 1, 99);
            seg.logs_mut(kind)
                .push(FieldLog::new(1, vec![LogEntry::with_path(5, path)]));
        }
        seg
    }

    fn wide_segment(id: UniqueId, fields: i64) -> Segment {
        let mut seg = Segment::new(2, 1, id);
        seg.insert_logs = (0..fields)
            .map(|f| FieldLog::new(f, vec![LogEntry::compact(10, 1000 + f)]))
            .collect();
        seg
    }

    #[test]
    fn zero_ceiling_is_rejected() {
        let kv = Arc::new(InMemoryKv::new());
        let err = Catalog::new(kv, CatalogConfig::new().max_txn_ops(0)).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidConfig { .. }));
    }

    #[test]
    fn add_segment_corrects_row_count() {
        let (kv, catalog) = catalog();
        catalog.add_segment(&flushed_segment(11)).unwrap();

        assert_eq!(kv.txn_count(), 1);
        assert_eq!(kv.saved_key_count(), 4);

        let loaded = catalog.load_segment(2, 1, 11).unwrap();
        assert_eq!(loaded.num_of_rows, 5);
        assert_eq!(loaded.state, SegmentState::Flushed);
        for kind in LogKind::ALL {
            let entry = &loaded.logs(kind)[0].entries[0];
            assert_eq!(entry.log_id, 99);
            assert_eq!(entry.log_path, encode_log_path(ROOT, kind, loaded.ident(), 1, 99));
        }
    }

    #[test]
    fn drop_segment_removes_exactly_what_add_wrote() {
        let (kv, catalog) = catalog();
        let seg = flushed_segment(11);
        catalog.add_segment(&seg).unwrap();
        let written = kv.transactions()[0].saves.clone();

        catalog.drop_segment(&seg).unwrap();
        let drop = &kv.transactions()[1];
        assert_eq!(drop.kind, TxnKind::MultiRemove);
        let mut removed = drop.removals.clone();
        removed.sort();
        assert_eq!(removed, written);
        assert!(kv.inner().is_empty());
    }

    #[test]
    fn emptied_group_is_removed_on_alter() {
        let (kv, catalog) = catalog();
        catalog.add_segment(&flushed_segment(11)).unwrap();
        kv.reset_log();

        let mut altered = flushed_segment(11);
        altered.stats_logs = vec![FieldLog::new(1, Vec::new())];
        catalog.alter_segments(&[altered.clone()]).unwrap();

        let txns = kv.transactions();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].kind, TxnKind::MultiSaveAndRemove);
        assert_eq!(txns[0].removals, vec!["datacoord-meta/statslog/2/1/11/1".to_string()]);

        let loaded = catalog.load_segment(2, 1, 11).unwrap();
        assert!(loaded.stats_logs.is_empty());
        assert_eq!(loaded.insert_logs.len(), 1);

        catalog.drop_segment(&altered).unwrap();
        assert!(kv.inner().is_empty());
    }

    #[test]
    fn drop_covers_groups_emptied_in_memory_only() {
        let (kv, catalog) = catalog();
        catalog.add_segment(&flushed_segment(11)).unwrap();

        let mut stale = flushed_segment(11);
        stale.delete_logs[0].entries.clear();
        catalog.drop_segment(&stale).unwrap();
        assert!(kv.inner().is_empty());
        assert_eq!(kv.transactions()[1].ops(), 4);
    }

    #[test]
    fn alter_segment_removes_emptied_group_alongside_marker() {
        let (kv, catalog) = catalog();
        let mut growing = flushed_segment(11);
        growing.state = SegmentState::Growing;
        catalog.add_segment(&growing).unwrap();

        let mut flushed = flushed_segment(11);
        flushed.delete_logs[0].entries.clear();
        catalog.alter_segment(&flushed, &growing).unwrap();

        assert!(catalog.load_segment(2, 1, 11).unwrap().delete_logs.is_empty());
        assert_eq!(catalog.list_flushed_segment_ids(2, 1).unwrap(), vec![11]);
        assert!(!kv
            .inner()
            .keys()
            .iter()
            .any(|k| k.starts_with("datacoord-meta/deltalog/")));
    }

    #[test]
    fn unflushed_rows_are_kept_without_insert_logs() {
        let (_, catalog) = catalog();
        let mut growing = Segment::new(2, 1, 11);
        growing.state = SegmentState::Growing;
        growing.num_of_rows = 300;
        catalog.add_segment(&growing).unwrap();
        assert_eq!(catalog.load_segment(2, 1, 11).unwrap().num_of_rows, 300);

        let mut header_only = flushed_segment(11).without_logs();
        header_only.num_of_rows = 5;
        catalog.save_dropped_segments_in_batch(&[header_only]).unwrap();
        let dropped = catalog.load_segment(2, 1, 11).unwrap();
        assert_eq!(dropped.state, SegmentState::Dropped);
        assert_eq!(dropped.num_of_rows, 5);
    }

    #[test]
    fn alter_nothing_writes_nothing() {
        let (kv, catalog) = catalog();
        catalog.alter_segments(&[]).unwrap();
        catalog.save_dropped_segments_in_batch(&[]).unwrap();
        assert_eq!(kv.txn_count(), 0);
    }

    #[test]
    fn wide_segment_is_chunked() {
        let (kv, catalog) = catalog();
        catalog.alter_segments(&[wide_segment(11, 257)]).unwrap();

        let ops: Vec<_> = kv.transactions().iter().map(|t| t.ops()).collect();
        assert_eq!(ops, vec![128, 128, 2]);
        assert_eq!(kv.inner().len(), 258);

        let loaded = catalog.load_segment(2, 1, 11).unwrap();
        assert_eq!(loaded.insert_logs.len(), 257);
        assert_eq!(loaded.num_of_rows, 10);
        assert_eq!(loaded.insert_logs[256].field_id, 256);
    }

    #[test]
    fn failed_second_chunk_reports_partial_commit() {
        let (kv, catalog) = catalog();
        kv.fail_writes_after(1);
        let err = catalog.add_segment(&wide_segment(11, 257)).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::PartialCommit {
                committed: 1,
                total: 3,
                ..
            }
        ));
        assert_eq!(kv.inner().len(), 128);
    }

    #[test]
    fn malformed_path_persists_nothing() {
        let (kv, catalog) = catalog();
        let good = flushed_segment(11);
        let mut bad = flushed_segment(12);
        bad.stats_logs[0].entries[0].log_path = "badpath".to_string();

        let err = catalog.alter_segments(&[good, bad]).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidLogPath { ref path } if path == "badpath"));
        assert_eq!(kv.txn_count(), 0);
        assert!(kv.inner().is_empty());
    }

    #[test]
    fn monolithic_record_lists_fully_populated() {
        let legacy = flushed_segment(11);
        let (_, catalog) = seeded(vec![(
            keys::segment_key(legacy.ident()),
            legacy.encode().unwrap(),
        )]);

        let listed = catalog.list_segments().unwrap();
        assert_eq!(listed, vec![legacy.clone()]);
        assert_eq!(listed[0].num_of_rows, 100);
        assert_eq!(catalog.load_segment(2, 1, 11).unwrap(), legacy);
    }

    #[test]
    fn mixed_layouts_list_independently() {
        let legacy = flushed_segment(11);
        let (_, catalog) = seeded(vec![(
            keys::segment_key(legacy.ident()),
            legacy.encode().unwrap(),
        )]);
        catalog.add_segment(&flushed_segment(12)).unwrap();
        catalog.add_segment(&flushed_segment(1)).unwrap();

        let listed = catalog.list_segments().unwrap();
        let ids: Vec<_> = listed.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 11, 12]);
        assert_eq!(listed[1], legacy);
        assert_eq!(listed[2].num_of_rows, 5);
        assert_eq!(listed[2].insert_logs[0].entries[0].log_id, 99);
        assert_eq!(listed[0].insert_logs.len(), 1);
    }

    #[test]
    fn orphaned_field_logs_are_ignored() {
        let (kv, catalog) = catalog();
        let seg = flushed_segment(11);
        catalog.add_segment(&seg).unwrap();
        kv.inner().remove(&keys::segment_key(seg.ident())).unwrap();
        assert!(catalog.list_segments().unwrap().is_empty());
    }

    #[test]
    fn list_is_scoped() {
        let (_, catalog) = catalog();
        catalog.add_segment(&flushed_segment(11)).unwrap();
        catalog.add_segment(&flushed_segment(1)).unwrap();
        let mut other = flushed_segment(3);
        other.collection_id = 21;
        catalog.add_segment(&other).unwrap();

        let only = catalog
            .list_segments_in(SegmentScope::Segment(SegmentIdent::new(2, 1, 1)))
            .unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].id, 1);
        assert_eq!(only[0].insert_logs.len(), 1);

        assert_eq!(catalog.list_segments_in(SegmentScope::Collection(2)).unwrap().len(), 2);
        assert_eq!(catalog.list_segments_in(SegmentScope::Collection(21)).unwrap().len(), 1);
        assert_eq!(catalog.list_segments().unwrap().len(), 3);
    }

    #[test]
    fn load_missing_segment() {
        let (_, catalog) = catalog();
        let err = catalog.load_segment(2, 1, 11).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::SegmentNotFound { ident } if ident == SegmentIdent::new(2, 1, 11)
        ));
    }

    #[test]
    fn compaction_rewrites_only_headers_of_stored_dropped_segments() {
        let (kv, catalog) = catalog();
        let source = flushed_segment(11);
        catalog.add_segment(&source).unwrap();
        kv.reset_log();

        let mut dropped = source.clone();
        dropped.state = SegmentState::Dropped;
        let mut compacted = wide_segment(12, 1);
        compacted.created_by_compaction = true;
        compacted.compaction_from = vec![11];

        catalog
            .alter_segments_and_add_new_segment(&[dropped], Some(&compacted))
            .unwrap();

        let txns = kv.transactions();
        assert_eq!(txns.len(), 1);
        assert_eq!(
            txns[0].saves,
            vec![
                "datacoord-meta/binlog/2/1/12/0".to_string(),
                "datacoord-meta/s/2/1/11".to_string(),
                "datacoord-meta/s/2/1/12".to_string(),
            ]
        );

        let listed = catalog.list_segments().unwrap();
        assert_eq!(listed[0].state, SegmentState::Dropped);
        assert_eq!(listed[0].num_of_rows, 5);
        assert_eq!(listed[0].stats_logs.len(), 1);
        assert_eq!(listed[1].compaction_from, vec![11]);
    }

    #[test]
    fn compaction_upgrades_monolithic_sources() {
        let legacy = flushed_segment(11);
        let (kv, catalog) = seeded(vec![(
            keys::segment_key(legacy.ident()),
            legacy.encode().unwrap(),
        )]);
        let mut dropped = legacy;
        dropped.state = SegmentState::Dropped;

        catalog
            .alter_segments_and_add_new_segment(&[dropped], None)
            .unwrap();
        assert_eq!(kv.saved_key_count(), 4);

        let loaded = catalog.load_segment(2, 1, 11).unwrap();
        assert_eq!(loaded.state, SegmentState::Dropped);
        assert_eq!(loaded.num_of_rows, 5);
        assert_eq!(loaded.delete_logs[0].entries[0].log_id, 99);
    }

    #[test]
    fn compaction_read_failure_aborts() {
        let (kv, catalog) = catalog();
        catalog.add_segment(&flushed_segment(11)).unwrap();
        kv.reset_log();
        kv.fail_reads();

        let mut dropped = flushed_segment(11);
        dropped.state = SegmentState::Dropped;
        let err = catalog
            .alter_segments_and_add_new_segment(&[dropped], Some(&wide_segment(12, 1)))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Kv(_)));
        assert_eq!(kv.txn_count(), 0);

        kv.heal();
        assert_eq!(catalog.list_segments().unwrap()[0].state, SegmentState::Flushed);
    }

    #[test]
    fn revert_restores_sources_and_removes_result() {
        let (_, catalog) = catalog();
        let source = flushed_segment(11);
        catalog.add_segment(&source).unwrap();

        let mut dropped = source.clone();
        dropped.state = SegmentState::Dropped;
        let mut compacted = wide_segment(12, 3);
        compacted.state = SegmentState::Flushed;
        catalog
            .alter_segments_and_add_new_segment(&[dropped], Some(&compacted))
            .unwrap();
        let mut growing = compacted.clone();
        growing.state = SegmentState::Growing;
        catalog.alter_segment(&compacted, &growing).unwrap();
        assert_eq!(catalog.list_segments().unwrap().len(), 2);
        assert_eq!(catalog.list_flushed_segment_ids(2, 1).unwrap(), vec![12]);

        catalog
            .revert_alter_segments_and_add_new_segment(&[source], Some(&compacted))
            .unwrap();

        let listed = catalog.list_segments().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, 11);
        assert_eq!(listed[0].state, SegmentState::Flushed);
        assert_eq!(listed[0].num_of_rows, 5);
        assert_eq!(listed[0].insert_logs[0].entries[0].log_id, 99);
        assert!(catalog.list_flushed_segment_ids(2, 1).unwrap().is_empty());
    }

    #[test]
    fn flushed_marker_written_on_transition() {
        let (_, catalog) = catalog();
        let mut growing = flushed_segment(11);
        growing.state = SegmentState::Growing;
        catalog.add_segment(&growing).unwrap();
        assert!(catalog.list_flushed_segment_ids(2, 1).unwrap().is_empty());

        let flushed = flushed_segment(11);
        catalog.alter_segment(&flushed, &growing).unwrap();
        catalog.alter_segment(&flushed_segment(3), &growing).unwrap();
        assert_eq!(catalog.list_flushed_segment_ids(2, 1).unwrap(), vec![3, 11]);
        assert!(catalog.list_flushed_segment_ids(2, 7).unwrap().is_empty());
    }

    #[test]
    fn dropped_batch_rewrites_headers_only() {
        let (kv, catalog) = catalog();
        let segments: Vec<_> = (0..129).map(flushed_segment).collect();

        catalog.save_dropped_segments_in_batch(&segments).unwrap();
        assert_eq!(kv.txn_count(), 2);
        assert_eq!(kv.saved_key_count(), 129);

        let listed = catalog.list_segments().unwrap();
        assert_eq!(listed.len(), 129);
        assert!(listed.iter().all(|s| s.state == SegmentState::Dropped));
        assert!(listed.iter().all(|s| s.num_of_rows == 5 && !s.has_logs()));
    }

    #[test]
    fn channel_checkpoint_lifecycle() {
        let (_, catalog) = catalog();
        let position = MsgPosition {
            channel_name: "ch-1".to_string(),
            msg_id: vec![1, 2, 3],
            msg_group: "group".to_string(),
            timestamp: 1000,
        };

        catalog.save_channel_checkpoint("ch-1", &position).unwrap();
        let checkpoints = catalog.list_channel_checkpoints().unwrap();
        assert_eq!(checkpoints.len(), 1);
        assert_eq!(checkpoints["ch-1"], position);

        catalog.drop_channel_checkpoint("ch-1").unwrap();
        assert!(catalog.list_channel_checkpoints().unwrap().is_empty());
    }

    #[test]
    fn channel_tombstone_lifecycle() {
        let (kv, catalog) = catalog();
        assert!(!catalog.is_channel_dropped("ch-1").unwrap());

        catalog.mark_channel_deleted("ch-1").unwrap();
        assert!(catalog.is_channel_dropped("ch-1").unwrap());
        assert!(!catalog.is_channel_dropped("ch-10").unwrap());
        assert_eq!(
            kv.inner().load("datacoord-meta/channel-removal/ch-1").unwrap(),
            b"removed".to_vec()
        );

        kv.fail_reads();
        assert!(catalog.is_channel_dropped("ch-1").is_err());
        kv.heal();

        catalog.drop_channel("ch-1").unwrap();
        assert!(!catalog.is_channel_dropped("ch-1").unwrap());
    }
}
