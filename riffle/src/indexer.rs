//! In-memory index for Riffle
//!
//! Holds one immutable `Snapshot` behind an `RwLock<Option<Arc<_>>>`. Readers
//! clone the `Arc` and drop the lock before scoring, so a rebuild swaps in the
//! new snapshot atomically and queries already in flight finish on the old one.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::candidate::IndexedRecord;
use crate::config::FieldConfig;
use crate::interface::IndexStats;
use crate::models::Record;

/// Immutable point-in-time copy of the corpus
#[derive(Debug)]
pub struct Snapshot {
    version: u64,
    built_at: DateTime<Utc>,
    records: Vec<IndexedRecord>,
}

impl Snapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn indexed(&self) -> &[IndexedRecord] {
        &self.records
    }

    /// Records in corpus order
    pub fn records(&self) -> impl Iterator<Item = &Arc<Record>> + '_ {
        self.records.iter().map(IndexedRecord::record)
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            version: self.version,
            records: self.records.len(),
            built_at: self.built_at,
        }
    }
}

/// Owning iterator over one snapshot's records. Unaffected by later rebuilds.
pub struct SnapshotRecords {
    snapshot: Option<Arc<Snapshot>>,
    next: usize,
}

impl Iterator for SnapshotRecords {
    type Item = Arc<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let snapshot = self.snapshot.as_ref()?;
        let record = snapshot.records.get(self.next)?.record().clone();
        self.next += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .snapshot
            .as_ref()
            .map_or(0, |s| s.records.len().saturating_sub(self.next));
        (remaining, Some(remaining))
    }
}

/// Snapshot-swapping record index
pub struct Indexer {
    fields: Vec<FieldConfig>,
    current: RwLock<Option<Arc<Snapshot>>>,
    next_version: AtomicU64,
}

impl Indexer {
    /// An index with no snapshot yet. Searches over it return nothing.
    pub fn new(fields: Vec<FieldConfig>) -> Self {
        Self {
            fields,
            current: RwLock::new(None),
            next_version: AtomicU64::new(1),
        }
    }

    /// Index built from an initial corpus
    pub fn build(fields: Vec<FieldConfig>, records: Vec<Record>) -> (Self, IndexStats) {
        let indexer = Self::new(fields);
        let stats = indexer.rebuild(records);
        (indexer, stats)
    }

    pub fn fields(&self) -> &[FieldConfig] {
        &self.fields
    }

    /// Replace the whole snapshot. The new snapshot is fully built before the swap.
    pub fn rebuild(&self, records: Vec<Record>) -> IndexStats {
        let version = self.next_version.fetch_add(1, Ordering::Relaxed);

        let mut seen = HashSet::with_capacity(records.len());
        let duplicates = records.iter().filter(|r| !seen.insert(r.id.as_str())).count();
        if duplicates > 0 {
            tracing::warn!(version, duplicates, "snapshot contains duplicate record ids");
        }

        let indexed: Vec<IndexedRecord> = records
            .into_iter()
            .enumerate()
            .map(|(position, record)| IndexedRecord::new(position, Arc::new(record), &self.fields))
            .collect();

        let snapshot = Arc::new(Snapshot {
            version,
            built_at: Utc::now(),
            records: indexed,
        });
        let stats = snapshot.stats();

        *self.current.write() = Some(snapshot);
        tracing::info!(version = stats.version, records = stats.records, "index rebuilt");

        stats
    }

    /// The current snapshot, if one was ever built
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.current.read().clone()
    }

    pub fn is_built(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn num_records(&self) -> usize {
        self.current.read().as_ref().map_or(0, |s| s.len())
    }

    /// Lazy, restartable sequence of the records at the last build
    pub fn iterate(&self) -> SnapshotRecords {
        SnapshotRecords {
            snapshot: self.snapshot(),
            next: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<FieldConfig> {
        vec![FieldConfig::new("title", 1.0)]
    }

    fn corpus(titles: &[&str]) -> Vec<Record> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| Record::new(i.to_string()).with_field("title", *t))
            .collect()
    }

    #[test]
    fn test_unbuilt_index_is_empty() {
        let indexer = Indexer::new(fields());
        assert!(!indexer.is_built());
        assert_eq!(indexer.num_records(), 0);
        assert_eq!(indexer.iterate().count(), 0);
    }

    #[test]
    fn test_build_and_iterate_in_order() {
        let (indexer, stats) = Indexer::build(fields(), corpus(&["Dune", "Emma", "Ulysses"]));
        assert_eq!(stats.records, 3);
        assert_eq!(stats.version, 1);

        let ids: Vec<String> = indexer.iterate().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);

        // Restartable
        assert_eq!(indexer.iterate().count(), 3);
        assert_eq!(indexer.iterate().size_hint(), (3, Some(3)));
    }

    #[test]
    fn test_rebuild_replaces_snapshot() {
        let (indexer, _) = Indexer::build(fields(), corpus(&["Dune"]));
        let stats = indexer.rebuild(Vec::new());
        assert_eq!(stats.version, 2);
        assert_eq!(stats.records, 0);
        assert!(indexer.is_built());
        assert_eq!(indexer.iterate().count(), 0);
    }

    #[test]
    fn test_held_snapshot_survives_rebuild() {
        let (indexer, _) = Indexer::build(fields(), corpus(&["Dune", "Emma"]));
        let old = indexer.snapshot().unwrap();
        let mut iter = indexer.iterate();
        assert_eq!(iter.next().map(|r| r.id.clone()), Some("0".to_string()));

        indexer.rebuild(corpus(&["Persuasion"]));

        assert_eq!(old.len(), 2);
        assert_eq!(old.version(), 1);
        assert_eq!(iter.next().map(|r| r.id.clone()), Some("1".to_string()));
        assert!(iter.next().is_none());
        assert_eq!(indexer.snapshot().unwrap().version(), 2);
    }

    #[test]
    fn test_positions_follow_corpus_order() {
        let (indexer, _) = Indexer::build(fields(), corpus(&["a", "b", "c"]));
        let snapshot = indexer.snapshot().unwrap();
        let positions: Vec<usize> = snapshot.indexed().iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        let titles: Vec<&str> = snapshot.records().filter_map(|r| r.field("title")).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_ids_still_indexed() {
        let records = vec![
            Record::new("1").with_field("title", "Dune"),
            Record::new("1").with_field("title", "Dune Messiah"),
        ];
        let (indexer, stats) = Indexer::build(fields(), records);
        assert_eq!(stats.records, 2);
        assert_eq!(indexer.num_records(), 2);
    }

    #[test]
    fn test_concurrent_readers_see_whole_snapshots() {
        let indexer = Arc::new(Indexer::new(fields()));
        indexer.rebuild(corpus(&["a"; 10]));

        let writer = {
            let indexer = indexer.clone();
            std::thread::spawn(move || {
                for i in 0..50 {
                    let size = if i % 2 == 0 { 20 } else { 10 };
                    indexer.rebuild(corpus(&vec!["x"; size]));
                }
            })
        };

        for _ in 0..200 {
            let snapshot = indexer.snapshot().unwrap();
            assert!(snapshot.len() == 10 || snapshot.len() == 20);
            assert_eq!(snapshot.records().count(), snapshot.len());
        }
        writer.join().unwrap();
    }
}
