//! The LIKE index: insert, delete, compaction, queries and rebuild.
//!
//! [`LikeIndex`] ties the positional index, the length index and the record
//! store together. It is single-writer; wrap it in
//! [`ConcurrentLikeIndex`](crate::ConcurrentLikeIndex) to share it between
//! threads.
//!
//! # Example
//!
//! ```
//! use likeindex_core::LikeIndex;
//!
//! let mut index = LikeIndex::new();
//! for (id, value) in [(1u64, "cat"), (2, "car"), (3, "dog"), (4, "scar")] {
//!     index.insert(id, value).unwrap();
//! }
//!
//! assert_eq!(index.match_pattern("ca_").unwrap(), vec![1, 2]);
//! assert_eq!(index.match_pattern("%ar").unwrap(), vec![2, 4]);
//!
//! index.delete_where(|id| *id == 2);
//! assert_eq!(index.match_pattern("%ar").unwrap(), vec![4]);
//! ```

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::bitmap::{Bitmap, BitmapKind};
use crate::config::LikeIndexConfig;
use crate::error::{Error, Result};
use crate::length::LengthIndex;
use crate::pattern::parse;
use crate::positional::PositionalIndex;
use crate::query::{strategy_for, Executor, QueryPlan};
use crate::source::RecordSource;
use crate::store::{RecordStore, SlotState};

/// Snapshot of index counters and sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Records visible to queries.
    pub active_records: usize,
    /// Slots ever allocated.
    pub total_slots: usize,
    /// Slots waiting to be reused.
    pub free_slots: usize,
    /// Deleted records not yet compacted.
    pub tombstones: usize,
    /// Longest indexed value length.
    pub max_length: usize,
    /// Inserts since construction or the last rebuild.
    pub insert_count: u64,
    /// Replace operations.
    pub update_count: u64,
    /// Records deleted.
    pub delete_count: u64,
    /// Completed compaction passes.
    pub compaction_count: u64,
    /// Forward `(byte, position)` entries plus negative ones.
    pub position_entries: usize,
    /// Allocated length slots.
    pub length_slots: usize,
    /// Rough heap footprint of bitmaps and cached values.
    pub memory_bytes: usize,
    /// Bitmap backend in use.
    pub backend: BitmapKind,
}

impl IndexStats {
    /// Renders the stats as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    inserts: u64,
    updates: u64,
    deletes: u64,
    compactions: u64,
}

/// In-memory LIKE pattern index over records identified by `I`.
#[derive(Debug, Clone)]
pub struct LikeIndex<I> {
    config: LikeIndexConfig,
    positional: PositionalIndex,
    length: LengthIndex,
    store: RecordStore<I>,
    counters: Counters,
}

impl<I> Default for LikeIndex<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> LikeIndex<I> {
    /// Creates an empty index with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::from_valid_config(LikeIndexConfig::default())
    }

    /// Creates an empty index with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration does not validate.
    pub fn with_config(config: LikeIndexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: LikeIndexConfig) -> Self {
        let kind = config.bitmap.backend;
        Self {
            config,
            positional: PositionalIndex::new(kind),
            length: LengthIndex::new(kind),
            store: RecordStore::new(kind),
            counters: Counters::default(),
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &LikeIndexConfig {
        &self.config
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.active_records()
    }

    /// Returns true if no record is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifier of a live record.
    #[must_use]
    pub fn identifier(&self, record: u32) -> Option<&I> {
        match self.store.state(record) {
            Some(SlotState::Live) => self.store.identifier(record),
            _ => None,
        }
    }

    fn indexed_prefix<'v>(&self, value: &'v [u8]) -> &'v [u8] {
        let max = self.config.index.max_indexed_length;
        &value[..value.len().min(max)]
    }

    /// Indexes `value` under `identifier` and returns its record index.
    ///
    /// Values longer than `index.max_indexed_length` are truncated; the
    /// remainder cannot be matched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`] or [`Error::CapacityExceeded`] if no slot
    /// can be obtained. The index is unchanged in that case.
    pub fn insert(&mut self, identifier: I, value: impl AsRef<[u8]>) -> Result<u32> {
        let record = self.index_value(identifier, value.as_ref())?;
        self.counters.inserts += 1;
        Ok(record)
    }

    fn index_value(&mut self, identifier: I, value: &[u8]) -> Result<u32> {
        let indexed = self.indexed_prefix(value);
        if indexed.len() < value.len() {
            warn!(
                len = value.len(),
                max = indexed.len(),
                "value truncated to maximum indexed length"
            );
        }

        let acquired = self.store.acquire(identifier, Box::from(indexed))?;
        let record = acquired.record;
        if let Some(stale) = acquired.stale.as_deref() {
            trace!(record, stale_len = stale.len(), "scrubbing reused slot");
            self.positional.remove_value(record, stale);
            self.length.remove(record, stale.len());
        } else if acquired.reused {
            trace!(record, "reusing compacted slot");
        }

        self.positional.add_value(record, indexed);
        self.length.add(record, indexed.len());
        Ok(record)
    }

    /// Deletes every live record whose identifier satisfies `predicate`.
    ///
    /// Records are tombstoned; bitmaps are purged by the next compaction,
    /// which runs here when `index.auto_compact` is set and the threshold is
    /// reached. Returns the number of records deleted.
    pub fn delete_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&I) -> bool,
    {
        let removed = self.tombstone_where(&mut predicate, None);
        self.counters.deletes += removed as u64;
        debug!(
            removed,
            tombstones = self.store.tombstone_count(),
            "delete pass finished"
        );
        self.maybe_compact();
        removed
    }

    /// Replaces every live record matching `predicate` with a single new
    /// record. Returns the new record index.
    ///
    /// Counts as one update; the insert and delete counters are untouched.
    ///
    /// # Errors
    ///
    /// Fails like [`insert`](Self::insert), before anything is deleted.
    pub fn replace_where<F>(
        &mut self,
        mut predicate: F,
        identifier: I,
        value: impl AsRef<[u8]>,
    ) -> Result<u32>
    where
        F: FnMut(&I) -> bool,
    {
        let record = self.index_value(identifier, value.as_ref())?;
        let removed = self.tombstone_where(&mut predicate, Some(record));
        self.counters.updates += 1;
        debug!(record, removed, "replace finished");
        self.maybe_compact();
        Ok(record)
    }

    fn tombstone_where(
        &mut self,
        predicate: &mut dyn FnMut(&I) -> bool,
        keep: Option<u32>,
    ) -> usize {
        let doomed: Vec<u32> = self
            .store
            .live()
            .filter(|&(record, id)| Some(record) != keep && predicate(id))
            .map(|(record, _)| record)
            .collect();
        doomed
            .into_iter()
            .filter(|&record| self.store.tombstone(record))
            .count()
    }

    /// Returns true once pending tombstones reach the compaction threshold.
    #[must_use]
    pub fn needs_compaction(&self) -> bool {
        self.store.tombstone_count() >= self.config.index.compaction_threshold
    }

    fn maybe_compact(&mut self) {
        if self.config.index.auto_compact && self.needs_compaction() {
            self.compact();
        }
    }

    /// Purges every tombstoned record from every bitmap. Returns the number
    /// of records purged.
    pub fn compact(&mut self) -> usize {
        let pending = self.store.tombstone_count();
        if pending == 0 {
            return 0;
        }
        info!(tombstones = pending, "compaction started");

        let tombstones = self.store.drain_tombstones();
        self.positional.subtract(&tombstones);
        self.length.subtract(&tombstones);
        self.counters.compactions += 1;

        info!(
            purged = pending,
            compactions = self.counters.compactions,
            "compaction finished"
        );
        pending
    }

    /// Live records matching `pattern`, as record indices.
    #[must_use]
    pub fn match_records(&self, pattern: impl AsRef<[u8]>) -> Bitmap {
        let pattern = pattern.as_ref();
        let parsed = parse(pattern);
        let result =
            Executor::new(&self.positional, &self.length, self.store.tombstones()).execute(&parsed);
        debug!(
            pattern = %String::from_utf8_lossy(pattern),
            strategy = %strategy_for(&parsed),
            matches = result.len(),
            "query executed"
        );
        result
    }

    /// Identifiers of live records matching `pattern`, ordered by `compare`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvariantViolation`] if a matched record index does
    /// not name a live slot.
    pub fn match_pattern_by<F>(&self, pattern: impl AsRef<[u8]>, mut compare: F) -> Result<Vec<I>>
    where
        I: Clone,
        F: FnMut(&I, &I) -> Ordering,
    {
        let records = self.match_records(pattern);
        let mut identifiers: Vec<I> = self.store.resolve(&records)?.into_iter().cloned().collect();
        identifiers.sort_by(|a, b| compare(a, b));
        Ok(identifiers)
    }

    /// Identifiers of live records matching `pattern`, in ascending order.
    ///
    /// # Errors
    ///
    /// See [`match_pattern_by`](Self::match_pattern_by).
    pub fn match_pattern(&self, pattern: impl AsRef<[u8]>) -> Result<Vec<I>>
    where
        I: Ord + Clone,
    {
        self.match_pattern_by(pattern, I::cmp)
    }

    /// How `pattern` would be executed.
    #[must_use]
    pub fn explain(&self, pattern: impl AsRef<[u8]>) -> QueryPlan {
        QueryPlan::for_pattern(&parse(pattern.as_ref()))
    }

    /// Live records whose indexed value contains `byte`.
    #[must_use]
    pub fn records_containing(&self, byte: u8) -> Bitmap {
        let mut result = self
            .positional
            .presence(byte)
            .cloned()
            .unwrap_or_else(|| Bitmap::empty(self.positional.kind()));
        result.andnot_inplace(self.store.tombstones());
        result
    }

    /// Current counters and sizes.
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            active_records: self.store.active_records(),
            total_slots: self.store.total_slots(),
            free_slots: self.store.free_slots(),
            tombstones: self.store.tombstone_count(),
            max_length: self.length.max_len(),
            insert_count: self.counters.inserts,
            update_count: self.counters.updates,
            delete_count: self.counters.deletes,
            compaction_count: self.counters.compactions,
            position_entries: self.positional.entry_count(),
            length_slots: self.length.slots(),
            memory_bytes: self.positional.memory_bytes()
                + self.length.memory_bytes()
                + self.store.memory_bytes(),
            backend: self.positional.kind(),
        }
    }

    /// Drops every record and bitmap, keeping the configuration.
    pub fn clear(&mut self) {
        self.positional.clear();
        self.length.clear();
        self.store.clear();
        self.counters = Counters::default();
        info!("index cleared");
    }

    /// Replaces the index contents with the records of `source`.
    ///
    /// The source is scanned twice: once for the positional index and the
    /// maximum length, once for the length index. The current contents are
    /// only replaced if both passes succeed and agree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceChanged`] if the two passes disagree, or an
    /// allocation error. The index is unchanged on error.
    pub fn rebuild_from<S>(&mut self, source: &S) -> Result<()>
    where
        S: RecordSource<I> + ?Sized,
    {
        let kind = self.config.bitmap.backend;
        info!(backend = %kind, "index rebuild started");

        let mut store = RecordStore::new(kind);
        let mut positional = PositionalIndex::new(kind);
        let mut max_len = 0;
        let mut truncated = 0usize;

        for (identifier, value) in source.scan() {
            let indexed = self.indexed_prefix(value);
            if indexed.len() < value.len() {
                truncated += 1;
            }
            let acquired = store.acquire(identifier, Box::from(indexed))?;
            positional.add_value(acquired.record, indexed);
            max_len = max_len.max(indexed.len());
        }

        let mut length = if store.total_slots() == 0 {
            LengthIndex::new(kind)
        } else {
            LengthIndex::with_max_len(kind, max_len)
        };
        let mut seen = 0usize;
        for (record, (_, value)) in (0u32..).zip(source.scan()) {
            let indexed = self.indexed_prefix(value);
            if store.value(record) != Some(indexed) {
                return Err(Error::SourceChanged(format!("record {record} differs between passes")));
            }
            length.add(record, indexed.len());
            seen += 1;
        }
        if seen != store.total_slots() {
            return Err(Error::SourceChanged(format!(
                "first pass yielded {} records, second pass {seen}",
                store.total_slots()
            )));
        }

        if truncated > 0 {
            warn!(
                truncated,
                max = self.config.index.max_indexed_length,
                "values truncated to maximum indexed length"
            );
        }

        self.store = store;
        self.positional = positional;
        self.length = length;
        self.counters = Counters::default();
        info!(records = seen, max_length = max_len, "rebuild finished");
        Ok(())
    }
}
