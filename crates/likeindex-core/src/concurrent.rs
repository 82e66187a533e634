//! Thread-safe wrapper around [`LikeIndex`].
//!
//! Queries, `explain` and `stats` share a read lock and run in parallel with
//! each other. Inserts, deletes, compaction, rebuild and clear take the write
//! lock, so no query ever observes a half-applied mutation.

use std::cmp::Ordering;

use parking_lot::{RwLock, RwLockReadGuard, RwLockUpgradableReadGuard, RwLockWriteGuard};

use crate::bitmap::Bitmap;
use crate::config::LikeIndexConfig;
use crate::engine::{IndexStats, LikeIndex};
use crate::error::Result;
use crate::query::QueryPlan;
use crate::source::RecordSource;

/// Thread-safe wrapper for [`LikeIndex`].
#[derive(Debug)]
pub struct ConcurrentLikeIndex<I> {
    inner: RwLock<LikeIndex<I>>,
}

impl<I> Default for ConcurrentLikeIndex<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> From<LikeIndex<I>> for ConcurrentLikeIndex<I> {
    fn from(index: LikeIndex<I>) -> Self {
        Self {
            inner: RwLock::new(index),
        }
    }
}

impl<I> ConcurrentLikeIndex<I> {
    /// Creates an empty index with default configuration.
    #[must_use]
    pub fn new() -> Self {
        LikeIndex::new().into()
    }

    /// Creates an empty index with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn with_config(config: LikeIndexConfig) -> Result<Self> {
        LikeIndex::with_config(config).map(Into::into)
    }

    /// Insert a record (write lock).
    ///
    /// # Errors
    ///
    /// See [`LikeIndex::insert`].
    pub fn insert(&self, identifier: I, value: impl AsRef<[u8]>) -> Result<u32> {
        self.inner.write().insert(identifier, value)
    }

    /// Delete matching records (write lock). May compact.
    pub fn delete_where<F>(&self, predicate: F) -> usize
    where
        F: FnMut(&I) -> bool,
    {
        self.inner.write().delete_where(predicate)
    }

    /// Replace matching records with one new record (write lock).
    ///
    /// # Errors
    ///
    /// See [`LikeIndex::replace_where`].
    pub fn replace_where<F>(
        &self,
        predicate: F,
        identifier: I,
        value: impl AsRef<[u8]>,
    ) -> Result<u32>
    where
        F: FnMut(&I) -> bool,
    {
        self.inner
            .write()
            .replace_where(predicate, identifier, value)
    }

    /// Compact unconditionally (write lock).
    pub fn compact(&self) -> usize {
        self.inner.write().compact()
    }

    /// Compact only if the threshold has been reached.
    ///
    /// Checks under a read lock and upgrades only when there is work, so it
    /// can be polled from a background thread without stalling queries.
    pub fn compact_if_needed(&self) -> usize {
        let guard = self.inner.upgradable_read();
        if !guard.needs_compaction() {
            return 0;
        }
        RwLockUpgradableReadGuard::upgrade(guard).compact()
    }

    /// Live record indices matching `pattern` (read lock).
    #[must_use]
    pub fn match_records(&self, pattern: impl AsRef<[u8]>) -> Bitmap {
        self.inner.read().match_records(pattern)
    }

    /// Matching identifiers in ascending order (read lock).
    ///
    /// # Errors
    ///
    /// See [`LikeIndex::match_pattern`].
    pub fn match_pattern(&self, pattern: impl AsRef<[u8]>) -> Result<Vec<I>>
    where
        I: Ord + Clone,
    {
        self.inner.read().match_pattern(pattern)
    }

    /// Matching identifiers ordered by `compare` (read lock).
    ///
    /// # Errors
    ///
    /// See [`LikeIndex::match_pattern_by`].
    pub fn match_pattern_by<F>(&self, pattern: impl AsRef<[u8]>, compare: F) -> Result<Vec<I>>
    where
        I: Clone,
        F: FnMut(&I, &I) -> Ordering,
    {
        self.inner.read().match_pattern_by(pattern, compare)
    }

    /// Strategy for `pattern` (read lock).
    #[must_use]
    pub fn explain(&self, pattern: impl AsRef<[u8]>) -> QueryPlan {
        self.inner.read().explain(pattern)
    }

    /// Counters and sizes (read lock).
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        self.inner.read().stats()
    }

    /// Live record count (read lock).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns true if no record is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace contents from `source` (write lock held for the whole rebuild).
    ///
    /// # Errors
    ///
    /// See [`LikeIndex::rebuild_from`].
    pub fn rebuild_from<S>(&self, source: &S) -> Result<()>
    where
        S: RecordSource<I> + ?Sized,
    {
        self.inner.write().rebuild_from(source)
    }

    /// Drop every record (write lock).
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Holds the read lock for several queries in a row.
    pub fn read(&self) -> RwLockReadGuard<'_, LikeIndex<I>> {
        self.inner.read()
    }

    /// Holds the write lock for a batch of mutations.
    pub fn write(&self) -> RwLockWriteGuard<'_, LikeIndex<I>> {
        self.inner.write()
    }

    /// Unwraps the index.
    #[must_use]
    pub fn into_inner(self) -> LikeIndex<I> {
        self.inner.into_inner()
    }
}
