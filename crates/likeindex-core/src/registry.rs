//! Explicit registry of built indexes.
//!
//! Hosts that manage several indexes (one per table column, say) build them
//! through an [`IndexRegistry`] and keep the returned [`IndexHandle`]. There
//! is no implicit cache: the caller decides when an index is rebuilt or
//! dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::concurrent::ConcurrentLikeIndex;
use crate::config::LikeIndexConfig;
use crate::engine::LikeIndex;
use crate::error::{Error, Result};
use crate::source::RecordSource;

/// Opaque handle to an index in an [`IndexRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexHandle(u64);

impl IndexHandle {
    /// Raw handle value.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for IndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "index#{}", self.0)
    }
}

/// Owns indexes and hands out handles to them.
#[derive(Debug)]
pub struct IndexRegistry<I> {
    config: LikeIndexConfig,
    indexes: RwLock<FxHashMap<IndexHandle, Arc<ConcurrentLikeIndex<I>>>>,
    next_handle: AtomicU64,
}

impl<I> Default for IndexRegistry<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> IndexRegistry<I> {
    /// Creates an empty registry whose indexes use the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: LikeIndexConfig::default(),
            indexes: RwLock::new(FxHashMap::default()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Creates an empty registry whose indexes use `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn with_config(config: LikeIndexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Configuration applied to indexes built by this registry.
    #[must_use]
    pub fn config(&self) -> &LikeIndexConfig {
        &self.config
    }

    /// Builds a new index from `source` and registers it.
    ///
    /// # Errors
    ///
    /// Returns an error if the rebuild fails; nothing is registered then.
    pub fn build<S>(&self, source: &S) -> Result<IndexHandle>
    where
        S: RecordSource<I> + ?Sized,
    {
        let mut index = LikeIndex::with_config(self.config.clone())?;
        index.rebuild_from(source)?;
        Ok(self.insert_index(index))
    }

    /// Registers an existing index.
    pub fn insert_index(&self, index: LikeIndex<I>) -> IndexHandle {
        let handle = IndexHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let records = index.len();
        self.indexes
            .write()
            .insert(handle, Arc::new(ConcurrentLikeIndex::from(index)));
        tracing::debug!(%handle, records, "index registered");
        handle
    }

    /// Shared access to a registered index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandleNotFound`] if `handle` is unknown or removed.
    pub fn load(&self, handle: IndexHandle) -> Result<Arc<ConcurrentLikeIndex<I>>> {
        self.indexes
            .read()
            .get(&handle)
            .cloned()
            .ok_or(Error::HandleNotFound(handle.0))
    }

    /// Rebuilds a registered index in place from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandleNotFound`] or any rebuild error.
    pub fn rebuild<S>(&self, handle: IndexHandle, source: &S) -> Result<()>
    where
        S: RecordSource<I> + ?Sized,
    {
        self.load(handle)?.rebuild_from(source)
    }

    /// Unregisters an index. Outstanding `Arc`s stay usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandleNotFound`] if `handle` is unknown or removed.
    pub fn remove(&self, handle: IndexHandle) -> Result<Arc<ConcurrentLikeIndex<I>>> {
        let removed = self
            .indexes
            .write()
            .remove(&handle)
            .ok_or(Error::HandleNotFound(handle.0))?;
        tracing::debug!(%handle, "index removed");
        Ok(removed)
    }

    /// Registered handles in ascending order.
    #[must_use]
    pub fn handles(&self) -> Vec<IndexHandle> {
        let mut handles: Vec<IndexHandle> = self.indexes.read().keys().copied().collect();
        handles.sort_unstable();
        handles
    }

    /// Number of registered indexes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indexes.read().len()
    }

    /// Returns true if no index is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
