//! Length index.
//!
//! `exact[L]` holds the records whose indexed length is exactly `L` and
//! `at_least[L]` the records whose length is `>= L`. Both arrays cover
//! `0..=max_len` and grow when a longer value is indexed. `at_least[0]` is
//! the set of every indexed record.

use crate::bitmap::{Bitmap, BitmapKind};

/// Per-length and cumulative-length bitmaps.
#[derive(Debug, Clone)]
pub struct LengthIndex {
    kind: BitmapKind,
    exact: Vec<Option<Bitmap>>,
    at_least: Vec<Bitmap>,
}

impl LengthIndex {
    /// Creates an empty length index.
    #[must_use]
    pub fn new(kind: BitmapKind) -> Self {
        Self {
            kind,
            exact: Vec::new(),
            at_least: Vec::new(),
        }
    }

    /// Creates a length index pre-sized for lengths `0..=max_len`.
    #[must_use]
    pub fn with_max_len(kind: BitmapKind, max_len: usize) -> Self {
        let mut index = Self::new(kind);
        index.grow(max_len);
        index
    }

    /// Number of length slots (`max_len + 1`, or 0 when nothing was indexed).
    #[must_use]
    pub fn slots(&self) -> usize {
        self.exact.len()
    }

    /// Longest indexed length seen so far.
    #[must_use]
    pub fn max_len(&self) -> usize {
        self.exact.len().saturating_sub(1)
    }

    /// Copy of the records with length `>= min_len`, or an empty set when
    /// `min_len` is beyond every indexed length.
    #[must_use]
    pub fn length_ge(&self, min_len: usize) -> Bitmap {
        self.at_least(min_len)
            .cloned()
            .unwrap_or_else(|| Bitmap::empty(self.kind))
    }

    /// Borrowed view of `at_least[min_len]`.
    #[must_use]
    pub fn at_least(&self, min_len: usize) -> Option<&Bitmap> {
        self.at_least.get(min_len)
    }

    /// Records whose length is exactly `len`, if that slot was ever populated.
    #[must_use]
    pub fn length_eq(&self, len: usize) -> Option<&Bitmap> {
        self.exact.get(len).and_then(Option::as_ref)
    }

    /// Every indexed record.
    #[must_use]
    pub fn all(&self) -> Bitmap {
        self.length_ge(0)
    }

    /// Extends both arrays so that `len` has a slot.
    ///
    /// New cumulative slots start empty: no record indexed so far can be
    /// longer than the previous maximum, so there is nothing to backfill.
    pub fn grow(&mut self, len: usize) {
        if len < self.exact.len() {
            return;
        }
        tracing::trace!(from = self.exact.len(), to = len + 1, "length slots grow");
        let kind = self.kind;
        self.exact.resize_with(len + 1, || None);
        self.at_least.resize_with(len + 1, || Bitmap::empty(kind));
    }

    /// Indexes `record` with length `len`, growing the arrays if needed.
    pub fn add(&mut self, record: u32, len: usize) {
        self.grow(len);
        let kind = self.kind;
        self.exact[len]
            .get_or_insert_with(|| Bitmap::empty(kind))
            .insert(record);
        for bitmap in &mut self.at_least[..=len] {
            bitmap.insert(record);
        }
    }

    /// Removes `record`, previously added with length `len`.
    pub fn remove(&mut self, record: u32, len: usize) {
        if let Some(Some(bitmap)) = self.exact.get_mut(len) {
            bitmap.remove(record);
        }
        let upto = len.min(self.at_least.len().saturating_sub(1));
        if !self.at_least.is_empty() {
            for bitmap in &mut self.at_least[..=upto] {
                bitmap.remove(record);
            }
        }
    }

    /// Removes every tombstoned record from every length bitmap.
    pub fn subtract(&mut self, tombstones: &Bitmap) {
        for bitmap in self.exact.iter_mut().flatten() {
            bitmap.andnot_inplace(tombstones);
        }
        for bitmap in &mut self.at_least {
            bitmap.andnot_inplace(tombstones);
        }
    }

    /// Rough heap footprint in bytes.
    #[must_use]
    pub fn memory_bytes(&self) -> usize {
        self.exact
            .iter()
            .flatten()
            .chain(&self.at_least)
            .map(Bitmap::memory_bytes)
            .sum()
    }

    /// Drops every slot.
    pub fn clear(&mut self) {
        self.exact.clear();
        self.at_least.clear();
    }
}
