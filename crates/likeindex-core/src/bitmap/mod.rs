//! Ordered sets of record indices.
//!
//! Every index slot (a `(byte, position)` entry, a length slot, the tombstone
//! set) owns one [`Bitmap`]. Two interchangeable representations exist:
//!
//! | Backend  | Representation          | Best for                        |
//! |----------|-------------------------|---------------------------------|
//! | Roaring  | `RoaringBitmap`         | sparse and run-heavy sets       |
//! | Dense    | `Vec<u64>` word bitset  | small, dense record ranges      |
//!
//! The backend is chosen once, when the index is constructed, through
//! [`BitmapKind`]. Callers never match on the variant: every operation is
//! available on [`Bitmap`] itself. Binary operations between two different
//! backends are no-ops on the receiver.

mod dense;

pub use dense::DenseBitmap;

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};

/// Selects the bitmap representation used by an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitmapKind {
    /// Compressed roaring containers (default).
    #[default]
    Roaring,
    /// Uncompressed 64-bit word bitset.
    Dense,
}

impl std::fmt::Display for BitmapKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Roaring => write!(f, "roaring"),
            Self::Dense => write!(f, "dense"),
        }
    }
}

/// A set of record indices.
#[derive(Debug, Clone)]
pub enum Bitmap {
    /// Roaring-backed set.
    Roaring(RoaringBitmap),
    /// Word-bitset-backed set.
    Dense(DenseBitmap),
}

impl Default for Bitmap {
    fn default() -> Self {
        Self::empty(BitmapKind::default())
    }
}

impl Bitmap {
    /// Creates an empty set of the given kind.
    #[must_use]
    pub fn empty(kind: BitmapKind) -> Self {
        match kind {
            BitmapKind::Roaring => Self::Roaring(RoaringBitmap::new()),
            BitmapKind::Dense => Self::Dense(DenseBitmap::new()),
        }
    }

    /// Builds a set from record indices (any order, duplicates allowed).
    #[must_use]
    pub fn from_iter_in<I: IntoIterator<Item = u32>>(kind: BitmapKind, values: I) -> Self {
        let mut bitmap = Self::empty(kind);
        for value in values {
            bitmap.insert(value);
        }
        bitmap
    }

    /// Returns the backend of this set.
    #[must_use]
    pub fn kind(&self) -> BitmapKind {
        match self {
            Self::Roaring(_) => BitmapKind::Roaring,
            Self::Dense(_) => BitmapKind::Dense,
        }
    }

    /// Adds a record index. Returns true if it was not present.
    pub fn insert(&mut self, value: u32) -> bool {
        match self {
            Self::Roaring(rb) => rb.insert(value),
            Self::Dense(db) => db.insert(value),
        }
    }

    /// Removes a record index. Returns true if it was present.
    pub fn remove(&mut self, value: u32) -> bool {
        match self {
            Self::Roaring(rb) => rb.remove(value),
            Self::Dense(db) => db.remove(value),
        }
    }

    /// Membership test.
    #[must_use]
    pub fn contains(&self, value: u32) -> bool {
        match self {
            Self::Roaring(rb) => rb.contains(value),
            Self::Dense(db) => db.contains(value),
        }
    }

    /// Cardinality.
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Self::Roaring(rb) => rb.len(),
            Self::Dense(db) => db.len(),
        }
    }

    /// Returns true if the set holds no record index.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Roaring(rb) => rb.is_empty(),
            Self::Dense(db) => db.is_empty(),
        }
    }

    /// Removes every element, keeping the backend.
    pub fn clear(&mut self) {
        match self {
            Self::Roaring(rb) => rb.clear(),
            Self::Dense(db) => db.clear(),
        }
    }

    /// In-place intersection: `self = self ∩ other`.
    pub fn and_inplace(&mut self, other: &Self) {
        match (self, other) {
            (Self::Roaring(a), Self::Roaring(b)) => *a &= b,
            (Self::Dense(a), Self::Dense(b)) => a.and_inplace(b),
            _ => {}
        }
    }

    /// In-place union: `self = self ∪ other`.
    pub fn or_inplace(&mut self, other: &Self) {
        match (self, other) {
            (Self::Roaring(a), Self::Roaring(b)) => *a |= b,
            (Self::Dense(a), Self::Dense(b)) => a.or_inplace(b),
            _ => {}
        }
    }

    /// In-place difference: `self = self \ other`.
    pub fn andnot_inplace(&mut self, other: &Self) {
        match (self, other) {
            (Self::Roaring(a), Self::Roaring(b)) => *a -= b,
            (Self::Dense(a), Self::Dense(b)) => a.andnot_inplace(b),
            _ => {}
        }
    }

    /// Iterates record indices in ascending order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        match self {
            Self::Roaring(rb) => Iter::Roaring(rb.iter()),
            Self::Dense(db) => Iter::Dense(db.iter()),
        }
    }

    /// Exports the set as an ascending vector.
    #[must_use]
    pub fn to_sorted_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }

    /// Rough heap footprint of the set in bytes.
    #[must_use]
    pub fn memory_bytes(&self) -> usize {
        match self {
            Self::Roaring(rb) => rb.serialized_size(),
            Self::Dense(db) => db.memory_bytes(),
        }
    }
}

impl PartialEq for Bitmap {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Roaring(a), Self::Roaring(b)) => a == b,
            (Self::Dense(a), Self::Dense(b)) => a == b,
            _ => self.len() == other.len() && self.iter().eq(other.iter()),
        }
    }
}

impl Eq for Bitmap {}

impl<'a> IntoIterator for &'a Bitmap {
    type Item = u32;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over a [`Bitmap`].
pub enum Iter<'a> {
    /// Roaring iterator.
    Roaring(roaring::bitmap::Iter<'a>),
    /// Dense iterator.
    Dense(dense::Iter<'a>),
}

impl Iterator for Iter<'_> {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        match self {
            Self::Roaring(it) => it.next(),
            Self::Dense(it) => it.next(),
        }
    }
}
