//! Positional character index.
//!
//! For every byte value two sorted position lists are kept:
//!
//! - **forward**: key `p >= 0`, "byte occurs at offset `p` from the start"
//! - **negative**: key `-k < 0`, "byte occurs at offset `k` from the end",
//!   i.e. at `len - k`
//!
//! plus one presence bitmap per byte ("byte occurs anywhere").
//!
//! Position lists are plain sorted vectors searched with `binary_search`.
//! Inserting a new position shifts the tail, which costs O(k) for k distinct
//! positions of that byte; k is bounded by the maximum indexed length.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::bitmap::{Bitmap, BitmapKind};

/// Number of distinct byte values.
pub const ALPHABET_SIZE: usize = 256;

/// Sorted `(position, bitmap)` entries for one byte in one direction.
#[derive(Debug, Clone, Default)]
pub struct PositionList {
    entries: Vec<(i32, Bitmap)>,
}

impl PositionList {
    #[inline]
    fn search(&self, pos: i32) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&pos, |(p, _)| *p)
    }

    /// Returns the bitmap stored at `pos`, or `None` if the position was never indexed.
    #[must_use]
    pub fn get(&self, pos: i32) -> Option<&Bitmap> {
        self.search(pos).ok().map(|i| &self.entries[i].1)
    }

    /// Stores `bitmap` at `pos`, overwriting an existing entry.
    pub fn set(&mut self, pos: i32, bitmap: Bitmap) {
        match self.search(pos) {
            Ok(i) => self.entries[i].1 = bitmap,
            Err(i) => self.entries.insert(i, (pos, bitmap)),
        }
    }

    /// Returns the bitmap at `pos`, creating an empty one first if absent.
    pub fn get_or_insert(&mut self, pos: i32, kind: BitmapKind) -> &mut Bitmap {
        let i = match self.search(pos) {
            Ok(i) => i,
            Err(i) => {
                self.entries.insert(i, (pos, Bitmap::empty(kind)));
                i
            }
        };
        &mut self.entries[i].1
    }

    fn remove_record(&mut self, pos: i32, record: u32) {
        if let Ok(i) = self.search(pos) {
            self.entries[i].1.remove(record);
        }
    }

    fn subtract(&mut self, tombstones: &Bitmap) {
        for (_, bitmap) in &mut self.entries {
            bitmap.andnot_inplace(tombstones);
        }
    }

    /// Number of indexed positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no position is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indexed positions in ascending order.
    pub fn positions(&self) -> impl Iterator<Item = i32> + '_ {
        self.entries.iter().map(|(p, _)| *p)
    }

    fn memory_bytes(&self) -> usize {
        self.entries
            .iter()
            .map(|(_, b)| std::mem::size_of::<i32>() + b.memory_bytes())
            .sum()
    }
}

/// Per-byte forward, negative and presence bitmaps.
#[derive(Debug, Clone)]
pub struct PositionalIndex {
    kind: BitmapKind,
    forward: Vec<PositionList>,
    negative: Vec<PositionList>,
    presence: Vec<Option<Bitmap>>,
}

/// Converts a byte offset to a position key. Offsets are bounded by the
/// configured maximum indexed length, which validation keeps below `u16::MAX`.
#[inline]
#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
fn key(offset: usize) -> i32 {
    offset as i32
}

impl PositionalIndex {
    /// Creates an empty index whose bitmaps use `kind`.
    #[must_use]
    pub fn new(kind: BitmapKind) -> Self {
        Self {
            kind,
            forward: vec![PositionList::default(); ALPHABET_SIZE],
            negative: vec![PositionList::default(); ALPHABET_SIZE],
            presence: vec![None; ALPHABET_SIZE],
        }
    }

    /// Bitmap backend used for new entries.
    #[must_use]
    pub fn kind(&self) -> BitmapKind {
        self.kind
    }

    /// Records having `byte` at offset `pos` from the start.
    #[must_use]
    pub fn get_forward(&self, byte: u8, pos: usize) -> Option<&Bitmap> {
        self.forward[usize::from(byte)].get(key(pos))
    }

    /// Records having `byte` at negative offset `neg_pos` (`-1` is the last byte).
    #[must_use]
    pub fn get_negative(&self, byte: u8, neg_pos: i32) -> Option<&Bitmap> {
        self.negative[usize::from(byte)].get(neg_pos)
    }

    /// Stores a forward bitmap, overwriting any existing entry.
    pub fn set_forward(&mut self, byte: u8, pos: usize, bitmap: Bitmap) {
        self.forward[usize::from(byte)].set(key(pos), bitmap);
    }

    /// Stores a negative bitmap, overwriting any existing entry.
    pub fn set_negative(&mut self, byte: u8, neg_pos: i32, bitmap: Bitmap) {
        self.negative[usize::from(byte)].set(neg_pos, bitmap);
    }

    /// Records containing `byte` anywhere.
    #[must_use]
    pub fn presence(&self, byte: u8) -> Option<&Bitmap> {
        self.presence[usize::from(byte)].as_ref()
    }

    /// Forward position list of `byte`.
    #[must_use]
    pub fn forward_list(&self, byte: u8) -> &PositionList {
        &self.forward[usize::from(byte)]
    }

    /// Negative position list of `byte`.
    #[must_use]
    pub fn negative_list(&self, byte: u8) -> &PositionList {
        &self.negative[usize::from(byte)]
    }

    /// Union of the forward bitmaps of every byte at `pos`: all records
    /// longer than `pos`.
    #[must_use]
    pub fn any_at(&self, pos: usize) -> Bitmap {
        let mut result = Bitmap::empty(self.kind);
        for list in &self.forward {
            if let Some(bitmap) = list.get(key(pos)) {
                result.or_inplace(bitmap);
            }
        }
        result
    }

    /// Indexes `value` under `record`.
    pub fn add_value(&mut self, record: u32, value: &[u8]) {
        let kind = self.kind;
        let len = value.len();
        for (pos, &byte) in value.iter().enumerate() {
            let ch = usize::from(byte);
            self.forward[ch]
                .get_or_insert(key(pos), kind)
                .insert(record);
            self.negative[ch]
                .get_or_insert(-key(len - pos), kind)
                .insert(record);
            self.presence[ch]
                .get_or_insert_with(|| Bitmap::empty(kind))
                .insert(record);
        }
    }

    /// Removes `record` from exactly the bitmaps `value` was indexed under.
    pub fn remove_value(&mut self, record: u32, value: &[u8]) {
        let len = value.len();
        for (pos, &byte) in value.iter().enumerate() {
            let ch = usize::from(byte);
            self.forward[ch].remove_record(key(pos), record);
            self.negative[ch].remove_record(-key(len - pos), record);
            if let Some(bitmap) = self.presence[ch].as_mut() {
                bitmap.remove(record);
            }
        }
    }

    /// Removes every tombstoned record from every bitmap.
    pub fn subtract(&mut self, tombstones: &Bitmap) {
        #[cfg(feature = "parallel")]
        {
            self.forward
                .par_iter_mut()
                .chain(self.negative.par_iter_mut())
                .for_each(|list| list.subtract(tombstones));
            self.presence
                .par_iter_mut()
                .flatten()
                .for_each(|bitmap| bitmap.andnot_inplace(tombstones));
        }
        #[cfg(not(feature = "parallel"))]
        {
            for list in self.forward.iter_mut().chain(self.negative.iter_mut()) {
                list.subtract(tombstones);
            }
            for bitmap in self.presence.iter_mut().flatten() {
                bitmap.andnot_inplace(tombstones);
            }
        }
    }

    /// Total `(byte, position)` entries across both directions.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.forward
            .iter()
            .chain(&self.negative)
            .map(PositionList::len)
            .sum()
    }

    /// Rough heap footprint in bytes.
    #[must_use]
    pub fn memory_bytes(&self) -> usize {
        let lists: usize = self
            .forward
            .iter()
            .chain(&self.negative)
            .map(PositionList::memory_bytes)
            .sum();
        let presence: usize = self
            .presence
            .iter()
            .flatten()
            .map(Bitmap::memory_bytes)
            .sum();
        lists + presence
    }

    /// Drops every entry, keeping the backend.
    pub fn clear(&mut self) {
        *self = Self::new(self.kind);
    }
}
