//! Record store: slot array, tombstone set and free list.
//!
//! A record index is a position in the slot array and never changes while
//! the record is alive. Deleting a record only marks it: its index joins the
//! tombstone set and the free list, and its bitmaps are left untouched until
//! compaction or slot reuse scrubs them.
//!
//! Slot lifecycle:
//!
//! ```text
//! Live --delete--> Tombstoned --compact--> Vacant
//!  ^                   |                     |
//!  +------reuse--------+---------reuse-------+
//! ```

use crate::bitmap::{Bitmap, BitmapKind};
use crate::error::{Error, Result};

/// Observable state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Indexed and visible to queries.
    Live,
    /// Deleted, still present in index bitmaps.
    Tombstoned,
    /// Deleted and purged from every bitmap.
    Vacant,
}

#[derive(Debug, Clone)]
struct Slot<I> {
    identifier: I,
    /// Cached indexed value; `None` once compacted.
    value: Option<Box<[u8]>>,
}

/// Outcome of [`RecordStore::acquire`].
#[derive(Debug)]
pub struct Acquired {
    /// Record index assigned to the new value.
    pub record: u32,
    /// Value previously cached in a reused slot that was never compacted.
    /// Its bitmap entries must be scrubbed before the new value is indexed.
    pub stale: Option<Box<[u8]>>,
    /// True if the slot came from the free list.
    pub reused: bool,
}

/// Slot storage with tombstone and free-slot bookkeeping.
#[derive(Debug, Clone)]
pub struct RecordStore<I> {
    slots: Vec<Slot<I>>,
    tombstones: Bitmap,
    tombstone_count: usize,
    free_list: Vec<u32>,
}

impl<I> RecordStore<I> {
    /// Creates an empty store.
    #[must_use]
    pub fn new(kind: BitmapKind) -> Self {
        Self {
            slots: Vec::new(),
            tombstones: Bitmap::empty(kind),
            tombstone_count: 0,
            free_list: Vec::new(),
        }
    }

    /// Total slots ever allocated.
    #[must_use]
    pub fn total_slots(&self) -> usize {
        self.slots.len()
    }

    /// Slots waiting on the free list.
    #[must_use]
    pub fn free_slots(&self) -> usize {
        self.free_list.len()
    }

    /// Live records.
    #[must_use]
    pub fn active_records(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    /// Records deleted since the last compaction.
    #[must_use]
    pub fn tombstone_count(&self) -> usize {
        self.tombstone_count
    }

    /// Records deleted since the last compaction, as a set.
    #[must_use]
    pub fn tombstones(&self) -> &Bitmap {
        &self.tombstones
    }

    /// State of `record`, or `None` if the slot does not exist.
    #[must_use]
    pub fn state(&self, record: u32) -> Option<SlotState> {
        let slot = self.slots.get(record as usize)?;
        Some(if slot.value.is_none() {
            SlotState::Vacant
        } else if self.tombstones.contains(record) {
            SlotState::Tombstoned
        } else {
            SlotState::Live
        })
    }

    /// Identifier stored in `record`'s slot (possibly stale if not live).
    #[must_use]
    pub fn identifier(&self, record: u32) -> Option<&I> {
        self.slots.get(record as usize).map(|s| &s.identifier)
    }

    /// Cached indexed value of `record`, `None` once compacted.
    #[must_use]
    pub fn value(&self, record: u32) -> Option<&[u8]> {
        self.slots.get(record as usize)?.value.as_deref()
    }

    /// Live records with their identifiers, in record-index order.
    pub fn live(&self) -> impl Iterator<Item = (u32, &I)> + '_ {
        self.slots
            .iter()
            .zip(0u32..)
            .filter(|(slot, record)| slot.value.is_some() && !self.tombstones.contains(*record))
            .map(|(slot, record)| (record, &slot.identifier))
    }

    /// Assigns a slot to a new record, preferring the free list.
    ///
    /// Nothing is modified when an error is returned.
    pub fn acquire(&mut self, identifier: I, value: Box<[u8]>) -> Result<Acquired> {
        if let Some(&record) = self.free_list.last() {
            if record as usize >= self.slots.len() {
                return Err(Error::InvariantViolation(format!(
                    "free slot {record} beyond store ({} slots)",
                    self.slots.len()
                )));
            }
            self.free_list.pop();
            if self.tombstones.remove(record) {
                self.tombstone_count -= 1;
            }
            let slot = &mut self.slots[record as usize];
            let stale = slot.value.replace(value);
            slot.identifier = identifier;
            return Ok(Acquired {
                record,
                stale,
                reused: true,
            });
        }

        let record = u32::try_from(self.slots.len())
            .map_err(|_| Error::CapacityExceeded(self.slots.len()))?;
        self.slots.try_reserve(1)?;
        self.slots.push(Slot {
            identifier,
            value: Some(value),
        });
        Ok(Acquired {
            record,
            stale: None,
            reused: false,
        })
    }

    /// Marks a live record deleted. Returns false if it was not live.
    pub fn tombstone(&mut self, record: u32) -> bool {
        if self.state(record) != Some(SlotState::Live) {
            return false;
        }
        self.tombstones.insert(record);
        self.tombstone_count += 1;
        self.free_list.push(record);
        true
    }

    /// Ends the current tombstone epoch: drops cached values of tombstoned
    /// slots and hands the tombstone set to the caller for purging.
    pub fn drain_tombstones(&mut self) -> Bitmap {
        let kind = self.tombstones.kind();
        let drained = std::mem::replace(&mut self.tombstones, Bitmap::empty(kind));
        for record in &drained {
            if let Some(slot) = self.slots.get_mut(record as usize) {
                slot.value = None;
            }
        }
        self.tombstone_count = 0;
        drained
    }

    /// Resolves a result set to identifiers.
    ///
    /// Every record must name a live slot; anything else means the bitmaps and
    /// the store disagree.
    pub fn resolve(&self, records: &Bitmap) -> Result<Vec<&I>> {
        let mut out = Vec::with_capacity(usize::try_from(records.len()).unwrap_or(0));
        for record in records {
            match self.state(record) {
                Some(SlotState::Live) => out.push(&self.slots[record as usize].identifier),
                Some(state) => {
                    return Err(Error::InvariantViolation(format!(
                        "record {record} in result set is {state:?}"
                    )))
                }
                None => {
                    return Err(Error::InvariantViolation(format!(
                        "record {record} out of range ({} slots)",
                        self.slots.len()
                    )))
                }
            }
        }
        Ok(out)
    }

    /// Rough heap footprint of cached values and bookkeeping in bytes.
    #[must_use]
    pub fn memory_bytes(&self) -> usize {
        let values: usize = self
            .slots
            .iter()
            .filter_map(|s| s.value.as_ref().map(|v| v.len()))
            .sum();
        values
            + self.slots.capacity() * std::mem::size_of::<Slot<I>>()
            + self.free_list.capacity() * std::mem::size_of::<u32>()
            + self.tombstones.memory_bytes()
    }

    /// Drops every slot and all bookkeeping.
    pub fn clear(&mut self) {
        self.slots = Vec::new();
        self.free_list = Vec::new();
        self.tombstones.clear();
        self.tombstone_count = 0;
    }
}
