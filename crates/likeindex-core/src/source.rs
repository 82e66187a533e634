//! Record sources for rebuilding an index.
//!
//! The host storage engine owns the records; the index only needs to scan
//! `(identifier, value)` pairs, possibly several times.

use serde::{Deserialize, Serialize};

/// Something that can be scanned for `(identifier, value)` pairs.
///
/// Every call to [`scan`](RecordSource::scan) must yield the same records in
/// the same order; a rebuild reads the source twice and fails with
/// [`Error::SourceChanged`](crate::Error::SourceChanged) otherwise.
pub trait RecordSource<I> {
    /// Iterates over all records.
    fn scan(&self) -> Box<dyn Iterator<Item = (I, &[u8])> + '_>;
}

impl<I, V> RecordSource<I> for [(I, V)]
where
    I: Clone,
    V: AsRef<[u8]>,
{
    fn scan(&self) -> Box<dyn Iterator<Item = (I, &[u8])> + '_> {
        Box::new(self.iter().map(|(id, value)| (id.clone(), value.as_ref())))
    }
}

impl<I, V> RecordSource<I> for Vec<(I, V)>
where
    I: Clone,
    V: AsRef<[u8]>,
{
    fn scan(&self) -> Box<dyn Iterator<Item = (I, &[u8])> + '_> {
        self.as_slice().scan()
    }
}

/// Physical location of a row in host storage: block number, then offset
/// within the block.
///
/// Ordering is by block, then offset, so sorting matched identifiers of this
/// type yields sequential access order for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowLocation {
    /// Block number.
    pub block: u32,
    /// Offset within the block.
    pub offset: u16,
}

impl RowLocation {
    /// Creates a row location.
    #[must_use]
    pub const fn new(block: u32, offset: u16) -> Self {
        Self { block, offset }
    }
}

impl std::fmt::Display for RowLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.block, self.offset)
    }
}
