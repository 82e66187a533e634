//! Uncompressed word bitset.
//!
//! Bit `v` lives in word `v >> 6`. The word vector only grows on insert and
//! union; intersections shrink it to the shorter operand.

/// A plain bitset over `u32` record indices.
#[derive(Debug, Clone, Default)]
pub struct DenseBitmap {
    words: Vec<u64>,
}

impl DenseBitmap {
    /// Creates an empty bitset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn split(value: u32) -> (usize, u64) {
        ((value >> 6) as usize, 1u64 << (value & 63))
    }

    /// Adds a value. Returns true if it was not present.
    pub fn insert(&mut self, value: u32) -> bool {
        let (word, mask) = Self::split(value);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let was_set = self.words[word] & mask != 0;
        self.words[word] |= mask;
        !was_set
    }

    /// Removes a value. Returns true if it was present.
    pub fn remove(&mut self, value: u32) -> bool {
        let (word, mask) = Self::split(value);
        match self.words.get_mut(word) {
            Some(w) if *w & mask != 0 => {
                *w &= !mask;
                true
            }
            _ => false,
        }
    }

    /// Membership test.
    #[must_use]
    pub fn contains(&self, value: u32) -> bool {
        let (word, mask) = Self::split(value);
        self.words.get(word).is_some_and(|w| w & mask != 0)
    }

    /// Number of set bits.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.words.iter().map(|w| u64::from(w.count_ones())).sum()
    }

    /// Returns true if no bit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Clears every bit and releases the words.
    pub fn clear(&mut self) {
        self.words.clear();
    }

    /// `self &= other`.
    pub fn and_inplace(&mut self, other: &Self) {
        self.words.truncate(other.words.len());
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= b;
        }
    }

    /// `self |= other`.
    pub fn or_inplace(&mut self, other: &Self) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= b;
        }
    }

    /// `self &= !other`.
    pub fn andnot_inplace(&mut self, other: &Self) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= !b;
        }
    }

    /// Ascending iterator over set bits.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            words: &self.words,
            index: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }

    /// Heap footprint in bytes.
    #[must_use]
    pub fn memory_bytes(&self) -> usize {
        self.words.capacity() * std::mem::size_of::<u64>()
    }
}

impl PartialEq for DenseBitmap {
    fn eq(&self, other: &Self) -> bool {
        let (short, long) = if self.words.len() <= other.words.len() {
            (&self.words, &other.words)
        } else {
            (&other.words, &self.words)
        };
        short.iter().zip(long.iter()).all(|(a, b)| a == b)
            && long[short.len()..].iter().all(|&w| w == 0)
    }
}

impl Eq for DenseBitmap {}

/// Ascending iterator over a [`DenseBitmap`].
pub struct Iter<'a> {
    words: &'a [u64],
    index: usize,
    current: u64,
}

impl Iterator for Iter<'_> {
    type Item = u32;

    #[allow(clippy::cast_possible_truncation)] // word index < 2^26 for u32 values
    fn next(&mut self) -> Option<u32> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros();
                self.current &= self.current - 1;
                return Some(((self.index as u32) << 6) | bit);
            }
            self.index += 1;
            self.current = *self.words.get(self.index)?;
        }
    }
}
