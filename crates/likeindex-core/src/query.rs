//! Query planning and execution.
//!
//! A parsed pattern is turned into bitmap set operations over the positional
//! and length indexes. The strategy depends only on the pattern's shape:
//!
//! | Shape                         | Strategy     |
//! |-------------------------------|--------------|
//! | empty pattern                 | `EmptyString`|
//! | only `%`                      | `MatchAll`   |
//! | `abc`                         | `Exact`      |
//! | `abc%`                        | `Prefix`     |
//! | `%abc`                        | `Suffix`     |
//! | `%abc%`                       | `Substring`  |
//! | two or more parts             | `Windowed`   |
//!
//! Every strategy yields the matching records before tombstone filtering;
//! [`Executor::execute`] subtracts the tombstone set last.

use serde::Serialize;

use crate::bitmap::Bitmap;
use crate::length::LengthIndex;
use crate::pattern::{ParsedPattern, PatternPart};
use crate::positional::PositionalIndex;

/// Matching strategy chosen for a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Pattern is empty: zero-length values only.
    EmptyString,
    /// Pattern is only `%`: every live record.
    MatchAll,
    /// Single part, no `%`.
    Exact,
    /// Single part followed by `%`.
    Prefix,
    /// Single part preceded by `%`.
    Suffix,
    /// Single part wrapped in `%`.
    Substring,
    /// Two or more parts, placement search over start offsets.
    Windowed,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::EmptyString => "empty_string",
            Self::MatchAll => "match_all",
            Self::Exact => "exact",
            Self::Prefix => "prefix",
            Self::Suffix => "suffix",
            Self::Substring => "substring",
            Self::Windowed => "windowed",
        };
        f.write_str(name)
    }
}

/// Description of how a pattern will be executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryPlan {
    /// Chosen strategy.
    pub strategy: Strategy,
    /// Literal parts after splitting on `%`.
    pub parts: Vec<String>,
    /// Shortest value length that can match.
    pub min_len: usize,
    /// Pattern begins with `%`.
    pub starts_with_percent: bool,
    /// Pattern ends with `%`.
    pub ends_with_percent: bool,
}

impl QueryPlan {
    /// Plans `pattern` without touching any index.
    #[must_use]
    pub fn for_pattern(pattern: &ParsedPattern<'_>) -> Self {
        Self {
            strategy: strategy_for(pattern),
            parts: pattern.parts().iter().map(ToString::to_string).collect(),
            min_len: pattern.min_len(),
            starts_with_percent: pattern.starts_with_percent(),
            ends_with_percent: pattern.ends_with_percent(),
        }
    }
}

impl std::fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} parts={:?} min_len={}",
            self.strategy, self.parts, self.min_len
        )
    }
}

/// Selects the strategy for a parsed pattern.
#[must_use]
pub fn strategy_for(pattern: &ParsedPattern<'_>) -> Strategy {
    if pattern.is_empty_pattern() {
        return Strategy::EmptyString;
    }
    match (
        pattern.parts().len(),
        pattern.starts_with_percent(),
        pattern.ends_with_percent(),
    ) {
        (0, _, _) => Strategy::MatchAll,
        (1, false, false) => Strategy::Exact,
        (1, false, true) => Strategy::Prefix,
        (1, true, false) => Strategy::Suffix,
        (1, true, true) => Strategy::Substring,
        _ => Strategy::Windowed,
    }
}

/// Read-only view over the indexes needed to answer a query.
#[derive(Debug, Clone, Copy)]
pub struct Executor<'a> {
    positional: &'a PositionalIndex,
    length: &'a LengthIndex,
    tombstones: &'a Bitmap,
}

impl<'a> Executor<'a> {
    /// Creates an executor. `tombstones` is subtracted from every result.
    #[must_use]
    pub fn new(
        positional: &'a PositionalIndex,
        length: &'a LengthIndex,
        tombstones: &'a Bitmap,
    ) -> Self {
        Self {
            positional,
            length,
            tombstones,
        }
    }

    fn empty(&self) -> Bitmap {
        Bitmap::empty(self.positional.kind())
    }

    /// Live records matching `pattern`.
    #[must_use]
    pub fn execute(&self, pattern: &ParsedPattern<'_>) -> Bitmap {
        let mut result = self.candidates(pattern);
        if !self.tombstones.is_empty() {
            result.andnot_inplace(self.tombstones);
        }
        result
    }

    /// Records matching `pattern`, tombstoned ones included.
    #[must_use]
    pub fn candidates(&self, pattern: &ParsedPattern<'_>) -> Bitmap {
        let parts = pattern.parts();
        match strategy_for(pattern) {
            Strategy::EmptyString => self
                .length
                .length_eq(0)
                .cloned()
                .unwrap_or_else(|| self.empty()),
            Strategy::MatchAll => self.length.length_ge(0),
            Strategy::Exact => self.exact(parts[0]),
            Strategy::Prefix => {
                let mut result = self.match_part_at_pos(parts[0], 0);
                self.bound_length(&mut result, parts[0].len());
                result
            }
            Strategy::Suffix => {
                let mut result = self.match_part_at_end(parts[0]);
                self.bound_length(&mut result, parts[0].len());
                result
            }
            Strategy::Substring => self.substring(parts[0]),
            Strategy::Windowed => {
                let candidates = self.length.length_ge(pattern.min_len());
                let mut result = self.empty();
                if !candidates.is_empty() {
                    let window = Window::new(
                        parts,
                        !pattern.starts_with_percent(),
                        pattern.ends_with_percent(),
                    );
                    self.windowed(&window, candidates, &mut result);
                }
                result
            }
        }
    }

    /// Records whose value matches `part` starting at byte `offset`.
    ///
    /// `_` adds no positional constraint. An absent `(byte, position)` entry
    /// short-circuits to the empty set. Values too short to hold the whole
    /// part are excluded even when the part ends in `_`.
    #[must_use]
    pub fn match_part_at_pos(&self, part: PatternPart<'_>, offset: usize) -> Bitmap {
        if part.is_empty() {
            return self.length.length_ge(offset);
        }
        if part.is_all_wildcards() {
            // Any byte at the part's last offset: exactly the long-enough values.
            return self.positional.any_at(offset + part.len() - 1);
        }

        let mut result: Option<Bitmap> = None;
        for (i, byte) in part.concrete() {
            let Some(bitmap) = self.positional.get_forward(byte, offset + i) else {
                return self.empty();
            };
            match result.as_mut() {
                None => result = Some(bitmap.clone()),
                Some(acc) => {
                    acc.and_inplace(bitmap);
                    if acc.is_empty() {
                        return self.empty();
                    }
                }
            }
        }

        let mut result = result.unwrap_or_else(|| self.empty());
        if part.has_wildcard_tail() {
            self.bound_length(&mut result, offset + part.len());
        }
        result
    }

    /// Records whose value ends with `part`.
    #[must_use]
    pub fn match_part_at_end(&self, part: PatternPart<'_>) -> Bitmap {
        if part.is_all_wildcards() {
            return self.length.length_ge(part.len());
        }

        let len = part.len();
        let mut result: Option<Bitmap> = None;
        for (i, byte) in part.concrete() {
            let Ok(distance) = i32::try_from(len - i) else {
                return self.empty();
            };
            let Some(bitmap) = self.positional.get_negative(byte, -distance) else {
                return self.empty();
            };
            match result.as_mut() {
                None => result = Some(bitmap.clone()),
                Some(acc) => {
                    acc.and_inplace(bitmap);
                    if acc.is_empty() {
                        return self.empty();
                    }
                }
            }
        }

        let mut result = result.unwrap_or_else(|| self.empty());
        if part.has_wildcard_head() {
            self.bound_length(&mut result, len);
        }
        result
    }

    fn exact(&self, part: PatternPart<'_>) -> Bitmap {
        let Some(exact_len) = self.length.length_eq(part.len()) else {
            return self.empty();
        };
        let mut result = self.match_part_at_pos(part, 0);
        result.and_inplace(exact_len);
        result
    }

    fn substring(&self, part: PatternPart<'_>) -> Bitmap {
        let max_len = self.length.max_len();
        if part.len() > max_len {
            return self.empty();
        }
        if part.is_all_wildcards() {
            return self.length.length_ge(part.len());
        }
        let mut result = self.empty();
        for offset in 0..=max_len - part.len() {
            result.or_inplace(&self.match_part_at_pos(part, offset));
        }
        result
    }

    /// Intersects `bitmap` with `length >= min_len`.
    fn bound_length(&self, bitmap: &mut Bitmap, min_len: usize) {
        match self.length.at_least(min_len) {
            Some(at_least) => bitmap.and_inplace(at_least),
            None => bitmap.clear(),
        }
    }

    /// Places every part of `window` within the records of `candidates`,
    /// unioning each complete placement into `result`.
    ///
    /// Placements are searched depth-first from an explicit stack.
    fn windowed(&self, window: &Window<'_, '_>, candidates: Bitmap, result: &mut Bitmap) {
        let parts = window.parts;
        let mut pending = vec![Placement {
            index: 0,
            min_pos: 0,
            carried: candidates,
        }];

        while let Some(Placement {
            index,
            min_pos,
            carried,
        }) = pending.pop()
        {
            if index >= parts.len() {
                result.or_inplace(&carried);
                continue;
            }

            let part = parts[index];
            let is_last = index + 1 == parts.len();

            if is_last && !window.ends_with_percent {
                let mut tail = self.match_part_at_end(part);
                tail.and_inplace(&carried);
                // The tail may not overlap the previous part's placement.
                self.bound_length(&mut tail, min_pos + part.len());
                result.or_inplace(&tail);
                continue;
            }

            let remaining = window.len_after(index);
            let Some(max_pos) = self.length.max_len().checked_sub(part.len() + remaining) else {
                continue;
            };
            let max_pos = if index == 0 && window.anchored_start {
                0
            } else {
                max_pos
            };

            for pos in min_pos..=max_pos {
                let mut placed = self.match_part_at_pos(part, pos);
                placed.and_inplace(&carried);
                if !placed.is_empty() {
                    pending.push(Placement {
                        index: index + 1,
                        min_pos: pos + part.len(),
                        carried: placed,
                    });
                }
            }
        }
    }
}

/// Parts `index..` still to be placed at offsets `>= min_pos` within `carried`.
struct Placement {
    index: usize,
    min_pos: usize,
    carried: Bitmap,
}

struct Window<'p, 'a> {
    parts: &'p [PatternPart<'a>],
    anchored_start: bool,
    ends_with_percent: bool,
    // suffix_len[i]: total length of parts[i..]
    suffix_len: Vec<usize>,
}

impl<'p, 'a> Window<'p, 'a> {
    fn new(parts: &'p [PatternPart<'a>], anchored_start: bool, ends_with_percent: bool) -> Self {
        let mut suffix_len = vec![0; parts.len() + 1];
        for (i, part) in parts.iter().enumerate().rev() {
            suffix_len[i] = suffix_len[i + 1] + part.len();
        }
        Self {
            parts,
            anchored_start,
            ends_with_percent,
            suffix_len,
        }
    }

    /// Total length of the parts after `index`.
    fn len_after(&self, index: usize) -> usize {
        self.suffix_len[index + 1]
    }
}
