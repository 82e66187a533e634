//! LIKE pattern parsing.
//!
//! `%` matches any run of bytes (possibly empty), `_` matches exactly one
//! byte, every other byte is literal. A pattern is split on `%` into literal
//! parts; `_` stays inside the parts and is resolved by the executor.
//! Parsing never fails.

/// Any-length wildcard.
pub const ANY_RUN: u8 = b'%';
/// Single-byte wildcard.
pub const ANY_ONE: u8 = b'_';

/// One `%`-free segment of a pattern. May contain `_`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternPart<'a> {
    bytes: &'a [u8],
}

impl<'a> PatternPart<'a> {
    /// Wraps a segment. `bytes` must not contain `%`.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        debug_assert!(!bytes.contains(&ANY_RUN));
        Self { bytes }
    }

    /// Raw bytes, wildcards included.
    #[must_use]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Number of bytes this part consumes in a matching string.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true for a zero-length part (never produced by [`parse`]).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Literal bytes with their offset inside the part; `_` is skipped.
    pub fn concrete(&self) -> impl Iterator<Item = (usize, u8)> + 'a {
        self.bytes
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, b)| b != ANY_ONE)
    }

    /// True if every byte is `_`.
    #[must_use]
    pub fn is_all_wildcards(&self) -> bool {
        self.bytes.iter().all(|&b| b == ANY_ONE)
    }

    /// True if the part ends in `_`, i.e. its last literal byte does not
    /// pin the string length.
    #[must_use]
    pub fn has_wildcard_tail(&self) -> bool {
        self.bytes.last() == Some(&ANY_ONE)
    }

    /// True if the part starts with `_`.
    #[must_use]
    pub fn has_wildcard_head(&self) -> bool {
        self.bytes.first() == Some(&ANY_ONE)
    }
}

impl std::fmt::Display for PatternPart<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.bytes))
    }
}

/// A pattern decomposed into literal parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPattern<'a> {
    source: &'a [u8],
    parts: Vec<PatternPart<'a>>,
    starts_with_percent: bool,
    ends_with_percent: bool,
}

impl<'a> ParsedPattern<'a> {
    /// Original pattern bytes.
    #[must_use]
    pub fn source(&self) -> &'a [u8] {
        self.source
    }

    /// Literal parts in order.
    #[must_use]
    pub fn parts(&self) -> &[PatternPart<'a>] {
        &self.parts
    }

    /// Pattern begins with `%`.
    #[must_use]
    pub fn starts_with_percent(&self) -> bool {
        self.starts_with_percent
    }

    /// Pattern ends with `%`.
    #[must_use]
    pub fn ends_with_percent(&self) -> bool {
        self.ends_with_percent
    }

    /// True for the empty pattern, which matches only zero-length strings.
    #[must_use]
    pub fn is_empty_pattern(&self) -> bool {
        self.source.is_empty()
    }

    /// Shortest string length that can match.
    #[must_use]
    pub fn min_len(&self) -> usize {
        self.parts.iter().map(PatternPart::len).sum()
    }
}

/// Parses a LIKE pattern.
///
/// A leading or trailing `%` sets the matching flag; the body is split on
/// `%` and empty segments are dropped, so runs of `%` collapse.
///
/// # Example
///
/// ```
/// use likeindex_core::pattern::parse;
///
/// let parsed = parse(b"%ab%%c_");
/// assert!(parsed.starts_with_percent());
/// assert!(!parsed.ends_with_percent());
/// assert_eq!(parsed.parts().len(), 2);
/// assert_eq!(parsed.min_len(), 4);
/// ```
#[must_use]
pub fn parse(pattern: &[u8]) -> ParsedPattern<'_> {
    let starts_with_percent = pattern.first() == Some(&ANY_RUN);
    let ends_with_percent = pattern.last() == Some(&ANY_RUN);

    let parts = pattern
        .split(|&b| b == ANY_RUN)
        .filter(|segment| !segment.is_empty())
        .map(PatternPart::new)
        .collect();

    ParsedPattern {
        source: pattern,
        parts,
        starts_with_percent,
        ends_with_percent,
    }
}
