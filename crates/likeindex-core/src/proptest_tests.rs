//! Property-based tests: every query agrees with a direct LIKE matcher.

use proptest::prelude::*;

use crate::bitmap::BitmapKind;
use crate::config::LikeIndexConfig;
use crate::engine::LikeIndex;

/// Direct LIKE evaluation by dynamic programming over (value, pattern).
fn like_match(value: &[u8], pattern: &[u8]) -> bool {
    let m = value.len();
    let n = pattern.len();

    // dp[i][j]: value[..i] matches pattern[..j]
    let mut dp = vec![vec![false; n + 1]; m + 1];
    dp[0][0] = true;
    for j in 0..n {
        if pattern[j] == b'%' {
            dp[0][j + 1] = dp[0][j];
        }
    }

    for i in 1..=m {
        for j in 1..=n {
            dp[i][j] = match pattern[j - 1] {
                b'%' => dp[i][j - 1] || dp[i - 1][j],
                b'_' => dp[i - 1][j - 1],
                byte => dp[i - 1][j - 1] && value[i - 1] == byte,
            };
        }
    }
    dp[m][n]
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[abc]{0,8}"
}

fn pattern_strategy() -> impl Strategy<Value = String> {
    "[abc%_]{0,6}"
}

fn kind_strategy() -> impl Strategy<Value = BitmapKind> {
    prop_oneof![Just(BitmapKind::Roaring), Just(BitmapKind::Dense)]
}

fn index_with(kind: BitmapKind, threshold: usize, auto_compact: bool) -> LikeIndex<u64> {
    let mut config = LikeIndexConfig::default();
    config.bitmap.backend = kind;
    config.index.compaction_threshold = threshold;
    config.index.auto_compact = auto_compact;
    LikeIndex::with_config(config).expect("config")
}

fn expected(live: &[(u64, String)], pattern: &str) -> Vec<u64> {
    let mut ids: Vec<u64> = live
        .iter()
        .filter(|(_, value)| like_match(value.as_bytes(), pattern.as_bytes()))
        .map(|(id, _)| *id)
        .collect();
    ids.sort_unstable();
    ids
}

#[test]
fn test_oracle_sanity() {
    assert!(like_match(b"", b""));
    assert!(like_match(b"", b"%"));
    assert!(!like_match(b"", b"_"));
    assert!(like_match(b"scar", b"%ar"));
    assert!(!like_match(b"scar", b"c%r"));
    assert!(like_match(b"abba", b"ab%ba"));
    assert!(!like_match(b"aba", b"ab%ba"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Property: with inserts, deletes and slot reuse interleaved, every
    /// pattern returns exactly the live records a direct matcher accepts.
    #[test]
    fn prop_matches_oracle_under_crud(
        kind in kind_strategy(),
        threshold in 1usize..=4,
        initial in proptest::collection::vec(value_strategy(), 0..=16),
        delete_mask in proptest::collection::vec(any::<bool>(), 16),
        later in proptest::collection::vec(value_strategy(), 0..=8),
        patterns in proptest::collection::vec(pattern_strategy(), 1..=8),
    ) {
        let mut index = index_with(kind, threshold, true);
        let mut live: Vec<(u64, String)> = Vec::new();
        let mut next_id = 0u64;

        for value in initial {
            index.insert(next_id, &value).expect("insert");
            live.push((next_id, value));
            next_id += 1;
        }

        let doomed: Vec<u64> = live
            .iter()
            .zip(&delete_mask)
            .filter(|(_, delete)| **delete)
            .map(|((id, _), _)| *id)
            .collect();
        let removed = index.delete_where(|id| doomed.contains(id));
        prop_assert_eq!(removed, doomed.len());
        live.retain(|(id, _)| !doomed.contains(id));

        for value in later {
            index.insert(next_id, &value).expect("insert");
            live.push((next_id, value));
            next_id += 1;
        }

        prop_assert_eq!(index.len(), live.len());
        for pattern in &patterns {
            let found = index.match_pattern(pattern).expect("match");
            prop_assert_eq!(found, expected(&live, pattern), "pattern {:?}", pattern);
        }
    }

    /// Property: replacing a literal byte with `_` never shrinks the result.
    #[test]
    fn prop_wildcard_monotonicity(
        values in proptest::collection::vec(value_strategy(), 1..=16),
        literal in "[abc]{1,6}",
        at in any::<prop::sample::Index>(),
        prefix_percent in any::<bool>(),
        suffix_percent in any::<bool>(),
    ) {
        let mut index = index_with(BitmapKind::Roaring, 1000, true);
        for (id, value) in (0u64..).zip(&values) {
            index.insert(id, value).expect("insert");
        }

        let mut relaxed = literal.clone().into_bytes();
        let slot = at.index(relaxed.len());
        relaxed[slot] = b'_';
        let wrap = |body: &[u8]| {
            let mut pattern = Vec::new();
            if prefix_percent { pattern.push(b'%'); }
            pattern.extend_from_slice(body);
            if suffix_percent { pattern.push(b'%'); }
            pattern
        };

        let strict = index.match_pattern(wrap(literal.as_bytes())).expect("match");
        let loose = index.match_pattern(wrap(&relaxed)).expect("match");
        prop_assert!(strict.iter().all(|id| loose.contains(id)));
    }

    /// Property: compaction never changes a query result.
    #[test]
    fn prop_compaction_is_invisible(
        kind in kind_strategy(),
        values in proptest::collection::vec(value_strategy(), 1..=20),
        delete_mask in proptest::collection::vec(any::<bool>(), 20),
        patterns in proptest::collection::vec(pattern_strategy(), 1..=8),
    ) {
        let mut index = index_with(kind, 1000, false);
        for (id, value) in (0u64..).zip(&values) {
            index.insert(id, value).expect("insert");
        }
        index.delete_where(|id| delete_mask[*id as usize]);

        let before: Vec<Vec<u64>> = patterns
            .iter()
            .map(|p| index.match_pattern(p).expect("match"))
            .collect();
        index.compact();
        let after: Vec<Vec<u64>> = patterns
            .iter()
            .map(|p| index.match_pattern(p).expect("match"))
            .collect();

        prop_assert_eq!(before, after);
        prop_assert_eq!(index.stats().tombstones, 0);
    }

    /// Property: an exact pattern equal to an inserted literal value finds it.
    #[test]
    fn prop_exact_round_trip(values in proptest::collection::vec(value_strategy(), 1..=20)) {
        let mut index = index_with(BitmapKind::Dense, 1000, true);
        for (id, value) in (0u64..).zip(&values) {
            index.insert(id, value).expect("insert");
        }
        for (id, value) in (0u64..).zip(&values) {
            let found = index.match_pattern(value).expect("match");
            prop_assert!(found.contains(&id));
            prop_assert!(found.iter().all(|other| values[*other as usize] == *value));
        }
    }
}
