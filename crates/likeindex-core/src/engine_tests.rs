//! Tests for `engine` module

use std::cell::Cell;

use crate::bitmap::BitmapKind;
use crate::config::LikeIndexConfig;
use crate::engine::LikeIndex;
use crate::query::Strategy;
use crate::source::{RecordSource, RowLocation};

fn config(threshold: usize, auto_compact: bool, backend: BitmapKind) -> LikeIndexConfig {
    let mut config = LikeIndexConfig::default();
    config.index.compaction_threshold = threshold;
    config.index.auto_compact = auto_compact;
    config.bitmap.backend = backend;
    config
}

/// Ids 1..=4 for "cat", "car", "dog", "scar".
fn animals() -> LikeIndex<u64> {
    let mut index = LikeIndex::new();
    for (id, value) in [(1u64, "cat"), (2, "car"), (3, "dog"), (4, "scar")] {
        index.insert(id, value).expect("insert");
    }
    index
}

fn ids(index: &LikeIndex<u64>, pattern: &str) -> Vec<u64> {
    index.match_pattern(pattern).expect("match")
}

// ========================================================================
// Queries
// ========================================================================

#[test]
fn test_reference_scenarios() {
    let mut index = animals();

    assert_eq!(ids(&index, "ca_"), vec![1, 2]);
    assert_eq!(ids(&index, "%ar"), vec![2, 4]);
    assert_eq!(ids(&index, "c%r"), vec![2]);
    assert_eq!(ids(&index, "%"), vec![1, 2, 3, 4]);
    assert!(ids(&index, "").is_empty());

    index.delete_where(|id| *id == 3);
    assert!(ids(&index, "dog").is_empty());
}

#[test]
fn test_exact_round_trip() {
    let mut index = LikeIndex::new();
    let values = ["alpha", "alphabet", "alp", "beta", "a", ""];
    for (id, value) in (0u64..).zip(values) {
        index.insert(id, value).expect("insert");
    }

    for (id, value) in (0u64..).zip(values) {
        assert_eq!(ids(&index, value), vec![id], "{value:?}");
    }
}

#[test]
fn test_length_bounds() {
    let mut index = LikeIndex::new();
    for (id, value) in (0u64..).zip(["abc", "abcd", "ab", "abcabc", "xabc"]) {
        index.insert(id, value).expect("insert");
    }

    assert_eq!(ids(&index, "abc%"), vec![0, 1, 3]);
    assert_eq!(ids(&index, "abc"), vec![0]);
}

#[test]
fn test_windowed_pattern_with_thousands_of_parts() {
    // Arrange
    let mut config = LikeIndexConfig::default();
    config.index.max_indexed_length = 65_535;
    let mut index = LikeIndex::with_config(config).expect("config");
    index.insert(1u64, "a".repeat(20_000)).expect("insert");
    index
        .insert(2u64, format!("{}b", "a".repeat(19_999)))
        .expect("insert");
    index.insert(3u64, "b".repeat(20_000)).expect("insert");

    // Act
    let all_a = ids(&index, &format!("{}a", "a%".repeat(19_999)));
    let a_then_b = ids(&index, &format!("{}b", "a%".repeat(19_999)));

    // Assert
    assert_eq!(all_a, vec![1]);
    assert_eq!(a_then_b, vec![2]);
}

#[test]
fn test_match_pattern_by_custom_order() {
    let index = animals();
    let descending = index
        .match_pattern_by("%a%", |a, b| b.cmp(a))
        .expect("match");
    assert_eq!(descending, vec![4, 2, 1]);
}

#[test]
fn test_row_location_ordering() {
    // Arrange
    let mut index = LikeIndex::new();
    index.insert(RowLocation::new(7, 2), "car").expect("insert");
    index
        .insert(RowLocation::new(1, 9), "scar")
        .expect("insert");
    index.insert(RowLocation::new(7, 1), "bar").expect("insert");

    // Act
    let found = index.match_pattern("%ar").expect("match");

    // Assert
    assert_eq!(
        found,
        vec![
            RowLocation::new(1, 9),
            RowLocation::new(7, 1),
            RowLocation::new(7, 2)
        ]
        );
    assert_eq!(found[0].to_string(), "(1,9)");
}

#[test]
fn test_explain_does_not_execute() {
    let index: LikeIndex<u64> = LikeIndex::new();
    assert_eq!(index.explain("%ab%").strategy, Strategy::Substring);
    assert_eq!(index.explain("a%b").strategy, Strategy::Windowed);
    assert_eq!(index.explain("").strategy, Strategy::EmptyString);
}

#[test]
fn test_records_containing() {
    let mut index = animals();
    assert_eq!(
        index.records_containing(b'a').to_sorted_vec(),
        vec![0, 1, 3]
    );

    index.delete_where(|id| *id == 2);
    assert_eq!(index.records_containing(b'a').to_sorted_vec(), vec![0, 3]);
    assert!(index.records_containing(b'z').is_empty());
}

// ========================================================================
// Deletion, reuse and compaction
// ========================================================================

#[test]
fn test_delete_hides_record_before_compaction() {
    // Arrange
    let mut index = animals();

    // Act
    let removed = index.delete_where(|id| *id == 2);

    // Assert
    assert_eq!(removed, 1);
    assert_eq!(ids(&index, "ca_"), vec![1]);
    assert_eq!(ids(&index, "%"), vec![1, 3, 4]);
    let stats = index.stats();
    assert_eq!(stats.tombstones, 1);
    assert_eq!(stats.delete_count, 1);
    assert_eq!(stats.compaction_count, 0);
}

#[test]
fn test_delete_skips_already_deleted() {
    let mut index = animals();
    assert_eq!(index.delete_where(|id| *id <= 2), 2);
    assert_eq!(index.delete_where(|id| *id <= 2), 0);
    assert_eq!(index.stats().delete_count, 2);
}

#[test]
fn test_delete_predicate_runs_once_per_live_record() {
    let mut index = animals();
    index.delete_where(|id| *id == 1);

    let calls = Cell::new(0);
    index.delete_where(|_| {
        calls.set(calls.get() + 1);
        false
    });
    assert_eq!(calls.get(), 3);
}

#[test]
fn test_auto_compaction_at_threshold() {
    // Arrange
    let mut index = LikeIndex::with_config(config(2, true, BitmapKind::Roaring)).expect("config");
    for (id, value) in (0u64..).zip(["cat", "car", "dog", "scar"]) {
        index.insert(id, value).expect("insert");
    }

    // Act
    index.delete_where(|id| *id == 0);
    let before = index.stats();
    index.delete_where(|id| *id == 1);
    let after = index.stats();

    // Assert
    assert_eq!(before.compaction_count, 0);
    assert_eq!(before.tombstones, 1);
    assert_eq!(after.compaction_count, 1);
    assert_eq!(after.tombstones, 0);
    assert_eq!(after.free_slots, 2);
    assert_eq!(ids(&index, "%"), vec![2, 3]);
    assert_eq!(ids(&index, "ca%"), Vec::<u64>::new());
}

#[test]
fn test_manual_compaction_when_auto_disabled() {
    let mut index = LikeIndex::with_config(config(1, false, BitmapKind::Dense)).expect("config");
    for (id, value) in (0u64..).zip(["cat", "car"]) {
        index.insert(id, value).expect("insert");
    }

    index.delete_where(|id| *id == 0);
    assert!(index.needs_compaction());
    assert_eq!(index.stats().compaction_count, 0);

    assert_eq!(index.compact(), 1);
    assert_eq!(index.compact(), 0, "nothing left to purge");
    assert!(!index.needs_compaction());
    assert_eq!(ids(&index, "ca_"), vec![1]);
}

#[test]
fn test_compaction_preserves_results() {
    let patterns = ["%", "c%", "%ar", "%a%", "c_r", "_a_", "s%r", "%o%"];
    let mut index =
        LikeIndex::with_config(config(1000, false, BitmapKind::Roaring)).expect("config");
    for (id, value) in (0u64..).zip(["cat", "car", "dog", "scar", "cart", "oar"]) {
        index.insert(id, value).expect("insert");
    }
    index.delete_where(|id| id % 2 == 1);

    let before: Vec<Vec<u64>> = patterns.iter().map(|p| ids(&index, p)).collect();
    index.compact();
    let after: Vec<Vec<u64>> = patterns.iter().map(|p| ids(&index, p)).collect();

    assert_eq!(before, after);
}

#[test]
fn test_reuse_before_compaction_scrubs_old_value() {
    // Arrange
    let mut index =
        LikeIndex::with_config(config(1000, true, BitmapKind::Roaring)).expect("config");
    index.insert(1u64, "scar").expect("insert");
    index.insert(2u64, "dog").expect("insert");
    index.delete_where(|id| *id == 1);

    // Act
    let record = index.insert(3u64, "cat").expect("insert");

    // Assert
    assert_eq!(record, 0, "deleted slot is reused");
    assert!(ids(&index, "scar").is_empty());
    assert!(ids(&index, "%ar").is_empty());
    assert!(ids(&index, "____").is_empty());
    assert_eq!(ids(&index, "cat"), vec![3]);
    assert_eq!(ids(&index, "%"), vec![2, 3]);
    let stats = index.stats();
    assert_eq!(stats.tombstones, 0);
    assert_eq!(stats.free_slots, 0);
    assert_eq!(stats.total_slots, 2);
}

#[test]
fn test_reuse_after_compaction() {
    let mut index = LikeIndex::with_config(config(1, true, BitmapKind::Dense)).expect("config");
    index.insert(1u64, "scar").expect("insert");
    index.delete_where(|id| *id == 1);
    assert_eq!(index.stats().compaction_count, 1);

    let record = index.insert(2u64, "ox").expect("insert");

    assert_eq!(record, 0);
    assert_eq!(ids(&index, "%"), vec![2]);
    assert_eq!(ids(&index, "o%"), vec![2]);
    assert!(ids(&index, "s%").is_empty());
}

#[test]
fn test_match_all_excludes_compacted_slots() {
    let mut index = LikeIndex::with_config(config(1, true, BitmapKind::Roaring)).expect("config");
    index.insert(1u64, "a").expect("insert");
    index.insert(2u64, "b").expect("insert");
    index.delete_where(|id| *id == 1);

    assert_eq!(ids(&index, "%"), vec![2]);
    assert_eq!(index.len(), 1);
}

#[test]
fn test_replace_where_counts_update() {
    let mut index = animals();

    let record = index
        .replace_where(|id| *id == 3, 3, "dot")
        .expect("replace");

    assert_eq!(ids(&index, "do_"), vec![3]);
    assert!(ids(&index, "dog").is_empty());
    assert!(index.identifier(record).is_some());
    assert!(index.identifier(2).is_none(), "old record tombstoned");
    let stats = index.stats();
    assert_eq!(stats.update_count, 1);
    assert_eq!(stats.insert_count, 4);
    assert_eq!(stats.delete_count, 0);
    assert_eq!(stats.active_records, 4);
}

// ========================================================================
// Truncation, stats, lifecycle
// ========================================================================

#[test]
fn test_values_truncated_to_max_indexed_length() {
    let mut config = LikeIndexConfig::default();
    config.index.max_indexed_length = 4;
    let mut index = LikeIndex::with_config(config).expect("config");
    index.insert(1u64, "abcdefgh").expect("insert");

    assert_eq!(ids(&index, "abcd"), vec![1]);
    assert_eq!(ids(&index, "abc%"), vec![1]);
    assert!(ids(&index, "%gh").is_empty());
    assert_eq!(index.stats().max_length, 4);
}

#[test]
fn test_with_config_rejects_invalid() {
    let mut config = LikeIndexConfig::default();
    config.index.compaction_threshold = 0;
    let err = LikeIndex::<u64>::with_config(config).expect_err("invalid");
    assert_eq!(err.code(), "LIKEIDX-004");
}

#[test]
fn test_stats_snapshot() {
    let index = animals();
    let stats = index.stats();

    assert_eq!(stats.active_records, 4);
    assert_eq!(stats.total_slots, 4);
    assert_eq!(stats.free_slots, 0);
    assert_eq!(stats.max_length, 4);
    assert_eq!(stats.insert_count, 4);
    assert_eq!(stats.length_slots, 5);
    assert_eq!(stats.backend, BitmapKind::Roaring);
    assert!(stats.position_entries > 0);
    assert!(stats.memory_bytes > 0);

    let json = stats.to_json().expect("json");
    assert!(json.contains("\"active_records\": 4"));
}

#[test]
fn test_clear() {
    let mut index = animals();
    index.clear();

    assert!(index.is_empty());
    assert!(ids(&index, "%").is_empty());
    assert_eq!(index.stats().insert_count, 0);

    index.insert(9, "cat").expect("insert");
    assert_eq!(ids(&index, "c%"), vec![9]);
}

#[test]
fn test_rebuild_from_vec() {
    // Arrange
    let mut index = animals();
    let source = vec![(10u64, "bat"), (11, "bar"), (12, "")];

    // Act
    index.rebuild_from(&source).expect("rebuild");

    // Assert
    assert_eq!(ids(&index, "ba%"), vec![10, 11]);
    assert_eq!(ids(&index, ""), vec![12]);
    assert!(ids(&index, "ca_").is_empty());
    let stats = index.stats();
    assert_eq!(stats.active_records, 3);
    assert_eq!(stats.insert_count, 0);
    assert_eq!(stats.max_length, 3);
}

#[test]
fn test_rebuild_from_empty_source() {
    let mut index = animals();
    let source: Vec<(u64, Vec<u8>)> = Vec::new();
    index.rebuild_from(&source).expect("rebuild");
    assert!(index.is_empty());
    assert!(ids(&index, "%").is_empty());
}

/// Yields one extra record after the first scan.
struct GrowingSource {
    scans: Cell<usize>,
    records: Vec<(u64, Vec<u8>)>,
}

impl RecordSource<u64> for GrowingSource {
    fn scan(&self) -> Box<dyn Iterator<Item = (u64, &[u8])> + '_> {
        let scans = self.scans.get();
        self.scans.set(scans + 1);
        let take = self.records.len().min(1 + scans);
        Box::new(
            self.records[..take]
                .iter()
                .map(|(id, value)| (*id, value.as_slice())),
        )
    }
}

#[test]
fn test_rebuild_detects_changed_source() {
    // Arrange
    let mut index = animals();
    let source = GrowingSource {
        scans: Cell::new(0),
        records: vec![(1, b"x".to_vec()), (2, b"y".to_vec())],
    };

    // Act
    let err = index.rebuild_from(&source).expect_err("source changed");

    // Assert
    assert_eq!(err.code(), "LIKEIDX-006");
    assert_eq!(ids(&index, "ca_"), vec![1, 2], "index untouched on failure");
}
