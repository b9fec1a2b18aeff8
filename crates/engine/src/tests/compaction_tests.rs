use std::fs::File;

use memtable::{InternalKey, MemTable, ValueKind};
use sstable::{TableBuilder, TableCache};
use tempfile::tempdir;

use crate::version::test_support::meta;

use super::*;

fn meta_with_size(number: u64, smallest: &[u8], largest: &[u8], file_size: u64) -> FileMetaData {
    let mut m = meta(number, smallest, largest);
    m.file_size = file_size;
    m
}

fn build_table(path: &std::path::Path, entries: &[(&[u8], u64, ValueKind, &[u8])]) {
    let file = File::create(path).unwrap();
    let mut builder = TableBuilder::new(file);
    for (key, seq, kind, value) in entries {
        builder
            .add(InternalKey::new(key.to_vec(), *seq, *kind, value.to_vec()))
            .unwrap();
    }
    builder.finish().unwrap();
}

#[test]
fn write_level0_table_is_a_noop_for_an_empty_memtable() {
    let dir = tempdir().unwrap();
    let mut v = Version::new();
    let mem = MemTable::new();
    v.write_level0_table(dir.path(), &mem).unwrap();
    assert!(v.files.iter().all(|level| level.is_empty()));
}

#[test]
fn write_level0_table_lands_in_level0_by_default() {
    let dir = tempdir().unwrap();
    let mut v = Version::new();
    let mem = MemTable::new();
    mem.add(1, ValueKind::Value, b"a", b"1");
    mem.add(2, ValueKind::Value, b"b", b"2");
    v.write_level0_table(dir.path(), &mem).unwrap();

    assert_eq!(v.files[0].len(), 1);
    assert_eq!(v.files[0][0].smallest.user_key, b"a");
    assert_eq!(v.files[0][0].largest.user_key, b"b");

    let cache = TableCache::new(dir.path());
    assert_eq!(v.get(&cache, b"a").unwrap(), memtable::LookupResult::Found(b"1".to_vec()));
}

#[test]
fn write_level0_table_skips_ahead_when_every_shallower_level_is_empty() {
    let dir = tempdir().unwrap();
    let mut v = Version::new();
    let mem = MemTable::new();
    mem.add(1, ValueKind::Value, b"k", b"v");
    v.write_level0_table(dir.path(), &mem).unwrap();

    // Nothing occupies level 0, 1, or 2, so the new table lands as deep as
    // MAX_MEM_COMPACT_LEVEL allows instead of always landing at level 0.
    assert!(v.files[0].is_empty());
    assert!(v.files[1].is_empty());
    assert_eq!(v.files[config::MAX_MEM_COMPACT_LEVEL].len(), 1);
}

#[test]
fn write_level0_table_stays_at_level0_when_level1_already_overlaps() {
    let dir = tempdir().unwrap();
    let mut v = Version::new();
    // Occupies level 1 with the same range the flush is about to produce,
    // so the level-1 overlap check trips on the very first iteration and
    // the new table lands at level 0 instead of skipping ahead.
    v.add_file(1, meta(1, b"k", b"k"));

    let mem = MemTable::new();
    mem.add(1, ValueKind::Value, b"k", b"v");
    v.write_level0_table(dir.path(), &mem).unwrap();

    assert_eq!(v.files[0].len(), 1);
    assert_eq!(v.files[1].len(), 1);
}

#[test]
fn pick_compaction_returns_none_when_every_level_is_under_budget() {
    let mut v = Version::new();
    v.add_file(0, meta(1, b"a", b"b"));
    assert!(v.pick_compaction().is_none());
}

#[test]
fn pick_compaction_selects_level0_once_file_count_trigger_is_exceeded() {
    let mut v = Version::new();
    for i in 0..5u64 {
        v.add_file(0, meta(i, b"a", b"b"));
    }
    let c = v.pick_compaction().expect("level 0 should be over trigger");
    assert_eq!(c.level, 0);
    assert_eq!(c.inputs[0].len(), 5);
}

#[test]
fn pick_compaction_selects_an_oversized_level_ge1() {
    let mut v = Version::new();
    v.add_file(1, meta_with_size(1, b"a", b"b", 20 * 1024 * 1024));
    let c = v.pick_compaction().expect("level 1 should be over budget");
    assert_eq!(c.level, 1);
    assert_eq!(c.inputs[0].len(), 1);
    assert!(c.inputs[1].is_empty());
}

#[test]
fn do_compaction_work_returns_false_when_nothing_to_compact() {
    let dir = tempdir().unwrap();
    let cache = TableCache::new(dir.path());
    let mut v = Version::new();
    assert!(!v.do_compaction_work(dir.path(), &cache).unwrap());
}

#[test]
fn do_compaction_work_performs_a_trivial_move_for_a_non_overlapping_file() {
    let dir = tempdir().unwrap();
    let cache = TableCache::new(dir.path());
    let mut v = Version::new();
    v.add_file(1, meta_with_size(1, b"a", b"b", 20 * 1024 * 1024));

    assert!(v.do_compaction_work(dir.path(), &cache).unwrap());

    assert!(v.files[1].is_empty());
    assert_eq!(v.files[2].len(), 1);
    assert_eq!(v.files[2][0].number, 1);
    assert_eq!(v.compact_pointer[1], Some(b"b".to_vec()));
}

#[test]
fn do_compaction_work_merges_overlapping_level0_files_into_level1() {
    let dir = tempdir().unwrap();
    let mut v = Version::new();

    for (i, key) in [b"a", b"b", b"c", b"d", b"e"].iter().enumerate() {
        let number = i as u64 + 1;
        build_table(
            &dir.path().join(format!("{number:06}.ldb")),
            &[(key.as_slice(), 1, ValueKind::Value, b"v")],
        );
        v.next_file_number = number + 1;
        v.add_file(0, meta(number, key.as_slice(), key.as_slice()));
    }

    let cache = TableCache::new(dir.path());
    assert!(v.do_compaction_work(dir.path(), &cache).unwrap());

    assert!(v.files[0].is_empty());
    assert_eq!(v.files[1].len(), 1);

    for key in [b"a", b"b", b"c", b"d", b"e"] {
        assert_eq!(
            v.get(&cache, key.as_slice()).unwrap(),
            memtable::LookupResult::Found(b"v".to_vec())
        );
    }
}

#[test]
fn do_compaction_work_keeps_the_newest_duplicate_and_drops_the_rest() {
    let dir = tempdir().unwrap();
    let mut v = Version::new();

    // A single table, already in valid non-decreasing InternalKey order:
    // two writes to "dup" (newest first), plus four padding keys so level
    // 0's file count clears the compaction trigger.
    build_table(
        &dir.path().join("000001.ldb"),
        &[
            (b"dup", 9, ValueKind::Value, b"newest"),
            (b"dup", 2, ValueKind::Value, b"oldest"),
        ],
    );
    v.add_file(0, meta(1, b"dup", b"dup"));
    v.next_file_number = 2;
    for (i, key) in [b"p0", b"p1", b"p2", b"p3"].iter().enumerate() {
        let number = v.next_file_number;
        build_table(
            &dir.path().join(format!("{number:06}.ldb")),
            &[(key.as_slice(), 1, ValueKind::Value, b"pad")],
        );
        v.next_file_number += 1;
        v.add_file(0, meta(number, key.as_slice(), key.as_slice()));
        let _ = i;
    }

    let cache = TableCache::new(dir.path());
    assert!(v.do_compaction_work(dir.path(), &cache).unwrap());

    assert_eq!(
        v.get(&cache, b"dup").unwrap(),
        memtable::LookupResult::Found(b"newest".to_vec())
    );
}

#[test]
fn tombstone_ahead_of_an_older_duplicate_does_not_suppress_it() {
    // The newest write for "k" is a deletion; compaction drops it without
    // marking "k" as already seen, so the older live duplicate behind it
    // survives instead of being treated as shadowed. This mirrors the
    // source compaction loop's literal behavior rather than a corrected
    // one (see the module-level note in `compaction.rs`).
    let dir = tempdir().unwrap();
    let mut v = Version::new();

    build_table(
        &dir.path().join("000001.ldb"),
        &[
            (b"k", 5, ValueKind::Deletion, b""),
            (b"k", 3, ValueKind::Value, b"survives"),
        ],
    );
    v.add_file(0, meta(1, b"k", b"k"));
    v.next_file_number = 2;
    for (i, key) in [b"p0", b"p1", b"p2", b"p3"].iter().enumerate() {
        let number = v.next_file_number;
        build_table(
            &dir.path().join(format!("{number:06}.ldb")),
            &[(key.as_slice(), 1, ValueKind::Value, b"pad")],
        );
        v.next_file_number += 1;
        v.add_file(0, meta(number, key.as_slice(), key.as_slice()));
        let _ = i;
    }

    let cache = TableCache::new(dir.path());
    assert!(v.do_compaction_work(dir.path(), &cache).unwrap());

    assert_eq!(
        v.get(&cache, b"k").unwrap(),
        memtable::LookupResult::Found(b"survives".to_vec())
    );
}
