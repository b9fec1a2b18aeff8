use std::fs::File;
use std::sync::Arc;

use memtable::{InternalKey, LookupResult, ValueKind};
use tempfile::tempdir;

use super::{Table, TableBuilder, TableIterator};

fn ik(user_key: &[u8], seq: u64, value: &[u8]) -> InternalKey {
    InternalKey::new(user_key.to_vec(), seq, ValueKind::Value, value.to_vec())
}

fn build_table(path: &std::path::Path, entries: Vec<InternalKey>) {
    let file = File::create(path).unwrap();
    let mut builder = TableBuilder::new(file);
    for e in entries {
        builder.add(e).unwrap();
    }
    builder.finish().unwrap();
}

#[test]
fn get_returns_value_for_present_key() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000001.ldb");
    build_table(
        &path,
        vec![
            ik(b"123", 1, b"1234"),
            ik(b"124", 2, b"1245"),
            ik(b"125", 3, b"0245"),
        ],
    );

    let table = Table::open(&path).unwrap();
    assert_eq!(table.get(b"124").unwrap(), LookupResult::Found(b"1245".to_vec()));
    assert_eq!(table.get(b"999").unwrap(), LookupResult::NotFound);
}

#[test]
fn get_reports_deleted_for_tombstone() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000001.ldb");
    let file = File::create(&path).unwrap();
    let mut builder = TableBuilder::new(file);
    builder
        .add(InternalKey::new(
            b"k".to_vec(),
            1,
            ValueKind::Deletion,
            Vec::new(),
        ))
        .unwrap();
    builder.finish().unwrap();

    let table = Table::open(&path).unwrap();
    assert_eq!(table.get(b"k").unwrap(), LookupResult::Deleted);
}

#[test]
fn open_rejects_truncated_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000001.ldb");
    std::fs::write(&path, b"short").unwrap();
    assert!(Table::open(&path).is_err());
}

#[test]
fn finish_reports_smallest_and_largest() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000001.ldb");
    let file = File::create(&path).unwrap();
    let mut builder = TableBuilder::new(file);
    builder.add(ik(b"a", 1, b"1")).unwrap();
    builder.add(ik(b"m", 2, b"2")).unwrap();
    builder.add(ik(b"z", 3, b"3")).unwrap();
    let summary = builder.finish().unwrap();
    assert_eq!(summary.smallest.unwrap().user_key, b"a");
    assert_eq!(summary.largest.unwrap().user_key, b"z");
}

#[test]
fn table_spanning_multiple_blocks_is_fully_readable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000001.ldb");

    // Entries large enough to force several data block flushes.
    let big_value = vec![b'x'; 512];
    let entries: Vec<InternalKey> = (0..50u64)
        .map(|i| ik(format!("key{:04}", i).as_bytes(), i + 1, &big_value))
        .collect();
    build_table(&path, entries.clone());

    let table = Arc::new(Table::open(&path).unwrap());
    for (i, _) in entries.iter().enumerate() {
        let key = format!("key{:04}", i);
        match table.get(key.as_bytes()).unwrap() {
            LookupResult::Found(v) => assert_eq!(v, big_value),
            other => panic!("expected Found for {key}, got {other:?}"),
        }
    }

    // seek_first then repeated next() yields strictly ascending order.
    let mut it = TableIterator::new(Arc::clone(&table));
    it.seek_first().unwrap();
    let mut prev: Option<Vec<u8>> = None;
    let mut count = 0;
    while it.valid() {
        let key = it.internal_key().unwrap().user_key.clone();
        if let Some(p) = &prev {
            assert!(*p < key);
        }
        prev = Some(key);
        count += 1;
        it.next().unwrap();
    }
    assert_eq!(count, entries.len());
}

#[test]
fn iterator_seek_lands_on_first_key_greater_or_equal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000001.ldb");
    build_table(
        &path,
        vec![
            ik(b"123", 1, b"1234"),
            ik(b"124", 2, b"1245"),
            ik(b"125", 3, b"0245"),
        ],
    );

    let table = Arc::new(Table::open(&path).unwrap());
    let mut it = TableIterator::new(table);
    it.seek(b"1240000").unwrap();
    assert!(it.valid());
    assert_eq!(it.internal_key().unwrap().user_key, b"125");
}

#[test]
fn iterator_seek_last_then_prev_is_descending() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("000001.ldb");
    build_table(
        &path,
        vec![ik(b"a", 1, b"1"), ik(b"b", 1, b"2"), ik(b"c", 1, b"3")],
    );

    let table = Arc::new(Table::open(&path).unwrap());
    let mut it = TableIterator::new(table);
    it.seek_last().unwrap();
    assert_eq!(it.internal_key().unwrap().user_key, b"c");
    it.prev().unwrap();
    assert_eq!(it.internal_key().unwrap().user_key, b"b");
    it.prev().unwrap();
    assert_eq!(it.internal_key().unwrap().user_key, b"a");
    it.prev().unwrap();
    assert!(!it.valid());
}
