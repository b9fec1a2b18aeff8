use memtable::{InternalKey, ValueKind};

use super::{Block, BlockBuilder};

fn ik(user_key: &[u8], seq: u64, value: &[u8]) -> InternalKey {
    InternalKey::new(user_key.to_vec(), seq, ValueKind::Value, value.to_vec())
}

fn build_block(entries: &[InternalKey]) -> Block {
    let mut b = BlockBuilder::new();
    for e in entries {
        b.add(e);
    }
    let bytes = b.finish();
    Block::new(&bytes).unwrap()
}

#[test]
fn empty_block_round_trips() {
    let block = build_block(&[]);
    assert_eq!(block.len(), 0);
    assert!(block.is_empty());
}

#[test]
fn block_preserves_insertion_order() {
    let entries = vec![
        ik(b"a", 3, b"3"),
        ik(b"a", 2, b"2"),
        ik(b"b", 1, b"1"),
    ];
    let block = build_block(&entries);
    assert_eq!(block.len(), 3);
    assert_eq!(block.entry(0).user_key, b"a");
    assert_eq!(block.entry(0).sequence, 3);
    assert_eq!(block.entry(1).sequence, 2);
    assert_eq!(block.entry(2).user_key, b"b");
}

#[test]
fn seek_index_finds_least_entry_greater_or_equal() {
    let entries = vec![ik(b"123", 1, b"1234"), ik(b"124", 2, b"1245"), ik(b"125", 3, b"0245")];
    let block = build_block(&entries);

    // exact match on an existing user_key
    assert_eq!(block.seek_index(b"124"), 1);

    // between two user_keys lands on the next-greatest
    assert_eq!(block.seek_index(b"1240000"), 2);

    // below everything lands on the first entry
    assert_eq!(block.seek_index(b"000"), 0);

    // above everything is past the end
    assert_eq!(block.seek_index(b"999"), 3);
}

#[test]
fn iterator_seek_first_next_traverses_in_order() {
    let entries = vec![ik(b"a", 1, b"1"), ik(b"b", 1, b"2"), ik(b"c", 1, b"3")];
    let block = build_block(&entries);
    let mut it = block.iter();
    it.seek_first();

    let mut seen = Vec::new();
    while it.valid() {
        seen.push(it.internal_key().user_key.clone());
        it.next();
    }
    assert_eq!(seen, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
}

#[test]
fn iterator_seek_last_then_prev_traverses_backward() {
    let entries = vec![ik(b"a", 1, b"1"), ik(b"b", 1, b"2"), ik(b"c", 1, b"3")];
    let block = build_block(&entries);
    let mut it = block.iter();
    it.seek_last();
    assert!(it.valid());
    assert_eq!(it.internal_key().user_key, b"c");
    it.prev();
    assert_eq!(it.internal_key().user_key, b"b");
    it.prev();
    assert_eq!(it.internal_key().user_key, b"a");
    it.prev();
    assert!(!it.valid());
}

#[test]
fn iterator_seek_past_end_is_invalid() {
    let entries = vec![ik(b"a", 1, b"1")];
    let block = build_block(&entries);
    let mut it = block.iter();
    it.seek(b"z");
    assert!(!it.valid());
}
