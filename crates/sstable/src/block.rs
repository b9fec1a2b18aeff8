//! A `Block` is a contiguous, sorted run of `InternalKey` entries, as used
//! for both data blocks and the index block of a `Table`.

use byteorder::{LittleEndian, WriteBytesExt};

use memtable::InternalKey;

use crate::format::{decode_internal_key, encode_internal_key};
use crate::TableError;

/// Maximum size, in bytes, a data block is allowed to grow to before the
/// `TableBuilder` flushes it.
pub const MAX_BLOCK_SIZE: usize = 4 * 1024;

/// Accumulates encoded `InternalKey` entries into a single block byte
/// buffer.
#[derive(Default)]
pub struct BlockBuilder {
    buf: Vec<u8>,
    count: u32,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `ik`'s wire encoding. Callers must add entries in
    /// non-decreasing `InternalKey` order.
    pub fn add(&mut self, ik: &InternalKey) {
        encode_internal_key(ik, &mut self.buf);
        self.count += 1;
    }

    /// Returns the finalized block contents: every added entry, followed
    /// by the entry count as a little-endian `u32` trailer. Does not
    /// consume the builder; call [`reset`](Self::reset) to start a new
    /// block.
    pub fn finish(&self) -> Vec<u8> {
        let mut out = self.buf.clone();
        out.write_u32::<LittleEndian>(self.count).unwrap();
        out
    }

    /// Clears the builder so it can accumulate the next block.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.count = 0;
    }

    /// Current size estimate, used to decide when to flush.
    pub fn current_size_estimate(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// A parsed, read-only `Block`: its entries decoded into memory in
/// on-disk order, ready for binary-searched seeks.
pub struct Block {
    entries: Vec<InternalKey>,
}

impl Block {
    /// Parses `data` by reading the trailing `u32` entry count and then
    /// decoding that many `InternalKey` entries from the start.
    pub fn new(data: &[u8]) -> Result<Self, TableError> {
        if data.len() < 4 {
            return Err(TableError::TableTooShort);
        }
        let count_offset = data.len() - 4;
        let count = u32::from_le_bytes(data[count_offset..].try_into().unwrap()) as usize;

        let mut entries = Vec::with_capacity(count);
        let mut pos = 0usize;
        for _ in 0..count {
            let (ik, consumed) = decode_internal_key(&data[pos..count_offset])?;
            pos += consumed;
            entries.push(ik);
        }
        Ok(Block { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, idx: usize) -> &InternalKey {
        &self.entries[idx]
    }

    /// Returns the index of the first entry whose `user_key >= target`
    /// (sequence/kind ignored for the comparison), or `self.len()` if
    /// every entry's `user_key` is strictly less than `target`.
    pub fn seek_index(&self, target_user_key: &[u8]) -> usize {
        self.entries
            .partition_point(|e| e.user_key.as_slice() < target_user_key)
    }

    pub fn iter(&self) -> BlockIter<'_> {
        BlockIter {
            block: self,
            idx: None,
        }
    }
}

/// A cursor over a [`Block`]'s entries in ascending `InternalKey` order.
pub struct BlockIter<'a> {
    block: &'a Block,
    idx: Option<usize>,
}

impl<'a> BlockIter<'a> {
    pub fn valid(&self) -> bool {
        matches!(self.idx, Some(i) if i < self.block.len())
    }

    pub fn internal_key(&self) -> &'a InternalKey {
        let i = self.idx.expect("internal_key() called on invalid iterator");
        self.block.entry(i)
    }

    pub fn seek(&mut self, target_user_key: &[u8]) {
        let i = self.block.seek_index(target_user_key);
        self.idx = Some(i);
    }

    pub fn seek_first(&mut self) {
        self.idx = if self.block.is_empty() { None } else { Some(0) };
    }

    pub fn seek_last(&mut self) {
        self.idx = self.block.len().checked_sub(1);
    }

    pub fn next(&mut self) {
        match self.idx {
            Some(i) => self.idx = Some(i + 1),
            None => {}
        }
    }

    pub fn prev(&mut self) {
        match self.idx {
            Some(0) | None => self.idx = None,
            Some(i) => self.idx = Some(i - 1),
        }
    }
}

#[cfg(test)]
#[path = "tests/block_tests.rs"]
mod block_tests;
