//! `Version`: the catalog of on-disk tables, the write-sequence counter,
//! and the next file number.

use std::sync::Arc;

use memtable::{InternalKey, LookupResult};
use sstable::TableCache;

use crate::EngineError;

/// `{number, file_size, allowed_seeks, smallest, largest}`.
/// `smallest`/`largest` have their `user_value` cleared before
/// persistence — a descriptor only needs key identity, not payload bytes.
#[derive(Debug, Clone)]
pub struct FileMetaData {
    pub number: u64,
    pub file_size: u64,
    pub allowed_seeks: u64,
    pub smallest: InternalKey,
    pub largest: InternalKey,
}

impl FileMetaData {
    pub fn overlaps_range(&self, smallest: &[u8], largest: &[u8]) -> bool {
        !(largest < self.smallest.user_key.as_slice()
            || self.largest.user_key.as_slice() < smallest)
    }
}

/// The per-level file catalog, the write-sequence counter, and the next
/// file number. `files[0]` may overlap internally;
/// `files[L]` for `L >= 1` is sorted and disjoint by `smallest.user_key`.
#[derive(Clone)]
pub struct Version {
    pub next_file_number: u64,
    pub sequence: u64,
    pub files: [Vec<Arc<FileMetaData>>; config::NUM_LEVELS],
    /// Largest key compacted out of each level so far; advanced at the
    /// end of every compaction on that level so repeated compactions
    /// sweep forward through the level's key space.
    pub compact_pointer: [Option<Vec<u8>>; config::NUM_LEVELS],
}

impl Default for Version {
    fn default() -> Self {
        Self {
            next_file_number: 1,
            sequence: 0,
            files: Default::default(),
            compact_pointer: Default::default(),
        }
    }
}

impl Version {
    pub fn new() -> Self {
        Self::default()
    }

    /// A shallow copy: per-level lists are independent `Vec`s so a
    /// compaction can mutate this copy while readers retain the original;
    /// the `FileMetaData` entries themselves are shared via `Arc`.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    pub fn next_file_number(&mut self) -> u64 {
        let n = self.next_file_number;
        self.next_file_number += 1;
        n
    }

    /// Level 0: append. Level >= 1: insert at the position that keeps the
    /// level sorted by `smallest.user_key`.
    pub fn add_file(&mut self, level: usize, meta: FileMetaData) {
        let meta = Arc::new(meta);
        if level == 0 {
            self.files[0].push(meta);
            return;
        }
        let pos = self.files[level]
            .partition_point(|f| f.smallest.user_key < meta.smallest.user_key);
        self.files[level].insert(pos, meta);
    }

    /// Removes the first file in `level` with the given file number.
    pub fn delete_file(&mut self, level: usize, number: u64) {
        if let Some(pos) = self.files[level].iter().position(|f| f.number == number) {
            self.files[level].remove(pos);
        }
    }

    /// `true` iff some file in `level` has a key range intersecting
    /// `[smallest, largest]`.
    pub fn overlaps(&self, level: usize, smallest: &[u8], largest: &[u8]) -> bool {
        if level == 0 {
            return self.files[0]
                .iter()
                .any(|f| f.overlaps_range(smallest, largest));
        }
        let idx = self.find_file(level, largest);
        match self.files[level].get(idx) {
            Some(f) => f.smallest.user_key.as_slice() <= largest,
            None => false,
        }
    }

    /// Binary search within `files[level]` (`level >= 1`) for the first
    /// file whose `largest.user_key >= key`. Returns `files[level].len()`
    /// if no such file exists. `left` and `right` converge at the loop's
    /// exit, so the result needs no further disambiguation.
    pub fn find_file(&self, level: usize, key: &[u8]) -> usize {
        let files = &self.files[level];
        let mut left = 0usize;
        let mut right = files.len();
        while left < right {
            let mid = left + (right - left) / 2;
            if files[mid].largest.user_key.as_slice() < key {
                left = mid + 1;
            } else {
                right = mid;
            }
        }
        left
    }

    /// Multi-level point lookup. Level 0 is scanned file by
    /// file, newest (highest file number) first; higher levels use a
    /// single binary-searched candidate. A tombstone hit terminates the
    /// search as `NotFound`.
    pub fn get(
        &self,
        table_cache: &TableCache,
        user_key: &[u8],
    ) -> Result<LookupResult, EngineError> {
        let mut level0: Vec<&Arc<FileMetaData>> = self.files[0]
            .iter()
            .filter(|f| {
                f.smallest.user_key.as_slice() <= user_key && user_key <= f.largest.user_key.as_slice()
            })
            .collect();
        level0.sort_by(|a, b| b.number.cmp(&a.number));

        for f in level0 {
            match table_cache.get(f.number, user_key)? {
                LookupResult::Found(v) => return Ok(LookupResult::Found(v)),
                LookupResult::Deleted => return Ok(LookupResult::NotFound),
                LookupResult::NotFound => continue,
            }
        }

        for level in 1..config::NUM_LEVELS {
            let idx = self.find_file(level, user_key);
            let Some(f) = self.files[level].get(idx) else {
                continue;
            };
            if f.smallest.user_key.as_slice() > user_key {
                continue;
            }
            match table_cache.get(f.number, user_key)? {
                LookupResult::Found(v) => return Ok(LookupResult::Found(v)),
                LookupResult::Deleted => return Ok(LookupResult::NotFound),
                LookupResult::NotFound => {}
            }
        }

        Ok(LookupResult::NotFound)
    }
}

#[cfg(test)]
#[path = "tests/version_tests.rs"]
mod version_tests;
