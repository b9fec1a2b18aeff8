//! Minor compaction (`write_level0_table`), compaction selection
//! (`pick_compaction`), and major compaction (`do_compaction_work`).

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use memtable::{InternalKey, MemTable, ValueKind};
use sstable::{TableBuilder, TableCache};

use crate::manifest::table_file_name;
use crate::version::FileMetaData;
use crate::{EngineError, MergingIterator, Version};

/// The two input file sets for one compaction round: `inputs[0]` is the
/// level being compacted, `inputs[1]` is the overlapping slice of
/// `level + 1`.
pub struct Compaction {
    pub level: usize,
    pub inputs: [Vec<Arc<FileMetaData>>; 2],
}

impl Compaction {
    /// A compaction reduces to moving a single file up a level, untouched,
    /// when it has no overlapping file in the level below it.
    pub fn is_trivial_move(&self) -> bool {
        self.inputs[0].len() == 1 && self.inputs[1].is_empty()
    }
}

fn total_file_size(files: &[Arc<FileMetaData>]) -> u64 {
    files.iter().map(|f| f.file_size).sum()
}

impl Version {
    /// Minor compaction: materializes a sealed immutable memtable as a new
    /// level-0 (or deeper, if it doesn't overlap) `Table`. A no-op if `imm`
    /// has no entries.
    pub fn write_level0_table(&mut self, dbname: &Path, imm: &MemTable) -> Result<(), EngineError> {
        let number = self.next_file_number();
        let path = table_file_name(dbname, number);
        let file = File::create(&path)?;
        let mut builder = TableBuilder::new(file);

        let mut it = imm.iterator();
        it.seek_to_first();

        let mut smallest: Option<InternalKey> = None;
        let mut largest: Option<InternalKey> = None;
        while it.valid() {
            let ik = (*it.key()).clone();
            if smallest.is_none() {
                smallest = Some(ik.without_value());
            }
            largest = Some(ik.without_value());
            builder.add(ik)?;
            it.next();
        }

        let (smallest, largest) = match (smallest, largest) {
            (Some(s), Some(l)) => (s, l),
            _ => return Ok(()),
        };
        let summary = builder.finish()?;

        let meta = FileMetaData {
            number,
            file_size: summary.file_size,
            allowed_seeks: 1 << 30,
            smallest,
            largest,
        };

        // Pick the deepest level `<= MAX_MEM_COMPACT_LEVEL` that doesn't
        // overlap, stopping as soon as the *next* level would overlap.
        let mut level = 0;
        if !self.overlaps(0, &meta.smallest.user_key, &meta.largest.user_key) {
            while level < config::MAX_MEM_COMPACT_LEVEL {
                if self.overlaps(level + 1, &meta.smallest.user_key, &meta.largest.user_key) {
                    break;
                }
                level += 1;
            }
        }
        self.add_file(level, meta);
        Ok(())
    }

    /// Advances `compact_pointer[level]` to `key`, so the next compaction
    /// at this level resumes past it instead of always restarting at the
    /// first file.
    fn advance_compact_pointer(&mut self, level: usize, key: &[u8]) {
        self.compact_pointer[level] = Some(key.to_vec());
    }

    /// Scores every level below the top and returns a `Compaction`
    /// describing the highest-scoring one over the `1.0` threshold, or
    /// `None` if every level is within budget.
    pub fn pick_compaction(&self) -> Option<Compaction> {
        let mut best_level: Option<usize> = None;
        let mut best_score = 1.0f64;

        for level in 0..config::NUM_LEVELS - 1 {
            let score = if level == 0 {
                self.files[0].len() as f64 / config::L0_COMPACTION_TRIGGER as f64
            } else {
                total_file_size(&self.files[level]) as f64 / config::max_bytes_for_level(level) as f64
            };
            if score > best_score {
                best_score = score;
                best_level = Some(level);
            }
        }
        let level = best_level?;

        let (inputs0, smallest, largest) = if level == 0 {
            let inputs0 = self.files[0].clone();
            let mut smallest = inputs0[0].smallest.user_key.clone();
            let mut largest = inputs0[0].largest.user_key.clone();
            for f in &inputs0[1..] {
                if f.largest.user_key > largest {
                    largest = f.largest.user_key.clone();
                }
                if f.smallest.user_key < smallest {
                    smallest = f.smallest.user_key.clone();
                }
            }
            (inputs0, smallest, largest)
        } else {
            let pointer = self.compact_pointer[level].as_deref();
            let picked = self.files[level]
                .iter()
                .find(|f| pointer.is_none_or(|p| f.largest.user_key.as_slice() > p))
                .or_else(|| self.files[level].first())
                .cloned()?;
            let smallest = picked.smallest.user_key.clone();
            let largest = picked.largest.user_key.clone();
            (vec![picked], smallest, largest)
        };

        let inputs1 = self.files[level + 1]
            .iter()
            .filter(|f| {
                !(f.largest.user_key.as_slice() < smallest.as_slice()
                    || f.smallest.user_key.as_slice() > largest.as_slice())
            })
            .cloned()
            .collect();

        Some(Compaction {
            level,
            inputs: [inputs0, inputs1],
        })
    }

    /// Runs one round of major compaction: picks inputs, merges them (or
    /// performs a trivial move), and installs the output files one level
    /// deeper. Returns `false` when there is nothing left to compact, so
    /// callers loop until it does.
    pub fn do_compaction_work(
        &mut self,
        dbname: &Path,
        table_cache: &TableCache,
    ) -> Result<bool, EngineError> {
        let Some(c) = self.pick_compaction() else {
            return Ok(false);
        };

        if c.is_trivial_move() {
            let f = &c.inputs[0][0];
            let largest = f.largest.user_key.clone();
            let moved = (**f).clone();
            self.delete_file(c.level, f.number);
            self.add_file(c.level + 1, moved);
            self.advance_compact_pointer(c.level, &largest);
            return Ok(true);
        }

        let mut input_iters = Vec::with_capacity(c.inputs[0].len() + c.inputs[1].len());
        for f in c.inputs[0].iter().chain(c.inputs[1].iter()) {
            input_iters.push(table_cache.new_iterator(f.number)?);
        }
        let mut merged = MergingIterator::new(input_iters);
        merged.seek_first()?;

        let mut outputs: Vec<FileMetaData> = Vec::new();
        // Entries for one user_key arrive newest-first (descending
        // sequence); the first one kept per key shadows any older
        // duplicate. Tombstones are dropped unconditionally and do not
        // mark their key as seen, so if the newest entry for a key is a
        // deletion, an older surviving duplicate is not re-examined
        // against it here and can outlive the tombstone.
        let mut current_user_key: Option<Vec<u8>> = None;

        while merged.valid() {
            let number = self.next_file_number();
            let path = table_file_name(dbname, number);
            let file = File::create(&path)?;
            let mut builder = TableBuilder::new(file);
            let mut smallest: Option<InternalKey> = None;
            let mut largest: Option<InternalKey> = None;

            while merged.valid() {
                let ik = merged.internal_key().clone();

                if ik.kind == ValueKind::Deletion {
                    merged.next()?;
                    continue;
                }
                if current_user_key.as_deref() == Some(ik.user_key.as_slice()) {
                    merged.next()?;
                    continue;
                }
                current_user_key = Some(ik.user_key.clone());

                if smallest.is_none() {
                    smallest = Some(ik.without_value());
                }
                largest = Some(ik.without_value());
                builder.add(ik)?;
                merged.next()?;

                if builder.file_size_estimate() > config::MAX_FILE_SIZE as u64 {
                    break;
                }
            }

            let summary = builder.finish()?;
            if let (Some(s), Some(l)) = (smallest, largest) {
                outputs.push(FileMetaData {
                    number,
                    file_size: summary.file_size,
                    allowed_seeks: 1 << 30,
                    smallest: s,
                    largest: l,
                });
            }
        }

        for f in &c.inputs[0] {
            self.delete_file(c.level, f.number);
        }
        for f in &c.inputs[1] {
            self.delete_file(c.level + 1, f.number);
        }

        let mut max_key: Option<Vec<u8>> = None;
        for out in outputs {
            if max_key.as_deref().is_none_or(|m| out.largest.user_key.as_slice() > m) {
                max_key = Some(out.largest.user_key.clone());
            }
            self.add_file(c.level + 1, out);
        }
        if let Some(k) = max_key {
            self.advance_compact_pointer(c.level, &k);
        }

        Ok(true)
    }
}

#[cfg(test)]
#[path = "tests/compaction_tests.rs"]
mod compaction_tests;
