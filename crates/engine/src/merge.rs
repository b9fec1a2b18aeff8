//! `MergingIterator`: a merge-sorted view over a compaction's input table
//! iterators.

use memtable::InternalKey;
use sstable::TableIterator;

use crate::EngineError;

/// Holds every input iterator for one compaction, all positioned, and
/// tracks which currently holds the smallest `InternalKey`. `next`
/// advances only that iterator and re-scans for the new smallest — with a
/// handful of inputs per compaction, a linear rescan beats a binary heap.
pub struct MergingIterator {
    inputs: Vec<TableIterator>,
    current: Option<usize>,
}

impl MergingIterator {
    pub fn new(inputs: Vec<TableIterator>) -> Self {
        MergingIterator {
            inputs,
            current: None,
        }
    }

    fn find_smallest(&mut self) {
        let mut smallest: Option<usize> = None;
        for (i, it) in self.inputs.iter().enumerate() {
            if !it.valid() {
                continue;
            }
            smallest = match smallest {
                None => Some(i),
                Some(s) => {
                    if it.internal_key().unwrap() < self.inputs[s].internal_key().unwrap() {
                        Some(i)
                    } else {
                        Some(s)
                    }
                }
            };
        }
        self.current = smallest;
    }

    pub fn seek_first(&mut self) -> Result<(), EngineError> {
        for it in self.inputs.iter_mut() {
            it.seek_first()?;
        }
        self.find_smallest();
        Ok(())
    }

    pub fn valid(&self) -> bool {
        self.current
            .is_some_and(|i| self.inputs[i].valid())
    }

    pub fn internal_key(&self) -> &InternalKey {
        let i = self.current.expect("internal_key() called on invalid iterator");
        self.inputs[i]
            .internal_key()
            .expect("current input iterator must be valid")
    }

    pub fn next(&mut self) -> Result<(), EngineError> {
        if let Some(i) = self.current {
            self.inputs[i].next()?;
        }
        self.find_smallest();
        Ok(())
    }
}
