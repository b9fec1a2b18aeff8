//! `Table` / `TableBuilder`: an immutable, sorted on-disk file made of data
//! blocks, one index block, and a fixed footer.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use memtable::{lookup_key, InternalKey, LookupResult, ValueKind};

use crate::block::{Block, BlockBuilder, MAX_BLOCK_SIZE};
use crate::format::{BlockHandle, Footer, FOOTER_BYTES};
use crate::TableError;

/// Writes a single `Table` file.
pub struct TableBuilder<W: Write> {
    writer: W,
    data_block: BlockBuilder,
    index_block: BlockBuilder,
    offset: u64,
    pending_index_entry: bool,
    pending: Option<InternalKey>,
    smallest: Option<InternalKey>,
    largest: Option<InternalKey>,
}

impl<W: Write> TableBuilder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            data_block: BlockBuilder::new(),
            index_block: BlockBuilder::new(),
            offset: 0,
            pending_index_entry: false,
            pending: None,
            smallest: None,
            largest: None,
        }
    }

    /// Adds one entry. Entries must arrive in non-decreasing `InternalKey`
    /// order.
    pub fn add(&mut self, ik: InternalKey) -> Result<(), TableError> {
        if self.pending_index_entry {
            if let Some(p) = self.pending.take() {
                self.index_block.add(&p);
            }
            self.pending_index_entry = false;
        }

        if self.smallest.is_none() {
            self.smallest = Some(ik.without_value());
        }
        self.largest = Some(ik.without_value());

        self.pending = Some(ik.without_value());
        self.data_block.add(&ik);

        if self.data_block.current_size_estimate() > MAX_BLOCK_SIZE {
            self.flush()?;
        }
        Ok(())
    }

    /// Flushes the current data block to the file, if non-empty, and
    /// arranges for the next `add` to append its boundary index entry.
    fn flush(&mut self) -> Result<(), TableError> {
        if self.data_block.is_empty() {
            return Ok(());
        }
        let contents = self.data_block.finish();
        let handle = BlockHandle {
            offset: self.offset as u32,
            size: contents.len() as u32,
        };
        self.writer.write_all(&contents)?;
        self.offset += contents.len() as u64;

        if let Some(p) = self.pending.as_mut() {
            p.user_value = handle.encode().to_vec();
        }
        self.pending_index_entry = true;
        self.data_block.reset();
        Ok(())
    }

    /// Flushes the last data block, appends the final index entry, writes
    /// the index block and footer, and syncs the file. Returns the total
    /// file size, the smallest, and the largest `InternalKey` written.
    pub fn finish(mut self) -> Result<TableSummary, TableError> {
        self.flush()?;
        if self.pending_index_entry {
            if let Some(p) = self.pending.take() {
                self.index_block.add(&p);
            }
            self.pending_index_entry = false;
        }

        let index_contents = self.index_block.finish();
        let index_handle = BlockHandle {
            offset: self.offset as u32,
            size: index_contents.len() as u32,
        };
        self.writer.write_all(&index_contents)?;
        self.offset += index_contents.len() as u64;

        let footer = Footer {
            meta_index_handle: BlockHandle::default(),
            index_handle,
        };
        let footer_bytes = footer.encode();
        self.writer.write_all(&footer_bytes)?;
        self.offset += footer_bytes.len() as u64;

        self.writer.flush()?;

        Ok(TableSummary {
            file_size: self.offset,
            smallest: self.smallest.take(),
            largest: self.largest.take(),
        })
    }

    /// Current size estimate of the file written so far, including the
    /// pending (unflushed) data block. Used to decide when a major
    /// compaction output file has grown past `MAX_FILE_SIZE`.
    pub fn file_size_estimate(&self) -> u64 {
        self.offset + self.data_block.current_size_estimate() as u64
    }
}

/// The outcome of finishing a `TableBuilder`.
pub struct TableSummary {
    pub file_size: u64,
    pub smallest: Option<InternalKey>,
    pub largest: Option<InternalKey>,
}

/// An open, immutable on-disk table.
pub struct Table {
    reader: Mutex<File>,
    index: Block,
}

impl Table {
    /// Opens an existing table file, verifying the footer magic and
    /// loading the index block into memory.
    pub fn open(path: &Path) -> Result<Self, TableError> {
        let mut file = File::open(path)?;
        let file_len = file.metadata()?.len();
        if file_len < FOOTER_BYTES as u64 {
            return Err(TableError::TableTooShort);
        }

        file.seek(SeekFrom::Start(file_len - FOOTER_BYTES as u64))?;
        let mut footer_buf = [0u8; FOOTER_BYTES];
        file.read_exact(&mut footer_buf)?;
        let footer = Footer::decode(&footer_buf)?;

        let index_bytes = read_block_bytes(&mut file, footer.index_handle)?;
        let index = Block::new(&index_bytes)?;

        Ok(Table {
            reader: Mutex::new(file),
            index,
        })
    }

    fn read_block(&self, handle: BlockHandle) -> Result<Block, TableError> {
        let mut file = self.reader.lock().expect("table file lock poisoned");
        let bytes = read_block_bytes(&mut file, handle)?;
        Block::new(&bytes)
    }

    /// Looks up `user_key`: positions the index at the candidate block and
    /// seeks inside it, exactly as `new_iterator().seek()` would, without
    /// requiring a caller-held `Arc<Table>`.
    pub fn get(&self, user_key: &[u8]) -> Result<LookupResult, TableError> {
        let index_idx = self.index.seek_index(user_key);
        if index_idx >= self.index.len() {
            return Ok(LookupResult::NotFound);
        }
        let handle_ik = self.index.entry(index_idx);
        let handle = BlockHandle::decode(&handle_ik.user_value)?;
        let block = self.read_block(handle)?;

        let target = lookup_key(user_key);
        let di = block.seek_index(&target.user_key);
        if di >= block.len() {
            return Ok(LookupResult::NotFound);
        }
        let ik = block.entry(di);
        if ik.user_key != user_key {
            return Ok(LookupResult::NotFound);
        }
        Ok(match ik.kind {
            ValueKind::Value => LookupResult::Found(ik.user_value.clone()),
            ValueKind::Deletion => LookupResult::Deleted,
        })
    }

}

fn read_block_bytes(file: &mut File, handle: BlockHandle) -> Result<Vec<u8>, TableError> {
    file.seek(SeekFrom::Start(handle.offset as u64))?;
    let mut buf = vec![0u8; handle.size as usize];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

/// A two-level iterator: an index-block cursor selecting the current data
/// block, and a lazily materialized cursor within that block.
pub struct TableIterator {
    table: Arc<Table>,
    index_idx: Option<usize>,
    data_block: Option<Block>,
    data_idx: Option<usize>,
}

impl TableIterator {
    /// Produces a two-level iterator anchored to a shared handle on
    /// `table`, so a cache eviction of the backing slot can't invalidate
    /// an iterator already in flight.
    pub fn new(table: Arc<Table>) -> Self {
        TableIterator {
            table,
            index_idx: None,
            data_block: None,
            data_idx: None,
        }
    }

    pub fn valid(&self) -> bool {
        matches!(self.data_idx, Some(i) if self.data_block.as_ref().is_some_and(|b| i < b.len()))
    }

    pub fn internal_key(&self) -> Option<&InternalKey> {
        let i = self.data_idx?;
        self.data_block.as_ref().map(|b| b.entry(i))
    }

    fn load_block_at(&mut self, index_idx: usize) -> Result<(), TableError> {
        let handle_ik = self.table.index.entry(index_idx);
        let handle = BlockHandle::decode(&handle_ik.user_value)?;
        self.data_block = Some(self.table.read_block(handle)?);
        self.index_idx = Some(index_idx);
        Ok(())
    }

    pub fn seek(&mut self, target_user_key: &[u8]) -> Result<(), TableError> {
        let index_idx = self.table.index.seek_index(target_user_key);
        if index_idx >= self.table.index.len() {
            self.invalidate();
            return Ok(());
        }
        self.load_block_at(index_idx)?;
        let target = lookup_key(target_user_key);
        let di = self
            .data_block
            .as_ref()
            .unwrap()
            .seek_index(&target.user_key);
        self.data_idx = Some(di);
        if !self.valid() {
            self.step_to_next_valid_block()?;
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        self.data_block = None;
        self.data_idx = None;
        self.index_idx = None;
    }

    /// Scans forward through subsequent index entries to find a block
    /// with at least one entry, matching the source's fallback step after
    /// a seek lands past the end of its target block.
    fn step_to_next_valid_block(&mut self) -> Result<(), TableError> {
        let mut next_index = self.index_idx.map(|i| i + 1).unwrap_or(0);
        loop {
            if next_index >= self.table.index.len() {
                self.invalidate();
                return Ok(());
            }
            self.load_block_at(next_index)?;
            let block = self.data_block.as_ref().unwrap();
            if !block.is_empty() {
                self.data_idx = Some(0);
                return Ok(());
            }
            next_index += 1;
        }
    }

    pub fn seek_first(&mut self) -> Result<(), TableError> {
        if self.table.index.is_empty() {
            self.invalidate();
            return Ok(());
        }
        self.load_block_at(0)?;
        self.data_idx = Some(0);
        if !self.valid() {
            self.step_to_next_valid_block()?;
        }
        Ok(())
    }

    pub fn seek_last(&mut self) -> Result<(), TableError> {
        if self.table.index.is_empty() {
            self.invalidate();
            return Ok(());
        }
        let last = self.table.index.len() - 1;
        self.load_block_at(last)?;
        let len = self.data_block.as_ref().unwrap().len();
        self.data_idx = len.checked_sub(1);
        Ok(())
    }

    pub fn next(&mut self) -> Result<(), TableError> {
        if let Some(i) = self.data_idx {
            self.data_idx = Some(i + 1);
        }
        if !self.valid() {
            self.step_to_next_valid_block()?;
        }
        Ok(())
    }

    pub fn prev(&mut self) -> Result<(), TableError> {
        loop {
            match self.data_idx {
                Some(0) | None => {
                    let prev_index = match self.index_idx {
                        Some(0) | None => {
                            self.invalidate();
                            return Ok(());
                        }
                        Some(i) => i - 1,
                    };
                    self.load_block_at(prev_index)?;
                    let len = self.data_block.as_ref().unwrap().len();
                    if len == 0 {
                        self.data_idx = None;
                        continue;
                    }
                    self.data_idx = Some(len - 1);
                    return Ok(());
                }
                Some(i) => {
                    self.data_idx = Some(i - 1);
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/table_tests.rs"]
mod table_tests;
