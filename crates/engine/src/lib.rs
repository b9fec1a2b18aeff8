//! # Engine — RiptideKV Storage Engine
//!
//! The top-level coordinator that ties [`memtable`] and [`sstable`] into a
//! complete log-structured merge-tree key/value store.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌────────────────────────────────────────────────────────┐
//! │                        ENGINE                           │
//! │                                                          │
//! │ write.rs → make_room_for_write → MemTable::add           │
//! │              |  (usage > write_buffer_size?)             │
//! │              v                                           │
//! │           seal memtable as immutable, spawn background   │
//! │              |                                           │
//! │              v                                           │
//! │   write_level0_table() → new level-0 Table                │
//! │              |                                           │
//! │           do_compaction_work() → merged Table(s)          │
//! │              |                                           │
//! │           Version::save() + CURRENT rename                │
//! │                                                          │
//! │ read.rs  → mem → imm → Version::get (level fan-out)       │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module responsibilities
//!
//! | Module       | Purpose                                                |
//! |--------------|---------------------------------------------------------|
//! | [`recovery`] | `CURRENT`/descriptor recovery, `Engine::open`           |
//! | [`write`]    | `put`, `delete`, `make_room_for_write`, background task |
//! | [`read`]     | `get`, fanning out across mem/imm/current               |
//! | [`version`]  | `Version`, `FileMetaData`, catalog operations           |
//! | [`compaction`] | `Compaction`, `pick_compaction`, `do_compaction_work` |
//! | [`merge`]    | `MergingIterator` over a compaction's input tables      |
//! | [`manifest`] | Descriptor encode/decode, `CURRENT` pointer, filenames  |
//!
//! ## Crash safety
//!
//! There is no write-ahead log in this core: writes live only in the
//! active/immutable memtable until a flush installs a new `Version`. A new
//! descriptor is written to its own `MANIFEST-<n>` file and only made
//! current by a temp-file-plus-rename of `CURRENT` — a crash between those
//! two steps leaves the previous `CURRENT` (and therefore the previous,
//! still-consistent, `Version`) intact.

mod compaction;
mod manifest;
mod merge;
mod read;
mod recovery;
mod version;
mod write;

pub use compaction::Compaction;
pub use merge::MergingIterator;
pub use version::{FileMetaData, Version};

use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};

use config::Options;
use memtable::MemTable;
use sstable::TableCache;

/// Errors surfaced by the engine: table-level errors bubble up unchanged,
/// plus the engine's own descriptor/`CURRENT`-handling failures.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Table(#[from] sstable::TableError),
    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// `CURRENT` names a descriptor number that doesn't parse as a decimal
    /// integer.
    #[error("CURRENT file does not name a valid descriptor number")]
    InvalidCurrent,
}

/// Mutable state guarded by [`Engine`]'s single mutex: the
/// active memtable, an optional sealed-but-unflushed memtable, the live
/// catalog snapshot, the write-sequence counter, and the background
/// compaction latch.
struct EngineState {
    mem: Arc<MemTable>,
    imm: Option<Arc<MemTable>>,
    current: Arc<Version>,
    next_seq: u64,
    bg_compaction_scheduled: bool,
}

/// The top-level, thread-safe storage engine handle. Cloning an `Engine`
/// shares the same underlying database (cheap `Arc` clone) — the
/// background compaction thread holds its own clone so it keeps the
/// database alive independent of how many handles the caller drops.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

struct Inner {
    dbname: PathBuf,
    options: Options,
    table_cache: TableCache,
    state: Mutex<EngineState>,
    cond: Condvar,
}

impl Inner {
    /// Blocks until no background compaction is scheduled or running.
    fn await_background_work(&self) {
        let mut state = self.state.lock().expect("engine state lock poisoned");
        while state.bg_compaction_scheduled {
            state = self.cond.wait(state).expect("engine state lock poisoned");
        }
    }
}

impl Engine {
    /// Opens (or creates, per [`Options::create_if_missing`]) the database
    /// at `options.dbname`, replaying `CURRENT`/descriptor recovery.
    pub fn open(options: Options) -> Result<Self, EngineError> {
        recovery::open(options)
    }

    /// Inserts `key -> value`, stamping it with a fresh sequence number.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<(), EngineError> {
        write::put(self, key, value)
    }

    /// Records a tombstone for `key`.
    pub fn delete(&self, key: &[u8]) -> Result<(), EngineError> {
        write::delete(self, key)
    }

    /// Looks up `key`, fanning out across the active memtable, the
    /// immutable memtable (if any), and the on-disk catalog, in that
    /// order. A tombstone hit at any source is surfaced as `Ok(None)`.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, EngineError> {
        read::get(self, key)
    }

    /// Flushes the active memtable to disk and blocks until that flush and
    /// any other in-flight background compaction completes, so every write
    /// made before this call is recoverable from a later [`Engine::open`].
    pub fn close(&self) {
        write::close(self);
    }
}

/// Waits for outstanding background work before the last handle to this
/// database goes away, so a dropped `Engine` never tears down the process
/// mid-compaction. Because the background thread itself holds a clone of
/// this `Arc`, `Inner::drop` only ever runs after that thread has already
/// cleared `bg_compaction_scheduled` — the wait below is a safety net, not
/// the primary mechanism; callers that want to observe close-time errors
/// should call [`Engine::close`] explicitly instead (`Drop` cannot
/// propagate them).
impl Drop for Inner {
    fn drop(&mut self) {
        self.await_background_work();
    }
}

#[cfg(test)]
#[path = "tests/helpers.rs"]
mod helpers;
