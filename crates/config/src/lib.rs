//! Tunable constants and the `Options` struct used to open an [`Engine`].
//! Kept as a plain struct rather than the env-var-driven configuration a
//! front-end would normally read, since the front-end itself (a
//! command-line tool) is out of this core's scope.
//!
//! [`Engine`]: ../engine/struct.Engine.html

/// Number of on-disk levels, `L0..L6`.
pub const NUM_LEVELS: usize = 7;

/// Deepest level minor compaction (a memtable flush) is allowed to target
/// directly, skipping the usual level-0 landing spot when the flushed key
/// range doesn't overlap anything shallower.
pub const MAX_MEM_COMPACT_LEVEL: usize = 2;

/// Number of level-0 files that triggers a compaction.
pub const L0_COMPACTION_TRIGGER: usize = 4;

/// Number of level-0 files at which writes are throttled (the engine
/// sleeps and retries in `make_room_for_write`).
pub const L0_SLOWDOWN_WRITE_TRIGGER: usize = 8;

/// Memtable byte-usage threshold that triggers sealing it as immutable
/// and scheduling a flush.
pub const WRITE_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Size, in bytes, at which a major-compaction output table is rolled
/// over to a new file.
pub const MAX_FILE_SIZE: usize = 2 * 1024 * 1024;

/// Size, in bytes, at which a `Table`'s data block is flushed.
pub const MAX_BLOCK_SIZE: usize = 4 * 1024;

/// Total number of file descriptors the engine is allowed to hold open at
/// once, across the table cache and everything else (the current
/// `CURRENT`/descriptor files, the active table being written, etc.).
pub const MAX_OPEN_FILES: usize = 1000;

/// File descriptors reserved for non-table-cache use (the descriptor
/// file, `CURRENT`, the table currently being built).
pub const NUM_NON_TABLE_CACHE_FILES: usize = 10;

/// `max_bytes_for_level(1)`; each level deeper multiplies this by 10.
pub const LEVEL1_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Returns the compaction score denominator for on-disk level `level`
/// (`level >= 1`): `LEVEL1_MAX_BYTES * 10^(level - 1)`.
pub fn max_bytes_for_level(level: usize) -> u64 {
    debug_assert!(level >= 1);
    let mut result = LEVEL1_MAX_BYTES;
    for _ in 1..level {
        result *= 10;
    }
    result
}

/// Runtime options used to open an [`Engine`](../engine/struct.Engine.html).
///
/// Every field defaults to the matching tunable constant above; callers
/// that just want the documented defaults can use [`Options::default`].
#[derive(Debug, Clone)]
pub struct Options {
    /// Directory the database lives in.
    pub dbname: std::path::PathBuf,
    /// Memtable byte-usage threshold that triggers a flush.
    pub write_buffer_size: usize,
    /// Level-0 file count at which writes are throttled.
    pub l0_slowdown_write_trigger: usize,
    /// Create the database directory (and an empty catalog) if it does
    /// not already exist.
    pub create_if_missing: bool,
}

impl Options {
    pub fn new(dbname: impl Into<std::path::PathBuf>) -> Self {
        Self {
            dbname: dbname.into(),
            ..Options::default()
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dbname: std::path::PathBuf::from("."),
            write_buffer_size: WRITE_BUFFER_SIZE,
            l0_slowdown_write_trigger: L0_SLOWDOWN_WRITE_TRIGGER,
            create_if_missing: true,
        }
    }
}
