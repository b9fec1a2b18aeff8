//! # SSTable
//!
//! The on-disk half of the RiptideKV storage engine: the fixed block and
//! table file format, and the bounded cache of open table handles that
//! sits in front of it.
//!
//! ## File layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ data_block_0                                                   │
//! │ data_block_1                                                   │
//! │ ...                                                            │
//! │ index_block   (one IndexEntry per data block, see below)       │
//! ├───────────────────────────────────────────────────────────────┤
//! │ FOOTER (24 bytes, always last)                                 │
//! │ meta_index_handle(8) | index_handle(8) | magic(8)              │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every block (data or index) is a run of `InternalKey` entries
//! (`sequence(u64) | kind(i8) | key_len(i32) | key | value_len(i32) |
//! value`) followed by a 4-byte little-endian entry count. An index
//! entry's `user_key` is the largest user key of its data block; its
//! `user_value` is repurposed to carry that block's 8-byte `BlockHandle`.
//!
//! There is no per-record checksum, no compression, and no bloom filter —
//! these are explicit non-goals of this core. The format is fixed, not
//! versioned: magic is a single `u64` constant, not a tagged footer
//! selecting among format revisions.
//!
//! ## Modules
//!
//! | Module     | Purpose                                               |
//! |------------|--------------------------------------------------------|
//! | [`format`] | `BlockHandle`, `Footer`, `InternalKey` wire encoding    |
//! | [`block`]  | `BlockBuilder` / `Block` (and its iterator)             |
//! | [`table`]  | `TableBuilder` / `Table` / the two-level `TableIterator`|
//! | [`cache`]  | `TableCache`, a bounded LRU of open `Table`s            |

pub mod block;
pub mod cache;
pub mod format;
pub mod table;

pub use block::{Block, BlockBuilder, BlockIter, MAX_BLOCK_SIZE};
pub use cache::{TableCache, MAX_OPEN_FILES, NUM_NON_TABLE_CACHE_FILES, TABLE_CACHE_CAPACITY};
pub use format::{decode_internal_key, encode_internal_key, BlockHandle, Footer, TABLE_MAGIC};
pub use table::{Table, TableBuilder, TableIterator, TableSummary};

/// Errors surfaced while reading or writing a `Table` file.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// The footer's magic constant did not match — the file is not a
    /// table, or is corrupt.
    #[error("table file has an invalid magic number")]
    TableFileMagic,
    /// The file is smaller than a footer.
    #[error("table file is too short to contain a valid footer")]
    TableTooShort,
    /// A block's declared entry count or length fields don't fit within
    /// its bytes.
    #[error("corrupt table block: {0}")]
    Corrupt(&'static str),
    /// Underlying filesystem error.
    #[error("table I/O error: {0}")]
    Io(#[from] std::io::Error),
}
