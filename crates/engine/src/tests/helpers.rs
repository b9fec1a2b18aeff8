//! Shared test fixtures for the engine crate's test modules.

use std::path::Path;

use config::Options;

use crate::Engine;

/// Opens a fresh engine rooted at `dir`, with `write_buffer_size` set low
/// enough that a handful of writes seal and flush a memtable — useful for
/// exercising minor/major compaction without huge payloads.
pub fn open_with_buffer(dir: &Path, write_buffer_size: usize) -> Engine {
    let mut options = Options::new(dir);
    options.write_buffer_size = write_buffer_size;
    Engine::open(options).expect("engine should open")
}

pub fn open_default(dir: &Path) -> Engine {
    Engine::open(Options::new(dir)).expect("engine should open")
}
