//! `Engine::open`: `CURRENT`-pointer recovery.

use std::fs;
use std::sync::{Arc, Condvar, Mutex};

use config::Options;
use memtable::MemTable;
use sstable::TableCache;

use crate::manifest::read_current_file;
use crate::{Engine, EngineError, EngineState, Inner, Version};

pub(crate) fn open(options: Options) -> Result<Engine, EngineError> {
    if options.create_if_missing {
        fs::create_dir_all(&options.dbname)?;
    } else if !options.dbname.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("database directory {} does not exist", options.dbname.display()),
        )
        .into());
    }

    let current = match read_current_file(&options.dbname)? {
        Some(number) => Version::load(&options.dbname, number)?,
        None => Version::new(),
    };

    let state = EngineState {
        mem: Arc::new(MemTable::new()),
        imm: None,
        next_seq: current.sequence,
        current: Arc::new(current),
        bg_compaction_scheduled: false,
    };

    let table_cache = TableCache::new(options.dbname.clone());
    let inner = Inner {
        dbname: options.dbname.clone(),
        options,
        table_cache,
        state: Mutex::new(state),
        cond: Condvar::new(),
    };

    Ok(Engine {
        inner: Arc::new(inner),
    })
}

#[cfg(test)]
#[path = "tests/recovery_tests.rs"]
mod recovery_tests;
