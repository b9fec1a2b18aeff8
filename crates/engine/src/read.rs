//! Point lookups: fan out across the active memtable, the sealed immutable
//! memtable (if any), and the on-disk catalog, in that order.

use memtable::LookupResult;

use crate::{Engine, EngineError};

/// Looks up `key`. Snapshots the three read sources under the state lock,
/// then releases it, so the table reads a lookup might trigger never hold
/// the engine mutex.
pub(crate) fn get(engine: &Engine, key: &[u8]) -> Result<Option<Vec<u8>>, EngineError> {
    let (mem, imm, current) = {
        let state = engine.inner.state.lock().expect("engine state lock poisoned");
        (state.mem.clone(), state.imm.clone(), state.current.clone())
    };

    match mem.get(key) {
        LookupResult::Found(v) => return Ok(Some(v)),
        LookupResult::Deleted => return Ok(None),
        LookupResult::NotFound => {}
    }

    if let Some(imm) = imm {
        match imm.get(key) {
            LookupResult::Found(v) => return Ok(Some(v)),
            LookupResult::Deleted => return Ok(None),
            LookupResult::NotFound => {}
        }
    }

    match current.get(&engine.inner.table_cache, key)? {
        LookupResult::Found(v) => Ok(Some(v)),
        LookupResult::Deleted | LookupResult::NotFound => Ok(None),
    }
}

#[cfg(test)]
#[path = "tests/read_tests.rs"]
mod read_tests;
