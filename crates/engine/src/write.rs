//! Write path: `put`, `delete`, write admission (`make_room_for_write`), the
//! background compaction task, and the flush-on-close that makes a clean
//! shutdown durable.

use std::sync::Arc;
use std::time::Duration;

use memtable::{MemTable, ValueKind};

use crate::manifest::set_current_file;
use crate::{Engine, EngineError, EngineState};

/// What a write is cleared to do once admission succeeds: a fresh sequence
/// number and the memtable to apply it to. The memtable is captured before
/// the state lock is released, so the mutation itself lands without
/// holding the engine mutex across the call.
struct Admission {
    seq: u64,
    mem: Arc<MemTable>,
}

fn make_room_for_write(engine: &Engine) -> Admission {
    let mut state = engine.inner.state.lock().expect("engine state lock poisoned");
    loop {
        if state.current.files[0].len() >= engine.inner.options.l0_slowdown_write_trigger {
            drop(state);
            std::thread::sleep(Duration::from_micros(1000));
            state = engine.inner.state.lock().expect("engine state lock poisoned");
            continue;
        }

        if state.mem.approximate_memory_usage() <= engine.inner.options.write_buffer_size {
            let seq = state.next_seq;
            state.next_seq += 1;
            return Admission {
                seq,
                mem: state.mem.clone(),
            };
        }

        if state.imm.is_some() {
            state = engine.inner.cond.wait(state).expect("engine state lock poisoned");
        } else {
            state.imm = Some(state.mem.clone());
            state.mem = Arc::new(MemTable::new());
            maybe_schedule_compaction(engine, &mut state);
        }
    }
}

fn maybe_schedule_compaction(engine: &Engine, state: &mut EngineState) {
    if state.bg_compaction_scheduled {
        return;
    }
    state.bg_compaction_scheduled = true;
    let engine = engine.clone();
    std::thread::spawn(move || background_call(&engine));
}

/// Runs one round of background work — a minor compaction of `imm` if one
/// is sealed, followed by major compaction until the catalog is back under
/// budget — and installs the result as the new `current` Version.
fn background_compaction(engine: &Engine) -> Result<(), EngineError> {
    let (imm, mut version, sequence) = {
        let state = engine.inner.state.lock().expect("engine state lock poisoned");
        (state.imm.clone(), state.current.copy(), state.next_seq)
    };

    if let Some(imm) = &imm {
        version.write_level0_table(&engine.inner.dbname, imm)?;
    }
    while version.do_compaction_work(&engine.inner.dbname, &engine.inner.table_cache)? {}

    version.sequence = sequence;
    let descriptor_number = version.save(&engine.inner.dbname)?;
    set_current_file(&engine.inner.dbname, descriptor_number)?;

    let mut state = engine.inner.state.lock().expect("engine state lock poisoned");
    state.imm = None;
    state.current = Arc::new(version);
    Ok(())
}

/// The body of the spawned background-compaction thread. A failed round
/// leaves `current`/`imm` untouched and, if a sealed memtable is still
/// waiting to be flushed, re-arms itself so the next round picks up where
/// this one left off.
fn background_call(engine: &Engine) {
    let result = background_compaction(engine);
    if let Err(ref e) = result {
        eprintln!("background compaction failed, will retry: {e}");
    }

    let mut state = engine.inner.state.lock().expect("engine state lock poisoned");
    state.bg_compaction_scheduled = false;
    if result.is_err() && state.imm.is_some() {
        maybe_schedule_compaction(engine, &mut state);
    }
    engine.inner.cond.notify_all();
}

pub(crate) fn put(engine: &Engine, key: &[u8], value: &[u8]) -> Result<(), EngineError> {
    let admission = make_room_for_write(engine);
    admission.mem.add(admission.seq, ValueKind::Value, key, value);
    Ok(())
}

pub(crate) fn delete(engine: &Engine, key: &[u8]) -> Result<(), EngineError> {
    let admission = make_room_for_write(engine);
    admission.mem.add(admission.seq, ValueKind::Deletion, key, &[]);
    Ok(())
}

/// Seals the active memtable (if it holds anything) the same way
/// `make_room_for_write` does when a write trips the buffer-size threshold,
/// so a clean close flushes through to a new `Version` instead of leaving
/// the last batch of writes live only in memory.
fn flush_active_memtable(engine: &Engine) {
    let mut state = engine.inner.state.lock().expect("engine state lock poisoned");
    if state.mem.is_empty() {
        return;
    }
    state.imm = Some(state.mem.clone());
    state.mem = Arc::new(MemTable::new());
    maybe_schedule_compaction(engine, &mut state);
}

pub(crate) fn close(engine: &Engine) {
    engine.inner.await_background_work();
    flush_active_memtable(engine);
    engine.inner.await_background_work();
}

#[cfg(test)]
#[path = "tests/write_tests.rs"]
mod write_tests;
