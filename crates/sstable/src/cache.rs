//! `TableCache`: a bounded LRU of open [`Table`] handles keyed by file
//! number.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use memtable::LookupResult;

use crate::table::{Table, TableIterator};
use crate::TableError;

/// `MAX_OPEN_FILES - NUM_NON_TABLE_CACHE_FILES`.
pub const MAX_OPEN_FILES: usize = 1000;
pub const NUM_NON_TABLE_CACHE_FILES: usize = 10;
pub const TABLE_CACHE_CAPACITY: usize = MAX_OPEN_FILES - NUM_NON_TABLE_CACHE_FILES;

struct Lru {
    capacity: usize,
    tables: HashMap<u64, Arc<Table>>,
    /// Recency order, oldest first. Linear eviction scan is fine at this
    /// capacity (under 1000 entries).
    order: Vec<u64>,
}

impl Lru {
    fn touch(&mut self, number: u64) {
        self.order.retain(|&n| n != number);
        self.order.push(number);
    }
}

/// Bounded, thread-safe cache of open `Table`s. A mutex serializes the
/// open-or-insert path; `Table` itself is internally synchronized so
/// lookups against an already-cached table don't contend on this lock.
pub struct TableCache {
    dbname: PathBuf,
    inner: Mutex<Lru>,
}

impl TableCache {
    pub fn new(dbname: impl Into<PathBuf>) -> Self {
        Self {
            dbname: dbname.into(),
            inner: Mutex::new(Lru {
                capacity: TABLE_CACHE_CAPACITY,
                tables: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    fn table_path(&self, number: u64) -> PathBuf {
        self.dbname.join(format!("{:06}.ldb", number))
    }

    /// Returns the cached `Table` for `number`, opening and inserting it
    /// if necessary. Evicts the least-recently-used entry if the cache is
    /// at capacity.
    pub fn find(&self, number: u64) -> Result<Arc<Table>, TableError> {
        let mut lru = self.inner.lock().expect("table cache lock poisoned");
        if let Some(t) = lru.tables.get(&number) {
            let t = Arc::clone(t);
            lru.touch(number);
            return Ok(t);
        }

        let path = self.table_path(number);
        let table = Arc::new(Table::open(&path)?);

        if lru.tables.len() >= lru.capacity {
            if let Some(&victim) = lru.order.first() {
                lru.order.remove(0);
                lru.tables.remove(&victim);
            }
        }
        lru.tables.insert(number, Arc::clone(&table));
        lru.touch(number);
        Ok(table)
    }

    pub fn get(&self, number: u64, user_key: &[u8]) -> Result<LookupResult, TableError> {
        let table = self.find(number)?;
        table.get(user_key)
    }

    /// Returns a fresh iterator over the named table, anchored to a
    /// cache-held `Arc<Table>` so the table outlives any eviction of the
    /// cache slot while this iterator is in use.
    pub fn new_iterator(&self, number: u64) -> Result<TableIterator, TableError> {
        let table = self.find(number)?;
        Ok(TableIterator::new(table))
    }

    /// Drops a table from the cache, closing its backing file handle once
    /// every other holder (e.g. an in-flight iterator's `Arc`) is done
    /// with it.
    pub fn evict(&self, number: u64) {
        let mut lru = self.inner.lock().expect("table cache lock poisoned");
        lru.tables.remove(&number);
        lru.order.retain(|&n| n != number);
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod cache_tests;
