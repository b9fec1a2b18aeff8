//! # OrderedList
//!
//! A probabilistic, ordered, in-memory list (a skip list) used by
//! [`memtable`](../memtable/index.html) to keep entries sorted without the
//! rebalancing cost of a tree.
//!
//! The list is generic over any `T: Ord + Clone`; callers that need a
//! non-default ordering (the memtable's internal-key ordering, which breaks
//! ties on sequence number) simply give `T` the right `Ord` impl instead of
//! threading a comparator object through every call, which keeps the API
//! surface small and lets the compiler check ordering at each call site.
//!
//! Concurrency follows a single-writer, many-reader discipline: every
//! mutation takes the list's [`RwLock`] for writing, every read (`contains`,
//! iteration) takes it for reading. Nodes are append-only and never
//! unlinked, so readers that already hold a node index never observe it
//! becoming invalid.

use std::cmp::Ordering;
use std::sync::{Arc, RwLock};

use rand::Rng;

/// Maximum number of levels a node may participate in.
pub const MAX_HEIGHT: usize = 12;
/// Inverse probability of a node growing to the next level (1 in `BRANCHING`).
pub const BRANCHING: u32 = 4;

struct Node<T> {
    key: Arc<T>,
    next: Vec<Option<usize>>,
}

struct Inner<T> {
    arena: Vec<Node<T>>,
    head: Vec<Option<usize>>,
    height: usize,
}

impl<T: Ord> Inner<T> {
    /// Returns the arena index of the first node whose key is `>= key`,
    /// together with, for every level, the index of the last node before it
    /// (or `None` if `key` would land before everything at that level).
    fn find_greater_or_equal(&self, key: &T) -> (Option<usize>, [Option<usize>; MAX_HEIGHT]) {
        let mut prev = [None; MAX_HEIGHT];
        let mut level = self.height;
        let mut cur: Option<usize> = None;
        let mut landing = None;
        loop {
            level -= 1;
            let mut from = match cur {
                Some(idx) => self.arena[idx].next.get(level).copied().flatten(),
                None => self.head.get(level).copied().flatten(),
            };
            loop {
                match from {
                    Some(idx) if self.arena[idx].key.as_ref() < key => {
                        cur = Some(idx);
                        from = self.arena[idx].next.get(level).copied().flatten();
                    }
                    next => {
                        prev[level] = cur;
                        landing = next;
                        break;
                    }
                }
            }
            if level == 0 {
                return (landing, prev);
            }
        }
    }

    fn find_less_than(&self, key: &T) -> Option<usize> {
        let mut level = self.height;
        let mut cur: Option<usize> = None;
        loop {
            level -= 1;
            let mut from = match cur {
                Some(idx) => self.arena[idx].next.get(level).copied().flatten(),
                None => self.head.get(level).copied().flatten(),
            };
            loop {
                match from {
                    Some(idx) if self.arena[idx].key.as_ref() < key => {
                        cur = idx.into();
                        from = self.arena[idx].next.get(level).copied().flatten();
                    }
                    _ => break,
                }
            }
            if level == 0 {
                return cur;
            }
        }
    }

    fn find_last(&self) -> Option<usize> {
        let mut level = self.height;
        let mut cur: Option<usize> = None;
        loop {
            level -= 1;
            let mut from = match cur {
                Some(idx) => self.arena[idx].next.get(level).copied().flatten(),
                None => self.head.get(level).copied().flatten(),
            };
            while let Some(idx) = from {
                cur = Some(idx);
                from = self.arena[idx].next.get(level).copied().flatten();
            }
            if level == 0 {
                return cur;
            }
        }
    }

    fn next_of(&self, idx: usize, level: usize) -> Option<usize> {
        self.arena[idx].next.get(level).copied().flatten()
    }
}

fn random_height<R: Rng>(rng: &mut R) -> usize {
    let mut height = 1;
    while height < MAX_HEIGHT && rng.gen_ratio(1, BRANCHING) {
        height += 1;
    }
    height
}

/// An ordered, in-memory skip list.
pub struct OrderedList<T> {
    inner: RwLock<Inner<T>>,
}

impl<T> Default for OrderedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OrderedList<T> {
    /// Creates a new, empty list.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                arena: Vec::new(),
                head: vec![None; MAX_HEIGHT],
                height: 1,
            }),
        }
    }
}

impl<T: Ord> OrderedList<T> {
    /// Inserts `key`, growing the list's effective height if the randomly
    /// chosen height for this node exceeds the current one.
    pub fn insert(&self, key: T) {
        let mut inner = self.inner.write().expect("ordered-list lock poisoned");
        let (_, mut prev) = inner.find_greater_or_equal(&key);

        let height = random_height(&mut rand::thread_rng());
        if height > inner.height {
            for level in inner.height..height {
                prev[level] = None;
            }
            inner.height = height;
        }

        let idx = inner.arena.len();
        inner.arena.push(Node {
            key: Arc::new(key),
            next: vec![None; height],
        });

        for level in 0..height {
            let next = match prev[level] {
                Some(p) => inner.next_of(p, level),
                None => inner.head[level],
            };
            inner.arena[idx].next[level] = next;
            match prev[level] {
                Some(p) => inner.arena[p].next[level] = Some(idx),
                None => inner.head[level] = Some(idx),
            }
        }
    }

    /// Returns `true` if the list contains a node equal to `key`.
    pub fn contains(&self, key: &T) -> bool {
        let inner = self.inner.read().expect("ordered-list lock poisoned");
        match inner.find_greater_or_equal(key).0 {
            Some(idx) => inner.arena[idx].key.as_ref() == key,
            None => false,
        }
    }

    /// Returns `true` if the list has no entries.
    pub fn is_empty(&self) -> bool {
        let inner = self.inner.read().expect("ordered-list lock poisoned");
        inner.arena.is_empty()
    }

    /// Returns the number of entries ever inserted.
    pub fn len(&self) -> usize {
        let inner = self.inner.read().expect("ordered-list lock poisoned");
        inner.arena.len()
    }
}

impl<T: Ord + Clone> OrderedList<T> {
    /// Returns an iterator positioned before the first element.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            current: None,
        }
    }
}

/// A cursor over an [`OrderedList`].
///
/// Every operation takes the list's lock for the duration of that single
/// operation only, rather than holding it across a whole traversal.
pub struct Iter<'a, T> {
    list: &'a OrderedList<T>,
    current: Option<usize>,
}

impl<'a, T: Ord> Iter<'a, T> {
    /// Returns `true` if the cursor is positioned on a valid entry.
    pub fn valid(&self) -> bool {
        self.current.is_some()
    }

    /// Returns the key at the cursor, cloned out from behind the shared arena.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is not [`valid`](Iter::valid).
    pub fn key(&self) -> Arc<T> {
        let inner = self.list.inner.read().expect("ordered-list lock poisoned");
        let idx = self.current.expect("key() called on invalid iterator");
        Arc::clone(&inner.arena[idx].key)
    }

    /// Advances to the next entry in ascending order.
    pub fn next(&mut self) {
        let inner = self.list.inner.read().expect("ordered-list lock poisoned");
        let idx = self.current.expect("next() called on invalid iterator");
        self.current = inner.next_of(idx, 0);
    }

    /// Moves to the last entry strictly less than the current one.
    pub fn prev(&mut self) {
        let inner = self.list.inner.read().expect("ordered-list lock poisoned");
        let idx = self.current.expect("prev() called on invalid iterator");
        let key = Arc::clone(&inner.arena[idx].key);
        self.current = inner.find_less_than(&key);
    }

    /// Positions the cursor at the first entry `>= target`.
    pub fn seek(&mut self, target: &T) {
        let inner = self.list.inner.read().expect("ordered-list lock poisoned");
        self.current = inner.find_greater_or_equal(target).0;
    }

    /// Positions the cursor at the first entry in the list.
    pub fn seek_to_first(&mut self) {
        let inner = self.list.inner.read().expect("ordered-list lock poisoned");
        self.current = inner.head[0];
    }

    /// Positions the cursor at the last entry in the list.
    pub fn seek_to_last(&mut self) {
        let inner = self.list.inner.read().expect("ordered-list lock poisoned");
        self.current = inner.find_last();
    }
}
