//! Per-session identity map for hydrated records.
//!
//! # Invariants
//! - At most one handle per key.
//! - Advisory only: entries mirror store operations but are never consulted
//!   instead of the store.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Maps a persisted primary key to the single shared in-memory record.
#[derive(Debug)]
pub struct IdentityCache<T> {
    entries: HashMap<i64, Rc<RefCell<T>>>,
}

impl<T> Default for IdentityCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> IdentityCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new reference to the cached handle for `id`.
    pub fn get(&self, id: i64) -> Option<Rc<RefCell<T>>> {
        self.entries.get(&id).map(Rc::clone)
    }

    /// Registers `handle` under `id`, replacing any previous entry.
    pub fn register(&mut self, id: i64, handle: &Rc<RefCell<T>>) {
        self.entries.insert(id, Rc::clone(handle));
    }

    /// Removes the entry for `id`, returning it when present.
    pub fn evict(&mut self, id: i64) -> Option<Rc<RefCell<T>>> {
        self.entries.remove(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
