use crate::error::{Error, Result};
use crate::value::Value;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;

///
/// CollectionState
///
/// The copy-on-write store behind a single collection (spec.md §4.1). Reads
/// take a cheap `Arc` clone of the current map and never block a concurrent
/// writer; writers build the next map from the previous one and swap it in
/// under a short-lived lock, so a reader holding an older snapshot keeps
/// seeing a consistent view for the lifetime of its borrow.
///

#[derive(Clone)]
pub struct CollectionState {
    current: Arc<Mutex<Arc<IndexMap<String, Value>>>>,
}

impl Default for CollectionState {
    fn default() -> Self {
        Self {
            current: Arc::new(Mutex::new(Arc::new(IndexMap::new()))),
        }
    }
}

impl CollectionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A point-in-time, lock-free view of every row, in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Arc<IndexMap<String, Value>> {
        Arc::clone(&self.current.lock())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Value> {
        self.snapshot().get(id).cloned()
    }

    /// Inserts `entity` under `id`, failing if one already exists
    /// (spec.md §4.7 `create`).
    pub fn try_insert(&self, collection: &str, id: String, entity: Value) -> Result<()> {
        let mut guard = self.current.lock();
        if guard.contains_key(&id) {
            return Err(Error::DuplicateKey {
                collection: collection.to_string(),
                id,
            });
        }
        let mut next = (**guard).clone();
        next.insert(id, entity);
        *guard = Arc::new(next);
        Ok(())
    }

    /// Installs `entities` as a single copy-on-write batch, preserving the
    /// order they're given in (spec.md §4.7 `createMany`).
    pub fn insert_many(&self, rows: Vec<(String, Value)>) {
        let mut guard = self.current.lock();
        let mut next = (**guard).clone();
        for (id, entity) in rows {
            next.insert(id, entity);
        }
        *guard = Arc::new(next);
    }

    /// Replaces an existing row wholesale, failing if it is missing
    /// (spec.md §4.7 `update`).
    pub fn replace(&self, collection: &str, id: &str, entity: Value) -> Result<Value> {
        let mut guard = self.current.lock();
        if !guard.contains_key(id) {
            return Err(Error::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        let mut next = (**guard).clone();
        let previous = next.insert(id.to_string(), entity).expect("checked above");
        *guard = Arc::new(next);
        Ok(previous)
    }

    /// Inserts `entity` under `id` unconditionally, creating or overwriting
    /// (spec.md §4.7 `upsert`).
    pub fn put(&self, id: String, entity: Value) -> Option<Value> {
        let mut guard = self.current.lock();
        let mut next = (**guard).clone();
        let previous = next.insert(id, entity);
        *guard = Arc::new(next);
        previous
    }

    /// Removes a row, returning its prior value if present
    /// (spec.md §4.7 `delete`).
    pub fn remove(&self, id: &str) -> Option<Value> {
        let mut guard = self.current.lock();
        if !guard.contains_key(id) {
            return None;
        }
        let mut next = (**guard).clone();
        let previous = next.shift_remove(id);
        *guard = Arc::new(next);
        previous
    }

    /// Removes many rows in one copy-on-write swap (spec.md §4.7 `deleteMany`).
    #[must_use]
    pub fn remove_many(&self, ids: &[String]) -> Vec<(String, Value)> {
        let mut guard = self.current.lock();
        let mut next = (**guard).clone();
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(value) = next.shift_remove(id) {
                removed.push((id.clone(), value));
            }
        }
        *guard = Arc::new(next);
        removed
    }

    /// Replaces the whole map atomically, used when reloading from disk
    /// (spec.md §6 "Load with migrations").
    pub fn install(&self, rows: IndexMap<String, Value>) {
        *self.current.lock() = Arc::new(rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_insert_rejects_duplicate_ids() {
        let state = CollectionState::new();
        state.try_insert("books", "b1".into(), Value::Null).unwrap();
        let err = state.try_insert("books", "b1".into(), Value::Null).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { .. }));
    }

    #[test]
    fn snapshot_is_unaffected_by_later_writes() {
        let state = CollectionState::new();
        state.try_insert("books", "b1".into(), Value::Int(1)).unwrap();
        let snapshot = state.snapshot();
        state.try_insert("books", "b2".into(), Value::Int(2)).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn remove_many_preserves_order_of_survivors() {
        let state = CollectionState::new();
        state.insert_many(vec![
            ("a".into(), Value::Int(1)),
            ("b".into(), Value::Int(2)),
            ("c".into(), Value::Int(3)),
        ]);
        state.remove_many(&["b".to_string()]);
        let snapshot = state.snapshot();
        let ids: Vec<&str> = snapshot.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
