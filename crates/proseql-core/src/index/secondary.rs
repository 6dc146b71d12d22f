use crate::value::Value;
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use std::sync::Arc;

///
/// SecondaryIndex
///
/// An exact-match index over one field: value -> ordered set of ids. Backs
/// the index-assisted pre-filter step of the query pipeline (spec.md §4.5
/// step 1), turning an equality or `$in` on an indexed field into a direct
/// id-set lookup instead of a full scan.
///

pub struct SecondaryIndex {
    field: String,
    by_value: RwLock<IndexMap<IndexKey, IndexSet<String>>>,
}

/// `Value` isn't `Hash`; index keys are built from its canonical string
/// form so `Int(1)` and `Float(1.0)` still land in distinct buckets (index
/// lookups are an optimisation over the filter stage, which already does
/// numeric-aware comparison; a mismatch here only costs a wider scan).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
struct IndexKey(String);

fn index_key(value: &Value) -> Option<IndexKey> {
    if value.is_null() {
        return None;
    }
    Some(IndexKey(format!("{}:{value}", value.type_name())))
}

impl SecondaryIndex {
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            by_value: RwLock::new(IndexMap::new()),
        }
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn insert(&self, id: &str, entity: &Value) {
        let Some(value) = entity.get(&self.field) else {
            return;
        };
        let Some(key) = index_key(value) else {
            return;
        };
        self.by_value
            .write()
            .entry(key)
            .or_default()
            .insert(id.to_string());
    }

    pub fn remove(&self, id: &str, entity: &Value) {
        let Some(value) = entity.get(&self.field) else {
            return;
        };
        let Some(key) = index_key(value) else {
            return;
        };
        let mut guard = self.by_value.write();
        if let Some(ids) = guard.get_mut(&key) {
            ids.shift_remove(id);
            if ids.is_empty() {
                guard.shift_remove(&key);
            }
        }
    }

    /// Re-indexes `id` from `before` to `after` (spec.md §4.7 `update` step 7).
    pub fn reindex(&self, id: &str, before: &Value, after: &Value) {
        self.remove(id, before);
        self.insert(id, after);
    }

    #[must_use]
    pub fn lookup_eq(&self, value: &Value) -> Option<Arc<[String]>> {
        let key = index_key(value)?;
        self.by_value
            .read()
            .get(&key)
            .map(|ids| ids.iter().cloned().collect::<Vec<_>>().into())
    }

    #[must_use]
    pub fn lookup_in(&self, values: &[Value]) -> IndexSet<String> {
        let guard = self.by_value.read();
        let mut out = IndexSet::new();
        for value in values {
            if let Some(key) = index_key(value) {
                if let Some(ids) = guard.get(&key) {
                    out.extend(ids.iter().cloned());
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_eq_finds_inserted_rows() {
        let index = SecondaryIndex::new("genre");
        let entity = Value::Map(vec![("genre".into(), Value::Text("scifi".into()))]);
        index.insert("b1", &entity);
        let hits = index.lookup_eq(&Value::Text("scifi".into())).unwrap();
        assert_eq!(&*hits, &["b1".to_string()]);
    }

    #[test]
    fn reindex_moves_id_between_buckets() {
        let index = SecondaryIndex::new("genre");
        let before = Value::Map(vec![("genre".into(), Value::Text("scifi".into()))]);
        let after = Value::Map(vec![("genre".into(), Value::Text("drama".into()))]);
        index.insert("b1", &before);
        index.reindex("b1", &before, &after);
        assert!(index.lookup_eq(&Value::Text("scifi".into())).is_none());
        assert_eq!(
            &*index.lookup_eq(&Value::Text("drama".into())).unwrap(),
            &["b1".to_string()]
        );
    }

    #[test]
    fn null_field_values_are_never_indexed() {
        let index = SecondaryIndex::new("genre");
        let entity = Value::Map(vec![("genre".into(), Value::Null)]);
        index.insert("b1", &entity);
        assert!(index.lookup_eq(&Value::Null).is_none());
    }
}
