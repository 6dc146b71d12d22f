mod foreign_key;
mod search;
mod secondary;
mod unique;

pub use foreign_key::{dependents, target_exists};
pub use search::{tokenize, SearchIndex};
pub use secondary::SecondaryIndex;
pub use unique::{constraint_key, constraint_values, find_conflict};

use crate::model::SearchConfig;
use indexmap::IndexMap;

///
/// IndexSet (collection-scoped)
///
/// The full indexing surface a single collection owns: one `SecondaryIndex`
/// per declared index field, and an optional `SearchIndex` (spec.md §4.4,
/// component 8 "Search Index"). Unique-constraint and foreign-key checks are
/// stateless scans over the live snapshot (see `unique`/`foreign_key`) and
/// so have no owned state here.
///

pub struct CollectionIndexes {
    by_field: IndexMap<String, SecondaryIndex>,
    search: Option<SearchIndex>,
}

impl CollectionIndexes {
    #[must_use]
    pub fn new(indexed_fields: &[String], search: &SearchConfig) -> Self {
        let by_field = indexed_fields
            .iter()
            .map(|f| (f.clone(), SecondaryIndex::new(f.clone())))
            .collect();
        let search = search.enabled.then(|| SearchIndex::new(search.fields.clone()));
        Self { by_field, search }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&SecondaryIndex> {
        self.by_field.get(name)
    }

    #[must_use]
    pub fn search(&self) -> Option<&SearchIndex> {
        self.search.as_ref()
    }

    pub fn insert(&self, id: &str, entity: &crate::value::Value) {
        for index in self.by_field.values() {
            index.insert(id, entity);
        }
        if let Some(search) = &self.search {
            search.insert(id, entity);
        }
    }

    pub fn remove(&self, id: &str, entity: &crate::value::Value) {
        for index in self.by_field.values() {
            index.remove(id, entity);
        }
        if let Some(search) = &self.search {
            search.remove(id, entity);
        }
    }

    pub fn reindex(&self, id: &str, before: &crate::value::Value, after: &crate::value::Value) {
        for index in self.by_field.values() {
            index.reindex(id, before, after);
        }
        if let Some(search) = &self.search {
            search.reindex(id, before, after);
        }
    }
}
