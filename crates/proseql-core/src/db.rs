use crate::bus::ChangeBus;
use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::model::CollectionConfig;
use crate::persistence::{load_collection, MemoryAdapter, StorageAdapter};
use crate::query::{PopulateSource, RelationSnapshot};
use crate::value::Value;
use indexmap::IndexMap;
use std::sync::Arc;

///
/// DatabaseConfig
///
/// Assembles a `Database` from an ordered list of `CollectionConfig`s
/// (spec.md §4.11). Cross-collection relationship targets are validated
/// up front, at `build()` time, so a typo in a relationship's target
/// collection fails fast rather than on first query.
///
#[derive(Default)]
pub struct DatabaseConfig {
    collections: Vec<CollectionConfig>,
}

impl DatabaseConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_collection(mut self, config: CollectionConfig) -> Self {
        self.collections.push(config);
        self
    }

    fn validate(&self) -> Result<()> {
        let names: Vec<&str> = self.collections.iter().map(|c| c.name.as_str()).collect();
        for config in &self.collections {
            for rel in &config.relationships {
                if !names.contains(&rel.target.as_str()) {
                    return Err(Error::validation(
                        &config.name,
                        format!(
                            "relationship {:?} targets unknown collection {:?}",
                            rel.name, rel.target
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn build(self) -> Result<Database> {
        Database::new(self)
    }
}

///
/// Database
///
/// Owns every collection's live state and the process-wide change bus
/// (spec.md §4.9, §5). Collection state, index state, and the search
/// index are mutated only through the `crud` module's pipelines; the
/// `Database` itself is otherwise just a read-only registry plus the bus.
///
pub struct Database {
    collections: IndexMap<String, Collection>,
    bus: ChangeBus,
}

impl Database {
    pub fn new(config: DatabaseConfig) -> Result<Self> {
        config.validate()?;
        let collections = config
            .collections
            .into_iter()
            .map(|c| (c.name.clone(), Collection::new(c)))
            .collect();
        Ok(Self {
            collections,
            bus: ChangeBus::new(),
        })
    }

    pub fn collection(&self, name: &str) -> Result<&Collection> {
        self.collections
            .get(name)
            .ok_or_else(|| Error::OperationError {
                reason: format!("no such collection: {name:?}"),
            })
    }

    /// Iterates every registered collection, ordered as declared in the
    /// `DatabaseConfig` (spec.md §5 "fixed lexicographic order" applies to
    /// lock acquisition for cross-collection mutations, not to iteration
    /// order here, which stays declaration order for determinism).
    pub fn collections_iter(&self) -> impl Iterator<Item = (&String, &Collection)> {
        self.collections.iter()
    }

    #[must_use]
    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    /// Loads every collection with a configured persistence path from
    /// disk, applying migrations as needed (spec.md §4.10/§6). Rewritten
    /// (migrated) collections are flushed back immediately.
    pub fn load(&self) -> Result<()> {
        for collection in self.collections.values() {
            let Some(persistence) = &collection.config.persistence else {
                continue;
            };
            if !persistence.adapter.exists(&persistence.path) {
                continue;
            }
            let bytes = persistence.adapter.read(&persistence.path)?;
            let codec = persistence.codecs.for_path(&persistence.path)?;
            let raw = codec.decode(&bytes)?;
            let loaded = load_collection(
                &collection.config.name,
                raw,
                persistence.version,
                &persistence.migrations,
                &collection.config.schema,
            )?;
            let Value::Map(rows) = loaded.entities else {
                continue;
            };
            collection.state.install(rows.into_iter().collect());
            for (id, entity) in collection.state.snapshot().iter() {
                collection.indexes.insert(id, entity);
            }
            if loaded.needs_rewrite {
                collection.persist();
                if let Some(writer) = &collection.writer {
                    writer.flush()?;
                }
            }
        }
        Ok(())
    }

    /// Forces every collection's pending debounced write to disk
    /// immediately (spec.md §4.10 "`close()` flushes all pending
    /// writers").
    pub fn flush(&self) -> Result<()> {
        for collection in self.collections.values() {
            if let Some(writer) = &collection.writer {
                writer.flush()?;
            }
        }
        Ok(())
    }
}

///
/// CollectionContext
///
/// A `RelationSnapshot` scoped to one collection — `eval()` needs the
/// *current* collection's relationship declarations to resolve `Rel`/
/// `RelMany` predicate leaves, which `Database` alone can't supply since
/// the same field name may mean different things in different
/// collections.
///
pub struct CollectionContext<'a> {
    db: &'a Database,
    collection: &'a str,
}

impl<'a> CollectionContext<'a> {
    #[must_use]
    pub fn new(db: &'a Database, collection: &'a str) -> Self {
        Self { db, collection }
    }
}

impl RelationSnapshot for CollectionContext<'_> {
    fn ref_target(&self, field: &str, entity: &Value) -> Option<Value> {
        let rel = self.db.collection(self.collection).ok()?.relationship(field)?;
        let fk = entity.get(&rel.foreign_key)?;
        let target_id = fk.as_str()?;
        self.db.collection(&rel.target).ok()?.state.get(target_id)
    }

    fn inverse_targets(&self, field: &str, entity_id: &str) -> Vec<Value> {
        let Some(rel) = self
            .db
            .collection(self.collection)
            .ok()
            .and_then(|c| c.relationship(field))
        else {
            return Vec::new();
        };
        let Ok(target) = self.db.collection(&rel.target) else {
            return Vec::new();
        };
        target
            .state
            .snapshot()
            .values()
            .filter(|entity| {
                entity.get(&rel.foreign_key).and_then(Value::as_str) == Some(entity_id)
            })
            .cloned()
            .collect()
    }

    fn default_search_fields(&self) -> Option<Vec<String>> {
        None
    }
}

impl PopulateSource for Database {
    fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.collections.get(collection)?.state.get(id)
    }

    fn scan_by_field(&self, collection: &str, field: &str, value: &str) -> Vec<(String, Value)> {
        let Some(col) = self.collections.get(collection) else {
            return Vec::new();
        };
        col.state
            .snapshot()
            .iter()
            .filter(|(_, entity)| entity.get(field).and_then(Value::as_str) == Some(value))
            .map(|(id, entity)| (id.clone(), entity.clone()))
            .collect()
    }

    fn relationships(&self, collection: &str) -> Vec<crate::model::RelationshipDef> {
        self.collections
            .get(collection)
            .map(|c| c.config.relationships.clone())
            .unwrap_or_default()
    }
}

/// Convenience constructor for tests and quick-start usage: an
/// in-memory-only database with no persistence wired up.
#[must_use]
pub fn in_memory_adapter() -> Arc<dyn StorageAdapter> {
    Arc::new(MemoryAdapter::new())
}
