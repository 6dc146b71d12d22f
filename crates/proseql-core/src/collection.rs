use crate::index::CollectionIndexes;
use crate::model::{CollectionConfig, RelationshipDef};
use crate::persistence::{stamp_version, DebouncedWriter};
use crate::state::CollectionState;
use crate::value::Value;

///
/// Collection
///
/// A single named collection's live state plus everything the engine
/// needs to mutate it correctly: its configuration (schema, relationships,
/// hooks, ...), its secondary/search indexes, and, if configured, a
/// debounced persistence writer (spec.md §3/§4.10).
///
pub struct Collection {
    pub config: CollectionConfig,
    pub state: CollectionState,
    pub indexes: CollectionIndexes,
    pub writer: Option<DebouncedWriter>,
}

impl Collection {
    #[must_use]
    pub fn new(config: CollectionConfig) -> Self {
        let indexes = CollectionIndexes::new(&config.indexes, &config.search);
        let writer = config.persistence.as_ref().and_then(|persistence| {
            persistence
                .codecs
                .for_path(&persistence.path)
                .ok()
                .map(|codec| {
                    DebouncedWriter::new(
                        persistence.path.clone(),
                        persistence.adapter.clone(),
                        codec,
                        persistence.debounce,
                    )
                })
        });
        Self {
            config,
            state: CollectionState::new(),
            indexes,
            writer,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    #[must_use]
    pub fn relationship(&self, name: &str) -> Option<&RelationshipDef> {
        self.config.relationship(name)
    }

    /// Schedules a debounced persistence write of the collection's current
    /// snapshot, encoded through its schema and stamped with its declared
    /// version (spec.md §4.10). A no-op for collections without
    /// persistence configured.
    pub fn persist(&self) {
        let (Some(writer), Some(persistence)) = (&self.writer, &self.config.persistence) else {
            return;
        };
        let snapshot = self.state.snapshot();
        let encoded: Vec<(String, Value)> = snapshot
            .iter()
            .map(|(id, entity)| (id.clone(), self.config.schema.encode(entity)))
            .collect();
        let stamped = stamp_version(Value::Map(encoded), persistence.version);
        writer.schedule(stamped);
    }
}
