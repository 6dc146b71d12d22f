use proseql_core::bus::ChangeEvent;
use proseql_core::crud::{
    self, CreateManyOptions, CreateManyOutcome, DeleteManyOptions, DeleteManyOutcome, DeleteOptions,
    DeleteOutcome, DeleteWithRelationshipsOptions, Patch, RelationshipInput, UpdateManyOptions,
    UpdateManyOutcome, UpsertOutcome,
};
use proseql_core::db::{CollectionContext, Database as CoreDatabase, DatabaseConfig};
use proseql_core::error::Result;
use proseql_core::query::{aggregate, eval, run_query, AggregateResult, AggregateSpec, PageResult, Predicate, QuerySpec};
use proseql_core::value::Value;
use proseql_core::watch;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::Stream;

/// The public database handle (spec.md §6). Cheap to clone: wraps an
/// `Arc<proseql_core::db::Database>` so every `CollectionHandle` can hold
/// its own clone without borrowing from `Database` itself.
#[derive(Clone)]
pub struct Database {
    inner: Arc<CoreDatabase>,
}

impl Database {
    pub fn new(config: DatabaseConfig) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(CoreDatabase::new(config)?),
        })
    }

    /// Loads every collection with configured persistence from disk
    /// (spec.md §4.10).
    pub fn load(&self) -> Result<()> {
        self.inner.load()
    }

    /// Flushes all pending debounced writes (spec.md §4.10 `close()`).
    pub fn flush(&self) -> Result<()> {
        self.inner.flush()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.bus().subscribe()
    }

    #[must_use]
    pub fn collection(&self, name: impl Into<String>) -> CollectionHandle {
        CollectionHandle {
            db: self.inner.clone(),
            name: name.into(),
        }
    }
}

/// A handle scoped to one named collection, exposing the full CRUD/query
/// surface of spec.md §6 as ergonomic methods.
#[derive(Clone)]
pub struct CollectionHandle {
    db: Arc<CoreDatabase>,
    name: String,
}

impl CollectionHandle {
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<Value> {
        self.db.collection(&self.name).ok()?.state.get(id)
    }

    pub fn create(&self, input: Value) -> Result<Value> {
        crud::create(&self.db, &self.name, input)
    }

    pub fn create_many(&self, inputs: Vec<Value>, opts: CreateManyOptions) -> Result<CreateManyOutcome> {
        crud::create_many(&self.db, &self.name, inputs, opts)
    }

    pub fn create_with_relationships(
        &self,
        input: Value,
        relations: Vec<(String, RelationshipInput)>,
    ) -> Result<Value> {
        crud::create_with_relationships(&self.db, &self.name, input, relations)
    }

    pub fn update(&self, id: &str, patch: Value) -> Result<Value> {
        crud::update(&self.db, &self.name, id, patch)
    }

    pub fn update_many(&self, predicate: &Predicate, patch: &Patch, opts: UpdateManyOptions) -> Result<UpdateManyOutcome> {
        let ctx = CollectionContext::new(&self.db, &self.name);
        crud::update_many(&self.db, &self.name, predicate, patch, opts, &ctx)
    }

    pub fn upsert(&self, where_clause: &Value, create_data: Value, update_patch: Value) -> Result<UpsertOutcome> {
        crud::upsert(&self.db, &self.name, where_clause, create_data, update_patch)
    }

    pub fn upsert_many(&self, items: Vec<(Value, Value, Value)>) -> Result<Vec<UpsertOutcome>> {
        crud::upsert_many(&self.db, &self.name, items)
    }

    pub fn delete(&self, id: &str, opts: DeleteOptions) -> Result<DeleteOutcome> {
        crud::delete(&self.db, &self.name, id, opts)
    }

    pub fn delete_many(&self, predicate: &Predicate, opts: DeleteManyOptions) -> Result<DeleteManyOutcome> {
        let ctx = CollectionContext::new(&self.db, &self.name);
        crud::delete_many(&self.db, &self.name, predicate, opts, &ctx)
    }

    pub fn delete_with_relationships(&self, id: &str, opts: DeleteWithRelationshipsOptions) -> Result<DeleteOutcome> {
        crud::delete_with_relationships(&self.db, &self.name, id, opts)
    }

    pub fn query(&self, spec: &QuerySpec) -> Result<PageResult> {
        let col = self.db.collection(&self.name)?;
        let ctx = CollectionContext::new(&self.db, &self.name);
        run_query(
            &self.name,
            &col.state,
            &col.indexes,
            spec,
            &ctx,
            self.db.as_ref(),
            &col.config.computed,
        )
    }

    /// `aggregate` (spec.md §4.6): filters the live snapshot by an optional
    /// predicate, then reduces the matched rows per `spec`.
    pub fn aggregate(&self, predicate: Option<&Predicate>, spec: &AggregateSpec) -> Result<Vec<AggregateResult>> {
        let col = self.db.collection(&self.name)?;
        let ctx = CollectionContext::new(&self.db, &self.name);
        let snapshot = col.state.snapshot();
        let rows: Vec<Value> = snapshot
            .iter()
            .filter(|(id, entity)| predicate.is_none_or(|p| eval(p, id, entity, &ctx)))
            .map(|(_, entity)| entity.clone())
            .collect();
        Ok(aggregate(&rows, spec))
    }

    #[must_use]
    pub fn watch(&self, spec: QuerySpec) -> impl Stream<Item = Result<Vec<Value>>> {
        watch::watch(self.db.clone(), self.name.clone(), spec)
    }

    #[must_use]
    pub fn watch_by_id(&self, id: impl Into<String>) -> impl Stream<Item = Result<Option<Value>>> {
        watch::watch_by_id(self.db.clone(), self.name.clone(), id)
    }
}
