//! # proseql
//!
//! `proseql` is the public facade crate for the ProseQL embedded document
//! database. It is the recommended dependency for applications; the
//! query pipeline, CRUD mutation logic, indexing, and persistence
//! internals live in `proseql-core` and are reached through `__internal`
//! when an application needs them directly (custom codecs, storage
//! adapters, property tests).
//!
//! ## Crate layout
//!
//! - `db`
//!   The public database facade: `Database` and `CollectionHandle`,
//!   covering the CRUD/query/watch surface of spec.md §6.
//!
//! ## Prelude
//!
//! `prelude` re-exports the vocabulary most call sites need: the value
//! model, collection/database configuration, the query spec types, and
//! the facade handles themselves.

pub mod db;

pub use proseql_core::error::{Error, Result};
pub use proseql_core::model::{CollectionConfig, RelationshipDef, RelationshipKind, UniqueConstraint};
pub use proseql_core::query::{
    AggregateResult, AggregateSpec, Cursor, Op, PageInfo, PageResult, Pagination, Predicate, QuerySpec,
    Quantifier, Select, SelectChild, SortDirection, SortKey,
};
pub use proseql_core::schema::{FieldKind, FieldSchema, Schema};
pub use proseql_core::value::Value;

pub use db::{CollectionHandle, Database};
pub use proseql_core::db::DatabaseConfig;

pub mod prelude {
    pub use crate::db::{CollectionHandle, Database};
    pub use crate::{CollectionConfig, DatabaseConfig, Error, FieldKind, FieldSchema, QuerySpec, Result, Schema, Value};
}

/// Full engine internals: custom storage adapters and codecs, the raw
/// CRUD functions, hooks, and persistence plumbing. Not covered by the
/// same stability expectations as the rest of this crate.
#[doc(hidden)]
pub mod __internal {
    pub use proseql_core as core;
}
