use crate::value::Value;
use thiserror::Error as ThisError;

///
/// Error
///
/// Closed error taxonomy for the engine (spec.md §7). Every failure mode is
/// a distinct, pattern-matchable variant carrying structured context;
/// messages never embed implementation-detail types, only collection
/// names, field names, ids and values, per spec.md's propagation policy.
///

#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum Error {
    #[error("validation failed for {collection}: {reason}")]
    Validation {
        collection: String,
        reason: String,
        field_path: Option<String>,
    },

    #[error("duplicate key: {collection} already has an entity with id {id:?}")]
    DuplicateKey { collection: String, id: String },

    #[error(
        "unique constraint {constraint} violated on {collection} fields {fields:?} \
         (existing id {existing_id:?})"
    )]
    UniqueConstraint {
        collection: String,
        constraint: String,
        fields: Vec<String>,
        values: Vec<(String, Value)>,
        existing_id: String,
    },

    #[error(
        "foreign key violation: {source_collection}.{field} -> {target_collection} (id {id:?})"
    )]
    ForeignKey {
        source_collection: String,
        target_collection: String,
        field: String,
        id: String,
        reason: ForeignKeyReason,
    },

    #[error("{collection} has no entity with id {id:?}")]
    NotFound { collection: String, id: String },

    #[error("dangling reference: {collection}.{field} -> missing id {target_id:?}")]
    DanglingReference {
        collection: String,
        field: String,
        target_id: String,
    },

    #[error("population error on {collection}.{field}: {reason}")]
    Population {
        collection: String,
        field: String,
        reason: String,
    },

    #[error("operation error: {reason}")]
    OperationError { reason: String },

    #[error("concurrency conflict on {collection} id {id:?}: expected version {expected}, found {found}")]
    Concurrency {
        collection: String,
        id: String,
        expected: u64,
        found: u64,
    },

    #[error("hook {hook} failed on {collection}: {reason}")]
    Hook {
        collection: String,
        hook: &'static str,
        reason: String,
    },

    #[error("transaction aborted: {reason}")]
    Transaction { reason: String },

    #[error("storage error at {path}: {reason}")]
    Storage { path: String, reason: String },

    #[error("serialization error in {collection}: {reason}")]
    Serialization { collection: String, reason: String },

    #[error("unsupported format for extension {extension:?}")]
    UnsupportedFormat { extension: String },

    #[error("migration error for {collection}: {reason}")]
    Migration {
        collection: String,
        step: i64,
        reason: String,
    },

    #[error("plugin conflict: operator {name:?} is already registered")]
    Plugin { name: String },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ForeignKeyReason {
    MissingTarget,
    BlockingDependents,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    #[must_use]
    pub fn validation(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            collection: collection.into(),
            reason: reason.into(),
            field_path: None,
        }
    }

    #[must_use]
    pub fn validation_at(
        collection: impl Into<String>,
        field_path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Validation {
            collection: collection.into(),
            reason: reason.into(),
            field_path: Some(field_path.into()),
        }
    }
}
