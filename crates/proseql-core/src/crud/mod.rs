mod create;
mod delete;
mod relationships;
mod update;
mod upsert;

pub use create::{create, create_many, CreateManyOptions, CreateManyOutcome, Skipped};
pub use delete::{
    delete, delete_many, delete_with_relationships, DeleteManyOptions, DeleteManyOutcome,
    DeleteOptions, DeleteOutcome, DeleteWithRelationshipsOptions, RelationshipPolicy,
};
pub use relationships::{create_with_relationships, RelationshipInput};
pub use update::{update, update_many, Patch, UpdateManyOptions, UpdateManyOutcome};
pub use upsert::{upsert, upsert_many, UpsertAction, UpsertOutcome};
