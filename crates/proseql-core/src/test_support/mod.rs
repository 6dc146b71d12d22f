//! A small `books`/`authors`/`posts`/`users` schema set shared across unit
//! tests (spec.md §8 scenarios), plus a ready-to-use `Database` builder.

use crate::db::{Database, DatabaseConfig};
use crate::model::{CollectionConfig, RelationshipDef, UniqueConstraint};
use crate::schema::{FieldKind, FieldSchema, Schema};

#[must_use]
pub fn authors_schema() -> Schema {
    Schema::new(
        "authors",
        vec![
            FieldSchema::new("id", FieldKind::Text),
            FieldSchema::new("name", FieldKind::Text),
            FieldSchema::new("email", FieldKind::Text),
        ],
    )
}

#[must_use]
pub fn books_schema() -> Schema {
    Schema::new(
        "books",
        vec![
            FieldSchema::new("id", FieldKind::Text),
            FieldSchema::new("title", FieldKind::Text),
            FieldSchema::new("authorId", FieldKind::Text),
            FieldSchema::new("year", FieldKind::Int).optional(),
        ],
    )
}

#[must_use]
pub fn posts_schema() -> Schema {
    Schema::new(
        "posts",
        vec![
            FieldSchema::new("id", FieldKind::Text),
            FieldSchema::new("title", FieldKind::Text),
            FieldSchema::new("body", FieldKind::Text),
            FieldSchema::new("authorId", FieldKind::Text),
        ],
    )
}

#[must_use]
pub fn users_schema() -> Schema {
    Schema::new(
        "users",
        vec![
            FieldSchema::new("id", FieldKind::Text),
            FieldSchema::new("handle", FieldKind::Text),
        ],
    )
}

/// A `books`/`authors`/`posts`/`users` database: each book refs its
/// author, each post refs its author, and the author declares an
/// inverse `books` relationship back. `authors.email` is unique.
#[must_use]
pub fn fixture_database() -> Database {
    let authors = CollectionConfig::new("authors", authors_schema())
        .with_unique(UniqueConstraint::single("email"))
        .with_relationship(RelationshipDef::inverse("books", "books", "author"));

    let books = CollectionConfig::new("books", books_schema())
        .with_index("authorId")
        .with_relationship(RelationshipDef::ref_to("author", "authors"));

    let posts = CollectionConfig::new("posts", posts_schema())
        .with_index("authorId")
        .with_relationship(RelationshipDef::ref_to("author", "authors"));

    let users = CollectionConfig::new("users", users_schema()).with_unique(UniqueConstraint::single("handle"));

    DatabaseConfig::new()
        .with_collection(authors)
        .with_collection(books)
        .with_collection(posts)
        .with_collection(users)
        .build()
        .expect("fixture schema is internally consistent")
}
