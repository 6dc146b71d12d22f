//! Concrete end-to-end scenarios from spec.md §8 (S1, S2, S4, S5), driven
//! entirely through the public `proseql_core` surface the way an embedding
//! application would use it.

use proseql_core::crud::{
    create, delete, CreateManyOptions, CreateManyOutcome, DeleteOptions,
};
use proseql_core::db::{CollectionContext, Database, DatabaseConfig};
use proseql_core::error::Error;
use proseql_core::model::{CollectionConfig, RelationshipDef, UniqueConstraint};
use proseql_core::query::{run_query, Op, Pagination, Predicate, QuerySpec, SortDirection, SortKey};
use proseql_core::schema::{FieldKind, FieldSchema, Schema};
use proseql_core::value::Value;

fn settings_database() -> Database {
    let schema = Schema::new(
        "settings",
        vec![
            FieldSchema::new("id", FieldKind::Text),
            FieldSchema::new("userId", FieldKind::Text),
            FieldSchema::new("settingKey", FieldKind::Text),
            FieldSchema::new("value", FieldKind::Text),
        ],
    );
    let settings = CollectionConfig::new("settings", schema)
        .with_unique(UniqueConstraint::compound(["userId", "settingKey"]));
    DatabaseConfig::new()
        .with_collection(settings)
        .build()
        .expect("settings schema is internally consistent")
}

fn setting(user_id: &str, key: &str, value: &str) -> Value {
    Value::Map(vec![
        ("userId".into(), Value::Text(user_id.into())),
        ("settingKey".into(), Value::Text(key.into())),
        ("value".into(), Value::Text(value.into())),
    ])
}

/// S1: insert a document, read it back by id, and see exactly what was
/// written plus the engine-managed lifecycle fields.
#[test]
fn s1_insert_then_read_by_id() {
    let db = settings_database();
    let created = create(&db, "settings", setting("u1", "theme", "dark")).unwrap();

    let id = created.get("id").and_then(Value::as_str).unwrap().to_string();
    let col = db.collection("settings").unwrap();
    let fetched = col.state.get(&id).expect("row should be readable by id immediately after create");

    assert_eq!(fetched.get("userId").unwrap().as_str(), Some("u1"));
    assert_eq!(fetched.get("settingKey").unwrap().as_str(), Some("theme"));
    assert_eq!(fetched.get("value").unwrap().as_str(), Some("dark"));
    assert!(fetched.get("createdAt").is_some());
    assert!(fetched.get("updatedAt").is_some());
}

/// S2: a compound unique constraint on (userId, settingKey) rejects a
/// second row with the same pair, with the exact error shape spec.md §8
/// calls for — constraint name, field list, offending values, and the id
/// of the row already holding them.
#[test]
fn s2_compound_unique_constraint_violation_has_exact_shape() {
    let db = settings_database();
    let first = create(&db, "settings", setting("u1", "theme", "dark")).unwrap();
    let first_id = first.get("id").and_then(Value::as_str).unwrap().to_string();

    let err = create(&db, "settings", setting("u1", "theme", "light")).unwrap_err();

    match err {
        Error::UniqueConstraint {
            collection,
            constraint,
            fields,
            values,
            existing_id,
        } => {
            assert_eq!(collection, "settings");
            assert_eq!(constraint, "unique_userId_settingKey");
            assert_eq!(fields, vec!["userId".to_string(), "settingKey".to_string()]);
            assert_eq!(
                values,
                vec![
                    ("userId".to_string(), Value::Text("u1".to_string())),
                    ("settingKey".to_string(), Value::Text("theme".to_string())),
                ]
            );
            assert_eq!(existing_id, first_id);
        }
        other => panic!("expected Error::UniqueConstraint, got {other:?}"),
    }
}

/// Same constraint, but across `createMany` with `skipDuplicates`: the
/// second write in the batch collides with the first and is reported as
/// skipped rather than aborting the whole call.
#[test]
fn s2_create_many_skips_in_batch_duplicates() {
    let db = settings_database();
    let CreateManyOutcome { created, skipped } = proseql_core::crud::create_many(
        &db,
        "settings",
        vec![
            setting("u1", "theme", "dark"),
            setting("u1", "theme", "light"),
            setting("u2", "theme", "dark"),
        ],
        CreateManyOptions { skip_duplicates: true },
    )
    .unwrap();

    assert_eq!(created.len(), 2);
    assert_eq!(skipped.len(), 1);
    assert!(skipped[0].reason.contains("unique_userId_settingKey"));
}

fn library_database() -> Database {
    let authors_schema = Schema::new(
        "authors",
        vec![
            FieldSchema::new("id", FieldKind::Text),
            FieldSchema::new("name", FieldKind::Text),
        ],
    );
    let books_schema = Schema::new(
        "books",
        vec![
            FieldSchema::new("id", FieldKind::Text),
            FieldSchema::new("title", FieldKind::Text),
            FieldSchema::new("authorId", FieldKind::Text),
        ],
    );
    let authors = CollectionConfig::new("authors", authors_schema)
        .with_relationship(RelationshipDef::inverse("books", "books", "author"));
    let books = CollectionConfig::new("books", books_schema)
        .with_index("authorId")
        .with_relationship(RelationshipDef::ref_to("author", "authors"));
    DatabaseConfig::new()
        .with_collection(authors)
        .with_collection(books)
        .build()
        .expect("library schema is internally consistent")
}

/// S4: deleting an author with books still referencing it is blocked
/// unconditionally (plain `delete` has no opt-out), and the whole
/// database is left byte-for-byte as it was before the attempt — no
/// partial mutation leaks out of the failed call.
#[test]
fn s4_restrict_failure_leaves_state_fully_unchanged() {
    let db = library_database();
    let author = create(&db, "authors", Value::Map(vec![("name".into(), Value::Text("Ursula".into()))])).unwrap();
    let author_id = author.get("id").and_then(Value::as_str).unwrap().to_string();
    create(
        &db,
        "books",
        Value::Map(vec![
            ("title".into(), Value::Text("The Dispossessed".into())),
            ("authorId".into(), Value::Text(author_id.clone())),
        ]),
    )
    .unwrap();

    let authors_before = db.collection("authors").unwrap().state.snapshot();
    let books_before = db.collection("books").unwrap().state.snapshot();

    let err = delete(&db, "authors", &author_id, DeleteOptions { soft: false }).unwrap_err();
    assert!(matches!(err, Error::ForeignKey { reason: proseql_core::error::ForeignKeyReason::BlockingDependents, .. }));

    let authors_after = db.collection("authors").unwrap().state.snapshot();
    let books_after = db.collection("books").unwrap().state.snapshot();
    assert_eq!(*authors_before, *authors_after, "authors collection must be untouched by the failed delete");
    assert_eq!(*books_before, *books_after, "books collection must be untouched by the failed delete");
}

/// S5: ten sorted rows paginated three pages deep via cursor pagination,
/// with `hasNextPage` correctly reporting the boundary and every row
/// visited exactly once.
#[test]
fn s5_cursor_pagination_across_three_pages() {
    let db = library_database();
    for n in 0..10 {
        create(
            &db,
            "books",
            Value::Map(vec![
                ("title".into(), Value::Text(format!("Book {n:02}"))),
                ("authorId".into(), Value::Null),
            ]),
        )
        .unwrap();
    }

    let key = SortKey {
        field: "title".to_string(),
        direction: SortDirection::Asc,
    };

    let mut seen_titles = Vec::new();
    let mut after = None;
    let mut pages = 0;
    loop {
        pages += 1;
        assert!(pages <= 10, "pagination must terminate");
        let col = db.collection("books").unwrap();
        let ctx = CollectionContext::new(&db, "books");
        let spec = QuerySpec {
            sort: vec![key.clone()],
            pagination: Pagination::Cursor {
                key: key.clone(),
                after: after.clone(),
                limit: 4,
            },
            ..QuerySpec::default()
        };
        let page = run_query("books", &col.state, &col.indexes, &spec, &ctx, &db, &col.config.computed).unwrap();
        for item in &page.items {
            seen_titles.push(item.get("title").unwrap().as_str().unwrap().to_string());
        }
        let page_info = page.page_info.expect("cursor pagination always reports page info");
        if !page_info.has_next_page {
            assert!(page_info.end_cursor.is_none() || page.items.len() < 4, "terminal page should not advertise more rows than it returned");
            break;
        }
        after = Some(proseql_core::query::Cursor::decode(page_info.end_cursor.as_ref().unwrap()).unwrap());
    }

    assert_eq!(pages, 3, "10 rows at 4 per page should take exactly 3 pages");
    let mut expected: Vec<String> = (0..10).map(|n| format!("Book {n:02}")).collect();
    expected.sort();
    assert_eq!(seen_titles, expected);
}

/// A compound-key `where` clause combined with `And` still round-trips
/// through the tagged predicate AST and the index pre-filter correctly.
#[test]
fn query_filters_on_indexed_and_non_indexed_fields_together() {
    let db = library_database();
    let author = create(&db, "authors", Value::Map(vec![("name".into(), Value::Text("Ursula".into()))])).unwrap();
    let author_id = author.get("id").and_then(Value::as_str).unwrap().to_string();
    create(
        &db,
        "books",
        Value::Map(vec![
            ("title".into(), Value::Text("The Dispossessed".into())),
            ("authorId".into(), Value::Text(author_id.clone())),
        ]),
    )
    .unwrap();
    create(
        &db,
        "books",
        Value::Map(vec![
            ("title".into(), Value::Text("The Left Hand of Darkness".into())),
            ("authorId".into(), Value::Text(author_id.clone())),
        ]),
    )
    .unwrap();

    let col = db.collection("books").unwrap();
    let ctx = CollectionContext::new(&db, "books");
    let spec = QuerySpec {
        where_clause: Some(Predicate::And(vec![
            Predicate::Leaf {
                field: "authorId".into(),
                op: Op::Eq(Value::Text(author_id)),
            },
            Predicate::Leaf {
                field: "title".into(),
                op: Op::StartsWith("The Left".into()),
            },
        ])),
        ..QuerySpec::default()
    };
    let page = run_query("books", &col.state, &col.indexes, &spec, &ctx, &db, &col.config.computed).unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].get("title").unwrap().as_str(), Some("The Left Hand of Darkness"));
}
