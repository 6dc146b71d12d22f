use crate::bus::ChangeEvent;
use crate::db::Database;
use crate::error::{Error, ForeignKeyReason, Result};
use crate::hooks::{ChangeKind, Hooks};
use crate::id;
use crate::index::{constraint_key, constraint_values, find_conflict, target_exists};
use crate::model::{CollectionConfig, RelationshipKind};
use crate::value::Value;
use std::collections::{HashMap, HashSet};

/// `create` (spec.md §4.7 steps 1-10).
pub fn create(db: &Database, collection: &str, input: Value) -> Result<Value> {
    let col = db.collection(collection)?;
    let entity = prepare_one(db, collection, input, &HashSet::new(), &[])?;
    let id = entity
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    col.state.try_insert(collection, id.clone(), entity.clone())?;
    col.indexes.insert(&id, &entity);
    col.persist();

    Hooks::run_after(&col.config.hooks.after_create, &entity);
    col.config
        .hooks
        .run_on_change(ChangeKind::Create, &id, None, Some(&entity));
    db.bus().publish(ChangeEvent {
        collection: collection.to_string(),
        kind: ChangeKind::Create,
        id,
        before: None,
        after: Some(entity.clone()),
    });

    Ok(entity)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CreateManyOptions {
    pub skip_duplicates: bool,
}

pub struct Skipped {
    pub data: Value,
    pub reason: String,
}

pub struct CreateManyOutcome {
    pub created: Vec<Value>,
    pub skipped: Vec<Skipped>,
}

/// `createMany` with optional `skipDuplicates` (spec.md §4.7): violations
/// are collected rather than aborting the batch. A per-constraint dedup
/// key (record-separator joined) catches duplicates introduced within the
/// batch itself, not just against the pre-existing snapshot.
pub fn create_many(
    db: &Database,
    collection: &str,
    inputs: Vec<Value>,
    opts: CreateManyOptions,
) -> Result<CreateManyOutcome> {
    let col = db.collection(collection)?;
    let mut created: Vec<(String, Value)> = Vec::new();
    let mut skipped = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut seen_keys: Vec<HashMap<String, String>> = vec![HashMap::new(); col.config.unique_fields.len()];

    for input in inputs {
        match prepare_one(db, collection, input.clone(), &seen_ids, &seen_keys) {
            Ok(entity) => {
                let id = entity.get("id").and_then(Value::as_str).unwrap().to_string();
                seen_ids.insert(id.clone());
                for (idx, constraint) in col.config.unique_fields.iter().enumerate() {
                    if let Some(key) = constraint_key(constraint, &entity) {
                        seen_keys[idx].insert(key, id.clone());
                    }
                }
                created.push((id, entity));
            }
            Err(err) => {
                if opts.skip_duplicates {
                    skipped.push(Skipped { data: input, reason: err.to_string() });
                } else {
                    return Err(err);
                }
            }
        }
    }

    col.state.insert_many(created.clone());
    for (id, entity) in &created {
        col.indexes.insert(id, entity);
    }
    col.persist();

    for (id, entity) in &created {
        Hooks::run_after(&col.config.hooks.after_create, entity);
        col.config
            .hooks
            .run_on_change(ChangeKind::Create, id, None, Some(entity));
        db.bus().publish(ChangeEvent {
            collection: collection.to_string(),
            kind: ChangeKind::Create,
            id: id.clone(),
            before: None,
            after: Some(entity.clone()),
        });
    }

    Ok(CreateManyOutcome {
        created: created.into_iter().map(|(_, e)| e).collect(),
        skipped,
    })
}

/// Runs create steps 1-7 against both the live snapshot and the
/// in-progress batch (`seen_ids`/`seen_keys`), propagating the same
/// structured `Error` a single `create` would on any failure rather than
/// aborting the whole batch.
fn prepare_one(
    db: &Database,
    collection: &str,
    input: Value,
    seen_ids: &HashSet<String>,
    seen_keys: &[HashMap<String, String>],
) -> Result<Value> {
    let col = db.collection(collection)?;

    let stripped = col.config.schema.strip_computed(&input);
    let with_lifecycle = inject_id_and_timestamps(&stripped, &col.config);
    let validated = col.config.schema.decode(&with_lifecycle)?;

    let after_hooks = Hooks::run_before(&col.config.hooks.before_create, validated).map_err(|e| {
        Error::Hook {
            collection: collection.to_string(),
            hook: "beforeCreate",
            reason: e.0,
        }
    })?;
    let id = after_hooks
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if col.state.get(&id).is_some() || seen_ids.contains(&id) {
        return Err(Error::DuplicateKey {
            collection: collection.to_string(),
            id,
        });
    }

    check_unique(db, collection, &after_hooks, None)?;
    if !seen_keys.is_empty() {
        for (constraint, keys) in col.config.unique_fields.iter().zip(seen_keys) {
            if let Some(key) = constraint_key(constraint, &after_hooks) {
                if let Some(existing_id) = keys.get(&key) {
                    return Err(Error::UniqueConstraint {
                        collection: collection.to_string(),
                        constraint: constraint.name(),
                        fields: constraint.fields.clone(),
                        values: constraint_values(constraint, &after_hooks),
                        existing_id: existing_id.clone(),
                    });
                }
            }
        }
    }

    check_foreign_keys(db, collection, &after_hooks)?;

    Ok(after_hooks)
}

fn inject_id_and_timestamps(raw: &Value, config: &CollectionConfig) -> Value {
    let mut entity = raw.clone();
    if entity.get("id").is_none() {
        entity.set("id", Value::Text(id::generate(&config.id_kind)));
    }
    let now = Value::Text(chrono::Utc::now().to_rfc3339());
    if entity.get("createdAt").is_none() {
        entity.set("createdAt", now.clone());
    }
    entity.set("updatedAt", now);
    entity
}

pub(super) fn check_unique(
    db: &Database,
    collection: &str,
    candidate: &Value,
    exclude_id: Option<&str>,
) -> Result<()> {
    let col = db.collection(collection)?;
    let snapshot = col.state.snapshot();
    let rows: Vec<(&str, &Value)> = snapshot.iter().map(|(id, v)| (id.as_str(), v)).collect();
    for constraint in &col.config.unique_fields {
        if let Some(existing_id) = find_conflict(constraint, candidate, rows.iter().copied(), exclude_id) {
            return Err(Error::UniqueConstraint {
                collection: collection.to_string(),
                constraint: constraint.name(),
                fields: constraint.fields.clone(),
                values: constraint_values(constraint, candidate),
                existing_id,
            });
        }
    }
    Ok(())
}

pub(super) fn check_foreign_keys(db: &Database, collection: &str, entity: &Value) -> Result<()> {
    let col = db.collection(collection)?;
    for rel in &col.config.relationships {
        if rel.kind != RelationshipKind::Ref {
            continue;
        }
        let Some(fk) = entity.get(&rel.foreign_key) else {
            continue;
        };
        if fk.is_null() {
            continue;
        }
        let Some(target_id) = fk.as_str() else { continue };
        let target = db.collection(&rel.target)?;
        let snapshot = target.state.snapshot();
        if !target_exists(snapshot.keys().map(String::as_str), target_id) {
            return Err(Error::ForeignKey {
                source_collection: collection.to_string(),
                target_collection: rel.target.clone(),
                field: rel.foreign_key.clone(),
                id: target_id.to_string(),
                reason: ForeignKeyReason::MissingTarget,
            });
        }
    }
    Ok(())
}
