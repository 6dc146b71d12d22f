use super::create::create;
use super::update::update;
use crate::collection::Collection;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::value::Value;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UpsertAction {
    Created,
    Updated,
}

pub struct UpsertOutcome {
    pub entity: Value,
    pub action: UpsertAction,
}

/// `upsert({ where, create, update })` (spec.md §4.7). The where-clause
/// must name `{ id }` or cover at least one declared unique constraint
/// entirely; this is checked before any lookup, failing with a
/// `Validation` error that names the valid unique fields.
pub fn upsert(
    db: &Database,
    collection: &str,
    where_clause: &Value,
    create_data: Value,
    update_patch: Value,
) -> Result<UpsertOutcome> {
    let col = db.collection(collection)?;
    validate_upsert_where(col, where_clause)?;

    match find_upsert_match(col, where_clause) {
        Some(id) => {
            let entity = update(db, collection, &id, update_patch)?;
            Ok(UpsertOutcome {
                entity,
                action: UpsertAction::Updated,
            })
        }
        None => {
            let entity = create(db, collection, create_data)?;
            Ok(UpsertOutcome {
                entity,
                action: UpsertAction::Created,
            })
        }
    }
}

fn validate_upsert_where(col: &Collection, where_clause: &Value) -> Result<()> {
    if matches!(where_clause.get("id"), Some(Value::Text(_))) {
        return Ok(());
    }
    let Some(entries) = where_clause.as_map() else {
        return Err(Error::validation(&col.config.name, "upsert where-clause must be an object"));
    };
    let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
    let covers_constraint = col
        .config
        .unique_fields
        .iter()
        .any(|c| c.fields.iter().all(|f| keys.contains(&f.as_str())));
    if covers_constraint {
        return Ok(());
    }
    let valid: Vec<String> = col
        .config
        .unique_fields
        .iter()
        .map(|c| c.fields.join("+"))
        .collect();
    Err(Error::validation(
        &col.config.name,
        format!(
            "upsert where-clause must be {{id}} or fully cover one of: {}",
            valid.join(", ")
        ),
    ))
}

fn find_upsert_match(col: &Collection, where_clause: &Value) -> Option<String> {
    if let Some(id) = where_clause.get("id").and_then(Value::as_str) {
        return col.state.get(id).map(|_| id.to_string());
    }
    let entries = where_clause.as_map()?;
    let snapshot = col.state.snapshot();
    snapshot
        .iter()
        .find(|(_, entity)| entries.iter().all(|(k, v)| entity.get(k) == Some(v)))
        .map(|(id, _)| id.clone())
}

/// Plural form of `upsert`: one `{where, create, update}` triple per item,
/// applied in order (spec.md §6 CRUD surface `upsertMany`).
pub fn upsert_many(
    db: &Database,
    collection: &str,
    items: Vec<(Value, Value, Value)>,
) -> Result<Vec<UpsertOutcome>> {
    items
        .into_iter()
        .map(|(where_clause, create_data, update_patch)| {
            upsert(db, collection, &where_clause, create_data, update_patch)
        })
        .collect()
}
