use super::create::create;
use super::update::update;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::id;
use crate::model::RelationshipKind;
use crate::value::Value;

/// One relationship field's nested input (spec.md §4.7
/// `createWithRelationships`).
#[derive(Clone, Debug)]
pub enum RelationshipInput {
    Connect(Value),
    ConnectMany(Vec<Value>),
    Create(Value),
    CreateMany(Vec<Value>),
    ConnectOrCreate { where_clause: Value, create: Value },
}

/// `createWithRelationships` (spec.md §4.7). The parent id is generated
/// up front so inverse children can adopt it before the parent row
/// itself is created.
pub fn create_with_relationships(
    db: &Database,
    collection: &str,
    mut input: Value,
    relations: Vec<(String, RelationshipInput)>,
) -> Result<Value> {
    let col = db.collection(collection)?;
    let parent_id = input
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| id::generate(&col.config.id_kind));
    input.set("id", Value::Text(parent_id.clone()));

    let mut deferred_inverse = Vec::new();
    for (field, rel_input) in relations {
        let Some(rel) = col.relationship(&field) else {
            continue;
        };
        match rel.kind {
            RelationshipKind::Ref => {
                let fk_field = rel.foreign_key.clone();
                let target = rel.target.clone();
                let target_id = resolve_ref(db, &target, &rel_input)?;
                input.set(&fk_field, target_id.map(Value::Text).unwrap_or(Value::Null));
            }
            RelationshipKind::Inverse => deferred_inverse.push((rel.target.clone(), rel.foreign_key.clone(), rel_input)),
        }
    }

    let created = create(db, collection, input)?;

    for (target, fk_field, rel_input) in deferred_inverse {
        apply_inverse(db, &target, &fk_field, &parent_id, rel_input)?;
    }

    Ok(created)
}

fn resolve_ref(db: &Database, target: &str, input: &RelationshipInput) -> Result<Option<String>> {
    match input {
        RelationshipInput::Connect(where_clause) => find_by_where(db, target, where_clause),
        RelationshipInput::Create(data) => Ok(Some(created_id(db, target, data.clone())?)),
        RelationshipInput::ConnectOrCreate { where_clause, create: data } => {
            match find_by_where(db, target, where_clause)? {
                Some(id) => Ok(Some(id)),
                None => Ok(Some(created_id(db, target, data.clone())?)),
            }
        }
        RelationshipInput::ConnectMany(_) | RelationshipInput::CreateMany(_) => {
            Err(Error::OperationError {
                reason: "a ref relationship expects a single connect/create input, not a plural form".to_string(),
            })
        }
    }
}

fn apply_inverse(
    db: &Database,
    target: &str,
    fk_field: &str,
    parent_id: &str,
    input: RelationshipInput,
) -> Result<()> {
    match input {
        RelationshipInput::Connect(where_clause) => connect_child(db, target, fk_field, parent_id, &where_clause)?,
        RelationshipInput::ConnectMany(wheres) => {
            for where_clause in wheres {
                connect_child(db, target, fk_field, parent_id, &where_clause)?;
            }
        }
        RelationshipInput::Create(mut data) => {
            data.set(fk_field, Value::Text(parent_id.to_string()));
            create(db, target, data)?;
        }
        RelationshipInput::CreateMany(items) => {
            for mut data in items {
                data.set(fk_field, Value::Text(parent_id.to_string()));
                create(db, target, data)?;
            }
        }
        RelationshipInput::ConnectOrCreate { where_clause, mut create: data } => {
            match find_by_where(db, target, &where_clause)? {
                Some(id) => {
                    update(db, target, &id, Value::Map(vec![(fk_field.to_string(), Value::Text(parent_id.to_string()))]))?;
                }
                None => {
                    data.set(fk_field, Value::Text(parent_id.to_string()));
                    create(db, target, data)?;
                }
            }
        }
    }
    Ok(())
}

fn connect_child(db: &Database, target: &str, fk_field: &str, parent_id: &str, where_clause: &Value) -> Result<()> {
    if let Some(id) = find_by_where(db, target, where_clause)? {
        update(db, target, &id, Value::Map(vec![(fk_field.to_string(), Value::Text(parent_id.to_string()))]))?;
    }
    Ok(())
}

fn created_id(db: &Database, target: &str, data: Value) -> Result<String> {
    let entity = create(db, target, data)?;
    Ok(entity.get("id").and_then(Value::as_str).unwrap_or_default().to_string())
}

fn find_by_where(db: &Database, collection: &str, where_clause: &Value) -> Result<Option<String>> {
    let col = db.collection(collection)?;
    if let Some(id) = where_clause.get("id").and_then(Value::as_str) {
        return Ok(col.state.get(id).map(|_| id.to_string()));
    }
    let Some(entries) = where_clause.as_map() else {
        return Ok(None);
    };
    let snapshot = col.state.snapshot();
    Ok(snapshot
        .iter()
        .find(|(_, entity)| entries.iter().all(|(k, v)| entity.get(k) == Some(v)))
        .map(|(id, _)| id.clone()))
}
