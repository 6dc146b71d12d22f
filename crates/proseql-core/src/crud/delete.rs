use super::update::update;
use crate::bus::ChangeEvent;
use crate::db::Database;
use crate::error::{Error, ForeignKeyReason, Result};
use crate::hooks::{ChangeKind, Hooks};
use crate::index::dependents;
use crate::model::RelationshipKind;
use crate::query::{eval, Predicate, RelationSnapshot};
use crate::value::Value;

#[derive(Clone, Copy, Debug, Default)]
pub struct DeleteOptions {
    pub soft: bool,
}

pub struct DeleteOutcome {
    pub deleted: Value,
}

/// `delete` (spec.md §4.7 steps 1-5). Hard delete updates indexes before
/// removing the row from state, so the entity stays resolvable to
/// concurrent readers throughout the call; soft delete leaves FK
/// references intact by only stamping `deletedAt`.
pub fn delete(db: &Database, collection: &str, id: &str, opts: DeleteOptions) -> Result<DeleteOutcome> {
    let col = db.collection(collection)?;
    let entity = col.state.get(id).ok_or_else(|| Error::NotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    })?;

    Hooks::run_before_delete(&col.config.hooks.before_delete, &entity).map_err(|e| Error::Hook {
        collection: collection.to_string(),
        hook: "beforeDelete",
        reason: e.0,
    })?;

    check_no_blocking_dependents(db, collection, id)?;

    let after = if opts.soft {
        let mut soft = entity.clone();
        soft.set("deletedAt", Value::Text(chrono::Utc::now().to_rfc3339()));
        col.state.replace(collection, id, soft.clone())?;
        col.indexes.reindex(id, &entity, &soft);
        Some(soft)
    } else {
        col.indexes.remove(id, &entity);
        col.state.remove(id);
        None
    };
    col.persist();

    let result = after.clone().unwrap_or_else(|| entity.clone());
    Hooks::run_after(&col.config.hooks.after_delete, &result);
    col.config
        .hooks
        .run_on_change(ChangeKind::Delete, id, Some(&entity), after.as_ref());
    db.bus().publish(ChangeEvent {
        collection: collection.to_string(),
        kind: ChangeKind::Delete,
        id: id.to_string(),
        before: Some(entity),
        after,
    });

    Ok(DeleteOutcome { deleted: result })
}

/// Reverse-scans every other collection with a `ref` relationship
/// targeting this one (spec.md §4.7 delete step 3).
fn check_no_blocking_dependents(db: &Database, collection: &str, id: &str) -> Result<()> {
    for (name, other) in db.collections_iter() {
        if name == collection {
            continue;
        }
        for rel in &other.config.relationships {
            if rel.kind != RelationshipKind::Ref || rel.target != collection {
                continue;
            }
            let snapshot = other.state.snapshot();
            let rows: Vec<(&str, &Value)> = snapshot.iter().map(|(i, v)| (i.as_str(), v)).collect();
            let found = dependents(rows.into_iter(), &rel.foreign_key, id);
            if !found.is_empty() {
                return Err(Error::ForeignKey {
                    source_collection: name.clone(),
                    target_collection: collection.to_string(),
                    field: rel.foreign_key.clone(),
                    id: id.to_string(),
                    reason: ForeignKeyReason::BlockingDependents,
                });
            }
        }
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeleteManyOptions {
    pub soft: bool,
    pub limit: Option<usize>,
}

pub struct DeleteManyOutcome {
    pub deleted: Vec<Value>,
}

pub fn delete_many(
    db: &Database,
    collection: &str,
    predicate: &Predicate,
    opts: DeleteManyOptions,
    relation_ctx: &dyn RelationSnapshot,
) -> Result<DeleteManyOutcome> {
    let col = db.collection(collection)?;
    let snapshot = col.state.snapshot();
    let mut ids: Vec<String> = snapshot
        .iter()
        .filter(|(id, entity)| eval(predicate, id, entity, relation_ctx))
        .map(|(id, _)| id.clone())
        .collect();
    if let Some(limit) = opts.limit {
        ids.truncate(limit);
    }

    let mut deleted = Vec::with_capacity(ids.len());
    for id in ids {
        deleted.push(delete(db, collection, &id, DeleteOptions { soft: opts.soft })?.deleted);
    }
    Ok(DeleteManyOutcome { deleted })
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RelationshipPolicy {
    Cascade,
    CascadeSoft,
    SetNull,
    Restrict,
    Preserve,
}

pub struct DeleteWithRelationshipsOptions {
    pub include: Vec<(String, RelationshipPolicy)>,
    pub soft: bool,
}

/// `deleteWithRelationships` (spec.md §4.7). Staged: plans every affected
/// child row first, runs all `restrict` checks before touching any state,
/// then executes cascade/set-null actions and finally deletes the parent.
/// A `restrict` failure aborts before any mutation, so state is left fully
/// unchanged on that path; once execution begins, each step is its own
/// already-validated `delete`/`update` call (see DESIGN.md for why this
/// engine cannot offer true cross-collection atomicity beyond that).
pub fn delete_with_relationships(
    db: &Database,
    collection: &str,
    id: &str,
    opts: DeleteWithRelationshipsOptions,
) -> Result<DeleteOutcome> {
    let col = db.collection(collection)?;
    col.state.get(id).ok_or_else(|| Error::NotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    })?;

    struct Action {
        collection: String,
        fk_field: String,
        ids: Vec<String>,
        policy: RelationshipPolicy,
    }

    let mut actions = Vec::new();
    for (field, policy) in &opts.include {
        let Some(rel) = col.relationship(field) else {
            continue;
        };
        if rel.kind != RelationshipKind::Inverse {
            continue;
        }
        let target = db.collection(&rel.target)?;
        let snapshot = target.state.snapshot();
        let rows: Vec<(&str, &Value)> = snapshot.iter().map(|(i, v)| (i.as_str(), v)).collect();
        let ids = dependents(rows.into_iter(), &rel.foreign_key, id);
        actions.push(Action {
            collection: rel.target.clone(),
            fk_field: rel.foreign_key.clone(),
            ids,
            policy: policy.clone(),
        });
    }

    for action in &actions {
        if action.policy == RelationshipPolicy::Restrict && !action.ids.is_empty() {
            return Err(Error::validation(
                collection,
                format!(
                    "Cannot delete {id:?}: {} row(s) in {:?} block the restrict policy",
                    action.ids.len(),
                    action.collection
                ),
            ));
        }
    }

    for action in &actions {
        match action.policy {
            RelationshipPolicy::Cascade => {
                for child_id in &action.ids {
                    delete(db, &action.collection, child_id, DeleteOptions { soft: false })?;
                }
            }
            RelationshipPolicy::CascadeSoft => {
                for child_id in &action.ids {
                    delete(db, &action.collection, child_id, DeleteOptions { soft: true })?;
                }
            }
            RelationshipPolicy::SetNull => {
                for child_id in &action.ids {
                    update(
                        db,
                        &action.collection,
                        child_id,
                        Value::Map(vec![(action.fk_field.clone(), Value::Null)]),
                    )?;
                }
            }
            RelationshipPolicy::Restrict | RelationshipPolicy::Preserve => {}
        }
    }

    delete(db, collection, id, DeleteOptions { soft: opts.soft })
}
