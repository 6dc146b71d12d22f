use super::create::{check_foreign_keys, check_unique};
use crate::bus::ChangeEvent;
use crate::db::Database;
use crate::error::{Error, ForeignKeyReason, Result};
use crate::hooks::{ChangeKind, Hooks};
use crate::index::target_exists;
use crate::model::RelationshipKind;
use crate::query::{eval, Predicate, RelationSnapshot};
use crate::value::Value;
use std::sync::Arc;

/// A patch for `updateMany`: either one static document applied to every
/// matched row, or a function of each matched entity (spec.md §4.7
/// `update(id, patch)`; `updateMany(predicate, patch | (entity)->patch)`).
#[derive(Clone)]
pub enum Patch {
    Static(Value),
    Fn(Arc<dyn Fn(&Value) -> Value + Send + Sync>),
}

/// `update` (spec.md §4.7 steps 1-8).
pub fn update(db: &Database, collection: &str, id: &str, patch: Value) -> Result<Value> {
    let col = db.collection(collection)?;
    let current = col
        .state
        .get(id)
        .ok_or_else(|| Error::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })?;

    let stripped_patch = col.config.schema.strip_computed(&patch);
    let mut merged = current.merged(&stripped_patch);
    merged.set("id", Value::Text(id.to_string()));
    if let Some(created_at) = current.get("createdAt") {
        merged.set("createdAt", created_at.clone());
    }
    merged.set("updatedAt", Value::Text(chrono::Utc::now().to_rfc3339()));

    let after_hooks = Hooks::run_before(&col.config.hooks.before_update, merged).map_err(|e| {
        Error::Hook {
            collection: collection.to_string(),
            hook: "beforeUpdate",
            reason: e.0,
        }
    })?;

    check_unique(db, collection, &after_hooks, Some(id))?;
    check_changed_foreign_keys(db, collection, &current, &after_hooks)?;
    col.config.schema.validate(&after_hooks)?;

    col.state.replace(collection, id, after_hooks.clone())?;
    col.indexes.reindex(id, &current, &after_hooks);
    col.persist();

    Hooks::run_after(&col.config.hooks.after_update, &after_hooks);
    col.config
        .hooks
        .run_on_change(ChangeKind::Update, id, Some(&current), Some(&after_hooks));
    db.bus().publish(ChangeEvent {
        collection: collection.to_string(),
        kind: ChangeKind::Update,
        id: id.to_string(),
        before: Some(current),
        after: Some(after_hooks.clone()),
    });

    Ok(after_hooks)
}

fn check_changed_foreign_keys(db: &Database, collection: &str, before: &Value, after: &Value) -> Result<()> {
    let col = db.collection(collection)?;
    for rel in &col.config.relationships {
        if rel.kind != RelationshipKind::Ref {
            continue;
        }
        let before_fk = before.get(&rel.foreign_key).cloned().unwrap_or(Value::Null);
        let after_fk = after.get(&rel.foreign_key).cloned().unwrap_or(Value::Null);
        if before_fk == after_fk || after_fk.is_null() {
            continue;
        }
        let Some(target_id) = after_fk.as_str() else { continue };
        let target = db.collection(&rel.target)?;
        if !target_exists(target.state.snapshot().keys().map(String::as_str), target_id) {
            return Err(Error::ForeignKey {
                source_collection: collection.to_string(),
                target_collection: rel.target.clone(),
                field: rel.foreign_key.clone(),
                id: target_id.to_string(),
                reason: ForeignKeyReason::MissingTarget,
            });
        }
    }
    check_foreign_keys(db, collection, after)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct UpdateManyOptions {
    pub limit: Option<usize>,
}

pub struct UpdateManyOutcome {
    pub count: usize,
    pub updated: Vec<Value>,
}

/// `updateMany` (spec.md §4.7). A `Patch::Fn` is re-evaluated against each
/// row's freshly fetched current value at the moment its own `update`
/// runs, not against one shared pre-batch snapshot — so a patch function
/// observing the effect of an earlier row in the same batch sees that
/// effect (open question resolved in DESIGN.md).
pub fn update_many(
    db: &Database,
    collection: &str,
    predicate: &Predicate,
    patch: &Patch,
    opts: UpdateManyOptions,
    relation_ctx: &dyn RelationSnapshot,
) -> Result<UpdateManyOutcome> {
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

    let mut updated = Vec::with_capacity(ids.len());
    for id in ids {
        let patch_value = match patch {
            Patch::Static(value) => value.clone(),
            Patch::Fn(f) => {
                let Some(entity) = col.state.get(&id) else {
                    continue;
                };
                f(&entity)
            }
        };
        updated.push(update(db, collection, &id, patch_value)?);
    }

    Ok(UpdateManyOutcome {
        count: updated.len(),
        updated,
    })
}
