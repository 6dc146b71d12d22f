use super::migration::{apply_chain, Migration};
use crate::error::Error;
use crate::schema::Schema;
use crate::value::Value;

pub const VERSION_KEY: &str = "_version";

/// Result of loading one collection's raw object off disk.
pub struct LoadedCollection {
    /// Decoded, schema-validated `id -> entity` map, in file order.
    pub entities: Value,
    /// `true` when migrations ran and the caller should write the
    /// migrated contents back (spec.md §6 "Load with migrations").
    pub needs_rewrite: bool,
}

/// Stamps `_version` as the first key of the encoded collection object
/// (spec.md §4.10: "preserved insertion order is mandatory"). `entities` is
/// an ordered `id -> entity` map already run through `Schema::encode`.
#[must_use]
pub fn stamp_version(entities: Value, version: Option<u32>) -> Value {
    let Some(version) = version else {
        return entities;
    };
    let Value::Map(rows) = entities else {
        return entities;
    };
    let mut stamped = Vec::with_capacity(rows.len() + 1);
    stamped.push((VERSION_KEY.to_string(), Value::Int(i64::from(version))));
    stamped.extend(rows);
    Value::Map(stamped)
}

/// Loads and migrates one collection's raw on-disk object against its
/// schema and declared version (spec.md §4.10/§6).
pub fn load_collection(
    collection: &str,
    raw: Value,
    declared_version: Option<u32>,
    migrations: &[Migration],
    schema: &Schema,
) -> Result<LoadedCollection, Error> {
    let Value::Map(mut rows) = raw else {
        return Err(Error::Serialization {
            collection: collection.to_string(),
            reason: "expected a top-level object".to_string(),
        });
    };

    let file_version = rows
        .iter()
        .position(|(k, _)| k == VERSION_KEY)
        .map(|idx| match rows.remove(idx).1 {
            Value::Int(n) => n as u32,
            _ => 0,
        })
        .unwrap_or(0);

    let target = declared_version.unwrap_or(file_version);

    if file_version > target {
        return Err(Error::Migration {
            collection: collection.to_string(),
            step: -1,
            reason: format!(
                "file version {file_version} is newer than declared version {target}; \
                 downgrades are not supported"
            ),
        });
    }

    let needs_rewrite = file_version < target;
    let migrated = if needs_rewrite {
        apply_chain(migrations, Value::Map(rows), file_version, target).map_err(|reason| {
            Error::Migration {
                collection: collection.to_string(),
                step: file_version as i64,
                reason,
            }
        })?
    } else {
        Value::Map(rows)
    };

    let Value::Map(migrated_rows) = migrated else {
        return Err(Error::Migration {
            collection: collection.to_string(),
            step: -1,
            reason: "migration produced a non-object collection".to_string(),
        });
    };

    let mut decoded = Vec::with_capacity(migrated_rows.len());
    for (id, row) in migrated_rows {
        let entity = schema.decode(&row).map_err(|_| Error::Migration {
            collection: collection.to_string(),
            step: -1,
            reason: "post-migration-validation-failed".to_string(),
        })?;
        decoded.push((id, entity));
    }

    Ok(LoadedCollection {
        entities: Value::Map(decoded),
        needs_rewrite,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldKind, FieldSchema};

    fn schema_with_role() -> Schema {
        Schema::new("users", vec![FieldSchema::new("role", FieldKind::Text)])
    }

    #[test]
    fn load_without_version_mismatch_is_a_no_op() {
        let raw = Value::Map(vec![(
            VERSION_KEY.to_string(),
            Value::Int(1),
        ), (
            "u1".to_string(),
            Value::Map(vec![("role".into(), Value::Text("admin".into()))]),
        )]);
        let loaded = load_collection("users", raw, Some(1), &[], &schema_with_role()).unwrap();
        assert!(!loaded.needs_rewrite);
    }

    #[test]
    fn migration_failing_post_validation_does_not_touch_disk() {
        // No migration adds the required `role` field: post-migration
        // decode must fail, and the caller (writer) never sees a
        // migrated value to persist (scenario S7).
        let raw = Value::Map(vec![(
            "u1".to_string(),
            Value::Map(vec![("name".into(), Value::Text("a".into()))]),
        )]);
        let migrations = vec![Migration::new(0, 1, |v| v)];
        let err = load_collection("users", raw, Some(1), &migrations, &schema_with_role())
            .unwrap_err();
        match err {
            Error::Migration { step, reason, .. } => {
                assert_eq!(step, -1);
                assert_eq!(reason, "post-migration-validation-failed");
            }
            other => panic!("expected Migration error, got {other:?}"),
        }
    }

    #[test]
    fn downgrade_is_rejected() {
        let raw = Value::Map(vec![(VERSION_KEY.to_string(), Value::Int(5))]);
        let err = load_collection("users", raw, Some(1), &[], &schema_with_role()).unwrap_err();
        assert!(matches!(err, Error::Migration { .. }));
    }

    #[test]
    fn stamp_version_places_version_first() {
        let entities = Value::Map(vec![("u1".into(), Value::Map(vec![]))]);
        let stamped = stamp_version(entities, Some(3));
        let Value::Map(rows) = stamped else { unreachable!() };
        assert_eq!(rows[0].0, VERSION_KEY);
    }
}
