use crate::model::UniqueConstraint;
use crate::value::Value;

const RECORD_SEPARATOR: char = '\u{1e}';

///
/// Per-constraint dedup key, concatenating each field's canonical string
/// form with a record separator so differently-split field values never
/// collide (spec.md §4.7: "a per-constraint key that concatenates field
/// values with a record-separator to prevent cross-field collisions").
/// Returns `None` when any field is null/absent — nulls are excluded from
/// uniqueness (spec.md §3).
///
#[must_use]
pub fn constraint_key(constraint: &UniqueConstraint, entity: &Value) -> Option<String> {
    let mut parts = Vec::with_capacity(constraint.fields.len());
    for field in &constraint.fields {
        let value = entity.get(field)?;
        if value.is_null() {
            return None;
        }
        parts.push(format!("{}:{value}", value.type_name()));
    }
    Some(parts.join(&RECORD_SEPARATOR.to_string()))
}

/// The constraint's field/value pairs, for `Error::UniqueConstraint`.
#[must_use]
pub fn constraint_values(constraint: &UniqueConstraint, entity: &Value) -> Vec<(String, Value)> {
    constraint
        .fields
        .iter()
        .filter_map(|field| entity.get(field).map(|v| (field.clone(), v.clone())))
        .collect()
}

/// Scans `rows` for an id (other than `exclude_id`) whose values collide
/// with `candidate` on `constraint` (spec.md §4.7 create/update steps 6/4).
#[must_use]
pub fn find_conflict<'a>(
    constraint: &UniqueConstraint,
    candidate: &Value,
    rows: impl Iterator<Item = (&'a str, &'a Value)>,
    exclude_id: Option<&str>,
) -> Option<String> {
    let candidate_key = constraint_key(constraint, candidate)?;
    for (id, entity) in rows {
        if Some(id) == exclude_id {
            continue;
        }
        if constraint_key(constraint, entity).as_deref() == Some(candidate_key.as_str()) {
            return Some(id.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(pairs: &[(&str, Value)]) -> Value {
        Value::Map(pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect())
    }

    #[test]
    fn compound_keys_do_not_collide_across_field_splits() {
        let c1 = UniqueConstraint::compound(["ab", "c"]);
        let c2 = UniqueConstraint::compound(["a"]);
        let e1 = entity(&[("ab", Value::Text("x".into())), ("c", Value::Text("yz".into()))]);
        let e2 = entity(&[("a", Value::Text("xyz".into()))]);
        assert_ne!(constraint_key(&c1, &e1), constraint_key(&c2, &e2));
    }

    #[test]
    fn null_field_skips_the_constraint() {
        let c = UniqueConstraint::single("email");
        let e = entity(&[("email", Value::Null)]);
        assert_eq!(constraint_key(&c, &e), None);
    }

    #[test]
    fn find_conflict_excludes_self_id_during_update() {
        let c = UniqueConstraint::single("email");
        let existing = entity(&[("email", Value::Text("a@x.com".into()))]);
        let rows = vec![("u1".to_string(), existing.clone())];
        let rows: Vec<(&str, &Value)> = rows.iter().map(|(id, v)| (id.as_str(), v)).collect();
        let candidate = entity(&[("email", Value::Text("a@x.com".into()))]);
        assert_eq!(
            find_conflict(&c, &candidate, rows.iter().copied(), Some("u1")),
            None
        );
        assert_eq!(
            find_conflict(&c, &candidate, rows.iter().copied(), None),
            Some("u1".to_string())
        );
    }
}
