use crate::value::Value;

///
/// FK existence/reverse-scan helpers (spec.md §4.7 create step 7, delete
/// step 3). Kept as plain functions over borrowed snapshots rather than a
/// stateful index: foreign-key integrity is checked against the *target*
/// collection's live snapshot at call time, not cached, since the target
/// can change independently of the source collection.
///

/// True when `target_id` exists in the target collection's row set
/// (spec.md §4.7 create step 7 / update step 5).
#[must_use]
pub fn target_exists<'a>(target_rows: impl Iterator<Item = &'a str>, target_id: &str) -> bool {
    target_rows.into_iter().any(|id| id == target_id)
}

/// Ids of rows in `rows` whose `fk_field` equals `target_id` — the reverse
/// scan used by `delete`'s FK check (spec.md §4.7 delete step 3) and by
/// `inverse`-relationship population (spec.md §4.5 step 5).
#[must_use]
pub fn dependents<'a>(
    rows: impl Iterator<Item = (&'a str, &'a Value)>,
    fk_field: &str,
    target_id: &str,
) -> Vec<String> {
    rows.filter(|(_, entity)| {
        entity
            .get(fk_field)
            .and_then(Value::as_str)
            .is_some_and(|value| value == target_id)
    })
    .map(|(id, _)| id.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_exists_matches_by_id() {
        let ids = vec!["a".to_string(), "b".to_string()];
        assert!(target_exists(ids.iter().map(String::as_str), "b"));
        assert!(!target_exists(ids.iter().map(String::as_str), "c"));
    }

    #[test]
    fn dependents_finds_rows_referencing_the_target() {
        let a = Value::Map(vec![("authorId".into(), Value::Text("u1".into()))]);
        let b = Value::Map(vec![("authorId".into(), Value::Text("u2".into()))]);
        let rows = vec![("p1", &a), ("p2", &b)];
        let found = dependents(rows.into_iter(), "authorId", "u1");
        assert_eq!(found, vec!["p1".to_string()]);
    }
}
