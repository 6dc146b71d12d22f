use crate::value::{value_cmp, Value};
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Debug)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// Multi-key stable sort with nulls always last, regardless of direction
/// (spec.md §4.5 step 3). Ties are broken by id so the order is fully
/// deterministic — cursor tokens depend on it (spec.md §4.5 step 4).
#[must_use]
pub fn sort_rows(mut rows: Vec<(String, Value)>, keys: &[SortKey]) -> Vec<(String, Value)> {
    rows.sort_by(|(id_a, a), (id_b, b)| {
        for key in keys {
            let va = a.get_path(&key.field).unwrap_or(&Value::Null);
            let vb = b.get_path(&key.field).unwrap_or(&Value::Null);
            let ordering = compare_nulls_last(va, vb, key.direction);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        id_a.cmp(id_b)
    });
    rows
}

#[must_use]
pub fn compare_nulls_last(a: &Value, b: &Value, direction: SortDirection) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ordering = value_cmp(a, b);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
    }
}

/// Same ordering `sort_rows` produces for one key, with the id tiebreak
/// folded in — used by cursor pagination to decide which side of a cursor
/// token a row falls on (spec.md §4.5 step 4).
#[must_use]
pub fn compare_with_tiebreak(
    a_value: &Value,
    a_id: &str,
    b_value: &Value,
    b_id: &str,
    direction: SortDirection,
) -> Ordering {
    match compare_nulls_last(a_value, b_value, direction) {
        Ordering::Equal => a_id.cmp(b_id),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, n: Value) -> (String, Value) {
        (id.to_string(), Value::Map(vec![("n".into(), n)]))
    }

    #[test]
    fn nulls_sort_last_in_both_directions() {
        let rows = vec![row("a", Value::Int(1)), row("b", Value::Null), row("c", Value::Int(2))];
        let keys = vec![SortKey {
            field: "n".into(),
            direction: SortDirection::Asc,
        }];
        let sorted = sort_rows(rows.clone(), &keys);
        assert_eq!(sorted.last().unwrap().0, "b");

        let keys_desc = vec![SortKey {
            field: "n".into(),
            direction: SortDirection::Desc,
        }];
        let sorted_desc = sort_rows(rows, &keys_desc);
        assert_eq!(sorted_desc.last().unwrap().0, "b");
    }

    #[test]
    fn ties_break_by_id() {
        let rows = vec![row("b", Value::Int(1)), row("a", Value::Int(1))];
        let keys = vec![SortKey {
            field: "n".into(),
            direction: SortDirection::Asc,
        }];
        let sorted = sort_rows(rows, &keys);
        assert_eq!(sorted[0].0, "a");
    }
}
