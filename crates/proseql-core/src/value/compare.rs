use super::Value;
use std::cmp::Ordering;

/// Canonical rank used for cross-variant ordering and for the "nulls sort
/// last" rule in `spec.md` §4.5 (sort stage). Lower rank sorts first.
const fn canonical_rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => 0,
        Value::Int(_) => 1,
        Value::Float(_) => 2,
        Value::Text(_) => 3,
        Value::List(_) => 4,
        Value::Map(_) => 5,
        Value::Null => 6,
    }
}

/// Total ordering over `Value`, used by sort and by `$gt`/`$lt`/... operator
/// evaluation when both operands are ordinarily comparable. Numbers compare
/// numerically across `Int`/`Float`; everything else compares same-variant
/// only, falling back to rank order across variants.
#[must_use]
pub fn value_cmp(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::List(a), Value::List(b)) => {
            for (x, y) in a.iter().zip(b.iter()) {
                let ord = value_cmp(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.len().cmp(&b.len())
        }
        (Value::Null, Value::Null) => Ordering::Equal,
        _ => canonical_rank(left).cmp(&canonical_rank(right)),
    }
}

/// Equality used by `$eq`/`$ne` and unique-constraint/index key comparison.
/// Numeric cross-type equality (`Int(1) == Float(1.0)`) is intentional: the
/// predicate language coerces numbers before comparing (spec.md §4.4).
#[must_use]
pub fn value_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            value_cmp(left, right) == Ordering::Equal
        }
        _ => left == right,
    }
}
