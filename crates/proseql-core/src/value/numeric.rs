use super::Value;

/// Numeric coercion used by aggregation (`sum`/`avg`, spec.md §4.6): returns
/// `None` for non-numeric or null values, which callers skip rather than
/// error on.
#[must_use]
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(n) => Some(*n),
        _ => None,
    }
}
