use super::ast::{Op, Predicate, Quantifier};
use crate::index::tokenize;
use crate::value::{value_cmp, value_eq, Value};
use std::cmp::Ordering;

///
/// RelationSnapshot
///
/// The relationship-resolution capability predicate evaluation needs to
/// cross collections, implemented by the query pipeline against a
/// transaction-local set of snapshots (spec.md §4.5 step 2: "Nested
/// relationship clauses resolve by looking up the target snapshot"). Filter
/// evaluation never errors on a dangling or null FK — a missing relation
/// simply fails to match; `DanglingReference` is reserved for the populate
/// stage (spec.md §4.5 step 5), which this trait doesn't implement.
///
pub trait RelationSnapshot {
    /// The referenced entity for a `ref` field, or `None` if the FK is
    /// null or the target can't be found.
    fn ref_target(&self, field: &str, entity: &Value) -> Option<Value>;

    /// Entities in the target collection whose FK names `entity_id`, for
    /// an `inverse` relationship.
    fn inverse_targets(&self, field: &str, entity_id: &str) -> Vec<Value>;

    /// The collection's declared default search fields (`None` means "all
    /// string fields"), used when a `$search` predicate omits `fields`.
    fn default_search_fields(&self) -> Option<Vec<String>>;
}

/// Evaluates `pred` against `entity` (and its id, needed for `inverse`
/// lookups). Evaluation is pure and short-circuits left-to-right within
/// `$and`/`$or` (spec.md §4.4).
#[must_use]
pub fn eval(pred: &Predicate, id: &str, entity: &Value, ctx: &dyn RelationSnapshot) -> bool {
    match pred {
        Predicate::Leaf { field, op } => {
            let value = entity.get_path(field).unwrap_or(&Value::Null);
            eval_op(op, value)
        }
        Predicate::And(children) => children.iter().all(|p| eval(p, id, entity, ctx)),
        Predicate::Or(children) => children.iter().any(|p| eval(p, id, entity, ctx)),
        Predicate::Not(inner) => !eval(inner, id, entity, ctx),
        Predicate::Rel { field, predicate } => match ctx.ref_target(field, entity) {
            Some(target) => eval(predicate, field, &target, ctx),
            None => false,
        },
        Predicate::RelMany {
            field,
            quantifier,
            predicate,
        } => {
            let targets = ctx.inverse_targets(field, id);
            match quantifier {
                Quantifier::Some => targets.iter().any(|t| eval(predicate, field, t, ctx)),
                Quantifier::Every => {
                    !targets.is_empty() && targets.iter().all(|t| eval(predicate, field, t, ctx))
                }
                Quantifier::None => targets.iter().all(|t| !eval(predicate, field, t, ctx)),
            }
        }
        Predicate::Search { query, fields } => {
            let scoped = fields.clone().or_else(|| ctx.default_search_fields());
            matches_search(entity, query, scoped.as_deref())
        }
    }
}

fn eval_op(op: &Op, value: &Value) -> bool {
    match op {
        Op::Eq(expected) => value_eq(value, expected),
        Op::Ne(expected) => !value_eq(value, expected),
        Op::Gt(expected) => !value.is_null() && value_cmp(value, expected) == Ordering::Greater,
        Op::Gte(expected) => {
            !value.is_null() && value_cmp(value, expected) != Ordering::Less
        }
        Op::Lt(expected) => !value.is_null() && value_cmp(value, expected) == Ordering::Less,
        Op::Lte(expected) => {
            !value.is_null() && value_cmp(value, expected) != Ordering::Greater
        }
        Op::In(options) => options.iter().any(|o| value_eq(value, o)),
        Op::Nin(options) => !options.iter().any(|o| value_eq(value, o)),
        Op::StartsWith(prefix) => value.as_str().is_some_and(|s| s.starts_with(prefix.as_str())),
        Op::EndsWith(suffix) => value.as_str().is_some_and(|s| s.ends_with(suffix.as_str())),
        Op::Contains(needle) => match (value, needle) {
            (Value::Text(s), Value::Text(n)) => s.contains(n.as_str()),
            (Value::List(items), _) => items.iter().any(|v| value_eq(v, needle)),
            _ => false,
        },
        Op::All(expected) => match value {
            Value::List(items) => expected.iter().all(|e| items.iter().any(|v| value_eq(v, e))),
            _ => false,
        },
        Op::Size(expected) => value.array_len().is_some_and(|len| len as i64 == *expected),
    }
}

/// Per-entity `$search` fallback: tokenizes the entity's own scoped fields
/// rather than consulting the collection's `SearchIndex`, so `$search`
/// still evaluates correctly when nested under `$and`/`$or` away from the
/// where-clause root (spec.md §4.4).
fn matches_search(entity: &Value, query: &str, fields: Option<&[String]>) -> bool {
    let query_tokens = tokenize(query);
    if query_tokens.is_empty() {
        return true;
    }
    let scoped: Vec<String> = match fields {
        Some(fields) => fields.to_vec(),
        None => entity
            .string_fields()
            .into_iter()
            .map(|(k, _)| k.to_string())
            .collect(),
    };
    let mut entity_tokens = Vec::new();
    for field in &scoped {
        if let Some(text) = entity.get(field).and_then(Value::as_str) {
            entity_tokens.extend(tokenize(text));
        }
    }
    query_tokens.iter().all(|t| entity_tokens.contains(t))
}
