use super::ast::{Op, Predicate, Quantifier};
use crate::error::Error;
use crate::model::RelationshipKind;
use crate::value::Value;

/// Compiles a user-facing where-clause `Value` into a `Predicate` AST
/// (spec.md "REDESIGN FLAGS"). `relationship_kind` resolves a field name to
/// its declared relationship, if any, so the parser can tell a plain leaf
/// field from a nested relationship clause.
pub fn parse_where(
    collection: &str,
    where_clause: &Value,
    relationship_kind: &dyn Fn(&str) -> Option<RelationshipKind>,
) -> Result<Predicate, Error> {
    let Value::Map(entries) = where_clause else {
        return Err(Error::validation(collection, "where-clause must be an object"));
    };

    let mut clauses = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        clauses.push(match key.as_str() {
            "$and" => Predicate::And(parse_list(collection, value, relationship_kind)?),
            "$or" => Predicate::Or(parse_list(collection, value, relationship_kind)?),
            "$not" => Predicate::Not(Box::new(parse_where(collection, value, relationship_kind)?)),
            "$search" => parse_search(collection, value)?,
            field => parse_field(collection, field, value, relationship_kind)?,
        });
    }

    Ok(match clauses.len() {
        0 => Predicate::And(Vec::new()),
        1 => clauses.into_iter().next().expect("checked len"),
        _ => Predicate::And(clauses),
    })
}

fn parse_list(
    collection: &str,
    value: &Value,
    relationship_kind: &dyn Fn(&str) -> Option<RelationshipKind>,
) -> Result<Vec<Predicate>, Error> {
    let Value::List(items) = value else {
        return Err(Error::validation(collection, "expected an array of where-clauses"));
    };
    items
        .iter()
        .map(|item| parse_where(collection, item, relationship_kind))
        .collect()
}

fn parse_search(collection: &str, value: &Value) -> Result<Predicate, Error> {
    let query = value
        .get("query")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::validation(collection, "$search requires a string `query`"))?
        .to_string();
    let fields = match value.get("fields") {
        Some(Value::List(items)) => Some(
            items
                .iter()
                .map(|v| {
                    v.as_str().map(str::to_string).ok_or_else(|| {
                        Error::validation(collection, "$search.fields must be strings")
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
        _ => None,
    };
    Ok(Predicate::Search { query, fields })
}

fn parse_field(
    collection: &str,
    field: &str,
    value: &Value,
    relationship_kind: &dyn Fn(&str) -> Option<RelationshipKind>,
) -> Result<Predicate, Error> {
    match relationship_kind(field) {
        Some(RelationshipKind::Ref) => Ok(Predicate::Rel {
            field: field.to_string(),
            predicate: Box::new(parse_where(collection, value, relationship_kind)?),
        }),
        Some(RelationshipKind::Inverse) => parse_rel_many(collection, field, value, relationship_kind),
        None => parse_leaf(collection, field, value),
    }
}

fn parse_rel_many(
    collection: &str,
    field: &str,
    value: &Value,
    relationship_kind: &dyn Fn(&str) -> Option<RelationshipKind>,
) -> Result<Predicate, Error> {
    let Value::Map(entries) = value else {
        return Err(Error::validation(
            collection,
            format!("{field}: inverse relationships require $some/$every/$none"),
        ));
    };
    for (key, inner) in entries {
        let quantifier = match key.as_str() {
            "$some" => Quantifier::Some,
            "$every" => Quantifier::Every,
            "$none" => Quantifier::None,
            other => {
                return Err(Error::validation(
                    collection,
                    format!("{field}: unsupported inverse operator {other}"),
                ))
            }
        };
        return Ok(Predicate::RelMany {
            field: field.to_string(),
            quantifier,
            predicate: Box::new(parse_where(collection, inner, relationship_kind)?),
        });
    }
    Err(Error::validation(
        collection,
        format!("{field}: inverse relationships require $some/$every/$none"),
    ))
}

fn parse_leaf(collection: &str, field: &str, value: &Value) -> Result<Predicate, Error> {
    let Value::Map(entries) = value else {
        return Ok(Predicate::Leaf {
            field: field.to_string(),
            op: Op::Eq(value.clone()),
        });
    };

    let ops: Result<Vec<Op>, Error> = entries
        .iter()
        .map(|(op_key, op_value)| parse_op(collection, field, op_key, op_value))
        .collect();
    let ops = ops?;

    Ok(match ops.len() {
        0 => Predicate::Leaf {
            field: field.to_string(),
            op: Op::Eq(value.clone()),
        },
        1 => Predicate::Leaf {
            field: field.to_string(),
            op: ops.into_iter().next().expect("checked len"),
        },
        _ => Predicate::And(
            ops.into_iter()
                .map(|op| Predicate::Leaf {
                    field: field.to_string(),
                    op,
                })
                .collect(),
        ),
    })
}

fn parse_op(collection: &str, field: &str, op_key: &str, value: &Value) -> Result<Op, Error> {
    let as_list = |v: &Value| -> Result<Vec<Value>, Error> {
        match v {
            Value::List(items) => Ok(items.clone()),
            other => Err(Error::validation(
                collection,
                format!("{field}.{op_key} expects an array, found {}", other.type_name()),
            )),
        }
    };
    let as_string = |v: &Value| -> Result<String, Error> {
        v.as_str().map(str::to_string).ok_or_else(|| {
            Error::validation(collection, format!("{field}.{op_key} expects a string"))
        })
    };

    Ok(match op_key {
        "$eq" => Op::Eq(value.clone()),
        "$ne" => Op::Ne(value.clone()),
        "$gt" => Op::Gt(value.clone()),
        "$gte" => Op::Gte(value.clone()),
        "$lt" => Op::Lt(value.clone()),
        "$lte" => Op::Lte(value.clone()),
        "$in" => Op::In(as_list(value)?),
        "$nin" => Op::Nin(as_list(value)?),
        "$startsWith" => Op::StartsWith(as_string(value)?),
        "$endsWith" => Op::EndsWith(as_string(value)?),
        "$contains" => Op::Contains(value.clone()),
        "$all" => Op::All(as_list(value)?),
        "$size" => match value {
            Value::Int(n) => Op::Size(*n),
            other => {
                return Err(Error::validation(
                    collection,
                    format!("{field}.$size expects an integer, found {}", other.type_name()),
                ))
            }
        },
        other => {
            return Err(Error::validation(
                collection,
                format!("unsupported operator {other} on field {field}"),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_relationships(_: &str) -> Option<RelationshipKind> {
        None
    }

    #[test]
    fn implicit_top_level_keys_combine_with_and() {
        let where_clause = Value::Map(vec![
            ("title".into(), Value::Text("Dune".into())),
            ("pages".into(), Value::Map(vec![("$gt".into(), Value::Int(100))])),
        ]);
        let pred = parse_where("books", &where_clause, &no_relationships).unwrap();
        assert!(matches!(pred, Predicate::And(children) if children.len() == 2));
    }

    #[test]
    fn bare_value_becomes_eq() {
        let where_clause = Value::Map(vec![("title".into(), Value::Text("Dune".into()))]);
        let pred = parse_where("books", &where_clause, &no_relationships).unwrap();
        assert!(matches!(
            pred,
            Predicate::Leaf {
                op: Op::Eq(Value::Text(ref s)),
                ..
            } if s == "Dune"
        ));
    }

    #[test]
    fn ref_field_parses_as_nested_relationship_clause() {
        let where_clause = Value::Map(vec![(
            "author".into(),
            Value::Map(vec![("name".into(), Value::Text("Herbert".into()))]),
        )]);
        let pred = parse_where("books", &where_clause, &|f| {
            (f == "author").then_some(RelationshipKind::Ref)
        })
        .unwrap();
        assert!(matches!(pred, Predicate::Rel { .. }));
    }
}
