use crate::error::Error;
use crate::model::{RelationshipDef, RelationshipKind};
use crate::value::Value;

/// Sixth level and beyond is silently dropped to prevent cycles (spec.md
/// §4.5 step 5).
pub const MAX_POPULATE_DEPTH: usize = 5;

/// A requested populate tree: relationship field name -> nested spec for
/// that relationship's own target. Mirrors `Value::Map`'s ordered-pairs
/// shape since populate requests are themselves small ordered documents.
#[derive(Clone, Debug, Default)]
pub struct PopulateSpec(pub Vec<(String, PopulateSpec)>);

impl PopulateSpec {
    #[must_use]
    pub fn leaf(name: impl Into<String>) -> (String, PopulateSpec) {
        (name.into(), PopulateSpec::default())
    }
}

///
/// PopulateSource
///
/// The cross-collection lookups populate needs, implemented by the
/// database over its transaction-local snapshots (spec.md §4.5 step 5).
///
pub trait PopulateSource {
    fn get(&self, collection: &str, id: &str) -> Option<Value>;
    fn scan_by_field(&self, collection: &str, field: &str, value: &str) -> Vec<(String, Value)>;
    fn relationships(&self, collection: &str) -> Vec<RelationshipDef>;
}

/// Depth-first attaches the relations named in `spec` onto `entity`,
/// recursing into each target's own declared relationships.
pub fn populate(
    collection: &str,
    id: &str,
    entity: &Value,
    spec: &PopulateSpec,
    depth: usize,
    source: &dyn PopulateSource,
) -> Result<Value, Error> {
    if depth > MAX_POPULATE_DEPTH || spec.0.is_empty() {
        return Ok(entity.clone());
    }

    let relationships = source.relationships(collection);
    let mut out = entity.clone();
    for (field, nested) in &spec.0 {
        let Some(rel) = relationships.iter().find(|r| &r.name == field) else {
            continue;
        };
        match rel.kind {
            RelationshipKind::Ref => populate_ref(collection, id, &mut out, rel, nested, depth, source)?,
            RelationshipKind::Inverse => {
                populate_inverse(id, &mut out, rel, nested, depth, source)?;
            }
        }
    }
    Ok(out)
}

fn populate_ref(
    collection: &str,
    _id: &str,
    out: &mut Value,
    rel: &RelationshipDef,
    nested: &PopulateSpec,
    depth: usize,
    source: &dyn PopulateSource,
) -> Result<(), Error> {
    let fk = out.get(&rel.foreign_key).cloned();
    match fk {
        None | Some(Value::Null) => {
            out.set(&rel.name, Value::Null);
        }
        Some(fk_value) => {
            let target_id = fk_value.as_str().ok_or_else(|| Error::Population {
                collection: collection.to_string(),
                field: rel.name.clone(),
                reason: "foreign key value is not a string".to_string(),
            })?;
            match source.get(&rel.target, target_id) {
                Some(target_entity) => {
                    let populated = populate(&rel.target, target_id, &target_entity, nested, depth + 1, source)?;
                    out.set(&rel.name, populated);
                }
                None => {
                    return Err(Error::DanglingReference {
                        collection: collection.to_string(),
                        field: rel.name.clone(),
                        target_id: target_id.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn populate_inverse(
    id: &str,
    out: &mut Value,
    rel: &RelationshipDef,
    nested: &PopulateSpec,
    depth: usize,
    source: &dyn PopulateSource,
) -> Result<(), Error> {
    let matches = source.scan_by_field(&rel.target, &rel.foreign_key, id);
    let mut list = Vec::with_capacity(matches.len());
    for (target_id, target_entity) in matches {
        list.push(populate(&rel.target, &target_id, &target_entity, nested, depth + 1, source)?);
    }
    out.set(&rel.name, Value::List(list));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSource {
        authors: Vec<(String, Value)>,
        posts: Vec<(String, Value)>,
    }

    impl PopulateSource for FakeSource {
        fn get(&self, collection: &str, id: &str) -> Option<Value> {
            let rows = match collection {
                "authors" => &self.authors,
                "posts" => &self.posts,
                _ => return None,
            };
            rows.iter().find(|(rid, _)| rid == id).map(|(_, v)| v.clone())
        }

        fn scan_by_field(&self, collection: &str, field: &str, value: &str) -> Vec<(String, Value)> {
            let rows = match collection {
                "authors" => &self.authors,
                "posts" => &self.posts,
                _ => return Vec::new(),
            };
            rows.iter()
                .filter(|(_, v)| v.get(field).and_then(Value::as_str) == Some(value))
                .cloned()
                .collect()
        }

        fn relationships(&self, collection: &str) -> Vec<RelationshipDef> {
            match collection {
                "books" => vec![RelationshipDef::ref_to("author", "authors")],
                "authors" => vec![RelationshipDef::inverse("posts", "posts", "author")],
                _ => Vec::new(),
            }
        }
    }

    #[test]
    fn ref_relationship_attaches_target_entity() {
        let source = FakeSource {
            authors: vec![(
                "u1".into(),
                Value::Map(vec![("name".into(), Value::Text("Herbert".into()))]),
            )],
            posts: Vec::new(),
        };
        let book = Value::Map(vec![
            ("title".into(), Value::Text("Dune".into())),
            ("authorId".into(), Value::Text("u1".into())),
        ]);
        let spec = PopulateSpec(vec![PopulateSpec::leaf("author")]);
        let populated = populate("books", "b1", &book, &spec, 1, &source).unwrap();
        assert_eq!(
            populated.get("author").unwrap().get("name").unwrap().as_str(),
            Some("Herbert")
        );
    }

    #[test]
    fn null_foreign_key_yields_missing_relation_not_an_error() {
        let source = FakeSource { authors: Vec::new(), posts: Vec::new() };
        let book = Value::Map(vec![("authorId".into(), Value::Null)]);
        let spec = PopulateSpec(vec![PopulateSpec::leaf("author")]);
        let populated = populate("books", "b1", &book, &spec, 1, &source).unwrap();
        assert!(populated.get("author").unwrap().is_null());
    }

    #[test]
    fn dangling_ref_fails_the_stream() {
        let source = FakeSource { authors: Vec::new(), posts: Vec::new() };
        let book = Value::Map(vec![("authorId".into(), Value::Text("missing".into()))]);
        let spec = PopulateSpec(vec![PopulateSpec::leaf("author")]);
        let err = populate("books", "b1", &book, &spec, 1, &source).unwrap_err();
        assert!(matches!(err, Error::DanglingReference { .. }));
    }

    #[test]
    fn depth_beyond_five_is_silently_dropped() {
        let source = FakeSource { authors: Vec::new(), posts: Vec::new() };
        let entity = Value::Map(vec![("x".into(), Value::Int(1))]);
        let spec = PopulateSpec(vec![PopulateSpec::leaf("author")]);
        let populated = populate("books", "b1", &entity, &spec, 6, &source).unwrap();
        assert!(populated.get("author").is_none());
    }
}
