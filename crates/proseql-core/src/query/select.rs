use crate::value::Value;

///
/// Select
///
/// A projection over a (possibly populated) entity: either a flat ordered
/// field list, or a nested object mirroring the populated shape, e.g.
/// `{ author: { name: true }, title: true }` (spec.md §4.5 step 6).
///

#[derive(Clone, Debug)]
pub enum Select {
    Fields(Vec<String>),
    Shape(Vec<(String, SelectChild)>),
}

#[derive(Clone, Debug)]
pub enum SelectChild {
    Include,
    Nested(Select),
}

#[must_use]
pub fn project(entity: &Value, select: &Select) -> Value {
    match select {
        Select::Fields(fields) => {
            let mut out = Vec::with_capacity(fields.len());
            for field in fields {
                if let Some(value) = entity.get(field) {
                    out.push((field.clone(), value.clone()));
                }
            }
            Value::Map(out)
        }
        Select::Shape(entries) => {
            let mut out = Vec::with_capacity(entries.len());
            for (key, child) in entries {
                let Some(value) = entity.get(key) else {
                    continue;
                };
                let projected = match child {
                    SelectChild::Include => value.clone(),
                    SelectChild::Nested(nested) => project_child(value, nested),
                };
                out.push((key.clone(), projected));
            }
            Value::Map(out)
        }
    }
}

fn project_child(value: &Value, select: &Select) -> Value {
    match value {
        Value::List(items) => Value::List(items.iter().map(|item| project(item, select)).collect()),
        other => project(other, select),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> Value {
        Value::Map(vec![
            ("title".into(), Value::Text("Dune".into())),
            ("pages".into(), Value::Int(412)),
            (
                "author".into(),
                Value::Map(vec![
                    ("name".into(), Value::Text("Herbert".into())),
                    ("born".into(), Value::Int(1920)),
                ]),
            ),
        ])
    }

    #[test]
    fn flat_field_list_keeps_only_requested_fields() {
        let select = Select::Fields(vec!["title".into()]);
        let projected = project(&book(), &select);
        assert_eq!(projected.get("title").unwrap().as_str(), Some("Dune"));
        assert!(projected.get("pages").is_none());
    }

    #[test]
    fn nested_shape_projects_populated_relations() {
        let select = Select::Shape(vec![
            ("title".into(), SelectChild::Include),
            (
                "author".into(),
                SelectChild::Nested(Select::Fields(vec!["name".into()])),
            ),
        ]);
        let projected = project(&book(), &select);
        let author = projected.get("author").unwrap();
        assert_eq!(author.get("name").unwrap().as_str(), Some("Herbert"));
        assert!(author.get("born").is_none());
    }
}
