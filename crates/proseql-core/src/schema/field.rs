use super::Transform;
use crate::value::Value;

///
/// FieldKind
///
/// Structural type of one schema field. Supports the primitives, lists,
/// nested objects, unions and literals spec.md §4.2 requires.
///

#[derive(Clone, Debug)]
pub enum FieldKind {
    Text,
    Int,
    Float,
    Bool,
    List(Box<FieldKind>),
    Object(Vec<FieldSchema>),
    /// Value must equal one of the given literals.
    Literal(Vec<Value>),
    /// Value must decode against at least one member kind.
    Union(Vec<FieldKind>),
    /// Accepts any shape without further structural checking.
    Any,
}

impl FieldKind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Text => matches!(value, Value::Text(_)),
            Self::Int => matches!(value, Value::Int(_)),
            Self::Float => matches!(value, Value::Int(_) | Value::Float(_)),
            Self::Bool => matches!(value, Value::Bool(_)),
            Self::Any => true,
            Self::List(item) => match value {
                Value::List(items) => items.iter().all(|v| item.matches(v)),
                _ => false,
            },
            Self::Object(fields) => match value {
                Value::Map(entries) => fields.iter().all(|f| {
                    let found = entries.iter().find(|(k, _)| k == &f.name).map(|(_, v)| v);
                    f.validate(found).is_ok()
                }),
                _ => false,
            },
            Self::Literal(options) => options.iter().any(|o| o == value),
            Self::Union(members) => members.iter().any(|m| m.matches(value)),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Text => "text".into(),
            Self::Int => "int".into(),
            Self::Float => "float".into(),
            Self::Bool => "bool".into(),
            Self::Any => "any".into(),
            Self::List(item) => format!("list<{}>", item.describe()),
            Self::Object(_) => "object".into(),
            Self::Literal(options) => format!("one of {options:?}"),
            Self::Union(members) => members
                .iter()
                .map(Self::describe)
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }
}

///
/// FieldSchema
///

#[derive(Clone, Debug)]
pub struct FieldSchema {
    pub name: String,
    pub kind: FieldKind,
    pub optional: bool,
    pub transform: Transform,
    pub default: Option<Value>,
}

impl FieldSchema {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: false,
            transform: Transform::Identity,
            default: None,
        }
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Decodes through the field's source transform, then structurally
    /// validates the result.
    pub(super) fn decode(&self, input: Option<&Value>) -> Result<Value, String> {
        let raw = match input {
            Some(v) => v,
            None => {
                if let Some(default) = &self.default {
                    return Ok(default.clone());
                }
                if self.optional {
                    return Ok(Value::Null);
                }
                return Err("missing required field".to_string());
            }
        };
        if raw.is_null() && self.optional {
            return Ok(Value::Null);
        }
        let transformed = self.transform.decode(raw)?;
        self.validate(Some(&transformed))?;
        Ok(transformed)
    }

    pub(super) fn validate(&self, value: Option<&Value>) -> Result<(), String> {
        match value {
            None | Some(Value::Null) if self.optional => Ok(()),
            None => Err("missing required field".to_string()),
            Some(v) if self.kind.matches(v) => Ok(()),
            Some(v) => Err(format!(
                "expected {}, found {} ({})",
                self.kind.describe(),
                v.type_name(),
                v
            )),
        }
    }

    pub(super) fn encode(&self, value: &Value) -> Value {
        self.transform.encode(value)
    }
}
