use crate::value::Value;

///
/// Transform
///
/// A value-level source transform applied on decode and inverted on
/// encode, so persisted representations can differ from the validated
/// in-memory shape (spec.md §4.2), e.g. a number stored as a string.
///

#[derive(Clone, Debug, Default)]
pub enum Transform {
    #[default]
    Identity,
    /// Decode: text -> number. Encode: number -> text.
    NumberAsString,
    /// Decode: text -> bool ("true"/"false"). Encode: bool -> text.
    BoolAsString,
}

impl Transform {
    #[must_use]
    pub fn decode(&self, value: &Value) -> Result<Value, String> {
        match self {
            Self::Identity => Ok(value.clone()),
            Self::NumberAsString => match value {
                Value::Text(s) => s
                    .parse::<i64>()
                    .map(Value::Int)
                    .or_else(|_| s.parse::<f64>().map(Value::Float))
                    .map_err(|_| format!("{s:?} is not a valid number")),
                other => Ok(other.clone()),
            },
            Self::BoolAsString => match value {
                Value::Text(s) if s == "true" => Ok(Value::Bool(true)),
                Value::Text(s) if s == "false" => Ok(Value::Bool(false)),
                Value::Text(s) => Err(format!("{s:?} is not a valid bool")),
                other => Ok(other.clone()),
            },
        }
    }

    #[must_use]
    pub fn encode(&self, value: &Value) -> Value {
        match self {
            Self::Identity => value.clone(),
            Self::NumberAsString => match value {
                Value::Int(n) => Value::Text(n.to_string()),
                Value::Float(n) => Value::Text(n.to_string()),
                other => other.clone(),
            },
            Self::BoolAsString => match value {
                Value::Bool(b) => Value::Text(b.to_string()),
                other => other.clone(),
            },
        }
    }
}
