mod field;
#[cfg(test)]
mod tests;
mod transform;

pub use field::{FieldKind, FieldSchema};
pub use transform::Transform;

use crate::error::Error;
use crate::value::Value;

///
/// Schema
///
/// A bidirectional contract between a validated in-memory `Value` shape and
/// an encoded on-disk shape (spec.md §4.2). Schemas are composable values,
/// not Rust types: a `Schema` is a named list of `FieldSchema` descriptors,
/// each carrying its own decode/encode/validate behaviour, so that value
/// transforms (e.g. number-as-string) round-trip through the same
/// descriptor used to validate.
///

#[derive(Clone, Debug)]
pub struct Schema {
    pub name: String,
    pub fields: Vec<FieldSchema>,
    /// Field names stripped from input before validation and reattached on
    /// read by the computed-field projection step (spec.md §4.2).
    pub computed: Vec<String>,
    /// Present iff the collection supports soft delete (spec.md §3).
    pub soft_delete: bool,
}

impl Schema {
    #[must_use]
    pub fn new(name: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        Self {
            name: name.into(),
            fields,
            computed: Vec::new(),
            soft_delete: false,
        }
    }

    #[must_use]
    pub fn with_computed(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.computed = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_soft_delete(mut self, enabled: bool) -> Self {
        self.soft_delete = enabled;
        self
    }

    /// Strips computed keys from raw input, decodes every declared field
    /// (applying its source transform), and rejects unknown top-level keys
    /// that aren't computed and aren't one of the engine-managed lifecycle
    /// fields (`id`, `createdAt`, `updatedAt`, `deletedAt`).
    pub fn decode(&self, raw: &Value) -> Result<Value, Error> {
        let Value::Map(raw_entries) = raw else {
            return Err(Error::validation_at(
                &self.name,
                "$",
                format!("expected an object, found {}", raw.type_name()),
            ));
        };

        let mut decoded = Vec::new();
        for field in &self.fields {
            let input = raw_entries
                .iter()
                .find(|(k, _)| k == &field.name)
                .map(|(_, v)| v);
            let value = field.decode(input).map_err(|reason| {
                Error::validation_at(&self.name, &field.name, reason)
            })?;
            decoded.push((field.name.clone(), value));
        }

        for lifecycle in ["id", "createdAt", "updatedAt", "deletedAt"] {
            if let Some((_, v)) = raw_entries.iter().find(|(k, _)| k == lifecycle) {
                if !decoded.iter().any(|(k, _)| k == lifecycle) {
                    decoded.push((lifecycle.to_string(), v.clone()));
                }
            }
        }

        let known: Vec<&str> = self
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .chain(self.computed.iter().map(String::as_str))
            .chain(["id", "createdAt", "updatedAt", "deletedAt"])
            .collect();
        for (k, _) in raw_entries {
            if !known.contains(&k.as_str()) {
                return Err(Error::validation_at(
                    &self.name,
                    k,
                    "unknown field",
                ));
            }
        }

        Ok(Value::Map(decoded))
    }

    /// Validates an already-shaped `Value` without running source
    /// transforms — used after the engine injects synthesised fields such
    /// as `createdAt` (spec.md §4.2).
    pub fn validate(&self, entity: &Value) -> Result<(), Error> {
        let Value::Map(entries) = entity else {
            return Err(Error::validation_at(
                &self.name,
                "$",
                "expected an object",
            ));
        };
        for field in &self.fields {
            let value = entries.iter().find(|(k, _)| k == &field.name).map(|(_, v)| v);
            field
                .validate(value)
                .map_err(|reason| Error::validation_at(&self.name, &field.name, reason))?;
        }
        Ok(())
    }

    /// Inverse of `decode` through all declared transforms (spec.md §4.2,
    /// invariant 4: `decode(encode(x)) ≡ x`).
    #[must_use]
    pub fn encode(&self, entity: &Value) -> Value {
        let Value::Map(entries) = entity else {
            return entity.clone();
        };
        let mut encoded = Vec::new();
        for (k, v) in entries {
            if self.computed.iter().any(|c| c == k) {
                continue;
            }
            let out = match self.fields.iter().find(|f| &f.name == k) {
                Some(field) => field.encode(v),
                None => v.clone(),
            };
            encoded.push((k.clone(), out));
        }
        Value::Map(encoded)
    }

    /// Strips computed keys from a raw input document prior to validation
    /// (spec.md §4.2 and §4.7 step 1).
    #[must_use]
    pub fn strip_computed(&self, raw: &Value) -> Value {
        let Value::Map(entries) = raw else {
            return raw.clone();
        };
        Value::Map(
            entries
                .iter()
                .filter(|(k, _)| !self.computed.iter().any(|c| c == k))
                .cloned()
                .collect(),
        )
    }
}
