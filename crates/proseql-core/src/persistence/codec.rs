use crate::error::Error;
use crate::value::{from_json, to_json, Value};
use std::collections::HashMap;
use std::sync::Arc;

///
/// Codec
///
/// `encode`/`decode` between a `Value` and on-disk bytes (spec.md §6). Each
/// codec declares the file extensions it handles; the registry dispatches
/// on the path suffix. Concrete formats beyond JSON/JSONL are pluggable and
/// out of scope for this engine (spec.md §1).
///

pub trait Codec: Send + Sync {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, Error>;
    fn decode(&self, bytes: &[u8]) -> Result<Value, Error>;
    fn extensions(&self) -> &'static [&'static str];
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, Error> {
        serde_json::to_vec_pretty(&to_json(value)).map_err(|e| Error::Serialization {
            collection: String::new(),
            reason: e.to_string(),
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, Error> {
        let json: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| Error::Serialization {
                collection: String::new(),
                reason: e.to_string(),
            })?;
        Ok(from_json(&json))
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["json"]
    }
}

/// Newline-delimited JSON: one encoded row per line, in insertion order.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLinesCodec;

impl Codec for JsonLinesCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, Error> {
        let Value::Map(entries) = value else {
            return JsonCodec.encode(value);
        };
        let mut out = Vec::new();
        for (_, row) in entries {
            let line = serde_json::to_vec(&to_json(row)).map_err(|e| Error::Serialization {
                collection: String::new(),
                reason: e.to_string(),
            })?;
            out.extend_from_slice(&line);
            out.push(b'\n');
        }
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, Error> {
        let text = std::str::from_utf8(bytes).map_err(|e| Error::Serialization {
            collection: String::new(),
            reason: e.to_string(),
        })?;
        let mut entries = Vec::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let json: serde_json::Value =
                serde_json::from_str(line).map_err(|e| Error::Serialization {
                    collection: String::new(),
                    reason: e.to_string(),
                })?;
            let row = from_json(&json);
            let id = row
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            entries.push((id, row));
        }
        Ok(Value::Map(entries))
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["jsonl"]
    }
}

///
/// CodecRegistry
///
/// Extension -> codec dispatch table. Immutable after construction (spec.md
/// §5 shared-resource policy).
///

#[derive(Clone)]
pub struct CodecRegistry {
    by_extension: HashMap<&'static str, Arc<dyn Codec>>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        let mut registry = Self {
            by_extension: HashMap::new(),
        };
        registry.register(Arc::new(JsonCodec));
        registry.register(Arc::new(JsonLinesCodec));
        registry
    }
}

impl CodecRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_extension: HashMap::new(),
        }
    }

    pub fn register(&mut self, codec: Arc<dyn Codec>) {
        for ext in codec.extensions() {
            self.by_extension.insert(ext, codec.clone());
        }
    }

    pub fn for_path(&self, path: &std::path::Path) -> Result<Arc<dyn Codec>, Error> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        self.by_extension
            .get(ext)
            .cloned()
            .ok_or_else(|| Error::UnsupportedFormat {
                extension: ext.to_string(),
            })
    }
}
