use crate::error::Error;
use crate::value::{from_json, to_json, Value};

///
/// Cursor
///
/// Opaque, deterministic pagination token built from the sort field it was
/// minted against, that field's value, and the id tiebreaker (spec.md §4.5
/// step 4). Encoded as hex-encoded JSON rather than base64: still opaque to
/// callers, deterministic, and needs no dependency beyond what's already in
/// the workspace. Carrying `field` lets the pipeline reject a cursor
/// replayed against a query sorted by a different field instead of
/// silently paginating against the wrong boundary.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Cursor {
    pub field: String,
    pub key_value: Value,
    pub id: String,
}

#[derive(Clone, Debug)]
pub struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

impl Cursor {
    #[must_use]
    pub fn encode(&self) -> String {
        let json = serde_json::json!([self.field, to_json(&self.key_value), self.id]);
        let bytes = json.to_string().into_bytes();
        hex_encode(&bytes)
    }

    pub fn decode(token: &str) -> Result<Self, Error> {
        let bytes = hex_decode(token)
            .ok_or_else(|| Error::OperationError { reason: "malformed cursor".to_string() })?;
        let text = String::from_utf8(bytes)
            .map_err(|_| Error::OperationError { reason: "malformed cursor".to_string() })?;
        let parsed: serde_json::Value = serde_json::from_str(&text)
            .map_err(|_| Error::OperationError { reason: "malformed cursor".to_string() })?;
        let serde_json::Value::Array(parts) = parsed else {
            return Err(Error::OperationError { reason: "malformed cursor".to_string() });
        };
        let [field, key_value, id] = <[serde_json::Value; 3]>::try_from(parts)
            .map_err(|_| Error::OperationError { reason: "malformed cursor".to_string() })?;
        let field = field
            .as_str()
            .ok_or_else(|| Error::OperationError { reason: "malformed cursor".to_string() })?
            .to_string();
        let id = id
            .as_str()
            .ok_or_else(|| Error::OperationError { reason: "malformed cursor".to_string() })?
            .to_string();
        Ok(Self {
            field,
            key_value: from_json(&key_value),
            id,
        })
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips() {
        let cursor = Cursor {
            field: "pages".to_string(),
            key_value: Value::Int(42),
            id: "b1".to_string(),
        };
        let token = cursor.encode();
        let decoded = Cursor::decode(&token).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(Cursor::decode("not-hex!!").is_err());
    }
}
