use super::*;
use crate::schema::field::FieldKind;

fn book_schema() -> Schema {
    Schema::new(
        "books",
        vec![
            FieldSchema::new("title", FieldKind::Text),
            FieldSchema::new("year", FieldKind::Int),
            FieldSchema::new("genre", FieldKind::Text).optional(),
        ],
    )
}

#[test]
fn decode_rejects_missing_required_field() {
    let schema = book_schema();
    let raw = Value::Map(vec![("title".into(), Value::Text("Dune".into()))]);
    let err = schema.decode(&raw).unwrap_err();
    assert!(err.to_string().contains("year"));
}

#[test]
fn decode_rejects_unknown_field() {
    let schema = book_schema();
    let raw = Value::Map(vec![
        ("title".into(), Value::Text("Dune".into())),
        ("year".into(), Value::Int(1965)),
        ("nope".into(), Value::Bool(true)),
    ]);
    assert!(schema.decode(&raw).is_err());
}

#[test]
fn decode_encode_round_trips_with_transform() {
    let schema = Schema::new(
        "ledger",
        vec![FieldSchema::new("amount", FieldKind::Int)
            .with_transform(Transform::NumberAsString)],
    );
    let raw = Value::Map(vec![("amount".into(), Value::Text("42".into()))]);
    let decoded = schema.decode(&raw).unwrap();
    assert_eq!(decoded.get("amount"), Some(&Value::Int(42)));
    let encoded = schema.encode(&decoded);
    assert_eq!(encoded.get("amount"), Some(&Value::Text("42".into())));
}

#[test]
fn computed_fields_are_stripped_before_validation() {
    let schema = book_schema().with_computed(["displayTitle"]);
    let raw = Value::Map(vec![
        ("title".into(), Value::Text("Dune".into())),
        ("year".into(), Value::Int(1965)),
        ("displayTitle".into(), Value::Text("DUNE".into())),
    ]);
    let stripped = schema.strip_computed(&raw);
    assert!(schema.decode(&stripped).is_ok());
}

#[test]
fn validate_accepts_synthesised_lifecycle_fields() {
    let schema = book_schema();
    let entity = Value::Map(vec![
        ("title".into(), Value::Text("Dune".into())),
        ("year".into(), Value::Int(1965)),
        ("id".into(), Value::Text("b1".into())),
        ("createdAt".into(), Value::Text("2026-01-01T00:00:00Z".into())),
    ]);
    assert!(schema.validate(&entity).is_ok());
}
