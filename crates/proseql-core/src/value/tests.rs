use super::*;

#[test]
fn get_path_navigates_nested_maps() {
    let v = Value::Map(vec![(
        "author".into(),
        Value::Map(vec![("name".into(), Value::Text("Ursula".into()))]),
    )]);
    assert_eq!(v.get_path("author.name"), Some(&Value::Text("Ursula".into())));
    assert_eq!(v.get_path("author.missing"), None);
}

#[test]
fn merged_overwrites_only_patched_keys() {
    let base = Value::Map(vec![
        ("title".into(), Value::Text("Dune".into())),
        ("year".into(), Value::Int(1965)),
    ]);
    let patch = Value::Map(vec![("year".into(), Value::Int(1966))]);
    let merged = base.merged(&patch);
    assert_eq!(merged.get("title"), Some(&Value::Text("Dune".into())));
    assert_eq!(merged.get("year"), Some(&Value::Int(1966)));
}

#[test]
fn value_eq_coerces_int_and_float() {
    assert!(value_eq(&Value::Int(1), &Value::Float(1.0)));
    assert!(!value_eq(&Value::Int(1), &Value::Float(1.5)));
}

#[test]
fn value_cmp_sorts_nulls_last() {
    let mut values = vec![Value::Int(2), Value::Null, Value::Int(1)];
    values.sort_by(value_cmp);
    assert_eq!(values, vec![Value::Int(1), Value::Int(2), Value::Null]);
}

#[test]
fn json_round_trip_preserves_shape() {
    let v = Value::Map(vec![
        ("a".into(), Value::Int(1)),
        ("b".into(), Value::List(vec![Value::Text("x".into())])),
    ]);
    let json = to_json(&v);
    let back = from_json(&json);
    assert_eq!(v, back);
}
