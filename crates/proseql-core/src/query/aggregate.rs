use crate::value::{as_f64, value_cmp, Value};

///
/// AggregateSpec / AggregateResult
///
/// `aggregate({ where?, groupBy?, count?, sum?, min?, max?, avg? })`
/// (spec.md §4.6). Operates on an already-filtered row slice; the pipeline
/// is responsible for running the where-clause first.
///

#[derive(Clone, Debug, Default)]
pub struct AggregateSpec {
    pub count: bool,
    pub sum: Vec<String>,
    pub min: Vec<String>,
    pub max: Vec<String>,
    pub avg: Vec<String>,
    pub group_by: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AggregateResult {
    pub group: Option<(String, Value)>,
    pub count: Option<i64>,
    pub sum: Vec<(String, f64)>,
    pub min: Vec<(String, Option<Value>)>,
    pub max: Vec<(String, Option<Value>)>,
    pub avg: Vec<(String, Option<f64>)>,
}

#[must_use]
pub fn aggregate(rows: &[Value], spec: &AggregateSpec) -> Vec<AggregateResult> {
    match &spec.group_by {
        None => vec![aggregate_group(None, rows, spec)],
        Some(field) => group_rows(rows, field)
            .into_iter()
            .map(|(key, group_rows)| aggregate_group(Some((field.clone(), key)), &group_rows, spec))
            .collect(),
    }
}

/// Partitions `rows` by `field`, ordering groups by first occurrence
/// (spec.md §4.6 "Group ordering is by first-occurrence of the group value").
fn group_rows(rows: &[Value], field: &str) -> Vec<(Value, Vec<Value>)> {
    let mut buckets: Vec<(Value, Vec<Value>)> = Vec::new();
    for row in rows {
        let key = row.get(field).cloned().unwrap_or(Value::Null);
        match buckets.iter_mut().find(|(k, _)| *k == key) {
            Some((_, bucket)) => bucket.push(row.clone()),
            None => buckets.push((key, vec![row.clone()])),
        }
    }
    buckets
}

fn aggregate_group(
    group: Option<(String, Value)>,
    rows: &[Value],
    spec: &AggregateSpec,
) -> AggregateResult {
    AggregateResult {
        group,
        count: spec.count.then(|| rows.len() as i64),
        sum: spec.sum.iter().map(|f| (f.clone(), sum_field(rows, f))).collect(),
        min: spec.min.iter().map(|f| (f.clone(), extreme_field(rows, f, true))).collect(),
        max: spec.max.iter().map(|f| (f.clone(), extreme_field(rows, f, false))).collect(),
        avg: spec.avg.iter().map(|f| (f.clone(), avg_field(rows, f))).collect(),
    }
}

fn numeric_values<'a>(rows: &'a [Value], field: &'a str) -> impl Iterator<Item = f64> + 'a {
    rows.iter().filter_map(move |r| r.get(field).and_then(as_f64))
}

/// Non-numeric or null values are skipped; empty input sums to 0
/// (spec.md §4.6 "sum").
fn sum_field(rows: &[Value], field: &str) -> f64 {
    numeric_values(rows, field).sum()
}

/// `sum / count-of-numeric`; no numeric values at all yields `None`
/// (spec.md §4.6 "avg").
fn avg_field(rows: &[Value], field: &str) -> Option<f64> {
    let values: Vec<f64> = numeric_values(rows, field).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Comparable field (number or string); empty input yields `None`
/// (spec.md §4.6 "min"/"max").
fn extreme_field(rows: &[Value], field: &str, want_min: bool) -> Option<Value> {
    let candidates = rows.iter().filter_map(|r| r.get(field)).filter(|v| !v.is_null());
    if want_min {
        candidates.min_by(|a, b| value_cmp(a, b)).cloned()
    } else {
        candidates.max_by(|a, b| value_cmp(a, b)).cloned()
    }
}
