use super::cursor::{Cursor, PageInfo};
use super::populate::{populate, PopulateSource, PopulateSpec};
use super::predicate::{eval, Op, Predicate, RelationSnapshot};
use super::select::{project, Select};
use super::sort::{compare_with_tiebreak, sort_rows, SortDirection, SortKey};
use crate::error::Error;
use crate::index::CollectionIndexes;
use crate::model::ComputedFields;
use crate::state::CollectionState;
use crate::value::Value;

#[derive(Clone, Debug)]
pub enum Pagination {
    None,
    OffsetLimit {
        offset: usize,
        limit: Option<usize>,
    },
    Cursor {
        key: SortKey,
        after: Option<Cursor>,
        limit: usize,
    },
}

impl Default for Pagination {
    fn default() -> Self {
        Self::None
    }
}

#[derive(Clone, Debug, Default)]
pub struct QuerySpec {
    pub where_clause: Option<Predicate>,
    pub sort: Vec<SortKey>,
    pub pagination: Pagination,
    pub populate: PopulateSpec,
    pub select: Option<Select>,
}

pub struct PageResult {
    pub items: Vec<Value>,
    pub page_info: Option<PageInfo>,
}

/// Runs the full streaming pipeline described in spec.md §4.5: snapshot ->
/// index-assisted pre-filter -> filter -> sort -> paginate -> populate ->
/// computed fields -> select. `computed` is the owning collection's
/// `ComputedFields`; each is recomputed against the populated entity and
/// attached before projection (spec.md §4.2, §4.5 step 7).
pub fn run_query(
    collection: &str,
    state: &CollectionState,
    indexes: &CollectionIndexes,
    spec: &QuerySpec,
    relation_ctx: &dyn RelationSnapshot,
    populate_source: &dyn PopulateSource,
    computed: &ComputedFields,
) -> Result<PageResult, Error> {
    let snapshot = state.snapshot();

    let mut rows: Vec<(String, Value)> = match spec
        .where_clause
        .as_ref()
        .and_then(|pred| indexed_candidates(pred, indexes))
    {
        Some(ids) => ids
            .into_iter()
            .filter_map(|id| snapshot.get(&id).map(|v| (id, v.clone())))
            .collect(),
        None => snapshot.iter().map(|(id, v)| (id.clone(), v.clone())).collect(),
    };

    if let Some(pred) = &spec.where_clause {
        rows.retain(|(id, entity)| eval(pred, id, entity, relation_ctx));
    }

    if !spec.sort.is_empty() {
        rows = sort_rows(rows, &spec.sort);
    }

    let (page_rows, page_info) = paginate(rows, &spec.pagination)?;

    let mut populated = Vec::with_capacity(page_rows.len());
    for (id, entity) in &page_rows {
        let mut entity = populate(collection, id, entity, &spec.populate, 1, populate_source)?;
        for (name, compute) in &computed.0 {
            let value = compute(&entity);
            entity.set(name, value);
        }
        populated.push(entity);
    }

    let items = match &spec.select {
        Some(select) => populated.iter().map(|e| project(e, select)).collect(),
        None => populated,
    };

    Ok(PageResult { items, page_info })
}

/// If the top-level where-clause carries an equality or `$in` on an
/// indexed field, or a `$search` the collection maintains a `SearchIndex`
/// for, enumerates the matching id set directly instead of scanning the
/// whole collection (spec.md §4.5 step 1). Consulting an index and
/// finding nothing is a legitimate empty result, distinct from "no index
/// applies" (`None`), which falls back to a full scan.
fn indexed_candidates(pred: &Predicate, indexes: &CollectionIndexes) -> Option<Vec<String>> {
    let leaves: Vec<&Predicate> = match pred {
        Predicate::And(children) => children.iter().collect(),
        leaf @ (Predicate::Leaf { .. } | Predicate::Search { .. }) => vec![leaf],
        _ => Vec::new(),
    };

    for leaf in leaves {
        match leaf {
            Predicate::Leaf { field, op } => {
                let Some(index) = indexes.field(field) else {
                    continue;
                };
                match op {
                    Op::Eq(value) => {
                        return Some(index.lookup_eq(value).map(|ids| ids.to_vec()).unwrap_or_default());
                    }
                    Op::In(values) => return Some(index.lookup_in(values).into_iter().collect()),
                    _ => {}
                }
            }
            Predicate::Search { query, fields } => {
                if let Some(search) = indexes.search() {
                    return Some(search.search(query, fields.as_deref()).into_iter().collect());
                }
            }
            _ => {}
        }
    }
    None
}

fn paginate(
    rows: Vec<(String, Value)>,
    pagination: &Pagination,
) -> Result<(Vec<(String, Value)>, Option<PageInfo>), Error> {
    match pagination {
        Pagination::None => Ok((rows, None)),
        Pagination::OffsetLimit { offset, limit } => {
            let sliced: Vec<_> = rows.into_iter().skip(*offset).collect();
            let page = match limit {
                Some(limit) => sliced.into_iter().take(*limit).collect(),
                None => sliced,
            };
            Ok((page, None))
        }
        Pagination::Cursor { key, after, limit } => paginate_cursor(rows, key, after.as_ref(), *limit),
    }
}

fn paginate_cursor(
    rows: Vec<(String, Value)>,
    key: &SortKey,
    after: Option<&Cursor>,
    limit: usize,
) -> Result<(Vec<(String, Value)>, Option<PageInfo>), Error> {
    let mut candidates: Vec<(String, Value)> = match after {
        None => rows,
        Some(cursor) => {
            if cursor.field != key.field {
                return Err(Error::OperationError {
                    reason: format!(
                        "cursor was minted for field {:?} but query is sorted by {:?}",
                        cursor.field, key.field
                    ),
                });
            }
            rows.into_iter()
                .filter(|(id, entity)| {
                    let value = entity.get_path(&key.field).unwrap_or(&Value::Null);
                    compare_with_tiebreak(value, id, &cursor.key_value, &cursor.id, key.direction)
                        == std::cmp::Ordering::Greater
                })
                .collect()
        }
    };

    let has_next_page = candidates.len() > limit;
    candidates.truncate(limit);
    let end_cursor = candidates.last().map(|(id, entity)| {
        let value = entity.get_path(&key.field).cloned().unwrap_or(Value::Null);
        Cursor {
            field: key.field.clone(),
            key_value: value,
            id: id.clone(),
        }
        .encode()
    });

    Ok((
        candidates,
        Some(PageInfo {
            end_cursor,
            has_next_page,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SearchConfig;

    struct NoRelations;
    impl RelationSnapshot for NoRelations {
        fn ref_target(&self, _field: &str, _entity: &Value) -> Option<Value> {
            None
        }
        fn inverse_targets(&self, _field: &str, _entity_id: &str) -> Vec<Value> {
            Vec::new()
        }
        fn default_search_fields(&self) -> Option<Vec<String>> {
            None
        }
    }
    impl PopulateSource for NoRelations {
        fn get(&self, _collection: &str, _id: &str) -> Option<Value> {
            None
        }
        fn scan_by_field(&self, _collection: &str, _field: &str, _value: &str) -> Vec<(String, Value)> {
            Vec::new()
        }
        fn relationships(&self, _collection: &str) -> Vec<crate::model::RelationshipDef> {
            Vec::new()
        }
    }

    fn book(title: &str, genre: &str) -> Value {
        Value::Map(vec![
            ("title".into(), Value::Text(title.into())),
            ("genre".into(), Value::Text(genre.into())),
        ])
    }

    #[test]
    fn offset_limit_paginates_the_sorted_stream() {
        let state = CollectionState::new();
        state.insert_many(vec![
            ("b1".into(), book("Dune", "scifi")),
            ("b2".into(), book("Emma", "drama")),
            ("b3".into(), book("Circe", "fantasy")),
        ]);
        let indexes = CollectionIndexes::new(&[], &SearchConfig::default());
        let spec = QuerySpec {
            sort: vec![SortKey {
                field: "title".into(),
                direction: SortDirection::Asc,
            }],
            pagination: Pagination::OffsetLimit { offset: 1, limit: Some(1) },
            ..QuerySpec::default()
        };
        let result = run_query(
            "books",
            &state,
            &indexes,
            &spec,
            &NoRelations,
            &NoRelations,
            &ComputedFields::default(),
        )
        .unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].get("title").unwrap().as_str(), Some("Dune"));
    }

    #[test]
    fn equality_on_indexed_field_uses_the_index() {
        let state = CollectionState::new();
        state.insert_many(vec![
            ("b1".into(), book("Dune", "scifi")),
            ("b2".into(), book("Foundation", "scifi")),
            ("b3".into(), book("Emma", "drama")),
        ]);
        let indexes = CollectionIndexes::new(&["genre".to_string()], &SearchConfig::default());
        for (id, entity) in state.snapshot().iter() {
            indexes.insert(id, entity);
        }
        let spec = QuerySpec {
            where_clause: Some(Predicate::Leaf {
                field: "genre".into(),
                op: Op::Eq(Value::Text("scifi".into())),
            }),
            ..QuerySpec::default()
        };
        let result = run_query(
            "books",
            &state,
            &indexes,
            &spec,
            &NoRelations,
            &NoRelations,
            &ComputedFields::default(),
        )
        .unwrap();
        assert_eq!(result.items.len(), 2);
    }

    #[test]
    fn computed_fields_are_attached_on_read() {
        let state = CollectionState::new();
        state.insert_many(vec![("b1".into(), book("Dune", "scifi"))]);
        let indexes = CollectionIndexes::new(&[], &SearchConfig::default());
        let computed = ComputedFields::new().with(
            "shout",
            std::sync::Arc::new(|entity: &Value| {
                Value::Text(entity.get("title").and_then(Value::as_str).unwrap_or_default().to_uppercase())
            }),
        );
        let result = run_query(
            "books",
            &state,
            &indexes,
            &QuerySpec::default(),
            &NoRelations,
            &NoRelations,
            &computed,
        )
        .unwrap();
        assert_eq!(result.items[0].get("shout").unwrap().as_str(), Some("DUNE"));
    }

    #[test]
    fn search_predicate_is_pre_filtered_through_the_search_index() {
        let state = CollectionState::new();
        state.insert_many(vec![
            ("b1".into(), book("Dune", "scifi")),
            ("b2".into(), book("Emma", "drama")),
        ]);
        let indexes = CollectionIndexes::new(&[], &SearchConfig::all_string_fields());
        for (id, entity) in state.snapshot().iter() {
            indexes.insert(id, entity);
        }
        let spec = QuerySpec {
            where_clause: Some(Predicate::Search {
                query: "dune".into(),
                fields: None,
            }),
            ..QuerySpec::default()
        };
        let result = run_query(
            "books",
            &state,
            &indexes,
            &spec,
            &NoRelations,
            &NoRelations,
            &ComputedFields::default(),
        )
        .unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].get("title").unwrap().as_str(), Some("Dune"));
    }

    #[test]
    fn cursor_minted_for_a_different_field_is_rejected() {
        let state = CollectionState::new();
        state.insert_many(vec![
            ("b1".into(), book("Dune", "scifi")),
            ("b2".into(), book("Emma", "drama")),
        ]);
        let indexes = CollectionIndexes::new(&[], &SearchConfig::default());
        let stale_cursor = Cursor {
            field: "genre".into(),
            key_value: Value::Text("drama".into()),
            id: "b2".into(),
        };
        let spec = QuerySpec {
            sort: vec![SortKey {
                field: "title".into(),
                direction: SortDirection::Asc,
            }],
            pagination: Pagination::Cursor {
                key: SortKey {
                    field: "title".into(),
                    direction: SortDirection::Asc,
                },
                after: Some(stale_cursor),
                limit: 10,
            },
            ..QuerySpec::default()
        };
        let err = run_query(
            "books",
            &state,
            &indexes,
            &spec,
            &NoRelations,
            &NoRelations,
            &ComputedFields::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::OperationError { .. }));
    }
}
