use crate::db::{CollectionContext, Database};
use crate::error::Result;
use crate::query::{run_query, Predicate, QuerySpec};
use crate::value::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;

/// Default quiet-time before a watch re-evaluates after a relevant change
/// (spec.md §4.9 step 4).
pub const DEFAULT_WATCH_DEBOUNCE: Duration = Duration::from_millis(10);

/// `watch(query)` (spec.md §4.9): emits the current result immediately,
/// then a new result each time a relevant change settles, only when that
/// result differs structurally from the last one emitted. Dropping the
/// stream drops the receiver, which is this function's "on subscriber
/// scope close, unsubscribe" (step 7).
pub fn watch(
    db: Arc<Database>,
    collection: impl Into<String>,
    spec: QuerySpec,
) -> impl Stream<Item = Result<Vec<Value>>> {
    watch_with_debounce(db, collection, spec, DEFAULT_WATCH_DEBOUNCE)
}

pub fn watch_with_debounce(
    db: Arc<Database>,
    collection: impl Into<String>,
    spec: QuerySpec,
    debounce: Duration,
) -> impl Stream<Item = Result<Vec<Value>>> {
    let collection = collection.into();
    let (tx, rx) = mpsc::channel(8);

    tokio::spawn(async move {
        let relevant = relevant_collections(&db, &collection, &spec);
        let mut bus_rx = db.bus().subscribe();
        let mut last: Option<Vec<Value>> = None;

        loop {
            let page = {
                let ctx = CollectionContext::new(&db, &collection);
                let Ok(col) = db.collection(&collection) else {
                    return;
                };
                run_query(
                    &collection,
                    &col.state,
                    &col.indexes,
                    &spec,
                    &ctx,
                    db.as_ref(),
                    &col.config.computed,
                )
            };

            match page {
                Ok(page) => {
                    if last.as_ref() != Some(&page.items) {
                        if tx.send(Ok(page.items.clone())).await.is_err() {
                            return;
                        }
                        last = Some(page.items);
                    }
                }
                Err(err) => {
                    let _ = tx.send(Err(err)).await;
                    return;
                }
            }

            if !wait_for_relevant_change(&mut bus_rx, &relevant, debounce).await {
                return;
            }
        }
    });

    ReceiverStream::new(rx)
}

/// Waits for at least one event touching `relevant`, then absorbs further
/// relevant events for up to `debounce` quiet time before returning,
/// coalescing bursts into a single re-evaluation. Returns `false` when
/// the bus has closed permanently.
async fn wait_for_relevant_change(
    bus_rx: &mut tokio::sync::broadcast::Receiver<crate::bus::ChangeEvent>,
    relevant: &HashSet<String>,
    debounce: Duration,
) -> bool {
    loop {
        match bus_rx.recv().await {
            Ok(event) if relevant.contains(&event.collection) => break,
            Ok(_) => continue,
            Err(RecvError::Lagged(_)) => break,
            Err(RecvError::Closed) => return false,
        }
    }
    loop {
        match tokio::time::timeout(debounce, bus_rx.recv()).await {
            Ok(Ok(event)) if relevant.contains(&event.collection) => continue,
            Ok(Ok(_)) => continue,
            Ok(Err(RecvError::Lagged(_))) => return true,
            Ok(Err(RecvError::Closed)) => return false,
            Err(_elapsed) => return true,
        }
    }
}

/// `watchById(id)` (spec.md §4.9): emits the current entity (or `None`),
/// then further states, terminating the stream once the id is deleted.
pub fn watch_by_id(
    db: Arc<Database>,
    collection: impl Into<String>,
    id: impl Into<String>,
) -> impl Stream<Item = Result<Option<Value>>> {
    let collection = collection.into();
    let id = id.into();
    let (tx, rx) = mpsc::channel(8);

    tokio::spawn(async move {
        let mut bus_rx = db.bus().subscribe();
        let mut last: Option<Option<Value>> = None;

        loop {
            let current = db.collection(&collection).ok().and_then(|c| c.state.get(&id));
            if last.as_ref() != Some(&current) {
                if tx.send(Ok(current.clone())).await.is_err() {
                    return;
                }
                let should_terminate = current.is_none() && last.is_some();
                last = Some(current);
                if should_terminate {
                    return;
                }
            }

            loop {
                match bus_rx.recv().await {
                    Ok(event) if event.collection == collection && event.id == id => break,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(_)) => break,
                    Err(RecvError::Closed) => return,
                }
            }
            tokio::time::sleep(DEFAULT_WATCH_DEBOUNCE).await;
        }
    });

    ReceiverStream::new(rx)
}

/// The root collection plus every target a `Rel`/`RelMany` predicate leaf
/// or a top-level populate field points to (spec.md §4.9 step 3). Not
/// recursive into nested populates: a change two hops away only matters
/// if it also changes what the one-hop relation resolves to, which
/// already surfaces as a change event on the one-hop collection itself.
fn relevant_collections(db: &Database, collection: &str, spec: &QuerySpec) -> HashSet<String> {
    let mut set = HashSet::new();
    set.insert(collection.to_string());

    if let Ok(col) = db.collection(collection) {
        for (field, _) in &spec.populate.0 {
            if let Some(rel) = col.relationship(field) {
                set.insert(rel.target.clone());
            }
        }
        if let Some(pred) = &spec.where_clause {
            collect_predicate_targets(pred, col, &mut set);
        }
    }

    set
}

fn collect_predicate_targets(pred: &Predicate, col: &crate::collection::Collection, set: &mut HashSet<String>) {
    match pred {
        Predicate::Leaf { .. } | Predicate::Search { .. } => {}
        Predicate::And(children) | Predicate::Or(children) => {
            for child in children {
                collect_predicate_targets(child, col, set);
            }
        }
        Predicate::Not(inner) => collect_predicate_targets(inner, col, set),
        Predicate::Rel { field, predicate } => {
            if let Some(rel) = col.relationship(field) {
                set.insert(rel.target.clone());
            }
            collect_predicate_targets(predicate, col, set);
        }
        Predicate::RelMany { field, predicate, .. } => {
            if let Some(rel) = col.relationship(field) {
                set.insert(rel.target.clone());
            }
            collect_predicate_targets(predicate, col, set);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crud::create;
    use crate::db::DatabaseConfig;
    use crate::model::CollectionConfig;
    use crate::schema::{FieldKind, FieldSchema, Schema};
    use tokio_stream::StreamExt;

    fn books_db() -> Arc<Database> {
        let schema = Schema::new(
            "books",
            vec![
                FieldSchema::new("id", FieldKind::Text),
                FieldSchema::new("title", FieldKind::Text),
            ],
        );
        let config = DatabaseConfig::new().with_collection(CollectionConfig::new("books", schema));
        Arc::new(config.build().expect("valid database config"))
    }

    #[tokio::test]
    async fn watch_emits_current_result_then_reacts_to_a_create() {
        let db = books_db();
        create(&db, "books", Value::Map(vec![("title".into(), Value::Text("Dune".into()))])).unwrap();

        let mut stream = Box::pin(watch_with_debounce(
            db.clone(),
            "books",
            QuerySpec::default(),
            Duration::from_millis(5),
        ));

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);

        create(&db, "books", Value::Map(vec![("title".into(), Value::Text("Hyperion".into()))])).unwrap();

        let second = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("stream produced a second item before the timeout")
            .unwrap()
            .unwrap();
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn watch_by_id_terminates_after_delete() {
        let db = books_db();
        let created = create(&db, "books", Value::Map(vec![("title".into(), Value::Text("Dune".into()))])).unwrap();
        let id = created.get("id").and_then(Value::as_str).unwrap().to_string();

        let mut stream = Box::pin(watch_by_id(db.clone(), "books", id.clone()));
        let first = stream.next().await.unwrap().unwrap();
        assert!(first.is_some());

        crate::crud::delete(&db, "books", &id, crate::crud::DeleteOptions::default()).unwrap();

        let after_delete = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("stream produced the post-delete state before the timeout")
            .unwrap()
            .unwrap();
        assert!(after_delete.is_none());
        assert!(stream.next().await.is_none(), "stream terminates once the entity is gone");
    }
}
