use super::{Codec, StorageAdapter};
use crate::error::Error;
use crate::hooks::ChangeKind;
use crate::value::Value;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Callback fired once per row that changed between two on-disk snapshots.
pub type ExternalChangeFn =
    Arc<dyn Fn(ChangeKind, &str, Option<&Value>, Option<&Value>) + Send + Sync>;

///
/// FileWatcher
///
/// Watches a collection's backing file for edits made outside this process
/// and synthesizes create/update/delete events by diffing the reloaded
/// snapshot against the last known one (spec.md §6 "External edits").
/// ProseQL never merges external writes with in-memory state automatically;
/// the caller decides whether and how to apply the diff.
///

pub struct FileWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
}

impl FileWatcher {
    pub fn spawn(
        path: PathBuf,
        adapter: Arc<dyn StorageAdapter>,
        codec: Arc<dyn Codec>,
        last_known: Arc<Mutex<Value>>,
        debounce: Duration,
        on_change: ExternalChangeFn,
    ) -> Result<Self, Error> {
        let watch_target = path.clone();
        let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| {
            let Ok(events) = result else {
                return;
            };
            if events.is_empty() {
                return;
            }
            let Ok(bytes) = adapter.read(&path) else {
                return;
            };
            let Ok(reloaded) = codec.decode(&bytes) else {
                return;
            };
            let mut guard = last_known.lock();
            diff_and_emit(&guard, &reloaded, on_change.as_ref());
            *guard = reloaded;
        })
        .map_err(|e| watch_err(&watch_target, e))?;

        debouncer
            .watcher()
            .watch(&watch_target, RecursiveMode::NonRecursive)
            .map_err(|e| watch_err(&watch_target, e))?;

        Ok(Self {
            _debouncer: debouncer,
        })
    }
}

fn watch_err(path: &std::path::Path, source: impl std::fmt::Display) -> Error {
    Error::Storage {
        path: path.display().to_string(),
        reason: source.to_string(),
    }
}

/// Row-level diff between two `Value::Map` snapshots, emitting one event
/// per created, updated or deleted id.
fn diff_and_emit(old: &Value, new: &Value, on_change: &(dyn Fn(ChangeKind, &str, Option<&Value>, Option<&Value>) + Send + Sync)) {
    let (Value::Map(old_rows), Value::Map(new_rows)) = (old, new) else {
        return;
    };

    for (id, before) in old_rows {
        if !new_rows.iter().any(|(nid, _)| nid == id) {
            on_change(ChangeKind::Delete, id, Some(before), None);
        }
    }
    for (id, after) in new_rows {
        match old_rows.iter().find(|(oid, _)| oid == id) {
            None => on_change(ChangeKind::Create, id, None, Some(after)),
            Some((_, before)) if before != after => {
                on_change(ChangeKind::Update, id, Some(before), Some(after));
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_detects_create_update_and_delete() {
        let old = Value::Map(vec![
            ("a".into(), Value::Map(vec![("n".into(), Value::Int(1))])),
            ("b".into(), Value::Map(vec![("n".into(), Value::Int(2))])),
        ]);
        let new = Value::Map(vec![
            ("a".into(), Value::Map(vec![("n".into(), Value::Int(1))])),
            ("c".into(), Value::Map(vec![("n".into(), Value::Int(3))])),
        ]);

        let events = Arc::new(Mutex::new(Vec::<(ChangeKind, String)>::new()));
        let sink = Arc::clone(&events);
        let cb = move |kind: ChangeKind, id: &str, _before: Option<&Value>, _after: Option<&Value>| {
            sink.lock().push((kind, id.to_string()));
        };
        diff_and_emit(&old, &new, &cb);

        let events = events.lock();
        assert!(events.contains(&(ChangeKind::Delete, "b".to_string())));
        assert!(events.contains(&(ChangeKind::Create, "c".to_string())));
        assert!(!events.iter().any(|(_, id)| id == "a"));
    }
}
