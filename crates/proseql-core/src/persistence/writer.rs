use super::{Codec, StorageAdapter};
use crate::error::Result;
use crate::value::Value;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

///
/// DebouncedWriter
///
/// Coalesces repeated writes to one file behind a single timer (spec.md
/// §4.10 "Debounced writer"). Each `schedule` call bumps a generation
/// counter and replaces the pending value; only the last call to survive
/// the debounce window uninterrupted actually hits disk. A write that
/// fails keeps its value pending so the next `schedule`/`flush` retries it.
///

pub struct DebouncedWriter {
    path: PathBuf,
    adapter: Arc<dyn StorageAdapter>,
    codec: Arc<dyn Codec>,
    debounce: Duration,
    generation: Arc<AtomicU64>,
    pending: Arc<Mutex<Option<Value>>>,
}

impl DebouncedWriter {
    #[must_use]
    pub fn new(
        path: PathBuf,
        adapter: Arc<dyn StorageAdapter>,
        codec: Arc<dyn Codec>,
        debounce: Duration,
    ) -> Self {
        Self {
            path,
            adapter,
            codec,
            debounce,
            generation: Arc::new(AtomicU64::new(0)),
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Schedules `value` for a debounced write. Safe to call repeatedly in
    /// quick succession; only the final value within the debounce window is
    /// ever persisted.
    pub fn schedule(&self, value: Value) {
        *self.pending.lock() = Some(value);
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let pending = Arc::clone(&self.pending);
        let adapter = Arc::clone(&self.adapter);
        let codec = Arc::clone(&self.codec);
        let path = self.path.clone();
        let debounce = self.debounce;

        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if generation.load(Ordering::SeqCst) != my_generation {
                return;
            }
            let Some(value) = pending.lock().take() else {
                return;
            };
            if let Err(err) = write_now(&adapter, &codec, &path, &value) {
                tracing::error!(
                    path = %path.display(),
                    error = %err,
                    "debounced write failed, retaining pending value"
                );
                *pending.lock() = Some(value);
            } else {
                tracing::debug!(path = %path.display(), "debounced write flushed");
            }
        });
    }

    /// Forces an immediate, synchronous write of whatever is pending,
    /// bypassing the debounce window (spec.md §4.10 "force-flush on close").
    pub fn flush(&self) -> Result<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let Some(value) = self.pending.lock().take() else {
            return Ok(());
        };
        write_now(&self.adapter, &self.codec, &self.path, &value)
    }

    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

fn write_now(
    adapter: &Arc<dyn StorageAdapter>,
    codec: &Arc<dyn Codec>,
    path: &std::path::Path,
    value: &Value,
) -> Result<()> {
    adapter.ensure_dir(path)?;
    let bytes = codec.encode(value)?;
    adapter.write(path, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{JsonCodec, MemoryAdapter};

    #[tokio::test(start_paused = true)]
    async fn repeated_schedules_coalesce_into_one_write() {
        let adapter: Arc<dyn StorageAdapter> = Arc::new(MemoryAdapter::new());
        let codec: Arc<dyn Codec> = Arc::new(JsonCodec);
        let writer = DebouncedWriter::new(
            PathBuf::from("/tmp/books.json"),
            Arc::clone(&adapter),
            codec,
            Duration::from_millis(50),
        );

        writer.schedule(Value::Map(vec![("a".into(), Value::Int(1))]));
        tokio::time::advance(Duration::from_millis(10)).await;
        writer.schedule(Value::Map(vec![("a".into(), Value::Int(2))]));
        tokio::time::advance(Duration::from_millis(60)).await;
        tokio::task::yield_now().await;

        let bytes = adapter.read(std::path::Path::new("/tmp/books.json")).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains('2'));
        assert!(!text.contains(": 1"));
    }

    #[tokio::test]
    async fn flush_writes_pending_value_immediately() {
        let adapter: Arc<dyn StorageAdapter> = Arc::new(MemoryAdapter::new());
        let codec: Arc<dyn Codec> = Arc::new(JsonCodec);
        let writer = DebouncedWriter::new(
            PathBuf::from("/tmp/books.json"),
            Arc::clone(&adapter),
            codec,
            Duration::from_secs(60),
        );
        writer.schedule(Value::Map(vec![("a".into(), Value::Int(1))]));
        writer.flush().unwrap();
        assert!(adapter.exists(std::path::Path::new("/tmp/books.json")));
    }
}
