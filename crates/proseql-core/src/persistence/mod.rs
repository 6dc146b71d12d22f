mod adapter;
mod codec;
mod file_format;
mod migration;
mod watcher;
mod writer;

pub use adapter::{FsAdapter, MemoryAdapter, StorageAdapter};
pub use codec::{Codec, CodecRegistry, JsonCodec, JsonLinesCodec};
pub use file_format::{load_collection, stamp_version, LoadedCollection, VERSION_KEY};
pub use migration::Migration;
pub use watcher::FileWatcher;
pub use writer::DebouncedWriter;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default coalescing window for the debounced writer (spec.md §4.10).
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

///
/// PersistenceConfig
///
/// Per-collection persistence wiring: where the collection lives on disk,
/// which codec reads/writes it, its declared schema version and migration
/// chain, and the debounce window for coalesced writes (spec.md §6).
///

#[derive(Clone)]
pub struct PersistenceConfig {
    pub path: PathBuf,
    pub adapter: Arc<dyn StorageAdapter>,
    pub codecs: CodecRegistry,
    pub version: Option<u32>,
    pub migrations: Vec<Migration>,
    pub debounce: Duration,
    pub watch: bool,
}

impl std::fmt::Debug for PersistenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceConfig")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("migrations", &self.migrations.len())
            .field("debounce", &self.debounce)
            .field("watch", &self.watch)
            .finish()
    }
}

impl PersistenceConfig {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            adapter: Arc::new(FsAdapter),
            codecs: CodecRegistry::default(),
            version: None,
            migrations: Vec::new(),
            debounce: DEFAULT_DEBOUNCE,
            watch: false,
        }
    }

    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn StorageAdapter>) -> Self {
        self.adapter = adapter;
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    #[must_use]
    pub fn with_migration(mut self, migration: Migration) -> Self {
        self.migrations.push(migration);
        self
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    #[must_use]
    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }
}
