use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

///
/// StorageAdapter
///
/// The small filesystem capability set the persistence layer depends on
/// (spec.md §6). Kept abstract so tests can swap in an in-memory double and
/// so the engine never assumes a particular filesystem.
///

pub trait StorageAdapter: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn remove(&self, path: &Path) -> Result<()>;
    fn ensure_dir(&self, path: &Path) -> Result<()>;
}

/// Default adapter: plain `std::fs`, with atomic write via a sibling
/// temporary file + rename (spec.md §4.10 "Atomic write").
#[derive(Debug, Default, Clone, Copy)]
pub struct FsAdapter;

impl StorageAdapter for FsAdapter {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| storage_err(path, e))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = sibling_tmp_path(path);
        std::fs::write(&tmp, bytes).map_err(|e| storage_err(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| storage_err(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove(&self, path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path).map_err(|e| storage_err(path, e))?;
        }
        Ok(())
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| storage_err(parent, e))?;
        }
        Ok(())
    }
}

fn sibling_tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("proseql");
    tmp.set_file_name(format!(".{file_name}.tmp"));
    tmp
}

fn storage_err(path: &Path, source: std::io::Error) -> Error {
    Error::Storage {
        path: path.display().to_string(),
        reason: source.to_string(),
    }
}

/// In-memory test double used by persistence tests and by `test_support`
/// fixtures so they don't touch the real filesystem.
#[derive(Debug, Default, Clone)]
pub struct MemoryAdapter {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
}

impl MemoryAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageAdapter for MemoryAdapter {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::Storage {
                path: path.display().to_string(),
                reason: "no such file".to_string(),
            })
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.files.lock().insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        self.files.lock().remove(path);
        Ok(())
    }

    fn ensure_dir(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}
