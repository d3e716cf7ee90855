// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::model::TimeStamp;

#[derive(Debug, Clone)]
struct MockFile {
    content: Vec<u8>,
    modified: TimeStamp,
}

/// In-memory filesystem with a logical clock for modification times.
///
/// Every write or `touch` advances the clock, so a touched file always
/// reports a newer timestamp than before.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockFile>>>,
    clock: Arc<AtomicU64>,
    stats: Arc<AtomicU64>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> MutexGuard<'_, HashMap<PathBuf, MockFile>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn tick(&self) -> TimeStamp {
        (self.clock.fetch_add(1, Ordering::SeqCst) + 1) as TimeStamp
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let modified = self.tick();
        self.files().insert(
            path.as_ref().to_path_buf(),
            MockFile {
                content: content.into(),
                modified,
            },
        );
    }

    /// Bump the modification time of an existing file.
    pub fn touch(&self, path: impl AsRef<Path>) {
        let modified = self.tick();
        if let Some(file) = self.files().get_mut(path.as_ref()) {
            file.modified = modified;
        }
    }

    /// Number of `modified_time` calls served so far.
    pub fn stat_count(&self) -> u64 {
        self.stats.load(Ordering::SeqCst)
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        match self.files().get(path) {
            Some(file) => String::from_utf8(file.content.clone())
                .map_err(|e| anyhow!("Invalid UTF-8: {}", e)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        match self.files().remove(path) {
            Some(_) => Ok(()),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.files().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.exists(path)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        // In mock, we just return the path as is, assuming absolute paths are used in tests
        Ok(path.to_path_buf())
    }

    fn modified_time(&self, path: &Path) -> Option<TimeStamp> {
        self.stats.fetch_add(1, Ordering::SeqCst);
        self.files().get(path).map(|f| f.modified)
    }
}
