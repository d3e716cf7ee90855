// src/paths/cache.rs

use std::path::{Path, PathBuf};

use lasso::ThreadedRodeo;

use crate::errors::{PchError, Result};
use crate::model::FileId;
use crate::paths::normalize::normalize_path;

/// Thread-safe, bidirectional interner for file paths.
///
/// Ids are dense indices handed out in first-seen order and stay valid for
/// the lifetime of the cache; nothing is ever evicted.
pub struct FilePathCache {
    rodeo: ThreadedRodeo<FileId>,
}

impl FilePathCache {
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Intern `path`, returning the existing id if it was seen before.
    pub fn file_path_id(&self, path: impl AsRef<Path>) -> FileId {
        self.rodeo.get_or_intern(normalize_path(path.as_ref()))
    }

    pub fn file_path_ids<I, P>(&self, paths: I) -> Vec<FileId>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths.into_iter().map(|p| self.file_path_id(p)).collect()
    }

    /// Look up an id without interning.
    pub fn existing_id(&self, path: impl AsRef<Path>) -> Option<FileId> {
        self.rodeo.get(normalize_path(path.as_ref()))
    }

    pub fn file_path(&self, id: FileId) -> Result<PathBuf> {
        self.rodeo
            .try_resolve(&id)
            .map(PathBuf::from)
            .ok_or(PchError::UnknownFile(id))
    }

    pub fn file_paths(&self, ids: &[FileId]) -> Result<Vec<PathBuf>> {
        ids.iter().map(|id| self.file_path(*id)).collect()
    }

    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}

impl Default for FilePathCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FilePathCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePathCache")
            .field("len", &self.rodeo.len())
            .finish()
    }
}
