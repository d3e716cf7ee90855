// src/deps/modified_time.rs

use std::sync::Arc;

use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::model::{FileId, FileStatus, TimeStamp};
use crate::paths::FilePathCache;

/// Compares recorded file statuses against the disk.
///
/// Every check stats the files again, so a change is seen whether or not
/// the include watcher reported it.
#[derive(Debug)]
pub struct ModifiedTimeChecker {
    fs: Arc<dyn FileSystem>,
    paths: Arc<FilePathCache>,
}

impl ModifiedTimeChecker {
    pub fn new(fs: Arc<dyn FileSystem>, paths: Arc<FilePathCache>) -> Self {
        Self { fs, paths }
    }

    /// Current modification time of `file_id`, `None` if it is missing.
    pub fn modified_time(&self, file_id: FileId) -> Option<TimeStamp> {
        match self.paths.file_path(file_id) {
            Ok(path) => self.fs.modified_time(&path),
            Err(err) => {
                warn!(?file_id, error = %err, "cannot stat file with unknown id");
                None
            }
        }
    }

    /// `true` if every recorded status still matches the file on disk.
    ///
    /// An empty status list is never up to date.
    pub fn is_up_to_date(&self, statuses: &[FileStatus]) -> bool {
        if statuses.is_empty() {
            return false;
        }

        for status in statuses {
            let current = self.modified_time(status.file_id);
            if current != status.last_modified {
                debug!(
                    file_id = ?status.file_id,
                    recorded = ?status.last_modified,
                    ?current,
                    "file modification time changed"
                );
                return false;
            }
        }

        true
    }
}
