// src/deps/provider.rs

//! Cached access to build dependencies.
//!
//! The provider is the only caller of the collector. A project part is only
//! re-collected when one of the files its last record consumed changed on
//! disk (per [`ModifiedTimeChecker`]), when it was explicitly invalidated, or
//! when its configuration changed (which changes its store key).

use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::deps::collector::BuildDependencyCollector;
use crate::deps::modified_time::ModifiedTimeChecker;
use crate::deps::scanner::UnsavedFile;
use crate::errors::Result;
use crate::model::{BuildDependency, FileId, ProjectPart, ProjectPartId};
use crate::paths::FilePathCache;
use crate::store::{project_part_key, BuildDependencyStore, StoredBuildDependency};

/// Trait abstracting where the generator gets build dependencies from.
pub trait BuildDependenciesProvider: Send {
    /// Current build dependency of `part`, collected only when stale.
    fn create<'a>(
        &'a mut self,
        part: &'a ProjectPart,
    ) -> Pin<Box<dyn Future<Output = Result<BuildDependency>> + Send + 'a>>;

    /// Mark the given files as changed. Returns the project parts whose
    /// records referenced any of them.
    fn invalidate(&mut self, file_ids: &[FileId]) -> Vec<ProjectPartId>;

    /// Install overlay contents. Returns the parts that depend on them.
    fn update_unsaved_files(&mut self, files: Vec<UnsavedFile>) -> Vec<ProjectPartId>;

    fn remove_unsaved_files(&mut self, paths: &[PathBuf]) -> Vec<ProjectPartId>;

    /// Forget the records of removed project parts.
    fn remove_project_parts(&mut self, ids: &[ProjectPartId]);

    /// Every file referenced by a currently known record.
    fn dependency_files(&self) -> Vec<FileId>;
}

struct Record {
    key: String,
    dependency: BuildDependency,
}

/// Provider backed by a [`BuildDependencyStore`] and a modification-time
/// cache.
pub struct CachingProvider {
    collector: BuildDependencyCollector,
    store: Box<dyn BuildDependencyStore>,
    checker: ModifiedTimeChecker,
    paths: Arc<FilePathCache>,
    records: HashMap<ProjectPartId, Record>,
    /// Parts that must be re-collected on their next `create` regardless of
    /// timestamps (overlay edits do not touch the disk).
    forced: HashSet<ProjectPartId>,
}

impl CachingProvider {
    pub fn new(
        collector: BuildDependencyCollector,
        store: Box<dyn BuildDependencyStore>,
        checker: ModifiedTimeChecker,
        paths: Arc<FilePathCache>,
    ) -> Self {
        Self {
            collector,
            store,
            checker,
            paths,
            records: HashMap::new(),
            forced: HashSet::new(),
        }
    }

    fn load_stored(&self, key: &str) -> Option<BuildDependency> {
        match self.store.load(key) {
            Ok(stored) => stored.map(|stored| stored.into_dependency(&self.paths)),
            Err(err) => {
                warn!(error = %err, "failed to load stored build dependency; treating as missing");
                None
            }
        }
    }

    fn remember(&mut self, id: ProjectPartId, key: String, dependency: BuildDependency) {
        self.records.insert(id, Record { key, dependency });
    }

    async fn create_dependency(&mut self, part: &ProjectPart) -> Result<BuildDependency> {
        let key = project_part_key(part, &self.paths)?;
        let forced = self.forced.remove(&part.id);

        let cached = match self.records.get(&part.id) {
            Some(record) if record.key == key => Some(record.dependency.clone()),
            _ => self.load_stored(&key),
        };

        if let Some(dependency) = &cached {
            if !forced && self.checker.is_up_to_date(&dependency.file_statuses) {
                debug!(project_part = %part.id, "build dependency cache hit");
                self.remember(part.id.clone(), key, dependency.clone());
                return Ok(dependency.clone());
            }
        }

        match self.collector.create(part).await {
            Ok(dependency) => {
                let saved =
                    StoredBuildDependency::from_dependency(part.id.as_str(), &dependency, &self.paths)
                        .and_then(|stored| self.store.save(&key, &stored));
                if let Err(err) = saved {
                    warn!(
                        project_part = %part.id,
                        error = %err,
                        "failed to persist build dependency"
                    );
                }
                self.remember(part.id.clone(), key, dependency.clone());
                Ok(dependency)
            }
            Err(err) => {
                warn!(
                    project_part = %part.id,
                    error = %err,
                    stale = cached.is_some(),
                    "dependency collection failed; keeping previous data"
                );
                let dependency = cached.unwrap_or_default();
                self.remember(part.id.clone(), key, dependency.clone());
                Ok(dependency)
            }
        }
    }
}

impl BuildDependenciesProvider for CachingProvider {
    fn create<'a>(
        &'a mut self,
        part: &'a ProjectPart,
    ) -> Pin<Box<dyn Future<Output = Result<BuildDependency>> + Send + 'a>> {
        Box::pin(self.create_dependency(part))
    }

    fn invalidate(&mut self, file_ids: &[FileId]) -> Vec<ProjectPartId> {
        let changed: HashSet<FileId> = file_ids.iter().copied().collect();
        let affected: BTreeSet<ProjectPartId> = self
            .records
            .iter()
            .filter(|(_, record)| {
                record
                    .dependency
                    .referenced_files()
                    .any(|file_id| changed.contains(&file_id))
            })
            .map(|(id, _)| id.clone())
            .collect();

        if !affected.is_empty() {
            info!(files = file_ids.len(), parts = ?affected, "build dependencies invalidated");
        }
        self.forced.extend(affected.iter().cloned());
        affected.into_iter().collect()
    }

    fn update_unsaved_files(&mut self, files: Vec<UnsavedFile>) -> Vec<ProjectPartId> {
        let ids: Vec<FileId> = files
            .iter()
            .map(|file| self.paths.file_path_id(&file.path))
            .collect();
        self.collector.update_unsaved_files(files);
        self.invalidate(&ids)
    }

    fn remove_unsaved_files(&mut self, paths: &[PathBuf]) -> Vec<ProjectPartId> {
        let ids = self.paths.file_path_ids(paths);
        self.collector.remove_unsaved_files(paths);
        self.invalidate(&ids)
    }

    fn remove_project_parts(&mut self, ids: &[ProjectPartId]) {
        for id in ids {
            self.records.remove(id);
            self.forced.remove(id);
        }
    }

    fn dependency_files(&self) -> Vec<FileId> {
        let files: BTreeSet<FileId> = self
            .records
            .values()
            .flat_map(|record| record.dependency.referenced_files())
            .collect();
        files.into_iter().collect()
    }
}
