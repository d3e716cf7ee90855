// src/store/dependencies.rs

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::model::{
    BuildDependency, FileStatus, ProjectPart, SourceEntry, SourceType, TimeStamp, UsedMacro,
};
use crate::paths::FilePathCache;
use crate::store::{read_json, write_json};

/// Directory (relative to the state dir) holding one JSON file per key.
pub const DEPENDENCY_DIR: &str = "build-dependencies";

/// Content-derived key of a project part.
///
/// Any change to the part's configuration or file list produces a different
/// key, so a stored record is only ever reused for an identical part.
pub fn project_part_key(part: &ProjectPart, paths: &FilePathCache) -> Result<String> {
    #[derive(Serialize)]
    struct KeyInput<'a> {
        id: &'a str,
        toolchain_arguments: &'a [String],
        compiler_macros: &'a [crate::model::CompilerMacro],
        system_include_search_paths: &'a [crate::model::IncludeSearchPath],
        project_include_search_paths: &'a [crate::model::IncludeSearchPath],
        headers: Vec<PathBuf>,
        sources: Vec<PathBuf>,
        language: crate::model::Language,
        language_version: crate::model::LanguageVersion,
        language_extension: crate::model::LanguageExtension,
    }

    let input = KeyInput {
        id: part.id.as_str(),
        toolchain_arguments: &part.toolchain_arguments,
        compiler_macros: &part.compiler_macros,
        system_include_search_paths: &part.system_include_search_paths,
        project_include_search_paths: &part.project_include_search_paths,
        headers: paths.file_paths(&part.header_file_ids)?,
        sources: paths.file_paths(&part.source_file_ids)?,
        language: part.language,
        language_version: part.language_version,
        language_extension: part.language_extension,
    };

    let encoded = serde_json::to_vec(&input)?;
    Ok(blake3::hash(&encoded).to_hex().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSourceEntry {
    pub path: PathBuf,
    pub source_type: SourceType,
    pub usage_order: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFileStatus {
    pub path: PathBuf,
    pub last_modified: Option<TimeStamp>,
}

/// A [`BuildDependency`] with file ids replaced by paths, so it survives a
/// restart (ids are only stable within one process).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBuildDependency {
    pub project_part: String,
    pub includes: Vec<StoredSourceEntry>,
    pub used_macros: Vec<UsedMacro>,
    pub source_files: Vec<PathBuf>,
    pub file_statuses: Vec<StoredFileStatus>,
}

impl StoredBuildDependency {
    pub fn from_dependency(
        project_part: &str,
        dependency: &BuildDependency,
        paths: &FilePathCache,
    ) -> Result<Self> {
        let includes = dependency
            .includes
            .iter()
            .map(|entry| {
                Ok(StoredSourceEntry {
                    path: paths.file_path(entry.file_id)?,
                    source_type: entry.source_type,
                    usage_order: entry.usage_order,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let file_statuses = dependency
            .file_statuses
            .iter()
            .map(|status| {
                Ok(StoredFileStatus {
                    path: paths.file_path(status.file_id)?,
                    last_modified: status.last_modified,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            project_part: project_part.to_string(),
            includes,
            used_macros: dependency.used_macros.clone(),
            source_files: paths.file_paths(&dependency.source_files)?,
            file_statuses,
        })
    }

    pub fn into_dependency(self, paths: &FilePathCache) -> BuildDependency {
        BuildDependency {
            includes: self
                .includes
                .into_iter()
                .map(|entry| {
                    SourceEntry::new(
                        paths.file_path_id(&entry.path),
                        entry.source_type,
                        entry.usage_order,
                    )
                })
                .collect(),
            used_macros: self.used_macros,
            source_files: paths.file_path_ids(&self.source_files),
            file_statuses: self
                .file_statuses
                .into_iter()
                .map(|status| FileStatus {
                    file_id: paths.file_path_id(&status.path),
                    last_modified: status.last_modified,
                })
                .collect(),
        }
    }
}

/// Abstract storage for collected build dependencies.
pub trait BuildDependencyStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<StoredBuildDependency>>;
    fn save(&mut self, key: &str, dependency: &StoredBuildDependency) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Stores each record as `<root>/build-dependencies/<key>.json`.
pub struct FileBuildDependencyStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileBuildDependencyStore {
    pub fn new(root: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { root, fs }
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.root.join(DEPENDENCY_DIR).join(format!("{key}.json"))
    }
}

impl BuildDependencyStore for FileBuildDependencyStore {
    fn load(&self, key: &str) -> Result<Option<StoredBuildDependency>> {
        read_json(self.fs.as_ref(), &self.record_path(key))
    }

    fn save(&mut self, key: &str, dependency: &StoredBuildDependency) -> Result<()> {
        write_json(self.fs.as_ref(), &self.record_path(key), dependency)?;
        info!(
            project_part = %dependency.project_part,
            key = %&key[..key.len().min(16)],
            "stored build dependency (file)"
        );
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.record_path(key);
        if self.fs.exists(&path) {
            self.fs.remove_file(&path)?;
            debug!(?path, "removed stored build dependency");
        }
        Ok(())
    }
}

/// Stores records in memory only.
#[derive(Default)]
pub struct MemoryBuildDependencyStore {
    map: HashMap<String, StoredBuildDependency>,
}

impl MemoryBuildDependencyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BuildDependencyStore for MemoryBuildDependencyStore {
    fn load(&self, key: &str) -> Result<Option<StoredBuildDependency>> {
        Ok(self.map.get(key).cloned())
    }

    fn save(&mut self, key: &str, dependency: &StoredBuildDependency) -> Result<()> {
        self.map.insert(key.to_string(), dependency.clone());
        debug!(project_part = %dependency.project_part, "stored build dependency (memory)");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.map.remove(key);
        Ok(())
    }
}
