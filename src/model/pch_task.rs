// src/model/pch_task.rs

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::errors::Result;
use crate::model::{
    CompilerMacro, FileId, IncludeSearchPath, Language, LanguageExtension, LanguageVersion,
    ProjectPartId, UsedMacro,
};
use crate::paths::FilePathCache;
use crate::types::Scope;

/// One buildable precompiled header.
///
/// `includes`, `compiler_macros` and `used_macros` keep the order in which
/// the originating build dependency listed them; nothing here is ever
/// re-sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PchTask {
    /// Project parts sharing this PCH, in insertion order, without duplicates.
    pub project_part_ids: Vec<ProjectPartId>,
    /// Headers the generated PCH header `#include`s.
    pub includes: Vec<FileId>,
    /// Every header of this scope the PCH depends on.
    pub sources: Vec<FileId>,
    pub compiler_macros: Vec<CompilerMacro>,
    pub used_macros: Vec<UsedMacro>,
    pub toolchain_arguments: Vec<String>,
    pub system_include_search_paths: Vec<IncludeSearchPath>,
    pub project_include_search_paths: Vec<IncludeSearchPath>,
    pub language: Language,
    pub language_version: LanguageVersion,
    pub language_extension: LanguageExtension,
}

/// Fields whose equality decides whether two tasks can share one PCH.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct MergeKey<'a> {
    pub toolchain_arguments: &'a [String],
    pub includes: &'a [FileId],
    pub compiler_macros: &'a [CompilerMacro],
    pub system_include_search_paths: &'a [IncludeSearchPath],
    pub project_include_search_paths: &'a [IncludeSearchPath],
    pub language: Language,
    pub language_version: LanguageVersion,
    pub language_extension: LanguageExtension,
}

/// Merge-key fields with file ids resolved to paths.
#[derive(Debug, Serialize)]
struct ContentKey<'a> {
    scope: Scope,
    includes: Vec<PathBuf>,
    toolchain_arguments: &'a [String],
    compiler_macros: &'a [CompilerMacro],
    system_include_search_paths: &'a [IncludeSearchPath],
    project_include_search_paths: &'a [IncludeSearchPath],
    language: Language,
    language_version: LanguageVersion,
    language_extension: LanguageExtension,
}

impl PchTask {
    pub fn merge_key(&self) -> MergeKey<'_> {
        MergeKey {
            toolchain_arguments: &self.toolchain_arguments,
            includes: &self.includes,
            compiler_macros: &self.compiler_macros,
            system_include_search_paths: &self.system_include_search_paths,
            project_include_search_paths: &self.project_include_search_paths,
            language: self.language,
            language_version: self.language_version,
            language_extension: self.language_extension,
        }
    }

    /// Content-derived identity of this task within `scope`.
    ///
    /// Hashes interned file ids, so it is only meaningful inside one
    /// process. Use [`content_digest`](Self::content_digest) for anything
    /// persisted.
    pub fn key(&self, scope: Scope) -> TaskKey {
        let mut hasher = blake3::Hasher::new();
        hasher.update(scope.to_string().as_bytes());
        // Serializing borrowed slices and plain enums cannot fail.
        let encoded = serde_json::to_vec(&self.merge_key()).unwrap_or_default();
        hasher.update(&encoded);
        TaskKey(hasher.finalize().to_hex().to_string())
    }

    /// Hex blake3 digest of the merge key with include paths in place of
    /// file ids; stable across restarts.
    pub fn content_digest(&self, scope: Scope, paths: &FilePathCache) -> Result<String> {
        let input = ContentKey {
            scope,
            includes: paths.file_paths(&self.includes)?,
            toolchain_arguments: &self.toolchain_arguments,
            compiler_macros: &self.compiler_macros,
            system_include_search_paths: &self.system_include_search_paths,
            project_include_search_paths: &self.project_include_search_paths,
            language: self.language,
            language_version: self.language_version,
            language_extension: self.language_extension,
        };
        let encoded = serde_json::to_vec(&input)?;
        Ok(blake3::hash(&encoded).to_hex().to_string())
    }

    /// Add `ids` that are not yet members, keeping insertion order.
    ///
    /// Returns `true` if membership changed.
    pub fn add_project_parts(&mut self, ids: &[ProjectPartId]) -> bool {
        let before = self.project_part_ids.len();
        for id in ids {
            if !self.project_part_ids.contains(id) {
                self.project_part_ids.push(id.clone());
            }
        }
        self.project_part_ids.len() != before
    }

    /// Returns `true` if membership changed.
    pub fn remove_project_parts(&mut self, ids: &[ProjectPartId]) -> bool {
        let before = self.project_part_ids.len();
        self.project_part_ids.retain(|id| !ids.contains(id));
        self.project_part_ids.len() != before
    }

    pub fn add_sources(&mut self, sources: &[FileId]) {
        for id in sources {
            if !self.sources.contains(id) {
                self.sources.push(*id);
            }
        }
    }
}

/// The two tasks the generator produces for one project part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PchTaskSet {
    pub system: PchTask,
    pub project: PchTask,
}

impl PchTaskSet {
    pub fn get(&self, scope: Scope) -> &PchTask {
        match scope {
            Scope::System => &self.system,
            Scope::Project => &self.project,
        }
    }

    pub fn into_scoped(self) -> [(Scope, PchTask); 2] {
        [(Scope::System, self.system), (Scope::Project, self.project)]
    }
}

/// Hex blake3 digest identifying a merged task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey(String);

impl TaskKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters, enough to tell tasks apart in logs and file names.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(16)]
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}
