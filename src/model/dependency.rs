// src/model/dependency.rs

//! What compiling a project part touches: headers in first-use order and
//! the macros those headers consulted.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{FileId, TimeStamp};
use crate::types::Scope;

/// Role of an included file.
///
/// The `Top*` roles mark the last header of one scope before compilation
/// enters the other scope; those are the headers a PCH `#include`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    ProjectInclude,
    UserInclude,
    TopProjectInclude,
    SystemInclude,
    TopSystemInclude,
}

impl SourceType {
    /// PCH scope this role contributes to. User includes are the project's
    /// own files and never go into a PCH.
    pub fn scope(self) -> Option<Scope> {
        match self {
            SourceType::ProjectInclude | SourceType::TopProjectInclude => Some(Scope::Project),
            SourceType::SystemInclude | SourceType::TopSystemInclude => Some(Scope::System),
            SourceType::UserInclude => None,
        }
    }

    pub fn is_top(self) -> bool {
        matches!(
            self,
            SourceType::TopProjectInclude | SourceType::TopSystemInclude
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceEntry {
    pub file_id: FileId,
    pub source_type: SourceType,
    pub usage_order: u32,
}

impl SourceEntry {
    pub fn new(file_id: FileId, source_type: SourceType, usage_order: u32) -> Self {
        Self {
            file_id,
            source_type,
            usage_order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsedMacro {
    pub name: String,
    pub usage_order: u32,
}

impl UsedMacro {
    pub fn new(name: impl Into<String>, usage_order: u32) -> Self {
        Self {
            name: name.into(),
            usage_order,
        }
    }

    /// Sort by usage order (stable) and keep only the first use of each name.
    pub fn normalize(mut macros: Vec<UsedMacro>) -> Vec<UsedMacro> {
        macros.sort_by_key(|m| m.usage_order);
        let mut seen = HashSet::new();
        macros.retain(|m| seen.insert(m.name.clone()));
        macros
    }
}

/// Modification time of a consumed file at collection time. `None` means the
/// file could not be stat'd.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStatus {
    pub file_id: FileId,
    pub last_modified: Option<TimeStamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildDependency {
    pub includes: Vec<SourceEntry>,
    pub used_macros: Vec<UsedMacro>,
    pub source_files: Vec<FileId>,
    pub file_statuses: Vec<FileStatus>,
}

impl BuildDependency {
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.used_macros.is_empty()
    }

    /// Every file this dependency record was derived from.
    pub fn referenced_files(&self) -> impl Iterator<Item = FileId> + '_ {
        self.includes
            .iter()
            .map(|e| e.file_id)
            .chain(self.source_files.iter().copied())
    }
}
