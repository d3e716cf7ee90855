// src/model/project_part.rs

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::FileId;

/// Identifier of a project part, unique within one project model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectPartId(String);

impl ProjectPartId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectPartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectPartId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A macro definition from the project model: `-D<name>=<value>`.
///
/// `order` is the position at which the macro is defined (or, inside a
/// `PchTask`, the usage order recovered from the build dependency).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompilerMacro {
    pub name: String,
    pub value: String,
    pub order: u32,
}

impl CompilerMacro {
    pub fn new(name: impl Into<String>, value: impl Into<String>, order: u32) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            order,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeSearchPathType {
    System,
    BuiltIn,
    User,
    Framework,
}

/// One `-I`/`-isystem`/`-F` entry. `index` is the declared position; command
/// lines are emitted in ascending index order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncludeSearchPath {
    pub path: String,
    pub index: u32,
    pub kind: IncludeSearchPathType,
}

impl IncludeSearchPath {
    pub fn new(path: impl Into<String>, index: u32, kind: IncludeSearchPathType) -> Self {
        Self {
            path: path.into(),
            index,
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    #[default]
    Cxx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageVersion {
    C89,
    C99,
    C11,
    C18,
    Cxx98,
    Cxx03,
    Cxx11,
    Cxx14,
    #[default]
    Cxx17,
    Cxx20,
}

impl LanguageVersion {
    /// Standard name as spelled after `-std=`, without a GNU prefix.
    pub fn standard_name(self) -> &'static str {
        match self {
            LanguageVersion::C89 => "c89",
            LanguageVersion::C99 => "c99",
            LanguageVersion::C11 => "c11",
            LanguageVersion::C18 => "c18",
            LanguageVersion::Cxx98 => "c++98",
            LanguageVersion::Cxx03 => "c++03",
            LanguageVersion::Cxx11 => "c++11",
            LanguageVersion::Cxx14 => "c++14",
            LanguageVersion::Cxx17 => "c++17",
            LanguageVersion::Cxx20 => "c++20",
        }
    }
}

/// Compiler language extensions enabled for a project part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageExtension {
    pub gnu: bool,
    pub microsoft: bool,
    pub borland: bool,
    pub open_mp: bool,
    pub objective_c: bool,
}

impl LanguageExtension {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            gnu: true,
            microsoft: true,
            borland: true,
            open_mp: true,
            objective_c: true,
        }
    }
}

/// One compiled translation-unit family.
///
/// Immutable once built; an update replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPart {
    pub id: ProjectPartId,
    pub toolchain_arguments: Vec<String>,
    pub compiler_macros: Vec<CompilerMacro>,
    pub system_include_search_paths: Vec<IncludeSearchPath>,
    pub project_include_search_paths: Vec<IncludeSearchPath>,
    pub header_file_ids: Vec<FileId>,
    pub source_file_ids: Vec<FileId>,
    pub language: Language,
    pub language_version: LanguageVersion,
    pub language_extension: LanguageExtension,
}

impl ProjectPart {
    /// Value of the first macro definition named `name`, if any.
    pub fn macro_value(&self, name: &str) -> Option<&str> {
        self.compiler_macros
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.value.as_str())
    }
}
