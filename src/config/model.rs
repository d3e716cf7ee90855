// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::model::{
    CompilerMacro, IncludeSearchPath, IncludeSearchPathType, Language, LanguageExtension,
    LanguageVersion, ProjectPart, ProjectPartId,
};
use crate::paths::FilePathCache;
use crate::types::StorageMode;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [manager]
/// pch_dir = ".pchdeps/pch"
/// storage = "file"
/// system_workers = 2
/// extra_toolchain_arguments = ["--target=x86_64-linux-gnu"]
///
/// [tools]
/// scanner = "pchdeps-scan"
/// compiler = "clang++"
///
/// [[project_part]]
/// id = "app"
/// toolchain_arguments = ["-m64"]
/// macros = [{ name = "NDEBUG", value = "1" }]
/// system_include_paths = [{ path = "/usr/include" }]
/// project_include_paths = [{ path = "include" }]
/// headers = ["include/app.h"]
/// sources = ["src/main.cpp"]
/// language_version = "cxx17"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub manager: ManagerSection,

    #[serde(default)]
    pub tools: ToolsSection,

    #[serde(default, rename = "project_part")]
    pub project_parts: Vec<ProjectPartConfig>,
}

/// Validated configuration. Built only through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub manager: ManagerSection,
    pub tools: ToolsSection,
    pub project_parts: Vec<ProjectPartConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        manager: ManagerSection,
        tools: ToolsSection,
        project_parts: Vec<ProjectPartConfig>,
    ) -> Self {
        Self {
            manager,
            tools,
            project_parts,
        }
    }
}

/// `[manager]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ManagerSection {
    /// Where generated headers and PCH files are written.
    #[serde(default = "default_pch_dir")]
    pub pch_dir: PathBuf,

    /// Where the durable stores keep their JSON documents.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    #[serde(default)]
    pub storage: StorageMode,

    /// 0 means one worker per hardware thread.
    #[serde(default)]
    pub system_workers: usize,

    /// 0 means one worker per hardware thread.
    #[serde(default)]
    pub project_workers: usize,

    /// Watch dependency files and rebuild on change (ignored with `--once`).
    #[serde(default = "default_watch")]
    pub watch: bool,

    /// Appended to every task's toolchain arguments.
    #[serde(default)]
    pub extra_toolchain_arguments: Vec<String>,
}

fn default_pch_dir() -> PathBuf {
    PathBuf::from(".pchdeps/pch")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".pchdeps")
}

fn default_watch() -> bool {
    true
}

impl Default for ManagerSection {
    fn default() -> Self {
        Self {
            pch_dir: default_pch_dir(),
            state_dir: default_state_dir(),
            storage: StorageMode::default(),
            system_workers: 0,
            project_workers: 0,
            watch: default_watch(),
            extra_toolchain_arguments: Vec::new(),
        }
    }
}

/// `[tools]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsSection {
    /// Dependency scanner command (JSON on stdin/stdout).
    #[serde(default)]
    pub scanner: String,

    #[serde(default)]
    pub scanner_args: Vec<String>,

    /// Compiler used to emit PCH files.
    #[serde(default)]
    pub compiler: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MacroConfig {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IncludePathConfig {
    pub path: String,
    /// Defaults to `system` in `system_include_paths` and `user` in
    /// `project_include_paths`.
    #[serde(default)]
    pub kind: Option<IncludeSearchPathType>,
}

/// `[[project_part]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectPartConfig {
    pub id: String,

    #[serde(default)]
    pub toolchain_arguments: Vec<String>,

    /// Macro definitions in definition order.
    #[serde(default)]
    pub macros: Vec<MacroConfig>,

    #[serde(default)]
    pub system_include_paths: Vec<IncludePathConfig>,

    #[serde(default)]
    pub project_include_paths: Vec<IncludePathConfig>,

    #[serde(default)]
    pub headers: Vec<PathBuf>,

    #[serde(default)]
    pub sources: Vec<PathBuf>,

    #[serde(default)]
    pub language: Language,

    #[serde(default)]
    pub language_version: LanguageVersion,

    #[serde(default)]
    pub language_extension: LanguageExtension,
}

fn search_paths(
    paths: &[IncludePathConfig],
    default_kind: IncludeSearchPathType,
) -> Vec<IncludeSearchPath> {
    paths
        .iter()
        .zip(1u32..)
        .map(|(entry, index)| {
            IncludeSearchPath::new(
                entry.path.clone(),
                index,
                entry.kind.unwrap_or(default_kind),
            )
        })
        .collect()
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

impl ProjectPartConfig {
    /// Build the domain value, interning file paths (relative ones are
    /// resolved against `base`).
    pub fn to_project_part(&self, paths: &FilePathCache, base: &Path) -> ProjectPart {
        ProjectPart {
            id: ProjectPartId::new(self.id.clone()),
            toolchain_arguments: self.toolchain_arguments.clone(),
            compiler_macros: self
                .macros
                .iter()
                .zip(1u32..)
                .map(|(m, order)| CompilerMacro::new(m.name.clone(), m.value.clone(), order))
                .collect(),
            system_include_search_paths: search_paths(
                &self.system_include_paths,
                IncludeSearchPathType::System,
            ),
            project_include_search_paths: search_paths(
                &self.project_include_paths,
                IncludeSearchPathType::User,
            ),
            header_file_ids: self
                .headers
                .iter()
                .map(|p| paths.file_path_id(resolve(base, p)))
                .collect(),
            source_file_ids: self
                .sources
                .iter()
                .map(|p| paths.file_path_id(resolve(base, p)))
                .collect(),
            language: self.language,
            language_version: self.language_version,
            language_extension: self.language_extension,
        }
    }
}
