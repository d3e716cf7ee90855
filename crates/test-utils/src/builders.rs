#![allow(dead_code)]

use std::path::PathBuf;

use pchdeps::config::{
    ConfigFile, IncludePathConfig, MacroConfig, ManagerSection, ProjectPartConfig, RawConfigFile,
    ToolsSection,
};
use pchdeps::model::{
    CompilerMacro, FileId, IncludeSearchPath, IncludeSearchPathType, Language, LanguageExtension,
    LanguageVersion, ProjectPart, ProjectPartId,
};
use pchdeps::types::StorageMode;

/// Builder for `ProjectPart` to simplify test setup.
///
/// Macro orders and include path indices are assigned in the order the
/// builder methods are called, starting at 1.
pub struct ProjectPartBuilder {
    part: ProjectPart,
}

impl ProjectPartBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            part: ProjectPart {
                id: ProjectPartId::new(id),
                toolchain_arguments: vec![],
                compiler_macros: vec![],
                system_include_search_paths: vec![],
                project_include_search_paths: vec![],
                header_file_ids: vec![],
                source_file_ids: vec![],
                language: Language::Cxx,
                language_version: LanguageVersion::Cxx17,
                language_extension: LanguageExtension::none(),
            },
        }
    }

    pub fn toolchain_argument(mut self, arg: &str) -> Self {
        self.part.toolchain_arguments.push(arg.to_string());
        self
    }

    pub fn define(mut self, name: &str, value: &str) -> Self {
        let order = self.part.compiler_macros.len() as u32 + 1;
        self.part
            .compiler_macros
            .push(CompilerMacro::new(name, value, order));
        self
    }

    pub fn system_include_path(mut self, path: &str) -> Self {
        let index = self.part.system_include_search_paths.len() as u32 + 1;
        self.part.system_include_search_paths.push(IncludeSearchPath::new(
            path,
            index,
            IncludeSearchPathType::System,
        ));
        self
    }

    pub fn project_include_path(mut self, path: &str) -> Self {
        let index = self.part.project_include_search_paths.len() as u32 + 1;
        self.part.project_include_search_paths.push(IncludeSearchPath::new(
            path,
            index,
            IncludeSearchPathType::User,
        ));
        self
    }

    pub fn header(mut self, id: FileId) -> Self {
        self.part.header_file_ids.push(id);
        self
    }

    pub fn source(mut self, id: FileId) -> Self {
        self.part.source_file_ids.push(id);
        self
    }

    pub fn language(mut self, language: Language, version: LanguageVersion) -> Self {
        self.part.language = language;
        self.part.language_version = version;
        self
    }

    pub fn extensions(mut self, extensions: LanguageExtension) -> Self {
        self.part.language_extension = extensions;
        self
    }

    pub fn build(self) -> ProjectPart {
        self.part
    }
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                manager: ManagerSection::default(),
                tools: ToolsSection {
                    scanner: "pchdeps-scan".to_string(),
                    scanner_args: vec![],
                    compiler: "clang++".to_string(),
                },
                project_parts: vec![],
            },
        }
    }

    pub fn with_part(mut self, part: ProjectPartConfig) -> Self {
        self.config.project_parts.push(part);
        self
    }

    pub fn with_storage(mut self, storage: StorageMode) -> Self {
        self.config.manager.storage = storage;
        self
    }

    pub fn with_extra_toolchain_argument(mut self, arg: &str) -> Self {
        self.config
            .manager
            .extra_toolchain_arguments
            .push(arg.to_string());
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ProjectPartConfig`.
pub struct ProjectPartConfigBuilder {
    part: ProjectPartConfig,
}

impl ProjectPartConfigBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            part: ProjectPartConfig {
                id: id.to_string(),
                toolchain_arguments: vec![],
                macros: vec![],
                system_include_paths: vec![],
                project_include_paths: vec![],
                headers: vec![],
                sources: vec![],
                language: Language::Cxx,
                language_version: LanguageVersion::Cxx17,
                language_extension: LanguageExtension::none(),
            },
        }
    }

    pub fn define(mut self, name: &str, value: &str) -> Self {
        self.part.macros.push(MacroConfig {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn system_include_path(mut self, path: &str) -> Self {
        self.part.system_include_paths.push(IncludePathConfig {
            path: path.to_string(),
            kind: None,
        });
        self
    }

    pub fn project_include_path(mut self, path: &str) -> Self {
        self.part.project_include_paths.push(IncludePathConfig {
            path: path.to_string(),
            kind: None,
        });
        self
    }

    pub fn header(mut self, path: &str) -> Self {
        self.part.headers.push(PathBuf::from(path));
        self
    }

    pub fn source(mut self, path: &str) -> Self {
        self.part.sources.push(PathBuf::from(path));
        self
    }

    pub fn build(self) -> ProjectPartConfig {
        self.part
    }
}
