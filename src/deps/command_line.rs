// src/deps/command_line.rs

//! Compiler argument construction shared by the scanner and the PCH builder.

use crate::model::{
    CompilerMacro, IncludeSearchPath, IncludeSearchPathType, Language, LanguageExtension,
    LanguageVersion, PchTask, ProjectPart,
};

/// Whether the compiled input is a header (PCH generation) or a source file
/// (dependency scanning).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Header,
    Source,
}

/// Borrowed view of everything that shapes a compiler invocation.
#[derive(Debug, Clone, Copy)]
pub struct CompileSettings<'a> {
    pub toolchain_arguments: &'a [String],
    pub compiler_macros: &'a [CompilerMacro],
    pub system_include_search_paths: &'a [IncludeSearchPath],
    pub project_include_search_paths: &'a [IncludeSearchPath],
    pub language: Language,
    pub language_version: LanguageVersion,
    pub language_extension: LanguageExtension,
}

impl<'a> From<&'a ProjectPart> for CompileSettings<'a> {
    fn from(part: &'a ProjectPart) -> Self {
        Self {
            toolchain_arguments: &part.toolchain_arguments,
            compiler_macros: &part.compiler_macros,
            system_include_search_paths: &part.system_include_search_paths,
            project_include_search_paths: &part.project_include_search_paths,
            language: part.language,
            language_version: part.language_version,
            language_extension: part.language_extension,
        }
    }
}

impl<'a> From<&'a PchTask> for CompileSettings<'a> {
    fn from(task: &'a PchTask) -> Self {
        Self {
            toolchain_arguments: &task.toolchain_arguments,
            compiler_macros: &task.compiler_macros,
            system_include_search_paths: &task.system_include_search_paths,
            project_include_search_paths: &task.project_include_search_paths,
            language: task.language,
            language_version: task.language_version,
            language_extension: task.language_extension,
        }
    }
}

/// Accumulates compiler arguments in the order the front-end expects them.
#[derive(Debug, Clone, Default)]
pub struct CommandLineBuilder {
    pub command_line: Vec<String>,
}

impl CommandLineBuilder {
    pub fn new(settings: CompileSettings<'_>, input: InputKind) -> Self {
        let mut builder = Self::default();
        builder.add_toolchain_arguments(settings.toolchain_arguments);
        builder.add_language(settings.language, settings.language_extension, input);
        builder.add_language_version(
            settings.language_version,
            settings.language_extension,
        );
        builder.add_language_extensions(settings.language_extension);
        builder.add_compiler_macros(settings.compiler_macros);
        builder.add_project_include_search_paths(settings.project_include_search_paths);
        builder.add_system_include_search_paths(settings.system_include_search_paths);
        builder
    }

    pub fn push(&mut self, arg: impl Into<String>) -> &mut Self {
        self.command_line.push(arg.into());
        self
    }

    pub fn into_args(self) -> Vec<String> {
        self.command_line
    }

    fn add_toolchain_arguments(&mut self, args: &[String]) {
        self.command_line.extend(args.iter().cloned());
    }

    fn add_language(&mut self, language: Language, ext: LanguageExtension, input: InputKind) {
        let base = match (language, ext.objective_c) {
            (Language::C, false) => "c",
            (Language::C, true) => "objective-c",
            (Language::Cxx, false) => "c++",
            (Language::Cxx, true) => "objective-c++",
        };
        let kind = match input {
            InputKind::Header => format!("{base}-header"),
            InputKind::Source => base.to_string(),
        };
        self.push("-x");
        self.push(kind);
    }

    fn add_language_version(&mut self, version: LanguageVersion, ext: LanguageExtension) {
        let name = version.standard_name();
        let std = if ext.gnu {
            match name.strip_prefix('c') {
                Some(rest) => format!("gnu{rest}"),
                None => name.to_string(),
            }
        } else {
            name.to_string()
        };
        self.push(format!("-std={std}"));
    }

    fn add_language_extensions(&mut self, ext: LanguageExtension) {
        if ext.microsoft {
            self.push("-fms-extensions");
        }
        if ext.borland {
            self.push("-fborland-extensions");
        }
        if ext.open_mp {
            self.push("-fopenmp");
        }
    }

    fn add_compiler_macros(&mut self, macros: &[CompilerMacro]) {
        for m in macros {
            if m.value.is_empty() {
                self.push(format!("-D{}", m.name));
            } else {
                self.push(format!("-D{}={}", m.name, m.value));
            }
        }
    }

    fn add_project_include_search_paths(&mut self, paths: &[IncludeSearchPath]) {
        for path in sorted_by_index(paths) {
            let flag = match path.kind {
                IncludeSearchPathType::Framework => "-F",
                _ => "-I",
            };
            self.push(flag);
            self.push(path.path.clone());
        }
    }

    /// System and framework paths in index order, then built-in paths.
    fn add_system_include_search_paths(&mut self, paths: &[IncludeSearchPath]) {
        let sorted = sorted_by_index(paths);
        let (builtin, others): (Vec<_>, Vec<_>) = sorted
            .into_iter()
            .partition(|p| p.kind == IncludeSearchPathType::BuiltIn);

        for path in others.into_iter().chain(builtin) {
            let flag = match path.kind {
                IncludeSearchPathType::Framework => "-F",
                _ => "-isystem",
            };
            self.push(flag);
            self.push(path.path.clone());
        }
    }
}

fn sorted_by_index(paths: &[IncludeSearchPath]) -> Vec<&IncludeSearchPath> {
    let mut sorted: Vec<&IncludeSearchPath> = paths.iter().collect();
    sorted.sort_by_key(|p| p.index);
    sorted
}
