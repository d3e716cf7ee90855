// tests/common/mod.rs

#![allow(dead_code)]

pub use pchdeps_test_utils::builders;
pub use pchdeps_test_utils::init_tracing;

use pchdeps::model::{
    CompilerMacro, FileId, Language, LanguageExtension, LanguageVersion, PchTask, PchTaskSet,
    ProjectPartId,
};

pub fn file(raw: u32) -> FileId {
    FileId::from_raw(raw)
}

pub fn files(raw: &[u32]) -> Vec<FileId> {
    raw.iter().copied().map(FileId::from_raw).collect()
}

/// A task owned by `id` that includes (and depends on) `includes`.
pub fn pch_task(id: &str, includes: &[u32]) -> PchTask {
    PchTask {
        project_part_ids: vec![ProjectPartId::new(id)],
        includes: files(includes),
        sources: files(includes),
        compiler_macros: vec![],
        used_macros: vec![],
        toolchain_arguments: vec!["-m64".to_string()],
        system_include_search_paths: vec![],
        project_include_search_paths: vec![],
        language: Language::Cxx,
        language_version: LanguageVersion::Cxx17,
        language_extension: LanguageExtension::none(),
    }
}

pub fn with_macro(mut task: PchTask, name: &str, value: &str, order: u32) -> PchTask {
    task.compiler_macros
        .push(CompilerMacro::new(name, value, order));
    task
}

pub fn task_set(id: &str, system: &[u32], project: &[u32]) -> PchTaskSet {
    PchTaskSet {
        system: pch_task(id, system),
        project: pch_task(id, project),
    }
}

pub fn ids(raw: &[&str]) -> Vec<ProjectPartId> {
    raw.iter().map(|id| ProjectPartId::new(*id)).collect()
}
