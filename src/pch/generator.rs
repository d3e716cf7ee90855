// src/pch/generator.rs

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::deps::BuildDependenciesProvider;
use crate::errors::Result;
use crate::model::{
    BuildDependency, CompilerMacro, FileId, PchTask, PchTaskSet, ProjectPart, ProjectPartId,
    SourceType, UsedMacro,
};
use crate::pch::merger::TaskMerger;
use crate::types::Scope;

/// Split one project part's build dependency into its system and project
/// tasks.
///
/// A used macro belongs to the scope of the include entry it was first
/// consulted in (matched by usage order). Macros first seen in the part's
/// own files, or in no known entry, belong to neither task. Only the `Top*`
/// entries become includes of the generated header; every entry of a scope
/// is recorded in that task's `sources`.
pub fn generate_tasks(part: &ProjectPart, dependency: &BuildDependency) -> PchTaskSet {
    let mut system = empty_task(part);
    let mut project = empty_task(part);

    let mut seen_files: HashSet<FileId> = HashSet::new();
    let mut roles: HashMap<u32, SourceType> = HashMap::new();

    for entry in &dependency.includes {
        if !seen_files.insert(entry.file_id) {
            continue;
        }
        roles.entry(entry.usage_order).or_insert(entry.source_type);

        let task = match entry.source_type.scope() {
            Some(Scope::System) => &mut system,
            Some(Scope::Project) => &mut project,
            None => continue,
        };
        task.add_sources(&[entry.file_id]);
        if entry.source_type.is_top() {
            task.includes.push(entry.file_id);
        }
    }

    for used in &dependency.used_macros {
        let scope = roles
            .get(&used.usage_order)
            .and_then(|role| role.scope());
        let task = match scope {
            Some(Scope::System) => &mut system,
            Some(Scope::Project) => &mut project,
            None => continue,
        };
        if task.used_macros.iter().any(|m| m.name == used.name) {
            continue;
        }
        task.used_macros
            .push(UsedMacro::new(used.name.clone(), used.usage_order));
        if let Some(value) = part.macro_value(&used.name) {
            task.compiler_macros
                .push(CompilerMacro::new(used.name.clone(), value, used.usage_order));
        }
    }

    debug!(
        project_part = %part.id,
        system_includes = system.includes.len(),
        project_includes = project.includes.len(),
        system_macros = system.compiler_macros.len(),
        project_macros = project.compiler_macros.len(),
        "generated pch tasks"
    );

    PchTaskSet { system, project }
}

fn empty_task(part: &ProjectPart) -> PchTask {
    PchTask {
        project_part_ids: vec![part.id.clone()],
        includes: Vec::new(),
        sources: Vec::new(),
        compiler_macros: Vec::new(),
        used_macros: Vec::new(),
        toolchain_arguments: part.toolchain_arguments.clone(),
        system_include_search_paths: part.system_include_search_paths.clone(),
        project_include_search_paths: part.project_include_search_paths.clone(),
        language: part.language,
        language_version: part.language_version,
        language_extension: part.language_extension,
    }
}

/// Turns project parts into scoped PCH tasks and hands them to a merger.
pub struct PchTaskGenerator<P, M> {
    provider: P,
    merger: M,
}

impl<P, M> PchTaskGenerator<P, M>
where
    P: BuildDependenciesProvider,
    M: TaskMerger,
{
    pub fn new(provider: P, merger: M) -> Self {
        Self { provider, merger }
    }

    /// Collect (or reuse) dependencies for `parts` and forward one task set
    /// per part to the merger in a single batch.
    pub async fn add_project_parts(
        &mut self,
        parts: &[ProjectPart],
        extra_toolchain_arguments: &[String],
    ) -> Result<()> {
        let mut task_sets = Vec::with_capacity(parts.len());
        for part in parts {
            let dependency = self.provider.create(part).await?;
            task_sets.push(generate_tasks(part, &dependency));
        }

        info!(parts = parts.len(), "forwarding pch task sets to merger");
        self.merger
            .merge_tasks(task_sets, extra_toolchain_arguments);
        Ok(())
    }

    pub fn remove_project_parts(&mut self, ids: &[ProjectPartId]) {
        self.provider.remove_project_parts(ids);
        self.merger.remove_pch_tasks(ids);
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn merger(&self) -> &M {
        &self.merger
    }
}
