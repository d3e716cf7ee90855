// tests/generator_scope_split.rs

mod common;
use crate::common::builders::ProjectPartBuilder;
use crate::common::{file, files, ids, init_tracing};

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use proptest::prelude::*;

use pchdeps::deps::{BuildDependenciesProvider, UnsavedFile};
use pchdeps::errors::Result;
use pchdeps::model::{
    BuildDependency, CompilerMacro, FileId, PchTaskSet, ProjectPart, ProjectPartId, SourceEntry,
    SourceType, UsedMacro,
};
use pchdeps::pch::{generate_tasks, PchTaskGenerator, TaskMerger};

/// Five macros defined in order; file ids equal usage orders.
fn yi_er_part() -> ProjectPart {
    ProjectPartBuilder::new("P1")
        .toolchain_argument("-m64")
        .define("YI", "1")
        .define("ER", "2")
        .define("SAN", "3")
        .define("SE", "4")
        .define("WU", "5")
        .build()
}

fn yi_er_dependency() -> BuildDependency {
    BuildDependency {
        includes: vec![
            SourceEntry::new(file(1), SourceType::ProjectInclude, 1),
            SourceEntry::new(file(2), SourceType::UserInclude, 2),
            SourceEntry::new(file(3), SourceType::TopProjectInclude, 3),
            SourceEntry::new(file(4), SourceType::SystemInclude, 4),
            SourceEntry::new(file(5), SourceType::TopSystemInclude, 5),
        ],
        used_macros: vec![
            UsedMacro::new("YI", 1),
            UsedMacro::new("ER", 2),
            UsedMacro::new("SAN", 3),
            UsedMacro::new("SE", 4),
            UsedMacro::new("WU", 5),
        ],
        source_files: vec![file(100)],
        file_statuses: vec![],
    }
}

fn macro_names(macros: &[CompilerMacro]) -> Vec<&str> {
    macros.iter().map(|m| m.name.as_str()).collect()
}

#[test]
fn project_and_system_macros_follow_their_headers() {
    let tasks = generate_tasks(&yi_er_part(), &yi_er_dependency());

    assert_eq!(macro_names(&tasks.project.compiler_macros), vec!["YI", "SAN"]);
    assert_eq!(tasks.project.includes, files(&[3]));
    assert_eq!(tasks.project.sources, files(&[1, 3]));

    assert_eq!(macro_names(&tasks.system.compiler_macros), vec!["SE", "WU"]);
    assert_eq!(tasks.system.includes, files(&[5]));
    assert_eq!(tasks.system.sources, files(&[4, 5]));
}

#[test]
fn macro_values_come_from_the_part_and_orders_from_the_dependency() {
    let tasks = generate_tasks(&yi_er_part(), &yi_er_dependency());

    assert_eq!(
        tasks.project.compiler_macros,
        vec![
            CompilerMacro::new("YI", "1", 1),
            CompilerMacro::new("SAN", "3", 3),
        ]
    );
    assert_eq!(
        tasks.system.used_macros,
        vec![UsedMacro::new("SE", 4), UsedMacro::new("WU", 5)]
    );
}

#[test]
fn both_tasks_carry_the_part_settings() {
    let part = yi_er_part();
    let tasks = generate_tasks(&part, &yi_er_dependency());

    for task in [&tasks.system, &tasks.project] {
        assert_eq!(task.project_part_ids, ids(&["P1"]));
        assert_eq!(task.toolchain_arguments, part.toolchain_arguments);
        assert_eq!(task.language_version, part.language_version);
    }
}

#[test]
fn used_macro_missing_from_the_part_is_not_fabricated() {
    let part = ProjectPartBuilder::new("P1").define("SE", "4").build();
    let dependency = BuildDependency {
        includes: vec![
            SourceEntry::new(file(4), SourceType::SystemInclude, 4),
            SourceEntry::new(file(5), SourceType::TopSystemInclude, 5),
        ],
        used_macros: vec![UsedMacro::new("SE", 4), UsedMacro::new("UNKNOWN", 5)],
        ..BuildDependency::default()
    };

    let tasks = generate_tasks(&part, &dependency);

    assert_eq!(macro_names(&tasks.system.compiler_macros), vec!["SE"]);
    assert_eq!(
        tasks.system.used_macros,
        vec![UsedMacro::new("SE", 4), UsedMacro::new("UNKNOWN", 5)]
    );
}

#[test]
fn first_entry_for_a_file_decides_its_role() {
    let part = yi_er_part();
    let mut dependency = yi_er_dependency();
    dependency
        .includes
        .push(SourceEntry::new(file(3), SourceType::TopSystemInclude, 6));

    let tasks = generate_tasks(&part, &dependency);

    assert_eq!(tasks.project.includes, files(&[3]));
    assert_eq!(tasks.system.includes, files(&[5]));
}

#[test]
fn empty_dependency_still_yields_a_task_set() {
    let part = yi_er_part();
    let tasks = generate_tasks(&part, &BuildDependency::default());

    for task in [&tasks.system, &tasks.project] {
        assert!(task.includes.is_empty());
        assert!(task.compiler_macros.is_empty());
        assert_eq!(task.project_part_ids, ids(&["P1"]));
    }
}

/// Provider returning canned dependencies.
#[derive(Default)]
struct StaticProvider {
    dependencies: HashMap<ProjectPartId, BuildDependency>,
    created: Vec<ProjectPartId>,
    removed: Vec<ProjectPartId>,
}

impl BuildDependenciesProvider for StaticProvider {
    fn create<'a>(
        &'a mut self,
        part: &'a ProjectPart,
    ) -> Pin<Box<dyn Future<Output = Result<BuildDependency>> + Send + 'a>> {
        Box::pin(async move {
            self.created.push(part.id.clone());
            Ok(self.dependencies.get(&part.id).cloned().unwrap_or_default())
        })
    }

    fn invalidate(&mut self, _file_ids: &[FileId]) -> Vec<ProjectPartId> {
        vec![]
    }

    fn update_unsaved_files(&mut self, _files: Vec<UnsavedFile>) -> Vec<ProjectPartId> {
        vec![]
    }

    fn remove_unsaved_files(&mut self, _paths: &[PathBuf]) -> Vec<ProjectPartId> {
        vec![]
    }

    fn remove_project_parts(&mut self, ids: &[ProjectPartId]) {
        self.removed.extend(ids.iter().cloned());
    }

    fn dependency_files(&self) -> Vec<FileId> {
        vec![]
    }
}

/// Merger that only records what it was given.
#[derive(Default)]
struct RecordingMerger {
    merges: Vec<(Vec<PchTaskSet>, Vec<String>)>,
    removals: Vec<Vec<ProjectPartId>>,
}

impl TaskMerger for RecordingMerger {
    fn merge_tasks(&mut self, task_sets: Vec<PchTaskSet>, extra_toolchain_arguments: &[String]) {
        self.merges
            .push((task_sets, extra_toolchain_arguments.to_vec()));
    }

    fn remove_pch_tasks(&mut self, ids: &[ProjectPartId]) {
        self.removals.push(ids.to_vec());
    }
}

#[tokio::test]
async fn generator_forwards_one_batch_with_extra_arguments() {
    init_tracing();

    let mut provider = StaticProvider::default();
    provider
        .dependencies
        .insert(ProjectPartId::new("P1"), yi_er_dependency());

    let parts = vec![yi_er_part(), ProjectPartBuilder::new("P2").build()];
    let mut generator = PchTaskGenerator::new(provider, RecordingMerger::default());

    generator
        .add_project_parts(&parts, &["--target=x86_64-linux-gnu".to_string()])
        .await
        .unwrap();

    let merges = &generator.merger().merges;
    assert_eq!(merges.len(), 1);
    let (sets, extra) = &merges[0];
    assert_eq!(extra, &vec!["--target=x86_64-linux-gnu".to_string()]);
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].project.includes, files(&[3]));
    assert!(sets[1].system.includes.is_empty());
    // Extra arguments are the merger's business.
    assert_eq!(sets[0].system.toolchain_arguments, vec!["-m64".to_string()]);
    assert_eq!(generator.provider().created, ids(&["P1", "P2"]));
}

#[tokio::test]
async fn generator_removal_reaches_provider_and_merger_without_collection() {
    init_tracing();

    let mut generator =
        PchTaskGenerator::new(StaticProvider::default(), RecordingMerger::default());

    generator.remove_project_parts(&ids(&["P1", "P2"]));

    assert_eq!(generator.merger().removals, vec![ids(&["P1", "P2"])]);
    assert_eq!(generator.provider().removed, ids(&["P1", "P2"]));
    assert!(generator.provider().created.is_empty());
}

fn role_strategy() -> impl Strategy<Value = SourceType> {
    prop_oneof![
        Just(SourceType::ProjectInclude),
        Just(SourceType::UserInclude),
        Just(SourceType::TopProjectInclude),
        Just(SourceType::SystemInclude),
        Just(SourceType::TopSystemInclude),
    ]
}

proptest! {
    #[test]
    fn scopes_never_share_a_macro_or_include(
        roles in proptest::collection::vec(role_strategy(), 0..12),
        used in proptest::collection::vec(0u32..14, 0..12),
    ) {
        let mut builder = ProjectPartBuilder::new("P");
        for index in 0..14 {
            builder = builder.define(&format!("M{index}"), "1");
        }
        let part = builder.build();

        let includes: Vec<SourceEntry> = roles
            .iter()
            .enumerate()
            .map(|(index, role)| {
                let order = index as u32 + 1;
                SourceEntry::new(file(order), *role, order)
            })
            .collect();
        let used_macros = UsedMacro::normalize(
            used.iter().map(|order| UsedMacro::new(format!("M{order}"), *order)).collect(),
        );
        let dependency = BuildDependency {
            includes: includes.clone(),
            used_macros: used_macros.clone(),
            ..BuildDependency::default()
        };

        let tasks = generate_tasks(&part, &dependency);

        for m in &tasks.system.used_macros {
            prop_assert!(!tasks.project.used_macros.contains(m));
        }
        for include in &tasks.system.includes {
            prop_assert!(!tasks.project.includes.contains(include));
        }

        // Every used macro lands exactly where its header's role says.
        for m in &used_macros {
            let role = includes
                .iter()
                .find(|entry| entry.usage_order == m.usage_order)
                .map(|entry| entry.source_type);
            let in_system = tasks.system.used_macros.contains(m);
            let in_project = tasks.project.used_macros.contains(m);
            match role.and_then(|role| role.scope()) {
                Some(pchdeps::types::Scope::System) => prop_assert!(in_system && !in_project),
                Some(pchdeps::types::Scope::Project) => prop_assert!(in_project && !in_system),
                None => prop_assert!(!in_system && !in_project),
            }
        }

        // Orders inside a task never go backwards.
        for task in [&tasks.system, &tasks.project] {
            let orders: Vec<u32> = task.used_macros.iter().map(|m| m.usage_order).collect();
            let mut sorted = orders.clone();
            sorted.sort();
            prop_assert_eq!(orders, sorted);
        }
    }
}
