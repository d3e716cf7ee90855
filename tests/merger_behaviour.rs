// tests/merger_behaviour.rs

mod common;
use crate::common::{files, ids, init_tracing, pch_task, task_set, with_macro};

use pchdeps::model::{PchTask, PchTaskSet, ProjectPartId, TaskKey};
use pchdeps::pch::{PchTaskSink, PchTasksMerger, TaskMerger};
use pchdeps::types::Scope;

#[derive(Debug, Clone, PartialEq, Eq)]
enum SinkCall {
    Add(Scope, Vec<Vec<ProjectPartId>>),
    Update(Scope, Vec<Vec<ProjectPartId>>),
    Remove(Scope, Vec<TaskKey>),
}

/// Sink that records every call in order.
#[derive(Debug, Default)]
struct RecordingSink {
    calls: Vec<SinkCall>,
}

impl RecordingSink {
    fn for_scope(&self, scope: Scope) -> Vec<SinkCall> {
        self.calls
            .iter()
            .filter(|call| match call {
                SinkCall::Add(s, _) | SinkCall::Update(s, _) | SinkCall::Remove(s, _) => {
                    *s == scope
                }
            })
            .cloned()
            .collect()
    }

    fn removals_of(&self, scope: Scope, key: &TaskKey) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, SinkCall::Remove(s, keys) if *s == scope && keys.contains(key)))
            .count()
    }
}

fn members(tasks: &[PchTask]) -> Vec<Vec<ProjectPartId>> {
    tasks.iter().map(|t| t.project_part_ids.clone()).collect()
}

impl PchTaskSink for RecordingSink {
    fn add_pch_tasks(&mut self, scope: Scope, tasks: Vec<PchTask>) {
        self.calls.push(SinkCall::Add(scope, members(&tasks)));
    }

    fn update_pch_tasks(&mut self, scope: Scope, tasks: Vec<PchTask>) {
        self.calls.push(SinkCall::Update(scope, members(&tasks)));
    }

    fn remove_pch_tasks(&mut self, scope: Scope, keys: Vec<TaskKey>) {
        self.calls.push(SinkCall::Remove(scope, keys));
    }
}

fn merger() -> PchTasksMerger<RecordingSink> {
    init_tracing();
    PchTasksMerger::new(RecordingSink::default())
}

#[test]
fn identical_parts_share_one_task_in_insertion_order() {
    let mut merger = merger();

    merger.merge_tasks(
        vec![task_set("A", &[5], &[3]), task_set("B", &[5], &[3])],
        &[],
    );

    for scope in Scope::ALL {
        let tasks = merger.tasks(scope);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].project_part_ids, ids(&["A", "B"]));
    }
    assert_eq!(
        merger.sink().for_scope(Scope::System),
        vec![SinkCall::Add(Scope::System, vec![ids(&["A", "B"])])]
    );
}

#[test]
fn different_macros_keep_tasks_apart() {
    let mut merger = merger();
    let a = PchTaskSet {
        system: with_macro(pch_task("A", &[5]), "NDEBUG", "1", 1),
        project: pch_task("A", &[3]),
    };
    let b = task_set("B", &[5], &[3]);

    merger.merge_tasks(vec![a, b], &[]);

    assert_eq!(merger.tasks(Scope::System).len(), 2);
    assert_eq!(merger.tasks(Scope::Project).len(), 1);
}

#[test]
fn merging_the_same_part_twice_leaves_membership_unchanged() {
    let mut merger = merger();

    merger.merge_tasks(vec![task_set("A", &[5], &[3])], &[]);
    merger.merge_tasks(vec![task_set("A", &[5], &[3])], &[]);

    for scope in Scope::ALL {
        assert_eq!(merger.tasks(scope).len(), 1);
        assert_eq!(merger.tasks(scope)[0].project_part_ids, ids(&["A"]));
    }
}

#[test]
fn extra_toolchain_arguments_are_appended_before_comparing() {
    let mut merger = merger();

    merger.merge_tasks(vec![task_set("A", &[5], &[3])], &["-fPIC".to_string()]);
    merger.merge_tasks(vec![task_set("B", &[5], &[3])], &[]);

    let system = merger.tasks(Scope::System);
    assert_eq!(system.len(), 2);
    assert_eq!(
        system[0].toolchain_arguments,
        vec!["-m64".to_string(), "-fPIC".to_string()]
    );
    assert_eq!(system[1].toolchain_arguments, vec!["-m64".to_string()]);
}

#[test]
fn removing_every_contributor_retracts_exactly_once() {
    let mut merger = merger();
    merger.merge_tasks(
        vec![task_set("A", &[5], &[3]), task_set("B", &[5], &[3])],
        &[],
    );
    let system_key = merger.tasks(Scope::System)[0].key(Scope::System);
    let project_key = merger.tasks(Scope::Project)[0].key(Scope::Project);

    merger.remove_pch_tasks(&ids(&["A"]));
    assert_eq!(merger.tasks(Scope::System)[0].project_part_ids, ids(&["B"]));
    assert_eq!(merger.sink().removals_of(Scope::System, &system_key), 0);

    merger.remove_pch_tasks(&ids(&["B"]));
    merger.remove_pch_tasks(&ids(&["A", "B"]));

    assert!(merger.tasks(Scope::System).is_empty());
    assert!(merger.tasks(Scope::Project).is_empty());
    assert_eq!(merger.sink().removals_of(Scope::System, &system_key), 1);
    assert_eq!(merger.sink().removals_of(Scope::Project, &project_key), 1);
}

#[test]
fn partial_removal_is_an_update_not_a_rebuild() {
    let mut merger = merger();
    merger.merge_tasks(
        vec![task_set("A", &[5], &[3]), task_set("B", &[5], &[3])],
        &[],
    );

    merger.remove_pch_tasks(&ids(&["A"]));

    let system_calls = merger.sink().for_scope(Scope::System);
    assert_eq!(
        system_calls.last(),
        Some(&SinkCall::Update(Scope::System, vec![ids(&["B"])]))
    );
}

#[test]
fn remerged_part_leaves_its_previous_task() {
    let mut merger = merger();
    merger.merge_tasks(
        vec![task_set("A", &[5], &[3]), task_set("B", &[5], &[3])],
        &[],
    );
    let old_key = merger.tasks(Scope::System)[0].key(Scope::System);

    // A now pulls in a different system header.
    merger.merge_tasks(vec![task_set("A", &[6], &[3])], &[]);

    let system = merger.tasks(Scope::System);
    assert_eq!(system.len(), 2);
    assert_eq!(system[0].key(Scope::System), old_key);
    assert_eq!(system[0].project_part_ids, ids(&["B"]));
    assert_eq!(system[1].project_part_ids, ids(&["A"]));
    assert_eq!(system[1].includes, files(&[6]));

    let calls = merger.sink().for_scope(Scope::System);
    assert_eq!(
        &calls[calls.len() - 2..],
        &[
            SinkCall::Update(Scope::System, vec![ids(&["B"])]),
            SinkCall::Add(Scope::System, vec![ids(&["A"])]),
        ]
    );
}

#[test]
fn sole_member_moving_away_retracts_the_old_task() {
    let mut merger = merger();
    merger.merge_tasks(vec![task_set("A", &[5], &[3])], &[]);
    let old_key = merger.tasks(Scope::System)[0].key(Scope::System);

    merger.merge_tasks(vec![task_set("A", &[6], &[3])], &[]);

    assert_eq!(merger.tasks(Scope::System).len(), 1);
    assert_eq!(merger.sink().removals_of(Scope::System, &old_key), 1);
}

#[test]
fn empty_tasks_share_one_bucket() {
    let mut merger = merger();

    merger.merge_tasks(
        vec![
            task_set("A", &[], &[]),
            task_set("B", &[], &[]),
            task_set("C", &[], &[]),
        ],
        &[],
    );

    for scope in Scope::ALL {
        assert_eq!(merger.tasks(scope).len(), 1);
        assert_eq!(merger.tasks(scope)[0].project_part_ids, ids(&["A", "B", "C"]));
    }
}
