// src/pch/merger.rs

//! Cross-part deduplication of PCH tasks.
//!
//! The merger is the single owner of the merged-task sets. It is driven only
//! by the coordinator (see [`crate::engine::manager`]), so all mutations are
//! serialized by construction; nothing here is shared.

use tracing::{debug, info};

use crate::model::{PchTask, PchTaskSet, ProjectPartId, TaskKey};
use crate::types::Scope;

/// What the generator talks to.
pub trait TaskMerger: Send {
    fn merge_tasks(&mut self, task_sets: Vec<PchTaskSet>, extra_toolchain_arguments: &[String]);
    fn remove_pch_tasks(&mut self, ids: &[ProjectPartId]);
}

/// Receiver of merged-task changes (the task queue in production).
pub trait PchTaskSink: Send {
    /// New or re-submitted tasks that need (re)building.
    fn add_pch_tasks(&mut self, scope: Scope, tasks: Vec<PchTask>);
    /// Tasks whose membership shrank; no rebuild needed.
    fn update_pch_tasks(&mut self, scope: Scope, tasks: Vec<PchTask>);
    /// Tasks with no remaining project parts.
    fn remove_pch_tasks(&mut self, scope: Scope, keys: Vec<TaskKey>);
}

#[derive(Debug, Default)]
struct ScopeChanges {
    added: Vec<TaskKey>,
    updated: Vec<TaskKey>,
    removed: Vec<TaskKey>,
}

fn push_unique(keys: &mut Vec<TaskKey>, key: TaskKey) {
    if !keys.contains(&key) {
        keys.push(key);
    }
}

/// Merges tasks whose [`MergeKey`](crate::model::MergeKey)s are equal.
///
/// Merged tasks are kept per scope in insertion order, and project part ids
/// inside a task in the order they joined, so identical inputs always
/// produce identical merged sets.
pub struct PchTasksMerger<S> {
    sink: S,
    system: Vec<PchTask>,
    project: Vec<PchTask>,
}

impl<S: PchTaskSink> PchTasksMerger<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            system: Vec::new(),
            project: Vec::new(),
        }
    }

    pub fn tasks(&self, scope: Scope) -> &[PchTask] {
        match scope {
            Scope::System => &self.system,
            Scope::Project => &self.project,
        }
    }

    fn tasks_mut(&mut self, scope: Scope) -> &mut Vec<PchTask> {
        match scope {
            Scope::System => &mut self.system,
            Scope::Project => &mut self.project,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn merge_task(&mut self, scope: Scope, task: PchTask, changes: &mut ScopeChanges) {
        let ids = task.project_part_ids.clone();
        let tasks = self.tasks_mut(scope);

        // A part that moved to a different key leaves its old task first.
        for existing in tasks.iter_mut() {
            if existing.merge_key() != task.merge_key() && existing.remove_project_parts(&ids) {
                let key = existing.key(scope);
                if existing.project_part_ids.is_empty() {
                    push_unique(&mut changes.removed, key);
                } else {
                    push_unique(&mut changes.updated, key);
                }
            }
        }
        tasks.retain(|existing| !existing.project_part_ids.is_empty());

        let key = task.key(scope);
        match tasks
            .iter_mut()
            .find(|existing| existing.merge_key() == task.merge_key())
        {
            Some(existing) => {
                existing.add_project_parts(&ids);
                existing.add_sources(&task.sources);
                debug!(%scope, %key, ?ids, "merged into existing pch task");
            }
            None => {
                debug!(%scope, %key, ?ids, "new merged pch task");
                tasks.push(task);
            }
        }
        push_unique(&mut changes.added, key);
    }

    fn flush(&mut self, scope: Scope, changes: ScopeChanges) {
        let current: Vec<(TaskKey, &PchTask)> = self
            .tasks(scope)
            .iter()
            .map(|task| (task.key(scope), task))
            .collect();
        let is_current = |key: &TaskKey| current.iter().any(|(k, _)| k == key);
        let collect = |keys: &[TaskKey]| -> Vec<PchTask> {
            keys.iter()
                .filter_map(|key| {
                    current
                        .iter()
                        .find(|(k, _)| k == key)
                        .map(|(_, task)| (*task).clone())
                })
                .collect()
        };

        let removed: Vec<TaskKey> = changes
            .removed
            .into_iter()
            .filter(|key| !is_current(key))
            .collect();
        let updated_keys: Vec<TaskKey> = changes
            .updated
            .into_iter()
            .filter(|key| !changes.added.contains(key))
            .collect();
        let updated = collect(&updated_keys);
        let added = collect(&changes.added);

        if !removed.is_empty() {
            info!(%scope, count = removed.len(), "retracting pch tasks");
            self.sink.remove_pch_tasks(scope, removed);
        }
        if !updated.is_empty() {
            self.sink.update_pch_tasks(scope, updated);
        }
        if !added.is_empty() {
            info!(%scope, count = added.len(), "submitting merged pch tasks");
            self.sink.add_pch_tasks(scope, added);
        }
    }
}

impl<S: PchTaskSink> TaskMerger for PchTasksMerger<S> {
    fn merge_tasks(&mut self, task_sets: Vec<PchTaskSet>, extra_toolchain_arguments: &[String]) {
        let mut system = ScopeChanges::default();
        let mut project = ScopeChanges::default();

        for set in task_sets {
            for (scope, mut task) in set.into_scoped() {
                task.toolchain_arguments
                    .extend(extra_toolchain_arguments.iter().cloned());
                let changes = match scope {
                    Scope::System => &mut system,
                    Scope::Project => &mut project,
                };
                self.merge_task(scope, task, changes);
            }
        }

        self.flush(Scope::System, system);
        self.flush(Scope::Project, project);
    }

    fn remove_pch_tasks(&mut self, ids: &[ProjectPartId]) {
        for scope in Scope::ALL {
            let mut changes = ScopeChanges::default();
            let tasks = self.tasks_mut(scope);
            for task in tasks.iter_mut() {
                if task.remove_project_parts(ids) {
                    let key = task.key(scope);
                    if task.project_part_ids.is_empty() {
                        push_unique(&mut changes.removed, key);
                    } else {
                        push_unique(&mut changes.updated, key);
                    }
                }
            }
            tasks.retain(|task| !task.project_part_ids.is_empty());
            self.flush(scope, changes);
        }
    }
}
