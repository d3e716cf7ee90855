// src/engine/queue.rs

//! Pure two-scope PCH task queue.
//!
//! No Tokio types live here; [`crate::engine::scheduler`] wraps the queue in
//! a mutex and adds wake-ups. Semantics:
//!
//! - Entries are identified by their [`TaskKey`]. Re-adding a pending key
//!   replaces the pending entry instead of queueing a duplicate.
//! - A key is never claimed twice at the same time; a re-added key whose
//!   previous build is still running waits for that build to finish.
//! - Project entries are not claimable while any system entry is pending or
//!   running, so a project PCH can be built on top of a current system PCH.
//! - Retracted pending entries are dropped; retracted running entries are
//!   flagged and their result is discarded on [`finish`](PchTaskQueue::finish).
//! - A finished entry counts as outstanding until the coordinator has seen
//!   its completion ([`reported`](PchTaskQueue::reported)); the queue is not
//!   idle before that.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::debug;

use crate::engine::progress::{Progress, ProgressCounter};
use crate::model::{PchTask, ProjectPartId, TaskKey};
use crate::types::Scope;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTask {
    pub key: TaskKey,
    pub scope: Scope,
    pub task: PchTask,
}

#[derive(Debug)]
struct RunningTask {
    scope: Scope,
    project_part_ids: Vec<ProjectPartId>,
    retracted: bool,
}

/// Result of [`PchTaskQueue::finish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedTask {
    pub scope: Scope,
    /// The task was retracted while running; its result must be discarded.
    pub retracted: bool,
    /// Membership at the time the build finished.
    pub project_part_ids: Vec<ProjectPartId>,
    pub progress: Progress,
}

#[derive(Debug)]
pub struct PchTaskQueue {
    system: VecDeque<QueuedTask>,
    project: VecDeque<QueuedTask>,
    running: HashMap<TaskKey, RunningTask>,
    unreported: usize,
    progress: Arc<ProgressCounter>,
}

impl PchTaskQueue {
    pub fn new(progress: Arc<ProgressCounter>) -> Self {
        Self {
            system: VecDeque::new(),
            project: VecDeque::new(),
            running: HashMap::new(),
            unreported: 0,
            progress,
        }
    }

    fn pending_mut(&mut self, scope: Scope) -> &mut VecDeque<QueuedTask> {
        match scope {
            Scope::System => &mut self.system,
            Scope::Project => &mut self.project,
        }
    }

    fn pending(&self, scope: Scope) -> &VecDeque<QueuedTask> {
        match scope {
            Scope::System => &self.system,
            Scope::Project => &self.project,
        }
    }

    /// Queue tasks for building. Returns how many new entries were created.
    pub fn add_tasks(&mut self, scope: Scope, tasks: Vec<PchTask>) -> usize {
        let mut added = 0;
        for task in tasks {
            let key = task.key(scope);
            let pending = self.pending_mut(scope);
            match pending.iter_mut().find(|queued| queued.key == key) {
                Some(queued) => {
                    debug!(%scope, %key, "replacing pending pch task");
                    queued.task = task;
                }
                None => {
                    debug!(%scope, %key, "queueing pch task");
                    pending.push_back(QueuedTask { key, scope, task });
                    added += 1;
                }
            }
        }
        if added > 0 {
            self.progress.add_total(added as u64);
        }
        added
    }

    /// Apply membership changes without scheduling a rebuild.
    pub fn update_tasks(&mut self, scope: Scope, tasks: Vec<PchTask>) {
        for task in tasks {
            let key = task.key(scope);
            if let Some(running) = self.running.get_mut(&key) {
                running.project_part_ids = task.project_part_ids.clone();
            }
            if let Some(queued) = self
                .pending_mut(scope)
                .iter_mut()
                .find(|queued| queued.key == key)
            {
                queued.task.project_part_ids = task.project_part_ids;
            }
        }
    }

    /// Drop pending entries and flag running ones. Returns the number of
    /// pending entries dropped.
    pub fn remove_tasks(&mut self, scope: Scope, keys: &[TaskKey]) -> usize {
        let pending = self.pending_mut(scope);
        let before = pending.len();
        pending.retain(|queued| !keys.contains(&queued.key));
        let dropped = before - pending.len();

        for key in keys {
            if let Some(running) = self.running.get_mut(key) {
                debug!(%scope, %key, "retracting running pch task");
                running.retracted = true;
            }
        }

        if dropped > 0 {
            debug!(%scope, dropped, "dropped pending pch tasks");
            self.progress.remove_total(dropped as u64);
        }
        dropped
    }

    /// `true` if project entries must wait for system work.
    pub fn project_blocked(&self) -> bool {
        !self.system.is_empty()
            || self
                .running
                .values()
                .any(|running| running.scope == Scope::System)
    }

    /// Take the next claimable entry of `scope` and mark it running.
    pub fn claim(&mut self, scope: Scope) -> Option<QueuedTask> {
        if scope == Scope::Project && self.project_blocked() {
            return None;
        }

        let index = self
            .pending(scope)
            .iter()
            .position(|queued| !self.running.contains_key(&queued.key))?;
        let queued = self.pending_mut(scope).remove(index)?;

        self.running.insert(
            queued.key.clone(),
            RunningTask {
                scope,
                project_part_ids: queued.task.project_part_ids.clone(),
                retracted: false,
            },
        );
        Some(queued)
    }

    /// Mark a claimed entry as done and count it as progress.
    pub fn finish(&mut self, key: &TaskKey) -> Option<FinishedTask> {
        let running = self.running.remove(key)?;
        self.unreported += 1;
        let progress = self.progress.add_progress(1);
        Some(FinishedTask {
            scope: running.scope,
            retracted: running.retracted,
            project_part_ids: running.project_part_ids,
            progress,
        })
    }

    /// The coordinator has seen one finished entry.
    pub fn reported(&mut self) {
        self.unreported = self.unreported.saturating_sub(1);
    }

    /// Whether `scope` has an entry that [`claim`](Self::claim) would return.
    pub fn has_claimable(&self, scope: Scope) -> bool {
        if scope == Scope::Project && self.project_blocked() {
            return false;
        }
        self.pending(scope)
            .iter()
            .any(|queued| !self.running.contains_key(&queued.key))
    }

    pub fn pending_keys(&self, scope: Scope) -> Vec<TaskKey> {
        self.pending(scope).iter().map(|q| q.key.clone()).collect()
    }

    pub fn running_count(&self, scope: Scope) -> usize {
        self.running.values().filter(|r| r.scope == scope).count()
    }

    pub fn is_idle(&self) -> bool {
        self.system.is_empty()
            && self.project.is_empty()
            && self.running.is_empty()
            && self.unreported == 0
    }

    pub fn progress(&self) -> Progress {
        self.progress.current()
    }
}
