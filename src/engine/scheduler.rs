// src/engine/scheduler.rs

//! Long-lived worker pools draining the task queue.
//!
//! Each scope has its own pool. A worker claims one entry at a time, owns it
//! exclusively while the compiler runs, then reports back through
//! [`PchTaskQueue::finish`]. Idle workers park on a per-scope [`Notify`];
//! whoever makes work claimable wakes one worker, and a worker that leaves
//! claimable work behind wakes the next.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::progress::{Progress, ProgressCounter};
use crate::engine::queue::{FinishedTask, PchTaskQueue, QueuedTask};
use crate::engine::{ManagerEvent, PchNotification};
use crate::exec::{BuildOutcome, PchTaskRunner};
use crate::model::{PchTask, TaskKey};
use crate::pch::PchTaskSink;
use crate::types::Scope;

/// Shared, lockable queue plus wake-ups. Cheap to clone.
#[derive(Clone)]
pub struct QueueHandle {
    queue: Arc<Mutex<PchTaskQueue>>,
    system_wake: Arc<Notify>,
    project_wake: Arc<Notify>,
}

impl std::fmt::Debug for QueueHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueHandle").finish_non_exhaustive()
    }
}

impl QueueHandle {
    pub fn new(progress: Arc<ProgressCounter>) -> Self {
        Self {
            queue: Arc::new(Mutex::new(PchTaskQueue::new(progress))),
            system_wake: Arc::new(Notify::new()),
            project_wake: Arc::new(Notify::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PchTaskQueue> {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn wake(&self, scope: Scope) -> &Notify {
        match scope {
            Scope::System => &self.system_wake,
            Scope::Project => &self.project_wake,
        }
    }

    /// Wake one worker per scope that has claimable work.
    fn wake_claimable(&self) {
        let (system, project) = {
            let queue = self.lock();
            (
                queue.has_claimable(Scope::System),
                queue.has_claimable(Scope::Project),
            )
        };
        if system {
            self.system_wake.notify_one();
        }
        if project {
            self.project_wake.notify_one();
        }
    }

    pub fn claim(&self, scope: Scope) -> Option<QueuedTask> {
        let claimed = self.lock().claim(scope);
        if claimed.is_some() {
            self.wake_claimable();
        }
        claimed
    }

    /// Finish a claimed entry. `on_finish` runs before any other worker can
    /// claim work unblocked by this completion.
    pub fn finish<F>(&self, key: &TaskKey, on_finish: F) -> Option<FinishedTask>
    where
        F: FnOnce(&FinishedTask),
    {
        let finished = {
            let mut queue = self.lock();
            let finished = queue.finish(key);
            if let Some(finished) = &finished {
                on_finish(finished);
            }
            finished
        };
        self.wake_claimable();
        finished
    }

    pub fn reported(&self) {
        self.lock().reported();
    }

    pub fn is_idle(&self) -> bool {
        self.lock().is_idle()
    }

    pub fn pending_keys(&self, scope: Scope) -> Vec<TaskKey> {
        self.lock().pending_keys(scope)
    }

    pub fn running_count(&self, scope: Scope) -> usize {
        self.lock().running_count(scope)
    }

    pub fn progress(&self) -> Progress {
        self.lock().progress()
    }
}

impl PchTaskSink for QueueHandle {
    fn add_pch_tasks(&mut self, scope: Scope, tasks: Vec<PchTask>) {
        self.lock().add_tasks(scope, tasks);
        self.wake_claimable();
    }

    fn update_pch_tasks(&mut self, scope: Scope, tasks: Vec<PchTask>) {
        self.lock().update_tasks(scope, tasks);
    }

    fn remove_pch_tasks(&mut self, scope: Scope, keys: Vec<TaskKey>) {
        self.lock().remove_tasks(scope, &keys);
        self.wake_claimable();
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    /// Workers for system-scope tasks; 0 means hardware concurrency.
    pub system_workers: usize,
    /// Workers for project-scope tasks; 0 means hardware concurrency.
    pub project_workers: usize,
}

impl SchedulerOptions {
    fn workers(requested: usize) -> usize {
        if requested > 0 {
            return requested;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Where workers send their results.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub notifications: mpsc::UnboundedSender<PchNotification>,
    pub events: mpsc::Sender<ManagerEvent>,
}

/// Running worker pools. Dropping this does not stop the workers; call
/// [`shutdown`](Self::shutdown).
pub struct PchScheduler {
    shutdown: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl PchScheduler {
    pub fn spawn(
        queue: QueueHandle,
        runner: Arc<PchTaskRunner>,
        delivery: Delivery,
        options: SchedulerOptions,
    ) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let mut workers = Vec::new();

        for (scope, requested) in [
            (Scope::System, options.system_workers),
            (Scope::Project, options.project_workers),
        ] {
            let count = SchedulerOptions::workers(requested);
            info!(%scope, workers = count, "starting pch workers");
            for index in 0..count {
                workers.push(tokio::spawn(worker_loop(
                    scope,
                    index,
                    queue.clone(),
                    Arc::clone(&runner),
                    delivery.clone(),
                    shutdown_rx.clone(),
                )));
            }
        }

        Self { shutdown, workers }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stop the workers once their current task (if any) has finished.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for worker in self.workers {
            if let Err(err) = worker.await {
                warn!(error = %err, "pch worker terminated abnormally");
            }
        }
        debug!("all pch workers stopped");
    }
}

async fn worker_loop(
    scope: Scope,
    index: usize,
    queue: QueueHandle,
    runner: Arc<PchTaskRunner>,
    delivery: Delivery,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(%scope, index, "pch worker started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let Some(queued) = queue.claim(scope) else {
            let closed = tokio::select! {
                _ = queue.wake(scope).notified() => false,
                changed = shutdown.changed() => changed.is_err(),
            };
            if closed {
                break;
            }
            continue;
        };

        debug!(%scope, index, key = %queued.key, "claimed pch task");
        let outcome = runner.run(&queued.key, scope, &queued.task).await;

        // Recorded under the queue lock so a project build unblocked by this
        // system build sees its PCH.
        let finished = queue.finish(&queued.key, |finished| {
            if !finished.retracted {
                runner.record(scope, &finished.project_part_ids, &outcome);
            }
        });
        let Some(finished) = finished else {
            warn!(%scope, key = %queued.key, "finished task was not marked running");
            continue;
        };

        let notification = if finished.retracted {
            info!(%scope, key = %queued.key, "discarding result of retracted pch task");
            None
        } else {
            Some(notification_for(scope, finished, outcome))
        };

        deliver(scope, notification, &delivery).await;
    }

    debug!(%scope, index, "pch worker stopped");
}

fn notification_for(scope: Scope, finished: FinishedTask, outcome: BuildOutcome) -> PchNotification {
    let project_part_ids = finished.project_part_ids;
    let progress = finished.progress;
    match outcome {
        BuildOutcome::Built { artifact, reused } => PchNotification::PchBuilt {
            scope,
            project_part_ids,
            artifact,
            reused,
            progress,
        },
        BuildOutcome::Empty => PchNotification::PchEmpty {
            scope,
            project_part_ids,
            progress,
        },
        BuildOutcome::Failed { reason } => PchNotification::PchFailed {
            scope,
            project_part_ids,
            reason,
            progress,
        },
    }
}

/// System results go out directly; project results go through the
/// coordinator. Either way the coordinator hears about the completion.
async fn deliver(scope: Scope, notification: Option<PchNotification>, delivery: &Delivery) {
    let notification = match (scope, notification) {
        (Scope::System, Some(notification)) => {
            let _ = delivery.notifications.send(notification);
            None
        }
        (_, notification) => notification,
    };

    if delivery
        .events
        .send(ManagerEvent::TaskFinished {
            scope,
            notification,
        })
        .await
        .is_err()
    {
        debug!(%scope, "coordinator gone; completion not reported");
    }
}
