// src/engine/mod.rs

//! Orchestration engine for pchdeps.
//!
//! This module ties together:
//! - the two-scope task queue (pure, in [`queue`])
//! - progress aggregation ([`progress`])
//! - the long-lived worker pools that drain the queue ([`scheduler`])
//! - the coordinator that owns the generator and merger and reacts to
//!   project changes, file changes and completions ([`manager`])

use std::path::PathBuf;

use crate::deps::UnsavedFile;
use crate::model::{ProjectPart, ProjectPartId};
use crate::types::Scope;

pub mod manager;
pub mod progress;
pub mod queue;
pub mod scheduler;

pub use manager::{ManagerOptions, PchManager};
pub use progress::{Progress, ProgressCounter};
pub use queue::{FinishedTask, PchTaskQueue, QueuedTask};
pub use scheduler::{PchScheduler, QueueHandle, SchedulerOptions};

/// Outbound messages for whoever consumes built PCHs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PchNotification {
    /// The `(completed, total)` pair changed.
    Progress(Progress),
    PchBuilt {
        scope: Scope,
        project_part_ids: Vec<ProjectPartId>,
        artifact: PathBuf,
        /// An identical artifact already existed; no compiler was run.
        reused: bool,
        progress: Progress,
    },
    /// The task had nothing to precompile.
    PchEmpty {
        scope: Scope,
        project_part_ids: Vec<ProjectPartId>,
        progress: Progress,
    },
    PchFailed {
        scope: Scope,
        project_part_ids: Vec<ProjectPartId>,
        reason: String,
        progress: Progress,
    },
}

/// Events flowing into the coordinator.
#[derive(Debug, Clone)]
pub enum ManagerEvent {
    AddProjectParts {
        parts: Vec<ProjectPart>,
        extra_toolchain_arguments: Vec<String>,
    },
    RemoveProjectParts {
        ids: Vec<ProjectPartId>,
    },
    UpdateUnsavedFiles {
        files: Vec<UnsavedFile>,
    },
    RemoveUnsavedFiles {
        paths: Vec<PathBuf>,
    },
    /// Files on disk changed (from the include watcher).
    FilesChanged {
        paths: Vec<PathBuf>,
    },
    /// A worker finished a task. Project-scope results are delivered
    /// through the coordinator; system-scope ones are already sent.
    TaskFinished {
        scope: Scope,
        notification: Option<PchNotification>,
    },
    ShutdownRequested,
}
