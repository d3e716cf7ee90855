// src/engine/manager.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::deps::BuildDependenciesProvider;
use crate::engine::scheduler::QueueHandle;
use crate::engine::{ManagerEvent, PchNotification};
use crate::errors::Result;
use crate::exec::SharedArtifactStore;
use crate::model::{FileId, ProjectPart, ProjectPartId};
use crate::paths::FilePathCache;
use crate::pch::{PchTaskGenerator, PchTasksMerger};
use crate::types::Scope;
use crate::watch::IncludeWatcher;

#[derive(Debug, Clone, Copy, Default)]
pub struct ManagerOptions {
    /// Exit once every queue is idle (used for `--once`).
    pub exit_when_idle: bool,
}

/// Single owner of the generator, the merger and the project part registry.
///
/// Every mutation of the merged-task sets happens inside [`run`](Self::run),
/// one event at a time.
pub struct PchManager<P: BuildDependenciesProvider> {
    generator: PchTaskGenerator<P, PchTasksMerger<QueueHandle>>,
    queue: QueueHandle,
    paths: Arc<FilePathCache>,
    artifacts: SharedArtifactStore,
    parts: BTreeMap<ProjectPartId, ProjectPart>,
    extra_toolchain_arguments: Vec<String>,
    events: mpsc::Receiver<ManagerEvent>,
    notifications: mpsc::UnboundedSender<PchNotification>,
    watcher: Option<IncludeWatcher>,
    options: ManagerOptions,
}

impl<P: BuildDependenciesProvider> fmt::Debug for PchManager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PchManager")
            .field("parts", &self.parts.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<P: BuildDependenciesProvider> PchManager<P> {
    pub fn new(
        provider: P,
        queue: QueueHandle,
        paths: Arc<FilePathCache>,
        artifacts: SharedArtifactStore,
        events: mpsc::Receiver<ManagerEvent>,
        notifications: mpsc::UnboundedSender<PchNotification>,
        options: ManagerOptions,
    ) -> Self {
        let merger = PchTasksMerger::new(queue.clone());
        Self {
            generator: PchTaskGenerator::new(provider, merger),
            queue,
            paths,
            artifacts,
            parts: BTreeMap::new(),
            extra_toolchain_arguments: Vec::new(),
            events,
            notifications,
            watcher: None,
            options,
        }
    }

    pub fn with_watcher(mut self, watcher: IncludeWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Main event loop.
    pub async fn run(mut self) -> Result<()> {
        info!("pch manager started");

        while let Some(event) = self.events.recv().await {
            if !self.handle_event(event).await? {
                info!("shutdown requested; stopping pch manager");
                break;
            }
            if self.options.exit_when_idle && self.queue.is_idle() {
                info!(progress = %self.queue.progress(), "all pch tasks finished; exiting");
                break;
            }
        }

        // Completions that raced with the exit still get delivered.
        while let Ok(event) = self.events.try_recv() {
            if let ManagerEvent::TaskFinished {
                notification: Some(notification),
                ..
            } = event
            {
                let _ = self.notifications.send(notification);
            }
        }

        info!("pch manager exiting");
        Ok(())
    }

    /// Returns `false` when the loop should stop.
    async fn handle_event(&mut self, event: ManagerEvent) -> Result<bool> {
        match event {
            ManagerEvent::AddProjectParts {
                parts,
                extra_toolchain_arguments,
            } => {
                info!(parts = parts.len(), "adding project parts");
                for part in &parts {
                    self.parts.insert(part.id.clone(), part.clone());
                }
                self.extra_toolchain_arguments = extra_toolchain_arguments;
                self.generator
                    .add_project_parts(&parts, &self.extra_toolchain_arguments)
                    .await?;
                self.refresh_watcher();
            }
            ManagerEvent::RemoveProjectParts { ids } => {
                info!(?ids, "removing project parts");
                for id in &ids {
                    self.parts.remove(id);
                }
                self.generator.remove_project_parts(&ids);
                self.forget_artifacts(&ids);
                self.refresh_watcher();
            }
            ManagerEvent::UpdateUnsavedFiles { files } => {
                debug!(files = files.len(), "unsaved files updated");
                let affected = self.generator.provider_mut().update_unsaved_files(files);
                self.resubmit(affected).await?;
            }
            ManagerEvent::RemoveUnsavedFiles { paths } => {
                debug!(files = paths.len(), "unsaved files removed");
                let affected = self.generator.provider_mut().remove_unsaved_files(&paths);
                self.resubmit(affected).await?;
            }
            ManagerEvent::FilesChanged { paths } => {
                let ids = self.known_file_ids(&paths);
                if !ids.is_empty() {
                    let affected = self.generator.provider_mut().invalidate(&ids);
                    self.resubmit(affected).await?;
                }
            }
            ManagerEvent::TaskFinished {
                scope,
                notification,
            } => {
                debug!(%scope, "pch task finished");
                self.queue.reported();
                if let Some(notification) = notification {
                    let _ = self.notifications.send(notification);
                }
            }
            ManagerEvent::ShutdownRequested => return Ok(false),
        }
        Ok(true)
    }

    fn known_file_ids(&self, paths: &[PathBuf]) -> Vec<FileId> {
        paths
            .iter()
            .filter_map(|path| self.paths.existing_id(path))
            .collect()
    }

    async fn resubmit(&mut self, affected: Vec<ProjectPartId>) -> Result<()> {
        let parts: Vec<ProjectPart> = affected
            .iter()
            .filter_map(|id| self.parts.get(id).cloned())
            .collect();
        if parts.is_empty() {
            return Ok(());
        }

        info!(parts = parts.len(), "resubmitting stale project parts");
        self.generator
            .add_project_parts(&parts, &self.extra_toolchain_arguments)
            .await?;
        self.refresh_watcher();
        Ok(())
    }

    fn forget_artifacts(&self, ids: &[ProjectPartId]) {
        let mut store = self
            .artifacts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for scope in Scope::ALL {
            if let Err(err) = store.delete_precompiled_header(ids, scope) {
                warn!(%scope, ?ids, error = %err, "failed to delete precompiled headers");
            }
        }
    }

    fn refresh_watcher(&mut self) {
        let Some(watcher) = self.watcher.as_mut() else {
            return;
        };
        let files = self.generator.provider().dependency_files();
        match self.paths.file_paths(&files) {
            Ok(paths) => watcher.watch_files(paths),
            Err(err) => warn!(error = %err, "cannot resolve dependency files to watch"),
        }
    }

    pub fn queue(&self) -> &QueueHandle {
        &self.queue
    }

    pub fn merged_tasks(&self, scope: Scope) -> &[crate::model::PchTask] {
        self.generator.merger().tasks(scope)
    }
}
