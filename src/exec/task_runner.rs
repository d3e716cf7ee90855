// src/exec/task_runner.rs

//! Builds (or reuses) the PCH for one claimed task.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::deps::{CommandLineBuilder, InputKind};
use crate::errors::Result;
use crate::exec::backend::{PchBuilder, PchJob};
use crate::fs::FileSystem;
use crate::model::{PchTask, ProjectPartId, TaskKey};
use crate::paths::FilePathCache;
use crate::store::ArtifactStore;
use crate::types::Scope;

pub type SharedArtifactStore = Arc<Mutex<Box<dyn ArtifactStore>>>;

/// What happened to a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Built { artifact: PathBuf, reused: bool },
    /// No includes; nothing to precompile.
    Empty,
    Failed { reason: String },
}

pub struct PchTaskRunner {
    builder: Arc<dyn PchBuilder>,
    artifacts: SharedArtifactStore,
    paths: Arc<FilePathCache>,
    fs: Arc<dyn FileSystem>,
    pch_dir: PathBuf,
}

impl PchTaskRunner {
    pub fn new(
        builder: Arc<dyn PchBuilder>,
        artifacts: SharedArtifactStore,
        paths: Arc<FilePathCache>,
        fs: Arc<dyn FileSystem>,
        pch_dir: PathBuf,
    ) -> Self {
        Self {
            builder,
            artifacts,
            paths,
            fs,
            pch_dir,
        }
    }

    fn artifacts(&self) -> MutexGuard<'_, Box<dyn ArtifactStore>> {
        self.artifacts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fingerprint of the artifact `task` would produce in `scope`: its
    /// content digest, the path and modification time of every source it
    /// depends on, and the system PCH it is layered on (if any).
    pub fn fingerprint(
        &self,
        scope: Scope,
        task: &PchTask,
        system_pch: Option<&Path>,
    ) -> Result<String> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(task.content_digest(scope, &self.paths)?.as_bytes());
        for path in self.paths.file_paths(&task.sources)? {
            self.hash_file(&mut hasher, &path);
        }
        match system_pch {
            Some(path) => {
                hasher.update(b"base");
                self.hash_file(&mut hasher, path);
            }
            None => {
                hasher.update(b"no-base");
            }
        }
        Ok(hasher.finalize().to_hex().to_string())
    }

    fn hash_file(&self, hasher: &mut blake3::Hasher, path: &Path) {
        hasher.update(path.to_string_lossy().as_bytes());
        match self.fs.modified_time(path) {
            Some(stamp) => hasher.update(&stamp.to_le_bytes()),
            None => hasher.update(b"missing"),
        };
    }

    pub async fn run(&self, key: &TaskKey, scope: Scope, task: &PchTask) -> BuildOutcome {
        match self.try_run(key, scope, task).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(%key, %scope, error = %err, "pch build failed");
                BuildOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    async fn try_run(&self, key: &TaskKey, scope: Scope, task: &PchTask) -> Result<BuildOutcome> {
        if task.includes.is_empty() {
            debug!(%key, %scope, "pch task has no includes; skipping build");
            return Ok(BuildOutcome::Empty);
        }

        let system_pch = match (scope, task.project_part_ids.first()) {
            (Scope::Project, Some(first)) => {
                self.artifacts().precompiled_header(first, Scope::System)?
            }
            _ => None,
        };

        let fingerprint = self.fingerprint(scope, task, system_pch.as_deref())?;
        let cached = self.artifacts().artifact(&fingerprint)?;
        if let Some(path) = cached {
            if self.fs.exists(&path) {
                info!(%key, %scope, ?path, "reusing existing pch");
                return Ok(BuildOutcome::Built {
                    artifact: path,
                    reused: true,
                });
            }
        }

        let job = PchJob {
            key: key.clone(),
            scope,
            header_path: self.pch_dir.join(format!("{}-{}.h", scope, key.short())),
            output_path: self
                .pch_dir
                .join(format!("{}-{}-{}.pch", scope, key.short(), &fingerprint[..16])),
            includes: self.paths.file_paths(&task.includes)?,
            arguments: CommandLineBuilder::new(task.into(), InputKind::Header).into_args(),
            system_pch,
        };

        let artifact = self.builder.build(job).await?;
        self.artifacts()
            .insert_artifact(&fingerprint, artifact.path.clone())?;

        Ok(BuildOutcome::Built {
            artifact: artifact.path,
            reused: false,
        })
    }

    /// Point every member part at the new PCH, or mark it unavailable.
    pub fn record(&self, scope: Scope, ids: &[ProjectPartId], outcome: &BuildOutcome) {
        let mut store = self.artifacts();
        let result = match outcome {
            BuildOutcome::Built { artifact, .. } => {
                store.insert_precompiled_header(ids, scope, artifact.clone())
            }
            BuildOutcome::Empty | BuildOutcome::Failed { .. } => {
                store.delete_precompiled_header(ids, scope)
            }
        };
        if let Err(err) = result {
            warn!(%scope, ?ids, error = %err, "failed to record precompiled header");
        }
    }
}
