// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use notify::event::EventKind;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::ManagerEvent;

type WantedFiles = Arc<Mutex<BTreeSet<PathBuf>>>;

/// Watches the files build dependencies were derived from.
///
/// Watches are placed on the parent directories, and events are filtered
/// against the wanted file set, so a save that replaces a file by renaming
/// over it keeps being seen.
///
/// The wanted set is replaced wholesale with
/// [`watch_files`](Self::watch_files) whenever the coordinator's dependency
/// records change. Dropping the watcher stops watching.
pub struct IncludeWatcher {
    inner: RecommendedWatcher,
    dirs: BTreeSet<PathBuf>,
    files: WantedFiles,
}

impl std::fmt::Debug for IncludeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncludeWatcher")
            .field("dirs", &self.dirs.len())
            .field("files", &self.watched_count())
            .finish()
    }
}

fn is_relevant(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    )
}

fn lock(files: &WantedFiles) -> MutexGuard<'_, BTreeSet<PathBuf>> {
    files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn collect_wanted(event: Event, files: &WantedFiles, into: &mut BTreeSet<PathBuf>) {
    if !is_relevant(&event.kind) {
        return;
    }
    let wanted = lock(files);
    into.extend(event.paths.into_iter().filter(|path| wanted.contains(path)));
}

impl IncludeWatcher {
    /// Start the watcher. Changes to wanted files are forwarded to the
    /// coordinator as [`ManagerEvent::FilesChanged`].
    pub fn spawn(events: mpsc::Sender<ManagerEvent>) -> Result<Self> {
        // Channel from the blocking notify callback into the async world.
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

        let inner = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Err(err) = event_tx.send(event) {
                        eprintln!("pchdeps: failed to forward notify event: {err}");
                    }
                }
                Err(err) => {
                    eprintln!("pchdeps: file watch error: {err}");
                }
            },
            Config::default(),
        )?;

        let files: WantedFiles = Arc::new(Mutex::new(BTreeSet::new()));
        let loop_files = Arc::clone(&files);

        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                let mut paths = BTreeSet::new();
                collect_wanted(event, &loop_files, &mut paths);
                // One save often produces several events; fold whatever is
                // already buffered into the same batch.
                while let Ok(event) = event_rx.try_recv() {
                    collect_wanted(event, &loop_files, &mut paths);
                }
                if paths.is_empty() {
                    continue;
                }

                debug!(count = paths.len(), "watched files changed");
                let changed = ManagerEvent::FilesChanged {
                    paths: paths.into_iter().collect(),
                };
                if events.send(changed).await.is_err() {
                    break;
                }
            }
            debug!("include watcher event loop finished");
        });

        info!("include watcher started");
        Ok(Self {
            inner,
            dirs: BTreeSet::new(),
            files,
        })
    }

    /// Make `paths` the exact set of watched files.
    pub fn watch_files(&mut self, paths: Vec<PathBuf>) {
        let wanted: BTreeSet<PathBuf> = paths.into_iter().collect();
        let wanted_dirs: BTreeSet<PathBuf> = wanted
            .iter()
            .filter_map(|path| path.parent())
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .collect();

        for stale in self.dirs.difference(&wanted_dirs) {
            if let Err(err) = self.inner.unwatch(stale) {
                debug!(dir = ?stale, error = %err, "failed to unwatch directory");
            }
        }

        let mut dirs = BTreeSet::new();
        for dir in &wanted_dirs {
            if self.dirs.contains(dir) {
                dirs.insert(dir.clone());
                continue;
            }
            match self.inner.watch(dir, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    dirs.insert(dir.clone());
                }
                Err(err) => warn!(?dir, error = %err, "cannot watch dependency directory"),
            }
        }

        debug!(
            files = wanted.len(),
            dirs = dirs.len(),
            "updated watched dependency files"
        );
        self.dirs = dirs;
        *lock(&self.files) = wanted;
    }

    /// Number of wanted files.
    pub fn watched_count(&self) -> usize {
        lock(&self.files).len()
    }

    /// Number of directories with an active watch.
    pub fn watched_dir_count(&self) -> usize {
        self.dirs.len()
    }
}
