// src/lib.rs

pub mod cli;
pub mod config;
pub mod deps;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod model;
pub mod paths;
pub mod pch;
pub mod store;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, ConfigFile};
use crate::deps::{
    BuildDependencyCollector, CachingProvider, CommandLineBuilder, InputKind,
    ModifiedTimeChecker, ProcessScanner,
};
use crate::engine::scheduler::Delivery;
use crate::engine::{
    ManagerEvent, ManagerOptions, PchManager, PchNotification, PchScheduler, ProgressCounter,
    QueueHandle, SchedulerOptions,
};
use crate::exec::{PchTaskRunner, ProcessPchBuilder, SharedArtifactStore};
use crate::fs::{FileSystem, RealFileSystem};
use crate::model::ProjectPart;
use crate::paths::FilePathCache;
use crate::store::{
    ArtifactStore, BuildDependencyStore, FileArtifactStore, FileBuildDependencyStore,
    MemoryArtifactStore, MemoryBuildDependencyStore,
};
use crate::types::StorageMode;
use crate::watch::IncludeWatcher;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - durable stores
/// - dependency provider, generator and merger (inside the manager)
/// - the worker pools
/// - (optional) include watcher
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let root_dir = config_root_dir(&config_path);

    let paths = Arc::new(FilePathCache::new());
    let parts = project_parts(&cfg, &paths, &root_dir);

    if args.dry_run {
        print_dry_run(&cfg, &parts);
        return Ok(());
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let state_dir = root_dir.join(&cfg.manager.state_dir);
    let pch_dir = root_dir.join(&cfg.manager.pch_dir);

    let (dependency_store, artifact_store): (Box<dyn BuildDependencyStore>, Box<dyn ArtifactStore>) =
        match cfg.manager.storage {
            StorageMode::File => (
                Box::new(FileBuildDependencyStore::new(state_dir.clone(), Arc::clone(&fs))),
                Box::new(FileArtifactStore::new(state_dir.clone(), Arc::clone(&fs))),
            ),
            StorageMode::Memory => (
                Box::new(MemoryBuildDependencyStore::new()),
                Box::new(MemoryArtifactStore::new()),
            ),
        };
    let artifacts: SharedArtifactStore = Arc::new(Mutex::new(artifact_store));
    info!(storage = ?cfg.manager.storage, ?state_dir, ?pch_dir, "stores ready");

    // Outbound notifications are logged; nothing else consumes them here.
    let (notify_tx, notify_rx) = mpsc::unbounded_channel::<PchNotification>();
    let logger = tokio::spawn(log_notifications(notify_rx));

    let progress = {
        let tx = notify_tx.clone();
        Arc::new(ProgressCounter::new(move |progress| {
            let _ = tx.send(PchNotification::Progress(progress));
        }))
    };
    let queue = QueueHandle::new(progress);

    let (event_tx, event_rx) = mpsc::channel::<ManagerEvent>(64);

    let runner = Arc::new(PchTaskRunner::new(
        Arc::new(ProcessPchBuilder::new(cfg.tools.compiler.clone(), Arc::clone(&fs))),
        Arc::clone(&artifacts),
        Arc::clone(&paths),
        Arc::clone(&fs),
        pch_dir,
    ));
    let scheduler = PchScheduler::spawn(
        queue.clone(),
        runner,
        Delivery {
            notifications: notify_tx.clone(),
            events: event_tx.clone(),
        },
        SchedulerOptions {
            system_workers: cfg.manager.system_workers,
            project_workers: cfg.manager.project_workers,
        },
    );

    let scanner = Arc::new(ProcessScanner::new(
        cfg.tools.scanner.clone(),
        cfg.tools.scanner_args.clone(),
    ));
    let provider = CachingProvider::new(
        BuildDependencyCollector::new(scanner, Arc::clone(&paths), Arc::clone(&fs)),
        dependency_store,
        ModifiedTimeChecker::new(Arc::clone(&fs), Arc::clone(&paths)),
        Arc::clone(&paths),
    );

    let mut manager = PchManager::new(
        provider,
        queue.clone(),
        Arc::clone(&paths),
        artifacts,
        event_rx,
        notify_tx.clone(),
        ManagerOptions {
            exit_when_idle: args.once,
        },
    );

    // Include watcher (disabled in --once mode).
    if cfg.manager.watch && !args.once {
        manager = manager.with_watcher(IncludeWatcher::spawn(event_tx.clone())?);
    }

    // Ctrl-C → graceful shutdown.
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(ManagerEvent::ShutdownRequested).await;
        });
    }

    info!(parts = parts.len(), "submitting project parts");
    event_tx
        .send(ManagerEvent::AddProjectParts {
            parts,
            extra_toolchain_arguments: cfg.manager.extra_toolchain_arguments.clone(),
        })
        .await?;

    let result = manager.run().await;
    scheduler.shutdown().await;

    drop(queue);
    drop(notify_tx);
    if let Err(err) = logger.await {
        warn!(error = %err, "notification logger terminated abnormally");
    }

    result?;
    Ok(())
}

/// Figure out the directory relative config paths are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "build/Pchdeps.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Pchdeps.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn project_parts(cfg: &ConfigFile, paths: &FilePathCache, root_dir: &Path) -> Vec<ProjectPart> {
    cfg.project_parts
        .iter()
        .map(|part| part.to_project_part(paths, root_dir))
        .collect()
}

async fn log_notifications(mut notifications: mpsc::UnboundedReceiver<PchNotification>) {
    while let Some(notification) = notifications.recv().await {
        match notification {
            PchNotification::Progress(progress) => debug!(%progress, "pch progress"),
            PchNotification::PchBuilt {
                scope,
                project_part_ids,
                artifact,
                reused,
                progress,
            } => info!(
                %scope,
                parts = ?project_part_ids,
                ?artifact,
                reused,
                %progress,
                "pch ready"
            ),
            PchNotification::PchEmpty {
                scope,
                project_part_ids,
                progress,
            } => info!(%scope, parts = ?project_part_ids, %progress, "no headers to precompile"),
            PchNotification::PchFailed {
                scope,
                project_part_ids,
                reason,
                progress,
            } => warn!(%scope, parts = ?project_part_ids, %reason, %progress, "pch build failed"),
        }
    }
}

/// Simple dry-run output: print project parts and their scanner arguments.
fn print_dry_run(cfg: &ConfigFile, parts: &[ProjectPart]) {
    println!("pchdeps dry-run");
    println!("  manager.storage = {:?}", cfg.manager.storage);
    println!("  manager.state_dir = {}", cfg.manager.state_dir.display());
    println!("  manager.pch_dir = {}", cfg.manager.pch_dir.display());
    println!("  tools.scanner = {}", cfg.tools.scanner);
    println!("  tools.compiler = {}", cfg.tools.compiler);
    if !cfg.manager.extra_toolchain_arguments.is_empty() {
        println!(
            "  manager.extra_toolchain_arguments = {:?}",
            cfg.manager.extra_toolchain_arguments
        );
    }
    println!();

    println!("project parts ({}):", parts.len());
    for (part, raw) in parts.iter().zip(&cfg.project_parts) {
        println!("  - {}", part.id);
        println!("      sources: {:?}", raw.sources);
        if !raw.headers.is_empty() {
            println!("      headers: {:?}", raw.headers);
        }
        let args = CommandLineBuilder::new(part.into(), InputKind::Source).into_args();
        println!("      scanner args: {}", args.join(" "));
    }

    debug!("dry-run complete (no execution)");
}
