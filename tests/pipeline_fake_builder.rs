// tests/pipeline_fake_builder.rs

mod common;
use crate::common::builders::ProjectPartBuilder;
use crate::common::{ids, init_tracing};

use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use pchdeps::deps::{BuildDependencyCollector, CachingProvider, ModifiedTimeChecker};
use pchdeps::engine::scheduler::Delivery;
use pchdeps::engine::{
    ManagerEvent, ManagerOptions, PchManager, PchNotification, PchScheduler, ProgressCounter,
    QueueHandle, SchedulerOptions,
};
use pchdeps::exec::{PchJob, PchTaskRunner, SharedArtifactStore};
use pchdeps::fs::mock::MockFileSystem;
use pchdeps::fs::FileSystem;
use pchdeps::model::{ProjectPart, SourceType};
use pchdeps::paths::FilePathCache;
use pchdeps::store::{ArtifactStore, MemoryArtifactStore, MemoryBuildDependencyStore};
use pchdeps::types::Scope;
use pchdeps_test_utils::fake_builder::FakePchBuilder;
use pchdeps_test_utils::fake_scanner::{FakeScanner, ScanReportBuilder};
use pchdeps_test_utils::with_timeout;

const VECTOR: &str = "/usr/include/vector";
const STRING: &str = "/usr/include/string";
const CONFIG: &str = "/proj/include/config.h";

/// Everything one pipeline run needs; the pieces tests inspect afterwards
/// stay reachable.
struct Pipeline {
    fs: MockFileSystem,
    paths: Arc<FilePathCache>,
    scanner: Arc<FakeScanner>,
    builder: Arc<FakePchBuilder>,
    artifacts: SharedArtifactStore,
}

impl Pipeline {
    fn new(builder: FakePchBuilder) -> Self {
        init_tracing();

        let fs = MockFileSystem::new();
        for path in [VECTOR, STRING, CONFIG, "/proj/a.cpp", "/proj/b.cpp", "/proj/c.cpp"] {
            fs.add_file(path, "");
        }

        let scanner = Arc::new(FakeScanner::new());
        for part in ["a", "b"] {
            scanner.set_report(
                part,
                ScanReportBuilder::new()
                    .include(VECTOR, SourceType::TopSystemInclude, 1)
                    .include(CONFIG, SourceType::TopProjectInclude, 2)
                    .build(),
            );
        }
        scanner.set_report(
            "c",
            ScanReportBuilder::new()
                .include(STRING, SourceType::TopSystemInclude, 1)
                .build(),
        );

        let fs_dyn: Arc<dyn FileSystem> = Arc::new(fs.clone());
        let artifacts: SharedArtifactStore =
            Arc::new(Mutex::new(Box::new(MemoryArtifactStore::new())));

        Self {
            builder: Arc::new(builder.with_fs(fs_dyn)),
            fs,
            paths: Arc::new(FilePathCache::new()),
            scanner,
            artifacts,
        }
    }

    fn part(&self, id: &str) -> ProjectPart {
        ProjectPartBuilder::new(id)
            .source(self.paths.file_path_id(format!("/proj/{id}.cpp")))
            .build()
    }

    /// Feed `events` to a fresh manager that exits when idle and return
    /// every notification produced.
    async fn run(&self, events: Vec<ManagerEvent>) -> Vec<PchNotification> {
        self.run_with(events, |_| async {}).await
    }

    /// Like [`run`](Self::run), with `during` driven alongside the manager
    /// so it can send more events while builds are in flight.
    async fn run_with<F, Fut>(&self, events: Vec<ManagerEvent>, during: F) -> Vec<PchNotification>
    where
        F: FnOnce(mpsc::Sender<ManagerEvent>) -> Fut,
        Fut: Future<Output = ()>,
    {
        let fs: Arc<dyn FileSystem> = Arc::new(self.fs.clone());
        let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();
        let progress = {
            let tx = notify_tx.clone();
            Arc::new(ProgressCounter::new(move |progress| {
                let _ = tx.send(PchNotification::Progress(progress));
            }))
        };
        let queue = QueueHandle::new(progress);
        let (event_tx, event_rx) = mpsc::channel(64);

        let runner = Arc::new(PchTaskRunner::new(
            self.builder.clone(),
            Arc::clone(&self.artifacts),
            Arc::clone(&self.paths),
            Arc::clone(&fs),
            PathBuf::from("/pch"),
        ));
        let scheduler = PchScheduler::spawn(
            queue.clone(),
            runner,
            Delivery {
                notifications: notify_tx.clone(),
                events: event_tx.clone(),
            },
            SchedulerOptions {
                system_workers: 2,
                project_workers: 2,
            },
        );

        let provider = CachingProvider::new(
            BuildDependencyCollector::new(
                self.scanner.clone(),
                Arc::clone(&self.paths),
                Arc::clone(&fs),
            ),
            Box::new(MemoryBuildDependencyStore::new()),
            ModifiedTimeChecker::new(Arc::clone(&fs), Arc::clone(&self.paths)),
            Arc::clone(&self.paths),
        );
        let manager = PchManager::new(
            provider,
            queue,
            Arc::clone(&self.paths),
            Arc::clone(&self.artifacts),
            event_rx,
            notify_tx,
            ManagerOptions {
                exit_when_idle: true,
            },
        );

        for event in events {
            event_tx.send(event).await.unwrap();
        }

        let (result, ()) =
            with_timeout(async { tokio::join!(manager.run(), during(event_tx.clone())) }).await;
        result.unwrap();
        with_timeout(scheduler.shutdown()).await;

        let mut notifications = Vec::new();
        while let Ok(notification) = notify_rx.try_recv() {
            notifications.push(notification);
        }
        notifications
    }

    /// Wait until the builder has started a `scope` job including `path`.
    async fn wait_for_job_including(&self, scope: Scope, path: &str) {
        let path = PathBuf::from(path);
        while !self
            .jobs(scope)
            .iter()
            .any(|job| job.includes.contains(&path))
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn precompiled_header(&self, part: &str, scope: Scope) -> Option<PathBuf> {
        self.artifacts
            .lock()
            .unwrap()
            .precompiled_header(&part.into(), scope)
            .unwrap()
    }

    fn jobs(&self, scope: Scope) -> Vec<PchJob> {
        self.builder
            .jobs()
            .into_iter()
            .filter(|job| job.scope == scope)
            .collect()
    }
}

fn add(parts: Vec<ProjectPart>) -> ManagerEvent {
    ManagerEvent::AddProjectParts {
        parts,
        extra_toolchain_arguments: vec![],
    }
}

fn built(notifications: &[PchNotification], scope: Scope) -> Vec<(Vec<String>, bool)> {
    notifications
        .iter()
        .filter_map(|n| match n {
            PchNotification::PchBuilt {
                scope: s,
                project_part_ids,
                reused,
                ..
            } if *s == scope => Some((
                project_part_ids.iter().map(|id| id.to_string()).collect(),
                *reused,
            )),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn shared_parts_build_one_system_and_one_project_pch() {
    let pipeline = Pipeline::new(FakePchBuilder::new());

    let notifications = pipeline
        .run(vec![add(vec![pipeline.part("a"), pipeline.part("b")])])
        .await;

    let both = vec!["a".to_string(), "b".to_string()];
    assert_eq!(built(&notifications, Scope::System), vec![(both.clone(), false)]);
    assert_eq!(built(&notifications, Scope::Project), vec![(both, false)]);
    assert_eq!(pipeline.builder.jobs().len(), 2);
    assert_eq!(pipeline.scanner.calls(), 2);

    for part in ["a", "b"] {
        assert!(pipeline.precompiled_header(part, Scope::System).is_some());
        assert!(pipeline.precompiled_header(part, Scope::Project).is_some());
    }
}

#[tokio::test]
async fn project_pch_is_layered_on_the_system_pch() {
    let pipeline = Pipeline::new(FakePchBuilder::new());

    pipeline.run(vec![add(vec![pipeline.part("a")])]).await;

    let system = pipeline.jobs(Scope::System);
    let project = pipeline.jobs(Scope::Project);
    assert_eq!(system.len(), 1);
    assert_eq!(project.len(), 1);
    assert_eq!(system[0].includes, vec![PathBuf::from(VECTOR)]);
    assert_eq!(system[0].system_pch, None);
    assert_eq!(project[0].includes, vec![PathBuf::from(CONFIG)]);
    assert_eq!(project[0].system_pch, Some(system[0].output_path.clone()));
    assert!(project[0]
        .command_line()
        .contains(&"-include-pch".to_string()));
}

#[tokio::test]
async fn empty_scope_is_reported_without_building() {
    let pipeline = Pipeline::new(FakePchBuilder::new());

    let notifications = pipeline.run(vec![add(vec![pipeline.part("c")])]).await;

    assert!(notifications.iter().any(|n| matches!(
        n,
        PchNotification::PchEmpty { scope: Scope::Project, project_part_ids, .. }
            if *project_part_ids == ids(&["c"])
    )));
    assert_eq!(pipeline.jobs(Scope::Project).len(), 0);
    assert_eq!(pipeline.jobs(Scope::System).len(), 1);
    assert!(pipeline.precompiled_header("c", Scope::Project).is_none());
}

#[tokio::test]
async fn failed_build_leaves_no_header_and_spares_other_tasks() {
    let builder = FakePchBuilder::new();
    builder.fail_when_including(VECTOR);
    let pipeline = Pipeline::new(builder);

    let notifications = pipeline
        .run(vec![add(vec![pipeline.part("a"), pipeline.part("c")])])
        .await;

    assert!(notifications.iter().any(|n| matches!(
        n,
        PchNotification::PchFailed { scope: Scope::System, project_part_ids, .. }
            if *project_part_ids == ids(&["a"])
    )));
    assert_eq!(
        built(&notifications, Scope::System),
        vec![(vec!["c".to_string()], false)]
    );
    assert!(pipeline.precompiled_header("a", Scope::System).is_none());
    assert!(pipeline.precompiled_header("c", Scope::System).is_some());
    // Project work still runs, without a system PCH to build on.
    let project = pipeline.jobs(Scope::Project);
    assert_eq!(project.len(), 1);
    assert_eq!(project[0].system_pch, None);
}

#[tokio::test]
async fn unchanged_inputs_reuse_existing_artifacts() {
    let pipeline = Pipeline::new(FakePchBuilder::new());

    pipeline.run(vec![add(vec![pipeline.part("a")])]).await;
    let notifications = pipeline.run(vec![add(vec![pipeline.part("a")])]).await;

    assert_eq!(pipeline.builder.jobs().len(), 2);
    assert_eq!(
        built(&notifications, Scope::System),
        vec![(vec!["a".to_string()], true)]
    );
}

#[tokio::test]
async fn touched_header_produces_a_new_artifact() {
    let pipeline = Pipeline::new(FakePchBuilder::new());

    pipeline.run(vec![add(vec![pipeline.part("a")])]).await;
    let first = pipeline.precompiled_header("a", Scope::System).unwrap();

    pipeline.fs.touch(VECTOR);
    let notifications = pipeline.run(vec![add(vec![pipeline.part("a")])]).await;

    assert_eq!(
        built(&notifications, Scope::System),
        vec![(vec!["a".to_string()], false)]
    );
    assert_ne!(pipeline.precompiled_header("a", Scope::System).unwrap(), first);
}

#[tokio::test]
async fn progress_reaches_the_task_count() {
    let pipeline = Pipeline::new(FakePchBuilder::new());

    let notifications = pipeline
        .run(vec![add(vec![pipeline.part("a"), pipeline.part("c")])])
        .await;

    let max_total = notifications
        .iter()
        .filter_map(|n| match n {
            PchNotification::Progress(progress) => Some(progress.total),
            _ => None,
        })
        .max();
    assert_eq!(max_total, Some(4));
    assert!(notifications
        .iter()
        .any(|n| matches!(n, PchNotification::Progress(p) if p.completed == 4 && p.total == 4)));
}

#[tokio::test]
async fn removing_parts_forgets_their_headers() {
    let pipeline = Pipeline::new(FakePchBuilder::new());
    pipeline.run(vec![add(vec![pipeline.part("a")])]).await;
    assert!(pipeline.precompiled_header("a", Scope::System).is_some());

    pipeline
        .run(vec![
            add(vec![pipeline.part("c")]),
            ManagerEvent::RemoveProjectParts { ids: ids(&["a"]) },
        ])
        .await;

    assert!(pipeline.precompiled_header("a", Scope::System).is_none());
    assert!(pipeline.precompiled_header("a", Scope::Project).is_none());
    assert!(pipeline.precompiled_header("c", Scope::System).is_some());
}

#[tokio::test]
async fn retracting_a_running_build_discards_its_result() {
    let pipeline = Pipeline::new(FakePchBuilder::new().with_delay(Duration::from_millis(200)));

    let observer = &pipeline;
    let notifications = pipeline
        .run_with(
            vec![add(vec![pipeline.part("a"), pipeline.part("c")])],
            |events| async move {
                observer
                    .wait_for_job_including(Scope::System, VECTOR)
                    .await;
                events
                    .send(ManagerEvent::RemoveProjectParts { ids: ids(&["a"]) })
                    .await
                    .unwrap();
            },
        )
        .await;

    assert!(pipeline
        .jobs(Scope::System)
        .iter()
        .any(|job| job.includes == vec![PathBuf::from(VECTOR)]));
    assert!(notifications.iter().all(|n| !matches!(
        n,
        PchNotification::PchBuilt { project_part_ids, .. }
            if project_part_ids.contains(&"a".into())
    )));
    assert!(pipeline.precompiled_header("a", Scope::System).is_none());
    assert!(pipeline.precompiled_header("a", Scope::Project).is_none());
    assert!(pipeline.jobs(Scope::Project).is_empty());

    assert_eq!(
        built(&notifications, Scope::System),
        vec![(vec!["c".to_string()], false)]
    );
    assert!(pipeline.precompiled_header("c", Scope::System).is_some());
}

#[tokio::test]
async fn rebuilt_system_pch_forces_a_project_rebuild() {
    let pipeline = Pipeline::new(FakePchBuilder::new());

    pipeline.run(vec![add(vec![pipeline.part("a")])]).await;
    let first_project = pipeline.precompiled_header("a", Scope::Project).unwrap();

    // Only the system header changes; the project includes do not.
    pipeline.fs.touch(VECTOR);
    let notifications = pipeline.run(vec![add(vec![pipeline.part("a")])]).await;

    assert_eq!(
        built(&notifications, Scope::System),
        vec![(vec!["a".to_string()], false)]
    );
    assert_eq!(
        built(&notifications, Scope::Project),
        vec![(vec!["a".to_string()], false)]
    );

    let system = pipeline.jobs(Scope::System);
    let project = pipeline.jobs(Scope::Project);
    assert_eq!(system.len(), 2);
    assert_eq!(project.len(), 2);
    assert_eq!(project[1].system_pch, Some(system[1].output_path.clone()));
    assert_ne!(project[1].system_pch, project[0].system_pch);
    assert_ne!(
        pipeline.precompiled_header("a", Scope::Project).unwrap(),
        first_project
    );
}
