use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pchdeps::errors::{PchError, Result};
use pchdeps::exec::{PchArtifact, PchBuilder, PchJob};
use pchdeps::fs::FileSystem;

/// A fake PCH builder that:
/// - records every job it is given
/// - "produces" `job.output_path` (written through `fs` if one is set)
/// - fails any job that includes a path marked with
///   [`fail_when_including`](Self::fail_when_including).
#[derive(Default)]
pub struct FakePchBuilder {
    jobs: Arc<Mutex<Vec<PchJob>>>,
    failing_includes: Mutex<Vec<PathBuf>>,
    fs: Option<Arc<dyn FileSystem>>,
    delay: Option<Duration>,
}

impl FakePchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write each produced artifact so later `exists` checks see it.
    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// Sleep this long inside every build.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_when_including(&self, path: impl Into<PathBuf>) {
        self.failing_includes.lock().unwrap().push(path.into());
    }

    /// Shared handle to the recorded jobs.
    pub fn jobs_handle(&self) -> Arc<Mutex<Vec<PchJob>>> {
        Arc::clone(&self.jobs)
    }

    pub fn jobs(&self) -> Vec<PchJob> {
        self.jobs.lock().unwrap().clone()
    }
}

impl PchBuilder for FakePchBuilder {
    fn build(&self, job: PchJob) -> Pin<Box<dyn Future<Output = Result<PchArtifact>> + Send + '_>> {
        Box::pin(async move {
            self.jobs.lock().unwrap().push(job.clone());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let fails = {
                let failing = self.failing_includes.lock().unwrap();
                job.includes.iter().any(|include| failing.contains(include))
            };
            if fails {
                return Err(PchError::BuildFailed {
                    key: job.key.to_string(),
                    code: 1,
                    stderr: "fake compiler error".to_string(),
                });
            }

            if let Some(fs) = &self.fs {
                fs.write(&job.output_path, b"PCH")?;
            }

            Ok(PchArtifact {
                path: job.output_path,
            })
        })
    }
}
