use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use pchdeps::deps::{DependencyScanner, ScanReport, ScanRequest, ScannedInclude};
use pchdeps::errors::{PchError, Result};
use pchdeps::model::{SourceType, UsedMacro};

/// A fake scanner that:
/// - answers each project part with a canned report (empty if none is set)
/// - records every request it receives
/// - fails for parts marked with [`fail_for`](Self::fail_for).
#[derive(Default)]
pub struct FakeScanner {
    reports: Mutex<HashMap<String, ScanReport>>,
    failing: Mutex<HashSet<String>>,
    requests: Mutex<Vec<ScanRequest>>,
    calls: AtomicUsize,
}

impl FakeScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_report(&self, project_part: &str, report: ScanReport) {
        self.reports
            .lock()
            .unwrap()
            .insert(project_part.to_string(), report);
    }

    pub fn fail_for(&self, project_part: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(project_part.to_string());
    }

    pub fn succeed_for(&self, project_part: &str) {
        self.failing.lock().unwrap().remove(project_part);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ScanRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl DependencyScanner for FakeScanner {
    fn scan(
        &self,
        request: ScanRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ScanReport>> + Send + '_>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let project_part = request.project_part.clone();
            self.requests.lock().unwrap().push(request);

            if self.failing.lock().unwrap().contains(&project_part) {
                return Err(PchError::Collection {
                    project_part,
                    reason: "fake scanner failure".to_string(),
                });
            }

            Ok(self
                .reports
                .lock()
                .unwrap()
                .get(&project_part)
                .cloned()
                .unwrap_or_default())
        })
    }
}

/// Builder for `ScanReport`.
#[derive(Default)]
pub struct ScanReportBuilder {
    report: ScanReport,
}

impl ScanReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, path: impl AsRef<Path>, source_type: SourceType, usage_order: u32) -> Self {
        self.report.includes.push(ScannedInclude {
            path: path.as_ref().to_path_buf(),
            source_type,
            usage_order,
        });
        self
    }

    pub fn used_macro(mut self, name: &str, usage_order: u32) -> Self {
        self.report.used_macros.push(UsedMacro::new(name, usage_order));
        self
    }

    pub fn build(self) -> ScanReport {
        self.report
    }
}
