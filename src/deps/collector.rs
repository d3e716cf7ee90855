// src/deps/collector.rs

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::deps::command_line::{CommandLineBuilder, InputKind};
use crate::deps::scanner::{DependencyScanner, ScanRequest, UnsavedFile};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::model::{BuildDependency, FileId, FileStatus, ProjectPart, SourceEntry, UsedMacro};
use crate::paths::{comparison_key, FilePathCache};

/// Turns one project part into a [`BuildDependency`] by asking the scanner
/// what compiling its sources touches.
pub struct BuildDependencyCollector {
    scanner: Arc<dyn DependencyScanner>,
    paths: Arc<FilePathCache>,
    fs: Arc<dyn FileSystem>,
    unsaved_files: BTreeMap<PathBuf, UnsavedFile>,
}

impl BuildDependencyCollector {
    pub fn new(
        scanner: Arc<dyn DependencyScanner>,
        paths: Arc<FilePathCache>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            scanner,
            paths,
            fs,
            unsaved_files: BTreeMap::new(),
        }
    }

    /// Replace the overlay entries for the given files.
    pub fn update_unsaved_files(&mut self, files: Vec<UnsavedFile>) {
        for file in files {
            self.unsaved_files.insert(file.path.clone(), file);
        }
    }

    pub fn remove_unsaved_files(&mut self, paths: &[PathBuf]) {
        for path in paths {
            self.unsaved_files.remove(path);
        }
    }

    pub async fn create(&self, part: &ProjectPart) -> Result<BuildDependency> {
        let arguments = CommandLineBuilder::new(part.into(), InputKind::Source).into_args();
        let sources = self.paths.file_paths(&part.source_file_ids)?;

        // The project's own headers and sources are not dependencies of
        // themselves.
        let mut own_files = part.header_file_ids.clone();
        own_files.extend(part.source_file_ids.iter().copied());
        let excluded: HashSet<String> = self
            .paths
            .file_paths(&own_files)?
            .iter()
            .map(|p| comparison_key(p))
            .collect();

        let request = ScanRequest {
            project_part: part.id.to_string(),
            arguments,
            sources,
            unsaved_files: self.unsaved_files.values().cloned().collect(),
        };

        let mut report = self.scanner.scan(request).await?;
        report.includes.sort_by_key(|include| include.usage_order);

        let mut seen: HashSet<FileId> = HashSet::new();
        let mut includes = Vec::with_capacity(report.includes.len());
        for include in report.includes {
            if excluded.contains(&comparison_key(&include.path)) {
                debug!(
                    project_part = %part.id,
                    path = ?include.path,
                    "skipping project-owned file reported as include"
                );
                continue;
            }
            let file_id = self.paths.file_path_id(&include.path);
            // First occurrence of a file decides its role.
            if seen.insert(file_id) {
                includes.push(SourceEntry::new(
                    file_id,
                    include.source_type,
                    include.usage_order,
                ));
            }
        }

        let used_macros = UsedMacro::normalize(report.used_macros);

        let mut dependency = BuildDependency {
            includes,
            used_macros,
            source_files: part.source_file_ids.clone(),
            file_statuses: Vec::new(),
        };
        dependency.file_statuses = self.file_statuses(&dependency)?;

        info!(
            project_part = %part.id,
            includes = dependency.includes.len(),
            used_macros = dependency.used_macros.len(),
            "collected build dependency"
        );

        Ok(dependency)
    }

    fn file_statuses(&self, dependency: &BuildDependency) -> Result<Vec<FileStatus>> {
        let mut seen = HashSet::new();
        let mut statuses = Vec::new();
        for file_id in dependency.referenced_files() {
            if !seen.insert(file_id) {
                continue;
            }
            let path = self.paths.file_path(file_id)?;
            statuses.push(FileStatus {
                file_id,
                last_modified: self.fs.modified_time(&path),
            });
        }
        Ok(statuses)
    }
}
