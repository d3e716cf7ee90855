// src/deps/mod.rs

//! Build-dependency collection and caching.
//!
//! - [`scanner`]: the external front-end seam (JSON over stdio).
//! - [`command_line`]: compiler arguments for a project part or PCH task.
//! - [`collector`]: turns a scan report into a [`BuildDependency`](crate::model::BuildDependency).
//! - [`modified_time`]: cached file timestamps for staleness checks.
//! - [`provider`]: returns cached records and re-collects only when stale.

pub mod collector;
pub mod command_line;
pub mod modified_time;
pub mod provider;
pub mod scanner;

pub use collector::BuildDependencyCollector;
pub use command_line::{CommandLineBuilder, CompileSettings, InputKind};
pub use modified_time::ModifiedTimeChecker;
pub use provider::{BuildDependenciesProvider, CachingProvider};
pub use scanner::{
    DependencyScanner, ProcessScanner, ScanReport, ScanRequest, ScannedInclude, UnsavedFile,
};
