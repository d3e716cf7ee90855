// src/model/mod.rs

//! Domain types shared by every stage of the pipeline.
//!
//! - [`project_part`] describes one compiled translation-unit family.
//! - [`dependency`] holds what the collector learned about a project part.
//! - [`pch_task`] holds the buildable units produced by the generator.

pub mod dependency;
pub mod pch_task;
pub mod project_part;

use serde::Serialize;

pub use dependency::{BuildDependency, FileStatus, SourceEntry, SourceType, UsedMacro};
pub use pch_task::{MergeKey, PchTask, PchTaskSet, TaskKey};
pub use project_part::{
    CompilerMacro, IncludeSearchPath, IncludeSearchPathType, Language, LanguageExtension,
    LanguageVersion, ProjectPart, ProjectPartId,
};

/// Modification time of a file, in nanoseconds since the Unix epoch.
pub type TimeStamp = i64;

/// Interned file path identifier.
///
/// Issued by [`crate::paths::FilePathCache`]; stable for the lifetime of the
/// process but never persisted (durable stores keep paths).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize)]
pub struct FileId(u32);

impl FileId {
    /// Creates a `FileId` from a raw index. Intended for tests and for the
    /// interner itself.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    pub fn as_raw(self) -> u32 {
        self.0
    }
}

// SAFETY: `FileId` wraps a `u32`, which always fits in `usize` on the
// supported platforms; `try_from_usize` rejects anything wider.
unsafe impl lasso::Key for FileId {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(FileId)
    }
}
