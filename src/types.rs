use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which precompiled header a task produces.
///
/// - `System`: headers supplied from outside the project (SDK, toolchain,
///   third-party). Shared broadly and built first.
/// - `Project`: project-owned headers, built on top of the system PCH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    System,
    Project,
}

impl Scope {
    pub const ALL: [Scope; 2] = [Scope::System, Scope::Project];
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::System => f.write_str("system"),
            Scope::Project => f.write_str("project"),
        }
    }
}

/// Where the durable stores keep their data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// JSON documents under `[manager].state_dir`.
    File,
    /// In memory only (lost on restart).
    Memory,
}

impl Default for StorageMode {
    fn default() -> Self {
        StorageMode::File
    }
}

impl FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(StorageMode::File),
            "memory" => Ok(StorageMode::Memory),
            other => Err(format!(
                "invalid storage mode: {other} (expected \"file\" or \"memory\")"
            )),
        }
    }
}
