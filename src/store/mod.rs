// src/store/mod.rs

//! Durable state that lets a restarted pipeline reuse earlier work.
//!
//! - [`dependencies`] maps a project part's content key to its last
//!   collected build dependency and file timestamps.
//! - [`artifacts`] maps artifact fingerprints to built PCH files, and
//!   project parts to their current system/project PCH.
//!
//! Both come in a file-backed flavour (JSON under the state directory) and
//! an in-memory flavour, selected by [`StorageMode`](crate::types::StorageMode).

pub mod artifacts;
pub mod dependencies;

use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::Result;
use crate::fs::FileSystem;

pub use artifacts::{
    ArtifactIndex, ArtifactStore, FileArtifactStore, MemoryArtifactStore, PrecompiledHeaders,
};
pub use dependencies::{
    project_part_key, BuildDependencyStore, FileBuildDependencyStore,
    MemoryBuildDependencyStore, StoredBuildDependency,
};

/// Read a JSON document, returning `None` if it does not exist.
fn read_json<T: DeserializeOwned>(fs: &dyn FileSystem, path: &Path) -> Result<Option<T>> {
    if !fs.exists(path) {
        return Ok(None);
    }
    let contents = fs.read_to_string(path)?;
    let value = serde_json::from_str(&contents)
        .with_context(|| format!("parsing stored document {:?}", path))?;
    Ok(Some(value))
}

fn write_json<T: Serialize>(fs: &dyn FileSystem, path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    fs.write(path, &json)?;
    Ok(())
}
