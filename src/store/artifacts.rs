// src/store/artifacts.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::model::ProjectPartId;
use crate::store::{read_json, write_json};
use crate::types::Scope;

/// Relative path (from the state dir) to the artifact index.
pub const ARTIFACT_INDEX_PATH: &str = "artifacts.json";

/// Latest PCH per scope for one project part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecompiledHeaders {
    #[serde(default)]
    pub system: Option<PathBuf>,
    #[serde(default)]
    pub project: Option<PathBuf>,
}

impl PrecompiledHeaders {
    pub fn get(&self, scope: Scope) -> Option<&PathBuf> {
        match scope {
            Scope::System => self.system.as_ref(),
            Scope::Project => self.project.as_ref(),
        }
    }

    fn slot(&mut self, scope: Scope) -> &mut Option<PathBuf> {
        match scope {
            Scope::System => &mut self.system,
            Scope::Project => &mut self.project,
        }
    }

    fn is_empty(&self) -> bool {
        self.system.is_none() && self.project.is_none()
    }
}

/// Everything the artifact store remembers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactIndex {
    /// Artifact fingerprint -> built PCH file.
    #[serde(default)]
    pub artifacts: BTreeMap<String, PathBuf>,
    /// Project part id -> its current PCHs.
    #[serde(default)]
    pub headers: BTreeMap<String, PrecompiledHeaders>,
}

impl ArtifactIndex {
    fn set_precompiled_header(&mut self, part: &ProjectPartId, scope: Scope, path: PathBuf) {
        *self
            .headers
            .entry(part.to_string())
            .or_default()
            .slot(scope) = Some(path);
    }

    fn delete_precompiled_header(&mut self, part: &ProjectPartId, scope: Scope) -> bool {
        let Some(headers) = self.headers.get_mut(part.as_str()) else {
            return false;
        };
        let removed = headers.slot(scope).take().is_some();
        if headers.is_empty() {
            self.headers.remove(part.as_str());
        }
        removed
    }
}

/// Abstract storage for built artifacts and per-part PCH locations.
pub trait ArtifactStore: Send + Sync {
    fn artifact(&self, fingerprint: &str) -> Result<Option<PathBuf>>;
    fn insert_artifact(&mut self, fingerprint: &str, path: PathBuf) -> Result<()>;

    fn precompiled_header(&self, part: &ProjectPartId, scope: Scope) -> Result<Option<PathBuf>>;
    fn insert_precompiled_header(
        &mut self,
        parts: &[ProjectPartId],
        scope: Scope,
        path: PathBuf,
    ) -> Result<()>;
    fn delete_precompiled_header(&mut self, parts: &[ProjectPartId], scope: Scope) -> Result<()>;
}

/// Stores the index in `<root>/artifacts.json`.
///
/// Every operation reads the document, applies the change and writes it
/// back, so concurrent processes sharing a state dir see each other's work
/// at operation granularity.
pub struct FileArtifactStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileArtifactStore {
    pub fn new(root: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { root, fs }
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(ARTIFACT_INDEX_PATH)
    }

    fn load_index(&self) -> Result<ArtifactIndex> {
        Ok(read_json(self.fs.as_ref(), &self.index_path())?.unwrap_or_default())
    }

    fn save_index(&self, index: &ArtifactIndex) -> Result<()> {
        write_json(self.fs.as_ref(), &self.index_path(), index)
    }
}

impl ArtifactStore for FileArtifactStore {
    fn artifact(&self, fingerprint: &str) -> Result<Option<PathBuf>> {
        Ok(self.load_index()?.artifacts.get(fingerprint).cloned())
    }

    fn insert_artifact(&mut self, fingerprint: &str, path: PathBuf) -> Result<()> {
        let mut index = self.load_index()?;
        index.artifacts.insert(fingerprint.to_string(), path);
        self.save_index(&index)?;
        info!(fingerprint = %&fingerprint[..fingerprint.len().min(16)], "stored artifact (file)");
        Ok(())
    }

    fn precompiled_header(&self, part: &ProjectPartId, scope: Scope) -> Result<Option<PathBuf>> {
        Ok(self
            .load_index()?
            .headers
            .get(part.as_str())
            .and_then(|headers| headers.get(scope).cloned()))
    }

    fn insert_precompiled_header(
        &mut self,
        parts: &[ProjectPartId],
        scope: Scope,
        path: PathBuf,
    ) -> Result<()> {
        let mut index = self.load_index()?;
        for part in parts {
            index.set_precompiled_header(part, scope, path.clone());
        }
        self.save_index(&index)
    }

    fn delete_precompiled_header(&mut self, parts: &[ProjectPartId], scope: Scope) -> Result<()> {
        let mut index = self.load_index()?;
        let mut changed = false;
        for part in parts {
            changed |= index.delete_precompiled_header(part, scope);
        }
        if changed {
            self.save_index(&index)?;
            debug!(?parts, %scope, "deleted precompiled header entries (file)");
        }
        Ok(())
    }
}

/// Keeps the index in memory only.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    index: ArtifactIndex,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> &ArtifactIndex {
        &self.index
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn artifact(&self, fingerprint: &str) -> Result<Option<PathBuf>> {
        Ok(self.index.artifacts.get(fingerprint).cloned())
    }

    fn insert_artifact(&mut self, fingerprint: &str, path: PathBuf) -> Result<()> {
        self.index.artifacts.insert(fingerprint.to_string(), path);
        Ok(())
    }

    fn precompiled_header(&self, part: &ProjectPartId, scope: Scope) -> Result<Option<PathBuf>> {
        Ok(self
            .index
            .headers
            .get(part.as_str())
            .and_then(|headers| headers.get(scope).cloned()))
    }

    fn insert_precompiled_header(
        &mut self,
        parts: &[ProjectPartId],
        scope: Scope,
        path: PathBuf,
    ) -> Result<()> {
        for part in parts {
            self.index.set_precompiled_header(part, scope, path.clone());
        }
        Ok(())
    }

    fn delete_precompiled_header(&mut self, parts: &[ProjectPartId], scope: Scope) -> Result<()> {
        for part in parts {
            self.index.delete_precompiled_header(part, scope);
        }
        Ok(())
    }
}
